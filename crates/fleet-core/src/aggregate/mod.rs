//! Summary metrics derived from the order collection.

use fleet_types::{Order, OrderStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Number of orders per status, plus the overall count.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusCounts {
	pub pending: usize,
	pub processing: usize,
	pub shipped: usize,
	pub delivered: usize,
	pub cancelled: usize,
	pub all: usize,
}

impl StatusCounts {
	pub fn get(&self, status: OrderStatus) -> usize {
		match status {
			OrderStatus::Pending => self.pending,
			OrderStatus::Processing => self.processing,
			OrderStatus::Shipped => self.shipped,
			OrderStatus::Delivered => self.delivered,
			OrderStatus::Cancelled => self.cancelled,
		}
	}

	fn slot(&mut self, status: OrderStatus) -> &mut usize {
		match status {
			OrderStatus::Pending => &mut self.pending,
			OrderStatus::Processing => &mut self.processing,
			OrderStatus::Shipped => &mut self.shipped,
			OrderStatus::Delivered => &mut self.delivered,
			OrderStatus::Cancelled => &mut self.cancelled,
		}
	}
}

/// Counts orders by status. The five per-status counts always sum to `all`.
pub fn counts_by_status(orders: &[Order]) -> StatusCounts {
	let mut counts = StatusCounts::default();
	for order in orders {
		*counts.slot(order.status) += 1;
	}
	counts.all = orders.len();
	counts
}

/// Recognized revenue: the sum of `total` over the delivered orders in `orders`.
///
/// This is the only revenue metric the engine exposes. Callers that need a
/// different figure compute it from the orders themselves.
pub fn total_revenue(orders: &[Order]) -> Decimal {
	orders
		.iter()
		.filter(|order| order.status == OrderStatus::Delivered)
		.map(|order| order.total)
		.sum()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::store::tests::order;

	#[test]
	fn test_three_order_scenario() {
		let orders = vec![
			order("A", "Ana", OrderStatus::Pending, 100),
			order("B", "Ben", OrderStatus::Processing, 200),
			order("C", "Cy", OrderStatus::Delivered, 300),
		];

		let counts = counts_by_status(&orders);
		assert_eq!(
			counts,
			StatusCounts {
				pending: 1,
				processing: 1,
				shipped: 0,
				delivered: 1,
				cancelled: 0,
				all: 3,
			}
		);
		assert_eq!(total_revenue(&orders), Decimal::from(300));
	}

	#[test]
	fn test_counts_sum_to_all() {
		let statuses: Vec<_> = OrderStatus::all().collect();
		let orders: Vec<_> = statuses
			.iter()
			.cycle()
			.take(17)
			.enumerate()
			.map(|(i, status)| order(&format!("ORD-{}", i), "Ana", *status, 1))
			.collect();

		let counts = counts_by_status(&orders);
		let sum: usize = OrderStatus::all().map(|s| counts.get(s)).sum();
		assert_eq!(counts.all, 17);
		assert_eq!(sum, counts.all);
	}

	#[test]
	fn test_empty_collection() {
		assert_eq!(counts_by_status(&[]), StatusCounts::default());
		assert_eq!(total_revenue(&[]), Decimal::ZERO);
	}

	#[test]
	fn test_revenue_ignores_undelivered() {
		let orders = vec![
			order("A", "Ana", OrderStatus::Shipped, 500),
			order("B", "Ben", OrderStatus::Cancelled, 70),
			order("C", "Cy", OrderStatus::Delivered, 30),
			order("D", "Di", OrderStatus::Delivered, 12),
		];
		assert_eq!(total_revenue(&orders), Decimal::from(42));
	}
}
