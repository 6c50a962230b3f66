//! Order status transition rules.
//!
//! The recommended lifecycle is `pending -> processing -> shipped -> delivered`,
//! with cancellation possible while an order is still pending or processing.
//! It is only enforced under [`TransitionPolicy::Strict`]; the permissive
//! policy accepts any change.

use fleet_types::{OrderStatus, TransitionPolicy};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

/// Static transition table - each status maps to its recommended successors.
static RECOMMENDED: Lazy<HashMap<OrderStatus, HashSet<OrderStatus>>> = Lazy::new(|| {
	let mut m = HashMap::new();
	m.insert(
		OrderStatus::Pending,
		HashSet::from([OrderStatus::Processing, OrderStatus::Cancelled]),
	);
	m.insert(
		OrderStatus::Processing,
		HashSet::from([OrderStatus::Shipped, OrderStatus::Cancelled]),
	);
	m.insert(OrderStatus::Shipped, HashSet::from([OrderStatus::Delivered]));
	m.insert(OrderStatus::Delivered, HashSet::new()); // terminal
	m.insert(OrderStatus::Cancelled, HashSet::new()); // terminal
	m
});

/// Checks if `from -> to` is part of the recommended lifecycle.
///
/// Keeping the current status is always considered valid.
pub fn is_recommended_transition(from: OrderStatus, to: OrderStatus) -> bool {
	from == to
		|| RECOMMENDED
			.get(&from)
			.is_some_and(|next| next.contains(&to))
}

/// Checks a transition against a policy.
pub fn is_allowed(policy: TransitionPolicy, from: OrderStatus, to: OrderStatus) -> bool {
	match policy {
		TransitionPolicy::Permissive => true,
		TransitionPolicy::Strict => is_recommended_transition(from, to),
	}
}

/// Recommended successors of a status, in lifecycle order.
pub fn recommended_next(from: OrderStatus) -> Vec<OrderStatus> {
	OrderStatus::all()
		.filter(|to| *to != from && is_recommended_transition(from, *to))
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use fleet_types::OrderStatus::*;

	#[test]
	fn test_forward_path() {
		assert!(is_recommended_transition(Pending, Processing));
		assert!(is_recommended_transition(Processing, Shipped));
		assert!(is_recommended_transition(Shipped, Delivered));
	}

	#[test]
	fn test_cancellation_window() {
		assert!(is_recommended_transition(Pending, Cancelled));
		assert!(is_recommended_transition(Processing, Cancelled));
		assert!(!is_recommended_transition(Shipped, Cancelled));
		assert!(!is_recommended_transition(Delivered, Cancelled));
	}

	#[test]
	fn test_no_skipping_or_reopening() {
		assert!(!is_recommended_transition(Pending, Delivered));
		assert!(!is_recommended_transition(Delivered, Pending));
		assert!(!is_recommended_transition(Cancelled, Processing));
		assert!(is_recommended_transition(Cancelled, Cancelled));
	}

	#[test]
	fn test_policies() {
		for from in OrderStatus::all() {
			for to in OrderStatus::all() {
				assert!(is_allowed(TransitionPolicy::Permissive, from, to));
				assert_eq!(
					is_allowed(TransitionPolicy::Strict, from, to),
					is_recommended_transition(from, to)
				);
			}
		}
	}

	#[test]
	fn test_recommended_next() {
		assert_eq!(recommended_next(Pending), vec![Processing, Cancelled]);
		assert_eq!(recommended_next(Shipped), vec![Delivered]);
		assert!(recommended_next(Delivered).is_empty());
	}
}
