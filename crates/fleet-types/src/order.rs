//! Order types for the fleet order engine.
//!
//! This module defines the canonical order record, its line items and customer
//! details, as well as the draft and patch payloads exchanged with the backend
//! when orders are created or modified.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Represents one customer shipment request.
///
/// Orders are owned by the order store. They are created by the backend
/// (which assigns the id and creation timestamps), modified in place through
/// updates and status changes, and removed by a hard delete.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
	/// Unique identifier for this order, immutable once assigned.
	pub id: String,
	/// Customer contact details.
	pub customer: Customer,
	/// Current lifecycle stage of the order.
	pub status: OrderStatus,
	/// Order amount in the account currency.
	pub total: Decimal,
	/// Line items in entry order.
	#[serde(default)]
	pub items: Vec<OrderItem>,
	/// Delivery address as entered.
	pub shipping_address: String,
	/// Business date of the order.
	pub order_date: DateTime<Utc>,
	/// Timestamp when this order was created.
	pub created_at: DateTime<Utc>,
	/// Timestamp when this order was last updated.
	pub updated_at: DateTime<Utc>,
	/// Free text notes.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub notes: Option<String>,
}

impl Order {
	/// Builds a canonical order from a draft once an id has been assigned.
	///
	/// Missing draft fields fall back to their defaults: status `pending`,
	/// total equal to the item sum and order date equal to `now`.
	pub fn from_draft(id: impl Into<String>, draft: OrderDraft, now: DateTime<Utc>) -> Self {
		let total = draft.total.unwrap_or_else(|| items_total(&draft.items));
		Self {
			id: id.into(),
			customer: draft.customer,
			status: draft.status.unwrap_or_default(),
			total,
			items: draft.items,
			shipping_address: draft.shipping_address,
			order_date: draft.order_date.unwrap_or(now),
			created_at: now,
			updated_at: now,
			notes: draft.notes,
		}
	}

	/// Sum of `quantity * unit_price` over all line items.
	pub fn items_total(&self) -> Decimal {
		items_total(&self.items)
	}

	/// Applies every field present in the patch.
	///
	/// The id and creation timestamp are never touched. `updated_at` is
	/// bumped through [`Order::touch`].
	pub fn apply_patch(&mut self, patch: OrderPatch, now: DateTime<Utc>) {
		if let Some(customer) = patch.customer {
			self.customer = customer;
		}
		if let Some(status) = patch.status {
			self.status = status;
		}
		if let Some(total) = patch.total {
			self.total = total;
		}
		if let Some(items) = patch.items {
			self.items = items;
		}
		if let Some(address) = patch.shipping_address {
			self.shipping_address = address;
		}
		if let Some(order_date) = patch.order_date {
			self.order_date = order_date;
		}
		if let Some(notes) = patch.notes {
			self.notes = Some(notes);
		}
		self.touch(now);
	}

	/// Moves `updated_at` forward.
	///
	/// The new value is `now`, or one millisecond past the previous value when
	/// the clock has not advanced, so successive mutations are strictly ordered.
	pub fn touch(&mut self, now: DateTime<Utc>) {
		let floor = self.updated_at + Duration::milliseconds(1);
		self.updated_at = if now > self.updated_at { now } else { floor };
	}
}

/// Sum of `quantity * unit_price` over the given line items.
pub fn items_total(items: &[OrderItem]) -> Decimal {
	items
		.iter()
		.map(|item| item.unit_price * Decimal::from(item.quantity))
		.sum()
}

/// Customer contact details attached to an order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Customer {
	pub name: String,
	pub email: String,
	pub phone: String,
}

impl Customer {
	pub fn new(name: impl Into<String>, email: impl Into<String>, phone: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			email: email.into(),
			phone: phone.into(),
		}
	}
}

/// A single line item of an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
	pub id: String,
	pub name: String,
	pub quantity: u32,
	pub unit_price: Decimal,
}

/// Order payload submitted for creation, before an id is assigned.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
	pub customer: Customer,
	/// Initial status, `pending` when absent.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub status: Option<OrderStatus>,
	/// Explicit total. Derived from the items when absent.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub total: Option<Decimal>,
	#[serde(default)]
	pub items: Vec<OrderItem>,
	#[serde(default)]
	pub shipping_address: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub order_date: Option<DateTime<Utc>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub notes: Option<String>,
}

impl OrderDraft {
	/// Checks that an explicit total agrees with the line items.
	///
	/// A draft without items may carry any non-negative total; a draft with
	/// items and an explicit total must match the item sum exactly.
	pub fn validate(&self) -> Result<(), DraftError> {
		if let Some(total) = self.total {
			if total.is_sign_negative() {
				return Err(DraftError::NegativeTotal(total));
			}
			if !self.items.is_empty() {
				let expected = items_total(&self.items);
				if expected != total {
					return Err(DraftError::TotalMismatch { total, expected });
				}
			}
		}
		if let Some(item) = self.items.iter().find(|item| item.quantity == 0) {
			return Err(DraftError::EmptyItem(item.id.clone()));
		}
		Ok(())
	}
}

/// Reasons a draft is refused before it is sent to the backend.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DraftError {
	#[error("Total {total} does not match item sum {expected}")]
	TotalMismatch { total: Decimal, expected: Decimal },
	#[error("Total cannot be negative: {0}")]
	NegativeTotal(Decimal),
	#[error("Item {0} has zero quantity")]
	EmptyItem(String),
}

/// Partial update keyed by order id. Only present fields are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderPatch {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub customer: Option<Customer>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub status: Option<OrderStatus>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub total: Option<Decimal>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub items: Option<Vec<OrderItem>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub shipping_address: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub order_date: Option<DateTime<Utc>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub notes: Option<String>,
}

impl OrderPatch {
	/// Patch that only changes the status.
	pub fn status(status: OrderStatus) -> Self {
		Self {
			status: Some(status),
			..Default::default()
		}
	}
}

/// Lifecycle stage of an order.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
	/// Order has been received but not yet worked on.
	#[default]
	Pending,
	/// Order is being prepared for dispatch.
	Processing,
	/// Order has left the depot.
	Shipped,
	/// Order has reached the customer.
	Delivered,
	/// Order was cancelled.
	Cancelled,
}

impl OrderStatus {
	/// Returns the wire name of the status.
	pub fn as_str(&self) -> &'static str {
		match self {
			OrderStatus::Pending => "pending",
			OrderStatus::Processing => "processing",
			OrderStatus::Shipped => "shipped",
			OrderStatus::Delivered => "delivered",
			OrderStatus::Cancelled => "cancelled",
		}
	}

	/// Returns an iterator over all statuses in lifecycle order.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Pending,
			Self::Processing,
			Self::Shipped,
			Self::Delivered,
			Self::Cancelled,
		]
		.into_iter()
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Error returned when text does not name a known status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown order status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
	type Err = UnknownStatus;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"pending" => Ok(Self::Pending),
			"processing" => Ok(Self::Processing),
			"shipped" => Ok(Self::Shipped),
			"delivered" => Ok(Self::Delivered),
			"cancelled" => Ok(Self::Cancelled),
			other => Err(UnknownStatus(other.to_string())),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::TimeZone;

	fn item(id: &str, quantity: u32, unit_price: i64) -> OrderItem {
		OrderItem {
			id: id.to_string(),
			name: format!("Item {}", id),
			quantity,
			unit_price: Decimal::from(unit_price),
		}
	}

	#[test]
	fn test_draft_defaults() {
		let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
		let order = Order::from_draft("ORD-1", OrderDraft::default(), now);

		assert_eq!(order.status, OrderStatus::Pending);
		assert_eq!(order.total, Decimal::ZERO);
		assert!(order.items.is_empty());
		assert_eq!(order.order_date, now);
		assert_eq!(order.created_at, order.updated_at);
	}

	#[test]
	fn test_draft_total_derived_from_items() {
		let draft = OrderDraft {
			items: vec![item("a", 2, 15), item("b", 1, 70)],
			..Default::default()
		};
		let order = Order::from_draft("ORD-2", draft, Utc::now());
		assert_eq!(order.total, Decimal::from(100));
		assert_eq!(order.items_total(), order.total);
	}

	#[test]
	fn test_draft_validation() {
		let mut draft = OrderDraft {
			items: vec![item("a", 2, 15)],
			total: Some(Decimal::from(31)),
			..Default::default()
		};
		assert!(matches!(
			draft.validate(),
			Err(DraftError::TotalMismatch { .. })
		));

		draft.total = Some(Decimal::from(30));
		assert!(draft.validate().is_ok());

		let flat_rate = OrderDraft {
			total: Some(Decimal::from(250)),
			..Default::default()
		};
		assert!(flat_rate.validate().is_ok());

		let negative = OrderDraft {
			total: Some(Decimal::from(-1)),
			..Default::default()
		};
		assert!(matches!(
			negative.validate(),
			Err(DraftError::NegativeTotal(_))
		));
	}

	#[test]
	fn test_touch_is_strictly_increasing() {
		let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
		let mut order = Order::from_draft("ORD-3", OrderDraft::default(), now);

		// Clock did not move
		order.touch(now);
		assert!(order.updated_at > now);

		// Clock went backwards
		let before = order.updated_at;
		order.touch(now - Duration::seconds(30));
		assert!(order.updated_at > before);
	}

	#[test]
	fn test_apply_patch_keeps_identity() {
		let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
		let mut order = Order::from_draft("ORD-4", OrderDraft::default(), now);
		let patch = OrderPatch {
			status: Some(OrderStatus::Shipped),
			notes: Some("Leave at gate".to_string()),
			..Default::default()
		};
		order.apply_patch(patch, now + Duration::minutes(5));

		assert_eq!(order.id, "ORD-4");
		assert_eq!(order.created_at, now);
		assert_eq!(order.status, OrderStatus::Shipped);
		assert_eq!(order.notes.as_deref(), Some("Leave at gate"));
		assert_eq!(order.updated_at, now + Duration::minutes(5));
	}

	#[test]
	fn test_status_parsing() {
		for status in OrderStatus::all() {
			assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
		}
		assert!("archived".parse::<OrderStatus>().is_err());

		let json = serde_json::to_string(&OrderStatus::Delivered).unwrap();
		assert_eq!(json, "\"delivered\"");
	}
}
