//! Query parameter types for deriving views of the order collection.
//!
//! Filter criteria and pagination state are supplied by the presentation
//! layer and persisted together with the orders so a restarted client comes
//! back to the same view.

use crate::{Order, OrderStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Sentinel accepted by [`StatusFilter`] to match every status.
pub const ALL_STATUSES: &str = "all";

/// Criteria narrowing a derived view of the order collection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
	/// Free text matched against id, customer name and customer email.
	#[serde(default)]
	pub search: String,
	/// Status restriction.
	#[serde(default)]
	pub status: StatusFilter,
	/// Optional inclusive range on the order date.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub date_range: Option<DateRange>,
}

impl FilterCriteria {
	/// Criteria with a search string and a status filter.
	pub fn new(search: impl Into<String>, status: StatusFilter) -> Self {
		Self {
			search: search.into(),
			status,
			date_range: None,
		}
	}

	/// Adds an inclusive date range.
	pub fn with_date_range(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
		self.date_range = Some(DateRange { start, end });
		self
	}
}

/// Inclusive range of order dates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DateRange {
	pub start: DateTime<Utc>,
	pub end: DateTime<Utc>,
}

impl DateRange {
	pub fn contains(&self, at: &DateTime<Utc>) -> bool {
		*at >= self.start && *at <= self.end
	}
}

/// Status restriction of a filter.
///
/// Text that is neither a known status nor `all` is kept as
/// [`StatusFilter::Unrecognized`] and matches no order.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum StatusFilter {
	#[default]
	All,
	Only(OrderStatus),
	Unrecognized(String),
}

impl StatusFilter {
	/// Returns true when the order passes this restriction.
	pub fn matches(&self, order: &Order) -> bool {
		match self {
			StatusFilter::All => true,
			StatusFilter::Only(status) => order.status == *status,
			StatusFilter::Unrecognized(_) => false,
		}
	}
}

impl From<OrderStatus> for StatusFilter {
	fn from(status: OrderStatus) -> Self {
		StatusFilter::Only(status)
	}
}

impl FromStr for StatusFilter {
	type Err = std::convert::Infallible;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s == ALL_STATUSES {
			return Ok(StatusFilter::All);
		}
		Ok(s.parse::<OrderStatus>()
			.map(StatusFilter::Only)
			.unwrap_or_else(|_| StatusFilter::Unrecognized(s.to_string())))
	}
}

impl fmt::Display for StatusFilter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			StatusFilter::All => f.write_str(ALL_STATUSES),
			StatusFilter::Only(status) => write!(f, "{}", status),
			StatusFilter::Unrecognized(raw) => f.write_str(raw),
		}
	}
}

impl Serialize for StatusFilter {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

impl<'de> Deserialize<'de> for StatusFilter {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let raw = String::deserialize(deserializer)?;
		let Ok(filter) = raw.parse::<StatusFilter>();
		Ok(filter)
	}
}

/// Window over a filtered view.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaginationState {
	/// One-based page number.
	pub page: u32,
	/// Maximum number of records per page.
	pub limit: u32,
	/// Number of records in the filtered view. Derived, never authoritative.
	#[serde(default)]
	pub total: usize,
}

impl PaginationState {
	/// Default number of records per page.
	pub const DEFAULT_LIMIT: u32 = 10;

	/// Creates a pagination state, clamping page and limit to at least 1.
	pub fn new(page: u32, limit: u32) -> Self {
		Self {
			page: page.max(1),
			limit: limit.max(1),
			total: 0,
		}
	}

	/// Number of pages needed for `total` records.
	pub fn total_pages(&self) -> u32 {
		let limit = self.limit.max(1) as usize;
		u32::try_from(self.total.div_ceil(limit)).unwrap_or(u32::MAX)
	}

	/// Index of the first record of the current page.
	pub fn offset(&self) -> usize {
		(self.page.max(1) as usize - 1).saturating_mul(self.limit.max(1) as usize)
	}
}

impl Default for PaginationState {
	fn default() -> Self {
		Self::new(1, Self::DEFAULT_LIMIT)
	}
}

/// One page of a filtered view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page {
	pub items: Vec<Order>,
	pub page: u32,
	pub limit: u32,
	/// Number of records in the whole filtered view.
	pub total: usize,
	pub total_pages: u32,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_status_filter_parsing() {
		assert_eq!("all".parse::<StatusFilter>(), Ok(StatusFilter::All));
		assert_eq!(
			"shipped".parse::<StatusFilter>(),
			Ok(StatusFilter::Only(OrderStatus::Shipped))
		);
		assert_eq!(
			"lost".parse::<StatusFilter>(),
			Ok(StatusFilter::Unrecognized("lost".to_string()))
		);
	}

	#[test]
	fn test_status_filter_serde() {
		let criteria = FilterCriteria::new("sarah", StatusFilter::Only(OrderStatus::Pending));
		let json = serde_json::to_value(&criteria).unwrap();
		assert_eq!(json["status"], "pending");

		let parsed: FilterCriteria =
			serde_json::from_str(r#"{"search":"","status":"archived"}"#).unwrap();
		assert_eq!(
			parsed.status,
			StatusFilter::Unrecognized("archived".to_string())
		);
	}

	#[test]
	fn test_pagination_bounds() {
		let mut state = PaginationState::new(0, 0);
		assert_eq!(state.page, 1);
		assert_eq!(state.limit, 1);

		state = PaginationState::new(3, 10);
		state.total = 25;
		assert_eq!(state.total_pages(), 3);
		assert_eq!(state.offset(), 20);

		state.total = 0;
		assert_eq!(state.total_pages(), 0);
	}
}
