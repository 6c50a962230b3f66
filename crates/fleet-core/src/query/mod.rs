//! Filtered and paginated views of the order collection.
//!
//! Both steps are pure: the input slice is never modified and identical inputs
//! always produce identical output, in the same order.

use fleet_types::{FilterCriteria, Order, Page, PaginationState};

/// Returns the orders matching every part of the criteria.
///
/// The search text is matched case-insensitively as a substring of the id,
/// the customer name or the customer email. An empty search matches every
/// order.
pub fn filter_orders(orders: &[Order], criteria: &FilterCriteria) -> Vec<Order> {
	let needle = criteria.search.to_lowercase();
	orders
		.iter()
		.filter(|order| matches_search(order, &needle))
		.filter(|order| criteria.status.matches(order))
		.filter(|order| {
			criteria
				.date_range
				.as_ref()
				.is_none_or(|range| range.contains(&order.order_date))
		})
		.cloned()
		.collect()
}

fn matches_search(order: &Order, needle: &str) -> bool {
	if needle.is_empty() {
		return true;
	}
	[
		order.id.as_str(),
		order.customer.name.as_str(),
		order.customer.email.as_str(),
	]
	.iter()
	.any(|field| field.to_lowercase().contains(needle))
}

/// Cuts one page out of an already filtered sequence.
///
/// A page past the end yields no items, with `total` and `total_pages` still
/// describing the whole sequence.
pub fn paginate(filtered: &[Order], pagination: &PaginationState) -> Page {
	let mut window = PaginationState::new(pagination.page, pagination.limit);
	window.total = filtered.len();

	let items = filtered
		.iter()
		.skip(window.offset())
		.take(window.limit as usize)
		.cloned()
		.collect();

	Page {
		items,
		page: window.page,
		limit: window.limit,
		total: window.total,
		total_pages: window.total_pages(),
	}
}

/// Filters, then paginates.
pub fn view(orders: &[Order], criteria: &FilterCriteria, pagination: &PaginationState) -> Page {
	paginate(&filter_orders(orders, criteria), pagination)
}
