//! Canonical in-memory order collection.
//!
//! The [`OrderStore`] owns every order the client knows about, newest first,
//! together with transient view state: the selected order, the loading flag,
//! the last error and the current filter and pagination. All mutations go
//! through the methods below (or through [`StoreCommand`]s, which dispatch to
//! them), and each one either succeeds completely or leaves the store as it
//! was.

pub mod commands;

pub use commands::StoreCommand;

use crate::state;
use fleet_types::{
	FilterCriteria, Order, OrderStatus, PaginationState, TransitionPolicy,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Outcomes of store operations that could not be applied.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
	#[error("Order not found: {0}")]
	NotFound(String),
	#[error("Order already exists: {0}")]
	DuplicateId(String),
	#[error("Invalid status transition for order {id}: {from} -> {to}")]
	InvalidTransition {
		id: String,
		from: OrderStatus,
		to: OrderStatus,
	},
}

/// Serializable copy of the store contents, used for persistence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
	pub orders: Vec<Order>,
	#[serde(default)]
	pub filter: FilterCriteria,
	#[serde(default)]
	pub pagination: PaginationState,
	#[serde(default)]
	pub selected_order_id: Option<String>,
}

/// The order collection plus transient UI state.
#[derive(Debug, Clone, Default)]
pub struct OrderStore {
	orders: Vec<Order>,
	selected: Option<Order>,
	is_loading: bool,
	last_error: Option<String>,
	filter: FilterCriteria,
	pagination: PaginationState,
}

impl OrderStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates an empty store with the given page size.
	pub fn with_pagination(pagination: PaginationState) -> Self {
		Self {
			pagination,
			..Self::default()
		}
	}

	/// Orders, newest first.
	pub fn orders(&self) -> &[Order] {
		&self.orders
	}

	pub fn get(&self, id: &str) -> Option<&Order> {
		self.orders.iter().find(|o| o.id == id)
	}

	pub fn contains(&self, id: &str) -> bool {
		self.position(id).is_some()
	}

	pub fn len(&self) -> usize {
		self.orders.len()
	}

	pub fn is_empty(&self) -> bool {
		self.orders.is_empty()
	}

	/// Snapshot of the selected order as of its last change.
	pub fn selected(&self) -> Option<&Order> {
		self.selected.as_ref()
	}

	pub fn selected_order_id(&self) -> Option<&str> {
		self.selected.as_ref().map(|o| o.id.as_str())
	}

	pub fn is_loading(&self) -> bool {
		self.is_loading
	}

	pub fn last_error(&self) -> Option<&str> {
		self.last_error.as_deref()
	}

	pub fn filter(&self) -> &FilterCriteria {
		&self.filter
	}

	pub fn pagination(&self) -> &PaginationState {
		&self.pagination
	}

	fn position(&self, id: &str) -> Option<usize> {
		self.orders.iter().position(|o| o.id == id)
	}

	/// Overwrites the whole collection.
	///
	/// Later duplicates of an id are dropped. The pagination count is reset to
	/// the new size and the page goes back to the first one. A selection that
	/// no longer exists is cleared, otherwise its snapshot is refreshed.
	/// Returns the number of orders kept.
	pub fn replace_all(&mut self, orders: Vec<Order>) -> usize {
		let mut kept: Vec<Order> = Vec::with_capacity(orders.len());
		for order in orders {
			if kept.iter().any(|o| o.id == order.id) {
				tracing::warn!(order_id = %order.id, "Dropping duplicate order from bulk replace");
				continue;
			}
			kept.push(order);
		}
		self.orders = kept;

		self.pagination.total = self.orders.len();
		self.pagination.page = 1;

		if let Some(selected_id) = self.selected_order_id().map(str::to_string) {
			self.selected = self.get(&selected_id).cloned();
		}
		self.orders.len()
	}

	/// Prepends an order.
	pub fn insert(&mut self, order: Order) -> Result<(), StoreError> {
		if self.contains(&order.id) {
			return Err(StoreError::DuplicateId(order.id));
		}
		self.orders.insert(0, order);
		self.pagination.total = self.orders.len();
		Ok(())
	}

	/// Replaces the order with the same id and bumps its `updated_at`.
	///
	/// The incoming `updated_at` is kept when it is newer than the resident
	/// one; otherwise the timestamp is moved forward so it never decreases.
	pub fn update(&mut self, mut order: Order) -> Result<(), StoreError> {
		let index = self
			.position(&order.id)
			.ok_or_else(|| StoreError::NotFound(order.id.clone()))?;

		let previous = self.orders[index].updated_at;
		if order.updated_at <= previous {
			order.updated_at = previous;
			order.touch(fleet_types::now());
		}

		if self.selected_order_id() == Some(order.id.as_str()) {
			self.selected = Some(order.clone());
		}
		self.orders[index] = order;
		Ok(())
	}

	/// Deletes an order and returns it. Clears the selection if it was selected.
	pub fn remove(&mut self, id: &str) -> Result<Order, StoreError> {
		let index = self
			.position(id)
			.ok_or_else(|| StoreError::NotFound(id.to_string()))?;

		let removed = self.orders.remove(index);
		if self.selected_order_id() == Some(id) {
			self.selected = None;
		}
		self.pagination.total = self.orders.len();
		Ok(removed)
	}

	/// Changes only the status (and `updated_at`) of an order.
	///
	/// Returns the previous status.
	pub fn set_status(
		&mut self,
		id: &str,
		status: OrderStatus,
		policy: TransitionPolicy,
	) -> Result<OrderStatus, StoreError> {
		let mut order = self
			.get(id)
			.cloned()
			.ok_or_else(|| StoreError::NotFound(id.to_string()))?;

		let from = order.status;
		if !state::is_allowed(policy, from, status) {
			return Err(StoreError::InvalidTransition {
				id: id.to_string(),
				from,
				to: status,
			});
		}

		order.status = status;
		order.touch(fleet_types::now());
		self.update(order)?;
		Ok(from)
	}

	/// Selects an order by id, or clears the selection with `None`.
	pub fn select(&mut self, id: Option<&str>) -> Result<(), StoreError> {
		match id {
			Some(id) => {
				let order = self
					.get(id)
					.cloned()
					.ok_or_else(|| StoreError::NotFound(id.to_string()))?;
				self.selected = Some(order);
			},
			None => self.selected = None,
		}
		Ok(())
	}

	pub fn clear_selection(&mut self) {
		self.selected = None;
	}

	/// Sets new filter criteria and goes back to the first page.
	pub fn set_filter(&mut self, filter: FilterCriteria) {
		self.filter = filter;
		self.pagination.page = 1;
	}

	/// Moves to another page and/or page size.
	pub fn set_page(&mut self, page: u32, limit: u32) {
		let total = self.pagination.total;
		self.pagination = PaginationState::new(page, limit);
		self.pagination.total = total;
	}

	/// Returns true when the flag actually changed.
	pub fn set_loading(&mut self, loading: bool) -> bool {
		std::mem::replace(&mut self.is_loading, loading) != loading
	}

	/// Overwrites (or clears) the last error. Returns true when it changed.
	pub fn set_error(&mut self, message: Option<String>) -> bool {
		if self.last_error == message {
			return false;
		}
		self.last_error = message;
		true
	}

	pub fn clear_error(&mut self) -> bool {
		self.set_error(None)
	}

	/// Copies the persistent part of the store.
	pub fn snapshot(&self) -> StoreSnapshot {
		StoreSnapshot {
			orders: self.orders.clone(),
			filter: self.filter.clone(),
			pagination: self.pagination,
			selected_order_id: self.selected_order_id().map(str::to_string),
		}
	}

	/// Restores a persisted snapshot.
	///
	/// Transient flags are reset. The selection is restored only when the
	/// selected order is part of the snapshot.
	pub fn restore(&mut self, snapshot: StoreSnapshot) -> usize {
		let StoreSnapshot {
			orders,
			filter,
			pagination,
			selected_order_id,
		} = snapshot;

		self.selected = None;
		let count = self.replace_all(orders);
		self.filter = filter;
		self.pagination = PaginationState::new(pagination.page, pagination.limit);
		self.pagination.total = count;
		self.selected = selected_order_id.and_then(|id| self.get(&id).cloned());
		self.is_loading = false;
		self.last_error = None;
		count
	}
}
