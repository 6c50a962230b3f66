//! Store mutations expressed as values.
//!
//! Apart from restoring a persisted snapshot at start, the engine funnels
//! every change through [`OrderStore::apply`], which
//! dispatches to the matching store method and reports what happened as a
//! [`StoreEvent`] ready to be published.

use super::{OrderStore, StoreError};
use fleet_types::{FilterCriteria, Order, OrderStatus, StoreEvent, TransitionPolicy};

/// A single mutation of the order store.
#[derive(Debug, Clone)]
pub enum StoreCommand {
	/// Overwrite the collection with a fetched list.
	ReplaceAll(Vec<Order>),
	/// Prepend a newly created order.
	Insert(Order),
	/// Replace an order with the same id.
	Update(Order),
	/// Delete an order by id.
	Remove(String),
	/// Change the status of an order.
	SetStatus {
		id: String,
		status: OrderStatus,
		policy: TransitionPolicy,
	},
	/// Select an order, or clear the selection.
	Select(Option<String>),
	SetFilter(FilterCriteria),
	SetPagination { page: u32, limit: u32 },
	SetLoading(bool),
	SetError(Option<String>),
}

impl OrderStore {
	/// Applies a command and returns the resulting change.
	///
	/// On error the store is left untouched.
	pub fn apply(&mut self, command: StoreCommand) -> Result<StoreEvent, StoreError> {
		match command {
			StoreCommand::ReplaceAll(orders) => Ok(StoreEvent::Replaced {
				count: self.replace_all(orders),
			}),
			StoreCommand::Insert(order) => {
				let order_id = order.id.clone();
				self.insert(order)?;
				Ok(StoreEvent::Inserted { order_id })
			},
			StoreCommand::Update(order) => {
				let order_id = order.id.clone();
				self.update(order)?;
				Ok(StoreEvent::Updated { order_id })
			},
			StoreCommand::Remove(order_id) => {
				self.remove(&order_id)?;
				Ok(StoreEvent::Removed { order_id })
			},
			StoreCommand::SetStatus { id, status, policy } => {
				let from = self.set_status(&id, status, policy)?;
				Ok(StoreEvent::StatusChanged {
					order_id: id,
					from,
					to: status,
				})
			},
			StoreCommand::Select(order_id) => {
				self.select(order_id.as_deref())?;
				Ok(StoreEvent::SelectionChanged { order_id })
			},
			StoreCommand::SetFilter(filter) => {
				self.set_filter(filter);
				Ok(StoreEvent::ViewChanged)
			},
			StoreCommand::SetPagination { page, limit } => {
				self.set_page(page, limit);
				Ok(StoreEvent::ViewChanged)
			},
			StoreCommand::SetLoading(loading) => {
				self.set_loading(loading);
				Ok(StoreEvent::LoadingChanged { loading })
			},
			StoreCommand::SetError(message) => {
				self.set_error(message.clone());
				Ok(StoreEvent::ErrorChanged { message })
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::store::tests::order;

	#[test]
	fn test_commands_report_events() {
		let mut store = OrderStore::new();

		let event = store
			.apply(StoreCommand::ReplaceAll(vec![
				order("A", "Ana", OrderStatus::Pending, 10),
				order("B", "Ben", OrderStatus::Processing, 20),
			]))
			.unwrap();
		assert_eq!(event, StoreEvent::Replaced { count: 2 });

		let event = store
			.apply(StoreCommand::SetStatus {
				id: "B".to_string(),
				status: OrderStatus::Shipped,
				policy: TransitionPolicy::Strict,
			})
			.unwrap();
		assert_eq!(
			event,
			StoreEvent::StatusChanged {
				order_id: "B".to_string(),
				from: OrderStatus::Processing,
				to: OrderStatus::Shipped,
			}
		);

		let event = store.apply(StoreCommand::Remove("A".to_string())).unwrap();
		assert_eq!(
			event,
			StoreEvent::Removed {
				order_id: "A".to_string()
			}
		);
		assert_eq!(store.len(), 1);
	}

	#[test]
	fn test_failed_command_changes_nothing() {
		let mut store = OrderStore::new();
		store
			.apply(StoreCommand::Insert(order("A", "Ana", OrderStatus::Pending, 10)))
			.unwrap();

		let result = store.apply(StoreCommand::Select(Some("missing".to_string())));
		assert_eq!(result, Err(StoreError::NotFound("missing".to_string())));
		assert!(store.selected().is_none());

		let result = store.apply(StoreCommand::Insert(order("A", "Ana", OrderStatus::Pending, 10)));
		assert!(matches!(result, Err(StoreError::DuplicateId(_))));
		assert_eq!(store.len(), 1);
	}

	#[test]
	fn test_view_commands() {
		let mut store = OrderStore::new();
		store
			.apply(StoreCommand::SetPagination { page: 4, limit: 0 })
			.unwrap();
		assert_eq!(store.pagination().page, 4);
		assert_eq!(store.pagination().limit, 1);

		let event = store
			.apply(StoreCommand::SetFilter(FilterCriteria::default()))
			.unwrap();
		assert_eq!(event, StoreEvent::ViewChanged);
		assert_eq!(store.pagination().page, 1);
	}
}
