//! Order engine that orchestrates the store, the backend and the cache.
//!
//! The [`OrderEngine`] is the single writer of the order store. Remote
//! operations follow `Idle -> Pending -> {Fulfilled | Rejected} -> Idle`:
//! the loading flag is raised when a request is issued and lowered once no
//! request is outstanding, and the last error is cleared on issue and set
//! verbatim from the backend on failure. The local store is changed only after
//! the backend confirmed the operation.
//!
//! Every request carries a [`RequestTicket`]. Under
//! [`FetchArbitration::LastIssued`] a `fetch_all` response is applied only if
//! no newer `fetch_all` was issued in the meantime.

pub mod event_bus;
pub mod request;

use crate::aggregate::{self, StatusCounts};
use crate::persistence::{SnapshotPersistence, VersionedSnapshot};
use crate::query;
use crate::state;
use crate::store::{OrderStore, StoreCommand, StoreError};
use event_bus::EventBus;
use fleet_backend::{BackendError, BackendService};
use fleet_types::{
	truncate_id, DraftError, FetchArbitration, FilterCriteria, FleetEvent, Operation, Order,
	OrderDraft, OrderPatch, OrderStatus, Page, PaginationState, RequestEvent, StoreEvent,
	TransitionPolicy,
};
use request::{RequestTicket, RequestTracker};
use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};
use tracing::instrument;

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
	/// Backend failure, message kept verbatim.
	#[error("{0}")]
	Backend(String),
	#[error(transparent)]
	Store(#[from] StoreError),
	#[error("Invalid order draft: {0}")]
	InvalidDraft(#[from] DraftError),
	#[error("Storage error: {0}")]
	Storage(String),
}

/// Result of completing a `fetch_all` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
	/// The response replaced the store with this many orders.
	Applied(usize),
	/// A newer fetch was issued; the response was dropped.
	Discarded,
}

/// Behaviour switches of an engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineOptions {
	pub transition_policy: TransitionPolicy,
	pub fetch_arbitration: FetchArbitration,
	/// Initial pagination of the store.
	pub pagination: PaginationState,
}

/// Single writer of the order store.
#[derive(Clone)]
pub struct OrderEngine {
	/// Identifier used in logs.
	id: String,
	backend: Arc<BackendService>,
	store: Arc<RwLock<OrderStore>>,
	/// Durable cache, if enabled.
	persistence: Option<Arc<SnapshotPersistence>>,
	event_bus: EventBus,
	requests: Arc<RequestTracker>,
	options: EngineOptions,
}

impl OrderEngine {
	pub fn new(
		id: impl Into<String>,
		backend: Arc<BackendService>,
		persistence: Option<Arc<SnapshotPersistence>>,
		event_bus: EventBus,
		options: EngineOptions,
	) -> Self {
		Self {
			id: id.into(),
			backend,
			store: Arc::new(RwLock::new(OrderStore::with_pagination(options.pagination))),
			persistence,
			event_bus,
			requests: Arc::new(RequestTracker::new()),
			options,
		}
	}

	pub fn id(&self) -> &str {
		&self.id
	}

	pub fn options(&self) -> &EngineOptions {
		&self.options
	}

	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}

	/// Subscribes to store and request events.
	pub fn subscribe(&self) -> broadcast::Receiver<FleetEvent> {
		self.event_bus.subscribe()
	}

	// Reads

	pub async fn orders(&self) -> Vec<Order> {
		self.store.read().await.orders().to_vec()
	}

	pub async fn get(&self, id: &str) -> Option<Order> {
		self.store.read().await.get(id).cloned()
	}

	pub async fn len(&self) -> usize {
		self.store.read().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.store.read().await.is_empty()
	}

	pub async fn is_loading(&self) -> bool {
		self.store.read().await.is_loading()
	}

	pub async fn last_error(&self) -> Option<String> {
		self.store.read().await.last_error().map(str::to_string)
	}

	pub async fn selected(&self) -> Option<Order> {
		self.store.read().await.selected().cloned()
	}

	pub async fn filter(&self) -> FilterCriteria {
		self.store.read().await.filter().clone()
	}

	pub async fn pagination(&self) -> PaginationState {
		*self.store.read().await.pagination()
	}

	/// Derives a page for arbitrary criteria without touching the view state.
	pub async fn view(&self, criteria: &FilterCriteria, pagination: &PaginationState) -> Page {
		let store = self.store.read().await;
		query::view(store.orders(), criteria, pagination)
	}

	/// Derives the page described by the stored filter and pagination.
	pub async fn current_view(&self) -> Page {
		let store = self.store.read().await;
		query::view(store.orders(), store.filter(), store.pagination())
	}

	pub async fn counts(&self) -> StatusCounts {
		aggregate::counts_by_status(self.store.read().await.orders())
	}

	/// Recognized revenue over the whole store.
	pub async fn revenue(&self) -> Decimal {
		aggregate::total_revenue(self.store.read().await.orders())
	}

	/// Recommended next statuses of a resident order.
	pub async fn recommended_next(&self, id: &str) -> Result<Vec<OrderStatus>, EngineError> {
		let store = self.store.read().await;
		let order = store
			.get(id)
			.ok_or_else(|| StoreError::NotFound(id.to_string()))?;
		Ok(state::recommended_next(order.status))
	}

	// Local writes

	pub async fn select(&self, id: Option<&str>) -> Result<(), EngineError> {
		let snapshot = {
			let mut store = self.store.write().await;
			self.dispatch(&mut store, StoreCommand::Select(id.map(str::to_string)))?;
			self.capture(&store)
		};
		self.persist(snapshot).await;
		Ok(())
	}

	pub async fn set_filter(&self, criteria: FilterCriteria) -> Result<(), EngineError> {
		let snapshot = {
			let mut store = self.store.write().await;
			self.dispatch(&mut store, StoreCommand::SetFilter(criteria))?;
			self.capture(&store)
		};
		self.persist(snapshot).await;
		Ok(())
	}

	pub async fn set_page(&self, page: u32, limit: u32) -> Result<(), EngineError> {
		let snapshot = {
			let mut store = self.store.write().await;
			self.dispatch(&mut store, StoreCommand::SetPagination { page, limit })?;
			self.capture(&store)
		};
		self.persist(snapshot).await;
		Ok(())
	}

	/// Changes the status of a resident order without contacting the backend.
	#[instrument(skip_all, fields(order_id = %truncate_id(id), status = %status))]
	pub async fn set_status(&self, id: &str, status: OrderStatus) -> Result<(), EngineError> {
		let snapshot = {
			let mut store = self.store.write().await;
			self.dispatch(
				&mut store,
				StoreCommand::SetStatus {
					id: id.to_string(),
					status,
					policy: self.options.transition_policy,
				},
			)?;
			self.capture(&store)
		};
		self.persist(snapshot).await;
		Ok(())
	}

	// Remote operations

	/// Loads every order from the backend and replaces the store.
	#[instrument(skip_all, fields(engine = %self.id))]
	pub async fn fetch_all(&self) -> Result<FetchOutcome, EngineError> {
		let ticket = self.begin_fetch().await;
		let result = self.backend.fetch_all().await;
		self.complete_fetch(ticket, result).await
	}

	/// Issues a `fetch_all` ticket and enters the pending state.
	///
	/// Together with [`OrderEngine::complete_fetch`] this allows a caller to
	/// drive the backend round trip itself.
	pub async fn begin_fetch(&self) -> RequestTicket {
		self.begin(Operation::FetchAll).await
	}

	/// Applies (or discards) the response of a `fetch_all` round trip.
	///
	/// A stale response is dropped whether it succeeded or failed, so it can
	/// neither overwrite newer data nor report an outdated error.
	pub async fn complete_fetch(
		&self,
		ticket: RequestTicket,
		result: Result<Vec<Order>, BackendError>,
	) -> Result<FetchOutcome, EngineError> {
		let stale = self.options.fetch_arbitration == FetchArbitration::LastIssued
			&& !self.requests.is_current_fetch(&ticket);

		let (count, snapshot) = {
			let mut store = self.store.write().await;
			if stale {
				let remaining = self.requests.finish(&ticket);
				self.mark_loading(&mut store, remaining > 0);
				self.publish_request(RequestEvent::Discarded {
					request_id: ticket.id,
					operation: ticket.operation,
				});
				tracing::debug!(request_id = ticket.id, "Discarded stale fetch response");
				return Ok(FetchOutcome::Discarded);
			}

			let orders = match result {
				Ok(orders) => orders,
				Err(e) => return Err(self.fail(&mut store, &ticket, e)),
			};
			let applied = self.dispatch(&mut store, StoreCommand::ReplaceAll(orders));
			self.succeed(&mut store, &ticket);
			applied?;
			let count = store.len();
			tracing::info!(request_id = ticket.id, count, "Fetched orders");
			(count, self.capture(&store))
		};

		self.persist(snapshot).await;
		Ok(FetchOutcome::Applied(count))
	}

	/// Sends a draft to the backend and inserts the returned order.
	#[instrument(skip_all, fields(engine = %self.id))]
	pub async fn create_remote(&self, draft: OrderDraft) -> Result<Order, EngineError> {
		draft.validate()?;

		let ticket = self.begin(Operation::Create).await;
		let result = self.backend.create(draft).await;

		let (order, snapshot) = {
			let mut store = self.store.write().await;
			let order = match result {
				Ok(order) => order,
				Err(e) => return Err(self.fail(&mut store, &ticket, e)),
			};

			// A concurrent fetch may already have brought the new order in
			let command = if store.contains(&order.id) {
				StoreCommand::Update(order.clone())
			} else {
				StoreCommand::Insert(order.clone())
			};
			let applied = self.dispatch(&mut store, command);
			self.succeed(&mut store, &ticket);
			applied?;
			tracing::info!(order_id = %truncate_id(&order.id), "Created order");
			(order, self.capture(&store))
		};

		self.persist(snapshot).await;
		Ok(order)
	}

	/// Sends a partial update and replaces the local record with the result.
	#[instrument(skip_all, fields(order_id = %truncate_id(id)))]
	pub async fn update_remote(&self, id: &str, patch: OrderPatch) -> Result<Order, EngineError> {
		let ticket = self.begin(Operation::Update).await;
		let result = self.backend.update(id, patch).await;

		let (order, snapshot) = {
			let mut store = self.store.write().await;
			let order = match result {
				Ok(order) => order,
				Err(e) => return Err(self.fail(&mut store, &ticket, e)),
			};

			let applied = self.dispatch(&mut store, StoreCommand::Update(order.clone()));
			self.succeed(&mut store, &ticket);
			match applied {
				Ok(()) => {},
				Err(StoreError::NotFound(_)) => {
					tracing::warn!("Updated order is no longer in the local store");
				},
				Err(e) => return Err(e.into()),
			}
			(order, self.capture(&store))
		};

		self.persist(snapshot).await;
		Ok(order)
	}

	/// Deletes an order on the backend, then locally.
	///
	/// A failed delete leaves the local record in place.
	#[instrument(skip_all, fields(order_id = %truncate_id(id)))]
	pub async fn delete_remote(&self, id: &str) -> Result<(), EngineError> {
		let ticket = self.begin(Operation::Delete).await;
		let result = self.backend.delete(id).await;

		let snapshot = {
			let mut store = self.store.write().await;
			if let Err(e) = result {
				return Err(self.fail(&mut store, &ticket, e));
			}

			let applied = self.dispatch(&mut store, StoreCommand::Remove(id.to_string()));
			self.succeed(&mut store, &ticket);
			match applied {
				Ok(()) => {},
				Err(StoreError::NotFound(_)) => {
					tracing::warn!("Deleted order was not in the local store");
				},
				Err(e) => return Err(e.into()),
			}
			tracing::info!("Deleted order");
			self.capture(&store)
		};

		self.persist(snapshot).await;
		Ok(())
	}

	/// Changes the status of an order through the backend.
	///
	/// The transition policy is checked against the resident record before
	/// anything is sent.
	#[instrument(skip_all, fields(order_id = %truncate_id(id), status = %status))]
	pub async fn change_status(&self, id: &str, status: OrderStatus) -> Result<Order, EngineError> {
		{
			let store = self.store.read().await;
			let current = store
				.get(id)
				.ok_or_else(|| StoreError::NotFound(id.to_string()))?;
			if !state::is_allowed(self.options.transition_policy, current.status, status) {
				return Err(StoreError::InvalidTransition {
					id: id.to_string(),
					from: current.status,
					to: status,
				}
				.into());
			}
		}
		self.update_remote(id, OrderPatch::status(status)).await
	}

	// Persistence

	/// Loads the persisted snapshot into the store.
	///
	/// Returns the number of restored orders, or `None` when persistence is
	/// disabled or nothing was saved yet.
	pub async fn restore(&self) -> Result<Option<usize>, EngineError> {
		let Some(persistence) = &self.persistence else {
			return Ok(None);
		};
		let Some(persisted) = persistence
			.load()
			.await
			.map_err(|e| EngineError::Storage(e.to_string()))?
		else {
			return Ok(None);
		};

		let mut store = self.store.write().await;
		let count = store.restore(persisted.store);
		self.publish(StoreEvent::Replaced { count });
		tracing::info!(count, saved_at = %persisted.saved_at, "Restored order snapshot");
		Ok(Some(count))
	}

	/// Stamps the current store state for saving. Called under the store lock.
	fn capture(&self, store: &OrderStore) -> Option<VersionedSnapshot> {
		self.persistence
			.as_ref()
			.map(|persistence| persistence.stamp(store.snapshot()))
	}

	async fn persist(&self, snapshot: Option<VersionedSnapshot>) {
		let (Some(persistence), Some(snapshot)) = (&self.persistence, snapshot) else {
			return;
		};
		if let Err(e) = persistence.save_in_order(snapshot).await {
			tracing::warn!(engine = %self.id, error = %e, "Failed to persist order snapshot");
		}
	}

	// Request lifecycle

	async fn begin(&self, operation: Operation) -> RequestTicket {
		let ticket = self.requests.issue(operation);
		self.publish_request(RequestEvent::Started {
			request_id: ticket.id,
			operation,
		});

		let mut store = self.store.write().await;
		self.mark_loading(&mut store, true);
		self.mark_error(&mut store, None);
		tracing::debug!(request_id = ticket.id, %operation, "Request issued");
		ticket
	}

	fn succeed(&self, store: &mut OrderStore, ticket: &RequestTicket) {
		let remaining = self.requests.finish(ticket);
		self.mark_loading(store, remaining > 0);
		self.publish_request(RequestEvent::Fulfilled {
			request_id: ticket.id,
			operation: ticket.operation,
		});
	}

	fn fail(&self, store: &mut OrderStore, ticket: &RequestTicket, error: BackendError) -> EngineError {
		let message = error.to_string();
		let remaining = self.requests.finish(ticket);
		self.mark_loading(store, remaining > 0);
		self.mark_error(store, Some(message.clone()));
		self.publish_request(RequestEvent::Rejected {
			request_id: ticket.id,
			operation: ticket.operation,
			error: message.clone(),
		});
		tracing::warn!(request_id = ticket.id, operation = %ticket.operation, error = %message, "Request failed");
		EngineError::Backend(message)
	}

	// Store access

	fn dispatch(&self, store: &mut OrderStore, command: StoreCommand) -> Result<(), StoreError> {
		let event = store.apply(command)?;
		self.publish(event);
		Ok(())
	}

	fn mark_loading(&self, store: &mut OrderStore, loading: bool) {
		if store.is_loading() == loading {
			return;
		}
		if let Err(e) = self.dispatch(store, StoreCommand::SetLoading(loading)) {
			tracing::warn!(error = %e, "Failed to update loading flag");
		}
	}

	fn mark_error(&self, store: &mut OrderStore, message: Option<String>) {
		if store.last_error() == message.as_deref() {
			return;
		}
		if let Err(e) = self.dispatch(store, StoreCommand::SetError(message)) {
			tracing::warn!(error = %e, "Failed to update last error");
		}
	}

	fn publish(&self, event: StoreEvent) {
		self.event_bus.publish(FleetEvent::Store(event)).ok();
	}

	fn publish_request(&self, event: RequestEvent) {
		self.event_bus.publish(FleetEvent::Request(event)).ok();
	}
}
