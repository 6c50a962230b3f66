//! Event types for change notification.
//!
//! The engine publishes an event for every store mutation and every request
//! transition so that presentation code can react to changes without polling
//! the store.

use crate::OrderStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Main event type encompassing all engine events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum FleetEvent {
	/// Events describing a change of the order store.
	Store(StoreEvent),
	/// Events describing the progress of backend round trips.
	Request(RequestEvent),
}

/// Changes applied to the order store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum StoreEvent {
	/// The whole collection was overwritten.
	Replaced { count: usize },
	/// An order was prepended.
	Inserted { order_id: String },
	/// An order was replaced by a newer version.
	Updated { order_id: String },
	/// Only the status of an order changed.
	StatusChanged {
		order_id: String,
		from: OrderStatus,
		to: OrderStatus,
	},
	/// An order was deleted.
	Removed { order_id: String },
	/// The selected order changed.
	SelectionChanged { order_id: Option<String> },
	/// Filter criteria or pagination changed.
	ViewChanged,
	/// The loading flag flipped.
	LoadingChanged { loading: bool },
	/// The last error was set or cleared.
	ErrorChanged { message: Option<String> },
}

/// Backend operations performed by the orchestrator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Operation {
	FetchAll,
	Create,
	Update,
	Delete,
}

impl fmt::Display for Operation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Operation::FetchAll => "fetch_all",
			Operation::Create => "create",
			Operation::Update => "update",
			Operation::Delete => "delete",
		};
		f.write_str(name)
	}
}

/// Lifecycle of a single backend round trip.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum RequestEvent {
	/// The request was issued and is pending.
	Started { request_id: u64, operation: Operation },
	/// The backend answered successfully and the result was applied.
	Fulfilled { request_id: u64, operation: Operation },
	/// The backend failed.
	Rejected {
		request_id: u64,
		operation: Operation,
		error: String,
	},
	/// The response arrived after a newer request was issued and was dropped.
	Discarded { request_id: u64, operation: Operation },
}
