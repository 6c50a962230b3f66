//! Request identifiers for backend round trips.
//!
//! Every operation the orchestrator sends is issued a ticket with a
//! monotonically increasing id. For `fetch_all` the tracker also remembers the
//! newest id issued, so a response can be recognised as stale when it arrives.

use fleet_types::Operation;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Handle for one in-flight backend request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket {
	pub id: u64,
	pub operation: Operation,
}

/// Issues tickets and tracks how many are outstanding.
#[derive(Debug, Default)]
pub struct RequestTracker {
	next_id: AtomicU64,
	latest_fetch: AtomicU64,
	in_flight: AtomicUsize,
}

impl RequestTracker {
	pub fn new() -> Self {
		Self::default()
	}

	/// Issues a new ticket. Ids start at 1.
	pub fn issue(&self, operation: Operation) -> RequestTicket {
		let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
		if operation == Operation::FetchAll {
			self.latest_fetch.fetch_max(id, Ordering::SeqCst);
		}
		self.in_flight.fetch_add(1, Ordering::SeqCst);
		RequestTicket { id, operation }
	}

	/// Marks a ticket as answered and returns the number still outstanding.
	pub fn finish(&self, _ticket: &RequestTicket) -> usize {
		let previous = self
			.in_flight
			.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)))
			.unwrap_or(0);
		previous.saturating_sub(1)
	}

	/// True when no `fetch_all` was issued after this one.
	pub fn is_current_fetch(&self, ticket: &RequestTicket) -> bool {
		ticket.id >= self.latest_fetch.load(Ordering::SeqCst)
	}

	pub fn in_flight(&self) -> usize {
		self.in_flight.load(Ordering::SeqCst)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_ids_increase() {
		let tracker = RequestTracker::new();
		let a = tracker.issue(Operation::FetchAll);
		let b = tracker.issue(Operation::Create);
		let c = tracker.issue(Operation::FetchAll);
		assert!(a.id < b.id && b.id < c.id);
		assert_eq!(tracker.in_flight(), 3);
	}

	#[test]
	fn test_only_newest_fetch_is_current() {
		let tracker = RequestTracker::new();
		let first = tracker.issue(Operation::FetchAll);
		let second = tracker.issue(Operation::FetchAll);
		let update = tracker.issue(Operation::Update);

		assert!(!tracker.is_current_fetch(&first));
		assert!(tracker.is_current_fetch(&second));
		// Other operations do not supersede a fetch
		assert!(update.id > second.id);
		assert!(tracker.is_current_fetch(&second));
	}

	#[test]
	fn test_finish_counts_down() {
		let tracker = RequestTracker::new();
		let a = tracker.issue(Operation::FetchAll);
		let b = tracker.issue(Operation::Delete);
		assert_eq!(tracker.finish(&a), 1);
		assert_eq!(tracker.finish(&b), 0);
		assert_eq!(tracker.finish(&b), 0);
	}
}
