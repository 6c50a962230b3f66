//! Change notification channel.
//!
//! Presentation code subscribes here instead of polling the store. Events
//! published while nobody is subscribed are dropped.

use fleet_types::FleetEvent;
use tokio::sync::broadcast;

/// Broadcast channel carrying [`FleetEvent`]s to any number of subscribers.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<FleetEvent>,
}

impl EventBus {
	/// Creates a bus that buffers up to `capacity` events per slow subscriber.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity.max(1));
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<FleetEvent> {
		self.sender.subscribe()
	}

	/// Sends an event to all current subscribers.
	///
	/// Fails only when there are no subscribers.
	pub fn publish(
		&self,
		event: FleetEvent,
	) -> Result<usize, broadcast::error::SendError<FleetEvent>> {
		self.sender.send(event)
	}

	pub fn subscriber_count(&self) -> usize {
		self.sender.receiver_count()
	}
}
