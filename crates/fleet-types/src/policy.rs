//! Behavioural switches of the engine that are chosen through configuration.

use serde::{Deserialize, Serialize};

/// How status changes are checked before they are applied.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPolicy {
	/// Any status may be set to any other status.
	#[default]
	Permissive,
	/// Only the recommended lifecycle transitions are accepted.
	Strict,
}

/// Which `fetch_all` response wins when several are in flight.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FetchArbitration {
	/// Responses of superseded requests are discarded.
	#[default]
	LastIssued,
	/// Every response is applied in arrival order, so the slowest one wins.
	LastArrived,
}
