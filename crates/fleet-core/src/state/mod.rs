//! Status transition rules for orders.
//!
//! Status changes are applied by the order store; this module decides which
//! changes a given [`fleet_types::TransitionPolicy`] accepts.

pub mod transition;

pub use transition::{is_allowed, is_recommended_transition, recommended_next};
