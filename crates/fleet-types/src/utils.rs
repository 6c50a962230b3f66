//! Small helpers shared across crates.

use chrono::{DateTime, Utc};

/// Shortens an identifier for log output.
///
/// Ids up to 12 characters are returned unchanged, longer ids keep their
/// first 8 characters followed by "..".
pub fn truncate_id(id: &str) -> String {
	if id.chars().count() <= 12 {
		id.to_string()
	} else {
		let head: String = id.chars().take(8).collect();
		format!("{}..", head)
	}
}

/// Current wall clock time.
pub fn now() -> DateTime<Utc> {
	Utc::now()
}
