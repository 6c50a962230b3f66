//! Registry trait for self-registering implementations.

/// Base trait for implementation registries.
///
/// Each pluggable module (storage, backend) provides a `Registry` struct that
/// declares the name used in configuration files and the factory creating
/// the implementation from its TOML table.
pub trait ImplementationRegistry {
	/// The name used in configuration files, e.g. "memory" for
	/// `storage.implementations.memory`.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Get the factory function for this implementation.
	fn factory() -> Self::Factory;
}
