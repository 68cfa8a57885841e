//! Registry trait for self-registering backend implementations.

/// Implemented by the `Registry` marker of every backend module.
///
/// `NAME` is the key used under `implementations` in the configuration file,
/// for example `memory` for `[storage.implementations.memory]`.
pub trait ImplementationRegistry {
	const NAME: &'static str;

	/// Factory signature of the backend family (storage, auth, orders).
	type Factory;

	fn factory() -> Self::Factory;
}
