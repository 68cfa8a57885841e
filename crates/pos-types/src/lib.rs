//! Shared types for the posdesk workspace.
//!
//! Order status vocabularies, session types, persisted keys, secrets and the
//! configuration schema machinery used by every backend.

/// Order status vocabularies and their display metadata.
pub mod order;
/// Registry trait for backend implementations.
pub mod registry;
/// Redacting secret wrapper for tokens and passwords.
pub mod secret_string;
/// Session, credentials and auth transport payloads.
pub mod session;
/// Persisted session keys.
pub mod storage;
/// Backend configuration validation.
pub mod validation;

pub use order::*;
pub use registry::ImplementationRegistry;
pub use secret_string::SecretString;
pub use session::*;
pub use storage::*;
pub use validation::*;
