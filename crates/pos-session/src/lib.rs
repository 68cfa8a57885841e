//! Session lifecycle for posdesk.
//!
//! [`SessionManager`] owns the session: it restores it from the
//! [`SessionStore`] at startup, renews it through the auth transport, tears
//! it down on failure and publishes every change on a watch channel. Other
//! components only ever read snapshots.

use pos_storage::StorageError;
use thiserror::Error;

pub mod manager;
pub mod navigator;
pub mod store;

pub use manager::SessionManager;
pub use navigator::{LogNavigator, Navigator};
pub use store::SessionStore;

/// Reasons an authentication check or login can fail.
///
/// Check failures never escape the manager; they are logged and converge to
/// the unauthenticated state. Login failures are also returned to the caller.
#[derive(Debug, Error)]
pub enum SessionError {
	/// Neither an access token nor a refresh token is stored.
	#[error("No credentials found")]
	NoCredentials,
	/// The refresh call was rejected or returned no usable token.
	#[error("Token refresh failed: {0}")]
	RefreshFailed(String),
	/// A token is available but no user profile is.
	#[error("User profile not found")]
	ProfileMissing,
	/// The auth backend could not be reached.
	#[error("Transport error: {0}")]
	Transport(String),
	/// The login endpoint refused the credentials.
	#[error("Login rejected: {0}")]
	LoginRejected(String),
	#[error("Storage error: {0}")]
	Storage(#[from] StorageError),
}
