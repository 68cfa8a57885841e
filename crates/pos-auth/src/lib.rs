//! Authentication transport for posdesk.
//!
//! Defines the calls the session manager makes against the authentication
//! backend (login, token refresh, logout) and a service wrapper around the
//! configured implementation.

use async_trait::async_trait;
use pos_types::{
	ConfigSchema, Credentials, ImplementationRegistry, LoginResponse, RefreshResponse,
	SecretString,
};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod http;
}

/// Errors that can occur during authentication calls.
#[derive(Debug, Error)]
pub enum AuthError {
	/// The backend refused the credentials or token.
	#[error("Rejected: {0}")]
	Rejected(String),
	/// The request did not complete.
	#[error("Network error: {0}")]
	Network(String),
	/// The backend answered with something that could not be decoded.
	#[error("Invalid response: {0}")]
	InvalidResponse(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Interface of an authentication backend.
#[async_trait]
pub trait AuthInterface: Send + Sync {
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Exchanges credentials for tokens and the user profile.
	async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, AuthError>;

	/// Exchanges a refresh token for a new access token.
	async fn refresh_token(&self, refresh_token: &SecretString)
		-> Result<RefreshResponse, AuthError>;

	/// Invalidates the access token on the backend.
	async fn logout(&self, access_token: &SecretString) -> Result<(), AuthError>;
}

/// Signature of the auth backend factory functions.
pub type AuthFactory = fn(&toml::Value) -> Result<Box<dyn AuthInterface>, AuthError>;

/// Marker for registries that produce auth backends.
pub trait AuthRegistry: ImplementationRegistry<Factory = AuthFactory> {}

/// Returns `(name, factory)` for every auth backend.
pub fn get_all_implementations() -> Vec<(&'static str, AuthFactory)> {
	use implementations::http;

	vec![(http::Registry::NAME, http::Registry::factory())]
}

/// Service that forwards auth calls to the configured implementation.
pub struct AuthService {
	implementation: Box<dyn AuthInterface>,
}

impl AuthService {
	/// Creates a new AuthService wrapping the given backend.
	pub fn new(implementation: Box<dyn AuthInterface>) -> Self {
		Self { implementation }
	}

	/// Exchanges credentials for tokens and a user profile.
	pub async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, AuthError> {
		tracing::debug!(username = %credentials.username, "Logging in");
		self.implementation.login(credentials).await
	}

	/// Trades a refresh token for a new access token.
	pub async fn refresh_token(
		&self,
		refresh_token: &SecretString,
	) -> Result<RefreshResponse, AuthError> {
		tracing::debug!("Refreshing access token");
		self.implementation.refresh_token(refresh_token).await
	}

	/// Invalidates the access token on the backend.
	pub async fn logout(&self, access_token: &SecretString) -> Result<(), AuthError> {
		self.implementation.logout(access_token).await
	}
}
