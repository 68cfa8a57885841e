//! HTTP backend for the authentication API.
//!
//! Endpoints (relative to `base_url`, all `POST` with JSON bodies):
//! - `login_path` (default `/auth/login`): `{"username", "password"}`
//! - `refresh_path` (default `/auth/refresh`): `{"refresh_token"}`
//! - `logout_path` (default `/auth/logout`): empty body, bearer token
//!
//! 4xx answers are rejections, 5xx answers and I/O failures are network errors.

use crate::{AuthError, AuthFactory, AuthInterface, AuthRegistry};
use async_trait::async_trait;
use pos_types::{
	ConfigSchema, Credentials, Field, FieldType, ImplementationRegistry, LoginResponse,
	RefreshResponse, Schema, SecretString, ValidationError,
};
use serde::de::DeserializeOwned;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Endpoint paths of the auth API.
#[derive(Debug, Clone)]
pub struct AuthEndpoints {
	pub login: String,
	pub refresh: String,
	pub logout: String,
}

impl Default for AuthEndpoints {
	fn default() -> Self {
		Self {
			login: "/auth/login".to_string(),
			refresh: "/auth/refresh".to_string(),
			logout: "/auth/logout".to_string(),
		}
	}
}

/// Auth API client speaking JSON over HTTP.
pub struct HttpAuth {
	client: reqwest::Client,
	base_url: String,
	endpoints: AuthEndpoints,
}

impl HttpAuth {
	pub fn new(
		base_url: impl Into<String>,
		endpoints: AuthEndpoints,
		timeout: Duration,
	) -> Result<Self, AuthError> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| AuthError::Configuration(e.to_string()))?;

		Ok(Self {
			client,
			base_url: base_url.into().trim_end_matches('/').to_string(),
			endpoints,
		})
	}

	fn url(&self, path: &str) -> String {
		format!("{}/{}", self.base_url, path.trim_start_matches('/'))
	}

	/// Checks the status code and hands back the response for decoding.
	async fn check(response: reqwest::Response) -> Result<reqwest::Response, AuthError> {
		let status = response.status();
		if status.is_success() {
			return Ok(response);
		}

		let body = response.text().await.unwrap_or_default();
		if status.is_server_error() {
			Err(AuthError::Network(format!("{}: {}", status, body)))
		} else {
			Err(AuthError::Rejected(format!("{}: {}", status, body)))
		}
	}

	async fn post_json<T: DeserializeOwned>(
		&self,
		path: &str,
		body: serde_json::Value,
	) -> Result<T, AuthError> {
		let response = self
			.client
			.post(self.url(path))
			.json(&body)
			.send()
			.await
			.map_err(|e| AuthError::Network(e.to_string()))?;

		Self::check(response)
			.await?
			.json::<T>()
			.await
			.map_err(|e| AuthError::InvalidResponse(e.to_string()))
	}
}

#[async_trait]
impl AuthInterface for HttpAuth {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(HttpAuthSchema)
	}

	async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, AuthError> {
		self.post_json(
			&self.endpoints.login,
			serde_json::json!({
				"username": credentials.username,
				"password": credentials.password.expose_secret(),
			}),
		)
		.await
	}

	async fn refresh_token(
		&self,
		refresh_token: &SecretString,
	) -> Result<RefreshResponse, AuthError> {
		self.post_json(
			&self.endpoints.refresh,
			serde_json::json!({ "refresh_token": refresh_token.expose_secret() }),
		)
		.await
	}

	async fn logout(&self, access_token: &SecretString) -> Result<(), AuthError> {
		let response = self
			.client
			.post(self.url(&self.endpoints.logout))
			.bearer_auth(access_token.expose_secret())
			.send()
			.await
			.map_err(|e| AuthError::Network(e.to_string()))?;

		Self::check(response).await.map(|_| ())
	}
}

fn path_field(name: &str) -> Field {
	Field::new(name, FieldType::String).with_validator(|value| match value.as_str() {
		Some(path) if path.starts_with('/') => Ok(()),
		_ => Err("path must start with '/'".to_string()),
	})
}

/// Configuration schema for [`HttpAuth`].
pub struct HttpAuthSchema;

impl ConfigSchema for HttpAuthSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![
				Field::new("base_url", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some(url) if url.starts_with("http://") || url.starts_with("https://") => {
							Ok(())
						},
						_ => Err("base_url must start with http:// or https://".to_string()),
					}
				}),
			],
			vec![
				Field::new(
					"timeout_seconds",
					FieldType::Integer {
						min: Some(1),
						max: Some(300),
					},
				),
				path_field("login_path"),
				path_field("refresh_path"),
				path_field("logout_path"),
			],
		);
		schema.validate(config)
	}
}

/// Creates the HTTP auth backend.
///
/// Configuration parameters:
/// - `base_url`: API root (required)
/// - `timeout_seconds`: request timeout (default: 30)
/// - `login_path`, `refresh_path`, `logout_path`: endpoint overrides
pub fn create_auth(config: &toml::Value) -> Result<Box<dyn AuthInterface>, AuthError> {
	HttpAuthSchema
		.validate(config)
		.map_err(|e| AuthError::Configuration(e.to_string()))?;

	let base_url = config
		.get("base_url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| AuthError::Configuration("base_url is required".into()))?;
	let timeout = config
		.get("timeout_seconds")
		.and_then(|v| v.as_integer())
		.map(|v| v as u64)
		.unwrap_or(DEFAULT_TIMEOUT_SECONDS);

	let mut endpoints = AuthEndpoints::default();
	let path = |key: &str| config.get(key).and_then(|v| v.as_str()).map(str::to_string);
	if let Some(login) = path("login_path") {
		endpoints.login = login;
	}
	if let Some(refresh) = path("refresh_path") {
		endpoints.refresh = refresh;
	}
	if let Some(logout) = path("logout_path") {
		endpoints.logout = logout;
	}

	Ok(Box::new(HttpAuth::new(
		base_url,
		endpoints,
		Duration::from_secs(timeout),
	)?))
}

/// Registry for the HTTP auth backend.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "http";
	type Factory = AuthFactory;

	fn factory() -> Self::Factory {
		create_auth
	}
}

impl AuthRegistry for Registry {}
