//! HTTP backend for the remote order-mutation API.
//!
//! Sends `PATCH {base_url}/orders/{id}/status` with a bearer token and a JSON
//! body `{"status": "<WIRE VALUE>"}`.

use crate::{OrderError, OrderFactory, OrderMutationInterface, OrderRegistry};
use async_trait::async_trait;
use pos_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, OrderStatus, Schema, SecretString,
	ValidationError,
};
use reqwest::StatusCode;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Order API client speaking JSON over HTTP.
pub struct HttpOrderApi {
	client: reqwest::Client,
	base_url: String,
}

impl HttpOrderApi {
	pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, OrderError> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| OrderError::Configuration(e.to_string()))?;

		Ok(Self {
			client,
			base_url: base_url.into().trim_end_matches('/').to_string(),
		})
	}

	fn status_url(&self, order_id: &str) -> String {
		format!("{}/orders/{}/status", self.base_url, order_id)
	}
}

#[async_trait]
impl OrderMutationInterface for HttpOrderApi {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(HttpOrderApiSchema)
	}

	async fn update_status(
		&self,
		order_id: &str,
		status: OrderStatus,
		access_token: &SecretString,
	) -> Result<(), OrderError> {
		let response = self
			.client
			.patch(self.status_url(order_id))
			.bearer_auth(access_token.expose_secret())
			.json(&serde_json::json!({ "status": status }))
			.send()
			.await
			.map_err(|e| OrderError::Network(e.to_string()))?;

		match response.status() {
			status if status.is_success() => Ok(()),
			StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(OrderError::Unauthorized),
			StatusCode::NOT_FOUND => Err(OrderError::NotFound(order_id.to_string())),
			status => {
				let body = response.text().await.unwrap_or_default();
				Err(OrderError::Rejected(format!("{}: {}", status, body)))
			},
		}
	}
}

/// Configuration schema for [`HttpOrderApi`].
pub struct HttpOrderApiSchema;

impl ConfigSchema for HttpOrderApiSchema {
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
			vec![Field::new(
				"timeout_seconds",
				FieldType::Integer {
					min: Some(1),
					max: Some(300),
				},
			)],
		);
		schema.validate(config)
	}
}

/// Creates the HTTP order backend.
///
/// Configuration parameters:
/// - `base_url`: API root, e.g. "http://localhost:8000/api" (required)
/// - `timeout_seconds`: request timeout (default: 30)
pub fn create_order_api(
	config: &toml::Value,
) -> Result<Box<dyn OrderMutationInterface>, OrderError> {
	HttpOrderApiSchema
		.validate(config)
		.map_err(|e| OrderError::Configuration(e.to_string()))?;

	let base_url = config
		.get("base_url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| OrderError::Configuration("base_url is required".into()))?;
	let timeout = config
		.get("timeout_seconds")
		.and_then(|v| v.as_integer())
		.map(|v| v as u64)
		.unwrap_or(DEFAULT_TIMEOUT_SECONDS);

	Ok(Box::new(HttpOrderApi::new(
		base_url,
		Duration::from_secs(timeout),
	)?))
}

/// Registry for the HTTP order backend.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "http";
	type Factory = OrderFactory;

	fn factory() -> Self::Factory {
		create_order_api
	}
}

impl OrderRegistry for Registry {}
