//! Purchase-order status handling for posdesk.
//!
//! The [`status`] module is the policy: which transitions are legal and how
//! each status is displayed. [`OrderStatusService`] is the only path that
//! sends status changes to the remote order API, and it consults the policy
//! before every request so an illegal change never leaves the process.

use async_trait::async_trait;
use pos_types::{ConfigSchema, ImplementationRegistry, OrderStatus, SecretString};
use thiserror::Error;

pub mod status;

pub use status::{
	available_transitions, check_transition, color_of, icon_of, is_valid_transition, label_of,
	status_meta,
};

/// Re-export implementations
pub mod implementations {
	pub mod http;
}

/// Errors that can occur while changing an order's status.
#[derive(Debug, Error)]
pub enum OrderError {
	/// The transition is not in the transition table. Raised locally.
	#[error("Invalid status transition from {from} to {to}")]
	InvalidTransition { from: String, to: String },
	/// The remote API rejected the access token.
	#[error("Unauthorized")]
	Unauthorized,
	#[error("Order not found: {0}")]
	NotFound(String),
	/// The remote API refused the change for another reason.
	#[error("Rejected by remote API: {0}")]
	Rejected(String),
	#[error("Network error: {0}")]
	Network(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Remote order-mutation API.
#[async_trait]
pub trait OrderMutationInterface: Send + Sync {
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Persists a new status for the order on the remote system.
	async fn update_status(
		&self,
		order_id: &str,
		status: OrderStatus,
		access_token: &SecretString,
	) -> Result<(), OrderError>;
}

/// Signature of the order backend factory functions.
pub type OrderFactory = fn(&toml::Value) -> Result<Box<dyn OrderMutationInterface>, OrderError>;

/// Marker for registries that produce order backends.
pub trait OrderRegistry: ImplementationRegistry<Factory = OrderFactory> {}

/// Returns `(name, factory)` for every order backend.
pub fn get_all_implementations() -> Vec<(&'static str, OrderFactory)> {
	use implementations::http;

	vec![(http::Registry::NAME, http::Registry::factory())]
}

/// One requested status change, as issued by a bulk action.
#[derive(Debug, Clone)]
pub struct StatusChange {
	pub order_id: String,
	/// Status currently shown for the order (raw remote value).
	pub from: String,
	pub to: OrderStatus,
}

/// Outcome of one entry of a bulk status change.
#[derive(Debug)]
pub struct StatusChangeOutcome {
	pub order_id: String,
	pub result: Result<(), OrderError>,
}

/// Guarded access to the remote order-mutation API.
pub struct OrderStatusService {
	implementation: Box<dyn OrderMutationInterface>,
}

impl OrderStatusService {
	pub fn new(implementation: Box<dyn OrderMutationInterface>) -> Self {
		Self { implementation }
	}

	/// Moves an order from `from` to `to`.
	///
	/// The transition is checked locally first; an illegal one returns
	/// [`OrderError::InvalidTransition`] without contacting the remote API.
	pub async fn transition(
		&self,
		order_id: &str,
		from: impl AsRef<str>,
		to: OrderStatus,
		access_token: &SecretString,
	) -> Result<(), OrderError> {
		if let Err(e) = check_transition(from.as_ref(), to) {
			tracing::warn!(order_id = %order_id, error = %e, "Rejected status change");
			return Err(e);
		}

		self.implementation
			.update_status(order_id, to, access_token)
			.await?;

		tracing::info!(
			order_id = %order_id,
			from = %from.as_ref(),
			to = %to,
			"Order status changed"
		);
		Ok(())
	}

	/// Applies a bulk status action.
	///
	/// Each change is gated on its own; invalid entries are reported without
	/// affecting the others. An `Unauthorized` answer stops the batch because
	/// every remaining request would carry the same rejected token.
	pub async fn transition_many(
		&self,
		changes: Vec<StatusChange>,
		access_token: &SecretString,
	) -> Vec<StatusChangeOutcome> {
		let mut outcomes = Vec::with_capacity(changes.len());
		let mut unauthorized = false;

		for change in changes {
			let result = if unauthorized {
				Err(OrderError::Unauthorized)
			} else {
				self.transition(&change.order_id, &change.from, change.to, access_token)
					.await
			};

			unauthorized |= matches!(result, Err(OrderError::Unauthorized));
			outcomes.push(StatusChangeOutcome {
				order_id: change.order_id,
				result,
			});
		}

		outcomes
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pos_types::Schema;
	use std::sync::Mutex;

	struct SchemaNone;

	impl ConfigSchema for SchemaNone {
		fn validate(&self, config: &toml::Value) -> Result<(), pos_types::ValidationError> {
			Schema::new(vec![], vec![]).validate(config)
		}
	}

	/// Records every request that reaches the "remote" API.
	#[derive(Default)]
	struct RecordingApi {
		calls: Mutex<Vec<(String, OrderStatus)>>,
		reject_token: bool,
	}

	#[async_trait]
	impl OrderMutationInterface for RecordingApi {
		fn config_schema(&self) -> Box<dyn ConfigSchema> {
			Box::new(SchemaNone)
		}

		async fn update_status(
			&self,
			order_id: &str,
			status: OrderStatus,
			_access_token: &SecretString,
		) -> Result<(), OrderError> {
			self.calls
				.lock()
				.unwrap()
				.push((order_id.to_string(), status));
			if self.reject_token {
				Err(OrderError::Unauthorized)
			} else {
				Ok(())
			}
		}
	}

	struct Shared(std::sync::Arc<RecordingApi>);

	#[async_trait]
	impl OrderMutationInterface for Shared {
		fn config_schema(&self) -> Box<dyn ConfigSchema> {
			self.0.config_schema()
		}

		async fn update_status(
			&self,
			order_id: &str,
			status: OrderStatus,
			access_token: &SecretString,
		) -> Result<(), OrderError> {
			self.0.update_status(order_id, status, access_token).await
		}
	}

	fn service(api: RecordingApi) -> (OrderStatusService, std::sync::Arc<RecordingApi>) {
		let api = std::sync::Arc::new(api);
		(
			OrderStatusService::new(Box::new(Shared(api.clone()))),
			api,
		)
	}

	fn token() -> SecretString {
		SecretString::from("access")
	}

	#[tokio::test]
	async fn test_valid_transition_reaches_remote() {
		let (service, api) = service(RecordingApi::default());

		service
			.transition("PO-1", "DRAFT", OrderStatus::Placed, &token())
			.await
			.unwrap();

		assert_eq!(
			*api.calls.lock().unwrap(),
			vec![("PO-1".to_string(), OrderStatus::Placed)]
		);
	}

	#[tokio::test]
	async fn test_invalid_transition_never_reaches_remote() {
		let (service, api) = service(RecordingApi::default());

		let result = service
			.transition("PO-2", OrderStatus::Cancelled, OrderStatus::Placed, &token())
			.await;
		assert!(matches!(result, Err(OrderError::InvalidTransition { .. })));

		let result = service
			.transition("PO-3", "garbage", OrderStatus::Placed, &token())
			.await;
		assert!(matches!(result, Err(OrderError::InvalidTransition { .. })));

		assert!(api.calls.lock().unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_bulk_rejects_invalid_entries_only() {
		let (service, api) = service(RecordingApi::default());

		let outcomes = service
			.transition_many(
				vec![
					StatusChange {
						order_id: "PO-1".into(),
						from: "PLACED".into(),
						to: OrderStatus::Delivered,
					},
					StatusChange {
						order_id: "PO-2".into(),
						from: "DRAFT".into(),
						to: OrderStatus::Validated,
					},
					StatusChange {
						order_id: "PO-3".into(),
						from: "VALIDATED".into(),
						to: OrderStatus::Cancelled,
					},
				],
				&token(),
			)
			.await;

		assert!(outcomes[0].result.is_ok());
		assert!(matches!(
			outcomes[1].result,
			Err(OrderError::InvalidTransition { .. })
		));
		assert!(outcomes[2].result.is_ok());

		let calls = api.calls.lock().unwrap();
		let ids: Vec<_> = calls.iter().map(|(id, _)| id.as_str()).collect();
		assert_eq!(ids, vec!["PO-1", "PO-3"]);
	}

	#[tokio::test]
	async fn test_bulk_stops_after_unauthorized() {
		let (service, api) = service(RecordingApi {
			reject_token: true,
			..Default::default()
		});

		let changes = ["PO-1", "PO-2"]
			.into_iter()
			.map(|id| StatusChange {
				order_id: id.into(),
				from: "DRAFT".into(),
				to: OrderStatus::Placed,
			})
			.collect();
		let outcomes = service.transition_many(changes, &token()).await;

		assert!(outcomes
			.iter()
			.all(|o| matches!(o.result, Err(OrderError::Unauthorized))));
		assert_eq!(api.calls.lock().unwrap().len(), 1);
	}
}
