//! Subcommand handlers of the `posdesk` binary.

use crate::factory_registry::App;
use pos_order::{available_transitions, status_meta, OrderError};
use pos_session::SessionError;
use pos_types::{Credentials, OrderStatus, SecretString, SessionState};
use thiserror::Error;

/// Failures surfaced to the operator.
#[derive(Debug, Error)]
pub enum CommandError {
	#[error("Not logged in")]
	NotAuthenticated,
	#[error(transparent)]
	Session(#[from] SessionError),
	#[error(transparent)]
	Order(#[from] OrderError),
	#[error(transparent)]
	Status(#[from] pos_types::UnknownStatus),
}

/// Renders a status with its label and the statuses it can move to.
pub fn describe_transitions(status: &str) -> Result<String, CommandError> {
	let status: OrderStatus = status.parse()?;
	let meta = status_meta(status);
	let mut out = format!("{} ({}, {}, {})\n", status, meta.label, meta.icon, meta.color);

	let next = available_transitions(status);
	if next.is_empty() {
		out.push_str("  no further transitions\n");
	}
	for target in next {
		out.push_str(&format!("  -> {} ({})\n", target, status_meta(target).label));
	}
	Ok(out)
}

/// Runs the authentication check and reports the outcome.
pub async fn check(app: &App) -> SessionState {
	app.session.run_check().await
}

/// Maps a terminal state to the command result, so that scripts can tell a
/// restored session from a missing one by exit status.
pub fn require_authenticated(state: SessionState) -> Result<(), CommandError> {
	match state {
		SessionState::Authenticated => Ok(()),
		_ => Err(CommandError::NotAuthenticated),
	}
}

/// Runs the check, then describes the session.
///
/// Tokens are only ever shown redacted. The token type is read back from
/// storage, where it outlives individual access tokens.
pub async fn status(app: &App) -> String {
	let state = app.session.run_check().await;
	let snapshot = app.session.snapshot();
	let mut out = format!("terminal: {}\nsession: {}\n", app.config.app.id, state);

	if let Some(user) = snapshot.session.user {
		out.push_str(&format!("user: {}\n", user.as_value()));
	}
	if let Some(token) = snapshot.session.access_token {
		out.push_str(&format!("access token: {}\n", token));
	}
	match app.store.token_type().await {
		Ok(Some(token_type)) => out.push_str(&format!("token type: {}\n", token_type)),
		Ok(None) => {},
		Err(e) => tracing::warn!(error = %e, "Could not read token type"),
	}
	out
}

/// Logs in and returns the resulting state.
pub async fn login(
	app: &App,
	username: String,
	password: String,
) -> Result<SessionState, CommandError> {
	let credentials = Credentials {
		username,
		password: SecretString::from(password),
	};
	let snapshot = app.session.login(&credentials).await?;
	Ok(snapshot.state)
}

/// Clears the stored session. Succeeds even when nobody is logged in.
pub async fn logout(app: &App) {
	app.session.logout().await;
}

/// Changes an order's status on the remote system.
///
/// A token the API rejects is renewed through the session manager and the
/// request is retried once.
pub async fn set_status(
	app: &App,
	order_id: &str,
	from: &str,
	to: &str,
) -> Result<(), CommandError> {
	let to: OrderStatus = to.parse()?;

	let token = current_token(app).await?;
	match app.orders.transition(order_id, from, to, &token).await {
		Err(OrderError::Unauthorized) => {
			tracing::info!(order_id = %order_id, "Retrying status change after renewal");
			if app.session.handle_unauthorized().await != SessionState::Authenticated {
				return Err(CommandError::NotAuthenticated);
			}
			let token = current_token(app).await?;
			Ok(app.orders.transition(order_id, from, to, &token).await?)
		},
		other => Ok(other?),
	}
}

async fn current_token(app: &App) -> Result<SecretString, CommandError> {
	if !app.session.is_authenticated() && app.session.run_check().await != SessionState::Authenticated
	{
		return Err(CommandError::NotAuthenticated);
	}
	app.session
		.snapshot()
		.session
		.access_token
		.ok_or(CommandError::NotAuthenticated)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::factory_registry::build_app;
	use axum::{
		extract::Path,
		http::{HeaderMap, StatusCode},
		routing::{patch, post},
		Json, Router,
	};
	use pos_types::{SessionKey, UserProfile};
	use serde_json::{json, Value};
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::sync::Arc;

	#[test]
	fn test_describe_transitions() {
		let out = describe_transitions("delivered").unwrap();
		assert!(out.starts_with("DELIVERED"));
		assert!(out.contains("-> VALIDATED"));
		assert!(out.contains("-> CANCELLED"));

		let out = describe_transitions("CANCELLED").unwrap();
		assert!(out.contains("no further transitions"));

		assert!(matches!(
			describe_transitions("SHIPPED"),
			Err(CommandError::Status(_))
		));
	}

	#[test]
	fn test_only_authenticated_check_succeeds() {
		assert!(require_authenticated(SessionState::Authenticated).is_ok());
		for state in [
			SessionState::Unauthenticated,
			SessionState::Unknown,
			SessionState::Authenticating,
		] {
			assert!(matches!(
				require_authenticated(state),
				Err(CommandError::NotAuthenticated)
			));
		}
	}

	/// Backend that accepts only the token handed out by its refresh endpoint.
	async fn serve(refreshes: Arc<AtomicUsize>) -> String {
		let router = Router::new()
			.route(
				"/auth/refresh",
				post(move |Json(body): Json<Value>| {
					let refreshes = refreshes.clone();
					async move {
						refreshes.fetch_add(1, Ordering::SeqCst);
						if body["refresh_token"] == "r-1" {
							(StatusCode::OK, Json(json!({"access_token": "fresh"})))
						} else {
							(StatusCode::UNAUTHORIZED, Json(json!({})))
						}
					}
				}),
			)
			.route(
				"/orders/{id}/status",
				patch(|Path(_id): Path<String>, headers: HeaderMap| async move {
					match headers.get("authorization").and_then(|v| v.to_str().ok()) {
						Some("Bearer fresh") => StatusCode::NO_CONTENT,
						_ => StatusCode::UNAUTHORIZED,
					}
				}),
			);

		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		tokio::spawn(async move {
			axum::serve(listener, router).await.unwrap();
		});
		format!("http://{}", addr)
	}

	async fn app(base_url: &str) -> App {
		let config = format!(
			r#"
[app]
id = "till-7"

[storage]
primary = "memory"
[storage.implementations.memory]

[auth]
primary = "http"
[auth.implementations.http]
base_url = "{base_url}"

[orders]
primary = "http"
[orders.implementations.http]
base_url = "{base_url}"
"#
		);
		build_app(config.parse().unwrap()).unwrap()
	}

	async fn seed(app: &App, access: &str) {
		app.store.set(SessionKey::AccessToken, &access).await.unwrap();
		app.store.set(SessionKey::RefreshToken, &"r-1").await.unwrap();
		app.store
			.set(SessionKey::UserInfo, &UserProfile::new(json!({"id": 3})))
			.await
			.unwrap();
	}

	#[tokio::test]
	async fn test_set_status_renews_rejected_token_once() {
		let refreshes = Arc::new(AtomicUsize::new(0));
		let app = app(&serve(refreshes.clone()).await).await;
		seed(&app, "stale").await;

		set_status(&app, "PO-9", "PLACED", "DELIVERED").await.unwrap();

		assert_eq!(refreshes.load(Ordering::SeqCst), 1);
		assert_eq!(
			app.store.access_token().await.unwrap(),
			Some(SecretString::from("fresh"))
		);
	}

	#[tokio::test]
	async fn test_set_status_gate_runs_before_network() {
		let refreshes = Arc::new(AtomicUsize::new(0));
		let app = app(&serve(refreshes.clone()).await).await;
		seed(&app, "fresh").await;

		let result = set_status(&app, "PO-9", "CANCELLED", "PLACED").await;
		assert!(matches!(
			result,
			Err(CommandError::Order(OrderError::InvalidTransition { .. }))
		));
		assert_eq!(refreshes.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn test_set_status_requires_session() {
		let refreshes = Arc::new(AtomicUsize::new(0));
		let app = app(&serve(refreshes).await).await;

		let result = set_status(&app, "PO-9", "DRAFT", "PLACED").await;
		assert!(matches!(result, Err(CommandError::NotAuthenticated)));
	}

	#[tokio::test]
	async fn test_status_redacts_token() {
		let refreshes = Arc::new(AtomicUsize::new(0));
		let app = app(&serve(refreshes).await).await;
		seed(&app, "fresh").await;

		let out = status(&app).await;
		assert!(out.contains("session: authenticated"));
		assert!(out.contains("till-7"));
		assert!(out.contains("token type: Bearer"));
		assert!(!out.contains("fresh"));
	}
}
