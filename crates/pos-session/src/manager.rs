//! Session state machine.
//!
//! States: `Unknown -> Authenticating -> Authenticated | Unauthenticated`.
//! A check may start again from any terminal state. Checks, logins and
//! logouts serialize on one async mutex; a check caller that waited while
//! another check completed takes that outcome instead of starting a new one.

use crate::{Navigator, SessionError, SessionStore};
use pos_auth::{AuthError, AuthService};
use pos_types::{Credentials, SecretString, Session, SessionKey, SessionSnapshot, SessionState};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

/// Restores `Unknown` if an in-flight check is dropped before it finishes.
struct FlightGuard<'a> {
	state: &'a watch::Sender<SessionSnapshot>,
	armed: bool,
}

impl<'a> FlightGuard<'a> {
	fn arm(state: &'a watch::Sender<SessionSnapshot>) -> Self {
		Self { state, armed: true }
	}

	fn disarm(mut self) {
		self.armed = false;
	}
}

impl Drop for FlightGuard<'_> {
	fn drop(&mut self) {
		if self.armed {
			tracing::warn!("Session check cancelled before completion");
			self.state.send_if_modified(|snapshot| {
				if snapshot.state != SessionState::Authenticating {
					return false;
				}
				*snapshot = SessionSnapshot::unknown();
				true
			});
		}
	}
}

/// Owner of the session.
pub struct SessionManager {
	store: SessionStore,
	auth: Arc<AuthService>,
	navigator: Arc<dyn Navigator>,
	/// Route the user is sent to when the session cannot be established.
	entry_point: String,
	flight: Mutex<()>,
	completed_checks: AtomicU64,
	state: watch::Sender<SessionSnapshot>,
}

impl SessionManager {
	/// Creates a manager in the `Unknown` state. No check runs until
	/// [`SessionManager::run_check`] is called.
	pub fn new(
		store: SessionStore,
		auth: Arc<AuthService>,
		navigator: Arc<dyn Navigator>,
		entry_point: impl Into<String>,
	) -> Self {
		let (state, _) = watch::channel(SessionSnapshot::unknown());
		Self {
			store,
			auth,
			navigator,
			entry_point: entry_point.into(),
			flight: Mutex::new(()),
			completed_checks: AtomicU64::new(0),
			state,
		}
	}

	/// Receiver that observes every published snapshot.
	pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
		self.state.subscribe()
	}

	/// Current snapshot; cloned, so it does not hold the channel lock.
	pub fn snapshot(&self) -> SessionSnapshot {
		self.state.borrow().clone()
	}

	/// Current lifecycle state.
	pub fn state(&self) -> SessionState {
		self.state.borrow().state
	}

	pub fn is_authenticated(&self) -> bool {
		self.state.borrow().is_authenticated()
	}

	/// True until a check has reached a terminal state.
	pub fn is_loading(&self) -> bool {
		self.state.borrow().is_loading()
	}

	/// Route used for redirects when no session can be established.
	pub fn entry_point(&self) -> &str {
		&self.entry_point
	}

	/// Resolves once the published state is `Authenticated` or `Unauthenticated`.
	pub async fn wait_until_settled(&self) -> SessionSnapshot {
		let mut receiver = self.state.subscribe();
		let settled = match receiver.wait_for(|snapshot| snapshot.state.is_terminal()).await {
			Ok(snapshot) => (*snapshot).clone(),
			Err(_) => self.snapshot(),
		};
		settled
	}

	/// Runs the authentication check and returns the terminal state.
	pub async fn run_check(&self) -> SessionState {
		let seen = self.completed_checks.load(Ordering::Acquire);
		let _flight = self.flight.lock().await;
		if self.completed_checks.load(Ordering::Acquire) != seen {
			let state = self.state();
			tracing::debug!(state = %state, "Joined concurrent session check");
			return state;
		}

		self.check_locked(false).await
	}

	/// Reacts to a request the API rejected for an invalid or expired token.
	///
	/// The stored access token is discarded and the check re-runs, which
	/// renews the session when a refresh token is available.
	pub async fn handle_unauthorized(&self) -> SessionState {
		let seen = self.completed_checks.load(Ordering::Acquire);
		let _flight = self.flight.lock().await;
		if self.completed_checks.load(Ordering::Acquire) != seen {
			return self.state();
		}

		tracing::info!("Access token rejected, renewing session");
		self.check_locked(true).await
	}

	/// Logs in with the given credentials.
	///
	/// On failure the session is cleared and the error is returned; there is
	/// no redirect since the caller is the login surface itself.
	pub async fn login(&self, credentials: &Credentials) -> Result<SessionSnapshot, SessionError> {
		let _flight = self.flight.lock().await;
		let guard = FlightGuard::arm(&self.state);
		self.publish_state(SessionState::Authenticating);

		let result = self.establish(credentials).await;
		let outcome = match result {
			Ok(session) => {
				self.publish(SessionState::Authenticated, session);
				tracing::info!(username = %credentials.username, "Logged in");
				Ok(self.snapshot())
			},
			Err(e) => {
				tracing::warn!(username = %credentials.username, error = %e, "Login failed");
				self.teardown().await;
				self.publish(SessionState::Unauthenticated, Session::default());
				Err(e)
			},
		};

		guard.disarm();
		outcome
	}

	/// Clears the session and returns the user to the entry point.
	///
	/// Idempotent. The backend is told about the logout afterwards, best
	/// effort, when an access token was known.
	pub async fn logout(&self) {
		let flight = self.flight.lock().await;

		let access_token = match self.snapshot().session.access_token {
			Some(token) => Some(token),
			None => self.store.access_token().await.ok().flatten(),
		};

		self.teardown().await;
		self.publish(SessionState::Unauthenticated, Session::default());
		self.navigator.redirect(&self.entry_point);
		tracing::info!("Logged out");
		drop(flight);

		if let Some(token) = access_token {
			if let Err(e) = self.auth.logout(&token).await {
				tracing::warn!(error = %e, "Backend logout failed");
			}
		}
	}

	async fn check_locked(&self, discard_access_token: bool) -> SessionState {
		let guard = FlightGuard::arm(&self.state);
		self.publish_state(SessionState::Authenticating);

		let outcome = if discard_access_token {
			self.reauthenticate().await
		} else {
			self.authenticate().await
		};

		let state = match outcome {
			Ok(session) => {
				self.publish(SessionState::Authenticated, session);
				SessionState::Authenticated
			},
			Err(e) => {
				self.fail(&e).await;
				SessionState::Unauthenticated
			},
		};

		guard.disarm();
		self.completed_checks.fetch_add(1, Ordering::AcqRel);
		tracing::debug!(state = %state, "Session check complete");
		state
	}

	/// The authentication-check protocol proper.
	async fn authenticate(&self) -> Result<Session, SessionError> {
		let access_token = self.store.access_token().await?;
		let refresh_token = self.store.refresh_token().await?;

		match (access_token, refresh_token) {
			(None, None) => Err(SessionError::NoCredentials),
			(None, Some(refresh_token)) => self.renew(refresh_token).await,
			(Some(access_token), refresh_token) => {
				// A token alone does not prove a session; the profile must exist.
				let user = self
					.store
					.user_profile()
					.await?
					.ok_or(SessionError::ProfileMissing)?;

				let session = Session {
					user: Some(user),
					access_token: Some(access_token),
					refresh_token,
				};
				self.store.persist(&session, None).await?;
				Ok(session)
			},
		}
	}

	async fn reauthenticate(&self) -> Result<Session, SessionError> {
		self.store.remove(SessionKey::AccessToken).await?;
		self.authenticate().await
	}

	async fn renew(&self, refresh_token: SecretString) -> Result<Session, SessionError> {
		let response = self
			.auth
			.refresh_token(&refresh_token)
			.await
			.map_err(|e| match e {
				AuthError::Network(message) => SessionError::Transport(message),
				other => SessionError::RefreshFailed(other.to_string()),
			})?;

		let access_token = response.usable_access_token().cloned().ok_or_else(|| {
			SessionError::RefreshFailed("response carried no access token".to_string())
		})?;
		let refresh_token = response
			.refresh_token
			.filter(|token| !token.is_empty())
			.unwrap_or(refresh_token);
		let user = match response.user {
			Some(user) => user,
			None => self
				.store
				.user_profile()
				.await?
				.ok_or(SessionError::ProfileMissing)?,
		};

		let session = Session {
			user: Some(user),
			access_token: Some(access_token),
			refresh_token: Some(refresh_token),
		};
		self.store
			.persist(&session, response.token_type.as_deref())
			.await?;

		tracing::info!("Access token renewed");
		Ok(session)
	}

	async fn establish(&self, credentials: &Credentials) -> Result<Session, SessionError> {
		let response = self.auth.login(credentials).await.map_err(|e| match e {
			AuthError::Network(message) => SessionError::Transport(message),
			other => SessionError::LoginRejected(other.to_string()),
		})?;

		if response.access_token.is_empty() {
			return Err(SessionError::LoginRejected(
				"response carried no access token".to_string(),
			));
		}

		let session = Session {
			user: Some(response.user),
			access_token: Some(response.access_token),
			refresh_token: Some(response.refresh_token).filter(|token| !token.is_empty()),
		};
		self.store
			.persist(&session, Some(response.token_type.as_str()))
			.await?;
		Ok(session)
	}

	async fn fail(&self, error: &SessionError) {
		tracing::warn!(error = %error, "Session check failed, clearing credentials");
		self.teardown().await;
		self.publish(SessionState::Unauthenticated, Session::default());
		self.navigator.redirect(&self.entry_point);
	}

	async fn teardown(&self) {
		if let Err(e) = self.store.clear().await {
			tracing::error!(error = %e, "Session teardown incomplete");
		}
	}

	fn publish(&self, state: SessionState, session: Session) {
		debug_assert_eq!(
			state == SessionState::Authenticated,
			session.is_authenticated()
		);
		self.state.send_replace(SessionSnapshot { state, session });
	}

	/// Publishes a non-terminal state. The session is withheld until the
	/// check that is now in flight settles.
	fn publish_state(&self, state: SessionState) {
		debug_assert!(!state.is_terminal());
		self.state.send_replace(SessionSnapshot {
			state,
			session: Session::default(),
		});
	}
}
