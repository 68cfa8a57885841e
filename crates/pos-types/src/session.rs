//! Session types shared by the auth transport and the session manager.

use crate::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque record identifying the authenticated principal.
///
/// The profile is persisted verbatim; nothing in the core inspects its fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserProfile(pub serde_json::Value);

impl UserProfile {
	pub fn new(value: serde_json::Value) -> Self {
		Self(value)
	}

	/// Returns the raw JSON value.
	pub fn as_value(&self) -> &serde_json::Value {
		&self.0
	}
}

/// Lifecycle state of the session as seen by the rest of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
	/// The authentication check has not run yet.
	Unknown,
	/// An authentication check is in flight.
	Authenticating,
	/// A user profile and an access token are available.
	Authenticated,
	/// No usable credentials; the user must log in.
	Unauthenticated,
}

impl SessionState {
	/// Returns true for states that end an authentication check.
	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			SessionState::Authenticated | SessionState::Unauthenticated
		)
	}
}

impl fmt::Display for SessionState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SessionState::Unknown => write!(f, "unknown"),
			SessionState::Authenticating => write!(f, "authenticating"),
			SessionState::Authenticated => write!(f, "authenticated"),
			SessionState::Unauthenticated => write!(f, "unauthenticated"),
		}
	}
}

/// In-memory representation of the current principal and credentials.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
	pub user: Option<UserProfile>,
	pub access_token: Option<SecretString>,
	pub refresh_token: Option<SecretString>,
}

impl Session {
	/// A session is authenticated iff both a profile and an access token are present.
	pub fn is_authenticated(&self) -> bool {
		self.user.is_some() && self.access_token.is_some()
	}
}

/// Value published to session observers.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
	pub state: SessionState,
	pub session: Session,
}

impl SessionSnapshot {
	pub fn unknown() -> Self {
		Self {
			state: SessionState::Unknown,
			session: Session::default(),
		}
	}

	pub fn is_authenticated(&self) -> bool {
		self.state == SessionState::Authenticated
	}

	pub fn is_loading(&self) -> bool {
		!self.state.is_terminal()
	}
}

/// Username/password pair submitted by the login form.
#[derive(Debug, Clone)]
pub struct Credentials {
	pub username: String,
	pub password: SecretString,
}

/// Token type assumed when the backend does not send one.
pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";

fn default_token_type() -> String {
	DEFAULT_TOKEN_TYPE.to_string()
}

/// Successful answer of the login endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
	#[serde(alias = "accessToken")]
	pub access_token: SecretString,
	#[serde(alias = "refreshToken")]
	pub refresh_token: SecretString,
	#[serde(alias = "tokenType", default = "default_token_type")]
	pub token_type: String,
	pub user: UserProfile,
}

/// Answer of the token refresh endpoint.
///
/// Every field is optional; an answer without a non-empty access token is
/// treated as a failed refresh by the session manager.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefreshResponse {
	#[serde(alias = "accessToken", default)]
	pub access_token: Option<SecretString>,
	#[serde(alias = "refreshToken", default)]
	pub refresh_token: Option<SecretString>,
	#[serde(alias = "tokenType", default)]
	pub token_type: Option<String>,
	#[serde(default)]
	pub user: Option<UserProfile>,
}

impl RefreshResponse {
	/// Returns the new access token if it can actually be used.
	pub fn usable_access_token(&self) -> Option<&SecretString> {
		self.access_token.as_ref().filter(|token| !token.is_empty())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_is_authenticated_requires_user_and_token() {
		let mut session = Session::default();
		assert!(!session.is_authenticated());

		session.access_token = Some(SecretString::from("token"));
		assert!(!session.is_authenticated());

		session.user = Some(UserProfile::new(json!({"id": 1})));
		assert!(session.is_authenticated());

		session.access_token = None;
		assert!(!session.is_authenticated());
	}

	#[test]
	fn test_login_response_accepts_camel_case() {
		let response: LoginResponse = serde_json::from_value(json!({
			"accessToken": "a",
			"refreshToken": "r",
			"user": {"id": 7, "name": "Ama"}
		}))
		.unwrap();

		assert_eq!(response.access_token.expose_secret(), "a");
		assert_eq!(response.refresh_token.expose_secret(), "r");
		assert_eq!(response.token_type, DEFAULT_TOKEN_TYPE);
		assert_eq!(response.user.as_value()["id"], 7);
	}

	#[test]
	fn test_refresh_response_without_usable_token() {
		let empty: RefreshResponse =
			serde_json::from_value(json!({"access_token": ""})).unwrap();
		assert!(empty.usable_access_token().is_none());

		let missing: RefreshResponse = serde_json::from_value(json!({})).unwrap();
		assert!(missing.usable_access_token().is_none());

		let ok: RefreshResponse =
			serde_json::from_value(json!({"access_token": "new"})).unwrap();
		assert_eq!(ok.usable_access_token().unwrap().expose_secret(), "new");
	}

	#[test]
	fn test_snapshot_loading_flags() {
		let mut snapshot = SessionSnapshot::unknown();
		assert!(snapshot.is_loading());

		snapshot.state = SessionState::Authenticating;
		assert!(snapshot.is_loading());

		snapshot.state = SessionState::Unauthenticated;
		assert!(!snapshot.is_loading());
		assert!(!snapshot.is_authenticated());
	}
}
