//! Storage keys used by the session layer.

use std::str::FromStr;

/// Namespace under which session keys are stored.
pub const SESSION_NAMESPACE: &str = "session";

/// Persisted session fields.
///
/// The string values are the keys of the persisted layout and must stay
/// stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKey {
	/// Bearer token sent with API requests.
	AccessToken,
	/// Token used to obtain a new access token.
	RefreshToken,
	/// Serialized user profile.
	UserInfo,
	/// Authorization scheme of the access token.
	TokenType,
}

impl SessionKey {
	pub fn as_str(&self) -> &'static str {
		match self {
			SessionKey::AccessToken => "accessToken",
			SessionKey::RefreshToken => "refreshToken",
			SessionKey::UserInfo => "userInfo",
			SessionKey::TokenType => "tokenType",
		}
	}

	/// Returns every key, access token first.
	///
	/// Teardown removes keys in this order so the access token never outlives
	/// the profile.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::AccessToken,
			Self::RefreshToken,
			Self::UserInfo,
			Self::TokenType,
		]
		.into_iter()
	}
}

impl FromStr for SessionKey {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"accessToken" => Ok(Self::AccessToken),
			"refreshToken" => Ok(Self::RefreshToken),
			"userInfo" => Ok(Self::UserInfo),
			"tokenType" => Ok(Self::TokenType),
			_ => Err(()),
		}
	}
}

impl From<SessionKey> for &'static str {
	fn from(key: SessionKey) -> Self {
		key.as_str()
	}
}
