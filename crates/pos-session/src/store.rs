//! Persisted session fields.
//!
//! Four keys live under the `session` namespace: `accessToken`,
//! `refreshToken`, `userInfo` and `tokenType`. All four absent means logged
//! out. Writes put the access token last and teardown removes it first, so an
//! interrupted operation never leaves a token without its profile.

use pos_storage::{StorageError, StorageService};
use pos_types::{
	SecretString, Session, SessionKey, UserProfile, DEFAULT_TOKEN_TYPE, SESSION_NAMESPACE,
};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

#[derive(Clone)]
pub struct SessionStore {
	storage: Arc<StorageService>,
}

impl SessionStore {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	pub async fn get<T: DeserializeOwned>(&self, key: SessionKey) -> Result<Option<T>, StorageError> {
		self.storage
			.retrieve_optional(SESSION_NAMESPACE, key.as_str())
			.await
	}

	pub async fn set<T: Serialize>(&self, key: SessionKey, value: &T) -> Result<(), StorageError> {
		self.storage
			.store(SESSION_NAMESPACE, key.as_str(), value)
			.await
	}

	pub async fn remove(&self, key: SessionKey) -> Result<(), StorageError> {
		self.storage.remove(SESSION_NAMESPACE, key.as_str()).await
	}

	pub async fn contains(&self, key: SessionKey) -> Result<bool, StorageError> {
		self.storage.exists(SESSION_NAMESPACE, key.as_str()).await
	}

	/// Removes every session key.
	///
	/// All keys are attempted even when one removal fails; the first error is
	/// returned.
	pub async fn clear(&self) -> Result<(), StorageError> {
		let mut first_error = None;
		for key in SessionKey::all() {
			if let Err(e) = self.remove(key).await {
				tracing::error!(key = key.as_str(), error = %e, "Failed to remove session key");
				first_error.get_or_insert(e);
			}
		}
		first_error.map_or(Ok(()), Err)
	}

	async fn token(&self, key: SessionKey) -> Result<Option<SecretString>, StorageError> {
		Ok(self
			.get::<String>(key)
			.await?
			.filter(|token| !token.is_empty())
			.map(SecretString::from))
	}

	pub async fn access_token(&self) -> Result<Option<SecretString>, StorageError> {
		self.token(SessionKey::AccessToken).await
	}

	pub async fn refresh_token(&self) -> Result<Option<SecretString>, StorageError> {
		self.token(SessionKey::RefreshToken).await
	}

	pub async fn token_type(&self) -> Result<Option<String>, StorageError> {
		self.get(SessionKey::TokenType).await
	}

	pub async fn user_profile(&self) -> Result<Option<UserProfile>, StorageError> {
		self.get(SessionKey::UserInfo).await
	}

	/// Writes an authenticated session.
	///
	/// `token_type` replaces the stored scheme when given; otherwise the stored
	/// one is kept, or the default is written if none exists.
	pub async fn persist(
		&self,
		session: &Session,
		token_type: Option<&str>,
	) -> Result<(), StorageError> {
		if let Some(user) = &session.user {
			self.set(SessionKey::UserInfo, user).await?;
		}

		match &session.refresh_token {
			Some(token) => {
				self.set(SessionKey::RefreshToken, &token.expose_secret())
					.await?
			},
			None => self.remove(SessionKey::RefreshToken).await?,
		}

		if let Some(token_type) = token_type {
			self.set(SessionKey::TokenType, &token_type).await?;
		} else if !self.contains(SessionKey::TokenType).await? {
			self.set(SessionKey::TokenType, &DEFAULT_TOKEN_TYPE).await?;
		}

		if let Some(token) = &session.access_token {
			self.set(SessionKey::AccessToken, &token.expose_secret())
				.await?;
		}

		Ok(())
	}
}
