//! Configuration for posdesk.
//!
//! Configuration is read from a single TOML file. `${VAR}` and
//! `${VAR:-default}` placeholders are replaced with environment variables
//! before parsing, and the result is validated before it is handed out.
//! Backend tables (`[<section>.implementations.<name>]`) stay raw TOML; each
//! backend factory checks its own table.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// The file is not valid TOML or does not match the expected shape.
	#[error("Configuration error: {0}")]
	Parse(String),
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// The full error embeds the whole input; keep the message only.
		ConfigError::Parse(err.message().to_string())
	}
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	pub app: AppConfig,
	/// Where the session is persisted.
	pub storage: ImplementationsConfig,
	/// Authentication API backend.
	pub auth: ImplementationsConfig,
	/// Order mutation API backend.
	pub orders: ImplementationsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
	/// Identifier of this terminal, used in logs.
	pub id: String,
	/// Route users are sent to when no session can be established.
	/// Defaults to `/login`.
	#[serde(default = "default_entry_point")]
	pub unauthenticated_entry_point: String,
}

fn default_entry_point() -> String {
	"/login".to_string()
}

/// A pluggable section: the backend to use and the settings of each backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImplementationsConfig {
	/// Which implementation to use.
	pub primary: String,
	/// Map of implementation names to their raw configuration.
	#[serde(default)]
	pub implementations: HashMap<String, toml::Value>,
}

impl ImplementationsConfig {
	/// Returns the configuration table of the primary implementation.
	pub fn primary_config(&self) -> Option<&toml::Value> {
		self.implementations.get(&self.primary)
	}

	fn validate(&self, section: &str) -> Result<(), ConfigError> {
		if self.primary.is_empty() {
			return Err(ConfigError::Validation(format!(
				"[{}] primary cannot be empty",
				section
			)));
		}
		if !self.implementations.contains_key(&self.primary) {
			return Err(ConfigError::Validation(format!(
				"[{}] primary implementation '{}' is not configured",
				section, self.primary
			)));
		}
		Ok(())
	}
}

/// Resolves environment variables in a string.
///
/// Replaces `${VAR_NAME}` with the value of `VAR_NAME`, or with `default` for
/// `${VAR_NAME:-default}` when the variable is unset. Input is limited to 1MB.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match cap.get(2) {
				Some(default) => default.as_str().to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)))
				},
			},
		};

		result.push_str(&input[last..full_match.start()]);
		result.push_str(&value);
		last = full_match.end();
	}
	result.push_str(&input[last..]);

	Ok(result)
}

impl Config {
	/// Loads and validates the configuration file at `path`.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let content = tokio::fs::read_to_string(path).await.map_err(|e| {
			ConfigError::Io(std::io::Error::new(
				e.kind(),
				format!("Cannot read {}: {}", path.display(), e),
			))
		})?;
		content.parse()
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.app.id.trim().is_empty() {
			return Err(ConfigError::Validation("App ID cannot be empty".into()));
		}
		if !self.app.unauthenticated_entry_point.starts_with('/') {
			return Err(ConfigError::Validation(format!(
				"unauthenticated_entry_point must start with '/': {}",
				self.app.unauthenticated_entry_point
			)));
		}

		self.storage.validate("storage")?;
		self.auth.validate("auth")?;
		self.orders.validate("orders")?;
		Ok(())
	}
}

/// Parses a TOML string, resolving environment variables and validating the
/// result.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	const BASE: &str = r#"
[app]
id = "till-1"

[storage]
primary = "memory"
[storage.implementations.memory]

[auth]
primary = "http"
[auth.implementations.http]
base_url = "http://localhost:8000/api"

[orders]
primary = "http"
[orders.implementations.http]
base_url = "http://localhost:8000/api"
"#;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("POS_CONFIG_TEST_HOST", "localhost");
		std::env::set_var("POS_CONFIG_TEST_PORT", "8000");

		let input = "url = \"http://${POS_CONFIG_TEST_HOST}:${POS_CONFIG_TEST_PORT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "url = \"http://localhost:8000\"");

		std::env::remove_var("POS_CONFIG_TEST_HOST");
		std::env::remove_var("POS_CONFIG_TEST_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "value = \"${POS_CONFIG_MISSING:-fallback}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "value = \"fallback\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let result = resolve_env_vars("value = \"${POS_CONFIG_ABSENT}\"");
		assert!(result.unwrap_err().to_string().contains("POS_CONFIG_ABSENT"));
	}

	#[test]
	fn test_oversized_input_rejected() {
		let input = "#".repeat(1024 * 1024 + 1);
		assert!(matches!(
			resolve_env_vars(&input),
			Err(ConfigError::Validation(_))
		));
	}

	#[test]
	fn test_parse_applies_defaults() {
		let config: Config = BASE.parse().unwrap();
		assert_eq!(config.app.id, "till-1");
		assert_eq!(config.app.unauthenticated_entry_point, "/login");
		assert_eq!(config.storage.primary, "memory");
		assert!(config.auth.primary_config().is_some());
	}

	#[test]
	fn test_primary_must_be_configured() {
		let config = BASE.replace("primary = \"memory\"", "primary = \"file\"");
		let err = config.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("'file' is not configured"));
	}

	#[test]
	fn test_entry_point_must_be_a_route() {
		let config = BASE.replace(
			"id = \"till-1\"",
			"id = \"till-1\"\nunauthenticated_entry_point = \"login\"",
		);
		assert!(matches!(
			config.parse::<Config>(),
			Err(ConfigError::Validation(_))
		));
	}

	#[test]
	fn test_empty_id_rejected() {
		let config = BASE.replace("id = \"till-1\"", "id = \"  \"");
		assert!(matches!(
			config.parse::<Config>(),
			Err(ConfigError::Validation(_))
		));
	}

	#[test]
	fn test_missing_section_is_parse_error() {
		let config = BASE.replace("[orders]", "[unused]");
		assert!(matches!(
			config.parse::<Config>(),
			Err(ConfigError::Parse(_))
		));
	}

	#[tokio::test]
	async fn test_from_file_resolves_env() {
		std::env::set_var("POS_CONFIG_TEST_API", "http://pos.internal/api");
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(
			file,
			"{}",
			BASE.replace(
				"[orders.implementations.http]\nbase_url = \"http://localhost:8000/api\"",
				"[orders.implementations.http]\nbase_url = \"${POS_CONFIG_TEST_API}\"",
			)
		)
		.unwrap();

		let config = Config::from_file(file.path()).await.unwrap();
		let orders = config.orders.primary_config().unwrap();
		assert_eq!(
			orders.get("base_url").and_then(|v| v.as_str()),
			Some("http://pos.internal/api")
		);

		std::env::remove_var("POS_CONFIG_TEST_API");
	}

	#[tokio::test]
	async fn test_from_file_missing() {
		let dir = tempfile::tempdir().unwrap();
		let result = Config::from_file(dir.path().join("absent.toml")).await;
		assert!(matches!(result, Err(ConfigError::Io(_))));
	}
}
