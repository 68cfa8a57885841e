//! Entry point for `posdesk`, the point-of-sale back-office client.
//!
//! Restores or renews the operator's session from local storage, and changes
//! purchase-order statuses on the remote API behind the local transition
//! table.

use clap::{Parser, Subcommand};
use pos_config::Config;
use std::path::PathBuf;

mod commands;
mod factory_registry;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Restore or renew the stored session
	Check,
	/// Show the current session
	Status,
	/// Log in and store the session
	Login {
		#[arg(short, long)]
		username: String,
		#[arg(short, long, env = "POS_PASSWORD", hide_env_values = true)]
		password: String,
	},
	/// Clear the stored session
	Logout,
	/// Show a status and where it can move to
	Transitions {
		/// Order status, e.g. PLACED
		status: String,
	},
	/// Change an order's status on the remote system
	SetStatus {
		order_id: String,
		/// Status currently shown for the order
		#[arg(long)]
		from: String,
		#[arg(long)]
		to: String,
	},
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
	fmt()
		.with_env_filter(env_filter)
		.with_target(true)
		.with_writer(std::io::stderr)
		.init();

	// Pure lookup, no configuration needed.
	if let Command::Transitions { status } = &args.command {
		print!("{}", commands::describe_transitions(status)?);
		return Ok(());
	}

	let config = Config::from_file(&args.config).await?;
	tracing::info!("Loaded configuration [{}]", config.app.id);

	let app = factory_registry::build_app(config)?;

	match args.command {
		Command::Check => {
			let state = commands::check(&app).await;
			println!("{}", state);
			commands::require_authenticated(state)?;
		},
		Command::Status => print!("{}", commands::status(&app).await),
		Command::Login { username, password } => {
			let state = commands::login(&app, username, password).await?;
			println!("{}", state);
		},
		Command::Logout => {
			commands::logout(&app).await;
			println!("logged out");
		},
		Command::SetStatus { order_id, from, to } => {
			commands::set_status(&app, &order_id, &from, &to).await?;
			println!("{}: {} -> {}", order_id, from, to.to_uppercase());
		},
		Command::Transitions { .. } => {},
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn test_parse_set_status() {
		let args = Args::try_parse_from([
			"posdesk",
			"--config",
			"desk.toml",
			"set-status",
			"PO-12",
			"--from",
			"PLACED",
			"--to",
			"DELIVERED",
		])
		.unwrap();

		assert_eq!(args.config, PathBuf::from("desk.toml"));
		assert_eq!(args.log_level, "info");
		match args.command {
			Command::SetStatus { order_id, from, to } => {
				assert_eq!(order_id, "PO-12");
				assert_eq!(from, "PLACED");
				assert_eq!(to, "DELIVERED");
			},
			other => panic!("unexpected command {:?}", other),
		}
	}

	#[test]
	fn test_login_requires_username() {
		assert!(Args::try_parse_from(["posdesk", "login", "--password", "pw"]).is_err());
	}

	#[test]
	fn test_subcommand_required() {
		assert!(Args::try_parse_from(["posdesk"]).is_err());
	}

	#[tokio::test]
	async fn test_file_backed_session_survives_restart() {
		let dir = tempfile::tempdir().unwrap();
		let storage_path = dir.path().join("session");
		let mut file = tempfile::NamedTempFile::new_in(dir.path()).unwrap();
		write!(
			file,
			r#"
[app]
id = "till-2"

[storage]
primary = "file"
[storage.implementations.file]
storage_path = "{}"

[auth]
primary = "http"
[auth.implementations.http]
base_url = "http://127.0.0.1:9"

[orders]
primary = "http"
[orders.implementations.http]
base_url = "http://127.0.0.1:9"
"#,
			storage_path.display()
		)
		.unwrap();

		let first = factory_registry::build_app(Config::from_file(file.path()).await.unwrap()).unwrap();
		first
			.store
			.set(pos_types::SessionKey::AccessToken, &"a-1")
			.await
			.unwrap();
		first
			.store
			.set(
				pos_types::SessionKey::UserInfo,
				&pos_types::UserProfile::new(serde_json::json!({"id": 1})),
			)
			.await
			.unwrap();

		let second =
			factory_registry::build_app(Config::from_file(file.path()).await.unwrap()).unwrap();
		assert_eq!(
			commands::check(&second).await,
			pos_types::SessionState::Authenticated
		);

		commands::logout(&second).await;
		let third = factory_registry::build_app(Config::from_file(file.path()).await.unwrap()).unwrap();
		assert_eq!(
			commands::check(&third).await,
			pos_types::SessionState::Unauthenticated
		);
	}
}
