//! Factory registry and application wiring.
//!
//! Every backend crate lists its implementations through
//! `get_all_implementations()`; the registry collects them once and the
//! configuration's `primary` entries pick which one is built.

use pos_auth::{AuthFactory, AuthService};
use pos_config::{Config, ImplementationsConfig};
use pos_order::{OrderFactory, OrderStatusService};
use pos_session::{LogNavigator, Navigator, SessionManager, SessionStore};
use pos_storage::{StorageFactory, StorageService};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// All known implementation factories, by backend family.
pub struct FactoryRegistry {
	pub storage: HashMap<String, StorageFactory>,
	pub auth: HashMap<String, AuthFactory>,
	pub orders: HashMap<String, OrderFactory>,
}

static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

/// Returns the global registry, populating it on first use.
pub fn get_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut registry = FactoryRegistry {
			storage: HashMap::new(),
			auth: HashMap::new(),
			orders: HashMap::new(),
		};

		for (name, factory) in pos_storage::get_all_implementations() {
			tracing::debug!("Registering storage implementation: {}", name);
			registry.storage.insert(name.to_string(), factory);
		}
		for (name, factory) in pos_auth::get_all_implementations() {
			tracing::debug!("Registering auth implementation: {}", name);
			registry.auth.insert(name.to_string(), factory);
		}
		for (name, factory) in pos_order::get_all_implementations() {
			tracing::debug!("Registering orders implementation: {}", name);
			registry.orders.insert(name.to_string(), factory);
		}

		registry
	})
}

/// Looks up the factory for the section's primary implementation.
fn select<'a, F: Copy>(
	factories: &'a HashMap<String, F>,
	section: &'a ImplementationsConfig,
	kind: &str,
) -> Result<(F, &'a toml::Value), Box<dyn std::error::Error>> {
	let factory = factories.get(&section.primary).copied().ok_or_else(|| {
		let mut available: Vec<_> = factories.keys().cloned().collect();
		available.sort();
		format!(
			"Unknown {} implementation '{}'. Available: [{}]",
			kind,
			section.primary,
			available.join(", ")
		)
	})?;
	let config = section.primary_config().ok_or_else(|| {
		format!(
			"Missing configuration for {} implementation '{}'",
			kind, section.primary
		)
	})?;

	tracing::info!(component = kind, implementation = %section.primary, "Using implementation");
	Ok((factory, config))
}

/// Everything a command needs, built from configuration.
pub struct App {
	pub config: Config,
	pub store: SessionStore,
	pub session: Arc<SessionManager>,
	pub orders: OrderStatusService,
}

/// Builds the application with the default, log-only navigator.
pub fn build_app(config: Config) -> Result<App, Box<dyn std::error::Error>> {
	build_app_with_navigator(config, Arc::new(LogNavigator))
}

/// Builds the application around a caller-supplied navigator.
pub fn build_app_with_navigator(
	config: Config,
	navigator: Arc<dyn Navigator>,
) -> Result<App, Box<dyn std::error::Error>> {
	let registry = get_registry();

	let (factory, backend) = select(&registry.storage, &config.storage, "storage")?;
	let store = SessionStore::new(Arc::new(StorageService::new(factory(backend)?)));

	let (factory, backend) = select(&registry.auth, &config.auth, "auth")?;
	let auth = Arc::new(AuthService::new(factory(backend)?));

	let (factory, backend) = select(&registry.orders, &config.orders, "orders")?;
	let orders = OrderStatusService::new(factory(backend)?);

	let session = Arc::new(SessionManager::new(
		store.clone(),
		auth,
		navigator,
		config.app.unauthenticated_entry_point.clone(),
	));

	Ok(App {
		config,
		store,
		session,
		orders,
	})
}
