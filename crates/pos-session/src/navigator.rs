//! Navigation capability used to send the user back to the entry point.

/// Something that can move the user to another route.
pub trait Navigator: Send + Sync {
	fn redirect(&self, target: &str);
}

/// Navigator for headless use: records the redirect in the log.
#[derive(Debug, Default)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
	fn redirect(&self, target: &str) {
		tracing::info!(route = %target, "Redirecting");
	}
}
