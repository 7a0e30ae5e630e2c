// Build-time identity, reported by GET /version and sent as the metrics store User-Agent.

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const NAME: &str = env!("CARGO_PKG_NAME");

/// `<name>/<version>`
pub fn user_agent() -> String {
    format!("{NAME}/{VERSION}")
}
