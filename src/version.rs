// Identity reported by GET /version, taken from Cargo.toml at build time.

pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
