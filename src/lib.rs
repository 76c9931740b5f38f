// Library for tests to access modules

pub mod broadcaster;
pub mod client;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod models;
pub mod ratelimit;
pub mod routes;
pub mod telemetry;
pub mod validate;
pub mod version;
