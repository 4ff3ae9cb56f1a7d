pub mod csvio;
pub mod error;
pub mod http;
pub mod providers;
pub mod telemetry;
