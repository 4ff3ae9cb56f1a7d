pub mod analytics;
pub mod crypto;
pub mod dataset;
pub mod error;
pub mod files;
pub mod generator;
pub mod sources;
pub mod worldbank;
