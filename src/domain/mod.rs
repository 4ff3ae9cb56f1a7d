pub mod entities;
pub mod error;
pub mod indicators;
pub mod markets;
pub mod types;
