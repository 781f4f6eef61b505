//! Airtable Roulette - list and randomly delete Airtable records over HTTP
//!
//! A Rust service providing:
//! - Health and version endpoints
//! - A capped listing of the configured table
//! - Deletion of one uniformly chosen record from the table

pub mod airtable;
pub mod api;
pub mod config;
pub mod error;
pub mod records;
pub mod selection;
pub mod server;

pub use airtable::{AirtableClient, AirtableError, Record, RecordStore};
pub use config::{AppConfig, SharedConfig};
pub use error::ServiceError;
