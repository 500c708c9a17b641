//! satchel-core - Core library for Satchel
//!
//! This crate contains the record model, cache store, merge/reconcile
//! logic, and the offline-first sync engine used by the Satchel CLI.

pub mod config;
pub mod connectivity;
pub mod error;
pub mod models;
pub mod normalize;
pub mod reconcile;
pub mod remote;
pub mod resource;
pub mod store;
pub mod sync;
pub mod util;

pub use config::ResourceOptions;
pub use error::{Error, Result};
pub use models::{Op, Record, RecordId, Session};
pub use resource::ResourceClient;
