//! Core types and operations for a provenance ledger: decision and risk
//! records stored as one JSON document each.
//!
//! This crate holds no filesystem code. Storage sits behind the
//! [`store::RecordStore`] trait, implemented by backend crates such as
//! `prov-store-fs`.

pub mod config;
pub mod error;
pub mod id;
pub mod ledger;
pub mod migrate;
pub mod record;
pub mod schema;
pub mod search;
pub mod sequence;
pub mod store;
pub mod validate;


pub use error::{Error, Result};
