//! Filesystem backend for a provenance ledger.
//!
//! Every record is one pretty-printed JSON file under the ledger's
//! decisions or risks directory. Registries, templates and bundled schemas
//! live alongside them under `provenance/`.

mod encode;
mod layout;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use layout::CONFIG_PATH;
pub use store::FsStore;

#[cfg(test)]
mod tests;
