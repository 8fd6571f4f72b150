// src/repository/mod.rs

//! Binary package indexes and provider resolution
//!
//! This module provides:
//! - Parsing of binary package indexes (plain or archived)
//! - Provider tables with version-wins-on-duplicate insertion
//! - A cached index store keyed by path and modification time
//! - Provider selection with a fixed, deterministic priority policy

pub mod cache;
pub mod index;
pub mod selector;
pub mod table;

pub use cache::IndexStore;
pub use index::{load_records, parse_index, read_index_text, IndexRecord, INDEX_MEMBER};
pub use selector::{pick_provider, PickReason, ProviderChoice, ProviderContext};
pub use table::{insert_provider, ProviderTable, Providers};
