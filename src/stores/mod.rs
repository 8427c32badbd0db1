//! External boundaries (spec §6): ingestion source, similarity provider,
//! insight store, results cache. `traits` defines the contracts; `memory`
//! is the `DashMap`-backed reference implementation the `local` feature
//! wires up by default.

pub mod memory;
pub mod traits;

#[cfg(feature = "similarity-client")]
pub mod http_similarity;
