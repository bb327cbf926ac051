// Adapters layer: concrete implementations for external systems (filesystem, parser output).

pub mod json_source;
pub mod storage;

pub use storage::LocalStorage;
