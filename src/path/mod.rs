//! EIP-712 Path Engine
//!
//! Incremental hashing of typed data in the order a signer receives it.
//! The engine follows the schema one field at a time and folds every nested
//! struct and array into its parent as soon as the scope closes, so only one
//! hash context per open scope is ever held.
//!
//! # Example
//! ```rust,no_run
//! use eip712_path::config::EngineConfig;
//! use eip712_path::eip712::{encode_leaf, TypeRegistry, TypedData};
//! use eip712_path::path::PathEngine;
//! use serde_json::json;
//!
//! # fn main() -> Result<(), eip712_path::Eip712Error> {
//! # let typed_data = TypedData::from_json("")?;
//! let registry = TypeRegistry::from_types(&typed_data.types_with_domain())?;
//! let mut engine = PathEngine::new(&registry, EngineConfig::standard())?;
//! engine.set_root("EIP712Domain")?;
//! engine.feed(&encode_leaf("string", &json!("Ether Mail"))?)?;
//! engine.advance()?;
//! # Ok(())
//! # }
//! ```

pub mod backup;
pub mod engine;
pub mod hash_stack;
pub mod state;

pub use backup::{BackupPath, ARRAY_SEGMENT};
pub use engine::{Digests, PathEngine};
pub use hash_stack::{HashContext, HashStack};
pub use state::{ArrayDepth, PathState, RootType};
