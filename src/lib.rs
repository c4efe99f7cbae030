//! EIP-712 Path Engine Library
//!
//! Streaming EIP-712 hashing for signers that cannot hold a whole typed-data
//! message in memory.
//!
//! # Architecture
//!
//! This crate provides:
//! - **path**: Traversal engine, hash-context stack, cursor and backup cursor
//! - **eip712**: Typed-data model, schema registry, reference encoder and
//!   the streaming driver
//! - **config**: Capacity limits of a path session
//! - **error**: Unified error type
//! - **utils**: Structured logging
//!
//! # Example
//!
//! ```rust,no_run
//! use eip712_path::{stream_typed_data, EngineConfig, TypedData};
//!
//! # fn main() -> Result<(), eip712_path::Eip712Error> {
//! # let json = std::fs::read_to_string("mail.json").unwrap_or_default();
//! let typed_data = TypedData::from_json(&json)?;
//! let pre_image = stream_typed_data(&typed_data, EngineConfig::standard())?;
//! println!("0x{}", hex::encode(pre_image.final_hash));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod eip712;
pub mod error;
pub mod path;
pub mod utils;

pub use config::{EngineConfig, Preset};
pub use eip712::{
    get_pre_image, hash_typed_data, signing_hash, stream_typed_data, Eip712PreImage,
    SchemaRegistry, TypeRegistry, TypedData,
};
pub use error::{Eip712Error, Eip712Result, ErrorCode};
pub use path::{Digests, PathEngine, RootType};
