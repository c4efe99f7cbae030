//! EIP-712 Typed Data Hashing
//!
//! Typed-data model, schema registry and the reference (whole-document)
//! encoder, plus the streaming driver that hashes the same document through
//! the incremental path engine.
//!
//! # Reference
//! - <https://eips.ethereum.org/EIPS/eip-712>
//!
//! # Example
//! ```rust,no_run
//! use eip712_path::config::EngineConfig;
//! use eip712_path::eip712::{stream_typed_data, TypedData};
//!
//! # fn main() -> Result<(), eip712_path::Eip712Error> {
//! # let json_string = String::new();
//! let typed_data = TypedData::from_json(&json_string)?;
//! let pre_image = stream_typed_data(&typed_data, EngineConfig::standard())?;
//! println!("{}", hex::encode(pre_image.final_hash));
//! # Ok(())
//! # }
//! ```

pub mod types;
pub mod schema;
pub mod encoder;
pub mod hasher;
pub mod streamer;

pub use types::*;
pub use schema::*;
pub use encoder::*;
pub use hasher::*;
pub use streamer::*;
