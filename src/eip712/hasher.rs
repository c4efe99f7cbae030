//! EIP-712 Hashing
//!
//! Reference digests of a whole typed-data document, and the final
//! `0x1901` signing hash that combines domain and message hashes.

use super::encoder::{hash_struct, keccak256};
use super::schema::TypeRegistry;
use super::types::{TypedData, DOMAIN_STRUCT_NAME};
use crate::error::Eip712Error;

/// Magic prefix for EIP-712 encoding
const EIP712_PREFIX: &[u8] = b"\x19\x01";

/// hash = keccak256("\x19\x01" || domainSeparator || hashStruct(message))
pub fn signing_hash(domain_separator: &[u8; 32], struct_hash: &[u8; 32]) -> [u8; 32] {
    let mut data = Vec::with_capacity(2 + 32 + 32);
    data.extend_from_slice(EIP712_PREFIX);
    data.extend_from_slice(domain_separator);
    data.extend_from_slice(struct_hash);
    keccak256(&data)
}

/// Pre-image components (for external signing)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eip712PreImage {
    pub domain_separator: [u8; 32],
    pub struct_hash: [u8; 32],
    pub final_hash: [u8; 32],
}

impl Eip712PreImage {
    pub fn new(domain_separator: [u8; 32], struct_hash: [u8; 32]) -> Self {
        Self {
            domain_separator,
            struct_hash,
            final_hash: signing_hash(&domain_separator, &struct_hash),
        }
    }
}

/// Calculate the pre-image components with the reference encoder
pub fn get_pre_image(typed_data: &TypedData) -> Result<Eip712PreImage, Eip712Error> {
    typed_data.validate()?;
    let registry = TypeRegistry::from_types(&typed_data.types_with_domain())?;

    let domain_separator = hash_struct(DOMAIN_STRUCT_NAME, &typed_data.domain, &registry)?;
    let struct_hash = hash_struct(&typed_data.primary_type, &typed_data.message, &registry)?;

    Ok(Eip712PreImage::new(domain_separator, struct_hash))
}

/// Calculate the final EIP-712 hash for signing
pub fn hash_typed_data(typed_data: &TypedData) -> Result<[u8; 32], Eip712Error> {
    Ok(get_pre_image(typed_data)?.final_hash)
}
