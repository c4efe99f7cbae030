//! EIP-712 Type Definitions
//!
//! JSON document model for typed structured data and classification of the
//! primitive (non-struct) types.

use crate::error::Eip712Error;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Reserved name of the domain struct
pub const DOMAIN_STRUCT_NAME: &str = "EIP712Domain";

/// A field in a struct type definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TypedDataField {
    /// The name of the field
    pub name: String,
    /// The type of the field (e.g., "address", "uint256", "Person[]")
    #[serde(rename = "type")]
    pub type_name: String,
}

impl TypedDataField {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// Complete EIP-712 typed data document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedData {
    /// Type definitions (struct name -> fields)
    pub types: HashMap<String, Vec<TypedDataField>>,

    /// The name of the primary type being signed
    pub primary_type: String,

    /// The EIP-712 domain values
    pub domain: serde_json::Value,

    /// The actual message data to sign
    pub message: serde_json::Value,
}

impl TypedData {
    /// Parse typed data from a JSON string
    pub fn from_json(json: &str) -> Result<Self, Eip712Error> {
        serde_json::from_str(json).map_err(|e| Eip712Error::InvalidJson(e.to_string()))
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, Eip712Error> {
        serde_json::to_string(self).map_err(|e| Eip712Error::InvalidJson(e.to_string()))
    }

    /// Type definitions, with the domain struct derived from the domain
    /// values when the document does not declare it
    pub fn types_with_domain(&self) -> HashMap<String, Vec<TypedDataField>> {
        let mut types = self.types.clone();
        if !types.contains_key(DOMAIN_STRUCT_NAME) {
            types.insert(DOMAIN_STRUCT_NAME.to_string(), self.get_domain_type());
        }
        types
    }

    /// Get the domain type fields based on which fields are present
    pub fn get_domain_type(&self) -> Vec<TypedDataField> {
        let known = [
            ("name", "string"),
            ("version", "string"),
            ("chainId", "uint256"),
            ("verifyingContract", "address"),
            ("salt", "bytes32"),
        ];

        known
            .iter()
            .filter(|(name, _)| self.domain.get(*name).is_some_and(|v| !v.is_null()))
            .map(|(name, type_name)| TypedDataField::new(*name, *type_name))
            .collect()
    }

    /// Validate the typed data structure
    pub fn validate(&self) -> Result<(), Eip712Error> {
        // Check that primary type exists in types
        if !self.types.contains_key(&self.primary_type) {
            return Err(Eip712Error::InvalidPrimaryType(self.primary_type.clone()));
        }

        // Validate all type references
        for fields in self.types.values() {
            for field in fields {
                self.validate_type(&field.type_name)?;
            }
        }

        Ok(())
    }

    /// Check if a type is valid (either a built-in type or defined in types)
    fn validate_type(&self, type_name: &str) -> Result<(), Eip712Error> {
        let base_type = match type_name.find('[') {
            Some(bracket_pos) => &type_name[..bracket_pos],
            None if type_name.ends_with(']') => {
                return Err(Eip712Error::InvalidType(type_name.to_string()));
            }
            None => type_name,
        };

        if is_primitive_type(base_type) || self.types.contains_key(base_type) {
            return Ok(());
        }

        Err(Eip712Error::InvalidType(type_name.to_string()))
    }
}

/// Check if a type is an atomic (fixed-size) type
pub fn is_atomic_type(type_name: &str) -> bool {
    if type_name == "address" || type_name == "bool" {
        return true;
    }

    // uintN and intN
    let bits = type_name
        .strip_prefix("uint")
        .or_else(|| type_name.strip_prefix("int"));
    if let Some(bits) = bits {
        if let Ok(n) = bits.parse::<u32>() {
            return n > 0 && n <= 256 && n % 8 == 0;
        }
        return false;
    }

    // bytesN (fixed-size bytes)
    if let Some(size) = type_name.strip_prefix("bytes") {
        if let Ok(n) = size.parse::<u32>() {
            return n > 0 && n <= 32;
        }
    }

    false
}

/// Check if a type is a dynamic type
pub fn is_dynamic_type(type_name: &str) -> bool {
    type_name == "bytes" || type_name == "string"
}

/// Check if a type is encoded as a leaf (not a struct reference)
pub fn is_primitive_type(type_name: &str) -> bool {
    is_atomic_type(type_name) || is_dynamic_type(type_name)
}
