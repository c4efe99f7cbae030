//! Schema Registry
//!
//! Struct and field definitions the path engine walks. A field carries its
//! base type, its key name and the shape of every array level declared on it.
//! Array levels are stored outer-to-inner: `Item[2][]` is a dynamic array of
//! fixed-size-2 arrays, so its levels are `[Dynamic, Fixed(2)]`.

use super::encoder::{encode_type, keccak256};
use super::types::{is_primitive_type, TypedDataField};
use crate::error::{Eip712Error, Eip712Result};
use std::collections::HashMap;
use std::fmt;

/// Shape of one array level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayLevel {
    /// `T[]`
    Dynamic,
    /// `T[n]`
    Fixed(u8),
}

impl fmt::Display for ArrayLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArrayLevel::Dynamic => write!(f, "[]"),
            ArrayLevel::Fixed(n) => write!(f, "[{}]", n),
        }
    }
}

/// Base type of a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Encoded as a leaf value
    Primitive(String),
    /// Reference to another struct type
    Custom(String),
}

/// A field of a struct definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub kind: FieldKind,
    pub key_name: String,
    pub array_levels: Vec<ArrayLevel>,
}

impl FieldDef {
    /// Parse a declaration like `("to", "Person[]")`
    pub fn parse(key_name: &str, declared_type: &str) -> Eip712Result<Self> {
        let (base, levels) = split_array_levels(declared_type)?;
        let kind = if is_primitive_type(base) {
            FieldKind::Primitive(base.to_string())
        } else {
            FieldKind::Custom(base.to_string())
        };
        Ok(Self {
            kind,
            key_name: key_name.to_string(),
            array_levels: levels,
        })
    }

    /// Base type name, without array levels
    pub fn type_name(&self) -> &str {
        match &self.kind {
            FieldKind::Primitive(name) | FieldKind::Custom(name) => name,
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self.kind, FieldKind::Custom(_))
    }

    pub fn type_is_array(&self) -> bool {
        !self.array_levels.is_empty()
    }

    /// Canonical textual type, as it appears in `encodeType`
    pub fn declared_type(&self) -> String {
        let mut out = self.type_name().to_string();
        for level in self.array_levels.iter().rev() {
            out.push_str(&level.to_string());
        }
        out
    }
}

/// A struct definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructDef {
    pub name: String,
    pub fields: Vec<FieldDef>,
}

impl StructDef {
    /// Look up a field by key name
    pub fn field(&self, key_name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.key_name == key_name)
    }
}

/// Source of struct definitions consumed by the path engine
pub trait SchemaRegistry {
    /// Resolve a struct by name
    fn get_struct(&self, name: &str) -> Option<&StructDef>;

    /// Precomputed `keccak256(encodeType(name))`
    fn type_hash(&self, name: &str) -> Option<[u8; 32]>;
}

/// Registry built from the `types` section of a typed-data document
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    structs: HashMap<String, StructDef>,
    type_hashes: HashMap<String, [u8; 32]>,
}

impl TypeRegistry {
    /// Build and validate a registry, precomputing every type hash
    pub fn from_types(types: &HashMap<String, Vec<TypedDataField>>) -> Eip712Result<Self> {
        let mut structs = HashMap::with_capacity(types.len());
        for (name, fields) in types {
            if fields.is_empty() {
                return Err(Eip712Error::InvalidSchema(format!("struct {} has no fields", name)));
            }
            // field indices are stored as u8
            if fields.len() > usize::from(u8::MAX) {
                return Err(Eip712Error::InvalidSchema(format!(
                    "struct {} has {} fields",
                    name,
                    fields.len()
                )));
            }
            let fields = fields
                .iter()
                .map(|f| FieldDef::parse(&f.name, &f.type_name))
                .collect::<Eip712Result<Vec<_>>>()?;
            structs.insert(
                name.clone(),
                StructDef {
                    name: name.clone(),
                    fields,
                },
            );
        }

        for def in structs.values() {
            for field in &def.fields {
                if field.is_custom() && !structs.contains_key(field.type_name()) {
                    return Err(Eip712Error::UnknownType(field.type_name().to_string()));
                }
            }
        }

        let mut registry = Self {
            structs,
            type_hashes: HashMap::new(),
        };
        let names: Vec<String> = registry.structs.keys().cloned().collect();
        for name in names {
            let hash = keccak256(encode_type(&name, &registry)?.as_bytes());
            registry.type_hashes.insert(name, hash);
        }
        Ok(registry)
    }

    /// Number of struct types known
    pub fn len(&self) -> usize {
        self.structs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.structs.is_empty()
    }
}

impl SchemaRegistry for TypeRegistry {
    fn get_struct(&self, name: &str) -> Option<&StructDef> {
        self.structs.get(name)
    }

    fn type_hash(&self, name: &str) -> Option<[u8; 32]> {
        self.type_hashes.get(name).copied()
    }
}

/// Split `T[2][]` into `T` and its levels, outer-to-inner
fn split_array_levels(declared_type: &str) -> Eip712Result<(&str, Vec<ArrayLevel>)> {
    let invalid = || Eip712Error::InvalidSchema(format!("malformed type '{}'", declared_type));

    let (base, mut rest) = match declared_type.find('[') {
        Some(pos) => declared_type.split_at(pos),
        None if declared_type.contains(']') => return Err(invalid()),
        None => (declared_type, ""),
    };
    if base.is_empty() {
        return Err(invalid());
    }

    let mut levels = Vec::new();
    while !rest.is_empty() {
        let inner = rest.strip_prefix('[').ok_or_else(invalid)?;
        let close = inner.find(']').ok_or_else(invalid)?;
        let size = &inner[..close];
        if size.is_empty() {
            levels.push(ArrayLevel::Dynamic);
        } else {
            let n: u8 = size.parse().map_err(|_| invalid())?;
            if n == 0 {
                return Err(invalid());
            }
            levels.push(ArrayLevel::Fixed(n));
        }
        rest = &inner[close + 1..];
    }

    // textual order is inner-to-outer
    levels.reverse();
    Ok((base, levels))
}

#[cfg(test)]
mod schema_tests {
    use super::*;

    fn mail_types() -> HashMap<String, Vec<TypedDataField>> {
        let mut types = HashMap::new();
        types.insert(
            "Mail".to_string(),
            vec![
                TypedDataField::new("from", "Person"),
                TypedDataField::new("to", "Person"),
                TypedDataField::new("contents", "string"),
            ],
        );
        types.insert(
            "Person".to_string(),
            vec![
                TypedDataField::new("name", "string"),
                TypedDataField::new("wallet", "address"),
            ],
        );
        types
    }

    #[test]
    fn test_parse_array_levels() {
        let field = FieldDef::parse("grid", "Item[2][]").unwrap();
        assert_eq!(field.kind, FieldKind::Custom("Item".to_string()));
        assert_eq!(field.array_levels, vec![ArrayLevel::Dynamic, ArrayLevel::Fixed(2)]);
        assert_eq!(field.declared_type(), "Item[2][]");

        let field = FieldDef::parse("amount", "uint256").unwrap();
        assert!(!field.type_is_array());
        assert!(!field.is_custom());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(FieldDef::parse("a", "uint256[").is_err());
        assert!(FieldDef::parse("a", "uint256]").is_err());
        assert!(FieldDef::parse("a", "uint256[0]").is_err());
        assert!(FieldDef::parse("a", "uint256[x]").is_err());
        assert!(FieldDef::parse("a", "uint256[256]").is_err());
        assert!(FieldDef::parse("a", "[2]").is_err());
    }

    #[test]
    fn test_registry_type_hashes() {
        let registry = TypeRegistry::from_types(&mail_types()).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(
            hex::encode(registry.type_hash("Mail").unwrap()),
            "a0cedeb2dc280ba39b857546d74f5549c3a1d7bdc2dd96bf881f76108e23dac2"
        );
        assert_eq!(
            registry.get_struct("Person").unwrap().field("wallet").unwrap().type_name(),
            "address"
        );
    }

    #[test]
    fn test_registry_rejects_unknown_reference() {
        let mut types = mail_types();
        types.remove("Person");
        assert!(matches!(
            TypeRegistry::from_types(&types),
            Err(Eip712Error::UnknownType(name)) if name == "Person"
        ));
    }

    #[test]
    fn test_registry_rejects_empty_struct() {
        let mut types = mail_types();
        types.insert("Empty".to_string(), Vec::new());
        assert!(matches!(
            TypeRegistry::from_types(&types),
            Err(Eip712Error::InvalidSchema(_))
        ));
    }

    #[test]
    fn test_registry_rejects_oversized_struct() {
        let mut types = mail_types();
        let fields = (0..256)
            .map(|i| TypedDataField::new(format!("f{}", i), "bool"))
            .collect();
        types.insert("Wide".to_string(), fields);
        assert!(matches!(
            TypeRegistry::from_types(&types),
            Err(Eip712Error::InvalidSchema(_))
        ));
    }
}
