//! EIP-712 Type Encoding
//!
//! Implements the encoding rules for EIP-712 typed data: `encodeType`,
//! `typeHash`, the 32-byte encoding of leaf values and a reference
//! (non-incremental) `hashStruct` used to cross-check the streaming engine.

use super::schema::{ArrayLevel, FieldDef, FieldKind, SchemaRegistry};
use super::types::is_dynamic_type;
use crate::error::{Eip712Error, Eip712Result};
use std::collections::BTreeSet;
use tiny_keccak::{Hasher, Keccak};

/// Encode a type string for a struct type
/// Format: "TypeName(type1 name1,type2 name2,...)Dep1(...)..."
pub fn encode_type<R>(type_name: &str, registry: &R) -> Eip712Result<String>
where
    R: SchemaRegistry + ?Sized,
{
    let def = registry
        .get_struct(type_name)
        .ok_or_else(|| Eip712Error::UnknownType(type_name.to_string()))?;

    // Build the type string: primary type first, then dependencies alphabetically
    let mut result = format_type_string(type_name, &def.fields);
    for dep in find_type_dependencies(type_name, registry) {
        if dep == type_name {
            continue;
        }
        if let Some(dep_def) = registry.get_struct(&dep) {
            result.push_str(&format_type_string(&dep, &dep_def.fields));
        }
    }

    Ok(result)
}

/// Format a single type string
fn format_type_string(type_name: &str, fields: &[FieldDef]) -> String {
    let field_strs: Vec<String> = fields
        .iter()
        .map(|f| format!("{} {}", f.declared_type(), f.key_name))
        .collect();

    format!("{}({})", type_name, field_strs.join(","))
}

/// Find all struct types reachable from `type_name`, itself included
pub fn find_type_dependencies<R>(type_name: &str, registry: &R) -> BTreeSet<String>
where
    R: SchemaRegistry + ?Sized,
{
    let mut dependencies = BTreeSet::new();
    let mut to_visit = vec![type_name.to_string()];

    while let Some(current) = to_visit.pop() {
        if dependencies.contains(&current) {
            continue;
        }

        if let Some(def) = registry.get_struct(&current) {
            dependencies.insert(current.clone());

            for field in def.fields.iter().filter(|f| f.is_custom()) {
                if !dependencies.contains(field.type_name()) {
                    to_visit.push(field.type_name().to_string());
                }
            }
        }
    }

    dependencies
}

/// Calculate the type hash for a struct type
/// typeHash = keccak256(encodeType(typeOf(s)))
pub fn type_hash<R>(type_name: &str, registry: &R) -> Eip712Result<[u8; 32]>
where
    R: SchemaRegistry + ?Sized,
{
    let encoded = encode_type(type_name, registry)?;
    Ok(keccak256(encoded.as_bytes()))
}

/// Hash a struct according to EIP-712, all at once
///
/// hashStruct(s) = keccak256(typeHash || encodeData(s))
pub fn hash_struct<R>(type_name: &str, value: &serde_json::Value, registry: &R) -> Eip712Result<[u8; 32]>
where
    R: SchemaRegistry + ?Sized,
{
    let encoded = encode_data(type_name, value, registry)?;
    Ok(keccak256(&encoded))
}

/// `typeHash || encodeData(s)` for a struct value
pub fn encode_data<R>(type_name: &str, value: &serde_json::Value, registry: &R) -> Eip712Result<Vec<u8>>
where
    R: SchemaRegistry + ?Sized,
{
    let obj = value.as_object().ok_or_else(|| Eip712Error::InvalidValue {
        type_name: type_name.to_string(),
        value: value.to_string(),
    })?;

    let def = registry
        .get_struct(type_name)
        .ok_or_else(|| Eip712Error::UnknownType(type_name.to_string()))?;

    let mut encoded = Vec::with_capacity(32 * (def.fields.len() + 1));
    encoded.extend_from_slice(&type_hash(type_name, registry)?);

    for field in &def.fields {
        let field_value = obj.get(&field.key_name).ok_or_else(|| {
            Eip712Error::MissingField(format!("{}.{}", type_name, field.key_name))
        })?;
        encoded.extend_from_slice(&encode_member(field, &field.array_levels, field_value, registry)?);
    }

    Ok(encoded)
}

/// Encode one member word; nested structs and arrays collapse to their hash
fn encode_member<R>(
    field: &FieldDef,
    levels: &[ArrayLevel],
    value: &serde_json::Value,
    registry: &R,
) -> Eip712Result<[u8; 32]>
where
    R: SchemaRegistry + ?Sized,
{
    if let Some((outer, inner)) = levels.split_first() {
        let items = value.as_array().ok_or_else(|| Eip712Error::InvalidValue {
            type_name: field.declared_type(),
            value: value.to_string(),
        })?;
        if let ArrayLevel::Fixed(n) = outer {
            if items.len() != usize::from(*n) {
                return Err(Eip712Error::InvalidValue {
                    type_name: field.declared_type(),
                    value: format!("expected {} elements, got {}", n, items.len()),
                });
            }
        }

        let mut encoded = Vec::with_capacity(32 * items.len());
        for item in items {
            encoded.extend_from_slice(&encode_member(field, inner, item, registry)?);
        }
        return Ok(keccak256(&encoded));
    }

    match &field.kind {
        FieldKind::Custom(name) => hash_struct(name, value, registry),
        FieldKind::Primitive(name) => encode_leaf(name, value),
    }
}

/// Encode a leaf value as the 32-byte word fed into its parent's context
pub fn encode_leaf(type_name: &str, value: &serde_json::Value) -> Eip712Result<[u8; 32]> {
    if is_dynamic_type(type_name) {
        let bytes = if type_name == "string" {
            encode_string(value)?
        } else {
            encode_bytes(value)?
        };
        return Ok(keccak256(&bytes));
    }
    encode_atomic(type_name, value)
}

/// Encode an atomic (fixed-size) value
fn encode_atomic(type_name: &str, value: &serde_json::Value) -> Eip712Result<[u8; 32]> {
    let invalid = || Eip712Error::InvalidValue {
        type_name: type_name.to_string(),
        value: value.to_string(),
    };
    let mut result = [0u8; 32];

    // address - 20 bytes, left-padded to 32
    if type_name == "address" {
        let addr = value.as_str().ok_or_else(invalid)?;
        result[12..].copy_from_slice(&parse_address(addr)?);
        return Ok(result);
    }

    // bool
    if type_name == "bool" {
        let b = value.as_bool().ok_or_else(invalid)?;
        result[31] = u8::from(b);
        return Ok(result);
    }

    // uintN
    if type_name.starts_with("uint") {
        return parse_uint(value).ok_or_else(invalid);
    }

    // intN, two's complement
    if type_name.starts_with("int") {
        return parse_int(value).ok_or_else(invalid);
    }

    // bytesN (fixed-size bytes, right-padded)
    if let Some(size) = type_name.strip_prefix("bytes") {
        let size: usize = size
            .parse()
            .map_err(|_| Eip712Error::InvalidType(type_name.to_string()))?;
        let bytes = parse_hex(value.as_str().ok_or_else(invalid)?)?;
        if bytes.len() > size {
            return Err(Eip712Error::InvalidValue {
                type_name: type_name.to_string(),
                value: format!("bytes too long: {} > {}", bytes.len(), size),
            });
        }
        result[..bytes.len()].copy_from_slice(&bytes);
        return Ok(result);
    }

    Err(Eip712Error::InvalidType(type_name.to_string()))
}

/// Encode dynamic bytes
fn encode_bytes(value: &serde_json::Value) -> Eip712Result<Vec<u8>> {
    let hex_str = value.as_str().ok_or_else(|| Eip712Error::InvalidValue {
        type_name: "bytes".to_string(),
        value: value.to_string(),
    })?;

    parse_hex(hex_str)
}

/// Encode a string value
fn encode_string(value: &serde_json::Value) -> Eip712Result<Vec<u8>> {
    let s = value.as_str().ok_or_else(|| Eip712Error::InvalidValue {
        type_name: "string".to_string(),
        value: value.to_string(),
    })?;

    Ok(s.as_bytes().to_vec())
}

/// Parse an Ethereum address
fn parse_address(addr: &str) -> Eip712Result<[u8; 20]> {
    let addr = addr.strip_prefix("0x").unwrap_or(addr);

    if addr.len() != 40 {
        return Err(Eip712Error::InvalidAddress(format!(
            "invalid length: expected 40 hex chars, got {}",
            addr.len()
        )));
    }

    let bytes = hex::decode(addr)
        .map_err(|e| Eip712Error::InvalidAddress(format!("invalid hex: {}", e)))?;

    let mut result = [0u8; 20];
    result.copy_from_slice(&bytes);
    Ok(result)
}

/// Parse an unsigned value (number, decimal string or hex string)
fn parse_uint(value: &serde_json::Value) -> Option<[u8; 32]> {
    match value {
        serde_json::Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                let mut word = [0u8; 32];
                word[24..].copy_from_slice(&u.to_be_bytes());
                return Some(word);
            }
            parse_decimal(&n.to_string())
        }
        serde_json::Value::String(s) => {
            if let Some(hex_digits) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                let bytes = parse_hex(hex_digits).ok()?;
                if bytes.len() > 32 {
                    return None;
                }
                let mut word = [0u8; 32];
                word[32 - bytes.len()..].copy_from_slice(&bytes);
                Some(word)
            } else {
                parse_decimal(s)
            }
        }
        _ => None,
    }
}

/// Parse a signed value into its 256-bit two's complement
fn parse_int(value: &serde_json::Value) -> Option<[u8; 32]> {
    let negative = match value {
        serde_json::Value::Number(n) => n.as_i64().map(|i| i < 0).unwrap_or(false),
        serde_json::Value::String(s) => s.starts_with('-'),
        _ => return None,
    };
    if !negative {
        return parse_uint(value);
    }

    let magnitude = match value {
        serde_json::Value::Number(n) => n.as_i64()?.unsigned_abs().to_string(),
        serde_json::Value::String(s) => s[1..].to_string(),
        _ => return None,
    };
    let mut word = parse_decimal(&magnitude)?;

    // negate: invert and add one
    for byte in word.iter_mut() {
        *byte = !*byte;
    }
    for byte in word.iter_mut().rev() {
        let (sum, carry) = byte.overflowing_add(1);
        *byte = sum;
        if !carry {
            break;
        }
    }
    Some(word)
}

/// Parse a decimal string into a big-endian 256-bit word
fn parse_decimal(s: &str) -> Option<[u8; 32]> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let mut word = [0u8; 32];
    for digit in s.bytes().map(|b| b - b'0') {
        let mut carry = u16::from(digit);
        for byte in word.iter_mut().rev() {
            let acc = u16::from(*byte) * 10 + carry;
            *byte = (acc & 0xff) as u8;
            carry = acc >> 8;
        }
        if carry != 0 {
            return None;
        }
    }
    Some(word)
}

/// Parse a hex string (with or without 0x prefix)
fn parse_hex(s: &str) -> Eip712Result<Vec<u8>> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let s = s.strip_prefix("0X").unwrap_or(s);

    Ok(hex::decode(s)?)
}

/// Compute keccak256 hash
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(data);
    hasher.finalize(&mut output);
    output
}
