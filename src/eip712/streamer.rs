//! Typed Data Streaming
//!
//! Drives a [`PathEngine`] through a whole typed-data document in the order a
//! signer receives it: the domain first, then the primary type. Every array
//! is declared before its elements, struct fields are visited in schema
//! order, and each leaf is encoded, fed and advanced past.

use super::encoder::encode_leaf;
use super::hasher::Eip712PreImage;
use super::schema::{ArrayLevel, FieldDef, FieldKind, SchemaRegistry, TypeRegistry};
use super::types::{TypedData, DOMAIN_STRUCT_NAME};
use crate::config::EngineConfig;
use crate::error::{Eip712Error, Eip712Result};
use crate::log_info;
use crate::path::{PathEngine, RootType};
use serde_json::Value;

const LOG_MODULE: &str = "streamer";

/// Hash a typed-data document incrementally
pub fn stream_typed_data(typed_data: &TypedData, config: EngineConfig) -> Eip712Result<Eip712PreImage> {
    typed_data.validate()?;
    let registry = TypeRegistry::from_types(&typed_data.types_with_domain())?;
    let mut engine = PathEngine::new(&registry, config)?;

    let domain_separator = stream_struct(&mut engine, DOMAIN_STRUCT_NAME, &typed_data.domain)?;
    let struct_hash = stream_struct(&mut engine, &typed_data.primary_type, &typed_data.message)?;

    log_info!(
        LOG_MODULE,
        "document hashed",
        primary_type = typed_data.primary_type,
        structs = registry.len(),
    );
    Ok(Eip712PreImage::new(domain_separator, struct_hash))
}

/// Stream one root struct and return its hash
pub fn stream_struct<R>(engine: &mut PathEngine<'_, R>, type_name: &str, value: &Value) -> Eip712Result<[u8; 32]>
where
    R: SchemaRegistry + ?Sized,
{
    let def = engine
        .registry()
        .get_struct(type_name)
        .ok_or_else(|| Eip712Error::UnknownType(type_name.to_string()))?;

    engine.set_root(type_name)?;
    stream_fields(engine, type_name, &def.fields, value)?;

    let digests = engine.digests();
    let digest = match engine.root_type() {
        RootType::Domain => digests.domain_hash,
        RootType::Message => digests.message_hash,
    };
    // the last advance closes the root
    digest.ok_or_else(|| Eip712Error::EncodingError(format!("{} did not close", type_name)))
}

fn stream_fields<R>(
    engine: &mut PathEngine<'_, R>,
    type_name: &str,
    fields: &[FieldDef],
    value: &Value,
) -> Eip712Result<()>
where
    R: SchemaRegistry + ?Sized,
{
    let obj = value.as_object().ok_or_else(|| Eip712Error::InvalidValue {
        type_name: type_name.to_string(),
        value: value.to_string(),
    })?;

    for field in fields {
        let member = obj
            .get(&field.key_name)
            .ok_or_else(|| Eip712Error::MissingField(format!("{}.{}", type_name, field.key_name)))?;
        stream_member(engine, field, &field.array_levels, member)?;
    }
    Ok(())
}

fn stream_member<R>(
    engine: &mut PathEngine<'_, R>,
    field: &FieldDef,
    levels: &[ArrayLevel],
    value: &Value,
) -> Eip712Result<()>
where
    R: SchemaRegistry + ?Sized,
{
    if let Some((_, inner)) = levels.split_first() {
        let items = value.as_array().ok_or_else(|| Eip712Error::InvalidValue {
            type_name: field.declared_type(),
            value: value.to_string(),
        })?;
        engine.open_array_len(items.len())?;
        for item in items {
            stream_member(engine, field, inner, item)?;
        }
        return Ok(());
    }

    match &field.kind {
        FieldKind::Custom(name) => {
            let def = engine
                .registry()
                .get_struct(name)
                .ok_or_else(|| Eip712Error::UnknownType(name.clone()))?;
            stream_fields(engine, name, &def.fields, value)
        }
        FieldKind::Primitive(name) => {
            let word = encode_leaf(name, value)?;
            engine.feed(&word)?;
            engine.advance()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eip712::hasher::get_pre_image;

    fn document(message: Value, types: Value) -> TypedData {
        serde_json::from_value(serde_json::json!({
            "types": types,
            "primaryType": "Order",
            "domain": {"name": "Shop", "chainId": 5},
            "message": message
        }))
        .unwrap()
    }

    fn order_types() -> Value {
        serde_json::json!({
            "Order": [
                {"name": "id", "type": "uint64"},
                {"name": "lines", "type": "Line[]"},
                {"name": "notes", "type": "string[]"},
                {"name": "buyer", "type": "address"}
            ],
            "Line": [
                {"name": "sku", "type": "bytes32"},
                {"name": "qty", "type": "uint16"},
                {"name": "price", "type": "int256"}
            ]
        })
    }

    #[test]
    fn test_stream_matches_reference() {
        let typed_data = document(
            serde_json::json!({
                "id": 42,
                "lines": [
                    {"sku": "0x01", "qty": 2, "price": "-15"},
                    {"sku": "0x02", "qty": 1, "price": "1000000000000000000000000"}
                ],
                "notes": ["gift", ""],
                "buyer": "0x00000000000000000000000000000000000000b0"
            }),
            order_types(),
        );

        let streamed = stream_typed_data(&typed_data, EngineConfig::standard()).unwrap();
        assert_eq!(streamed, get_pre_image(&typed_data).unwrap());
    }

    #[test]
    fn test_stream_empty_arrays() {
        let typed_data = document(
            serde_json::json!({
                "id": 1,
                "lines": [],
                "notes": [],
                "buyer": "0x00000000000000000000000000000000000000b0"
            }),
            order_types(),
        );

        let streamed = stream_typed_data(&typed_data, EngineConfig::constrained()).unwrap();
        assert_eq!(streamed, get_pre_image(&typed_data).unwrap());
    }

    #[test]
    fn test_stream_missing_field() {
        let typed_data = document(
            serde_json::json!({"id": 1, "lines": [], "notes": []}),
            order_types(),
        );

        assert_eq!(
            stream_typed_data(&typed_data, EngineConfig::standard()),
            Err(Eip712Error::MissingField("Order.buyer".into()))
        );
    }

    #[test]
    fn test_stream_fixed_array_length_mismatch() {
        let typed_data = document(
            serde_json::json!({"pair": [1, 2, 3]}),
            serde_json::json!({"Order": [{"name": "pair", "type": "uint8[2]"}]}),
        );

        assert_eq!(
            stream_typed_data(&typed_data, EngineConfig::standard()),
            Err(Eip712Error::ArrayShapeMismatch { expected: 2, got: 3 })
        );
    }

    #[test]
    fn test_stream_respects_capacity() {
        let typed_data = document(
            serde_json::json!({"a": {"b": {"c": 1}}}),
            serde_json::json!({
                "Order": [{"name": "a", "type": "A"}],
                "A": [{"name": "b", "type": "B"}],
                "B": [{"name": "c", "type": "uint8"}]
            }),
        );

        assert_eq!(
            stream_typed_data(&typed_data, EngineConfig::custom(2, 1, 8)),
            Err(Eip712Error::DepthExceeded { max: 2 })
        );
        assert!(stream_typed_data(&typed_data, EngineConfig::custom(3, 1, 8)).is_ok());
    }
}
