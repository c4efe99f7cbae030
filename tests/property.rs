use eip712_path::eip712::{encode_leaf, hash_struct, keccak256, TypeRegistry, TypedDataField};
use eip712_path::{get_pre_image, stream_typed_data, EngineConfig, PathEngine, SchemaRegistry, TypedData};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::HashMap;

fn order_types() -> Value {
    json!({
        "Order": [
            {"name": "id", "type": "uint64"},
            {"name": "lines", "type": "Line[]"},
            {"name": "tags", "type": "string[]"},
            {"name": "matrix", "type": "uint8[2][]"},
            {"name": "batches", "type": "Line[][]"},
            {"name": "buyer", "type": "address"}
        ],
        "Line": [
            {"name": "sku", "type": "bytes32"},
            {"name": "qty", "type": "uint16"},
            {"name": "delta", "type": "int32"},
            {"name": "memo", "type": "string"}
        ]
    })
}

fn any_line() -> impl Strategy<Value = Value> {
    (
        prop::array::uniform32(any::<u8>()),
        any::<u16>(),
        any::<i32>(),
        "[a-zA-Z0-9 ]{0,12}",
    )
        .prop_map(|(sku, qty, delta, memo)| {
            json!({
                "sku": format!("0x{}", hex::encode(sku)),
                "qty": qty,
                "delta": delta,
                "memo": memo
            })
        })
}

fn any_order() -> impl Strategy<Value = Value> {
    (
        any::<u64>(),
        prop::collection::vec(any_line(), 0..4),
        prop::collection::vec("[a-z]{0,6}", 0..4),
        prop::collection::vec(prop::array::uniform2(any::<u8>()), 0..3),
        prop::collection::vec(prop::collection::vec(any_line(), 0..3), 0..3),
        prop::array::uniform20(any::<u8>()),
    )
        .prop_map(|(id, lines, tags, matrix, batches, buyer)| {
            json!({
                "id": id,
                "lines": lines,
                "tags": tags,
                "matrix": matrix,
                "batches": batches,
                "buyer": format!("0x{}", hex::encode(buyer))
            })
        })
}

fn typed_data(message: Value) -> TypedData {
    serde_json::from_value(json!({
        "types": order_types(),
        "primaryType": "Order",
        "domain": {"name": "Property", "version": "2", "chainId": 10},
        "message": message
    }))
    .expect("document parses")
}

proptest! {
    #[test]
    fn streamed_digest_matches_reference(message in any_order()) {
        let typed_data = typed_data(message);

        let streamed = stream_typed_data(&typed_data, EngineConfig::standard()).expect("streams");
        let reference = get_pre_image(&typed_data).expect("encodes");
        prop_assert_eq!(streamed, reference);
    }

    #[test]
    fn empty_primitive_arrays_hash_to_empty_keccak(label in "[a-z]{0,10}") {
        let types: HashMap<String, Vec<TypedDataField>> = serde_json::from_value(json!({
            "Box": [
                {"name": "label", "type": "string"},
                {"name": "values", "type": "uint256[]"}
            ]
        }))
        .expect("types parse");
        let registry = TypeRegistry::from_types(&types).expect("registry builds");

        let mut engine = PathEngine::new(&registry, EngineConfig::standard()).expect("engine");
        engine.set_root("Box").expect("root");
        let word = encode_leaf("string", &json!(label.clone())).expect("leaf");
        engine.feed(&word).expect("feed");
        engine.advance().expect("advance");
        engine.open_array(0).expect("empty array");

        let mut preimage = registry.type_hash("Box").expect("type hash").to_vec();
        preimage.extend_from_slice(&word);
        preimage.extend_from_slice(&keccak256(b""));

        let digest = engine.digests().message_hash.expect("root closed");
        prop_assert_eq!(digest, keccak256(&preimage));
        prop_assert_eq!(
            digest,
            hash_struct("Box", &json!({"label": label, "values": []}), &registry).expect("reference")
        );
        prop_assert_eq!(engine.hash_depth(), 0);
    }
}
