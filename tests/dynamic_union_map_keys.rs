//! Regression test for `DeserializerConfig::dynamic_union_map_keys`: it must
//! only wrap named (record/enum/fixed) union branches in a single-entry map,
//! never primitive or unnamed-complex branches.

use avro_codec::{
	de::{read::SliceRead, DeserializerConfig, DeserializerState},
	ser::SerializerConfig,
	Schema,
};

fn decode_dynamic(raw_schema: &str, datum: &[u8]) -> serde_json::Value {
	let schema: Schema = raw_schema.parse().unwrap();
	let mut config = DeserializerConfig::new(&schema);
	config.dynamic_union_map_keys = true;
	serde::Deserialize::deserialize(
		DeserializerState::with_config(SliceRead::new(datum), config).deserializer(),
	)
	.unwrap()
}

#[test]
fn primitive_branch_is_not_wrapped() {
	let schema_str = r#"["null", "int"]"#;
	let schema: Schema = schema_str.parse().unwrap();
	let datum = avro_codec::to_datum_vec(&Some(5i32), &mut SerializerConfig::new(&schema)).unwrap();

	assert_eq!(decode_dynamic(schema_str, &datum), serde_json::json!(5));
}

#[test]
fn null_branch_is_not_wrapped() {
	let schema_str = r#"["null", "int"]"#;
	let schema: Schema = schema_str.parse().unwrap();
	let datum =
		avro_codec::to_datum_vec(&None::<i32>, &mut SerializerConfig::new(&schema)).unwrap();

	assert_eq!(decode_dynamic(schema_str, &datum), serde_json::Value::Null);
}

#[test]
fn named_branch_is_wrapped_in_tagged_map() {
	let schema_str = r#"["null", {
		"type": "record",
		"name": "test.Foo",
		"fields": [{"name": "a", "type": "int"}]
	}]"#;

	#[derive(serde_derive::Serialize)]
	struct Foo {
		a: i32,
	}

	let schema: Schema = schema_str.parse().unwrap();
	let datum = avro_codec::to_datum_vec(
		&Some(Foo { a: 3 }),
		&mut SerializerConfig::new(&schema),
	)
	.unwrap();

	assert_eq!(
		decode_dynamic(schema_str, &datum),
		serde_json::json!({"test.Foo": {"a": 3}})
	);
}
