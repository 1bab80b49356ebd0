//! Port of a subset of the upstream `serde_avro_fast`/apache-avro round-trip
//! suite, adapted to round-trip purely against this crate (the upstream tests
//! additionally cross-check against the `apache_avro` crate, which is out of
//! scope here: serde::Serialize/Deserialize is this crate's type-binding
//! layer, not a second independent Avro implementation).

use avro_codec::{schema::*, ser::SerializerConfig, Schema};

fn round_trip<T>(raw_schema: &str, value: &T)
where
	T: serde::Serialize + serde::de::DeserializeOwned + PartialEq + std::fmt::Debug,
{
	let schema: Schema = raw_schema.parse().unwrap();
	let mut serializer_config = SerializerConfig::new(&schema);
	let encoded = avro_codec::to_datum_vec(value, &mut serializer_config).unwrap();
	let decoded: T = avro_codec::from_datum_slice(&encoded, &schema).unwrap();
	assert_eq!(*value, decoded);
}

#[test]
fn round_trip_null() {
	round_trip::<()>(r#""null""#, &());
}

#[test]
fn round_trip_boolean() {
	round_trip(r#""boolean""#, &true);
}

#[test]
fn round_trip_string() {
	round_trip(r#""string""#, &"adsfasdf09809dsf-=adsf".to_owned());
}

#[test]
fn round_trip_bytes() {
	round_trip(
		r#""bytes""#,
		&serde_bytes::ByteBuf::from(b"12345abcd".to_vec()),
	);
}

#[test]
fn round_trip_int() {
	round_trip(r#""int""#, &1234i32);
}

#[test]
fn round_trip_long() {
	round_trip(r#""long""#, &1234i64);
}

#[test]
fn round_trip_float() {
	round_trip(r#""float""#, &1234.0f32);
}

#[test]
fn round_trip_double() {
	round_trip(r#""double""#, &1234.0f64);
}

#[test]
fn round_trip_fixed() {
	round_trip(
		r#"{"type": "fixed", "name": "Test", "size": 1}"#,
		&serde_bytes::ByteBuf::from(vec![b'B']),
	);
}

#[test]
fn round_trip_enum() {
	#[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
	enum AB {
		A,
		B,
	}
	round_trip(
		r#"{"type": "enum", "name": "Test", "symbols": ["A", "B"]}"#,
		&AB::B,
	);
}

#[test]
fn round_trip_array() {
	round_trip(
		r#"{"type": "array", "items": "long"}"#,
		&vec![1i64, 3, 2],
	);
}

#[test]
fn round_trip_map() {
	use std::collections::BTreeMap;
	let mut map = BTreeMap::new();
	map.insert("a".to_owned(), 1i64);
	map.insert("b".to_owned(), 3i64);
	map.insert("c".to_owned(), 2i64);
	round_trip(r#"{"type": "map", "values": "long"}"#, &map);
}

#[test]
fn round_trip_union_to_option() {
	round_trip::<Option<String>>(r#"["null", "string"]"#, &Some("value".to_owned()));
	round_trip::<Option<String>>(r#"["null", "string"]"#, &None);
}

#[test]
fn round_trip_record() {
	#[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
	struct Test {
		f: i64,
	}
	round_trip(
		r#"{"type": "record", "name": "Test", "fields": [{"name": "f", "type": "long"}]}"#,
		&Test { f: 1 },
	);
}

#[test]
fn round_trip_longer_record() {
	#[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
	struct LongerRecord {
		f: i64,
		g: i64,
		h: String,
	}
	round_trip(
		r#"{"type": "record", "name": "LongerRecord", "fields": [{"name": "f", "type": "long"}, {"name": "g", "type": "long"}, {"name": "h", "type": "string"}]}"#,
		&LongerRecord {
			f: 1,
			g: 2,
			h: "Abc".to_owned(),
		},
	);
}

#[test]
fn test_decimal() {
	let editable_schema: SchemaMut =
		r#"{"type": "bytes", "logicalType": "decimal", "precision": 4, "scale": 1}"#
			.parse()
			.unwrap();
	assert!(matches!(
		editable_schema[editable_schema.root()],
		SchemaNode::Decimal(Decimal {
			scale: 1,
			precision: 4,
			repr: DecimalRepr::Bytes,
		})
	));
	let schema: Schema = editable_schema.freeze().unwrap();
	let mut serializer_config = SerializerConfig::new(&schema);

	// 0.2
	let deserialized: f64 = avro_codec::from_datum_slice(&[2, 2], &schema).unwrap();
	assert_eq!(deserialized, 0.2);
	let deserialized: String = avro_codec::from_datum_slice(&[2, 2], &schema).unwrap();
	assert_eq!(deserialized, "0.2");
	let deserialized: rust_decimal::Decimal = avro_codec::from_datum_slice(&[2, 2], &schema).unwrap();
	assert_eq!(deserialized, "0.2".parse().unwrap());
	assert_eq!(
		avro_codec::to_datum_vec(&deserialized, &mut serializer_config).unwrap(),
		[2, 2]
	);

	// -0.2
	let deserialized: f64 = avro_codec::from_datum_slice(&[2, 0xFE], &schema).unwrap();
	assert_eq!(deserialized, -0.2);
	let deserialized: rust_decimal::Decimal =
		avro_codec::from_datum_slice(&[2, 0xFE], &schema).unwrap();
	assert_eq!(deserialized, "-0.2".parse().unwrap());
	assert_eq!(
		avro_codec::to_datum_vec(&deserialized, &mut serializer_config).unwrap(),
		[2, 0xFE]
	);

	assert_eq!(
		avro_codec::to_datum_vec(
			&rust_decimal::Decimal::from_str_exact("-12.8").unwrap(),
			&mut SerializerConfig::new(
				&r#"{"type": {"type":"fixed","size":3,"name":"f"}, "logicalType": "decimal", "precision": 123, "scale": 1}"#
					.parse()
					.unwrap()
			)
		)
		.unwrap(),
		[255, 255, 128]
	);
}

#[test]
fn test_bytes_with_serde_json_value() {
	let schema: Schema = r#""bytes""#.parse().unwrap();
	let config = &mut SerializerConfig::new(&schema);
	config.allow_slow_sequence_to_bytes();
	let value: serde_json::Value = (b"12345abcd".iter().map(|&b| b as u64).collect::<Vec<_>>()).into();
	let encoded = avro_codec::to_datum_vec(&value, config).unwrap();
	let decoded: serde_bytes::ByteBuf = avro_codec::from_datum_slice(&encoded, &schema).unwrap();
	assert_eq!(decoded.as_slice(), b"12345abcd");
}

#[test]
fn complex_schema_parsing_serialization_round_trip() {
	let raw_schema = r#"
		[
			{
				"type": "fixed",
				"name": "fiiixed",
				"size": 12
			},
			{
				"type": "record",
				"name": "Test",
				"fields": [
					{
						"name": "f",
						"type": {
							"type": "record",
							"name": "a.Test2",
							"fields": [
								{
									"name": "Test2 inner",
									"type": {
										"type": "fixed",
										"size": 12,
										"name": "test2_inner"
									}
								},
								{
									"name": "the_fiixed",
									"type": ".fiiixed"
								}
							]
						}
					},
					{
						"name": "f2",
						"type": "a.Test2"
					}
				]
			}
		]
	"#;
	let schema: Schema = raw_schema.parse().unwrap();
	// Fingerprints the canonical form; re-parsing the minified JSON this
	// crate produced must agree exactly on the fingerprint.
	let reparsed: Schema = schema.json().parse().unwrap();
	assert_eq!(reparsed.rabin_fingerprint(), schema.rabin_fingerprint());
}
