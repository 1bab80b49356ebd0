use avro_codec::{
	ser,
	single_object_encoding::{from_single_object_reader, from_single_object_slice},
	Schema,
};

const SCHEMA_STR: &str = r#"
	{
		"type":"record",
		"name":"TestSingleObjectWriterSerialize",
		"fields":[
			{
				"name":"a",
				"type":"long"
			},
			{
				"name":"b",
				"type":"double"
			},
			{
				"name":"c",
				"type":{
					"type":"array",
					"items":"string"
				}
			}
		]
	}
	"#;

#[derive(serde::Serialize, serde::Deserialize, Clone, PartialEq, Debug)]
struct TestSingleObjectReader {
	a: i64,
	b: f64,
	c: Vec<String>,
}

#[test]
fn test_single_object_reader() {
	let schema: Schema = SCHEMA_STR.parse().unwrap();
	let expected_value = TestSingleObjectReader {
		a: 42,
		b: 3.33,
		c: vec!["cat".into(), "dog".into()],
	};
	let mut config = ser::SerializerConfig::new(&schema);
	let encoded =
		avro_codec::single_object_encoding::to_single_object_vec(&expected_value, &mut config)
			.unwrap();
	let val: TestSingleObjectReader = from_single_object_slice(&encoded, &schema).unwrap();
	assert_eq!(expected_value, val);
}

#[test]
fn test_single_object_reader_incomplete_reads() {
	use std::io::Read;
	let schema: Schema = SCHEMA_STR.parse().unwrap();
	let expected_value = TestSingleObjectReader {
		a: 42,
		b: 3.33,
		c: vec!["cat".into(), "dog".into()],
	};
	let mut config = ser::SerializerConfig::new(&schema);
	let encoded =
		avro_codec::single_object_encoding::to_single_object_vec(&expected_value, &mut config)
			.unwrap();

	// The two-byte marker, the fingerprint, and the datum body arrive
	// across three chained readers rather than a single contiguous buffer.
	let (header, rest) = encoded.split_at(2);
	let (fingerprint, body) = rest.split_at(8);
	let to_read = header.chain(fingerprint).chain(body);
	let val: TestSingleObjectReader = from_single_object_reader(to_read, &schema).unwrap();
	assert_eq!(expected_value, val);
}
