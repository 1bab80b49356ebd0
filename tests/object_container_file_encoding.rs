//! Ported from the upstream Apache Avro Rust implementation's reader tests,
//! adapted to this crate's interface.

use {
	avro_codec::{
		from_datum_reader, from_datum_slice,
		object_container_file_encoding::{
			Compression, CompressionLevel, Reader, SchemaMarshaling, WriterBuilder,
		},
		ser::SerializerConfig,
		Schema,
	},
	std::borrow::Cow,
};

use {
	pretty_assertions::assert_eq,
	serde::{Deserialize, Serialize},
};

const SCHEMA: &str = r#"
    {
      "type": "record",
      "name": "test",
      "fields": [
        {
          "name": "a",
          "type": "long",
          "default": 42
        },
        {
          "name": "b",
          "type": "string"
        }
      ]
    }
    "#;
const UNION_SCHEMA: &str = r#"["null", "long"]"#;
const ENCODED: &[u8] = &[
	79, 98, 106, 1, 4, 22, 97, 118, 114, 111, 46, 115, 99, 104, 101, 109, 97, 222, 1, 123, 34, 116,
	121, 112, 101, 34, 58, 34, 114, 101, 99, 111, 114, 100, 34, 44, 34, 110, 97, 109, 101, 34, 58,
	34, 116, 101, 115, 116, 34, 44, 34, 102, 105, 101, 108, 100, 115, 34, 58, 91, 123, 34, 110, 97,
	109, 101, 34, 58, 34, 97, 34, 44, 34, 116, 121, 112, 101, 34, 58, 34, 108, 111, 110, 103, 34,
	44, 34, 100, 101, 102, 97, 117, 108, 116, 34, 58, 52, 50, 125, 44, 123, 34, 110, 97, 109, 101,
	34, 58, 34, 98, 34, 44, 34, 116, 121, 112, 101, 34, 58, 34, 115, 116, 114, 105, 110, 103, 34,
	125, 93, 125, 20, 97, 118, 114, 111, 46, 99, 111, 100, 101, 99, 8, 110, 117, 108, 108, 0, 94,
	61, 54, 221, 190, 207, 108, 180, 158, 57, 114, 40, 173, 199, 228, 239, 4, 20, 54, 6, 102, 111,
	111, 84, 6, 98, 97, 114, 94, 61, 54, 221, 190, 207, 108, 180, 158, 57, 114, 40, 173, 199, 228,
	239,
];

#[derive(Deserialize, Serialize, Debug, PartialEq, Eq)]
struct SchemaRecord<'a> {
	a: i64,
	#[serde(borrow)]
	b: Cow<'a, str>,
}

#[test]
fn test_from_avro_datum() {
	let schema: Schema = SCHEMA.parse().unwrap();
	let encoded: &'static [u8] = &[54, 6, 102, 111, 111];

	assert_eq!(
		from_datum_slice::<SchemaRecord>(encoded, &schema).unwrap(),
		SchemaRecord {
			a: 27,
			b: "foo".into()
		}
	);
}

#[test]
fn test_from_avro_datum_with_union_to_struct() {
	const TEST_RECORD_SCHEMA: &str = r#"
    {
      "type": "record",
      "name": "test",
      "fields": [
        {
          "name": "a",
          "type": "long",
          "default": 42
        },
        {
          "name": "b",
          "type": "string"
        },
        {
            "name": "a_nullable_array",
            "type": ["null", {"type": "array", "items": {"type": "string"}}],
            "default": null
        },
        {
            "name": "a_nullable_boolean",
            "type": ["null", {"type": "boolean"}],
            "default": null
        },
        {
            "name": "a_nullable_string",
            "type": ["null", {"type": "string"}],
            "default": null
        }
      ]
    }
    "#;
	#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
	struct TestRecord3240 {
		a: i64,
		b: String,
		a_nullable_array: Option<Vec<String>>,
		a_nullable_string: Option<String>,
	}

	let schema: Schema = TEST_RECORD_SCHEMA.parse().unwrap();
	let encoded: &'static [u8] = &[54, 6, 102, 111, 111, 0, 0, 0];

	let expected_record = TestRecord3240 {
		a: 27i64,
		b: String::from("foo"),
		a_nullable_array: None,
		a_nullable_string: None,
	};

	assert_eq!(
		from_datum_reader::<&[u8], TestRecord3240>(encoded, &schema).unwrap(),
		expected_record
	);
}

#[test]
fn test_null_union() {
	let schema: Schema = UNION_SCHEMA.parse().unwrap();
	let encoded: &'static [u8] = &[2, 0];

	assert_eq!(from_datum_slice::<i64>(encoded, &schema).unwrap(), 0);
}

#[test]
fn test_reader_iterator() {
	let mut reader = Reader::from_slice(ENCODED).unwrap();

	let expected = &[
		SchemaRecord {
			a: 27,
			b: "foo".into(),
		},
		SchemaRecord {
			a: 42,
			b: "bar".into(),
		},
	];
	let res: Vec<SchemaRecord> = reader
		.deserialize_borrowed::<SchemaRecord>()
		.collect::<Result<_, _>>()
		.unwrap();
	std::mem::drop(reader);

	assert_eq!(expected.as_slice(), res.as_slice());
	assert!(res.iter().all(|r| matches!(r.b, Cow::Borrowed(_))));
}

fn round_trip_writer(compression_codec: Compression, approx_block_size: u32) {
	let input = &[
		SchemaRecord {
			a: 27,
			b: "foo".into(),
		},
		SchemaRecord {
			a: 42,
			b: "bar".into(),
		},
	];

	let schema: Schema = SCHEMA.parse().unwrap();

	let mut serializer_config = SerializerConfig::new(&schema);
	let mut writer = WriterBuilder::new(&mut serializer_config)
		.compression(compression_codec)
		.approx_block_size(approx_block_size)
		.build(Vec::new())
		.unwrap();
	writer.serialize_all(input.iter()).unwrap();
	let serialized = writer.into_inner().unwrap();

	let mut reader = Reader::from_slice(&serialized).unwrap();
	let res: Vec<SchemaRecord> = reader
		.deserialize_borrowed::<SchemaRecord>()
		.collect::<Result<_, _>>()
		.unwrap();

	assert_eq!(input.as_slice(), res.as_slice());
	match compression_codec {
		Compression::Null => assert!(res.iter().all(|r| matches!(r.b, Cow::Borrowed(_)))),
		_ => assert!(res.iter().all(|r| matches!(r.b, Cow::Owned(_)))),
	}
}

#[test]
fn test_writer_no_compression_regular_block_size() {
	round_trip_writer(Compression::Null, 64 * 1024);
}

#[test]
fn test_writer_no_compression_small_block_size() {
	round_trip_writer(Compression::Null, 1);
}

#[cfg(feature = "snappy")]
#[test]
fn test_writer_snappy() {
	round_trip_writer(Compression::Snappy, 64 * 1024);
	round_trip_writer(Compression::Snappy, 1);
}

#[cfg(feature = "deflate")]
#[test]
fn test_writer_deflate() {
	round_trip_writer(
		Compression::Deflate {
			level: CompressionLevel::default(),
		},
		64 * 1024,
	);
	round_trip_writer(
		Compression::Deflate {
			level: CompressionLevel::default(),
		},
		1,
	);
}

#[cfg(feature = "bzip2")]
#[test]
fn test_writer_bzip2() {
	round_trip_writer(
		Compression::Bzip2 {
			level: CompressionLevel::default(),
		},
		64 * 1024,
	);
	round_trip_writer(
		Compression::Bzip2 {
			level: CompressionLevel::default(),
		},
		1,
	);
}

#[cfg(feature = "xz")]
#[test]
fn test_writer_xz() {
	round_trip_writer(
		Compression::Xz {
			level: CompressionLevel::default(),
		},
		64 * 1024,
	);
	round_trip_writer(
		Compression::Xz {
			level: CompressionLevel::default(),
		},
		1,
	);
}

#[cfg(feature = "zstandard")]
#[test]
fn test_writer_zstandard() {
	round_trip_writer(
		Compression::Zstandard {
			level: CompressionLevel::default(),
		},
		64 * 1024,
	);
	round_trip_writer(
		Compression::Zstandard {
			level: CompressionLevel::default(),
		},
		1,
	);
}

#[test]
fn test_reader_invalid_header() {
	let invalid = &ENCODED[1..];
	assert!(matches!(
		Reader::from_slice(invalid),
		Err(avro_codec::object_container_file_encoding::FailedToInitializeReader::NotAvroObjectContainerFile),
	));
}

#[test]
fn test_reader_invalid_block() {
	let invalid = &ENCODED[0..(ENCODED.len() - 19)];
	let mut reader = Reader::from_slice(invalid).unwrap();
	let res: Result<Vec<SchemaRecord>, _> = reader.deserialize_borrowed().collect();
	assert!(res.is_err());
}

#[test]
fn test_reader_empty_buffer() {
	let empty: &[u8] = &[];
	assert!(matches!(
		Reader::from_slice(empty),
		Err(avro_codec::object_container_file_encoding::FailedToInitializeReader::FailedToDeserializeHeader(_)),
	));
}

#[test]
fn test_reader_only_header() {
	let invalid = &ENCODED[..165];
	let mut reader = Reader::from_slice(invalid).unwrap();
	let res: Result<Vec<SchemaRecord>, _> = reader.deserialize_borrowed().collect();
	assert!(res.is_err());
}

const SNAPPY_COMPRESSED_AVRO: &[u8] = &[
	79, 98, 106, 1, 4, 22, 97, 118, 114, 111, 46, 115, 99, 104, 101, 109, 97, 210, 1, 123, 34, 102,
	105, 101, 108, 100, 115, 34, 58, 91, 123, 34, 110, 97, 109, 101, 34, 58, 34, 110, 117, 109, 34,
	44, 34, 116, 121, 112, 101, 34, 58, 34, 115, 116, 114, 105, 110, 103, 34, 125, 93, 44, 34, 110,
	97, 109, 101, 34, 58, 34, 101, 118, 101, 110, 116, 34, 44, 34, 110, 97, 109, 101, 115, 112, 97,
	99, 101, 34, 58, 34, 101, 120, 97, 109, 112, 108, 101, 110, 97, 109, 101, 115, 112, 97, 99,
	101, 34, 44, 34, 116, 121, 112, 101, 34, 58, 34, 114, 101, 99, 111, 114, 100, 34, 125, 20, 97,
	118, 114, 111, 46, 99, 111, 100, 101, 99, 12, 115, 110, 97, 112, 112, 121, 0, 213, 209, 241,
	208, 200, 110, 164, 47, 203, 25, 90, 235, 161, 167, 195, 177, 2, 20, 4, 12, 6, 49, 50, 51, 115,
	38, 58, 0, 213, 209, 241, 208, 200, 110, 164, 47, 203, 25, 90, 235, 161, 167, 195, 177,
];
#[cfg(not(feature = "snappy"))]
#[test]
fn test_avro_3549_read_not_enabled_codec() {
	assert!(matches!(
		Reader::from_slice(SNAPPY_COMPRESSED_AVRO),
		Err(avro_codec::object_container_file_encoding::FailedToInitializeReader::FailedToDeserializeHeader(_)),
	));
}
#[cfg(feature = "snappy")]
#[test]
fn test_snappy() {
	let mut reader = Reader::from_slice(SNAPPY_COMPRESSED_AVRO).unwrap();
	let expected: Vec<serde_json::Value> = vec![serde_json::json!({"num": "123"})];
	let res: Vec<serde_json::Value> = reader
		.deserialize::<serde_json::Value>()
		.collect::<Result<_, _>>()
		.unwrap();

	assert_eq!(expected, res);
}

#[test]
fn test_zero_count_block_is_skipped() {
	// A block with n_objects=0 but a nonzero byte size is legal: the reader
	// must skip the payload and keep reading rather than erroring.
	let schema: Schema = r#""long""#.parse().unwrap();
	let mut serializer_config = SerializerConfig::new(&schema);
	let sync_marker = [7u8; 16];
	let mut writer = WriterBuilder::new(&mut serializer_config)
		.sync_marker(sync_marker)
		.build(Vec::new())
		.unwrap();
	writer.serialize(&1i64).unwrap();
	let mut file = writer.into_inner().unwrap();

	// Append an extra empty-but-padded block by hand: count=0, size=3, three
	// junk bytes, then the sync marker again.
	file.push(0); // zig-zag(0) varint for count
	file.push(6); // zig-zag(3) varint for size
	file.extend_from_slice(&[0xAA, 0xAA, 0xAA]);
	file.extend_from_slice(&sync_marker);

	let mut reader = Reader::from_slice(&file).unwrap();
	let res: Vec<i64> = reader.deserialize::<i64>().collect::<Result<_, _>>().unwrap();
	assert_eq!(res, vec![1]);
}

#[test]
fn default_schema_marshaling_is_canonical_form() {
	// `SCHEMA` has a `"default": 42` attribute on field `a`, which the
	// canonical form strips; the full form keeps it verbatim.
	let schema: Schema = SCHEMA.parse().unwrap();
	let mut serializer_config = SerializerConfig::new(&schema);
	let writer = WriterBuilder::new(&mut serializer_config)
		.build(Vec::new())
		.unwrap();
	let file = writer.into_inner().unwrap();

	assert!(!contains(&file, b"default"));
	// Canonical-form output is still a valid header a `Reader` can parse.
	let mut reader = Reader::from_slice(&file).unwrap();
	assert_eq!(reader.deserialize::<serde_json::Value>().count(), 0);
}

#[test]
fn full_schema_marshaling_writes_original_json() {
	let schema: Schema = SCHEMA.parse().unwrap();
	let mut serializer_config = SerializerConfig::new(&schema);
	let writer = WriterBuilder::new(&mut serializer_config)
		.schema_marshaling(SchemaMarshaling::Full)
		.build(Vec::new())
		.unwrap();
	let file = writer.into_inner().unwrap();

	assert!(contains(&file, b"default"));
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
	haystack.windows(needle.len()).any(|w| w == needle)
}

#[test]
fn append_to_existing_file_continues_the_same_stream() {
	let schema: Schema = SCHEMA.parse().unwrap();
	let mut serializer_config = SerializerConfig::new(&schema);
	let mut writer = WriterBuilder::new(&mut serializer_config)
		.build(Vec::new())
		.unwrap();
	writer
		.serialize(&SchemaRecord { a: 1, b: "one".into() })
		.unwrap();
	let file = writer.into_inner().unwrap();

	let mut cursor = std::io::Cursor::new(file);
	let mut serializer_config2 = SerializerConfig::new(&schema);
	let mut appended = WriterBuilder::new(&mut serializer_config2)
		.append_to(&mut cursor)
		.unwrap();
	appended
		.serialize(&SchemaRecord { a: 2, b: "two".into() })
		.unwrap();
	appended.into_inner().unwrap();

	let file = cursor.into_inner();
	let mut reader = Reader::from_slice(&file).unwrap();
	let res: Vec<SchemaRecord> = reader
		.deserialize_borrowed::<SchemaRecord>()
		.collect::<Result<_, _>>()
		.unwrap();
	assert_eq!(
		res,
		vec![
			SchemaRecord { a: 1, b: "one".into() },
			SchemaRecord { a: 2, b: "two".into() },
		]
	);
}

#[test]
fn append_to_rejects_incompatible_schema() {
	let schema: Schema = SCHEMA.parse().unwrap();
	let mut serializer_config = SerializerConfig::new(&schema);
	let writer = WriterBuilder::new(&mut serializer_config)
		.build(Vec::new())
		.unwrap();
	let file = writer.into_inner().unwrap();
	let mut cursor = std::io::Cursor::new(file);

	let other_schema: Schema = r#""long""#.parse().unwrap();
	let mut other_config = SerializerConfig::new(&other_schema);
	let res = WriterBuilder::new(&mut other_config).append_to(&mut cursor);
	assert!(res.is_err());
}

#[test]
fn reset_starts_a_fresh_file_with_a_new_sync_marker() {
	let schema: Schema = SCHEMA.parse().unwrap();
	let mut serializer_config = SerializerConfig::new(&schema);
	let mut writer = WriterBuilder::new(&mut serializer_config)
		.sync_marker([1u8; 16])
		.build(Vec::new())
		.unwrap();
	writer
		.serialize(&SchemaRecord { a: 1, b: "one".into() })
		.unwrap();

	let (first_file, mut writer) = writer.reset(Vec::new()).unwrap();
	writer
		.serialize(&SchemaRecord { a: 2, b: "two".into() })
		.unwrap();
	let second_file = writer.into_inner().unwrap();

	let mut first_reader = Reader::from_slice(&first_file).unwrap();
	let first_res: Vec<SchemaRecord> = first_reader
		.deserialize_borrowed::<SchemaRecord>()
		.collect::<Result<_, _>>()
		.unwrap();
	assert_eq!(first_res, vec![SchemaRecord { a: 1, b: "one".into() }]);

	let mut second_reader = Reader::from_slice(&second_file).unwrap();
	let second_res: Vec<SchemaRecord> = second_reader
		.deserialize_borrowed::<SchemaRecord>()
		.collect::<Result<_, _>>()
		.unwrap();
	assert_eq!(second_res, vec![SchemaRecord { a: 2, b: "two".into() }]);

	// The new file's sync marker must differ from the forced one so that a
	// reader can't confuse blocks between the two files if concatenated.
	assert_ne!(&second_file[second_file.len() - 16..], &[1u8; 16]);
}
