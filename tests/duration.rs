use avro_codec::{from_datum_slice, ser::SerializerConfig, to_datum_vec, Schema};

fn test<'de, T: serde::Serialize + serde::Deserialize<'de> + PartialEq + std::fmt::Debug>(
	datum: &'de [u8],
	rust_value: T,
	schema: &Schema,
) {
	assert_eq!(from_datum_slice::<T>(datum, schema).unwrap(), rust_value);
	assert_eq!(
		to_datum_vec(&rust_value, &mut SerializerConfig::new(schema)).unwrap(),
		datum
	);
}

#[derive(serde_derive::Serialize, serde_derive::Deserialize, PartialEq)]
struct Duration {
	months: u32,
	days: u32,
	milliseconds: u32,
}

impl std::fmt::Debug for Duration {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Duration")
			.field("months", &format_args!("0x{:x}", self.months))
			.field("days", &format_args!("0x{:x}", self.days))
			.field("milliseconds", &format_args!("0x{:x}", self.milliseconds))
			.finish()
	}
}

#[test]
fn duration() {
	let raw_schema =
		r#"{"type":{"name":"duration","type":"fixed","size":12},"logicalType":"duration"}"#;
	let schema: Schema = raw_schema.parse().unwrap();

	test(
		&(1..13).collect::<Vec<u8>>(),
		Duration {
			months: 0x04030201,
			days: 0x08070605,
			milliseconds: 0x0C0B0A09,
		},
		&schema,
	);

	test::<(u32, u32, u32)>(
		&(1..13).collect::<Vec<u8>>(),
		(0x04030201, 0x08070605, 0x0C0B0A09),
		&schema,
	);

	test::<[u32; 3]>(
		&(1..13).collect::<Vec<u8>>(),
		[0x04030201, 0x08070605, 0x0C0B0A09],
		&schema,
	);

	test::<serde_bytes::ByteBuf>(
		&(1..13).collect::<Vec<u8>>(),
		serde_bytes::ByteBuf::from((1..13).collect::<Vec<u8>>()),
		&schema,
	);
}
