use avro_codec::{
	object_container_file_encoding::{Compression, CompressionLevel, Reader, WriterBuilder},
	ser::SerializerConfig,
};

use criterion::BenchmarkId;

use criterion::{criterion_group, criterion_main, Criterion};

const RAW_BIG_SCHEMA: &str = r#"
{
	"namespace": "my.example",
	"type": "record",
	"name": "userInfo",
	"fields": [
		{
			"default": "NONE",
			"type": "string",
			"name": "username"
		},
		{
			"default": -1,
			"type": "int",
			"name": "age"
		},
		{
			"default": "NONE",
			"type": "string",
			"name": "phone"
		},
		{
			"default": "NONE",
			"type": "string",
			"name": "housenum"
		},
		{
			"default": {},
			"type": {
				"fields": [
					{
						"default": "NONE",
						"type": "string",
						"name": "street"
					},
					{
						"default": "NONE",
						"type": "string",
						"name": "city"
					},
					{
						"default": "NONE",
						"type": "string",
						"name": "state_prov"
					},
					{
						"default": "NONE",
						"type": "string",
						"name": "country"
					},
					{
						"default": "NONE",
						"type": "string",
						"name": "zip"
					}
				],
				"type": "record",
				"name": "mailing_address"
			},
			"name": "address"
		}
	]
}
"#;

#[derive(serde_derive::Deserialize, serde_derive::Serialize)]
#[allow(unused)]
struct BigStruct<'a> {
	username: &'a str,
	age: u32,
	phone: &'a str,
	housenum: &'a str,
	address: Address<'a>,
}

#[derive(serde_derive::Deserialize, serde_derive::Serialize)]
#[allow(unused)]
struct Address<'a> {
	street: &'a str,
	city: &'a str,
	state_prov: &'a str,
	country: &'a str,
	zip: &'a str,
}

#[derive(serde_derive::Deserialize, serde_derive::Serialize)]
#[allow(unused)]
struct BigStructOwned {
	username: String,
	age: u32,
	phone: String,
	housenum: String,
	address: AddressOwned,
}

#[derive(serde_derive::Deserialize, serde_derive::Serialize)]
#[allow(unused)]
struct AddressOwned {
	street: String,
	city: String,
	state_prov: String,
	country: String,
	zip: String,
}

fn write_all<'a, IT: IntoIterator<Item = BigStruct<'a>>>(
	schema: &avro_codec::Schema,
	compression_codec: Compression,
	inputs: IT,
) -> Vec<u8> {
	let mut config = SerializerConfig::new(schema);
	let mut writer = WriterBuilder::new(&mut config)
		.compression(compression_codec)
		.build(Vec::new())
		.unwrap();
	writer.serialize_all(inputs.into_iter()).unwrap();
	writer.into_inner().unwrap()
}

fn bench_object_container_file_serialization(c: &mut Criterion) {
	let schema: avro_codec::Schema = RAW_BIG_SCHEMA.parse().unwrap();
	let inputs: Vec<BigStruct> = (0..100000)
		.map(|i| BigStruct {
			username: "John Doe",
			age: i,
			phone: "555-555-5555",
			housenum: "123",
			address: Address {
				street: "123 Fake St",
				city: "Springfield",
				state_prov: "IL",
				country: "USA",
				zip: "12345",
			},
		})
		.collect();
	for &(name, compression_codec) in &[
		("null", Compression::Null),
		#[cfg(feature = "deflate")]
		(
			"deflate",
			Compression::Deflate {
				level: CompressionLevel::default(),
			},
		),
		#[cfg(feature = "bzip2")]
		(
			"bzip2",
			Compression::Bzip2 {
				level: CompressionLevel::default(),
			},
		),
		#[cfg(feature = "snappy")]
		("snappy", Compression::Snappy),
		#[cfg(feature = "xz")]
		(
			"xz",
			Compression::Xz {
				level: CompressionLevel::default(),
			},
		),
		#[cfg(feature = "zstandard")]
		(
			"zstandard",
			Compression::Zstandard {
				level: CompressionLevel::default(),
			},
		),
	] {
		c.bench_with_input(
			BenchmarkId::new("object_container_file_serialization", name),
			&inputs.as_slice(),
			|b, &inputs| {
				b.iter(|| {
					write_all(
						&schema,
						compression_codec,
						inputs.iter().map(|i| BigStruct {
							username: i.username,
							age: i.age,
							phone: i.phone,
							housenum: i.housenum,
							address: Address {
								street: i.address.street,
								city: i.address.city,
								state_prov: i.address.state_prov,
								country: i.address.country,
								zip: i.address.zip,
							},
						}),
					)
				})
			},
		);
	}
}

fn bench_object_container_file_deserialization(c: &mut Criterion) {
	let schema: avro_codec::Schema = RAW_BIG_SCHEMA.parse().unwrap();
	for &(name, codec) in &[
		("null", Compression::Null),
		#[cfg(feature = "deflate")]
		(
			"deflate",
			Compression::Deflate {
				level: CompressionLevel::default(),
			},
		),
		#[cfg(feature = "bzip2")]
		(
			"bzip2",
			Compression::Bzip2 {
				level: CompressionLevel::default(),
			},
		),
		#[cfg(feature = "snappy")]
		("snappy", Compression::Snappy),
		#[cfg(feature = "xz")]
		(
			"xz",
			Compression::Xz {
				level: CompressionLevel::default(),
			},
		),
		#[cfg(feature = "zstandard")]
		(
			"zstandard",
			Compression::Zstandard {
				level: CompressionLevel::default(),
			},
		),
	] {
		let serialized = write_all(
			&schema,
			codec,
			(0..100000).map(|i| BigStruct {
				username: "John Doe",
				age: i,
				phone: "555-555-5555",
				housenum: "123",
				address: Address {
					street: "123 Fake St",
					city: "Springfield",
					state_prov: "IL",
					country: "USA",
					zip: "12345",
				},
			}),
		);
		c.bench_with_input(
			BenchmarkId::new("object_container_file_deserialization", name),
			&serialized,
			|b, inputs| {
				b.iter(|| {
					let mut n = 0u64;
					Reader::from_slice(inputs.as_slice())
						.unwrap()
						.deserialize::<BigStructOwned>()
						.try_for_each(|r| {
							let s = r?;
							n += s.age as u64;
							Ok::<_, avro_codec::de::DeError>(())
						})
						.unwrap();
					n
				})
			},
		);
	}
}

criterion_group!(
	benches,
	bench_object_container_file_serialization,
	bench_object_container_file_deserialization
);
criterion_main!(benches);
