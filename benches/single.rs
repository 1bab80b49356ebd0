use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

const RAW_SMALL_SCHEMA: &str = r#"
{
	"namespace": "test",
	"type": "record",
	"name": "Test",
	"fields": [
		{
			"type": {
				"type": "string"
			},
			"name": "field"
		}
	]
}
"#;

#[derive(serde_derive::Serialize, serde_derive::Deserialize)]
#[allow(unused)]
struct SmallStruct<'a> {
	field: &'a str,
}

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

#[derive(serde_derive::Serialize, serde_derive::Deserialize)]
#[allow(unused)]
struct BigStruct<'a> {
	username: &'a str,
	age: u32,
	phone: &'a str,
	housenum: &'a str,
	address: Address<'a>,
}

#[derive(serde_derive::Serialize, serde_derive::Deserialize)]
#[allow(unused)]
struct Address<'a> {
	street: &'a str,
	city: &'a str,
	state_prov: &'a str,
	country: &'a str,
	zip: &'a str,
}

fn bench_small_schema_read_record(c: &mut Criterion) {
	let schema: avro_codec::Schema = RAW_SMALL_SCHEMA.parse().unwrap();
	let value = SmallStruct { field: "foo" };
	let datum =
		avro_codec::to_datum_vec(&value, &mut avro_codec::ser::SerializerConfig::new(&schema))
			.unwrap();
	c.bench_with_input(
		BenchmarkId::new("avro_codec", "small"),
		&datum.as_slice(),
		|b, &datum| {
			b.iter(|| avro_codec::from_datum_slice::<SmallStruct>(datum, &schema).unwrap())
		},
	);
}

fn bench_big_schema_read_record(c: &mut Criterion) {
	let schema: avro_codec::Schema = RAW_BIG_SCHEMA.parse().unwrap();
	let value = BigStruct {
		username: "username",
		age: 10,
		phone: "000000000",
		housenum: "0000",
		address: Address {
			street: "street",
			city: "city",
			state_prov: "state_prov",
			country: "country",
			zip: "zip",
		},
	};
	let datum =
		avro_codec::to_datum_vec(&value, &mut avro_codec::ser::SerializerConfig::new(&schema))
			.unwrap();
	c.bench_with_input(
		BenchmarkId::new("avro_codec", "big"),
		&datum.as_slice(),
		|b, &datum| b.iter(|| avro_codec::from_datum_slice::<BigStruct>(datum, &schema).unwrap()),
	);
}

criterion_group!(
	benches,
	bench_small_schema_read_record,
	bench_big_schema_read_record
);
criterion_main!(benches);
