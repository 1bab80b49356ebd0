use avro_codec::schema::*;

#[test]
fn schema_construction() {
	// Simulate associating schemas with Rust structs by hand: a union of
	// null/record where the record self-references through the union.
	let nodes: Vec<SchemaNode> = vec![
		SchemaNode::Union(Union {
			variants: vec![SchemaKey::from_idx(1), SchemaKey::from_idx(2)],
		}),
		SchemaNode::Null,
		SchemaNode::Record(Record {
			name: Name::from_fully_qualified_name("a.b".to_owned()),
			fields: vec![RecordField {
				name: "c".to_owned(),
				schema: SchemaKey::from_idx(0),
			}],
		}),
	];
	let schema = SchemaMut::from_nodes(nodes);

	// The following schema should parse to exactly what's above
	let schema_str = prettify_json(
		r#"
			[
				"null",
				{
					"type": "record",
					"name": "a.b",
					"fields": [{
						"name": "c",
						"type": ["null", "a.b"]
					}]
				}
			]
		"#,
	);
	let parsed_schema: SchemaMut = schema_str.parse().unwrap();

	// Make sure we can export that: the record is re-entered through the
	// union's second branch, so its second occurrence must render as just
	// its fullname rather than re-expanding the definition.
	assert_eq!(serde_json::to_string_pretty(&schema).unwrap(), schema_str);
	assert_eq!(
		serde_json::to_string_pretty(&parsed_schema).unwrap(),
		schema_str
	);
}

fn prettify_json(s: &str) -> String {
	String::from_utf8({
		let mut serializer = serde_json::Serializer::pretty(Vec::new());
		serde_transcode::transcode(&mut serde_json::Deserializer::from_str(s), &mut serializer)
			.unwrap();
		serializer.into_inner()
	})
	.unwrap()
}

#[test]
fn impossible_schema_construction() {
	// Contains an unconditional cycle: the lone-branch union at index 0
	// leads straight back to itself through the array with no union/record
	// field to ever terminate it.
	let nodes: Vec<SchemaNode> = vec![
		SchemaNode::Union(Union {
			variants: vec![SchemaKey::from_idx(2)],
		}),
		SchemaNode::Null,
		SchemaNode::Array(Array {
			items: SchemaKey::from_idx(0),
		}),
	];
	let schema = SchemaMut::from_nodes(nodes);
	assert!(schema.freeze().is_err());
	assert!(serde_json::to_string(&schema).is_err());
}
