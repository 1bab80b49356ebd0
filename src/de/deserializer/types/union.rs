use super::*;

use crate::schema::Union;

/// Reads the union branch-index varint and returns the key of the schema node
/// it selects.
pub(in super::super) fn read_union_discriminant<'de, 's, R>(
	state: &mut DeserializerState<'s, R>,
	union: &Union,
) -> Result<SchemaKey, DeError>
where
	R: ReadSlice<'de>,
{
	let discriminant: usize = read_discriminant(state)?;
	match union.variants.get(discriminant) {
		None => Err(DeError::new("Could not find union discriminant in schema")),
		Some(&variant_key) => Ok(variant_key),
	}
}

/// `EnumAccess` for deserializing a union into a Rust enum: the variant
/// identifier is the branch's Avro type tag (a named type's fullname, or the
/// primitive/complex type name), and the payload is deserialized normally
/// against that branch's schema.
pub(in super::super) struct UnionEnumAccess<'r, 's, R> {
	pub(in super::super) state: &'r mut DeserializerState<'s, R>,
	pub(in super::super) variant_key: SchemaKey,
	pub(in super::super) allowed_depth: AllowedDepth,
}
impl<'de, 'r, 's, R: ReadSlice<'de>> EnumAccess<'de> for UnionEnumAccess<'r, 's, R> {
	type Error = DeError;
	type Variant = UnionVariantAccess<'de, 'r, 's, R>;

	fn variant_seed<T>(self, seed: T) -> Result<(T::Value, Self::Variant), Self::Error>
	where
		T: DeserializeSeed<'de>,
	{
		let tag = schema_type_tag(self.state.schema().node(self.variant_key));
		let value = seed.deserialize(value::StringDeserializer::new(tag))?;
		Ok((
			value,
			UnionVariantAccess {
				state: self.state,
				variant_key: self.variant_key,
				allowed_depth: self.allowed_depth,
				_de: std::marker::PhantomData,
			},
		))
	}
}

pub(in super::super) struct UnionVariantAccess<'de, 'r, 's, R> {
	state: &'r mut DeserializerState<'s, R>,
	variant_key: SchemaKey,
	allowed_depth: AllowedDepth,
	_de: std::marker::PhantomData<&'de ()>,
}
impl<'de, R: ReadSlice<'de>> VariantAccess<'de> for UnionVariantAccess<'de, '_, '_, R> {
	type Error = DeError;

	fn unit_variant(self) -> Result<(), Self::Error> {
		match self.state.node(self.variant_key) {
			SchemaNode::Null => Ok(()),
			_ => Err(DeError::new(
				"Expected a unit variant but union branch is not `null`",
			)),
		}
	}

	fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value, Self::Error>
	where
		T: DeserializeSeed<'de>,
	{
		seed.deserialize(DatumDeserializer {
			state: self.state,
			key: self.variant_key,
			allowed_depth: self.allowed_depth.dec()?,
		})
	}

	fn tuple_variant<V>(self, len: usize, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		use serde::Deserializer as _;
		DatumDeserializer {
			state: self.state,
			key: self.variant_key,
			allowed_depth: self.allowed_depth.dec()?,
		}
		.deserialize_tuple(len, visitor)
	}

	fn struct_variant<V>(
		self,
		fields: &'static [&'static str],
		visitor: V,
	) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		use serde::Deserializer as _;
		DatumDeserializer {
			state: self.state,
			key: self.variant_key,
			allowed_depth: self.allowed_depth.dec()?,
		}
		.deserialize_struct("", fields, visitor)
	}
}

/// `MapAccess` yielding exactly one entry: the branch's Avro type tag mapped
/// to the branch's value. Used when decoding a named union branch into an
/// untyped/dynamic target with `dynamic_union_map_keys` enabled.
pub(in super::super) struct TaggedUnionMapAccess<'r, 's, R> {
	pub(in super::super) state: &'r mut DeserializerState<'s, R>,
	pub(in super::super) variant_key: SchemaKey,
	pub(in super::super) allowed_depth: AllowedDepth,
	pub(in super::super) tag: Option<String>,
}
impl<'de, R: ReadSlice<'de>> MapAccess<'de> for TaggedUnionMapAccess<'_, '_, R> {
	type Error = DeError;

	fn next_key_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>, Self::Error>
	where
		T: DeserializeSeed<'de>,
	{
		Ok(match self.tag.take() {
			None => None,
			Some(tag) => Some(seed.deserialize(value::StringDeserializer::new(tag))?),
		})
	}

	fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value, Self::Error>
	where
		V: DeserializeSeed<'de>,
	{
		seed.deserialize(DatumDeserializer {
			state: self.state,
			key: self.variant_key,
			allowed_depth: self.allowed_depth,
		})
	}
}

pub(in super::super) fn schema_type_tag(node: &SchemaNode) -> String {
	match node {
		SchemaNode::Null => "null".to_owned(),
		SchemaNode::Boolean => "boolean".to_owned(),
		SchemaNode::Int => "int".to_owned(),
		SchemaNode::Long => "long".to_owned(),
		SchemaNode::Float => "float".to_owned(),
		SchemaNode::Double => "double".to_owned(),
		SchemaNode::Bytes => "bytes".to_owned(),
		SchemaNode::String => "string".to_owned(),
		SchemaNode::Array(_) => "array".to_owned(),
		SchemaNode::Map(_) => "map".to_owned(),
		SchemaNode::Union(_) => "union".to_owned(),
		SchemaNode::Record(r) => r.name.fully_qualified_name().to_owned(),
		SchemaNode::Enum(e) => e.name.fully_qualified_name().to_owned(),
		SchemaNode::Fixed(f) => f.name.fully_qualified_name().to_owned(),
		SchemaNode::Decimal(_) => "decimal".to_owned(),
		SchemaNode::Uuid => "uuid".to_owned(),
		SchemaNode::Date => "date".to_owned(),
		SchemaNode::TimeMillis => "time-millis".to_owned(),
		SchemaNode::TimeMicros => "time-micros".to_owned(),
		SchemaNode::TimestampMillis => "timestamp-millis".to_owned(),
		SchemaNode::TimestampMicros => "timestamp-micros".to_owned(),
		SchemaNode::LocalTimestampMillis => "local-timestamp-millis".to_owned(),
		SchemaNode::LocalTimestampMicros => "local-timestamp-micros".to_owned(),
		SchemaNode::Duration(_) => "duration".to_owned(),
	}
}
