mod allowed_depth;
mod types;
mod unit_variant_enum_access;

use {types::*, unit_variant_enum_access::UnitVariantEnumAccess};

pub(crate) use allowed_depth::AllowedDepth;

use super::*;

/// Can't be instantiated directly - has to be constructed from a
/// [`DeserializerState`]
pub struct DatumDeserializer<'r, 's, R> {
	pub(super) state: &'r mut DeserializerState<'s, R>,
	pub(super) key: SchemaKey,
	pub(super) allowed_depth: AllowedDepth,
}

impl<'s, R> DatumDeserializer<'_, 's, R> {
	fn node(&self) -> &'s SchemaNode {
		self.state.node(self.key)
	}
}

impl<'de, R: ReadSlice<'de>> Deserializer<'de> for DatumDeserializer<'_, '_, R> {
	type Error = DeError;

	fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		match self.node() {
			SchemaNode::Null => visitor.visit_unit(),
			SchemaNode::Boolean => read_bool(self.state, visitor),
			SchemaNode::Int => visitor.visit_i32(self.state.read_varint()?),
			SchemaNode::Long => visitor.visit_i64(self.state.read_varint()?),
			SchemaNode::Float => {
				visitor.visit_f32(f32::from_le_bytes(self.state.read_const_size_buf()?))
			}
			SchemaNode::Double => {
				visitor.visit_f64(f64::from_le_bytes(self.state.read_const_size_buf()?))
			}
			SchemaNode::Bytes => read_length_delimited(self.state, BytesVisitor(visitor)),
			SchemaNode::String => read_length_delimited(self.state, StringVisitor(visitor)),
			SchemaNode::Array(array) => {
				let elements_key = array.items;
				visitor.visit_seq(ArraySeqAccess {
					elements_key,
					block_reader: BlockReader::new(self.state, self.allowed_depth.dec()?),
				})
			}
			SchemaNode::Map(map) => {
				let elements_key = map.values;
				visitor.visit_map(MapMapAccess {
					elements_key,
					block_reader: BlockReader::new(self.state, self.allowed_depth.dec()?),
				})
			}
			SchemaNode::Union(union) => {
				let variant_key = read_union_discriminant(self.state, union)?;
				match self.state.node(variant_key) {
					SchemaNode::Null => Self {
						key: variant_key,
						state: self.state,
						allowed_depth: self.allowed_depth.dec()?,
					}
					.deserialize_any(visitor),
					variant_node @ (SchemaNode::Record(_) | SchemaNode::Enum(_) | SchemaNode::Fixed(_))
						if self.state.config().dynamic_union_map_keys =>
					{
						let tag = schema_type_tag(variant_node);
						visitor.visit_map(TaggedUnionMapAccess {
							tag: Some(tag),
							variant_key,
							state: self.state,
							allowed_depth: self.allowed_depth.dec()?,
						})
					}
					_ => Self {
						key: variant_key,
						state: self.state,
						allowed_depth: self.allowed_depth.dec()?,
					}
					.deserialize_any(visitor),
				}
			}
			SchemaNode::Record(record) => {
				// Infinite recursion is prevented here by the fact a schema can't
				// contain a record that always ends up containing itself.
				visitor.visit_map(RecordMapAccess {
					record_fields: record.fields.iter(),
					state: self.state,
					allowed_depth: self.allowed_depth.dec()?,
				})
			}
			SchemaNode::Enum(enum_) => read_enum_as_str(self.state, &enum_.symbols, visitor),
			SchemaNode::Fixed(fixed) => self.state.read_slice(fixed.size, BytesVisitor(visitor)),
			SchemaNode::Decimal(decimal) => {
				read_decimal(self.state, decimal, VisitorHint::Str, visitor)
			}
			SchemaNode::Uuid => read_length_delimited(self.state, StringVisitor(visitor)),
			SchemaNode::Date => visitor.visit_i32(self.state.read_varint()?),
			SchemaNode::TimeMillis => visitor.visit_i32(self.state.read_varint()?),
			SchemaNode::TimeMicros => visitor.visit_i64(self.state.read_varint()?),
			SchemaNode::TimestampMillis | SchemaNode::LocalTimestampMillis => {
				visitor.visit_i64(self.state.read_varint()?)
			}
			SchemaNode::TimestampMicros | SchemaNode::LocalTimestampMicros => {
				visitor.visit_i64(self.state.read_varint()?)
			}
			SchemaNode::Duration(_) => visitor.visit_map(DurationMapAndSeqAccess {
				duration_buf: &self.state.read_const_size_buf::<12>()?,
			}),
		}
	}

	serde::forward_to_deserialize_any! {
		bool i8 i16 i32 u8 u16 u32 f32 char
		unit unit_struct newtype_struct
	}

	fn deserialize_u64<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		// Allow deserializing discriminants without making the string lookup for enums
		match self.node() {
			SchemaNode::Enum(_) => {
				let discriminant: i64 = self.state.read_varint()?;
				visitor.visit_u64(discriminant.try_into().map_err(|e| {
					DeError::custom(format_args!("Got negative enum discriminant: {e}"))
				})?)
			}
			SchemaNode::Decimal(decimal) => {
				read_decimal(self.state, decimal, VisitorHint::U64, visitor)
			}
			_ => self.deserialize_any(visitor),
		}
	}

	fn deserialize_i64<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		match self.node() {
			SchemaNode::Long => visitor.visit_i64(self.state.read_varint()?),
			SchemaNode::Decimal(decimal) => {
				read_decimal(self.state, decimal, VisitorHint::I64, visitor)
			}
			_ => self.deserialize_any(visitor),
		}
	}

	fn deserialize_u128<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		match self.node() {
			SchemaNode::Decimal(decimal) => {
				read_decimal(self.state, decimal, VisitorHint::U128, visitor)
			}
			_ => self.deserialize_any(visitor),
		}
	}

	fn deserialize_i128<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		match self.node() {
			SchemaNode::Decimal(decimal) => {
				read_decimal(self.state, decimal, VisitorHint::I128, visitor)
			}
			_ => self.deserialize_any(visitor),
		}
	}

	fn deserialize_f64<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		match self.node() {
			SchemaNode::Double => {
				visitor.visit_f64(f64::from_le_bytes(self.state.read_const_size_buf()?))
			}
			SchemaNode::Decimal(decimal) => {
				read_decimal(self.state, decimal, VisitorHint::F64, visitor)
			}
			_ => self.deserialize_any(visitor),
		}
	}

	fn deserialize_str<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		// If we get hinted on str, we may attempt to deserialize byte arrays as utf-8
		// encoded strings
		match self.node() {
			SchemaNode::String => read_length_delimited(self.state, StringVisitor(visitor)),
			SchemaNode::Bytes => read_length_delimited(self.state, StringVisitor(visitor)),
			SchemaNode::Fixed(fixed) => self.state.read_slice(fixed.size, StringVisitor(visitor)),
			_ => self.deserialize_any(visitor),
		}
	}

	fn deserialize_string<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		self.deserialize_str(visitor)
	}

	fn deserialize_bytes<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		match self.node() {
			SchemaNode::Bytes => read_length_delimited(self.state, BytesVisitor(visitor)),
			SchemaNode::Duration(_) => self.state.read_slice(12, BytesVisitor(visitor)),
			_ => self.deserialize_any(visitor),
		}
	}

	fn deserialize_byte_buf<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		self.deserialize_bytes(visitor)
	}

	fn deserialize_option<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		match self.node() {
			SchemaNode::Null => visitor.visit_none(),
			SchemaNode::Union(union) => {
				let discriminant: usize = read_discriminant(self.state)?;
				match union.variants.get(discriminant) {
					None => Err(DeError::new("Could not find union discriminant in schema")),
					Some(&variant_key) => match self.state.node(variant_key) {
						SchemaNode::Null => visitor.visit_none(),
						_ => visitor.visit_some(DatumDeserializer {
							state: self.state,
							key: variant_key,
							allowed_depth: self.allowed_depth.dec()?,
						}),
					},
				}
			}
			_ => visitor.visit_some(self),
		}
	}

	fn deserialize_seq<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		// TODO deserialize map as [(key,value)]
		// Until then, this can be worked around using the `serde-tuple-vec-map` crate
		match self.node() {
			SchemaNode::Array(array) => {
				let elements_key = array.items;
				visitor.visit_seq(ArraySeqAccess {
					elements_key,
					block_reader: BlockReader::new(self.state, self.allowed_depth.dec()?),
				})
			}
			SchemaNode::Duration(_) => visitor.visit_seq(DurationMapAndSeqAccess {
				duration_buf: &self.state.read_const_size_buf::<12>()?,
			}),
			_ => self.deserialize_any(visitor),
		}
	}

	fn deserialize_tuple<V>(self, len: usize, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		// Allows deserializing Duration as (u32, u32, u32)
		match self.node() {
			SchemaNode::Array(array) => {
				let elements_key = array.items;
				visitor.visit_seq(ArraySeqAccess {
					elements_key,
					block_reader: BlockReader::new(self.state, self.allowed_depth.dec()?),
				})
			}
			SchemaNode::Duration(_) if len == 3 => visitor.visit_seq(DurationMapAndSeqAccess {
				duration_buf: &self.state.read_const_size_buf::<12>()?,
			}),
			_ => self.deserialize_any(visitor),
		}
	}

	fn deserialize_tuple_struct<V>(
		self,
		_: &'static str,
		len: usize,
		visitor: V,
	) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		self.deserialize_tuple(len, visitor)
	}

	fn deserialize_map<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		// TODO [{key, value}] could be deserialized into a map
		self.deserialize_any(visitor)
	}

	fn deserialize_struct<V>(
		self,
		_: &'static str,
		_: &'static [&'static str],
		visitor: V,
	) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		self.deserialize_map(visitor)
	}

	fn deserialize_enum<V>(
		self,
		_: &'static str,
		_: &'static [&'static str],
		visitor: V,
	) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		// `UnionEnumAccess` tags the visited variant by its Avro type name, so it
		// also serves as the fallback for non-union schemas deserialized into a
		// Rust enum (the "variant" is then just the node's own type tag).
		match self.node() {
			SchemaNode::Union(union) => {
				let variant_key = read_union_discriminant(self.state, union)?;
				visitor.visit_enum(UnionEnumAccess {
					variant_key,
					state: self.state,
					allowed_depth: self.allowed_depth.dec()?,
				})
			}
			SchemaNode::Int
			| SchemaNode::Long
			| SchemaNode::Bytes
			| SchemaNode::String
			| SchemaNode::Enum(_)
			| SchemaNode::Fixed(_) => visitor.visit_enum(UnitVariantEnumAccess {
				state: self.state,
				key: self.key,
				allowed_depth: self.allowed_depth.dec()?,
			}),
			_ => visitor.visit_enum(UnionEnumAccess {
				state: self.state,
				variant_key: self.key,
				allowed_depth: self.allowed_depth.dec()?,
			}),
		}
	}

	fn deserialize_identifier<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		match self.node() {
			SchemaNode::Int => visitor.visit_u64({
				let val: i32 = self.state.read_varint()?;
				val.try_into()
					.map_err(|_| DeError::new("Failed to convert i32 to u64 for enum identifier"))?
			}),
			SchemaNode::Long => visitor.visit_u64({
				let val: i64 = self.state.read_varint()?;
				val.try_into()
					.map_err(|_| DeError::new("Failed to convert i64 to u64 for enum identifier"))?
			}),
			_ => self.deserialize_any(visitor),
		}
	}

	fn deserialize_ignored_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		// The main thing we can skip here for performance is utf8 decoding of strings.
		// However we still need to drive the deserializer mostly normally to properly
		// advance the reader.

		// TODO skip more efficiently using blocks size hints
		// https://stackoverflow.com/a/42247224/3799609
		match self.node() {
			SchemaNode::String => read_length_delimited(self.state, BytesVisitor(visitor)),
			_ => self.deserialize_any(visitor),
		}
	}
}
