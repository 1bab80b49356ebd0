use super::*;

pub(in super::super) fn read_enum_as_str<'de, R, V>(
	state: &mut DeserializerState<R>,
	symbols: &[String],
	visitor: V,
) -> Result<V::Value, DeError>
where
	R: ReadSlice<'de>,
	V: Visitor<'de>,
{
	let discriminant = read_discriminant(state)?;
	match symbols.get(discriminant) {
		None => Err(DeError::new("Could not find enum discriminant in schema")),
		Some(symbol) => {
			// Visiting owned here (instead of trying to borrow from the
			// schema) keeps the deserializer's lifetime independent from the
			// schema's, which is worth the small allocation.
			visitor.visit_str(symbol)
		}
	}
}
