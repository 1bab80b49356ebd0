//! Picks which branch of a union a bare (non-enum-tagged) Rust value should
//! serialize into.
//!
//! Unlike the schema's other precomputed data (canonical form, fingerprint)
//! this lookup is recomputed on every call rather than cached on the frozen
//! `Schema`: caching it would require threading a lookup table through the
//! `Union` node itself, which the arena-based schema representation doesn't
//! carry. Unions are rarely more than a handful of variants so the
//! linear scan this costs is negligible next to the I/O it guards.

use super::*;

/// Indexes for union variants that can be obtained directly from the Rust
/// value's shape
///
/// When the variant is such that there may be several of the same variant in
/// the union based on the name, it's resolved through
/// [`find_union_variant_by_name`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum UnionVariantLookupKey {
	Null,
	UnitStruct,
	Boolean,
	Integer,
	Integer4,
	Integer8,
	Float4,
	Float8,
	Str,
	SliceU8,
	UnitVariant,
	StructOrMap,
	SeqOrTupleOrTupleStruct,
}

/// Priority at which `node` would accept being chosen for `key` (lower wins);
/// `None` if `node` can't serve as a destination for that shape at all.
///
/// This list is very coupled with [`DatumSerializer`]: every
/// [`UnionVariantLookupKey`] corresponds to one (or more) function of
/// `Serializer`, and every non-`None` entry corresponds to a capability of
/// that function to serialize that type.
fn priority_for(node: &SchemaNode, key: UnionVariantLookupKey) -> Option<usize> {
	use UnionVariantLookupKey::*;
	match node {
		SchemaNode::Null => match key {
			Null => Some(0),
			UnitStruct => Some(0),
			UnitVariant => Some(2),
			_ => None,
		},
		SchemaNode::Boolean => match key {
			Boolean => Some(0),
			_ => None,
		},
		SchemaNode::Int | SchemaNode::Date | SchemaNode::TimeMillis => match key {
			Integer => Some(0),
			Integer4 => Some(0),
			Integer8 => Some(1),
			_ => None,
		},
		SchemaNode::Long
		| SchemaNode::TimeMicros
		| SchemaNode::TimestampMillis
		| SchemaNode::TimestampMicros
		| SchemaNode::LocalTimestampMillis
		| SchemaNode::LocalTimestampMicros => match key {
			Integer => Some(0),
			Integer4 => Some(1),
			Integer8 => Some(0),
			_ => None,
		},
		SchemaNode::Float => match key {
			Float4 => Some(0),
			Float8 => Some(1),
			_ => None,
		},
		SchemaNode::Double => match key {
			Float8 => Some(0),
			Float4 => Some(1), // just for a better error message
			_ => None,
		},
		SchemaNode::Bytes => match key {
			Str => Some(10),
			UnitStruct => Some(10),
			SliceU8 => Some(0),
			SeqOrTupleOrTupleStruct => Some(2),
			UnitVariant => Some(10),
			_ => None,
		},
		SchemaNode::String => match key {
			Str => Some(0),
			UnitStruct => Some(0),
			SliceU8 => Some(1),
			UnitVariant => Some(1),
			_ => None,
		},
		SchemaNode::Uuid => match key {
			// uuid::Uuid serializes as &str by default, indistinguishable from
			// a plain String - if both are in the union this will conflict,
			// which forces the caller to disambiguate via an enum.
			Str => Some(0),
			_ => None,
		},
		SchemaNode::Array(_) => match key {
			SeqOrTupleOrTupleStruct => Some(0),
			_ => None,
		},
		SchemaNode::Map(_) => match key {
			StructOrMap => Some(0),
			_ => None,
		},
		SchemaNode::Union(_) => None, // union in union is not allowed
		SchemaNode::Enum(_) => match key {
			Integer => Some(10),
			Integer4 => Some(10),
			Integer8 => Some(10),
			UnitStruct => Some(0),
			Str => Some(5),
			UnitVariant => Some(0),
			_ => None,
		},
		SchemaNode::Record(_) => match key {
			StructOrMap => Some(0),
			_ => None,
		},
		SchemaNode::Fixed(_) => match key {
			Str => Some(15),
			SliceU8 => Some(0),
			SeqOrTupleOrTupleStruct => Some(2),
			_ => None,
		},
		SchemaNode::Decimal(_) => match key {
			Integer => Some(5),
			Integer4 => Some(5),
			Integer8 => Some(5),
			Float8 => Some(2),
			Str => Some(20),
			_ => None,
		},
		SchemaNode::Duration(_) => match key {
			StructOrMap => Some(5),
			SeqOrTupleOrTupleStruct => Some(5),
			SliceU8 => Some(5),
			_ => None,
		},
	}
}

/// The name(s) a union variant may be addressed by from
/// [`find_union_variant_by_name`]: its own type name, plus for named types
/// both the short and fully qualified name.
fn names_for(node: &SchemaNode) -> [Option<Cow<'static, str>>; 2] {
	fn type_name(node: &SchemaNode) -> &'static str {
		match node {
			SchemaNode::Null => "Null",
			SchemaNode::Boolean => "Boolean",
			SchemaNode::Int => "Int",
			SchemaNode::Long => "Long",
			SchemaNode::Float => "Float",
			SchemaNode::Double => "Double",
			SchemaNode::Bytes => "Bytes",
			SchemaNode::String => "String",
			SchemaNode::Array(_) => "Array",
			SchemaNode::Map(_) => "Map",
			SchemaNode::Union(_) => "Union",
			SchemaNode::Enum(_) => "Enum",
			SchemaNode::Record(_) => "Record",
			SchemaNode::Fixed(_) => "Fixed",
			SchemaNode::Decimal(_) => "Decimal",
			SchemaNode::Uuid => "Uuid",
			SchemaNode::Date => "Date",
			SchemaNode::TimeMillis => "TimeMillis",
			SchemaNode::TimeMicros => "TimeMicros",
			SchemaNode::TimestampMillis => "TimestampMillis",
			SchemaNode::TimestampMicros => "TimestampMicros",
			SchemaNode::LocalTimestampMillis => "LocalTimestampMillis",
			SchemaNode::LocalTimestampMicros => "LocalTimestampMicros",
			SchemaNode::Duration(_) => "Duration",
		}
	}
	let name = match node {
		SchemaNode::Enum(e) => Some(&e.name),
		SchemaNode::Record(r) => Some(&r.name),
		SchemaNode::Fixed(f) => Some(&f.name),
		SchemaNode::Decimal(Decimal {
			repr: DecimalRepr::Fixed { name, .. },
			..
		}) => Some(name),
		_ => None,
	};
	match name {
		Some(name) => [
			Some(Cow::Owned(name.name().to_owned())),
			Some(Cow::Owned(name.fully_qualified_name().to_owned())),
		],
		None => [Some(Cow::Borrowed(type_name(node))), None],
	}
}

/// Picks the union branch whose [`priority_for`] is lowest for `key`,
/// erroring (returning `None`) on ties so ambiguous unions force the caller
/// to disambiguate explicitly (e.g. via an enum).
pub(super) fn find_union_variant_by_type(
	schema: &Schema,
	union: &Union,
	key: UnionVariantLookupKey,
) -> Option<(i64, SchemaKey)> {
	let mut best: Option<(usize, i64, SchemaKey)> = None;
	let mut conflict = false;
	for (discriminant, &variant_key) in union.variants.iter().enumerate() {
		let discriminant = discriminant as i64;
		if let Some(priority) = priority_for(schema.node(variant_key), key) {
			best = match best {
				None => Some((priority, discriminant, variant_key)),
				Some((best_priority, ..)) if priority < best_priority => {
					conflict = false;
					Some((priority, discriminant, variant_key))
				}
				Some((best_priority, ..)) if priority == best_priority => {
					conflict = true;
					best
				}
				_ => best,
			};
		}
	}
	match best {
		Some((_, discriminant, variant_key)) if !conflict => Some((discriminant, variant_key)),
		_ => None,
	}
}

/// Picks the union branch whose own type name (or, for named types, short or
/// fully qualified name) matches `wanted` - used when an explicit Rust enum
/// variant or unit struct name tells us exactly which branch to use.
pub(super) fn find_union_variant_by_name(
	schema: &Schema,
	union: &Union,
	wanted: &str,
) -> Option<(i64, SchemaKey)> {
	union
		.variants
		.iter()
		.enumerate()
		.find_map(|(discriminant, &variant_key)| {
			names_for(schema.node(variant_key))
				.into_iter()
				.flatten()
				.any(|name| name == wanted)
				.then_some((discriminant as i64, variant_key))
		})
}
