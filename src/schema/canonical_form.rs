//! Avro Parsing Canonical Form (PCF) generation
//!
//! Generalized for this
//! crate's unified (index-based, logical-types-inlined) [`SchemaNode`]
//! representation. Per [AVRO-1721](https://issues.apache.org/jira/browse/AVRO-1721),
//! logical types are completely stripped from the canonical form: only the
//! underlying base type matters for fingerprinting.

use super::*;
use std::fmt::Write as _;

pub(super) fn canonical_form_string(nodes: &[SchemaNode]) -> Result<String, SchemaError> {
	let mut state = State {
		out: String::new(),
		named_type_written: vec![false; nodes.len()],
	};
	write_node(nodes, SchemaKey::root(), &mut state)?;
	Ok(state.out)
}

struct State {
	out: String,
	named_type_written: Vec<bool>,
}

fn write_node(nodes: &[SchemaNode], key: SchemaKey, state: &mut State) -> Result<(), SchemaError> {
	macro_rules! prim {
		($name:literal) => {{
			write!(state.out, "\"{}\"", $name).map_err(convert_error)
		}};
	}
	match &nodes[key.idx()] {
		SchemaNode::Null => prim!("null"),
		SchemaNode::Boolean => prim!("boolean"),
		SchemaNode::Int => prim!("int"),
		SchemaNode::Long => prim!("long"),
		SchemaNode::Float => prim!("float"),
		SchemaNode::Double => prim!("double"),
		SchemaNode::Bytes => prim!("bytes"),
		SchemaNode::String => prim!("string"),
		// Logical types: ignore the annotation, recurse into the base type
		// (AVRO-1721).
		SchemaNode::Uuid => prim!("string"),
		SchemaNode::Date | SchemaNode::TimeMillis => prim!("int"),
		SchemaNode::TimeMicros
		| SchemaNode::TimestampMillis
		| SchemaNode::TimestampMicros
		| SchemaNode::LocalTimestampMillis
		| SchemaNode::LocalTimestampMicros => prim!("long"),
		SchemaNode::Duration(name) => write_fixed_canonical(state, key, name, 12),
		SchemaNode::Decimal(d) => match &d.repr {
			DecimalRepr::Bytes => prim!("bytes"),
			DecimalRepr::Fixed { size, name } => write_fixed_canonical(state, key, name, *size),
		},
		SchemaNode::Array(a) => {
			state.out.push_str("{\"type\":\"array\",\"items\":");
			write_node(nodes, a.items, state)?;
			state.out.push('}');
			Ok(())
		}
		SchemaNode::Map(m) => {
			state.out.push_str("{\"type\":\"map\",\"values\":");
			write_node(nodes, m.values, state)?;
			state.out.push('}');
			Ok(())
		}
		SchemaNode::Union(u) => {
			state.out.push('[');
			for (i, &variant) in u.variants.iter().enumerate() {
				if i > 0 {
					state.out.push(',');
				}
				write_node(nodes, variant, state)?;
			}
			state.out.push(']');
			Ok(())
		}
		SchemaNode::Fixed(f) => write_fixed_canonical(state, key, &f.name, f.size),
		SchemaNode::Enum(e) => {
			if should_write_only_name(state, key, &e.name) {
				return write!(state.out, "\"{}\"", e.name.fully_qualified_name())
					.map_err(convert_error);
			}
			write!(
				state.out,
				"{{\"name\":\"{}\",\"type\":\"enum\",\"symbols\":[",
				e.name.fully_qualified_name()
			)
			.map_err(convert_error)?;
			for (i, symbol) in e.symbols.iter().enumerate() {
				if i > 0 {
					state.out.push(',');
				}
				write!(state.out, "\"{symbol}\"").map_err(convert_error)?;
			}
			state.out.push_str("]}");
			Ok(())
		}
		SchemaNode::Record(r) => {
			if should_write_only_name(state, key, &r.name) {
				return write!(state.out, "\"{}\"", r.name.fully_qualified_name())
					.map_err(convert_error);
			}
			write!(
				state.out,
				"{{\"name\":\"{}\",\"type\":\"record\",\"fields\":[",
				r.name.fully_qualified_name()
			)
			.map_err(convert_error)?;
			for (i, field) in r.fields.iter().enumerate() {
				if i > 0 {
					state.out.push(',');
				}
				write!(state.out, "{{\"name\":\"{}\",\"type\":", field.name).map_err(convert_error)?;
				write_node(nodes, field.schema, state)?;
				state.out.push('}');
			}
			state.out.push_str("]}");
			Ok(())
		}
	}
}

fn write_fixed_canonical(
	state: &mut State,
	key: SchemaKey,
	name: &Name,
	size: usize,
) -> Result<(), SchemaError> {
	if should_write_only_name(state, key, name) {
		return write!(state.out, "\"{}\"", name.fully_qualified_name()).map_err(convert_error);
	}
	write!(
		state.out,
		"{{\"name\":\"{}\",\"type\":\"fixed\",\"size\":{size}}}",
		name.fully_qualified_name()
	)
	.map_err(convert_error)
}

/// The first time
/// a named type's key is encountered, we write its full definition; any
/// later occurrence of the same node (a ref cycling back to it) writes only
/// its fullname.
fn should_write_only_name(state: &mut State, key: SchemaKey, _name: &Name) -> bool {
	let written = &mut state.named_type_written[key.idx()];
	if *written {
		true
	} else {
		*written = true;
		false
	}
}

fn convert_error(_: std::fmt::Error) -> SchemaError {
	SchemaError::msg("Failed to write canonical form (formatter error)")
}
