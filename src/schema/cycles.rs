//! Unconditional-cycle detection
//!
//! A cycle through a record field, array item, or map value is fine (that's
//! how recursive types like linked lists are expressed in Avro) as long as
//! actually constructing a value can terminate: a union branch, or a
//! zero-or-more sequence, breaks the infinite regress. A cycle that revisits
//! the same node through every step with no such escape hatch can never
//! produce a finite value and is rejected at parse time.
//!
//! Detected via a DFS walk, adapted to the unified [`SchemaNode`] representation.

use super::*;

pub(super) fn check_for_unconditional_cycles(nodes: &[SchemaNode]) -> Result<(), SchemaError> {
	let mut on_stack = vec![false; nodes.len()];
	visit(nodes, SchemaKey::root(), &mut on_stack)
}

/// Returns an error if visiting `key` would re-enter a node that's already
/// an ancestor of this traversal *without* passing through a union or a
/// collection (arrays/maps can always be empty, which breaks the cycle).
fn visit(nodes: &[SchemaNode], key: SchemaKey, on_stack: &mut [bool]) -> Result<(), SchemaError> {
	if on_stack[key.idx()] {
		return Err(SchemaError::msg(
			"Schema contains an unconditional cycle (a record field chain that refers back to \
			 itself with no union or collection to terminate it)",
		));
	}
	on_stack[key.idx()] = true;
	match &nodes[key.idx()] {
		SchemaNode::Null
		| SchemaNode::Boolean
		| SchemaNode::Int
		| SchemaNode::Long
		| SchemaNode::Float
		| SchemaNode::Double
		| SchemaNode::Bytes
		| SchemaNode::String
		| SchemaNode::Uuid
		| SchemaNode::Date
		| SchemaNode::TimeMillis
		| SchemaNode::TimeMicros
		| SchemaNode::TimestampMillis
		| SchemaNode::TimestampMicros
		| SchemaNode::LocalTimestampMillis
		| SchemaNode::LocalTimestampMicros
		| SchemaNode::Duration(_)
		| SchemaNode::Enum(_)
		| SchemaNode::Fixed(_) => {}
		SchemaNode::Decimal(d) => {
			// Bytes/fixed decimals are leaves in the graph: fixed's size is
			// a plain integer, not a schema reference.
			let _ = d;
		}
		// Arrays and maps can always be empty: a cycle through an item/value
		// type is conditional, not unconditional. Still recurse to find
		// unconditional cycles nested deeper, but starting a fresh "on
		// stack" view isn't needed since collections themselves break the
		// chain: clear this node's stack marker before recursing so a cycle
		// back to *this* array/map node isn't flagged, while a direct
		// self-reference further down still is through its own marker.
		SchemaNode::Array(a) => {
			on_stack[key.idx()] = false;
			visit(nodes, a.items, on_stack)?;
			return Ok(());
		}
		SchemaNode::Map(m) => {
			on_stack[key.idx()] = false;
			visit(nodes, m.values, on_stack)?;
			return Ok(());
		}
		// A union is only unconditional if it has exactly one branch; with
		// two or more, at least one branch can be picked to terminate, so
		// treat unions the same way as collections unless they are
		// degenerate.
		SchemaNode::Union(u) => {
			if u.variants.len() <= 1 {
				for &variant in &u.variants {
					visit(nodes, variant, on_stack)?;
				}
			} else {
				on_stack[key.idx()] = false;
				for &variant in &u.variants {
					visit(nodes, variant, on_stack)?;
				}
				return Ok(());
			}
		}
		SchemaNode::Record(r) => {
			for field in &r.fields {
				visit(nodes, field.schema, on_stack)?;
			}
		}
	}
	on_stack[key.idx()] = false;
	Ok(())
}
