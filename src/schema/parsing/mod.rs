//! JSON-to-schema parsing (L2 in the module numbering this crate inherited)
//!
//! Recursive-descent JSON schema parsing, building the
//! unified [`SchemaNode`](super::SchemaNode) arena directly (logical types
//! are resolved into their final inlined variant rather than kept as a
//! separate wrapper), and extended with explicit name validation and
//! cross-document schema cache lookups instead of a process-wide flag.

mod raw;

use super::*;

use std::collections::{HashMap, HashSet};

const LATE_NAME_LOOKUP_REMAP_BIT: usize = 1usize << (usize::BITS - 1);

pub(super) fn parse(s: &str, config: &ParserConfig) -> Result<SchemaMut, SchemaError> {
	let mut state = ConstructionState {
		nodes: Vec::new(),
		properties: Vec::new(),
		names: HashMap::new(),
		unresolved_names: Vec::new(),
		pending_logical: Vec::new(),
		config,
	};

	let raw_schema: raw::SchemaNode = serde_json::from_str(s).map_err(SchemaError::serde_json)?;

	state.register_node(&raw_schema, None, None)?;

	// Support for unordered name definitions: references to a name that
	// hasn't been registered yet get a placeholder key (tagged with
	// `LATE_NAME_LOOKUP_REMAP_BIT`) which is fixed up here once the whole
	// document (and, failing that, the shared cache) has been consulted.
	if !state.unresolved_names.is_empty() {
		let cache = state.config.cache.clone();
		let unresolved_names = std::mem::take(&mut state.unresolved_names);
		let resolved_names: Vec<SchemaKey> = unresolved_names
			.iter()
			.map(|name| match state.names.get(name) {
				Some(&idx) => Ok(SchemaKey::from_idx(idx)),
				None => {
					let fullname = name.to_string();
					let cached = cache
						.as_ref()
						.and_then(|cache| cache.named.lock().unwrap().get(&fullname).cloned());
					match cached {
						Some(cached_schema) => Ok(splice_cached_schema(
							&mut state.nodes,
							&mut state.properties,
							&cached_schema,
						)),
						None => Err(SchemaError::msg(format!(
							"The Schema contains an unknown reference: {fullname}"
						))),
					}
				}
			})
			.collect::<Result<_, _>>()?;
		let fix_key = |key: &mut SchemaKey| {
			if key.idx() & LATE_NAME_LOOKUP_REMAP_BIT != 0 {
				*key = resolved_names[key.idx() ^ LATE_NAME_LOOKUP_REMAP_BIT];
			}
		};
		for node in &mut state.nodes {
			fix_node_keys(node, fix_key);
		}
		for pending in &mut state.pending_logical {
			fix_key(&mut pending.inner);
		}
	}

	for pending in std::mem::take(&mut state.pending_logical) {
		let final_node = resolve_logical(&state.nodes, &pending)?;
		state.nodes[pending.idx] = final_node;
	}

	validate_unions(&state.nodes)?;

	let schema_json = String::from_utf8({
		// Sanitize & minify json, preserving all keys.
		let mut serializer = serde_json::Serializer::new(Vec::new());
		serde_transcode::transcode(&mut serde_json::Deserializer::from_str(s), &mut serializer)
			.map_err(SchemaError::serde_json)?;
		serializer.into_inner()
	})
	.map_err(|e| SchemaError::msg(format!("serde_json should not emit invalid UTF-8 but got {e}")))?;

	Ok(SchemaMut {
		nodes: state.nodes,
		properties: state.properties,
		schema_json: Some(schema_json),
	})
}

fn fix_node_keys(node: &mut SchemaNode, mut fix_key: impl FnMut(&mut SchemaKey)) {
	match node {
		SchemaNode::Array(a) => fix_key(&mut a.items),
		SchemaNode::Map(m) => fix_key(&mut m.values),
		SchemaNode::Union(u) => u.variants.iter_mut().for_each(fix_key),
		SchemaNode::Record(r) => r.fields.iter_mut().for_each(|f| fix_key(&mut f.schema)),
		SchemaNode::Null
		| SchemaNode::Boolean
		| SchemaNode::Int
		| SchemaNode::Long
		| SchemaNode::Float
		| SchemaNode::Double
		| SchemaNode::Bytes
		| SchemaNode::String
		| SchemaNode::Enum(_)
		| SchemaNode::Fixed(_)
		| SchemaNode::Decimal(_)
		| SchemaNode::Uuid
		| SchemaNode::Date
		| SchemaNode::TimeMillis
		| SchemaNode::TimeMicros
		| SchemaNode::TimestampMillis
		| SchemaNode::TimestampMicros
		| SchemaNode::LocalTimestampMillis
		| SchemaNode::LocalTimestampMicros
		| SchemaNode::Duration(_) => {}
	}
}

/// Appends a cached, already-frozen [`Schema`]'s node arena onto the end of
/// `nodes`, shifting every internal [`SchemaKey`] by the insertion offset,
/// and returns the key of its (now relocated) root. The cached schema's
/// per-node properties are copied across in lockstep.
fn splice_cached_schema(
	nodes: &mut Vec<SchemaNode>,
	properties: &mut Vec<Vec<(String, serde_json::Value)>>,
	cached: &Schema,
) -> SchemaKey {
	let offset = nodes.len();
	for (i, node) in cached.nodes().iter().enumerate() {
		let mut node = node.clone();
		fix_node_keys(&mut node, |key| *key = SchemaKey::from_idx(key.idx() + offset));
		nodes.push(node);
		properties.push(cached.properties(SchemaKey::from_idx(i)).to_vec());
	}
	SchemaKey::from_idx(offset + cached.root().idx())
}

/// Checks the union-branch invariants: branches may not repeat a type,
/// except that the repetition check for record/enum/fixed (and other named
/// types) is by full name rather than by structural shape.
fn validate_unions(nodes: &[SchemaNode]) -> Result<(), SchemaError> {
	for node in nodes {
		if let SchemaNode::Union(u) = node {
			let mut seen = HashSet::new();
			for &variant in &u.variants {
				if let SchemaNode::Union(_) = &nodes[variant.idx()] {
					return Err(SchemaError::new(
						"Unions may not immediately contain another union",
					));
				}
				let kind = union_branch_kind(&nodes[variant.idx()]);
				if !seen.insert(kind.clone()) {
					return Err(SchemaError::msg(match kind {
						UnionBranchKind::Named(name) => {
							format!("Union contains more than one branch named {name:?}")
						}
						UnionBranchKind::Unnamed(_) => {
							"Union contains more than one branch of the same unnamed type".to_owned()
						}
					}));
				}
			}
		}
	}
	Ok(())
}

#[derive(PartialEq, Eq, Hash, Clone)]
enum UnionBranchKind<'a> {
	Named(&'a str),
	Unnamed(std::mem::Discriminant<SchemaNode>),
}
fn union_branch_kind(node: &SchemaNode) -> UnionBranchKind<'_> {
	match node {
		SchemaNode::Record(r) => UnionBranchKind::Named(r.name.fully_qualified_name()),
		SchemaNode::Enum(e) => UnionBranchKind::Named(e.name.fully_qualified_name()),
		SchemaNode::Fixed(f) => UnionBranchKind::Named(f.name.fully_qualified_name()),
		SchemaNode::Duration(name) => UnionBranchKind::Named(name.fully_qualified_name()),
		SchemaNode::Decimal(Decimal {
			repr: DecimalRepr::Fixed { name, .. },
			..
		}) => UnionBranchKind::Named(name.fully_qualified_name()),
		other => UnionBranchKind::Unnamed(std::mem::discriminant(other)),
	}
}

struct ConstructionState<'a, 'cfg> {
	nodes: Vec<SchemaNode>,
	/// Non-standard annotations collected per node, indexed in lockstep with
	/// `nodes`.
	properties: Vec<Vec<(String, serde_json::Value)>>,
	names: HashMap<NameKey<'a>, usize>,
	unresolved_names: Vec<NameKey<'a>>,
	pending_logical: Vec<PendingLogical<'a>>,
	config: &'cfg ParserConfig,
}

struct PendingLogical<'a> {
	/// Index of the (still-placeholder) node this will resolve into
	idx: usize,
	/// Key of the already-registered base type this logical type annotates
	inner: SchemaKey,
	logical_type: &'a str,
	precision: Option<usize>,
	scale: Option<u32>,
}

fn resolve_logical(nodes: &[SchemaNode], pending: &PendingLogical<'_>) -> Result<SchemaNode, SchemaError> {
	let inner = &nodes[pending.inner.idx()];
	let invalid = |expected: &str| -> SchemaError {
		SchemaError::msg(format!(
			"logicalType {:?} must annotate {expected}, got {inner:?}",
			pending.logical_type
		))
	};
	Ok(match pending.logical_type {
		"decimal" => {
			let precision = pending
				.precision
				.ok_or_else(|| SchemaError::msg("Missing field `precision` on logical type \"decimal\""))?;
			let scale = pending.scale.unwrap_or(0);
			let repr = match inner {
				SchemaNode::Bytes => DecimalRepr::Bytes,
				SchemaNode::Fixed(f) => DecimalRepr::Fixed {
					size: f.size,
					name: f.name.clone(),
				},
				_ => return Err(invalid("`bytes` or `fixed`")),
			};
			SchemaNode::Decimal(Decimal { precision, scale, repr })
		}
		"uuid" => match inner {
			SchemaNode::String => SchemaNode::Uuid,
			_ => return Err(invalid("`string`")),
		},
		"date" => match inner {
			SchemaNode::Int => SchemaNode::Date,
			_ => return Err(invalid("`int`")),
		},
		"time-millis" => match inner {
			SchemaNode::Int => SchemaNode::TimeMillis,
			_ => return Err(invalid("`int`")),
		},
		"time-micros" => match inner {
			SchemaNode::Long => SchemaNode::TimeMicros,
			_ => return Err(invalid("`long`")),
		},
		"timestamp-millis" => match inner {
			SchemaNode::Long => SchemaNode::TimestampMillis,
			_ => return Err(invalid("`long`")),
		},
		"timestamp-micros" => match inner {
			SchemaNode::Long => SchemaNode::TimestampMicros,
			_ => return Err(invalid("`long`")),
		},
		"local-timestamp-millis" => match inner {
			SchemaNode::Long => SchemaNode::LocalTimestampMillis,
			_ => return Err(invalid("`long`")),
		},
		"local-timestamp-micros" => match inner {
			SchemaNode::Long => SchemaNode::LocalTimestampMicros,
			_ => return Err(invalid("`long`")),
		},
		"duration" => match inner {
			SchemaNode::Fixed(f) if f.size == 12 => SchemaNode::Duration(f.name.clone()),
			SchemaNode::Fixed(_) => {
				return Err(SchemaError::msg(
					"logicalType \"duration\" must annotate a fixed(12)",
				))
			}
			_ => return Err(invalid("`fixed(12)`")),
		},
		// Unrecognized logical type: per the Avro spec, an unknown
		// `logicalType` annotation is ignored and the base type stands as-is.
		_unknown => inner.clone(),
	})
}

impl<'a> ConstructionState<'a, '_> {
	fn validate_name(&self, name: &str) -> Result<(), SchemaError> {
		if !self.config.validate_names {
			return Ok(());
		}
		let valid = matches!(name.as_bytes().first(), Some(b'_') | Some(b'a'..=b'z') | Some(b'A'..=b'Z'))
			&& name
				.bytes()
				.all(|b| b.is_ascii_alphanumeric() || b == b'_');
		if valid {
			Ok(())
		} else {
			Err(SchemaError::msg(format!(
				"Invalid name {name:?}: names must match [A-Za-z_][A-Za-z0-9_]*"
			)))
		}
	}

	/// Registers each alias under the given node's index, resolving
	/// unqualified aliases against the named type's own namespace (not the
	/// enclosing one), and returns the resolved `Name`s to attach to the
	/// node itself.
	fn register_aliases(
		&mut self,
		aliases: &Option<Vec<raw::BorrowedCowIfPossible<'a>>>,
		name_key: Option<NameKey<'a>>,
		idx: usize,
	) -> Result<Vec<Name>, SchemaError> {
		let aliases = match aliases {
			Some(aliases) => aliases,
			None => return Ok(Vec::new()),
		};
		let name_key = match name_key {
			Some(name_key) => name_key,
			None => return Err(SchemaError::new("`aliases` is only valid on named types")),
		};
		aliases
			.iter()
			.map(|alias| {
				let alias_str: &str = &alias.0;
				let alias_key = if let Some((namespace, name)) = alias_str.rsplit_once('.') {
					self.validate_name(name)?;
					NameKey {
						namespace: Some(namespace).filter(|s| !s.is_empty()),
						name,
					}
				} else {
					self.validate_name(alias_str)?;
					NameKey {
						namespace: name_key.namespace,
						name: alias_str,
					}
				};
				if self.names.insert(alias_key, idx).is_some() {
					return Err(SchemaError::msg(format!(
						"The Schema contains duplicate definitions for {alias_key}"
					)));
				}
				Ok(alias_key.name())
			})
			.collect()
	}

	fn register_node(
		&mut self,
		raw_schema: &'a raw::SchemaNode<'a>,
		enclosing_namespace: Option<&'a str>,
		will_have_logical_type: Option<&str>,
	) -> Result<SchemaKey, SchemaError> {
		Ok(match *raw_schema {
			raw::SchemaNode::Type(type_) => {
				let idx = self.nodes.len();
				self.nodes.push(match type_ {
					raw::Type::Null => SchemaNode::Null,
					raw::Type::Boolean => SchemaNode::Boolean,
					raw::Type::Int => SchemaNode::Int,
					raw::Type::Long => SchemaNode::Long,
					raw::Type::Float => SchemaNode::Float,
					raw::Type::Double => SchemaNode::Double,
					raw::Type::Bytes => SchemaNode::Bytes,
					raw::Type::String => SchemaNode::String,
					complex_type @ (raw::Type::Array
					| raw::Type::Map
					| raw::Type::Record
					| raw::Type::Enum
					| raw::Type::Fixed) => {
						return Err(SchemaError::msg(format!(
							"Expected primitive type name, but got {complex_type:?} as type which \
							 is a complex type, so should be in an object."
						)))
					}
				});
				self.properties.push(Vec::new());
				SchemaKey::from_idx(idx)
			}
			raw::SchemaNode::Object(ref object) => {
				let idx = self.nodes.len();
				let object = &**object;
				let name_key = if let Some(ref name) = object.name {
					let name: &str = &name.0;
					let name_key = if let Some((namespace, name)) = name.rsplit_once('.') {
						self.validate_name(name)?;
						NameKey {
							namespace: Some(namespace).filter(|s| !s.is_empty()),
							name,
						}
					} else {
						self.validate_name(name)?;
						NameKey {
							namespace: match object.namespace {
								Some(ref namespace) => Some(&*namespace.0).filter(|s| !s.is_empty()),
								None => enclosing_namespace,
							},
							name,
						}
					};
					if self.names.insert(name_key, idx).is_some() {
						return Err(SchemaError::msg(format!(
							"The Schema contains duplicate definitions for {name_key}"
						)));
					}
					Some(name_key)
				} else {
					None
				};
				let name = |type_: raw::Type| match name_key {
					None => Err(SchemaError::msg(format!("Missing name for type {type_:?}"))),
					Some(name_key) => Ok((name_key.name(), name_key)),
				};
				let aliases = self.register_aliases(&object.aliases, name_key, idx)?;

				self.nodes.push(SchemaNode::Null); // Reserve the spot for us
				self.properties.push(Vec::new()); // Reserve the spot for us

				let new_node = match object.logical_type {
					None => {
						macro_rules! field {
							($type_:ident $name:ident) => {
								match &object.$name {
									Some(v) => v,
									None => {
										return Err(SchemaError::msg(format!(
											concat!("Missing field `", stringify!($name), "` on type {:?}"),
											$type_
										)))
									}
								}
							};
						}
						match object.type_ {
							raw::SchemaNode::Type(t @ raw::Type::Array) => SchemaNode::Array(Array {
								items: self.register_node(field!(t items), enclosing_namespace, None)?,
							}),
							raw::SchemaNode::Type(t @ raw::Type::Map) => SchemaNode::Map(Map {
								values: self.register_node(field!(t values), enclosing_namespace, None)?,
							}),
							raw::SchemaNode::Type(t @ raw::Type::Enum) => {
								let symbols: Vec<String> = field!(t symbols)
									.iter()
									.map(|s| {
										self.validate_name(&s.0)?;
										Ok((*s.0).to_owned())
									})
									.collect::<Result<_, SchemaError>>()?;
								SchemaNode::Enum(Enum {
									name: name(t)?.0,
									aliases,
									symbols,
								})
							}
							raw::SchemaNode::Type(t @ raw::Type::Fixed) => SchemaNode::Fixed(Fixed {
								name: name(t)?.0,
								aliases,
								size: *field!(t size),
							}),
							raw::SchemaNode::Type(t @ raw::Type::Record) => {
								let (this_name, this_name_key) = name(t)?;
								let fields = field!(t fields)
									.iter()
									.map(|field| {
										self.validate_name(&field.name.0)?;
										Ok(RecordField {
											name: (*field.name.0).to_owned(),
											schema: self.register_node(
												&field.type_,
												this_name_key.namespace,
												None,
											)?,
										})
									})
									.collect::<Result<_, SchemaError>>()?;
								SchemaNode::Record(Record {
									name: this_name,
									aliases,
									fields,
								})
							}
							ref inner_type @ (raw::SchemaNode::Type(
								raw::Type::Null
								| raw::Type::Boolean
								| raw::Type::Int
								| raw::Type::Long
								| raw::Type::Float
								| raw::Type::Double
								| raw::Type::Bytes
								| raw::Type::String,
							)
							| raw::SchemaNode::Ref(_)
							| raw::SchemaNode::Object(_)
							| raw::SchemaNode::Union(_)) => {
								// We have to allow `{"type": {"type": "string"}}`
								// (an object with an inner type and nothing else
								// is a valid representation), but in that case we'd
								// silently drop any keys set at our current level,
								// so only allow it when none are set.
								match object {
									raw::SchemaNodeObject {
										type_: _,
										logical_type: _,
										name: _,
										namespace: _,
										fields: None,
										symbols: None,
										items: None,
										values: None,
										size: None,
										precision: None,
										scale: None,
										aliases: None,
										extra,
									} if extra.is_empty() => {
										self.nodes.pop().expect("We have just pushed");
										self.properties.pop().expect("We have just pushed");
										return self.register_node(
											inner_type,
											name_key.and_then(|n| n.namespace).or(enclosing_namespace),
											will_have_logical_type,
										);
									}
									_ => {
										return Err(SchemaError::new(
											"Got unnecessarily-nested type, but local object \
											 properties are set - those would be ignored",
										))
									}
								}
							}
						}
					}
					Some(ref logical_type) => {
						let logical_type = &*logical_type.0;
						if let Some(will_have_logical_type) = will_have_logical_type {
							return Err(SchemaError::msg(format!(
								"Immediately-nested logical types: {logical_type:?} in \
								 {will_have_logical_type:?}"
							)));
						}
						let inner = self.register_node(&object.type_, enclosing_namespace, Some(logical_type))?;
						self.pending_logical.push(PendingLogical {
							idx,
							inner,
							logical_type,
							precision: object.precision,
							scale: object.scale,
						});
						// Filled in for real once `inner` is fully resolved
						// (it may still be an unordered forward reference at
						// this point).
						SchemaNode::Null
					}
				};
				self.nodes[idx] = new_node;
				self.properties[idx] = object
					.extra
					.iter()
					.map(|(k, v)| (k.clone(), v.clone()))
					.collect();
				SchemaKey::from_idx(idx)
			}
			raw::SchemaNode::Union(ref union_schemas) => {
				let idx = self.nodes.len();
				self.nodes.push(SchemaNode::Null); // Reserve the spot for us
				self.properties.push(Vec::new());
				let new_node = SchemaNode::Union(Union {
					variants: union_schemas
						.iter()
						.map(|schema| self.register_node(schema, enclosing_namespace, None))
						.collect::<Result<_, _>>()?,
				});
				self.nodes[idx] = new_node;
				SchemaKey::from_idx(idx)
			}
			raw::SchemaNode::Ref(ref reference) => {
				// Supposed to be the fullname of a previously-defined named
				// type. The spec wants definitions to always precede their
				// uses, but we resolve lazily to support unordered (and
				// forward/cross-document, via the cache) references too.
				let name_key = if let Some((namespace, name)) = reference.rsplit_once('.') {
					NameKey {
						namespace: Some(namespace).filter(|s| !s.is_empty()),
						name,
					}
				} else {
					NameKey {
						namespace: enclosing_namespace,
						name: reference,
					}
				};
				match self.names.get(&name_key) {
					Some(&idx) => SchemaKey::from_idx(idx),
					None => {
						let idx = self.unresolved_names.len();
						self.unresolved_names.push(name_key);
						SchemaKey::from_idx(idx | LATE_NAME_LOOKUP_REMAP_BIT)
					}
				}
			}
		})
	}
}

#[derive(PartialEq, Eq, Hash, Clone, Copy)]
struct NameKey<'a> {
	namespace: Option<&'a str>,
	name: &'a str,
}
impl NameKey<'_> {
	fn name(&self) -> Name {
		match self.namespace {
			None => Name::from_fully_qualified_name(self.name.to_owned()),
			Some(namespace) => Name::from_fully_qualified_name(format!("{namespace}.{}", self.name)),
		}
	}
}
impl std::fmt::Display for NameKey<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self.namespace {
			None => self.name.fmt(f),
			Some(namespace) => write!(f, "{namespace}.{}", self.name),
		}
	}
}
