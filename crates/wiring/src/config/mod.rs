//! Binding store.
//!
//! A [`ConfigurationBuilder`] records binding intents against its own copy of
//! the registry and freezes them into an immutable, cheaply clonable
//! [`Configuration`]. Every binding is keyed by [`NodeId`], so a configuration
//! only makes sense together with the registry it carries.
//!
//! # Invariants
//!
//! - A named parameter holds at most one of: a single value, a set, a list.
//! - Re-binding a node to a different value fails with both values reported;
//!   binding the identical value again is a no-op.
//! - Literal values are parse-checked when they are bound.


use std::fmt;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::error::BindError;
use crate::hierarchy::{ClassHierarchy, TypeProvider};
use crate::parser::{ParameterParser, ParseFn, ValueParser};
use crate::types::{NodeId, NodeKind, is_primitive};

/// A bound parameter value or set/list entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BoundValue {
	/// Literal handed to the value parser at plan-build time.
	Literal(Box<str>),
	/// A class to construct.
	Type(NodeId),
}

/// A set or list entry as supplied by the caller, before name resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
	Literal(String),
	Type(String),
}

impl Entry {
	pub fn literal(value: impl Into<String>) -> Self {
		Entry::Literal(value.into())
	}

	pub fn of_type(name: impl Into<String>) -> Self {
		Entry::Type(name.into())
	}
}

impl From<&str> for Entry {
	fn from(value: &str) -> Self {
		Entry::Literal(value.to_string())
	}
}

impl From<String> for Entry {
	fn from(value: String) -> Self {
		Entry::Literal(value)
	}
}

#[derive(Debug, Clone, Default)]
struct Bindings {
	implementations: FxHashMap<NodeId, NodeId>,
	constructors: FxHashMap<NodeId, NodeId>,
	singletons: FxHashSet<NodeId>,
	parameters: FxHashMap<NodeId, BoundValue>,
	sets: FxHashMap<NodeId, Vec<BoundValue>>,
	lists: FxHashMap<NodeId, Vec<BoundValue>>,
}

impl Bindings {
	/// Shape label of whatever `id` is already bound to.
	fn parameter_shape(&self, id: NodeId) -> Option<&'static str> {
		if self.parameters.contains_key(&id) {
			Some("value")
		} else if self.sets.contains_key(&id) {
			Some("set")
		} else if self.lists.contains_key(&id) {
			Some("list")
		} else {
			None
		}
	}
}

fn sorted<V>(map: &FxHashMap<NodeId, V>) -> Vec<(NodeId, &V)> {
	let mut out: Vec<_> = map.iter().map(|(k, v)| (*k, v)).collect();
	out.sort_unstable_by_key(|(k, _)| *k);
	out
}

fn describe(hierarchy: &ClassHierarchy, value: &BoundValue) -> String {
	match value {
		BoundValue::Literal(literal) => literal.to_string(),
		BoundValue::Type(id) => hierarchy.full_name(*id).to_string(),
	}
}

fn describe_all(hierarchy: &ClassHierarchy, values: &[BoundValue]) -> String {
	values
		.iter()
		.map(|v| describe(hierarchy, v))
		.collect::<Vec<_>>()
		.join(", ")
}

struct ConfigurationInner {
	hierarchy: ClassHierarchy,
	parser: ParameterParser,
	bindings: Bindings,
}

/// Frozen bindings plus the registry and parser they refer to.
#[derive(Clone)]
pub struct Configuration {
	inner: Arc<ConfigurationInner>,
}

impl fmt::Debug for Configuration {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let b = &self.inner.bindings;
		f.debug_struct("Configuration")
			.field("implementations", &b.implementations.len())
			.field("constructors", &b.constructors.len())
			.field("singletons", &b.singletons.len())
			.field("parameters", &b.parameters.len())
			.field("sets", &b.sets.len())
			.field("lists", &b.lists.len())
			.finish()
	}
}

impl Configuration {
	pub fn hierarchy(&self) -> &ClassHierarchy {
		&self.inner.hierarchy
	}

	pub fn parser(&self) -> &ParameterParser {
		&self.inner.parser
	}

	pub fn value_parser(&self) -> &dyn ValueParser {
		&self.inner.parser
	}

	pub fn bound_implementation(&self, id: NodeId) -> Option<NodeId> {
		self.inner.bindings.implementations.get(&id).copied()
	}

	pub fn bound_constructor(&self, id: NodeId) -> Option<NodeId> {
		self.inner.bindings.constructors.get(&id).copied()
	}

	pub fn is_singleton(&self, id: NodeId) -> bool {
		self.inner.bindings.singletons.contains(&id)
	}

	pub fn named_parameter(&self, id: NodeId) -> Option<&BoundValue> {
		self.inner.bindings.parameters.get(&id)
	}

	pub fn bound_set(&self, id: NodeId) -> Option<&[BoundValue]> {
		self.inner.bindings.sets.get(&id).map(Vec::as_slice)
	}

	pub fn bound_list(&self, id: NodeId) -> Option<&[BoundValue]> {
		self.inner.bindings.lists.get(&id).map(Vec::as_slice)
	}

	/// Renders a bound value using full names for type entries.
	pub fn describe(&self, value: &BoundValue) -> String {
		describe(&self.inner.hierarchy, value)
	}

	/// A builder seeded with a copy of this configuration's registry, parser and bindings.
	pub fn new_builder(&self) -> ConfigurationBuilder {
		ConfigurationBuilder {
			hierarchy: self.inner.hierarchy.clone(),
			parser: self.inner.parser.clone(),
			bindings: self.inner.bindings.clone(),
		}
	}
}

/// Records binding intents and freezes them into a [`Configuration`].
#[derive(Debug, Clone)]
pub struct ConfigurationBuilder {
	hierarchy: ClassHierarchy,
	parser: ParameterParser,
	bindings: Bindings,
}

impl ConfigurationBuilder {
	pub fn new(provider: Arc<dyn TypeProvider>) -> Self {
		Self::from_hierarchy(ClassHierarchy::new(provider))
	}

	pub fn from_hierarchy(hierarchy: ClassHierarchy) -> Self {
		Self {
			hierarchy,
			parser: ParameterParser::new(),
			bindings: Bindings::default(),
		}
	}

	pub fn hierarchy(&self) -> &ClassHierarchy {
		&self.hierarchy
	}

	pub fn hierarchy_mut(&mut self) -> &mut ClassHierarchy {
		&mut self.hierarchy
	}

	/// Registers `name` in the builder's registry.
	pub fn register(&mut self, name: &str) -> Result<NodeId, BindError> {
		Ok(self.hierarchy.register(name)?)
	}

	fn node_of_kind(&mut self, name: &str, expected: &'static str) -> Result<NodeId, BindError> {
		let id = self.register(name)?;
		let found = self.hierarchy.node(id).kind().label();
		if found != expected {
			return Err(BindError::WrongKind {
				name: name.to_string(),
				expected,
				found,
			});
		}
		Ok(id)
	}

	fn class_node(&mut self, name: &str) -> Result<NodeId, BindError> {
		self.node_of_kind(name, "class")
	}

	fn parameter_node(&mut self, name: &str) -> Result<NodeId, BindError> {
		self.node_of_kind(name, "named parameter")
	}

	/// Binds `interface` to `implementation`, which must be the class itself or a known subtype.
	pub fn bind_implementation(
		&mut self,
		interface: &str,
		implementation: &str,
	) -> Result<&mut Self, BindError> {
		let iface = self.class_node(interface)?;
		let imp = self.class_node(implementation)?;
		if !self.hierarchy.is_implementation(iface, imp) {
			return Err(BindError::NotASubtype {
				interface: interface.to_string(),
				implementation: implementation.to_string(),
			});
		}
		self.insert_unique(iface, imp, |b| &mut b.implementations)?;
		debug!(interface, implementation, "bound implementation");
		Ok(self)
	}

	/// Binds `class` to an external-constructor class that produces its instances.
	pub fn bind_constructor(&mut self, class: &str, constructor: &str) -> Result<&mut Self, BindError> {
		let target = self.class_node(class)?;
		let ctor = self.class_node(constructor)?;
		if !self
			.hierarchy
			.class(ctor)
			.is_some_and(|c| c.is_external_constructor())
		{
			return Err(BindError::NotExternalConstructor {
				name: constructor.to_string(),
			});
		}
		self.insert_unique(target, ctor, |b| &mut b.constructors)?;
		debug!(class, constructor, "bound constructor");
		Ok(self)
	}

	fn insert_unique(
		&mut self,
		key: NodeId,
		value: NodeId,
		map: impl FnOnce(&mut Bindings) -> &mut FxHashMap<NodeId, NodeId>,
	) -> Result<(), BindError> {
		let hierarchy = &self.hierarchy;
		let map = map(&mut self.bindings);
		match map.get(&key) {
			Some(&old) if old != value => Err(BindError::Rebind {
				name: hierarchy.full_name(key).to_string(),
				old: hierarchy.full_name(old).to_string(),
				new: hierarchy.full_name(value).to_string(),
			}),
			_ => {
				map.insert(key, value);
				Ok(())
			}
		}
	}

	/// Declares `class` a singleton. Declaring it twice is a rebinding error.
	pub fn bind_singleton(&mut self, class: &str) -> Result<&mut Self, BindError> {
		let id = self.class_node(class)?;
		if !self.bindings.singletons.insert(id) {
			return Err(BindError::Rebind {
				name: class.to_string(),
				old: "singleton".into(),
				new: "singleton".into(),
			});
		}
		debug!(class, "bound singleton");
		Ok(self)
	}

	/// Registers a custom literal parser for `type_name`.
	pub fn bind_parser(&mut self, type_name: &str, parser: ParseFn) -> Result<&mut Self, BindError> {
		self.parser.add_parser(type_name, parser)?;
		Ok(self)
	}

	/// Converts a caller-supplied literal into a bound value for parameter `id`.
	///
	/// Literals for parseable types are checked now. For class-typed
	/// parameters the literal names the implementation to construct.
	fn literal_value(&mut self, id: NodeId, literal: &str) -> Result<BoundValue, BindError> {
		let (name, arg_type) = {
			let node = self.hierarchy.node(id);
			let arg_type = node.as_parameter().map(|p| p.arg_type().to_string()).unwrap_or_default();
			(node.full_name().to_string(), arg_type)
		};
		if self.parser.can_parse(&arg_type) {
			self.parser.parse(&name, &arg_type, literal)?;
			return Ok(BoundValue::Literal(literal.into()));
		}
		self.type_value(id, literal)
	}

	/// Resolves `type_name` as a value for parameter `id`, checking it is assignable.
	fn type_value(&mut self, id: NodeId, type_name: &str) -> Result<BoundValue, BindError> {
		let target = self.class_node(type_name)?;
		let arg_type = self
			.hierarchy
			.parameter(id)
			.map(|p| p.arg_type().to_string())
			.unwrap_or_default();
		if !is_primitive(&arg_type) && self.hierarchy.provider().describe(&arg_type).is_some() {
			let declared = self.register(&arg_type)?;
			if matches!(self.hierarchy.node(declared).kind(), NodeKind::Class(_))
				&& !self.hierarchy.is_implementation(declared, target)
			{
				return Err(BindError::NotASubtype {
					interface: arg_type,
					implementation: type_name.to_string(),
				});
			}
		}
		Ok(BoundValue::Type(target))
	}

	fn check_shape(&self, id: NodeId, requested: &'static str) -> Result<(), BindError> {
		match self.bindings.parameter_shape(id) {
			Some(existing) if existing != requested => Err(BindError::ParameterShape {
				name: self.hierarchy.full_name(id).to_string(),
				existing,
				requested,
			}),
			_ => Ok(()),
		}
	}

	fn insert_parameter(&mut self, id: NodeId, value: BoundValue) -> Result<(), BindError> {
		self.check_shape(id, "value")?;
		match self.bindings.parameters.get(&id) {
			Some(old) if *old != value => Err(BindError::Rebind {
				name: self.hierarchy.full_name(id).to_string(),
				old: describe(&self.hierarchy, old),
				new: describe(&self.hierarchy, &value),
			}),
			_ => {
				debug!(parameter = self.hierarchy.full_name(id), value = %describe(&self.hierarchy, &value), "bound named parameter");
				self.bindings.parameters.insert(id, value);
				Ok(())
			}
		}
	}

	fn insert_set_entry(&mut self, id: NodeId, value: BoundValue) -> Result<(), BindError> {
		self.check_shape(id, "set")?;
		let entries = self.bindings.sets.entry(id).or_default();
		if !entries.contains(&value) {
			entries.push(value);
		}
		Ok(())
	}

	fn insert_list(&mut self, id: NodeId, values: Vec<BoundValue>) -> Result<(), BindError> {
		self.check_shape(id, "list")?;
		match self.bindings.lists.get(&id) {
			Some(old) if *old != values => Err(BindError::Rebind {
				name: self.hierarchy.full_name(id).to_string(),
				old: describe_all(&self.hierarchy, old),
				new: describe_all(&self.hierarchy, &values),
			}),
			_ => {
				self.bindings.lists.insert(id, values);
				Ok(())
			}
		}
	}

	fn entry_value(&mut self, id: NodeId, entry: &Entry) -> Result<BoundValue, BindError> {
		match entry {
			Entry::Literal(literal) => self.literal_value(id, literal),
			Entry::Type(name) => self.type_value(id, name),
		}
	}

	/// Binds a named parameter to a literal (or, for class-typed parameters, a class name).
	pub fn bind_named_parameter(&mut self, name: &str, literal: &str) -> Result<&mut Self, BindError> {
		let id = self.parameter_node(name)?;
		let value = self.literal_value(id, literal)?;
		self.insert_parameter(id, value)?;
		Ok(self)
	}

	/// Binds a named parameter to a class that is constructed on demand.
	pub fn bind_named_parameter_type(
		&mut self,
		name: &str,
		type_name: &str,
	) -> Result<&mut Self, BindError> {
		let id = self.parameter_node(name)?;
		let value = self.type_value(id, type_name)?;
		self.insert_parameter(id, value)?;
		Ok(self)
	}

	/// Adds one entry to a set-valued named parameter. Duplicate entries collapse.
	pub fn bind_set_entry(&mut self, name: &str, entry: impl Into<Entry>) -> Result<&mut Self, BindError> {
		let id = self.parameter_node(name)?;
		let value = self.entry_value(id, &entry.into())?;
		self.insert_set_entry(id, value)?;
		debug!(parameter = name, "bound set entry");
		Ok(self)
	}

	/// Binds a list-valued named parameter. Order and duplicates are preserved.
	pub fn bind_list<I, E>(&mut self, name: &str, entries: I) -> Result<&mut Self, BindError>
	where
		I: IntoIterator<Item = E>,
		E: Into<Entry>,
	{
		let id = self.parameter_node(name)?;
		let values = entries
			.into_iter()
			.map(|e| self.entry_value(id, &e.into()))
			.collect::<Result<Vec<_>, _>>()?;
		let len = values.len();
		self.insert_list(id, values)?;
		debug!(parameter = name, len, "bound list");
		Ok(self)
	}

	fn translate(&mut self, from: &ClassHierarchy, value: &BoundValue) -> Result<BoundValue, BindError> {
		Ok(match value {
			BoundValue::Literal(literal) => BoundValue::Literal(literal.clone()),
			BoundValue::Type(id) => BoundValue::Type(self.class_node(from.full_name(*id))?),
		})
	}

	/// Merges every binding of `other` into this builder, by full name.
	///
	/// Identical bindings merge silently; conflicting ones fail as they would
	/// if bound directly. Singleton declarations merge idempotently.
	pub fn add_configuration(&mut self, other: &Configuration) -> Result<&mut Self, BindError> {
		let from = other.hierarchy();
		let theirs = &other.inner.bindings;
		self.parser.merge(other.parser())?;

		for (iface, &imp) in sorted(&theirs.implementations) {
			self.bind_implementation(from.full_name(iface), from.full_name(imp))?;
		}
		for (class, &ctor) in sorted(&theirs.constructors) {
			self.bind_constructor(from.full_name(class), from.full_name(ctor))?;
		}
		let mut singletons: Vec<_> = theirs.singletons.iter().copied().collect();
		singletons.sort_unstable();
		for class in singletons {
			let id = self.class_node(from.full_name(class))?;
			self.bindings.singletons.insert(id);
		}
		for (param, value) in sorted(&theirs.parameters) {
			let id = self.parameter_node(from.full_name(param))?;
			let value = self.translate(from, value)?;
			self.insert_parameter(id, value)?;
		}
		for (param, entries) in sorted(&theirs.sets) {
			let id = self.parameter_node(from.full_name(param))?;
			for entry in entries {
				let value = self.translate(from, entry)?;
				self.insert_set_entry(id, value)?;
			}
		}
		for (param, entries) in sorted(&theirs.lists) {
			let id = self.parameter_node(from.full_name(param))?;
			let values = entries
				.iter()
				.map(|e| self.translate(from, e))
				.collect::<Result<Vec<_>, _>>()?;
			self.insert_list(id, values)?;
		}
		debug!(?other, "merged configuration");
		Ok(self)
	}

	pub fn build(self) -> Configuration {
		Configuration {
			inner: Arc::new(ConfigurationInner {
				hierarchy: self.hierarchy,
				parser: self.parser,
				bindings: self.bindings,
			}),
		}
	}
}
