//! Type introspection boundary.
//!
//! The registry never discovers types on its own. It asks a [`TypeProvider`]
//! to describe a dotted name and registers whatever comes back.

use rustc_hash::FxHashMap;

use crate::types::{ConstructorArg, DefaultValue};
use crate::value::Factory;

/// Supplies declarations for dotted type names.
pub trait TypeProvider: Send + Sync {
	/// Describes `name`, or returns `None` if the provider does not know it.
	fn describe(&self, name: &str) -> Option<TypeDescriptor>;
}

/// What a dotted name denotes.
#[derive(Debug, Clone)]
pub enum TypeDescriptor {
	Class(ClassDescriptor),
	NamedParameter(ParameterDescriptor),
}

impl TypeDescriptor {
	pub fn name(&self) -> &str {
		match self {
			TypeDescriptor::Class(c) => &c.name,
			TypeDescriptor::NamedParameter(p) => &p.name,
		}
	}
}

/// Declaration of a class or interface.
#[derive(Debug, Clone, Default)]
pub struct ClassDescriptor {
	pub name: String,
	pub superclass: Option<String>,
	pub interfaces: Vec<String>,
	pub constructors: Vec<ConstructorDescriptor>,
	pub default_implementation: Option<String>,
	/// Namespace path that aliases this class as a prefix.
	pub namespace: Option<String>,
	pub external_constructor: bool,
}

impl ClassDescriptor {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			..Self::default()
		}
	}

	pub fn extends(mut self, superclass: impl Into<String>) -> Self {
		self.superclass = Some(superclass.into());
		self
	}

	pub fn implements(mut self, interface: impl Into<String>) -> Self {
		self.interfaces.push(interface.into());
		self
	}

	pub fn constructor(mut self, args: Vec<ConstructorArg>, factory: Factory) -> Self {
		self.constructors.push(ConstructorDescriptor { args, factory });
		self
	}

	pub fn default_implementation(mut self, name: impl Into<String>) -> Self {
		self.default_implementation = Some(name.into());
		self
	}

	pub fn namespace(mut self, path: impl Into<String>) -> Self {
		self.namespace = Some(path.into());
		self
	}

	pub fn external_constructor(mut self) -> Self {
		self.external_constructor = true;
		self
	}
}

/// An injectable constructor before validation.
#[derive(Debug, Clone)]
pub struct ConstructorDescriptor {
	pub args: Vec<ConstructorArg>,
	pub factory: Factory,
}

/// Declaration of a named parameter.
#[derive(Debug, Clone)]
pub struct ParameterDescriptor {
	pub name: String,
	pub arg_type: String,
	pub default: Option<DefaultValue>,
	pub short_name: Option<String>,
	pub documentation: Option<String>,
}

impl ParameterDescriptor {
	pub fn new(name: impl Into<String>, arg_type: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			arg_type: arg_type.into(),
			default: None,
			short_name: None,
			documentation: None,
		}
	}

	pub fn default_literal(mut self, literal: impl Into<String>) -> Self {
		self.default = Some(DefaultValue::Literal(literal.into()));
		self
	}

	pub fn default_type(mut self, name: impl Into<String>) -> Self {
		self.default = Some(DefaultValue::Type(name.into()));
		self
	}

	pub fn short_name(mut self, short: impl Into<String>) -> Self {
		self.short_name = Some(short.into());
		self
	}

	pub fn documentation(mut self, doc: impl Into<String>) -> Self {
		self.documentation = Some(doc.into());
		self
	}
}

/// In-memory provider populated with explicit declarations.
#[derive(Debug, Clone, Default)]
pub struct StaticTypeProvider {
	types: FxHashMap<String, TypeDescriptor>,
}

impl StaticTypeProvider {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds or replaces a declaration.
	pub fn insert(&mut self, descriptor: TypeDescriptor) {
		self.types.insert(descriptor.name().to_string(), descriptor);
	}

	pub fn class(mut self, descriptor: ClassDescriptor) -> Self {
		self.insert(TypeDescriptor::Class(descriptor));
		self
	}

	pub fn parameter(mut self, descriptor: ParameterDescriptor) -> Self {
		self.insert(TypeDescriptor::NamedParameter(descriptor));
		self
	}

	/// Names of every declaration, sorted.
	pub fn names(&self) -> Vec<&str> {
		let mut names: Vec<_> = self.types.keys().map(String::as_str).collect();
		names.sort_unstable();
		names
	}
}

impl TypeProvider for StaticTypeProvider {
	fn describe(&self, name: &str) -> Option<TypeDescriptor> {
		self.types.get(name).cloned()
	}
}
