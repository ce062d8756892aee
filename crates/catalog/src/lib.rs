//! TOML-backed type catalogs.
//!
//! A [`Catalog`] is a [`TypeProvider`] whose classes and named parameters are
//! declared in a TOML file instead of compiled code. Every catalog constructor
//! builds a [`Record`] holding its arguments, which makes catalogs useful for
//! inspecting how an object graph would be wired before any real factory
//! exists.

mod record;
mod schema;


use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashSet;
use thiserror::Error;
use tracing::debug;
use wiring::{
	BindError, ClassDescriptor, Configuration, ConfigurationBuilder, ConstructorArg, Entry,
	ParameterDescriptor, RegistrationError, StaticTypeProvider, TypeDescriptor, TypeProvider,
};

pub use record::Record;
pub use schema::{ArgEntry, BindSection, CatalogFile, ClassEntry, ConstructorEntry, ParameterEntry};

use record::{producer_factory, record_factory};

#[derive(Debug, Error)]
pub enum CatalogError {
	#[error("failed to read catalog {path}: {source}", path = path.display())]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
	#[error("failed to parse catalog: {0}")]
	Parse(#[from] toml::de::Error),
	#[error("type {name:?} is declared more than once")]
	Duplicate { name: String },
	#[error("parameter {name:?} declares both a literal and a type default")]
	ConflictingDefaults { name: String },
	#[error("class {name:?} declares `produces` but is not an external constructor")]
	ProducesWithoutExternal { name: String },
	#[error(transparent)]
	Registration(#[from] RegistrationError),
	#[error(transparent)]
	Bind(#[from] BindError),
}

pub type Result<T> = std::result::Result<T, CatalogError>;

/// Validated catalog contents.
#[derive(Debug, Clone)]
pub struct Catalog {
	types: StaticTypeProvider,
	names: Vec<String>,
	bind: BindSection,
}

impl Catalog {
	pub fn from_toml_str(content: &str) -> Result<Self> {
		let file: CatalogFile = toml::from_str(content)?;
		Self::from_file(file)
	}

	pub fn load(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
			path: path.to_path_buf(),
			source,
		})?;
		let catalog = Self::from_toml_str(&content)?;
		debug!(path = %path.display(), types = catalog.names.len(), "loaded catalog");
		Ok(catalog)
	}

	pub fn from_file(file: CatalogFile) -> Result<Self> {
		let mut seen = FxHashSet::default();
		let mut names = Vec::with_capacity(file.classes.len() + file.parameters.len());
		let mut types = StaticTypeProvider::new();

		for class in file.classes {
			if !seen.insert(class.name.clone()) {
				return Err(CatalogError::Duplicate { name: class.name });
			}
			names.push(class.name.clone());
			types.insert(TypeDescriptor::Class(class_descriptor(class)?));
		}
		for param in file.parameters {
			if !seen.insert(param.name.clone()) {
				return Err(CatalogError::Duplicate { name: param.name });
			}
			names.push(param.name.clone());
			types.insert(TypeDescriptor::NamedParameter(parameter_descriptor(param)?));
		}

		Ok(Self {
			types,
			names,
			bind: file.bind,
		})
	}

	/// Declared type names, in file order (classes first).
	pub fn names(&self) -> &[String] {
		&self.names
	}

	pub fn bindings(&self) -> &BindSection {
		&self.bind
	}

	/// Applies the `[bind]` section to `builder`.
	pub fn configure(&self, builder: &mut ConfigurationBuilder) -> std::result::Result<(), BindError> {
		let bind = &self.bind;
		if bind.is_empty() {
			return Ok(());
		}
		for (iface, imp) in &bind.implementations {
			builder.bind_implementation(iface, imp)?;
		}
		for (class, ctor) in &bind.constructors {
			builder.bind_constructor(class, ctor)?;
		}
		for class in &bind.singletons {
			builder.bind_singleton(class)?;
		}
		for (param, literal) in &bind.parameters {
			builder.bind_named_parameter(param, literal)?;
		}
		for (param, members) in &bind.sets {
			for member in members {
				builder.bind_set_entry(param, Entry::literal(member.as_str()))?;
			}
		}
		for (param, elements) in &bind.lists {
			builder.bind_list(param, elements.iter().map(String::as_str))?;
		}
		Ok(())
	}

	/// Builder with every declared type registered and the bindings applied.
	///
	/// References to types outside the catalog stay unresolved; see
	/// [`ClassHierarchy::find_unresolved_references`](wiring::ClassHierarchy::find_unresolved_references).
	pub fn builder(&self) -> Result<ConfigurationBuilder> {
		let mut builder = ConfigurationBuilder::new(Arc::new(self.clone()));
		for name in &self.names {
			builder.register(name)?;
		}
		let added = builder.hierarchy_mut().register_unresolved()?;
		self.configure(&mut builder)?;
		debug!(
			declared = self.names.len(),
			referenced = added,
			"registered catalog"
		);
		Ok(builder)
	}

	pub fn configuration(&self) -> Result<Configuration> {
		Ok(self.builder()?.build())
	}

	/// Names referenced by declarations that the catalog does not declare.
	pub fn undeclared_references(&self) -> BTreeSet<String> {
		let declared: FxHashSet<&str> = self.names.iter().map(String::as_str).collect();
		let mut out = BTreeSet::new();
		for name in &self.names {
			let Some(descriptor) = self.types.describe(name) else {
				continue;
			};
			for referenced in references(&descriptor) {
				if !declared.contains(referenced.as_str())
					&& !wiring::types::is_primitive(&referenced)
					&& referenced != wiring::INJECTOR_TYPE
				{
					out.insert(referenced);
				}
			}
		}
		out
	}
}

impl TypeProvider for Catalog {
	fn describe(&self, name: &str) -> Option<TypeDescriptor> {
		self.types.describe(name)
	}
}

fn references(descriptor: &TypeDescriptor) -> Vec<String> {
	match descriptor {
		TypeDescriptor::Class(class) => {
			let mut out: Vec<String> = class.superclass.iter().chain(&class.interfaces).cloned().collect();
			out.extend(class.default_implementation.iter().cloned());
			for ctor in &class.constructors {
				for arg in &ctor.args {
					out.push(arg.target().to_string());
					if arg.parameter().is_some() {
						out.push(arg.arg_type().to_string());
					}
				}
			}
			out
		}
		TypeDescriptor::NamedParameter(param) => {
			let mut out = vec![param.arg_type.clone()];
			if let Some(wiring::types::DefaultValue::Type(name)) = &param.default {
				out.push(name.clone());
			}
			out
		}
	}
}

fn class_descriptor(entry: ClassEntry) -> Result<ClassDescriptor> {
	if entry.produces.is_some() && !entry.external_constructor {
		return Err(CatalogError::ProducesWithoutExternal { name: entry.name });
	}
	let mut desc = ClassDescriptor::new(entry.name.as_str());
	if let Some(superclass) = entry.extends {
		desc = desc.extends(superclass);
	}
	for interface in entry.implements {
		desc = desc.implements(interface);
	}
	if let Some(default) = entry.default_implementation {
		desc = desc.default_implementation(default);
	}
	if let Some(namespace) = entry.namespace {
		desc = desc.namespace(namespace);
	}
	if entry.external_constructor {
		desc = desc.external_constructor();
	}

	let produces = entry.produces.unwrap_or_else(|| entry.name.clone());
	for ctor in entry.constructors {
		let names: Vec<String> = ctor.args.iter().map(|a| a.field_name().to_string()).collect();
		let args = ctor.args.into_iter().map(constructor_arg).collect();
		let factory = if entry.external_constructor {
			producer_factory(produces.clone(), names)
		} else {
			record_factory(entry.name.clone(), names)
		};
		desc = desc.constructor(args, factory);
	}
	Ok(desc)
}

fn constructor_arg(entry: ArgEntry) -> ConstructorArg {
	let arg = match entry.parameter {
		Some(parameter) => ConstructorArg::named(entry.arg_type, parameter),
		None => ConstructorArg::of_type(entry.arg_type),
	};
	if entry.deferred { arg.deferred() } else { arg }
}

fn parameter_descriptor(entry: ParameterEntry) -> Result<ParameterDescriptor> {
	let mut desc = ParameterDescriptor::new(entry.name.as_str(), entry.arg_type);
	desc = match (entry.default, entry.default_type) {
		(Some(_), Some(_)) => return Err(CatalogError::ConflictingDefaults { name: entry.name }),
		(Some(literal), None) => desc.default_literal(literal),
		(None, Some(name)) => desc.default_type(name),
		(None, None) => desc,
	};
	if let Some(short) = entry.short_name {
		desc = desc.short_name(short);
	}
	if let Some(doc) = entry.doc {
		desc = desc.documentation(doc);
	}
	Ok(desc)
}
