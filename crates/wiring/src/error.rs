//! Error taxonomy for registration, binding, parsing and injection.
//!
//! Every failure is surfaced to the caller; nothing here is retried
//! internally.

use crate::value::BoxError;

/// A dotted name could not be resolved against the registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot resolve {name:?}: longest resolvable prefix is {prefix:?}")]
pub struct NameResolutionError {
	/// The full name that was requested.
	pub name: String,
	/// The longest prefix of `name` that did resolve (empty for the root).
	pub prefix: String,
}

/// Fatal conflicts detected while registering nodes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
	/// The type provider has no description for the name.
	#[error("unknown type {name:?}: no descriptor available")]
	UnknownType { name: String },

	/// The name is empty or has an empty path segment.
	#[error("invalid node name {name:?}")]
	InvalidName { name: String },

	/// A node with this name already exists under the same parent.
	#[error("duplicate node {name:?}: already registered as {existing}")]
	DuplicateName { name: String, existing: &'static str },

	/// A namespace path collides with a package/class, or the reverse.
	#[error("{name:?} overlaps an existing {existing}: namespaces and packages cannot overlap")]
	NamespaceOverlap { name: String, existing: &'static str },

	/// A namespace node may only ever target one class.
	#[error("namespace {namespace:?} already targets {existing:?}, cannot retarget to {new:?}")]
	NamespaceTargetConflict {
		namespace: String,
		existing: String,
		new: String,
	},

	/// A node was declared inside a node kind that cannot contain it.
	#[error("cannot register {name:?} inside {parent:?}, which is a {parent_kind}")]
	InvalidParent {
		name: String,
		parent: String,
		parent_kind: &'static str,
	},

	/// Two arguments of one constructor share a (type, parameter) signature.
	#[error("repeated constructor argument {argument} in {class:?}")]
	RepeatedArgument { class: String, argument: String },

	/// Two constructors of one class differ only by argument order.
	#[error("ambiguous constructors in {class:?}: {first} and {second} differ only by argument order")]
	DuplicateConstructor {
		class: String,
		first: String,
		second: String,
	},

	/// Two named parameters claimed the same short name.
	#[error("short name {short_name:?} claimed by both {existing:?} and {new:?}")]
	ShortNameConflict {
		short_name: String,
		existing: String,
		new: String,
	},

	/// A declared supertype, interface or namespace target is not a class.
	#[error("{name:?} declares {related:?} as {role}, but it is a {kind}")]
	NotAClass {
		name: String,
		related: String,
		role: &'static str,
		kind: &'static str,
	},

	/// The supertype/enclosing declarations loop back onto a type being registered.
	#[error("cyclic type declaration through {name:?}")]
	CyclicDeclaration { name: String },

	#[error(transparent)]
	NameResolution(#[from] NameResolutionError),
}

/// Literal values that could not be turned into typed values.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
	/// No builtin or custom parser handles the argument type.
	#[error("no parser for type {type_name:?} (parameter {parameter:?})")]
	Unsupported { parameter: String, type_name: String },

	/// The literal is malformed for its argument type.
	#[error("cannot parse {literal:?} as {type_name} for {parameter:?}: {reason}")]
	Malformed {
		parameter: String,
		type_name: String,
		literal: String,
		reason: String,
	},

	/// A custom parser rejected the literal.
	#[error("custom parser for {type_name:?} rejected {literal:?}")]
	Custom {
		type_name: String,
		literal: String,
		#[source]
		source: BoxError,
	},
}

/// Errors raised while recording bindings.
#[derive(Debug, thiserror::Error)]
pub enum BindError {
	/// A binding for this node already exists with a different value.
	#[error("attempt to re-bind {name:?}: old value was [{old}], new value is [{new}]")]
	Rebind { name: String, old: String, new: String },

	/// A named parameter already holds a value of a different shape.
	#[error("named parameter {name:?} is already bound as a {existing}, cannot bind a {requested}")]
	ParameterShape {
		name: String,
		existing: &'static str,
		requested: &'static str,
	},

	/// The node is not the kind the binding requires.
	#[error("expected {expected} for {name:?}, found {found}")]
	WrongKind {
		name: String,
		expected: &'static str,
		found: &'static str,
	},

	/// The implementation is not a known subtype of the interface.
	#[error("{implementation:?} is not a known implementation of {interface:?}")]
	NotASubtype {
		interface: String,
		implementation: String,
	},

	/// Constructor bindings must target external-constructor classes.
	#[error("{name:?} is not an external constructor")]
	NotExternalConstructor { name: String },

	/// Two different custom parsers for one type.
	#[error("conflicting parsers registered for type {type_name:?}")]
	ParserConflict { type_name: String },

	/// The engine already carries an aspect.
	#[error("attempt to re-bind aspect")]
	AspectAlreadyBound,

	/// Bindings were attempted from inside an injected constructor.
	#[error("detected attempt to use the injector from within an injected constructor")]
	Reentrant,

	#[error(transparent)]
	Parse(#[from] ParseError),

	#[error(transparent)]
	Registration(#[from] RegistrationError),

	#[error(transparent)]
	NameResolution(#[from] NameResolutionError),
}

/// Errors raised while building or executing injection plans.
#[derive(Debug, thiserror::Error)]
pub enum InjectionError {
	/// Plan construction re-entered a node it was still building.
	#[error("detected loopy constructor involving [ {} ]", .nodes.join(" "))]
	Cycle { nodes: Vec<String> },

	/// The plan has no viable alternative.
	#[error("cannot inject {name}: {reason}")]
	Infeasible { name: String, reason: String },

	/// The plan has more than one viable alternative.
	#[error("cannot inject {name}: {reason}")]
	Ambiguous { name: String, reason: String },

	/// Packages and namespaces cannot be instantiated.
	#[error("request to instantiate {name:?}, which is a {kind}")]
	NotInjectable { name: String, kind: &'static str },

	/// The underlying factory failed.
	#[error("could not invoke constructor of {class}")]
	Construction {
		class: String,
		#[source]
		source: BoxError,
	},

	/// A singleton was materialized while an instance was already cached.
	#[error("repeated injection of singleton {name:?}")]
	RepeatedInjection { name: String },

	/// A request re-entered the engine from inside a constructor call.
	#[error("detected attempt to use the injector from within an injected constructor")]
	Reentrant,

	/// A subplan reached execution without a single selectable alternative.
	#[error("no unique alternative selected for {name}")]
	InvalidSelection { name: String },

	/// A deferred handle outlived the engine that created it.
	#[error("deferred reference to {name:?} outlived its injector")]
	InjectorDropped { name: String },

	#[error(transparent)]
	Parse(#[from] ParseError),

	#[error(transparent)]
	NameResolution(#[from] NameResolutionError),
}

pub type Result<T, E = InjectionError> = std::result::Result<T, E>;
