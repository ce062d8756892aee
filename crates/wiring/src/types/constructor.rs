use std::fmt;

use crate::error::RegistrationError;
use crate::value::Factory;

/// One argument of an injectable constructor.
///
/// The signature of an argument is its `(arg_type, parameter)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConstructorArg {
	arg_type: Box<str>,
	parameter: Option<Box<str>>,
	deferred: bool,
}

impl ConstructorArg {
	/// An argument injected by type.
	pub fn of_type(arg_type: impl Into<String>) -> Self {
		Self {
			arg_type: arg_type.into().into_boxed_str(),
			parameter: None,
			deferred: false,
		}
	}

	/// An argument injected from a named parameter.
	pub fn named(arg_type: impl Into<String>, parameter: impl Into<String>) -> Self {
		Self {
			arg_type: arg_type.into().into_boxed_str(),
			parameter: Some(parameter.into().into_boxed_str()),
			deferred: false,
		}
	}

	/// Marks the argument as a lazy self-reference.
	pub fn deferred(mut self) -> Self {
		self.deferred = true;
		self
	}

	pub fn arg_type(&self) -> &str {
		&self.arg_type
	}

	pub fn parameter(&self) -> Option<&str> {
		self.parameter.as_deref()
	}

	pub fn is_deferred(&self) -> bool {
		self.deferred
	}

	/// Name of the registry node this argument resolves against.
	pub fn target(&self) -> &str {
		self.parameter.as_deref().unwrap_or(&self.arg_type)
	}

	/// True if both arguments share the same `(type, parameter)` signature.
	pub fn same_signature(&self, other: &ConstructorArg) -> bool {
		self.arg_type == other.arg_type && self.parameter == other.parameter
	}
}

impl fmt::Display for ConstructorArg {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.parameter {
			Some(p) => write!(f, "{} @{}", self.arg_type, p)?,
			None => write!(f, "{}", self.arg_type)?,
		}
		if self.deferred {
			f.write_str(" (deferred)")?;
		}
		Ok(())
	}
}

/// An injectable constructor: ordered arguments plus the factory that runs it.
#[derive(Clone)]
pub struct ConstructorDef {
	class: Box<str>,
	args: Vec<ConstructorArg>,
	factory: Factory,
}

impl ConstructorDef {
	/// Creates a constructor definition, rejecting repeated argument signatures.
	pub fn new(
		class: impl Into<String>,
		args: Vec<ConstructorArg>,
		factory: Factory,
	) -> Result<Self, RegistrationError> {
		let class = class.into();
		for (i, a) in args.iter().enumerate() {
			if args[i + 1..].iter().any(|b| a.same_signature(b)) {
				return Err(RegistrationError::RepeatedArgument {
					class,
					argument: a.to_string(),
				});
			}
		}
		Ok(Self {
			class: class.into_boxed_str(),
			args,
			factory,
		})
	}

	/// Full name of the declaring class.
	pub fn class_name(&self) -> &str {
		&self.class
	}

	pub fn args(&self) -> &[ConstructorArg] {
		&self.args
	}

	pub fn factory(&self) -> &Factory {
		&self.factory
	}

	fn contains_signature(&self, arg: &ConstructorArg) -> bool {
		self.args.iter().any(|a| a.same_signature(arg))
	}

	/// True if both constructors take the same set of argument signatures,
	/// regardless of order.
	pub fn same_signature_set(&self, other: &ConstructorDef) -> bool {
		self.args.len() == other.args.len() && self.args.iter().all(|a| other.contains_signature(a))
	}

	/// Strict dominance: every argument of `other` appears in `self`, and
	/// `self` takes strictly more arguments.
	pub fn is_more_specific_than(&self, other: &ConstructorDef) -> bool {
		self.args.len() > other.args.len() && other.args.iter().all(|a| self.contains_signature(a))
	}
}

/// Compares declaring class and argument list; the factory is not compared.
impl PartialEq for ConstructorDef {
	fn eq(&self, other: &Self) -> bool {
		self.class == other.class && self.args == other.args
	}
}

impl fmt::Debug for ConstructorDef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ConstructorDef")
			.field("class", &self.class)
			.field("args", &self.args)
			.finish_non_exhaustive()
	}
}

impl fmt::Display for ConstructorDef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("(")?;
		for (i, arg) in self.args.iter().enumerate() {
			if i > 0 {
				f.write_str(", ")?;
			}
			write!(f, "{arg}")?;
		}
		f.write_str(")")
	}
}
