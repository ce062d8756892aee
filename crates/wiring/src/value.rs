//! Runtime values produced by parsing and construction.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::injector::InjectionFuture;

/// Boxed error returned by factories and custom parsers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A type-erased constructed object.
pub type Object = Arc<dyn Any + Send + Sync>;

/// A value handed to constructors or returned by the injector.
#[derive(Clone)]
pub enum Value {
	/// Boolean literal.
	Bool(bool),
	/// Any integer literal, widened.
	Int(i64),
	/// Any floating point literal, widened.
	Float(f64),
	/// Character literal.
	Char(char),
	/// String literal.
	String(String),
	/// Constructed object.
	Object(Object),
	/// Members of a bound set; order carries no meaning.
	Set(Vec<Value>),
	/// Elements of a bound list, in binding order.
	List(Vec<Value>),
	/// Lazy handle standing in for a self-referential dependency.
	Future(InjectionFuture),
}

impl Value {
	/// Wraps a constructed object.
	pub fn object<T: Any + Send + Sync>(value: T) -> Self {
		Value::Object(Arc::new(value))
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Value::Bool(v) => Some(*v),
			_ => None,
		}
	}

	pub fn as_int(&self) -> Option<i64> {
		match self {
			Value::Int(v) => Some(*v),
			_ => None,
		}
	}

	pub fn as_float(&self) -> Option<f64> {
		match self {
			Value::Float(v) => Some(*v),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::String(v) => Some(v),
			_ => None,
		}
	}

	/// Returns the members of a set value.
	pub fn as_set(&self) -> Option<&[Value]> {
		match self {
			Value::Set(v) => Some(v),
			_ => None,
		}
	}

	/// Returns the elements of a list value.
	pub fn as_list(&self) -> Option<&[Value]> {
		match self {
			Value::List(v) => Some(v),
			_ => None,
		}
	}

	pub fn as_future(&self) -> Option<&InjectionFuture> {
		match self {
			Value::Future(v) => Some(v),
			_ => None,
		}
	}

	/// Downcasts an object value to a concrete type.
	pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
		match self {
			Value::Object(obj) => Arc::clone(obj).downcast::<T>().ok(),
			_ => None,
		}
	}

	/// Returns true when both values are the same object allocation.
	pub fn same_instance(&self, other: &Value) -> bool {
		match (self, other) {
			(Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
			(Value::Future(a), Value::Future(b)) => a.ptr_eq(b),
			_ => false,
		}
	}

	/// Returns the type name of this value.
	pub fn type_name(&self) -> &'static str {
		match self {
			Value::Bool(_) => "bool",
			Value::Int(_) => "int",
			Value::Float(_) => "float",
			Value::Char(_) => "char",
			Value::String(_) => "string",
			Value::Object(_) => "object",
			Value::Set(_) => "set",
			Value::List(_) => "list",
			Value::Future(_) => "future",
		}
	}
}

/// Objects compare by identity, sets by membership, everything else by value.
impl PartialEq for Value {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Value::Bool(a), Value::Bool(b)) => a == b,
			(Value::Int(a), Value::Int(b)) => a == b,
			(Value::Float(a), Value::Float(b)) => a == b,
			(Value::Char(a), Value::Char(b)) => a == b,
			(Value::String(a), Value::String(b)) => a == b,
			(Value::Object(_), Value::Object(_)) | (Value::Future(_), Value::Future(_)) => {
				self.same_instance(other)
			}
			(Value::Set(a), Value::Set(b)) => {
				a.len() == b.len() && a.iter().all(|x| b.contains(x)) && b.iter().all(|x| a.contains(x))
			}
			(Value::List(a), Value::List(b)) => a == b,
			_ => false,
		}
	}
}

impl fmt::Debug for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Value::Bool(v) => write!(f, "{v}"),
			Value::Int(v) => write!(f, "{v}"),
			Value::Float(v) => write!(f, "{v:?}"),
			Value::Char(v) => write!(f, "{v:?}"),
			Value::String(v) => write!(f, "{v:?}"),
			Value::Object(obj) => write!(f, "Object@{:p}", Arc::as_ptr(obj) as *const ()),
			Value::Set(v) => f.debug_set().entries(v).finish(),
			Value::List(v) => f.debug_list().entries(v).finish(),
			Value::Future(v) => write!(f, "Future({})", v.name()),
		}
	}
}

impl From<bool> for Value {
	fn from(v: bool) -> Self {
		Value::Bool(v)
	}
}

impl From<i64> for Value {
	fn from(v: i64) -> Self {
		Value::Int(v)
	}
}

impl From<f64> for Value {
	fn from(v: f64) -> Self {
		Value::Float(v)
	}
}

impl From<String> for Value {
	fn from(v: String) -> Self {
		Value::String(v)
	}
}

impl From<&str> for Value {
	fn from(v: &str) -> Self {
		Value::String(v.to_string())
	}
}

/// A factory whose product is itself a producer of the requested value.
///
/// The injector calls [`ExternalConstructor::new_instance`] immediately after
/// the factory returns, so callers only ever observe the produced value.
pub trait ExternalConstructor: Send {
	fn new_instance(self: Box<Self>) -> Result<Value, BoxError>;
}

/// Output of a constructor factory.
pub enum Construct {
	/// The finished value.
	Value(Value),
	/// A producer that still has to be unwrapped.
	External(Box<dyn ExternalConstructor>),
}

impl From<Value> for Construct {
	fn from(v: Value) -> Self {
		Construct::Value(v)
	}
}

type FactoryFn = dyn Fn(Vec<Value>) -> Result<Construct, BoxError> + Send + Sync;

/// The callable behind a constructor, receiving arguments in declared order.
#[derive(Clone)]
pub struct Factory(Arc<FactoryFn>);

impl Factory {
	/// Creates a factory that may return either a value or an external constructor.
	pub fn new<F>(f: F) -> Self
	where
		F: Fn(Vec<Value>) -> Result<Construct, BoxError> + Send + Sync + 'static,
	{
		Self(Arc::new(f))
	}

	/// Creates a factory that always produces a finished value.
	pub fn value<F>(f: F) -> Self
	where
		F: Fn(Vec<Value>) -> Result<Value, BoxError> + Send + Sync + 'static,
	{
		Self(Arc::new(move |args| f(args).map(Construct::Value)))
	}

	/// Creates a factory producing an external constructor.
	pub fn external<F, E>(f: F) -> Self
	where
		F: Fn(Vec<Value>) -> Result<E, BoxError> + Send + Sync + 'static,
		E: ExternalConstructor + 'static,
	{
		Self(Arc::new(move |args| {
			f(args).map(|e| Construct::External(Box::new(e) as Box<dyn ExternalConstructor>))
		}))
	}

	pub fn call(&self, args: Vec<Value>) -> Result<Construct, BoxError> {
		(self.0)(args)
	}

	pub fn ptr_eq(&self, other: &Factory) -> bool {
		Arc::ptr_eq(&self.0, &other.0)
	}
}

impl fmt::Debug for Factory {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("Factory(..)")
	}
}
