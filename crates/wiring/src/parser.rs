//! Literal parsing for named parameter values.
//!
//! Builtin parsers cover the primitive types listed in
//! [`crate::types::PRIMITIVE_TYPES`]. Custom parsers registered per type name
//! take precedence over builtins.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::{BindError, ParseError};
use crate::value::{BoxError, Value};

/// A custom parser turning a literal into a value of one type.
pub type ParseFn = Arc<dyn Fn(&str) -> Result<Value, BoxError> + Send + Sync>;

/// Converts literal strings into typed values.
pub trait ValueParser: Send + Sync {
	/// Parses `literal` as `arg_type` for the parameter named `parameter`.
	fn parse(&self, parameter: &str, arg_type: &str, literal: &str) -> Result<Value, ParseError>;
}

/// Builtin primitive parsers plus per-type custom parsers.
#[derive(Clone, Default)]
pub struct ParameterParser {
	custom: FxHashMap<Box<str>, ParseFn>,
}

impl fmt::Debug for ParameterParser {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut types: Vec<&str> = self.custom.keys().map(|k| &**k).collect();
		types.sort_unstable();
		f.debug_struct("ParameterParser").field("custom", &types).finish()
	}
}

impl ParameterParser {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a custom parser for `type_name`.
	///
	/// Registering the same parser twice is a no-op; a different parser for a
	/// type that already has one is a conflict.
	pub fn add_parser(&mut self, type_name: &str, parser: ParseFn) -> Result<(), BindError> {
		match self.custom.get(type_name) {
			Some(existing) if Arc::ptr_eq(existing, &parser) => Ok(()),
			Some(_) => Err(BindError::ParserConflict {
				type_name: type_name.to_string(),
			}),
			None => {
				self.custom.insert(type_name.into(), parser);
				Ok(())
			}
		}
	}

	/// Adds every custom parser of `other`.
	pub fn merge(&mut self, other: &ParameterParser) -> Result<(), BindError> {
		for (type_name, parser) in &other.custom {
			self.add_parser(type_name, Arc::clone(parser))?;
		}
		Ok(())
	}

	/// True if a builtin or custom parser handles `arg_type`.
	pub fn can_parse(&self, arg_type: &str) -> bool {
		self.custom.contains_key(arg_type) || crate::types::is_primitive(arg_type)
	}
}

impl ValueParser for ParameterParser {
	fn parse(&self, parameter: &str, arg_type: &str, literal: &str) -> Result<Value, ParseError> {
		if let Some(custom) = self.custom.get(arg_type) {
			return custom(literal).map_err(|source| ParseError::Custom {
				type_name: arg_type.to_string(),
				literal: literal.to_string(),
				source,
			});
		}
		parse_builtin(arg_type, literal).map_err(|reason| match reason {
			None => ParseError::Unsupported {
				parameter: parameter.to_string(),
				type_name: arg_type.to_string(),
			},
			Some(reason) => ParseError::Malformed {
				parameter: parameter.to_string(),
				type_name: arg_type.to_string(),
				literal: literal.to_string(),
				reason,
			},
		})
	}
}

fn int<T>(literal: &str) -> Result<Value, Option<String>>
where
	T: std::str::FromStr + TryInto<i64>,
	T::Err: fmt::Display,
{
	let parsed = literal.trim().parse::<T>().map_err(|e| Some(e.to_string()))?;
	parsed
		.try_into()
		.map(Value::Int)
		.map_err(|_| Some("out of range for a 64-bit integer".to_string()))
}

/// `Err(None)` means the type has no builtin parser.
fn parse_builtin(arg_type: &str, literal: &str) -> Result<Value, Option<String>> {
	match arg_type {
		"bool" => parse_bool(literal).map(Value::Bool).map_err(Some),
		"i8" => int::<i8>(literal),
		"i16" => int::<i16>(literal),
		"i32" => int::<i32>(literal),
		"i64" => int::<i64>(literal),
		"isize" => int::<isize>(literal),
		"u8" => int::<u8>(literal),
		"u16" => int::<u16>(literal),
		"u32" => int::<u32>(literal),
		"u64" => int::<u64>(literal),
		"usize" => int::<usize>(literal),
		"f32" => literal
			.trim()
			.parse::<f32>()
			.map(|v| Value::Float(v.into()))
			.map_err(|e| Some(e.to_string())),
		"f64" => literal
			.trim()
			.parse::<f64>()
			.map(Value::Float)
			.map_err(|e| Some(e.to_string())),
		"char" => {
			let mut chars = literal.chars();
			match (chars.next(), chars.next()) {
				(Some(c), None) => Ok(Value::Char(c)),
				_ => Err(Some("expected exactly one character".to_string())),
			}
		}
		"String" | "str" => Ok(Value::String(literal.to_string())),
		_ => Err(None),
	}
}

/// Boolean literal accepted by the builtin `bool` parser. Case and
/// surrounding whitespace are ignored.
pub fn parse_bool(literal: &str) -> Result<bool, String> {
	let lowered = literal.trim().to_ascii_lowercase();
	if ["true", "yes", "on", "1"].contains(&lowered.as_str()) {
		Ok(true)
	} else if ["false", "no", "off", "0"].contains(&lowered.as_str()) {
		Ok(false)
	} else {
		Err(format!("{literal:?} is not a bool literal"))
	}
}
