use wiring::{BoxError, ExternalConstructor, Factory, Value};

/// Generic object built by catalog constructors.
///
/// Arguments are kept in declared order, keyed by parameter name (or by type
/// name for plain class arguments).
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
	class: String,
	fields: Vec<(String, Value)>,
}

impl Record {
	fn new(class: &str, names: &[String], args: Vec<Value>) -> Self {
		Self {
			class: class.to_string(),
			fields: names.iter().cloned().zip(args).collect(),
		}
	}

	pub fn class(&self) -> &str {
		&self.class
	}

	pub fn fields(&self) -> &[(String, Value)] {
		&self.fields
	}

	/// First field recorded under `name`.
	pub fn field(&self, name: &str) -> Option<&Value> {
		self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
	}
}

/// Defers record creation until the engine unwraps it.
struct Producer(Record);

impl ExternalConstructor for Producer {
	fn new_instance(self: Box<Self>) -> Result<Value, BoxError> {
		Ok(Value::object(self.0))
	}
}

pub(crate) fn record_factory(class: String, names: Vec<String>) -> Factory {
	Factory::value(move |args| Ok(Value::object(Record::new(&class, &names, args))))
}

pub(crate) fn producer_factory(produces: String, names: Vec<String>) -> Factory {
	Factory::external(move |args| Ok(Producer(Record::new(&produces, &names, args))))
}
