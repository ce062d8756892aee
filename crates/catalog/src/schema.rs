//! On-disk catalog format.
//!
//! ```toml
//! [[class]]
//! name = "app.Server"
//! implements = ["app.Service"]
//!
//! [[class.constructor]]
//! args = [{ type = "app.Store" }, { type = "i64", parameter = "app.Port" }]
//!
//! [[parameter]]
//! name = "app.Port"
//! type = "i64"
//! default = "8080"
//! short_name = "port"
//!
//! [bind]
//! singletons = ["app.MemoryStore"]
//! implementations = { "app.Store" = "app.MemoryStore" }
//! ```

use std::collections::BTreeMap;

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogFile {
	#[serde(default, rename = "class")]
	pub classes: Vec<ClassEntry>,
	#[serde(default, rename = "parameter")]
	pub parameters: Vec<ParameterEntry>,
	#[serde(default)]
	pub bind: BindSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassEntry {
	pub name: String,
	pub extends: Option<String>,
	#[serde(default)]
	pub implements: Vec<String>,
	pub default_implementation: Option<String>,
	pub namespace: Option<String>,
	#[serde(default)]
	pub external_constructor: bool,
	/// Class name recorded on objects made by an external constructor.
	pub produces: Option<String>,
	#[serde(default, rename = "constructor")]
	pub constructors: Vec<ConstructorEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConstructorEntry {
	#[serde(default)]
	pub args: Vec<ArgEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArgEntry {
	#[serde(rename = "type")]
	pub arg_type: String,
	pub parameter: Option<String>,
	#[serde(default)]
	pub deferred: bool,
}

impl ArgEntry {
	/// Field name under which the argument is recorded.
	pub fn field_name(&self) -> &str {
		self.parameter.as_deref().unwrap_or(&self.arg_type)
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterEntry {
	pub name: String,
	#[serde(rename = "type")]
	pub arg_type: String,
	pub default: Option<String>,
	pub default_type: Option<String>,
	pub short_name: Option<String>,
	pub doc: Option<String>,
}

/// Bindings applied on top of the declared types.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BindSection {
	#[serde(default)]
	pub implementations: BTreeMap<String, String>,
	#[serde(default)]
	pub constructors: BTreeMap<String, String>,
	#[serde(default)]
	pub singletons: Vec<String>,
	#[serde(default)]
	pub parameters: BTreeMap<String, String>,
	#[serde(default)]
	pub sets: BTreeMap<String, Vec<String>>,
	#[serde(default)]
	pub lists: BTreeMap<String, Vec<String>>,
}

impl BindSection {
	pub fn is_empty(&self) -> bool {
		self.implementations.is_empty()
			&& self.constructors.is_empty()
			&& self.singletons.is_empty()
			&& self.parameters.is_empty()
			&& self.sets.is_empty()
			&& self.lists.is_empty()
	}
}
