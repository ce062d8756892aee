//! Shared declarations for unit tests.

use std::sync::Arc;

use crate::hierarchy::{ClassDescriptor, ClassHierarchy, ParameterDescriptor, StaticTypeProvider};
use crate::types::ConstructorArg;
use crate::value::{Factory, Value};

/// Object produced by [`recording`] factories.
#[derive(Debug)]
pub(crate) struct Built {
	pub class: &'static str,
	pub args: Vec<Value>,
}

/// A factory that wraps its arguments in a [`Built`] object.
pub(crate) fn recording(class: &'static str) -> Factory {
	Factory::value(move |args| Ok(Value::object(Built { class, args })))
}

pub(crate) fn hierarchy(provider: StaticTypeProvider) -> ClassHierarchy {
	ClassHierarchy::new(Arc::new(provider))
}

pub(crate) fn ty(name: &str) -> ConstructorArg {
	ConstructorArg::of_type(name)
}

pub(crate) fn param(arg_type: &str, name: &str) -> ConstructorArg {
	ConstructorArg::named(arg_type, name)
}

/// A class with a single constructor taking `args`.
pub(crate) fn class(name: &'static str, args: Vec<ConstructorArg>) -> ClassDescriptor {
	ClassDescriptor::new(name).constructor(args, recording(name))
}

/// A small application: an interface with two implementations plus a few parameters.
///
/// ```text
/// app.Store           interface, no constructors
/// app.MemoryStore     implements Store, ()
/// app.DiskStore       implements Store, (app.DiskStore.Path)
/// app.DiskStore.Path  String parameter
/// app.Port            i64 parameter, default 8080, short name "port"
/// app.Server          (app.Store, app.Port)
/// ```
pub(crate) fn app_provider() -> StaticTypeProvider {
	StaticTypeProvider::new()
		.class(ClassDescriptor::new("app.Store"))
		.class(class("app.MemoryStore", vec![]).implements("app.Store"))
		.class(
			class("app.DiskStore", vec![param("String", "app.DiskStore.Path")]).implements("app.Store"),
		)
		.parameter(ParameterDescriptor::new("app.DiskStore.Path", "String"))
		.parameter(
			ParameterDescriptor::new("app.Port", "i64")
				.default_literal("8080")
				.short_name("port")
				.documentation("listen port"),
		)
		.class(class(
			"app.Server",
			vec![ty("app.Store"), param("i64", "app.Port")],
		))
}
