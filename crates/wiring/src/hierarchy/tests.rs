use pretty_assertions::assert_eq;

use super::*;
use crate::test_fixtures::{app_provider, class, hierarchy, param, recording, ty};

/// Registering a class pulls in its supertypes and enclosing packages.
#[test]
fn test_register_creates_packages_and_supertypes() {
	let mut h = hierarchy(app_provider());
	let disk = h.register("app.DiskStore").expect("disk store registers");

	assert_eq!(h.full_name(disk), "app.DiskStore");
	let app = h.resolve("app").expect("package created");
	assert!(matches!(h.node(app).kind(), NodeKind::Package));

	let store = h.resolve("app.Store").expect("interface registered first");
	assert_eq!(h.known_implementations(store), vec![disk]);
}

/// Re-registering a name returns the existing node without adding anything.
#[test]
fn test_register_is_idempotent() {
	let mut h = hierarchy(app_provider());
	let first = h.register("app.Server").expect("first registration");
	let len = h.len();
	let second = h.register("app.Server").expect("second registration");

	assert_eq!(first, second);
	assert_eq!(h.len(), len);
}

#[test]
fn test_unknown_and_invalid_names() {
	let mut h = hierarchy(app_provider());
	assert_eq!(
		h.register("app.Missing"),
		Err(RegistrationError::UnknownType {
			name: "app.Missing".into()
		})
	);
	assert_eq!(
		h.register("app..Server"),
		Err(RegistrationError::InvalidName {
			name: "app..Server".into()
		})
	);
	assert!(matches!(h.register(""), Err(RegistrationError::InvalidName { .. })));
}

/// Resolution failures report the longest prefix that did resolve.
#[test]
fn test_resolve_reports_longest_prefix() {
	let mut h = hierarchy(app_provider());
	h.register("app.Server").expect("server registers");

	let err = h.resolve("app.Server.Nope.Deeper").unwrap_err();
	assert_eq!(err.name, "app.Server.Nope.Deeper");
	assert_eq!(err.prefix, "app.Server");

	let err = h.resolve("elsewhere").unwrap_err();
	assert_eq!(err.prefix, "");
}

/// Parameters nested in a class register the class as their scope.
#[test]
fn test_parameter_scope_is_enclosing_class() {
	let mut h = hierarchy(app_provider());
	let path = h.register("app.DiskStore.Path").expect("path registers");

	let disk = h.resolve("app.DiskStore").expect("enclosing class registered");
	assert!(h.class(disk).is_some());
	assert_eq!(h.node(path).parent(), Some(disk));
	assert_eq!(h.parameter(path).map(|p| p.arg_type()), Some("String"));
}

/// Known implementations are transitive and deduplicated.
#[test]
fn test_known_implementations_transitive() {
	let provider = StaticTypeProvider::new()
		.class(ClassDescriptor::new("zoo.Animal"))
		.class(ClassDescriptor::new("zoo.Pet").implements("zoo.Animal"))
		.class(class("zoo.Dog", vec![]).extends("zoo.Pet").implements("zoo.Animal"))
		.class(class("zoo.Puppy", vec![]).extends("zoo.Dog"));
	let mut h = hierarchy(provider);
	let puppy = h.register("zoo.Puppy").expect("puppy registers");

	let animal = h.resolve("zoo.Animal").expect("animal");
	let pet = h.resolve("zoo.Pet").expect("pet");
	let dog = h.resolve("zoo.Dog").expect("dog");

	assert_eq!(h.known_implementations(animal), vec![pet, dog, puppy]);
	assert_eq!(h.direct_implementations(animal), &[pet, dog]);
	assert!(h.is_implementation(pet, puppy));
	assert!(!h.is_implementation(puppy, pet));
}

#[test]
fn test_supertype_must_be_class() {
	let provider = StaticTypeProvider::new()
		.parameter(ParameterDescriptor::new("p.Size", "i64"))
		.class(class("p.Box", vec![]).implements("p.Size"));
	let mut h = hierarchy(provider);

	assert_eq!(
		h.register("p.Box"),
		Err(RegistrationError::NotAClass {
			name: "p.Box".into(),
			related: "p.Size".into(),
			role: "interface",
			kind: "named parameter",
		})
	);
	assert!(h.resolve("p.Box").is_err(), "failed class must not be inserted");
}

#[test]
fn test_cyclic_supertypes_rejected() {
	let provider = StaticTypeProvider::new()
		.class(ClassDescriptor::new("c.A").extends("c.B"))
		.class(ClassDescriptor::new("c.B").extends("c.A"));
	let mut h = hierarchy(provider);

	assert!(matches!(
		h.register("c.A"),
		Err(RegistrationError::CyclicDeclaration { .. })
	));
}

/// Constructors differing only by argument order are rejected.
#[test]
fn test_duplicate_constructor_rejected() {
	let provider = StaticTypeProvider::new().class(
		class("d.Pair", vec![param("i64", "d.X"), param("i64", "d.Y")])
			.constructor(vec![param("i64", "d.Y"), param("i64", "d.X")], recording("d.Pair")),
	);
	let mut h = hierarchy(provider);

	assert!(matches!(
		h.register("d.Pair"),
		Err(RegistrationError::DuplicateConstructor { .. })
	));
}

#[test]
fn test_repeated_argument_rejected() {
	let provider = StaticTypeProvider::new().class(class("d.Twice", vec![ty("d.X"), ty("d.X")]));
	let mut h = hierarchy(provider);

	assert!(matches!(
		h.register("d.Twice"),
		Err(RegistrationError::RepeatedArgument { .. })
	));
}

/// A parameter cannot act as the scope of another node.
#[test]
fn test_parameter_cannot_be_parent() {
	let provider = StaticTypeProvider::new()
		.parameter(ParameterDescriptor::new("q.Level", "i64"))
		.parameter(ParameterDescriptor::new("q.Level.Inner", "i64"));
	let mut h = hierarchy(provider);
	h.register("q.Level").expect("level registers");

	assert_eq!(
		h.register("q.Level.Inner"),
		Err(RegistrationError::InvalidParent {
			name: "q.Level.Inner".into(),
			parent: "q.Level".into(),
			parent_kind: "named parameter",
		})
	);
}

#[test]
fn test_short_names() {
	let provider = app_provider().parameter(ParameterDescriptor::new("other.Port", "i64").short_name("port"));
	let mut h = hierarchy(provider);
	let port = h.register("app.Port").expect("port registers");

	assert_eq!(h.resolve_short_name("port"), Some(port));
	assert_eq!(h.short_names(), vec![("port", port)]);
	assert_eq!(
		h.register("other.Port"),
		Err(RegistrationError::ShortNameConflict {
			short_name: "port".into(),
			existing: "app.Port".into(),
			new: "other.Port".into(),
		})
	);
}

/// A namespace path aliases the members of its target class.
#[test]
fn test_namespace_resolves_through_target() {
	let provider = StaticTypeProvider::new()
		.class(class("lib.impl.Tuning", vec![]).namespace("tuning"))
		.parameter(ParameterDescriptor::new("lib.impl.Tuning.Depth", "i64"));
	let mut h = hierarchy(provider);
	let tuning = h.register("lib.impl.Tuning").expect("tuning registers");
	let depth = h.register("lib.impl.Tuning.Depth").expect("depth registers");

	let ns = h.resolve("tuning").expect("namespace node");
	assert_eq!(h.node(ns).as_namespace().and_then(|n| n.target()), Some(tuning));
	assert_eq!(h.resolve("tuning.Depth"), Ok(depth));
	assert!(h.class(tuning).is_some_and(|c| c.is_prefix_target()));
}

#[test]
fn test_namespace_conflicts() {
	let provider = StaticTypeProvider::new()
		.class(class("lib.A", vec![]).namespace("shared"))
		.class(class("lib.B", vec![]).namespace("shared"))
		.class(class("lib.C", vec![]).namespace("lib"));
	let mut h = hierarchy(provider);
	h.register("lib.A").expect("first target");

	assert_eq!(
		h.register("lib.B"),
		Err(RegistrationError::NamespaceTargetConflict {
			namespace: "shared".into(),
			existing: "lib.A".into(),
			new: "lib.B".into(),
		})
	);
	assert_eq!(
		h.register("lib.C"),
		Err(RegistrationError::NamespaceOverlap {
			name: "lib".into(),
			existing: "package",
		})
	);
	assert!(h.resolve("lib.B").is_err());
}

/// Primitive types never count as unresolved.
#[test]
fn test_find_unresolved_references() {
	let mut h = hierarchy(app_provider());
	h.register("app.Server").expect("server registers");

	let unresolved: Vec<String> = h.find_unresolved_references().into_iter().collect();
	assert_eq!(unresolved, vec!["app.Port".to_string(), "app.Store".to_string()]);
}

/// The fixed-point loop registers referenced names transitively.
#[test]
fn test_register_unresolved_reaches_fixed_point() {
	let provider = app_provider().class(class("app.Missing.User", vec![ty("app.Gone")]));
	let mut h = hierarchy(provider);
	h.register("app.Server").expect("server registers");
	h.register("app.DiskStore").expect("disk registers");
	h.register("app.Missing.User").expect("user registers");

	let added = h.register_unresolved().expect("no conflicts");
	assert!(added >= 2);
	assert!(h.resolve("app.Port").is_ok());
	assert!(h.resolve("app.DiskStore.Path").is_ok());

	let remaining: Vec<String> = h.find_unresolved_references().into_iter().collect();
	assert_eq!(remaining, vec!["app.Gone".to_string()]);
	assert_eq!(h.register_unresolved(), Ok(0));
}

#[test]
fn test_pretty_string_is_sorted_and_indented() {
	let mut h = hierarchy(app_provider());
	h.register("app.DiskStore.Path").expect("path registers");
	h.register("app.Port").expect("port registers");

	let expected = "\
[package app]
\t[class DiskStore] (String @app.DiskStore.Path)
\t\t[parameter Path: String]
\t[parameter Port: i64 = \"8080\"]
\t[class Store]
";
	assert_eq!(h.to_pretty_string(), expected);
}

#[test]
fn test_export_serializes_tree() {
	let mut h = hierarchy(app_provider());
	h.register("app.MemoryStore").expect("memory registers");

	let json = serde_json::to_value(h.export()).expect("export serializes");
	let app = &json["children"][0];
	assert_eq!(app["full_name"], "app");
	assert_eq!(app["kind"], "package");

	let store = app["children"]
		.as_array()
		.and_then(|c| c.iter().find(|n| n["name"] == "Store"))
		.expect("store exported");
	assert_eq!(store["kind"], "class");
	assert_eq!(store["known_implementations"][0], "app.MemoryStore");
}
