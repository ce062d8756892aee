use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pretty_assertions::assert_eq;

use super::*;
use crate::config::{ConfigurationBuilder, Entry};
use crate::hierarchy::{ClassDescriptor, ParameterDescriptor, StaticTypeProvider};
use crate::test_fixtures::{Built, app_provider, class, recording, ty};
use crate::value::{BoxError, ExternalConstructor, Factory};

fn builder(provider: StaticTypeProvider, names: &[&str]) -> ConfigurationBuilder {
	let mut b = ConfigurationBuilder::new(Arc::new(provider));
	for name in names {
		b.register(name).expect("fixture registers");
	}
	b.hierarchy_mut()
		.register_unresolved()
		.expect("fixture references register");
	b
}

const APP: &[&str] = &["app.Server", "app.MemoryStore", "app.DiskStore"];

fn app_builder() -> ConfigurationBuilder {
	builder(app_provider(), APP)
}

fn built(value: &Value) -> Arc<Built> {
	value.downcast::<Built>().expect("value is a recorded object")
}

struct ConstStore;

impl ExternalConstructor for ConstStore {
	fn new_instance(self: Box<Self>) -> Result<Value, BoxError> {
		Ok(Value::from("const"))
	}
}

/// A self-referencing pair: `c.A(c.B)` and `c.B(deferred c.A)`.
fn cyclic_provider() -> StaticTypeProvider {
	StaticTypeProvider::new()
		.class(class("c.A", vec![ty("c.B")]))
		.class(ClassDescriptor::new("c.B").constructor(vec![ty("c.A").deferred()], recording("c.B")))
}

#[test]
fn test_get_instance_builds_dependencies() {
	let injector = Injector::new(app_builder().build());
	let server = injector.get_instance("app.Server").expect("server is injectable");

	let server = built(&server);
	assert_eq!(server.class, "app.Server");
	assert_eq!(built(&server.args[0]).class, "app.MemoryStore");
	assert_eq!(server.args[1], Value::Int(8080));
}

#[test]
fn test_singletons_are_shared() {
	let mut b = app_builder();
	b.bind_singleton("app.MemoryStore").expect("singleton");
	let injector = Injector::new(b.build());

	let first = injector.get_instance("app.MemoryStore").expect("first");
	let second = injector.get_instance("app.MemoryStore").expect("second");
	assert!(first.same_instance(&second));

	let server = injector.get_instance("app.Server").expect("server");
	assert!(built(&server).args[0].same_instance(&first));

	let a = injector.get_instance("app.Server").expect("server again");
	assert!(!a.same_instance(&server), "non-singletons are rebuilt on every request");
}

#[test]
fn test_ambiguous_request_fails_at_materialization() {
	let mut b = app_builder();
	b.bind_named_parameter("app.DiskStore.Path", "/var/data")
		.expect("bind path");
	let injector = Injector::new(b.build());

	assert!(!injector.is_injectable("app.Store").expect("plan"));
	match injector.get_instance("app.Store") {
		Err(InjectionError::Ambiguous { name, reason }) => {
			assert_eq!(name, "app.Store");
			assert!(reason.contains("multiple ways to inject app.Store"), "{reason}");
		}
		other => panic!("expected ambiguity, got {other:?}"),
	}
}

#[test]
fn test_infeasible_request_names_missing_parameter() {
	let injector = Injector::new(app_builder().build());
	match injector.get_instance("app.DiskStore") {
		Err(InjectionError::Infeasible { name, reason }) => {
			assert_eq!(name, "app.DiskStore");
			assert!(reason.contains("app.DiskStore.Path"), "{reason}");
		}
		other => panic!("expected infeasible, got {other:?}"),
	}
}

#[test]
fn test_parameter_values_are_cached() {
	let injector = Injector::new(app_builder().build());
	assert!(injector.is_parameter_set("app.Port").expect("port resolves"));
	assert!(!injector.is_parameter_set("app.DiskStore.Path").expect("path resolves"));
	assert!(!injector.is_parameter_set("app.Server").expect("classes are not parameters"));

	assert_eq!(injector.get_instance("app.Port").expect("port"), Value::Int(8080));
	assert!(matches!(
		injector.bind_volatile_parameter("app.Port", Value::Int(9000)),
		Err(BindError::Rebind { .. })
	));
}

#[test]
fn test_volatile_bindings() {
	let injector = Injector::new(app_builder().build());
	injector
		.bind_volatile_parameter("app.Port", Value::Int(9000))
		.expect("first parameter bind");
	let store = Value::object("prebuilt");
	injector
		.bind_volatile_instance("app.Store", store.clone())
		.expect("first instance bind");

	let server = injector.get_instance("app.Server").expect("server");
	let server = built(&server);
	assert!(server.args[0].same_instance(&store));
	assert_eq!(server.args[1], Value::Int(9000));

	match injector.bind_volatile_instance("app.Store", Value::object("other")) {
		Err(BindError::Rebind { name, .. }) => assert_eq!(name, "app.Store"),
		other => panic!("expected rebind, got {other:?}"),
	}
	assert!(matches!(
		injector.bind_volatile_instance("app.Port", Value::Int(1)),
		Err(BindError::WrongKind {
			expected: "class",
			found: "named parameter",
			..
		})
	));
	assert!(matches!(
		injector.bind_volatile_parameter("app.Server", Value::Int(1)),
		Err(BindError::WrongKind { .. })
	));
}

#[test]
fn test_self_injection() {
	let provider = app_provider().class(class("app.Admin", vec![ty(INJECTOR_TYPE)]));
	let injector = Injector::new(builder(provider, &["app.Admin"]).build());

	let handle = injector.get_instance(INJECTOR_TYPE).expect("self handle");
	assert!(handle.downcast::<Injector>().expect("injector").ptr_eq(&injector));

	let admin = injector.get_instance("app.Admin").expect("admin");
	let passed = built(&admin).args[0].downcast::<Injector>().expect("injector argument");
	assert!(passed.ptr_eq(&injector));
}

/// A factory that calls back into its own engine observes a re-entrancy error.
#[test]
fn test_reentrant_request_is_refused() {
	let provider = app_provider().class(ClassDescriptor::new("app.Caller").constructor(
		vec![ty(INJECTOR_TYPE)],
		Factory::value(|args| {
			let injector = args[0].downcast::<Injector>().ok_or("expected an injector")?;
			let nested = injector.get_instance("app.MemoryStore");
			let bind = injector.bind_volatile_parameter("app.Port", Value::Int(1));
			Ok(Value::from(
				matches!(nested, Err(InjectionError::Reentrant)) && matches!(bind, Err(BindError::Reentrant)),
			))
		}),
	));
	let mut b = builder(provider, APP);
	b.register("app.Caller").expect("caller registers");
	let injector = Injector::new(b.build());

	assert_eq!(injector.get_instance("app.Caller").expect("caller"), Value::Bool(true));
	injector
		.get_instance("app.Server")
		.expect("guard is released after construction");
}

#[test]
fn test_construction_failure_is_wrapped() {
	let provider = StaticTypeProvider::new().class(
		ClassDescriptor::new("f.Broken").constructor(vec![], Factory::value(|_| Err("disk on fire".into()))),
	);
	let injector = Injector::new(builder(provider, &["f.Broken"]).build());

	match injector.get_instance("f.Broken") {
		Err(InjectionError::Construction { class, source }) => {
			assert_eq!(class, "f.Broken");
			assert_eq!(source.to_string(), "disk on fire");
		}
		other => panic!("expected construction failure, got {other:?}"),
	}
}

#[test]
fn test_external_constructor_is_unwrapped() {
	let provider = app_provider().class(
		ClassDescriptor::new("app.StoreFactory")
			.constructor(vec![], Factory::external(|_| Ok(ConstStore)))
			.external_constructor(),
	);
	let mut b = builder(provider, APP);
	b.bind_constructor("app.Store", "app.StoreFactory")
		.expect("bind constructor");
	let injector = Injector::new(b.build());

	assert_eq!(injector.get_instance("app.Store").expect("store"), Value::from("const"));
}

#[test]
fn test_deferred_singleton_cycle() {
	let mut b = builder(cyclic_provider(), &["c.A"]);
	b.bind_singleton("c.A").expect("singleton");
	let injector = Injector::new(b.build());

	let a = injector.get_instance("c.A").expect("a");
	let b_value = &built(&a).args[0];
	let future = built(b_value).args[0].as_future().expect("deferred argument").clone();
	assert_eq!(future.name(), "c.A");
	assert!(future.is_resolved(), "pending handles are drained before returning");
	assert!(future.get().expect("resolved").same_instance(&a));
}

/// Forcing a non-singleton cycle builds one extra instance and stops.
#[test]
fn test_deferred_non_singleton_cycle_terminates() {
	let injector = Injector::new(builder(cyclic_provider(), &["c.A"]).build());

	let a1 = injector.get_instance("c.A").expect("a");
	let f1 = built(&built(&a1).args[0]).args[0]
		.as_future()
		.expect("deferred argument")
		.clone();
	assert!(f1.is_resolved());

	let a2 = f1.get().expect("resolved");
	assert!(!a2.same_instance(&a1));
	let f2 = built(&built(&a2).args[0]).args[0]
		.as_future()
		.expect("nested deferred argument")
		.clone();
	assert!(!f2.is_resolved(), "nested handle for a node being forced stays lazy");

	drop(injector);
	assert!(matches!(f2.get(), Err(InjectionError::InjectorDropped { .. })));
	assert!(f1.get().expect("memoized").same_instance(&a2));
}

#[test]
fn test_sets_and_lists_materialize() {
	let provider = app_provider()
		.parameter(ParameterDescriptor::new("app.Peers", "String"))
		.parameter(ParameterDescriptor::new("app.Replicas", "app.Store"));
	let mut b = builder(provider, &["app.Peers", "app.Replicas"]);
	b.bind_singleton("app.MemoryStore").expect("singleton");
	b.bind_set_entry("app.Peers", "alpha").expect("alpha");
	b.bind_set_entry("app.Peers", "beta").expect("beta");
	b.bind_list(
		"app.Replicas",
		vec![Entry::of_type("app.MemoryStore"), Entry::of_type("app.MemoryStore")],
	)
	.expect("list");
	let injector = Injector::new(b.build());

	assert_eq!(
		injector.get_instance("app.Peers").expect("peers"),
		Value::Set(vec![Value::from("beta"), Value::from("alpha")])
	);
	let replicas = injector.get_instance("app.Replicas").expect("replicas");
	let replicas = replicas.as_list().expect("list value");
	assert_eq!(replicas.len(), 2);
	assert!(replicas[0].same_instance(&replicas[1]));
}

/// Distinct literals that parse to the same value collapse into one member.
#[test]
fn test_set_members_are_deduplicated_after_parsing() {
	let provider = app_provider()
		.parameter(ParameterDescriptor::new("app.Flags", "bool"))
		.parameter(ParameterDescriptor::new("app.Shards", "u8"));
	let mut b = builder(provider, &["app.Flags", "app.Shards"]);
	for literal in ["true", "yes", "on"] {
		b.bind_set_entry("app.Flags", literal).expect("flag");
	}
	for literal in ["1", "01", "2"] {
		b.bind_set_entry("app.Shards", literal).expect("shard");
	}
	let injector = Injector::new(b.build());

	let flags = injector.get_instance("app.Flags").expect("flags");
	assert_eq!(flags.as_set().map(<[Value]>::len), Some(1));
	assert_eq!(flags, Value::Set(vec![Value::Bool(true)]));
	assert_eq!(
		injector.get_instance("app.Shards").expect("shards"),
		Value::Set(vec![Value::Int(1), Value::Int(2)])
	);
}

struct Counting {
	calls: Arc<AtomicUsize>,
	children: Arc<AtomicUsize>,
}

impl Aspect for Counting {
	fn inject(&self, def: &ConstructorDef, args: Vec<Value>) -> Result<Construct, BoxError> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		def.factory().call(args)
	}

	fn create_child(&self) -> Arc<dyn Aspect> {
		self.children.fetch_add(1, Ordering::SeqCst);
		Arc::new(Counting {
			calls: Arc::clone(&self.calls),
			children: Arc::clone(&self.children),
		})
	}
}

#[test]
fn test_aspect_intercepts_construction() {
	let injector = Injector::new(app_builder().build());
	let calls = Arc::new(AtomicUsize::new(0));
	let children = Arc::new(AtomicUsize::new(0));
	let aspect = Arc::new(Counting {
		calls: Arc::clone(&calls),
		children: Arc::clone(&children),
	});
	injector.bind_aspect(aspect.clone()).expect("first aspect");
	assert!(matches!(
		injector.bind_aspect(aspect),
		Err(BindError::AspectAlreadyBound)
	));

	injector.get_instance("app.Server").expect("server");
	assert_eq!(calls.load(Ordering::SeqCst), 2, "store and server");

	let child = injector.fork(&[]).expect("fork");
	assert_eq!(children.load(Ordering::SeqCst), 1);
	assert!(child.aspect().is_some());
	child.get_instance("app.MemoryStore").expect("store");
	assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_fork_shares_instances_and_isolates_bindings() {
	let mut b = app_builder();
	b.bind_singleton("app.MemoryStore").expect("singleton");
	let parent = Injector::new(b.build());
	let store = parent.get_instance("app.MemoryStore").expect("store");

	let mut overlay = builder(app_provider(), APP);
	overlay
		.bind_implementation("app.Store", "app.DiskStore")
		.expect("bind disk")
		.bind_named_parameter("app.DiskStore.Path", "/var/data")
		.expect("bind path");
	let child = parent.fork(&[overlay.build()]).expect("fork");

	let shared = child.get_instance("app.MemoryStore").expect("child store");
	assert!(shared.same_instance(&store));

	let child_server = child.get_instance("app.Server").expect("child server");
	let disk = built(&built(&child_server).args[0]);
	assert_eq!(disk.class, "app.DiskStore");
	assert_eq!(disk.args[0], Value::from("/var/data"));

	let parent_server = parent.get_instance("app.Server").expect("parent server");
	assert!(built(&parent_server).args[0].same_instance(&store));
	assert!(
		parent
			.config()
			.hierarchy()
			.resolve("app.DiskStore.Path")
			.is_ok_and(|id| parent.config().named_parameter(id).is_none())
	);
}

#[test]
fn test_fork_rejects_conflicting_overlay() {
	let mut b = app_builder();
	b.bind_implementation("app.Store", "app.MemoryStore")
		.expect("bind memory");
	let parent = Injector::new(b.build());

	let mut overlay = app_builder();
	overlay
		.bind_implementation("app.Store", "app.DiskStore")
		.expect("bind disk");
	assert!(matches!(
		parent.fork(&[overlay.build()]),
		Err(BindError::Rebind { .. })
	));
}

#[test]
#[should_panic(expected = "cannot fork an engine")]
fn test_fork_refuses_cached_engine_instance() {
	let mut b = app_builder();
	b.register(INJECTOR_TYPE).expect("engine type registers");
	let parent = Injector::new(b.build());
	let other = Injector::new(app_builder().build());
	parent
		.bind_volatile_instance(INJECTOR_TYPE, Value::object(other))
		.expect("engine instance binds");

	let _ = parent.fork(&[]);
}

#[test]
fn test_list_literals_keep_order_and_duplicates() {
	let provider = app_provider().parameter(ParameterDescriptor::new("app.Weights", "u8"));
	let mut b = builder(provider, &["app.Weights"]);
	b.bind_list("app.Weights", ["1", "2", "3", "2"]).expect("list");
	let injector = Injector::new(b.build());

	assert_eq!(
		injector.get_instance("app.Weights").expect("weights"),
		Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(2)])
	);
}

/// Binding an interface makes it resolve exactly like the bound class.
#[test]
fn test_bound_interface_matches_implementation() {
	let mut b = app_builder();
	b.bind_named_parameter("app.DiskStore.Path", "/srv")
		.expect("bind path")
		.bind_implementation("app.Store", "app.DiskStore")
		.expect("bind disk");
	let injector = Injector::new(b.build());

	let via_interface = injector.plan("app.Store").expect("store plan");
	let direct = injector.plan("app.DiskStore").expect("disk plan");
	assert!(via_interface.is_injectable());
	assert_eq!(via_interface.delegated(), Some(&direct));

	let store = injector.get_instance("app.Store").expect("store");
	assert_eq!(built(&store).class, "app.DiskStore");
	assert_eq!(built(&store).args[0], Value::from("/srv"));
}
