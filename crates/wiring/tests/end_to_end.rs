//! End-to-end wiring through the public API.
//!
//! These tests compose configurations the way an application would: a base
//! configuration from one module, an overlay from another, then a forked
//! engine per request.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use pretty_assertions::assert_eq;
use wiring::{
	ClassDescriptor, ConfigurationBuilder, ConstructorArg, Factory, InjectionError, Injector,
	ParameterDescriptor, StaticTypeProvider, Value,
};

#[derive(Debug)]
struct Handler {
	route: String,
}

#[derive(Debug)]
struct Router {
	handlers: Vec<Value>,
}

#[derive(Debug)]
struct Session {
	user: String,
	pool: Value,
}

/// Counts pool constructions across the whole test.
fn provider(pools: Arc<AtomicUsize>) -> StaticTypeProvider {
	StaticTypeProvider::new()
		.class(ClassDescriptor::new("web.Pool").constructor(
			vec![ConstructorArg::named("i64", "web.Pool.Size")],
			Factory::value(move |args| {
				pools.fetch_add(1, Ordering::SeqCst);
				Ok(args[0].clone())
			}),
		))
		.parameter(ParameterDescriptor::new("web.Pool.Size", "i64").default_literal("4"))
		.class(ClassDescriptor::new("web.Handler").constructor(
			vec![ConstructorArg::named("String", "web.Handler.Route")],
			Factory::value(|args| {
				let route = args[0].as_str().ok_or("route must be a string")?.to_string();
				Ok(Value::object(Handler { route }))
			}),
		))
		.parameter(ParameterDescriptor::new("web.Handler.Route", "String").default_literal("/"))
		.parameter(ParameterDescriptor::new("web.Handlers", "String"))
		.class(ClassDescriptor::new("web.Router").constructor(
			vec![ConstructorArg::named("String", "web.Handlers")],
			Factory::value(|args| {
				let handlers = args[0].as_list().ok_or("handlers must be a list")?.to_vec();
				Ok(Value::object(Router { handlers }))
			}),
		))
		.parameter(ParameterDescriptor::new("web.User", "String").short_name("user"))
		.class(ClassDescriptor::new("web.Session").constructor(
			vec![
				ConstructorArg::named("String", "web.User"),
				ConstructorArg::of_type("web.Pool"),
			],
			Factory::value(|args| {
				let user = args[0].as_str().ok_or("user must be a string")?.to_string();
				Ok(Value::object(Session {
					user,
					pool: args[1].clone(),
				}))
			}),
		))
}

fn base_builder(pools: Arc<AtomicUsize>) -> ConfigurationBuilder {
	let mut b = ConfigurationBuilder::new(Arc::new(provider(pools)));
	for name in ["web.Router", "web.Session", "web.Handler"] {
		b.register(name).expect("registers");
	}
	b.hierarchy_mut().register_unresolved().expect("references register");
	b
}

#[test]
fn test_request_scoped_fork() {
	let pools = Arc::new(AtomicUsize::new(0));
	let mut base = base_builder(Arc::clone(&pools));
	base.bind_singleton("web.Pool")
		.expect("pool singleton")
		.bind_named_parameter("web.Pool.Size", "16")
		.expect("pool size");
	let app = Injector::new(base.build());
	assert!(!app.is_injectable("web.Session").expect("plan"), "user is unbound");

	app.get_instance("web.Pool").expect("warm pool");
	assert_eq!(pools.load(Ordering::SeqCst), 1);

	for user in ["ada", "grace"] {
		let mut overlay = base_builder(Arc::clone(&pools));
		overlay
			.bind_named_parameter("web.User", user)
			.expect("bind user");
		let request = app.fork(&[overlay.build()]).expect("fork");

		let session = request.get_instance("web.Session").expect("session");
		let session = session.downcast::<Session>().expect("session object");
		assert_eq!(session.user, user);
		assert_eq!(session.pool, Value::Int(16));
	}
	assert_eq!(pools.load(Ordering::SeqCst), 1, "forks reuse the warmed singleton");

	match app.get_instance("web.Session") {
		Err(InjectionError::Infeasible { reason, .. }) => assert!(reason.contains("web.User"), "{reason}"),
		other => panic!("parent must stay unconfigured, got {other:?}"),
	}
}

#[test]
fn test_list_of_constructed_entries() {
	let pools = Arc::new(AtomicUsize::new(0));
	let mut b = base_builder(pools);
	b.bind_list("web.Handlers", ["/health", "/metrics"])
		.expect("bind handlers");
	let injector = Injector::new(b.build());

	let router = injector.get_instance("web.Router").expect("router");
	let router = router.downcast::<Router>().expect("router object");
	assert_eq!(router.handlers, vec![Value::from("/health"), Value::from("/metrics")]);

	let handler = injector.get_instance("web.Handler").expect("handler");
	assert_eq!(handler.downcast::<Handler>().expect("handler object").route, "/");
}

#[test]
fn test_short_name_resolution() {
	let pools = Arc::new(AtomicUsize::new(0));
	let b = base_builder(pools);
	let config = b.build();
	let id = config
		.hierarchy()
		.resolve_short_name("user")
		.expect("short name is indexed");
	assert_eq!(config.hierarchy().full_name(id), "web.User");
}
