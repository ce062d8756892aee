//! Execution engine.
//!
//! # Role
//!
//! An [`Injector`] turns plans into values. It owns the instance cache
//! (singletons and volatile instances), the named-parameter cache, the set of
//! pending deferred handles and an optional construction [`Aspect`].
//!
//! # Invariants
//!
//! - Only singleton-declared classes are cached after construction; a cached
//!   class is never constructed again by the same engine.
//! - Volatile instances and parameters are bound at most once.
//! - While a factory runs, every top-level request against the same engine
//!   fails with a re-entrancy error instead of deadlocking.
//! - Every deferred handle created by a top-level request is forced before the
//!   request returns, unless an enclosing drain is already forcing its node.
//! - The state mutex is never held across a factory call.

mod aspect;
mod future;

#[cfg(test)]
mod tests;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

pub use aspect::Aspect;
pub use future::InjectionFuture;

use crate::config::Configuration;
use crate::error::{BindError, InjectionError, Result};
use crate::plan::{InjectionPlan, InstanceLookup, PlanBuilder, PlanKind};
use crate::types::{ConstructorDef, NodeId, NodeKind};
use crate::value::{Construct, Value};

/// Reserved type name that resolves to the requesting engine itself.
pub const INJECTOR_TYPE: &str = "wiring.Injector";

#[derive(Default)]
struct State {
	instances: FxHashMap<NodeId, Value>,
	parameters: FxHashMap<NodeId, Value>,
	pending: Vec<InjectionFuture>,
	forcing: FxHashSet<NodeId>,
	aspect: Option<Arc<dyn Aspect>>,
}

pub(crate) struct InjectorInner {
	config: Configuration,
	state: Mutex<State>,
	constructing: AtomicBool,
}

/// Marks a factory call in flight for the lifetime of the guard.
struct ConstructionGuard<'a>(&'a AtomicBool);

impl<'a> ConstructionGuard<'a> {
	fn enter(flag: &'a AtomicBool) -> Self {
		flag.store(true, Ordering::Release);
		Self(flag)
	}
}

impl Drop for ConstructionGuard<'_> {
	fn drop(&mut self) {
		self.0.store(false, Ordering::Release);
	}
}

/// Materializes plans built from one [`Configuration`].
///
/// Cloning yields another handle to the same engine.
#[derive(Clone)]
pub struct Injector {
	inner: Arc<InjectorInner>,
}

impl fmt::Debug for Injector {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.inner.state.lock();
		f.debug_struct("Injector")
			.field("instances", &state.instances.len())
			.field("parameters", &state.parameters.len())
			.field("pending", &state.pending.len())
			.field("aspect", &state.aspect.is_some())
			.finish()
	}
}

impl Injector {
	pub fn new(config: Configuration) -> Self {
		Self {
			inner: Arc::new(InjectorInner {
				config,
				state: Mutex::new(State::default()),
				constructing: AtomicBool::new(false),
			}),
		}
	}

	pub(crate) fn from_inner(inner: Arc<InjectorInner>) -> Self {
		Self { inner }
	}

	pub fn config(&self) -> &Configuration {
		&self.inner.config
	}

	/// True if both handles refer to the same engine.
	pub fn ptr_eq(&self, other: &Injector) -> bool {
		Arc::ptr_eq(&self.inner, &other.inner)
	}

	fn handle(&self) -> Value {
		Value::object(self.clone())
	}

	fn is_constructing(&self) -> bool {
		self.inner.constructing.load(Ordering::Acquire)
	}

	fn full_name(&self, id: NodeId) -> &str {
		self.inner.config.hierarchy().full_name(id)
	}

	/// Returns the value of `name`, building whatever it needs.
	///
	/// Requesting [`INJECTOR_TYPE`] returns a handle to this engine.
	pub fn get_instance(&self, name: &str) -> Result<Value> {
		if name == INJECTOR_TYPE {
			return Ok(self.handle());
		}
		let id = self.inner.config.hierarchy().resolve(name)?;
		self.get_node_instance(id)
	}

	/// Like [`get_instance`](Self::get_instance), addressed by node id.
	pub fn get_node_instance(&self, id: NodeId) -> Result<Value> {
		if self.is_constructing() {
			return Err(InjectionError::Reentrant);
		}
		let result = self
			.materialize(id)
			.and_then(|value| self.drain_pending().map(|()| value));
		if result.is_err() {
			self.inner.state.lock().pending.clear();
		}
		result
	}

	/// Builds the plan for `name` without materializing it.
	pub fn plan(&self, name: &str) -> Result<Arc<InjectionPlan>> {
		let id = self.inner.config.hierarchy().resolve(name)?;
		self.build_plan(id)
	}

	/// True if `name` currently has exactly one viable plan.
	pub fn is_injectable(&self, name: &str) -> Result<bool> {
		Ok(self.plan(name)?.is_injectable())
	}

	/// True if the named parameter has a cached value or an injectable plan.
	pub fn is_parameter_set(&self, name: &str) -> Result<bool> {
		let id = self.inner.config.hierarchy().resolve(name)?;
		if self.inner.config.hierarchy().parameter(id).is_none() {
			return Ok(false);
		}
		if self.inner.state.lock().parameters.contains_key(&id) {
			return Ok(true);
		}
		Ok(self.build_plan(id)?.is_injectable())
	}

	fn build_plan(&self, id: NodeId) -> Result<Arc<InjectionPlan>> {
		PlanBuilder::new(&self.inner.config, self).build(id)
	}

	fn materialize(&self, id: NodeId) -> Result<Value> {
		let plan = self.build_plan(id)?;
		let hierarchy = self.inner.config.hierarchy();
		if !plan.is_feasible() {
			return Err(InjectionError::Infeasible {
				name: self.full_name(id).to_string(),
				reason: plan.cant_inject_reason(hierarchy),
			});
		}
		if plan.is_ambiguous() {
			return Err(InjectionError::Ambiguous {
				name: self.full_name(id).to_string(),
				reason: plan.cant_inject_reason(hierarchy),
			});
		}
		self.inject(&plan, true)
	}

	/// Forces every pending deferred handle, including ones created while forcing.
	fn drain_pending(&self) -> Result<()> {
		loop {
			let batch = std::mem::take(&mut self.inner.state.lock().pending);
			if batch.is_empty() {
				return Ok(());
			}
			for future in batch {
				if future.is_resolved() {
					continue;
				}
				let node = future.node();
				let claimed = self.inner.state.lock().forcing.insert(node);
				if !claimed {
					continue;
				}
				let result = future.get();
				self.inner.state.lock().forcing.remove(&node);
				result?;
			}
		}
	}

	/// Walks `plan` bottom-up. Top-level parameter values are cached.
	fn inject(&self, plan: &InjectionPlan, cache_parameter: bool) -> Result<Value> {
		let id = plan.node();
		let node = self.inner.config.hierarchy().node(id);
		if matches!(node.kind(), NodeKind::Class(_))
			&& let Some(cached) = self.inner.state.lock().instances.get(&id).cloned()
		{
			return Ok(cached);
		}

		match plan.kind() {
			PlanKind::Instance(value) => {
				if cache_parameter && node.as_parameter().is_some() {
					self.inner
						.state
						.lock()
						.parameters
						.entry(id)
						.or_insert_with(|| value.clone());
				}
				Ok(value.clone())
			}
			PlanKind::Deferred => {
				let future = InjectionFuture::new(Arc::downgrade(&self.inner), id, node.full_name());
				self.inner.state.lock().pending.push(future.clone());
				Ok(Value::Future(future))
			}
			PlanKind::Constructor { def, args } => {
				let mut values = Vec::with_capacity(args.len());
				for arg in args {
					values.push(self.inject(arg, true)?);
				}
				let value = self.construct(def, values)?;
				if self.inner.config.is_singleton(id) {
					let mut state = self.inner.state.lock();
					if state.instances.contains_key(&id) {
						return Err(InjectionError::RepeatedInjection {
							name: node.full_name().to_string(),
						});
					}
					state.instances.insert(id, value.clone());
				}
				Ok(value)
			}
			PlanKind::Subplan { .. } => match plan.delegated() {
				Some(chosen) => self.inject(chosen, cache_parameter),
				None => Err(InjectionError::InvalidSelection {
					name: node.full_name().to_string(),
				}),
			},
			PlanKind::Set(members) => {
				// Distinct literals may parse to the same value ("1" and "01").
				let mut values: Vec<Value> = Vec::with_capacity(members.len());
				for member in members {
					let value = self.inject(member, false)?;
					if !values.contains(&value) {
						values.push(value);
					}
				}
				Ok(Value::Set(values))
			}
			PlanKind::List(elements) => Ok(Value::List(
				elements
					.iter()
					.map(|e| self.inject(e, false))
					.collect::<Result<_>>()?,
			)),
		}
	}

	fn construct(&self, def: &ConstructorDef, args: Vec<Value>) -> Result<Value> {
		let aspect = self.inner.state.lock().aspect.clone();
		let produced = {
			let _guard = ConstructionGuard::enter(&self.inner.constructing);
			let made = match aspect {
				Some(aspect) => aspect.inject(def, args),
				None => def.factory().call(args),
			};
			made.and_then(|construct| match construct {
				Construct::Value(value) => Ok(value),
				Construct::External(external) => external.new_instance(),
			})
		};
		let value = produced.map_err(|source| InjectionError::Construction {
			class: def.class_name().to_string(),
			source,
		})?;
		debug!(class = def.class_name(), constructor = %def, "constructed instance");
		Ok(value)
	}

	/// Binds a pre-built instance to a class. Each class accepts one volatile instance.
	pub fn bind_volatile_instance(&self, name: &str, value: Value) -> std::result::Result<(), BindError> {
		let id = self.volatile_target(name, "class")?;
		let mut state = self.inner.state.lock();
		if let Some(old) = state.instances.get(&id) {
			return Err(BindError::Rebind {
				name: name.to_string(),
				old: format!("{old:?}"),
				new: format!("{value:?}"),
			});
		}
		state.instances.insert(id, value);
		debug!(class = name, "bound volatile instance");
		Ok(())
	}

	/// Binds a pre-built value to a named parameter. Each parameter accepts one value.
	pub fn bind_volatile_parameter(&self, name: &str, value: Value) -> std::result::Result<(), BindError> {
		let id = self.volatile_target(name, "named parameter")?;
		let mut state = self.inner.state.lock();
		if let Some(old) = state.parameters.get(&id) {
			return Err(BindError::Rebind {
				name: name.to_string(),
				old: format!("{old:?}"),
				new: format!("{value:?}"),
			});
		}
		state.parameters.insert(id, value);
		debug!(parameter = name, "bound volatile parameter");
		Ok(())
	}

	fn volatile_target(&self, name: &str, expected: &'static str) -> std::result::Result<NodeId, BindError> {
		if self.is_constructing() {
			return Err(BindError::Reentrant);
		}
		let id = self.inner.config.hierarchy().resolve(name)?;
		let found = self.inner.config.hierarchy().node(id).kind().label();
		if found != expected {
			return Err(BindError::WrongKind {
				name: name.to_string(),
				expected,
				found,
			});
		}
		Ok(id)
	}

	/// Installs the construction aspect. An engine carries at most one.
	pub fn bind_aspect(&self, aspect: Arc<dyn Aspect>) -> std::result::Result<(), BindError> {
		let mut state = self.inner.state.lock();
		if state.aspect.is_some() {
			return Err(BindError::AspectAlreadyBound);
		}
		state.aspect = Some(aspect);
		Ok(())
	}

	pub fn aspect(&self) -> Option<Arc<dyn Aspect>> {
		self.inner.state.lock().aspect.clone()
	}

	/// Creates an engine whose configuration layers `overlays` over this one.
	///
	/// Cached instances and parameter values are shared by reference; the
	/// aspect, if any, is replaced by its child.
	///
	/// # Panics
	///
	/// Panics if this engine cached an instance of [`INJECTOR_TYPE`], which is
	/// inherently local to one engine.
	pub fn fork(&self, overlays: &[Configuration]) -> std::result::Result<Injector, BindError> {
		if self.is_constructing() {
			return Err(BindError::Reentrant);
		}
		let mut builder = self.inner.config.new_builder();
		for overlay in overlays {
			builder.add_configuration(overlay)?;
		}
		let child = Injector::new(builder.build());

		let state = self.inner.state.lock();
		let from = self.inner.config.hierarchy();
		let to = child.inner.config.hierarchy();
		let mut child_state = child.inner.state.lock();
		for (&id, value) in &state.instances {
			let name = from.full_name(id);
			if name == INJECTOR_TYPE {
				panic!("cannot fork an engine that holds an instance of {INJECTOR_TYPE}");
			}
			child_state.instances.insert(to.resolve(name)?, value.clone());
		}
		for (&id, value) in &state.parameters {
			child_state
				.parameters
				.insert(to.resolve(from.full_name(id))?, value.clone());
		}
		child_state.aspect = state.aspect.as_ref().map(|a| a.create_child());
		debug!(
			instances = child_state.instances.len(),
			parameters = child_state.parameters.len(),
			overlays = overlays.len(),
			"forked injector"
		);
		drop(child_state);
		drop(state);
		Ok(child)
	}
}

impl InstanceLookup for Injector {
	fn instance(&self, id: NodeId) -> Option<Value> {
		if self.full_name(id) == INJECTOR_TYPE {
			return Some(self.handle());
		}
		self.inner.state.lock().instances.get(&id).cloned()
	}

	fn parameter(&self, id: NodeId) -> Option<Value> {
		self.inner.state.lock().parameters.get(&id).cloned()
	}
}
