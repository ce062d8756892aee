//! Plan construction.
//!
//! # Role
//!
//! [`PlanBuilder`] turns a requested node into an [`InjectionPlan`] by walking
//! the registry and the bindings of one [`Configuration`]. It is a pure
//! function of its inputs plus whatever the engine has already materialized,
//! which it sees through [`InstanceLookup`].
//!
//! # Invariants
//!
//! - Each node is planned at most once per builder; repeated requests share
//!   the memoized `Arc`.
//! - Re-entering a node that is still being planned is a cycle, reported with
//!   every node currently in progress.
//! - Deferred constructor arguments are never recursed into.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::trace;

use super::InjectionPlan;
use super::dominance::dominant_constructors;
use crate::config::{BoundValue, Configuration};
use crate::error::{InjectionError, Result};
use crate::parser::ValueParser;
use crate::types::{ConstructorDef, DefaultValue, NamedParameterNode, NodeId, NodeKind};
use crate::value::Value;

/// Values the engine already holds, consulted before any binding.
pub trait InstanceLookup {
	/// Cached or volatile instance of a class node.
	fn instance(&self, id: NodeId) -> Option<Value>;
	/// Cached or volatile value of a named parameter.
	fn parameter(&self, id: NodeId) -> Option<Value>;
}

/// Lookup for planning without an engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInstances;

impl InstanceLookup for NoInstances {
	fn instance(&self, _id: NodeId) -> Option<Value> {
		None
	}

	fn parameter(&self, _id: NodeId) -> Option<Value> {
		None
	}
}

enum Memo {
	Building,
	Done(Arc<InjectionPlan>),
}

/// Memoizing plan builder for one resolution pass.
pub struct PlanBuilder<'a> {
	config: &'a Configuration,
	lookup: &'a dyn InstanceLookup,
	memo: FxHashMap<NodeId, Memo>,
}

impl<'a> PlanBuilder<'a> {
	pub fn new(config: &'a Configuration, lookup: &'a dyn InstanceLookup) -> Self {
		Self {
			config,
			lookup,
			memo: FxHashMap::default(),
		}
	}

	/// Builds (or returns the memoized) plan for `id`.
	pub fn build(&mut self, id: NodeId) -> Result<Arc<InjectionPlan>> {
		match self.memo.get(&id) {
			Some(Memo::Done(plan)) => {
				trace!(node = self.config.hierarchy().full_name(id), "plan memo hit");
				return Ok(Arc::clone(plan));
			}
			Some(Memo::Building) => return Err(self.cycle()),
			None => {}
		}

		self.memo.insert(id, Memo::Building);
		match self.build_uncached(id) {
			Ok(plan) => {
				let plan = Arc::new(plan);
				self.memo.insert(id, Memo::Done(Arc::clone(&plan)));
				Ok(plan)
			}
			Err(err) => {
				self.memo.remove(&id);
				Err(err)
			}
		}
	}

	fn cycle(&self) -> InjectionError {
		let hierarchy = self.config.hierarchy();
		let mut nodes: Vec<String> = self
			.memo
			.iter()
			.filter(|(_, m)| matches!(m, Memo::Building))
			.map(|(id, _)| hierarchy.full_name(*id).to_string())
			.collect();
		nodes.sort_unstable();
		InjectionError::Cycle { nodes }
	}

	fn build_uncached(&mut self, id: NodeId) -> Result<InjectionPlan> {
		let config = self.config;
		let node = config.hierarchy().node(id);
		trace!(node = node.full_name(), kind = node.kind().label(), "planning");
		match node.kind() {
			NodeKind::NamedParameter(param) => self.build_parameter(id, param),
			NodeKind::Class(_) => self.build_class(id),
			kind @ (NodeKind::Package | NodeKind::Namespace(_)) => Err(InjectionError::NotInjectable {
				name: node.full_name().to_string(),
				kind: kind.label(),
			}),
		}
	}

	fn parse(&self, id: NodeId, param: &NamedParameterNode, literal: &str) -> Result<Value> {
		let name = self.config.hierarchy().full_name(id);
		Ok(self
			.config
			.value_parser()
			.parse(name, param.arg_type(), literal)?)
	}

	/// Plan for one set/list entry or single value, without wrapping.
	fn build_value(&mut self, id: NodeId, param: &NamedParameterNode, value: &BoundValue) -> Result<Arc<InjectionPlan>> {
		match value {
			BoundValue::Literal(literal) => Ok(Arc::new(InjectionPlan::instance(id, self.parse(id, param, literal)?))),
			BoundValue::Type(target) => self.build(*target),
		}
	}

	/// Wraps a delegated plan for `id` in a one-alternative subplan.
	fn delegate(&mut self, id: NodeId, target: NodeId) -> Result<InjectionPlan> {
		let sub = self.build(target)?;
		Ok(InjectionPlan::subplan(id, vec![sub], Some(0)))
	}

	fn build_parameter(&mut self, id: NodeId, param: &'a NamedParameterNode) -> Result<InjectionPlan> {
		let config = self.config;
		if let Some(value) = self.lookup.parameter(id) {
			return Ok(InjectionPlan::instance(id, value));
		}
		if let Some(entries) = config.bound_set(id) {
			let members = entries
				.iter()
				.map(|e| self.build_value(id, param, e))
				.collect::<Result<Vec<_>>>()?;
			return Ok(InjectionPlan::set(id, members));
		}
		if let Some(entries) = config.bound_list(id) {
			let elements = entries
				.iter()
				.map(|e| self.build_value(id, param, e))
				.collect::<Result<Vec<_>>>()?;
			return Ok(InjectionPlan::list(id, elements));
		}
		match config.named_parameter(id) {
			Some(BoundValue::Literal(literal)) => return Ok(InjectionPlan::instance(id, self.parse(id, param, literal)?)),
			Some(BoundValue::Type(target)) => return self.delegate(id, *target),
			None => {}
		}
		match param.default_value() {
			Some(DefaultValue::Literal(literal)) => Ok(InjectionPlan::instance(id, self.parse(id, param, literal)?)),
			Some(DefaultValue::Type(name)) => {
				let target = config.hierarchy().resolve(name)?;
				self.delegate(id, target)
			}
			None => Ok(InjectionPlan::infeasible(id)),
		}
	}

	fn build_class(&mut self, id: NodeId) -> Result<InjectionPlan> {
		let config = self.config;
		let hierarchy = config.hierarchy();

		if let Some(value) = self.lookup.instance(id) {
			return Ok(InjectionPlan::instance(id, value));
		}
		if let Some(ctor) = config.bound_constructor(id) {
			return self.delegate(id, ctor);
		}
		let bound = config.bound_implementation(id);
		if let Some(imp) = bound.filter(|&imp| imp != id) {
			return self.delegate(id, imp);
		}
		let declared_default = hierarchy.class(id).and_then(|c| c.default_implementation());
		if bound.is_none()
			&& let Some(name) = declared_default
		{
			let default = hierarchy.resolve(name)?;
			if default != id {
				return self.delegate(id, default);
			}
		}

		let mut candidates = Vec::new();
		if bound.is_none() && declared_default.is_none() {
			candidates.extend(hierarchy.known_implementations(id));
		}
		candidates.push(id);

		let mut per_class = Vec::with_capacity(candidates.len());
		for &candidate in &candidates {
			if let Some(plan) = self.build_candidate(candidate)? {
				per_class.push(Arc::new(plan));
			}
		}

		let unwrapped = candidates.len() == 1 && candidates[0] == id;
		trace!(
			node = hierarchy.full_name(id),
			candidates = candidates.len(),
			with_constructors = per_class.len(),
			"planned class candidates"
		);
		Ok(wrap(id, per_class, !unwrapped, None))
	}

	/// One plan covering every constructor of `class`, or `None` if it has none.
	fn build_candidate(&mut self, class: NodeId) -> Result<Option<InjectionPlan>> {
		let config = self.config;
		let hierarchy = config.hierarchy();
		let Some(node) = hierarchy.class(class) else {
			return Ok(None);
		};
		if !node.is_injection_candidate() {
			return Ok(None);
		}

		let mut plans = Vec::with_capacity(node.constructors().len());
		for def in node.constructors() {
			plans.push(Arc::new(self.build_constructor(class, def)?));
		}

		let live: Vec<usize> = (0..plans.len()).filter(|&i| plans[i].is_feasible()).collect();
		let live_defs: Vec<&ConstructorDef> = live.iter().map(|&i| &node.constructors()[i]).collect();
		let survivors = dominant_constructors(&live_defs);
		let selected = match survivors.as_slice() {
			[only] => Some(live[*only]),
			_ => None,
		};
		trace!(
			class = hierarchy.full_name(class),
			constructors = plans.len(),
			live = live.len(),
			survivors = survivors.len(),
			"filtered constructors"
		);
		Ok(Some(wrap(class, plans, false, selected)))
	}

	fn build_constructor(&mut self, class: NodeId, def: &ConstructorDef) -> Result<InjectionPlan> {
		let config = self.config;
		let hierarchy = config.hierarchy();
		let mut args = Vec::with_capacity(def.args().len());
		for arg in def.args() {
			let target = hierarchy.resolve(arg.target())?;
			let plan = if arg.is_deferred() {
				Arc::new(InjectionPlan::deferred(target))
			} else {
				self.build(target)?
			};
			args.push(plan);
		}
		Ok(InjectionPlan::constructor(class, def.clone(), args))
	}
}

/// Combines alternatives for `node`.
///
/// No alternatives is infeasible. A single alternative is returned as-is
/// unless `force` asks for a wrapper.
fn wrap(node: NodeId, mut plans: Vec<Arc<InjectionPlan>>, force: bool, selected: Option<usize>) -> InjectionPlan {
	if plans.is_empty() {
		return InjectionPlan::infeasible(node);
	}
	if !force
		&& plans.len() == 1
		&& let Some(only) = plans.pop()
	{
		return Arc::unwrap_or_clone(only);
	}
	InjectionPlan::subplan(node, plans, selected)
}
