//! Injection plans.
//!
//! An [`InjectionPlan`] is an immutable tree describing how to produce the
//! value of one registry node. Every plan knows how many live alternatives it
//! represents; zero means infeasible, more than one (or any ambiguous part)
//! means ambiguous. Building a plan never fails because of infeasibility or
//! ambiguity: those are reported when the plan is executed.

mod builder;
mod dominance;


use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::sync::Arc;

pub use builder::{InstanceLookup, NoInstances, PlanBuilder};
pub use dominance::dominant_constructors;

use crate::hierarchy::ClassHierarchy;
use crate::types::{ConstructorDef, NodeId};
use crate::value::Value;

/// The shape of one plan node.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanKind {
	/// A value that is already available.
	Instance(Value),
	/// Invoke `def` with one sub-plan per argument, in declared order.
	Constructor {
		def: ConstructorDef,
		args: Vec<Arc<InjectionPlan>>,
	},
	/// Alternatives for the same node, with the unique winner if one was chosen.
	Subplan {
		alternatives: Vec<Arc<InjectionPlan>>,
		selected: Option<usize>,
	},
	/// Members of a set-valued parameter.
	Set(Vec<Arc<InjectionPlan>>),
	/// Elements of a list-valued parameter.
	List(Vec<Arc<InjectionPlan>>),
	/// A lazy handle to the node, resolved against the engine when forced.
	Deferred,
}

/// A resolved-or-not description of how to build one node.
#[derive(Debug, Clone, PartialEq)]
pub struct InjectionPlan {
	node: NodeId,
	kind: PlanKind,
	alternatives: usize,
	ambiguous: bool,
}

fn product(plans: &[Arc<InjectionPlan>]) -> (usize, bool) {
	plans.iter().fold((1usize, false), |(n, amb), p| {
		(n.saturating_mul(p.alternatives), amb || p.ambiguous)
	})
}

impl InjectionPlan {
	pub fn instance(node: NodeId, value: Value) -> Self {
		Self {
			node,
			kind: PlanKind::Instance(value),
			alternatives: 1,
			ambiguous: false,
		}
	}

	pub fn deferred(node: NodeId) -> Self {
		Self {
			node,
			kind: PlanKind::Deferred,
			alternatives: 1,
			ambiguous: false,
		}
	}

	pub fn constructor(node: NodeId, def: ConstructorDef, args: Vec<Arc<InjectionPlan>>) -> Self {
		let (alternatives, ambiguous) = product(&args);
		Self {
			node,
			kind: PlanKind::Constructor { def, args },
			alternatives,
			ambiguous,
		}
	}

	pub fn subplan(node: NodeId, alternatives: Vec<Arc<InjectionPlan>>, selected: Option<usize>) -> Self {
		let (count, ambiguous) = match selected.and_then(|i| alternatives.get(i)) {
			Some(chosen) => (chosen.alternatives, chosen.ambiguous),
			None => {
				let sum = alternatives
					.iter()
					.fold(0usize, |n, p| n.saturating_add(p.alternatives));
				(sum, sum > 1 || alternatives.iter().any(|p| p.ambiguous))
			}
		};
		Self {
			node,
			kind: PlanKind::Subplan {
				alternatives,
				selected,
			},
			alternatives: count,
			ambiguous,
		}
	}

	/// A plan with no way to produce `node`.
	pub fn infeasible(node: NodeId) -> Self {
		Self::subplan(node, Vec::new(), None)
	}

	pub fn set(node: NodeId, members: Vec<Arc<InjectionPlan>>) -> Self {
		let (alternatives, ambiguous) = product(&members);
		Self {
			node,
			kind: PlanKind::Set(members),
			alternatives,
			ambiguous,
		}
	}

	pub fn list(node: NodeId, elements: Vec<Arc<InjectionPlan>>) -> Self {
		let (alternatives, ambiguous) = product(&elements);
		Self {
			node,
			kind: PlanKind::List(elements),
			alternatives,
			ambiguous,
		}
	}

	/// Node whose value this plan produces.
	pub fn node(&self) -> NodeId {
		self.node
	}

	pub fn kind(&self) -> &PlanKind {
		&self.kind
	}

	/// Number of live ways to satisfy this plan.
	pub fn num_alternatives(&self) -> usize {
		self.alternatives
	}

	pub fn is_feasible(&self) -> bool {
		self.alternatives > 0
	}

	pub fn is_ambiguous(&self) -> bool {
		self.ambiguous
	}

	/// Feasible and unambiguous.
	pub fn is_injectable(&self) -> bool {
		self.is_feasible() && !self.ambiguous
	}

	/// The alternative a subplan delegates to at execution time.
	///
	/// That is the selected alternative, or the only live one when nothing was
	/// selected. Returns `None` for other plan kinds.
	pub fn delegated(&self) -> Option<&Arc<InjectionPlan>> {
		let PlanKind::Subplan {
			alternatives,
			selected,
		} = &self.kind
		else {
			return None;
		};
		match selected {
			Some(i) => alternatives.get(*i),
			None if self.alternatives == 1 => alternatives.iter().find(|p| p.alternatives > 0),
			None => None,
		}
	}

	/// Explains why this plan cannot be executed, or returns an empty string.
	pub fn cant_inject_reason(&self, hierarchy: &ClassHierarchy) -> String {
		if !self.is_feasible() {
			let mut missing = BTreeSet::new();
			self.collect_missing(hierarchy, &mut missing);
			let missing: Vec<&str> = missing.into_iter().collect();
			return format!("missing argument(s): [ {} ]", missing.join(" "));
		}
		if self.ambiguous {
			let mut reasons = Vec::new();
			self.collect_ambiguities(hierarchy, &mut reasons);
			return reasons.join("; ");
		}
		String::new()
	}

	fn collect_missing<'h>(&self, hierarchy: &'h ClassHierarchy, out: &mut BTreeSet<&'h str>) {
		match &self.kind {
			PlanKind::Subplan {
				alternatives,
				selected,
			} => {
				if alternatives.is_empty() {
					out.insert(hierarchy.full_name(self.node));
				}
				let scan = match selected.and_then(|i| alternatives.get(i)) {
					Some(chosen) => std::slice::from_ref(chosen),
					None => alternatives.as_slice(),
				};
				for alt in scan.iter().filter(|a| !a.is_feasible()) {
					alt.collect_missing(hierarchy, out);
				}
			}
			PlanKind::Constructor { args, .. } | PlanKind::Set(args) | PlanKind::List(args) => {
				for arg in args.iter().filter(|a| !a.is_feasible()) {
					arg.collect_missing(hierarchy, out);
				}
			}
			PlanKind::Instance(_) | PlanKind::Deferred => {}
		}
	}

	fn collect_ambiguities(&self, hierarchy: &ClassHierarchy, out: &mut Vec<String>) {
		match &self.kind {
			PlanKind::Subplan {
				alternatives,
				selected,
			} => match selected.and_then(|i| alternatives.get(i)) {
				Some(chosen) => chosen.collect_ambiguities(hierarchy, out),
				None if self.alternatives > 1 => {
					let options: Vec<String> = alternatives
						.iter()
						.filter(|p| p.is_feasible())
						.map(|p| p.to_shallow_string(hierarchy))
						.collect();
					out.push(format!(
						"multiple ways to inject {}: [ {} ]",
						hierarchy.full_name(self.node),
						options.join(" | ")
					));
				}
				None => {
					for alt in alternatives.iter().filter(|p| p.ambiguous) {
						alt.collect_ambiguities(hierarchy, out);
					}
				}
			},
			PlanKind::Constructor { args, .. } | PlanKind::Set(args) | PlanKind::List(args) => {
				for arg in args.iter().filter(|a| a.ambiguous) {
					arg.collect_ambiguities(hierarchy, out);
				}
			}
			PlanKind::Instance(_) | PlanKind::Deferred => {}
		}
	}

	/// One-line summary of this plan without descending into arguments.
	pub fn to_shallow_string(&self, hierarchy: &ClassHierarchy) -> String {
		let name = hierarchy.full_name(self.node);
		match &self.kind {
			PlanKind::Instance(value) => format!("{name} = {value:?}"),
			PlanKind::Constructor { def, .. } => format!("new {}{def}", def.class_name()),
			PlanKind::Subplan {
				alternatives,
				selected,
			} => match (selected, self.delegated()) {
				(Some(_), Some(chosen)) => chosen.to_shallow_string(hierarchy),
				_ if alternatives.is_empty() => format!("{name}: no alternatives"),
				_ => format!("{name}: {} alternatives", self.alternatives),
			},
			PlanKind::Set(members) => format!("{name} = set of {}", members.len()),
			PlanKind::List(elements) => format!("{name} = list of {}", elements.len()),
			PlanKind::Deferred => format!("deferred {name}"),
		}
	}

	/// Indented rendering of the whole plan tree.
	pub fn to_pretty_string(&self, hierarchy: &ClassHierarchy) -> String {
		let mut out = String::new();
		self.write_pretty(hierarchy, &mut out, 0);
		out
	}

	fn write_pretty(&self, hierarchy: &ClassHierarchy, out: &mut String, depth: usize) {
		for _ in 0..depth {
			out.push('\t');
		}
		let name = hierarchy.full_name(self.node);
		let children: &[Arc<InjectionPlan>] = match &self.kind {
			PlanKind::Instance(value) => {
				let _ = writeln!(out, "{name} = {value:?}");
				&[]
			}
			PlanKind::Constructor { def, args } => {
				let _ = writeln!(out, "new {}{def}", def.class_name());
				args
			}
			PlanKind::Subplan {
				alternatives,
				selected,
			} => {
				let _ = match selected {
					Some(i) => writeln!(out, "{name} [selected {} of {}]", i + 1, alternatives.len()),
					None => writeln!(out, "{name} [{} live]", self.alternatives),
				};
				alternatives
			}
			PlanKind::Set(members) => {
				let _ = writeln!(out, "{name} = set");
				members
			}
			PlanKind::List(elements) => {
				let _ = writeln!(out, "{name} = list");
				elements
			}
			PlanKind::Deferred => {
				let _ = writeln!(out, "deferred {name}");
				&[]
			}
		};
		for child in children {
			child.write_pretty(hierarchy, out, depth + 1);
		}
	}
}
