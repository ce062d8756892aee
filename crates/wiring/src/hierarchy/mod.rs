//! The type registry.
//!
//! # Mental Model
//!
//! A [`ClassHierarchy`] is an arena of [`Node`]s keyed by dotted path segments.
//! Index 0 is the unnamed root package. Registration asks the configured
//! [`TypeProvider`] for a declaration and then:
//!
//! 1. registers the declared superclass and interfaces,
//! 2. registers enclosing scopes (enclosing classes the provider knows about,
//!    plain packages otherwise),
//! 3. inserts the node itself and records it as a known implementation of
//!    every supertype from step 1.
//!
//! Because supertypes always exist before their implementations, the reverse
//! index of known implementations never points at a missing node.
//!
//! # Invariants
//!
//! - Names are unique within a parent; re-registering an existing name is a no-op.
//! - Namespaces and packages/classes never share a path.
//! - A namespace node targets at most one class.
//! - No class carries two constructors with the same set of argument signatures.

mod export;
mod provider;

#[cfg(test)]
mod tests;

use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

pub use export::{ExportKind, NodeExport};
pub use provider::{
	ClassDescriptor, ConstructorDescriptor, ParameterDescriptor, StaticTypeProvider, TypeDescriptor,
	TypeProvider,
};

use crate::error::{NameResolutionError, RegistrationError};
use crate::injector::INJECTOR_TYPE;
use crate::types::{
	ClassNode, ConstructorDef, DefaultValue, NamedParameterNode, NamespaceNode, Node, NodeId,
	NodeKind, is_primitive,
};

/// Hierarchical namespace of packages, namespaces, classes and named parameters.
#[derive(Clone)]
pub struct ClassHierarchy {
	provider: Arc<dyn TypeProvider>,
	nodes: Vec<Node>,
	known_impls: FxHashMap<NodeId, Vec<NodeId>>,
	short_names: FxHashMap<Box<str>, NodeId>,
}

impl fmt::Debug for ClassHierarchy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ClassHierarchy")
			.field("nodes", &self.nodes.len())
			.field("short_names", &self.short_names.len())
			.finish_non_exhaustive()
	}
}

fn split_name(name: &str) -> Result<Vec<&str>, RegistrationError> {
	let segments: Vec<&str> = name.split('.').collect();
	if segments.iter().any(|s| s.is_empty()) {
		return Err(RegistrationError::InvalidName {
			name: name.to_string(),
		});
	}
	Ok(segments)
}

impl ClassHierarchy {
	pub fn new(provider: Arc<dyn TypeProvider>) -> Self {
		let root = Node {
			name: "".into(),
			full_name: "".into(),
			parent: None,
			children: FxHashMap::default(),
			kind: NodeKind::Package,
		};
		Self {
			provider,
			nodes: vec![root],
			known_impls: FxHashMap::default(),
			short_names: FxHashMap::default(),
		}
	}

	pub fn provider(&self) -> &Arc<dyn TypeProvider> {
		&self.provider
	}

	/// Returns the node for an id issued by this hierarchy.
	///
	/// Ids are never invalidated; an id from another hierarchy may point at an
	/// unrelated node or panic.
	#[inline]
	pub fn node(&self, id: NodeId) -> &Node {
		&self.nodes[id.index()]
	}

	#[inline]
	pub fn full_name(&self, id: NodeId) -> &str {
		self.node(id).full_name()
	}

	pub fn class(&self, id: NodeId) -> Option<&ClassNode> {
		self.node(id).as_class()
	}

	pub fn parameter(&self, id: NodeId) -> Option<&NamedParameterNode> {
		self.node(id).as_parameter()
	}

	/// Number of nodes, including the root.
	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.len() == 1
	}

	/// Iterates every node id in registration order, root first.
	pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
		(0..self.nodes.len() as u32).map(NodeId)
	}

	fn child_of(&self, id: NodeId, segment: &str) -> Option<NodeId> {
		let node = self.node(id);
		node.child(segment).or_else(|| match &node.kind {
			NodeKind::Namespace(ns) => ns.target.and_then(|t| self.node(t).child(segment)),
			_ => None,
		})
	}

	/// Walks the real path of `name`, without namespace aliasing.
	fn lookup_exact(&self, name: &str) -> Option<NodeId> {
		name.split('.')
			.try_fold(NodeId::ROOT, |cur, segment| self.node(cur).child(segment))
	}

	/// Resolves a dotted name, following namespace aliases.
	pub fn resolve(&self, name: &str) -> Result<NodeId, NameResolutionError> {
		let segments: Vec<&str> = name.split('.').collect();
		let mut cur = NodeId::ROOT;
		for (i, segment) in segments.iter().enumerate() {
			match self.child_of(cur, segment) {
				Some(next) => cur = next,
				None => {
					return Err(NameResolutionError {
						name: name.to_string(),
						prefix: segments[..i].join("."),
					});
				}
			}
		}
		Ok(cur)
	}

	/// Looks up a named parameter by its short alias.
	pub fn resolve_short_name(&self, short_name: &str) -> Option<NodeId> {
		self.short_names.get(short_name).copied()
	}

	/// All short aliases with their parameters, sorted by alias.
	pub fn short_names(&self) -> Vec<(&str, NodeId)> {
		let mut out: Vec<_> = self.short_names.iter().map(|(k, v)| (&**k, *v)).collect();
		out.sort_unstable_by(|a, b| a.0.cmp(b.0));
		out
	}

	/// Registers `name` and everything it structurally depends on.
	///
	/// Idempotent: a name that is already present returns its existing id.
	/// [`INJECTOR_TYPE`] registers as a constructor-less class when the
	/// provider does not describe it.
	pub fn register(&mut self, name: &str) -> Result<NodeId, RegistrationError> {
		let mut in_progress = FxHashSet::default();
		self.register_inner(name, &mut in_progress)
	}

	fn register_inner(
		&mut self,
		name: &str,
		in_progress: &mut FxHashSet<String>,
	) -> Result<NodeId, RegistrationError> {
		let segments = split_name(name)?;
		if let Some(id) = self.lookup_exact(name) {
			return Ok(id);
		}
		if !in_progress.insert(name.to_string()) {
			return Err(RegistrationError::CyclicDeclaration {
				name: name.to_string(),
			});
		}
		let result = match self.provider.describe(name) {
			Some(TypeDescriptor::Class(class)) => {
				self.register_class(name, &segments, class, in_progress)
			}
			Some(TypeDescriptor::NamedParameter(param)) => {
				self.register_parameter(name, &segments, param, in_progress)
			}
			None if name == INJECTOR_TYPE => {
				self.register_class(name, &segments, ClassDescriptor::new(name), in_progress)
			}
			None => Err(RegistrationError::UnknownType {
				name: name.to_string(),
			}),
		};
		in_progress.remove(name);
		result
	}

	fn register_class(
		&mut self,
		name: &str,
		segments: &[&str],
		class: ClassDescriptor,
		in_progress: &mut FxHashSet<String>,
	) -> Result<NodeId, RegistrationError> {
		let mut supertypes = Vec::with_capacity(class.interfaces.len() + 1);
		if let Some(superclass) = &class.superclass {
			supertypes.push(("superclass", self.register_inner(superclass, in_progress)?));
		}
		for interface in &class.interfaces {
			supertypes.push(("interface", self.register_inner(interface, in_progress)?));
		}
		for &(role, id) in &supertypes {
			self.expect_class(name, id, role)?;
		}

		let parent = self.register_scope(name, segments, in_progress)?;

		let mut constructors: Vec<ConstructorDef> = Vec::with_capacity(class.constructors.len());
		for desc in class.constructors {
			let def = ConstructorDef::new(name, desc.args, desc.factory)?;
			if let Some(prev) = constructors.iter().find(|c| c.same_signature_set(&def)) {
				return Err(RegistrationError::DuplicateConstructor {
					class: name.to_string(),
					first: prev.to_string(),
					second: def.to_string(),
				});
			}
			constructors.push(def);
		}

		if let Some(path) = &class.namespace {
			self.check_namespace(path, name)?;
		}

		let constructor_count = constructors.len();
		let id = self.insert_child(
			parent,
			segments[segments.len() - 1],
			NodeKind::Class(ClassNode {
				constructors,
				prefix_target: class.namespace.is_some(),
				external_constructor: class.external_constructor,
				default_implementation: class.default_implementation.map(String::into_boxed_str),
			}),
		)?;

		for (_, supertype) in supertypes {
			let impls = self.known_impls.entry(supertype).or_default();
			if !impls.contains(&id) {
				impls.push(id);
			}
		}

		if let Some(path) = &class.namespace {
			self.attach_namespace(path, id)?;
		}

		debug!(class = name, constructors = constructor_count, "registered class");
		Ok(id)
	}

	fn register_parameter(
		&mut self,
		name: &str,
		segments: &[&str],
		param: ParameterDescriptor,
		in_progress: &mut FxHashSet<String>,
	) -> Result<NodeId, RegistrationError> {
		let parent = self.register_scope(name, segments, in_progress)?;

		if let Some(short) = param.short_name.as_deref()
			&& let Some(&existing) = self.short_names.get(short)
		{
			return Err(RegistrationError::ShortNameConflict {
				short_name: short.to_string(),
				existing: self.full_name(existing).to_string(),
				new: name.to_string(),
			});
		}

		let short_name = param.short_name.map(String::into_boxed_str);
		let id = self.insert_child(
			parent,
			segments[segments.len() - 1],
			NodeKind::NamedParameter(NamedParameterNode {
				arg_type: param.arg_type.into_boxed_str(),
				short_name: short_name.clone(),
				documentation: param.documentation.map(String::into_boxed_str),
				default: param.default,
			}),
		)?;
		if let Some(short) = short_name {
			self.short_names.insert(short, id);
		}

		debug!(parameter = name, "registered named parameter");
		Ok(id)
	}

	/// Ensures every enclosing segment of `name` exists and returns the direct parent.
	fn register_scope(
		&mut self,
		name: &str,
		segments: &[&str],
		in_progress: &mut FxHashSet<String>,
	) -> Result<NodeId, RegistrationError> {
		let mut parent = NodeId::ROOT;
		for depth in 1..segments.len() {
			let scope = segments[..depth].join(".");
			let id = match self.node(parent).child(segments[depth - 1]) {
				Some(id) => id,
				None => match self.provider.describe(&scope) {
					Some(TypeDescriptor::Class(_)) => self.register_inner(&scope, in_progress)?,
					_ => {
						trace!(package = %scope, "creating package");
						self.insert_child(parent, segments[depth - 1], NodeKind::Package)?
					}
				},
			};
			match &self.node(id).kind {
				NodeKind::Package | NodeKind::Class(_) => parent = id,
				NodeKind::Namespace(_) => {
					return Err(RegistrationError::NamespaceOverlap {
						name: name.to_string(),
						existing: "namespace",
					});
				}
				kind @ NodeKind::NamedParameter(_) => {
					return Err(RegistrationError::InvalidParent {
						name: name.to_string(),
						parent: scope,
						parent_kind: kind.label(),
					});
				}
			}
		}
		Ok(parent)
	}

	fn insert_child(
		&mut self,
		parent: NodeId,
		segment: &str,
		kind: NodeKind,
	) -> Result<NodeId, RegistrationError> {
		let parent_node = self.node(parent);
		let full_name = if parent == NodeId::ROOT {
			segment.to_string()
		} else {
			format!("{}.{}", parent_node.full_name, segment)
		};
		if let Some(existing) = parent_node.child(segment) {
			return Err(RegistrationError::DuplicateName {
				name: full_name,
				existing: self.node(existing).kind.label(),
			});
		}
		let id = NodeId(self.nodes.len() as u32);
		self.nodes.push(Node {
			name: segment.into(),
			full_name: full_name.into_boxed_str(),
			parent: Some(parent),
			children: FxHashMap::default(),
			kind,
		});
		self.nodes[parent.index()]
			.children
			.insert(segment.into(), id);
		Ok(id)
	}

	fn expect_class(&self, name: &str, id: NodeId, role: &'static str) -> Result<(), RegistrationError> {
		let node = self.node(id);
		match node.kind {
			NodeKind::Class(_) => Ok(()),
			ref kind => Err(RegistrationError::NotAClass {
				name: name.to_string(),
				related: node.full_name.to_string(),
				role,
				kind: kind.label(),
			}),
		}
	}

	/// Validates a namespace path without modifying the tree.
	fn check_namespace(&self, path: &str, class: &str) -> Result<(), RegistrationError> {
		let segments = split_name(path)?;
		let mut cur = Some(NodeId::ROOT);
		for (i, segment) in segments.iter().enumerate() {
			let Some(id) = cur.and_then(|c| self.node(c).child(segment)) else {
				return Ok(());
			};
			match &self.node(id).kind {
				NodeKind::Namespace(ns) => {
					if i + 1 == segments.len()
						&& let Some(existing) = ns.target
					{
						return Err(RegistrationError::NamespaceTargetConflict {
							namespace: path.to_string(),
							existing: self.full_name(existing).to_string(),
							new: class.to_string(),
						});
					}
				}
				kind => {
					return Err(RegistrationError::NamespaceOverlap {
						name: path.to_string(),
						existing: kind.label(),
					});
				}
			}
			cur = Some(id);
		}
		Ok(())
	}

	/// Creates the namespace path for `path` and points its last segment at `class`.
	fn attach_namespace(&mut self, path: &str, class: NodeId) -> Result<NodeId, RegistrationError> {
		let segments = split_name(path)?;
		let mut cur = NodeId::ROOT;
		for (i, segment) in segments.iter().enumerate() {
			let last = i + 1 == segments.len();
			let id = match self.node(cur).child(segment) {
				Some(id) => id,
				None => self.insert_child(cur, segment, NodeKind::Namespace(NamespaceNode::default()))?,
			};
			let existing_target = match &self.node(id).kind {
				NodeKind::Namespace(ns) => ns.target,
				kind => {
					return Err(RegistrationError::NamespaceOverlap {
						name: path.to_string(),
						existing: kind.label(),
					});
				}
			};
			if last {
				if let Some(existing) = existing_target {
					return Err(RegistrationError::NamespaceTargetConflict {
						namespace: path.to_string(),
						existing: self.full_name(existing).to_string(),
						new: self.full_name(class).to_string(),
					});
				}
				if let NodeKind::Namespace(ns) = &mut self.nodes[id.index()].kind {
					ns.target = Some(class);
				}
				debug!(namespace = path, target = self.full_name(class), "registered namespace");
			}
			cur = id;
		}
		Ok(cur)
	}

	/// Classes that declared `id` as superclass or interface, directly or transitively.
	///
	/// Order is breadth-first in registration order, so it is deterministic.
	pub fn known_implementations(&self, id: NodeId) -> Vec<NodeId> {
		let mut out = Vec::new();
		let mut seen = FxHashSet::default();
		seen.insert(id);
		let mut queue = VecDeque::from([id]);
		while let Some(cur) = queue.pop_front() {
			for &imp in self.direct_implementations(cur) {
				if seen.insert(imp) {
					out.push(imp);
					queue.push_back(imp);
				}
			}
		}
		out
	}

	/// Classes that declared `id` as their own superclass or interface.
	pub fn direct_implementations(&self, id: NodeId) -> &[NodeId] {
		self.known_impls.get(&id).map(Vec::as_slice).unwrap_or(&[])
	}

	/// True if `implementation` is `interface` itself or one of its known implementations.
	pub fn is_implementation(&self, interface: NodeId, implementation: NodeId) -> bool {
		interface == implementation || self.known_implementations(interface).contains(&implementation)
	}

	/// Type names referenced by registered nodes that are not registered yet.
	///
	/// Primitive value types are skipped; the parameter parser handles them.
	pub fn find_unresolved_references(&self) -> BTreeSet<String> {
		let mut unresolved = BTreeSet::new();
		let mut check = |name: &str| {
			if !is_primitive(name) && self.resolve(name).is_err() {
				unresolved.insert(name.to_string());
			}
		};
		for node in &self.nodes {
			match &node.kind {
				NodeKind::Class(class) => {
					for def in &class.constructors {
						for arg in def.args() {
							check(arg.arg_type());
							if let Some(param) = arg.parameter() {
								check(param);
							}
						}
					}
					if let Some(default) = class.default_implementation() {
						check(default);
					}
				}
				NodeKind::NamedParameter(param) => {
					check(param.arg_type());
					if let Some(DefaultValue::Type(name)) = param.default_value() {
						check(name);
					}
				}
				NodeKind::Package | NodeKind::Namespace(_) => {}
			}
		}
		unresolved
	}

	/// Registers unresolved references until none that the provider knows remain.
	///
	/// Returns how many nodes were added. References the provider cannot
	/// describe are left for the caller to report.
	pub fn register_unresolved(&mut self) -> Result<usize, RegistrationError> {
		let before = self.nodes.len();
		loop {
			let pending: Vec<String> = self
				.find_unresolved_references()
				.into_iter()
				.filter(|name| self.provider.describe(name).is_some())
				.collect();
			if pending.is_empty() {
				return Ok(self.nodes.len() - before);
			}
			for name in pending {
				self.register(&name)?;
			}
		}
	}
}
