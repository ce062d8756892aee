//! Human-readable and serializable views of the registry.

use std::fmt::Write as _;

use serde::Serialize;

use super::ClassHierarchy;
use crate::types::{DefaultValue, NodeId, NodeKind};

/// Serializable snapshot of one node and its subtree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeExport {
	pub name: String,
	pub full_name: String,
	#[serde(flatten)]
	pub kind: ExportKind,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub children: Vec<NodeExport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExportKind {
	Package,
	Namespace {
		target: Option<String>,
	},
	Class {
		constructors: Vec<String>,
		known_implementations: Vec<String>,
		#[serde(skip_serializing_if = "Option::is_none")]
		default_implementation: Option<String>,
		external_constructor: bool,
		prefix_target: bool,
	},
	NamedParameter {
		#[serde(rename = "type")]
		arg_type: String,
		#[serde(skip_serializing_if = "Option::is_none")]
		short_name: Option<String>,
		#[serde(skip_serializing_if = "Option::is_none")]
		documentation: Option<String>,
		#[serde(skip_serializing_if = "Option::is_none")]
		default: Option<String>,
	},
}

fn describe_default(default: &DefaultValue) -> String {
	match default {
		DefaultValue::Literal(literal) => format!("{literal:?}"),
		DefaultValue::Type(name) => name.clone(),
	}
}

impl ClassHierarchy {
	/// Exports the subtree rooted at `id`.
	pub fn export_node(&self, id: NodeId) -> NodeExport {
		let node = self.node(id);
		let kind = match &node.kind {
			NodeKind::Package => ExportKind::Package,
			NodeKind::Namespace(ns) => ExportKind::Namespace {
				target: ns.target.map(|t| self.full_name(t).to_string()),
			},
			NodeKind::Class(class) => ExportKind::Class {
				constructors: class.constructors.iter().map(ToString::to_string).collect(),
				known_implementations: self
					.known_implementations(id)
					.into_iter()
					.map(|i| self.full_name(i).to_string())
					.collect(),
				default_implementation: class.default_implementation().map(str::to_string),
				external_constructor: class.external_constructor,
				prefix_target: class.prefix_target,
			},
			NodeKind::NamedParameter(param) => ExportKind::NamedParameter {
				arg_type: param.arg_type().to_string(),
				short_name: param.short_name().map(str::to_string),
				documentation: param.documentation().map(str::to_string),
				default: param.default_value().map(describe_default),
			},
		};
		NodeExport {
			name: node.name().to_string(),
			full_name: node.full_name().to_string(),
			kind,
			children: node
				.children()
				.into_iter()
				.map(|(_, child)| self.export_node(child))
				.collect(),
		}
	}

	/// Exports the whole registry, starting at the root package.
	pub fn export(&self) -> NodeExport {
		self.export_node(NodeId::ROOT)
	}

	/// Renders the registry as a tab-indented tree, children sorted by name.
	pub fn to_pretty_string(&self) -> String {
		let mut out = String::new();
		for (_, child) in self.node(NodeId::ROOT).children() {
			self.write_pretty(&mut out, child, 0);
		}
		out
	}

	fn write_pretty(&self, out: &mut String, id: NodeId, depth: usize) {
		let node = self.node(id);
		for _ in 0..depth {
			out.push('\t');
		}
		let _ = match &node.kind {
			NodeKind::Package => writeln!(out, "[package {}]", node.name()),
			NodeKind::Namespace(ns) => match ns.target {
				Some(target) => writeln!(out, "[namespace {} -> {}]", node.name(), self.full_name(target)),
				None => writeln!(out, "[namespace {}]", node.name()),
			},
			NodeKind::Class(class) => {
				write!(out, "[class {}]", node.name())
					.and_then(|()| class.constructors.iter().try_for_each(|c| write!(out, " {c}")))
					.and_then(|()| writeln!(out))
			}
			NodeKind::NamedParameter(param) => match param.default_value() {
				Some(default) => writeln!(
					out,
					"[parameter {}: {} = {}]",
					node.name(),
					param.arg_type(),
					describe_default(default)
				),
				None => writeln!(out, "[parameter {}: {}]", node.name(), param.arg_type()),
			},
		};
		for (_, child) in node.children() {
			self.write_pretty(out, child, depth + 1);
		}
	}
}
