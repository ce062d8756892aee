//! Registry node types.
//!
//! Nodes live in the [`crate::ClassHierarchy`] arena and are addressed by
//! [`NodeId`]. Cross-node relations (parents, children, namespace targets,
//! known implementations) are stored as ids, never as references.

mod constructor;

use rustc_hash::FxHashMap;

pub use constructor::{ConstructorArg, ConstructorDef};

/// Value types handled directly by the parameter parser.
///
/// These never need a registry node.
pub const PRIMITIVE_TYPES: &[&str] = &[
	"bool", "char", "String", "str", "i8", "i16", "i32", "i64", "isize", "u8", "u16", "u32", "u64",
	"usize", "f32", "f64",
];

/// Returns true if `name` is handled by the builtin parser.
pub fn is_primitive(name: &str) -> bool {
	PRIMITIVE_TYPES.contains(&name)
}

/// Stable arena index of a registry node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
	/// The unnamed root package.
	pub const ROOT: NodeId = NodeId(0);

	#[inline]
	pub(crate) fn index(self) -> usize {
		self.0 as usize
	}
}

/// An entry in the type registry.
#[derive(Debug, Clone)]
pub struct Node {
	pub(crate) name: Box<str>,
	pub(crate) full_name: Box<str>,
	pub(crate) parent: Option<NodeId>,
	pub(crate) children: FxHashMap<Box<str>, NodeId>,
	pub(crate) kind: NodeKind,
}

impl Node {
	/// Local name segment.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Dotted path from the root.
	pub fn full_name(&self) -> &str {
		&self.full_name
	}

	pub fn parent(&self) -> Option<NodeId> {
		self.parent
	}

	pub fn kind(&self) -> &NodeKind {
		&self.kind
	}

	/// Looks up a direct child by local name.
	pub fn child(&self, name: &str) -> Option<NodeId> {
		self.children.get(name).copied()
	}

	/// Direct children sorted by local name.
	pub fn children(&self) -> Vec<(&str, NodeId)> {
		let mut out: Vec<_> = self.children.iter().map(|(k, v)| (&**k, *v)).collect();
		out.sort_unstable_by(|a, b| a.0.cmp(b.0));
		out
	}

	pub fn as_class(&self) -> Option<&ClassNode> {
		match &self.kind {
			NodeKind::Class(c) => Some(c),
			_ => None,
		}
	}

	pub fn as_parameter(&self) -> Option<&NamedParameterNode> {
		match &self.kind {
			NodeKind::NamedParameter(p) => Some(p),
			_ => None,
		}
	}

	pub fn as_namespace(&self) -> Option<&NamespaceNode> {
		match &self.kind {
			NodeKind::Namespace(n) => Some(n),
			_ => None,
		}
	}
}

/// The variants a registry node can take.
#[derive(Debug, Clone)]
pub enum NodeKind {
	Package,
	Namespace(NamespaceNode),
	Class(ClassNode),
	NamedParameter(NamedParameterNode),
}

impl NodeKind {
	pub fn label(&self) -> &'static str {
		match self {
			NodeKind::Package => "package",
			NodeKind::Namespace(_) => "namespace",
			NodeKind::Class(_) => "class",
			NodeKind::NamedParameter(_) => "named parameter",
		}
	}
}

/// Alias path pointing at a prefix-target class.
#[derive(Debug, Clone, Default)]
pub struct NamespaceNode {
	pub(crate) target: Option<NodeId>,
}

impl NamespaceNode {
	pub fn target(&self) -> Option<NodeId> {
		self.target
	}
}

/// A constructible (or abstract) type.
#[derive(Debug, Clone, Default)]
pub struct ClassNode {
	pub(crate) constructors: Vec<ConstructorDef>,
	pub(crate) prefix_target: bool,
	pub(crate) external_constructor: bool,
	pub(crate) default_implementation: Option<Box<str>>,
}

impl ClassNode {
	/// Constructors eligible for injection.
	pub fn constructors(&self) -> &[ConstructorDef] {
		&self.constructors
	}

	/// True if a namespace path targets this class.
	pub fn is_prefix_target(&self) -> bool {
		self.prefix_target
	}

	/// True if instances of this class produce instances of another class.
	pub fn is_external_constructor(&self) -> bool {
		self.external_constructor
	}

	/// True if at least one constructor is eligible for injection.
	pub fn is_injection_candidate(&self) -> bool {
		!self.constructors.is_empty()
	}

	/// Declared fallback implementation, by full name.
	pub fn default_implementation(&self) -> Option<&str> {
		self.default_implementation.as_deref()
	}
}

/// Declared default of a named parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultValue {
	/// Literal handed to the value parser.
	Literal(String),
	/// Full name of a type to construct.
	Type(String),
}

/// A named, typed configuration slot.
#[derive(Debug, Clone)]
pub struct NamedParameterNode {
	pub(crate) arg_type: Box<str>,
	pub(crate) short_name: Option<Box<str>>,
	pub(crate) documentation: Option<Box<str>>,
	pub(crate) default: Option<DefaultValue>,
}

impl NamedParameterNode {
	/// The declared value type, e.g. `i64` or a class name.
	pub fn arg_type(&self) -> &str {
		&self.arg_type
	}

	pub fn short_name(&self) -> Option<&str> {
		self.short_name.as_deref()
	}

	pub fn documentation(&self) -> Option<&str> {
		self.documentation.as_deref()
	}

	pub fn default_value(&self) -> Option<&DefaultValue> {
		self.default.as_ref()
	}
}
