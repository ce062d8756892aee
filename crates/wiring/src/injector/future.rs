use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use super::{Injector, InjectorInner};
use crate::error::{InjectionError, Result};
use crate::types::NodeId;
use crate::value::Value;

struct FutureInner {
	injector: Weak<InjectorInner>,
	node: NodeId,
	name: Box<str>,
	value: OnceLock<Value>,
}

/// Lazy handle standing in for a deferred constructor argument.
///
/// The handle refers to the engine that created it, not to a value. The
/// first [`get`](Self::get) resolves the target against that engine; later
/// calls return the memoized value.
#[derive(Clone)]
pub struct InjectionFuture {
	inner: Arc<FutureInner>,
}

impl InjectionFuture {
	pub(crate) fn new(injector: Weak<InjectorInner>, node: NodeId, name: &str) -> Self {
		Self {
			inner: Arc::new(FutureInner {
				injector,
				node,
				name: name.into(),
				value: OnceLock::new(),
			}),
		}
	}

	/// Full name of the deferred node.
	pub fn name(&self) -> &str {
		&self.inner.name
	}

	pub fn node(&self) -> NodeId {
		self.inner.node
	}

	pub fn is_resolved(&self) -> bool {
		self.inner.value.get().is_some()
	}

	/// Resolves the target, building it on first use.
	pub fn get(&self) -> Result<Value> {
		if let Some(value) = self.inner.value.get() {
			return Ok(value.clone());
		}
		let inner = self.inner.injector.upgrade().ok_or_else(|| InjectionError::InjectorDropped {
			name: self.name().to_string(),
		})?;
		let value = Injector::from_inner(inner).get_node_instance(self.inner.node)?;
		Ok(self.inner.value.get_or_init(|| value).clone())
	}

	pub fn ptr_eq(&self, other: &InjectionFuture) -> bool {
		Arc::ptr_eq(&self.inner, &other.inner)
	}
}

impl fmt::Debug for InjectionFuture {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("InjectionFuture")
			.field("name", &self.inner.name)
			.field("resolved", &self.is_resolved())
			.finish()
	}
}
