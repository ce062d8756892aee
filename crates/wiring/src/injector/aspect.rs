use std::sync::Arc;

use crate::types::ConstructorDef;
use crate::value::{BoxError, Construct, Value};

/// Construction interception hook.
///
/// When bound to an engine, every constructor call goes through
/// [`inject`](Aspect::inject) instead of invoking the factory directly.
/// Implementations usually wrap `def.factory().call(args)`.
pub trait Aspect: Send + Sync {
	fn inject(&self, def: &ConstructorDef, args: Vec<Value>) -> Result<Construct, BoxError>;

	/// The aspect carried over to a forked engine.
	fn create_child(&self) -> Arc<dyn Aspect>;
}
