//! Configuration-driven object construction.
//!
//! A [`ClassHierarchy`] records the types a [`TypeProvider`] describes. A
//! [`Configuration`] layers bindings over it: implementations, singletons,
//! parameter values, sets and lists. [`PlanBuilder`] resolves a request into
//! an [`InjectionPlan`] that counts every viable way to build it, and an
//! [`Injector`] materializes unambiguous plans into [`Value`]s.
//!
//! ```text
//! TypeProvider -> ClassHierarchy -> ConfigurationBuilder -> Configuration
//!                                                               |
//!                                   Injector <- InjectionPlan <-+
//! ```

pub mod config;
pub mod error;
pub mod hierarchy;
pub mod injector;
pub mod parser;
pub mod plan;
pub mod types;
pub mod value;

#[cfg(test)]
mod test_fixtures;

pub use config::{BoundValue, Configuration, ConfigurationBuilder, Entry};
pub use error::{BindError, InjectionError, NameResolutionError, ParseError, RegistrationError};
pub use hierarchy::{
	ClassDescriptor, ClassHierarchy, ParameterDescriptor, StaticTypeProvider, TypeDescriptor, TypeProvider,
};
pub use injector::{Aspect, INJECTOR_TYPE, InjectionFuture, Injector};
pub use parser::{ParameterParser, ParseFn, ValueParser};
pub use plan::{InjectionPlan, InstanceLookup, NoInstances, PlanBuilder, PlanKind};
pub use types::{ConstructorArg, ConstructorDef, NodeId, NodeKind};
pub use value::{BoxError, Construct, ExternalConstructor, Factory, Object, Value};
