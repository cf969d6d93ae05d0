//! # Weft Dependency Injection
//!
//! An in-process object-graph resolver. Constructors are registered with a
//! container, their inputs and outputs described by typed keys; values are
//! built lazily, at most once per scope, when a function is invoked.
//!
//! ## Features
//!
//! - **Typed keys**: a value is identified by its type plus an optional name
//! - **Value groups**: many constructors may contribute to one collection
//! - **Parameter and result objects**: bundle inputs or outputs into one slot
//! - **Cycle detection**: on every `provide`, or deferred to the first `invoke`
//! - **Scopes**: child scopes see their ancestors' values and may shadow them
//! - **Atomic registration**: a rejected `provide` leaves no trace
//! - **Dry runs**: check that a graph resolves without running any constructor
//!
//! ## Development Tools (dev-tools feature)
//!
//! - **Visualization**: render a scope's constructors in DOT format for Graphviz
//!
//! ## Example
//!
//! ```rust
//! use std::convert::Infallible;
//! use std::sync::Arc;
//! use weft_di::Container;
//!
//! struct Config {
//! 	dsn: String,
//! }
//!
//! struct Database {
//! 	dsn: String,
//! }
//!
//! let container = Container::new();
//! container
//! 	.provide(|| -> Result<Config, Infallible> {
//! 		Ok(Config { dsn: "postgres://localhost".into() })
//! 	})
//! 	.unwrap();
//! container
//! 	.provide(|config: Arc<Config>| -> Result<Database, Infallible> {
//! 		Ok(Database { dsn: config.dsn.clone() })
//! 	})
//! 	.unwrap();
//!
//! container
//! 	.invoke(|db: Arc<Database>| {
//! 		assert_eq!(db.dsn, "postgres://localhost");
//! 	})
//! 	.unwrap();
//! ```

pub mod args;
pub mod config;
pub mod container;
pub mod descriptor;
pub mod error;
pub mod function;
mod graph;
pub mod key;
pub mod location;
pub mod node;
pub mod options;
mod resolve;
pub mod scope;
pub mod store;

#[cfg(feature = "dev-tools")]
pub mod visualization;

pub use args::{Argument, Arguments, DryRunValue, Output, Outputs};
pub use config::{ContainerConfig, DEFAULT_MAX_RESOLUTION_DEPTH};
pub use container::{Container, ContainerBuilder};
pub use descriptor::{Alias, ParamList, ResultList, Signature, Slot, SlotKind};
pub use error::{BoxError, CycleEntry, CyclePath, DiError, DiResult, MissingType};
pub use function::{
	Constructor, Dependency, IntoConstructor, IntoInvocation, Invocation, InvokeOutcome,
};
pub use key::{Key, Qualifier, TypeInfo, Value};
pub use location::Location;
pub use node::{ConstructorId, ConstructorInfo};
pub use options::{InputInfo, OutputInfo, ProvideInfo, ProvideInfoSink, ProvideOptions};
pub use scope::Scope;
pub use store::{StagingWriter, Store, StoreWriter};
