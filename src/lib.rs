//! # Weft
//!
//! An in-process object-graph resolver.
//!
//! Constructors declare what they consume and what they produce; the
//! container wires them together, calls each one at most once per scope and
//! hands the results to the functions you invoke.
//!
//! ## Feature Flags
//!
//! - `dev-tools` - Graphviz export of a scope's constructors and values
//! - `full` - All features enabled
//!
//! ## Quick Example
//!
//! ```rust
//! use std::convert::Infallible;
//! use std::sync::Arc;
//! use weft::{Container, ProvideOptions};
//!
//! struct Settings {
//! 	workers: usize,
//! }
//!
//! struct Pool {
//! 	size: usize,
//! }
//!
//! let container = Container::new();
//! container
//! 	.provide(|| -> Result<Settings, Infallible> { Ok(Settings { workers: 4 }) })
//! 	.unwrap();
//! container
//! 	.provide_with(
//! 		|settings: Arc<Settings>| -> Result<Pool, Infallible> {
//! 			Ok(Pool { size: settings.workers })
//! 		},
//! 		ProvideOptions::new().name("workers"),
//! 	)
//! 	.unwrap();
//!
//! let request = container.scope("request");
//! request
//! 	.invoke(weft::Invocation::new(
//! 		vec![weft::Slot::value::<Pool>().named("workers")],
//! 		|args| {
//! 			assert_eq!(args.get::<Pool>(0)?.size, 4);
//! 			Ok(())
//! 		},
//! 	))
//! 	.unwrap();
//! ```

// Re-export the resolver
pub use weft_di::{
	Alias, Argument, Arguments, BoxError, Constructor, ConstructorId, ConstructorInfo, Container,
	ContainerBuilder, ContainerConfig, CycleEntry, CyclePath, DEFAULT_MAX_RESOLUTION_DEPTH,
	Dependency, DiError, DiResult, DryRunValue, InputInfo, IntoConstructor, IntoInvocation,
	Invocation, InvokeOutcome, Key, Location, MissingType, Output, OutputInfo, Outputs, ParamList,
	ProvideInfo, ProvideInfoSink, ProvideOptions, Qualifier, ResultList, Scope, Signature, Slot,
	SlotKind, StagingWriter, Store, StoreWriter, TypeInfo, Value,
};

// Re-export development tools
#[cfg(feature = "dev-tools")]
pub use weft_di::visualization;
