//! Error types for providing and resolving values

use std::error::Error as StdError;
use std::fmt;

use crate::key::Key;
use crate::location::Location;

/// Boxed error returned by user constructors and invoked functions.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Result type for container operations.
pub type DiResult<T> = Result<T, DiError>;

/// Errors produced while providing constructors or resolving values.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DiError {
	/// A constructor was rejected by `provide`
	#[error("cannot provide function {location}: {source}")]
	Provide {
		location: Location,
		#[source]
		source: Box<DiError>,
	},

	/// Conflicting provide options
	#[error("invalid provide options: {0}")]
	InvalidOption(String),

	/// A slot of a signature violates a structural rule
	#[error("bad {path}: {reason}")]
	InvalidSignature { path: String, reason: String },

	/// The constructor declares nothing to produce
	#[error("{function} must provide at least one value")]
	NoResults { function: String },

	/// A produced key already has a provider in the same scope
	#[error("cannot provide {key} from {path}: already provided by {existing}")]
	AlreadyProvided {
		key: Key,
		path: String,
		existing: String,
	},

	/// The dependency graph contains a cycle
	#[error("{context}: {path}")]
	CycleDetected {
		context: &'static str,
		path: CyclePath,
	},

	/// Required inputs have no provider anywhere on the scope path
	#[error(
		"missing dependencies for function {location}: {}",
		MissingType::join(.missing)
	)]
	MissingDependencies {
		location: Location,
		missing: Vec<MissingType>,
	},

	/// A key disappeared between the dependency check and resolution
	#[error("{0}")]
	Missing(MissingType),

	/// Building the arguments of a function failed
	#[error("could not build arguments for function {location}: {source}")]
	ArgumentsFailed {
		location: Location,
		#[source]
		source: Box<DiError>,
	},

	/// The provider of a single value failed
	#[error("failed to build {key}: {source}")]
	ParamSingleFailed {
		key: Key,
		location: Location,
		#[source]
		source: Box<DiError>,
	},

	/// A provider contributing to a value group failed
	#[error("could not build value group {key}: {source}")]
	ParamGroupFailed {
		key: Key,
		location: Location,
		#[source]
		source: Box<DiError>,
	},

	/// A user constructor returned an error
	#[error("received error from function {location}: {source}")]
	ConstructorFailed {
		location: Location,
		#[source]
		source: BoxError,
	},

	/// A constructor's outputs do not match what it declared
	#[error("function {location} returned outputs that do not match its declaration: {reason}")]
	ResultMismatch { location: Location, reason: String },

	/// An argument was read as the wrong shape or type
	#[error("argument {index}: {reason}")]
	Argument { index: usize, reason: String },

	/// Nested constructor calls went deeper than the configured limit
	#[error("maximum resolution depth exceeded: {0}")]
	MaxDepthExceeded(usize),

	/// The scope is already in the middle of an operation on this thread
	#[error("scope {0:?} is busy: re-entrant use from inside a constructor is not supported")]
	ScopeBusy(String),

	/// The invoked function itself returned an error
	#[error(transparent)]
	Invoked(BoxError),
}

impl DiError {
	/// The innermost container error, skipping wrappers that only add context.
	pub fn innermost(&self) -> &DiError {
		let mut current = self;
		loop {
			match current {
				Self::Provide { source, .. }
				| Self::ArgumentsFailed { source, .. }
				| Self::ParamSingleFailed { source, .. }
				| Self::ParamGroupFailed { source, .. } => current = &**source,
				_ => return current,
			}
		}
	}

	/// The last error in the `source()` chain.
	pub fn root_cause(&self) -> &(dyn StdError + 'static) {
		let mut current: &(dyn StdError + 'static) = self;
		while let Some(next) = current.source() {
			current = next;
		}
		current
	}

	pub fn is_cycle_detected(&self) -> bool {
		matches!(self.innermost(), Self::CycleDetected { .. })
	}

	pub fn is_missing_dependencies(&self) -> bool {
		matches!(
			self.innermost(),
			Self::MissingDependencies { .. } | Self::Missing(_)
		)
	}

	/// Locations of every function named along the wrapper chain.
	pub fn locations(&self) -> Vec<&Location> {
		let mut found = Vec::new();
		let mut current = self;
		loop {
			match current {
				Self::Provide { location, source }
				| Self::ArgumentsFailed { location, source }
				| Self::ParamSingleFailed {
					location, source, ..
				}
				| Self::ParamGroupFailed {
					location, source, ..
				} => {
					found.push(location);
					current = &**source;
				}
				Self::MissingDependencies { location, .. }
				| Self::ConstructorFailed { location, .. }
				| Self::ResultMismatch { location, .. } => {
					found.push(location);
					return found;
				}
				_ => return found,
			}
		}
	}
}

/// A required key that no scope on the path provides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingType {
	pub key: Key,
	/// Keys of the same type under a different qualifier.
	pub suggestions: Vec<Key>,
}

impl MissingType {
	fn join(missing: &[MissingType]) -> String {
		missing
			.iter()
			.map(ToString::to_string)
			.collect::<Vec<_>>()
			.join("; ")
	}
}

impl fmt::Display for MissingType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "missing type: {}", self.key)?;
		if !self.suggestions.is_empty() {
			let hints: Vec<String> = self.suggestions.iter().map(ToString::to_string).collect();
			write!(f, " (did you mean {}?)", hints.join(", "))?;
		}
		Ok(())
	}
}

/// One hop of a dependency cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleEntry {
	pub key: Key,
	/// Constructor providing `key`, absent for value group nodes.
	pub location: Option<Location>,
}

impl fmt::Display for CycleEntry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.location {
			Some(location) => write!(f, "{} provided by {}", self.key, location),
			None => write!(f, "{} (value group)", self.key),
		}
	}
}

/// The hops of a cycle, first and last entry being the same node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CyclePath(pub Vec<CycleEntry>);

impl CyclePath {
	pub fn entries(&self) -> &[CycleEntry] {
		&self.0
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl fmt::Display for CyclePath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (i, entry) in self.0.iter().enumerate() {
			if i == 0 {
				write!(f, "\n\t{}", entry)?;
			} else {
				write!(f, "\n\tdepends on {}", entry)?;
			}
		}
		Ok(())
	}
}
