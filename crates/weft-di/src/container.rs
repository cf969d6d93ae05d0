//! Root of a scope tree

use std::ops::Deref;

use crate::config::ContainerConfig;
use crate::scope::Scope;

/// Owns the root scope. Dereferences to it, so every [`Scope`] operation is
/// available directly on the container.
///
/// # Examples
///
/// ```
/// use weft_di::Container;
///
/// let container = Container::builder()
/// 	.defer_acyclic_verification(true)
/// 	.seed(42)
/// 	.build();
///
/// assert!(container.is_root());
/// assert_eq!(container.config().seed, Some(42));
/// ```
#[derive(Clone, Debug)]
pub struct Container {
	root: Scope,
}

impl Container {
	pub fn new() -> Self {
		Self::with_config(ContainerConfig::default())
	}

	pub fn with_config(config: ContainerConfig) -> Self {
		tracing::debug!(?config, "container created");
		Self {
			root: Scope::root(config),
		}
	}

	pub fn builder() -> ContainerBuilder {
		ContainerBuilder::default()
	}

	pub fn root(&self) -> &Scope {
		&self.root
	}
}

impl Default for Container {
	fn default() -> Self {
		Self::new()
	}
}

impl Deref for Container {
	type Target = Scope;

	fn deref(&self) -> &Self::Target {
		&self.root
	}
}

/// Builder for [`Container`].
#[derive(Debug, Clone, Default)]
pub struct ContainerBuilder {
	config: ContainerConfig,
}

impl ContainerBuilder {
	/// Postpones cycle detection from every `provide` to the first `invoke`.
	pub fn defer_acyclic_verification(mut self, defer: bool) -> Self {
		self.config.defer_acyclic_verification = defer;
		self
	}

	/// Resolves everything without calling user functions.
	pub fn dry_run(mut self, dry_run: bool) -> Self {
		self.config.dry_run = dry_run;
		self
	}

	pub fn max_resolution_depth(mut self, depth: usize) -> Self {
		self.config.max_resolution_depth = depth;
		self
	}

	/// Makes value group order reproducible.
	pub fn seed(mut self, seed: u64) -> Self {
		self.config.seed = Some(seed);
		self
	}

	/// Replaces every setting at once.
	pub fn config(mut self, config: ContainerConfig) -> Self {
		self.config = config;
		self
	}

	pub fn build(self) -> Container {
		Container::with_config(self.config)
	}
}
