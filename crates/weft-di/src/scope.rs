//! Scope tree
//!
//! Every scope owns a store, a dependency graph and the constructors
//! registered in it. A child sees everything its ancestors provide; an
//! ancestor never sees its descendants. Locks are always taken from a scope
//! towards its ancestors, never the other way round.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex};
use rand::rngs::StdRng;
use rand::SeedableRng;
use weft_graph::find_cycle;

use crate::args::Arguments;
use crate::config::ContainerConfig;
use crate::descriptor::{ParamList, Requirement, ResultList};
use crate::error::{DiError, DiResult};
use crate::function::{Constructor, IntoConstructor, IntoInvocation};
use crate::graph::{GraphHolder, GraphView};
use crate::key::{Key, TypeInfo, Value};
use crate::location::Location;
use crate::node::{ConstructorId, ConstructorInfo, ConstructorNode};
use crate::options::{ProvideInfo, ProvideOptions};
use crate::resolve::Resolver;
use crate::store::Store;

pub(crate) struct ScopeState {
	pub(crate) store: Store,
	pub(crate) graph: GraphHolder,
	pub(crate) nodes: Vec<ConstructorNode>,
	pub(crate) verified_acyclic: bool,
	pub(crate) rng: StdRng,
}

impl ScopeState {
	fn new(rng: StdRng) -> Self {
		Self {
			store: Store::new(),
			graph: GraphHolder::new(),
			nodes: Vec::new(),
			// An empty graph has no cycle.
			verified_acyclic: true,
			rng,
		}
	}

	pub(crate) fn view(&self) -> GraphView<'_> {
		GraphView {
			holder: &self.graph,
			nodes: &self.nodes,
			store: &self.store,
		}
	}
}

pub(crate) struct ScopeInner {
	pub(crate) name: String,
	pub(crate) config: ContainerConfig,
	parent: Option<Arc<ScopeInner>>,
	children: Mutex<Vec<Weak<ScopeInner>>>,
	state: ReentrantMutex<RefCell<ScopeState>>,
}

impl ScopeInner {
	fn new(name: String, config: ContainerConfig, parent: Option<Arc<ScopeInner>>, rng: StdRng) -> Self {
		Self {
			name,
			config,
			parent,
			children: Mutex::new(Vec::new()),
			state: ReentrantMutex::new(RefCell::new(ScopeState::new(rng))),
		}
	}

	/// Parent, grandparent and so on up to the root.
	pub(crate) fn ancestors(&self) -> impl Iterator<Item = &Arc<ScopeInner>> {
		std::iter::successors(self.parent.as_ref(), |scope| scope.parent.as_ref())
	}

	/// Runs `f` with exclusive access to this scope's state.
	///
	/// Fails with [`DiError::ScopeBusy`] when the current thread is already
	/// inside this scope, e.g. from a constructor that calls back into it.
	pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut ScopeState) -> R) -> DiResult<R> {
		let guard = self.state.lock();
		let mut state = guard
			.try_borrow_mut()
			.map_err(|_| DiError::ScopeBusy(self.name.clone()))?;
		Ok(f(&mut state))
	}

	pub(crate) fn read_state<R>(&self, f: impl FnOnce(&ScopeState) -> R) -> DiResult<R> {
		let guard = self.state.lock();
		let state = guard
			.try_borrow()
			.map_err(|_| DiError::ScopeBusy(self.name.clone()))?;
		Ok(f(&state))
	}

	fn provide_locked(
		&self,
		state: &mut ScopeState,
		constructor: Constructor,
		options: &ProvideOptions,
		location: Location,
	) -> DiResult<ConstructorId> {
		options.validate()?;
		let (signature, func, function) = constructor.into_parts();
		let params = ParamList::parse(signature.params())?;
		let results = ResultList::parse(signature.results(), &options.result_options())?;

		let produced = results.produced_keys();
		if produced.is_empty() {
			return Err(DiError::NoResults { function });
		}
		results.check_unique()?;
		for (key, path) in &produced {
			if key.is_group() {
				continue;
			}
			if let Some(existing) = state.store.providers(key).first() {
				return Err(DiError::AlreadyProvided {
					key: key.clone(),
					path: path.clone(),
					existing: state.nodes[existing.index()].location().to_string(),
				});
			}
		}

		let mut keys: Vec<Key> = Vec::new();
		for (key, _) in produced {
			if !keys.contains(&key) {
				keys.push(key);
			}
		}
		let groups: Vec<Key> = params
			.requirements()
			.into_iter()
			.filter_map(|requirement| match requirement {
				Requirement::Group(group) => Some(group.key.clone()),
				Requirement::Single(_) => None,
			})
			.collect();

		let node_count = state.nodes.len();
		state.graph.snapshot();

		let id = ConstructorId::new(node_count);
		let order = state.graph.add_constructor(id);
		for key in &groups {
			state.graph.group_node(key);
		}
		state
			.nodes
			.push(ConstructorNode::new(id, location, params, results, func, order));

		let saved: Vec<(Key, Vec<ConstructorId>)> = keys
			.iter()
			.map(|key| (key.clone(), state.store.providers(key).to_vec()))
			.collect();
		for key in keys {
			state.store.register_provider(key, id);
		}
		state.verified_acyclic = false;

		if !self.config.defer_acyclic_verification {
			let view = state.view();
			if let Some(cycle) = find_cycle(&view) {
				let path = view.describe(&cycle);
				tracing::warn!(scope = %self.name, "provide rejected: dependency cycle");
				for (key, previous) in saved {
					state.store.restore_providers(key, previous);
				}
				state.graph.rollback();
				state.nodes.truncate(node_count);
				// The graph is back to its last verified shape.
				state.verified_acyclic = true;
				return Err(DiError::CycleDetected {
					context: "this function introduces a cycle",
					path,
				});
			}
			state.verified_acyclic = true;
		}

		state.graph.commit();
		Ok(id)
	}

	fn prepare_invoke(
		&self,
		state: &mut ScopeState,
		params: &ParamList,
		location: &Location,
	) -> DiResult<Arguments> {
		let mut resolver = Resolver::new(self, state, 0);
		let missing = resolver.find_missing(params)?;
		if !missing.is_empty() {
			return Err(DiError::MissingDependencies {
				location: location.clone(),
				missing,
			});
		}
		resolver.verify_path_acyclic()?;
		resolver
			.build_list(params)
			.map_err(|source| DiError::ArgumentsFailed {
				location: location.clone(),
				source: Box::new(source),
			})
	}
}

/// A node of the scope tree.
///
/// Cloning a `Scope` yields another handle to the same scope.
#[derive(Clone)]
pub struct Scope {
	inner: Arc<ScopeInner>,
}

impl Scope {
	pub(crate) fn root(config: ContainerConfig) -> Self {
		let rng = match config.seed {
			Some(seed) => StdRng::seed_from_u64(seed),
			None => StdRng::from_entropy(),
		};
		Self {
			inner: Arc::new(ScopeInner::new(String::new(), config, None, rng)),
		}
	}

	/// Name given at creation; empty for the root.
	pub fn name(&self) -> &str {
		&self.inner.name
	}

	pub fn config(&self) -> &ContainerConfig {
		&self.inner.config
	}

	pub fn is_root(&self) -> bool {
		self.inner.parent.is_none()
	}

	pub fn parent(&self) -> Option<Scope> {
		self.inner.parent.clone().map(|inner| Scope { inner })
	}

	/// Creates a child scope that inherits this scope's configuration.
	///
	/// # Examples
	///
	/// ```
	/// use weft_di::Container;
	///
	/// let container = Container::new();
	/// let request = container.scope("request");
	///
	/// assert_eq!(request.name(), "request");
	/// assert_eq!(request.path_from_root().len(), 2);
	/// ```
	pub fn scope(&self, name: impl Into<String>) -> Scope {
		let name = name.into();
		let rng = match self.inner.config.seed {
			Some(seed) => StdRng::seed_from_u64(child_seed(seed, &self.inner.name, &name)),
			None => StdRng::from_entropy(),
		};
		let child = Arc::new(ScopeInner::new(
			name,
			self.inner.config.clone(),
			Some(Arc::clone(&self.inner)),
			rng,
		));
		let mut children = self.inner.children.lock();
		children.retain(|weak| weak.strong_count() > 0);
		children.push(Arc::downgrade(&child));
		tracing::debug!(parent = %self.inner.name, child = %child.name, "scope created");
		Scope { inner: child }
	}

	/// Live child scopes, oldest first.
	pub fn children(&self) -> Vec<Scope> {
		self.inner
			.children
			.lock()
			.iter()
			.filter_map(Weak::upgrade)
			.map(|inner| Scope { inner })
			.collect()
	}

	/// This scope and its ancestors, root first.
	pub fn path_from_root(&self) -> Vec<Scope> {
		let mut path: Vec<Scope> = std::iter::once(Arc::clone(&self.inner))
			.chain(self.inner.ancestors().cloned())
			.map(|inner| Scope { inner })
			.collect();
		path.reverse();
		path
	}

	/// Registers a constructor with default options.
	#[track_caller]
	pub fn provide<M>(&self, constructor: impl IntoConstructor<M>) -> DiResult<()> {
		self.provide_with(constructor, ProvideOptions::default())
	}

	/// Registers a constructor.
	///
	/// Nothing is called here. The constructor's outputs must not already
	/// be provided in this scope, and unless cycle checks are deferred the
	/// new edges must not close a cycle. A rejected constructor leaves the
	/// scope exactly as it was.
	///
	/// # Examples
	///
	/// ```
	/// use std::convert::Infallible;
	/// use std::sync::Arc;
	/// use weft_di::{Container, ProvideOptions};
	///
	/// struct Dsn(String);
	///
	/// let container = Container::new();
	/// container
	/// 	.provide_with(
	/// 		|| -> Result<Dsn, Infallible> { Ok(Dsn("postgres://".into())) },
	/// 		ProvideOptions::new().name("primary"),
	/// 	)
	/// 	.unwrap();
	/// assert!(container.provide(|| -> Result<Dsn, Infallible> { Ok(Dsn(String::new())) }).is_ok());
	/// ```
	#[track_caller]
	pub fn provide_with<M>(
		&self,
		constructor: impl IntoConstructor<M>,
		options: ProvideOptions,
	) -> DiResult<()> {
		let caller = std::panic::Location::caller();
		let constructor = constructor.into_constructor();
		let location = match options.location_override() {
			Some(location) => location.clone(),
			None => Location::from_panic_location(constructor.function_name(), caller),
		};

		let result = self.inner.with_state(|state| {
			let id = self
				.inner
				.provide_locked(state, constructor, &options, location.clone())?;
			Ok::<_, DiError>(state.nodes[id.index()].info())
		});
		let info = match result.and_then(|inner| inner) {
			Ok(info) => info,
			Err(source) => {
				tracing::debug!(scope = %self.inner.name, constructor = %location, error = %source, "provide failed");
				return Err(DiError::Provide {
					location,
					source: Box::new(source),
				});
			}
		};

		tracing::debug!(
			scope = %self.inner.name,
			constructor = %location,
			outputs = info.outputs.len(),
			"constructor provided"
		);
		if let Some(sink) = options.info_sink() {
			sink.fill(ProvideInfo {
				id: info.id,
				inputs: info.inputs,
				outputs: info.outputs,
			});
		}
		Ok(())
	}

	/// Resolves the inputs of `function` and calls it once.
	///
	/// Errors returned by `function` itself come back as
	/// [`DiError::Invoked`]. In a dry run the function is not called.
	///
	/// # Examples
	///
	/// ```
	/// use std::convert::Infallible;
	/// use std::sync::Arc;
	/// use weft_di::Container;
	///
	/// struct Port(u16);
	///
	/// let container = Container::new();
	/// container.provide(|| -> Result<Port, Infallible> { Ok(Port(8080)) }).unwrap();
	///
	/// let mut seen = 0;
	/// container.invoke(|port: Arc<Port>| { seen = port.0; }).unwrap();
	/// assert_eq!(seen, 8080);
	/// ```
	#[track_caller]
	pub fn invoke<'a, M>(&self, function: impl IntoInvocation<'a, M>) -> DiResult<()> {
		let caller = std::panic::Location::caller();
		let (slots, func, name) = function.into_invocation().into_parts();
		let location = Location::from_panic_location(name, caller);

		let params = ParamList::parse(&slots).map_err(|source| DiError::ArgumentsFailed {
			location: location.clone(),
			source: Box::new(source),
		})?;
		let args = self
			.inner
			.with_state(|state| self.inner.prepare_invoke(state, &params, &location));
		let args = args.and_then(|inner| inner)?;

		if self.inner.config.dry_run {
			tracing::debug!(scope = %self.inner.name, function = %location, "dry run: skipping invoked function");
			return Ok(());
		}
		tracing::debug!(scope = %self.inner.name, function = %location, "invoking function");
		func(args).map_err(DiError::Invoked)
	}

	/// Cached value for `key` in this scope's own store.
	pub fn value(&self, key: &Key) -> DiResult<Option<Value>> {
		self.inner.read_state(|state| state.store.value(key).cloned())
	}

	/// Typed form of [`Scope::value`] for an unnamed key.
	pub fn get<T: Any + Send + Sync>(&self) -> DiResult<Option<Arc<T>>> {
		Ok(self
			.value(&Key::of::<T>())?
			.and_then(|value| value.downcast::<T>().ok()))
	}

	/// Members of a value group built so far in this scope, shuffled.
	pub fn group(&self, key: &Key) -> DiResult<Vec<Value>> {
		self.inner.with_state(|state| state.store.read_group(key, &mut state.rng))
	}

	/// Constructors registered in this scope for `key`.
	pub fn providers(&self, key: &Key) -> DiResult<Vec<ConstructorId>> {
		self.inner
			.read_state(|state| state.store.providers(key).to_vec())
	}

	/// Every constructor registered in this scope, in registration order.
	pub fn constructors(&self) -> DiResult<Vec<ConstructorInfo>> {
		self.inner
			.read_state(|state| state.nodes.iter().map(ConstructorNode::info).collect())
	}

	/// Types provided in this scope, sorted by name.
	pub fn known_types(&self) -> DiResult<Vec<TypeInfo>> {
		self.inner.read_state(|state| state.store.known_types())
	}

	/// Whether the graph is known to be acyclic since the last `provide`.
	pub fn is_verified_acyclic(&self) -> DiResult<bool> {
		self.inner.read_state(|state| state.verified_acyclic)
	}
}

impl PartialEq for Scope {
	fn eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.inner, &other.inner)
	}
}

impl Eq for Scope {}

impl fmt::Debug for Scope {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Scope")
			.field("name", &self.inner.name)
			.field("is_root", &self.is_root())
			.finish()
	}
}

/// Seed for a child scope, derived from the configured seed and the names
/// of the parent and child.
fn child_seed(seed: u64, parent: &str, child: &str) -> u64 {
	const PRIME: u64 = 0x0000_0100_0000_01b3;
	parent
		.bytes()
		.chain(std::iter::once(b'/'))
		.chain(child.bytes())
		.fold(seed ^ 0xcbf2_9ce4_8422_2325, |hash, byte| {
			(hash ^ u64::from(byte)).wrapping_mul(PRIME)
		})
}
