//! Argument building and constructor calls
//!
//! A [`Resolver`] works on the locked state of one scope. Single keys it
//! has no provider for are handed to the nearest ancestor that does, which
//! resolves and caches them in its own store. Value groups gather members
//! from every scope between the root and the resolving scope.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::seq::SliceRandom;
use weft_graph::find_cycle;

use crate::args::{Argument, Arguments};
use crate::descriptor::{Param, ParamGroup, ParamList, ParamSingle, Requirement};
use crate::error::{DiError, DiResult, MissingType};
use crate::key::{Key, Value};
use crate::node::ConstructorId;
use crate::scope::{ScopeInner, ScopeState};

pub(crate) struct Resolver<'s> {
	scope: &'s ScopeInner,
	state: &'s mut ScopeState,
	// Nested constructor calls above this one, across scopes
	depth: usize,
}

impl<'s> Resolver<'s> {
	pub(crate) fn new(scope: &'s ScopeInner, state: &'s mut ScopeState, depth: usize) -> Self {
		Self {
			scope,
			state,
			depth,
		}
	}

	/// Nearest ancestor with a provider for `key`.
	fn owner_of(&self, key: &Key) -> DiResult<Option<&'s Arc<ScopeInner>>> {
		for ancestor in self.scope.ancestors() {
			if ancestor.read_state(|state| state.store.has_providers(key))? {
				return Ok(Some(ancestor));
			}
		}
		Ok(None)
	}

	fn is_provided(&self, key: &Key) -> DiResult<bool> {
		if self.state.store.has_providers(key) || self.state.store.value(key).is_some() {
			return Ok(true);
		}
		Ok(self.owner_of(key)?.is_some())
	}

	/// Keys of the same type under another qualifier, anywhere on the path.
	fn suggestions(&self, key: &Key) -> DiResult<Vec<Key>> {
		let mut found: BTreeMap<String, Key> = BTreeMap::new();
		for k in similar_keys(self.state.store.provided_keys(), key) {
			found.insert(k.to_string(), k);
		}
		for ancestor in self.scope.ancestors() {
			let keys = ancestor.read_state(|state| similar_keys(state.store.provided_keys(), key))?;
			for k in keys {
				found.insert(k.to_string(), k);
			}
		}
		Ok(found.into_values().collect())
	}

	/// Required single inputs with no provider on the scope path.
	///
	/// Only the direct inputs are checked, not their own dependencies.
	pub(crate) fn find_missing(&self, params: &ParamList) -> DiResult<Vec<MissingType>> {
		let mut missing = Vec::new();
		for requirement in params.requirements() {
			let Requirement::Single(single) = requirement else {
				continue;
			};
			if single.optional || self.is_provided(&single.key)? {
				continue;
			}
			missing.push(MissingType {
				key: single.key.clone(),
				suggestions: self.suggestions(&single.key)?,
			});
		}
		Ok(missing)
	}

	/// Checks every scope from the root down to this one for cycles.
	///
	/// The result is cached per scope until its next `provide`.
	pub(crate) fn verify_path_acyclic(&mut self) -> DiResult<()> {
		let ancestors: Vec<&Arc<ScopeInner>> = self.scope.ancestors().collect();
		for ancestor in ancestors.into_iter().rev() {
			ancestor.with_state(verify_acyclic)??;
		}
		verify_acyclic(self.state)
	}

	pub(crate) fn build_list(&mut self, params: &ParamList) -> DiResult<Arguments> {
		let items = params
			.params()
			.iter()
			.map(|param| self.build(param))
			.collect::<DiResult<Vec<_>>>()?;
		Ok(Arguments::new(items))
	}

	fn build(&mut self, param: &Param) -> DiResult<Argument> {
		match param {
			Param::Single(single) => self.build_single(single),
			Param::Group(group) => self.build_group(group),
			Param::Object(object) => {
				let mut fields = Vec::with_capacity(object.fields.len());
				for (_, field) in &object.fields {
					fields.push(self.build(field)?);
				}
				Ok(Argument::Object(Arguments::new(fields)))
			}
		}
	}

	fn build_single(&mut self, single: &ParamSingle) -> DiResult<Argument> {
		if let Some(value) = self.state.store.value(&single.key) {
			tracing::trace!(key = %single.key, scope = %self.scope.name, "using cached value");
			return Ok(Argument::Value(value.clone()));
		}

		let providers = self.state.store.providers(&single.key).to_vec();
		if providers.is_empty() {
			return match self.owner_of(&single.key)? {
				Some(owner) => {
					tracing::trace!(key = %single.key, scope = %self.scope.name, owner = %owner.name, "delegating to ancestor scope");
					let depth = self.depth;
					owner.with_state(|state| Resolver::new(owner, state, depth).build_single(single))?
				}
				None if single.optional => Ok(Argument::Absent),
				None => Err(DiError::Missing(MissingType {
					key: single.key.clone(),
					suggestions: self.suggestions(&single.key)?,
				})),
			};
		}

		for id in providers {
			if let Err(error) = self.call(id) {
				// An optional input whose provider cannot be built counts as absent.
				if single.optional && matches!(error, DiError::MissingDependencies { .. }) {
					return Ok(Argument::Absent);
				}
				return Err(DiError::ParamSingleFailed {
					key: single.key.clone(),
					location: self.state.nodes[id.index()].location().clone(),
					source: Box::new(error),
				});
			}
		}

		match self.state.store.value(&single.key) {
			Some(value) => Ok(Argument::Value(value.clone())),
			None => Err(DiError::Missing(MissingType {
				key: single.key.clone(),
				suggestions: Vec::new(),
			})),
		}
	}

	fn build_group(&mut self, group: &ParamGroup) -> DiResult<Argument> {
		// Every scope on the path gets to run its contributors before a
		// failure from any of them is reported.
		let mut values = Vec::new();
		let mut first_error = None;
		let ancestors: Vec<&Arc<ScopeInner>> = self.scope.ancestors().collect();
		for ancestor in ancestors.into_iter().rev() {
			let depth = self.depth;
			let members = ancestor
				.with_state(|state| {
					Resolver::new(ancestor, state, depth).collect_local_group(&group.key)
				})
				.and_then(|members| members);
			match members {
				Ok(members) => values.extend(members),
				Err(error) => {
					first_error.get_or_insert(error);
				}
			}
		}
		match self.collect_local_group(&group.key) {
			Ok(members) => values.extend(members),
			Err(error) => {
				first_error.get_or_insert(error);
			}
		}
		if let Some(error) = first_error {
			return Err(error);
		}
		values.shuffle(&mut self.state.rng);
		Ok(Argument::Group(values))
	}

	/// Calls every local provider of a group and reads its members.
	///
	/// Every provider is attempted; the first failure is reported afterwards.
	fn collect_local_group(&mut self, key: &Key) -> DiResult<Vec<Value>> {
		let providers = self.state.store.providers(key).to_vec();
		let mut first_error = None;
		for id in providers {
			if let Err(error) = self.call(id) {
				tracing::debug!(key = %key, scope = %self.scope.name, error = %error, "group member failed");
				first_error.get_or_insert(DiError::ParamGroupFailed {
					key: key.clone(),
					location: self.state.nodes[id.index()].location().clone(),
					source: Box::new(error),
				});
			}
		}
		match first_error {
			Some(error) => Err(error),
			None => Ok(self.state.store.read_group(key, &mut self.state.rng)),
		}
	}

	/// Calls a constructor unless it already succeeded.
	pub(crate) fn call(&mut self, id: ConstructorId) -> DiResult<()> {
		if self.state.nodes[id.index()].is_called() {
			return Ok(());
		}

		let limit = self.scope.config.max_resolution_depth;
		if self.depth >= limit {
			return Err(DiError::MaxDepthExceeded(limit));
		}
		self.depth += 1;
		let result = self.call_unchecked(id);
		self.depth -= 1;
		result
	}

	fn call_unchecked(&mut self, id: ConstructorId) -> DiResult<()> {
		let node = &self.state.nodes[id.index()];
		let params = Arc::clone(node.params());
		let location = node.location().clone();

		let missing = self.find_missing(&params)?;
		if !missing.is_empty() {
			return Err(DiError::MissingDependencies { location, missing });
		}

		let args = self
			.build_list(&params)
			.map_err(|source| DiError::ArgumentsFailed {
				location: location.clone(),
				source: Box::new(source),
			})?;

		let dry_run = self.scope.config.dry_run;
		let staging = self.state.nodes[id.index()].produce(args, dry_run)?;
		staging.commit(&mut self.state.store);
		self.state.nodes[id.index()].mark_called();

		tracing::debug!(
			constructor = %location,
			scope = %self.scope.name,
			depth = self.depth,
			dry_run,
			"constructor called"
		);
		Ok(())
	}
}

fn similar_keys<'k>(keys: impl Iterator<Item = &'k Key>, key: &Key) -> Vec<Key> {
	keys.filter(|k| k.ty() == key.ty() && *k != key)
		.cloned()
		.collect()
}

fn verify_acyclic(state: &mut ScopeState) -> DiResult<()> {
	if state.verified_acyclic {
		return Ok(());
	}
	let view = state.view();
	if let Some(cycle) = find_cycle(&view) {
		return Err(DiError::CycleDetected {
			context: "cycle detected in dependency graph",
			path: view.describe(&cycle),
		});
	}
	state.verified_acyclic = true;
	Ok(())
}
