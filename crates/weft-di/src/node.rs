//! Constructor nodes registered in a scope

use std::fmt;
use std::sync::Arc;

use crate::args::Arguments;
use crate::descriptor::{ParamList, ResultList};
use crate::error::{DiError, DiResult};
use crate::function::ConstructorFn;
use crate::location::Location;
use crate::options::{InputInfo, OutputInfo};
use crate::store::StagingWriter;

/// Identifier of a constructor, unique within its scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstructorId(usize);

impl ConstructorId {
	pub(crate) fn new(index: usize) -> Self {
		Self(index)
	}

	pub fn index(&self) -> usize {
		self.0
	}
}

impl fmt::Display for ConstructorId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "constructor #{}", self.0)
	}
}

pub(crate) struct ConstructorNode {
	id: ConstructorId,
	location: Location,
	params: Arc<ParamList>,
	results: ResultList,
	func: ConstructorFn,
	// Position in the scope's dependency graph
	order: usize,
	called: bool,
}

impl ConstructorNode {
	pub(crate) fn new(
		id: ConstructorId,
		location: Location,
		params: ParamList,
		results: ResultList,
		func: ConstructorFn,
		order: usize,
	) -> Self {
		Self {
			id,
			location,
			params: Arc::new(params),
			results,
			func,
			order,
			called: false,
		}
	}

	pub(crate) fn location(&self) -> &Location {
		&self.location
	}

	pub(crate) fn params(&self) -> &Arc<ParamList> {
		&self.params
	}

	pub(crate) fn results(&self) -> &ResultList {
		&self.results
	}

	pub(crate) fn order(&self) -> usize {
		self.order
	}

	pub(crate) fn is_called(&self) -> bool {
		self.called
	}

	pub(crate) fn mark_called(&mut self) {
		self.called = true;
	}

	/// Runs the constructor and stages its outputs.
	///
	/// A dry run skips the user function and stages placeholders instead.
	pub(crate) fn produce(&self, args: Arguments, dry_run: bool) -> DiResult<StagingWriter> {
		let mut staging = StagingWriter::new();
		if dry_run {
			self.results.write_placeholders(&mut staging);
			return Ok(staging);
		}

		let outputs = (self.func)(args).map_err(|source| DiError::ConstructorFailed {
			location: self.location.clone(),
			source,
		})?;
		self.results
			.extract(outputs, &mut staging)
			.map_err(|reason| DiError::ResultMismatch {
				location: self.location.clone(),
				reason,
			})?;
		Ok(staging)
	}

	pub(crate) fn info(&self) -> ConstructorInfo {
		ConstructorInfo {
			id: self.id,
			order: self.order,
			location: self.location.clone(),
			inputs: self.params.inputs(),
			outputs: self.results.outputs(),
			called: self.called,
		}
	}
}

/// Snapshot of a registered constructor, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructorInfo {
	pub id: ConstructorId,
	/// Position in the scope's dependency graph
	pub order: usize,
	pub location: Location,
	pub inputs: Vec<InputInfo>,
	pub outputs: Vec<OutputInfo>,
	pub called: bool,
}
