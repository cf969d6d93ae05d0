//! Options accepted by `provide` and the information it reports back

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::descriptor::{Alias, ResultOptions};
use crate::error::{DiError, DiResult};
use crate::key::{Key, Qualifier};
use crate::location::Location;
use crate::node::ConstructorId;

/// Modifiers for a single `provide` call.
///
/// # Examples
///
/// ```
/// use weft_di::ProvideOptions;
///
/// let options = ProvideOptions::new().name("primary");
/// assert!(options.validate().is_ok());
///
/// let conflicting = ProvideOptions::new().name("primary").group("dbs");
/// assert!(conflicting.validate().is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ProvideOptions {
	name: Option<String>,
	group: Option<String>,
	aliases: Vec<Alias>,
	location: Option<Location>,
	info: Option<ProvideInfoSink>,
}

impl ProvideOptions {
	pub fn new() -> Self {
		Self::default()
	}

	/// Names every top-level result.
	pub fn name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into()).filter(|n: &String| !n.is_empty());
		self
	}

	/// Adds every top-level result to a value group.
	pub fn group(mut self, group: impl Into<String>) -> Self {
		self.group = Some(group.into()).filter(|g: &String| !g.is_empty());
		self
	}

	/// Also exposes matching results under the alias type.
	pub fn alias(mut self, alias: Alias) -> Self {
		self.aliases.push(alias);
		self
	}

	/// Overrides the location recorded for the constructor.
	pub fn location(mut self, location: Location) -> Self {
		self.location = Some(location);
		self
	}

	/// Receives a description of the constructor once it is accepted.
	pub fn fill_info(mut self, sink: &ProvideInfoSink) -> Self {
		self.info = Some(sink.clone());
		self
	}

	pub fn validate(&self) -> DiResult<()> {
		if let (Some(name), Some(group)) = (&self.name, &self.group) {
			return Err(DiError::InvalidOption(format!(
				"cannot use named values with value groups: name:{:?} provided with group:{:?}",
				name, group
			)));
		}
		if let Some(group) = &self.group
			&& !self.aliases.is_empty()
		{
			return Err(DiError::InvalidOption(format!(
				"cannot use aliases with value groups: alias provided with group:{:?}",
				group
			)));
		}
		Ok(())
	}

	pub(crate) fn result_options(&self) -> ResultOptions {
		ResultOptions {
			name: self.name.clone(),
			group: self.group.clone(),
			aliases: self.aliases.clone(),
		}
	}

	pub(crate) fn location_override(&self) -> Option<&Location> {
		self.location.as_ref()
	}

	pub(crate) fn info_sink(&self) -> Option<&ProvideInfoSink> {
		self.info.as_ref()
	}
}

/// One input of a provided constructor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputInfo {
	key: Key,
	optional: bool,
}

impl InputInfo {
	pub(crate) fn new(key: Key, optional: bool) -> Self {
		Self { key, optional }
	}

	pub fn key(&self) -> &Key {
		&self.key
	}

	pub fn is_optional(&self) -> bool {
		self.optional
	}
}

impl fmt::Display for InputInfo {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut tags = Vec::new();
		if self.optional {
			tags.push("optional".to_string());
		}
		push_qualifier(&mut tags, self.key.qualifier());
		write_tagged(f, &self.key, &tags)
	}
}

/// One output of a provided constructor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputInfo {
	key: Key,
}

impl OutputInfo {
	pub(crate) fn new(key: Key) -> Self {
		Self { key }
	}

	pub fn key(&self) -> &Key {
		&self.key
	}
}

impl fmt::Display for OutputInfo {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut tags = Vec::new();
		push_qualifier(&mut tags, self.key.qualifier());
		write_tagged(f, &self.key, &tags)
	}
}

fn push_qualifier(tags: &mut Vec<String>, qualifier: &Qualifier) {
	match qualifier {
		Qualifier::None => {}
		Qualifier::Name(name) => tags.push(format!("name = {:?}", name)),
		Qualifier::Group(group) => tags.push(format!("group = {:?}", group)),
	}
}

fn write_tagged(f: &mut fmt::Formatter<'_>, key: &Key, tags: &[String]) -> fmt::Result {
	if tags.is_empty() {
		write!(f, "{}", key.ty())
	} else {
		write!(f, "{}[{}]", key.ty(), tags.join(", "))
	}
}

/// Description of an accepted constructor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvideInfo {
	pub id: ConstructorId,
	pub inputs: Vec<InputInfo>,
	pub outputs: Vec<OutputInfo>,
}

impl fmt::Display for ProvideInfo {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let inputs: Vec<String> = self.inputs.iter().map(ToString::to_string).collect();
		let outputs: Vec<String> = self.outputs.iter().map(ToString::to_string).collect();
		write!(
			f,
			"{}: ({}) -> ({})",
			self.id,
			inputs.join(", "),
			outputs.join(", ")
		)
	}
}

/// Shared slot that a successful `provide` fills with its [`ProvideInfo`].
#[derive(Debug, Clone, Default)]
pub struct ProvideInfoSink(Arc<Mutex<Option<ProvideInfo>>>);

impl ProvideInfoSink {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self) -> Option<ProvideInfo> {
		self.0.lock().clone()
	}

	pub(crate) fn fill(&self, info: ProvideInfo) {
		*self.0.lock() = Some(info);
	}
}
