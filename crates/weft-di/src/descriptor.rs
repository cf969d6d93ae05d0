//! Descriptions of what a function consumes and produces
//!
//! A [`Signature`] lists raw [`Slot`]s as a caller declares them. Providing a
//! constructor parses the slots into a [`ParamList`] and a [`ResultList`],
//! rejecting shapes the resolver cannot honour. The parsed lists drive
//! argument building, graph edges and output extraction.

use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::args::{Output, Outputs, placeholder};
use crate::error::{DiError, DiResult};
use crate::key::{Key, Qualifier, TypeInfo, Value};
use crate::options::{InputInfo, OutputInfo};
use crate::store::StoreWriter;

type Convert = Arc<dyn Fn(&Value) -> Option<Value> + Send + Sync>;

/// An extra key under which a produced value is also made available.
///
/// The conversion turns the produced value into the alias type, typically
/// coercing it into a trait object.
#[derive(Clone)]
pub struct Alias {
	source: TypeInfo,
	target: TypeInfo,
	convert: Convert,
}

impl Alias {
	/// Exposes values of type `T` as values of type `I`.
	///
	/// # Examples
	///
	/// ```
	/// use std::sync::Arc;
	/// use weft_di::Alias;
	///
	/// trait Reader: Send + Sync {}
	/// struct File;
	/// impl Reader for File {}
	///
	/// let alias = Alias::new::<File, Arc<dyn Reader>, _>(|file| file as Arc<dyn Reader>);
	/// assert_eq!(alias.target().id(), std::any::TypeId::of::<Arc<dyn Reader>>());
	/// ```
	pub fn new<T, I, F>(convert: F) -> Self
	where
		T: Any + Send + Sync,
		I: Any + Send + Sync,
		F: Fn(Arc<T>) -> I + Send + Sync + 'static,
	{
		Self {
			source: TypeInfo::of::<T>(),
			target: TypeInfo::of::<I>(),
			convert: Arc::new(move |value: &Value| {
				let typed = value.clone().downcast::<T>().ok()?;
				Some(Arc::new(convert(typed)) as Value)
			}),
		}
	}

	pub fn source(&self) -> TypeInfo {
		self.source
	}

	pub fn target(&self) -> TypeInfo {
		self.target
	}

	pub(crate) fn apply(&self, value: &Value) -> Option<Value> {
		(self.convert)(value)
	}
}

impl fmt::Debug for Alias {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Alias")
			.field("source", &self.source)
			.field("target", &self.target)
			.finish()
	}
}

/// Structural kind of a slot.
#[derive(Debug, Clone)]
pub enum SlotKind {
	Value,
	/// A `Vec<T>`; the only shape that may consume a value group
	Collection { element: TypeInfo },
	/// Parameter object: each field is resolved independently
	Aggregate(Vec<(String, Slot)>),
	/// Result object: each field is produced independently
	ResultAggregate(Vec<(String, Slot)>),
}

/// One declared input or output of a function.
#[derive(Debug, Clone)]
pub struct Slot {
	ty: TypeInfo,
	kind: SlotKind,
	name: Option<String>,
	group: Option<String>,
	optional: bool,
	flatten: bool,
	by_pointer: bool,
	aliases: Vec<Alias>,
}

impl Slot {
	fn new(ty: TypeInfo, kind: SlotKind) -> Self {
		Self {
			ty,
			kind,
			name: None,
			group: None,
			optional: false,
			flatten: false,
			by_pointer: false,
			aliases: Vec::new(),
		}
	}

	pub fn value<T: 'static>() -> Self {
		Self::new(TypeInfo::of::<T>(), SlotKind::Value)
	}

	/// A `Vec<T>` slot.
	pub fn collection<T: 'static>() -> Self {
		Self::new(
			TypeInfo::of::<Vec<T>>(),
			SlotKind::Collection {
				element: TypeInfo::of::<T>(),
			},
		)
	}

	pub fn aggregate<T, N>(fields: impl IntoIterator<Item = (N, Slot)>) -> Self
	where
		T: 'static,
		N: Into<String>,
	{
		let fields = fields.into_iter().map(|(n, s)| (n.into(), s)).collect();
		Self::new(TypeInfo::of::<T>(), SlotKind::Aggregate(fields))
	}

	pub fn result_aggregate<T, N>(fields: impl IntoIterator<Item = (N, Slot)>) -> Self
	where
		T: 'static,
		N: Into<String>,
	{
		let fields = fields.into_iter().map(|(n, s)| (n.into(), s)).collect();
		Self::new(TypeInfo::of::<T>(), SlotKind::ResultAggregate(fields))
	}

	pub fn named(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into()).filter(|n: &String| !n.is_empty());
		self
	}

	pub fn grouped(mut self, group: impl Into<String>) -> Self {
		self.group = Some(group.into()).filter(|g: &String| !g.is_empty());
		self
	}

	pub fn optional(mut self) -> Self {
		self.optional = true;
		self
	}

	/// Contributes each element of a collection result to the group.
	pub fn flatten(mut self) -> Self {
		self.flatten = true;
		self
	}

	/// Marks the slot as passed behind a pointer.
	pub fn by_pointer(mut self) -> Self {
		self.by_pointer = true;
		self
	}

	pub fn alias(mut self, alias: Alias) -> Self {
		self.aliases.push(alias);
		self
	}

	pub fn ty(&self) -> TypeInfo {
		self.ty
	}

	pub fn kind(&self) -> &SlotKind {
		&self.kind
	}
}

/// The raw inputs and outputs of a function.
#[derive(Debug, Clone, Default)]
pub struct Signature {
	params: Vec<Slot>,
	results: Vec<Slot>,
}

impl Signature {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn param(mut self, slot: Slot) -> Self {
		self.params.push(slot);
		self
	}

	pub fn result(mut self, slot: Slot) -> Self {
		self.results.push(slot);
		self
	}

	pub fn params(&self) -> &[Slot] {
		&self.params
	}

	pub fn results(&self) -> &[Slot] {
		&self.results
	}
}

fn invalid(path: &str, reason: impl Into<String>) -> DiError {
	DiError::InvalidSignature {
		path: path.to_string(),
		reason: reason.into(),
	}
}

fn field_path(parent: &str, label: &str) -> String {
	format!("{}, field {:?}", parent, label)
}

fn check_name_and_group(slot: &Slot, path: &str, verb: &str) -> DiResult<()> {
	if let (Some(name), Some(group)) = (&slot.name, &slot.group) {
		return Err(invalid(
			path,
			format!(
				"cannot use named values with value groups: name:{:?} {} with group:{:?}",
				name, verb, group
			),
		));
	}
	Ok(())
}

/// A single keyed input.
#[derive(Debug, Clone)]
pub struct ParamSingle {
	pub key: Key,
	pub optional: bool,
}

/// A value group input, delivered as a collection.
#[derive(Debug, Clone)]
pub struct ParamGroup {
	/// Element type plus group name
	pub key: Key,
	pub collection: TypeInfo,
}

/// A parameter object input.
#[derive(Debug, Clone)]
pub struct ParamObject {
	pub ty: TypeInfo,
	pub fields: Vec<(String, Param)>,
}

#[derive(Debug, Clone)]
pub enum Param {
	Single(ParamSingle),
	Object(ParamObject),
	Group(ParamGroup),
}

/// A leaf input of a parameter list, objects flattened away.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Requirement<'a> {
	Single(&'a ParamSingle),
	Group(&'a ParamGroup),
}

impl Param {
	fn parse(slot: &Slot, path: &str) -> DiResult<Self> {
		if !slot.aliases.is_empty() {
			return Err(invalid(path, "aliases are only valid on results"));
		}
		if slot.flatten {
			return Err(invalid(path, "flatten is only valid on grouped results"));
		}
		check_name_and_group(slot, path, "requested")?;

		match &slot.kind {
			SlotKind::ResultAggregate(_) => Err(invalid(
				path,
				format!("cannot depend on result object {}", slot.ty),
			)),
			SlotKind::Aggregate(fields) => {
				if slot.by_pointer {
					return Err(invalid(
						path,
						"cannot depend on a pointer to a parameter object, use a value instead",
					));
				}
				if slot.name.is_some() || slot.group.is_some() {
					return Err(invalid(path, "a parameter object cannot carry a name or group"));
				}
				if slot.optional {
					return Err(invalid(path, "a parameter object cannot be optional"));
				}
				let fields = fields
					.iter()
					.map(|(label, field)| {
						Param::parse(field, &field_path(path, label)).map(|p| (label.clone(), p))
					})
					.collect::<DiResult<Vec<_>>>()?;
				Ok(Self::Object(ParamObject {
					ty: slot.ty,
					fields,
				}))
			}
			SlotKind::Collection { element } if slot.group.is_some() => {
				if slot.optional {
					return Err(invalid(path, "value groups cannot be optional"));
				}
				let group = slot.group.clone().unwrap_or_default();
				Ok(Self::Group(ParamGroup {
					key: Key::new(*element, Qualifier::Group(group)),
					collection: slot.ty,
				}))
			}
			SlotKind::Value if slot.group.is_some() => Err(invalid(
				path,
				format!(
					"value groups may be consumed as collections only: {} is not a Vec",
					slot.ty
				),
			)),
			SlotKind::Value | SlotKind::Collection { .. } => {
				let qualifier = match &slot.name {
					Some(name) => Qualifier::Name(name.clone()),
					None => Qualifier::None,
				};
				Ok(Self::Single(ParamSingle {
					key: Key::new(slot.ty, qualifier),
					optional: slot.optional,
				}))
			}
		}
	}

	fn collect_requirements<'a>(&'a self, out: &mut Vec<Requirement<'a>>) {
		match self {
			Self::Single(single) => out.push(Requirement::Single(single)),
			Self::Group(group) => out.push(Requirement::Group(group)),
			Self::Object(object) => {
				for (_, field) in &object.fields {
					field.collect_requirements(out);
				}
			}
		}
	}
}

/// Parsed inputs of a function.
#[derive(Debug, Clone, Default)]
pub struct ParamList {
	params: Vec<Param>,
}

impl ParamList {
	pub fn parse(slots: &[Slot]) -> DiResult<Self> {
		let params = slots
			.iter()
			.enumerate()
			.map(|(i, slot)| Param::parse(slot, &format!("argument {}", i)))
			.collect::<DiResult<Vec<_>>>()?;
		Ok(Self { params })
	}

	pub fn params(&self) -> &[Param] {
		&self.params
	}

	pub(crate) fn requirements(&self) -> Vec<Requirement<'_>> {
		let mut out = Vec::new();
		for param in &self.params {
			param.collect_requirements(&mut out);
		}
		out
	}

	pub fn inputs(&self) -> Vec<InputInfo> {
		self.requirements()
			.into_iter()
			.map(|req| match req {
				Requirement::Single(single) => InputInfo::new(single.key.clone(), single.optional),
				Requirement::Group(group) => InputInfo::new(group.key.clone(), false),
			})
			.collect()
	}
}

/// Options of a provide call that apply to its top-level results.
#[derive(Debug, Clone, Default)]
pub(crate) struct ResultOptions {
	pub name: Option<String>,
	pub group: Option<String>,
	pub aliases: Vec<Alias>,
}

impl ResultOptions {
	fn is_empty(&self) -> bool {
		self.name.is_none() && self.group.is_none() && self.aliases.is_empty()
	}
}

#[derive(Debug, Clone)]
pub struct ResultSingle {
	pub key: Key,
	pub aliases: Vec<Alias>,
}

#[derive(Debug, Clone)]
pub struct ResultGrouped {
	/// Member type plus group name
	pub key: Key,
	pub flatten: bool,
}

#[derive(Debug, Clone)]
pub struct ResultObject {
	pub ty: TypeInfo,
	pub fields: Vec<(String, ResultDescriptor)>,
}

#[derive(Debug, Clone)]
pub enum ResultDescriptor {
	Single(ResultSingle),
	Grouped(ResultGrouped),
	Object(ResultObject),
}

impl ResultDescriptor {
	fn parse(slot: &Slot, path: &str, options: Option<&ResultOptions>) -> DiResult<Self> {
		if slot.optional {
			return Err(invalid(path, "results cannot be optional"));
		}
		match &slot.kind {
			SlotKind::Aggregate(_) => Err(invalid(
				path,
				format!("cannot provide parameter object {}", slot.ty),
			)),
			SlotKind::ResultAggregate(fields) => {
				if slot.by_pointer {
					return Err(invalid(
						path,
						"cannot return a pointer to a result object, use a value instead",
					));
				}
				if slot.name.is_some() || slot.group.is_some() || !slot.aliases.is_empty() {
					return Err(invalid(path, "a result object cannot be named or aliased"));
				}
				if options.is_some_and(|o| !o.is_empty()) {
					return Err(invalid(
						path,
						format!("cannot apply provide options to result object {}", slot.ty),
					));
				}
				let fields = fields
					.iter()
					.map(|(label, field)| {
						ResultDescriptor::parse(field, &field_path(path, label), None)
							.map(|r| (label.clone(), r))
					})
					.collect::<DiResult<Vec<_>>>()?;
				Ok(Self::Object(ResultObject {
					ty: slot.ty,
					fields,
				}))
			}
			SlotKind::Value | SlotKind::Collection { .. } => Self::parse_leaf(slot, path, options),
		}
	}

	fn parse_leaf(slot: &Slot, path: &str, options: Option<&ResultOptions>) -> DiResult<Self> {
		let mut merged = slot.clone();
		if let Some(options) = options {
			if options.name.is_some() {
				merged.name = options.name.clone();
			}
			if options.group.is_some() {
				merged.group = options.group.clone();
			}
			merged.aliases.extend(
				options
					.aliases
					.iter()
					.filter(|a| a.source() == slot.ty)
					.cloned(),
			);
		}
		check_name_and_group(&merged, path, "provided")?;

		if let Some(group) = merged.group {
			if !merged.aliases.is_empty() {
				return Err(invalid(path, "cannot use aliases with value groups"));
			}
			if merged.flatten {
				let SlotKind::Collection { element } = merged.kind else {
					return Err(invalid(
						path,
						format!("flatten requires a collection result, got {}", merged.ty),
					));
				};
				return Ok(Self::Grouped(ResultGrouped {
					key: Key::new(element, Qualifier::Group(group)),
					flatten: true,
				}));
			}
			return Ok(Self::Grouped(ResultGrouped {
				key: Key::new(merged.ty, Qualifier::Group(group)),
				flatten: false,
			}));
		}

		if merged.flatten {
			return Err(invalid(path, "flatten is only valid on grouped results"));
		}
		if let Some(alias) = merged.aliases.iter().find(|a| a.source() != merged.ty) {
			return Err(invalid(
				path,
				format!(
					"alias from {} does not match result type {}",
					alias.source(),
					merged.ty
				),
			));
		}
		let qualifier = match merged.name {
			Some(name) => Qualifier::Name(name),
			None => Qualifier::None,
		};
		Ok(Self::Single(ResultSingle {
			key: Key::new(merged.ty, qualifier),
			aliases: merged.aliases,
		}))
	}

	fn collect_keys(&self, path: &str, out: &mut Vec<(Key, String)>) {
		match self {
			Self::Single(single) => {
				out.push((single.key.clone(), path.to_string()));
				for alias in &single.aliases {
					out.push((single.key.with_type(alias.target()), path.to_string()));
				}
			}
			Self::Grouped(grouped) => out.push((grouped.key.clone(), path.to_string())),
			Self::Object(object) => {
				for (label, field) in &object.fields {
					field.collect_keys(&field_path(path, label), out);
				}
			}
		}
	}

	fn extract(&self, output: Output, writer: &mut dyn StoreWriter) -> Result<(), String> {
		match (self, output) {
			(Self::Single(single), Output::Value(value)) => {
				check_type(&single.key, &value)?;
				for alias in &single.aliases {
					let converted = alias.apply(&value).ok_or_else(|| {
						format!("could not convert {} to {}", single.key, alias.target())
					})?;
					writer.set_value(single.key.with_type(alias.target()), converted);
				}
				writer.set_value(single.key.clone(), value);
				Ok(())
			}
			(Self::Grouped(grouped), Output::Value(value)) if !grouped.flatten => {
				check_type(&grouped.key, &value)?;
				writer.append_group(grouped.key.clone(), value);
				Ok(())
			}
			(Self::Grouped(grouped), Output::Many(values)) if grouped.flatten => {
				for value in &values {
					check_type(&grouped.key, value)?;
				}
				for value in values {
					writer.append_group(grouped.key.clone(), value);
				}
				Ok(())
			}
			(Self::Object(object), Output::Object(outputs)) => {
				extract_all(&object.fields, outputs, writer)
			}
			(descriptor, _) => Err(format!("unexpected output shape for {}", descriptor)),
		}
	}

	fn write_placeholders(&self, writer: &mut dyn StoreWriter) {
		match self {
			Self::Single(single) => {
				for alias in &single.aliases {
					writer.set_value(single.key.with_type(alias.target()), placeholder());
				}
				writer.set_value(single.key.clone(), placeholder());
			}
			// A flattened group contributes an empty collection.
			Self::Grouped(grouped) if grouped.flatten => {}
			Self::Grouped(grouped) => writer.append_group(grouped.key.clone(), placeholder()),
			Self::Object(object) => {
				for (_, field) in &object.fields {
					field.write_placeholders(writer);
				}
			}
		}
	}
}

impl fmt::Display for ResultDescriptor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Single(single) => write!(f, "{}", single.key),
			Self::Grouped(grouped) if grouped.flatten => {
				write!(f, "flattened {}", grouped.key)
			}
			Self::Grouped(grouped) => write!(f, "{}", grouped.key),
			Self::Object(object) => write!(f, "result object {}", object.ty),
		}
	}
}

fn check_type(key: &Key, value: &Value) -> Result<(), String> {
	if key.ty().matches(value) {
		Ok(())
	} else {
		Err(format!("value for {} has a different type", key))
	}
}

fn extract_all(
	descriptors: &[(String, ResultDescriptor)],
	outputs: Outputs,
	writer: &mut dyn StoreWriter,
) -> Result<(), String> {
	let items = outputs.into_items();
	if items.len() != descriptors.len() {
		return Err(format!(
			"declared {} outputs but returned {}",
			descriptors.len(),
			items.len()
		));
	}
	for ((_, descriptor), item) in descriptors.iter().zip(items) {
		descriptor.extract(item, writer)?;
	}
	Ok(())
}

/// Parsed outputs of a constructor.
#[derive(Debug, Clone, Default)]
pub struct ResultList {
	results: Vec<(String, ResultDescriptor)>,
}

impl ResultList {
	pub(crate) fn parse(slots: &[Slot], options: &ResultOptions) -> DiResult<Self> {
		let results = slots
			.iter()
			.enumerate()
			.map(|(i, slot)| {
				let path = format!("result {}", i);
				ResultDescriptor::parse(slot, &path, Some(options)).map(|r| (path, r))
			})
			.collect::<DiResult<Vec<_>>>()?;

		// Every alias passed as an option must attach to some result.
		for alias in &options.aliases {
			let attached = results.iter().any(|(_, r)| {
				matches!(r, ResultDescriptor::Single(s) if s.key.ty() == alias.source())
			});
			if !attached {
				return Err(DiError::InvalidOption(format!(
					"alias from {} matches no result",
					alias.source()
				)));
			}
		}
		Ok(Self { results })
	}

	pub fn results(&self) -> impl Iterator<Item = &ResultDescriptor> {
		self.results.iter().map(|(_, r)| r)
	}

	/// Every key this list produces, with the path of the result producing it.
	pub fn produced_keys(&self) -> Vec<(Key, String)> {
		let mut out = Vec::new();
		for (path, result) in &self.results {
			result.collect_keys(path, &mut out);
		}
		out
	}

	/// Rejects a list that produces the same single key twice.
	pub(crate) fn check_unique(&self) -> DiResult<()> {
		let mut seen: Vec<(Key, String)> = Vec::new();
		for (key, path) in self.produced_keys() {
			if key.is_group() {
				continue;
			}
			if let Some((_, existing)) = seen.iter().find(|(k, _)| *k == key) {
				return Err(DiError::AlreadyProvided {
					key,
					path,
					existing: existing.clone(),
				});
			}
			seen.push((key, path));
		}
		Ok(())
	}

	pub fn outputs(&self) -> Vec<OutputInfo> {
		let mut unique = HashSet::new();
		self.produced_keys()
			.into_iter()
			.filter(|(key, _)| unique.insert(key.clone()))
			.map(|(key, _)| OutputInfo::new(key))
			.collect()
	}

	/// Moves `outputs` into `writer`, checking them against the declaration.
	pub(crate) fn extract(&self, outputs: Outputs, writer: &mut dyn StoreWriter) -> Result<(), String> {
		extract_all(&self.results, outputs, writer)
	}

	pub(crate) fn write_placeholders(&self, writer: &mut dyn StoreWriter) {
		for (_, result) in &self.results {
			result.write_placeholders(writer);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::store::StagingWriter;
	use crate::store::Store;
	use rstest::rstest;

	struct Db;
	struct Config;
	struct Params;
	struct Bundle;
	trait Handler: Send + Sync {}
	struct Index;
	impl Handler for Index {}

	fn reason(error: DiError) -> String {
		match error {
			DiError::InvalidSignature { path, reason } => format!("{}: {}", path, reason),
			DiError::InvalidOption(reason) => reason,
			other => panic!("unexpected error: {}", other),
		}
	}

	#[rstest]
	fn params_parse_nested_objects() {
		// Arrange
		let slots = vec![
			Slot::value::<Db>(),
			Slot::aggregate::<Params, _>([
				("config", Slot::value::<Config>().named("main")),
				("fallback", Slot::value::<Config>().optional()),
				("handlers", Slot::collection::<Index>().grouped("routes")),
			]),
		];

		// Act
		let params = ParamList::parse(&slots).unwrap();

		// Assert
		let inputs: Vec<String> = params.inputs().iter().map(ToString::to_string).collect();
		assert_eq!(inputs.len(), 4);
		assert!(inputs[1].contains("name = \"main\""));
		assert!(inputs[2].contains("optional"));
		assert!(inputs[3].contains("group = \"routes\""));
		assert!(matches!(params.params()[1], Param::Object(_)));
	}

	#[rstest]
	#[case::named_group(Slot::collection::<Db>().named("a").grouped("b"), "cannot use named values with value groups")]
	#[case::group_not_collection(Slot::value::<Db>().grouped("b"), "collections only")]
	#[case::optional_group(Slot::collection::<Db>().grouped("b").optional(), "cannot be optional")]
	#[case::flatten_param(Slot::collection::<Db>().flatten(), "flatten is only valid")]
	#[case::pointer_object(Slot::aggregate::<Params, &str>([]).by_pointer(), "pointer to a parameter object")]
	#[case::result_object(Slot::result_aggregate::<Bundle, &str>([]), "cannot depend on result object")]
	#[case::alias_param(Slot::value::<Index>().alias(Alias::new::<Index, Arc<dyn Handler>, _>(|i| i as Arc<dyn Handler>)), "aliases are only valid on results")]
	#[case::nested_field(Slot::aggregate::<Params, _>([("db", Slot::value::<Db>().grouped("x"))]), "argument 0, field \"db\"")]
	fn params_reject_invalid_shapes(#[case] slot: Slot, #[case] expected: &str) {
		// Act
		let error = ParamList::parse(&[slot]).unwrap_err();

		// Assert
		let text = reason(error);
		assert!(text.contains(expected), "{}", text);
	}

	#[rstest]
	#[case::param_object(Slot::aggregate::<Params, &str>([]), ResultOptions::default(), "cannot provide parameter object")]
	#[case::pointer_result(Slot::result_aggregate::<Bundle, &str>([]).by_pointer(), ResultOptions::default(), "pointer to a result object")]
	#[case::optional_result(Slot::value::<Db>().optional(), ResultOptions::default(), "cannot be optional")]
	#[case::flatten_single(Slot::collection::<Db>().flatten(), ResultOptions::default(), "flatten is only valid")]
	#[case::flatten_value(Slot::value::<Db>().grouped("g").flatten(), ResultOptions::default(), "flatten requires a collection")]
	#[case::option_on_object(
		Slot::result_aggregate::<Bundle, &str>([]),
		ResultOptions { name: Some("x".into()), ..Default::default() },
		"cannot apply provide options"
	)]
	#[case::name_and_group(
		Slot::value::<Db>().named("x"),
		ResultOptions { group: Some("g".into()), ..Default::default() },
		"cannot use named values with value groups"
	)]
	#[case::grouped_alias(
		Slot::value::<Index>().grouped("g").alias(Alias::new::<Index, Arc<dyn Handler>, _>(|i| i as Arc<dyn Handler>)),
		ResultOptions::default(),
		"cannot use aliases with value groups"
	)]
	#[case::unmatched_option_alias(
		Slot::value::<Db>(),
		ResultOptions { aliases: vec![Alias::new::<Index, Arc<dyn Handler>, _>(|i| i as Arc<dyn Handler>)], ..Default::default() },
		"matches no result"
	)]
	fn results_reject_invalid_shapes(
		#[case] slot: Slot,
		#[case] options: ResultOptions,
		#[case] expected: &str,
	) {
		// Act
		let error = ResultList::parse(&[slot], &options).unwrap_err();

		// Assert
		let text = reason(error);
		assert!(text.contains(expected), "{}", text);
	}

	#[rstest]
	fn options_name_top_level_results() {
		// Arrange
		let options = ResultOptions {
			name: Some("primary".into()),
			..Default::default()
		};

		// Act
		let results = ResultList::parse(&[Slot::value::<Db>()], &options).unwrap();

		// Assert
		let keys: Vec<Key> = results.produced_keys().into_iter().map(|(k, _)| k).collect();
		assert_eq!(keys, vec![Key::named::<Db>("primary")]);
	}

	#[rstest]
	fn produced_keys_include_aliases_and_object_fields() {
		// Arrange
		let slots = vec![
			Slot::value::<Index>().alias(Alias::new::<Index, Arc<dyn Handler>, _>(|i| {
				i as Arc<dyn Handler>
			})),
			Slot::result_aggregate::<Bundle, _>([
				("db", Slot::value::<Db>()),
				("config", Slot::value::<Config>().grouped("configs")),
			]),
		];

		// Act
		let results = ResultList::parse(&slots, &ResultOptions::default()).unwrap();
		let produced = results.produced_keys();

		// Assert
		let keys: Vec<&Key> = produced.iter().map(|(k, _)| k).collect();
		assert_eq!(
			keys,
			vec![
				&Key::of::<Index>(),
				&Key::of::<Arc<dyn Handler>>(),
				&Key::of::<Db>(),
				&Key::grouped::<Config>("configs"),
			]
		);
		assert_eq!(produced[2].1, "result 1, field \"db\"");
	}

	#[rstest]
	fn duplicate_keys_in_one_list_are_rejected() {
		// Arrange
		let slots = vec![Slot::value::<Db>(), Slot::value::<Db>()];
		let results = ResultList::parse(&slots, &ResultOptions::default()).unwrap();

		// Act
		let error = results.check_unique().unwrap_err();

		// Assert
		assert!(
			matches!(error, DiError::AlreadyProvided { ref path, ref existing, .. } if path == "result 1" && existing == "result 0")
		);
	}

	#[rstest]
	fn extract_writes_aliases_and_groups() {
		// Arrange
		let slots = vec![
			Slot::value::<Index>().alias(Alias::new::<Index, Arc<dyn Handler>, _>(|i| {
				i as Arc<dyn Handler>
			})),
			Slot::collection::<u8>().grouped("bytes").flatten(),
		];
		let results = ResultList::parse(&slots, &ResultOptions::default()).unwrap();
		let outputs = Outputs::single(Index).with_many(vec![1u8, 2, 3]);
		let mut store = Store::new();

		// Act
		results.extract(outputs, &mut store).unwrap();

		// Assert
		assert!(store.value(&Key::of::<Index>()).is_some());
		let handler = store.value(&Key::of::<Arc<dyn Handler>>()).unwrap();
		assert!(handler.downcast_ref::<Arc<dyn Handler>>().is_some());
		assert_eq!(store.group_len(&Key::grouped::<u8>("bytes")), 3);
	}

	#[rstest]
	fn extract_rejects_mismatched_outputs() {
		// Arrange
		let slots = vec![Slot::value::<Db>(), Slot::value::<Config>()];
		let results = ResultList::parse(&slots, &ResultOptions::default()).unwrap();
		let mut staging = StagingWriter::new();

		// Act
		let count = results.extract(Outputs::single(Db), &mut staging);
		let wrong_type = results.extract(Outputs::single(Db).with(Db), &mut StagingWriter::new());

		// Assert
		assert!(count.unwrap_err().contains("declared 2 outputs but returned 1"));
		assert!(wrong_type.unwrap_err().contains("different type"));
		assert!(staging.is_empty());
	}

	#[rstest]
	fn placeholders_skip_flattened_groups() {
		// Arrange
		let slots = vec![
			Slot::value::<Db>(),
			Slot::collection::<u8>().grouped("bytes").flatten(),
			Slot::value::<Config>().grouped("configs"),
		];
		let results = ResultList::parse(&slots, &ResultOptions::default()).unwrap();
		let mut store = Store::new();

		// Act
		results.write_placeholders(&mut store);

		// Assert
		let db = store.value(&Key::of::<Db>()).unwrap();
		assert!(db.downcast_ref::<crate::args::DryRunValue>().is_some());
		assert_eq!(store.group_len(&Key::grouped::<u8>("bytes")), 0);
		assert_eq!(store.group_len(&Key::grouped::<Config>("configs")), 1);
	}
}
