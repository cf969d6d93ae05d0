//! Values passed to and returned from user functions

use std::any::Any;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::key::Value;

/// Stand-in committed for every output when the container runs dry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DryRunValue;

pub(crate) fn placeholder() -> Value {
	Arc::new(DryRunValue)
}

/// A resolved argument, shaped like the parameter it fills.
#[derive(Clone)]
pub enum Argument {
	/// A single required or present optional value
	Value(Value),
	/// An optional value with no provider
	Absent,
	/// Every member of a value group, in random order
	Group(Vec<Value>),
	/// The fields of a parameter object, in declaration order
	Object(Arguments),
}

/// Positional arguments for a constructor or invoked function.
#[derive(Clone, Default)]
pub struct Arguments {
	items: Vec<Argument>,
}

impl Arguments {
	pub fn new(items: Vec<Argument>) -> Self {
		Self { items }
	}

	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	pub fn raw(&self, index: usize) -> Option<&Argument> {
		self.items.get(index)
	}

	fn slot(&self, index: usize) -> DiResult<&Argument> {
		self.items.get(index).ok_or_else(|| DiError::Argument {
			index,
			reason: format!("only {} arguments were resolved", self.items.len()),
		})
	}

	/// Reads a required argument.
	///
	/// # Examples
	///
	/// ```
	/// use std::sync::Arc;
	/// use weft_di::{Argument, Arguments};
	///
	/// let args = Arguments::new(vec![Argument::Value(Arc::new(3u8))]);
	/// assert_eq!(*args.get::<u8>(0).unwrap(), 3);
	/// assert!(args.get::<u16>(0).is_err());
	/// ```
	pub fn get<T: Any + Send + Sync>(&self, index: usize) -> DiResult<Arc<T>> {
		match self.get_optional::<T>(index)? {
			Some(value) => Ok(value),
			None => Err(DiError::Argument {
				index,
				reason: format!("no value for {}", std::any::type_name::<T>()),
			}),
		}
	}

	/// Reads an optional argument. `None` means no provider existed.
	pub fn get_optional<T: Any + Send + Sync>(&self, index: usize) -> DiResult<Option<Arc<T>>> {
		match self.slot(index)? {
			Argument::Value(value) => downcast::<T>(value, index).map(Some),
			Argument::Absent => Ok(None),
			_ => Err(shape(index, "a single value")),
		}
	}

	/// Reads a value group argument.
	pub fn group<T: Any + Send + Sync>(&self, index: usize) -> DiResult<Vec<Arc<T>>> {
		match self.slot(index)? {
			Argument::Group(values) => values.iter().map(|v| downcast::<T>(v, index)).collect(),
			_ => Err(shape(index, "a value group")),
		}
	}

	/// Reads the fields of a parameter object argument.
	pub fn object(&self, index: usize) -> DiResult<&Arguments> {
		match self.slot(index)? {
			Argument::Object(fields) => Ok(fields),
			_ => Err(shape(index, "a parameter object")),
		}
	}
}

fn downcast<T: Any + Send + Sync>(value: &Value, index: usize) -> DiResult<Arc<T>> {
	value.clone().downcast::<T>().map_err(|_| DiError::Argument {
		index,
		reason: format!("value is not a {}", std::any::type_name::<T>()),
	})
}

fn shape(index: usize, expected: &str) -> DiError {
	DiError::Argument {
		index,
		reason: format!("expected {}", expected),
	}
}

/// One declared output of a constructor.
pub enum Output {
	Value(Value),
	/// Members contributed to a flattened value group
	Many(Vec<Value>),
	/// Fields of a result object, in declaration order
	Object(Outputs),
}

/// Positional outputs returned by a constructor.
#[derive(Default)]
pub struct Outputs {
	items: Vec<Output>,
}

impl Outputs {
	pub fn new() -> Self {
		Self::default()
	}

	/// Outputs holding a single value.
	pub fn single<T: Any + Send + Sync>(value: T) -> Self {
		Self::new().with(value)
	}

	pub fn with<T: Any + Send + Sync>(self, value: T) -> Self {
		self.with_value(Arc::new(value))
	}

	pub fn with_value(mut self, value: Value) -> Self {
		self.items.push(Output::Value(value));
		self
	}

	/// Adds the members of a flattened group output.
	pub fn with_many<T: Any + Send + Sync>(mut self, values: impl IntoIterator<Item = T>) -> Self {
		let values = values.into_iter().map(|v| Arc::new(v) as Value).collect();
		self.items.push(Output::Many(values));
		self
	}

	/// Adds a result object.
	pub fn with_object(mut self, fields: Outputs) -> Self {
		self.items.push(Output::Object(fields));
		self
	}

	pub fn push(&mut self, output: Output) {
		self.items.push(output);
	}

	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	pub(crate) fn into_items(self) -> Vec<Output> {
		self.items
	}
}
