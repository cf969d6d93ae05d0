//! Typed keys identifying bindable values

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A value stored in a scope.
pub type Value = Arc<dyn Any + Send + Sync>;

/// Runtime identity of a Rust type, with its name kept for diagnostics.
///
/// Equality and hashing only consider the [`TypeId`].
#[derive(Clone, Copy)]
pub struct TypeInfo {
	id: TypeId,
	name: &'static str,
}

impl TypeInfo {
	pub fn of<T: ?Sized + 'static>() -> Self {
		Self {
			id: TypeId::of::<T>(),
			name: std::any::type_name::<T>(),
		}
	}

	pub fn id(&self) -> TypeId {
		self.id
	}

	pub fn name(&self) -> &'static str {
		self.name
	}

	/// Whether `value` holds an instance of this type.
	pub fn matches(&self, value: &Value) -> bool {
		(**value).type_id() == self.id
	}
}

impl PartialEq for TypeInfo {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id
	}
}

impl Eq for TypeInfo {}

impl Hash for TypeInfo {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.id.hash(state);
	}
}

impl fmt::Debug for TypeInfo {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name)
	}
}

impl fmt::Display for TypeInfo {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name)
	}
}

/// The discriminator of a key. A key is named, grouped, or neither.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Qualifier {
	None,
	Name(String),
	Group(String),
}

impl Qualifier {
	/// Builds a qualifier from optional name and group strings.
	///
	/// Empty strings count as absent. Returns `None` when both are set.
	pub fn from_parts(name: Option<&str>, group: Option<&str>) -> Option<Self> {
		let name = name.filter(|n| !n.is_empty());
		let group = group.filter(|g| !g.is_empty());
		match (name, group) {
			(Some(_), Some(_)) => None,
			(Some(name), None) => Some(Self::Name(name.to_string())),
			(None, Some(group)) => Some(Self::Group(group.to_string())),
			(None, None) => Some(Self::None),
		}
	}
}

/// Unique identification of a value in a scope.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Key {
	ty: TypeInfo,
	qualifier: Qualifier,
}

impl Key {
	pub fn new(ty: TypeInfo, qualifier: Qualifier) -> Self {
		Self { ty, qualifier }
	}

	/// Key for an unnamed value of type `T`.
	///
	/// # Examples
	///
	/// ```
	/// use weft_di::Key;
	///
	/// assert_eq!(Key::of::<u32>(), Key::of::<u32>());
	/// assert_ne!(Key::of::<u32>(), Key::named::<u32>("port"));
	/// ```
	pub fn of<T: ?Sized + 'static>() -> Self {
		Self::new(TypeInfo::of::<T>(), Qualifier::None)
	}

	/// Key for the value named `name`; an empty name is the unnamed key.
	pub fn named<T: ?Sized + 'static>(name: impl Into<String>) -> Self {
		let name = name.into();
		let qualifier = if name.is_empty() {
			Qualifier::None
		} else {
			Qualifier::Name(name)
		};
		Self::new(TypeInfo::of::<T>(), qualifier)
	}

	/// Key for the value group `group` whose members have type `T`.
	///
	/// An empty group name is the unnamed key.
	pub fn grouped<T: ?Sized + 'static>(group: impl Into<String>) -> Self {
		let group = group.into();
		let qualifier = if group.is_empty() {
			Qualifier::None
		} else {
			Qualifier::Group(group)
		};
		Self::new(TypeInfo::of::<T>(), qualifier)
	}

	pub fn ty(&self) -> TypeInfo {
		self.ty
	}

	pub fn qualifier(&self) -> &Qualifier {
		&self.qualifier
	}

	pub fn name(&self) -> Option<&str> {
		match &self.qualifier {
			Qualifier::Name(name) => Some(name),
			_ => None,
		}
	}

	pub fn group(&self) -> Option<&str> {
		match &self.qualifier {
			Qualifier::Group(group) => Some(group),
			_ => None,
		}
	}

	pub fn is_group(&self) -> bool {
		matches!(self.qualifier, Qualifier::Group(_))
	}

	/// Same qualifier, different type. Used for aliases.
	pub fn with_type(&self, ty: TypeInfo) -> Self {
		Self::new(ty, self.qualifier.clone())
	}
}

impl fmt::Display for Key {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.qualifier {
			Qualifier::None => write!(f, "{}", self.ty),
			Qualifier::Name(name) => write!(f, "{}[name={:?}]", self.ty, name),
			Qualifier::Group(group) => write!(f, "{}[group={:?}]", self.ty, group),
		}
	}
}

impl fmt::Debug for Key {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(self, f)
	}
}
