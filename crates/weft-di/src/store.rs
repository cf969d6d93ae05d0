//! Per-scope value storage

use std::collections::HashMap;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::key::{Key, TypeInfo, Value};
use crate::node::ConstructorId;

/// Destination for values produced by a constructor.
///
/// Implemented by [`Store`] and by [`StagingWriter`], which buffers the
/// writes of a single constructor call until it has fully succeeded.
pub trait StoreWriter {
	fn set_value(&mut self, key: Key, value: Value);
	fn append_group(&mut self, key: Key, value: Value);
}

/// Values, value groups and provider registrations of one scope.
#[derive(Default)]
pub struct Store {
	providers: HashMap<Key, Vec<ConstructorId>>,
	values: HashMap<Key, Value>,
	groups: HashMap<Key, Vec<Value>>,
}

impl Store {
	pub fn new() -> Self {
		Self::default()
	}

	/// Retrieves the cached value for a non-group key.
	///
	/// # Examples
	///
	/// ```
	/// use std::sync::Arc;
	/// use weft_di::{Key, Store, StoreWriter};
	///
	/// let mut store = Store::new();
	/// store.set_value(Key::of::<u32>(), Arc::new(8080u32));
	///
	/// let value = store.value(&Key::of::<u32>()).unwrap();
	/// assert_eq!(value.downcast_ref::<u32>(), Some(&8080));
	/// ```
	pub fn value(&self, key: &Key) -> Option<&Value> {
		self.values.get(key)
	}

	/// Values collected so far for `key`, in a random order.
	pub fn read_group<R: Rng + ?Sized>(&self, key: &Key, rng: &mut R) -> Vec<Value> {
		let mut items = self.groups.get(key).cloned().unwrap_or_default();
		items.shuffle(rng);
		items
	}

	pub fn group_len(&self, key: &Key) -> usize {
		self.groups.get(key).map_or(0, Vec::len)
	}

	/// Constructors registered in this scope that produce `key`.
	pub fn providers(&self, key: &Key) -> &[ConstructorId] {
		self.providers.get(key).map_or(&[], Vec::as_slice)
	}

	pub fn has_providers(&self, key: &Key) -> bool {
		!self.providers(key).is_empty()
	}

	pub fn register_provider(&mut self, key: Key, id: ConstructorId) {
		self.providers.entry(key).or_default().push(id);
	}

	/// Puts back a provider list saved before a failed registration.
	pub(crate) fn restore_providers(&mut self, key: Key, previous: Vec<ConstructorId>) {
		if previous.is_empty() {
			self.providers.remove(&key);
		} else {
			self.providers.insert(key, previous);
		}
	}

	/// Every key with at least one provider.
	pub fn provided_keys(&self) -> impl Iterator<Item = &Key> {
		self.providers.keys()
	}

	/// Distinct types with providers, sorted by name.
	pub fn known_types(&self) -> Vec<TypeInfo> {
		let mut types: Vec<TypeInfo> = self.providers.keys().map(Key::ty).collect();
		types.sort_by(|a, b| a.name().cmp(b.name()));
		types.dedup();
		types
	}
}

impl StoreWriter for Store {
	fn set_value(&mut self, key: Key, value: Value) {
		self.values.insert(key, value);
	}

	fn append_group(&mut self, key: Key, value: Value) {
		self.groups.entry(key).or_default().push(value);
	}
}

/// Buffers the outputs of one constructor call.
///
/// Nothing reaches the store unless [`StagingWriter::commit`] is called, so
/// a failing call leaves no partial values behind.
#[derive(Default)]
pub struct StagingWriter {
	values: Vec<(Key, Value)>,
	groups: Vec<(Key, Value)>,
}

impl StagingWriter {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn is_empty(&self) -> bool {
		self.values.is_empty() && self.groups.is_empty()
	}

	pub fn commit<W: StoreWriter + ?Sized>(self, target: &mut W) {
		tracing::trace!(
			values = self.values.len(),
			group_members = self.groups.len(),
			"committing staged outputs"
		);
		for (key, value) in self.values {
			target.set_value(key, value);
		}
		for (key, value) in self.groups {
			target.append_group(key, value);
		}
	}
}

impl StoreWriter for StagingWriter {
	fn set_value(&mut self, key: Key, value: Value) {
		self.values.push((key, value));
	}

	fn append_group(&mut self, key: Key, value: Value) {
		self.groups.push((key, value));
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand::rngs::StdRng;
	use rstest::{fixture, rstest};
	use std::sync::Arc;

	#[fixture]
	fn store() -> Store {
		Store::new()
	}

	fn as_u32(value: &Value) -> u32 {
		*value.downcast_ref::<u32>().unwrap()
	}

	#[rstest]
	fn value_is_keyed_by_qualifier(mut store: Store) {
		// Arrange
		store.set_value(Key::of::<u32>(), Arc::new(1u32));
		store.set_value(Key::named::<u32>("admin"), Arc::new(2u32));

		// Act
		let plain = store.value(&Key::of::<u32>()).map(as_u32);
		let named = store.value(&Key::named::<u32>("admin")).map(as_u32);
		let other = store.value(&Key::named::<u32>("guest"));

		// Assert
		assert_eq!(plain, Some(1));
		assert_eq!(named, Some(2));
		assert!(other.is_none());
	}

	#[rstest]
	fn read_group_returns_every_member(mut store: Store) {
		// Arrange
		let key = Key::grouped::<u32>("ports");
		for port in [80u32, 443, 8080] {
			store.append_group(key.clone(), Arc::new(port));
		}
		let mut rng = StdRng::seed_from_u64(7);

		// Act
		let mut ports: Vec<u32> = store.read_group(&key, &mut rng).iter().map(as_u32).collect();

		// Assert
		ports.sort_unstable();
		assert_eq!(ports, vec![80, 443, 8080]);
		assert_eq!(store.group_len(&key), 3);
		assert!(store.read_group(&Key::grouped::<u32>("none"), &mut rng).is_empty());
	}

	#[rstest]
	fn read_group_order_follows_seed(mut store: Store) {
		// Arrange
		let key = Key::grouped::<u32>("ids");
		for id in 0u32..16 {
			store.append_group(key.clone(), Arc::new(id));
		}

		// Act
		let first: Vec<u32> = store
			.read_group(&key, &mut StdRng::seed_from_u64(42))
			.iter()
			.map(as_u32)
			.collect();
		let second: Vec<u32> = store
			.read_group(&key, &mut StdRng::seed_from_u64(42))
			.iter()
			.map(as_u32)
			.collect();

		// Assert
		assert_eq!(first, second);
	}

	#[rstest]
	fn staging_writes_nothing_until_commit(mut store: Store) {
		// Arrange
		let mut staging = StagingWriter::new();
		staging.set_value(Key::of::<u32>(), Arc::new(5u32));
		staging.append_group(Key::grouped::<u32>("g"), Arc::new(6u32));

		// Act
		let before = store.value(&Key::of::<u32>()).is_some();
		staging.commit(&mut store);

		// Assert
		assert!(!before);
		assert_eq!(store.value(&Key::of::<u32>()).map(as_u32), Some(5));
		assert_eq!(store.group_len(&Key::grouped::<u32>("g")), 1);
	}

	#[rstest]
	fn known_types_are_sorted_and_unique(mut store: Store) {
		// Arrange
		store.register_provider(Key::of::<u64>(), ConstructorId::new(0));
		store.register_provider(Key::named::<u64>("max"), ConstructorId::new(1));
		store.register_provider(Key::of::<bool>(), ConstructorId::new(2));

		// Act
		let names: Vec<&str> = store.known_types().iter().map(TypeInfo::name).collect();

		// Assert
		assert_eq!(names, vec!["bool", "u64"]);
	}

	#[rstest]
	fn restore_providers_removes_new_registrations(mut store: Store) {
		// Arrange
		let key = Key::grouped::<u32>("g");
		store.register_provider(key.clone(), ConstructorId::new(0));
		let saved = store.providers(&key).to_vec();
		store.register_provider(key.clone(), ConstructorId::new(1));

		// Act
		store.restore_providers(key.clone(), saved);
		store.restore_providers(Key::of::<u8>(), Vec::new());

		// Assert
		assert_eq!(store.providers(&key), &[ConstructorId::new(0)]);
		assert!(!store.has_providers(&Key::of::<u8>()));
	}
}
