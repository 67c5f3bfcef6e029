use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{Error, Provider};

/// A collection held by a provider that is edited in place.
///
/// Every edit clones the current collection, applies the change and stores
/// the result with `set()`, so dependents see it like any other write.
/// Edits made through clones of the same handle are serialized; a plain
/// `set()` on the provider still competes with them by state.
pub struct Observed<C> {
	provider: Provider<C>,
	edit: Arc<Mutex<()>>,
}

impl<C> Clone for Observed<C> {
	fn clone(&self) -> Self {
		Observed {
			provider: self.provider.clone(),
			edit: self.edit.clone(),
		}
	}
}

impl<C> Observed<C>
where
	C: Clone + Send + Sync + 'static,
{
	pub fn provider(&self) -> &Provider<C> {
		&self.provider
	}

	pub fn get(&self) -> C {
		self.provider.get()
	}

	pub fn modify<R>(&self, func: impl FnOnce(&mut C) -> R) -> Result<R, Error> {
		let _edit = self.edit.lock();
		let mut value = self.provider.get();
		let result = func(&mut value);
		self.provider.set(value)?;
		Ok(result)
	}
}

impl<T> Observed<Vec<T>>
where
	T: Clone + Send + Sync + 'static,
{
	pub fn push(&self, item: T) -> Result<(), Error> {
		self.modify(|items| items.push(item))
	}

	pub fn insert(&self, index: usize, item: T) -> Result<(), Error> {
		self.modify(|items| items.insert(index, item))
	}

	pub fn remove(&self, index: usize) -> Result<T, Error> {
		self.modify(|items| items.remove(index))
	}

	pub fn pop(&self) -> Result<Option<T>, Error> {
		self.modify(|items| items.pop())
	}

	pub fn retain(&self, keep: impl FnMut(&T) -> bool) -> Result<(), Error> {
		self.modify(|items| items.retain(keep))
	}

	pub fn clear(&self) -> Result<(), Error> {
		self.modify(|items| items.clear())
	}
}

impl<K, V, S> Observed<HashMap<K, V, S>>
where
	K: Eq + Hash + Clone + Send + Sync + 'static,
	V: Clone + Send + Sync + 'static,
	S: BuildHasher + Clone + Send + Sync + 'static,
{
	pub fn insert(&self, key: K, value: V) -> Result<Option<V>, Error> {
		self.modify(|map| map.insert(key, value))
	}

	pub fn remove(&self, key: &K) -> Result<Option<V>, Error> {
		self.modify(|map| map.remove(key))
	}

	pub fn clear(&self) -> Result<(), Error> {
		self.modify(|map| map.clear())
	}
}

impl<K, V> Observed<BTreeMap<K, V>>
where
	K: Ord + Clone + Send + Sync + 'static,
	V: Clone + Send + Sync + 'static,
{
	pub fn insert(&self, key: K, value: V) -> Result<Option<V>, Error> {
		self.modify(|map| map.insert(key, value))
	}

	pub fn remove(&self, key: &K) -> Result<Option<V>, Error> {
		self.modify(|map| map.remove(key))
	}

	pub fn clear(&self) -> Result<(), Error> {
		self.modify(|map| map.clear())
	}
}

impl<T, S> Observed<HashSet<T, S>>
where
	T: Eq + Hash + Clone + Send + Sync + 'static,
	S: BuildHasher + Clone + Send + Sync + 'static,
{
	pub fn insert(&self, item: T) -> Result<bool, Error> {
		self.modify(|set| set.insert(item))
	}

	pub fn remove(&self, item: &T) -> Result<bool, Error> {
		self.modify(|set| set.remove(item))
	}

	pub fn clear(&self) -> Result<(), Error> {
		self.modify(|set| set.clear())
	}
}

impl<C> Provider<C>
where
	C: Clone + Send + Sync + 'static,
{
	/// Wraps a collection provider so that in-place edits notify like `set()`.
	pub fn observed(&self) -> Observed<C> {
		Observed {
			provider: self.clone(),
			edit: Arc::new(Mutex::new(())),
		}
	}
}
