use std::any::Any;
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use fxhash::FxHashMap;
use smallvec::SmallVec;

use crate::addr::WeakAddr;
use crate::{Dependent, Ignore, NodeId, Strength};

pub(crate) type Callback<P> = Arc<dyn Fn(&P) + Send + Sync>;
pub(crate) type OwnedCallback<P> = Arc<dyn Fn(&(dyn Any + Send + Sync), &P) + Send + Sync>;
pub(crate) type Owner = WeakAddr<dyn Any + Send + Sync>;

/// How a child is attached to its parent.
pub(crate) enum Edge {
	/// The parent keeps the child alive.
	Strong(Arc<dyn Dependent>),
	/// The child lives only as long as something else holds it.
	Weak(Weak<dyn Dependent>),
}

impl Edge {
	pub fn new(child: Arc<dyn Dependent>, strength: Strength) -> Self {
		match strength {
			Strength::Strong => Edge::Strong(child),
			Strength::Weak => Edge::Weak(Arc::downgrade(&child)),
		}
	}
}

pub(crate) struct Registry<T> {
	pub children: Children,
	pub subscribers: Listeners<T>,
	pub observers: Listeners<()>,
}

impl<T> Registry<T> {
	pub fn new() -> Self {
		Registry {
			children: Children::default(),
			subscribers: Listeners::default(),
			observers: Listeners::default(),
		}
	}
}

#[derive(Default)]
pub(crate) struct Children {
	strong: FxHashMap<NodeId, Arc<dyn Dependent>>,
	weak: FxHashMap<NodeId, Weak<dyn Dependent>>,
}

impl Children {
	/// Returns a strong edge that was replaced, which the caller must drop
	/// after releasing the registry lock.
	#[must_use]
	pub fn attach(&mut self, id: NodeId, edge: Edge) -> Option<Arc<dyn Dependent>> {
		self.prune();
		match edge {
			Edge::Strong(child) => {
				self.weak.remove(&id);
				self.strong.insert(id, child)
			}
			Edge::Weak(child) => {
				self.weak.insert(id, child);
				self.strong.remove(&id)
			}
		}
	}

	/// Same contract as [`Children::attach`] for the returned edge.
	#[must_use]
	pub fn detach(&mut self, id: NodeId) -> Option<Arc<dyn Dependent>> {
		self.prune();
		self.weak.remove(&id);
		self.strong.remove(&id)
	}

	pub fn len(&mut self) -> usize {
		self.prune();
		self.strong.len() + self.weak.len()
	}

	/// Strong children first, then the weak ones that are still alive.
	pub fn snapshot(&mut self, ignore: &Ignore) -> SmallVec<[Arc<dyn Dependent>; 4]> {
		let mut children: SmallVec<[Arc<dyn Dependent>; 4]> = self
			.strong
			.iter()
			.filter(|(id, _)| !ignore.contains(**id))
			.map(|(_, child)| child.clone())
			.collect();

		self.weak.retain(|id, child| {
			if ignore.contains(*id) {
				return child.strong_count() > 0;
			}
			match child.upgrade() {
				Some(child) => {
					children.push(child);
					true
				}
				None => false,
			}
		});

		children
	}

	fn prune(&mut self) {
		self.weak.retain(|_, child| child.strong_count() > 0);
	}
}

struct Keyed<F> {
	key: usize,
	func: F,
}

/// Callbacks keyed by identity: strong ones by the callback itself, weak
/// ones grouped under an owner that is only weakly referenced.
pub(crate) struct Listeners<P> {
	strong: SmallVec<[Keyed<Callback<P>>; 2]>,
	owned: BTreeMap<Owner, SmallVec<[Keyed<OwnedCallback<P>>; 1]>>,
}

impl<P> Default for Listeners<P> {
	fn default() -> Self {
		Listeners {
			strong: SmallVec::new(),
			owned: BTreeMap::new(),
		}
	}
}

impl<P> Listeners<P> {
	pub fn add(&mut self, key: usize, func: Callback<P>) {
		self.prune();
		self.strong.push(Keyed { key, func });
	}

	/// Removed callbacks are handed back so that the caller drops them after
	/// releasing the registry lock.
	#[must_use]
	pub fn remove(&mut self, key: usize) -> Option<Callback<P>> {
		self.prune();
		let index = self.strong.iter().position(|item| item.key == key)?;
		Some(self.strong.remove(index).func)
	}

	pub fn add_owned(&mut self, owner: Owner, key: usize, func: OwnedCallback<P>) {
		self.prune();
		self.owned.entry(owner).or_default().push(Keyed { key, func });
	}

	#[must_use]
	pub fn remove_owned(&mut self, owner: &Owner, key: usize) -> Option<OwnedCallback<P>> {
		self.prune();
		let callbacks = self.owned.get_mut(owner)?;
		let removed = callbacks
			.iter()
			.position(|item| item.key == key)
			.map(|index| callbacks.remove(index).func);
		if callbacks.is_empty() {
			self.owned.remove(owner);
		}
		removed
	}

	#[must_use]
	pub fn remove_owner(&mut self, owner: &Owner) -> Option<Vec<OwnedCallback<P>>> {
		self.prune();
		let callbacks = self.owned.remove(owner)?;
		Some(callbacks.into_iter().map(|item| item.func).collect())
	}

	pub fn len(&mut self) -> usize {
		self.prune();
		self.strong.len() + self.owned.values().map(|callbacks| callbacks.len()).sum::<usize>()
	}

	pub fn snapshot(&mut self) -> Dispatch<P> {
		let strong = self.strong.iter().map(|item| item.func.clone()).collect();
		let mut owned = SmallVec::new();

		self.owned.retain(|owner, callbacks| match owner.upgrade() {
			Some(owner) => {
				for item in callbacks.iter() {
					owned.push((owner.clone(), item.func.clone()));
				}
				true
			}
			None => false,
		});

		Dispatch { strong, owned }
	}

	fn prune(&mut self) {
		self.owned.retain(|owner, _| owner.is_alive());
	}
}

/// Callbacks collected under the registry lock and invoked after it is
/// released.
pub(crate) struct Dispatch<P> {
	strong: SmallVec<[Callback<P>; 2]>,
	owned: SmallVec<[(Arc<dyn Any + Send + Sync>, OwnedCallback<P>); 2]>,
}

impl<P> Dispatch<P> {
	pub fn is_empty(&self) -> bool {
		self.strong.is_empty() && self.owned.is_empty()
	}

	pub fn call(&self, payload: &P) {
		for func in &self.strong {
			func(payload);
		}
		for (owner, func) in &self.owned {
			func(&**owner, payload);
		}
	}
}
