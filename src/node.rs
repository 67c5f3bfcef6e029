use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use arc_swap::ArcSwap;
use parking_lot::{Mutex, MutexGuard};

use crate::deferred::Deferred;
use crate::registry::{Edge, Registry};
use crate::{Ignore, Node, NodeId, Strength};

/// The part every node shares: the current snapshot and the registries of
/// whoever listens to it.
pub(crate) struct Core<T> {
	value: ArcSwap<Deferred<T>>,
	registry: Mutex<Registry<T>>,
}

impl<T> Core<T> {
	pub fn new(initial: Arc<Deferred<T>>) -> Self {
		Core {
			value: ArcSwap::new(initial),
			registry: Mutex::new(Registry::new()),
		}
	}

	#[inline]
	pub fn id(&self) -> NodeId {
		NodeId::of(self)
	}

	#[inline]
	pub fn load(&self) -> Arc<Deferred<T>> {
		self.value.load_full()
	}

	/// Installs `next` if it is newer than the current snapshot.
	pub fn swap(&self, next: &Arc<Deferred<T>>) -> bool {
		let mut current = self.value.load_full();
		loop {
			if next.state() <= current.state() {
				tracing::trace!(
					node = ?self.id(),
					current = current.state(),
					offered = next.state(),
					"update superseded"
				);
				return false;
			}

			let previous = self.value.compare_and_swap(&current, next.clone());
			if Arc::ptr_eq(&previous, &current) {
				return true;
			}
			current = arc_swap::Guard::into_inner(previous);
		}
	}

	/// Installs `next` only if the current snapshot is exactly `expected`.
	pub fn swap_exact(&self, expected: &Arc<Deferred<T>>, next: &Arc<Deferred<T>>) -> bool {
		let previous = self.value.compare_and_swap(expected, next.clone());
		Arc::ptr_eq(&previous, expected)
	}

	pub fn update(&self, next: Arc<Deferred<T>>, ignore: &Ignore) -> bool {
		if !self.swap(&next) {
			return false;
		}
		self.notify(&next, ignore);
		true
	}

	/// Children first, then observers, then subscribers. No lock is held
	/// while any of them runs.
	pub fn notify(&self, value: &Arc<Deferred<T>>, ignore: &Ignore) {
		let id = self.id();
		let (children, observers, subscribers) = {
			let mut registry = self.registry.lock();
			(
				registry.children.snapshot(ignore),
				registry.observers.snapshot(),
				registry.subscribers.snapshot(),
			)
		};

		for child in &children {
			child.parent_updated(id, ignore);
		}

		observers.call(&());

		if subscribers.is_empty() {
			return;
		}

		// A value that fails to resolve is reported to whoever reads it next.
		// It must not stop delivery to other nodes.
		if let Ok(resolved) = catch_unwind(AssertUnwindSafe(|| value.get())) {
			subscribers.call(resolved);
		}
	}

	pub fn attach(&self, id: NodeId, edge: Edge) {
		let replaced = self.registry.lock().children.attach(id, edge);
		drop(replaced);
	}

	pub fn detach(&self, id: NodeId) {
		let removed = self.registry.lock().children.detach(id);
		drop(removed);
	}

	pub fn registry(&self) -> MutexGuard<'_, Registry<T>> {
		self.registry.lock()
	}
}

/// A derived node's reference to one of its parents.
///
/// It is the inverse of the edge the parent holds, so parent and child never
/// keep each other alive.
pub(crate) enum Upstream<T> {
	Strong(Arc<dyn Node<T>>),
	Weak(Weak<dyn Node<T>>),
}

impl<T> Upstream<T> {
	pub fn new(parent: &Arc<dyn Node<T>>, strength: Strength) -> Self {
		match strength {
			Strength::Weak => Upstream::Strong(parent.clone()),
			Strength::Strong => Upstream::Weak(Arc::downgrade(parent)),
		}
	}

	pub fn get(&self) -> Option<Arc<dyn Node<T>>> {
		match self {
			Upstream::Strong(parent) => Some(parent.clone()),
			Upstream::Weak(parent) => parent.upgrade(),
		}
	}
}
