use std::any::Any;
use std::fmt::Debug;
use std::sync::{Arc, Weak};

use crate::addr::{addr_of, WeakAddr};
use crate::deferred::Deferred;
use crate::leaf::{Bound, Constant, Mutable, Supplier};
use crate::registry::{Callback, OwnedCallback, Owner};
use crate::{Error, Ignore, Node, NodeId};

/// Receives every new value of a provider.
pub type Subscriber<T> = Arc<dyn Fn(&T) + Send + Sync>;
/// Learns that a provider changed without being handed the value.
pub type Observer = Arc<dyn Fn() + Send + Sync>;
/// A subscriber that only fires while its owner is alive.
pub type OwnedSubscriber<O, T> = Arc<dyn Fn(&O, &T) + Send + Sync>;
/// An observer that only fires while its owner is alive.
pub type OwnedObserver<O> = Arc<dyn Fn(&O) + Send + Sync>;

pub fn subscriber<T>(func: impl Fn(&T) + Send + Sync + 'static) -> Subscriber<T> {
	Arc::new(func)
}

pub fn observer(func: impl Fn() + Send + Sync + 'static) -> Observer {
	Arc::new(func)
}

/// A node of the provider graph.
///
/// Cloning a provider clones the handle; both clones refer to the same node.
pub struct Provider<T> {
	pub(crate) node: Arc<dyn Node<T>>,
}

impl<T> Clone for Provider<T> {
	fn clone(&self) -> Self {
		Provider {
			node: self.node.clone(),
		}
	}
}

pub trait Toggle {
	fn toggle(&mut self);
}

impl Toggle for bool {
	fn toggle(&mut self) {
		*self = !*self
	}
}

impl<T> Provider<T>
where
	T: Send + Sync + 'static,
{
	pub(crate) fn from_node(node: Arc<dyn Node<T>>) -> Self {
		Provider { node }
	}

	/// A provider whose value never changes.
	pub fn constant(value: T) -> Self {
		Provider::from_node(Arc::new(Constant::new(value)))
	}

	/// A provider computed by `func` on first read. [`Provider::refresh`]
	/// calls it again.
	pub fn from_fn(func: impl Fn() -> T + Send + Sync + 'static) -> Self {
		Provider::from_node(Arc::new(Supplier::new(Arc::new(func))))
	}

	/// A settable provider.
	pub fn mutable(value: T) -> Self {
		Provider::from_node(Arc::new(Mutable::new(value)))
	}

	/// A settable provider mirroring external state: reads come from
	/// `getter`, writes go to `setter` first.
	pub fn bound(
		getter: impl Fn() -> T + Send + Sync + 'static,
		setter: impl Fn(&T) + Send + Sync + 'static,
	) -> Self {
		Provider::from_node(Arc::new(Bound::new(Arc::new(getter), Arc::new(setter))))
	}

	pub fn id(&self) -> NodeId {
		self.node.core().id()
	}

	/// Whether both handles refer to the same node.
	pub fn ptr_eq(&self, other: &Provider<T>) -> bool {
		self.id() == other.id()
	}

	/// The current snapshot, without resolving it.
	pub fn snapshot(&self) -> Arc<Deferred<T>> {
		self.node.core().load()
	}

	pub fn state(&self) -> u64 {
		self.snapshot().state()
	}

	/// Resolves the current value.
	///
	/// A panic raised while computing the value propagates to the caller and
	/// leaves the node unchanged.
	pub fn get(&self) -> T
	where
		T: Clone,
	{
		self.snapshot().get().clone()
	}

	pub fn with<R>(&self, func: impl FnOnce(&T) -> R) -> R {
		func(self.snapshot().get())
	}

	/// Offers a snapshot to the node. It is applied and propagated only if it
	/// is newer than the current one.
	pub fn update(&self, next: Arc<Deferred<T>>) -> bool {
		self.node.core().update(next, &Ignore::new())
	}

	pub fn set(&self, value: T) -> Result<(), Error> {
		self.node.set(value, &Ignore::new())
	}

	/// Sets `value` and returns the value that was current right before.
	pub fn replace(&self, value: T) -> Result<T, Error>
	where
		T: Clone,
	{
		let previous = self.snapshot();
		self.set(value)?;
		Ok(previous.get().clone())
	}

	pub fn modify(&self, func: impl FnOnce(&mut T)) -> Result<(), Error>
	where
		T: Clone,
	{
		let mut value = self.get();
		func(&mut value);
		self.set(value)
	}

	pub fn toggle(&self) -> Result<(), Error>
	where
		T: Toggle + Clone,
	{
		self.modify(T::toggle)
	}

	/// Re-reads the external source of a supplier or bound provider.
	/// Returns whether a new value was installed.
	pub fn refresh(&self) -> bool {
		self.node.refresh()
	}

	/// Whether [`Provider::set`] is supported.
	pub fn is_mutable(&self) -> bool {
		self.node.is_mutable()
	}

	pub fn subscribe(&self, callback: Subscriber<T>) {
		let key = addr_of(Arc::as_ptr(&callback));
		self.node.core().registry().subscribers.add(key, callback);
	}

	pub fn unsubscribe(&self, callback: &Subscriber<T>) -> bool {
		let key = addr_of(Arc::as_ptr(callback));
		let removed = self.node.core().registry().subscribers.remove(key);
		removed.is_some()
	}

	/// Subscribes on behalf of `owner`, which is held weakly. The callback
	/// stops firing once the owner is dropped.
	pub fn subscribe_weak<O>(&self, owner: &Arc<O>, callback: OwnedSubscriber<O, T>)
	where
		O: Send + Sync + 'static,
	{
		let key = addr_of(Arc::as_ptr(&callback));
		let func: OwnedCallback<T> = Arc::new(move |owner: &(dyn Any + Send + Sync), value: &T| {
			if let Some(owner) = owner.downcast_ref::<O>() {
				callback(owner, value)
			}
		});
		self.node
			.core()
			.registry()
			.subscribers
			.add_owned(owner_key(owner), key, func);
	}

	pub fn unsubscribe_weak<O>(&self, owner: &Arc<O>, callback: &OwnedSubscriber<O, T>) -> bool
	where
		O: Send + Sync + 'static,
	{
		let key = addr_of(Arc::as_ptr(callback));
		let removed = self
			.node
			.core()
			.registry()
			.subscribers
			.remove_owned(&owner_key(owner), key);
		removed.is_some()
	}

	/// Removes every subscriber registered on behalf of `owner`.
	pub fn unsubscribe_owner<O>(&self, owner: &Arc<O>) -> bool
	where
		O: Send + Sync + 'static,
	{
		let removed = self.node.core().registry().subscribers.remove_owner(&owner_key(owner));
		removed.is_some()
	}

	pub fn observe(&self, callback: Observer) {
		let key = addr_of(Arc::as_ptr(&callback));
		let func: Callback<()> = Arc::new(move |_: &()| callback());
		self.node.core().registry().observers.add(key, func);
	}

	pub fn unobserve(&self, callback: &Observer) -> bool {
		let key = addr_of(Arc::as_ptr(callback));
		let removed = self.node.core().registry().observers.remove(key);
		removed.is_some()
	}

	pub fn observe_weak<O>(&self, owner: &Arc<O>, callback: OwnedObserver<O>)
	where
		O: Send + Sync + 'static,
	{
		let key = addr_of(Arc::as_ptr(&callback));
		let func: OwnedCallback<()> = Arc::new(move |owner: &(dyn Any + Send + Sync), _: &()| {
			if let Some(owner) = owner.downcast_ref::<O>() {
				callback(owner)
			}
		});
		self.node
			.core()
			.registry()
			.observers
			.add_owned(owner_key(owner), key, func);
	}

	pub fn unobserve_weak<O>(&self, owner: &Arc<O>, callback: &OwnedObserver<O>) -> bool
	where
		O: Send + Sync + 'static,
	{
		let key = addr_of(Arc::as_ptr(callback));
		let removed = self
			.node
			.core()
			.registry()
			.observers
			.remove_owned(&owner_key(owner), key);
		removed.is_some()
	}

	pub fn unobserve_owner<O>(&self, owner: &Arc<O>) -> bool
	where
		O: Send + Sync + 'static,
	{
		let removed = self.node.core().registry().observers.remove_owner(&owner_key(owner));
		removed.is_some()
	}

	/// Number of live dependents attached to this node.
	pub fn child_count(&self) -> usize {
		self.node.core().registry().children.len()
	}

	pub fn subscriber_count(&self) -> usize {
		self.node.core().registry().subscribers.len()
	}

	pub fn observer_count(&self) -> usize {
		self.node.core().registry().observers.len()
	}
}

fn owner_key<O>(owner: &Arc<O>) -> Owner
where
	O: Send + Sync + 'static,
{
	WeakAddr::new(Arc::downgrade(owner) as Weak<dyn Any + Send + Sync>)
}

impl<T> Debug for Provider<T>
where
	T: Debug + Send + Sync + 'static,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let snapshot = self.snapshot();
		f.debug_struct("Provider")
			.field("kind", &self.node.kind())
			.field("state", &snapshot.state())
			.field("value", snapshot.get())
			.finish()
	}
}
