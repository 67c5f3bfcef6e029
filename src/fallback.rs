use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::deferred::{after_resolution, Deferred};
use crate::node::Core;
use crate::registry::Edge;
use crate::{combine2, next_state, Dependent, Error, Ignore, Node, NodeId, Provider, Strength};

enum Fallback<T> {
	Value(T),
	Provider(Arc<dyn Node<T>>),
}

impl<T> Fallback<T>
where
	T: Clone + 'static,
{
	fn current(&self) -> T {
		match self {
			Fallback::Value(value) => value.clone(),
			Fallback::Provider(provider) => provider.core().load().get().clone(),
		}
	}

	fn state(&self) -> u64 {
		match self {
			Fallback::Value(_) => 0,
			Fallback::Provider(provider) => provider.core().load().state(),
		}
	}
}

/// A non-empty view of an optional source that fills the source with the
/// fallback the first time it is read empty.
pub(crate) struct DefaultsTo<T: 'static> {
	core: Core<T>,
	source: Arc<dyn Node<Option<T>>>,
	fallback: Arc<Fallback<T>>,
	// Source and fallback states the current value was derived from.
	seen: Mutex<(u64, u64)>,
	this: Weak<DefaultsTo<T>>,
}

impl<T> DefaultsTo<T>
where
	T: Clone + Send + Sync + 'static,
{
	fn attach(source: &Arc<dyn Node<Option<T>>>, fallback: Fallback<T>) -> Arc<Self> {
		let fallback = Arc::new(fallback);
		let snapshot = source.core().load();
		let seen = (snapshot.state(), fallback.state());
		let node = Arc::new_cyclic(|this: &Weak<Self>| DefaultsTo {
			core: Core::new(Self::derive(this.clone(), snapshot.state(), snapshot, fallback.clone())),
			source: source.clone(),
			fallback,
			seen: Mutex::new(seen),
			this: this.clone(),
		});

		source
			.core()
			.attach(node.id(), Edge::new(node.clone(), Strength::Weak));
		if let Fallback::Provider(provider) = &*node.fallback {
			provider
				.core()
				.attach(node.id(), Edge::new(node.clone(), Strength::Weak));
		}

		// Either parent may have moved on before the edges existed.
		node.refresh(&Ignore::new());
		node
	}

	fn derive(
		this: Weak<Self>,
		state: u64,
		snapshot: Arc<Deferred<Option<T>>>,
		fallback: Arc<Fallback<T>>,
	) -> Arc<Deferred<T>> {
		let expected = snapshot.state();
		Deferred::with_state(
			state,
			Arc::new(move || match snapshot.get() {
				Some(value) => value.clone(),
				None => {
					let value = fallback.current();
					let written = value.clone();
					let this = this.clone();
					// The source notifies its dependents, which may read this value.
					after_resolution(move || {
						if let Some(node) = this.upgrade() {
							node.write_back(expected, &written);
						}
					});
					value
				}
			}),
		)
	}

	/// Re-derives the value if the source or the fallback advanced.
	fn refresh(&self, ignore: &Ignore) {
		let next = {
			let mut seen = self.seen.lock();
			let snapshot = self.source.core().load();
			let states = (snapshot.state(), self.fallback.state());
			if states.0 <= seen.0 && states.1 <= seen.1 {
				return;
			}

			let newest = states.0.max(states.1);
			let state = if newest > self.core.load().state() {
				newest
			} else {
				next_state()
			};

			*seen = states;
			let next = Self::derive(self.this.clone(), state, snapshot, self.fallback.clone());
			if !self.core.swap(&next) {
				return;
			}
			next
		};

		self.core.notify(&next, ignore);
	}

	/// Fills the source unless it changed since the empty snapshot was taken.
	fn write_back(&self, expected: u64, value: &T) {
		let id = self.core.id();
		match self.source.set_if(expected, Some(value.clone()), &Ignore::of(id)) {
			Ok(true) => tracing::trace!(node = ?id, "default written back"),
			Ok(false) => tracing::trace!(node = ?id, "source changed, default not written back"),
			Err(error) => tracing::trace!(node = ?id, %error, "default not written back"),
		}
	}
}

impl<T> Dependent for DefaultsTo<T>
where
	T: Clone + Send + Sync + 'static,
{
	fn id(&self) -> NodeId {
		self.core.id()
	}

	fn parent_updated(&self, _: NodeId, ignore: &Ignore) {
		self.refresh(ignore)
	}
}

impl<T> Node<T> for DefaultsTo<T>
where
	T: Clone + Send + Sync + 'static,
{
	fn core(&self) -> &Core<T> {
		&self.core
	}

	fn kind(&self) -> &'static str {
		"defaults"
	}

	fn is_mutable(&self) -> bool {
		self.source.is_mutable()
	}

	fn set(&self, value: T, ignore: &Ignore) -> Result<(), Error> {
		let next = Deferred::direct(value);
		self.source
			.set(Some(next.get().clone()), &ignore.with(self.id()))?;
		self.core.update(next, ignore);
		Ok(())
	}
}

impl<T: 'static> Drop for DefaultsTo<T> {
	fn drop(&mut self) {
		let id = self.core.id();
		self.source.core().detach(id);
		if let Fallback::Provider(provider) = &*self.fallback {
			provider.core().detach(id);
		}
	}
}

impl<T> Provider<Option<T>>
where
	T: Clone + Send + Sync + 'static,
{
	/// Presents `value` while the source is empty and writes it into the
	/// source when first read that way.
	pub fn defaults_to(&self, value: T) -> Provider<T> {
		Provider::from_node(DefaultsTo::attach(&self.node, Fallback::Value(value)))
	}

	/// Like [`Provider::defaults_to`], taking the default from `fallback` at
	/// the time it is needed. Follows `fallback` while the source is empty.
	pub fn defaults_to_provider(&self, fallback: &Provider<T>) -> Provider<T> {
		Provider::from_node(DefaultsTo::attach(
			&self.node,
			Fallback::Provider(fallback.node.clone()),
		))
	}

	/// Presents `value` while the source is empty. Never writes to the source.
	pub fn or_else(&self, value: T) -> Provider<T> {
		self.map(move |current| current.clone().unwrap_or_else(|| value.clone()))
	}

	/// Presents the value of `fallback` while the source is empty, following
	/// it as it changes. Never writes to the source.
	pub fn or_else_provider(&self, fallback: &Provider<T>) -> Provider<T> {
		combine2(self, fallback, |current, fallback| {
			current.clone().unwrap_or_else(|| fallback.clone())
		})
	}
}
