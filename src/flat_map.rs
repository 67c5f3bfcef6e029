use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::deferred::Deferred;
use crate::node::Core;
use crate::registry::Edge;
use crate::{next_state, Dependent, Error, Ignore, Node, NodeId, Propagation, Provider, Strength};

pub(crate) type Select<S, T> = Arc<dyn Fn(&S) -> Provider<T> + Send + Sync>;

/// Follows whichever provider the selector source currently points at.
pub(crate) struct FlatMap<S: 'static, T: 'static> {
	core: Core<T>,
	source: Arc<dyn Node<S>>,
	select: Select<S, T>,
	propagation: Propagation,
	writable: bool,
	route: Mutex<Route<T>>,
	this: Weak<FlatMap<S, T>>,
}

struct Route<T> {
	/// State of the selector snapshot `target` was chosen from.
	source_state: u64,
	target: Option<Arc<dyn Node<T>>>,
}

impl<S, T> FlatMap<S, T>
where
	S: Send + Sync + 'static,
	T: Send + Sync + 'static,
{
	pub fn attach(
		source: &Arc<dyn Node<S>>,
		select: Select<S, T>,
		propagation: Propagation,
		writable: bool,
	) -> Arc<Self> {
		let node = Arc::new_cyclic(|this: &Weak<Self>| FlatMap {
			core: Core::new(Self::pending(
				this.clone(),
				source.core().load(),
				select.clone(),
				next_state(),
			)),
			source: source.clone(),
			select,
			propagation,
			writable,
			route: Mutex::new(Route {
				source_state: 0,
				target: None,
			}),
			this: this.clone(),
		});

		source
			.core()
			.attach(node.id(), Edge::new(node.clone(), Strength::Weak));

		// The selector may have moved on before the edge existed.
		node.parent_updated(source.core().id(), &Ignore::new());
		node
	}

	/// A value that picks its target when first read.
	fn pending(this: Weak<Self>, source: Arc<Deferred<S>>, select: Select<S, T>, state: u64) -> Arc<Deferred<T>> {
		Deferred::chained(
			state,
			Arc::new(move || match this.upgrade() {
				Some(node) => node.resolve(),
				None => select(source.get()).node.core().load(),
			}),
		)
	}

	fn resolve(&self) -> Arc<Deferred<T>> {
		let mut route = self.route.lock();
		self.route_to_current(&mut route).core().load()
	}

	/// Points the route at the target of the current selector value. The
	/// old target is detached and the new one attached under the same lock,
	/// so no notification can fall between them.
	fn route_to_current(&self, route: &mut Route<T>) -> Arc<dyn Node<T>> {
		let snapshot = self.source.core().load();
		if route.source_state == snapshot.state() {
			if let Some(target) = &route.target {
				return target.clone();
			}
		}

		let target = (self.select)(snapshot.get()).node;
		let id = self.core.id();
		let unchanged = route
			.target
			.as_ref()
			.map_or(false, |current| current.core().id() == target.core().id());

		if !unchanged {
			if let Some(previous) = route.target.take() {
				previous.core().detach(id);
			}
			target
				.core()
				.attach(id, Edge::Weak(self.this.clone() as Weak<dyn Dependent>));
			tracing::trace!(node = ?id, target = ?target.core().id(), "flat map rerouted");
		}

		route.source_state = snapshot.state();
		route.target = Some(target.clone());
		target
	}

	fn source_updated(&self, ignore: &Ignore) {
		let next = match self.propagation {
			Propagation::Lazy => {
				// Holding the route orders this state after any target update
				// that was accepted before it.
				let _route = self.route.lock();
				Self::pending(
					self.this.clone(),
					self.source.core().load(),
					self.select.clone(),
					next_state(),
				)
			}
			Propagation::Immediate => {
				let mut route = self.route.lock();
				match catch_unwind(AssertUnwindSafe(|| self.route_to_current(&mut route))) {
					Ok(target) => Deferred::reemit(target.core().load()),
					// The route is untouched, so the next read selects again and
					// raises the same panic to the reader.
					Err(_) => {
						tracing::trace!(node = ?self.core.id(), "flat map selection panicked");
						Self::pending(
							self.this.clone(),
							self.source.core().load(),
							self.select.clone(),
							next_state(),
						)
					}
				}
			}
		};
		self.core.update(next, ignore);
	}

	fn target_updated(&self, target: NodeId, ignore: &Ignore) {
		let next = {
			let route = self.route.lock();
			let Some(current) = route.target.as_ref() else {
				return;
			};
			// Either a stale target or one whose selection is being replaced.
			if current.core().id() != target || route.source_state != self.source.core().load().state() {
				return;
			}
			Deferred::reemit(current.core().load())
		};
		self.core.update(next, ignore);
	}
}

impl<S, T> Dependent for FlatMap<S, T>
where
	S: Send + Sync + 'static,
	T: Send + Sync + 'static,
{
	fn id(&self) -> NodeId {
		self.core.id()
	}

	fn parent_updated(&self, parent: NodeId, ignore: &Ignore) {
		if parent == self.source.core().id() {
			self.source_updated(ignore)
		} else {
			self.target_updated(parent, ignore)
		}
	}
}

impl<S, T> Node<T> for FlatMap<S, T>
where
	S: Send + Sync + 'static,
	T: Send + Sync + 'static,
{
	fn core(&self) -> &Core<T> {
		&self.core
	}

	fn kind(&self) -> &'static str {
		if self.writable {
			"bidirectional flat map"
		} else {
			"flat map"
		}
	}

	fn is_mutable(&self) -> bool {
		self.writable
	}

	/// Writes through to the currently selected provider.
	fn set(&self, value: T, ignore: &Ignore) -> Result<(), Error> {
		if !self.writable {
			return Err(Error::UnsupportedMutation { node: self.kind() });
		}

		let target = {
			let mut route = self.route.lock();
			self.route_to_current(&mut route)
		};
		target.set(value, ignore)
	}
}

impl<S: 'static, T: 'static> Drop for FlatMap<S, T> {
	fn drop(&mut self) {
		let id = self.core.id();
		self.source.core().detach(id);
		if let Some(target) = self.route.get_mut().target.take() {
			target.core().detach(id);
		}
	}
}

impl<S> Provider<S>
where
	S: Send + Sync + 'static,
{
	/// Follows the provider chosen by `select`, resolving it only when read.
	pub fn flat_map<T>(&self, select: impl Fn(&S) -> Provider<T> + Send + Sync + 'static) -> Provider<T>
	where
		T: Send + Sync + 'static,
	{
		self.flat_map_with(Propagation::Lazy, false, select)
	}

	/// Follows the provider chosen by `select`, re-selecting as soon as this
	/// provider changes.
	pub fn flat_map_immediate<T>(&self, select: impl Fn(&S) -> Provider<T> + Send + Sync + 'static) -> Provider<T>
	where
		T: Send + Sync + 'static,
	{
		self.flat_map_with(Propagation::Immediate, false, select)
	}

	/// Like [`Provider::flat_map`]; `set()` writes to the selected provider.
	pub fn flat_map_bidirectional<T>(
		&self,
		select: impl Fn(&S) -> Provider<T> + Send + Sync + 'static,
	) -> Provider<T>
	where
		T: Send + Sync + 'static,
	{
		self.flat_map_with(Propagation::Lazy, true, select)
	}

	/// Like [`Provider::flat_map_immediate`]; `set()` writes to the selected
	/// provider.
	pub fn flat_map_bidirectional_immediate<T>(
		&self,
		select: impl Fn(&S) -> Provider<T> + Send + Sync + 'static,
	) -> Provider<T>
	where
		T: Send + Sync + 'static,
	{
		self.flat_map_with(Propagation::Immediate, true, select)
	}

	pub fn flat_map_with<T>(
		&self,
		propagation: Propagation,
		writable: bool,
		select: impl Fn(&S) -> Provider<T> + Send + Sync + 'static,
	) -> Provider<T>
	where
		T: Send + Sync + 'static,
	{
		Provider::from_node(FlatMap::attach(&self.node, Arc::new(select), propagation, writable))
	}
}
