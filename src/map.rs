use std::sync::Arc;

use crate::deferred::Deferred;
use crate::node::{Core, Upstream};
use crate::registry::Edge;
use crate::{Dependent, Error, Ignore, Node, NodeId, Provider, Strength};

pub(crate) type Transform<P, T> = Arc<dyn Fn(&P) -> T + Send + Sync>;

/// One-to-one derivation, optionally with an inverse that makes it
/// writable.
pub(crate) struct Map<P: 'static, T> {
	core: Core<T>,
	parent: Upstream<P>,
	func: Transform<P, T>,
	inverse: Option<Transform<T, P>>,
}

impl<P, T> Map<P, T>
where
	P: Send + Sync + 'static,
	T: Send + Sync + 'static,
{
	pub fn attach(
		parent: &Arc<dyn Node<P>>,
		strength: Strength,
		func: Transform<P, T>,
		inverse: Option<Transform<T, P>>,
	) -> Arc<Self> {
		let node = Arc::new(Map {
			core: Core::new(Deferred::mapped(&parent.core().load(), func.clone())),
			parent: Upstream::new(parent, strength),
			func,
			inverse,
		});

		parent
			.core()
			.attach(node.id(), Edge::new(node.clone(), strength));

		// The parent may have moved on before the edge existed.
		node.parent_updated(parent.core().id(), &Ignore::new());
		node
	}
}

impl<P, T> Dependent for Map<P, T>
where
	P: Send + Sync + 'static,
	T: Send + Sync + 'static,
{
	fn id(&self) -> NodeId {
		self.core.id()
	}

	fn parent_updated(&self, _: NodeId, ignore: &Ignore) {
		if let Some(parent) = self.parent.get() {
			let next = Deferred::mapped(&parent.core().load(), self.func.clone());
			self.core.update(next, ignore);
		}
	}
}

impl<P, T> Node<T> for Map<P, T>
where
	P: Send + Sync + 'static,
	T: Send + Sync + 'static,
{
	fn core(&self) -> &Core<T> {
		&self.core
	}

	fn kind(&self) -> &'static str {
		match self.inverse {
			Some(_) => "bidirectional map",
			None => "map",
		}
	}

	fn is_mutable(&self) -> bool {
		self.inverse.is_some()
	}

	/// The child keeps exactly `value`; the parent receives `inverse(value)`
	/// without echoing it back into this node.
	fn set(&self, value: T, ignore: &Ignore) -> Result<(), Error> {
		let Some(inverse) = &self.inverse else {
			return Err(Error::UnsupportedMutation { node: self.kind() });
		};

		let next = Deferred::direct(value);
		if let Some(parent) = self.parent.get() {
			parent.set(inverse(next.get()), &ignore.with(self.id()))?;
		}
		self.core.update(next, ignore);
		Ok(())
	}
}

impl<P: 'static, T> Drop for Map<P, T> {
	fn drop(&mut self) {
		if let Some(parent) = self.parent.get() {
			parent.core().detach(self.core.id());
		}
	}
}

impl<P> Provider<P>
where
	P: Send + Sync + 'static,
{
	/// Derives a provider that lives only as long as the application holds
	/// it. The derived provider keeps this one alive.
	pub fn map<T>(&self, func: impl Fn(&P) -> T + Send + Sync + 'static) -> Provider<T>
	where
		T: Send + Sync + 'static,
	{
		self.map_with(Strength::Weak, Arc::new(func), None)
	}

	/// Derives a provider owned by this one.
	pub fn strong_map<T>(&self, func: impl Fn(&P) -> T + Send + Sync + 'static) -> Provider<T>
	where
		T: Send + Sync + 'static,
	{
		self.map_with(Strength::Strong, Arc::new(func), None)
	}

	/// Derives a writable provider: `set(v)` keeps `v` and writes
	/// `inverse(&v)` into this provider.
	pub fn map_bidirectional<T>(
		&self,
		func: impl Fn(&P) -> T + Send + Sync + 'static,
		inverse: impl Fn(&T) -> P + Send + Sync + 'static,
	) -> Provider<T>
	where
		T: Send + Sync + 'static,
	{
		self.map_with(Strength::Weak, Arc::new(func), Some(Arc::new(inverse) as Transform<T, P>))
	}

	pub fn strong_map_bidirectional<T>(
		&self,
		func: impl Fn(&P) -> T + Send + Sync + 'static,
		inverse: impl Fn(&T) -> P + Send + Sync + 'static,
	) -> Provider<T>
	where
		T: Send + Sync + 'static,
	{
		self.map_with(Strength::Strong, Arc::new(func), Some(Arc::new(inverse) as Transform<T, P>))
	}

	fn map_with<T>(
		&self,
		strength: Strength,
		func: Transform<P, T>,
		inverse: Option<Transform<T, P>>,
	) -> Provider<T>
	where
		T: Send + Sync + 'static,
	{
		Provider::from_node(Map::attach(&self.node, strength, func, inverse))
	}
}
