use std::sync::Arc;

use parking_lot::Mutex;
use smallvec::{smallvec, SmallVec};

use crate::deferred::{Deferred, Thunk};
use crate::node::Core;
use crate::registry::Edge;
use crate::{next_state, Dependent, Ignore, Node, NodeId, Provider, Strength};

pub(crate) type States = SmallVec<[u64; 4]>;

/// A parent of a combine node, with its value type erased.
pub(crate) trait Parent: Send + Sync {
	fn attach(&self, id: NodeId, edge: Edge);
	fn detach(&self, id: NodeId);
}

impl<P> Parent for Arc<dyn Node<P>>
where
	P: Send + Sync + 'static,
{
	fn attach(&self, id: NodeId, edge: Edge) {
		self.core().attach(id, edge)
	}

	fn detach(&self, id: NodeId) {
		self.core().detach(id)
	}
}

/// Derives one value from any number of parents.
///
/// `derive` snapshots every parent and returns their states together with
/// the deferred computation over those snapshots.
pub(crate) struct Combine<T> {
	core: Core<T>,
	parents: Vec<Box<dyn Parent>>,
	derive: Box<dyn Fn() -> (States, Thunk<T>) + Send + Sync>,
	// States of the parent snapshots the current value was built from.
	seen: Mutex<States>,
}

impl<T> Combine<T>
where
	T: Send + Sync + 'static,
{
	pub fn attach(
		parents: Vec<Box<dyn Parent>>,
		derive: impl Fn() -> (States, Thunk<T>) + Send + Sync + 'static,
	) -> Arc<Self> {
		let (states, thunk) = derive();
		let state = states.iter().copied().max().unwrap_or_else(next_state);
		let node = Arc::new(Combine {
			core: Core::new(Deferred::with_state(state, thunk)),
			parents,
			derive: Box::new(derive),
			seen: Mutex::new(states),
		});

		for parent in &node.parents {
			parent.attach(node.id(), Edge::new(node.clone(), Strength::Weak));
		}

		// Any parent may have moved on before all the edges existed.
		node.refresh(&Ignore::new());
		node
	}

	/// Rebuilds the value if any parent advanced since the last build.
	///
	/// The result inherits the newest parent state. When that is not newer
	/// than the current value (a slow propagation arriving after a faster
	/// one) a fresh state is issued instead, so the change is not dropped.
	fn refresh(&self, ignore: &Ignore) {
		let next = {
			let mut seen = self.seen.lock();
			let (states, thunk) = (self.derive)();
			if !states.iter().zip(seen.iter()).any(|(state, seen)| state > seen) {
				return;
			}

			let newest = states.iter().copied().max().unwrap_or_default();
			let state = if newest > self.core.load().state() {
				newest
			} else {
				next_state()
			};

			*seen = states;
			let next = Deferred::with_state(state, thunk);
			if !self.core.swap(&next) {
				return;
			}
			next
		};

		self.core.notify(&next, ignore);
	}
}

impl<T> Dependent for Combine<T>
where
	T: Send + Sync + 'static,
{
	fn id(&self) -> NodeId {
		self.core.id()
	}

	fn parent_updated(&self, _: NodeId, ignore: &Ignore) {
		self.refresh(ignore)
	}
}

impl<T> Node<T> for Combine<T>
where
	T: Send + Sync + 'static,
{
	fn core(&self) -> &Core<T> {
		&self.core
	}

	fn kind(&self) -> &'static str {
		"combine"
	}
}

impl<T> Drop for Combine<T> {
	fn drop(&mut self) {
		let id = self.core.id();
		for parent in &self.parents {
			parent.detach(id);
		}
	}
}

impl<P> Provider<P>
where
	P: Send + Sync + 'static,
{
	/// Combines any number of providers of the same type.
	pub fn combine_all<T>(
		sources: &[Provider<P>],
		func: impl Fn(&[&P]) -> T + Send + Sync + 'static,
	) -> Provider<T>
	where
		T: Send + Sync + 'static,
	{
		let nodes: Vec<Arc<dyn Node<P>>> = sources.iter().map(|source| source.node.clone()).collect();
		let parents = nodes
			.iter()
			.map(|node| Box::new(node.clone()) as Box<dyn Parent>)
			.collect();

		let func = Arc::new(func);
		let node = Combine::attach(parents, move || {
			let snapshots: Vec<Arc<Deferred<P>>> = nodes.iter().map(|node| node.core().load()).collect();
			let states = snapshots.iter().map(|snapshot| snapshot.state()).collect();
			let func = func.clone();
			let thunk: Thunk<T> = Arc::new(move || {
				let values: SmallVec<[&P; 4]> = snapshots.iter().map(|snapshot| snapshot.get()).collect();
				func(values.as_slice())
			});
			(states, thunk)
		});

		Provider::from_node(node)
	}
}

macro_rules! combine_n {
	($(#[$meta:meta])* $name:ident: $($source:ident: $ty:ident),+) => {
		$(#[$meta])*
		pub fn $name<$($ty,)+ T>(
			$($source: &Provider<$ty>,)+
			func: impl Fn($(&$ty),+) -> T + Send + Sync + 'static,
		) -> Provider<T>
		where
			$($ty: Send + Sync + 'static,)+
			T: Send + Sync + 'static,
		{
			let parents = vec![$(Box::new($source.node.clone()) as Box<dyn Parent>),+];
			$(let $source = $source.node.clone();)+

			let func = Arc::new(func);
			let node = Combine::attach(parents, move || {
				$(let $source = $source.core().load();)+
				let states: States = smallvec![$($source.state()),+];
				let func = func.clone();
				let thunk: Thunk<T> = Arc::new(move || func($($source.get()),+));
				(states, thunk)
			});

			Provider::from_node(node)
		}
	};
}

combine_n!(
	/// Combines two providers.
	combine2: a: A, b: B
);
combine_n!(combine3: a: A, b: B, c: C);
combine_n!(combine4: a: A, b: B, c: C, d: D);
combine_n!(combine5: a: A, b: B, c: C, d: D, e: E);
combine_n!(combine6: a: A, b: B, c: C, d: D, e: E, f: F);
