pub mod macros;

mod addr;
mod combine;
mod deferred;
mod error;
mod fallback;
mod flat_map;
mod ignore;
mod leaf;
mod map;
mod node;
mod observed;
mod provider;
mod registry;
mod require;
mod state;

pub use combine::{combine2, combine3, combine4, combine5, combine6};
pub use deferred::Deferred;
pub use error::Error;
pub use observed::Observed;
pub use provider::{observer, subscriber, Observer, OwnedObserver, OwnedSubscriber, Provider, Subscriber, Toggle};
pub use state::next_state;

pub(crate) use crate::ignore::Ignore;
use crate::node::Core;

/// Identity of a node for the duration of its life.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Debug)]
pub struct NodeId(usize);

impl NodeId {
	pub(crate) fn of<T: ?Sized>(node: &T) -> Self {
		NodeId(addr::addr_of(node as *const T))
	}
}

/// Whether a derived node is kept alive by its parent.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Default)]
pub enum Strength {
	/// The parent only references the child weakly; the child lives as long
	/// as the application holds it and keeps its parent alive meanwhile.
	#[default]
	Weak,
	/// The parent owns the child. The child refers back weakly and stops
	/// following once the parent is gone.
	Strong,
}

/// When a flat-mapped node resolves its selected source.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Default)]
pub enum Propagation {
	/// On the first read after the selector source changed.
	#[default]
	Lazy,
	/// As soon as the selector source changes, so that pushes from the
	/// selected source reach subscribers without a read.
	Immediate,
}

/// Receives notifications from parents.
pub(crate) trait Dependent: Send + Sync + 'static {
	fn id(&self) -> NodeId;

	/// Called after `parent` applied a newer value.
	fn parent_updated(&self, parent: NodeId, ignore: &Ignore);
}

/// A node of the provider graph.
pub(crate) trait Node<T>: Send + Sync + 'static {
	fn core(&self) -> &Core<T>;

	/// A short name used in errors.
	fn kind(&self) -> &'static str;

	fn set(&self, value: T, ignore: &Ignore) -> Result<(), Error> {
		let _ = (value, ignore);
		Err(Error::UnsupportedMutation { node: self.kind() })
	}

	fn is_mutable(&self) -> bool {
		false
	}

	/// Writes `value` only if the node still holds the snapshot with
	/// state `expected`. Returns whether the write happened.
	fn set_if(&self, expected: u64, value: T, ignore: &Ignore) -> Result<bool, Error> {
		if self.core().load().state() != expected {
			return Ok(false);
		}
		self.set(value, ignore).map(|()| true)
	}

	/// Re-reads an external source, if the node has one.
	fn refresh(&self) -> bool {
		false
	}
}
