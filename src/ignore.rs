use smallvec::SmallVec;

use crate::NodeId;

/// Nodes that must not be notified by an update because they caused it.
#[derive(Clone, Default, Debug)]
pub struct Ignore {
	ids: SmallVec<[NodeId; 4]>,
}

impl Ignore {
	pub const fn new() -> Self {
		Ignore {
			ids: SmallVec::new_const(),
		}
	}

	pub fn of(id: NodeId) -> Self {
		Ignore::new().with(id)
	}

	#[must_use]
	pub fn with(&self, id: NodeId) -> Self {
		let mut next = self.clone();
		if !next.contains(id) {
			next.ids.push(id);
		}
		next
	}

	#[inline]
	pub fn contains(&self, id: NodeId) -> bool {
		self.ids.contains(&id)
	}
}
