use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt::Debug;
use std::mem;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::state::next_state;

pub(crate) type Thunk<T> = Arc<dyn Fn() -> T + Send + Sync>;

/// An immutable value snapshot stamped with the state of the change that
/// produced it.
///
/// The value is computed at most once, on first access. A computation that
/// panics leaves the snapshot unresolved and the next access retries it.
pub struct Deferred<T> {
	state: u64,
	body: Body<T>,
}

enum Body<T> {
	Value(Memo<T>),
	Delegate(Arc<Deferred<T>>),
	Chained(Memo<Arc<Deferred<T>>>),
}

struct Memo<V> {
	cell: OnceLock<V>,
	// Released after the first successful computation so that upstream
	// snapshots captured by the thunk are not pinned.
	thunk: Mutex<Option<Thunk<V>>>,
}

impl<V> Memo<V> {
	fn ready(value: V) -> Self {
		Memo {
			cell: OnceLock::from(value),
			thunk: Mutex::new(None),
		}
	}

	fn pending(thunk: Thunk<V>) -> Self {
		Memo {
			cell: OnceLock::new(),
			thunk: Mutex::new(Some(thunk)),
		}
	}

	fn get(&self) -> &V {
		if let Some(value) = self.cell.get() {
			return value;
		}

		let depth = Depth::enter();
		let value = self.cell.get_or_init(|| {
			let thunk = self
				.thunk
				.lock()
				.clone()
				.expect("thunk is only released once the value is set");
			let value = thunk();
			*self.thunk.lock() = None;
			value
		});
		depth.leave();
		value
	}

	fn is_resolved(&self) -> bool {
		self.cell.get().is_some()
	}
}

thread_local! {
	static RESOLUTION: RefCell<Resolution> = RefCell::new(Resolution::default());
}

/// Value resolutions in progress on this thread, and the actions waiting for
/// the outermost one to finish.
#[derive(Default)]
struct Resolution {
	depth: usize,
	queued: Vec<Box<dyn FnOnce()>>,
}

/// Runs `action` once the outermost value resolution on this thread has
/// stored its value, or right away when no resolution is running.
///
/// Anything that may notify other nodes from inside a thunk goes through
/// here, so callbacks reading the value being resolved find it set.
pub(crate) fn after_resolution(action: impl FnOnce() + 'static) {
	let action: Box<dyn FnOnce()> = Box::new(action);
	let ready = RESOLUTION.with(|resolution| {
		let mut resolution = resolution.borrow_mut();
		if resolution.depth == 0 {
			Some(action)
		} else {
			resolution.queued.push(action);
			None
		}
	});

	if let Some(action) = ready {
		action()
	}
}

struct Depth;

impl Depth {
	fn enter() -> Self {
		RESOLUTION.with(|resolution| resolution.borrow_mut().depth += 1);
		Depth
	}

	fn leave(self) {
		mem::forget(self);
		let queued = RESOLUTION.with(|resolution| {
			let mut resolution = resolution.borrow_mut();
			resolution.depth -= 1;
			if resolution.depth == 0 {
				mem::take(&mut resolution.queued)
			} else {
				Vec::new()
			}
		});

		for action in queued {
			action()
		}
	}
}

impl Drop for Depth {
	// Only reached when a thunk unwinds. Actions queued by the outermost
	// resolution are discarded with it.
	fn drop(&mut self) {
		let queued = RESOLUTION.try_with(|resolution| {
			let mut resolution = resolution.borrow_mut();
			resolution.depth -= 1;
			if resolution.depth == 0 {
				mem::take(&mut resolution.queued)
			} else {
				Vec::new()
			}
		});
		drop(queued);
	}
}

impl<T> Deferred<T>
where
	T: Send + Sync + 'static,
{
	/// An already computed value with a fresh state.
	pub fn direct(value: T) -> Arc<Self> {
		Arc::new(Deferred {
			state: next_state(),
			body: Body::Value(Memo::ready(value)),
		})
	}

	/// A value computed on first access, with a fresh state.
	pub fn lazy(func: impl Fn() -> T + Send + Sync + 'static) -> Arc<Self> {
		Deferred::with_state(next_state(), Arc::new(func))
	}

	/// Derives from one parent snapshot and inherits its state.
	pub fn mapped<P>(parent: &Arc<Deferred<P>>, func: Arc<dyn Fn(&P) -> T + Send + Sync>) -> Arc<Self>
	where
		P: Send + Sync + 'static,
	{
		let state = parent.state;
		let parent = parent.clone();
		Deferred::with_state(state, Arc::new(move || func(parent.get())))
	}

	/// A value computed on first access with a caller-chosen state.
	///
	/// Multi-parent derivations pass the maximum of their parents' states.
	pub fn with_state(state: u64, thunk: Thunk<T>) -> Arc<Self> {
		Arc::new(Deferred {
			state,
			body: Body::Value(Memo::pending(thunk)),
		})
	}

	/// Shares the value of `inner`, with the state floored at `floor`.
	pub fn delegate(inner: Arc<Deferred<T>>, floor: u64) -> Arc<Self> {
		Arc::new(Deferred {
			state: inner.state.max(floor),
			body: Body::Delegate(inner),
		})
	}

	/// Shares the value of `inner` under a freshly issued state.
	pub fn reemit(inner: Arc<Deferred<T>>) -> Arc<Self> {
		Arc::new(Deferred {
			state: next_state(),
			body: Body::Delegate(inner),
		})
	}

	/// Resolves, on first access, to another snapshot and shares its value.
	pub(crate) fn chained(state: u64, thunk: Thunk<Arc<Deferred<T>>>) -> Arc<Self> {
		Arc::new(Deferred {
			state,
			body: Body::Chained(Memo::pending(thunk)),
		})
	}
}

impl<T> Deferred<T> {
	#[inline]
	pub fn state(&self) -> u64 {
		self.state
	}

	pub fn get(&self) -> &T {
		match &self.body {
			Body::Value(memo) => memo.get(),
			Body::Delegate(inner) => inner.get(),
			Body::Chained(memo) => memo.get().get(),
		}
	}

	/// Whether reading the value would run no computation.
	pub fn is_resolved(&self) -> bool {
		match &self.body {
			Body::Value(memo) => memo.is_resolved(),
			Body::Delegate(inner) => inner.is_resolved(),
			Body::Chained(memo) => memo.cell.get().map_or(false, |inner| inner.is_resolved()),
		}
	}
}

impl<T> PartialEq for Deferred<T> {
	fn eq(&self, other: &Self) -> bool {
		self.state == other.state
	}
}

impl<T> Eq for Deferred<T> {}

impl<T> PartialOrd for Deferred<T> {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl<T> Ord for Deferred<T> {
	fn cmp(&self, other: &Self) -> Ordering {
		self.state.cmp(&other.state)
	}
}

impl<T> Debug for Deferred<T>
where
	T: Debug,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let mut debug = f.debug_struct("Deferred");
		debug.field("state", &self.state);
		if self.is_resolved() {
			debug.field("value", self.get());
		}
		debug.finish()
	}
}
