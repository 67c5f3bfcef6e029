use std::sync::Arc;

use crate::deferred::{Deferred, Thunk};
use crate::node::Core;
use crate::{next_state, Error, Ignore, Node};

/// A value that never changes.
pub(crate) struct Constant<T> {
	core: Core<T>,
}

impl<T> Constant<T>
where
	T: Send + Sync + 'static,
{
	pub fn new(value: T) -> Self {
		Constant {
			core: Core::new(Deferred::direct(value)),
		}
	}
}

impl<T> Node<T> for Constant<T>
where
	T: Send + Sync + 'static,
{
	fn core(&self) -> &Core<T> {
		&self.core
	}

	fn kind(&self) -> &'static str {
		"constant"
	}
}

/// A value produced by a function on first read. `refresh` asks for it again.
pub(crate) struct Supplier<T> {
	core: Core<T>,
	func: Thunk<T>,
}

impl<T> Supplier<T>
where
	T: Send + Sync + 'static,
{
	pub fn new(func: Thunk<T>) -> Self {
		Supplier {
			core: Core::new(Deferred::with_state(next_state(), func.clone())),
			func,
		}
	}
}

impl<T> Node<T> for Supplier<T>
where
	T: Send + Sync + 'static,
{
	fn core(&self) -> &Core<T> {
		&self.core
	}

	fn kind(&self) -> &'static str {
		"supplier"
	}

	fn refresh(&self) -> bool {
		let next = Deferred::with_state(next_state(), self.func.clone());
		self.core.update(next, &Ignore::new())
	}
}

/// A settable cell.
pub(crate) struct Mutable<T> {
	core: Core<T>,
}

impl<T> Mutable<T>
where
	T: Send + Sync + 'static,
{
	pub fn new(value: T) -> Self {
		Mutable {
			core: Core::new(Deferred::direct(value)),
		}
	}
}

impl<T> Node<T> for Mutable<T>
where
	T: Send + Sync + 'static,
{
	fn core(&self) -> &Core<T> {
		&self.core
	}

	fn kind(&self) -> &'static str {
		"mutable"
	}

	fn is_mutable(&self) -> bool {
		true
	}

	fn set(&self, value: T, ignore: &Ignore) -> Result<(), Error> {
		self.core.update(Deferred::direct(value), ignore);
		Ok(())
	}

	fn set_if(&self, expected: u64, value: T, ignore: &Ignore) -> Result<bool, Error> {
		let current = self.core.load();
		if current.state() != expected {
			return Ok(false);
		}

		let next = Deferred::direct(value);
		if !self.core.swap_exact(&current, &next) {
			return Ok(false);
		}
		self.core.notify(&next, ignore);
		Ok(true)
	}
}

/// A settable cell backed by an external getter and setter.
pub(crate) struct Bound<T> {
	core: Core<T>,
	getter: Thunk<T>,
	setter: Arc<dyn Fn(&T) + Send + Sync>,
}

impl<T> Bound<T>
where
	T: Send + Sync + 'static,
{
	pub fn new(getter: Thunk<T>, setter: Arc<dyn Fn(&T) + Send + Sync>) -> Self {
		Bound {
			core: Core::new(Deferred::with_state(next_state(), getter.clone())),
			getter,
			setter,
		}
	}
}

impl<T> Node<T> for Bound<T>
where
	T: Send + Sync + 'static,
{
	fn core(&self) -> &Core<T> {
		&self.core
	}

	fn kind(&self) -> &'static str {
		"bound"
	}

	fn is_mutable(&self) -> bool {
		true
	}

	fn set(&self, value: T, ignore: &Ignore) -> Result<(), Error> {
		let next = Deferred::direct(value);
		(self.setter)(next.get());
		self.core.update(next, ignore);
		Ok(())
	}

	fn refresh(&self) -> bool {
		let next = Deferred::with_state(next_state(), self.getter.clone());
		self.core.update(next, &Ignore::new())
	}
}
