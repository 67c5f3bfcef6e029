use std::cmp::Ordering;
use std::ops::Deref;
use std::sync::Weak;

/// Compares `Weak`s by the address of the shared allocation, which stays
/// valid as a key after the value is gone.
pub struct WeakAddr<T: ?Sized> {
	ptr: Weak<T>,
}

impl<T: ?Sized> WeakAddr<T> {
	pub fn new(ptr: Weak<T>) -> Self {
		WeakAddr { ptr }
	}

	pub fn addr(&self) -> usize {
		addr_of(Weak::as_ptr(&self.ptr))
	}

	pub fn is_alive(&self) -> bool {
		self.ptr.strong_count() > 0
	}
}

impl<T: ?Sized> Deref for WeakAddr<T> {
	type Target = Weak<T>;
	fn deref(&self) -> &Self::Target {
		&self.ptr
	}
}

impl<T: ?Sized> PartialEq for WeakAddr<T> {
	fn eq(&self, other: &Self) -> bool {
		self.addr() == other.addr()
	}
}

impl<T: ?Sized> Eq for WeakAddr<T> {}

impl<T: ?Sized> Ord for WeakAddr<T> {
	fn cmp(&self, other: &Self) -> Ordering {
		self.addr().cmp(&other.addr())
	}
}

impl<T: ?Sized> PartialOrd for WeakAddr<T> {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

#[inline]
pub(crate) fn addr_of<T: ?Sized>(ptr: *const T) -> usize {
	ptr as *const () as usize
}
