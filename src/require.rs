use std::sync::Arc;

use crate::{Error, Provider};

impl<T> Provider<T>
where
	T: Clone + Send + Sync + 'static,
{
	/// Checks every value of this provider against `predicate` when the
	/// derived value is resolved, not when it is built.
	pub fn require(
		&self,
		predicate: impl Fn(&T) -> bool + Send + Sync + 'static,
		message: impl Into<Arc<str>>,
	) -> Provider<Result<T, Error>> {
		let message = message.into();
		self.map(move |value| {
			if predicate(value) {
				Ok(value.clone())
			} else {
				Err(Error::Validation {
					message: message.clone(),
				})
			}
		})
	}
}

impl<T, E> Provider<Result<T, E>>
where
	T: Clone + Send + Sync + 'static,
	E: Clone + Send + Sync + 'static,
{
	pub fn try_get(&self) -> Result<T, E> {
		self.with(|value| value.clone())
	}
}
