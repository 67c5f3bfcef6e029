use std::sync::Arc;

/// Failures reported by the provider graph itself.
///
/// Panics raised by application transforms are not converted; they unwind
/// out of the `get()` or `set()` call that ran the transform.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
	/// A `require` node resolved to a value that violates its predicate.
	#[error("validation failed: {message}")]
	Validation { message: Arc<str> },

	/// `set()` was called on a node that does not accept writes.
	#[error("{node} provider does not support set()")]
	UnsupportedMutation { node: &'static str },
}
