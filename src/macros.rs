pub use enclose::*;

/// Builds a [`Subscriber`](crate::Subscriber), cloning the listed captures
/// into the closure.
///
/// ```ignore
/// let seen = Arc::new(AtomicUsize::new(0));
/// provider.subscribe(subscriber!((seen) value => {
///     seen.store(*value, Ordering::SeqCst);
/// }));
/// ```
#[macro_export]
macro_rules! subscriber {
    (( $($d_tt:tt)* ) $value:ident => $($b:tt)*) => {
        $crate::subscriber($crate::macros::enclose!(($( $d_tt )*) move |$value| { $($b)* }))
    };
    ($value:ident => $($b:tt)*) => {
        $crate::subscriber(move |$value| { $($b)* })
    };
}

/// Builds an [`Observer`](crate::Observer), cloning the listed captures into
/// the closure.
#[macro_export]
macro_rules! observer {
    (( $($d_tt:tt)* ) => $($b:tt)*) => {
        $crate::observer($crate::macros::enclose!(($( $d_tt )*) move || { $($b)* }))
    };
    (=> $($b:tt)*) => {
        $crate::observer(move || { $($b)* })
    };
}
