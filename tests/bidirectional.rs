use provide::{Error, Provider};

#[test]
fn set_writes_inverse_into_parent() {
	let root = Provider::mutable(10);
	let mid = root.map_bidirectional(|x| x * 10, |y| y / 10);

	assert!(mid.is_mutable());
	assert_eq!(mid.get(), 100);

	mid.set(200).unwrap();
	assert_eq!(root.get(), 20);
	assert_eq!(mid.get(), 200);
}

#[test]
fn child_keeps_exact_value() {
	let root = Provider::mutable(10);
	let mid = root.map_bidirectional(|x| x * 10, |y| y / 10);

	mid.set(205).unwrap();
	assert_eq!(root.get(), 20);
	assert_eq!(mid.get(), 205);

	root.set(3).unwrap();
	assert_eq!(mid.get(), 30);
}

#[test]
fn chain_writes_all_the_way_up() {
	let root = Provider::mutable(1);
	let a = root.map_bidirectional(|x| x + 1, |y| y - 1);
	let b = a.map_bidirectional(|x| x * 2, |y| y / 2);
	assert_eq!(b.get(), 4);

	b.set(10).unwrap();
	assert_eq!(root.get(), 4);
	assert_eq!(a.get(), 5);
	assert_eq!(b.get(), 10);
}

#[test]
fn siblings_see_the_write() {
	let root = Provider::mutable(1);
	let writer = root.map_bidirectional(|x| x * 2, |y| y / 2);
	let sibling = root.map(|x| x + 100);

	writer.set(8).unwrap();
	assert_eq!(root.get(), 4);
	assert_eq!(sibling.get(), 104);
}

#[test]
fn failed_write_leaves_child_unchanged() {
	let root = Provider::constant(1);
	let mapped = root.map_bidirectional(|x| x * 2, |y| y / 2);

	assert_eq!(
		mapped.set(10),
		Err(Error::UnsupportedMutation { node: "constant" })
	);
	assert_eq!(mapped.get(), 2);
}

#[test]
fn strong_bidirectional_outlives_handle() {
	let root = Provider::mutable(2);
	let view = root.strong_map_bidirectional(|x| x * 3, |y| y / 3);
	let sibling = view.map(|x| x + 1);

	drop(view);
	assert_eq!(root.child_count(), 1);

	root.set(4).unwrap();
	assert_eq!(sibling.get(), 13);
}
