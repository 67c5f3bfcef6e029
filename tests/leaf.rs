use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use provide::{Deferred, Error, Provider};

#[test]
fn updates_never_regress() {
	let root = Provider::mutable(0);
	let derived = root.map(|value| value * 10);

	let older = Deferred::direct(1);
	let newer = Deferred::direct(2);

	assert!(root.update(newer.clone()));
	assert!(!root.update(older));
	assert!(!root.update(newer));

	assert_eq!(root.get(), 2);
	assert_eq!(derived.get(), 20);
}

#[test]
fn constant_rejects_set() {
	let constant = Provider::constant("fixed");

	assert!(!constant.is_mutable());
	assert_eq!(
		constant.set("other"),
		Err(Error::UnsupportedMutation { node: "constant" })
	);
	assert_eq!(constant.get(), "fixed");
}

#[test]
fn supplier_runs_on_read_and_refresh() {
	let calls = Arc::new(AtomicUsize::new(0));
	let supplier = Provider::from_fn({
		let calls = calls.clone();
		move || calls.fetch_add(1, Ordering::SeqCst) + 1
	});
	let doubled = supplier.map(|value| value * 2);

	assert_eq!(calls.load(Ordering::SeqCst), 0);
	assert_eq!(supplier.get(), 1);
	assert_eq!(doubled.get(), 2);

	assert!(supplier.refresh());
	assert_eq!(calls.load(Ordering::SeqCst), 1);
	assert_eq!(doubled.get(), 4);
	assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn bound_cell_writes_through() {
	let external = Arc::new(Mutex::new(String::from("initial")));
	let cell = Provider::bound(
		{
			let external = external.clone();
			move || external.lock().unwrap().clone()
		},
		{
			let external = external.clone();
			move |value: &String| *external.lock().unwrap() = value.clone()
		},
	);

	assert!(cell.is_mutable());
	assert_eq!(cell.get(), "initial");

	cell.set("written".to_string()).unwrap();
	assert_eq!(*external.lock().unwrap(), "written");
	assert_eq!(cell.get(), "written");

	*external.lock().unwrap() = "changed outside".to_string();
	assert_eq!(cell.get(), "written");
	assert!(cell.refresh());
	assert_eq!(cell.get(), "changed outside");
}

#[test]
fn mutable_helpers() {
	let flag = Provider::mutable(false);
	flag.toggle().unwrap();
	assert!(flag.get());

	let counter = Provider::mutable(1);
	assert_eq!(counter.replace(5).unwrap(), 1);
	counter.modify(|value| *value += 1).unwrap();
	assert_eq!(counter.get(), 6);
	assert_eq!(counter.with(|value| value * 2), 12);
}

#[test]
fn chain_follows_root() {
	let root = Provider::mutable(1);
	let a = root.map(|x| x * 10);
	let b = a.map(|x| x + 1);

	assert_eq!(root.get(), 1);
	assert_eq!(a.get(), 10);
	assert_eq!(b.get(), 11);

	root.set(2).unwrap();
	assert_eq!(a.get(), 20);
	assert_eq!(b.get(), 21);
	assert_eq!(b.state(), root.state());
}

#[test]
fn map_rejects_set() {
	let root = Provider::mutable(1);
	let mapped = root.map(|x| x + 1);

	assert_eq!(
		mapped.set(3),
		Err(Error::UnsupportedMutation { node: "map" })
	);
}

#[test]
fn weak_child_is_reclaimed() {
	let root = Provider::mutable(1);
	let child = root.map(|x| x + 1);
	assert_eq!(root.child_count(), 1);

	drop(child);
	assert_eq!(root.child_count(), 0);
	root.set(2).unwrap();
}

#[test]
fn strong_child_is_kept_by_parent() {
	let root = Provider::mutable(1);
	let seen = Arc::new(AtomicUsize::new(0));

	let child = root.strong_map(|x| x + 1);
	child.subscribe(provide::subscriber!((seen) value => {
		seen.store(*value, Ordering::SeqCst);
	}));
	drop(child);

	assert_eq!(root.child_count(), 1);
	root.set(41).unwrap();
	assert_eq!(seen.load(Ordering::SeqCst), 42);
}

#[test]
fn weak_child_keeps_parent_alive() {
	let root = Provider::mutable(3);
	let child = root.map(|x| x * 3);
	drop(root);

	assert_eq!(child.get(), 9);
}
