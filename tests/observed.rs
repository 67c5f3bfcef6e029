use std::collections::{BTreeMap, HashMap, HashSet};

use provide::{Error, Provider};

#[test]
fn vec_edits_notify_dependents() {
	let items = Provider::mutable(vec![1, 2]).observed();
	let total = items.provider().map(|items| items.iter().sum::<i32>());
	assert_eq!(total.get(), 3);

	items.push(3).unwrap();
	assert_eq!(total.get(), 6);

	items.insert(0, 10).unwrap();
	assert_eq!(items.get(), vec![10, 1, 2, 3]);

	assert_eq!(items.remove(1).unwrap(), 1);
	assert_eq!(total.get(), 15);

	assert_eq!(items.pop().unwrap(), Some(3));
	items.retain(|item| *item > 5).unwrap();
	assert_eq!(items.get(), vec![10]);

	items.clear().unwrap();
	assert_eq!(total.get(), 0);
}

#[test]
fn every_edit_is_a_new_state() {
	let items = Provider::mutable(Vec::<i32>::new()).observed();
	let before = items.provider().state();

	items.push(1).unwrap();
	let after = items.provider().state();
	assert!(after > before);

	let taken = items.modify(|items| std::mem::take(items)).unwrap();
	assert_eq!(taken, vec![1]);
	assert!(items.provider().state() > after);
	assert!(items.get().is_empty());
}

#[test]
fn hash_map_edits() {
	let map = Provider::mutable(HashMap::new()).observed();
	let size = map.provider().map(|map| map.len());

	assert_eq!(map.insert("a", 1).unwrap(), None);
	assert_eq!(map.insert("a", 2).unwrap(), Some(1));
	map.insert("b", 3).unwrap();
	assert_eq!(size.get(), 2);

	assert_eq!(map.remove(&"a").unwrap(), Some(2));
	assert_eq!(size.get(), 1);

	map.clear().unwrap();
	assert_eq!(size.get(), 0);
}

#[test]
fn btree_map_and_set_edits() {
	let map = Provider::mutable(BTreeMap::new()).observed();
	map.insert(2, "two").unwrap();
	map.insert(1, "one").unwrap();
	let keys = map.provider().map(|map| map.keys().copied().collect::<Vec<_>>());
	assert_eq!(keys.get(), vec![1, 2]);
	map.remove(&1).unwrap();
	assert_eq!(keys.get(), vec![2]);

	let set = Provider::mutable(HashSet::new()).observed();
	assert!(set.insert("x").unwrap());
	assert!(!set.insert("x").unwrap());
	assert!(set.remove(&"x").unwrap());
	assert!(set.get().is_empty());
}

#[test]
fn clones_share_the_provider() {
	let items = Provider::mutable(vec![0]).observed();
	let other = items.clone();

	other.push(1).unwrap();
	assert_eq!(items.get(), vec![0, 1]);
	assert!(items.provider().ptr_eq(other.provider()));
}

#[test]
fn read_only_collection_rejects_edits() {
	let items = Provider::constant(vec![1]).observed();

	assert_eq!(
		items.push(2),
		Err(Error::UnsupportedMutation { node: "constant" })
	);
	assert_eq!(items.get(), vec![1]);
}
