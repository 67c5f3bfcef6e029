use std::thread;

use provide::{combine2, Provider};

const THREADS: i64 = 8;
const ROUNDS: i64 = 200;

#[test]
fn concurrent_writes_settle_on_latest() {
	let root = Provider::mutable(0i64);
	let doubled = root.map(|x| x * 2);
	let plus_one = doubled.map(|x| x + 1);

	thread::scope(|scope| {
		for worker in 0..THREADS {
			let root = root.clone();
			scope.spawn(move || {
				for round in 0..ROUNDS {
					root.set(worker * ROUNDS + round).unwrap();
				}
			});
		}
	});

	let last = root.get();
	assert_eq!(doubled.get(), last * 2);
	assert_eq!(plus_one.get(), last * 2 + 1);
	assert_eq!(plus_one.state(), root.state());
}

#[test]
fn combine_under_concurrent_parents() {
	let a = Provider::mutable(0i64);
	let b = Provider::mutable(0i64);
	let sum = combine2(&a, &b, |a, b| a + b);

	thread::scope(|scope| {
		for worker in 0..THREADS {
			let target = if worker % 2 == 0 { a.clone() } else { b.clone() };
			scope.spawn(move || {
				for round in 0..ROUNDS {
					target.set(worker * 1000 + round).unwrap();
				}
			});
		}
	});

	assert_eq!(sum.get(), a.get() + b.get());
}

#[test]
fn construction_races_with_writes() {
	let root = Provider::mutable(0i64);

	let derived = thread::scope(|scope| {
		let writer = {
			let root = root.clone();
			scope.spawn(move || {
				for value in 1..=ROUNDS {
					root.set(value).unwrap();
				}
			})
		};

		let mut derived = Vec::new();
		for _ in 0..ROUNDS {
			derived.push(root.map(|x| x * 3));
		}
		writer.join().unwrap();
		derived
	});

	assert_eq!(root.get(), ROUNDS);
	for provider in &derived {
		assert_eq!(provider.get(), ROUNDS * 3);
	}
}

#[test]
fn flat_map_switching_under_load() {
	for immediate in [false, true] {
		let a = Provider::mutable(0i64);
		let b = Provider::mutable(0i64);
		let use_a = Provider::mutable(true);
		let select = {
			let (a, b) = (a.clone(), b.clone());
			move |use_a: &bool| if *use_a { a.clone() } else { b.clone() }
		};
		let selected = if immediate {
			use_a.flat_map_immediate(select)
		} else {
			use_a.flat_map(select)
		};

		thread::scope(|scope| {
			for target in [a.clone(), b.clone()] {
				scope.spawn(move || {
					for round in 0..ROUNDS {
						target.set(round).unwrap();
					}
				});
			}

			let use_a = use_a.clone();
			scope.spawn(move || {
				for _ in 0..ROUNDS {
					use_a.toggle().unwrap();
				}
			});

			let selected = selected.clone();
			scope.spawn(move || {
				for _ in 0..ROUNDS {
					let _ = selected.get();
				}
			});
		});

		let expected = if use_a.get() { a.get() } else { b.get() };
		assert_eq!(selected.get(), expected);
	}
}

#[test]
fn combine_construction_races_with_writes() {
	let a = Provider::mutable(0i64);
	let b = Provider::mutable(100i64);

	let sums = thread::scope(|scope| {
		let writer = {
			let a = a.clone();
			scope.spawn(move || {
				for value in 1..=ROUNDS {
					a.set(value).unwrap();
				}
			})
		};

		let mut sums = Vec::new();
		for _ in 0..ROUNDS {
			sums.push(combine2(&a, &b, |a, b| a + b));
		}
		writer.join().unwrap();
		sums
	});

	assert_eq!(a.get(), ROUNDS);
	for sum in &sums {
		assert_eq!(sum.get(), ROUNDS + 100);
	}
}

#[test]
fn flat_map_construction_races_with_writes() {
	let a = Provider::mutable(0i64);
	let b = Provider::mutable(0i64);
	let use_a = Provider::mutable(true);

	let selected = thread::scope(|scope| {
		let writer = {
			let (a, b, use_a) = (a.clone(), b.clone(), use_a.clone());
			scope.spawn(move || {
				for round in 1..=ROUNDS {
					a.set(round).unwrap();
					b.set(-round).unwrap();
					use_a.toggle().unwrap();
				}
			})
		};

		let mut selected = Vec::new();
		for _ in 0..ROUNDS {
			let select = {
				let (a, b) = (a.clone(), b.clone());
				move |use_a: &bool| if *use_a { a.clone() } else { b.clone() }
			};
			selected.push(use_a.flat_map(select.clone()));
			selected.push(use_a.flat_map_immediate(select));
		}
		writer.join().unwrap();
		selected
	});

	let expected = if use_a.get() { a.get() } else { b.get() };
	for provider in &selected {
		assert_eq!(provider.get(), expected);
	}
}
