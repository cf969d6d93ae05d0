//! Property-based tests for providing and resolving
//!
//! Uses proptest to verify invariants of the container:
//! 1. Acyclicity - a provide is accepted exactly when the graph stays acyclic
//! 2. Atomic rejection - a rejected provide registers nothing
//! 3. Call at most once - repeated invocations never rebuild a value
//! 4. Group completeness - a group holds one member per contributor

use proptest::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use weft_di::{
	Constructor, Container, Invocation, Key, Outputs, ProvideOptions, Signature, Slot,
};
use weft_graph::{Graph, is_acyclic};

const NODES: usize = 6;

fn key_name(index: usize) -> String {
	format!("n{}", index)
}

/// A constructor producing the `u32` named after `index`.
fn node(index: usize, deps: &[usize], calls: Arc<AtomicUsize>) -> Constructor {
	let mut signature = Signature::new();
	for dep in deps {
		signature = signature.param(Slot::value::<u32>().named(key_name(*dep)));
	}
	signature = signature.result(Slot::value::<u32>().named(key_name(index)));
	Constructor::new(signature, move |_| {
		calls.fetch_add(1, Ordering::SeqCst);
		Ok(Outputs::single(index as u32))
	})
}

// Adjacency of the accepted constructors, keyed by node index
struct Model {
	edges: Vec<Vec<usize>>,
	accepted: Vec<bool>,
}

impl Model {
	fn new() -> Self {
		Self {
			edges: vec![Vec::new(); NODES],
			accepted: vec![false; NODES],
		}
	}

	fn accepts(&self, index: usize, deps: &[usize]) -> bool {
		let mut candidate = Model {
			edges: self.edges.clone(),
			accepted: self.accepted.clone(),
		};
		candidate.add(index, deps);
		is_acyclic(&candidate)
	}

	fn add(&mut self, index: usize, deps: &[usize]) {
		self.accepted[index] = true;
		self.edges[index] = deps.to_vec();
	}
}

impl Graph for Model {
	fn order(&self) -> usize {
		NODES
	}

	fn edges_from(&self, node: usize) -> Vec<usize> {
		self.edges[node]
			.iter()
			.copied()
			.filter(|dep| self.accepted[*dep])
			.collect()
	}
}

fn dependency_lists() -> impl Strategy<Value = Vec<Vec<usize>>> {
	prop::collection::vec(prop::collection::vec(0..NODES, 0..3), NODES)
}

/// Dependencies that only point at lower indices, so the graph is a DAG.
fn dag() -> impl Strategy<Value = Vec<Vec<usize>>> {
	(1..=NODES).prop_flat_map(|size| {
		(0..size)
			.map(|index| {
				if index == 0 {
					Just(Vec::new()).boxed()
				} else {
					prop::collection::vec(0..index, 0..3).boxed()
				}
			})
			.collect::<Vec<_>>()
	})
}

proptest! {
	#[test]
	fn provide_accepts_exactly_the_acyclic_graphs(deps in dependency_lists()) {
		let container = Container::new();
		let mut model = Model::new();

		for (index, list) in deps.iter().enumerate() {
			let expected = model.accepts(index, list);
			let result = container.provide(node(index, list, Arc::new(AtomicUsize::new(0))));

			prop_assert_eq!(result.is_ok(), expected, "node {} with deps {:?}", index, list);
			if expected {
				model.add(index, list);
			} else {
				prop_assert!(result.unwrap_err().is_cycle_detected());
			}
		}
	}

	#[test]
	fn rejected_provide_registers_nothing(deps in dependency_lists()) {
		let container = Container::new();
		let mut model = Model::new();
		let mut accepted = 0;

		for (index, list) in deps.iter().enumerate() {
			let ok = container
				.provide(node(index, list, Arc::new(AtomicUsize::new(0))))
				.is_ok();
			let key = Key::named::<u32>(key_name(index));
			let providers = container.providers(&key).unwrap();
			if ok {
				accepted += 1;
				model.add(index, list);
				prop_assert_eq!(providers.len(), 1);
			} else {
				prop_assert!(providers.is_empty());
			}
			prop_assert_eq!(container.constructors().unwrap().len(), accepted);
			prop_assert!(container.is_verified_acyclic().unwrap());
		}
	}

	#[test]
	fn values_are_built_at_most_once(deps in dag(), rounds in 1usize..4) {
		let container = Container::new();
		let counters: Vec<Arc<AtomicUsize>> =
			deps.iter().map(|_| Arc::new(AtomicUsize::new(0))).collect();
		for (index, list) in deps.iter().enumerate() {
			container.provide(node(index, list, Arc::clone(&counters[index]))).unwrap();
		}

		for _ in 0..rounds {
			let params = (0..deps.len())
				.map(|index| Slot::value::<u32>().named(key_name(index)))
				.collect();
			let result = container.invoke(Invocation::new(params, |args| {
				for index in 0..args.len() {
					assert_eq!(*args.get::<u32>(index)?, index as u32);
				}
				Ok(())
			}));
			prop_assert!(result.is_ok(), "{:?}", result);
		}

		for counter in &counters {
			prop_assert_eq!(counter.load(Ordering::SeqCst), 1);
		}
	}

	#[test]
	fn group_holds_one_member_per_contributor(contributors in 0usize..12, seed in any::<u64>()) {
		let container = Container::builder().seed(seed).build();
		for index in 0..contributors {
			let value = index as u32;
			container
				.provide_with(
					move || -> Result<u32, std::convert::Infallible> { Ok(value) },
					ProvideOptions::new().group("numbers"),
				)
				.unwrap();
		}

		let mut members: Vec<u32> = Vec::new();
		container
			.invoke(Invocation::new(
				vec![Slot::collection::<u32>().grouped("numbers")],
				|args| {
					members = args.group::<u32>(0)?.iter().map(|v| **v).collect();
					Ok(())
				},
			))
			.unwrap();

		members.sort_unstable();
		prop_assert_eq!(members, (0..contributors as u32).collect::<Vec<_>>());
	}
}
