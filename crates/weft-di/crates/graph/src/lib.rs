//! # Weft Graph
//!
//! Minimal directed-graph helpers for the weft resolver.
//!
//! Nodes are identified by their position inside an ordered list. Edges are
//! never stored here: implementors of [`Graph`] compute them on demand, which
//! lets the resolver derive edges from the providers registered at the time of
//! the check.
//!
//! ## Example
//!
//! ```rust
//! use weft_graph::{Graph, find_cycle};
//!
//! struct Adjacency(Vec<Vec<usize>>);
//!
//! impl Graph for Adjacency {
//! 	fn order(&self) -> usize {
//! 		self.0.len()
//! 	}
//!
//! 	fn edges_from(&self, node: usize) -> Vec<usize> {
//! 		self.0[node].clone()
//! 	}
//! }
//!
//! // 0 -> 1 -> 2 -> 0
//! let graph = Adjacency(vec![vec![1], vec![2], vec![0]]);
//! let cycle = find_cycle(&graph).unwrap();
//! assert_eq!(cycle.nodes(), &[0, 1, 2, 0]);
//! ```

use std::collections::{HashMap, HashSet};

/// A directed graph whose nodes are `0..order()`.
pub trait Graph {
	/// Total number of nodes in the graph.
	fn order(&self) -> usize;

	/// Indices of the nodes that `node` points to.
	fn edges_from(&self, node: usize) -> Vec<usize>;
}

/// A cycle reported by [`find_cycle`].
///
/// The path starts at the node that was re-entered and ends with that same
/// node, so `[a, b, a]` describes `a -> b -> a`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle(Vec<usize>);

impl Cycle {
	/// Nodes along the cycle, first and last being the re-entered node.
	pub fn nodes(&self) -> &[usize] {
		&self.0
	}

	/// Number of edges in the cycle.
	pub fn len(&self) -> usize {
		self.0.len().saturating_sub(1)
	}

	/// Always false: a cycle has at least one edge.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn contains(&self, node: usize) -> bool {
		self.0.contains(&node)
	}

	pub fn into_nodes(self) -> Vec<usize> {
		self.0
	}
}

/// Reports whether the whole graph is free of cycles.
pub fn is_acyclic<G: Graph + ?Sized>(graph: &G) -> bool {
	find_cycle(graph).is_none()
}

/// Searches the whole graph for a cycle, starting a traversal from every
/// node not reached by an earlier one.
pub fn find_cycle<G: Graph + ?Sized>(graph: &G) -> Option<Cycle> {
	let mut visited = HashSet::new();
	for start in 0..graph.order() {
		if visited.contains(&start) {
			continue;
		}
		if let Some(cycle) = cycle_from(graph, start, &mut visited) {
			return Some(cycle);
		}
	}
	None
}

/// Searches for a cycle reachable from `start` only.
pub fn find_cycle_from<G: Graph + ?Sized>(graph: &G, start: usize) -> Option<Cycle> {
	let mut visited = HashSet::new();
	cycle_from(graph, start, &mut visited)
}

// Iterative DFS: an explicit stack keeps deep dependency chains off the call stack.
fn cycle_from<G: Graph + ?Sized>(
	graph: &G,
	start: usize,
	visited: &mut HashSet<usize>,
) -> Option<Cycle> {
	let mut on_stack = HashSet::new();
	let mut parent: HashMap<usize, usize> = HashMap::new();
	let mut stack: Vec<(usize, std::vec::IntoIter<usize>)> = Vec::new();

	visited.insert(start);
	on_stack.insert(start);
	stack.push((start, graph.edges_from(start).into_iter()));

	loop {
		let Some((node, neighbours)) = stack.last_mut() else {
			break;
		};
		let node = *node;
		let next = neighbours.next();

		match next {
			Some(neighbour) if on_stack.contains(&neighbour) => {
				return Some(rebuild_path(&parent, node, neighbour));
			}
			Some(neighbour) => {
				if visited.insert(neighbour) {
					parent.insert(neighbour, node);
					on_stack.insert(neighbour);
					stack.push((neighbour, graph.edges_from(neighbour).into_iter()));
				}
			}
			None => {
				on_stack.remove(&node);
				stack.pop();
			}
		}
	}

	None
}

/// Walks the parent links back from `last` to `reentered`.
fn rebuild_path(parent: &HashMap<usize, usize>, last: usize, reentered: usize) -> Cycle {
	let mut path = vec![last];
	let mut current = last;
	while current != reentered {
		match parent.get(&current) {
			Some(&up) => {
				path.push(up);
				current = up;
			}
			None => break,
		}
	}
	path.reverse();
	path.push(reentered);
	Cycle(path)
}
