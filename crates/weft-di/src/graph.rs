//! Dependency graph of one scope
//!
//! Nodes are constructors and value groups. Edges are never stored: they are
//! derived from each constructor's parameters and the providers registered
//! in the store, so the graph always reflects the current registrations.

use std::collections::HashMap;

use weft_graph::{Cycle, Graph};

use crate::descriptor::Requirement;
use crate::error::{CycleEntry, CyclePath};
use crate::key::Key;
use crate::node::{ConstructorId, ConstructorNode};
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum GraphNode {
	Constructor(ConstructorId),
	Group(Key),
}

struct Snapshot {
	len: usize,
	new_groups: Vec<Key>,
}

/// Ordered list of graph nodes with a single level of snapshot.
#[derive(Default)]
pub(crate) struct GraphHolder {
	nodes: Vec<GraphNode>,
	groups: HashMap<Key, usize>,
	snapshot: Option<Snapshot>,
}

impl GraphHolder {
	pub(crate) fn new() -> Self {
		Self::default()
	}

	pub(crate) fn len(&self) -> usize {
		self.nodes.len()
	}

	pub(crate) fn node(&self, order: usize) -> Option<&GraphNode> {
		self.nodes.get(order)
	}

	pub(crate) fn add_constructor(&mut self, id: ConstructorId) -> usize {
		self.nodes.push(GraphNode::Constructor(id));
		self.nodes.len() - 1
	}

	/// Order of the node for value group `key`, created on first use.
	pub(crate) fn group_node(&mut self, key: &Key) -> usize {
		if let Some(&order) = self.groups.get(key) {
			return order;
		}
		self.nodes.push(GraphNode::Group(key.clone()));
		let order = self.nodes.len() - 1;
		self.groups.insert(key.clone(), order);
		if let Some(snapshot) = &mut self.snapshot {
			snapshot.new_groups.push(key.clone());
		}
		order
	}

	pub(crate) fn group_order(&self, key: &Key) -> Option<usize> {
		self.groups.get(key).copied()
	}

	/// Records the current node count. Taking a second snapshot replaces the first.
	pub(crate) fn snapshot(&mut self) {
		self.snapshot = Some(Snapshot {
			len: self.nodes.len(),
			new_groups: Vec::new(),
		});
	}

	/// Drops every node added since the last snapshot.
	pub(crate) fn rollback(&mut self) {
		let Some(snapshot) = self.snapshot.take() else {
			return;
		};
		self.nodes.truncate(snapshot.len);
		for key in snapshot.new_groups {
			self.groups.remove(&key);
		}
	}

	pub(crate) fn commit(&mut self) {
		self.snapshot = None;
	}
}

/// Read-only view joining the holder with the nodes and store it indexes.
pub(crate) struct GraphView<'a> {
	pub holder: &'a GraphHolder,
	pub nodes: &'a [ConstructorNode],
	pub store: &'a Store,
}

impl GraphView<'_> {
	fn provider_orders(&self, key: &Key, out: &mut Vec<usize>) {
		for id in self.store.providers(key) {
			if let Some(node) = self.nodes.get(id.index()) {
				out.push(node.order());
			}
		}
	}

	/// Describes each hop of `cycle` for an error message.
	pub(crate) fn describe(&self, cycle: &Cycle) -> CyclePath {
		let entries = cycle
			.nodes()
			.iter()
			.filter_map(|&order| match self.holder.node(order)? {
				GraphNode::Constructor(id) => {
					let node = self.nodes.get(id.index())?;
					let key = node
						.results()
						.produced_keys()
						.into_iter()
						.next()
						.map(|(key, _)| key)?;
					Some(CycleEntry {
						key,
						location: Some(node.location().clone()),
					})
				}
				GraphNode::Group(key) => Some(CycleEntry {
					key: key.clone(),
					location: None,
				}),
			})
			.collect();
		CyclePath(entries)
	}
}

impl Graph for GraphView<'_> {
	fn order(&self) -> usize {
		self.holder.len()
	}

	fn edges_from(&self, order: usize) -> Vec<usize> {
		let mut edges = Vec::new();
		match self.holder.node(order) {
			Some(GraphNode::Constructor(id)) => {
				let Some(node) = self.nodes.get(id.index()) else {
					return edges;
				};
				for requirement in node.params().requirements() {
					match requirement {
						Requirement::Single(single) => self.provider_orders(&single.key, &mut edges),
						Requirement::Group(group) => {
							if let Some(order) = self.holder.group_order(&group.key) {
								edges.push(order);
							}
						}
					}
				}
			}
			Some(GraphNode::Group(key)) => self.provider_orders(key, &mut edges),
			None => {}
		}
		edges
	}
}
