//! Dependency graph visualization for development and debugging
//!
//! Renders the constructors of a scope, together with the values and value
//! groups they consume and produce, in DOT format for Graphviz.
//!
//! ## Example
//!
//! ```rust
//! use std::convert::Infallible;
//! use std::sync::Arc;
//! use weft_di::Container;
//! use weft_di::visualization::DotGraph;
//!
//! struct Database;
//! struct UserService;
//!
//! let container = Container::new();
//! container.provide(|| -> Result<Database, Infallible> { Ok(Database) }).unwrap();
//! container
//! 	.provide(|_db: Arc<Database>| -> Result<UserService, Infallible> { Ok(UserService) })
//! 	.unwrap();
//!
//! let dot = DotGraph::from_scope(&container).unwrap().to_dot();
//! assert!(dot.starts_with("digraph"));
//! ```

use std::collections::{BTreeMap, HashSet};

use crate::error::{DiError, DiResult};
use crate::key::Key;
use crate::location::Location;
use crate::scope::Scope;

/// What a node of the rendered graph stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DotNodeKind {
	Constructor,
	Value,
	Group,
}

/// A node of the rendered graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DotNode {
	pub id: String,
	pub label: String,
	pub kind: DotNodeKind,
	/// Set for constructors that took part in a reported failure
	pub failed: bool,
	/// Set for constructors that have already run
	pub called: bool,
}

/// Constructors, values and value groups of one scope.
#[derive(Debug, Default)]
pub struct DotGraph {
	nodes: BTreeMap<String, DotNode>,
	edges: Vec<(String, String)>,
	locations: Vec<(Location, String)>,
}

impl DotGraph {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds the graph of the constructors registered in `scope`.
	pub fn from_scope(scope: &Scope) -> DiResult<Self> {
		let mut graph = Self::new();
		for info in scope.constructors()? {
			let id = format!("ctor{}", info.id.index());
			graph.add_node(DotNode {
				id: id.clone(),
				label: info.location.function().to_string(),
				kind: DotNodeKind::Constructor,
				failed: false,
				called: info.called,
			});
			graph.locations.push((info.location.clone(), id.clone()));

			for input in &info.inputs {
				let key_id = graph.add_key(input.key());
				graph.add_dependency(key_id, id.clone());
			}
			for output in &info.outputs {
				let key_id = graph.add_key(output.key());
				graph.add_dependency(id.clone(), key_id);
			}
		}
		Ok(graph)
	}

	pub fn add_node(&mut self, node: DotNode) {
		self.nodes.insert(node.id.clone(), node);
	}

	fn add_key(&mut self, key: &Key) -> String {
		let id = key.to_string();
		if !self.nodes.contains_key(&id) {
			let kind = if key.is_group() {
				DotNodeKind::Group
			} else {
				DotNodeKind::Value
			};
			self.add_node(DotNode {
				id: id.clone(),
				label: id.clone(),
				kind,
				failed: false,
				called: false,
			});
		}
		id
	}

	/// Adds an edge; edges point in the direction values flow.
	pub fn add_dependency(&mut self, from: impl Into<String>, to: impl Into<String>) {
		self.edges.push((from.into(), to.into()));
	}

	/// Marks every constructor named along the error's chain as failed.
	pub fn highlight_error(&mut self, error: &DiError) {
		let failing: HashSet<&Location> = error.locations().into_iter().collect();
		for (location, id) in &self.locations {
			if failing.contains(location)
				&& let Some(node) = self.nodes.get_mut(id)
			{
				node.failed = true;
			}
		}
	}

	pub fn node(&self, id: &str) -> Option<&DotNode> {
		self.nodes.get(id)
	}

	/// Generate DOT format output for Graphviz
	pub fn to_dot(&self) -> String {
		let mut output = String::from("digraph DependencyGraph {\n");
		output.push_str("\trankdir=LR;\n");
		output.push_str("\tnode [shape=box, style=rounded];\n\n");

		for node in self.nodes.values() {
			let (shape, color) = match node.kind {
				DotNodeKind::Constructor if node.failed => ("box", "lightcoral"),
				DotNodeKind::Constructor if node.called => ("box", "lightgreen"),
				DotNodeKind::Constructor => ("box", "lightblue"),
				DotNodeKind::Value => ("ellipse", "white"),
				DotNodeKind::Group => ("folder", "lightyellow"),
			};
			output.push_str(&format!(
				"\t\"{}\" [label=\"{}\", shape={}, fillcolor={}, style=filled];\n",
				escape(&node.id),
				escape(&node.label),
				shape,
				color
			));
		}

		output.push('\n');

		for (from, to) in &self.edges {
			output.push_str(&format!("\t\"{}\" -> \"{}\";\n", escape(from), escape(to)));
		}

		output.push_str("}\n");
		output
	}

	/// Get statistics about the rendered graph
	pub fn statistics(&self) -> GraphStatistics {
		let count = |kind: DotNodeKind| self.nodes.values().filter(|n| n.kind == kind).count();
		GraphStatistics {
			node_count: self.nodes.len(),
			edge_count: self.edges.len(),
			constructor_count: count(DotNodeKind::Constructor),
			value_count: count(DotNodeKind::Value),
			group_count: count(DotNodeKind::Group),
			failed_count: self.nodes.values().filter(|n| n.failed).count(),
		}
	}
}

fn escape(text: &str) -> String {
	text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Statistics about a rendered graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphStatistics {
	/// Total number of nodes
	pub node_count: usize,
	/// Total number of edges
	pub edge_count: usize,
	pub constructor_count: usize,
	pub value_count: usize,
	pub group_count: usize,
	/// Constructors marked by [`DotGraph::highlight_error`]
	pub failed_count: usize,
}
