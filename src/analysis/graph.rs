use crate::prelude::*;
use std::collections::{HashMap, HashSet};

pub mod prelude {
    pub use super::TransitionGraph;
}

#[derive(Debug)]
struct Node {
    id: u64,
    timestamp: Time,
    label: String,
    children: Vec<u64>,
    parents: Vec<u64>,
}

#[derive(Debug)]
struct Edge {
    from: u64,
    to: u64,
    label: String,
    queue: String,
}

/// The explored transition structure: a DAG over state ids with labeled
/// edges (the dispatched job id, or the time delta of a time transition).
///
/// A node with no outgoing edge is a leaf; the engine only ever explores
/// leaves, so the graph keeps that set current on every mutation. Asking
/// for an unknown node is a structural bug and panics.
#[derive(Debug, Default)]
pub struct TransitionGraph {
    nodes: HashMap<u64, Node>,
    edges: Vec<Edge>,
    leaves: Vec<u64>,
    num_nodes: u64,
}

impl TransitionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node and, unless it is the root, the edge from its parent.
    /// Returns the id assigned to the new node.
    pub fn add_node(
        &mut self,
        parent: Option<u64>,
        timestamp: Time,
        label: String,
        edge_label: String,
        edge_queue: String,
    ) -> u64 {
        let id = self.num_nodes;
        self.num_nodes += 1;
        self.nodes.insert(
            id,
            Node { id, timestamp, label, children: Vec::new(), parents: Vec::new() },
        );

        if let Some(parent_id) = parent {
            {
                let parent_node = self
                    .nodes
                    .get_mut(&parent_id)
                    .unwrap_or_else(|| panic!("parent node {parent_id} not in the transition graph"));
                parent_node.children.push(id);
            }
            self.nodes
                .get_mut(&id)
                .expect("node was just inserted")
                .parents
                .push(parent_id);

            let queue = if edge_queue.is_empty() {
                String::new()
            } else {
                format!("\\n{edge_queue}")
            };
            self.edges.push(Edge { from: parent_id, to: id, label: edge_label, queue });

            self.leaves.retain(|leaf| *leaf != parent_id);
        }

        self.leaves.push(id);
        id
    }

    /// Connect two existing nodes; the source ceases to be a leaf.
    pub fn add_edge(&mut self, from: u64, to: u64, edge_label: String) {
        assert!(
            self.nodes.contains_key(&from),
            "source node {from} not in the transition graph"
        );
        assert!(
            self.nodes.contains_key(&to),
            "destination node {to} not in the transition graph"
        );

        self.nodes
            .get_mut(&from)
            .expect("source checked above")
            .children
            .push(to);
        self.nodes
            .get_mut(&to)
            .expect("destination checked above")
            .parents
            .push(from);
        self.edges.push(Edge { from, to, label: edge_label, queue: String::new() });

        self.leaves.retain(|leaf| *leaf != from);
    }

    /// Duplicate-transition check: does `from` already have an outgoing
    /// edge with this label? On a hit the queue annotation is appended to
    /// the existing edge, so the rendering still shows every queue shape
    /// that led to the same decision.
    pub fn has_edge(&mut self, from: u64, edge_label: &str, queue: &str) -> bool {
        match self.edges.iter_mut().find(|edge| edge.from == from && edge.label == edge_label) {
            Some(edge) => {
                if !queue.is_empty() {
                    edge.queue.push(' ');
                    edge.queue.push_str(queue);
                }
                true
            }
            None => false,
        }
    }

    pub fn update_node_label(&mut self, id: u64, label: String) {
        let node = self
            .nodes
            .get_mut(&id)
            .unwrap_or_else(|| panic!("node {id} not in the transition graph"));
        node.label = label;
    }

    pub fn leaves(&self) -> &[u64] {
        &self.leaves
    }

    pub fn node_timestamp(&self, id: u64) -> Time {
        self.node(id).timestamp
    }

    pub fn children_of(&self, id: u64) -> &[u64] {
        &self.node(id).children
    }

    pub fn parents_of(&self, id: u64) -> &[u64] {
        &self.node(id).parents
    }

    fn node(&self, id: u64) -> &Node {
        self.nodes
            .get(&id)
            .unwrap_or_else(|| panic!("node {id} not in the transition graph"))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Drop interior nodes and the edges not sourced at a leaf. Bounds live
    /// memory to the frontier; graph-retention mode never calls this.
    pub fn free_memory(&mut self) {
        if self.leaves.is_empty() {
            return;
        }

        let leaves: HashSet<u64> = self.leaves.iter().copied().collect();
        self.edges.retain(|edge| leaves.contains(&edge.from));
        self.nodes.retain(|id, _| leaves.contains(id));
    }

    /// Emit the graph in DOT form.
    pub fn write_dot<W: std::io::Write>(&self, mut writer: W) -> std::io::Result<()> {
        writeln!(writer, "digraph G {{")?;
        writeln!(writer, "\trankdir=LR;")?;
        writeln!(writer, "\tnode [fontname=Ubuntu]")?;
        writeln!(writer, "\tedge [fontname=Ubuntu,color=Red,fontcolor=Red]")?;

        let mut ids: Vec<u64> = self.nodes.keys().copied().collect();
        ids.sort_unstable();
        for id in ids {
            let node = &self.nodes[&id];
            writeln!(writer, "\t{} [label=\"{}\"];", node.id, node.label)?;
        }
        for edge in &self.edges {
            writeln!(
                writer,
                "\t{} -> {} [label=\"{}{}\"];",
                edge.from, edge.to, edge.label, edge.queue
            )?;
        }
        writeln!(writer, "}}")
    }
}

// =============================================================================

#[test]
fn nodes_track_the_leaf_frontier() {
    let mut graph = TransitionGraph::new();
    let root = graph.add_node(None, Time::zero(), "root".to_owned(), String::new(), String::new());
    assert_eq!(graph.leaves(), &[root]);

    let a = graph.add_node(Some(root), Time::zero(), "a".to_owned(), "T1S0".to_owned(), String::new());
    let b = graph.add_node(Some(root), Time::ticks(2), "b".to_owned(), "2".to_owned(), String::new());
    assert_eq!(graph.leaves(), &[a, b]);
    assert_eq!(graph.node_count(), 3);
    assert_eq!(graph.edge_count(), 2);

    assert_eq!(graph.children_of(root), &[a, b]);
    assert_eq!(graph.parents_of(b), &[root]);
    assert_eq!(graph.node_timestamp(b), Time::ticks(2));
}

#[test]
fn add_edge_demotes_the_source() {
    let mut graph = TransitionGraph::new();
    let root = graph.add_node(None, Time::zero(), "root".to_owned(), String::new(), String::new());
    let a = graph.add_node(Some(root), Time::zero(), "a".to_owned(), "T1S0".to_owned(), String::new());
    let b = graph.add_node(Some(root), Time::zero(), "b".to_owned(), "T2S0".to_owned(), String::new());

    graph.add_edge(a, b, "T2S0".to_owned());
    assert_eq!(graph.leaves(), &[b]);
}

#[test]
fn duplicate_edges_are_detected_by_label() {
    let mut graph = TransitionGraph::new();
    let root = graph.add_node(None, Time::zero(), "root".to_owned(), String::new(), String::new());
    let _ = graph.add_node(Some(root), Time::zero(), "a".to_owned(), "T1S0".to_owned(), "{T1S0}".to_owned());

    assert!(graph.has_edge(root, "T1S0", "{T1S0, T2S0}"));
    assert!(!graph.has_edge(root, "T2S0", ""));

    let mut rendered = Vec::new();
    graph.write_dot(&mut rendered).unwrap();
    let rendered = String::from_utf8(rendered).unwrap();
    assert!(rendered.contains("label=\"T1S0\\n{T1S0} {T1S0, T2S0}\""));
}

#[test]
fn free_memory_keeps_only_the_frontier() {
    let mut graph = TransitionGraph::new();
    let root = graph.add_node(None, Time::zero(), "root".to_owned(), String::new(), String::new());
    let a = graph.add_node(Some(root), Time::zero(), "a".to_owned(), "T1S0".to_owned(), String::new());
    let b = graph.add_node(Some(a), Time::zero(), "b".to_owned(), "T2S0".to_owned(), String::new());

    graph.free_memory();
    assert_eq!(graph.node_count(), 1);
    assert_eq!(graph.edge_count(), 0);
    assert_eq!(graph.leaves(), &[b]);
}

#[test]
#[should_panic(expected = "not in the transition graph")]
fn unknown_parent_is_a_structural_bug() {
    let mut graph = TransitionGraph::new();
    let _ = graph.add_node(Some(7), Time::zero(), "a".to_owned(), "T1S0".to_owned(), String::new());
}

#[test]
fn dot_output_shape() {
    let mut graph = TransitionGraph::new();
    let root = graph.add_node(None, Time::zero(), "State 0".to_owned(), String::new(), String::new());
    let _ = graph.add_node(Some(root), Time::ticks(3), "State 1".to_owned(), "3".to_owned(), String::new());

    let mut rendered = Vec::new();
    graph.write_dot(&mut rendered).unwrap();
    let rendered = String::from_utf8(rendered).unwrap();

    assert!(rendered.starts_with("digraph G {\n\trankdir=LR;"));
    assert!(rendered.contains("\t0 [label=\"State 0\"];"));
    assert!(rendered.contains("\t0 -> 1 [label=\"3\"];"));
    assert!(rendered.trim_end().ends_with('}'));
}
