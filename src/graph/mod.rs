//! Crawl graph: every URL the crawl has encountered and the links between them
//!
//! Nodes are keyed by absolute URL, so repeated discovery of the same target
//! never produces a second node. Edges are deduplicated at insertion and
//! neither nodes nor edges are ever removed during a run.

use crate::state::{NodeKind, NodeStatus};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One node of the crawl graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlNode {
    /// Absolute URL, unique within a graph
    pub id: String,

    #[serde(rename = "type")]
    pub kind: NodeKind,

    #[serde(rename = "name")]
    pub display_name: String,

    pub status: NodeStatus,
}

/// Directed "source page links to target" relation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CrawlEdge {
    pub source: String,
    pub target: String,
}

/// Immutable copy of the graph, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<CrawlNode>,

    #[serde(rename = "links")]
    pub edges: Vec<CrawlEdge>,
}

impl GraphSnapshot {
    /// Looks up a node by URL
    pub fn node(&self, url: &str) -> Option<&CrawlNode> {
        self.nodes.iter().find(|n| n.id == url)
    }

    /// Returns true if the snapshot holds the edge `source -> target`
    pub fn has_edge(&self, source: &str, target: &str) -> bool {
        self.edges
            .iter()
            .any(|e| e.source == source && e.target == target)
    }
}

/// The live graph owned by the crawl engine
#[derive(Debug, Default)]
pub struct CrawlGraph {
    nodes: Vec<CrawlNode>,
    index: HashMap<String, usize>,
    edges: Vec<CrawlEdge>,
    edge_set: HashSet<(String, String)>,
}

impl CrawlGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the node if absent, otherwise moves its status forward
    ///
    /// Kind and display name are fixed by the first insertion. A status that
    /// would move the node backwards is ignored.
    ///
    /// Returns the node's status after the call.
    pub fn upsert_node(
        &mut self,
        url: &str,
        kind: NodeKind,
        display_name: &str,
        status: NodeStatus,
    ) -> NodeStatus {
        if let Some(&i) = self.index.get(url) {
            let node = &mut self.nodes[i];
            if node.status.can_transition_to(status) {
                node.status = status;
            } else if node.status != status {
                tracing::trace!(
                    "Ignoring backwards transition for {}: {} -> {}",
                    url,
                    node.status,
                    status
                );
            }
            return node.status;
        }

        self.index.insert(url.to_string(), self.nodes.len());
        self.nodes.push(CrawlNode {
            id: url.to_string(),
            kind,
            display_name: display_name.to_string(),
            status,
        });
        status
    }

    /// Moves an existing node's status forward; unknown URLs are ignored
    pub fn set_status(&mut self, url: &str, status: NodeStatus) -> Option<NodeStatus> {
        let &i = self.index.get(url)?;
        let node = &mut self.nodes[i];
        if node.status.can_transition_to(status) {
            node.status = status;
        }
        Some(node.status)
    }

    /// Adds `source -> target`; returns false if the edge already existed
    pub fn add_edge(&mut self, source: &str, target: &str) -> bool {
        if !self
            .edge_set
            .insert((source.to_string(), target.to_string()))
        {
            return false;
        }

        self.edges.push(CrawlEdge {
            source: source.to_string(),
            target: target.to_string(),
        });
        true
    }

    pub fn node(&self, url: &str) -> Option<&CrawlNode> {
        self.index.get(url).map(|&i| &self.nodes[i])
    }

    #[cfg(test)]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[cfg(test)]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Copies the graph for readers outside the engine
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }
    }
}
