//! Activity coverage gathered by the controlled runtime.
//!
//! [`CoverageInfo`] holds sets that are unioned across iterations. The
//! [`CoverageGraph`] is different: it is a snapshot that the latest iteration
//! replaces wholesale, and it is only ever written out as DGML.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Write};
use std::path::Path;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use serde::{Deserialize, Serialize};

const DGML_NAMESPACE: &str = "http://schemas.microsoft.com/vs/2009/dgml";

/// A node of the coverage graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub label: String,
    /// Category (e.g. machine, state, event) used for grouping in viewers.
    pub category: Option<String>,
}

/// A directed, labelled edge of the coverage graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GraphLink {
    pub source: String,
    pub target: String,
    pub label: Option<String>,
}

/// Graph of exercised program activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageGraph {
    nodes: BTreeMap<String, GraphNode>,
    links: BTreeSet<GraphLink>,
}

impl CoverageGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node, or returns the existing node with the same id.
    pub fn get_or_create_node(
        &mut self,
        id: impl Into<String>,
        label: impl Into<String>,
    ) -> &mut GraphNode {
        self.nodes.entry(id.into()).or_insert_with(|| GraphNode {
            label: label.into(),
            category: None,
        })
    }

    /// Adds a link between two nodes. Missing endpoints are created with
    /// their id as label.
    pub fn add_link(
        &mut self,
        source: impl Into<String>,
        target: impl Into<String>,
        label: Option<String>,
    ) {
        let source = source.into();
        let target = target.into();
        self.get_or_create_node(source.clone(), source.clone());
        self.get_or_create_node(target.clone(), target.clone());
        self.links.insert(GraphLink {
            source,
            target,
            label,
        });
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Writes the graph as a DGML document.
    pub fn write_dgml<W: Write>(&self, out: W) -> io::Result<()> {
        let mut writer = Writer::new_with_indent(out, b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

        let mut root = BytesStart::new("DirectedGraph");
        root.push_attribute(("xmlns", DGML_NAMESPACE));
        writer.write_event(Event::Start(root))?;

        writer.write_event(Event::Start(BytesStart::new("Nodes")))?;
        for (id, node) in &self.nodes {
            let mut element = BytesStart::new("Node");
            element.push_attribute(("Id", id.as_str()));
            element.push_attribute(("Label", node.label.as_str()));
            if let Some(category) = &node.category {
                element.push_attribute(("Category", category.as_str()));
            }
            writer.write_event(Event::Empty(element))?;
        }
        writer.write_event(Event::End(BytesEnd::new("Nodes")))?;

        writer.write_event(Event::Start(BytesStart::new("Links")))?;
        for link in &self.links {
            let mut element = BytesStart::new("Link");
            element.push_attribute(("Source", link.source.as_str()));
            element.push_attribute(("Target", link.target.as_str()));
            if let Some(label) = &link.label {
                element.push_attribute(("Label", label.as_str()));
            }
            writer.write_event(Event::Empty(element))?;
        }
        writer.write_event(Event::End(BytesEnd::new("Links")))?;

        writer.write_event(Event::End(BytesEnd::new("DirectedGraph")))?;
        Ok(())
    }

    /// Renders the graph as a DGML string.
    pub fn to_dgml(&self) -> io::Result<String> {
        let mut buffer = Vec::new();
        self.write_dgml(&mut buffer)?;
        String::from_utf8(buffer).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Saves the graph as a DGML file.
    pub fn save_dgml(&self, path: impl AsRef<Path>) -> io::Result<()> {
        std::fs::write(path, self.to_dgml()?)
    }
}

/// Coverage of machines, states and events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageInfo {
    /// Machines (or actors) that were created.
    pub machines: BTreeSet<String>,
    /// States visited, per machine.
    pub machines_to_states: BTreeMap<String, BTreeSet<String>>,
    /// Events handled, per `machine.state`.
    pub registered_events: BTreeMap<String, BTreeSet<String>>,
    /// Latest activity graph snapshot, if any.
    pub coverage_graph: Option<CoverageGraph>,
}

impl CoverageInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `machine` visited `state`.
    pub fn add_state(&mut self, machine: &str, state: &str) {
        self.machines.insert(machine.to_string());
        self.machines_to_states
            .entry(machine.to_string())
            .or_default()
            .insert(state.to_string());
    }

    /// Records that `event` was handled by `machine` in `state`.
    pub fn add_event(&mut self, machine: &str, state: &str, event: &str) {
        self.add_state(machine, state);
        self.registered_events
            .entry(format!("{machine}.{state}"))
            .or_default()
            .insert(event.to_string());
    }

    /// Number of distinct `(machine, state)` pairs covered.
    pub fn state_count(&self) -> usize {
        self.machines_to_states.values().map(BTreeSet::len).sum()
    }

    /// Unions the activity sets of `other` into `self`. The graph is replaced
    /// by `other`'s snapshot when it has one.
    pub fn merge(&mut self, other: CoverageInfo) {
        self.machines.extend(other.machines);
        for (machine, states) in other.machines_to_states {
            self.machines_to_states
                .entry(machine)
                .or_default()
                .extend(states);
        }
        for (key, events) in other.registered_events {
            self.registered_events.entry(key).or_default().extend(events);
        }
        if other.coverage_graph.is_some() {
            self.coverage_graph = other.coverage_graph;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_unions_activity_sets() {
        let mut a = CoverageInfo::new();
        a.add_event("Client", "Init", "Ping");

        let mut b = CoverageInfo::new();
        b.add_event("Client", "Waiting", "Pong");
        b.add_state("Server", "Init");

        a.merge(b);

        assert_eq!(a.machines.len(), 2);
        assert_eq!(a.state_count(), 3);
        assert!(a.registered_events["Client.Init"].contains("Ping"));
        assert!(a.registered_events["Client.Waiting"].contains("Pong"));
    }

    #[test]
    fn merge_replaces_graph_snapshot() {
        let mut first = CoverageGraph::new();
        first.add_link("A", "B", None);
        let mut second = CoverageGraph::new();
        second.add_link("C", "D", Some("go".to_string()));

        let mut info = CoverageInfo {
            coverage_graph: Some(first),
            ..CoverageInfo::default()
        };
        info.merge(CoverageInfo {
            coverage_graph: Some(second.clone()),
            ..CoverageInfo::default()
        });
        assert_eq!(info.coverage_graph.as_ref(), Some(&second));

        // A snapshot-less report leaves the current graph in place.
        info.merge(CoverageInfo::default());
        assert_eq!(info.coverage_graph, Some(second));
    }

    #[test]
    fn dgml_lists_nodes_and_links() {
        let mut graph = CoverageGraph::new();
        graph.get_or_create_node("Client", "Client").category = Some("Machine".to_string());
        graph.add_link("Client", "Server", Some("Ping & Pong".to_string()));

        let dgml = graph.to_dgml().expect("dgml renders");
        assert!(dgml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(dgml.contains(DGML_NAMESPACE));
        assert!(dgml.contains("<Node Id=\"Client\" Label=\"Client\" Category=\"Machine\"/>"));
        assert!(dgml.contains("Label=\"Ping &amp; Pong\""));
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.link_count(), 1);
    }
}
