//! Delegation graph and cycle detection
//!
//! Records "agent X routed to agent Y" as counted edges. Edges are only ever
//! added; the graph lives as long as the registry that owns it.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Default hop budget for cycle detection
pub const DEFAULT_MAX_DEPTH: usize = 3;

/// A recorded delegation with its occurrence count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationEdge {
    pub from: String,
    pub to: String,
    pub count: u64,
}

/// Adjacency list of delegation edges keyed by source agent
#[derive(Debug, Clone, Default)]
pub struct DelegationGraph {
    adjacency: HashMap<String, Vec<DelegationEdge>>,
}

impl DelegationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one delegation from `from` to `to`
    pub fn track(&mut self, from: &str, to: &str) {
        let edges = self.adjacency.entry(from.to_string()).or_default();
        match edges.iter_mut().find(|e| e.to == to) {
            Some(edge) => edge.count += 1,
            None => edges.push(DelegationEdge {
                from: from.to_string(),
                to: to.to_string(),
                count: 1,
            }),
        }
    }

    /// Whether delegating `from -> to` would close a loop within `max_depth` hops
    ///
    /// True when `from == to`, or when a path `to -> ... -> from` of at most
    /// `max_depth` edges exists.
    pub fn would_cycle(&self, from: &str, to: &str, max_depth: usize) -> bool {
        if from == to {
            return true;
        }
        let visited = HashSet::from([to.to_string()]);
        self.reaches(to, from, max_depth, visited)
    }

    // Each branch gets its own visited set, so siblings explore independently.
    fn reaches(&self, current: &str, target: &str, budget: usize, visited: HashSet<String>) -> bool {
        if budget == 0 {
            return false;
        }
        let Some(edges) = self.adjacency.get(current) else {
            return false;
        };

        for edge in edges {
            if edge.to == target {
                return true;
            }
            if visited.contains(&edge.to) {
                continue;
            }
            let mut branch = visited.clone();
            branch.insert(edge.to.clone());
            if self.reaches(&edge.to, target, budget - 1, branch) {
                return true;
            }
        }
        false
    }

    /// Occurrence count of one edge (0 when never tracked)
    pub fn edge_count(&self, from: &str, to: &str) -> u64 {
        self.adjacency
            .get(from)
            .and_then(|edges| edges.iter().find(|e| e.to == to))
            .map(|e| e.count)
            .unwrap_or(0)
    }

    /// Agents `from` has delegated to, in first-seen order
    pub fn targets_of(&self, from: &str) -> Vec<&str> {
        self.adjacency
            .get(from)
            .map(|edges| edges.iter().map(|e| e.to.as_str()).collect())
            .unwrap_or_default()
    }

    /// All edges sorted by (from, to)
    pub fn edges(&self) -> Vec<DelegationEdge> {
        let sorted: BTreeMap<(&str, &str), &DelegationEdge> = self
            .adjacency
            .values()
            .flatten()
            .map(|e| ((e.from.as_str(), e.to.as_str()), e))
            .collect();
        sorted.into_values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.adjacency.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_delegation_is_circular() {
        let graph = DelegationGraph::new();
        assert!(graph.would_cycle("a", "a", 1));
        assert!(graph.would_cycle("a", "a", DEFAULT_MAX_DEPTH));
    }

    #[test]
    fn test_zero_depth_never_finds_cycle() {
        let mut graph = DelegationGraph::new();
        graph.track("a", "b");
        graph.track("b", "a");
        assert!(!graph.would_cycle("a", "b", 0));
    }

    #[test]
    fn test_two_node_cycle() {
        let mut graph = DelegationGraph::new();
        graph.track("a", "b");
        graph.track("b", "a");
        assert!(graph.would_cycle("a", "b", 2));
        assert!(graph.would_cycle("a", "b", 1));
    }

    #[test]
    fn test_depth_budget_limits_search() {
        let mut graph = DelegationGraph::new();
        // c -> d -> e -> a
        graph.track("c", "d");
        graph.track("d", "e");
        graph.track("e", "a");

        assert!(!graph.would_cycle("a", "c", 2));
        assert!(graph.would_cycle("a", "c", 3));
    }

    #[test]
    fn test_sibling_branches_explore_independently() {
        let mut graph = DelegationGraph::new();
        // b -> x -> y and b -> y -> a: the second branch must still reach a
        graph.track("b", "x");
        graph.track("x", "y");
        graph.track("b", "y");
        graph.track("y", "a");

        assert!(graph.would_cycle("a", "b", 2));
    }

    #[test]
    fn test_unrelated_edges_are_not_cycles() {
        let mut graph = DelegationGraph::new();
        graph.track("a", "b");
        graph.track("b", "c");
        graph.track("c", "b");
        assert!(!graph.would_cycle("a", "b", 10));
    }

    #[test]
    fn test_track_counts_occurrences() {
        let mut graph = DelegationGraph::new();
        graph.track("a", "b");
        graph.track("a", "b");
        graph.track("a", "c");

        assert_eq!(graph.edge_count("a", "b"), 2);
        assert_eq!(graph.edge_count("a", "c"), 1);
        assert_eq!(graph.edge_count("b", "a"), 0);
        assert_eq!(graph.targets_of("a"), vec!["b", "c"]);
        assert_eq!(graph.len(), 2);

        let edges = graph.edges();
        assert_eq!(edges[0].to, "b");
        assert_eq!(edges[1].to, "c");
    }
}
