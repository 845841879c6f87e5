use petgraph::graph::{Graph, NodeIndex};
use petgraph::{Directed, EdgeType, Undirected};
use std::collections::{BTreeMap, HashMap, VecDeque};

use crate::models::Relationship;

/// Confidence-weighted entity graph used for transmission search.
pub type EntityGraph = AdjacencyGraph<Undirected>;
/// Related-risk links, followed in the direction they were recorded.
pub type RiskGraph = AdjacencyGraph<Directed>;

/// Weighted graph over string node ids.
///
/// Neighbors are always expanded in ascending id order, so every traversal visits
/// them in the same order and shortest-path ties resolve identically across runs.
#[derive(Debug, Clone)]
pub struct AdjacencyGraph<Ty: EdgeType> {
    graph: Graph<String, f64, Ty>,
    node_index: BTreeMap<String, NodeIndex>,
}

impl EntityGraph {
    /// Self-loops and edges below `min_confidence` are dropped; a repeated edge
    /// keeps its highest confidence.
    pub fn from_relationships(relationships: &[Relationship], min_confidence: f64) -> Self {
        let mut graph = Self::new();
        for relationship in relationships {
            if !relationship.confidence.is_finite() || relationship.confidence < min_confidence {
                continue;
            }
            graph.add_edge(&relationship.source_id, &relationship.target_id, relationship.confidence);
        }
        graph
    }
}

impl<Ty: EdgeType> AdjacencyGraph<Ty> {
    pub fn new() -> Self {
        Self {
            graph: Graph::with_capacity(0, 0),
            node_index: BTreeMap::new(),
        }
    }

    fn node(&mut self, id: &str) -> NodeIndex {
        if let Some(index) = self.node_index.get(id) {
            return *index;
        }
        let index = self.graph.add_node(id.to_string());
        self.node_index.insert(id.to_string(), index);
        index
    }

    pub fn add_node(&mut self, id: &str) {
        self.node(id);
    }

    pub fn add_edge(&mut self, from: &str, to: &str, weight: f64) {
        if from == to {
            return;
        }
        let (a, b) = (self.node(from), self.node(to));
        match self.graph.find_edge(a, b) {
            Some(edge) => {
                if weight > self.graph[edge] {
                    self.graph[edge] = weight;
                }
            }
            None => {
                self.graph.add_edge(a, b, weight);
            }
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node_index.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    fn sorted_neighbors(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut neighbors: Vec<NodeIndex> = self.graph.neighbors(node).collect();
        neighbors.sort_by(|a, b| self.graph[*a].cmp(&self.graph[*b]));
        neighbors.dedup();
        neighbors
    }

    /// Breadth-first search from `source`, bounded by `max_depth` edges.
    /// Returns each reached node's predecessor and depth (the source maps to itself).
    fn bfs_parents(&self, source: NodeIndex, max_depth: Option<usize>) -> HashMap<NodeIndex, (NodeIndex, usize)> {
        let mut parents = HashMap::new();
        let mut queue = VecDeque::new();

        parents.insert(source, (source, 0));
        queue.push_back((source, 0usize));

        while let Some((node, depth)) = queue.pop_front() {
            if max_depth.map_or(false, |max| depth >= max) {
                continue;
            }
            for next in self.sorted_neighbors(node) {
                if parents.contains_key(&next) {
                    continue;
                }
                parents.insert(next, (node, depth + 1));
                queue.push_back((next, depth + 1));
            }
        }

        parents
    }

    fn rebuild_path(&self, parents: &HashMap<NodeIndex, (NodeIndex, usize)>, target: NodeIndex) -> Vec<String> {
        let mut path = vec![self.graph[target].clone()];
        let mut current = target;
        while let Some(&(parent, depth)) = parents.get(&current) {
            if depth == 0 {
                break;
            }
            path.push(self.graph[parent].clone());
            current = parent;
        }
        path.reverse();
        path
    }

    /// Shortest path (fewest edges) from `source` to `target`, both inclusive.
    pub fn shortest_path(&self, source: &str, target: &str, max_edges: Option<usize>) -> Option<Vec<String>> {
        let source_index = *self.node_index.get(source)?;
        let target_index = *self.node_index.get(target)?;
        if source_index == target_index {
            return Some(vec![source.to_string()]);
        }
        let parents = self.bfs_parents(source_index, max_edges);
        parents
            .contains_key(&target_index)
            .then(|| self.rebuild_path(&parents, target_index))
    }

    /// Shortest path of at least one edge from any node in `sources` to any node
    /// in `targets`. Candidates are tried with sources and targets in ascending
    /// id order; the first path of minimal length wins.
    pub fn shortest_path_between(
        &self,
        sources: &[&str],
        targets: &[&str],
        max_edges: Option<usize>,
    ) -> Option<Vec<String>> {
        let resolve = |ids: &[&str]| -> Vec<(String, NodeIndex)> {
            let mut resolved: Vec<(String, NodeIndex)> = ids
                .iter()
                .filter_map(|id| self.node_index.get(*id).map(|index| (id.to_string(), *index)))
                .collect();
            resolved.sort();
            resolved.dedup();
            resolved
        };
        let sources = resolve(sources);
        let targets = resolve(targets);

        let mut best: Option<(usize, NodeIndex, HashMap<NodeIndex, (NodeIndex, usize)>)> = None;

        for (_, source) in &sources {
            let parents = self.bfs_parents(*source, max_edges);
            let mut found: Option<(usize, NodeIndex)> = None;
            for (_, target) in &targets {
                if target == source {
                    continue;
                }
                if let Some(&(_, depth)) = parents.get(target) {
                    if found.map_or(true, |(best_depth, _)| depth < best_depth) {
                        found = Some((depth, *target));
                    }
                }
            }
            if let Some((depth, target)) = found {
                if best.as_ref().map_or(true, |(best_depth, _, _)| depth < *best_depth) {
                    best = Some((depth, target, parents));
                }
            }
        }

        best.map(|(_, target, parents)| self.rebuild_path(&parents, target))
    }
}

impl<Ty: EdgeType> Default for AdjacencyGraph<Ty> {
    fn default() -> Self {
        Self::new()
    }
}
