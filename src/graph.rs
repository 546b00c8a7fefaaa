// 🕸️ Collaboration Graph - Co-investment network between sharks
//
// Nodes: every shark appearing in a Contribute row (isolated ones included).
// Edges: undirected, one per pair of sharks sharing at least one Investment.
// Built from pairwise_cooccurrence with parent = investment, participant = shark.

use crate::aggregate::{pairwise_cooccurrence, participants_by_parent};
use crate::entities::{Contribute, Shark};
use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::str::FromStr;

// ============================================================================
// EDGE WEIGHTING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeWeighting {
    /// Number of shared investments
    #[default]
    SharedInvestments,
    /// Total amount both sharks contributed to their shared investments
    SharedAmount,
}

impl EdgeWeighting {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeWeighting::SharedInvestments => "shared_investments",
            EdgeWeighting::SharedAmount => "shared_amount",
        }
    }
}

impl FromStr for EdgeWeighting {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "investments" | "shared_investments" | "count" => Ok(EdgeWeighting::SharedInvestments),
            "amount" | "shared_amount" => Ok(EdgeWeighting::SharedAmount),
            other => Err(EngineError::invalid_filter(
                "weight",
                format!("unknown edge weighting '{}'", other),
            )),
        }
    }
}

// ============================================================================
// GRAPH
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: i64,
    pub label: String,
    pub degree: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Smaller shark id
    pub source: i64,
    /// Larger shark id
    pub target: i64,
    pub shared_investments: u64,
    pub shared_amount: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollaborationGraph {
    pub weighting: EdgeWeighting,
    /// Sorted by id
    pub nodes: Vec<GraphNode>,
    /// Sorted by (source, target)
    pub edges: Vec<GraphEdge>,
}

/// Build the co-investment graph. Shark names label the nodes when known.
pub fn build_collaboration_graph(
    contributions: &[Contribute],
    sharks: &[Shark],
    weighting: EdgeWeighting,
) -> CollaborationGraph {
    let names: HashMap<i64, &str> = sharks.iter().map(|s| (s.shark_id, s.name.as_str())).collect();

    let amount = |c: &Contribute| c.amount.unwrap_or(0.0);
    let pairs = pairwise_cooccurrence(contributions, |c| c.investment_id, |c| c.shark_id, amount);

    // every contributor is a node, even without partners
    let contributors: BTreeSet<i64> = participants_by_parent(
        contributions,
        |c| c.investment_id,
        |c| c.shark_id,
        amount,
    )
    .into_values()
    .flat_map(|members| members.into_keys())
    .collect();

    let edges = pairs
        .into_iter()
        .map(|((source, target), stats)| GraphEdge {
            source,
            target,
            shared_investments: stats.count,
            shared_amount: stats.weight,
            weight: match weighting {
                EdgeWeighting::SharedInvestments => stats.count as f64,
                EdgeWeighting::SharedAmount => stats.weight,
            },
        })
        .collect();

    let nodes = contributors
        .into_iter()
        .map(|id| GraphNode {
            id,
            label: names
                .get(&id)
                .map(|n| n.to_string())
                .unwrap_or_else(|| format!("Shark {}", id)),
            degree: 0,
        })
        .collect();

    let mut graph = CollaborationGraph {
        weighting,
        nodes,
        edges,
    };
    graph.refresh_degrees();
    graph
}

impl CollaborationGraph {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: i64) -> Option<&GraphNode> {
        self.nodes
            .binary_search_by_key(&id, |n| n.id)
            .ok()
            .map(|idx| &self.nodes[idx])
    }

    /// Edge between two sharks, in either order
    pub fn edge(&self, a: i64, b: i64) -> Option<&GraphEdge> {
        let key = if a <= b { (a, b) } else { (b, a) };
        self.edges
            .binary_search_by_key(&key, |e| (e.source, e.target))
            .ok()
            .map(|idx| &self.edges[idx])
    }

    /// Partners of a shark, ascending
    pub fn neighbors(&self, id: i64) -> Vec<i64> {
        let mut out: Vec<i64> = self
            .edges
            .iter()
            .filter_map(|e| {
                if e.source == id {
                    Some(e.target)
                } else if e.target == id {
                    Some(e.source)
                } else {
                    None
                }
            })
            .collect();
        out.sort_unstable();
        out
    }

    pub fn degree(&self, id: i64) -> usize {
        self.edges
            .iter()
            .filter(|e| e.source == id || e.target == id)
            .count()
    }

    pub fn total_weight(&self) -> f64 {
        self.edges.iter().map(|e| e.weight).sum()
    }

    /// Drop edges with fewer than `min_shared` shared investments. Nodes stay.
    pub fn prune(mut self, min_shared: u64) -> Self {
        self.edges.retain(|e| e.shared_investments >= min_shared);
        self.refresh_degrees();
        self
    }

    /// Connected components, each sorted ascending, ordered by smallest member
    pub fn connected_components(&self) -> Vec<Vec<i64>> {
        let index: HashMap<i64, usize> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id, i))
            .collect();

        let mut uf = UnionFind::new(self.nodes.len());
        for edge in &self.edges {
            if let (Some(&a), Some(&b)) = (index.get(&edge.source), index.get(&edge.target)) {
                uf.union(a, b);
            }
        }

        let mut components: BTreeMap<usize, Vec<i64>> = BTreeMap::new();
        for (i, node) in self.nodes.iter().enumerate() {
            components.entry(uf.find(i)).or_default().push(node.id);
        }

        let mut out: Vec<Vec<i64>> = components.into_values().collect();
        // nodes are id-sorted, so each component is too
        out.sort_by_key(|c| c[0]);
        out
    }

    fn refresh_degrees(&mut self) {
        let mut degrees: HashMap<i64, usize> = HashMap::new();
        for edge in &self.edges {
            *degrees.entry(edge.source).or_insert(0) += 1;
            *degrees.entry(edge.target).or_insert(0) += 1;
        }
        for node in &mut self.nodes {
            node.degree = degrees.get(&node.id).copied().unwrap_or(0);
        }
    }
}

/// Union-Find with path compression and union by rank
struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<usize>,
}

impl UnionFind {
    fn new(size: usize) -> Self {
        UnionFind {
            parent: (0..size).collect(),
            rank: vec![0; size],
        }
    }

    fn find(&mut self, i: usize) -> usize {
        if self.parent[i] != i {
            self.parent[i] = self.find(self.parent[i]);
        }
        self.parent[i]
    }

    fn union(&mut self, i: usize, j: usize) {
        let root_i = self.find(i);
        let root_j = self.find(j);
        if root_i == root_j {
            return;
        }
        match self.rank[root_i].cmp(&self.rank[root_j]) {
            std::cmp::Ordering::Less => self.parent[root_i] = root_j,
            std::cmp::Ordering::Greater => self.parent[root_j] = root_i,
            std::cmp::Ordering::Equal => {
                self.parent[root_j] = root_i;
                self.rank[root_i] += 1;
            }
        }
    }
}
