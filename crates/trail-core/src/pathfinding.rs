//! Shortest-path search over the routing graph.
//!
//! A* is the primary search; Dijkstra shares the same open-set machinery with
//! a zero heuristic. Edge weight is `distance × cost` in both.

use crate::config::{HeuristicMode, PathAlgorithm};
use crate::error::{Result, RoutingError};
use crate::graph::{NodeId, RoutingGraph};
use crate::spatial::distance;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

#[derive(Debug, Clone, Copy)]
struct FloatOrd(f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Open-set entry. Orders by f-score, then by node index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenNode {
    node: usize,
    g_score: FloatOrd,
    f_score: FloatOrd,
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.f_score
            .cmp(&other.f_score)
            .then_with(|| self.node.cmp(&other.node))
            .then_with(|| self.g_score.cmp(&other.g_score))
    }
}

/// Find the cheapest path from `start` to `end`.
///
/// Returns `Err(MissingNode)` when either id is not in the graph and
/// `Ok(None)` when the search exhausts without reaching the goal. A found
/// path always begins with `start` and ends with `end`.
pub fn find_path(
    graph: &RoutingGraph,
    start: &NodeId,
    end: &NodeId,
    algorithm: PathAlgorithm,
    heuristic: HeuristicMode,
) -> Result<Option<Vec<NodeId>>> {
    match algorithm {
        PathAlgorithm::Astar => astar(graph, start, end, heuristic),
        PathAlgorithm::Dijkstra => dijkstra(graph, start, end),
    }
}

pub fn astar(
    graph: &RoutingGraph,
    start: &NodeId,
    end: &NodeId,
    heuristic: HeuristicMode,
) -> Result<Option<Vec<NodeId>>> {
    let scale = match heuristic {
        HeuristicMode::Euclidean => 1.0,
        HeuristicMode::Scaled => graph.min_positive_cost().unwrap_or(0.0),
    };
    search(graph, start, end, scale)
}

pub fn dijkstra(graph: &RoutingGraph, start: &NodeId, end: &NodeId) -> Result<Option<Vec<NodeId>>> {
    search(graph, start, end, 0.0)
}

fn resolve(graph: &RoutingGraph, id: &NodeId) -> Result<usize> {
    graph
        .node_index(id)
        .ok_or_else(|| RoutingError::MissingNode { node: id.clone() })
}

/// Best-first search with `h(n) = euclid(n, goal) × heuristic_scale`.
fn search(
    graph: &RoutingGraph,
    start: &NodeId,
    end: &NodeId,
    heuristic_scale: f64,
) -> Result<Option<Vec<NodeId>>> {
    let start_idx = resolve(graph, start)?;
    let end_idx = resolve(graph, end)?;
    if start_idx == end_idx {
        return Ok(Some(vec![start.clone()]));
    }

    let node_count = graph.node_count();
    let goal = graph.nodes()[end_idx].position();
    let h = |idx: usize| distance(graph.nodes()[idx].position(), goal) * heuristic_scale;

    let mut g_score = vec![f64::INFINITY; node_count];
    let mut came_from: Vec<Option<usize>> = vec![None; node_count];
    let mut closed = vec![false; node_count];
    let mut open_set: BinaryHeap<Reverse<OpenNode>> = BinaryHeap::new();

    g_score[start_idx] = 0.0;
    open_set.push(Reverse(OpenNode {
        node: start_idx,
        g_score: FloatOrd(0.0),
        f_score: FloatOrd(h(start_idx)),
    }));

    let mut nodes_visited = 0usize;
    let mut reached = false;

    while let Some(Reverse(current)) = open_set.pop() {
        if closed[current.node] {
            continue;
        }
        if current.g_score.0 > g_score[current.node] {
            continue;
        }

        nodes_visited += 1;
        if current.node == end_idx {
            reached = true;
            break;
        }
        closed[current.node] = true;

        for (next, edge) in graph.outgoing(current.node) {
            if closed[next] {
                continue;
            }
            let tentative_g = current.g_score.0 + edge.weight();
            if tentative_g < g_score[next] {
                g_score[next] = tentative_g;
                came_from[next] = Some(current.node);
                open_set.push(Reverse(OpenNode {
                    node: next,
                    g_score: FloatOrd(tentative_g),
                    f_score: FloatOrd(tentative_g + h(next)),
                }));
            }
        }
    }

    if !reached {
        tracing::debug!(%start, %end, nodes_visited, "no path found");
        return Ok(None);
    }

    let mut path = vec![end_idx];
    let mut current = end_idx;
    while let Some(prev) = came_from[current] {
        path.push(prev);
        current = prev;
    }
    path.reverse();

    tracing::trace!(%start, %end, nodes_visited, steps = path.len(), "path found");
    Ok(Some(
        path.into_iter()
            .map(|idx| graph.nodes()[idx].id.clone())
            .collect(),
    ))
}

/// Sum of `distance × cost` along `path`, converted to kilometres.
///
/// Every consecutive pair must have an edge in the edge map; a gap is a
/// builder/pathfinder mismatch and fails with `MissingEdge`.
pub fn compute_path_cost(graph: &RoutingGraph, path: &[NodeId], km_per_pixel: f64) -> Result<f64> {
    let mut total = 0.0;
    for pair in path.windows(2) {
        let Some(edge) = graph.edge(&pair[0], &pair[1]) else {
            tracing::error!(from = %pair[0], to = %pair[1], "path step has no edge in the edge map");
            return Err(RoutingError::MissingEdge {
                from: pair[0].clone(),
                to: pair[1].clone(),
            });
        };
        total += edge.weight();
    }
    Ok(total * km_per_pixel)
}
