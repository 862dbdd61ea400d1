//! Path finding over the undirected projection of the graph.
//!
//! The projection alternates individual and family nodes: FAMC/CHIL and
//! HUSB/WIFE/FAMS edges are walked in both directions. Shortest paths use
//! bidirectional breadth-first search; exhaustive enumeration uses a
//! depth-limited DFS whose visited set lives on the search stack only.

use crate::cancel::{check_opt, CancelToken};
use crate::graph::node::{EdgeKind, InternalId, NodeKind};
use crate::graph::Graph;
use crate::GedcomError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One node along a path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathStep {
    /// Individual or Family.
    pub kind: NodeKind,
    /// The node's xref.
    pub xref: String,
    /// The node's internal id.
    pub id: InternalId,
}

/// A node-and-edge sequence; `edges[i]` connects `nodes[i]` to
/// `nodes[i + 1]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Path {
    /// Nodes from start to end inclusive.
    pub nodes: Vec<PathStep>,
    /// Edge labels between consecutive nodes.
    pub edges: Vec<EdgeKind>,
}

impl Path {
    /// Number of edges.
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// True for a single-node path.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// A graph node reference in the undirected projection.
type NodeRef = (NodeKind, InternalId);

/// Undirected neighbors with the edge label as seen from `node`.
fn neighbors(graph: &Graph, node: NodeRef) -> Result<Vec<(NodeRef, EdgeKind)>, GedcomError> {
    let mut out = Vec::new();
    match node.0 {
        NodeKind::Individual => {
            if let Some(individual) = graph.individual(node.1)? {
                for &family in &individual.famc {
                    out.push(((NodeKind::Family, family), EdgeKind::Famc));
                }
                for &family in &individual.fams {
                    out.push(((NodeKind::Family, family), EdgeKind::Fams));
                }
            }
        }
        NodeKind::Family => {
            if let Some(family) = graph.family(node.1)? {
                if let Some(husband) = family.husband {
                    out.push(((NodeKind::Individual, husband), EdgeKind::Husb));
                }
                if let Some(wife) = family.wife {
                    out.push(((NodeKind::Individual, wife), EdgeKind::Wife));
                }
                for &child in &family.children {
                    out.push(((NodeKind::Individual, child), EdgeKind::Chil));
                }
            }
        }
        _ => {}
    }
    Ok(out)
}

fn step(graph: &Graph, node: NodeRef) -> Result<PathStep, GedcomError> {
    let xref = graph
        .xref_of(node.1)?
        .ok_or_else(|| GedcomError::NotFound(format!("node id {}", node.1)))?;
    Ok(PathStep {
        kind: node.0,
        xref,
        id: node.1,
    })
}

/// Expands one side of the bidirectional search by a whole level.
/// Returns the meeting node as soon as the other side has seen it.
fn expand_side(
    graph: &Graph,
    frontier: &mut Vec<NodeRef>,
    own_parent: &mut HashMap<NodeRef, (NodeRef, EdgeKind)>,
    other_parent: &HashMap<NodeRef, (NodeRef, EdgeKind)>,
) -> Result<Option<NodeRef>, GedcomError> {
    let mut next = Vec::new();
    for &node in frontier.iter() {
        for (neighbor, edge) in neighbors(graph, node)? {
            if own_parent.contains_key(&neighbor) {
                continue;
            }
            own_parent.insert(neighbor, (node, edge));
            if other_parent.contains_key(&neighbor) {
                return Ok(Some(neighbor));
            }
            next.push(neighbor);
        }
    }
    *frontier = next;
    Ok(None)
}

/// Bidirectional BFS between two individuals. Returns `None` when the two
/// are not connected.
pub(crate) fn shortest_path(
    graph: &Graph,
    from: InternalId,
    to: InternalId,
) -> Result<Option<Path>, GedcomError> {
    let start: NodeRef = (NodeKind::Individual, from);
    let goal: NodeRef = (NodeKind::Individual, to);
    if start == goal {
        return Ok(Some(Path {
            nodes: vec![step(graph, start)?],
            edges: Vec::new(),
        }));
    }

    // parent maps double as visited sets; the start/goal map to themselves.
    let mut forward_parent: HashMap<NodeRef, (NodeRef, EdgeKind)> = HashMap::new();
    let mut backward_parent: HashMap<NodeRef, (NodeRef, EdgeKind)> = HashMap::new();
    forward_parent.insert(start, (start, EdgeKind::Fams));
    backward_parent.insert(goal, (goal, EdgeKind::Fams));

    let mut forward_frontier = vec![start];
    let mut backward_frontier = vec![goal];

    let meeting: Option<NodeRef> = loop {
        if forward_frontier.is_empty() || backward_frontier.is_empty() {
            break None;
        }

        // Expand the smaller frontier; ties expand forward, keeping the
        // search deterministic.
        let met = if forward_frontier.len() <= backward_frontier.len() {
            expand_side(
                graph,
                &mut forward_frontier,
                &mut forward_parent,
                &backward_parent,
            )?
        } else {
            expand_side(
                graph,
                &mut backward_frontier,
                &mut backward_parent,
                &forward_parent,
            )?
        };
        if met.is_some() {
            break met;
        }
    };

    let Some(meeting) = meeting else {
        return Ok(None);
    };

    // Walk from the meeting node back to both endpoints.
    let mut forward_half: Vec<(NodeRef, Option<EdgeKind>)> = Vec::new();
    let mut current = meeting;
    loop {
        let (parent, edge) = forward_parent[&current];
        forward_half.push((current, (parent != current).then_some(edge)));
        if parent == current {
            break;
        }
        current = parent;
    }
    forward_half.reverse();

    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    for (node, edge) in &forward_half {
        if let Some(edge) = edge {
            edges.push(*edge);
        }
        nodes.push(step(graph, *node)?);
    }

    let mut current = meeting;
    loop {
        let (parent, edge) = backward_parent[&current];
        if parent == current {
            break;
        }
        edges.push(edge);
        nodes.push(step(graph, parent)?);
        current = parent;
    }

    Ok(Some(Path { nodes, edges }))
}

/// Depth-limited DFS enumeration of all simple paths between two
/// individuals, with at most `max_length` edges per path.
pub(crate) fn all_paths(
    graph: &Graph,
    from: InternalId,
    to: InternalId,
    max_length: usize,
    cancel: Option<&CancelToken>,
) -> Result<Vec<Path>, GedcomError> {
    let start: NodeRef = (NodeKind::Individual, from);
    let goal: NodeRef = (NodeKind::Individual, to);

    let mut paths = Vec::new();
    let mut node_stack: Vec<NodeRef> = vec![start];
    let mut edge_stack: Vec<EdgeKind> = Vec::new();

    // Explicit DFS: each frame is the neighbor list and a cursor into it.
    let mut frames: Vec<(Vec<(NodeRef, EdgeKind)>, usize)> =
        vec![(neighbors(graph, start)?, 0)];

    while let Some((frame_neighbors, cursor)) = frames.last_mut() {
        check_opt(cancel)?;

        let Some(&(neighbor, edge)) = frame_neighbors.get(*cursor) else {
            frames.pop();
            node_stack.pop();
            edge_stack.pop();
            continue;
        };
        *cursor += 1;

        // The visited set is the path itself.
        if node_stack.contains(&neighbor) {
            continue;
        }
        if edge_stack.len() + 1 > max_length {
            continue;
        }

        if neighbor == goal {
            let mut nodes = Vec::with_capacity(node_stack.len() + 1);
            for &node in node_stack.iter() {
                nodes.push(step(graph, node)?);
            }
            nodes.push(step(graph, goal)?);
            let mut edges = edge_stack.clone();
            edges.push(edge);
            paths.push(Path { nodes, edges });
            continue;
        }

        node_stack.push(neighbor);
        edge_stack.push(edge);
        frames.push((neighbors(graph, neighbor)?, 0));
    }

    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Gedcom;

    const COUPLE_WITH_CHILD: &str = "\
        0 HEAD\n\
        0 @I1@ INDI\n\
        1 FAMS @F1@\n\
        0 @I2@ INDI\n\
        1 FAMS @F1@\n\
        0 @I3@ INDI\n\
        1 FAMC @F1@\n\
        0 @I4@ INDI\n\
        0 @F1@ FAM\n\
        1 HUSB @I1@\n\
        1 WIFE @I2@\n\
        1 CHIL @I3@\n\
        0 TRLR";

    fn graph() -> Graph {
        Graph::build(&Gedcom::parse_str(COUPLE_WITH_CHILD).unwrap()).unwrap()
    }

    #[test]
    fn test_spouse_path_goes_through_family() {
        let graph = graph();
        let from = graph.require_individual("@I1@").unwrap().id;
        let to = graph.require_individual("@I2@").unwrap().id;
        let path = shortest_path(&graph, from, to).unwrap().unwrap();
        assert_eq!(path.len(), 2);
        let xrefs: Vec<&str> = path.nodes.iter().map(|n| n.xref.as_str()).collect();
        assert_eq!(xrefs, vec!["@I1@", "@F1@", "@I2@"]);
    }

    #[test]
    fn test_path_lengths_are_symmetric() {
        let graph = graph();
        let a = graph.require_individual("@I3@").unwrap().id;
        let b = graph.require_individual("@I2@").unwrap().id;
        let forward = shortest_path(&graph, a, b).unwrap().unwrap();
        let backward = shortest_path(&graph, b, a).unwrap().unwrap();
        assert_eq!(forward.len(), backward.len());
    }

    #[test]
    fn test_unconnected_pair_has_no_path() {
        let graph = graph();
        let a = graph.require_individual("@I1@").unwrap().id;
        let b = graph.require_individual("@I4@").unwrap().id;
        assert!(shortest_path(&graph, a, b).unwrap().is_none());
    }

    #[test]
    fn test_identity_path() {
        let graph = graph();
        let a = graph.require_individual("@I1@").unwrap().id;
        let path = shortest_path(&graph, a, a).unwrap().unwrap();
        assert!(path.is_empty());
        assert_eq!(path.nodes.len(), 1);
    }

    #[test]
    fn test_all_paths_depth_limit() {
        let graph = graph();
        let a = graph.require_individual("@I1@").unwrap().id;
        let b = graph.require_individual("@I3@").unwrap().id;

        let none = all_paths(&graph, a, b, 1, None).unwrap();
        assert!(none.is_empty());

        let some = all_paths(&graph, a, b, 4, None).unwrap();
        assert_eq!(some.len(), 1);
        assert_eq!(some[0].len(), 2);
    }

    #[test]
    fn test_all_paths_cancellation() {
        let graph = graph();
        let a = graph.require_individual("@I1@").unwrap().id;
        let b = graph.require_individual("@I3@").unwrap().id;
        let token = CancelToken::new();
        token.cancel();
        assert!(matches!(
            all_paths(&graph, a, b, 4, Some(&token)),
            Err(GedcomError::Cancelled)
        ));
    }
}
