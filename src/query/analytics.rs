//! Graph analytics: centrality, components, density, diameter.
//!
//! Analytics run over the individual-to-individual projection: spouses
//! are adjacent, and each parent is adjacent to each child. All measures
//! are deterministic; results over id-indexed vectors follow ascending
//! internal id.

use crate::cancel::{check_opt, CancelToken};
use crate::graph::node::InternalId;
use crate::query::QueryEngine;
use crate::GedcomError;
use std::collections::{HashMap, VecDeque};

/// Dense adjacency over individuals; positions follow ascending id.
pub(crate) struct Adjacency {
    /// Ascending individual ids.
    pub ids: Vec<InternalId>,
    /// Position of each id in `ids`.
    pub position: HashMap<InternalId, usize>,
    /// Neighbor positions, deduplicated, in first-seen order.
    pub neighbors: Vec<Vec<usize>>,
}

impl Adjacency {
    fn edge_count(&self) -> usize {
        self.neighbors.iter().map(Vec::len).sum::<usize>() / 2
    }
}

impl QueryEngine<'_> {
    /// Builds the undirected individual-level adjacency.
    pub(crate) fn adjacency(&self) -> Result<Adjacency, GedcomError> {
        let graph = self.graph();
        let ids = graph.individual_ids()?;
        let position: HashMap<InternalId, usize> =
            ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        let mut neighbors: Vec<Vec<usize>> = vec![Vec::new(); ids.len()];

        let connect = |a: InternalId, b: InternalId, neighbors: &mut Vec<Vec<usize>>| {
            let (Some(&pa), Some(&pb)) = (position.get(&a), position.get(&b)) else {
                return;
            };
            if pa != pb && !neighbors[pa].contains(&pb) {
                neighbors[pa].push(pb);
                neighbors[pb].push(pa);
            }
        };

        for family_id in graph.family_ids()? {
            let Some(family) = graph.family(family_id)? else {
                continue;
            };
            if let (Some(husband), Some(wife)) = (family.husband, family.wife) {
                connect(husband, wife, &mut neighbors);
            }
            for &child in &family.children {
                for parent in family.spouses() {
                    connect(parent, child, &mut neighbors);
                }
            }
        }

        Ok(Adjacency {
            ids,
            position,
            neighbors,
        })
    }

    /// Degree centrality per individual: `deg / (n - 1)`.
    pub fn degree_centrality(&self) -> Result<Vec<(InternalId, f64)>, GedcomError> {
        let adjacency = self.adjacency()?;
        let n = adjacency.ids.len();
        let scale = if n > 1 { (n - 1) as f64 } else { 1.0 };
        Ok(adjacency
            .ids
            .iter()
            .enumerate()
            .map(|(i, &id)| (id, adjacency.neighbors[i].len() as f64 / scale))
            .collect())
    }

    /// Average number of relationship edges per individual.
    pub fn average_degree(&self) -> Result<f64, GedcomError> {
        let adjacency = self.adjacency()?;
        if adjacency.ids.is_empty() {
            return Ok(0.0);
        }
        Ok(2.0 * adjacency.edge_count() as f64 / adjacency.ids.len() as f64)
    }

    /// Edge density of the projection: `2E / (n (n - 1))`.
    pub fn density(&self) -> Result<f64, GedcomError> {
        let adjacency = self.adjacency()?;
        let n = adjacency.ids.len();
        if n < 2 {
            return Ok(0.0);
        }
        Ok(2.0 * adjacency.edge_count() as f64 / (n as f64 * (n - 1) as f64))
    }

    /// Connected components, each listed in ascending id, largest first
    /// (ties broken by the smallest member id).
    pub fn connected_components(&self) -> Result<Vec<Vec<InternalId>>, GedcomError> {
        let adjacency = self.adjacency()?;
        let n = adjacency.ids.len();
        let mut seen = vec![false; n];
        let mut components = Vec::new();

        for start in 0..n {
            if seen[start] {
                continue;
            }
            let mut members = Vec::new();
            let mut queue = VecDeque::from([start]);
            seen[start] = true;
            while let Some(current) = queue.pop_front() {
                members.push(adjacency.ids[current]);
                for &next in &adjacency.neighbors[current] {
                    if !seen[next] {
                        seen[next] = true;
                        queue.push_back(next);
                    }
                }
            }
            members.sort_unstable();
            components.push(members);
        }

        components.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a[0].cmp(&b[0])));
        Ok(components)
    }

    /// Closeness centrality: `(r - 1) / Σd` over the `r` reachable nodes,
    /// scaled by the reachable share so small fragments do not dominate.
    pub fn closeness_centrality(
        &self,
        cancel: Option<&CancelToken>,
    ) -> Result<Vec<(InternalId, f64)>, GedcomError> {
        let adjacency = self.adjacency()?;
        let n = adjacency.ids.len();
        let mut out = Vec::with_capacity(n);

        for start in 0..n {
            check_opt(cancel)?;
            let distances = bfs_distances(&adjacency, start);
            let mut reachable = 0usize;
            let mut total = 0usize;
            for distance in distances.iter().flatten() {
                if *distance > 0 {
                    reachable += 1;
                    total += *distance;
                }
            }
            let value = if reachable == 0 || total == 0 {
                0.0
            } else {
                let closeness = reachable as f64 / total as f64;
                let scale = if n > 1 {
                    reachable as f64 / (n - 1) as f64
                } else {
                    1.0
                };
                closeness * scale
            };
            out.push((adjacency.ids[start], value));
        }
        Ok(out)
    }

    /// Betweenness centrality (Brandes' algorithm, unweighted).
    pub fn betweenness_centrality(
        &self,
        cancel: Option<&CancelToken>,
    ) -> Result<Vec<(InternalId, f64)>, GedcomError> {
        let adjacency = self.adjacency()?;
        let n = adjacency.ids.len();
        let mut centrality = vec![0.0f64; n];

        for source in 0..n {
            check_opt(cancel)?;

            let mut stack: Vec<usize> = Vec::new();
            let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
            let mut sigma = vec![0.0f64; n];
            let mut distance = vec![-1i64; n];
            sigma[source] = 1.0;
            distance[source] = 0;

            let mut queue = VecDeque::from([source]);
            while let Some(v) = queue.pop_front() {
                stack.push(v);
                for &w in &adjacency.neighbors[v] {
                    if distance[w] < 0 {
                        distance[w] = distance[v] + 1;
                        queue.push_back(w);
                    }
                    if distance[w] == distance[v] + 1 {
                        sigma[w] += sigma[v];
                        predecessors[w].push(v);
                    }
                }
            }

            let mut delta = vec![0.0f64; n];
            while let Some(w) = stack.pop() {
                for &v in &predecessors[w] {
                    delta[v] += (sigma[v] / sigma[w]) * (1.0 + delta[w]);
                }
                if w != source {
                    centrality[w] += delta[w];
                }
            }
        }

        // Undirected graphs count each pair twice.
        for value in &mut centrality {
            *value /= 2.0;
        }

        Ok(adjacency
            .ids
            .iter()
            .enumerate()
            .map(|(i, &id)| (id, centrality[i]))
            .collect())
    }

    /// The longest shortest path in the projection. `sample` bounds the
    /// number of BFS sources (taken in ascending id order) to keep very
    /// large graphs tractable; `None` is exhaustive.
    pub fn diameter(
        &self,
        sample: Option<usize>,
        cancel: Option<&CancelToken>,
    ) -> Result<u32, GedcomError> {
        let adjacency = self.adjacency()?;
        let n = adjacency.ids.len();
        let sources = sample.unwrap_or(n).min(n);

        let mut diameter = 0u32;
        for start in 0..sources {
            check_opt(cancel)?;
            for distance in bfs_distances(&adjacency, start).iter().flatten() {
                diameter = diameter.max(*distance as u32);
            }
        }
        Ok(diameter)
    }
}

/// BFS distances from `start`; `None` for unreachable nodes.
fn bfs_distances(adjacency: &Adjacency, start: usize) -> Vec<Option<usize>> {
    let mut distances = vec![None; adjacency.ids.len()];
    distances[start] = Some(0);
    let mut queue = VecDeque::from([start]);
    while let Some(current) = queue.pop_front() {
        let next_distance = distances[current].unwrap_or(0) + 1;
        for &next in &adjacency.neighbors[current] {
            if distances[next].is_none() {
                distances[next] = Some(next_distance);
                queue.push_back(next);
            }
        }
    }
    distances
}
