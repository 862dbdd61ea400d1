//! Generation-streaming traversal of ancestors and descendants.
//!
//! [`Generations`] is a stateful iterator that owns its frontier: each
//! `next()` expands one generation, so callers can stream arbitrarily
//! deep pedigrees, stop early, or cancel between generations. Every node
//! is visited at most once per traversal, which keeps pathological
//! pedigree collapse (and even cycles) terminating.

use crate::cancel::{check_opt, CancelToken};
use crate::graph::node::{IndividualNode, InternalId};
use crate::graph::Graph;
use crate::GedcomError;
use std::collections::HashSet;
use std::sync::Arc;

/// Traversal direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Follow the parent cache upwards.
    Ancestors,
    /// Follow FAMS → CHIL downwards.
    Descendants,
}

/// One generation of a traversal.
#[derive(Clone, Debug)]
pub struct Generation {
    /// Distance from the start individual (1 = parents/children).
    pub depth: u32,
    /// Members in deterministic order (edge order, first-seen wins).
    pub members: Vec<Arc<IndividualNode>>,
}

/// Iterator over generations; see the module docs.
pub struct Generations<'g> {
    graph: &'g Graph,
    direction: Direction,
    frontier: Vec<InternalId>,
    visited: HashSet<InternalId>,
    depth: u32,
    max_generations: Option<u32>,
    cancel: Option<CancelToken>,
    done: bool,
}

impl<'g> Generations<'g> {
    pub(crate) fn new(
        graph: &'g Graph,
        start: InternalId,
        direction: Direction,
        max_generations: Option<u32>,
        cancel: Option<&CancelToken>,
    ) -> Self {
        let mut visited = HashSet::new();
        visited.insert(start);
        Self {
            graph,
            direction,
            frontier: vec![start],
            visited,
            depth: 0,
            max_generations,
            cancel: cancel.cloned(),
            done: false,
        }
    }

    /// Neighbors of `id` in the traversal direction, in edge order.
    fn expand(&self, id: InternalId) -> Result<Vec<InternalId>, GedcomError> {
        let Some(node) = self.graph.individual(id)? else {
            return Ok(Vec::new());
        };
        match self.direction {
            Direction::Ancestors => Ok(node.parents.clone()),
            Direction::Descendants => {
                let mut children = Vec::new();
                for &family_id in &node.fams {
                    if let Some(family) = self.graph.family(family_id)? {
                        children.extend_from_slice(&family.children);
                    }
                }
                Ok(children)
            }
        }
    }

    fn next_generation(&mut self) -> Result<Option<Generation>, GedcomError> {
        if self.done {
            return Ok(None);
        }
        if let Some(max) = self.max_generations {
            if self.depth >= max {
                self.done = true;
                return Ok(None);
            }
        }
        check_opt(self.cancel.as_ref())?;

        let mut next: Vec<InternalId> = Vec::new();
        for &id in &self.frontier {
            for neighbor in self.expand(id)? {
                if self.visited.insert(neighbor) {
                    next.push(neighbor);
                }
            }
        }

        if next.is_empty() {
            self.done = true;
            return Ok(None);
        }

        self.depth += 1;
        self.frontier = next;

        let mut members = Vec::with_capacity(self.frontier.len());
        for &id in &self.frontier {
            if let Some(node) = self.graph.individual(id)? {
                members.push(node);
            }
        }
        Ok(Some(Generation {
            depth: self.depth,
            members,
        }))
    }
}

impl Iterator for Generations<'_> {
    type Item = Result<Generation, GedcomError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_generation() {
            Ok(Some(generation)) => Some(Ok(generation)),
            Ok(None) => None,
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Gedcom;

    const THREE_GENERATIONS: &str = "\
        0 HEAD\n\
        0 @IG1@ INDI\n\
        1 FAMS @F0@\n\
        0 @IG2@ INDI\n\
        1 FAMS @F0@\n\
        0 @I1@ INDI\n\
        1 FAMC @F0@\n\
        1 FAMS @F2@\n\
        0 @I2@ INDI\n\
        1 FAMS @F2@\n\
        0 @I3@ INDI\n\
        1 FAMC @F2@\n\
        0 @F0@ FAM\n\
        1 HUSB @IG1@\n\
        1 WIFE @IG2@\n\
        1 CHIL @I1@\n\
        0 @F2@ FAM\n\
        1 HUSB @I1@\n\
        1 WIFE @I2@\n\
        1 CHIL @I3@\n\
        0 TRLR";

    fn graph() -> Graph {
        let tree = Gedcom::parse_str(THREE_GENERATIONS).unwrap();
        Graph::build(&tree).unwrap()
    }

    #[test]
    fn test_ancestor_generations_stream_in_order() {
        let graph = graph();
        let start = graph.require_individual("@I3@").unwrap();
        let mut iter = Generations::new(&graph, start.id, Direction::Ancestors, None, None);

        let first = iter.next().unwrap().unwrap();
        assert_eq!(first.depth, 1);
        let xrefs: Vec<&str> = first.members.iter().map(|m| m.xref.as_str()).collect();
        assert_eq!(xrefs, vec!["@I1@", "@I2@"]);

        let second = iter.next().unwrap().unwrap();
        assert_eq!(second.depth, 2);
        let xrefs: Vec<&str> = second.members.iter().map(|m| m.xref.as_str()).collect();
        assert_eq!(xrefs, vec!["@IG1@", "@IG2@"]);

        assert!(iter.next().is_none());
    }

    #[test]
    fn test_max_generations_bound() {
        let graph = graph();
        let start = graph.require_individual("@I3@").unwrap();
        let generations: Vec<_> =
            Generations::new(&graph, start.id, Direction::Ancestors, Some(1), None)
                .map(Result::unwrap)
                .collect();
        assert_eq!(generations.len(), 1);
    }

    #[test]
    fn test_descendants_mirror() {
        let graph = graph();
        let start = graph.require_individual("@IG1@").unwrap();
        let generations: Vec<_> =
            Generations::new(&graph, start.id, Direction::Descendants, None, None)
                .map(Result::unwrap)
                .collect();
        assert_eq!(generations.len(), 2);
        assert_eq!(generations[0].members[0].xref, "@I1@");
        assert_eq!(generations[1].members[0].xref, "@I3@");
    }

    #[test]
    fn test_cancelled_traversal_errors() {
        let graph = graph();
        let start = graph.require_individual("@I3@").unwrap();
        let token = CancelToken::new();
        token.cancel();
        let mut iter =
            Generations::new(&graph, start.id, Direction::Ancestors, None, Some(&token));
        assert!(matches!(iter.next(), Some(Err(GedcomError::Cancelled))));
    }

    #[test]
    fn test_self_parent_cycle_terminates() {
        // Pathological input: an individual who is their own parent.
        let source = "\
            0 HEAD\n\
            0 @I1@ INDI\n\
            1 FAMC @F1@\n\
            1 FAMS @F1@\n\
            0 @F1@ FAM\n\
            1 HUSB @I1@\n\
            1 CHIL @I1@\n\
            0 TRLR";
        let tree = Gedcom::parse_str(source).unwrap();
        let graph = Graph::build(&tree).unwrap();
        let start = graph.require_individual("@I1@").unwrap();
        let generations: Vec<_> =
            Generations::new(&graph, start.id, Direction::Ancestors, None, None)
                .map(Result::unwrap)
                .collect();
        // The only parent is itself, which is already visited.
        assert!(generations.is_empty());
    }
}
