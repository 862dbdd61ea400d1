//! The fluent filter builder.
//!
//! Each combinator returns the builder with one more predicate; nothing
//! executes until [`FilterQuery::execute`]. Execution applies every
//! indexed predicate as a set intersection over candidate internal ids,
//! short-circuits on an empty intermediate result, then runs residual
//! predicates over the surviving individuals.

use crate::graph::node::{IndividualNode, InternalId};
use crate::query::QueryEngine;
use crate::types::individual::gender::Sex;
use crate::types::place;
use crate::GedcomError;
use std::sync::Arc;

/// A predicate answerable from a secondary index.
enum IndexedPredicate {
    NameLower(String),
    Surname(String),
    BirthYear(i32),
    BirthYearRange(i32, i32),
    BirthPlaceToken(String),
    SexIs(Sex),
    HasChildren,
    HasSpouse,
    Living,
    Deceased,
}

/// A predicate evaluated against the node itself.
enum ResidualPredicate {
    GivenName(String),
    NameStarts(String),
    NameEnds(String),
    BirthMonth(u8),
    BirthDay(u8),
    BirthPlaceContains(String),
    Custom(Box<dyn Fn(&IndividualNode) -> bool + Send + Sync>),
}

impl ResidualPredicate {
    fn matches(&self, node: &IndividualNode) -> bool {
        match self {
            ResidualPredicate::GivenName(given) => node
                .given
                .as_deref()
                .is_some_and(|g| g.eq_ignore_ascii_case(given)),
            ResidualPredicate::NameStarts(prefix) => node.name_lower.starts_with(prefix),
            ResidualPredicate::NameEnds(suffix) => node.name_lower.ends_with(suffix),
            ResidualPredicate::BirthMonth(month) => node.birth_month == Some(*month),
            ResidualPredicate::BirthDay(day) => node.birth_day == Some(*day),
            ResidualPredicate::BirthPlaceContains(needle) => node
                .birth_place
                .as_deref()
                .is_some_and(|p| place::normalize(p).contains(needle)),
            ResidualPredicate::Custom(predicate) => predicate(node),
        }
    }
}

/// A composable individual filter; see the module docs.
pub struct FilterQuery<'e, 'g> {
    engine: &'e QueryEngine<'g>,
    indexed: Vec<IndexedPredicate>,
    residual: Vec<ResidualPredicate>,
}

impl<'e, 'g> FilterQuery<'e, 'g> {
    pub(crate) fn new(engine: &'e QueryEngine<'g>) -> Self {
        Self {
            engine,
            indexed: Vec::new(),
            residual: Vec::new(),
        }
    }

    /// Exact full-name match, case-insensitive.
    #[must_use]
    pub fn by_name(mut self, name: &str) -> Self {
        self.indexed
            .push(IndexedPredicate::NameLower(name.to_lowercase()));
        self
    }

    /// Exact surname match, case-insensitive.
    #[must_use]
    pub fn by_surname(mut self, surname: &str) -> Self {
        self.indexed
            .push(IndexedPredicate::Surname(surname.to_lowercase()));
        self
    }

    /// Exact given-name match, case-insensitive.
    #[must_use]
    pub fn by_given_name(mut self, given: &str) -> Self {
        self.residual
            .push(ResidualPredicate::GivenName(given.to_string()));
        self
    }

    /// Full name begins with the prefix, case-insensitive.
    #[must_use]
    pub fn by_name_starts(mut self, prefix: &str) -> Self {
        self.residual
            .push(ResidualPredicate::NameStarts(prefix.to_lowercase()));
        self
    }

    /// Full name ends with the suffix, case-insensitive.
    #[must_use]
    pub fn by_name_ends(mut self, suffix: &str) -> Self {
        self.residual
            .push(ResidualPredicate::NameEnds(suffix.to_lowercase()));
        self
    }

    /// Exact birth year.
    #[must_use]
    pub fn by_birth_year(mut self, year: i32) -> Self {
        self.indexed.push(IndexedPredicate::BirthYear(year));
        self
    }

    /// Birth year within `[low, high]`, inclusive.
    #[must_use]
    pub fn by_birth_year_range(mut self, low: i32, high: i32) -> Self {
        self.indexed.push(IndexedPredicate::BirthYearRange(low, high));
        self
    }

    /// Birth month (1-12), for dates that carry one.
    #[must_use]
    pub fn by_birth_month(mut self, month: u8) -> Self {
        self.residual.push(ResidualPredicate::BirthMonth(month));
        self
    }

    /// Birth day of month, for dates that carry one.
    #[must_use]
    pub fn by_birth_day(mut self, day: u8) -> Self {
        self.residual.push(ResidualPredicate::BirthDay(day));
        self
    }

    /// Birth place containing the given text (normalized). The place
    /// token index narrows candidates when the text yields one.
    #[must_use]
    pub fn by_birth_place(mut self, place_text: &str) -> Self {
        if let Some(token) = place::primary_token(place_text) {
            self.indexed.push(IndexedPredicate::BirthPlaceToken(token));
        }
        self.residual.push(ResidualPredicate::BirthPlaceContains(
            place::normalize(place_text),
        ));
        self
    }

    /// Sex equals the given value.
    #[must_use]
    pub fn by_sex(mut self, sex: Sex) -> Self {
        self.indexed.push(IndexedPredicate::SexIs(sex));
        self
    }

    /// Individual has at least one child.
    #[must_use]
    pub fn has_children(mut self) -> Self {
        self.indexed.push(IndexedPredicate::HasChildren);
        self
    }

    /// Individual has at least one spouse.
    #[must_use]
    pub fn has_spouse(mut self) -> Self {
        self.indexed.push(IndexedPredicate::HasSpouse);
        self
    }

    /// Individual has no death record.
    #[must_use]
    pub fn living(mut self) -> Self {
        self.indexed.push(IndexedPredicate::Living);
        self
    }

    /// Individual has a death record.
    #[must_use]
    pub fn deceased(mut self) -> Self {
        self.indexed.push(IndexedPredicate::Deceased);
        self
    }

    /// Arbitrary user predicate, evaluated last.
    #[must_use]
    pub fn where_fn<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&IndividualNode) -> bool + Send + Sync + 'static,
    {
        self.residual
            .push(ResidualPredicate::Custom(Box::new(predicate)));
        self
    }

    /// Runs the filter and returns matching individuals in ascending
    /// internal-id order (== file order).
    ///
    /// # Errors
    ///
    /// Returns a `GedcomError` on backend failure.
    pub fn execute(self) -> Result<Vec<Arc<IndividualNode>>, GedcomError> {
        let graph = self.engine.graph();
        let indexes = graph.indexes();

        let mut candidates: Option<Vec<InternalId>> = None;
        for predicate in &self.indexed {
            let ids: Vec<InternalId> = match predicate {
                IndexedPredicate::NameLower(name) => {
                    indexes.by_name_lower.get(name).cloned().unwrap_or_default()
                }
                IndexedPredicate::Surname(surname) => {
                    indexes.by_surname.get(surname).cloned().unwrap_or_default()
                }
                IndexedPredicate::BirthYear(year) => {
                    indexes.by_birth_year.get(year).cloned().unwrap_or_default()
                }
                IndexedPredicate::BirthYearRange(low, high) => {
                    indexes.birth_year_range(*low, *high)
                }
                IndexedPredicate::BirthPlaceToken(token) => indexes
                    .by_place_token
                    .get(token)
                    .cloned()
                    .unwrap_or_default(),
                IndexedPredicate::SexIs(sex) => {
                    indexes.by_sex.get(sex).cloned().unwrap_or_default()
                }
                IndexedPredicate::HasChildren => indexes.has_children.clone(),
                IndexedPredicate::HasSpouse => indexes.has_spouse.clone(),
                IndexedPredicate::Living => indexes.living.clone(),
                IndexedPredicate::Deceased => indexes.deceased.clone(),
            };

            candidates = Some(match candidates {
                Some(existing) => intersect_sorted(&existing, &ids),
                None => ids,
            });

            // An empty intermediate result short-circuits to empty.
            if candidates.as_ref().is_some_and(Vec::is_empty) {
                return Ok(Vec::new());
            }
        }

        let candidate_ids = match candidates {
            Some(ids) => ids,
            None => graph.individual_ids()?,
        };

        let mut results = Vec::new();
        for id in candidate_ids {
            let Some(node) = graph.individual(id)? else {
                continue;
            };
            if self.residual.iter().all(|p| p.matches(&node)) {
                results.push(node);
            }
        }
        Ok(results)
    }

    /// Runs the filter and returns the match count.
    ///
    /// # Errors
    ///
    /// Returns a `GedcomError` on backend failure.
    pub fn count(self) -> Result<usize, GedcomError> {
        Ok(self.execute()?.len())
    }
}

/// Linear merge of two ascending id lists.
fn intersect_sorted(a: &[InternalId], b: &[InternalId]) -> Vec<InternalId> {
    let mut out = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out
}
