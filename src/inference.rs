//! Exact inference by variable elimination.
//!
//! The engine holds a set of factors over discrete variables and answers two
//! kinds of query: conditional distributions over a query set given evidence
//! (sum-product elimination, Koller & Friedman Ch. 9) and most-probable
//! assignments (max-product elimination with traceback, Ch. 13).

use std::collections::{BTreeMap, BTreeSet, HashMap};

use log::debug;

use crate::factor::{filter_assignments, Factor};
use crate::ordering::{order_by_min_neighbours, EliminationOrdering};
use crate::util::{GibbsError, Result};
use crate::variable::{Assignment, NumericValue, VarId, Variable};

/// The result of a conditional query: the unnormalized joint over the query
/// variables and the constant that normalizes it.
#[derive(Clone, Debug)]
pub struct QueryResult {
    /// The unnormalized factor over the query variables, after evidence
    /// reduction and elimination of all other variables.
    pub phi: Factor,

    /// The normalizing factor: `phi` with the query variables summed out.
    /// Its total is the probability mass consistent with the evidence.
    pub alpha: Factor,
}

impl QueryResult {
    /// The conditional probability of the given (possibly partial)
    /// assignment over the query variables.
    pub fn probability(&self, query: &Assignment) -> Result<f64> {
        let mut mass = 0.0;
        for row in self.phi.cartesian() {
            if row.is_superset_of(query) {
                mass += self.phi.phi(&row)?;
            }
        }

        Ok(mass / self.alpha.zval()?)
    }
}

/// The result of a MAP query: the jointly most probable assignment and its
/// unnormalized preference value. Evidence variables appear in the
/// assignment at their observed values.
#[derive(Clone, Debug, PartialEq)]
pub struct MapResult {
    pub assignment: Assignment,
    pub value: f64,
}

/// An exact inference engine over a fixed set of factors.
pub struct VariableEliminationEngine {
    factors: Vec<Factor>,
    variables: BTreeMap<VarId, Variable>,
}

impl VariableEliminationEngine {
    /// Create an engine over the given factors. The variable set is the
    /// union of all factor scopes.
    pub fn new(factors: Vec<Factor>) -> Self {
        let mut variables = BTreeMap::new();
        for factor in factors.iter() {
            for var in factor.scope() {
                variables
                    .entry(String::from(var.id()))
                    .or_insert_with(|| var.clone());
            }
        }

        VariableEliminationEngine { factors, variables }
    }

    pub fn factors(&self) -> &[Factor] {
        &self.factors
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables.values()
    }

    pub fn variable_ids(&self) -> BTreeSet<VarId> {
        self.variables.keys().cloned().collect()
    }

    /// The factors whose scope is contained in `ids`.
    pub fn scope_subset_factors(&self, ids: &BTreeSet<VarId>) -> Vec<&Factor> {
        self.factors
            .iter()
            .filter(|f| f.scope_ids().is_subset(ids))
            .collect()
    }

    /// Neighbours of a variable in the interaction graph: every other
    /// variable it shares a factor scope with.
    pub fn neighbours(&self, id: &str) -> BTreeSet<VarId> {
        self.factors
            .iter()
            .filter(|f| f.in_scope(id))
            .flat_map(|f| f.scope_ids())
            .filter(|n| n.as_str() != id)
            .collect()
    }

    /// Compute the conditional distribution over `queries` given `evidence`.
    ///
    /// A query variable that is also observed as evidence is narrowed to
    /// its observed value, so the resulting distribution over it is
    /// degenerate (all mass on the observed value).
    ///
    /// # Errors
    /// * `GibbsError::QueryNotSubset` if a query id is not a variable of
    ///   the engine
    /// * `GibbsError::UnknownEvidenceVariable` if an evidence id is not a
    ///   variable of the engine
    pub fn query(&self, queries: &BTreeSet<VarId>, evidence: &Assignment) -> Result<QueryResult> {
        self.query_with_ordering(queries, evidence, |zs| {
            order_by_min_neighbours(zs, |id| self.neighbours(id))
        })
    }

    /// [`VariableEliminationEngine::query`] with a caller-chosen elimination
    /// ordering over the computed elimination set.
    pub fn query_with_ordering<O>(
        &self,
        queries: &BTreeSet<VarId>,
        evidence: &Assignment,
        ordering_fn: O,
    ) -> Result<QueryResult>
    where
        O: Fn(&BTreeSet<VarId>) -> EliminationOrdering,
    {
        self.check_query(queries, evidence)?;

        let factors = self.reduce_with_evidence(evidence)?;
        let order = ordering_fn(&self.elimination_set(queries, evidence));
        debug!("sum-product elimination order: {:?}", order.ranked());

        let mut working = factors;
        for y in order.ranked() {
            let (relevant, rest) = partition_by_scope(working, &y);
            if relevant.is_empty() {
                working = rest;
                continue;
            }

            let combined = combine(relevant)?;
            let message = combined.sumout_var(&y)?;
            working = rest;
            working.push(message);
        }

        let phi = combine(working)?;
        let query_ids: Vec<VarId> = phi
            .scope_ids()
            .into_iter()
            .filter(|id| queries.contains(id))
            .collect();
        let alpha = phi.sumout_vars(&query_ids)?;

        Ok(QueryResult { phi, alpha })
    }

    /// Compute the most probable joint assignment given `evidence`.
    ///
    /// Variables in `queries` are kept through elimination and fixed by an
    /// extremal scan over the final joint; every other non-evidence variable
    /// is eliminated by max-product, recording at each step which value of
    /// the eliminated variable attained the maximum. The full assignment is
    /// then recovered by tracing those records back in reverse elimination
    /// order. An empty query set maximizes over all non-evidence variables.
    pub fn map_query(&self, queries: &BTreeSet<VarId>, evidence: &Assignment) -> Result<MapResult> {
        self.map_query_with_ordering(queries, evidence, |zs| {
            order_by_min_neighbours(zs, |id| self.neighbours(id))
        })
    }

    /// [`VariableEliminationEngine::map_query`] with a caller-chosen
    /// elimination ordering over the computed elimination set.
    pub fn map_query_with_ordering<O>(
        &self,
        queries: &BTreeSet<VarId>,
        evidence: &Assignment,
        ordering_fn: O,
    ) -> Result<MapResult>
    where
        O: Fn(&BTreeSet<VarId>) -> EliminationOrdering,
    {
        self.check_query(queries, evidence)?;

        let factors = self.reduce_with_evidence(evidence)?;
        let order = ordering_fn(&self.elimination_set(queries, evidence));
        debug!("max-product elimination order: {:?}", order.ranked());

        let mut working = factors;
        let mut potentials: Vec<(VarId, HashMap<Assignment, NumericValue>)> = Vec::new();

        for y in order.ranked() {
            let (relevant, rest) = partition_by_scope(working, &y);
            if relevant.is_empty() {
                working = rest;
                continue;
            }

            let combined = combine(relevant)?;
            let (message, argmax) = combined.maxout_var_with_table(&y)?;
            potentials.push((y, argmax));
            working = rest;
            working.push(message);
        }

        let phi = combine(working)?;
        let mut assignment = phi.max_value()?;
        let value = phi.phi(&assignment)?;

        // traceback: in reverse elimination order, each potential table maps
        // an assignment over its key scope to the maximizing value of the
        // eliminated variable
        for (y, argmax) in potentials.iter().rev() {
            let key_ids: Vec<&str> = match argmax.keys().next() {
                Some(key) => key.vars().map(|v| v.as_str()).collect(),
                None => continue,
            };
            let key = assignment.project(key_ids);
            let best = argmax
                .get(&key)
                .ok_or_else(|| GibbsError::UnmatchedAssignment(key.to_string()))?;
            assignment.set(y, *best);
        }

        Ok(MapResult { assignment, value })
    }

    /// Reduce every factor touched by the evidence; untouched factors are
    /// kept as-is.
    fn reduce_with_evidence(&self, evidence: &Assignment) -> Result<Vec<Factor>> {
        let mut reduced = Vec::with_capacity(self.factors.len());
        for factor in self.factors.iter() {
            let relevant = filter_assignments(evidence, factor.scope());
            if relevant.is_empty() {
                reduced.push(factor.clone());
            } else {
                reduced.push(factor.reduced(&relevant)?);
            }
        }
        Ok(reduced)
    }

    /// The elimination set: model variables that are neither queried nor
    /// observed.
    fn elimination_set(&self, queries: &BTreeSet<VarId>, evidence: &Assignment) -> BTreeSet<VarId> {
        self.variables
            .keys()
            .filter(|id| !queries.contains(*id) && !evidence.contains_var(id))
            .cloned()
            .collect()
    }

    fn check_query(&self, queries: &BTreeSet<VarId>, evidence: &Assignment) -> Result<()> {
        for id in queries.iter() {
            if !self.variables.contains_key(id) {
                return Err(GibbsError::QueryNotSubset(id.clone()));
            }
        }
        self.check_evidence(evidence)
    }

    fn check_evidence(&self, evidence: &Assignment) -> Result<()> {
        for (id, _) in evidence.iter() {
            if !self.variables.contains_key(id) {
                return Err(GibbsError::UnknownEvidenceVariable(id.clone()));
            }
        }
        Ok(())
    }
}

/// Split factors into those with `y` in scope and the rest.
fn partition_by_scope(factors: Vec<Factor>, y: &str) -> (Vec<Factor>, Vec<Factor>) {
    factors.into_iter().partition(|f| f.in_scope(y))
}

/// Fold a non-empty factor set into its product.
fn combine(factors: Vec<Factor>) -> Result<Factor> {
    let mut iter = factors.into_iter();
    let first = iter
        .next()
        .ok_or_else(|| GibbsError::InvalidScope(String::from("cannot combine zero factors")))?;

    iter.try_fold(first, |acc, f| acc.product(&f).map(|(p, _)| p))
}
