//! Elimination orderings over undirected interaction graphs.
//!
//! Variable elimination is exponential in the width induced by the order in
//! which variables are removed, so the order is chosen by a greedy heuristic
//! before inference runs. The ordering procedures here are pure: they take an
//! adjacency view of the graph and return the order together with the fill
//! edges that triangulating along it would add. Applying the fill edges to a
//! graph is a separate, explicit step.

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use log::trace;

use crate::variable::VarId;

/// An undirected adjacency view: each variable id maps to its neighbour set.
pub type Adjacency = BTreeMap<VarId, BTreeSet<VarId>>;

/// A selection heuristic: given the adjacency, the candidate set, and the
/// already marked (eliminated) ids, pick the next variable to eliminate.
pub type SelectFn = fn(&Adjacency, &BTreeSet<VarId>, &BTreeSet<VarId>) -> Option<VarId>;

/// The result of an ordering procedure.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EliminationOrdering {
    /// Elimination rank per variable id, in rank order.
    pub order: IndexMap<VarId, usize>,

    /// Edges that triangulating the graph along this order would add,
    /// in discovery order. Not applied to any graph by this module.
    pub fill_edges: Vec<(VarId, VarId)>,
}

impl EliminationOrdering {
    /// The variable ids in elimination order.
    pub fn ranked(&self) -> Vec<VarId> {
        self.order.keys().cloned().collect()
    }
}

/// The min-neighbour heuristic: pick the unmarked candidate with the fewest
/// unmarked neighbours. Ties go to the lexicographically smallest id.
pub fn min_unmarked_neighbours(
    adjacency: &Adjacency,
    candidates: &BTreeSet<VarId>,
    marked: &BTreeSet<VarId>,
) -> Option<VarId> {
    candidates
        .iter()
        .filter(|id| !marked.contains(*id))
        .min_by_key(|id| {
            adjacency
                .get(*id)
                .map(|ns| ns.iter().filter(|n| !marked.contains(*n)).count())
                .unwrap_or(0)
        })
        .cloned()
}

/// Order `vars` for elimination by repeatedly applying `select_fn`.
///
/// The adjacency is built over `vars` and their one-hop neighbourhoods, so a
/// heuristic sees the full connectivity of each candidate even when some
/// neighbours are outside the set being ordered. Only members of `vars` are
/// ever selected.
///
/// After each selection the unmarked neighbours of the selected variable are
/// pairwise connected; edges absent from the working adjacency are recorded
/// as fill edges.
///
/// # Args
/// * `vars` - the variable ids to order
/// * `neighbour_fn` - the neighbour set of a variable id in the source graph
/// * `select_fn` - the selection heuristic
pub fn order_by_greedy_metric<N>(
    vars: &BTreeSet<VarId>,
    neighbour_fn: N,
    select_fn: SelectFn,
) -> EliminationOrdering
where
    N: Fn(&str) -> BTreeSet<VarId>,
{
    // the adjacency covers the ordered set and its one-hop neighbourhood;
    // outside nodes keep their own neighbour sets so an existing edge
    // between two of them is never mistaken for fill
    let mut adjacency: Adjacency = BTreeMap::new();
    let mut frontier: BTreeSet<VarId> = BTreeSet::new();
    for id in vars.iter() {
        let neighbours = neighbour_fn(id);
        frontier.extend(neighbours.iter().filter(|n| !vars.contains(*n)).cloned());
        adjacency.insert(id.clone(), neighbours);
    }
    for id in frontier {
        let neighbours = neighbour_fn(&id);
        adjacency.insert(id, neighbours);
    }

    let mut ordering = EliminationOrdering::default();
    let mut marked: BTreeSet<VarId> = BTreeSet::new();

    for rank in 0..vars.len() {
        let selected = match select_fn(&adjacency, vars, &marked) {
            Some(id) => id,
            None => break,
        };
        trace!("eliminating {} at rank {}", selected, rank);

        // connect surviving neighbours of the eliminated variable
        let unmarked: Vec<VarId> = adjacency
            .get(&selected)
            .map(|ns| ns.iter().filter(|n| !marked.contains(*n)).cloned().collect())
            .unwrap_or_default();
        for i in 0..unmarked.len() {
            for j in (i + 1)..unmarked.len() {
                let (u, v) = (&unmarked[i], &unmarked[j]);
                let missing = adjacency.get(u).map_or(true, |ns| !ns.contains(v));
                if missing {
                    ordering.fill_edges.push((u.clone(), v.clone()));
                    adjacency
                        .entry(u.clone())
                        .or_insert_with(BTreeSet::new)
                        .insert(v.clone());
                    adjacency
                        .entry(v.clone())
                        .or_insert_with(BTreeSet::new)
                        .insert(u.clone());
                }
            }
        }

        marked.insert(selected.clone());
        ordering.order.insert(selected, rank);
    }

    ordering
}

/// Order `vars` by the min-neighbour heuristic.
pub fn order_by_min_neighbours<N>(vars: &BTreeSet<VarId>, neighbour_fn: N) -> EliminationOrdering
where
    N: Fn(&str) -> BTreeSet<VarId>,
{
    order_by_greedy_metric(vars, neighbour_fn, min_unmarked_neighbours)
}

/// Order `vars` by descending unmarked-neighbour count (max-cardinality
/// search). No fill edges are computed; the procedure is used on graphs that
/// are already triangulated.
pub fn order_by_max_cardinality<N>(vars: &BTreeSet<VarId>, neighbour_fn: N) -> EliminationOrdering
where
    N: Fn(&str) -> BTreeSet<VarId>,
{
    let adjacency: Adjacency = vars
        .iter()
        .map(|id| (id.clone(), neighbour_fn(id)))
        .collect();

    let mut ordering = EliminationOrdering::default();
    let mut marked: BTreeSet<VarId> = BTreeSet::new();

    for rank in 0..vars.len() {
        let mut best: Option<(&VarId, usize)> = None;
        for id in vars.iter().filter(|id| !marked.contains(*id)) {
            let count = adjacency
                .get(id)
                .map(|ns| ns.iter().filter(|n| !marked.contains(*n)).count())
                .unwrap_or(0);
            // strict comparison keeps the first maximal candidate on ties
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((id, count));
            }
        }

        match best {
            Some((id, _)) => {
                let id = id.clone();
                marked.insert(id.clone());
                ordering.order.insert(id, rank);
            }
            None => break,
        }
    }

    ordering
}

/// Apply the fill edges of an ordering to a graph via the caller's
/// edge-insertion callback.
pub fn apply_fill_edges<F>(ordering: &EliminationOrdering, mut add_edge_fn: F)
where
    F: FnMut(&VarId, &VarId),
{
    for (u, v) in ordering.fill_edges.iter() {
        add_edge_fn(u, v);
    }
}
