//! Definition of the variable module
//!
//! A `Variable` is a discrete random variable with a string identifier, a
//! finite set of numeric outcome values and a marginal distribution over
//! those outcomes. Variables are immutable values: operations that narrow a
//! variable (observing evidence) return a new `Variable` and leave the
//! original untouched, so factors holding the "same" variable never alias
//! each other's state.
//!
//! An `Assignment` is one joint value choice for a set of variables: an
//! unordered collection of `(variable id, value)` pairs with at most one
//! pair per variable.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::util::{GibbsError, Result};

/// Identifier of a random variable, unique within a model.
pub type VarId = String;

/// A numeric outcome value of a discrete random variable.
///
/// Wraps `f64` with bitwise equality and hashing so values can key
/// assignment maps. Ordering is total (`f64::total_cmp`).
#[derive(Clone, Copy, Debug)]
pub struct NumericValue(f64);

impl NumericValue {
    pub fn get(&self) -> f64 {
        self.0
    }
}

impl PartialEq for NumericValue {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for NumericValue {}

impl Hash for NumericValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl PartialOrd for NumericValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NumericValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for NumericValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<f64> for NumericValue {
    fn from(v: f64) -> Self {
        NumericValue(v)
    }
}

impl From<i32> for NumericValue {
    fn from(v: i32) -> Self {
        NumericValue(f64::from(v))
    }
}

impl From<bool> for NumericValue {
    fn from(v: bool) -> Self {
        NumericValue(if v { 1.0 } else { 0.0 })
    }
}

/// A partial or complete assignment of values to variables.
///
/// Equality and hashing are defined over the set of pairs, independent of
/// insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Assignment {
    entries: BTreeMap<VarId, NumericValue>,
}

impl Assignment {
    pub fn new() -> Self {
        Assignment::default()
    }

    /// Build an assignment from `(id, value)` pairs. Later pairs win on a
    /// duplicate id.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (VarId, NumericValue)>,
    {
        Assignment {
            entries: pairs.into_iter().collect(),
        }
    }

    /// Set the value of a variable, replacing any previous value.
    pub fn set<V: Into<NumericValue>>(&mut self, id: &str, value: V) {
        self.entries.insert(String::from(id), value.into());
    }

    pub fn get(&self, id: &str) -> Option<NumericValue> {
        self.entries.get(id).copied()
    }

    pub fn contains_var(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&VarId, &NumericValue)> {
        self.entries.iter()
    }

    pub fn vars(&self) -> impl Iterator<Item = &VarId> {
        self.entries.keys()
    }

    /// Merge two assignments. Pairs in `other` win on a shared id.
    pub fn union(&self, other: &Assignment) -> Assignment {
        let mut entries = self.entries.clone();
        for (id, value) in other.entries.iter() {
            entries.insert(id.clone(), *value);
        }
        Assignment { entries }
    }

    /// Restrict the assignment to the given variable ids.
    pub fn project<'a, I>(&self, ids: I) -> Assignment
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut entries = BTreeMap::new();
        for id in ids {
            if let Some(value) = self.entries.get(id) {
                entries.insert(String::from(id), *value);
            }
        }
        Assignment { entries }
    }

    /// Check whether every pair of `other` also occurs in `self`.
    pub fn is_superset_of(&self, other: &Assignment) -> bool {
        other
            .entries
            .iter()
            .all(|(id, value)| self.entries.get(id) == Some(value))
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        write!(f, "{{")?;
        for (id, value) in self.entries.iter() {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", id, value)?;
            first = false;
        }
        write!(f, "}}")
    }
}

/// A discrete random variable with a finite numeric outcome set.
#[derive(Clone, Debug, PartialEq)]
pub struct Variable {
    /// The identifier of the `Variable`
    id: VarId,

    /// The outcome values the `Variable` can take
    outcomes: Vec<NumericValue>,

    /// The marginal probability of each outcome, aligned with `outcomes`
    marginals: Vec<f64>,

    /// Observed evidence. When present, the effective domain is `{evidence}`
    evidence: Option<NumericValue>,
}

impl Variable {
    /// Construct a new `Variable` over the given outcome values.
    ///
    /// The marginal distribution function is evaluated once per outcome at
    /// construction; the variable itself holds only plain data afterwards.
    ///
    /// # Errors
    /// * `GibbsError::EmptyDomain` if `outcomes` is empty
    pub fn new<F>(id: &str, outcomes: &[f64], marginal_distribution: F) -> Result<Variable>
    where
        F: Fn(f64) -> f64,
    {
        if outcomes.is_empty() {
            return Err(GibbsError::EmptyDomain(String::from(id)));
        }

        Ok(Variable {
            id: String::from(id),
            outcomes: outcomes.iter().map(|&v| NumericValue::from(v)).collect(),
            marginals: outcomes.iter().map(|&v| marginal_distribution(v)).collect(),
            evidence: None,
        })
    }

    /// Construct a binary `Variable` with outcomes `{0, 1}` (false/true) and
    /// `P(1) = p_true`.
    pub fn binary(id: &str, p_true: f64) -> Variable {
        Variable {
            id: String::from(id),
            outcomes: vec![NumericValue::from(false), NumericValue::from(true)],
            marginals: vec![1.0 - p_true, p_true],
            evidence: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The full outcome set, ignoring evidence.
    pub fn outcomes(&self) -> &[NumericValue] {
        &self.outcomes
    }

    /// The effective outcome set: the full domain, or the evidence singleton
    /// when evidence has been observed.
    pub fn values(&self) -> Vec<NumericValue> {
        match self.evidence {
            Some(e) => vec![e],
            None => self.outcomes.clone(),
        }
    }

    pub fn evidence(&self) -> Option<NumericValue> {
        self.evidence
    }

    /// The marginal probability of the given outcome value.
    ///
    /// # Errors
    /// * `GibbsError::ValueOutsideDomain` if the variable cannot take `value`
    pub fn marginal(&self, value: NumericValue) -> Result<f64> {
        self.outcomes
            .iter()
            .position(|v| *v == value)
            .map(|i| self.marginals[i])
            .ok_or(GibbsError::ValueOutsideDomain {
                var: self.id.clone(),
                value,
            })
    }

    /// The effective domain as `(id, value)` pairs, filtered and transformed.
    pub fn value_set<F, T>(&self, value_filter: F, value_transform: T) -> Vec<(VarId, NumericValue)>
    where
        F: Fn(&str, NumericValue) -> bool,
        T: Fn((VarId, NumericValue)) -> (VarId, NumericValue),
    {
        self.values()
            .into_iter()
            .filter(|v| value_filter(&self.id, *v))
            .map(|v| value_transform((self.id.clone(), v)))
            .collect()
    }

    /// Observe `value` as evidence, narrowing the effective domain to the
    /// singleton `{value}`. Returns a new `Variable`; `self` is unchanged.
    ///
    /// # Errors
    /// * `GibbsError::ValueOutsideDomain` if the variable cannot take `value`
    pub fn reduce_to_value(&self, value: NumericValue) -> Result<Variable> {
        if !self.outcomes.contains(&value) {
            return Err(GibbsError::ValueOutsideDomain {
                var: self.id.clone(),
                value,
            });
        }

        let mut reduced = self.clone();
        reduced.evidence = Some(value);
        Ok(reduced)
    }

    /// Check if any outcome value is negative.
    pub fn has_negative_outcome(&self) -> bool {
        self.outcomes.iter().any(|v| v.get() < 0.0)
    }
}
