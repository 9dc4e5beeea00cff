//! Definition of the factor module
//!
//! A `Factor` represents a relationship between some set of `Variable`s: a
//! function from joint assignments over its scope to non-negative preference
//! values, as described in Koller & Friedman. Factors are immutable after
//! construction; every algebraic operation (product, reduction, sum-out,
//! max-out) returns a new `Factor` and leaves its inputs untouched.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::rc::Rc;

use itertools::Itertools;

use crate::util::{GibbsError, Result};
use crate::variable::{Assignment, NumericValue, VarId, Variable};

/// The factor function: a pure mapping from an assignment over the factor's
/// scope to a preference value.
pub type FactorFn = Rc<dyn Fn(&Assignment) -> Result<f64>>;

#[derive(Clone)]
pub struct Factor {
    /// The identifier of the `Factor`
    id: String,

    /// The scope of the `Factor`, sorted by variable id, unique by id
    scope: Vec<Variable>,

    /// The preference function of the `Factor`
    factor_fn: FactorFn,

    /// The partition value: the sum of `factor_fn` over the full domain
    z: f64,
}

impl fmt::Debug for Factor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Factor")
            .field("id", &self.id)
            .field("scope", &self.scope)
            .field("z", &self.z)
            .finish()
    }
}

impl Factor {
    /// Create a new `Factor` over `scope` with the given preference function.
    ///
    /// The partition value is computed eagerly by enumerating the cartesian
    /// product of the scope variables' effective domains, so construction is
    /// exponential in the scope size.
    ///
    /// # Errors
    /// * `GibbsError::InvalidScope` if a scope variable has a negative
    ///   outcome value, or if two scope variables share an id
    /// * any error raised by `factor_fn` over the domain
    pub fn new<F>(id: &str, scope: Vec<Variable>, factor_fn: F) -> Result<Self>
    where
        F: Fn(&Assignment) -> Result<f64> + 'static,
    {
        Factor::with_fn(id, scope, Rc::new(factor_fn))
    }

    fn with_fn(id: &str, mut scope: Vec<Variable>, factor_fn: FactorFn) -> Result<Self> {
        scope.sort_by(|a, b| a.id().cmp(b.id()));

        for pair in scope.windows(2) {
            if pair[0].id() == pair[1].id() {
                return Err(GibbsError::InvalidScope(format!(
                    "duplicate variable id {}",
                    pair[0].id()
                )));
            }
        }

        // negative outcome values are rejected outright; factors are
        // non-negative preference tables
        if let Some(v) = scope.iter().find(|v| v.has_negative_outcome()) {
            return Err(GibbsError::InvalidScope(format!(
                "variable {} has a negative outcome value",
                v.id()
            )));
        }

        let mut factor = Factor {
            id: String::from(id),
            scope,
            factor_fn,
            z: 0.0,
        };
        factor.z = factor.zval()?;

        Ok(factor)
    }

    /// Create a `Factor` whose function is the marginal joint of its scope:
    /// the product of each variable's marginal at its assigned value. This
    /// is the default function when a caller supplies none.
    ///
    /// The resulting function fails with `GibbsError::UnknownVariable` when
    /// evaluated at an assignment referencing an id outside the scope.
    pub fn from_joint_vars(id: &str, scope: Vec<Variable>) -> Result<Self> {
        let vars = scope.clone();
        let marginal_joint = move |assignment: &Assignment| -> Result<f64> {
            let mut p = 1.0;
            for (var_id, value) in assignment.iter() {
                let var = vars
                    .iter()
                    .find(|v| v.id() == var_id.as_str())
                    .ok_or_else(|| GibbsError::UnknownVariable(var_id.clone()))?;
                p *= var.marginal(*value)?;
            }
            Ok(p)
        };

        Factor::new(id, scope, marginal_joint)
    }

    /// Create a `Factor` backed by an explicit assignment table.
    ///
    /// The table must cover the full cartesian domain of `scope`; a missing
    /// row surfaces as `GibbsError::UnmatchedAssignment` during the partition
    /// computation.
    pub fn from_table(
        id: &str,
        scope: Vec<Variable>,
        table: HashMap<Assignment, f64>,
    ) -> Result<Self> {
        let lookup = move |assignment: &Assignment| -> Result<f64> {
            table
                .get(assignment)
                .copied()
                .ok_or_else(|| GibbsError::UnmatchedAssignment(assignment.to_string()))
        };

        Factor::new(id, scope, lookup)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Retrieve the scope of the `Factor`.
    pub fn scope(&self) -> &[Variable] {
        &self.scope
    }

    pub fn scope_ids(&self) -> BTreeSet<VarId> {
        self.scope.iter().map(|v| String::from(v.id())).collect()
    }

    /// Check if the given variable id is in scope of this `Factor`.
    pub fn in_scope(&self, id: &str) -> bool {
        self.scope.iter().any(|v| v.id() == id)
    }

    pub fn find_var(&self, id: &str) -> Option<&Variable> {
        self.scope.iter().find(|v| v.id() == id)
    }

    /// The cached partition value.
    pub fn z(&self) -> f64 {
        self.z
    }

    /// Evaluate the factor function at the given assignment.
    pub fn phi(&self, assignment: &Assignment) -> Result<f64> {
        (self.factor_fn)(assignment)
    }

    /// Evaluate the factor function and normalize by the partition value.
    pub fn phi_normal(&self, assignment: &Assignment) -> Result<f64> {
        self.phi(assignment).map(|v| v / self.z)
    }

    /// The factor domain: one tagged value set per scope variable, in scope
    /// (id-sorted) order. The cartesian product of these sets enumerates
    /// every assignment of the factor.
    ///
    /// Filters and transforms let callers project or discretize the domain
    /// without building a new `Factor`.
    pub fn factor_domain<VF, F, T>(
        &self,
        var_filter: VF,
        value_filter: F,
        value_transform: T,
    ) -> Vec<Vec<(VarId, NumericValue)>>
    where
        VF: Fn(&Variable) -> bool,
        F: Fn(&str, NumericValue) -> bool,
        T: Fn((VarId, NumericValue)) -> (VarId, NumericValue),
    {
        self.scope
            .iter()
            .filter(|v| var_filter(v))
            .map(|v| v.value_set(&value_filter, &value_transform))
            .collect()
    }

    fn domain(&self) -> Vec<Vec<(VarId, NumericValue)>> {
        self.factor_domain(|_| true, |_, _| true, |t| t)
    }

    /// Enumerate every assignment over the factor's effective domain.
    pub fn cartesian(&self) -> Vec<Assignment> {
        if self.scope.is_empty() {
            // the empty scope has exactly one (empty) assignment
            return vec![Assignment::new()];
        }

        self.domain()
            .into_iter()
            .multi_cartesian_product()
            .map(Assignment::from_pairs)
            .collect()
    }

    /// Sum the factor function over the cartesian product of the supplied
    /// per-variable domains.
    pub fn partition_value(&self, domains: &[Vec<(VarId, NumericValue)>]) -> Result<f64> {
        if domains.is_empty() {
            return self.phi(&Assignment::new());
        }

        let mut total = 0.0;
        for row in domains.iter().cloned().multi_cartesian_product() {
            total += self.phi(&Assignment::from_pairs(row))?;
        }
        Ok(total)
    }

    /// Recompute the partition value over the factor's current domain.
    pub fn zval(&self) -> Result<f64> {
        self.partition_value(&self.domain())
    }

    fn extremal<C>(&self, better: C, seed: f64) -> Result<(Assignment, f64)>
    where
        C: Fn(f64, f64) -> bool,
    {
        let mut best_value = seed;
        let mut best: Option<Assignment> = None;

        // ties are broken by enumeration order: the first extremal
        // assignment wins
        for assignment in self.cartesian() {
            let value = self.phi(&assignment)?;
            if better(value, best_value) {
                best_value = value;
                best = Some(assignment);
            }
        }

        best.map(|a| (a, best_value))
            .ok_or_else(|| GibbsError::InvalidScope(String::from("factor has an empty domain")))
    }

    /// The assignment attaining the highest preference value.
    pub fn max_value(&self) -> Result<Assignment> {
        self.extremal(|v, best| v > best, f64::NEG_INFINITY)
            .map(|(a, _)| a)
    }

    /// The highest preference value over the factor's domain.
    pub fn max_probability(&self) -> Result<f64> {
        self.extremal(|v, best| v > best, f64::NEG_INFINITY)
            .map(|(_, v)| v)
    }

    /// The assignment attaining the lowest preference value.
    pub fn min_value(&self) -> Result<Assignment> {
        self.extremal(|v, best| v < best, f64::INFINITY).map(|(a, _)| a)
    }

    /// The lowest preference value over the factor's domain.
    pub fn min_probability(&self) -> Result<f64> {
        self.extremal(|v, best| v < best, f64::INFINITY).map(|(_, v)| v)
    }

    /// Factor product with point-wise multiplication, from Koller & Friedman
    /// p. 107: `psi(X,Y,Z) = phi1(X,Y) * phi2(Y,Z)`.
    ///
    /// # Returns
    /// the product factor over the union of both scopes, and the running
    /// product of all matched row values (a scalar diagnostic).
    pub fn product(&self, other: &Factor) -> Result<(Factor, f64)> {
        self.product_with(other, |x, y| x * y, |added, acc| added * acc)
    }

    /// Factor product, generalized over the point-wise combination and the
    /// accumulation of matched row values.
    ///
    /// The operation is a relational join: for every pair of assignments of
    /// `self` and `other` that agree on the shared variables, the merged
    /// assignment maps to `product_fn` of the two row values. The returned
    /// factor's function looks this table up by exact assignment; evaluating
    /// it anywhere else is a usage contract violation
    /// (`GibbsError::UnmatchedAssignment`).
    ///
    /// `accumulate_fn` folds every matched pair value in enumeration order,
    /// seeded with `1.0`; the result is returned alongside the factor.
    pub fn product_with<P, A>(
        &self,
        other: &Factor,
        product_fn: P,
        accumulate_fn: A,
    ) -> Result<(Factor, f64)>
    where
        P: Fn(f64, f64) -> f64,
        A: Fn(f64, f64) -> f64,
    {
        let shared: Vec<&str> = self
            .scope
            .iter()
            .map(|v| v.id())
            .filter(|id| other.in_scope(id))
            .collect();

        let mut table: HashMap<Assignment, f64> = HashMap::new();
        let mut accumulated = 1.0;

        let other_rows = other.cartesian();
        for row in self.cartesian() {
            for other_row in other_rows.iter() {
                if shared.iter().all(|id| row.get(id) == other_row.get(id)) {
                    let value = product_fn(self.phi(&row)?, other.phi(other_row)?);
                    accumulated = accumulate_fn(value, accumulated);
                    table.insert(row.union(other_row), value);
                }
            }
        }

        // union scope; shared variables keep the intersection of both
        // effective domains so the table stays exact
        let mut scope = Vec::with_capacity(self.scope.len() + other.scope.len());
        for var in self.scope.iter() {
            match other.find_var(var.id()) {
                Some(other_var) => scope.push(intersect_domains(var, other_var)?),
                None => scope.push(var.clone()),
            }
        }
        for var in other.scope.iter() {
            if !self.in_scope(var.id()) {
                scope.push(var.clone());
            }
        }

        let id = format!("({}*{})", self.id, other.id);
        let factor = Factor::from_table(&id, scope, table)?;
        Ok((factor, accumulated))
    }

    /// Reduce the factor by the given evidence, from Koller & Friedman
    /// p. 111: every scope variable mentioned in `assignments` is narrowed
    /// to the assigned value.
    ///
    /// The affected variables are replaced by narrowed *copies*; the
    /// originals, and any other factor holding them, are untouched.
    ///
    /// # Errors
    /// * `GibbsError::ValueOutsideDomain` if an assigned value is not in the
    ///   matching variable's domain
    pub fn reduced(&self, assignments: &Assignment) -> Result<Factor> {
        let mut scope = Vec::with_capacity(self.scope.len());
        for var in self.scope.iter() {
            match assignments.get(var.id()) {
                Some(value) => scope.push(var.reduce_to_value(value)?),
                None => scope.push(var.clone()),
            }
        }

        Factor::with_fn(&self.id, scope, Rc::clone(&self.factor_fn))
    }

    /// Alias of [`Factor::reduced`].
    pub fn reduced_by_value(&self, assignments: &Assignment) -> Result<Factor> {
        self.reduced(assignments)
    }

    /// Alias of [`Factor::reduced`].
    pub fn reduced_by_vars(&self, assignments: &Assignment) -> Result<Factor> {
        self.reduced(assignments)
    }

    /// Sum the variable out of the factor, from Koller & Friedman p. 297.
    ///
    /// # Errors
    /// * `GibbsError::NotInScope` if `y` is not in the factor's scope
    pub fn sumout_var(&self, y: &str) -> Result<Factor> {
        self.project_out(y, format!("sum_{}({})", y, self.id), |table, key, value, _| {
            *table.entry(key).or_insert(0.0) += value;
        })
    }

    /// Max the variable out of the factor, from Koller & Friedman p. 555.
    ///
    /// # Errors
    /// * `GibbsError::NotInScope` if `y` is not in the factor's scope
    pub fn maxout_var(&self, y: &str) -> Result<Factor> {
        self.maxout_var_with_table(y).map(|(f, _)| f)
    }

    /// Max the variable out and also return the potential table: for every
    /// surviving assignment, the value of `y` that attained the maximum.
    /// The table is what max-product traceback consumes.
    pub fn maxout_var_with_table(
        &self,
        y: &str,
    ) -> Result<(Factor, HashMap<Assignment, NumericValue>)> {
        if !self.in_scope(y) {
            return Err(GibbsError::NotInScope(String::from(y)));
        }

        let rest: Vec<Variable> = self
            .scope
            .iter()
            .filter(|v| v.id() != y)
            .cloned()
            .collect();
        let rest_ids: Vec<&str> = rest.iter().map(|v| v.id()).collect();

        let mut table: HashMap<Assignment, f64> = HashMap::new();
        let mut argmax: HashMap<Assignment, NumericValue> = HashMap::new();

        for row in self.cartesian() {
            let value = self.phi(&row)?;
            let y_value = row
                .get(y)
                .ok_or_else(|| GibbsError::UnknownVariable(String::from(y)))?;
            let key = row.project(rest_ids.iter().copied());

            match table.get(&key) {
                Some(&best) if best >= value => {}
                _ => {
                    table.insert(key.clone(), value);
                    argmax.insert(key, y_value);
                }
            }
        }

        let id = format!("max_{}({})", y, self.id);
        let factor = Factor::from_table(&id, rest, table)?;
        Ok((factor, argmax))
    }

    fn project_out<F>(&self, y: &str, id: String, fold: F) -> Result<Factor>
    where
        F: Fn(&mut HashMap<Assignment, f64>, Assignment, f64, NumericValue),
    {
        if !self.in_scope(y) {
            return Err(GibbsError::NotInScope(String::from(y)));
        }

        let rest: Vec<Variable> = self
            .scope
            .iter()
            .filter(|v| v.id() != y)
            .cloned()
            .collect();
        let rest_ids: Vec<&str> = rest.iter().map(|v| v.id()).collect();

        let mut table: HashMap<Assignment, f64> = HashMap::new();
        for row in self.cartesian() {
            let value = self.phi(&row)?;
            let y_value = row
                .get(y)
                .ok_or_else(|| GibbsError::UnknownVariable(String::from(y)))?;
            let key = row.project(rest_ids.iter().copied());
            fold(&mut table, key, value, y_value);
        }

        Factor::from_table(&id, rest, table)
    }

    /// Fold `sumout_var` over `ys`, left to right.
    ///
    /// # Errors
    /// * `GibbsError::EmptyEliminationSet` if `ys` is empty
    /// * `GibbsError::NotInScope` if a variable is missing from the
    ///   intermediate scope
    pub fn sumout_vars(&self, ys: &[VarId]) -> Result<Factor> {
        let (first, remaining) = ys.split_first().ok_or(GibbsError::EmptyEliminationSet)?;

        let mut factor = self.sumout_var(first)?;
        for y in remaining {
            factor = factor.sumout_var(y)?;
        }
        Ok(factor)
    }
}

/// Restrict an assignment set to the variable ids present in `context`,
/// dropping evidence that is irrelevant to a factor's scope.
pub fn filter_assignments(assignments: &Assignment, context: &[Variable]) -> Assignment {
    assignments.project(context.iter().map(|v| v.id()))
}

/// The shared variable of a factor product: effective values common to both
/// sides, marginals taken from the left.
fn intersect_domains(var: &Variable, other: &Variable) -> Result<Variable> {
    let other_values = other.values();
    let common: Vec<f64> = var
        .values()
        .into_iter()
        .filter(|v| other_values.contains(v))
        .map(|v| v.get())
        .collect();

    Variable::new(var.id(), &common, |v| {
        var.marginal(NumericValue::from(v)).unwrap_or(0.0)
    })
}

// Unit tests
#[cfg(test)]
mod tests {

    use super::*;

    const EPSILON: f64 = 1e-9;

    fn var_1050(id: &str) -> Variable {
        Variable::new(id, &[10.0, 50.0], |_| 0.5).unwrap()
    }

    /// phi(B,C) over B,C in {10,50} with the documented table values.
    fn bc_factor() -> Factor {
        let mut table = HashMap::new();
        let rows = [
            (10.0, 10.0, 0.5),
            (10.0, 50.0, 0.7),
            (50.0, 10.0, 0.1),
            (50.0, 50.0, 0.2),
        ];
        for (b, c, v) in rows {
            let mut a = Assignment::new();
            a.set("B", b);
            a.set("C", c);
            table.insert(a, v);
        }
        Factor::from_table("bc", vec![var_1050("B"), var_1050("C")], table).unwrap()
    }

    /// The four pairwise factors of the Koller & Friedman misconception
    /// example, over binary A, B, C, D.
    fn misconception_factors() -> Vec<Factor> {
        let a = Variable::binary("A", 0.5);
        let b = Variable::binary("B", 0.5);
        let c = Variable::binary("C", 0.5);
        let d = Variable::binary("D", 0.5);

        let tables: [(&str, &str, &str, [f64; 4]); 4] = [
            ("ab", "A", "B", [30.0, 5.0, 1.0, 10.0]),
            ("bc", "B", "C", [100.0, 1.0, 1.0, 100.0]),
            ("cd", "C", "D", [1.0, 100.0, 100.0, 1.0]),
            ("da", "D", "A", [100.0, 1.0, 1.0, 100.0]),
        ];

        let vars = move |id: &str| match id {
            "A" => a.clone(),
            "B" => b.clone(),
            "C" => c.clone(),
            _ => d.clone(),
        };

        tables.into_iter()
            .map(|(gid, v1, v2, values)| {
                let mut table = HashMap::new();
                for (i, (x, y)) in [(false, false), (false, true), (true, false), (true, true)]
                    .iter()
                    .enumerate()
                {
                    let mut assn = Assignment::new();
                    assn.set(v1, *x);
                    assn.set(v2, *y);
                    table.insert(assn, values[i]);
                }
                Factor::from_table(gid, vec![vars(v1), vars(v2)], table).unwrap()
            })
            .collect()
    }

    #[test]
    fn negative_outcome_rejected() {
        let bad = Variable::new("T", &[-5.0, 10.0], |_| 0.5).unwrap();
        let f = Factor::from_joint_vars("t", vec![bad]);
        assert!(matches!(f, Err(GibbsError::InvalidScope(_))));
    }

    #[test]
    fn duplicate_scope_id_rejected() {
        let f = Factor::from_joint_vars("aa", vec![var_1050("A"), var_1050("A")]);
        assert!(matches!(f, Err(GibbsError::InvalidScope(_))));
    }

    #[test]
    fn marginal_joint_default() {
        let f = Factor::from_joint_vars("ab", vec![var_1050("A"), var_1050("B")]).unwrap();

        let mut assn = Assignment::new();
        assn.set("A", 10.0);
        assn.set("B", 50.0);
        assert!((f.phi(&assn).unwrap() - 0.25).abs() < EPSILON);

        // partition over four equally weighted rows
        assert!((f.z() - 1.0).abs() < EPSILON);
        assert!((f.phi_normal(&assn).unwrap() - 0.25).abs() < EPSILON);
    }

    #[test]
    fn marginal_joint_unknown_variable() {
        let f = Factor::from_joint_vars("a", vec![var_1050("A")]).unwrap();

        let mut assn = Assignment::new();
        assn.set("Z", 10.0);
        assert_eq!(
            f.phi(&assn),
            Err(GibbsError::UnknownVariable(String::from("Z")))
        );
    }

    #[test]
    fn partition_value() {
        let f = bc_factor();
        assert!((f.z() - 1.5).abs() < EPSILON);
        assert!((f.zval().unwrap() - 1.5).abs() < EPSILON);

        // partition over an externally narrowed domain
        let narrowed = vec![
            vec![(String::from("B"), NumericValue::from(10.0))],
            vec![
                (String::from("C"), NumericValue::from(10.0)),
                (String::from("C"), NumericValue::from(50.0)),
            ],
        ];
        assert!((f.partition_value(&narrowed).unwrap() - 1.2).abs() < EPSILON);
    }

    #[test]
    fn factor_domain_filters() {
        let f = bc_factor();

        let domain = f.factor_domain(|v| v.id() == "B", |_, _| true, |t| t);
        assert_eq!(domain.len(), 1);
        assert_eq!(domain[0].len(), 2);

        let domain = f.factor_domain(|_| true, |_, v| v.get() < 20.0, |t| t);
        assert_eq!(domain.len(), 2);
        assert!(domain.iter().all(|vs| vs.len() == 1));
    }

    #[test]
    fn cartesian_covers_scope() {
        let f = bc_factor();
        let rows = f.cartesian();

        assert_eq!(rows.len(), 4);
        for row in rows {
            assert_eq!(row.len(), 2);
            assert!(row.contains_var("B"));
            assert!(row.contains_var("C"));
        }
    }

    #[test]
    fn max_min_scan() {
        let f = bc_factor();

        assert!((f.max_probability().unwrap() - 0.7).abs() < EPSILON);
        let best = f.max_value().unwrap();
        assert_eq!(best.get("B"), Some(NumericValue::from(10.0)));
        assert_eq!(best.get("C"), Some(NumericValue::from(50.0)));

        assert!((f.min_probability().unwrap() - 0.1).abs() < EPSILON);
        let worst = f.min_value().unwrap();
        assert_eq!(worst.get("B"), Some(NumericValue::from(50.0)));
        assert_eq!(worst.get("C"), Some(NumericValue::from(10.0)));
    }

    #[test]
    fn product_joins_on_shared_variables() {
        let factors = misconception_factors();
        let (ab, bc) = (&factors[0], &factors[1]);

        let (joined, _) = ab.product(bc).unwrap();
        assert_eq!(joined.scope().len(), 3);

        // psi(A,B,C) = phi_AB(A,B) * phi_BC(B,C)
        let mut assn = Assignment::new();
        assn.set("A", false);
        assn.set("B", false);
        assn.set("C", false);
        assert!((joined.phi(&assn).unwrap() - 3000.0).abs() < EPSILON);

        assn.set("B", true);
        assert!((joined.phi(&assn).unwrap() - 5.0).abs() < EPSILON);
    }

    #[test]
    fn product_commutes() {
        let factors = misconception_factors();
        let (ab, bc) = (&factors[0], &factors[1]);

        let (left, _) = ab.product(bc).unwrap();
        let (right, _) = bc.product(ab).unwrap();

        for row in left.cartesian() {
            assert!((left.phi(&row).unwrap() - right.phi(&row).unwrap()).abs() < EPSILON);
        }
    }

    #[test]
    fn product_accumulator() {
        let factors = misconception_factors();
        let (ab, bc) = (&factors[0], &factors[1]);

        // accumulate with summation instead of the default product
        let (_, total) = ab
            .product_with(bc, |x, y| x * y, |added, acc| added + acc)
            .unwrap();

        // seed 1.0 plus the sum of all eight matched row values
        let (joined, _) = ab.product(bc).unwrap();
        let mut expected = 1.0;
        for row in joined.cartesian() {
            expected += joined.phi(&row).unwrap();
        }
        assert!((total - expected).abs() < EPSILON);
    }

    #[test]
    fn reduce_narrows_rows() {
        let f = bc_factor();

        let mut evidence = Assignment::new();
        evidence.set("C", 10.0);
        let reduced = f.reduced(&evidence).unwrap();

        let rows = reduced.cartesian();
        assert_eq!(rows.len(), 2);
        for row in rows {
            assert_eq!(row.get("C"), Some(NumericValue::from(10.0)));
            // phi values are unchanged for surviving rows
            assert!((reduced.phi(&row).unwrap() - f.phi(&row).unwrap()).abs() < EPSILON);
        }

        // partition reflects the narrowed domain
        assert!((reduced.z() - 0.6).abs() < EPSILON);
    }

    #[test]
    fn reduce_is_idempotent() {
        let f = bc_factor();

        let mut evidence = Assignment::new();
        evidence.set("C", 10.0);
        let once = f.reduced(&evidence).unwrap();
        let twice = once.reduced(&evidence).unwrap();

        assert_eq!(once.cartesian(), twice.cartesian());
        for row in once.cartesian() {
            assert!((once.phi(&row).unwrap() - twice.phi(&row).unwrap()).abs() < EPSILON);
        }
    }

    #[test]
    fn reduce_does_not_alias_sibling_factors() {
        let c = var_1050("C");
        let f1 = Factor::from_joint_vars("f1", vec![var_1050("B"), c.clone()]).unwrap();
        let f2 = Factor::from_joint_vars("f2", vec![c, var_1050("D")]).unwrap();

        let mut evidence = Assignment::new();
        evidence.set("C", 10.0);
        let _ = f1.reduced(&evidence).unwrap();

        // f2 shares C with f1 but was not reduced: its domain and values
        // must be unchanged
        assert_eq!(f2.cartesian().len(), 4);
        assert_eq!(f2.find_var("C").unwrap().evidence(), None);
        assert!((f2.zval().unwrap() - 1.0).abs() < EPSILON);
    }

    #[test]
    fn reduce_aliases() {
        let f = bc_factor();

        let mut evidence = Assignment::new();
        evidence.set("C", 10.0);

        let by_value = f.reduced_by_value(&evidence).unwrap();
        let by_vars = f.reduced_by_vars(&evidence).unwrap();
        assert_eq!(by_value.cartesian(), by_vars.cartesian());
    }

    #[test]
    fn filter_assignments_restricts_to_context() {
        let f = bc_factor();

        let mut evidence = Assignment::new();
        evidence.set("C", 10.0);
        evidence.set("E", 1.0);

        let filtered = filter_assignments(&evidence, f.scope());
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.get("C"), Some(NumericValue::from(10.0)));
    }

    #[test]
    fn sumout_var_marginalizes() {
        let f = bc_factor();
        let marginal = f.sumout_var("C").unwrap();

        assert_eq!(marginal.scope().len(), 1);

        let mut assn = Assignment::new();
        assn.set("B", 10.0);
        assert!((marginal.phi(&assn).unwrap() - 1.2).abs() < EPSILON);

        assn.set("B", 50.0);
        assert!((marginal.phi(&assn).unwrap() - 0.3).abs() < EPSILON);
    }

    #[test]
    fn sumout_not_in_scope() {
        let f = bc_factor();
        assert_eq!(
            f.sumout_var("Z").err(),
            Some(GibbsError::NotInScope(String::from("Z")))
        );
        assert_eq!(
            f.maxout_var("Z").err(),
            Some(GibbsError::NotInScope(String::from("Z")))
        );
    }

    #[test]
    fn sumout_vars_total_probability() {
        // for a normalized joint, summing out the whole scope leaves the
        // partition value at the single empty assignment
        let f = Factor::from_joint_vars("ab", vec![var_1050("A"), var_1050("B")]).unwrap();
        let ids: Vec<VarId> = f.scope_ids().into_iter().collect();

        let total = f.sumout_vars(&ids).unwrap();
        assert!(total.scope().is_empty());
        assert!((total.phi(&Assignment::new()).unwrap() - f.zval().unwrap()).abs() < EPSILON);
    }

    #[test]
    fn sumout_vars_empty_set() {
        let f = bc_factor();
        assert_eq!(f.sumout_vars(&[]).err(), Some(GibbsError::EmptyEliminationSet));
    }

    #[test]
    fn maxout_var_keeps_best_rows() {
        let f = bc_factor();
        let (maxed, argmax) = f.maxout_var_with_table("C").unwrap();

        let mut assn = Assignment::new();
        assn.set("B", 10.0);
        assert!((maxed.phi(&assn).unwrap() - 0.7).abs() < EPSILON);
        assert_eq!(argmax.get(&assn), Some(&NumericValue::from(50.0)));

        let mut assn = Assignment::new();
        assn.set("B", 50.0);
        assert!((maxed.phi(&assn).unwrap() - 0.2).abs() < EPSILON);
        assert_eq!(argmax.get(&assn), Some(&NumericValue::from(50.0)));
    }

    #[test]
    fn table_lookup_off_domain() {
        let f = bc_factor();

        let mut assn = Assignment::new();
        assn.set("B", 10.0);
        assn.set("C", 999.0);
        assert!(matches!(
            f.phi(&assn),
            Err(GibbsError::UnmatchedAssignment(_))
        ));
    }
}
