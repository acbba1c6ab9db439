//! Bound-aware revised Simplex over exact rationals.
//!
//! Every linear atom becomes a fresh slack basic variable tied to a row
//! equation; feasibility is then just "every basic variable sits inside its
//! bounds". [`Tableau::check`] repairs out-of-bounds basics by pivoting,
//! using Bland's rule (smallest index wins, both for the leaving basic and
//! the entering non-basic) so the procedure always terminates even in the
//! presence of degenerate cycling.
//!
//! Pivots recompute every basic variable's value from its row after
//! substitution rather than propagating a value delta incrementally. That is
//! asymptotically wasteful on a large tableau but keeps this implementation's
//! correctness easy to see; see the design ledger for the tradeoff.

use std::collections::HashMap;

use num_traits::{One, Zero};

use crate::atoms::{IneqAtom, RatNum, VarName};
use crate::error::SolverError;

/// Identifies a variable's column/row slot in the tableau.
pub type VarId = usize;

/// Why a variable's bound is what it is, kept so a conflicting row can report
/// which atoms/decisions produced the bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundReason {
    /// Came from linear atom number `n` in the input list, in input order.
    Input(usize),
    /// Asserted by a ReLUplex case-split over pair number `pair`.
    CaseSplit { pair: usize },
    /// A bound every slack/rectifier output variable carries from construction.
    Permanent,
}

#[derive(Debug, Clone)]
struct Bound {
    lower: Option<RatNum>,
    upper: Option<RatNum>,
    reasons: Vec<BoundReason>,
}

impl Bound {
    fn unbounded() -> Self {
        Bound { lower: None, upper: None, reasons: Vec::new() }
    }
}

#[derive(Debug, Clone)]
struct Row {
    /// The basic variable this row defines.
    basic: VarId,
    /// `basic = Σ coeffs[j].1 * coeffs[j].0`, over non-basic variables.
    coeffs: Vec<(VarId, RatNum)>,
}

/// Maps surface variable names to dense [`VarId`]s in first-seen order.
///
/// Named (surface) variables are allocated before any slack variable, so
/// Bland's rule naturally favors repairing toward the user's own variables
/// first, as a side effect of tie-breaking on index alone.
#[derive(Debug, Default, Clone)]
pub struct VarTable {
    names: Vec<VarName>,
    index: HashMap<VarName, VarId>,
}

impl VarTable {
    pub fn new() -> Self {
        VarTable::default()
    }

    pub fn intern(&mut self, name: &str) -> VarId {
        if let Some(&id) = self.index.get(name) {
            return id;
        }
        let id = self.names.len();
        self.index.insert(name.to_string(), id);
        self.names.push(name.to_string());
        id
    }

    pub fn lookup(&self, name: &str) -> Option<VarId> {
        self.index.get(name).copied()
    }

    pub fn name(&self, id: VarId) -> &str {
        &self.names[id]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Outcome of a feasibility check.
#[derive(Debug, Clone)]
pub enum CheckResult {
    Sat,
    Unsat { derivation: Vec<BoundReason> },
}

/// The revised Simplex tableau: rows, bounds, and the current assignment.
#[derive(Debug, Clone)]
pub struct Tableau {
    pub vars: VarTable,
    rows: Vec<Row>,
    /// `basic_of[v]` is `Some(row_index)` iff `v` is currently basic.
    basic_of: Vec<Option<usize>>,
    bounds: Vec<Bound>,
    assignment: Vec<RatNum>,
}

impl Tableau {
    fn new(num_vars: usize, vars: VarTable) -> Self {
        Tableau {
            vars,
            rows: Vec::new(),
            basic_of: vec![None; num_vars],
            bounds: vec![Bound::unbounded(); num_vars],
            assignment: vec![RatNum::zero(); num_vars],
        }
    }

    /// Builds a tableau from a list of `Σ cᵢxᵢ >= b` atoms, one slack row per atom.
    pub fn from_atoms(atoms: &[IneqAtom]) -> Tableau {
        let mut vars = VarTable::new();
        for atom in atoms {
            for (name, _) in &atom.coeffs {
                vars.intern(name);
            }
        }
        let num_named = vars.len();
        let num_vars = num_named + atoms.len();
        let mut t = Tableau::new(num_vars, vars);

        for (i, atom) in atoms.iter().enumerate() {
            let slack = num_named + i;
            let coeffs: Vec<(VarId, RatNum)> = atom
                .coeffs
                .iter()
                .map(|(name, c)| (t.vars.lookup(name).expect("interned above"), c.clone()))
                .collect();
            t.rows.push(Row { basic: slack, coeffs });
            t.basic_of[slack] = Some(t.rows.len() - 1);
            t.bounds[slack] = Bound {
                lower: Some(atom.bound.clone()),
                upper: None,
                reasons: vec![BoundReason::Input(i)],
            };
        }
        t.recompute_all_basics();
        t
    }

    pub fn num_vars(&self) -> usize {
        self.assignment.len()
    }

    pub fn value(&self, v: VarId) -> &RatNum {
        &self.assignment[v]
    }

    pub fn is_basic(&self, v: VarId) -> bool {
        self.basic_of[v].is_some()
    }

    fn row_value(&self, row: &Row) -> RatNum {
        row.coeffs
            .iter()
            .fold(RatNum::zero(), |acc, (v, c)| acc + c * &self.assignment[*v])
    }

    fn recompute_all_basics(&mut self) {
        for row in &self.rows {
            let v = self.row_value(row);
            self.assignment[row.basic] = v;
        }
    }

    /// Appends a fresh variable not tied to any existing row, with permanent bounds.
    pub fn add_free_var(&mut self, name: &str, lower: Option<RatNum>, upper: Option<RatNum>) -> VarId {
        let id = self.vars.intern(name);
        if id == self.assignment.len() {
            self.assignment.push(RatNum::zero());
            self.basic_of.push(None);
            self.bounds.push(Bound { lower, upper, reasons: vec![BoundReason::Permanent] });
        }
        id
    }

    /// Adds an equality row `basic = Σ coeffs`, making `basic` newly basic.
    /// `basic`'s existing bounds are left untouched (callers tighten them
    /// separately via [`Tableau::set_bound`] if needed).
    ///
    /// Used by ReLUplex to link an active rectifier pair (`y = x`).
    /// `basic` must currently be non-basic; its prior value is discarded.
    /// Every coefficient variable already basic via another row (common once
    /// Bland's rule has pivoted a named variable in) is substituted out
    /// first, so every row's invariant of referencing only non-basic
    /// variables holds here the same way [`Tableau::pivot`] maintains it.
    pub fn add_equality_row(&mut self, basic: VarId, coeffs: Vec<(VarId, RatNum)>, reason: BoundReason) {
        let coeffs = self.expand_nonbasic(coeffs);
        self.rows.push(Row { basic, coeffs });
        let row_idx = self.rows.len() - 1;
        self.basic_of[basic] = Some(row_idx);
        self.bounds[basic].reasons.push(reason);
        let v = self.row_value(&self.rows[row_idx]);
        self.assignment[basic] = v;
    }

    /// Rewrites `coeffs` so every referenced variable is non-basic, by
    /// substituting any basic variable's own row definition in its place.
    fn expand_nonbasic(&self, coeffs: Vec<(VarId, RatNum)>) -> Vec<(VarId, RatNum)> {
        let mut result: Vec<(VarId, RatNum)> = Vec::new();
        for (v, c) in coeffs {
            if let Some(row_idx) = self.basic_of[v] {
                for (rv, rc) in &self.rows[row_idx].coeffs {
                    let contrib = &c * rc;
                    match result.iter_mut().find(|(ev, _)| ev == rv) {
                        Some(existing) => existing.1 += &contrib,
                        None => result.push((*rv, contrib)),
                    }
                }
            } else {
                match result.iter_mut().find(|(ev, _)| *ev == v) {
                    Some(existing) => existing.1 += &c,
                    None => result.push((v, c)),
                }
            }
        }
        result.retain(|(_, c)| !c.is_zero());
        result
    }

    /// Tightens `v`'s bounds, re-clamping and propagating if `v` is non-basic.
    ///
    /// Returns `Err` if the interval becomes empty.
    pub fn set_bound(&mut self, v: VarId, lower: Option<RatNum>, upper: Option<RatNum>, reason: BoundReason) -> Result<(), SolverError> {
        let b = &mut self.bounds[v];
        if let Some(l) = lower {
            b.lower = Some(match &b.lower {
                Some(existing) if existing >= &l => existing.clone(),
                _ => l,
            });
        }
        if let Some(u) = upper {
            b.upper = Some(match &b.upper {
                Some(existing) if existing <= &u => existing.clone(),
                _ => u,
            });
        }
        b.reasons.push(reason);
        if let (Some(l), Some(u)) = (&b.lower, &b.upper) {
            if l > u {
                return Err(SolverError::invariant(
                    "I3",
                    format!("bounds for {} became empty: [{}, {}]", self.vars.name(v), l, u),
                ));
            }
        }
        if self.basic_of[v].is_none() {
            let cur = self.assignment[v].clone();
            let clamped = self.clamp(v, cur);
            if clamped != self.assignment[v] {
                self.set_nonbasic_value(v, clamped);
            }
        }
        Ok(())
    }

    fn clamp(&self, v: VarId, val: RatNum) -> RatNum {
        let b = &self.bounds[v];
        let mut val = val;
        if let Some(l) = &b.lower {
            if &val < l {
                val = l.clone();
            }
        }
        if let Some(u) = &b.upper {
            if &val > u {
                val = u.clone();
            }
        }
        val
    }

    /// Assigns a non-basic variable a new value and updates dependent basics.
    fn set_nonbasic_value(&mut self, v: VarId, new_val: RatNum) {
        let delta = &new_val - &self.assignment[v];
        self.assignment[v] = new_val;
        for row in &self.rows {
            if let Some((_, c)) = row.coeffs.iter().find(|(rv, _)| *rv == v) {
                self.assignment[row.basic] += c * &delta;
            }
        }
    }

    fn in_bounds(&self, v: VarId) -> bool {
        let b = &self.bounds[v];
        let val = &self.assignment[v];
        b.lower.as_ref().map_or(true, |l| val >= l) && b.upper.as_ref().map_or(true, |u| val <= u)
    }

    /// Finds the smallest-index basic variable currently out of bounds.
    fn first_violated_basic(&self) -> Option<VarId> {
        let mut candidates: Vec<VarId> = self
            .basic_of
            .iter()
            .enumerate()
            .filter_map(|(v, slot)| if slot.is_some() && !self.in_bounds(v) { Some(v) } else { None })
            .collect();
        candidates.sort_unstable();
        candidates.into_iter().next()
    }

    /// Pivots `entering` (non-basic) into the row currently held by `leaving` (basic).
    fn pivot(&mut self, row_idx: usize, entering: VarId) {
        let row = self.rows[row_idx].clone();
        let leaving = row.basic;
        let pivot_coeff = row
            .coeffs
            .iter()
            .find(|(v, _)| *v == entering)
            .map(|(_, c)| c.clone())
            .expect("entering variable must appear in pivot row");

        // Solve the pivot row for `entering`: entering = (leaving - Σ_{other} c*other) / pivot_coeff
        let mut new_row_coeffs: Vec<(VarId, RatNum)> = Vec::new();
        new_row_coeffs.push((leaving, RatNum::one() / pivot_coeff.clone()));
        for (v, c) in &row.coeffs {
            if *v == entering {
                continue;
            }
            new_row_coeffs.push((*v, -c.clone() / pivot_coeff.clone()));
        }

        self.rows[row_idx] = Row { basic: entering, coeffs: new_row_coeffs.clone() };
        self.basic_of[entering] = Some(row_idx);
        self.basic_of[leaving] = None;

        // Substitute the new definition of `entering` into every other row that referenced it.
        for (idx, other) in self.rows.iter_mut().enumerate() {
            if idx == row_idx {
                continue;
            }
            if let Some(pos) = other.coeffs.iter().position(|(v, _)| *v == entering) {
                let coeff = other.coeffs[pos].1.clone();
                other.coeffs.remove(pos);
                for (v, c) in &new_row_coeffs {
                    if *v == entering {
                        continue;
                    }
                    let contrib = &coeff * c;
                    if let Some(existing) = other.coeffs.iter_mut().find(|(ev, _)| ev == v) {
                        existing.1 += &contrib;
                    } else {
                        other.coeffs.push((*v, contrib));
                    }
                }
                other.coeffs.retain(|(_, c)| !c.is_zero());
            }
        }
        self.recompute_all_basics();
    }

    /// Runs the Check procedure to a fixpoint, honoring `budget`.
    pub fn check(&mut self, budget: &mut crate::reluplex::StepBudget) -> Result<CheckResult, SolverError> {
        loop {
            let Some(xi) = self.first_violated_basic() else {
                return Ok(CheckResult::Sat);
            };
            budget.tick("simplex-check")?;

            let row_idx = self.basic_of[xi].expect("xi came from basic_of");
            let row = self.rows[row_idx].clone();
            let below = match &self.bounds[xi].lower {
                Some(l) => &self.assignment[xi] < l,
                None => false,
            };

            let mut candidates: Vec<VarId> = Vec::new();
            for (v, c) in &row.coeffs {
                let increasing_helps = if below { c.is_positive() } else { c.is_negative() };
                let decreasing_helps = if below { c.is_negative() } else { c.is_positive() };
                let can_increase = self.bounds[*v].upper.as_ref().map_or(true, |u| &self.assignment[*v] < u);
                let can_decrease = self.bounds[*v].lower.as_ref().map_or(true, |l| &self.assignment[*v] > l);
                if (increasing_helps && can_increase) || (decreasing_helps && can_decrease) {
                    candidates.push(*v);
                }
            }
            candidates.sort_unstable();

            let Some(entering) = candidates.into_iter().next() else {
                let derivation = self.bounds[xi].reasons.clone();
                return Ok(CheckResult::Unsat { derivation });
            };

            log::trace!(
                "pivot: {} leaves, {} enters (row {row_idx})",
                self.vars.name(xi),
                self.vars.name(entering)
            );
            self.pivot(row_idx, entering);
            let target = if below {
                self.bounds[xi].lower.clone().unwrap()
            } else {
                self.bounds[xi].upper.clone().unwrap()
            };
            // xi is now non-basic; clamp it to the bound it was repairing toward.
            if self.basic_of[xi].is_none() {
                self.set_nonbasic_value(xi, target);
            }
        }
    }
}

trait RatSign {
    fn is_positive(&self) -> bool;
    fn is_negative(&self) -> bool;
}

impl RatSign for RatNum {
    fn is_positive(&self) -> bool {
        self > &RatNum::zero()
    }
    fn is_negative(&self) -> bool {
        self < &RatNum::zero()
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::reluplex::StepBudget;
    use num_traits::FromPrimitive;
    use proptest::prelude::*;

    fn small_coeff() -> impl Strategy<Value = i64> {
        -3i64..=3
    }

    /// P2: whenever Check returns SAT, every row holds exactly under the
    /// returned assignment and every bound is respected (exact rational
    /// comparison — no tolerance is needed once arithmetic is exact).
    proptest! {
        #[test]
        fn check_sat_is_sound(
            cx in small_coeff(), cy in small_coeff(), bound in -5i64..=5,
        ) {
            prop_assume!(cx != 0 || cy != 0);
            let atoms = vec![IneqAtom::new(
                vec![("x".into(), RatNum::from_i64(cx).unwrap()), ("y".into(), RatNum::from_i64(cy).unwrap())],
                RatNum::from_i64(bound).unwrap(),
            )];
            let mut t = Tableau::from_atoms(&atoms);
            let x = t.vars.lookup("x").unwrap();
            let y = t.vars.lookup("y").unwrap();
            t.set_bound(x, Some(RatNum::from_i64(-10).unwrap()), Some(RatNum::from_i64(10).unwrap()), BoundReason::Permanent).unwrap();
            t.set_bound(y, Some(RatNum::from_i64(-10).unwrap()), Some(RatNum::from_i64(10).unwrap()), BoundReason::Permanent).unwrap();

            let mut budget = StepBudget::new(16);
            if let Ok(CheckResult::Sat) = t.check(&mut budget) {
                let lhs = RatNum::from_i64(cx).unwrap() * t.value(x) + RatNum::from_i64(cy).unwrap() * t.value(y);
                prop_assert!(lhs >= RatNum::from_i64(bound).unwrap());
                prop_assert!(t.value(x) >= &RatNum::from_i64(-10).unwrap());
                prop_assert!(t.value(x) <= &RatNum::from_i64(10).unwrap());
            }
        }
    }

    /// P3: on a system built to be feasible (inequalities derived from a
    /// witness point chosen up front), `check` never reports UNSAT.
    proptest! {
        #[test]
        fn feasible_systems_never_falsely_unsat(
            wx in -6i64..=6, wy in -6i64..=6, wz in -6i64..=6,
            coeffs in prop::collection::vec((-3i64..=3, -3i64..=3, -3i64..=3), 1..6),
        ) {
            let mut atoms = Vec::new();
            for (a, b, c) in coeffs {
                prop_assume!(a != 0 || b != 0 || c != 0);
                let bound = a * wx + b * wy + c * wz;
                atoms.push(IneqAtom::new(
                    vec![
                        ("x".into(), RatNum::from_i64(a).unwrap()),
                        ("y".into(), RatNum::from_i64(b).unwrap()),
                        ("z".into(), RatNum::from_i64(c).unwrap()),
                    ],
                    RatNum::from_i64(bound).unwrap(),
                ));
            }
            let mut t = Tableau::from_atoms(&atoms);
            for name in ["x", "y", "z"] {
                if let Some(v) = t.vars.lookup(name) {
                    t.set_bound(v, Some(RatNum::from_i64(-20).unwrap()), Some(RatNum::from_i64(20).unwrap()), BoundReason::Permanent).unwrap();
                }
            }
            let mut budget = StepBudget::new(64);
            prop_assert!(matches!(t.check(&mut budget), Ok(CheckResult::Sat)));
        }
    }
}
