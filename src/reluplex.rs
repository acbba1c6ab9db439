//! ReLUplex: Simplex extended with rectifier (`y = max(0, x)`) constraints.
//!
//! Wraps a [`Tableau`] and a list of declared pairs. Each check first asks
//! Simplex for a feasible point, then scans pairs for violations in
//! insertion order; a violated pair is repaired by a direct pivot attempt
//! and, failing that, by case-splitting the search into an active and an
//! inactive branch. Branches are explored with an explicit checkpoint stack
//! rather than recursion so the step budget can be checked between them.

use num_traits::{One, Zero};

use crate::atoms::{RatNum, VarName};
use crate::error::SolverError;
use crate::simplex::{BoundReason, CheckResult, Tableau, VarId};

/// Guards against non-termination on adversarial input: bounds the total
/// number of Simplex pivots and ReLUplex pair scans at `C * |V|^2`.
#[derive(Debug, Clone)]
pub struct StepBudget {
    used: u64,
    max: u64,
}

impl StepBudget {
    /// `C = 64`, fixed per the resolved open question on the pivot bound.
    pub const C: u64 = 64;

    pub fn new(num_vars: usize) -> Self {
        let n = num_vars as u64;
        StepBudget { used: 0, max: Self::C * n * n }
    }

    pub fn tick(&mut self, at: &'static str) -> Result<(), SolverError> {
        self.used += 1;
        if self.used > self.max {
            return Err(SolverError::BudgetExceeded { at });
        }
        Ok(())
    }
}

/// A declared rectifier pair, by surface variable name.
#[derive(Debug, Clone)]
pub struct Pair {
    pub x: VarName,
    pub y: VarName,
}

/// Which linear branch of `y = max(0, x)` a pair has committed to, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Active,
    Inactive,
}

/// Saved state needed to undo a case-split: which pairs had which mode
/// committed, so popping a checkpoint can restore exactly that.
#[derive(Debug, Clone)]
struct Checkpoint {
    tableau: Tableau,
    modes: Vec<Option<Mode>>,
}

/// Outcome of a ReLUplex decision.
pub enum ReluResult {
    Sat { tableau: Tableau },
    Unsat { derivation: Vec<BoundReason> },
}

pub struct Reluplex {
    tableau: Tableau,
    pairs: Vec<Pair>,
    modes: Vec<Option<Mode>>,
    budget: StepBudget,
}

impl Reluplex {
    pub fn new(tableau: Tableau, pairs: Vec<Pair>, budget: StepBudget) -> Self {
        let n = pairs.len();
        Reluplex { tableau, pairs, modes: vec![None; n], budget }
    }

    /// Decides feasibility of the tableau's linear atoms conjoined with every
    /// declared rectifier pair.
    pub fn solve(mut self) -> Result<ReluResult, SolverError> {
        self.solve_rec()
    }

    fn solve_rec(&mut self) -> Result<ReluResult, SolverError> {
        loop {
            match self.tableau.check(&mut self.budget)? {
                CheckResult::Unsat { derivation } => return Ok(ReluResult::Unsat { derivation }),
                CheckResult::Sat => {}
            }

            self.budget.tick("reluplex-pair-scan")?;
            let Some(idx) = self.first_violated_pair()? else {
                return Ok(ReluResult::Sat { tableau: self.tableau.clone() });
            };

            if self.modes[idx].is_some() {
                // Already committed to a mode and still violated: branch is dead.
                return Ok(ReluResult::Unsat {
                    derivation: vec![BoundReason::CaseSplit { pair: idx }],
                });
            }

            if self.try_repair_pivot(idx)? {
                continue;
            }

            return self.case_split(idx);
        }
    }

    /// Returns the index of the first pair (by insertion order) whose
    /// current values don't satisfy `y = max(0, x)` exactly.
    fn first_violated_pair(&self) -> Result<Option<usize>, SolverError> {
        for (i, pair) in self.pairs.iter().enumerate() {
            let x = self.var_id(&pair.x)?;
            let y = self.var_id(&pair.y)?;
            let vx = self.tableau.value(x).clone();
            let vy = self.tableau.value(y).clone();
            let satisfied = (!vx.is_negative() && vy == vx) || (!vx.is_positive() && vy.is_zero());
            if !satisfied {
                return Ok(Some(i));
            }
        }
        Ok(None)
    }

    fn var_id(&self, name: &str) -> Result<VarId, SolverError> {
        self.tableau.vars.lookup(name).ok_or_else(|| {
            SolverError::invariant("I-RELU", format!("rectifier variable {name} never appeared in any linear atom"))
        })
    }

    /// Attempts to resolve the violation at `pairs[idx]` by directly setting
    /// `y` to `max(0, x)` and re-checking, without committing to a mode.
    fn try_repair_pivot(&mut self, idx: usize) -> Result<bool, SolverError> {
        let pair = self.pairs[idx].clone();
        let x = self.var_id(&pair.x)?;
        let y = self.var_id(&pair.y)?;
        let vx = self.tableau.value(x).clone();
        let target = if vx.is_negative() { RatNum::zero() } else { vx };

        let checkpoint = self.tableau.clone();
        let pinned = self.tableau.set_bound(
            y,
            Some(target.clone()),
            Some(target),
            BoundReason::CaseSplit { pair: idx },
        );
        if pinned.is_err() {
            self.tableau = checkpoint;
            return Ok(false);
        }
        match self.tableau.check(&mut self.budget)? {
            CheckResult::Sat => {
                let still_violated = self.first_violated_pair()? == Some(idx);
                if still_violated {
                    self.tableau = checkpoint;
                    Ok(false)
                } else {
                    Ok(true)
                }
            }
            CheckResult::Unsat { .. } => {
                self.tableau = checkpoint;
                Ok(false)
            }
        }
    }

    fn case_split(&mut self, idx: usize) -> Result<ReluResult, SolverError> {
        let checkpoint = Checkpoint { tableau: self.tableau.clone(), modes: self.modes.clone() };
        log::debug!("case-split: pushing checkpoint before branching pair {idx}");

        if self.commit_branch(idx, Mode::Active).is_ok() {
            match self.solve_rec()? {
                ReluResult::Sat { tableau } => return Ok(ReluResult::Sat { tableau }),
                ReluResult::Unsat { derivation: active_derivation } => {
                    log::debug!("case-split: active branch of pair {idx} is UNSAT, popping checkpoint to try inactive");
                    self.tableau = checkpoint.tableau.clone();
                    self.modes = checkpoint.modes.clone();
                    if self.commit_branch(idx, Mode::Inactive).is_ok() {
                        return match self.solve_rec()? {
                            ReluResult::Sat { tableau } => Ok(ReluResult::Sat { tableau }),
                            ReluResult::Unsat { derivation: inactive_derivation } => {
                                let mut merged = active_derivation;
                                merged.extend(inactive_derivation);
                                merged.retain(|r| !matches!(r, BoundReason::CaseSplit { pair } if *pair == idx));
                                Ok(ReluResult::Unsat { derivation: merged })
                            }
                        };
                    }
                    return Ok(ReluResult::Unsat { derivation: active_derivation });
                }
            }
        }

        log::debug!("case-split: popping checkpoint to try inactive branch of pair {idx} directly");
        self.tableau = checkpoint.tableau;
        self.modes = checkpoint.modes;
        if self.commit_branch(idx, Mode::Inactive).is_ok() {
            return self.solve_rec();
        }
        Ok(ReluResult::Unsat { derivation: vec![BoundReason::CaseSplit { pair: idx }] })
    }

    fn commit_branch(&mut self, idx: usize, mode: Mode) -> Result<(), SolverError> {
        let pair = self.pairs[idx].clone();
        let x = self.var_id(&pair.x)?;
        let y = self.var_id(&pair.y)?;
        let reason = BoundReason::CaseSplit { pair: idx };
        match mode {
            Mode::Active => {
                self.tableau.set_bound(x, Some(RatNum::zero()), None, reason.clone())?;
                self.tableau.add_equality_row(y, vec![(x, RatNum::one())], reason);
            }
            Mode::Inactive => {
                self.tableau.set_bound(x, None, Some(RatNum::zero()), reason.clone())?;
                self.tableau.set_bound(y, Some(RatNum::zero()), Some(RatNum::zero()), reason)?;
            }
        }
        self.modes[idx] = Some(mode);
        Ok(())
    }
}

trait RatSignExt {
    fn is_negative(&self) -> bool;
    fn is_positive(&self) -> bool;
}

impl RatSignExt for RatNum {
    fn is_negative(&self) -> bool {
        self < &RatNum::zero()
    }
    fn is_positive(&self) -> bool {
        self > &RatNum::zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::IneqAtom;
    use num_traits::FromPrimitive;

    fn r(n: i64) -> RatNum {
        RatNum::from_i64(n).unwrap()
    }

    /// Scenario 1: `x + y >= 5 and relu(x, y)` is SAT, e.g. x=y=2.5 (active branch).
    #[test]
    fn scenario_1_active_branch_sat() {
        let atoms = vec![IneqAtom::new(vec![("x".into(), r(1)), ("y".into(), r(1))], r(5))];
        let tableau = Tableau::from_atoms(&atoms);
        let pairs = vec![Pair { x: "x".into(), y: "y".into() }];
        let budget = StepBudget::new(tableau.num_vars().max(1));
        let relu = Reluplex::new(tableau, pairs, budget);
        match relu.solve().unwrap() {
            ReluResult::Sat { tableau } => {
                let x = tableau.vars.lookup("x").unwrap();
                let y = tableau.vars.lookup("y").unwrap();
                assert_eq!(tableau.value(x), tableau.value(y));
                assert!(tableau.value(x) >= &r(0));
            }
            ReluResult::Unsat { .. } => panic!("expected SAT"),
        }
    }

    /// Scenario 3: `relu(x,y) and y >= 1 and x <= 0` is UNSAT.
    #[test]
    fn scenario_3_unsat() {
        let atoms = vec![
            IneqAtom::new(vec![("y".into(), r(1))], r(1)),
            IneqAtom::new(vec![("x".into(), r(-1))], r(0)),
        ];
        let tableau = Tableau::from_atoms(&atoms);
        let pairs = vec![Pair { x: "x".into(), y: "y".into() }];
        let budget = StepBudget::new(tableau.num_vars().max(1) + 4);
        let relu = Reluplex::new(tableau, pairs, budget);
        match relu.solve().unwrap() {
            ReluResult::Unsat { .. } => {}
            ReluResult::Sat { .. } => panic!("expected UNSAT"),
        }
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::atoms::IneqAtom;
    use num_traits::FromPrimitive;
    use proptest::prelude::*;

    /// P4: whenever ReLUplex returns SAT, every declared pair's witness
    /// satisfies `y = max(0, x)` exactly.
    proptest! {
        #[test]
        fn relu_sat_is_sound(lo in -8i64..=0, hi in 0i64..=8) {
            let atoms = vec![
                IneqAtom::new(vec![("x".into(), RatNum::from_i64(-1).unwrap())], RatNum::from_i64(-hi).unwrap()),
                IneqAtom::new(vec![("x".into(), RatNum::from_i64(1).unwrap())], RatNum::from_i64(lo).unwrap()),
            ];
            let mut tableau = Tableau::from_atoms(&atoms);
            tableau.add_free_var("y", Some(RatNum::zero()), None);
            let pairs = vec![Pair { x: "x".into(), y: "y".into() }];
            let budget = StepBudget::new(tableau.num_vars().max(1) + 4);
            let relu = Reluplex::new(tableau, pairs, budget);
            if let Ok(ReluResult::Sat { tableau }) = relu.solve() {
                let x = tableau.vars.lookup("x").unwrap();
                let y = tableau.vars.lookup("y").unwrap();
                let vx = tableau.value(x).clone();
                let vy = tableau.value(y).clone();
                if vx.is_negative() {
                    prop_assert!(vy.is_zero());
                } else {
                    prop_assert_eq!(vy, vx);
                }
            }
        }
    }
}
