//! DPLL(T): drives the SAT core over the Tseitin CNF, consulting ReLUplex as
//! the theory oracle on every full model and learning a blocking clause on
//! theory conflict.
//!
//! The CNF grows only by clause append between iterations (never revisited
//! below the root), and the SAT core's own trail is fully rewound on every
//! call, so the combined loop meets the same "finite search space, monotone
//! progress" termination argument the plain DPLL core relies on (§4.5).

use std::collections::HashMap;

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Zero};

use crate::ast::Formula;
use crate::atoms::{Atom, AtomTable, IneqAtom, RatNum, ReluAtom};
use crate::error::SolverError;
use crate::reluplex::{Pair, Reluplex, ReluResult, StepBudget};
use crate::simplex::Tableau;
use crate::solver::dpll::{solve, SolveResult};
use crate::tseitin::encode;
use crate::types::{Lit, Model};

/// The fixed tolerance used to weaken a strict inequality into a non-strict
/// one at atom-construction time; also exposed for boundary reporting.
pub fn epsilon() -> RatNum {
    let mut denom = BigInt::from(1);
    for _ in 0..9 {
        denom *= 10;
    }
    BigRational::new(BigInt::from(1), denom)
}

/// Result of deciding a combined propositional/arithmetic/rectifier formula.
#[derive(Debug)]
pub enum DecisionResult {
    Sat {
        /// Real-valued witness for every surface arithmetic variable touched.
        assignment: HashMap<String, RatNum>,
        /// Truth value of every theory atom under the accepted model.
        theory_model: HashMap<usize, bool>,
    },
    Unsat,
    Unknown {
        reason: String,
    },
}

/// Decides `formula` over the fixed theory vocabulary in `atoms`.
pub fn decide(formula: &Formula, atoms: &AtomTable) -> Result<DecisionResult, SolverError> {
    let encoded = encode(formula, atoms)?;
    let mut cnf = encoded.cnf;
    let eps = epsilon();

    loop {
        let model = match solve(&cnf, encoded.num_vars) {
            SolveResult::Unsat => return Ok(DecisionResult::Unsat),
            SolveResult::Sat(model) => model,
        };

        let cube = theory_cube(atoms, &model);
        let (linear_atoms, pairs, negative_relus) = build_theory_input(atoms, &cube, &eps)?;

        match solve_with_relu_splits(&linear_atoms, &pairs, &negative_relus, &eps) {
            Err(SolverError::BudgetExceeded { at }) => {
                return Ok(DecisionResult::Unknown { reason: format!("pivot budget exceeded at {at}") });
            }
            Err(other) => return Err(other),
            Ok(ReluResult::Sat { tableau }) => {
                let mut assignment = HashMap::new();
                for id in 0..tableau.vars.len() {
                    assignment.insert(tableau.vars.name(id).to_string(), tableau.value(id).clone());
                }
                let theory_model = cube.iter().copied().collect();
                return Ok(DecisionResult::Sat { assignment, theory_model });
            }
            Ok(ReluResult::Unsat { .. }) => {
                let clause = blocking_clause(&cube);
                log::debug!("theory conflict on cube of {} literals, learning blocking clause", cube.len());
                cnf.push(clause);
            }
        }
    }
}

/// Resolves every negative `Relu` literal in the cube before calling
/// ReLUplex, per spec.md's instruction to handle a negative `Relu` atom by
/// "adding their contrapositive as an `Ineq` pair asserting a point
/// violating `y = max(0, x)`" — equivalently, splitting the atom into the
/// disjunction of linear facts that witness `y != max(0, x)`:
/// `y < x`, or `y < 0`, or (`y > x` and `y > 0`). Each disjunct is tried in
/// turn as an ordinary linear addition to the cube; the whole cube is SAT if
/// any one of them is. `remaining` shrinks by one negative `Relu` per
/// recursive call, so this always terminates (at most 3^k tableaus built for
/// `k` negative rectifier literals in a single cube).
fn solve_with_relu_splits(
    linear_atoms: &[IneqAtom],
    pairs: &[Pair],
    remaining: &[ReluAtom],
    eps: &RatNum,
) -> Result<ReluResult, SolverError> {
    let Some((first, rest)) = remaining.split_first() else {
        let mut tableau = Tableau::from_atoms(linear_atoms);
        for pair in pairs {
            tableau.add_free_var(&pair.x, None, None);
            let y = tableau.add_free_var(&pair.y, None, None);
            // Every rectifier output carries a permanent y >= 0 bound (§3),
            // whether or not `y` also appears in a linear atom.
            tableau.set_bound(y, Some(RatNum::zero()), None, crate::simplex::BoundReason::Permanent)?;
        }
        let budget = StepBudget::new(tableau.num_vars().max(1) + pairs.len());
        let relu = Reluplex::new(tableau, pairs.to_vec(), budget);
        return relu.solve();
    };

    for variant in negative_relu_variants(first, eps) {
        let merged: Vec<IneqAtom> = linear_atoms.iter().cloned().chain(variant).collect();
        match solve_with_relu_splits(&merged, pairs, rest, eps)? {
            ReluResult::Sat { tableau } => return Ok(ReluResult::Sat { tableau }),
            ReluResult::Unsat { .. } => continue,
        }
    }
    Ok(ReluResult::Unsat { derivation: Vec::new() })
}

/// The three mutually exclusive ways a pair can fail to satisfy
/// `y = max(0, x)`, each expressed purely as `Ineq` atoms so the rest of the
/// pipeline never has to special-case a negated rectifier relation.
fn negative_relu_variants(relu: &ReluAtom, eps: &RatNum) -> Vec<Vec<IneqAtom>> {
    let x = relu.x.clone();
    let y = relu.y.clone();
    vec![
        // y < x
        vec![IneqAtom::new(vec![(x.clone(), RatNum::one()), (y.clone(), -RatNum::one())], eps.clone())],
        // y < 0
        vec![IneqAtom::strict_less_than_zero(y.clone(), eps)],
        // y > x and y > 0
        vec![
            IneqAtom::new(vec![(y.clone(), RatNum::one()), (x, -RatNum::one())], eps.clone()),
            IneqAtom::new(vec![(y, RatNum::one())], eps.clone()),
        ],
    ]
}

/// The set of theory atoms assigned in `model`, as `(atom_id, polarity)`.
fn theory_cube(atoms: &AtomTable, model: &Model) -> Vec<(usize, bool)> {
    (0..atoms.len())
        .filter_map(|id| {
            let lit = Lit::pos(id);
            if model.is_true(lit) {
                Some((id, true))
            } else if model.is_false(lit) {
                Some((id, false))
            } else {
                None
            }
        })
        .collect()
}

/// Builds the ReLUplex input from a theory cube: linear atoms (negating
/// `Ineq`s asserted false, weakened by `eps`), rectifier pairs from positive
/// `Relu`s, and negative `Relu`s set aside for [`solve_with_relu_splits`] to
/// resolve into their contrapositive linear facts (spec.md's §4.5 step 4).
fn build_theory_input(
    atoms: &AtomTable,
    cube: &[(usize, bool)],
    eps: &RatNum,
) -> Result<(Vec<IneqAtom>, Vec<Pair>, Vec<ReluAtom>), SolverError> {
    let mut linear_atoms = Vec::new();
    let mut pairs = Vec::new();
    let mut negative_relus = Vec::new();

    for &(id, positive) in cube {
        match atoms.get(id) {
            Atom::Ineq(ineq) => {
                if positive {
                    linear_atoms.push(ineq.clone());
                } else {
                    linear_atoms.push(ineq.negated(eps));
                }
            }
            Atom::Relu(relu) => {
                if positive {
                    pairs.push(Pair { x: relu.x.clone(), y: relu.y.clone() });
                } else {
                    negative_relus.push(relu.clone());
                }
            }
        }
    }
    Ok((linear_atoms, pairs, negative_relus))
}

/// The clause forbidding exactly the cube that theory-conflicted: the
/// disjunction of the negation of every theory literal in it.
fn blocking_clause(cube: &[(usize, bool)]) -> crate::types::Clause {
    cube.iter().map(|&(id, positive)| Lit { var: id, neg: positive }).collect()
}
