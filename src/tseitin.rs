//! Tseitin transformation: AST to equisatisfiable CNF.
//!
//! Given a formula, introduces one fresh auxiliary variable per non-leaf
//! subformula and emits the three clauses defining that auxiliary as
//! equivalent to the subformula it names, then asserts the root's literal as
//! a unit clause. Atom leaves reuse their interned [`crate::atoms::AtomId`]
//! directly as their variable, so a theory atom's SAT literal and its
//! theory literal always agree without translation.
//!
//! Clause order is the post-order walk order, so two calls on the same
//! formula always produce byte-identical output.

use std::collections::HashMap;

use crate::ast::Formula;
use crate::atoms::AtomTable;
use crate::error::SolverError;
use crate::types::{Cnf, Lit, Var};

/// What a fresh auxiliary variable was introduced to name, kept around so a
/// theory atom (or the original connective) can be recovered from a variable
/// id after the fact — mirrors the contract in §4.1.
#[derive(Debug, Clone)]
pub enum Def {
    /// A bare propositional variable from the surface formula.
    PropVar(String),
    /// `t <-> (a and b)`, `a`/`b` given as the literals that name them.
    And(Lit, Lit),
    /// `t <-> (a or b)`.
    Or(Lit, Lit),
}

/// Everything the Tseitin encoder produces: the CNF itself, the mapping from
/// every variable to what it names, and the literal representing the root.
#[derive(Debug, Clone)]
pub struct TseitinOutput {
    pub cnf: Cnf,
    pub defs: HashMap<Var, Def>,
    pub root: Lit,
    pub num_vars: Var,
}

struct EncodeState<'a> {
    atoms: &'a AtomTable,
    cnf: Cnf,
    defs: HashMap<Var, Def>,
    prop_vars: HashMap<String, Var>,
    next_var: Var,
}

impl<'a> EncodeState<'a> {
    fn new(atoms: &'a AtomTable) -> Self {
        EncodeState {
            atoms,
            cnf: Cnf::new(),
            defs: HashMap::new(),
            prop_vars: HashMap::new(),
            // Atom ids occupy [0, atoms.len()); fresh variables start above them.
            next_var: atoms.len(),
        }
    }

    fn fresh(&mut self) -> Var {
        let v = self.next_var;
        self.next_var += 1;
        v
    }

    fn var_for_prop(&mut self, name: &str) -> Var {
        if let Some(&v) = self.prop_vars.get(name) {
            return v;
        }
        let v = self.fresh();
        self.prop_vars.insert(name.to_string(), v);
        self.defs.insert(v, Def::PropVar(name.to_string()));
        v
    }
}

/// Encodes `formula` into CNF, returning the clauses, the auxiliary-variable
/// map, and the literal representing the whole formula.
///
/// `formula` is converted to negation normal form first (step (a) of the
/// algorithm): `Implies`/`Iff` eliminated, nothing else. `Not` below may
/// therefore wrap any subformula, not just a leaf — it is handled by
/// encoding that subformula and negating the resulting literal, which is
/// exactly how a negative theory atom or negative auxiliary ends up
/// participating in the clauses above it without ever being rewritten away.
pub fn encode(formula: &Formula, atoms: &AtomTable) -> Result<TseitinOutput, SolverError> {
    let nnf = formula.to_nnf();
    let mut state = EncodeState::new(atoms);
    let root = encode_rec(&nnf, &mut state)?;
    state.cnf.push(vec![root]);
    Ok(TseitinOutput {
        cnf: state.cnf,
        defs: state.defs,
        root,
        num_vars: state.next_var,
    })
}

fn encode_rec(f: &Formula, state: &mut EncodeState) -> Result<Lit, SolverError> {
    match f {
        Formula::Var(name) => Ok(Lit::pos(state.var_for_prop(name))),
        Formula::Atom(id) => Ok(Lit::pos(*id)),
        Formula::Not(inner) => {
            let l = encode_rec(inner, state)?;
            Ok(l.negated())
        }
        Formula::And(a, b) => {
            let la = encode_rec(a, state)?;
            let lb = encode_rec(b, state)?;
            let t = state.fresh();
            // t <-> (la and lb)
            state.cnf.push(vec![Lit::neg(t), la]);
            state.cnf.push(vec![Lit::neg(t), lb]);
            state.cnf.push(vec![Lit::pos(t), la.negated(), lb.negated()]);
            state.defs.insert(t, Def::And(la, lb));
            Ok(Lit::pos(t))
        }
        Formula::Or(a, b) => {
            let la = encode_rec(a, state)?;
            let lb = encode_rec(b, state)?;
            let t = state.fresh();
            // t <-> (la or lb)
            state.cnf.push(vec![Lit::neg(t), la, lb]);
            state.cnf.push(vec![Lit::pos(t), la.negated()]);
            state.cnf.push(vec![Lit::pos(t), lb.negated()]);
            state.defs.insert(t, Def::Or(la, lb));
            Ok(Lit::pos(t))
        }
        Formula::Implies(_, _) | Formula::Iff(_, _) => Err(SolverError::invariant(
            "I-NNF",
            "Implies/Iff survived negation normal form",
        )),
    }
}
