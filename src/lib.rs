//! # relusmt
//!
//! A decision procedure for quantifier-free formulas over propositional
//! logic, linear real arithmetic, and piecewise-linear rectifier (`y = max(0,
//! x)`) constraints — the combination a small neural-network verification
//! query needs.
//!
//! ## Architecture overview
//!
//! THE CORE is three tightly coupled subsystems plus the glue that wires
//! them into one decision procedure:
//!
//! - [`ast`] / [`atoms`]: the propositional AST and the fixed two-atom
//!   theory vocabulary (`Ineq`, `Relu`), interned by structural equality.
//! - [`tseitin`]: converts an AST into an equisatisfiable CNF.
//! - [`solver`]: a DPLL SAT core (unit propagation, pure-literal
//!   elimination, deterministic branching — no clause learning).
//! - [`simplex`]: a bound-aware revised Simplex solver over exact rationals.
//! - [`reluplex`]: wraps Simplex with rectifier-pair repair pivots and
//!   case-splitting.
//! - [`dpllt`]: the outer loop combining the SAT core and ReLUplex, learning
//!   a blocking clause on every theory conflict.
//!
//! Around that core, this crate ships the collaborators needed to make it a
//! runnable program rather than a library fragment:
//!
//! - [`parser`]: the §6 atom-expression grammar, text to [`ast::Formula`].
//! - [`error`]: the typed failure surface shared by the parser and the core.
//! - the `relusolve` binary: reads a formula, decides it, prints the result,
//!   exits with the matching code.
//!
//! ## Quick start
//!
//! ```rust
//! use relusmt::atoms::{Atom, AtomTable, IneqAtom, ReluAtom};
//! use relusmt::ast::Formula;
//! use relusmt::dpllt::{decide, DecisionResult};
//! use num_traits::FromPrimitive;
//!
//! let mut atoms = AtomTable::new();
//! let bound = relusmt::atoms::RatNum::from_i64(5).unwrap();
//! let coeffs = vec![
//!     ("x".to_string(), relusmt::atoms::RatNum::from_i64(1).unwrap()),
//!     ("y".to_string(), relusmt::atoms::RatNum::from_i64(1).unwrap()),
//! ];
//! let ineq_id = atoms.intern(Atom::Ineq(IneqAtom::new(coeffs, bound)));
//! let relu_id = atoms.intern(Atom::Relu(ReluAtom { x: "x".into(), y: "y".into() }));
//! let formula = Formula::and(Formula::Atom(ineq_id), Formula::Atom(relu_id));
//!
//! match decide(&formula, &atoms).unwrap() {
//!     DecisionResult::Sat { .. } => println!("satisfiable"),
//!     DecisionResult::Unsat => println!("unsatisfiable"),
//!     DecisionResult::Unknown { reason } => println!("unknown: {reason}"),
//! }
//! ```

pub mod ast;
pub mod atoms;
pub mod dpllt;
pub mod error;
pub mod parser;
pub mod reluplex;
pub mod simplex;
pub mod solver;
pub mod tseitin;
pub mod types;

pub use dpllt::decide;
