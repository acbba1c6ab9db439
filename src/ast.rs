//! Propositional AST over theory atoms, and its negation normal form.
//!
//! The tree is a plain tagged `enum`, dispatched by pattern match — there is
//! no open class hierarchy and nothing implements `Drop` cycles, so ordinary
//! `Box` ownership is enough; interning of shared leaves lives one level down
//! in [`crate::atoms::AtomTable`].

use crate::atoms::AtomId;

/// A quantifier-free propositional formula over theory atoms.
///
/// `Var` names a bare propositional identifier (not drawn from the theory
/// vocabulary); `Atom` names an already-interned theory atom by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Formula {
    Var(String),
    Atom(AtomId),
    Not(Box<Formula>),
    And(Box<Formula>, Box<Formula>),
    Or(Box<Formula>, Box<Formula>),
    Implies(Box<Formula>, Box<Formula>),
    Iff(Box<Formula>, Box<Formula>),
}

impl Formula {
    pub fn not(f: Formula) -> Formula {
        Formula::Not(Box::new(f))
    }
    pub fn and(a: Formula, b: Formula) -> Formula {
        Formula::And(Box::new(a), Box::new(b))
    }
    pub fn or(a: Formula, b: Formula) -> Formula {
        Formula::Or(Box::new(a), Box::new(b))
    }
    pub fn implies(a: Formula, b: Formula) -> Formula {
        Formula::Implies(Box::new(a), Box::new(b))
    }
    pub fn iff(a: Formula, b: Formula) -> Formula {
        Formula::Iff(Box::new(a), Box::new(b))
    }

    /// Negation normal form: `Implies`/`Iff` eliminated by desugaring to
    /// `And`/`Or`/`Not`, double negation cancelled. `Not` is otherwise left
    /// exactly where it was — wrapping an arbitrary subformula, not just a
    /// leaf.
    ///
    /// This is step (a) of the Tseitin algorithm. Pushing negation all the
    /// way to the leaves via De Morgan is deliberately *not* done here:
    /// [`crate::tseitin::encode`]'s own `Not` case encodes the wrapped
    /// subformula and negates the resulting literal directly, so doing it
    /// again here would only rebuild a different (and, per the worked
    /// example, wrong) formula shape.
    pub fn to_nnf(&self) -> Formula {
        eliminate_connectives(self)
    }
}

fn eliminate_connectives(f: &Formula) -> Formula {
    match f {
        Formula::Var(name) => Formula::Var(name.clone()),
        Formula::Atom(id) => Formula::Atom(*id),
        Formula::Not(inner) => match eliminate_connectives(inner) {
            Formula::Not(cancelled) => *cancelled,
            other => Formula::not(other),
        },
        Formula::And(a, b) => Formula::and(eliminate_connectives(a), eliminate_connectives(b)),
        Formula::Or(a, b) => Formula::or(eliminate_connectives(a), eliminate_connectives(b)),
        Formula::Implies(a, b) => {
            // a -> b  ==  (not a) or b
            let desugared = Formula::or(Formula::not((**a).clone()), (**b).clone());
            eliminate_connectives(&desugared)
        }
        Formula::Iff(a, b) => {
            // a <-> b  ==  (a -> b) and (b -> a)
            let desugared = Formula::and(
                Formula::implies((**a).clone(), (**b).clone()),
                Formula::implies((**b).clone(), (**a).clone()),
            );
            eliminate_connectives(&desugared)
        }
    }
}
