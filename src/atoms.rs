//! The fixed theory vocabulary: linear inequalities and rectifier relations.
//!
//! Exactly two atom kinds are recognized (see the data model). Atoms are
//! value-typed and interned by structural equality, so a satisfying boolean
//! assignment's literal over an atom corresponds one-to-one with a theory
//! literal the arithmetic solvers understand.

use std::collections::HashMap;

use num_rational::BigRational;
use num_traits::{One, Zero};

/// Exact rational used throughout the arithmetic theory; never a float.
pub type RatNum = BigRational;

/// A variable name as it appears in the surface atom vocabulary (`x`, `y`, ...).
pub type VarName = String;

/// `Σ coeffs[i].1 * coeffs[i].0 >= bound`, the sole linear relation in the vocabulary.
///
/// `coeffs` is kept sorted by variable name after construction so that two
/// atoms written with the same terms in a different order intern to the same
/// [`Atom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IneqAtom {
    pub coeffs: Vec<(VarName, RatNum)>,
    pub bound: RatNum,
}

impl IneqAtom {
    /// Builds a canonicalized inequality atom, dropping zero-coefficient terms
    /// and sorting the remainder by variable name.
    pub fn new(mut coeffs: Vec<(VarName, RatNum)>, bound: RatNum) -> Self {
        coeffs.retain(|(_, c)| !c.is_zero());
        coeffs.sort_by(|a, b| a.0.cmp(&b.0));
        IneqAtom { coeffs, bound }
    }

    /// The contrapositive of `Σ c_i x_i >= bound`, i.e. `Σ -c_i x_i >= -bound + ε`.
    ///
    /// Used when a negative `Ineq` literal survives into a theory cube: the
    /// strict `<` this produces is weakened to a non-strict `>=` by `epsilon`,
    /// per the strict-inequality encoding fixed in [`crate::dpllt::epsilon`].
    pub fn negated(&self, epsilon: &RatNum) -> IneqAtom {
        let coeffs = self.coeffs.iter().map(|(n, c)| (n.clone(), -c)).collect();
        IneqAtom::new(coeffs, -&self.bound + epsilon)
    }

    /// `x < 0`, encoded as `-x >= epsilon` per the grammar's `ineq(-1, x, ε)` idiom.
    ///
    /// Kept as an explicit constructor rather than a parser-side convention so
    /// the tolerance constant is typed once, here, instead of at every call site.
    pub fn strict_less_than_zero(var: VarName, epsilon: &RatNum) -> IneqAtom {
        IneqAtom::new(vec![(var, -RatNum::one())], epsilon.clone())
    }
}

/// `y = max(0, x)`, the sole piecewise-linear relation in the vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReluAtom {
    pub x: VarName,
    pub y: VarName,
}

/// A single theory atom: either an inequality or a rectifier relation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Atom {
    Ineq(IneqAtom),
    Relu(ReluAtom),
}

/// Interns [`Atom`] values by structural equality, handing out a stable,
/// densely-packed [`AtomId`] for each distinct atom in first-seen order.
///
/// The id an atom receives here is reused directly as the Tseitin-level SAT
/// variable id for its leaf literal, so two copies of the same atom anywhere
/// in the formula always correspond to the same boolean variable.
#[derive(Debug, Default)]
pub struct AtomTable {
    atoms: Vec<Atom>,
    index: HashMap<Atom, AtomId>,
}

/// Identifier of an interned [`Atom`]; doubles as a SAT variable id.
pub type AtomId = usize;

impl AtomTable {
    pub fn new() -> Self {
        AtomTable::default()
    }

    /// Interns `atom`, returning its (possibly freshly allocated) id.
    pub fn intern(&mut self, atom: Atom) -> AtomId {
        if let Some(&id) = self.index.get(&atom) {
            return id;
        }
        let id = self.atoms.len();
        self.index.insert(atom.clone(), id);
        self.atoms.push(atom);
        id
    }

    pub fn get(&self, id: AtomId) -> &Atom {
        &self.atoms[id]
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::FromPrimitive;

    fn r(n: i64) -> RatNum {
        RatNum::from_i64(n).unwrap()
    }

    #[test]
    fn reordered_terms_intern_to_same_atom() {
        let mut table = AtomTable::new();
        let a = IneqAtom::new(vec![("x".into(), r(1)), ("y".into(), r(2))], r(5));
        let b = IneqAtom::new(vec![("y".into(), r(2)), ("x".into(), r(1))], r(5));
        let id_a = table.intern(Atom::Ineq(a));
        let id_b = table.intern(Atom::Ineq(b));
        assert_eq!(id_a, id_b);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn distinct_atoms_get_distinct_ids() {
        let mut table = AtomTable::new();
        let ineq = table.intern(Atom::Ineq(IneqAtom::new(vec![("x".into(), r(1))], r(0))));
        let relu = table.intern(Atom::Relu(ReluAtom { x: "x".into(), y: "y".into() }));
        assert_ne!(ineq, relu);
    }

    #[test]
    fn zero_coefficients_are_dropped() {
        let atom = IneqAtom::new(vec![("x".into(), r(0)), ("y".into(), r(3))], r(1));
        assert_eq!(atom.coeffs, vec![("y".into(), r(3))]);
    }
}
