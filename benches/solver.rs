use criterion::{black_box, criterion_group, criterion_main, Criterion};
use num_traits::FromPrimitive;

use relusmt::ast::Formula;
use relusmt::atoms::{Atom, AtomTable, IneqAtom, RatNum, ReluAtom};
use relusmt::dpllt::decide;

fn r(n: i64) -> RatNum {
    RatNum::from_i64(n).unwrap()
}

fn ineq(atoms: &mut AtomTable, coeffs: Vec<(&str, i64)>, bound: i64) -> Formula {
    let coeffs = coeffs.into_iter().map(|(n, c)| (n.to_string(), r(c))).collect();
    let id = atoms.intern(Atom::Ineq(IneqAtom::new(coeffs, r(bound))));
    Formula::Atom(id)
}

fn relu(atoms: &mut AtomTable, x: &str, y: &str) -> Formula {
    let id = atoms.intern(Atom::Relu(ReluAtom { x: x.into(), y: y.into() }));
    Formula::Atom(id)
}

/// A satisfiable chain `relu(v0,v1) and relu(v1,v2) and ... and v0 >= 1`.
/// Every activation in the chain takes the active branch.
fn satisfiable_relu_chain(n: usize) -> (Formula, AtomTable) {
    let mut atoms = AtomTable::new();
    let names: Vec<String> = (0..=n).map(|i| format!("v{i}")).collect();
    let mut formula = ineq(&mut atoms, vec![(&names[0], 1)], 1);
    for i in 0..n {
        formula = Formula::and(formula, relu(&mut atoms, &names[i], &names[i + 1]));
    }
    (formula, atoms)
}

/// An unsatisfiable chain: the same rectifier chain, but the input is forced
/// negative and the output is forced strictly positive, which no branch of
/// any link in the chain can satisfy.
fn unsatisfiable_relu_chain(n: usize) -> (Formula, AtomTable) {
    let mut atoms = AtomTable::new();
    let names: Vec<String> = (0..=n).map(|i| format!("v{i}")).collect();
    let mut formula = ineq(&mut atoms, vec![(&names[0], -1)], 1);
    for i in 0..n {
        formula = Formula::and(formula, relu(&mut atoms, &names[i], &names[i + 1]));
    }
    let last = &names[n];
    formula = Formula::and(formula, ineq(&mut atoms, vec![(last, 1)], 1));
    (formula, atoms)
}

fn bench_satisfiable_chains(c: &mut Criterion) {
    let mut group = c.benchmark_group("relu_chain_sat");
    for n in [2, 4, 6].iter() {
        let (formula, atoms) = satisfiable_relu_chain(*n);
        group.bench_with_input(format!("chain_{n}"), n, |b, _| {
            b.iter(|| decide(black_box(&formula), black_box(&atoms)))
        });
    }
    group.finish();
}

fn bench_unsatisfiable_chains(c: &mut Criterion) {
    let mut group = c.benchmark_group("relu_chain_unsat");
    for n in [2, 4, 6].iter() {
        let (formula, atoms) = unsatisfiable_relu_chain(*n);
        group.bench_with_input(format!("chain_{n}"), n, |b, _| {
            b.iter(|| decide(black_box(&formula), black_box(&atoms)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_satisfiable_chains, bench_unsatisfiable_chains);
criterion_main!(benches);
