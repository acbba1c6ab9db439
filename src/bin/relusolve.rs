use std::env;
use std::fs;
use std::io::{self, Read};
use std::process;

use relusmt::atoms::AtomTable;
use relusmt::dpllt::{decide, DecisionResult};
use relusmt::parser::parse;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let show_model = args.iter().any(|a| a == "--model");
    let path = args.iter().skip(1).find(|a| !a.starts_with("--"));

    let src = match path {
        Some(p) => match fs::read_to_string(p) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("error reading {p}: {e}");
                process::exit(2);
            }
        },
        None => {
            let mut s = String::new();
            if let Err(e) = io::stdin().read_to_string(&mut s) {
                eprintln!("error reading stdin: {e}");
                process::exit(2);
            }
            s
        }
    };

    let mut atoms = AtomTable::new();
    let formula = match parse(&src, &mut atoms) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("{e}");
            process::exit(2);
        }
    };

    match decide(&formula, &atoms) {
        Ok(DecisionResult::Sat { assignment, theory_model }) => {
            println!("SAT");
            if show_model {
                let mut names: Vec<&String> = assignment.keys().collect();
                names.sort();
                for name in names {
                    println!("{name} = {}", assignment[name]);
                }
                let mut ids: Vec<&usize> = theory_model.keys().collect();
                ids.sort();
                for id in ids {
                    println!("atom[{id}] = {}", theory_model[id]);
                }
            }
            process::exit(0);
        }
        Ok(DecisionResult::Unsat) => {
            println!("UNSAT");
            process::exit(10);
        }
        Ok(DecisionResult::Unknown { reason }) => {
            println!("UNKNOWN: {reason}");
            process::exit(20);
        }
        Err(e) => {
            eprintln!("{e}");
            process::exit(2);
        }
    }
}
