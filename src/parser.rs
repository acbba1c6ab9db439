//! Atom-expression grammar parser: source text to [`ast::Formula`].
//!
//! Generalizes the teacher's own hand-written DIMACS line scanner from
//! whitespace-separated integer tokens on one line to a small tokenizer plus
//! a recursive-descent parser, since this grammar is recursive rather than
//! line-oriented. No external parser-combinator crate is pulled in — a
//! hand-written lexer/parser pair is exactly the teacher's own style, just
//! generalized to the richer grammar.
//!
//! ```text
//! formula := atom | 'not' formula | formula 'and' formula
//!          | formula 'or' formula | formula 'implies' formula
//!          | formula 'iff' formula | '(' formula ')'
//! atom    := 'ineq' '(' terms ',' number ')' | 'relu' '(' var ',' var ')'
//! terms   := (number ',' var) { ',' number ',' var }
//! ```

use num_rational::BigRational;
use num_traits::FromPrimitive;

use crate::ast::Formula;
use crate::atoms::{Atom, AtomTable, IneqAtom, RatNum, ReluAtom};
use crate::error::SolverError;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(String),
    LParen,
    RParen,
    Comma,
}

/// A single term-list entry while parsing `ineq(...)`'s argument list.
enum TermTok {
    Num(RatNum),
    Var(String),
}

fn malformed(message: impl Into<String>) -> SolverError {
    SolverError::MalformedInput { message: message.into() }
}

fn tokenize(src: &str) -> Result<Vec<Token>, SolverError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = src.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            c if c.is_ascii_digit() || c == '-' || c == '+' => {
                let start = i;
                i += 1;
                while i < chars.len()
                    && (chars[i].is_ascii_digit()
                        || chars[i] == '.'
                        || chars[i] == 'e'
                        || chars[i] == 'E'
                        || ((chars[i] == '-' || chars[i] == '+') && matches!(chars[i - 1], 'e' | 'E')))
                {
                    i += 1;
                }
                tokens.push(Token::Number(chars[start..i].iter().collect()));
            }
            other => return Err(malformed(format!("unexpected character '{other}'"))),
        }
    }
    Ok(tokens)
}

/// Parses a decimal literal, possibly in scientific notation, into an exact rational.
fn parse_number(tok: &str) -> Result<RatNum, SolverError> {
    let (mantissa, exp) = match tok.find(['e', 'E']) {
        Some(pos) => (&tok[..pos], tok[pos + 1..].parse::<i32>().map_err(|_| malformed(format!("bad exponent in '{tok}'")))?),
        None => (tok, 0),
    };
    let (int_part, frac_part) = match mantissa.find('.') {
        Some(pos) => (&mantissa[..pos], &mantissa[pos + 1..]),
        None => (mantissa, ""),
    };
    let digits: String = format!("{int_part}{frac_part}");
    let numer: num_bigint::BigInt = digits.parse().map_err(|_| malformed(format!("bad number '{tok}'")))?;
    let scale = frac_part.len() as i32 - exp;
    let mut base = RatNum::from_i64(1).unwrap();
    let ten = RatNum::from_i64(10).unwrap();
    if scale > 0 {
        for _ in 0..scale {
            base = base / ten.clone();
        }
    } else {
        for _ in 0..(-scale) {
            base = base * ten.clone();
        }
    }
    Ok(BigRational::from_integer(numer) * base)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    atoms: &'a mut AtomTable,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn expect_ident(&mut self, want: &str) -> Result<(), SolverError> {
        match self.advance() {
            Some(Token::Ident(s)) if s == want => Ok(()),
            other => Err(malformed(format!("expected '{want}', found {other:?}"))),
        }
    }

    fn expect(&mut self, tok: Token) -> Result<(), SolverError> {
        match self.advance() {
            Some(t) if t == tok => Ok(()),
            other => Err(malformed(format!("expected {tok:?}, found {other:?}"))),
        }
    }

    fn expect_var(&mut self) -> Result<String, SolverError> {
        match self.advance() {
            Some(Token::Ident(s)) => Ok(s),
            other => Err(malformed(format!("expected a variable name, found {other:?}"))),
        }
    }

    /// `formula := and_expr { ('implies' | 'iff') and_expr }`, right-associative infix.
    fn parse_formula(&mut self) -> Result<Formula, SolverError> {
        let lhs = self.parse_and_or()?;
        match self.peek() {
            Some(Token::Ident(s)) if s == "implies" => {
                self.advance();
                let rhs = self.parse_formula()?;
                Ok(Formula::implies(lhs, rhs))
            }
            Some(Token::Ident(s)) if s == "iff" => {
                self.advance();
                let rhs = self.parse_formula()?;
                Ok(Formula::iff(lhs, rhs))
            }
            _ => Ok(lhs),
        }
    }

    /// `and_expr := unary { ('and' | 'or') unary }`, left-associative infix.
    fn parse_and_or(&mut self) -> Result<Formula, SolverError> {
        let mut lhs = self.parse_unary()?;
        loop {
            match self.peek() {
                Some(Token::Ident(s)) if s == "and" => {
                    self.advance();
                    let rhs = self.parse_unary()?;
                    lhs = Formula::and(lhs, rhs);
                }
                Some(Token::Ident(s)) if s == "or" => {
                    self.advance();
                    let rhs = self.parse_unary()?;
                    lhs = Formula::or(lhs, rhs);
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn parse_unary(&mut self) -> Result<Formula, SolverError> {
        match self.peek() {
            Some(Token::Ident(s)) if s == "not" => {
                self.advance();
                Ok(Formula::not(self.parse_unary()?))
            }
            Some(Token::LParen) => {
                self.advance();
                let f = self.parse_formula()?;
                self.expect(Token::RParen)?;
                Ok(f)
            }
            Some(Token::Ident(s)) if s == "ineq" => self.parse_ineq(),
            Some(Token::Ident(s)) if s == "relu" => self.parse_relu(),
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.advance();
                Ok(Formula::Var(name))
            }
            other => Err(malformed(format!("expected a formula, found {other:?}"))),
        }
    }

    /// Reads the whole `terms ',' number` payload as a flat comma-separated
    /// token list first, then splits it into coefficient/variable pairs plus
    /// a trailing bound — avoids needing lookahead to tell a mid-list
    /// coefficient from the final bound.
    fn parse_ineq(&mut self) -> Result<Formula, SolverError> {
        self.expect_ident("ineq")?;
        self.expect(Token::LParen)?;
        let mut items: Vec<TermTok> = Vec::new();
        loop {
            match self.advance() {
                Some(Token::Number(s)) => items.push(TermTok::Num(parse_number(&s)?)),
                Some(Token::Ident(s)) => items.push(TermTok::Var(s)),
                other => return Err(malformed(format!("expected a term in ineq(...), found {other:?}"))),
            }
            match self.advance() {
                Some(Token::Comma) => continue,
                Some(Token::RParen) => break,
                other => return Err(malformed(format!("expected ',' or ')' in ineq(...), found {other:?}"))),
            }
        }
        if items.len() < 3 || items.len() % 2 == 0 {
            return Err(malformed("ineq(...) needs at least one (coeff, var) term and a trailing bound"));
        }
        let bound = match items.pop().unwrap() {
            TermTok::Num(n) => n,
            TermTok::Var(_) => return Err(malformed("ineq(...)'s last argument must be the bound, a number")),
        };
        let mut coeffs = Vec::new();
        let mut rest = items.into_iter();
        while let (Some(c), Some(v)) = (rest.next(), rest.next()) {
            let c = match c {
                TermTok::Num(n) => n,
                TermTok::Var(_) => return Err(malformed("expected a coefficient number in ineq(...)")),
            };
            let v = match v {
                TermTok::Var(s) => s,
                TermTok::Num(_) => return Err(malformed("expected a variable name in ineq(...)")),
            };
            coeffs.push((v, c));
        }
        let id = self.atoms.intern(Atom::Ineq(IneqAtom::new(coeffs, bound)));
        Ok(Formula::Atom(id))
    }

    fn parse_relu(&mut self) -> Result<Formula, SolverError> {
        self.expect_ident("relu")?;
        self.expect(Token::LParen)?;
        let x = self.expect_var()?;
        self.expect(Token::Comma)?;
        let y = self.expect_var()?;
        self.expect(Token::RParen)?;
        let id = self.atoms.intern(Atom::Relu(ReluAtom { x, y }));
        Ok(Formula::Atom(id))
    }
}

/// Parses `src` under the atom-expression grammar, interning every theory
/// atom encountered into `atoms`.
pub fn parse(src: &str, atoms: &mut AtomTable) -> Result<Formula, SolverError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser { tokens: &tokens, pos: 0, atoms };
    let formula = parser.parse_formula()?;
    if parser.pos != tokens.len() {
        return Err(malformed("trailing input after formula"));
    }
    Ok(formula)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_conjunction_of_ineq_and_relu() {
        let mut atoms = AtomTable::new();
        let f = parse("ineq(1,x,1,y,5) and relu(x,y)", &mut atoms).unwrap();
        assert!(matches!(f, Formula::And(_, _)));
        assert_eq!(atoms.len(), 2);
    }

    #[test]
    fn parses_not_and_parens() {
        let mut atoms = AtomTable::new();
        let f = parse("not (p and q)", &mut atoms).unwrap();
        match f {
            Formula::Not(inner) => assert!(matches!(*inner, Formula::And(_, _))),
            other => panic!("expected Not, got {other:?}"),
        }
    }

    #[test]
    fn parses_implies_and_iff() {
        let mut atoms = AtomTable::new();
        assert!(matches!(parse("p implies q", &mut atoms).unwrap(), Formula::Implies(_, _)));
        assert!(matches!(parse("p iff q", &mut atoms).unwrap(), Formula::Iff(_, _)));
    }

    #[test]
    fn parses_scientific_notation_bound() {
        let mut atoms = AtomTable::new();
        let f = parse("ineq(-1,y,1e-9)", &mut atoms).unwrap();
        assert!(matches!(f, Formula::Atom(_)));
        if let Atom::Ineq(ineq) = atoms.get(0) {
            assert_eq!(ineq.coeffs, vec![("y".to_string(), RatNum::from_i64(-1).unwrap())]);
        } else {
            panic!("expected Ineq atom");
        }
    }

    #[test]
    fn rejects_malformed_input() {
        let mut atoms = AtomTable::new();
        assert!(parse("ineq(1,x", &mut atoms).is_err());
        assert!(parse("and p", &mut atoms).is_err());
    }
}
