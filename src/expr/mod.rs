//! Mathematical expression trees, parsing and evaluation.
//!
//! Text is tokenised and ordered by `meval`, then folded into an [`Expr`] tree which the solvers
//! evaluate with a single variable bound.

use super::*;
use std::fmt;

mod parse;

pub use parse::{parse, Body, ExprKind, ParsedExpression, Side};

/// Named constants which are never reported as free variables.
pub const CONSTANTS: &[(&str, f64)] = &[
    ("pi", std::f64::consts::PI),
    ("e", std::f64::consts::E),
    ("tau", std::f64::consts::TAU),
];

/// Functions [`Expr::eval`] knows. Like the constants, they are never free variables.
pub const FUNCTIONS: &[&str] = &[
    "sin", "cos", "tan", "asin", "acos", "atan", "sinh", "cosh", "tanh", "sqrt", "cbrt", "abs",
    "exp", "ln", "log", "log10", "log2", "floor", "ceil", "round", "sign", "atan2", "min", "max",
];

/// A parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A numeric literal.
    Constant(f64),
    /// A variable or named constant.
    Symbol(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// A function application, such as `sqrt(x)`.
    Call { name: String, args: Vec<Expr> },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
}

/// Is `name` a constant or a function rather than a variable?
pub fn is_reserved(name: &str) -> bool {
    constant(name).is_some() || FUNCTIONS.contains(&name)
}

/// Look up a named constant.
pub fn constant(name: &str) -> Option<f64> {
    CONSTANTS
        .iter()
        .find_map(|(n, v)| (*n == name).then_some(*v))
}

impl Expr {
    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Walk the tree in pre-order, calling `f` on every node.
    pub fn visit<'a, F>(&'a self, f: &mut F)
    where
        F: FnMut(&'a Expr),
    {
        f(self);
        match self {
            Expr::Constant(_) | Expr::Symbol(_) => (),
            Expr::Unary { operand, .. } => operand.visit(f),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.visit(f);
                rhs.visit(f);
            }
            Expr::Call { args, .. } => {
                for arg in args {
                    arg.visit(f);
                }
            }
        }
    }

    /// Returns `true` if any node in the tree satisfies `predicate`.
    pub fn any<P>(&self, mut predicate: P) -> bool
    where
        P: FnMut(&Expr) -> bool,
    {
        let mut found = false;
        self.visit(&mut |e| found = found || predicate(e));
        found
    }

    /// The free variables in first-seen order, without duplicates.
    pub fn free_variables(&self) -> Vec<String> {
        let mut vars = Vec::new();
        self.collect_free_variables(&mut vars);
        vars
    }

    pub(crate) fn collect_free_variables(&self, vars: &mut Vec<String>) {
        self.visit(&mut |e| {
            if let Expr::Symbol(name) = e {
                if !is_reserved(name) && !vars.contains(name) {
                    vars.push(name.clone());
                }
            }
        });
    }

    /// Does the tree contain a free variable?
    pub fn has_free_variable(&self) -> bool {
        self.any(|e| matches!(e, Expr::Symbol(n) if !is_reserved(n)))
    }

    /// Does the tree raise an expression containing a free variable to the power of 2?
    pub fn has_squared_term(&self) -> bool {
        self.any(|e| match e {
            Expr::Binary {
                op: BinaryOp::Pow,
                lhs,
                rhs,
            } => **rhs == Expr::Constant(2.0) && lhs.has_free_variable(),
            _ => false,
        })
    }

    /// Evaluate the expression, resolving symbols through `bindings` first and then the named
    /// constants.
    pub fn eval(&self, bindings: &[(&str, f64)]) -> Result<f64> {
        let x = match self {
            Expr::Constant(x) => *x,
            Expr::Symbol(name) => bindings
                .iter()
                .find_map(|(n, v)| (*n == name.as_str()).then_some(*v))
                .or_else(|| constant(name))
                .ok_or_else(|| miette!("no value bound to variable '{}'", name))?,
            Expr::Unary { op, operand } => {
                let x = operand.eval(bindings)?;
                match op {
                    UnaryOp::Neg => -x,
                    UnaryOp::Plus => x,
                }
            }
            Expr::Binary { op, lhs, rhs } => {
                let (l, r) = (lhs.eval(bindings)?, rhs.eval(bindings)?);
                match op {
                    BinaryOp::Add => l + r,
                    BinaryOp::Sub => l - r,
                    BinaryOp::Mul => l * r,
                    BinaryOp::Div => l / r,
                    BinaryOp::Rem => l % r,
                    BinaryOp::Pow => l.powf(r),
                }
            }
            Expr::Call { name, args } => {
                let args = args
                    .iter()
                    .map(|a| a.eval(bindings))
                    .collect::<Result<Vec<_>>>()?;
                call(name, &args)?
            }
        };

        Ok(x)
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Binary {
                op: BinaryOp::Add | BinaryOp::Sub,
                ..
            } => 1,
            Expr::Binary {
                op: BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem,
                ..
            } => 2,
            Expr::Unary { .. } => 3,
            Expr::Binary {
                op: BinaryOp::Pow, ..
            } => 4,
            Expr::Constant(_) | Expr::Symbol(_) | Expr::Call { .. } => 5,
        }
    }

    /// Write `self`, wrapped in parentheses if it binds looser than `min`.
    fn fmt_at(&self, f: &mut fmt::Formatter, min: u8) -> fmt::Result {
        if self.precedence() < min {
            write!(f, "\\left({self}\\right)")
        } else {
            write!(f, "{self}")
        }
    }

    /// A coefficient written directly against its variable, as in `2x` or `3x^{2}`.
    fn is_juxtaposable(lhs: &Expr, rhs: &Expr) -> bool {
        matches!(lhs, Expr::Constant(_))
            && match rhs {
                Expr::Symbol(_) => true,
                Expr::Binary {
                    op: BinaryOp::Pow,
                    lhs,
                    ..
                } => matches!(**lhs, Expr::Symbol(_)),
                _ => false,
            }
    }
}

/// Renders a LaTeX-like form of the expression.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Constant(x) => write!(f, "{x}"),
            Expr::Symbol(name) => match name.as_str() {
                "pi" => f.write_str("\\pi"),
                "tau" => f.write_str("\\tau"),
                n => f.write_str(n),
            },
            Expr::Unary { op, operand } => {
                f.write_str(match op {
                    UnaryOp::Neg => "-",
                    UnaryOp::Plus => "+",
                })?;
                operand.fmt_at(f, 2)
            }
            Expr::Binary { op, lhs, rhs } => match op {
                BinaryOp::Add => {
                    lhs.fmt_at(f, 1)?;
                    f.write_str(" + ")?;
                    rhs.fmt_at(f, 1)
                }
                BinaryOp::Sub => {
                    lhs.fmt_at(f, 1)?;
                    f.write_str(" - ")?;
                    rhs.fmt_at(f, 2)
                }
                BinaryOp::Mul if Expr::is_juxtaposable(lhs, rhs) => write!(f, "{lhs}{rhs}"),
                BinaryOp::Mul => {
                    lhs.fmt_at(f, 2)?;
                    f.write_str(" \\cdot ")?;
                    rhs.fmt_at(f, 3)
                }
                BinaryOp::Div => write!(f, "\\frac{{{lhs}}}{{{rhs}}}"),
                BinaryOp::Rem => {
                    lhs.fmt_at(f, 2)?;
                    f.write_str(" \\bmod ")?;
                    rhs.fmt_at(f, 3)
                }
                BinaryOp::Pow => {
                    lhs.fmt_at(f, 5)?;
                    write!(f, "^{{{rhs}}}")
                }
            },
            Expr::Call { name, args } if name == "sqrt" && args.len() == 1 => {
                write!(f, "\\sqrt{{{}}}", args[0])
            }
            Expr::Call { name, args } => {
                if is_latex_function(name) {
                    write!(f, "\\{name}")?;
                } else {
                    write!(f, "\\mathrm{{{name}}}")?;
                }
                f.write_str("\\left(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str("\\right)")
            }
        }
    }
}

fn is_latex_function(name: &str) -> bool {
    matches!(
        name,
        "sin" | "cos" | "tan" | "sinh" | "cosh" | "tanh" | "ln" | "log" | "exp" | "min" | "max"
    )
}

fn call(name: &str, args: &[f64]) -> Result<f64> {
    let x = match (name, args) {
        ("sin", [x]) => x.sin(),
        ("cos", [x]) => x.cos(),
        ("tan", [x]) => x.tan(),
        ("asin", [x]) => x.asin(),
        ("acos", [x]) => x.acos(),
        ("atan", [x]) => x.atan(),
        ("sinh", [x]) => x.sinh(),
        ("cosh", [x]) => x.cosh(),
        ("tanh", [x]) => x.tanh(),
        ("sqrt", [x]) => x.sqrt(),
        ("cbrt", [x]) => x.cbrt(),
        ("abs", [x]) => x.abs(),
        ("exp", [x]) => x.exp(),
        ("ln", [x]) | ("log", [x]) => x.ln(),
        ("log", [x, base]) => x.log(*base),
        ("log10", [x]) => x.log10(),
        ("log2", [x]) => x.log2(),
        ("floor", [x]) => x.floor(),
        ("ceil", [x]) => x.ceil(),
        ("round", [x]) => x.round(),
        ("sign", [x]) => {
            if *x == 0.0 {
                0.0
            } else {
                x.signum()
            }
        }
        ("atan2", [y, x]) => y.atan2(*x),
        ("min", [first, rest @ ..]) => rest.iter().fold(*first, |a, b| a.min(*b)),
        ("max", [first, rest @ ..]) => rest.iter().fold(*first, |a, b| a.max(*b)),
        _ => bail!(
            "unknown function '{}' taking {} argument(s)",
            name,
            args.len()
        ),
    };

    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> Expr {
        Expr::Symbol("x".into())
    }

    fn n(v: f64) -> Expr {
        Expr::Constant(v)
    }

    #[test]
    fn free_variables_skip_constants_and_keep_order() {
        // y * pi + x * y
        let e = Expr::binary(
            BinaryOp::Add,
            Expr::binary(BinaryOp::Mul, Expr::Symbol("y".into()), Expr::Symbol("pi".into())),
            Expr::binary(BinaryOp::Mul, x(), Expr::Symbol("y".into())),
        );
        assert_eq!(e.free_variables(), vec!["y".to_string(), "x".to_string()]);

        let e = Expr::binary(BinaryOp::Add, Expr::Symbol("sqrt".into()), x());
        assert_eq!(e.free_variables(), vec!["x".to_string()]);
    }

    #[test]
    fn every_listed_function_evaluates() {
        for name in FUNCTIONS {
            let arity = if ["atan2", "min", "max"].contains(name) { 2 } else { 1 };
            let e = Expr::Call {
                name: name.to_string(),
                args: vec![n(0.5); arity],
            };
            assert!(e.eval(&[]).is_ok(), "{name}");
        }
    }

    #[test]
    fn squared_term_needs_a_free_variable() {
        let sq = Expr::binary(BinaryOp::Pow, x(), n(2.0));
        assert!(sq.has_squared_term());

        let constant_sq = Expr::binary(BinaryOp::Pow, n(3.0), n(2.0));
        assert!(!constant_sq.has_squared_term());

        let cube = Expr::binary(BinaryOp::Pow, x(), n(3.0));
        assert!(!cube.has_squared_term());
    }

    #[test]
    fn evaluation() {
        // 2x^2 - sqrt(x) at x = 4
        let e = Expr::binary(
            BinaryOp::Sub,
            Expr::binary(
                BinaryOp::Mul,
                n(2.0),
                Expr::binary(BinaryOp::Pow, x(), n(2.0)),
            ),
            Expr::Call {
                name: "sqrt".into(),
                args: vec![x()],
            },
        );
        assert_eq!(e.eval(&[("x", 4.0)]).unwrap(), 30.0);
        assert!(e.eval(&[]).is_err());
    }

    #[test]
    fn unknown_function_is_an_error() {
        let e = Expr::Call {
            name: "frobnicate".into(),
            args: vec![n(1.0)],
        };
        assert!(e.eval(&[]).is_err());
    }

    #[test]
    fn latex_rendering() {
        let e = Expr::binary(
            BinaryOp::Add,
            Expr::binary(
                BinaryOp::Mul,
                n(3.0),
                Expr::binary(BinaryOp::Pow, x(), n(2.0)),
            ),
            Expr::binary(
                BinaryOp::Div,
                n(1.0),
                Expr::binary(BinaryOp::Sub, x(), n(1.0)),
            ),
        );
        assert_eq!(e.to_string(), "3x^{2} + \\frac{1}{x - 1}");

        let e = Expr::binary(
            BinaryOp::Pow,
            Expr::binary(BinaryOp::Add, x(), n(1.0)),
            n(2.0),
        );
        assert_eq!(e.to_string(), "\\left(x + 1\\right)^{2}");
    }
}
