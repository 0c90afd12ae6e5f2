use super::*;
use crate::expr::{ExprKind, ParsedExpression, Side};
use log::debug;

/// The outcome of the quadratic formula.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadraticRoots {
    /// `b² - 4ac`.
    pub discriminant: f64,
    pub solution_type: SolutionType,
    pub solutions: Solutions,
}

/// Apply the quadratic formula to `a·x² + b·x + c = 0`.
///
/// `a` must not be zero. A discriminant within [`EPSILON`] of zero is treated as zero.
///
/// ```rust
/// use stepsolve::solve::{solve_quadratic_formula, SolutionType, Solutions};
///
/// let r = solve_quadratic_formula(1.0, -2.0, 1.0);
/// assert_eq!(r.solution_type, SolutionType::OneReal);
/// assert_eq!(r.solutions, Solutions::Real(vec![1.0]));
/// ```
pub fn solve_quadratic_formula(a: f64, b: f64, c: f64) -> QuadraticRoots {
    let discriminant = b * b - 4.0 * a * c;

    let (solution_type, solutions) = if discriminant.abs() < EPSILON {
        (SolutionType::OneReal, Solutions::Real(vec![-b / (2.0 * a)]))
    } else if discriminant > 0.0 {
        let sqrt = discriminant.sqrt();
        let x1 = (-b + sqrt) / (2.0 * a);
        let x2 = (-b - sqrt) / (2.0 * a);
        (SolutionType::TwoReal, Solutions::Real(vec![x1, x2]))
    } else {
        // `+ 0.0` so that `b = 0` gives `0`, not `-0`
        let re = -b / (2.0 * a) + 0.0;
        let im = ((-discriminant).sqrt() / (2.0 * a)).abs();
        (
            SolutionType::Complex,
            Solutions::Complex([format!("{re} + {im}i"), format!("{re} - {im}i")]),
        )
    };

    QuadraticRoots {
        discriminant,
        solution_type,
        solutions,
    }
}

impl QuadraticRoots {
    /// The roots as `x = …` statements joined by `or`.
    pub fn describe(&self, variable: &str) -> String {
        let roots = match &self.solutions {
            Solutions::Single(x) => vec![format_number(*x)],
            Solutions::Real(xs) => xs.iter().copied().map(format_number).collect(),
            Solutions::Complex(zs) => zs.to_vec(),
        };

        roots
            .iter()
            .map(|r| format!("{variable} = {r}"))
            .collect::<Vec<_>>()
            .join(" or ")
    }
}

/// Recover `a`, `b`, `c` from an equation in one variable.
///
/// `left - right` is sampled at 0, 1 and 2 and the quadratic through those points is checked
/// against further samples, so that anything which is not a polynomial of degree two or less is
/// rejected instead of being solved wrongly.
///
/// ```rust
/// use stepsolve::{expr::parse, solve::extract_coefficients};
///
/// let c = extract_coefficients(&parse("2x^2 = 3x - 1")).unwrap();
/// assert_eq!((c.a, c.b, c.c), (2.0, -3.0, 1.0));
/// assert_eq!(c.variable, "x");
///
/// assert!(extract_coefficients(&parse("x^3 + x = 0")).is_err());
/// ```
pub fn extract_coefficients(parsed: &ParsedExpression) -> Result<Coefficients, Rejection> {
    let (left, right) = single_variable_sides(parsed)?;
    let variable = parsed.variables()[0].clone();

    let f = |x: f64| -> Result<f64, Rejection> {
        let bind = [(variable.as_str(), x)];
        let y = left
            .expr
            .eval(&bind)
            .and_then(|l| right.expr.eval(&bind).map(|r| l - r))
            .map_err(|e| {
                Rejection::new(FailureKind::UnsupportedInput, "Failed to evaluate equation")
                    .details(e.to_string())
            })?;
        if y.is_finite() {
            Ok(y)
        } else {
            Err(not_polynomial(&variable))
        }
    };

    // f(0) = c, f(1) = a + b + c, f(2) = 4a + 2b + c
    let c = f(0.0)?;
    let f1 = f(1.0)?;
    let f2 = f(2.0)?;
    let a = ((f2 - f1) - (f1 - c)) / 2.0;
    let b = f1 - a - c;

    for x in [-1.0, 3.0, 0.5] {
        if !approx_eq(f(x)?, a * x * x + b * x + c) {
            return Err(not_polynomial(&variable));
        }
    }

    debug!("recovered coefficients a = {a}, b = {b}, c = {c} for {variable}");

    Ok(Coefficients { a, b, c, variable })
}

fn not_polynomial(variable: &str) -> Rejection {
    Rejection::new(FailureKind::UnsupportedInput, "Not a quadratic equation").details(format!(
        "both sides must be polynomials of degree two or less in {variable}"
    ))
}

/// Validate that `parsed` is an equation in exactly one variable.
pub(crate) fn single_variable_sides(
    parsed: &ParsedExpression,
) -> Result<(&Side, &Side), Rejection> {
    if let Some(e) = parsed.error() {
        return Err(Rejection::new(FailureKind::Parse, "Failed to parse equation").details(e));
    }

    let sides = parsed.sides().ok_or_else(|| {
        let rejection = Rejection::new(FailureKind::UnsupportedInput, "Input is not an equation");
        if parsed.kind() == Some(ExprKind::Function) {
            rejection.details("A function definition has no unknown to solve for")
        } else {
            rejection.details("Expected an equation with = sign")
        }
    })?;

    let n = parsed.variables().len();
    if n != 1 {
        return Err(
            Rejection::new(FailureKind::UnsupportedInput, "Invalid number of variables")
                .details(format!("Expected 1 variable, found {n}")),
        );
    }

    Ok(sides)
}

/// Solve a parsed quadratic equation with the quadratic formula, explaining each step.
///
/// # Example
/// ```rust
/// use stepsolve::{expr::parse, solve::{solve_quadratic, SolutionType, Solutions}};
///
/// let s = solve_quadratic(&parse("x² + 5x + 6 = 0"));
/// assert!(s.solved);
/// assert_eq!(s.discriminant, Some(1.0));
/// assert_eq!(s.solution_type, Some(SolutionType::TwoReal));
/// assert_eq!(s.solutions, Some(Solutions::Real(vec![-2.0, -3.0])));
/// assert_eq!(s.steps.len(), 4);
/// ```
pub fn solve_quadratic(parsed: &ParsedExpression) -> Solution {
    let equation = parsed.source();
    match try_solve(parsed) {
        Ok(s) => s,
        Err(rejection) => {
            debug!("quadratic solver rejected '{equation}': {rejection}");
            Solution::failed(equation, rejection)
        }
    }
}

fn try_solve(parsed: &ParsedExpression) -> Result<Solution, Rejection> {
    let coefficients = extract_coefficients(parsed)?;
    let Coefficients { a, b, c, .. } = coefficients;

    if a.abs() < EPSILON {
        return Err(
            Rejection::new(FailureKind::Solve, "Not a quadratic equation")
                .details("The coefficient of the squared term is zero or negligible."),
        );
    }

    let roots = solve_quadratic_formula(a, b, c);
    let steps = explain(&coefficients, &roots);

    Ok(Solution::quadratic(parsed.source(), coefficients, roots, steps))
}

fn explain(coefficients: &Coefficients, roots: &QuadraticRoots) -> Vec<SolutionStep> {
    let Coefficients { a, b, c, variable } = coefficients;
    let (a, b, c) = (*a, *b, *c);
    let v = variable.as_str();

    let squared = format!("{v}²");
    let standard = polynomial(&[(a, squared.as_str()), (b, v), (c, "")]);

    let (ap, bp, cp) = (operand(a), operand(b), operand(c));
    let neg_b = format_number(-b);
    let two_a = operand(2.0 * a);
    let d = roots.discriminant;

    let last = match (&roots.solutions, roots.solution_type) {
        (Solutions::Real(xs), SolutionType::TwoReal) if xs.len() == 2 => (
            "The discriminant is positive, so there are two real solutions".to_string(),
            format!(
                "{v} = ({neg_b} + √{d}) / {two_a} = {x1} or {v} = ({neg_b} - √{d}) / {two_a} = {x2}",
                d = format_number(d),
                x1 = format_number(xs[0]),
                x2 = format_number(xs[1]),
            ),
        ),
        (Solutions::Complex(_), _) => (
            "The discriminant is negative, so there are two complex solutions".to_string(),
            format!(
                "{v} = ({neg_b} ± √{d}·i) / {two_a} = {re} + {im}i or {v} = {re} - {im}i",
                d = format_number(d.abs()),
                re = format_number(-b / (2.0 * a)),
                im = format_number(((-d).sqrt() / (2.0 * a)).abs()),
            ),
        ),
        _ => (
            "The discriminant is zero, so there is one repeated real solution".to_string(),
            format!(
                "{v} = {neg_b} / {two_a} = {}",
                format_number(-b / (2.0 * a))
            ),
        ),
    };

    steps([
        (
            "Identify the standard form of a quadratic equation: ax² + bx + c = 0".to_string(),
            format!("{standard} = 0"),
        ),
        (
            format!("Apply the quadratic formula: {v} = (-b ± √(b² - 4ac)) / (2a)"),
            format!("{v} = (-{bp} ± √({bp}² - 4·{ap}·{cp})) / (2·{ap})"),
        ),
        (
            "Calculate the discriminant: b² - 4ac".to_string(),
            format!("D = {bp}² - 4·{ap}·{cp} = {}", format_number(d)),
        ),
        last,
    ])
}
