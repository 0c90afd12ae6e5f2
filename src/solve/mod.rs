//! Symbolic solvers and the solution shape shared by every solving method.

use serde::Serialize;
use std::fmt;

pub mod linear;
pub mod quadratic;

pub use linear::solve_linear;
pub use quadratic::{extract_coefficients, solve_quadratic, solve_quadratic_formula};

/// Coefficients below this magnitude are treated as zero.
pub const EPSILON: f64 = 1e-10;

/// Why a solve did not succeed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The expression or equation text is malformed.
    Parse,
    /// Well formed, but not something the solver handles (variable count, degree, several `=`).
    UnsupportedInput,
    /// Degenerate coefficients.
    Solve,
    /// The text generator failed or timed out.
    Upstream,
}

/// Which solver produced a solution.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    Linear,
    Quadratic,
    Generative,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Method::Linear => "linear",
            Method::Quadratic => "quadratic",
            Method::Generative => "generative",
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SolutionType {
    TwoReal,
    OneReal,
    Complex,
}

/// The numeric answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Solutions {
    /// The root of a linear equation.
    Single(f64),
    /// Real roots of a quadratic, one or two.
    Real(Vec<f64>),
    /// A complex conjugate pair, formatted as `re + imi` and `re - imi`.
    Complex([String; 2]),
}

/// `a·x² + b·x + c = 0`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coefficients {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub variable: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolutionStep {
    /// 1-based position.
    pub index: usize,
    pub explanation: String,
    pub expression: String,
}

/// The outcome of a solve.
///
/// Built through the constructors, so that a solution is either fully solved or a well-formed
/// failure with no steps or numbers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Solution {
    pub solved: bool,
    /// The equation or problem text that was solved.
    pub equation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<Method>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solutions: Option<Solutions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solution_type: Option<SolutionType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coefficients: Option<Coefficients>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discriminant: Option<f64>,
    pub steps: Vec<SolutionStep>,
    /// Display form of the answer, such as `x = 2`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// A solver declining its input. Converted into a failed [`Solution`] at the solver boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub kind: FailureKind,
    pub error: String,
    pub details: Option<String>,
}

impl Rejection {
    pub fn new(kind: FailureKind, error: impl Into<String>) -> Self {
        Self {
            kind,
            error: error.into(),
            details: None,
        }
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.error)?;
        if let Some(d) = &self.details {
            write!(f, ": {d}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Rejection {}

impl Solution {
    fn solved(equation: &str, method: Method, steps: Vec<SolutionStep>, result: String) -> Self {
        debug_assert!(steps.iter().enumerate().all(|(i, s)| s.index == i + 1));

        Self {
            solved: true,
            equation: equation.to_string(),
            method: Some(method),
            variable: None,
            solutions: None,
            solution_type: None,
            coefficients: None,
            discriminant: None,
            steps,
            result: Some(result),
            error: None,
            failure: None,
            details: None,
        }
    }

    /// A solution to a linear equation.
    pub fn linear(equation: &str, variable: &str, x: f64, steps: Vec<SolutionStep>) -> Self {
        Self {
            variable: Some(variable.to_string()),
            solutions: Some(Solutions::Single(x)),
            ..Self::solved(
                equation,
                Method::Linear,
                steps,
                format!("{variable} = {}", format_number(x)),
            )
        }
    }

    /// A solution to a quadratic equation.
    pub fn quadratic(
        equation: &str,
        coefficients: Coefficients,
        roots: quadratic::QuadraticRoots,
        steps: Vec<SolutionStep>,
    ) -> Self {
        let result = roots.describe(&coefficients.variable);
        Self {
            variable: Some(coefficients.variable.clone()),
            solutions: Some(roots.solutions),
            solution_type: Some(roots.solution_type),
            discriminant: Some(roots.discriminant),
            coefficients: Some(coefficients),
            ..Self::solved(equation, Method::Quadratic, steps, result)
        }
    }

    /// A solution produced by the text generator. Steps are renumbered to be contiguous.
    pub fn generated(problem: &str, steps: Vec<SolutionStep>, answer: String) -> Self {
        Self::solved(problem, Method::Generative, renumber(steps), answer)
    }

    pub fn failed(equation: &str, rejection: Rejection) -> Self {
        let Rejection {
            kind,
            error,
            details,
        } = rejection;

        Self {
            solved: false,
            equation: equation.to_string(),
            method: None,
            variable: None,
            solutions: None,
            solution_type: None,
            coefficients: None,
            discriminant: None,
            steps: Vec::new(),
            result: None,
            error: Some(error),
            failure: Some(kind),
            details,
        }
    }
}

/// Build steps from `(explanation, expression)` pairs, numbering from 1.
pub fn steps<I, E, X>(items: I) -> Vec<SolutionStep>
where
    I: IntoIterator<Item = (E, X)>,
    E: Into<String>,
    X: Into<String>,
{
    items
        .into_iter()
        .enumerate()
        .map(|(i, (explanation, expression))| SolutionStep {
            index: i + 1,
            explanation: explanation.into(),
            expression: expression.into(),
        })
        .collect()
}

/// Reassign indices so that `steps[i].index == i + 1`.
pub fn renumber(steps: Vec<SolutionStep>) -> Vec<SolutionStep> {
    steps
        .into_iter()
        .enumerate()
        .map(|(i, step)| SolutionStep {
            index: i + 1,
            ..step
        })
        .collect()
}

/// Significant digits shown by [`format_number`].
const SIGNIFICANT_DIGITS: i32 = 6;

/// Format a number for display: six significant digits, without trailing zeros.
///
/// Only zero itself is written as `0`; small magnitudes keep their leading digits.
///
/// ```rust
/// use stepsolve::solve::format_number;
///
/// assert_eq!(format_number(2.0), "2");
/// assert_eq!(format_number(-0.5), "-0.5");
/// assert_eq!(format_number(1.0 / 3.0), "0.333333");
/// assert_eq!(format_number(-0.0001), "-0.0001");
/// assert_eq!(format_number(-0.0), "0");
/// ```
pub fn format_number(x: f64) -> String {
    if !x.is_finite() {
        return x.to_string();
    }
    if x == 0.0 {
        return "0".to_string();
    }

    let magnitude = x.abs().log10().floor() as i32;
    let decimals = (SIGNIFICANT_DIGITS - 1 - magnitude).max(0) as usize;
    let s = format!("{x:.decimals$}");
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}

/// A number in parentheses when negative, for substitution into a formula.
pub(crate) fn operand(x: f64) -> String {
    let s = format_number(x);
    if s.starts_with('-') {
        format!("({s})")
    } else {
        s
    }
}

/// `coefficient · variable` written as a term: `x`, `-x`, `2x`, `0.5y`.
pub(crate) fn term(coefficient: f64, variable: &str) -> String {
    match format_number(coefficient).as_str() {
        "1" => variable.to_string(),
        "-1" => format!("-{variable}"),
        c => format!("{c}{variable}"),
    }
}

/// Join terms into a polynomial, dropping zero terms and folding signs: `x² - 3x + 2`.
pub(crate) fn polynomial(terms: &[(f64, &str)]) -> String {
    let mut out = String::new();
    for &(coefficient, suffix) in terms {
        if coefficient.abs() < EPSILON {
            continue;
        }

        let magnitude = if suffix.is_empty() {
            format_number(coefficient.abs())
        } else {
            term(coefficient.abs(), suffix)
        };

        match (out.is_empty(), coefficient < 0.0) {
            (true, false) => out.push_str(&magnitude),
            (true, true) => {
                out.push('-');
                out.push_str(&magnitude);
            }
            (false, false) => {
                out.push_str(" + ");
                out.push_str(&magnitude);
            }
            (false, true) => {
                out.push_str(" - ");
                out.push_str(&magnitude);
            }
        }
    }

    if out.is_empty() {
        out.push('0');
    }
    out
}

/// Are `x` and `y` equal up to a tolerance relative to their magnitude?
pub(crate) fn approx_eq(x: f64, y: f64) -> bool {
    (x - y).abs() <= 1e-9 * x.abs().max(y.abs()).max(1.0)
}
