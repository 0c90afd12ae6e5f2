use super::*;
use crate::expr::{parse, Expr};
use log::debug;

/// Solve a linear equation in one variable, explaining each step.
///
/// The left side is evaluated with the variable bound to 1 and 0, which gives the variable's
/// coefficient and the constant term. The right side gives the value to solve for; a variable
/// term on the right is moved across to the left.
///
/// # Example
/// ```rust
/// use stepsolve::solve::{solve_linear, Solutions};
///
/// let s = solve_linear("2x + 3 = 7");
/// assert!(s.solved);
/// assert_eq!(s.variable.as_deref(), Some("x"));
/// assert_eq!(s.solutions, Some(Solutions::Single(2.0)));
/// assert_eq!(s.steps.last().unwrap().expression, "x = 4 / 2 = 2");
///
/// let s = solve_linear("2x + 3y = 10");
/// assert!(!s.solved);
/// assert_eq!(s.details.as_deref(), Some("Expected 1 variable, found 2"));
/// ```
pub fn solve_linear(equation: &str) -> Solution {
    match try_solve(equation) {
        Ok(s) => s,
        Err(rejection) => {
            debug!("linear solver rejected '{equation}': {rejection}");
            Solution::failed(equation, rejection)
        }
    }
}

fn try_solve(equation: &str) -> Result<Solution, Rejection> {
    if equation.matches('=').count() > 1 {
        return Err(
            Rejection::new(FailureKind::UnsupportedInput, "Invalid equation format")
                .details("Expected exactly one = sign"),
        );
    }

    let parsed = parse(equation);
    let (left, right) = quadratic::single_variable_sides(&parsed)?;
    let variable = parsed.variables()[0].as_str();

    let at = |e: &Expr, x: f64| -> Result<f64, Rejection> {
        let y = e.eval(&[(variable, x)]).map_err(|e| {
            Rejection::new(FailureKind::UnsupportedInput, "Failed to evaluate equation")
                .details(e.to_string())
        })?;
        if y.is_finite() {
            Ok(y)
        } else {
            Err(not_linear(variable))
        }
    };

    // a·x + b = c, with any variable term on the right folded into a
    let b = at(&left.expr, 0.0)?;
    let left_slope = at(&left.expr, 1.0)? - b;
    let c = at(&right.expr, 0.0)?;
    let right_slope = at(&right.expr, 1.0)? - c;
    let a = left_slope - right_slope;

    for x in [2.0, -1.5] {
        let y = at(&left.expr, x)? - at(&right.expr, x)?;
        if !approx_eq(y, a * x + b - c) {
            return Err(not_linear(variable));
        }
    }

    if a.abs() < EPSILON {
        let details = if approx_eq(b, c) {
            format!("The equation is an identity: every value of {variable} satisfies it")
        } else {
            format!("The equation is a contradiction: no value of {variable} satisfies it")
        };
        return Err(Rejection::new(FailureKind::Solve, "No unique solution").details(details));
    }

    let rhs = c - b;
    let x = rhs / a;
    debug!("{variable}: a = {a}, b = {b}, c = {c}, solution {x}");

    let ax = term(a, variable);
    let moved = if b.abs() < EPSILON {
        format_number(c)
    } else if b < 0.0 {
        format!("{} + {}", format_number(c), format_number(-b))
    } else {
        format!("{} - {}", format_number(c), format_number(b))
    };

    let steps = steps([
        (
            "Start with the original equation".to_string(),
            format!("{} = {}", left.text, right.text),
        ),
        (
            format!(
                "Move all terms with {variable} to the left side and all other terms to the right side"
            ),
            format!("{ax} = {moved}"),
        ),
        (
            "Simplify the right side".to_string(),
            format!("{ax} = {}", format_number(rhs)),
        ),
        (
            format!("Divide both sides by {}", format_number(a)),
            format!(
                "{variable} = {} / {} = {}",
                format_number(rhs),
                operand(a),
                format_number(x)
            ),
        ),
    ]);

    Ok(Solution::linear(equation, variable, x, steps))
}

fn not_linear(variable: &str) -> Rejection {
    Rejection::new(FailureKind::UnsupportedInput, "Not a linear equation")
        .details(format!("both sides must be linear in {variable}"))
}
