//! Keyword classification of problem text into a mathematical domain.

use crate::expr::{ExprKind, ParsedExpression};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Domain {
    Algebra,
    Calculus,
    LinearAlgebra,
    Statistics,
}

const CALCULUS: &[&str] = &["derivative", "integral", "differentiate", "rate of change"];
const LINEAR_ALGEBRA: &[&str] = &["matrix", "vector", "eigenvalue", "linear system"];
const STATISTICS: &[&str] = &[
    "probability",
    "statistics",
    "distribution",
    "average",
    "standard deviation",
];

/// Classify the problem text, consulting the primary expression only when no keyword matches.
///
/// Categories are checked in a fixed order and the first match wins.
pub fn classify(text: &str, primary: Option<&ParsedExpression>) -> Domain {
    let text = text.to_lowercase();
    let mentions = |cues: &[&str]| cues.iter().any(|cue| text.contains(cue));

    if mentions(CALCULUS) {
        Domain::Calculus
    } else if mentions(LINEAR_ALGEBRA) {
        Domain::LinearAlgebra
    } else if mentions(STATISTICS) {
        Domain::Statistics
    } else if matches!(
        primary.and_then(ParsedExpression::kind),
        Some(ExprKind::Derivative | ExprKind::Integral)
    ) {
        Domain::Calculus
    } else {
        Domain::Algebra
    }
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Algebra => "algebra",
            Domain::Calculus => "calculus",
            Domain::LinearAlgebra => "linearAlgebra",
            Domain::Statistics => "statistics",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parse;

    #[test]
    fn keyword_categories() {
        let cases = [
            ("Find the derivative of f(x) = x^2 + 3x", Domain::Calculus),
            ("What is the RATE OF CHANGE of speed?", Domain::Calculus),
            ("Compute the eigenvalue of this matrix", Domain::LinearAlgebra),
            (
                "Calculate the probability of getting heads twice in a row",
                Domain::Statistics,
            ),
            ("Solve 2x + 3 = 7", Domain::Algebra),
        ];

        for (text, domain) in cases {
            assert_eq!(classify(text, None), domain, "{text}");
        }
    }

    #[test]
    fn first_category_wins() {
        // calculus is checked before statistics
        let text = "the average value of the integral";
        assert_eq!(classify(text, None), Domain::Calculus);
    }

    #[test]
    fn expression_kind_is_consulted_last() {
        let d = parse("derivative(x^3, x)");
        assert_eq!(classify("what about this one", Some(&d)), Domain::Calculus);
        assert_eq!(
            classify("the average of it", Some(&d)),
            Domain::Statistics
        );

        let eq = parse("2x = 4");
        assert_eq!(classify("2x = 4", Some(&eq)), Domain::Algebra);
    }

    #[test]
    fn serialised_tags() {
        assert_eq!(
            serde_json::to_value(Domain::LinearAlgebra).unwrap(),
            "linearAlgebra"
        );
        assert_eq!(Domain::Statistics.to_string(), "statistics");
    }
}
