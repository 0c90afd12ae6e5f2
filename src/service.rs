//! Solving free-form problems: extraction, classification and dispatch to a solver.
use super::*;
use crate::{
    domain::{classify, Domain},
    expr::{ExprKind, ParsedExpression},
    generate::{GenerateOptions, TextGenerator},
    prompt::{solve_equation_prompt, DetailLevel, PromptContext},
    solve::{renumber, solve_linear, solve_quadratic, FailureKind, Rejection, Solution},
    steps::{extract_final_answer, parse_steps},
};
use log::{info, warn};
use serde::Serialize;

/// Generation settings for solving; a low temperature keeps the arithmetic steady.
const SOLVE_OPTIONS: GenerateOptions = GenerateOptions {
    max_new_tokens: 512,
    temperature: 0.3,
    top_p: 0.95,
};

#[derive(Debug, Clone, Default)]
pub struct SolveOptions {
    /// Ask the text generator to re-explain a symbolic solution.
    pub enhance_explanation: bool,
    /// Detail of generated explanations. Falls back to `standard` for generative solutions and
    /// `detailed` for enhancements and retries.
    pub detail_level: Option<DetailLevel>,
    /// Context for the prompt, taking precedence over the extracted expression.
    pub parsed_expression: Option<ParsedExpression>,
}

/// A solved (or failed) problem along with what was found in it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolveReport {
    pub problem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<Domain>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub expressions: Vec<ParsedExpression>,
    #[serde(flatten)]
    pub solution: Solution,
}

/// Solves problems, consulting a text generator where the symbolic solvers can not.
#[derive(Debug, Clone, Default)]
pub struct Service<G> {
    generator: G,
}

impl<G: TextGenerator> Service<G> {
    pub fn new(generator: G) -> Self {
        Self { generator }
    }

    /// Solve a problem given as free text.
    ///
    /// Algebraic equations go to the quadratic solver when a variable is squared and to the linear
    /// solver otherwise. A symbolic failure is retried with the text generator, as are word
    /// problems, other domains and text without any recognisable expression. Only a failing
    /// text generator produces an unsolved report.
    ///
    /// # Example
    /// ```rust
    /// use stepsolve::{generate::Unconfigured, Service, SolveOptions};
    ///
    /// let service = Service::new(Unconfigured);
    /// let report = service.solve_problem("Solve 3y - 5 = 10", &SolveOptions::default());
    /// assert!(report.solution.solved);
    /// assert_eq!(report.solution.result.as_deref(), Some("y = 5"));
    /// ```
    pub fn solve_problem(&self, text: &str, options: &SolveOptions) -> SolveReport {
        match self.try_solve(text, options) {
            Ok(report) => report,
            Err(e) => {
                warn!("solving '{text}' failed: {e}");
                let mut rejection = Rejection::new(
                    FailureKind::Upstream,
                    format!("Failed to solve problem: {e}"),
                );
                let causes = e.chain().skip(1).map(|c| c.to_string()).collect::<Vec<_>>();
                if !causes.is_empty() {
                    rejection = rejection.details(causes.join(": "));
                }
                SolveReport {
                    problem: text.to_string(),
                    domain: None,
                    expressions: Vec::new(),
                    solution: Solution::failed(text, rejection),
                }
            }
        }
    }

    fn try_solve(&self, text: &str, options: &SolveOptions) -> Result<SolveReport> {
        let expressions = crate::extract(text);

        let Some(primary) = expressions.first() else {
            info!("no expression found, solving with the text generator");
            let context = PromptContext {
                parsed: options.parsed_expression.as_ref(),
                ..Default::default()
            };
            let detail = options.detail_level.unwrap_or_default();
            return Ok(SolveReport {
                problem: text.to_string(),
                domain: None,
                expressions: Vec::new(),
                solution: self.generative(text, detail, &context)?,
            });
        };

        let domain = classify(text, Some(primary));
        info!(
            "'{}' classified as {domain} {}",
            primary.source(),
            primary.kind().map(|k| k.to_string()).unwrap_or_default()
        );

        let detail = options.detail_level.unwrap_or_default();
        let solution = match (domain, primary.kind()) {
            (Domain::Algebra, Some(ExprKind::Equation)) => self.solve_equation(primary, options)?,
            (Domain::Algebra, Some(ExprKind::WordProblem)) => {
                let context = PromptContext {
                    parsed: options.parsed_expression.as_ref(),
                    problem_type: Some(ExprKind::WordProblem),
                    ..Default::default()
                };
                self.generative(text, detail, &context)?
            }
            _ => {
                let context = PromptContext {
                    parsed: options.parsed_expression.as_ref().or(Some(primary)),
                    ..Default::default()
                };
                self.generative(text, detail, &context)?
            }
        };

        Ok(SolveReport {
            problem: text.to_string(),
            domain: Some(domain),
            expressions,
            solution,
        })
    }

    fn solve_equation(
        &self,
        equation: &ParsedExpression,
        options: &SolveOptions,
    ) -> Result<Solution> {
        let mut solution = if equation.has_squared_term() {
            info!("solving '{}' as a quadratic", equation.source());
            solve_quadratic(equation)
        } else {
            info!("solving '{}' as a linear equation", equation.source());
            solve_linear(equation.source())
        };

        if !solution.solved {
            warn!(
                "symbolic solver gave up on '{}' ({}), retrying with the text generator",
                equation.source(),
                solution.error.as_deref().unwrap_or_default()
            );
            let context = PromptContext {
                parsed: options.parsed_expression.as_ref(),
                ..Default::default()
            };
            return self.generative(equation.source(), DetailLevel::Detailed, &context);
        }

        if options.enhance_explanation {
            let context = PromptContext {
                parsed: Some(equation),
                base_steps: &solution.steps,
                ..Default::default()
            };
            let detail = options.detail_level.unwrap_or(DetailLevel::Detailed);
            let prompt = solve_equation_prompt(equation.source(), detail, &context);

            // the symbolic steps stay if the explanation can not be had
            match self.generator.generate(&prompt, &SOLVE_OPTIONS) {
                Ok(raw) => {
                    let steps = parse_steps(&raw);
                    if steps.is_empty() {
                        warn!("generated explanation has no steps, keeping the symbolic steps");
                    } else {
                        solution.steps = renumber(steps);
                    }
                }
                Err(e) => warn!("could not enhance the explanation: {e}"),
            }
        }

        Ok(solution)
    }

    fn generative(
        &self,
        problem: &str,
        detail: DetailLevel,
        context: &PromptContext,
    ) -> Result<Solution> {
        let prompt = solve_equation_prompt(problem, detail, context);
        let raw = self.generator.generate(&prompt, &SOLVE_OPTIONS)?;
        Ok(Solution::generated(
            problem,
            parse_steps(&raw),
            extract_final_answer(&raw),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parse;
    use crate::generate::{from_fn, CannedGenerator, Unconfigured, CANNED_RESPONSE};
    use crate::solve::{Method, SolutionType, Solutions};
    use std::cell::RefCell;

    fn solve(text: &str) -> SolveReport {
        Service::new(Unconfigured).solve_problem(text, &SolveOptions::default())
    }

    /// Replies with `reply`, keeping every prompt it was given.
    fn recording<'a>(
        prompts: &'a RefCell<Vec<String>>,
        reply: &'a str,
    ) -> impl TextGenerator + 'a {
        from_fn(move |prompt: &str, options: &GenerateOptions| {
            assert_eq!(options, &SOLVE_OPTIONS);
            prompts.borrow_mut().push(prompt.to_string());
            Ok(reply.to_string())
        })
    }

    #[test]
    fn linear_equation_in_prose() {
        let r = solve("What is x if 2x + 3 = 7?");
        assert_eq!(r.domain, Some(Domain::Algebra));
        assert_eq!(r.expressions.len(), 1);
        assert!(r.solution.solved);
        assert_eq!(r.solution.method, Some(Method::Linear));
        assert_eq!(r.solution.solutions, Some(Solutions::Single(2.0)));
        assert_eq!(r.solution.steps.len(), 4);
    }

    #[test]
    fn squared_variable_goes_to_the_quadratic_solver() {
        let r = solve("Solve x² + 5x + 6 = 0");
        assert_eq!(r.solution.method, Some(Method::Quadratic));
        assert_eq!(r.solution.discriminant, Some(1.0));
        assert_eq!(r.solution.solution_type, Some(SolutionType::TwoReal));
        assert_eq!(r.solution.solutions, Some(Solutions::Real(vec![-2.0, -3.0])));

        let r = solve("x^2 + 1 = 0");
        assert_eq!(r.solution.discriminant, Some(-4.0));
        match r.solution.solutions {
            Some(Solutions::Complex(roots)) => assert!(roots.iter().all(|z| z.contains('i'))),
            other => panic!("expected complex roots, got {other:?}"),
        }
    }

    #[test]
    fn symbolic_failure_falls_back_to_a_detailed_generative_solution() {
        let prompts = RefCell::new(Vec::new());
        let service = Service::new(recording(&prompts, CANNED_RESPONSE));
        let r = service.solve_problem("Solve 2x + 3y = 10", &SolveOptions::default());

        assert!(r.solution.solved);
        assert_eq!(r.solution.method, Some(Method::Generative));
        assert_eq!(r.solution.equation, "2x + 3y = 10");
        assert_eq!(r.solution.result.as_deref(), Some("x = 2"));
        assert_eq!(r.solution.steps.len(), 3);

        let prompts = prompts.borrow();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Problem: 2x + 3y = 10"));
        assert!(prompts[0].contains("very detailed solution"));
    }

    #[test]
    fn prices_do_not_hide_the_equation() {
        let r = solve("It costs $5 and $10; solve 2x = 4");
        assert_eq!(r.expressions.len(), 1);
        assert_eq!(r.solution.method, Some(Method::Linear));
        assert_eq!(r.solution.solutions, Some(Solutions::Single(2.0)));
    }

    #[test]
    fn function_definitions_are_explained_generatively() {
        let prompts = RefCell::new(Vec::new());
        let service = Service::new(recording(&prompts, CANNED_RESPONSE));
        let text = "Let f(x) = x^2 + 3x. What is f(2)?";
        let r = service.solve_problem(text, &SolveOptions::default());

        assert_eq!(r.expressions[0].kind(), Some(ExprKind::Function));
        assert_eq!(r.solution.method, Some(Method::Generative));
        let prompt = &prompts.borrow()[0];
        assert!(prompt.contains("Parsed as: f(x) = x^2 + 3x\nType: function\nVariables: x"));
    }

    #[test]
    fn generator_failure_is_an_upstream_failure() {
        let r = solve("Solve 2x + 3y = 10");
        assert!(!r.solution.solved);
        assert_eq!(r.solution.failure, Some(FailureKind::Upstream));
        assert_eq!(
            r.solution.error.as_deref(),
            Some("Failed to solve problem: no text generator configured")
        );
        assert_eq!(r.problem, "Solve 2x + 3y = 10");
        assert_eq!(r.domain, None);
        assert!(r.expressions.is_empty());
        assert!(r.solution.steps.is_empty());
    }

    #[test]
    fn enhancement_replaces_steps_but_not_the_answer() {
        let prompts = RefCell::new(Vec::new());
        // the generator gets the arithmetic wrong
        let reply = "Step 1: Subtract 3\n2x = 4\n\nStep 7: Halve\nx = 3\n\nFinal Answer: x = 3";
        let service = Service::new(recording(&prompts, reply));
        let options = SolveOptions {
            enhance_explanation: true,
            ..Default::default()
        };
        let r = service.solve_problem("2x + 3 = 7", &options);

        assert_eq!(r.solution.method, Some(Method::Linear));
        assert_eq!(r.solution.solutions, Some(Solutions::Single(2.0)));
        assert_eq!(r.solution.result.as_deref(), Some("x = 2"));
        let indices = r.solution.steps.iter().map(|s| s.index).collect::<Vec<_>>();
        assert_eq!(indices, [1, 2]);
        assert_eq!(r.solution.steps[1].explanation, "Halve");

        let prompt = &prompts.borrow()[0];
        assert!(prompt.contains("Step 1: Start with the original equation\n2x + 3 = 7"));
        assert!(prompt.contains("Parsed as: 2x + 3 = 7"));
    }

    #[test]
    fn unusable_enhancements_keep_the_symbolic_steps() {
        let options = SolveOptions {
            enhance_explanation: true,
            ..Default::default()
        };
        let symbolic = solve("2x + 3 = 7").solution.steps;

        let prompts = RefCell::new(Vec::new());
        let r = Service::new(recording(&prompts, "I think it is 2."))
            .solve_problem("2x + 3 = 7", &options);
        assert_eq!(r.solution.steps, symbolic);

        let r = Service::new(Unconfigured).solve_problem("2x + 3 = 7", &options);
        assert!(r.solution.solved);
        assert_eq!(r.solution.steps, symbolic);
    }

    #[test]
    fn word_problems_are_hinted() {
        let prompts = RefCell::new(Vec::new());
        let service = Service::new(recording(&prompts, CANNED_RESPONSE));
        let text = "Find the value of n when three times n is twelve";
        let r = service.solve_problem(text, &SolveOptions::default());

        assert_eq!(r.domain, Some(Domain::Algebra));
        assert_eq!(r.expressions[0].kind(), Some(ExprKind::WordProblem));
        assert_eq!(r.solution.method, Some(Method::Generative));
        assert!(prompts.borrow()[0].contains("This is a word problem"));
        assert!(prompts.borrow()[0].contains("balances detail with clarity"));
    }

    #[test]
    fn other_domains_carry_the_parsed_expression() {
        let prompts = RefCell::new(Vec::new());
        let service = Service::new(recording(&prompts, CANNED_RESPONSE));
        let text = "What is the integral of `x^2 + 1`?";
        let r = service.solve_problem(text, &SolveOptions::default());
        assert_eq!(r.domain, Some(Domain::Calculus));
        assert!(prompts.borrow()[0].contains("Parsed as: x^2 + 1\nType: expression"));

        // a caller supplied expression wins
        let options = SolveOptions {
            parsed_expression: Some(parse("y = 3")),
            detail_level: Some(DetailLevel::Basic),
            ..Default::default()
        };
        service.solve_problem(text, &options);
        assert!(prompts.borrow()[1].contains("Parsed as: y = 3"));
        assert!(prompts.borrow()[1].contains("minimal steps"));
    }

    #[test]
    fn text_without_math_is_solved_generatively() {
        let r = Service::new(CannedGenerator)
            .solve_problem("Tell me a story", &SolveOptions::default());
        assert_eq!(r.domain, None);
        assert!(r.expressions.is_empty());
        assert_eq!(r.solution.method, Some(Method::Generative));
        assert_eq!(r.solution.equation, "Tell me a story");
    }

    #[test]
    fn generated_steps_are_contiguous() {
        let prompts = RefCell::new(Vec::new());
        let reply = "Step 2: a\n1\nStep 2: b\n2\nStep 9: c\n3";
        let r = Service::new(recording(&prompts, reply))
            .solve_problem("Tell me a story", &SolveOptions::default());
        let indices = r.solution.steps.iter().map(|s| s.index).collect::<Vec<_>>();
        assert_eq!(indices, [1, 2, 3]);
        assert_eq!(r.solution.result.as_deref(), Some("No final answer provided"));
    }

    #[test]
    fn report_serialisation() {
        let v = serde_json::to_value(solve("Solve 3y - 5 = 10")).unwrap();
        assert_eq!(v["problem"], "Solve 3y - 5 = 10");
        assert_eq!(v["domain"], "algebra");
        assert_eq!(v["expressions"][0]["source"], "3y - 5 = 10");
        assert_eq!(v["solved"], true);
        assert_eq!(v["equation"], "3y - 5 = 10");
        assert_eq!(v["solutions"], 5.0);
        assert_eq!(v["steps"][3]["expression"], "y = 15 / 3 = 5");

        let v = serde_json::to_value(solve("Solve 2x + 3y = 10")).unwrap();
        assert_eq!(v["solved"], false);
        assert_eq!(v["failure"], "upstream");
        assert!(v.get("domain").is_none());
        assert!(v.get("expressions").is_none());
    }
}
