use super::*;
use meval::tokenizer::{Operation, Token};
use serde::{Serialize, Serializer};

/*** A note on the implementation ***
 *
 * `meval` only accepts explicit operators and ASCII syntax, whereas problem text is full of `2x`,
 * `x²` and `3(x + 1)`. The surface text is first normalised into something `meval` accepts, then
 * its RPN token stream is folded into an `Expr` tree with a stack.
 *
 * Normalising is also where prose is told apart from maths. A known function written without
 * parentheses (`sin x`) gets them, while an unknown word next to an operand (`5 and`) is an error
 * rather than an implicit product.
 */

/// Trees nested deeper than this are rejected.
const MAX_DEPTH: usize = 512;

/// What a piece of text was recognised as.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExprKind {
    Expression,
    Equation,
    /// A function definition such as `f(x) = x^2 + 3x`.
    Function,
    Derivative,
    Integral,
    /// Free text to be interpreted as a whole. Never produced by [`parse`].
    WordProblem,
}

impl fmt::Display for ExprKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            ExprKind::Expression => "expression",
            ExprKind::Equation => "equation",
            ExprKind::Function => "function",
            ExprKind::Derivative => "derivative",
            ExprKind::Integral => "integral",
            ExprKind::WordProblem => "word_problem",
        })
    }
}

/// One side of an equation.
#[derive(Debug, Clone, PartialEq)]
pub struct Side {
    /// The raw text, trimmed.
    pub text: String,
    pub expr: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Expression(Expr),
    Equation { left: Side, right: Side },
    Function {
        name: String,
        params: Vec<String>,
        definition: Side,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum State {
    Parsed {
        kind: ExprKind,
        variables: Vec<String>,
        body: Body,
    },
    WordProblem,
    Failed {
        error: String,
    },
}

/// The result of [`parse`]: either a fully analysed expression or the reason parsing failed.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedExpression {
    source: String,
    state: State,
}

/// Parse an expression or an equation.
///
/// Never fails outright: malformed input is reported through [`ParsedExpression::error`].
///
/// # Example
/// ```rust
/// use stepsolve::expr::{parse, ExprKind};
///
/// let p = stepsolve::expr::parse("x² + 5x + 6 = 0");
/// assert!(p.is_parsed());
/// assert_eq!(p.kind(), Some(ExprKind::Equation));
/// assert_eq!(p.variables(), &["x".to_string()]);
/// assert!(p.has_squared_term());
///
/// let p = parse("2x + (3");
/// assert!(!p.is_parsed());
/// assert!(p.error().is_some());
/// ```
pub fn parse(text: &str) -> ParsedExpression {
    let state = match parse_body(text) {
        Ok(body) => {
            let kind = kind_of(&body);
            let variables = body.variables();
            State::Parsed {
                kind,
                variables,
                body,
            }
        }
        Err(e) => State::Failed {
            error: e
                .chain()
                .map(|cause| cause.to_string())
                .collect::<Vec<_>>()
                .join(": "),
        },
    };

    ParsedExpression {
        source: text.to_string(),
        state,
    }
}

fn parse_body(text: &str) -> Result<Body> {
    let sides = text.split('=').collect::<Vec<_>>();
    match sides.as_slice() {
        [single] => parse_tree(single).map(Body::Expression),
        [left, right] => {
            if let Some((name, params)) = definition_head(left) {
                let definition = parse_side(right).wrap_err("function definition")?;
                return Ok(Body::Function {
                    name,
                    params,
                    definition,
                });
            }
            let left = parse_side(left).wrap_err("left side of equation")?;
            let right = parse_side(right).wrap_err("right side of equation")?;
            Ok(Body::Equation { left, right })
        }
        _ => bail!("expected exactly one =, found {}", sides.len() - 1),
    }
}

fn parse_side(text: &str) -> Result<Side> {
    Ok(Side {
        text: text.trim().to_string(),
        expr: parse_tree(text)?,
    })
}

/// `f(x)` or `g(s, t)`, naming a function and its distinct parameters.
fn definition_head(text: &str) -> Option<(String, Vec<String>)> {
    let lexemes = lex(text);
    let [Lexeme::Ident(name), Lexeme::Punct('('), inner @ .., Lexeme::Punct(')')] =
        lexemes.as_slice()
    else {
        return None;
    };
    if is_reserved(name) || inner.len() % 2 == 0 {
        return None;
    }

    let mut params = Vec::new();
    for (i, lexeme) in inner.iter().enumerate() {
        match (i % 2, lexeme) {
            (0, Lexeme::Ident(p)) if !is_reserved(p) && p != name && !params.contains(p) => {
                params.push(*p)
            }
            (1, Lexeme::Punct(',')) => (),
            _ => return None,
        }
    }

    Some((
        name.to_string(),
        params.into_iter().map(String::from).collect(),
    ))
}

fn kind_of(body: &Body) -> ExprKind {
    match body {
        Body::Equation { .. } => ExprKind::Equation,
        Body::Function { .. } => ExprKind::Function,
        Body::Expression(Expr::Call { name, .. }) => match name.as_str() {
            "derivative" | "diff" => ExprKind::Derivative,
            "integrate" | "integral" => ExprKind::Integral,
            _ => ExprKind::Expression,
        },
        Body::Expression(_) => ExprKind::Expression,
    }
}

/// Parse a single expression (no `=`) into a tree.
pub(crate) fn parse_tree(text: &str) -> Result<Expr> {
    let normalised =
        normalise(text).wrap_err_with(|| format!("parsing '{}' failed", text.trim()))?;
    ensure!(!normalised.is_empty(), "empty expression");

    let rpn = normalised
        .parse::<meval::Expr>()
        .into_diagnostic()
        .wrap_err_with(|| format!("parsing '{}' failed", text.trim()))?;

    fold_rpn(&rpn).wrap_err_with(|| format!("parsing '{}' failed", text.trim()))
}

fn fold_rpn(rpn: &[Token]) -> Result<Expr> {
    // each entry carries the depth of its tree
    fn pop(stack: &mut Vec<(Expr, usize)>) -> Result<(Expr, usize)> {
        stack.pop().ok_or_else(|| miette!("operator is missing an operand"))
    }

    let mut stack = Vec::new();

    for token in rpn {
        let (node, depth) = match token {
            Token::Number(x) => (Expr::Constant(*x), 1),
            Token::Var(name) => (Expr::Symbol(name.clone()), 1),
            Token::Unary(op @ (Operation::Minus | Operation::Plus)) => {
                let (operand, depth) = pop(&mut stack)?;
                let op = match op {
                    Operation::Minus => UnaryOp::Neg,
                    _ => UnaryOp::Plus,
                };
                (Expr::unary(op, operand), depth + 1)
            }
            Token::Unary(op) => bail!("unsupported unary operator {:?}", op),
            Token::Binary(op) => {
                let (rhs, r) = pop(&mut stack)?;
                let (lhs, l) = pop(&mut stack)?;
                (Expr::binary(binary_op(op)?, lhs, rhs), l.max(r) + 1)
            }
            Token::Func(name, Some(n)) => {
                ensure!(
                    stack.len() >= *n,
                    "function '{}' is missing arguments",
                    name
                );
                let (args, depths): (Vec<_>, Vec<_>) =
                    stack.split_off(stack.len() - n).into_iter().unzip();
                let node = Expr::Call {
                    name: name.clone(),
                    args,
                };
                (node, depths.into_iter().max().unwrap_or(0) + 1)
            }
            other => bail!("unexpected token {:?}", other),
        };
        ensure!(
            depth <= MAX_DEPTH,
            "expression is nested more than {} levels deep",
            MAX_DEPTH
        );
        stack.push((node, depth));
    }

    ensure!(stack.len() == 1, "malformed expression");
    pop(&mut stack).map(|(expr, _)| expr)
}

fn binary_op(op: &Operation) -> Result<BinaryOp> {
    let op = match op {
        Operation::Plus => BinaryOp::Add,
        Operation::Minus => BinaryOp::Sub,
        Operation::Times => BinaryOp::Mul,
        Operation::Div => BinaryOp::Div,
        Operation::Rem => BinaryOp::Rem,
        Operation::Pow => BinaryOp::Pow,
        other => bail!("unsupported binary operator {:?}", other),
    };
    Ok(op)
}

#[derive(Debug, Copy, Clone, PartialEq)]
enum Lexeme<'a> {
    Number(&'a str),
    Ident(&'a str),
    Punct(char),
}

impl Lexeme<'_> {
    fn ends_operand(&self) -> bool {
        matches!(self, Lexeme::Number(_) | Lexeme::Ident(_) | Lexeme::Punct(')'))
    }

    fn starts_operand(&self) -> bool {
        matches!(self, Lexeme::Number(_) | Lexeme::Ident(_) | Lexeme::Punct('('))
    }

    fn is_atom(&self) -> bool {
        matches!(self, Lexeme::Number(_) | Lexeme::Ident(_))
    }

    fn is_function(&self) -> bool {
        matches!(self, Lexeme::Ident(f) if FUNCTIONS.contains(f))
    }

    /// A name of several letters that is neither a function nor a constant, most likely prose.
    fn word(&self) -> Option<&str> {
        match self {
            Lexeme::Ident(w)
                if w.len() > 1 && w.chars().all(|c| c.is_ascii_alphabetic()) && !is_reserved(w) =>
            {
                Some(*w)
            }
            _ => None,
        }
    }
}

/// Rewrite surface notation into explicit ASCII operators.
///
/// `x²` becomes `x^2`, and juxtaposed operands (`2x`, `3(x + 1)`, `(x - 1)(x + 1)`) gain an
/// explicit `*`. A name of two or more letters followed by `(` is a function call, while a single
/// letter is a variable being multiplied, so `x(x + 1)` is `x * (x + 1)`. Known functions take a
/// bare argument too: `sqrt x + 1` is `sqrt(x) + 1` and `sin 2x` is `sin(2x)`.
///
/// Fails when an unknown word stands next to an operand, as in `5 and`.
pub(crate) fn normalise(text: &str) -> Result<String> {
    let mut ascii = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '²' => ascii.push_str("^2"),
            '³' => ascii.push_str("^3"),
            '×' | '·' | '⋅' | '∗' => ascii.push('*'),
            '÷' | '∕' => ascii.push('/'),
            '−' | '–' => ascii.push('-'),
            c => ascii.push(c),
        }
    }

    let lexemes = bracket_bare_calls(&lex(&ascii));
    let mut out = String::with_capacity(ascii.len() + lexemes.len());
    let mut prev: Option<&Lexeme> = None;
    for lexeme in &lexemes {
        if let Some(p) = prev {
            let call = matches!((p, lexeme), (Lexeme::Ident(f), Lexeme::Punct('(')) if f.len() > 1);
            if p.ends_operand() && lexeme.starts_operand() && !call {
                if let Some(w) = p.word().or_else(|| lexeme.word()) {
                    bail!("unknown word '{w}' next to an operand");
                }
                out.push_str(" *");
            }
            if !call {
                out.push(' ');
            }
        }
        match lexeme {
            Lexeme::Number(s) | Lexeme::Ident(s) => out.push_str(s),
            Lexeme::Punct(c) => out.push(*c),
        }
        prev = Some(lexeme);
    }

    Ok(out)
}

/// Parenthesise the argument of a known function written without parentheses.
///
/// The argument runs over juxtaposed numbers and names and any powers of them. It stops at the
/// first operator or at the next function name: `sin 2x^2 + 1` is `sin(2x^2) + 1` and
/// `sin x cos x` is `sin(x) cos(x)`.
fn bracket_bare_calls<'a>(lexemes: &[Lexeme<'a>]) -> Vec<Lexeme<'a>> {
    let mut out = Vec::with_capacity(lexemes.len());
    // inserted `(` still to be closed, and real parentheses opened inside their argument
    let (mut open, mut depth) = (0usize, 0usize);

    for (i, lexeme) in lexemes.iter().enumerate() {
        out.push(*lexeme);
        let next = lexemes.get(i + 1);

        if open > 0 {
            match lexeme {
                Lexeme::Punct('(') => depth += 1,
                Lexeme::Punct(')') => depth = depth.saturating_sub(1),
                _ => (),
            }
        }

        if lexeme.is_function() && next.is_some_and(Lexeme::is_atom) {
            out.push(Lexeme::Punct('('));
            open += 1;
            continue;
        }

        if open == 0 || depth > 0 {
            continue;
        }

        let argument_continues = match (lexeme, next) {
            (_, None) => false,
            (f, Some(Lexeme::Punct('('))) => f.is_function() || *f == Lexeme::Punct('^'),
            (Lexeme::Punct('^'), Some(n)) => n.is_atom(),
            (Lexeme::Number(_) | Lexeme::Ident(_), Some(n)) => {
                (n.is_atom() && !n.is_function()) || *n == Lexeme::Punct('^')
            }
            (Lexeme::Punct(')'), Some(n)) => *n == Lexeme::Punct('^'),
            _ => false,
        };
        if !argument_continues {
            out.extend(std::iter::repeat(Lexeme::Punct(')')).take(open));
            open = 0;
        }
    }

    out
}

fn lex(text: &str) -> Vec<Lexeme> {
    let bytes = text.as_bytes();
    let digits_from = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut lexemes = Vec::new();
    let mut i = 0;
    while i < text.len() {
        let b = bytes[i];
        let starts_number =
            b.is_ascii_digit() || (b == b'.' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit));

        if b.is_ascii_whitespace() {
            i += 1;
        } else if starts_number {
            let start = i;
            i = digits_from(i);
            if bytes.get(i) == Some(&b'.') {
                i = digits_from(i + 1);
            }
            // exponent, only when digits follow so that `2e` stays `2 * e`
            if matches!(bytes.get(i), Some(b'e' | b'E')) {
                let mut j = i + 1;
                if matches!(bytes.get(j), Some(b'+' | b'-')) {
                    j += 1;
                }
                if bytes.get(j).is_some_and(u8::is_ascii_digit) {
                    i = digits_from(j);
                }
            }
            lexemes.push(Lexeme::Number(&text[start..i]));
        } else if b.is_ascii_alphabetic() || b == b'_' {
            let start = i;
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            lexemes.push(Lexeme::Ident(&text[start..i]));
        } else {
            // non-ascii characters pass through untouched and are rejected by the tokenizer
            let c = text[i..].chars().next().unwrap_or_default();
            lexemes.push(Lexeme::Punct(c));
            i += c.len_utf8().max(1);
        }
    }

    lexemes
}

impl Body {
    /// Free variables across the whole body, in first-seen order.
    pub fn variables(&self) -> Vec<String> {
        match self {
            Body::Expression(e) => e.free_variables(),
            Body::Equation { left, right } => {
                let mut vars = Vec::new();
                left.expr.collect_free_variables(&mut vars);
                right.expr.collect_free_variables(&mut vars);
                vars
            }
            Body::Function {
                name,
                params,
                definition,
            } => {
                let mut vars = params.clone();
                definition.expr.collect_free_variables(&mut vars);
                vars.retain(|v| v != name);
                vars
            }
        }
    }

    pub fn display(&self) -> String {
        match self {
            Body::Expression(e) => e.to_string(),
            Body::Equation { left, right } => format!("{} = {}", left.expr, right.expr),
            Body::Function {
                name,
                params,
                definition,
            } => format!(
                "{name}\\left({}\\right) = {}",
                params.join(", "),
                definition.expr
            ),
        }
    }
}

impl ParsedExpression {
    /// A candidate standing for the whole of `text`, left to be interpreted by the text
    /// generator.
    pub fn word_problem(text: &str) -> Self {
        Self {
            source: text.to_string(),
            state: State::WordProblem,
        }
    }

    pub fn is_parsed(&self) -> bool {
        !matches!(self.state, State::Failed { .. })
    }

    /// The text this was created from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn kind(&self) -> Option<ExprKind> {
        match &self.state {
            State::Parsed { kind, .. } => Some(*kind),
            State::WordProblem => Some(ExprKind::WordProblem),
            State::Failed { .. } => None,
        }
    }

    /// Free variables, empty unless parsed.
    pub fn variables(&self) -> &[String] {
        match &self.state {
            State::Parsed { variables, .. } => variables,
            _ => &[],
        }
    }

    pub fn body(&self) -> Option<&Body> {
        match &self.state {
            State::Parsed { body, .. } => Some(body),
            _ => None,
        }
    }

    /// The left and right sides, if this is an equation.
    pub fn sides(&self) -> Option<(&Side, &Side)> {
        match self.body()? {
            Body::Equation { left, right } => Some((left, right)),
            Body::Expression(_) | Body::Function { .. } => None,
        }
    }

    /// LaTeX-like rendering of the parsed tree.
    pub fn display(&self) -> Option<String> {
        self.body().map(Body::display)
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            State::Failed { error } => Some(error),
            _ => None,
        }
    }

    /// Is any free variable raised to the power of 2 anywhere in the parsed tree?
    pub fn has_squared_term(&self) -> bool {
        match self.body() {
            Some(Body::Expression(e)) => e.has_squared_term(),
            Some(Body::Equation { left, right }) => {
                left.expr.has_squared_term() || right.expr.has_squared_term()
            }
            Some(Body::Function { definition, .. }) => definition.expr.has_squared_term(),
            None => false,
        }
    }
}

impl Serialize for ParsedExpression {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct WireSide<'a> {
            text: &'a str,
            display: String,
        }

        #[derive(Serialize)]
        struct Wire<'a> {
            parsed: bool,
            source: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            kind: Option<ExprKind>,
            #[serde(skip_serializing_if = "Option::is_none")]
            variables: Option<&'a [String]>,
            #[serde(skip_serializing_if = "Option::is_none")]
            display: Option<String>,
            #[serde(skip_serializing_if = "Option::is_none")]
            left: Option<WireSide<'a>>,
            #[serde(skip_serializing_if = "Option::is_none")]
            right: Option<WireSide<'a>>,
            #[serde(skip_serializing_if = "Option::is_none")]
            error: Option<&'a str>,
        }

        fn side(s: &Side) -> WireSide<'_> {
            WireSide {
                text: &s.text,
                display: s.expr.to_string(),
            }
        }

        let (left, right) = self.sides().map(|(l, r)| (side(l), side(r))).unzip();

        Wire {
            parsed: self.is_parsed(),
            source: &self.source,
            kind: self.kind(),
            variables: matches!(self.state, State::Parsed { .. }).then(|| self.variables()),
            display: self.display(),
            left,
            right,
            error: self.error(),
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalising_implicit_multiplication() {
        assert_eq!(normalise("2x + 3").unwrap(), "2 * x + 3");
        assert_eq!(normalise("x² - 4").unwrap(), "x ^ 2 - 4");
        assert_eq!(normalise("3(x+1)").unwrap(), "3 * ( x + 1 )");
        assert_eq!(normalise("(x-1)(x+1)").unwrap(), "( x - 1 ) * ( x + 1 )");
        assert_eq!(normalise("sqrt(x)").unwrap(), "sqrt( x )");
        assert_eq!(normalise("x(x+1)").unwrap(), "x * ( x + 1 )");
        assert_eq!(normalise("2e3x").unwrap(), "2e3 * x");
        assert_eq!(normalise("2e").unwrap(), "2 * e");
        assert_eq!(normalise("1.5y−2").unwrap(), "1.5 * y - 2");
    }

    #[test]
    fn bare_function_arguments_are_parenthesised() {
        assert_eq!(normalise("sin x").unwrap(), "sin( x )");
        assert_eq!(normalise("sqrt x + 1").unwrap(), "sqrt( x ) + 1");
        assert_eq!(normalise("sin 2x").unwrap(), "sin( 2 * x )");
        assert_eq!(normalise("cos x^2 - 1").unwrap(), "cos( x ^ 2 ) - 1");
        assert_eq!(normalise("sin sqrt x").unwrap(), "sin( sqrt( x ) )");
        assert_eq!(normalise("2 sin x cos x").unwrap(), "2 * sin( x ) * cos( x )");
        assert_eq!(normalise("ln(x) + 1").unwrap(), "ln( x ) + 1");
    }

    #[test]
    fn function_names_are_not_variables() {
        let p = parse("sin x = 0.5");
        assert!(p.is_parsed(), "{:?}", p.error());
        assert_eq!(p.variables(), &["x".to_string()]);
        let (l, _) = p.sides().unwrap();
        assert_eq!(l.expr.eval(&[("x", 0.0)]).unwrap(), 0.0);

        let p = parse("sqrt x + 1 = 3");
        assert_eq!(p.variables(), &["x".to_string()]);
        let (l, _) = p.sides().unwrap();
        assert_eq!(l.expr.eval(&[("x", 4.0)]).unwrap(), 3.0);

        assert_eq!(parse("abs(y) + ln(z)").variables(), &["y", "z"].map(String::from));
    }

    #[test]
    fn function_definitions() {
        let p = parse("f(x) = x^2 + 3x");
        assert!(p.is_parsed(), "{:?}", p.error());
        assert_eq!(p.kind(), Some(ExprKind::Function));
        assert_eq!(p.variables(), &["x".to_string()]);
        assert!(p.sides().is_none());
        assert!(p.has_squared_term());
        assert_eq!(p.display().as_deref(), Some("f\\left(x\\right) = x^{2} + 3x"));

        let p = parse("area(w, h) = w * h");
        assert_eq!(p.kind(), Some(ExprKind::Function));
        assert_eq!(p.variables(), &["w", "h"].map(String::from));

        // products and known functions are not definitions
        assert_eq!(parse("x(x + 1) = 6").kind(), Some(ExprKind::Equation));
        assert_eq!(parse("f(2) = 6").kind(), Some(ExprKind::Equation));
        assert_eq!(parse("sin(x) = 1").kind(), Some(ExprKind::Equation));
        assert!(!parse("f(x) = (").is_parsed());

        let v = serde_json::to_value(parse("g(t) = 2t")).unwrap();
        assert_eq!(v["kind"], "function");
        assert_eq!(v["variables"][0], "t");
    }

    #[test]
    fn prose_next_to_numbers_is_rejected() {
        let p = parse("5 and");
        assert!(!p.is_parsed());
        assert!(p.error().unwrap().contains("unknown word 'and'"));

        assert!(!parse("costs 10").is_parsed());
        assert!(!parse("hello world").is_parsed());

        // words are fine as names when the operators are written out
        let p = parse("speed * time = 100");
        assert_eq!(p.variables(), &["speed", "time"].map(String::from));
        assert!(parse("2pi r").is_parsed());
    }

    #[test]
    fn deep_nesting_fails_without_overflowing() {
        let p = parse(&format!("{}x = 1", "-".repeat(20_000)));
        assert!(!p.is_parsed());
        assert!(p.error().unwrap().contains("nested more than 512 levels"));

        let p = parse(&format!("{}x{} = 1", "(".repeat(2_000), ")".repeat(2_000)));
        assert!(p.is_parsed(), "parentheses alone add no depth");

        let p = parse(&format!("{}x = 1", "-".repeat(100)));
        let (l, _) = p.sides().unwrap();
        assert_eq!(l.expr.eval(&[("x", 3.0)]).unwrap(), 3.0);
    }

    #[test]
    fn linear_equation() {
        let p = parse("2x + 3 = 7");
        assert!(p.is_parsed());
        assert_eq!(p.source(), "2x + 3 = 7");
        assert_eq!(p.kind(), Some(ExprKind::Equation));
        assert_eq!(p.variables(), &["x".to_string()]);
        assert_eq!(p.display().as_deref(), Some("2x + 3 = 7"));

        let (l, r) = p.sides().unwrap();
        assert_eq!(l.text, "2x + 3");
        assert_eq!(r.text, "7");
        assert_eq!(l.expr.eval(&[("x", 2.0)]).unwrap(), 7.0);
    }

    #[test]
    fn both_notations_of_squares_agree() {
        let caret = parse("x^2 + 5x + 6 = 0");
        let unicode = parse("x² + 5x + 6 = 0");
        assert_eq!(caret.body(), unicode.body());
        assert!(unicode.has_squared_term());
        assert!(!parse("x^3 = 8").has_squared_term());
    }

    #[test]
    fn variables_are_unioned_in_order() {
        let p = parse("2x + 3y = y - z");
        let vars = p.variables();
        assert_eq!(vars, &["x", "y", "z"].map(String::from));
    }

    #[test]
    fn constants_are_not_variables() {
        let p = parse("2 * pi * r");
        assert_eq!(p.kind(), Some(ExprKind::Expression));
        assert_eq!(p.variables(), &["r".to_string()]);
    }

    #[test]
    fn more_than_one_equals_fails() {
        let p = parse("x = 1 = 2");
        assert!(!p.is_parsed());
        assert!(p.error().unwrap().contains("expected exactly one ="));
        assert!(p.kind().is_none());
        assert!(p.variables().is_empty());
        assert!(p.display().is_none());
    }

    #[test]
    fn malformed_input_fails_without_panicking() {
        for text in ["2x + (3", "= 4", "x +", ")(", "", "x ≤ 3", "3 +* 4"] {
            let p = parse(text);
            assert!(!p.is_parsed(), "{text:?} should not parse");
            assert!(p.error().is_some());
        }
    }

    #[test]
    fn calculus_kinds() {
        assert_eq!(
            parse("derivative(x^2, x)").kind(),
            Some(ExprKind::Derivative)
        );
        assert_eq!(parse("integrate(x, x)").kind(), Some(ExprKind::Integral));
    }

    #[test]
    fn serialises_without_derived_fields_on_failure() {
        let v = serde_json::to_value(parse("x = = 2")).unwrap();
        assert_eq!(v["parsed"], false);
        assert!(v.get("kind").is_none());
        assert!(v.get("variables").is_none());
        assert!(v["error"].is_string());

        let v = serde_json::to_value(parse("3y - 5 = 10")).unwrap();
        assert_eq!(v["parsed"], true);
        assert_eq!(v["kind"], "equation");
        assert_eq!(v["variables"][0], "y");
        assert_eq!(v["left"]["text"], "3y - 5");
    }
}
