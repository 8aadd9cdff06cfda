//! Source text to syntax tree.
//!
//! pest recognises the grammar; binary operator precedence is resolved with
//! pest's Pratt parser; everything else is a direct walk over the pairs.

use once_cell::sync::Lazy;
use pest::error::{Error as PestError, ErrorVariant, InputLocation, LineColLocation};
use pest::iterators::{Pair, Pairs};
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest::Parser;
use pest_derive::Parser;
use thiserror::Error;

use super::ast::{
    AssignOp, BinaryOp, CatchClause, Expr, LogicalOp, Stmt, UnaryOp, UpdateOp,
};
use crate::value::string_to_number;

#[derive(Parser)]
#[grammar = "engine/grammar.pest"]
struct ScriptParser;

static PRATT: Lazy<PrattParser<Rule>> = Lazy::new(|| {
    PrattParser::new()
        .op(Op::infix(Rule::or_op, Assoc::Left))
        .op(Op::infix(Rule::and_op, Assoc::Left))
        .op(Op::infix(Rule::strict_eq, Assoc::Left)
            | Op::infix(Rule::strict_ne, Assoc::Left)
            | Op::infix(Rule::loose_eq, Assoc::Left)
            | Op::infix(Rule::loose_ne, Assoc::Left))
        .op(Op::infix(Rule::lt, Assoc::Left)
            | Op::infix(Rule::gt, Assoc::Left)
            | Op::infix(Rule::le, Assoc::Left)
            | Op::infix(Rule::ge, Assoc::Left))
        .op(Op::infix(Rule::add, Assoc::Left) | Op::infix(Rule::sub, Assoc::Left))
        .op(Op::infix(Rule::mul, Assoc::Left)
            | Op::infix(Rule::div, Assoc::Left)
            | Op::infix(Rule::rem, Assoc::Left))
});

/// A syntax error with its 1-based position in the source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (line {line}, column {column})")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl ParseError {
    fn at(pair: &Pair<Rule>, message: impl Into<String>) -> Self {
        let (line, column) = pair.line_col();
        Self {
            message: message.into(),
            line,
            column,
        }
    }
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Parses a whole snippet.
pub fn parse_program(source: &str) -> Result<Vec<Stmt>, ParseError> {
    let mut pairs = ScriptParser::parse(Rule::program, source)
        .map_err(|error| convert_parse_error(error, source))?;
    let program = pairs.next().ok_or_else(|| ParseError {
        message: "empty parse tree".to_string(),
        line: 1,
        column: 1,
    })?;
    program
        .into_inner()
        .filter(|pair| pair.as_rule() != Rule::EOI)
        .map(build_stmt)
        .collect()
}

// ============================================================================
// STATEMENTS
// ============================================================================

fn build_stmt(pair: Pair<Rule>) -> Result<Stmt, ParseError> {
    match pair.as_rule() {
        Rule::empty_stmt => Ok(Stmt::Empty),
        Rule::block => Ok(Stmt::Block(build_stmts(pair)?)),
        Rule::expr_stmt => {
            let mut inner = children(&pair);
            Ok(Stmt::Expr(build_expr(expect_next(&pair, &mut inner)?)?))
        }
        Rule::var_stmt => {
            let declarations = children(&pair)
                .map(|decl| {
                    let mut inner = children(&decl);
                    let name = expect_next(&decl, &mut inner)?.as_str().to_string();
                    let init = inner.next().map(build_expr).transpose()?;
                    Ok((name, init))
                })
                .collect::<Result<Vec<_>, ParseError>>()?;
            Ok(Stmt::Var(declarations))
        }
        Rule::if_stmt => {
            let mut inner = children(&pair);
            let test = build_expr(expect_next(&pair, &mut inner)?)?;
            let consequent = Box::new(build_stmt(expect_next(&pair, &mut inner)?)?);
            let alternate = inner.next().map(build_stmt).transpose()?.map(Box::new);
            Ok(Stmt::If {
                test,
                consequent,
                alternate,
            })
        }
        Rule::throw_stmt => {
            let mut inner = children(&pair);
            Ok(Stmt::Throw(build_expr(expect_next(&pair, &mut inner)?)?))
        }
        Rule::try_stmt => {
            let mut inner = children(&pair);
            let block = build_stmts(expect_next(&pair, &mut inner)?)?;
            let mut handler = None;
            let mut finalizer = None;
            for clause in inner {
                match clause.as_rule() {
                    Rule::catch_clause => {
                        let mut parts = children(&clause);
                        let param = expect_next(&clause, &mut parts)?.as_str().to_string();
                        let body = build_stmts(expect_next(&clause, &mut parts)?)?;
                        handler = Some(CatchClause { param, body });
                    }
                    Rule::finally_clause => {
                        let mut parts = children(&clause);
                        finalizer = Some(build_stmts(expect_next(&clause, &mut parts)?)?);
                    }
                    _ => return Err(unexpected(&clause)),
                }
            }
            Ok(Stmt::Try {
                block,
                handler,
                finalizer,
            })
        }
        _ => Err(unexpected(&pair)),
    }
}

fn build_stmts(block: Pair<Rule>) -> Result<Vec<Stmt>, ParseError> {
    block.into_inner().map(build_stmt).collect()
}

// ============================================================================
// EXPRESSIONS
// ============================================================================

fn build_expr(pair: Pair<Rule>) -> Result<Expr, ParseError> {
    match pair.as_rule() {
        Rule::expression => {
            let mut items = pair
                .into_inner()
                .map(build_expr)
                .collect::<Result<Vec<_>, _>>()?;
            if items.len() == 1 {
                Ok(items.remove(0))
            } else {
                Ok(Expr::Sequence(items))
            }
        }
        Rule::assign_expr => {
            let mut inner = pair.clone().into_inner();
            let target = build_expr(expect_next(&pair, &mut inner)?)?;
            let Some(op) = inner.next() else {
                return Ok(target);
            };
            let op = match op.as_str() {
                "=" => AssignOp::Assign,
                "+=" => AssignOp::Add,
                "-=" => AssignOp::Sub,
                "*=" => AssignOp::Mul,
                _ => return Err(unexpected(&op)),
            };
            let value = build_expr(expect_next(&pair, &mut inner)?)?;
            Ok(Expr::Assign {
                op,
                target: Box::new(target),
                value: Box::new(value),
            })
        }
        Rule::cond_expr => {
            let mut inner = pair.clone().into_inner();
            let test = build_expr(expect_next(&pair, &mut inner)?)?;
            match inner.next() {
                None => Ok(test),
                Some(consequent) => {
                    let consequent = build_expr(consequent)?;
                    let alternate = build_expr(expect_next(&pair, &mut inner)?)?;
                    Ok(Expr::Conditional {
                        test: Box::new(test),
                        consequent: Box::new(consequent),
                        alternate: Box::new(alternate),
                    })
                }
            }
        }
        Rule::binary_expr => build_binary(pair.into_inner()),
        Rule::unary_expr => build_unary(pair),
        Rule::postfix_expr => {
            let mut inner = pair.clone().into_inner();
            let target = build_expr(expect_next(&pair, &mut inner)?)?;
            match inner.next().map(|op| op.as_rule()) {
                None => Ok(target),
                Some(rule) => Ok(Expr::Update {
                    op: if rule == Rule::post_inc {
                        UpdateOp::Increment
                    } else {
                        UpdateOp::Decrement
                    },
                    prefix: false,
                    target: Box::new(target),
                }),
            }
        }
        Rule::lhs_expr | Rule::new_target => build_chain(pair),
        Rule::new_expr => {
            let mut inner = children(&pair);
            let callee = build_expr(expect_next(&pair, &mut inner)?)?;
            let args = match inner.next() {
                Some(call) => build_args(call)?,
                None => Vec::new(),
            };
            Ok(Expr::New {
                callee: Box::new(callee),
                args,
            })
        }
        Rule::paren_expr => {
            let mut inner = pair.clone().into_inner();
            build_expr(expect_next(&pair, &mut inner)?)
        }
        Rule::object_lit => {
            let properties = pair
                .into_inner()
                .map(|property| {
                    let mut inner = property.clone().into_inner();
                    let key = property_key(expect_next(&property, &mut inner)?)?;
                    let value = build_expr(expect_next(&property, &mut inner)?)?;
                    Ok((key, value))
                })
                .collect::<Result<Vec<_>, ParseError>>()?;
            Ok(Expr::Object(properties))
        }
        Rule::number => Ok(Expr::Number(string_to_number(pair.as_str()))),
        Rule::string => Ok(Expr::String(unescape(&pair)?)),
        Rule::boolean => Ok(Expr::Boolean(pair.as_str() == "true")),
        Rule::null_lit => Ok(Expr::Null),
        Rule::identifier => Ok(Expr::Ident(pair.as_str().to_string())),
        _ => Err(unexpected(&pair)),
    }
}

fn build_binary(pairs: Pairs<Rule>) -> Result<Expr, ParseError> {
    PRATT
        .map_primary(build_expr)
        .map_infix(|lhs, op, rhs| {
            let (lhs, rhs) = (Box::new(lhs?), Box::new(rhs?));
            let op = match op.as_rule() {
                Rule::or_op => return Ok(Expr::Logical { op: LogicalOp::Or, lhs, rhs }),
                Rule::and_op => return Ok(Expr::Logical { op: LogicalOp::And, lhs, rhs }),
                Rule::strict_eq => BinaryOp::StrictEq,
                Rule::strict_ne => BinaryOp::StrictNe,
                Rule::loose_eq => BinaryOp::LooseEq,
                Rule::loose_ne => BinaryOp::LooseNe,
                Rule::lt => BinaryOp::Lt,
                Rule::gt => BinaryOp::Gt,
                Rule::le => BinaryOp::Le,
                Rule::ge => BinaryOp::Ge,
                Rule::add => BinaryOp::Add,
                Rule::sub => BinaryOp::Sub,
                Rule::mul => BinaryOp::Mul,
                Rule::div => BinaryOp::Div,
                Rule::rem => BinaryOp::Rem,
                _ => return Err(unexpected(&op)),
            };
            Ok(Expr::Binary { op, lhs, rhs })
        })
        .parse(pairs)
}

fn build_unary(pair: Pair<Rule>) -> Result<Expr, ParseError> {
    let mut operators = Vec::new();
    let mut operand = None;
    for part in pair.clone().into_inner() {
        match part.as_rule() {
            Rule::postfix_expr => operand = Some(build_expr(part)?),
            _ => operators.push(part),
        }
    }
    let mut expr = operand.ok_or_else(|| ParseError::at(&pair, "missing operand"))?;
    for op in operators.into_iter().rev() {
        let operand = Box::new(expr);
        expr = match op.as_rule() {
            Rule::typeof_op => Expr::Unary { op: UnaryOp::TypeOf, operand },
            Rule::not_op => Expr::Unary { op: UnaryOp::Not, operand },
            Rule::neg_op => Expr::Unary { op: UnaryOp::Neg, operand },
            Rule::pos_op => Expr::Unary { op: UnaryOp::Plus, operand },
            Rule::pre_inc => Expr::Update { op: UpdateOp::Increment, prefix: true, target: operand },
            Rule::pre_dec => Expr::Update { op: UpdateOp::Decrement, prefix: true, target: operand },
            _ => return Err(unexpected(&op)),
        };
    }
    Ok(expr)
}

/// A primary followed by any number of `.name`, `[index]` and `(args)`.
fn build_chain(pair: Pair<Rule>) -> Result<Expr, ParseError> {
    let mut inner = pair.clone().into_inner();
    let mut expr = build_expr(expect_next(&pair, &mut inner)?)?;
    for link in inner {
        expr = match link.as_rule() {
            Rule::member => {
                let mut parts = link.clone().into_inner();
                Expr::Member {
                    object: Box::new(expr),
                    property: expect_next(&link, &mut parts)?.as_str().to_string(),
                }
            }
            Rule::index => {
                let mut parts = link.clone().into_inner();
                Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(build_expr(expect_next(&link, &mut parts)?)?),
                }
            }
            Rule::call => Expr::Call {
                callee: Box::new(expr),
                args: build_args(link)?,
            },
            _ => return Err(unexpected(&link)),
        };
    }
    Ok(expr)
}

fn build_args(call: Pair<Rule>) -> Result<Vec<Expr>, ParseError> {
    call.into_inner().map(build_expr).collect()
}

fn property_key(pair: Pair<Rule>) -> Result<String, ParseError> {
    match pair.as_rule() {
        Rule::property_name => Ok(pair.as_str().to_string()),
        Rule::string => unescape(&pair),
        Rule::number => Ok(crate::value::number_to_string(string_to_number(pair.as_str()))),
        _ => Err(unexpected(&pair)),
    }
}

// ============================================================================
// STRING LITERALS
// ============================================================================

/// Decodes a quoted string literal. Escaped surrogate pairs combine into one
/// character; an unpaired surrogate becomes U+FFFD.
fn unescape(pair: &Pair<Rule>) -> Result<String, ParseError> {
    let text = pair.as_str();
    let body = &text[1..text.len() - 1];
    let mut result = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    let mut pending_high: Option<u32> = None;

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            flush_surrogate(&mut result, &mut pending_high);
            result.push(ch);
            continue;
        }
        let Some(escape) = chars.next() else {
            return Err(ParseError::at(pair, "unterminated escape sequence"));
        };
        let unit = match escape {
            'x' => hex_escape(&mut chars, 2).ok_or_else(|| {
                ParseError::at(pair, "invalid hexadecimal escape sequence")
            })?,
            'u' => hex_escape(&mut chars, 4).ok_or_else(|| {
                ParseError::at(pair, "invalid Unicode escape sequence")
            })?,
            other => {
                flush_surrogate(&mut result, &mut pending_high);
                match other {
                    'n' => result.push('\n'),
                    't' => result.push('\t'),
                    'r' => result.push('\r'),
                    'b' => result.push('\u{8}'),
                    'f' => result.push('\u{c}'),
                    'v' => result.push('\u{b}'),
                    '0' => result.push('\0'),
                    // Line continuation.
                    '\n' => {}
                    '\r' => {
                        if chars.peek() == Some(&'\n') {
                            chars.next();
                        }
                    }
                    other => result.push(other),
                }
                continue;
            }
        };
        match (pending_high.take(), unit) {
            (Some(high), 0xDC00..=0xDFFF) => {
                let combined = 0x10000 + ((high - 0xD800) << 10) + (unit - 0xDC00);
                result.push(char::from_u32(combined).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            (previous, 0xD800..=0xDBFF) => {
                if previous.is_some() {
                    result.push(char::REPLACEMENT_CHARACTER);
                }
                pending_high = Some(unit);
            }
            (previous, _) => {
                if previous.is_some() {
                    result.push(char::REPLACEMENT_CHARACTER);
                }
                result.push(char::from_u32(unit).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
        }
    }
    flush_surrogate(&mut result, &mut pending_high);
    Ok(result)
}

fn flush_surrogate(result: &mut String, pending_high: &mut Option<u32>) {
    if pending_high.take().is_some() {
        result.push(char::REPLACEMENT_CHARACTER);
    }
}

fn hex_escape(chars: &mut impl Iterator<Item = char>, digits: usize) -> Option<u32> {
    (0..digits).try_fold(0, |acc, _| {
        chars.next().and_then(|c| c.to_digit(16)).map(|d| acc * 16 + d)
    })
}

// ============================================================================
// HELPERS
// ============================================================================

fn is_keyword(rule: Rule) -> bool {
    matches!(
        rule,
        Rule::kw_var
            | Rule::kw_if
            | Rule::kw_else
            | Rule::kw_try
            | Rule::kw_catch
            | Rule::kw_finally
            | Rule::kw_throw
            | Rule::kw_new
    )
}

/// Inner pairs of `pair` without the keyword tokens.
fn children<'i>(pair: &Pair<'i, Rule>) -> std::vec::IntoIter<Pair<'i, Rule>> {
    pair.clone()
        .into_inner()
        .filter(|inner| !is_keyword(inner.as_rule()))
        .collect::<Vec<_>>()
        .into_iter()
}

fn expect_next<'i>(
    parent: &Pair<'i, Rule>,
    inner: &mut impl Iterator<Item = Pair<'i, Rule>>,
) -> Result<Pair<'i, Rule>, ParseError> {
    inner
        .next()
        .ok_or_else(|| ParseError::at(parent, format!("incomplete {:?}", parent.as_rule())))
}

fn unexpected(pair: &Pair<Rule>) -> ParseError {
    ParseError::at(pair, format!("unexpected {:?}", pair.as_rule()))
}

fn convert_parse_error(error: PestError<Rule>, source: &str) -> ParseError {
    let offset = match error.location {
        InputLocation::Pos(pos) => pos,
        InputLocation::Span((start, _)) => start,
    };
    let (line, column) = match error.line_col {
        LineColLocation::Pos(at) => at,
        LineColLocation::Span(at, _) => at,
    };
    let message = match &error.variant {
        ErrorVariant::CustomError { message } => message.clone(),
        ErrorVariant::ParsingError { .. } => match offending_token(source, offset) {
            Some(token) => format!("Unexpected token '{token}'"),
            None => "Unexpected end of input".to_string(),
        },
    };
    ParseError {
        message,
        line,
        column,
    }
}

/// The word or single character at `offset`, or `None` at end of input.
fn offending_token(source: &str, offset: usize) -> Option<&str> {
    let rest = source.get(offset..)?;
    let first = rest.chars().next()?;
    let is_word = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '$';
    let len = if is_word(first) {
        rest.find(|c: char| !is_word(c)).unwrap_or(rest.len())
    } else {
        first.len_utf8()
    };
    Some(&rest[..len])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(source: &str) -> Expr {
        match parse_program(source).unwrap().remove(0) {
            Stmt::Expr(expr) => expr,
            other => panic!("expected an expression statement, got {other:?}"),
        }
    }

    #[test]
    fn empty_input_is_an_empty_program() {
        assert!(parse_program("").unwrap().is_empty());
        assert!(parse_program("  // nothing\n").unwrap().is_empty());
    }

    #[test]
    fn precedence_follows_the_language() {
        let parsed = expr("1 + 2 * 3");
        let Expr::Binary { op: BinaryOp::Add, rhs, .. } = parsed else {
            panic!("expected addition at the root, got {parsed:?}");
        };
        assert!(matches!(*rhs, Expr::Binary { op: BinaryOp::Mul, .. }));

        assert!(matches!(
            expr("a || b && c"),
            Expr::Logical { op: LogicalOp::Or, .. }
        ));
        assert!(matches!(
            expr("1 < 2 === true"),
            Expr::Binary { op: BinaryOp::StrictEq, .. }
        ));
    }

    #[test]
    fn assignment_is_right_associative() {
        let parsed = expr("a = b = 1");
        let Expr::Assign { value, .. } = parsed else {
            panic!("expected assignment, got {parsed:?}");
        };
        assert!(matches!(*value, Expr::Assign { .. }));
    }

    #[test]
    fn update_and_prefix_operators() {
        assert!(matches!(
            expr("i++"),
            Expr::Update { op: UpdateOp::Increment, prefix: false, .. }
        ));
        assert!(matches!(
            expr("--i"),
            Expr::Update { op: UpdateOp::Decrement, prefix: true, .. }
        ));
        assert!(matches!(expr("typeof x"), Expr::Unary { op: UnaryOp::TypeOf, .. }));
        assert!(matches!(expr("- -1"), Expr::Unary { op: UnaryOp::Neg, .. }));
    }

    #[test]
    fn member_chains_and_new() {
        let parsed = expr("new RangeError('x').message");
        let Expr::Member { object, property } = parsed else {
            panic!("expected member access, got {parsed:?}");
        };
        assert_eq!(property, "message");
        assert!(matches!(*object, Expr::New { .. }));
        assert!(matches!(expr("a.b[0](1, 2)"), Expr::Call { .. }));
    }

    #[test]
    fn statements() {
        let program =
            parse_program("var c = 1, d; try { throw 0 } catch (e) { c = 2 } finally {} c").unwrap();
        assert_eq!(program.len(), 3);
        assert!(matches!(&program[0], Stmt::Var(decls) if decls.len() == 2));
        assert!(matches!(
            &program[1],
            Stmt::Try { handler: Some(_), finalizer: Some(_), .. }
        ));
        assert!(matches!(
            parse_program("if (a) b; else { c }").unwrap()[0],
            Stmt::If { alternate: Some(_), .. }
        ));
    }

    #[test]
    fn string_escapes() {
        assert_eq!(expr(r#""a\tb\x41B""#), Expr::String("a\tbAB".into()));
        assert_eq!(expr(r"'\uD83D\uDE00'"), Expr::String("\u{1F600}".into()));
        assert_eq!(expr(r"'\uD83D'"), Expr::String("\u{FFFD}".into()));
        assert_eq!(expr(r#"'it\'s'"#), Expr::String("it's".into()));
    }

    #[test]
    fn numbers() {
        assert_eq!(expr("0x1F"), Expr::Number(31.0));
        assert_eq!(expr("1.5e3"), Expr::Number(1500.0));
        assert_eq!(expr(".5"), Expr::Number(0.5));
    }

    #[test]
    fn reserved_words_are_rejected() {
        assert!(parse_program("var class = 1").is_err());
        assert_eq!(offending_token("var class = 1", 4), Some("class"));
        assert_eq!(offending_token("a +", 3), None);
        assert!(parse_program("instanceof = 1").is_err());
        assert!(parse_program("variable = 1").is_ok());
    }

    #[test]
    fn errors_report_position() {
        let error = parse_program("1 +\n(2").unwrap_err();
        assert_eq!(error.message, "Unexpected end of input");
        assert_eq!(error.line, 2);
    }
}
