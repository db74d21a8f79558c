use treetrim_syntax::SyntaxKind::{self, *};
use treetrim_syntax::SyntaxSet;

use super::{LINE_END, at_expr_start, parameters};
use crate::parser::{CompletedMarker, Parser};

const COMPARISON_OPS: SyntaxSet =
    SyntaxSet::new([LT, GT, LT_EQ, GT_EQ, EQ_EQ, NOT_EQ, IN_KW, IS_KW]);

/// Expression list that becomes a `TUPLE` when a comma follows the first item.
pub(crate) fn star_exprs(p: &mut Parser<'_>) -> Option<CompletedMarker> {
    let first = star_named_expr(p)?;
    if !p.at(COMMA) {
        return Some(first);
    }

    let m = first.precede(p);
    while p.eat(COMMA) {
        if !at_expr_start(p) {
            break;
        }
        star_named_expr(p);
    }
    Some(m.complete(p, TUPLE))
}

/// Assignment and loop targets: a comma list of `or`-level expressions, so a
/// following `in` is never taken for a comparison.
pub(crate) fn targets(p: &mut Parser<'_>) -> Option<CompletedMarker> {
    let first = star_target(p)?;
    if !p.at(COMMA) {
        return Some(first);
    }

    let m = first.precede(p);
    while p.eat(COMMA) {
        if !at_expr_start(p) {
            break;
        }
        star_target(p);
    }
    Some(m.complete(p, TUPLE))
}

fn star_target(p: &mut Parser<'_>) -> Option<CompletedMarker> {
    if !p.at(STAR) {
        return bitwise_or(p);
    }

    let m = p.start();
    p.advance();
    bitwise_or(p);
    Some(m.complete(p, STARRED))
}

fn star_named_expr(p: &mut Parser<'_>) -> Option<CompletedMarker> {
    if !p.at(STAR) {
        return named_expr(p);
    }

    let m = p.start();
    p.advance();
    bitwise_or(p);
    Some(m.complete(p, STARRED))
}

pub(crate) fn named_expr(p: &mut Parser<'_>) -> Option<CompletedMarker> {
    if !(p.at(NAME) && p.nth(1) == WALRUS) {
        return expr(p);
    }

    let m = p.start();
    atom(p);
    p.advance();
    expr(p);
    Some(m.complete(p, NAMED_EXPR))
}

pub(crate) fn expr(p: &mut Parser<'_>) -> Option<CompletedMarker> {
    if p.at(LAMBDA_KW) {
        return Some(lambda(p));
    }

    let body = disjunction(p)?;
    if !p.at(IF_KW) {
        return Some(body);
    }

    let m = body.precede(p);
    p.advance();
    disjunction(p);
    p.expect(ELSE_KW, "expected `else`");
    expr(p);
    Some(m.complete(p, IF_EXP))
}

fn lambda(p: &mut Parser<'_>) -> CompletedMarker {
    let m = p.start();
    p.advance();
    parameters(p, COLON, false);
    p.expect(COLON, "expected `:`");
    expr(p);
    m.complete(p, LAMBDA)
}

pub(crate) fn yield_expr(p: &mut Parser<'_>) -> CompletedMarker {
    let m = p.start();
    p.advance();
    if p.eat(FROM_KW) {
        expr(p);
    } else if at_expr_start(p) {
        star_exprs(p);
    }
    m.complete(p, YIELD)
}

fn disjunction(p: &mut Parser<'_>) -> Option<CompletedMarker> {
    bool_op(p, OR_KW, conjunction)
}

fn conjunction(p: &mut Parser<'_>) -> Option<CompletedMarker> {
    bool_op(p, AND_KW, inversion)
}

/// `a or b or c` is one flat node, not a nested chain.
fn bool_op(
    p: &mut Parser<'_>,
    op: SyntaxKind,
    operand: fn(&mut Parser<'_>) -> Option<CompletedMarker>,
) -> Option<CompletedMarker> {
    let first = operand(p)?;
    if !p.at(op) {
        return Some(first);
    }

    let m = first.precede(p);
    while p.eat(op) {
        operand(p);
    }
    Some(m.complete(p, BOOL_OP))
}

fn inversion(p: &mut Parser<'_>) -> Option<CompletedMarker> {
    if !p.at(NOT_KW) {
        return comparison(p);
    }

    let m = p.start();
    p.advance();
    inversion(p);
    Some(m.complete(p, UNARY_OP))
}

fn at_comparison(p: &Parser<'_>) -> bool {
    p.at_set(&COMPARISON_OPS) || (p.at(NOT_KW) && p.nth(1) == IN_KW)
}

fn comparison(p: &mut Parser<'_>) -> Option<CompletedMarker> {
    let first = bitwise_or(p)?;
    if !at_comparison(p) {
        return Some(first);
    }

    let m = first.precede(p);
    while at_comparison(p) {
        match p.peek_kind() {
            NOT_KW => {
                p.advance();
                p.advance();
            }
            IS_KW => {
                p.advance();
                p.eat(NOT_KW);
            }
            _ => p.advance(),
        }
        bitwise_or(p);
    }
    Some(m.complete(p, COMPARE))
}

fn binding_power(kind: SyntaxKind) -> Option<u8> {
    let power = match kind {
        PIPE => 1,
        CARET => 2,
        AMP => 3,
        LSHIFT | RSHIFT => 4,
        PLUS | MINUS => 5,
        STAR | SLASH | DOUBLE_SLASH | PERCENT | AT => 6,
        _ => return None,
    };
    Some(power)
}

fn bitwise_or(p: &mut Parser<'_>) -> Option<CompletedMarker> {
    binary(p, 1)
}

fn binary(p: &mut Parser<'_>, min_power: u8) -> Option<CompletedMarker> {
    let mut lhs = factor(p)?;

    while let Some(power) = binding_power(p.peek_kind()) {
        if power < min_power {
            break;
        }
        let m = lhs.precede(p);
        p.advance();
        binary(p, power + 1);
        lhs = m.complete(p, BIN_OP);
    }

    Some(lhs)
}

fn factor(p: &mut Parser<'_>) -> Option<CompletedMarker> {
    if !matches!(p.peek_kind(), PLUS | MINUS | TILDE) {
        return power(p);
    }

    let m = p.start();
    p.advance();
    factor(p);
    Some(m.complete(p, UNARY_OP))
}

/// `**` binds tighter than a unary operator on its left and is right
/// associative.
fn power(p: &mut Parser<'_>) -> Option<CompletedMarker> {
    let base = primary(p)?;
    if !p.at(DOUBLE_STAR) {
        return Some(base);
    }

    let m = base.precede(p);
    p.advance();
    factor(p);
    Some(m.complete(p, BIN_OP))
}

fn primary(p: &mut Parser<'_>) -> Option<CompletedMarker> {
    let mut lhs = atom(p)?;

    loop {
        lhs = match p.peek_kind() {
            DOT => {
                let m = lhs.precede(p);
                p.advance();
                p.expect(NAME, "expected attribute name");
                m.complete(p, ATTRIBUTE)
            }
            LEFT_PAREN => {
                let m = lhs.precede(p);
                call_args(p);
                m.complete(p, CALL)
            }
            LEFT_BRACKET => {
                let m = lhs.precede(p);
                p.advance();
                slices(p);
                p.expect(RIGHT_BRACKET, "expected `]`");
                m.complete(p, SUBSCRIPT)
            }
            _ => return Some(lhs),
        };
    }
}

fn call_args(p: &mut Parser<'_>) {
    p.advance();

    while !p.at(RIGHT_PAREN) && !p.at_set(&LINE_END) {
        match p.peek_kind() {
            STAR => {
                let m = p.start();
                p.advance();
                expr(p);
                m.complete(p, STARRED);
            }
            DOUBLE_STAR => {
                let m = p.start();
                p.advance();
                expr(p);
                m.complete(p, KEYWORD);
            }
            NAME if p.nth(1) == EQ => {
                let m = p.start();
                p.advance();
                p.advance();
                expr(p);
                m.complete(p, KEYWORD);
            }
            _ => {
                let Some(arg) = named_expr(p) else { break };
                if p.at(FOR_KW) {
                    let m = arg.precede(p);
                    comprehensions(p);
                    m.complete(p, GENERATOR_EXP);
                }
            }
        }

        if !p.eat(COMMA) {
            break;
        }
    }

    p.expect(RIGHT_PAREN, "expected `)`");
}

fn slices(p: &mut Parser<'_>) {
    let Some(first) = slice(p) else { return };
    if !p.at(COMMA) {
        return;
    }

    let m = first.precede(p);
    while p.eat(COMMA) {
        if !(at_expr_start(p) || p.at(COLON)) {
            break;
        }
        slice(p);
    }
    m.complete(p, TUPLE);
}

/// `lower:upper:step` with every part optional; a plain index otherwise.
fn slice(p: &mut Parser<'_>) -> Option<CompletedMarker> {
    let lower = if p.at(COLON) { None } else { Some(named_expr(p)?) };
    if !p.at(COLON) {
        return lower;
    }

    let m = match lower {
        Some(lower) => lower.precede(p),
        None => p.start(),
    };
    p.advance();
    if at_expr_start(p) {
        expr(p);
    }
    if p.eat(COLON) && at_expr_start(p) {
        expr(p);
    }
    Some(m.complete(p, SLICE))
}

fn atom(p: &mut Parser<'_>) -> Option<CompletedMarker> {
    let m = p.start();
    let kind = match p.peek_kind() {
        NAME => {
            p.advance();
            IDENT
        }
        INT_NUMBER | FLOAT_NUMBER | TRUE_KW | FALSE_KW | NONE_KW | ELLIPSIS => {
            p.advance();
            CONSTANT
        }
        STRING => {
            while p.at(STRING) {
                p.advance();
            }
            CONSTANT
        }
        LEFT_PAREN => parenthesized(p),
        LEFT_BRACKET => list(p),
        LEFT_BRACE => dict_or_set(p),
        _ => {
            p.error("expected expression");
            if !p.at_set(&LINE_END) {
                p.advance();
            }
            m.complete(p, ERROR);
            return None;
        }
    };
    Some(m.complete(p, kind))
}

fn parenthesized(p: &mut Parser<'_>) -> SyntaxKind {
    p.advance();
    if p.eat(RIGHT_PAREN) {
        return TUPLE;
    }

    if p.at(YIELD_KW) {
        yield_expr(p);
        p.expect(RIGHT_PAREN, "expected `)`");
        return PAREN_EXPR;
    }

    star_named_expr(p);
    let kind = match p.peek_kind() {
        FOR_KW => {
            comprehensions(p);
            GENERATOR_EXP
        }
        COMMA => {
            elements(p, RIGHT_PAREN);
            TUPLE
        }
        _ => PAREN_EXPR,
    };
    p.expect(RIGHT_PAREN, "expected `)`");
    kind
}

fn list(p: &mut Parser<'_>) -> SyntaxKind {
    p.advance();
    if p.eat(RIGHT_BRACKET) {
        return LIST;
    }

    star_named_expr(p);
    let kind = if p.at(FOR_KW) {
        comprehensions(p);
        LIST_COMP
    } else {
        elements(p, RIGHT_BRACKET);
        LIST
    };
    p.expect(RIGHT_BRACKET, "expected `]`");
    kind
}

fn dict_or_set(p: &mut Parser<'_>) -> SyntaxKind {
    p.advance();
    if p.eat(RIGHT_BRACE) {
        return DICT;
    }

    let is_dict = if p.eat(DOUBLE_STAR) {
        bitwise_or(p);
        true
    } else {
        star_named_expr(p);
        if p.eat(COLON) {
            expr(p);
            true
        } else {
            false
        }
    };

    let kind = match (is_dict, p.at(FOR_KW)) {
        (true, true) => {
            comprehensions(p);
            DICT_COMP
        }
        (false, true) => {
            comprehensions(p);
            SET_COMP
        }
        (true, false) => {
            while p.eat(COMMA) {
                if p.at(RIGHT_BRACE) {
                    break;
                }
                if p.eat(DOUBLE_STAR) {
                    bitwise_or(p);
                } else {
                    expr(p);
                    p.expect(COLON, "expected `:`");
                    expr(p);
                }
            }
            DICT
        }
        (false, false) => {
            elements(p, RIGHT_BRACE);
            SET
        }
    };
    p.expect(RIGHT_BRACE, "expected `}`");
    kind
}

/// Remaining `, item` pairs of a display, allowing a trailing comma.
fn elements(p: &mut Parser<'_>, close: SyntaxKind) {
    while p.eat(COMMA) {
        if p.at(close) {
            break;
        }
        star_named_expr(p);
    }
}

fn comprehensions(p: &mut Parser<'_>) {
    while p.at(FOR_KW) {
        let m = p.start();
        p.advance();
        targets(p);
        p.expect(IN_KW, "expected `in`");
        disjunction(p);
        while p.eat(IF_KW) {
            disjunction(p);
        }
        m.complete(p, COMPREHENSION);
    }
}
