use treetrim_syntax::SyntaxKind::{self, *};
use treetrim_syntax::SyntaxSet;

use crate::parser::Parser;

mod exprs;
pub(crate) mod stmts;

/// Tokens that can begin an expression.
const EXPR_FIRST: SyntaxSet = SyntaxSet::new([
    NAME,
    INT_NUMBER,
    FLOAT_NUMBER,
    STRING,
    TRUE_KW,
    FALSE_KW,
    NONE_KW,
    ELLIPSIS,
    LEFT_PAREN,
    LEFT_BRACKET,
    LEFT_BRACE,
    PLUS,
    MINUS,
    TILDE,
    NOT_KW,
    LAMBDA_KW,
    STAR,
]);

/// Tokens that end a logical line or a block; error recovery never consumes them.
const LINE_END: SyntaxSet = SyntaxSet::new([NEWLINE, INDENT, DEDENT, EOF]);

fn at_expr_start(p: &Parser<'_>) -> bool {
    p.at_set(&EXPR_FIRST)
}

/// Parameter list of a `def` or a `lambda`, up to (not including) `end`.
///
/// Names become `ARG` nodes; a default value is a sibling following its
/// parameter, and bare `*` / `/` markers stay in the list's own text.
fn parameters(p: &mut Parser<'_>, end: SyntaxKind, annotated: bool) {
    let m = p.start();

    while !p.at(end) && !p.at_set(&LINE_END) {
        match p.peek_kind() {
            SLASH => p.advance(),
            STAR if p.nth(1) != NAME => p.advance(),
            STAR | DOUBLE_STAR | NAME => {
                let param = p.start();
                if !p.at(NAME) {
                    p.advance();
                }
                p.expect(NAME, "expected parameter name");
                if annotated && p.eat(COLON) {
                    exprs::expr(p);
                }
                param.complete(p, ARG);

                if p.eat(EQ) {
                    exprs::expr(p);
                }
            }
            _ => {
                p.error_and_bump("expected parameter");
                continue;
            }
        }

        if !p.eat(COMMA) {
            break;
        }
    }

    m.complete(p, ARGUMENTS);
}
