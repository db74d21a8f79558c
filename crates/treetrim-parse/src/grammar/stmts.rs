use treetrim_syntax::SyntaxKind::*;

use super::{LINE_END, at_expr_start, exprs, parameters};
use crate::parser::Parser;

pub(crate) fn module(p: &mut Parser<'_>) {
    let m = p.start();

    while !p.at(EOF) {
        stmt(p);
    }

    m.complete(p, MODULE);
}

fn stmt(p: &mut Parser<'_>) {
    match p.peek_kind() {
        IF_KW => if_stmt(p),
        FOR_KW => for_stmt(p),
        WHILE_KW => while_stmt(p),
        DEF_KW => function_def(p),
        INDENT => p.error_and_bump("unexpected indent"),
        DEDENT => p.error_and_bump("unindent does not match any outer indentation level"),
        _ => simple_stmts(p),
    }
}

/// One logical line: `;`-separated simple statements and its `NEWLINE`.
fn simple_stmts(p: &mut Parser<'_>) {
    loop {
        simple_stmt(p);
        if !p.eat(SEMICOLON) || p.at(NEWLINE) || p.at(EOF) {
            break;
        }
    }

    if p.eat(NEWLINE) || p.at(EOF) {
        return;
    }

    p.error("expected end of statement");
    let m = p.start();
    while !p.at_set(&LINE_END) {
        p.advance();
    }
    m.complete(p, ERROR);
    p.eat(NEWLINE);
}

fn simple_stmt(p: &mut Parser<'_>) {
    let m = p.start();
    let kind = match p.peek_kind() {
        PASS_KW => {
            p.advance();
            PASS
        }
        BREAK_KW => {
            p.advance();
            BREAK
        }
        CONTINUE_KW => {
            p.advance();
            CONTINUE
        }
        RETURN_KW => {
            p.advance();
            if at_expr_start(p) {
                exprs::star_exprs(p);
            }
            RETURN
        }
        DEL_KW => {
            p.advance();
            exprs::targets(p);
            DELETE
        }
        ASSERT_KW => {
            p.advance();
            exprs::expr(p);
            if p.eat(COMMA) {
                exprs::expr(p);
            }
            ASSERT
        }
        RAISE_KW => {
            p.advance();
            if at_expr_start(p) {
                exprs::expr(p);
                if p.eat(FROM_KW) {
                    exprs::expr(p);
                }
            }
            RAISE
        }
        GLOBAL_KW | NONLOCAL_KW => {
            let kind = if p.at(GLOBAL_KW) { GLOBAL } else { NONLOCAL };
            p.advance();
            p.expect(NAME, "expected name");
            while p.eat(COMMA) {
                p.expect(NAME, "expected name");
            }
            kind
        }
        IMPORT_KW => {
            p.advance();
            aliases(p, true);
            IMPORT
        }
        FROM_KW => {
            import_from(p);
            IMPORT_FROM
        }
        _ => {
            if p.at(YIELD_KW) {
                exprs::yield_expr(p);
            } else {
                exprs::star_exprs(p);
            }
            match p.peek_kind() {
                EQ => {
                    while p.eat(EQ) {
                        assignment_value(p);
                    }
                    ASSIGN
                }
                AUG_OP => {
                    p.advance();
                    assignment_value(p);
                    AUG_ASSIGN
                }
                COLON => {
                    p.advance();
                    exprs::expr(p);
                    if p.eat(EQ) {
                        assignment_value(p);
                    }
                    ANN_ASSIGN
                }
                _ => EXPR_STMT,
            }
        }
    };
    m.complete(p, kind);
}

fn assignment_value(p: &mut Parser<'_>) {
    if p.at(YIELD_KW) {
        exprs::yield_expr(p);
    } else {
        exprs::star_exprs(p);
    }
}

fn import_from(p: &mut Parser<'_>) {
    p.advance();

    let mut module = false;
    while p.at(DOT) || p.at(ELLIPSIS) {
        p.advance();
        module = true;
    }
    if p.at(NAME) {
        dotted_name(p);
        module = true;
    }
    if !module {
        p.error("expected module name");
    }

    p.expect(IMPORT_KW, "expected `import`");
    if p.eat(STAR) {
        return;
    }

    if p.eat(LEFT_PAREN) {
        aliases(p, false);
        p.eat(COMMA);
        p.expect(RIGHT_PAREN, "expected `)`");
    } else {
        aliases(p, false);
    }
}

fn aliases(p: &mut Parser<'_>, dotted: bool) {
    loop {
        let m = p.start();
        if dotted {
            dotted_name(p);
        } else {
            p.expect(NAME, "expected name");
        }
        if p.eat(AS_KW) {
            p.expect(NAME, "expected name");
        }
        m.complete(p, ALIAS);

        if !(p.at(COMMA) && p.nth(1) == NAME) {
            break;
        }
        p.advance();
    }
}

fn dotted_name(p: &mut Parser<'_>) {
    p.expect(NAME, "expected name");
    while p.at(DOT) && p.nth(1) == NAME {
        p.advance();
        p.advance();
    }
}

fn if_stmt(p: &mut Parser<'_>) {
    let m = p.start();
    p.advance();
    exprs::named_expr(p);
    p.expect(COLON, "expected `:`");
    suite(p);

    if p.at(ELIF_KW) {
        if_stmt(p);
    } else {
        else_clause(p);
    }

    m.complete(p, IF);
}

fn for_stmt(p: &mut Parser<'_>) {
    let m = p.start();
    p.advance();
    exprs::targets(p);
    p.expect(IN_KW, "expected `in`");
    exprs::star_exprs(p);
    p.expect(COLON, "expected `:`");
    suite(p);
    else_clause(p);
    m.complete(p, FOR);
}

fn while_stmt(p: &mut Parser<'_>) {
    let m = p.start();
    p.advance();
    exprs::named_expr(p);
    p.expect(COLON, "expected `:`");
    suite(p);
    else_clause(p);
    m.complete(p, WHILE);
}

fn else_clause(p: &mut Parser<'_>) {
    if p.eat(ELSE_KW) {
        p.expect(COLON, "expected `:`");
        suite(p);
    }
}

fn function_def(p: &mut Parser<'_>) {
    let m = p.start();
    p.advance();
    p.expect(NAME, "expected function name");

    if p.eat(LEFT_PAREN) {
        parameters(p, RIGHT_PAREN, true);
        p.expect(RIGHT_PAREN, "expected `)`");
    } else {
        p.error("expected function parameters");
    }

    if p.eat(ARROW) {
        exprs::expr(p);
    }

    p.expect(COLON, "expected `:`");
    suite(p);
    m.complete(p, FUNCTION_DEF);
}

/// Either an indented block or the rest of the current line.
fn suite(p: &mut Parser<'_>) {
    if !p.eat(NEWLINE) {
        simple_stmts(p);
        return;
    }

    if !p.eat(INDENT) {
        p.error("expected an indented block");
        return;
    }

    while !p.at(DEDENT) && !p.at(EOF) {
        stmt(p);
    }
    p.eat(DEDENT);
}
