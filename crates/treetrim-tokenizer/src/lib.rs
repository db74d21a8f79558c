mod cursor;

use std::collections::VecDeque;

use cursor::Cursor;
use text_size::{TextRange, TextSize};
pub use treetrim_syntax::SyntaxKind;
use treetrim_syntax::SyntaxKind::*;

const TAB_WIDTH: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: SyntaxKind,
    pub range: TextRange,
}

impl Token {
    fn empty(kind: SyntaxKind, offset: TextSize) -> Self {
        Self { kind, range: TextRange::empty(offset) }
    }

    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.range]
    }
}

/// Python-flavoured lexer. Comments, blank lines, line continuations and
/// newlines inside brackets are trivia; indentation changes surface as
/// zero-width `INDENT` / `DEDENT` tokens.
pub struct Tokenizer<'src> {
    text: &'src str,
    cursor: Cursor<'src>,
    pending: VecDeque<Token>,
    indents: Vec<u32>,
    depth: u32,
    at_line_start: bool,
    last: Option<SyntaxKind>,
    finished: bool,
}

impl<'src> Tokenizer<'src> {
    pub fn new(text: &'src str) -> Self {
        Self {
            text,
            cursor: Cursor::new(text),
            pending: VecDeque::new(),
            indents: vec![0],
            depth: 0,
            at_line_start: true,
            last: None,
            finished: false,
        }
    }

    pub fn next_token(&mut self) -> Token {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return self.emit(token);
            }

            if self.finished {
                return Token::empty(EOF, self.end());
            }

            if self.at_line_start && self.depth == 0 {
                self.at_line_start = false;
                self.indentation();
                continue;
            }

            self.trivia();

            if self.cursor.is_eof() {
                self.finish();
                continue;
            }

            let start = self.cursor.offset();
            let kind = match self.cursor.peek() {
                '\n' | '\r' => {
                    self.newline();
                    self.at_line_start = true;
                    NEWLINE
                }
                _ => self.syntax_kind(),
            };

            return self.emit(Token { kind, range: TextRange::new(start, self.cursor.offset()) });
        }
    }

    fn emit(&mut self, token: Token) -> Token {
        self.last = Some(token.kind);
        token
    }

    fn end(&self) -> TextSize {
        TextSize::new(self.text.len() as u32)
    }

    fn newline(&mut self) {
        if self.cursor.eat('\r') {
            self.cursor.eat('\n');
        } else {
            self.cursor.advance();
        }
    }

    /// Measures the indentation of a fresh logical line. Blank and comment-only
    /// lines are swallowed whole and leave `at_line_start` set.
    fn indentation(&mut self) {
        let mut width = 0;
        loop {
            match self.cursor.peek() {
                ' ' => width += 1,
                '\t' => width = (width / TAB_WIDTH + 1) * TAB_WIDTH,
                '\x0c' => width = 0,
                _ => break,
            }
            self.cursor.advance();
        }

        if self.cursor.is_eof() {
            return;
        }

        match self.cursor.peek() {
            '#' => {
                self.cursor.advance_while(|c| c != '\n' && c != '\r');
                if !self.cursor.is_eof() {
                    self.newline();
                }
                self.at_line_start = true;
                return;
            }
            '\n' | '\r' => {
                self.newline();
                self.at_line_start = true;
                return;
            }
            _ => {}
        }

        let offset = self.cursor.offset();
        let current = self.indents.last().copied().unwrap_or(0);
        if width > current {
            self.indents.push(width);
            self.pending.push_back(Token::empty(INDENT, offset));
        } else if width < current {
            while self.indents.len() > 1 && width < self.indents.last().copied().unwrap_or(0) {
                self.indents.pop();
                self.pending.push_back(Token::empty(DEDENT, offset));
            }
            if self.indents.last().copied() != Some(width) {
                self.pending.push_back(Token::empty(UNKNOWN, offset));
            }
        }
    }

    fn trivia(&mut self) {
        loop {
            match self.cursor.peek() {
                ' ' | '\t' | '\x0c' => {
                    self.cursor.advance();
                }
                '#' => self.cursor.advance_while(|c| c != '\n' && c != '\r'),
                '\\' if matches!(self.cursor.second(), '\n' | '\r') => {
                    self.cursor.advance();
                    self.newline();
                }
                '\n' | '\r' if self.depth > 0 => self.newline(),
                _ => break,
            }
        }
    }

    fn finish(&mut self) {
        let offset = self.end();
        if self.last.is_some_and(|kind| !matches!(kind, NEWLINE | INDENT | DEDENT)) {
            self.pending.push_back(Token::empty(NEWLINE, offset));
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.pending.push_back(Token::empty(DEDENT, offset));
        }
        self.pending.push_back(Token::empty(EOF, offset));
        self.finished = true;
    }

    fn syntax_kind(&mut self) -> SyntaxKind {
        let first = self.cursor.peek();

        if is_string_start(first, self.cursor.second(), self.cursor.third()) {
            return self.string();
        }

        self.cursor.advance();
        match first {
            '(' | '[' | '{' => {
                self.depth += 1;
                match first {
                    '(' => LEFT_PAREN,
                    '[' => LEFT_BRACKET,
                    _ => LEFT_BRACE,
                }
            }
            ')' | ']' | '}' => {
                self.depth = self.depth.saturating_sub(1);
                match first {
                    ')' => RIGHT_PAREN,
                    ']' => RIGHT_BRACKET,
                    _ => RIGHT_BRACE,
                }
            }
            ',' => COMMA,
            ';' => SEMICOLON,
            '~' => TILDE,
            ':' => {
                if self.cursor.eat('=') {
                    WALRUS
                } else {
                    COLON
                }
            }
            '.' => {
                if self.cursor.peek().is_ascii_digit() {
                    self.digits(false);
                    self.float_tail()
                } else if self.cursor.peek() == '.' && self.cursor.second() == '.' {
                    self.cursor.advance();
                    self.cursor.advance();
                    ELLIPSIS
                } else {
                    DOT
                }
            }
            '0'..='9' => self.number(first),
            c if c.is_alphabetic() || c == '_' => {
                let start = usize::from(self.cursor.offset()) - c.len_utf8();
                self.cursor.advance_while(|c| c.is_alphanumeric() || c == '_');
                let word = &self.text[start..usize::from(self.cursor.offset())];
                SyntaxKind::from_keyword(word).unwrap_or(NAME)
            }
            _ => self.operator(first),
        }
    }

    fn operator(&mut self, first: char) -> SyntaxKind {
        let c = &mut self.cursor;
        match first {
            '+' => if c.eat('=') { AUG_OP } else { PLUS },
            '-' => {
                if c.eat('=') {
                    AUG_OP
                } else if c.eat('>') {
                    ARROW
                } else {
                    MINUS
                }
            }
            '*' => {
                if c.eat('*') {
                    if c.eat('=') { AUG_OP } else { DOUBLE_STAR }
                } else if c.eat('=') {
                    AUG_OP
                } else {
                    STAR
                }
            }
            '/' => {
                if c.eat('/') {
                    if c.eat('=') { AUG_OP } else { DOUBLE_SLASH }
                } else if c.eat('=') {
                    AUG_OP
                } else {
                    SLASH
                }
            }
            '%' => if c.eat('=') { AUG_OP } else { PERCENT },
            '@' => if c.eat('=') { AUG_OP } else { AT },
            '&' => if c.eat('=') { AUG_OP } else { AMP },
            '|' => if c.eat('=') { AUG_OP } else { PIPE },
            '^' => if c.eat('=') { AUG_OP } else { CARET },
            '<' => {
                if c.eat('<') {
                    if c.eat('=') { AUG_OP } else { LSHIFT }
                } else if c.eat('=') {
                    LT_EQ
                } else {
                    LT
                }
            }
            '>' => {
                if c.eat('>') {
                    if c.eat('=') { AUG_OP } else { RSHIFT }
                } else if c.eat('=') {
                    GT_EQ
                } else {
                    GT
                }
            }
            '=' => if c.eat('=') { EQ_EQ } else { EQ },
            '!' => if c.eat('=') { NOT_EQ } else { UNKNOWN },
            _ => UNKNOWN,
        }
    }

    fn number(&mut self, first: char) -> SyntaxKind {
        if first == '0' && matches!(self.cursor.peek(), 'x' | 'X' | 'o' | 'O' | 'b' | 'B') {
            let hex = matches!(self.cursor.advance(), 'x' | 'X');
            self.digits(hex);
            return INT_NUMBER;
        }

        self.digits(false);

        if self.cursor.eat('.') {
            self.digits(false);
            return self.float_tail();
        }

        if self.exponent() {
            return self.float_tail();
        }

        if self.imaginary() { FLOAT_NUMBER } else { INT_NUMBER }
    }

    fn float_tail(&mut self) -> SyntaxKind {
        self.exponent();
        self.imaginary();
        FLOAT_NUMBER
    }

    fn exponent(&mut self) -> bool {
        let signed = matches!(self.cursor.second(), '+' | '-');
        let valid = matches!(self.cursor.peek(), 'e' | 'E')
            && (self.cursor.second().is_ascii_digit()
                || (signed && self.cursor.third().is_ascii_digit()));
        if valid {
            self.cursor.advance();
            if signed {
                self.cursor.advance();
            }
            self.digits(false);
        }
        valid
    }

    fn imaginary(&mut self) -> bool {
        self.cursor.eat('j') || self.cursor.eat('J')
    }

    fn digits(&mut self, allow_hex: bool) {
        loop {
            match self.cursor.peek() {
                '_' | '0'..='9' => {
                    self.cursor.advance();
                }
                'a'..='f' | 'A'..='F' if allow_hex => {
                    self.cursor.advance();
                }
                _ => return,
            }
        }
    }

    fn string(&mut self) -> SyntaxKind {
        self.cursor.advance_while(|c| !matches!(c, '\'' | '"'));

        let quote = self.cursor.advance();
        let triple = self.cursor.peek() == quote && self.cursor.second() == quote;
        if triple {
            self.cursor.advance();
            self.cursor.advance();
        }

        loop {
            if self.cursor.is_eof() {
                return UNKNOWN;
            }
            match self.cursor.advance() {
                // An escaped quote never terminates, raw prefix or not.
                '\\' => {
                    self.cursor.advance();
                }
                '\n' | '\r' if !triple => return UNKNOWN,
                c if c == quote => {
                    if !triple {
                        return STRING;
                    }
                    if self.cursor.peek() == quote && self.cursor.second() == quote {
                        self.cursor.advance();
                        self.cursor.advance();
                        return STRING;
                    }
                }
                _ => {}
            }
        }
    }
}

fn is_string_start(first: char, second: char, third: char) -> bool {
    let is_prefix = |c: char| matches!(c, 'r' | 'R' | 'b' | 'B' | 'u' | 'U' | 'f' | 'F');
    let is_quote = |c: char| matches!(c, '\'' | '"');

    is_quote(first)
        || (is_prefix(first) && is_quote(second))
        || (is_prefix(first) && is_prefix(second) && is_quote(third))
}

/// Runs the tokenizer to completion; the last token is always `EOF`.
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokenizer = Tokenizer::new(text);
    let mut tokens = Vec::new();
    loop {
        let token = tokenizer.next_token();
        tokens.push(token);
        if token.kind == EOF {
            return tokens;
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<SyntaxKind> {
        tokenize(text).into_iter().map(|token| token.kind).collect()
    }

    fn dump(text: &str) -> String {
        tokenize(text)
            .iter()
            .map(|token| format!("{:?} {:?}\n", token.kind, token.text(text)))
            .collect()
    }

    #[test]
    fn number_literals() {
        let inputs = [
            ("123", INT_NUMBER),
            ("0x1f", INT_NUMBER),
            ("0b1010", INT_NUMBER),
            ("1_000", INT_NUMBER),
            ("1.5", FLOAT_NUMBER),
            ("1.", FLOAT_NUMBER),
            (".5", FLOAT_NUMBER),
            ("1e10", FLOAT_NUMBER),
            ("2.5E-3", FLOAT_NUMBER),
            ("3j", FLOAT_NUMBER),
        ];

        for (input, expected) in inputs {
            let tokens = tokenize(input);
            assert_eq!(tokens[0].kind, expected, "input: {input:?}");
            assert_eq!(tokens[0].text(input), input, "input: {input:?}");
        }
    }

    #[test]
    fn string_literals() {
        let inputs = [
            r#""abc""#,
            r"'a\'b'",
            r#"f"{x}""#,
            r"rb'\d'",
            "'''multi\nline'''",
            r#""""doc""""#,
        ];

        for input in inputs {
            let tokens = tokenize(input);
            assert_eq!(tokens[0].kind, STRING, "input: {input:?}");
            assert_eq!(tokens[0].text(input), input, "input: {input:?}");
        }

        assert_eq!(tokenize("'open")[0].kind, UNKNOWN);
    }

    #[test]
    fn operators_take_the_longest_match() {
        assert_eq!(
            kinds("a **= b // c -> d := e != f"),
            [
                NAME, AUG_OP, NAME, DOUBLE_SLASH, NAME, ARROW, NAME, WALRUS, NAME, NOT_EQ, NAME,
                NEWLINE, EOF
            ]
        );
        assert_eq!(kinds("x<<=1"), [NAME, AUG_OP, INT_NUMBER, NEWLINE, EOF]);
    }

    #[test]
    fn keywords_and_names() {
        assert_eq!(kinds("not x is None"), [NOT_KW, NAME, IS_KW, NONE_KW, NEWLINE, EOF]);
        assert_eq!(kinds("iffy _if"), [NAME, NAME, NEWLINE, EOF]);
    }

    #[test]
    fn indentation_blocks() {
        let text = "def f(x):\n    if x:\n        return 1\n    return 2\n";
        expect_test::expect![[r#"
            DEF_KW "def"
            NAME "f"
            LEFT_PAREN "("
            NAME "x"
            RIGHT_PAREN ")"
            COLON ":"
            NEWLINE "\n"
            INDENT ""
            IF_KW "if"
            NAME "x"
            COLON ":"
            NEWLINE "\n"
            INDENT ""
            RETURN_KW "return"
            INT_NUMBER "1"
            NEWLINE "\n"
            DEDENT ""
            RETURN_KW "return"
            INT_NUMBER "2"
            NEWLINE "\n"
            DEDENT ""
            EOF ""
        "#]]
        .assert_eq(&dump(text));
    }

    #[test]
    fn trivia_is_skipped() {
        let text = "x = (1,\n  2)  # pair\n\n# note\ny = \\\n 3";
        assert_eq!(
            kinds(text),
            [
                NAME, EQ, LEFT_PAREN, INT_NUMBER, COMMA, INT_NUMBER, RIGHT_PAREN, NEWLINE, NAME,
                EQ, INT_NUMBER, NEWLINE, EOF
            ]
        );
    }

    #[test]
    fn input_without_trailing_newline_is_closed() {
        assert_eq!(
            kinds("if x:\n  y"),
            [IF_KW, NAME, COLON, NEWLINE, INDENT, NAME, NEWLINE, DEDENT, EOF]
        );
        assert_eq!(kinds(""), [EOF]);
        assert_eq!(kinds("\n\n"), [EOF]);
    }

    #[test]
    fn inconsistent_dedent_is_flagged() {
        assert!(kinds("if x:\n    y\n  z\n").contains(&UNKNOWN));
    }

    #[test]
    fn eof_repeats() {
        let mut tokenizer = Tokenizer::new("x");
        let kinds =
            std::iter::from_fn(|| Some(tokenizer.next_token().kind)).take(5).collect::<Vec<_>>();
        assert_eq!(kinds, [NAME, NEWLINE, EOF, EOF, EOF]);
    }
}
