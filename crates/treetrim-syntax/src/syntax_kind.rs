use serde::{Deserialize, Serialize};

#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[repr(u16)]
pub enum SyntaxKind {
    LEFT_PAREN,
    RIGHT_PAREN,
    LEFT_BRACKET,
    RIGHT_BRACKET,
    LEFT_BRACE,
    RIGHT_BRACE,
    COMMA,
    COLON,
    SEMICOLON,
    DOT,
    ELLIPSIS,
    EQ,
    ARROW,
    WALRUS,
    AUG_OP,

    PLUS,
    MINUS,
    STAR,
    DOUBLE_STAR,
    SLASH,
    DOUBLE_SLASH,
    PERCENT,
    AT,
    LSHIFT,
    RSHIFT,
    AMP,
    PIPE,
    CARET,
    TILDE,

    LT,
    GT,
    LT_EQ,
    GT_EQ,
    EQ_EQ,
    NOT_EQ,

    AND_KW,
    AS_KW,
    ASSERT_KW,
    BREAK_KW,
    CONTINUE_KW,
    DEF_KW,
    DEL_KW,
    ELIF_KW,
    ELSE_KW,
    FALSE_KW,
    FOR_KW,
    FROM_KW,
    GLOBAL_KW,
    IF_KW,
    IMPORT_KW,
    IN_KW,
    IS_KW,
    LAMBDA_KW,
    NONE_KW,
    NONLOCAL_KW,
    NOT_KW,
    OR_KW,
    PASS_KW,
    RAISE_KW,
    RETURN_KW,
    TRUE_KW,
    WHILE_KW,
    YIELD_KW,

    NAME,
    INT_NUMBER,
    FLOAT_NUMBER,
    STRING,

    NEWLINE,
    INDENT,
    DEDENT,
    #[default]
    UNKNOWN,
    EOF,

    MODULE,
    EXPR_STMT,
    PAREN_EXPR,
    RETURN,
    ASSIGN,
    AUG_ASSIGN,
    ANN_ASSIGN,
    PASS,
    BREAK,
    CONTINUE,
    DELETE,
    ASSERT,
    RAISE,
    GLOBAL,
    NONLOCAL,
    IMPORT,
    IMPORT_FROM,
    ALIAS,
    IF,
    FOR,
    WHILE,
    FUNCTION_DEF,
    ARGUMENTS,
    ARG,

    BIN_OP,
    BOOL_OP,
    UNARY_OP,
    COMPARE,
    CALL,
    KEYWORD,
    ATTRIBUTE,
    SUBSCRIPT,
    SLICE,
    IDENT,
    CONSTANT,
    LIST,
    TUPLE,
    SET,
    DICT,
    LIST_COMP,
    SET_COMP,
    DICT_COMP,
    GENERATOR_EXP,
    COMPREHENSION,
    IF_EXP,
    LAMBDA,
    STARRED,
    NAMED_EXPR,
    YIELD,
    ERROR,
    TOMBSTONE,
}

impl SyntaxKind {
    pub fn from_keyword(text: &str) -> Option<Self> {
        let kind = match text {
            "and" => Self::AND_KW,
            "as" => Self::AS_KW,
            "assert" => Self::ASSERT_KW,
            "break" => Self::BREAK_KW,
            "continue" => Self::CONTINUE_KW,
            "def" => Self::DEF_KW,
            "del" => Self::DEL_KW,
            "elif" => Self::ELIF_KW,
            "else" => Self::ELSE_KW,
            "False" => Self::FALSE_KW,
            "for" => Self::FOR_KW,
            "from" => Self::FROM_KW,
            "global" => Self::GLOBAL_KW,
            "if" => Self::IF_KW,
            "import" => Self::IMPORT_KW,
            "in" => Self::IN_KW,
            "is" => Self::IS_KW,
            "lambda" => Self::LAMBDA_KW,
            "None" => Self::NONE_KW,
            "nonlocal" => Self::NONLOCAL_KW,
            "not" => Self::NOT_KW,
            "or" => Self::OR_KW,
            "pass" => Self::PASS_KW,
            "raise" => Self::RAISE_KW,
            "return" => Self::RETURN_KW,
            "True" => Self::TRUE_KW,
            "while" => Self::WHILE_KW,
            "yield" => Self::YIELD_KW,
            _ => return None,
        };
        Some(kind)
    }

    pub fn is_keyword(self) -> bool {
        (self as u16) >= (Self::AND_KW as u16) && (self as u16) <= (Self::YIELD_KW as u16)
    }

    /// Layout tokens are zero-width or whitespace and never extend a node's span.
    pub fn is_layout(self) -> bool {
        matches!(self, Self::NEWLINE | Self::INDENT | Self::DEDENT | Self::EOF)
    }

    /// Kinds the parser marks but that are not materialized as tree nodes: their
    /// children are hoisted into the parent and their tokens become parent gaps.
    pub fn is_transparent(self) -> bool {
        matches!(self, Self::EXPR_STMT | Self::PAREN_EXPR)
    }
}
