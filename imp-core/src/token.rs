//! Tokens produced by the lexer.
//!
//! The tag space is the lexeme, not its syntactic role: `-` is always
//! [`TokenKind::Minus`], and the parser decides from its position whether it
//! is a prefix or an infix operator.

use core::fmt;

use crate::span::Span;
use crate::symbol::Symbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Special
    Eof,
    Error,

    // Identifiers and literals
    Identifier,
    Literal,

    // Delimiters
    LBrace,    // {
    RBrace,    // }
    LParen,    // (
    RParen,    // )
    LBracket,  // [
    RBracket,  // ]
    LPack,     // ‹
    RPack,     // ›
    LVariadic, // «
    RVariadic, // »

    // Punctuation
    Comma,       // ,
    Semi,        // ;
    Colon,       // :
    DoubleColon, // ::
    Dot,         // .
    Arrow,       // -> or →
    FatArrow,    // =>
    Question,    // ?

    // Keywords
    Def,
    Fn,
    Let,
    If,
    Else,
    Match,
    For,
    In,
    While,
    Cn,
    Pi,     // \pi or Π
    Lambda, // \lambda, \ or λ
    Bottom, // \bot or ⊥

    // Qualifiers
    QualifierU, // ᵁ
    QualifierR, // ᴿ
    QualifierA, // ᴬ
    QualifierL, // ᴸ

    // Operators
    Plus,    // +
    Minus,   // -
    Star,    // *
    Slash,   // /
    Percent, // %
    Inc,     // ++
    Dec,     // --
    Not,     // !
    Tilde,   // ~
    And,     // &
    AndAnd,  // &&
    Or,      // |
    OrOr,    // ||
    Xor,     // ^
    Shl,     // <<
    Shr,     // >>
    EqEq,    // ==
    Ne,      // !=
    Lt,      // <
    Le,      // <=
    Gt,      // >
    Ge,      // >=

    // Assignment family
    Assign,        // =
    PlusAssign,    // +=
    MinusAssign,   // -=
    StarAssign,    // *=
    SlashAssign,   // /=
    PercentAssign, // %=
    AndAssign,     // &=
    OrAssign,      // |=
    XorAssign,     // ^=
    ShlAssign,     // <<=
    ShrAssign,     // >>=
}

impl TokenKind {
    /// The lexeme for fixed tokens, or a description for the rest.
    pub fn as_str(self) -> &'static str {
        use TokenKind::*;
        match self {
            Eof => "end of file",
            Error => "invalid token",
            Identifier => "identifier",
            Literal => "literal",
            LBrace => "{",
            RBrace => "}",
            LParen => "(",
            RParen => ")",
            LBracket => "[",
            RBracket => "]",
            LPack => "‹",
            RPack => "›",
            LVariadic => "«",
            RVariadic => "»",
            Comma => ",",
            Semi => ";",
            Colon => ":",
            DoubleColon => "::",
            Dot => ".",
            Arrow => "->",
            FatArrow => "=>",
            Question => "?",
            Def => "def",
            Fn => "fn",
            Let => "let",
            If => "if",
            Else => "else",
            Match => "match",
            For => "for",
            In => "in",
            While => "while",
            Cn => "cn",
            Pi => "\\pi",
            Lambda => "\\lambda",
            Bottom => "\\bot",
            QualifierU => "ᵁ",
            QualifierR => "ᴿ",
            QualifierA => "ᴬ",
            QualifierL => "ᴸ",
            Plus => "+",
            Minus => "-",
            Star => "*",
            Slash => "/",
            Percent => "%",
            Inc => "++",
            Dec => "--",
            Not => "!",
            Tilde => "~",
            And => "&",
            AndAnd => "&&",
            Or => "|",
            OrOr => "||",
            Xor => "^",
            Shl => "<<",
            Shr => ">>",
            EqEq => "==",
            Ne => "!=",
            Lt => "<",
            Le => "<=",
            Gt => ">",
            Ge => ">=",
            Assign => "=",
            PlusAssign => "+=",
            MinusAssign => "-=",
            StarAssign => "*=",
            SlashAssign => "/=",
            PercentAssign => "%=",
            AndAssign => "&=",
            OrAssign => "|=",
            XorAssign => "^=",
            ShlAssign => "<<=",
            ShrAssign => ">>=",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Width and signedness annotation of a numeric literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumKind {
    /// No suffix; the type is left to later passes.
    Untyped,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl NumKind {
    pub fn from_suffix(suffix: &str) -> Option<NumKind> {
        Some(match suffix {
            "i8" => NumKind::I8,
            "i16" => NumKind::I16,
            "i32" => NumKind::I32,
            "i64" => NumKind::I64,
            "u8" => NumKind::U8,
            "u16" => NumKind::U16,
            "u32" => NumKind::U32,
            "u64" => NumKind::U64,
            "f32" => NumKind::F32,
            "f64" => NumKind::F64,
            _ => return None,
        })
    }

    pub fn suffix(self) -> &'static str {
        match self {
            NumKind::Untyped => "",
            NumKind::I8 => "i8",
            NumKind::I16 => "i16",
            NumKind::I32 => "i32",
            NumKind::I64 => "i64",
            NumKind::U8 => "u8",
            NumKind::U16 => "u16",
            NumKind::U32 => "u32",
            NumKind::U64 => "u64",
            NumKind::F32 => "f32",
            NumKind::F64 => "f64",
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, NumKind::F32 | NumKind::F64)
    }
}

/// Decoded literal value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal {
    Int { value: u64, kind: NumKind },
    Float { value: f64, kind: NumKind },
    Bool(bool),
    Char(char),
    Str(Symbol),
}

/// Data attached to identifier and literal tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Payload {
    None,
    Symbol(Symbol),
    Literal(Literal),
}

/// A single token. Cheap to copy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub payload: Payload,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Token {
            kind,
            span,
            payload: Payload::None,
        }
    }

    pub fn isa(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    pub fn symbol(&self) -> Option<Symbol> {
        match self.payload {
            Payload::Symbol(symbol) => Some(symbol),
            _ => None,
        }
    }

    pub fn literal(&self) -> Option<Literal> {
        match self.payload {
            Payload::Literal(literal) => Some(literal),
            _ => None,
        }
    }
}
