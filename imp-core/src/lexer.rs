//! Pull-based lexer.
//!
//! [`Lexer::lex`] hands out one token per call and keeps returning `Eof`
//! once the input is exhausted. Malformed input never stops the lexer: it
//! reports a diagnostic through the compiler context and produces either an
//! `Error` token or a best-effort literal so parsing can continue.

use tracing::trace;

use crate::compiler::Compiler;
use crate::diagnostic::Diagnostic;
use crate::span::{FileId, Pos, Span};
use crate::token::{Literal, NumKind, Payload, Token, TokenKind};

pub struct Lexer<'src, 'c> {
    pub(crate) compiler: &'c mut Compiler,
    file: FileId,
    source: &'src str,
    /// Byte offset of the next unconsumed character.
    index: usize,
    /// Position of the next unconsumed character.
    pos: Pos,
    front_index: usize,
    front: Pos,
}

/// Lex a whole source string, including the trailing `Eof` token.
pub fn lex(compiler: &mut Compiler, file: FileId, source: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(compiler, file, source);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.lex();
        tokens.push(token);
        if token.isa(TokenKind::Eof) {
            return tokens;
        }
    }
}

impl<'src, 'c> Lexer<'src, 'c> {
    pub fn new(compiler: &'c mut Compiler, file: FileId, source: &'src str) -> Self {
        Lexer {
            compiler,
            file,
            source,
            index: 0,
            pos: Pos::START,
            front_index: 0,
            front: Pos::START,
        }
    }

    pub fn file(&self) -> FileId {
        self.file
    }

    pub fn source(&self) -> &'src str {
        self.source
    }

    /// Produce the next token.
    pub fn lex(&mut self) -> Token {
        self.eat_whitespace_and_comments();
        self.front_index = self.index;
        self.front = self.pos;

        let Some(ch) = self.next() else {
            return self.token(TokenKind::Eof);
        };

        use TokenKind::*;
        let kind = match ch {
            '{' => LBrace,
            '}' => RBrace,
            '(' => LParen,
            ')' => RParen,
            '[' => LBracket,
            ']' => RBracket,
            '‹' => LPack,
            '›' => RPack,
            '«' => LVariadic,
            '»' => RVariadic,
            ',' => Comma,
            ';' => Semi,
            '?' => Question,
            '~' => Tilde,
            'Π' => Pi,
            'λ' => Lambda,
            '⊥' => Bottom,
            '→' => Arrow,
            'ᵁ' => QualifierU,
            'ᴿ' => QualifierR,
            'ᴬ' => QualifierA,
            'ᴸ' => QualifierL,
            '.' => Dot,
            ':' => self.select(':', DoubleColon, Colon),
            '^' => self.select('=', XorAssign, Xor),
            '%' => self.select('=', PercentAssign, Percent),
            '*' => self.select('=', StarAssign, Star),
            '/' => self.select('=', SlashAssign, Slash),
            '!' => self.select('=', Ne, Not),
            '=' => {
                if self.accept('=') {
                    EqEq
                } else if self.accept('>') {
                    FatArrow
                } else {
                    Assign
                }
            }
            '+' => {
                if self.accept('+') {
                    Inc
                } else {
                    self.select('=', PlusAssign, Plus)
                }
            }
            '-' => {
                if self.accept('-') {
                    Dec
                } else if self.accept('>') {
                    Arrow
                } else {
                    self.select('=', MinusAssign, Minus)
                }
            }
            '&' => {
                if self.accept('&') {
                    AndAnd
                } else {
                    self.select('=', AndAssign, And)
                }
            }
            '|' => {
                if self.accept('|') {
                    OrOr
                } else {
                    self.select('=', OrAssign, Or)
                }
            }
            '<' => {
                if self.accept('<') {
                    self.select('=', ShlAssign, Shl)
                } else {
                    self.select('=', Le, Lt)
                }
            }
            '>' => {
                if self.accept('>') {
                    self.select('=', ShrAssign, Shr)
                } else {
                    self.select('=', Ge, Gt)
                }
            }
            '\\' => return self.lex_command(),
            '"' => return self.lex_string(),
            '\'' => return self.lex_char(),
            '0'..='9' => return self.lex_number(ch),
            c if is_ident_start(c) => return self.lex_identifier(),
            other => {
                let span = self.span();
                self.report(
                    Diagnostic::error(format!("unexpected character '{other}'"), span)
                        .with_code("E0001"),
                );
                Error
            }
        };
        self.token(kind)
    }

    fn token(&self, kind: TokenKind) -> Token {
        let token = Token::new(kind, self.span());
        trace!(kind = %token.kind, span = %token.span, "token");
        token
    }

    fn token_with(&self, kind: TokenKind, payload: Payload) -> Token {
        Token {
            payload,
            ..self.token(kind)
        }
    }

    /// Span of the lexeme consumed since the current token started.
    fn span(&self) -> Span {
        Span::new(
            self.file,
            self.front_index as u32,
            self.index as u32,
            self.front,
            self.pos,
        )
    }

    fn report(&mut self, diag: Diagnostic) {
        self.compiler.report(diag);
    }

    fn eat_whitespace_and_comments(&mut self) {
        loop {
            while self.peek().is_some_and(char::is_whitespace) {
                self.next();
            }
            match (self.peek(), self.peek_nth(1)) {
                (Some('/'), Some('/')) => {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.next();
                    }
                }
                (Some('/'), Some('*')) => self.eat_block_comment(),
                _ => return,
            }
        }
    }

    fn eat_block_comment(&mut self) {
        let start_index = self.index;
        let start_pos = self.pos;
        self.next();
        self.next();
        let opening = Span::new(
            self.file,
            start_index as u32,
            self.index as u32,
            start_pos,
            self.pos,
        );

        let mut depth = 1usize;
        while depth > 0 {
            match (self.peek(), self.peek_nth(1)) {
                (None, _) => {
                    self.report(
                        Diagnostic::error("unterminated block comment", opening)
                            .with_code("E0002"),
                    );
                    return;
                }
                (Some('/'), Some('*')) => {
                    self.next();
                    self.next();
                    depth += 1;
                }
                (Some('*'), Some('/')) => {
                    self.next();
                    self.next();
                    depth -= 1;
                }
                _ => {
                    self.next();
                }
            }
        }
    }

    fn lex_identifier(&mut self) -> Token {
        while self.peek().is_some_and(is_ident_continue) {
            self.next();
        }
        let text = &self.source[self.front_index..self.index];
        match text {
            "true" => {
                return self.token_with(TokenKind::Literal, Payload::Literal(Literal::Bool(true)));
            }
            "false" => {
                return self.token_with(TokenKind::Literal, Payload::Literal(Literal::Bool(false)));
            }
            _ => {}
        }
        let symbol = self.compiler.intern(text);
        match self.compiler.keyword(symbol) {
            Some(kind) => self.token(kind),
            None => self.token_with(TokenKind::Identifier, Payload::Symbol(symbol)),
        }
    }

    /// `\pi`, `\lambda`, `\bot`, or a lone `\` (lambda).
    fn lex_command(&mut self) -> Token {
        if !self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
            return self.token(TokenKind::Lambda);
        }
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric()) {
            self.next();
        }
        let text = &self.source[self.front_index..self.index];
        let kind = self
            .compiler
            .interner()
            .get(text)
            .and_then(|symbol| self.compiler.keyword(symbol));
        match kind {
            Some(kind) => self.token(kind),
            None => {
                let span = self.span();
                self.report(
                    Diagnostic::error(format!("unknown command `{text}`"), span)
                        .with_code("E0003"),
                );
                self.token(TokenKind::Error)
            }
        }
    }

    fn lex_number(&mut self, first: char) -> Token {
        let radix = match (first, self.peek()) {
            ('0', Some('x' | 'X')) => 16,
            ('0', Some('o' | 'O')) => 8,
            ('0', Some('b' | 'B')) => 2,
            _ => 10,
        };

        if radix != 10 {
            self.next();
            let digits_start = self.index;
            while self.peek().is_some_and(|c| c.is_digit(radix) || c == '_') {
                self.next();
            }
            let digits: String = self.source[digits_start..self.index]
                .chars()
                .filter(|&c| c != '_')
                .collect();
            let value = if digits.is_empty() {
                let span = self.span();
                self.report(
                    Diagnostic::error("missing digits after integer base prefix", span)
                        .with_code("E0004"),
                );
                0
            } else {
                self.parse_int(&digits, radix)
            };
            let kind = self.lex_suffix(false);
            if kind.is_float() {
                return self.token_with(
                    TokenKind::Literal,
                    Payload::Literal(Literal::Float {
                        value: value as f64,
                        kind,
                    }),
                );
            }
            return self.int_token(value, kind);
        }

        self.eat_decimal_digits();
        let mut is_float = false;
        if self.peek() == Some('.') && self.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.next();
            self.eat_decimal_digits();
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let has_exponent = match self.peek_nth(1) {
                Some(c) if c.is_ascii_digit() => true,
                Some('+' | '-') => self.peek_nth(2).is_some_and(|c| c.is_ascii_digit()),
                _ => false,
            };
            if has_exponent {
                is_float = true;
                self.next();
                if matches!(self.peek(), Some('+' | '-')) {
                    self.next();
                }
                self.eat_decimal_digits();
            }
        }

        let text: String = self.source[self.front_index..self.index]
            .chars()
            .filter(|&c| c != '_')
            .collect();
        let kind = self.lex_suffix(is_float);

        if is_float || kind.is_float() {
            let value = text.parse::<f64>().unwrap_or(0.0);
            self.token_with(
                TokenKind::Literal,
                Payload::Literal(Literal::Float { value, kind }),
            )
        } else {
            let value = self.parse_int(&text, 10);
            self.int_token(value, kind)
        }
    }

    fn eat_decimal_digits(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '_') {
            self.next();
        }
    }

    fn parse_int(&mut self, digits: &str, radix: u32) -> u64 {
        match u64::from_str_radix(digits, radix) {
            Ok(value) => value,
            Err(_) => {
                let span = self.span();
                self.report(
                    Diagnostic::error("integer literal is too large", span).with_code("E0005"),
                );
                0
            }
        }
    }

    fn int_token(&self, value: u64, kind: NumKind) -> Token {
        self.token_with(
            TokenKind::Literal,
            Payload::Literal(Literal::Int { value, kind }),
        )
    }

    /// Optional type suffix directly after the digits.
    fn lex_suffix(&mut self, is_float: bool) -> NumKind {
        if !self.peek().is_some_and(is_ident_start) {
            return NumKind::Untyped;
        }
        let suffix_start = self.index;
        while self.peek().is_some_and(is_ident_continue) {
            self.next();
        }
        let suffix = &self.source[suffix_start..self.index];
        match NumKind::from_suffix(suffix) {
            Some(kind) if is_float && !kind.is_float() => {
                let span = self.span();
                self.report(
                    Diagnostic::error(
                        format!("integer suffix `{suffix}` on a float literal"),
                        span,
                    )
                    .with_code("E0006"),
                );
                NumKind::Untyped
            }
            Some(kind) => kind,
            None => {
                let span = self.span();
                self.report(
                    Diagnostic::error(format!("invalid literal suffix `{suffix}`"), span)
                        .with_code("E0006"),
                );
                NumKind::Untyped
            }
        }
    }

    fn lex_string(&mut self) -> Token {
        let opening = self.span();
        let mut text = String::new();
        loop {
            match self.peek() {
                Some('"') => {
                    self.next();
                    break;
                }
                None | Some('\n') => {
                    self.report(
                        Diagnostic::error("unterminated string literal", opening)
                            .with_code("E0007"),
                    );
                    break;
                }
                Some('\\') => {
                    if let Some(ch) = self.lex_escape() {
                        text.push(ch);
                    }
                }
                Some(ch) => {
                    self.next();
                    text.push(ch);
                }
            }
        }
        let symbol = self.compiler.intern(&text);
        self.token_with(TokenKind::Literal, Payload::Literal(Literal::Str(symbol)))
    }

    fn lex_char(&mut self) -> Token {
        let opening = self.span();
        let value = match self.peek() {
            Some('\'') => {
                self.next();
                let span = self.span();
                self.report(Diagnostic::error("empty character literal", span).with_code("E0008"));
                return self.char_token('\0');
            }
            Some('\\') => self.lex_escape(),
            Some(ch) if ch != '\n' => {
                self.next();
                Some(ch)
            }
            _ => None,
        };

        if self.accept('\'') {
            return self.char_token(value.unwrap_or('\0'));
        }

        // Either more than one character or no closing quote on this line.
        while self.peek().is_some_and(|c| c != '\'' && c != '\n') {
            self.next();
        }
        if self.accept('\'') {
            let span = self.span();
            self.report(
                Diagnostic::error("character literal may only contain one character", span)
                    .with_code("E0008"),
            );
        } else {
            self.report(
                Diagnostic::error("unterminated character literal", opening).with_code("E0007"),
            );
        }
        self.char_token(value.unwrap_or('\0'))
    }

    fn char_token(&self, ch: char) -> Token {
        self.token_with(TokenKind::Literal, Payload::Literal(Literal::Char(ch)))
    }

    /// Decode one escape sequence; the cursor sits on the backslash.
    fn lex_escape(&mut self) -> Option<char> {
        let start_index = self.index;
        let start_pos = self.pos;
        self.next();
        let decoded = match self.next() {
            Some('n') => Some('\n'),
            Some('t') => Some('\t'),
            Some('r') => Some('\r'),
            Some('0') => Some('\0'),
            Some('\\') => Some('\\'),
            Some('\'') => Some('\''),
            Some('"') => Some('"'),
            Some('u') if self.accept('{') => {
                let digits_start = self.index;
                while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                    self.next();
                }
                let digits = &self.source[digits_start..self.index];
                let value = u32::from_str_radix(digits, 16).ok().and_then(char::from_u32);
                if self.accept('}') { value } else { None }
            }
            _ => None,
        };
        if decoded.is_none() {
            let span = Span::new(
                self.file,
                start_index as u32,
                self.index as u32,
                start_pos,
                self.pos,
            );
            self.report(Diagnostic::error("invalid escape sequence", span).with_code("E0009"));
        }
        decoded
    }

    fn select(&mut self, ch: char, then: TokenKind, otherwise: TokenKind) -> TokenKind {
        if self.accept(ch) { then } else { otherwise }
    }

    fn accept(&mut self, ch: char) -> bool {
        if self.peek() == Some(ch) {
            self.next();
            true
        } else {
            false
        }
    }

    fn peek(&self) -> Option<char> {
        self.source[self.index..].chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.source[self.index..].chars().nth(n)
    }

    /// Consume one character and advance the line/column position.
    fn next(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.index += ch.len_utf8();
        if ch == '\n' {
            self.pos.line += 1;
            self.pos.col = 1;
        } else {
            self.pos.col += 1;
        }
        Some(ch)
    }
}

fn is_reserved(ch: char) -> bool {
    matches!(
        ch,
        'Π' | 'λ' | '⊥' | '→' | 'ᵁ' | 'ᴿ' | 'ᴬ' | 'ᴸ' | '‹' | '›' | '«' | '»'
    )
}

fn is_ident_start(ch: char) -> bool {
    (ch.is_alphabetic() || ch == '_') && !is_reserved(ch)
}

fn is_ident_continue(ch: char) -> bool {
    (ch.is_alphanumeric() || ch == '_') && !is_reserved(ch)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> (Vec<TokenKind>, usize) {
        let mut compiler = Compiler::new();
        let file = compiler.add_file("test.imp");
        let tokens = lex(&mut compiler, file, source);
        (
            tokens.iter().map(|t| t.kind).collect(),
            compiler.num_errors(),
        )
    }

    fn single_literal(source: &str) -> (Literal, usize) {
        let mut compiler = Compiler::new();
        let file = compiler.add_file("test.imp");
        let tokens = lex(&mut compiler, file, source);
        assert_eq!(tokens.len(), 2, "expected one token in {source:?}");
        (
            tokens[0].literal().expect("literal payload"),
            compiler.num_errors(),
        )
    }

    #[test]
    fn lexes_operators_greedily() {
        use TokenKind::*;
        let (kinds, errors) = kinds("++ + += -> -- - -= => == = != ! <<= << <= < >>= >> >= > && &= & || |= |");
        assert_eq!(errors, 0);
        assert_eq!(
            kinds,
            vec![
                Inc, Plus, PlusAssign, Arrow, Dec, Minus, MinusAssign, FatArrow, EqEq, Assign, Ne,
                Not, ShlAssign, Shl, Le, Lt, ShrAssign, Shr, Ge, Gt, AndAnd, AndAssign, And, OrOr,
                OrAssign, Or, Eof
            ]
        );
    }

    #[test]
    fn recognizes_keywords_and_commands() {
        use TokenKind::*;
        let (kinds, errors) = kinds("def fn let if else match for in while cn \\pi \\lambda \\bot \\ foo");
        assert_eq!(errors, 0);
        assert_eq!(
            kinds,
            vec![
                Def, Fn, Let, If, Else, Match, For, In, While, Cn, Pi, Lambda, Bottom, Lambda,
                Identifier, Eof
            ]
        );
    }

    #[test]
    fn recognizes_unicode_tokens() {
        use TokenKind::*;
        let (kinds, errors) = kinds("Π λ ⊥ → ᵁ ᴿ ᴬ ᴸ ‹ › « » Πx");
        assert_eq!(errors, 0);
        assert_eq!(
            kinds,
            vec![
                Pi, Lambda, Bottom, Arrow, QualifierU, QualifierR, QualifierA, QualifierL, LPack,
                RPack, LVariadic, RVariadic, Pi, Identifier, Eof
            ]
        );
    }

    #[test]
    fn unknown_command_is_an_error_token() {
        let (kinds, errors) = kinds("\\sigma x");
        assert_eq!(errors, 1);
        assert_eq!(
            kinds,
            vec![TokenKind::Error, TokenKind::Identifier, TokenKind::Eof]
        );
    }

    #[test]
    fn backslash_lambda_needs_a_space_before_its_binder() {
        let (glued, errors) = kinds("\\x: U");
        assert_eq!(errors, 1);
        assert_eq!(
            glued,
            vec![TokenKind::Error, TokenKind::Colon, TokenKind::Identifier, TokenKind::Eof]
        );

        let (spaced, errors) = kinds("\\ x: U");
        assert_eq!(errors, 0);
        assert_eq!(
            spaced,
            vec![
                TokenKind::Lambda,
                TokenKind::Identifier,
                TokenKind::Colon,
                TokenKind::Identifier,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn identifiers_are_interned() {
        let mut compiler = Compiler::new();
        let file = compiler.add_file("test.imp");
        let tokens = lex(&mut compiler, file, "foo bar foo _ größe");
        assert_eq!(tokens[0].symbol(), tokens[2].symbol());
        assert_ne!(tokens[0].symbol(), tokens[1].symbol());
        assert_eq!(tokens[3].symbol(), Some(compiler.intern("_")));
        assert_eq!(tokens[4].symbol(), Some(compiler.intern("größe")));
    }

    #[test]
    fn skips_nested_comments() {
        use TokenKind::*;
        let (kinds, errors) = kinds("a // line\n /* outer /* inner */ still */ b");
        assert_eq!(errors, 0);
        assert_eq!(kinds, vec![Identifier, Identifier, Eof]);
    }

    #[test]
    fn unterminated_comment_reported_at_opening() {
        let mut compiler = Compiler::new();
        let file = compiler.add_file("test.imp");
        let tokens = lex(&mut compiler, file, "x\n  /* never /* closed */");
        assert_eq!(tokens.len(), 2);
        assert_eq!(compiler.num_errors(), 1);
        let diag = &compiler.diagnostics()[0];
        assert_eq!(diag.code, Some("E0002"));
        assert_eq!(diag.span.front, Pos::new(2, 3));
        assert_eq!(diag.span.back, Pos::new(2, 5));
    }

    #[test]
    fn literals_with_suffixes() {
        assert_eq!(
            single_literal("42"),
            (
                Literal::Int {
                    value: 42,
                    kind: NumKind::Untyped
                },
                0
            )
        );
        assert_eq!(
            single_literal("1_000u16"),
            (
                Literal::Int {
                    value: 1000,
                    kind: NumKind::U16
                },
                0
            )
        );
        assert_eq!(
            single_literal("0xffu8"),
            (
                Literal::Int {
                    value: 255,
                    kind: NumKind::U8
                },
                0
            )
        );
        assert_eq!(
            single_literal("0b1010"),
            (
                Literal::Int {
                    value: 10,
                    kind: NumKind::Untyped
                },
                0
            )
        );
        assert_eq!(
            single_literal("0b1f32"),
            (
                Literal::Float {
                    value: 1.0,
                    kind: NumKind::F32
                },
                0
            )
        );
        assert_eq!(
            single_literal("0o17f64"),
            (
                Literal::Float {
                    value: 15.0,
                    kind: NumKind::F64
                },
                0
            )
        );
        assert_eq!(
            single_literal("2.5"),
            (
                Literal::Float {
                    value: 2.5,
                    kind: NumKind::Untyped
                },
                0
            )
        );
        assert_eq!(
            single_literal("1e3f32"),
            (
                Literal::Float {
                    value: 1000.0,
                    kind: NumKind::F32
                },
                0
            )
        );
        assert_eq!(
            single_literal("3f64"),
            (
                Literal::Float {
                    value: 3.0,
                    kind: NumKind::F64
                },
                0
            )
        );
    }

    #[test]
    fn bad_suffixes_are_reported() {
        let (_, errors) = single_literal("1.5i32");
        assert_eq!(errors, 1);
        let (_, errors) = single_literal("7q");
        assert_eq!(errors, 1);
        let (_, errors) = single_literal("99999999999999999999");
        assert_eq!(errors, 1);
    }

    #[test]
    fn dot_after_integer_is_not_a_fraction() {
        let (kinds, errors) = kinds("1.foo");
        assert_eq!(errors, 0);
        assert_eq!(
            kinds,
            vec![
                TokenKind::Literal,
                TokenKind::Dot,
                TokenKind::Identifier,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn char_and_string_escapes() {
        assert_eq!(single_literal("'a'"), (Literal::Char('a'), 0));
        assert_eq!(single_literal("'\\n'"), (Literal::Char('\n'), 0));
        assert_eq!(single_literal("'\\u{3bb}'"), (Literal::Char('λ'), 0));
        assert_eq!(single_literal("'ab'").1, 1);
        assert_eq!(single_literal("''").1, 1);

        let mut compiler = Compiler::new();
        let file = compiler.add_file("test.imp");
        let tokens = lex(&mut compiler, file, "\"a\\tb\\\"c\"");
        assert_eq!(compiler.num_errors(), 0);
        assert_eq!(
            tokens[0].literal(),
            Some(Literal::Str(compiler.intern("a\tb\"c")))
        );
    }

    #[test]
    fn unterminated_string_reported_at_opening_and_recovers() {
        let mut compiler = Compiler::new();
        let file = compiler.add_file("test.imp");
        let tokens = lex(&mut compiler, file, "x = \"oops\ny");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Identifier,
                TokenKind::Assign,
                TokenKind::Literal,
                TokenKind::Identifier,
                TokenKind::Eof
            ]
        );
        assert_eq!(compiler.num_errors(), 1);
        let diag = &compiler.diagnostics()[0];
        assert_eq!(diag.code, Some("E0007"));
        assert_eq!(diag.span.front, Pos::new(1, 5));
        assert_eq!(diag.span.back, Pos::new(1, 6));
    }

    #[test]
    fn spans_cover_lexemes_and_count_chars() {
        let mut compiler = Compiler::new();
        let file = compiler.add_file("test.imp");
        let source = "λx →\n  ᵁfoo";
        let tokens = lex(&mut compiler, file, source);
        let texts: Vec<_> = tokens.iter().map(|t| t.span.text(source)).collect();
        assert_eq!(texts, vec!["λ", "x", "→", "ᵁ", "foo", ""]);
        assert_eq!(tokens[2].span.front, Pos::new(1, 4));
        assert_eq!(tokens[2].span.back, Pos::new(1, 5));
        assert_eq!(tokens[4].span.front, Pos::new(2, 4));
        assert_eq!(tokens[4].span.back, Pos::new(2, 7));
    }

    #[test]
    fn eof_repeats_forever() {
        let mut compiler = Compiler::new();
        let file = compiler.add_file("test.imp");
        let mut lexer = Lexer::new(&mut compiler, file, "x");
        assert!(lexer.lex().isa(TokenKind::Identifier));
        for _ in 0..3 {
            assert!(lexer.lex().isa(TokenKind::Eof));
        }
    }

    #[test]
    fn unexpected_character_yields_error_token() {
        let (kinds, errors) = kinds("a $ b");
        assert_eq!(errors, 1);
        assert_eq!(
            kinds,
            vec![
                TokenKind::Identifier,
                TokenKind::Error,
                TokenKind::Identifier,
                TokenKind::Eof
            ]
        );
    }
}
