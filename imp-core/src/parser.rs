//! Recursive-descent parser.
//!
//! The parser pulls tokens from the [`Lexer`] through a two-token lookahead
//! window and never backtracks. Malformed input is reported through the
//! compiler context and replaced by `Error` nodes; parsing always runs to the
//! end of the file.

use tracing::debug;

use crate::ast::{
    BlockExpr, Decl, DeclId, DeclKind, Decls, Expr, ExprKind, Id, IdExpr, InfixOp, Item, MatchArm,
    Module, PostfixOp, Prec, PrefixOp, Ptrn, PtrnKind, Qualifier, Slot, Stmnt, StmntKind,
    TupleElem,
};
use crate::compiler::Compiler;
use crate::diagnostic::Diagnostic;
use crate::lexer::Lexer;
use crate::span::{FileId, Pos, Span};
use crate::symbol::WILDCARD;
use crate::token::{Token, TokenKind};

const LOOKAHEAD: usize = 2;

pub struct Parser<'src, 'c> {
    lexer: Lexer<'src, 'c>,
    ahead: [Token; LOOKAHEAD],
    /// Span and kind of the last consumed token.
    prev: Span,
    prev_kind: TokenKind,
    /// Start offset of the token the last syntax error was reported at.
    last_error: Option<u32>,
    decls: Decls,
}

impl<'src, 'c> Parser<'src, 'c> {
    pub fn new(compiler: &'c mut Compiler, file: FileId, source: &'src str) -> Self {
        let mut lexer = Lexer::new(compiler, file, source);
        let first = next_token(&mut lexer);
        let second = next_token(&mut lexer);
        Parser {
            lexer,
            ahead: [first, second],
            prev: Span::new(file, 0, 0, Pos::START, Pos::START),
            prev_kind: TokenKind::Eof,
            last_error: None,
            decls: Decls::new(),
        }
    }

    /// Parse statements until end of file.
    pub fn parse_module(mut self) -> Module {
        let start = self.prev;
        let mut stmnts = Vec::new();
        while !self.at(TokenKind::Eof) {
            if self.accept(TokenKind::Semi) {
                continue;
            }
            if !starts_stmnt(self.kind()) {
                self.unexpected("statement", "module");
                self.bump();
                continue;
            }
            let errors = self.num_errors();
            stmnts.push(self.parse_stmnt("module"));
            if self.num_errors() > errors
                && !matches!(self.prev_kind, TokenKind::Semi | TokenKind::RBrace)
            {
                self.synchronize();
            }
        }
        let span = start.merge(self.ahead[0].span);
        debug!(stmnts = stmnts.len(), decls = self.decls.len(), "parsed module");
        Module {
            span,
            file: self.lexer.file(),
            stmnts,
            decls: self.decls,
            bound: false,
        }
    }

    // -----------------------------------------------------------------
    // Token window
    // -----------------------------------------------------------------

    fn kind(&self) -> TokenKind {
        self.ahead[0].kind
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.ahead[0].isa(kind)
    }

    fn bump(&mut self) -> Token {
        let token = self.ahead[0];
        self.ahead[0] = self.ahead[1];
        self.ahead[1] = next_token(&mut self.lexer);
        self.prev = token.span;
        self.prev_kind = token.kind;
        token
    }

    /// Start span of the production beginning at the current token.
    fn track(&self) -> Span {
        self.ahead[0].span
    }

    /// Span from `start` to the end of the last consumed token.
    fn finish(&self, start: Span) -> Span {
        if self.prev.end < start.start {
            return Span {
                end: start.start,
                back: start.front,
                ..start
            };
        }
        Span {
            end: self.prev.end,
            back: self.prev.back,
            ..start
        }
    }

    fn accept(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            return true;
        }
        false
    }

    /// Consume `kind` or report it as missing. Never consumes on mismatch.
    fn expect(&mut self, kind: TokenKind, ctx: &str) -> bool {
        if self.accept(kind) {
            return true;
        }
        let what = match kind {
            TokenKind::Identifier | TokenKind::Literal | TokenKind::Eof => kind.to_string(),
            _ => format!("'{kind}'"),
        };
        self.error_at_ahead("E0101", &what, ctx);
        false
    }

    fn unexpected(&mut self, what: &str, ctx: &str) {
        let code = match what {
            "expression" => "E0102",
            "pattern" => "E0103",
            _ => "E0104",
        };
        self.error_at_ahead(code, what, ctx);
    }

    fn error_at_ahead(&mut self, code: &'static str, what: &str, ctx: &str) {
        let token = self.ahead[0];
        // One complaint per token is enough.
        if self.last_error == Some(token.span.start) {
            return;
        }
        self.last_error = Some(token.span.start);
        let message = format!(
            "expected {what}, got {} while parsing {ctx}",
            self.describe(&token)
        );
        self.lexer
            .compiler
            .report(Diagnostic::error(message, token.span).with_code(code));
    }

    fn describe(&self, token: &Token) -> String {
        match token.kind {
            TokenKind::Identifier | TokenKind::Literal => {
                format!("{} '{}'", token.kind, token.span.text(self.lexer.source()))
            }
            TokenKind::Eof => token.kind.to_string(),
            kind => format!("'{kind}'"),
        }
    }

    fn num_errors(&self) -> usize {
        self.lexer.compiler.num_errors()
    }

    /// Skip to the next plausible statement boundary at nesting depth zero.
    fn synchronize(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.kind() {
                TokenKind::Eof => return,
                TokenKind::Semi if depth == 0 => {
                    self.bump();
                    return;
                }
                TokenKind::Let | TokenKind::Def | TokenKind::Fn if depth == 0 => return,
                TokenKind::LBrace | TokenKind::LParen | TokenKind::LBracket => depth += 1,
                TokenKind::RBrace | TokenKind::RParen | TokenKind::RBracket => {
                    depth = depth.saturating_sub(1)
                }
                _ => {}
            }
            self.bump();
        }
    }

    fn new_decl(&mut self, id: Id, kind: DeclKind) -> DeclId {
        self.decls.push(Decl {
            symbol: id.symbol,
            span: id.span,
            kind,
        })
    }

    fn parse_id(&mut self, ctx: &str) -> Id {
        let token = self.ahead[0];
        if let (TokenKind::Identifier, Some(symbol)) = (token.kind, token.symbol()) {
            self.bump();
            return Id {
                symbol,
                span: token.span,
            };
        }
        self.expect(TokenKind::Identifier, ctx);
        Id {
            symbol: self.lexer.compiler.intern(WILDCARD),
            span: self.finish(token.span),
        }
    }

    // -----------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------

    /// A statement outside a block body, where every expression is a
    /// statement.
    fn parse_stmnt(&mut self, ctx: &str) -> Stmnt {
        match self.kind() {
            TokenKind::Let => self.parse_let(),
            TokenKind::Def | TokenKind::Fn => self.parse_item_stmnt(),
            _ => {
                let start = self.track();
                let expr = self.parse_stmnt_expr(ctx);
                if !self.accept(TokenKind::Semi) && !expr.is_stmnt_like() {
                    self.expect(TokenKind::Semi, "expression statement");
                }
                Stmnt {
                    span: self.finish(start),
                    kind: StmntKind::Expr(expr),
                }
            }
        }
    }

    fn parse_let(&mut self) -> Stmnt {
        let start = self.track();
        self.bump();
        let ptrn = self.parse_ptrn(false, "let statement");
        self.expect(TokenKind::Assign, "let statement");
        let init = self.parse_expr("initialization of let statement");
        self.expect(TokenKind::Semi, "let statement");
        Stmnt {
            span: self.finish(start),
            kind: StmntKind::Let { ptrn, init },
        }
    }

    fn parse_item_stmnt(&mut self) -> Stmnt {
        let item = if self.at(TokenKind::Def) {
            self.parse_def()
        } else {
            self.parse_fn()
        };
        debug!(
            item = %self.lexer.compiler.name(item.id.symbol),
            span = %item.span,
            "parsed item"
        );
        Stmnt {
            span: item.span,
            kind: StmntKind::Item(item),
        }
    }

    fn parse_def(&mut self) -> Item {
        let start = self.track();
        self.bump();
        let id = self.parse_id("def item");
        let decl = self.new_decl(id, DeclKind::Item);
        self.expect(TokenKind::Assign, "def item");
        let expr = self.parse_expr("def item");
        self.expect(TokenKind::Semi, "def item");
        Item {
            span: self.finish(start),
            id,
            expr,
            decl,
            value: Slot::default(),
        }
    }

    /// `fn f ptrn -> ret { body }` is an item bound to a lambda.
    fn parse_fn(&mut self) -> Item {
        let start = self.track();
        self.bump();
        let id = self.parse_id("fn item");
        let decl = self.new_decl(id, DeclKind::Item);
        let lambda_start = self.track();
        let domain = self.parse_ptrn(true, "parameter of fn item");
        let codomain = self.parse_codomain("fn item");
        let body = self.parse_block("body of fn item");
        let expr = Expr::new(
            self.finish(lambda_start),
            ExprKind::Lambda {
                domain: Box::new(domain),
                codomain: Box::new(codomain),
                body: Box::new(body),
            },
        );
        Item {
            span: self.finish(start),
            id,
            expr,
            decl,
            value: Slot::default(),
        }
    }

    // -----------------------------------------------------------------
    // Patterns
    // -----------------------------------------------------------------

    fn parse_ptrn(&mut self, type_mandatory: bool, ctx: &str) -> Ptrn {
        let start = self.track();
        let kind = match self.kind() {
            TokenKind::Identifier => {
                let id = self.parse_id(ctx);
                let decl = self.new_decl(id, DeclKind::Binding);
                PtrnKind::Id { id, decl }
            }
            TokenKind::LParen => {
                self.bump();
                let mut elems = Vec::new();
                while !self.at(TokenKind::RParen) && !self.at(TokenKind::Eof) {
                    let elem = self.parse_ptrn(type_mandatory, "tuple pattern");
                    let failed = elem.is_error();
                    elems.push(elem);
                    if failed || !(self.accept(TokenKind::Comma) || self.accept(TokenKind::Semi)) {
                        break;
                    }
                }
                self.expect(TokenKind::RParen, "tuple pattern");
                PtrnKind::Tuple(elems)
            }
            _ => {
                self.unexpected("pattern", ctx);
                return Ptrn::error(self.finish(start));
            }
        };
        let ty = if self.accept(TokenKind::Colon) {
            Some(Box::new(self.parse_expr_prec(Prec::OrOr, "type ascription")))
        } else {
            None
        };
        Ptrn {
            span: self.finish(start),
            kind,
            ty,
            type_mandatory,
        }
    }

    // -----------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------

    /// An expression in statement position: statement-like forms are taken
    /// on their own and never continue into an operator expression.
    fn parse_stmnt_expr(&mut self, ctx: &str) -> Expr {
        match self.kind() {
            TokenKind::LBrace => self.parse_block(ctx),
            TokenKind::If => self.parse_if(),
            TokenKind::Match => self.parse_match(),
            TokenKind::For => self.parse_for(),
            TokenKind::While => self.parse_while(),
            _ => self.parse_expr(ctx),
        }
    }

    pub fn parse_expr(&mut self, ctx: &str) -> Expr {
        self.parse_expr_prec(Prec::Bottom, ctx)
    }

    /// Precedence climbing: accepts infix operators binding at least as
    /// strongly as `min`.
    fn parse_expr_prec(&mut self, min: Prec, ctx: &str) -> Expr {
        let start = self.track();
        let mut lhs = match PrefixOp::from_token(self.kind()) {
            Some(op) => {
                self.bump();
                let rhs = self.parse_expr_prec(Prec::Prefix, ctx);
                Expr::new(
                    self.finish(start),
                    ExprKind::Prefix {
                        op,
                        rhs: Box::new(rhs),
                    },
                )
            }
            None => self.parse_primary(ctx),
        };
        if lhs.is_error() {
            return lhs;
        }

        loop {
            let kind = self.kind();
            if let Some(op) = PostfixOp::from_token(kind) {
                self.bump();
                lhs = Expr::new(
                    self.finish(start),
                    ExprKind::Postfix {
                        lhs: Box::new(lhs),
                        op,
                    },
                );
                continue;
            }
            match kind {
                TokenKind::LParen => {
                    let arg = self.parse_tuple();
                    lhs = self.app(start, lhs, arg, false);
                    continue;
                }
                TokenKind::Not if self.ahead[1].isa(TokenKind::LParen) => {
                    self.bump();
                    let arg = self.parse_tuple();
                    lhs = self.app(start, lhs, arg, true);
                    continue;
                }
                TokenKind::Dot => {
                    self.bump();
                    let field = self.parse_id("field expression");
                    lhs = Expr::new(
                        self.finish(start),
                        ExprKind::Field {
                            lhs: Box::new(lhs),
                            field,
                        },
                    );
                    continue;
                }
                _ => {}
            }

            let Some(op) = InfixOp::from_token(kind) else {
                break;
            };
            if op.prec() < min {
                break;
            }
            self.bump();
            let rhs_min = if op.is_right_assoc() {
                op.prec()
            } else {
                op.prec().next()
            };
            let rhs = self.parse_expr_prec(rhs_min, "right-hand side of binary expression");
            lhs = Expr::new(
                self.finish(start),
                ExprKind::Infix {
                    lhs: Box::new(lhs),
                    op,
                    rhs: Box::new(rhs),
                },
            );
        }
        lhs
    }

    fn app(&self, start: Span, callee: Expr, arg: Expr, cps: bool) -> Expr {
        Expr::new(
            self.finish(start),
            ExprKind::App {
                callee: Box::new(callee),
                arg: Box::new(arg),
                cps,
            },
        )
    }

    fn parse_primary(&mut self, ctx: &str) -> Expr {
        let token = self.ahead[0];
        match token.kind {
            TokenKind::Identifier => {
                let id = self.parse_id(ctx);
                Expr::new(
                    id.span,
                    ExprKind::Id(IdExpr {
                        id,
                        decl: Slot::default(),
                    }),
                )
            }
            TokenKind::Literal => {
                self.bump();
                match token.literal() {
                    Some(literal) => Expr::new(token.span, ExprKind::Literal(literal)),
                    None => Expr::error(token.span),
                }
            }
            TokenKind::LParen => self.parse_tuple(),
            TokenKind::LBracket => self.parse_sigma(),
            TokenKind::LBrace => self.parse_block(ctx),
            TokenKind::If => self.parse_if(),
            TokenKind::Match => self.parse_match(),
            TokenKind::For => self.parse_for(),
            TokenKind::While => self.parse_while(),
            TokenKind::Lambda => self.parse_lambda(),
            TokenKind::Pi => self.parse_forall(),
            TokenKind::Cn => self.parse_cn(),
            TokenKind::LPack => self.parse_pack(),
            TokenKind::LVariadic => self.parse_variadic(),
            TokenKind::QualifierU
            | TokenKind::QualifierR
            | TokenKind::QualifierA
            | TokenKind::QualifierL => {
                self.bump();
                match Qualifier::from_token(token.kind) {
                    Some(q) => Expr::new(token.span, ExprKind::Qualifier(q)),
                    None => Expr::error(token.span),
                }
            }
            TokenKind::Bottom => {
                self.bump();
                Expr::new(token.span, ExprKind::Bottom)
            }
            TokenKind::Question => {
                self.bump();
                Expr::new(token.span, ExprKind::Unknown)
            }
            _ => {
                self.unexpected("expression", ctx);
                Expr::error(self.finish(token.span))
            }
        }
    }

    /// `( elems )`. A single unnamed element without separator is just that
    /// element, widened to the parentheses.
    fn parse_tuple(&mut self) -> Expr {
        let start = self.track();
        self.bump();
        let mut elems = Vec::new();
        let mut separated = false;
        while !self.at(TokenKind::RParen) && !self.at(TokenKind::Eof) {
            let name = if self.at(TokenKind::Identifier) && self.ahead[1].isa(TokenKind::Assign)
            {
                let id = self.parse_id("tuple element");
                self.bump();
                Some(id)
            } else {
                None
            };
            let expr = self.parse_expr("tuple element");
            let failed = expr.is_error();
            elems.push(TupleElem { name, expr });
            if failed || !(self.accept(TokenKind::Comma) || self.accept(TokenKind::Semi)) {
                break;
            }
            separated = true;
        }
        self.expect(TokenKind::RParen, "tuple");
        let span = self.finish(start);
        if elems.len() == 1 && !separated && elems[0].name.is_none() {
            if let Some(elem) = elems.pop() {
                return Expr { span, ..elem.expr };
            }
        }
        Expr::new(span, ExprKind::Tuple(elems))
    }

    /// `[ x: T, U ]`. Elements without a binder bind the wildcard.
    fn parse_sigma(&mut self) -> Expr {
        let start = self.track();
        self.bump();
        let mut elems = Vec::new();
        while !self.at(TokenKind::RBracket) && !self.at(TokenKind::Eof) {
            let elem_start = self.track();
            let elem = if self.at(TokenKind::Identifier) && self.ahead[1].isa(TokenKind::Colon) {
                let id = self.parse_id("sigma element");
                let decl = self.new_decl(id, DeclKind::Binding);
                self.bump();
                let ty = self.parse_expr("sigma element type");
                Ptrn {
                    span: self.finish(elem_start),
                    kind: PtrnKind::Id { id, decl },
                    ty: Some(Box::new(ty)),
                    type_mandatory: true,
                }
            } else {
                let ty = self.parse_expr("sigma element");
                let id = Id {
                    symbol: self.lexer.compiler.intern(WILDCARD),
                    span: ty.span,
                };
                let decl = self.new_decl(id, DeclKind::Binding);
                Ptrn {
                    span: ty.span,
                    kind: PtrnKind::Id { id, decl },
                    ty: Some(Box::new(ty)),
                    type_mandatory: true,
                }
            };
            let failed = elem.ty.as_deref().is_some_and(Expr::is_error);
            elems.push(elem);
            if failed || !(self.accept(TokenKind::Comma) || self.accept(TokenKind::Semi)) {
                break;
            }
        }
        self.expect(TokenKind::RBracket, "sigma type");
        Expr::new(self.finish(start), ExprKind::Sigma(elems))
    }

    /// `{ stmnts... value? }`
    ///
    /// An element is a statement when followed by `;`, or when it is
    /// statement-like and not directly followed by `}`. Otherwise it is the
    /// value of the block.
    fn parse_block(&mut self, ctx: &str) -> Expr {
        let start = self.track();
        if !self.expect(TokenKind::LBrace, ctx) {
            return Expr::error(self.finish(start));
        }
        let mut stmnts = Vec::new();
        let value = loop {
            match self.kind() {
                TokenKind::Semi => {
                    self.bump();
                }
                TokenKind::RBrace => break Expr::empty_tuple(self.ahead[0].span),
                TokenKind::Eof => break Expr::empty_tuple(self.ahead[0].span),
                TokenKind::Let => stmnts.push(self.parse_let()),
                TokenKind::Def | TokenKind::Fn => stmnts.push(self.parse_item_stmnt()),
                kind if !starts_expr(kind) => {
                    self.unexpected("statement or expression", "block");
                    self.bump();
                }
                _ => {
                    let elem_start = self.track();
                    let expr = self.parse_stmnt_expr("block");
                    if self.accept(TokenKind::Semi) {
                        stmnts.push(Stmnt {
                            span: self.finish(elem_start),
                            kind: StmntKind::Expr(expr),
                        });
                        continue;
                    }
                    if self.at(TokenKind::RBrace) {
                        break expr;
                    }
                    if !expr.is_stmnt_like() {
                        self.expect(TokenKind::RBrace, "block");
                    }
                    stmnts.push(Stmnt {
                        span: expr.span,
                        kind: StmntKind::Expr(expr),
                    });
                }
            }
        };
        self.expect(TokenKind::RBrace, "block");
        Expr::new(
            self.finish(start),
            ExprKind::Block(BlockExpr {
                stmnts,
                expr: Box::new(value),
            }),
        )
    }

    fn parse_if(&mut self) -> Expr {
        let start = self.track();
        self.bump();
        let cond = self.parse_expr("condition of if expression");
        let then_expr = self.parse_block("consequence of if expression");
        let else_expr = if self.accept(TokenKind::Else) {
            if self.at(TokenKind::If) {
                self.parse_if()
            } else {
                self.parse_block("alternative of if expression")
            }
        } else {
            Expr::empty_block(self.prev.end_point())
        };
        Expr::new(
            self.finish(start),
            ExprKind::If {
                cond: Box::new(cond),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            },
        )
    }

    fn parse_match(&mut self) -> Expr {
        let start = self.track();
        self.bump();
        let scrutinee = self.parse_expr("scrutinee of match expression");
        let mut arms = Vec::new();
        if self.expect(TokenKind::LBrace, "match expression") {
            while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
                let arm_start = self.track();
                let ptrn = self.parse_ptrn(false, "match arm");
                self.expect(TokenKind::FatArrow, "match arm");
                let body = self.parse_expr("match arm");
                let consumed = self.prev.end > arm_start.start;
                arms.push(MatchArm {
                    span: self.finish(arm_start),
                    ptrn,
                    body,
                });
                if !(self.accept(TokenKind::Comma) || self.accept(TokenKind::Semi)) && !consumed {
                    self.bump();
                }
            }
            self.expect(TokenKind::RBrace, "match expression");
        }
        Expr::new(
            self.finish(start),
            ExprKind::Match {
                scrutinee: Box::new(scrutinee),
                arms,
            },
        )
    }

    fn parse_for(&mut self) -> Expr {
        let start = self.track();
        self.bump();
        let ptrn = self.parse_ptrn(false, "for loop");
        self.expect(TokenKind::In, "for loop");
        let iter = self.parse_expr("iterable of for loop");
        let body = self.parse_block("body of for loop");
        Expr::new(
            self.finish(start),
            ExprKind::For {
                ptrn: Box::new(ptrn),
                iter: Box::new(iter),
                body: Box::new(body),
            },
        )
    }

    fn parse_while(&mut self) -> Expr {
        let start = self.track();
        self.bump();
        let cond = self.parse_expr("condition of while loop");
        let body = self.parse_block("body of while loop");
        Expr::new(
            self.finish(start),
            ExprKind::While {
                cond: Box::new(cond),
                body: Box::new(body),
            },
        )
    }

    /// `-> T`, or an unknown type when the arrow is absent.
    fn parse_codomain(&mut self, ctx: &str) -> Expr {
        if self.accept(TokenKind::Arrow) {
            return self.parse_expr_prec(Prec::OrOr, ctx);
        }
        Expr::new(self.prev.end_point(), ExprKind::Unknown)
    }

    fn parse_lambda(&mut self) -> Expr {
        let start = self.track();
        self.bump();
        let domain = self.parse_ptrn(true, "parameter of lambda");
        let codomain = self.parse_codomain("codomain of lambda");
        let body = self.parse_block("body of lambda");
        Expr::new(
            self.finish(start),
            ExprKind::Lambda {
                domain: Box::new(domain),
                codomain: Box::new(codomain),
                body: Box::new(body),
            },
        )
    }

    fn parse_forall(&mut self) -> Expr {
        let start = self.track();
        self.bump();
        let domain = self.parse_ptrn(true, "domain of pi type");
        self.expect(TokenKind::Arrow, "pi type");
        let codomain = self.parse_expr("codomain of pi type");
        Expr::new(
            self.finish(start),
            ExprKind::Forall {
                domain: Box::new(domain),
                codomain: Box::new(codomain),
            },
        )
    }

    /// `cn T` is a function type that never returns.
    fn parse_cn(&mut self) -> Expr {
        let start = self.track();
        self.bump();
        let domain = self.parse_ptrn(true, "continuation type");
        let codomain = Expr::new(self.prev.end_point(), ExprKind::Bottom);
        Expr::new(
            self.finish(start),
            ExprKind::Forall {
                domain: Box::new(domain),
                codomain: Box::new(codomain),
            },
        )
    }

    fn parse_pack(&mut self) -> Expr {
        let start = self.track();
        self.bump();
        let domain = self.parse_ptrn(false, "pack");
        self.expect(TokenKind::Semi, "pack");
        let body = self.parse_expr("body of pack");
        self.expect(TokenKind::RPack, "pack");
        Expr::new(
            self.finish(start),
            ExprKind::Pack {
                domain: Box::new(domain),
                body: Box::new(body),
            },
        )
    }

    fn parse_variadic(&mut self) -> Expr {
        let start = self.track();
        self.bump();
        let domain = self.parse_ptrn(false, "variadic");
        self.expect(TokenKind::Semi, "variadic");
        let body = self.parse_expr("body of variadic");
        self.expect(TokenKind::RVariadic, "variadic");
        Expr::new(
            self.finish(start),
            ExprKind::Variadic {
                domain: Box::new(domain),
                body: Box::new(body),
            },
        )
    }
}

/// Error tokens were already reported by the lexer.
fn next_token(lexer: &mut Lexer<'_, '_>) -> Token {
    loop {
        let token = lexer.lex();
        if !token.isa(TokenKind::Error) {
            return token;
        }
    }
}

fn starts_stmnt(kind: TokenKind) -> bool {
    matches!(kind, TokenKind::Let | TokenKind::Def | TokenKind::Fn) || starts_expr(kind)
}

fn starts_expr(kind: TokenKind) -> bool {
    use TokenKind::*;
    matches!(
        kind,
        Identifier
            | Literal
            | LParen
            | LBracket
            | LBrace
            | LPack
            | LVariadic
            | If
            | Match
            | For
            | While
            | Lambda
            | Pi
            | Cn
            | Bottom
            | Question
            | QualifierU
            | QualifierR
            | QualifierA
            | QualifierL
    ) || PrefixOp::from_token(kind).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Node;
    use crate::token::{Literal, NumKind};

    fn parse(source: &str) -> (Module, Compiler) {
        let mut compiler = Compiler::new();
        let module = compiler.parse_source("test.imp", source);
        (module, compiler)
    }

    fn parse_ok(source: &str) -> Module {
        let (module, compiler) = parse(source);
        assert_eq!(
            compiler.num_errors(),
            0,
            "unexpected errors: {:?}",
            compiler.diagnostics()
        );
        module
    }

    /// The expression bound by `def x = <source>;`.
    fn def_expr(source: &str) -> Expr {
        let module = parse_ok(&format!("def x = {source};"));
        module.items().next().expect("item").expr.clone()
    }

    fn block_of(expr: &Expr) -> &BlockExpr {
        match &expr.kind {
            ExprKind::Block(block) => block,
            other => panic!("expected block, got {other:?}"),
        }
    }

    fn int(expr: &Expr) -> u64 {
        match expr.kind {
            ExprKind::Literal(Literal::Int { value, .. }) => value,
            ref other => panic!("expected integer literal, got {other:?}"),
        }
    }

    #[test]
    fn spans_cover_exactly_their_text() {
        let source = "def x = (a + b) * c;\nfn f(y: i32) -> i32 { let z = y; z }\n";
        let module = parse_ok(source);

        let item = module.items().next().expect("item");
        assert_eq!(item.span.text(source), "def x = (a + b) * c;");
        assert_eq!(item.expr.span.text(source), "(a + b) * c");

        let mut checked = 0;
        module.walk(&mut |node| {
            let span = node.span();
            if span.is_empty() || node.is_error() {
                return;
            }
            let text = span.text(source);
            assert_eq!(text, text.trim(), "span {span} has ragged edges");
            assert!(!text.is_empty());
            checked += 1;
        });
        assert!(checked > 15);

        let lambda = &module.items().nth(1).expect("fn").expr;
        assert_eq!(lambda.span.text(source), "(y: i32) -> i32 { let z = y; z }");
    }

    #[test]
    fn parenthesised_expression_is_widened() {
        let expr = def_expr("(a)");
        assert!(matches!(expr.kind, ExprKind::Id(_)));
        assert_eq!(expr.span.front.col, 9);
        assert_eq!(expr.span.back.col, 12);
        assert_eq!(def_expr("()").kind, ExprKind::Tuple(Vec::new()));
    }

    #[test]
    fn empty_block_value_sits_at_closing_brace() {
        let source = "def x = { };";
        let module = parse_ok(source);
        let expr = &module.items().next().expect("item").expr;
        let block = block_of(expr);
        assert!(block.stmnts.is_empty());
        assert_eq!(block.expr.kind, ExprKind::Tuple(Vec::new()));
        assert_eq!(block.expr.span.text(source), "}");
    }

    #[test]
    fn statement_like_form_followed_by_expression_is_a_statement() {
        let expr = def_expr("{ if true {1} else {2} f(x) }");
        let block = block_of(&expr);
        assert_eq!(block.stmnts.len(), 1);
        assert!(matches!(
            &block.stmnts[0].kind,
            StmntKind::Expr(Expr { kind: ExprKind::If { .. }, .. })
        ));
        assert!(matches!(block.expr.kind, ExprKind::App { cps: false, .. }));
    }

    #[test]
    fn statement_like_form_before_closing_brace_is_the_value() {
        let expr = def_expr("{ if c {1} else {2} }");
        let block = block_of(&expr);
        assert!(block.stmnts.is_empty());
        assert!(matches!(block.expr.kind, ExprKind::If { .. }));
    }

    #[test]
    fn semicolons_turn_expressions_into_statements() {
        let expr = def_expr("{ a; ; b }");
        let block = block_of(&expr);
        assert_eq!(block.stmnts.len(), 1);
        assert!(matches!(block.expr.kind, ExprKind::Id(_)));

        let expr = def_expr("{ a; b; }");
        let block = block_of(&expr);
        assert_eq!(block.stmnts.len(), 2);
        assert_eq!(block.expr.kind, ExprKind::Tuple(Vec::new()));
    }

    #[test]
    fn missing_else_is_an_empty_block() {
        let source = "def x = if c { 1 };";
        let module = parse_ok(source);
        let expr = &module.items().next().expect("item").expr;
        let ExprKind::If { else_expr, .. } = &expr.kind else {
            panic!("expected if");
        };
        let block = block_of(else_expr);
        assert!(block.stmnts.is_empty());
        assert!(else_expr.span.is_empty());
        assert_eq!(else_expr.span.start as usize, source.find('}').expect("brace") + 1);
    }

    #[test]
    fn else_if_chains() {
        let expr = def_expr("if a { 1 } else if b { 2 } else { 3 }");
        let ExprKind::If { else_expr, .. } = &expr.kind else {
            panic!("expected if");
        };
        assert!(matches!(else_expr.kind, ExprKind::If { .. }));
    }

    #[test]
    fn binary_operators_follow_precedence() {
        let expr = def_expr("a + b * c");
        let ExprKind::Infix { op, rhs, .. } = &expr.kind else {
            panic!("expected infix");
        };
        assert_eq!(*op, InfixOp::Add);
        assert!(matches!(rhs.kind, ExprKind::Infix { op: InfixOp::Mul, .. }));

        let expr = def_expr("a - b - c");
        let ExprKind::Infix { lhs, .. } = &expr.kind else {
            panic!("expected infix");
        };
        assert!(matches!(lhs.kind, ExprKind::Infix { op: InfixOp::Sub, .. }));

        let expr = def_expr("a = b += c");
        let ExprKind::Infix { op, rhs, .. } = &expr.kind else {
            panic!("expected infix");
        };
        assert_eq!(*op, InfixOp::Assign);
        assert!(matches!(rhs.kind, ExprKind::Infix { op: InfixOp::AddAssign, .. }));

        let expr = def_expr("a < b && c || d");
        assert!(matches!(expr.kind, ExprKind::Infix { op: InfixOp::OrOr, .. }));
    }

    #[test]
    fn prefix_and_postfix_share_lexemes() {
        let expr = def_expr("-a.b");
        let ExprKind::Prefix { op, rhs } = &expr.kind else {
            panic!("expected prefix");
        };
        assert_eq!(*op, PrefixOp::Minus);
        assert!(matches!(rhs.kind, ExprKind::Field { .. }));

        let expr = def_expr("a - -b");
        let ExprKind::Infix { rhs, .. } = &expr.kind else {
            panic!("expected infix");
        };
        assert!(matches!(rhs.kind, ExprKind::Prefix { op: PrefixOp::Minus, .. }));

        let expr = def_expr("++a--");
        let ExprKind::Prefix { op, rhs } = &expr.kind else {
            panic!("expected prefix");
        };
        assert_eq!(*op, PrefixOp::Inc);
        assert!(matches!(rhs.kind, ExprKind::Postfix { op: PostfixOp::Dec, .. }));
    }

    #[test]
    fn calls_and_tuples() {
        let expr = def_expr("f(x, y)");
        let ExprKind::App { arg, cps, .. } = &expr.kind else {
            panic!("expected app");
        };
        assert!(!cps);
        assert!(matches!(&arg.kind, ExprKind::Tuple(elems) if elems.len() == 2));

        let expr = def_expr("k!(1)");
        let ExprKind::App { arg, cps, .. } = &expr.kind else {
            panic!("expected app");
        };
        assert!(cps);
        assert_eq!(int(arg), 1);

        let expr = def_expr("(a = 1; b = 2,)");
        let ExprKind::Tuple(elems) = &expr.kind else {
            panic!("expected tuple");
        };
        assert_eq!(elems.len(), 2);
        assert!(elems.iter().all(|elem| elem.name.is_some()));

        let expr = def_expr("(1,)");
        assert!(matches!(&expr.kind, ExprKind::Tuple(elems) if elems.len() == 1));
    }

    #[test]
    fn sigma_elements_may_be_anonymous() {
        let module = parse_ok("def t = [n: u32, f32];");
        let expr = &module.items().next().expect("item").expr;
        let ExprKind::Sigma(elems) = &expr.kind else {
            panic!("expected sigma");
        };
        assert_eq!(elems.len(), 2);
        let PtrnKind::Id { id, .. } = &elems[1].kind else {
            panic!("expected id pattern");
        };
        assert_eq!(module.decls.iter().count(), 3);
        assert!(elems.iter().all(|elem| elem.ty.is_some() && elem.type_mandatory));
        assert_eq!(id.span, elems[1].span);
    }

    #[test]
    fn fn_items_are_lambdas_with_mandatory_types() {
        let module = parse_ok("fn add(a: i32, b: i32) -> i32 { a + b }");
        let item = module.items().next().expect("item");
        let ExprKind::Lambda { domain, codomain, .. } = &item.expr.kind else {
            panic!("expected lambda");
        };
        assert!(domain.type_mandatory);
        assert!(matches!(&domain.kind, PtrnKind::Tuple(elems) if elems.len() == 2));
        assert!(matches!(codomain.kind, ExprKind::Id(_)));

        let expr = def_expr("λx: i32 { x }");
        let ExprKind::Lambda { codomain, .. } = &expr.kind else {
            panic!("expected lambda");
        };
        assert_eq!(codomain.kind, ExprKind::Unknown);
    }

    #[test]
    fn type_forms() {
        let expr = def_expr("\\pi x: i32 -> [y: i32]");
        assert!(matches!(expr.kind, ExprKind::Forall { .. }));

        let expr = def_expr("Π T: ᵁ → T");
        let ExprKind::Forall { domain, .. } = &expr.kind else {
            panic!("expected forall");
        };
        assert!(matches!(
            domain.ty.as_deref().map(|ty| &ty.kind),
            Some(ExprKind::Qualifier(Qualifier::Unlimited))
        ));

        let expr = def_expr("cn (x: i32)");
        let ExprKind::Forall { codomain, .. } = &expr.kind else {
            panic!("expected forall");
        };
        assert_eq!(codomain.kind, ExprKind::Bottom);

        let expr = def_expr("‹i: n; i›");
        assert!(matches!(expr.kind, ExprKind::Pack { .. }));
        let expr = def_expr("«i: n; f(i)»");
        assert!(matches!(expr.kind, ExprKind::Variadic { .. }));
        assert_eq!(def_expr("?").kind, ExprKind::Unknown);
        assert_eq!(def_expr("⊥").kind, ExprKind::Bottom);
    }

    #[test]
    fn loops_and_match() {
        let expr = def_expr("{ for i in xs { f(i) } while c { c = g(); } match v { x => x, (a, b) => { a } } }");
        let block = block_of(&expr);
        assert_eq!(block.stmnts.len(), 2);
        let ExprKind::Match { arms, .. } = &block.expr.kind else {
            panic!("expected match");
        };
        assert_eq!(arms.len(), 2);
    }

    #[test]
    fn literals_keep_their_kind() {
        let expr = def_expr("1u8 + 2.5f32");
        let ExprKind::Infix { lhs, rhs, .. } = &expr.kind else {
            panic!("expected infix");
        };
        assert_eq!(
            lhs.kind,
            ExprKind::Literal(Literal::Int {
                value: 1,
                kind: NumKind::U8
            })
        );
        assert!(matches!(
            rhs.kind,
            ExprKind::Literal(Literal::Float {
                kind: NumKind::F32,
                ..
            })
        ));
    }

    #[test]
    fn errors_name_the_context() {
        let (_, compiler) = parse("def x = );");
        let diag = &compiler.diagnostics()[0];
        assert_eq!(diag.code, Some("E0102"));
        assert_eq!(
            diag.message,
            "expected expression, got ')' while parsing def item"
        );

        let (_, compiler) = parse("let = 1;");
        assert_eq!(
            compiler.diagnostics()[0].message,
            "expected pattern, got '=' while parsing let statement"
        );

        let (_, compiler) = parse("def x = (1, 2");
        assert_eq!(
            compiler.diagnostics()[0].message,
            "expected ')', got end of file while parsing tuple"
        );
    }

    #[test]
    fn recovers_at_the_next_statement() {
        let source = "def a = );\ndef b = 1;\nlet = 3 4 5;\ndef c = b + ;\ndef d = 2;";
        let (module, compiler) = parse(source);
        assert_eq!(compiler.num_errors(), 4);
        let names: Vec<String> = module
            .items()
            .map(|item| compiler.name(item.id.symbol))
            .collect();
        assert_eq!(names, ["a", "b", "c", "d"]);
    }

    #[test]
    fn stray_tokens_are_skipped() {
        let (module, compiler) = parse(") } def a = 1;");
        assert_eq!(compiler.num_errors(), 2);
        assert_eq!(module.items().count(), 1);

        let (module, compiler) = parse("def a = { x y };");
        assert_eq!(compiler.num_errors(), 1);
        let block = block_of(&module.items().next().expect("item").expr);
        assert_eq!(block.stmnts.len(), 1);
    }

    #[test]
    fn lexer_errors_do_not_reach_the_parser() {
        let (module, compiler) = parse("def a = 1 $ ;");
        assert_eq!(compiler.num_errors(), 1);
        assert_eq!(module.items().count(), 1);
    }

    #[test]
    fn every_binder_gets_a_declaration() {
        let module = parse_ok("def f = \\(a: i32, b: i32) { let c = a; c };");
        let kinds: Vec<DeclKind> = module.decls.iter().map(|(_, decl)| decl.kind).collect();
        assert_eq!(
            kinds,
            [
                DeclKind::Item,
                DeclKind::Binding,
                DeclKind::Binding,
                DeclKind::Binding
            ]
        );
        let mut ids = 0;
        module.walk(&mut |node| {
            if let Node::Expr(Expr {
                kind: ExprKind::Id(_),
                ..
            }) = node
            {
                ids += 1;
            }
        });
        assert_eq!(ids, 4);
    }
}
