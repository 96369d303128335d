//! Abstract syntax tree.
//!
//! Every node carries the [`Span`] of the source text it was parsed from.
//! The three node families (patterns, expressions, statements) are closed
//! sum types; passes match on them exhaustively.
//!
//! Sub-trees are owned by their parent. Declarations are the only shared
//! nodes: each `IdPattern` and `Item` owns an entry in the module's
//! [`Decls`] arena, and resolved identifier expressions refer to it by
//! [`DeclId`].

use core::fmt;
use core::ops::Index;

use crate::emit::ValueHandle;
use crate::error::SlotError;
use crate::span::{FileId, Span};
use crate::symbol::Symbol;
use crate::token::{Literal, TokenKind};

/// An identifier occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Id {
    pub symbol: Symbol,
    pub span: Span,
}

// ---------------------------------------------------------------------
// Declarations and annotation slots
// ---------------------------------------------------------------------

/// Index into a module's [`Decls`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(u32);

impl DeclId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    /// Introduced by `def` or `fn`; visible in its whole scope.
    Item,
    /// Introduced by a pattern; visible after the binding point.
    Binding,
    /// Placeholder recorded for a use of an undeclared identifier.
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decl {
    pub symbol: Symbol,
    pub span: Span,
    pub kind: DeclKind,
}

impl Decl {
    pub fn is_error(&self) -> bool {
        self.kind == DeclKind::Error
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Decls {
    decls: Vec<Decl>,
}

impl Decls {
    pub fn new() -> Self {
        Decls::default()
    }

    pub fn push(&mut self, decl: Decl) -> DeclId {
        let id = DeclId(self.decls.len() as u32);
        self.decls.push(decl);
        id
    }

    pub fn get(&self, id: DeclId) -> Option<&Decl> {
        self.decls.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DeclId, &Decl)> {
        self.decls
            .iter()
            .enumerate()
            .map(|(i, decl)| (DeclId(i as u32), decl))
    }
}

impl Index<DeclId> for Decls {
    type Output = Decl;

    fn index(&self, id: DeclId) -> &Decl {
        &self.decls[id.index()]
    }
}

/// A single-assignment annotation written by a pass after construction.
///
/// Rewriting the value already stored is accepted, so a pass can be run
/// twice over the same tree; any other rewrite is refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot<T> {
    value: Option<T>,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Slot { value: None }
    }
}

impl<T: Copy + PartialEq> Slot<T> {
    pub fn get(&self) -> Option<T> {
        self.value
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    pub fn set(&mut self, value: T) -> Result<(), SlotError> {
        match self.value {
            None => {
                self.value = Some(value);
                Ok(())
            }
            Some(current) if current == value => Ok(()),
            Some(_) => Err(SlotError::AlreadySet),
        }
    }
}

// ---------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------

/// Binding strength, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Prec {
    Bottom,
    Assign,
    OrOr,
    AndAnd,
    Rel,
    Or,
    Xor,
    And,
    Shift,
    Add,
    Mul,
    Prefix,
    Postfix,
}

impl Prec {
    /// The next stronger level; `Postfix` is the strongest.
    pub fn next(self) -> Prec {
        use Prec::*;
        match self {
            Bottom => Assign,
            Assign => OrOr,
            OrOr => AndAnd,
            AndAnd => Rel,
            Rel => Or,
            Or => Xor,
            Xor => And,
            And => Shift,
            Shift => Add,
            Add => Mul,
            Mul => Prefix,
            Prefix | Postfix => Postfix,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrefixOp {
    Inc,
    Dec,
    Plus,
    Minus,
    Not,
    Tilde,
    Ref,
    Deref,
}

impl PrefixOp {
    pub fn from_token(kind: TokenKind) -> Option<PrefixOp> {
        Some(match kind {
            TokenKind::Inc => PrefixOp::Inc,
            TokenKind::Dec => PrefixOp::Dec,
            TokenKind::Plus => PrefixOp::Plus,
            TokenKind::Minus => PrefixOp::Minus,
            TokenKind::Not => PrefixOp::Not,
            TokenKind::Tilde => PrefixOp::Tilde,
            TokenKind::And => PrefixOp::Ref,
            TokenKind::Star => PrefixOp::Deref,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PrefixOp::Inc => "++",
            PrefixOp::Dec => "--",
            PrefixOp::Plus => "+",
            PrefixOp::Minus => "-",
            PrefixOp::Not => "!",
            PrefixOp::Tilde => "~",
            PrefixOp::Ref => "&",
            PrefixOp::Deref => "*",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostfixOp {
    Inc,
    Dec,
}

impl PostfixOp {
    pub fn from_token(kind: TokenKind) -> Option<PostfixOp> {
        match kind {
            TokenKind::Inc => Some(PostfixOp::Inc),
            TokenKind::Dec => Some(PostfixOp::Dec),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PostfixOp::Inc => "++",
            PostfixOp::Dec => "--",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InfixOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    RemAssign,
    AndAssign,
    OrAssign,
    XorAssign,
    ShlAssign,
    ShrAssign,
    OrOr,
    AndAnd,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Or,
    Xor,
    And,
    Shl,
    Shr,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl InfixOp {
    pub fn from_token(kind: TokenKind) -> Option<InfixOp> {
        use InfixOp::*;
        Some(match kind {
            TokenKind::Assign => Assign,
            TokenKind::PlusAssign => AddAssign,
            TokenKind::MinusAssign => SubAssign,
            TokenKind::StarAssign => MulAssign,
            TokenKind::SlashAssign => DivAssign,
            TokenKind::PercentAssign => RemAssign,
            TokenKind::AndAssign => AndAssign,
            TokenKind::OrAssign => OrAssign,
            TokenKind::XorAssign => XorAssign,
            TokenKind::ShlAssign => ShlAssign,
            TokenKind::ShrAssign => ShrAssign,
            TokenKind::OrOr => OrOr,
            TokenKind::AndAnd => AndAnd,
            TokenKind::EqEq => Eq,
            TokenKind::Ne => Ne,
            TokenKind::Lt => Lt,
            TokenKind::Le => Le,
            TokenKind::Gt => Gt,
            TokenKind::Ge => Ge,
            TokenKind::Or => Or,
            TokenKind::Xor => Xor,
            TokenKind::And => And,
            TokenKind::Shl => Shl,
            TokenKind::Shr => Shr,
            TokenKind::Plus => Add,
            TokenKind::Minus => Sub,
            TokenKind::Star => Mul,
            TokenKind::Slash => Div,
            TokenKind::Percent => Rem,
            _ => return None,
        })
    }

    pub fn prec(self) -> Prec {
        use InfixOp::*;
        match self {
            Assign | AddAssign | SubAssign | MulAssign | DivAssign | RemAssign | AndAssign
            | OrAssign | XorAssign | ShlAssign | ShrAssign => Prec::Assign,
            OrOr => Prec::OrOr,
            AndAnd => Prec::AndAnd,
            Eq | Ne | Lt | Le | Gt | Ge => Prec::Rel,
            Or => Prec::Or,
            Xor => Prec::Xor,
            And => Prec::And,
            Shl | Shr => Prec::Shift,
            Add | Sub => Prec::Add,
            Mul | Div | Rem => Prec::Mul,
        }
    }

    pub fn is_right_assoc(self) -> bool {
        self.prec() == Prec::Assign
    }

    pub fn as_str(self) -> &'static str {
        use InfixOp::*;
        match self {
            Assign => "=",
            AddAssign => "+=",
            SubAssign => "-=",
            MulAssign => "*=",
            DivAssign => "/=",
            RemAssign => "%=",
            AndAssign => "&=",
            OrAssign => "|=",
            XorAssign => "^=",
            ShlAssign => "<<=",
            ShrAssign => ">>=",
            OrOr => "||",
            AndAnd => "&&",
            Eq => "==",
            Ne => "!=",
            Lt => "<",
            Le => "<=",
            Gt => ">",
            Ge => ">=",
            Or => "|",
            Xor => "^",
            And => "&",
            Shl => "<<",
            Shr => ">>",
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Rem => "%",
        }
    }
}

/// Substructural qualifier literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Qualifier {
    Unlimited,
    Relevant,
    Affine,
    Linear,
}

impl Qualifier {
    pub fn from_token(kind: TokenKind) -> Option<Qualifier> {
        match kind {
            TokenKind::QualifierU => Some(Qualifier::Unlimited),
            TokenKind::QualifierR => Some(Qualifier::Relevant),
            TokenKind::QualifierA => Some(Qualifier::Affine),
            TokenKind::QualifierL => Some(Qualifier::Linear),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Qualifier::Unlimited => "ᵁ",
            Qualifier::Relevant => "ᴿ",
            Qualifier::Affine => "ᴬ",
            Qualifier::Linear => "ᴸ",
        }
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Ptrn {
    pub span: Span,
    pub kind: PtrnKind,
    /// Optional ascription `: ty`; for tuples it applies to the whole tuple.
    pub ty: Option<Box<Expr>>,
    /// Set in contexts that require every binder to carry a type. Checked by
    /// the binder, not the parser.
    pub type_mandatory: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PtrnKind {
    Id { id: Id, decl: DeclId },
    Tuple(Vec<Ptrn>),
    Error,
}

impl Ptrn {
    pub fn error(span: Span) -> Ptrn {
        Ptrn {
            span,
            kind: PtrnKind::Error,
            ty: None,
            type_mandatory: false,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, PtrnKind::Error)
    }
}

// ---------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub span: Span,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdExpr {
    pub id: Id,
    /// Written once by the binder.
    pub decl: Slot<DeclId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TupleElem {
    pub name: Option<Id>,
    pub expr: Expr,
}

/// `{ stmnts...; expr }`. Blocks without a trailing value get an empty
/// tuple located at the closing brace.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockExpr {
    pub stmnts: Vec<Stmnt>,
    pub expr: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchArm {
    pub span: Span,
    pub ptrn: Ptrn,
    pub body: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Id(IdExpr),
    Literal(Literal),
    Tuple(Vec<TupleElem>),
    /// Dependent tuple type; later elements may mention earlier binders.
    Sigma(Vec<Ptrn>),
    /// Dependent function type.
    Forall {
        domain: Box<Ptrn>,
        codomain: Box<Expr>,
    },
    Lambda {
        domain: Box<Ptrn>,
        codomain: Box<Expr>,
        body: Box<Expr>,
    },
    App {
        callee: Box<Expr>,
        arg: Box<Expr>,
        /// Continuation-passing-style call (`f!(x)`).
        cps: bool,
    },
    Field {
        lhs: Box<Expr>,
        field: Id,
    },
    Prefix {
        op: PrefixOp,
        rhs: Box<Expr>,
    },
    Postfix {
        lhs: Box<Expr>,
        op: PostfixOp,
    },
    Infix {
        lhs: Box<Expr>,
        op: InfixOp,
        rhs: Box<Expr>,
    },
    Block(BlockExpr),
    If {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    Match {
        scrutinee: Box<Expr>,
        arms: Vec<MatchArm>,
    },
    For {
        ptrn: Box<Ptrn>,
        iter: Box<Expr>,
        body: Box<Expr>,
    },
    While {
        cond: Box<Expr>,
        body: Box<Expr>,
    },
    /// `‹i: n; body›`
    Pack {
        domain: Box<Ptrn>,
        body: Box<Expr>,
    },
    /// `«i: n; body»`
    Variadic {
        domain: Box<Ptrn>,
        body: Box<Expr>,
    },
    Qualifier(Qualifier),
    Bottom,
    /// Type left for later inference.
    Unknown,
    Error,
}

impl Expr {
    pub fn new(span: Span, kind: ExprKind) -> Expr {
        Expr { span, kind }
    }

    pub fn error(span: Span) -> Expr {
        Expr::new(span, ExprKind::Error)
    }

    pub fn empty_tuple(span: Span) -> Expr {
        Expr::new(span, ExprKind::Tuple(Vec::new()))
    }

    /// A block with no statements whose value is the empty tuple.
    pub fn empty_block(span: Span) -> Expr {
        Expr::new(
            span,
            ExprKind::Block(BlockExpr {
                stmnts: Vec::new(),
                expr: Box::new(Expr::empty_tuple(span)),
            }),
        )
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, ExprKind::Error)
    }

    /// Blocks, conditionals, `match`, `for` and `while` need no `;` to
    /// become statements.
    pub fn is_stmnt_like(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Block(_)
                | ExprKind::If { .. }
                | ExprKind::Match { .. }
                | ExprKind::For { .. }
                | ExprKind::While { .. }
        )
    }
}

// ---------------------------------------------------------------------
// Statements, items, module
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Stmnt {
    pub span: Span,
    pub kind: StmntKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmntKind {
    Expr(Expr),
    Let { ptrn: Ptrn, init: Expr },
    Item(Item),
}

/// Named declaration, visible throughout its enclosing scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub span: Span,
    pub id: Id,
    pub expr: Expr,
    pub decl: DeclId,
    /// Filled in by the emitter.
    pub value: Slot<ValueHandle>,
}

/// Root of one parsed source unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub span: Span,
    pub file: FileId,
    pub stmnts: Vec<Stmnt>,
    pub decls: Decls,
    /// Set once names have been resolved; later passes over the same tree
    /// stay silent about problems already reported.
    pub bound: bool,
}

impl Module {
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.stmnts.iter().filter_map(|stmnt| match &stmnt.kind {
            StmntKind::Item(item) => Some(item),
            _ => None,
        })
    }

    /// Visit every node in source order, parents before children.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(Node<'a>)) {
        for stmnt in &self.stmnts {
            walk_stmnt(stmnt, f);
        }
    }
}

/// A borrowed node of any family, as handed out by [`Module::walk`].
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Stmnt(&'a Stmnt),
    Item(&'a Item),
    Expr(&'a Expr),
    Ptrn(&'a Ptrn),
}

impl Node<'_> {
    pub fn span(&self) -> Span {
        match self {
            Node::Stmnt(stmnt) => stmnt.span,
            Node::Item(item) => item.span,
            Node::Expr(expr) => expr.span,
            Node::Ptrn(ptrn) => ptrn.span,
        }
    }

    pub fn is_error(&self) -> bool {
        match self {
            Node::Expr(expr) => expr.is_error(),
            Node::Ptrn(ptrn) => ptrn.is_error(),
            Node::Stmnt(_) | Node::Item(_) => false,
        }
    }
}

fn walk_stmnt<'a>(stmnt: &'a Stmnt, f: &mut impl FnMut(Node<'a>)) {
    f(Node::Stmnt(stmnt));
    match &stmnt.kind {
        StmntKind::Expr(expr) => walk_expr(expr, f),
        StmntKind::Let { ptrn, init } => {
            walk_ptrn(ptrn, f);
            walk_expr(init, f);
        }
        StmntKind::Item(item) => {
            f(Node::Item(item));
            walk_expr(&item.expr, f);
        }
    }
}

fn walk_ptrn<'a>(ptrn: &'a Ptrn, f: &mut impl FnMut(Node<'a>)) {
    f(Node::Ptrn(ptrn));
    if let Some(ty) = &ptrn.ty {
        walk_expr(ty, f);
    }
    if let PtrnKind::Tuple(elems) = &ptrn.kind {
        for elem in elems {
            walk_ptrn(elem, f);
        }
    }
}

fn walk_expr<'a>(expr: &'a Expr, f: &mut impl FnMut(Node<'a>)) {
    f(Node::Expr(expr));
    match &expr.kind {
        ExprKind::Id(_)
        | ExprKind::Literal(_)
        | ExprKind::Qualifier(_)
        | ExprKind::Bottom
        | ExprKind::Unknown
        | ExprKind::Error => {}
        ExprKind::Tuple(elems) => {
            for elem in elems {
                walk_expr(&elem.expr, f);
            }
        }
        ExprKind::Sigma(ptrns) => {
            for ptrn in ptrns {
                walk_ptrn(ptrn, f);
            }
        }
        ExprKind::Forall { domain, codomain } => {
            walk_ptrn(domain, f);
            walk_expr(codomain, f);
        }
        ExprKind::Lambda {
            domain,
            codomain,
            body,
        } => {
            walk_ptrn(domain, f);
            walk_expr(codomain, f);
            walk_expr(body, f);
        }
        ExprKind::App { callee, arg, .. } => {
            walk_expr(callee, f);
            walk_expr(arg, f);
        }
        ExprKind::Field { lhs, .. } | ExprKind::Postfix { lhs, .. } => walk_expr(lhs, f),
        ExprKind::Prefix { rhs, .. } => walk_expr(rhs, f),
        ExprKind::Infix { lhs, rhs, .. } => {
            walk_expr(lhs, f);
            walk_expr(rhs, f);
        }
        ExprKind::Block(block) => {
            for stmnt in &block.stmnts {
                walk_stmnt(stmnt, f);
            }
            walk_expr(&block.expr, f);
        }
        ExprKind::If {
            cond,
            then_expr,
            else_expr,
        } => {
            walk_expr(cond, f);
            walk_expr(then_expr, f);
            walk_expr(else_expr, f);
        }
        ExprKind::Match { scrutinee, arms } => {
            walk_expr(scrutinee, f);
            for arm in arms {
                walk_ptrn(&arm.ptrn, f);
                walk_expr(&arm.body, f);
            }
        }
        ExprKind::For { ptrn, iter, body } => {
            walk_ptrn(ptrn, f);
            walk_expr(iter, f);
            walk_expr(body, f);
        }
        ExprKind::While { cond, body } => {
            walk_expr(cond, f);
            walk_expr(body, f);
        }
        ExprKind::Pack { domain, body } | ExprKind::Variadic { domain, body } => {
            walk_ptrn(domain, f);
            walk_expr(body, f);
        }
    }
}
