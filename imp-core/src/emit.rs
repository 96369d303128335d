//! Lowering of a bound module through an [`IrBuilder`].
//!
//! The emitter only decides evaluation order and scoping; what a value *is*
//! belongs to the builder. Items are pre-bound to placeholder parameters so
//! forward references resolve, then rebound to their real value, which is
//! also stored in the item's value slot.

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::ast::{
    Decls, DeclId, Expr, ExprKind, InfixOp, Item, Module, PostfixOp, PrefixOp, Ptrn, PtrnKind,
    Qualifier, Stmnt, StmntKind,
};
use crate::error::SlotError;
use crate::print::print_literal;
use crate::span::Span;
use crate::symbol::{Interner, Symbol};
use crate::token::Literal;

/// Opaque handle to a value owned by an [`IrBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueHandle(pub u32);

impl fmt::Display for ValueHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Tuple,
    Sigma,
    Forall,
    Lambda,
    App { cps: bool },
    Field(Symbol),
    /// Component `n` of a tuple value, used to destructure patterns.
    Extract(u32),
    Prefix(PrefixOp),
    Postfix(PostfixOp),
    Infix(InfixOp),
    Block,
    If,
    Match,
    For,
    While,
    Pack,
    Variadic,
    Qualifier(Qualifier),
    Bottom,
    Unknown,
}

pub trait IrBuilder {
    /// Stand-in for anything that failed earlier in the pipeline.
    fn error(&mut self, span: Span) -> ValueHandle;
    fn literal(&mut self, span: Span, literal: Literal) -> ValueHandle;
    /// A fresh parameter of type `ty`.
    fn param(&mut self, span: Span, ty: Option<ValueHandle>) -> ValueHandle;
    fn lookup(&mut self, decl: DeclId) -> Option<ValueHandle>;
    fn bind(&mut self, decl: DeclId, value: ValueHandle);
    fn build(&mut self, span: Span, op: Op, operands: &[ValueHandle]) -> ValueHandle;
}

/// Emit every statement of `module`, returning the value of each top-level
/// statement in order.
pub fn emit(builder: &mut dyn IrBuilder, module: &mut Module) -> Result<Vec<ValueHandle>, SlotError> {
    let mut emitter = Emitter {
        builder,
        decls: &module.decls,
    };
    let values = emitter.stmnts(&mut module.stmnts)?;
    debug!(values = values.len(), "emitted module");
    Ok(values)
}

struct Emitter<'b, 'm> {
    builder: &'b mut dyn IrBuilder,
    decls: &'m Decls,
}

impl Emitter<'_, '_> {
    fn stmnts(&mut self, stmnts: &mut [Stmnt]) -> Result<Vec<ValueHandle>, SlotError> {
        for stmnt in stmnts.iter() {
            if let StmntKind::Item(item) = &stmnt.kind {
                let placeholder = self.builder.param(item.span, None);
                self.builder.bind(item.decl, placeholder);
            }
        }
        stmnts.iter_mut().map(|stmnt| self.stmnt(stmnt)).collect()
    }

    fn stmnt(&mut self, stmnt: &mut Stmnt) -> Result<ValueHandle, SlotError> {
        match &mut stmnt.kind {
            StmntKind::Expr(expr) => self.expr(expr),
            StmntKind::Let { ptrn, init } => {
                let value = self.expr(init)?;
                self.destructure(ptrn, value);
                Ok(value)
            }
            StmntKind::Item(item) => self.item(item),
        }
    }

    fn item(&mut self, item: &mut Item) -> Result<ValueHandle, SlotError> {
        let value = self.expr(&mut item.expr)?;
        self.builder.bind(item.decl, value);
        item.value.set(value)?;
        Ok(value)
    }

    /// A parameter introduced by `ptrn`, bound to its identifiers.
    fn param(&mut self, ptrn: &mut Ptrn) -> Result<ValueHandle, SlotError> {
        let ty = match ptrn.ty.as_deref_mut() {
            Some(ty) => Some(self.expr(ty)?),
            None => None,
        };
        let value = self.builder.param(ptrn.span, ty);
        self.destructure(ptrn, value);
        Ok(value)
    }

    fn destructure(&mut self, ptrn: &Ptrn, value: ValueHandle) {
        match &ptrn.kind {
            PtrnKind::Id { decl, .. } => self.builder.bind(*decl, value),
            PtrnKind::Tuple(elems) => {
                for (i, elem) in elems.iter().enumerate() {
                    let part = self.builder.build(elem.span, Op::Extract(i as u32), &[value]);
                    self.destructure(elem, part);
                }
            }
            PtrnKind::Error => {}
        }
    }

    fn build(&mut self, span: Span, op: Op, operands: &[ValueHandle]) -> ValueHandle {
        self.builder.build(span, op, operands)
    }

    fn expr(&mut self, expr: &mut Expr) -> Result<ValueHandle, SlotError> {
        let span = expr.span;
        let value = match &mut expr.kind {
            ExprKind::Id(id_expr) => match id_expr.decl.get() {
                Some(decl) if !self.decls[decl].is_error() => self
                    .builder
                    .lookup(decl)
                    .unwrap_or_else(|| self.builder.error(span)),
                _ => self.builder.error(span),
            },
            ExprKind::Literal(literal) => self.builder.literal(span, *literal),
            ExprKind::Tuple(elems) => {
                let values = elems
                    .iter_mut()
                    .map(|elem| self.expr(&mut elem.expr))
                    .collect::<Result<Vec<_>, _>>()?;
                self.build(span, Op::Tuple, &values)
            }
            ExprKind::Sigma(elems) => {
                let values = elems
                    .iter_mut()
                    .map(|elem| self.param(elem))
                    .collect::<Result<Vec<_>, _>>()?;
                self.build(span, Op::Sigma, &values)
            }
            ExprKind::Forall { domain, codomain } => {
                let param = self.param(domain)?;
                let codomain = self.expr(codomain)?;
                self.build(span, Op::Forall, &[param, codomain])
            }
            ExprKind::Lambda {
                domain,
                codomain,
                body,
            } => {
                let param = self.param(domain)?;
                let codomain = self.expr(codomain)?;
                let body = self.expr(body)?;
                self.build(span, Op::Lambda, &[param, codomain, body])
            }
            ExprKind::App { callee, arg, cps } => {
                let cps = *cps;
                let callee = self.expr(callee)?;
                let arg = self.expr(arg)?;
                self.build(span, Op::App { cps }, &[callee, arg])
            }
            ExprKind::Field { lhs, field } => {
                let symbol = field.symbol;
                let lhs = self.expr(lhs)?;
                self.build(span, Op::Field(symbol), &[lhs])
            }
            ExprKind::Prefix { op, rhs } => {
                let op = *op;
                let rhs = self.expr(rhs)?;
                self.build(span, Op::Prefix(op), &[rhs])
            }
            ExprKind::Postfix { lhs, op } => {
                let op = *op;
                let lhs = self.expr(lhs)?;
                self.build(span, Op::Postfix(op), &[lhs])
            }
            ExprKind::Infix { lhs, op, rhs } => {
                let op = *op;
                let lhs = self.expr(lhs)?;
                let rhs = self.expr(rhs)?;
                self.build(span, Op::Infix(op), &[lhs, rhs])
            }
            ExprKind::Block(block) => {
                let mut values = self.stmnts(&mut block.stmnts)?;
                values.push(self.expr(&mut block.expr)?);
                self.build(span, Op::Block, &values)
            }
            ExprKind::If {
                cond,
                then_expr,
                else_expr,
            } => {
                let cond = self.expr(cond)?;
                let then_value = self.expr(then_expr)?;
                let else_value = self.expr(else_expr)?;
                self.build(span, Op::If, &[cond, then_value, else_value])
            }
            ExprKind::Match { scrutinee, arms } => {
                let scrutinee = self.expr(scrutinee)?;
                let mut values = vec![scrutinee];
                for arm in arms {
                    self.destructure(&arm.ptrn, scrutinee);
                    values.push(self.expr(&mut arm.body)?);
                }
                self.build(span, Op::Match, &values)
            }
            ExprKind::For { ptrn, iter, body } => {
                let iter = self.expr(iter)?;
                let param = self.param(ptrn)?;
                let body = self.expr(body)?;
                self.build(span, Op::For, &[iter, param, body])
            }
            ExprKind::While { cond, body } => {
                let cond = self.expr(cond)?;
                let body = self.expr(body)?;
                self.build(span, Op::While, &[cond, body])
            }
            ExprKind::Pack { domain, body } => {
                let param = self.param(domain)?;
                let body = self.expr(body)?;
                self.build(span, Op::Pack, &[param, body])
            }
            ExprKind::Variadic { domain, body } => {
                let param = self.param(domain)?;
                let body = self.expr(body)?;
                self.build(span, Op::Variadic, &[param, body])
            }
            ExprKind::Qualifier(q) => {
                let q = *q;
                self.build(span, Op::Qualifier(q), &[])
            }
            ExprKind::Bottom => self.build(span, Op::Bottom, &[]),
            ExprKind::Unknown => self.build(span, Op::Unknown, &[]),
            ExprKind::Error => self.builder.error(span),
        };
        Ok(value)
    }
}

/// A builder that records one line of text per value, for dumps and tests.
#[derive(Debug)]
pub struct TextBuilder<'a> {
    interner: &'a Interner,
    lines: Vec<String>,
    bindings: HashMap<DeclId, ValueHandle>,
}

impl<'a> TextBuilder<'a> {
    pub fn new(interner: &'a Interner) -> Self {
        TextBuilder {
            interner,
            lines: Vec::new(),
            bindings: HashMap::new(),
        }
    }

    fn push(&mut self, line: String) -> ValueHandle {
        let handle = ValueHandle(self.lines.len() as u32);
        self.lines.push(format!("{handle} = {line}"));
        handle
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_text(self) -> String {
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }

    fn op_name(&self, op: Op) -> String {
        match op {
            Op::Tuple => "tuple".into(),
            Op::Sigma => "sigma".into(),
            Op::Forall => "pi".into(),
            Op::Lambda => "lambda".into(),
            Op::App { cps: false } => "app".into(),
            Op::App { cps: true } => "app!".into(),
            Op::Field(symbol) => format!("field .{}", self.interner.name(symbol)),
            Op::Extract(index) => format!("extract {index}"),
            Op::Prefix(op) => format!("prefix {}", op.as_str()),
            Op::Postfix(op) => format!("postfix {}", op.as_str()),
            Op::Infix(op) => format!("infix {}", op.as_str()),
            Op::Block => "block".into(),
            Op::If => "if".into(),
            Op::Match => "match".into(),
            Op::For => "for".into(),
            Op::While => "while".into(),
            Op::Pack => "pack".into(),
            Op::Variadic => "variadic".into(),
            Op::Qualifier(q) => format!("qualifier {q}"),
            Op::Bottom => "bottom".into(),
            Op::Unknown => "unknown".into(),
        }
    }
}

impl IrBuilder for TextBuilder<'_> {
    fn error(&mut self, _span: Span) -> ValueHandle {
        self.push("error".into())
    }

    fn literal(&mut self, _span: Span, literal: Literal) -> ValueHandle {
        let text = print_literal(self.interner, &literal);
        self.push(format!("literal {text}"))
    }

    fn param(&mut self, _span: Span, ty: Option<ValueHandle>) -> ValueHandle {
        match ty {
            Some(ty) => self.push(format!("param : {ty}")),
            None => self.push("param".into()),
        }
    }

    fn lookup(&mut self, decl: DeclId) -> Option<ValueHandle> {
        self.bindings.get(&decl).copied()
    }

    fn bind(&mut self, decl: DeclId, value: ValueHandle) {
        self.bindings.insert(decl, value);
    }

    fn build(&mut self, _span: Span, op: Op, operands: &[ValueHandle]) -> ValueHandle {
        let mut line = self.op_name(op);
        for operand in operands {
            line.push(' ');
            line.push_str(&operand.to_string());
        }
        self.push(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::Compiler;

    fn emit_text(source: &str) -> (Vec<String>, Module) {
        let mut compiler = Compiler::new();
        let mut module = compiler.compile("test.imp", source);
        let interner = compiler.interner().clone();
        let mut builder = TextBuilder::new(&interner);
        emit(&mut builder, &mut module).expect("emit");
        (builder.lines().to_vec(), module)
    }

    #[test]
    fn items_store_their_value() {
        let (lines, module) = emit_text("def a = 1; def b = a + 2;");
        assert_eq!(
            lines,
            [
                "%0 = param",
                "%1 = param",
                "%2 = literal 1",
                "%3 = literal 2",
                "%4 = infix + %2 %3",
            ]
        );
        let values: Vec<_> = module.items().map(|item| item.value.get()).collect();
        assert_eq!(values, [Some(ValueHandle(2)), Some(ValueHandle(4))]);
    }

    #[test]
    fn forward_references_see_the_placeholder() {
        let (lines, _) = emit_text("def b = a; def a = 1;");
        assert_eq!(lines, ["%0 = param", "%1 = param", "%2 = literal 1"]);
    }

    #[test]
    fn binders_become_parameters() {
        let (lines, _) = emit_text("def U = ?; def f = λ(x: U, y: U) { y };");
        assert_eq!(
            lines,
            [
                "%0 = param",
                "%1 = param",
                "%2 = unknown",
                "%3 = param",
                "%4 = extract 0 %3",
                "%5 = extract 1 %3",
                "%6 = unknown",
                "%7 = block %5",
                "%8 = lambda %3 %6 %7",
            ]
        );
    }

    #[test]
    fn unresolved_names_lower_to_errors() {
        let (lines, _) = emit_text("def a = missing.x;");
        assert_eq!(lines, ["%0 = param", "%1 = error", "%2 = field .x %1"]);
    }

    #[test]
    fn emitting_twice_into_different_values_is_refused() {
        let mut compiler = Compiler::new();
        let mut module = compiler.compile("test.imp", "def a = 1;");
        let interner = compiler.interner().clone();

        let mut builder = TextBuilder::new(&interner);
        emit(&mut builder, &mut module).expect("first emit");
        let mut same = TextBuilder::new(&interner);
        emit(&mut same, &mut module).expect("same handles again");

        let mut shifted = TextBuilder::new(&interner);
        shifted.push("padding".into());
        assert_eq!(
            emit(&mut shifted, &mut module),
            Err(SlotError::AlreadySet)
        );
    }
}
