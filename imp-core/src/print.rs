//! Canonical source printer.
//!
//! The output parses back into a tree that prints identically. Parentheses
//! are inserted only where the grammar needs them.

use core::fmt::Write;

use crate::ast::{
    BlockExpr, Expr, ExprKind, InfixOp, Item, Module, Prec, Ptrn, PtrnKind, Stmnt, StmntKind,
    TupleElem,
};
use crate::symbol::{Interner, Symbol, WILDCARD};
use crate::token::Literal;

const INDENT: &str = "    ";

pub fn print_module(interner: &Interner, module: &Module) -> String {
    let mut printer = Printer::new(interner);
    for stmnt in &module.stmnts {
        printer.stmnt(stmnt);
        printer.out.push('\n');
    }
    printer.out
}

pub fn print_stmnt(interner: &Interner, stmnt: &Stmnt) -> String {
    let mut printer = Printer::new(interner);
    printer.stmnt(stmnt);
    printer.out
}

pub fn print_expr(interner: &Interner, expr: &Expr) -> String {
    let mut printer = Printer::new(interner);
    printer.expr(expr);
    printer.out
}

pub fn print_ptrn(interner: &Interner, ptrn: &Ptrn) -> String {
    let mut printer = Printer::new(interner);
    printer.ptrn(ptrn);
    printer.out
}

pub fn print_literal(interner: &Interner, literal: &Literal) -> String {
    let mut printer = Printer::new(interner);
    printer.literal(literal);
    printer.out
}

struct Printer<'a> {
    interner: &'a Interner,
    out: String,
    depth: usize,
}

impl<'a> Printer<'a> {
    fn new(interner: &'a Interner) -> Self {
        Printer {
            interner,
            out: String::new(),
            depth: 0,
        }
    }

    fn name(&mut self, symbol: Symbol) {
        let name = self.interner.name(symbol);
        self.out.push_str(&name);
    }

    fn newline(&mut self) {
        self.out.push('\n');
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
    }

    fn stmnt(&mut self, stmnt: &Stmnt) {
        match &stmnt.kind {
            StmntKind::Expr(expr) => {
                self.expr(expr);
                self.out.push(';');
            }
            StmntKind::Let { ptrn, init } => {
                self.out.push_str("let ");
                self.ptrn(ptrn);
                self.out.push_str(" = ");
                self.expr(init);
                self.out.push(';');
            }
            StmntKind::Item(item) => self.item(item),
        }
    }

    fn item(&mut self, item: &Item) {
        if let ExprKind::Lambda {
            domain,
            codomain,
            body,
        } = &item.expr.kind
        {
            self.out.push_str("fn ");
            self.name(item.id.symbol);
            self.lambda_tail(domain, codomain, body);
            return;
        }
        self.out.push_str("def ");
        self.name(item.id.symbol);
        self.out.push_str(" = ");
        self.expr(&item.expr);
        self.out.push(';');
    }

    fn ptrn(&mut self, ptrn: &Ptrn) {
        match &ptrn.kind {
            PtrnKind::Id { id, .. } => self.name(id.symbol),
            PtrnKind::Tuple(elems) => {
                self.out.push('(');
                for (i, elem) in elems.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.ptrn(elem);
                }
                self.out.push(')');
            }
            PtrnKind::Error => self.out.push_str("<error>"),
        }
        if let Some(ty) = &ptrn.ty {
            self.out.push_str(": ");
            self.type_expr(ty);
        }
    }

    /// Types after `:` and `->` are parsed above assignment level.
    fn type_expr(&mut self, expr: &Expr) {
        let bare = match &expr.kind {
            ExprKind::Infix { op, .. } => op.prec() >= Prec::OrOr,
            ExprKind::Prefix { .. } => true,
            _ => is_atomic(expr),
        };
        self.wrapped(expr, !bare);
    }

    fn wrapped(&mut self, expr: &Expr, parens: bool) {
        if parens {
            self.out.push('(');
            self.expr(expr);
            self.out.push(')');
        } else {
            self.expr(expr);
        }
    }

    /// Operand of a prefix or postfix operator, callee or field access.
    fn operand(&mut self, expr: &Expr) {
        self.wrapped(expr, !is_atomic(expr));
    }

    fn infix_operand(&mut self, op: InfixOp, expr: &Expr, is_lhs: bool) {
        let parens = match &expr.kind {
            ExprKind::Infix { op: inner, .. } => {
                inner.prec() < op.prec()
                    || (inner.prec() == op.prec() && is_lhs == op.is_right_assoc())
            }
            ExprKind::Prefix { .. } => false,
            _ => !is_atomic(expr),
        };
        self.wrapped(expr, parens);
    }

    fn expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Id(id_expr) => self.name(id_expr.id.symbol),
            ExprKind::Literal(literal) => self.literal(literal),
            ExprKind::Tuple(elems) => self.tuple(elems),
            ExprKind::Sigma(elems) => {
                self.out.push('[');
                for (i, elem) in elems.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    match (&elem.kind, &elem.ty) {
                        (PtrnKind::Id { id, .. }, Some(ty))
                            if self.interner.resolve(id.symbol).as_deref() == Some(WILDCARD) =>
                        {
                            self.expr(ty)
                        }
                        _ => self.ptrn(elem),
                    }
                }
                self.out.push(']');
            }
            ExprKind::Forall { domain, codomain } => {
                if matches!(codomain.kind, ExprKind::Bottom) {
                    self.out.push_str("cn ");
                    self.ptrn(domain);
                } else {
                    self.out.push_str("Π ");
                    self.ptrn(domain);
                    self.out.push_str(" → ");
                    self.expr(codomain);
                }
            }
            ExprKind::Lambda {
                domain,
                codomain,
                body,
            } => {
                self.out.push('λ');
                self.lambda_tail(domain, codomain, body);
            }
            ExprKind::App { callee, arg, cps } => {
                self.operand(callee);
                if *cps {
                    self.out.push('!');
                }
                match &arg.kind {
                    ExprKind::Tuple(elems) => self.tuple(elems),
                    _ => {
                        self.out.push('(');
                        self.tuple_elem_expr(arg);
                        self.out.push(')');
                    }
                }
            }
            ExprKind::Field { lhs, field } => {
                self.operand(lhs);
                self.out.push('.');
                self.name(field.symbol);
            }
            ExprKind::Prefix { op, rhs } => {
                self.out.push_str(op.as_str());
                self.operand(rhs);
            }
            ExprKind::Postfix { lhs, op } => {
                self.operand(lhs);
                self.out.push_str(op.as_str());
            }
            ExprKind::Infix { lhs, op, rhs } => {
                self.infix_operand(*op, lhs, true);
                let _ = write!(self.out, " {} ", op.as_str());
                self.infix_operand(*op, rhs, false);
            }
            ExprKind::Block(block) => self.block(block),
            ExprKind::If {
                cond,
                then_expr,
                else_expr,
            } => {
                self.out.push_str("if ");
                self.expr(cond);
                self.out.push(' ');
                self.expr(then_expr);
                if !is_empty_block(else_expr) {
                    self.out.push_str(" else ");
                    self.expr(else_expr);
                }
            }
            ExprKind::Match { scrutinee, arms } => {
                self.out.push_str("match ");
                self.expr(scrutinee);
                self.out.push_str(" {");
                self.depth += 1;
                for arm in arms {
                    self.newline();
                    self.ptrn(&arm.ptrn);
                    self.out.push_str(" => ");
                    self.expr(&arm.body);
                    self.out.push(',');
                }
                self.depth -= 1;
                self.newline();
                self.out.push('}');
            }
            ExprKind::For { ptrn, iter, body } => {
                self.out.push_str("for ");
                self.ptrn(ptrn);
                self.out.push_str(" in ");
                self.expr(iter);
                self.out.push(' ');
                self.expr(body);
            }
            ExprKind::While { cond, body } => {
                self.out.push_str("while ");
                self.expr(cond);
                self.out.push(' ');
                self.expr(body);
            }
            ExprKind::Pack { domain, body } => {
                self.out.push('‹');
                self.ptrn(domain);
                self.out.push_str("; ");
                self.expr(body);
                self.out.push('›');
            }
            ExprKind::Variadic { domain, body } => {
                self.out.push('«');
                self.ptrn(domain);
                self.out.push_str("; ");
                self.expr(body);
                self.out.push('»');
            }
            ExprKind::Qualifier(q) => self.out.push_str(q.as_str()),
            ExprKind::Bottom => self.out.push('⊥'),
            ExprKind::Unknown => self.out.push('?'),
            ExprKind::Error => self.out.push_str("<error>"),
        }
    }

    fn lambda_tail(&mut self, domain: &Ptrn, codomain: &Expr, body: &Expr) {
        self.ptrn(domain);
        if !matches!(codomain.kind, ExprKind::Unknown) {
            self.out.push_str(" -> ");
            self.type_expr(codomain);
        }
        self.out.push(' ');
        self.expr(body);
    }

    fn tuple(&mut self, elems: &[TupleElem]) {
        self.out.push('(');
        for (i, elem) in elems.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            if let Some(name) = &elem.name {
                self.name(name.symbol);
                self.out.push_str(" = ");
                self.expr(&elem.expr);
            } else {
                self.tuple_elem_expr(&elem.expr);
            }
        }
        if elems.len() == 1 && elems[0].name.is_none() {
            self.out.push(',');
        }
        self.out.push(')');
    }

    /// `(x = e)` would read as a named element, so an assignment to a plain
    /// identifier gets its target parenthesised.
    fn tuple_elem_expr(&mut self, expr: &Expr) {
        if let ExprKind::Infix {
            lhs,
            op: InfixOp::Assign,
            rhs,
        } = &expr.kind
        {
            if matches!(lhs.kind, ExprKind::Id(_)) {
                self.out.push('(');
                self.expr(lhs);
                self.out.push_str(") = ");
                self.infix_operand(InfixOp::Assign, rhs, false);
                return;
            }
        }
        self.expr(expr);
    }

    fn block(&mut self, block: &BlockExpr) {
        let has_value = !is_unit(&block.expr);
        if block.stmnts.is_empty() {
            if has_value {
                self.out.push_str("{ ");
                self.expr(&block.expr);
                self.out.push_str(" }");
            } else {
                self.out.push_str("{}");
            }
            return;
        }
        self.out.push('{');
        self.depth += 1;
        for stmnt in &block.stmnts {
            self.newline();
            self.stmnt(stmnt);
        }
        if has_value {
            self.newline();
            self.expr(&block.expr);
        }
        self.depth -= 1;
        self.newline();
        self.out.push('}');
    }

    fn literal(&mut self, literal: &Literal) {
        match *literal {
            Literal::Int { value, kind } => {
                let _ = write!(self.out, "{value}{}", kind.suffix());
            }
            Literal::Float { value, kind } => {
                let _ = write!(self.out, "{value:?}{}", kind.suffix());
            }
            Literal::Bool(value) => {
                let _ = write!(self.out, "{value}");
            }
            Literal::Char(ch) => {
                let _ = write!(self.out, "'{}'", ch.escape_default());
            }
            Literal::Str(symbol) => {
                let text = self.interner.name(symbol);
                self.out.push('"');
                for ch in text.chars() {
                    let _ = write!(self.out, "{}", ch.escape_default());
                }
                self.out.push('"');
            }
        }
    }
}

/// Forms that never need parentheses as an operand.
fn is_atomic(expr: &Expr) -> bool {
    matches!(
        expr.kind,
        ExprKind::Id(_)
            | ExprKind::Literal(_)
            | ExprKind::Tuple(_)
            | ExprKind::Sigma(_)
            | ExprKind::App { .. }
            | ExprKind::Field { .. }
            | ExprKind::Postfix { .. }
            | ExprKind::Pack { .. }
            | ExprKind::Variadic { .. }
            | ExprKind::Qualifier(_)
            | ExprKind::Bottom
            | ExprKind::Unknown
            | ExprKind::Error
    )
}

fn is_unit(expr: &Expr) -> bool {
    matches!(&expr.kind, ExprKind::Tuple(elems) if elems.is_empty())
}

fn is_empty_block(expr: &Expr) -> bool {
    matches!(&expr.kind, ExprKind::Block(block) if block.stmnts.is_empty() && is_unit(&block.expr))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::Compiler;

    fn reprint(source: &str) -> String {
        let mut compiler = Compiler::new();
        let module = compiler.parse_source("test.imp", source);
        assert_eq!(
            compiler.num_errors(),
            0,
            "{source}: {:?}",
            compiler.diagnostics()
        );
        print_module(compiler.interner(), &module)
    }

    #[test]
    fn prints_canonical_form() {
        assert_eq!(reprint("def x=a+b*c;"), "def x = a + b * c;\n");
        assert_eq!(reprint("def x = (a + b) * c;"), "def x = (a + b) * c;\n");
        assert_eq!(reprint("def x = a - (b - c);"), "def x = a - (b - c);\n");
        assert_eq!(reprint("def x = (a = b) = c;"), "def x = (a = b) = c;\n");
        assert_eq!(reprint("def x = - -a;"), "def x = -(-a);\n");
        assert_eq!(reprint("def x = f(a)(b, c).d;"), "def x = f(a)(b, c).d;\n");
        assert_eq!(reprint("def x = k!((a = 1));"), "def x = k!(a = 1);\n");
        assert_eq!(reprint("def x = \\pi y: T -> U;"), "def x = Π y: T → U;\n");
        assert_eq!(reprint("def x = [n: T, U];"), "def x = [n: T, U];\n");
        assert_eq!(reprint("def x = (1,);"), "def x = (1,);\n");
        assert_eq!(reprint("def c = '\\n';"), "def c = '\\n';\n");
        assert_eq!(reprint("def f = 2.5f32;"), "def f = 2.5f32;\n");
    }

    #[test]
    fn prints_items_and_blocks() {
        let source = "fn f(x: T) -> T { let y = x; if y { y } }";
        assert_eq!(
            reprint(source),
            "fn f(x: T) -> T {\n    let y = x;\n    if y { y }\n}\n"
        );
        assert_eq!(reprint("def e = {};"), "def e = {};\n");
        assert_eq!(reprint("def e = { a; };"), "def e = {\n    a;\n};\n");
    }

    #[test]
    fn printing_is_stable_across_reparsing() {
        let source = r#"
            def U = ?;
            fn f(n: U, xs: «i: n; U») -> [a: U, U] {
                for x in xs { g(x); }
                while c { c -= 1; }
                let (a, b): [U, U] = (p = 1; q = 2);
                match xs { y => y, (z, w) => { z } }
                let v = { if a { 1 } else if b { 2 } else { 3 } }(4);
                h!(λk: cn U { k(a) }) + ‹j: n; j› * -a++;
                x = y = (z = 1);
                "str\t\"q\"" ; 0x1Fu8; true; ⊥; ᴸ
            }
        "#;
        let first = reprint(source);
        let second = reprint(&first);
        assert_eq!(first, second);
        assert!(first.contains("({ if a"), "block callee is parenthesised");
    }
}
