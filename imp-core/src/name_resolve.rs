//! Scope binder.
//!
//! Every scope (module, block) is bound in two passes. The declaration pass
//! registers all items written directly in the scope, so items may refer to
//! each other regardless of order. The resolution pass then walks the
//! statements in order and writes the declaration each identifier refers to
//! into its [`Slot`](crate::ast::Slot). Pattern bindings only become visible
//! after their binding point.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::ast::{
    Decl, DeclId, DeclKind, Decls, Expr, ExprKind, IdExpr, Module, Ptrn, PtrnKind, Stmnt,
    StmntKind,
};
use crate::compiler::Compiler;
use crate::diagnostic::Diagnostic;
use crate::symbol::{Symbol, WILDCARD};

/// Resolve every identifier in `module`.
///
/// Running this again over the same tree writes the same annotations and
/// allocates no new declarations.
pub fn resolve_names(compiler: &mut Compiler, module: &mut Module) {
    let wildcard = compiler.intern(WILDCARD);
    let errors = compiler.num_errors();
    let mut binder = Binder {
        compiler,
        decls: &mut module.decls,
        scopes: Vec::new(),
        wildcard,
        rebinding: module.bound,
    };
    binder.scoped(|binder| binder.bind_stmnts(&mut module.stmnts));
    debug!(
        decls = binder.decls.len(),
        errors = binder.compiler.num_errors() - errors,
        "bound module"
    );
    module.bound = true;
}

struct Binder<'a> {
    compiler: &'a mut Compiler,
    decls: &'a mut Decls,
    scopes: Vec<HashMap<Symbol, DeclId>>,
    wildcard: Symbol,
    rebinding: bool,
}

impl Binder<'_> {
    fn scoped(&mut self, f: impl FnOnce(&mut Self)) {
        self.scopes.push(HashMap::new());
        f(self);
        self.scopes.pop();
    }

    /// Make `decl` visible in the innermost scope. Later declarations of the
    /// same name shadow earlier ones.
    fn declare(&mut self, symbol: Symbol, decl: DeclId) {
        if symbol == self.wildcard {
            return;
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(symbol, decl);
        }
    }

    fn lookup(&self, symbol: Symbol) -> Option<DeclId> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(&symbol).copied())
    }

    fn bind_stmnts(&mut self, stmnts: &mut [Stmnt]) {
        for stmnt in stmnts.iter() {
            if let StmntKind::Item(item) = &stmnt.kind {
                self.declare(item.id.symbol, item.decl);
            }
        }
        for stmnt in stmnts {
            self.bind_stmnt(stmnt);
        }
    }

    fn bind_stmnt(&mut self, stmnt: &mut Stmnt) {
        match &mut stmnt.kind {
            StmntKind::Expr(expr) => self.bind_expr(expr),
            StmntKind::Let { ptrn, init } => {
                self.bind_expr(init);
                self.bind_ptrn(ptrn, false);
            }
            StmntKind::Item(item) => self.bind_expr(&mut item.expr),
        }
    }

    /// Bind `ptrn` into the current scope. `covered` is set when an
    /// enclosing tuple pattern already carries a type.
    fn bind_ptrn(&mut self, ptrn: &mut Ptrn, covered: bool) {
        if let Some(ty) = ptrn.ty.as_deref_mut() {
            self.bind_expr(ty);
        }
        let covered = covered || ptrn.ty.is_some();
        let (span, mandatory) = (ptrn.span, ptrn.type_mandatory);
        match &mut ptrn.kind {
            PtrnKind::Id { id, decl } => {
                if mandatory && !covered && !self.rebinding {
                    let name = self.compiler.name(id.symbol);
                    self.compiler.report(
                        Diagnostic::error(format!("type ascription required for `{name}`"), span)
                            .with_code("E0202"),
                    );
                }
                self.declare(id.symbol, *decl);
            }
            PtrnKind::Tuple(elems) => {
                for elem in elems {
                    self.bind_ptrn(elem, covered);
                }
            }
            PtrnKind::Error => {}
        }
    }

    fn bind_expr(&mut self, expr: &mut Expr) {
        match &mut expr.kind {
            ExprKind::Id(id_expr) => self.resolve(id_expr),
            ExprKind::Literal(_)
            | ExprKind::Qualifier(_)
            | ExprKind::Bottom
            | ExprKind::Unknown
            | ExprKind::Error => {}
            ExprKind::Tuple(elems) => {
                for elem in elems {
                    self.bind_expr(&mut elem.expr);
                }
            }
            ExprKind::Sigma(elems) => self.scoped(|binder| {
                for elem in elems {
                    binder.bind_ptrn(elem, false);
                }
            }),
            ExprKind::Forall { domain, codomain } => self.scoped(|binder| {
                binder.bind_ptrn(domain, false);
                binder.bind_expr(codomain);
            }),
            ExprKind::Lambda {
                domain,
                codomain,
                body,
            } => self.scoped(|binder| {
                binder.bind_ptrn(domain, false);
                binder.bind_expr(codomain);
                binder.bind_expr(body);
            }),
            ExprKind::App { callee, arg, .. } => {
                self.bind_expr(callee);
                self.bind_expr(arg);
            }
            ExprKind::Field { lhs, .. } | ExprKind::Postfix { lhs, .. } => self.bind_expr(lhs),
            ExprKind::Prefix { rhs, .. } => self.bind_expr(rhs),
            ExprKind::Infix { lhs, rhs, .. } => {
                self.bind_expr(lhs);
                self.bind_expr(rhs);
            }
            ExprKind::Block(block) => self.scoped(|binder| {
                binder.bind_stmnts(&mut block.stmnts);
                binder.bind_expr(&mut block.expr);
            }),
            ExprKind::If {
                cond,
                then_expr,
                else_expr,
            } => {
                self.bind_expr(cond);
                self.bind_expr(then_expr);
                self.bind_expr(else_expr);
            }
            ExprKind::Match { scrutinee, arms } => {
                self.bind_expr(scrutinee);
                for arm in arms {
                    self.scoped(|binder| {
                        binder.bind_ptrn(&mut arm.ptrn, false);
                        binder.bind_expr(&mut arm.body);
                    });
                }
            }
            ExprKind::For { ptrn, iter, body } => {
                self.bind_expr(iter);
                self.scoped(|binder| {
                    binder.bind_ptrn(ptrn, false);
                    binder.bind_expr(body);
                });
            }
            ExprKind::While { cond, body } => {
                self.bind_expr(cond);
                self.bind_expr(body);
            }
            ExprKind::Pack { domain, body } | ExprKind::Variadic { domain, body } => {
                self.scoped(|binder| {
                    binder.bind_ptrn(domain, false);
                    binder.bind_expr(body);
                })
            }
        }
    }

    fn resolve(&mut self, id_expr: &mut IdExpr) {
        let symbol = id_expr.id.symbol;
        let decl = match self.lookup(symbol) {
            Some(decl) => {
                trace!(name = %self.compiler.name(symbol), decl = decl.index(), "resolved");
                decl
            }
            None => match id_expr.decl.get() {
                // Already reported when the placeholder was recorded.
                Some(existing) if self.decls[existing].is_error() => existing,
                _ => {
                    let name = self.compiler.name(symbol);
                    self.compiler.report(
                        Diagnostic::error(
                            format!("use of undeclared identifier `{name}`"),
                            id_expr.id.span,
                        )
                        .with_code("E0201"),
                    );
                    self.decls.push(Decl {
                        symbol,
                        span: id_expr.id.span,
                        kind: DeclKind::Error,
                    })
                }
            },
        };
        if id_expr.decl.set(decl).is_err() {
            let name = self.compiler.name(symbol);
            self.compiler.report(
                Diagnostic::error(
                    format!("`{name}` is already bound to a different declaration"),
                    id_expr.id.span,
                )
                .with_code("E0203"),
            );
        }
    }
}
