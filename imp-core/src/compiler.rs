use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::ast::Module;
use crate::diagnostic::{Diagnostic, DiagnosticCounts, Severity};
use crate::error::CoreError;
use crate::name_resolve::resolve_names;
use crate::parser::Parser;
use crate::span::{FileId, Span};
use crate::symbol::{Interner, Symbol};
use crate::token::TokenKind;

const KEYWORDS: &[(&str, TokenKind)] = &[
    ("def", TokenKind::Def),
    ("fn", TokenKind::Fn),
    ("let", TokenKind::Let),
    ("if", TokenKind::If),
    ("else", TokenKind::Else),
    ("match", TokenKind::Match),
    ("for", TokenKind::For),
    ("in", TokenKind::In),
    ("while", TokenKind::While),
    ("cn", TokenKind::Cn),
    ("\\pi", TokenKind::Pi),
    ("\\lambda", TokenKind::Lambda),
    ("\\bot", TokenKind::Bottom),
];

/// State of one compilation run: keyword table, file table, interner and
/// diagnostics.
///
/// Each independent run owns its own `Compiler`. Runs may share an
/// [`Interner`] through [`Compiler::with_interner`]; nothing else is shared.
pub struct Compiler {
    interner: Arc<Interner>,
    keywords: HashMap<Symbol, TokenKind>,
    files: Vec<String>,
    diagnostics: Vec<Diagnostic>,
    counts: DiagnosticCounts,
    sink: Option<Box<dyn Write + Send>>,
}

impl Compiler {
    pub fn new() -> Self {
        Compiler::with_interner(Arc::new(Interner::new()))
    }

    pub fn with_interner(interner: Arc<Interner>) -> Self {
        let keywords = KEYWORDS
            .iter()
            .map(|&(text, kind)| (interner.intern(text), kind))
            .collect();
        Compiler {
            interner,
            keywords,
            files: Vec::new(),
            diagnostics: Vec::new(),
            counts: DiagnosticCounts::default(),
            sink: None,
        }
    }

    /// Write every diagnostic to `sink` as soon as it is reported.
    pub fn with_sink(mut self, sink: impl Write + Send + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn interner(&self) -> &Arc<Interner> {
        &self.interner
    }

    pub fn intern(&self, text: &str) -> Symbol {
        self.interner.intern(text)
    }

    pub fn name(&self, symbol: Symbol) -> String {
        self.interner.name(symbol)
    }

    pub fn keyword(&self, symbol: Symbol) -> Option<TokenKind> {
        self.keywords.get(&symbol).copied()
    }

    pub fn add_file(&mut self, name: impl Into<String>) -> FileId {
        let id = FileId(self.files.len() as u32);
        self.files.push(name.into());
        id
    }

    pub fn file_name(&self, file: FileId) -> &str {
        self.files
            .get(file.0 as usize)
            .map(String::as_str)
            .unwrap_or("<unknown>")
    }

    pub fn error(&mut self, span: Span, message: impl Into<String>) {
        self.report(Diagnostic::error(message, span));
    }

    pub fn warning(&mut self, span: Span, message: impl Into<String>) {
        self.report(Diagnostic::warning(message, span));
    }

    pub fn note(&mut self, span: Span, message: impl Into<String>) {
        self.report(Diagnostic::note(message, span));
    }

    /// Record, count and (if a sink is installed) write a diagnostic.
    /// Never fails: a broken sink only loses the rendered line.
    pub fn report(&mut self, diag: Diagnostic) {
        match diag.severity {
            Severity::Error => self.counts.errors += 1,
            Severity::Warning => self.counts.warnings += 1,
            Severity::Note => {}
        }
        debug!(severity = %diag.severity, span = %diag.span, "{}", diag.message);
        if let Some(sink) = self.sink.as_mut() {
            let line = render(&self.files, &diag);
            let _ = writeln!(sink, "{line}");
        }
        self.diagnostics.push(diag);
    }

    pub fn render(&self, diag: &Diagnostic) -> String {
        render(&self.files, diag)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn num_errors(&self) -> usize {
        self.counts.errors
    }

    pub fn num_warnings(&self) -> usize {
        self.counts.warnings
    }

    pub fn counts(&self) -> DiagnosticCounts {
        self.counts
    }

    /// Lex and parse one source unit without binding it.
    pub fn parse_source(&mut self, name: &str, source: &str) -> Module {
        let file = self.add_file(name);
        debug!(file = name, bytes = source.len(), "parsing");
        Parser::new(self, file, source).parse_module()
    }

    /// Run the whole front end on one source unit: lex, parse, bind.
    ///
    /// Always completes all passes; inspect [`Compiler::num_errors`] to decide
    /// whether the result is worth emitting.
    pub fn compile(&mut self, name: &str, source: &str) -> Module {
        let mut module = self.parse_source(name, source);
        debug!(file = name, errors = self.num_errors(), "binding");
        resolve_names(self, &mut module);
        module
    }

    pub fn compile_file(&mut self, path: impl AsRef<Path>) -> Result<Module, CoreError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| CoreError::SourceFile {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(self.compile(&path.display().to_string(), &source))
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Compiler::new()
    }
}

impl fmt::Debug for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiler")
            .field("files", &self.files)
            .field("counts", &self.counts)
            .field("interner", &self.interner)
            .finish_non_exhaustive()
    }
}

fn render(files: &[String], diag: &Diagnostic) -> String {
    let file = files
        .get(diag.span.file.0 as usize)
        .map(String::as_str)
        .unwrap_or("<unknown>");
    match diag.code {
        Some(code) => format!(
            "{file}:{}: {}[{code}]: {}",
            diag.span, diag.severity, diag.message
        ),
        None => format!("{file}:{}: {}: {}", diag.span, diag.severity, diag.message),
    }
}

/// Result of compiling a single source unit with a fresh compiler.
#[derive(Debug)]
pub struct CompilationArtifact {
    pub module: Module,
    pub diagnostics: Vec<Diagnostic>,
    pub rendered: Vec<String>,
    pub counts: DiagnosticCounts,
    pub interner: Arc<Interner>,
}

impl CompilationArtifact {
    /// Turn an artifact with errors into [`CoreError::Aborted`].
    pub fn into_result(self, unit: &str) -> Result<CompilationArtifact, CoreError> {
        if self.counts.has_errors() {
            return Err(CoreError::Aborted {
                unit: unit.to_string(),
                errors: self.counts.errors,
            });
        }
        Ok(self)
    }
}

/// Compile `source` with a fresh [`Compiler`].
pub fn compile(name: &str, source: &str) -> CompilationArtifact {
    let mut compiler = Compiler::new();
    let module = compiler.compile(name, source);
    let rendered = compiler
        .diagnostics()
        .iter()
        .map(|diag| compiler.render(diag))
        .collect();
    CompilationArtifact {
        module,
        rendered,
        counts: compiler.counts(),
        diagnostics: std::mem::take(&mut compiler.diagnostics),
        interner: Arc::clone(compiler.interner()),
    }
}
