use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use imp_core::emit::{TextBuilder, emit};
use imp_core::lexer::lex;
use imp_core::print::print_module;
use imp_core::symbol::Interner;
use imp_core::{Compiler, DiagnosticCounts};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// コマンドライン引数を定義するための構造体
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[arg(
        short,
        long,
        value_name = "PATH",
        help = "Source file or directory (searched for *.imp); repeatable, stdin when absent"
    )]
    input: Vec<PathBuf>,

    #[arg(short, long, value_name = "PATH", help = "Write output here instead of stdout")]
    output: Option<PathBuf>,

    #[arg(
        long,
        value_name = "FORMAT",
        default_value = "none",
        help = "Output format: tokens, ast, ir, none"
    )]
    emit: String,

    #[arg(short, long, action = clap::ArgAction::Count, help = "More logging (-v, -vv, -vvv)")]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Emit {
    Tokens,
    Ast,
    Ir,
    None,
}

impl Emit {
    fn parse(format: &str) -> Result<Emit> {
        match format {
            "tokens" => Ok(Emit::Tokens),
            "ast" => Ok(Emit::Ast),
            "ir" => Ok(Emit::Ir),
            "none" => Ok(Emit::None),
            other => Err(anyhow!("unsupported emit format: {other}")),
        }
    }
}

struct Unit {
    name: String,
    source: String,
}

struct UnitResult {
    rendered: Vec<String>,
    counts: DiagnosticCounts,
    output: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    execute(cli)
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn execute(cli: Cli) -> Result<()> {
    let format = Emit::parse(&cli.emit)?;
    let units = collect_units(&cli.input)?;
    info!(units = units.len(), "compiling");

    let interner = Arc::new(Interner::new());
    let results = thread::scope(|scope| {
        let handles: Vec<_> = units
            .iter()
            .map(|unit| {
                let interner = Arc::clone(&interner);
                scope.spawn(move || compile_unit(unit, interner, format))
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .map_err(|_| anyhow!("compiler thread panicked"))?
            })
            .collect::<Result<Vec<_>>>()
    })?;

    let mut counts = DiagnosticCounts::default();
    let mut output = String::new();
    let stderr = io::stderr();
    let mut stderr = stderr.lock();
    for (unit, result) in units.iter().zip(&results) {
        for line in &result.rendered {
            writeln!(stderr, "{line}")?;
        }
        counts.merge(result.counts);
        if format != Emit::None {
            if units.len() > 1 {
                output.push_str(&format!("// {}\n", unit.name));
            }
            output.push_str(&result.output);
        }
    }
    writeln!(stderr, "{counts}")?;

    if format != Emit::None {
        match &cli.output {
            Some(path) => write_output(path, output.as_bytes())?,
            None => io::stdout().write_all(output.as_bytes())?,
        }
    }

    if counts.has_errors() {
        return Err(anyhow!("compilation failed with {} error(s)", counts.errors));
    }
    Ok(())
}

fn collect_units(inputs: &[PathBuf]) -> Result<Vec<Unit>> {
    if inputs.is_empty() {
        let mut source = String::new();
        io::stdin()
            .read_to_string(&mut source)
            .context("failed to read stdin")?;
        return Ok(vec![Unit {
            name: "<stdin>".to_string(),
            source,
        }]);
    }

    let mut paths = Vec::new();
    for input in inputs {
        if input.is_dir() {
            for entry in WalkDir::new(input).sort_by_file_name() {
                let entry =
                    entry.with_context(|| format!("failed to walk {}", input.display()))?;
                let path = entry.path();
                if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "imp")
                {
                    paths.push(path.to_path_buf());
                }
            }
        } else {
            paths.push(input.clone());
        }
    }

    paths
        .into_iter()
        .map(|path| {
            let source = fs::read_to_string(&path)
                .with_context(|| format!("failed to read input file {}", path.display()))?;
            Ok(Unit {
                name: path.display().to_string(),
                source,
            })
        })
        .collect()
}

fn compile_unit(unit: &Unit, interner: Arc<Interner>, format: Emit) -> Result<UnitResult> {
    let mut compiler = Compiler::with_interner(interner);
    let output = match format {
        Emit::Tokens => {
            let file = compiler.add_file(&unit.name);
            lex(&mut compiler, file, &unit.source)
                .iter()
                .map(|token| {
                    format!(
                        "{}\t{}\t{}\n",
                        token.span,
                        token.kind,
                        token.span.text(&unit.source)
                    )
                })
                .collect()
        }
        Emit::Ast => {
            let module = compiler.compile(&unit.name, &unit.source);
            print_module(compiler.interner(), &module)
        }
        Emit::Ir => {
            let mut module = compiler.compile(&unit.name, &unit.source);
            if compiler.num_errors() > 0 {
                debug!(unit = %unit.name, "skipping emission");
                String::new()
            } else {
                let interner = Arc::clone(compiler.interner());
                let mut builder = TextBuilder::new(&interner);
                emit(&mut builder, &mut module)
                    .with_context(|| format!("failed to emit {}", unit.name))?;
                builder.into_text()
            }
        }
        Emit::None => {
            compiler.compile(&unit.name, &unit.source);
            String::new()
        }
    };
    let rendered = compiler
        .diagnostics()
        .iter()
        .map(|diag| compiler.render(diag))
        .collect();
    Ok(UnitResult {
        rendered,
        counts: compiler.counts(),
        output,
    })
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {parent:?}"))?;
        }
    }
    fs::write(path, bytes)
        .with_context(|| format!("failed to write output file {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_cmd::Command;
    use predicates::prelude::*;
    use tempfile::tempdir;

    #[test]
    fn compiles_clean_file() {
        let dir = tempdir().expect("tempdir");
        let input_path = dir.path().join("main.imp");
        fs::write(&input_path, "def a = 1; def b = a + a;").expect("write input");

        Command::cargo_bin("imp-cli")
            .expect("binary exists")
            .arg("--input")
            .arg(&input_path)
            .assert()
            .success()
            .stderr(predicate::str::contains("0 errors, 0 warnings"));
    }

    #[test]
    fn reports_diagnostics_and_fails() {
        let dir = tempdir().expect("tempdir");
        let input_path = dir.path().join("bad.imp");
        fs::write(&input_path, "def a = b;").expect("write input");

        Command::cargo_bin("imp-cli")
            .expect("binary exists")
            .arg("-i")
            .arg(&input_path)
            .assert()
            .failure()
            .stderr(predicate::str::contains(
                "bad.imp:1:9-1:10: error[E0201]: use of undeclared identifier `b`",
            ))
            .stderr(predicate::str::contains("1 error, 0 warnings"));
    }

    #[test]
    fn emits_ast_to_output_file() {
        let dir = tempdir().expect("tempdir");
        let input_path = dir.path().join("main.imp");
        fs::write(&input_path, "def x=(a+b)*c; def a=1; def b=2; def c=3;").expect("write input");
        let output_path = dir.path().join("out/main.txt");

        Command::cargo_bin("imp-cli")
            .expect("binary exists")
            .arg("--input")
            .arg(&input_path)
            .arg("--output")
            .arg(&output_path)
            .arg("--emit")
            .arg("ast")
            .assert()
            .success();

        let printed = fs::read_to_string(&output_path).expect("read output");
        assert!(printed.starts_with("def x = (a + b) * c;\n"));
    }

    #[test]
    fn emits_tokens_from_stdin() {
        Command::cargo_bin("imp-cli")
            .expect("binary exists")
            .arg("--emit")
            .arg("tokens")
            .write_stdin("let x")
            .assert()
            .success()
            .stdout(predicate::str::contains("1:1-1:4\tlet\tlet"))
            .stdout(predicate::str::contains("1:5-1:6\tidentifier\tx"));
    }

    #[test]
    fn emits_ir() {
        Command::cargo_bin("imp-cli")
            .expect("binary exists")
            .arg("--emit")
            .arg("ir")
            .write_stdin("def a = 1;")
            .assert()
            .success()
            .stdout("%0 = param\n%1 = literal 1\n");
    }

    #[test]
    fn walks_directories_in_order() {
        let dir = tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("nested")).expect("mkdir");
        fs::write(dir.path().join("a.imp"), "def a = missing_a;").expect("write a");
        fs::write(dir.path().join("nested/b.imp"), "def b = missing_b;").expect("write b");
        fs::write(dir.path().join("notes.txt"), "not source").expect("write txt");

        let assert = Command::cargo_bin("imp-cli")
            .expect("binary exists")
            .arg("--input")
            .arg(dir.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("2 errors, 0 warnings"));
        let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
        let first = stderr.find("missing_a").expect("a reported");
        let second = stderr.find("missing_b").expect("b reported");
        assert!(first < second);
    }

    #[test]
    fn rejects_unknown_emit_format() {
        Command::cargo_bin("imp-cli")
            .expect("binary exists")
            .arg("--emit")
            .arg("wasm")
            .write_stdin("")
            .assert()
            .failure()
            .stderr(predicate::str::contains("unsupported emit format: wasm"));
    }

    #[test]
    fn emit_format_parsing() {
        assert_eq!(Emit::parse("ast").expect("ast"), Emit::Ast);
        assert!(Emit::parse("llvm").is_err());
    }
}
