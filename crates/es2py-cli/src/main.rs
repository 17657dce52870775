//! es2py command-line driver
//!
//! Reads one source file, transpiles it, writes one Python file, and
//! optionally ships the runtime companion and executes the result. All
//! rejections print the rendered diagnostic and exit non-zero; no partial
//! output is written.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::filter::EnvFilter;

use es2py_transform::{Transpiler, render_diagnostic};

#[derive(Parser)]
#[command(name = "es2py", version, about = "Translate an ES5 subset to Python")]
struct Cli {
    /// Input source file
    input: PathBuf,

    /// Output path (defaults to the input with a .py extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write js_compat.py next to the output (implied by --run)
    #[arg(long)]
    emit_runtime: bool,

    /// Execute the emitted program with python3, propagating its exit status
    #[arg(long)]
    run: bool,

    /// Dump the transformed Python AST to stderr
    #[arg(long)]
    print_ast: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let source = std::fs::read_to_string(&cli.input)
        .with_context(|| format!("reading {}", cli.input.display()))?;
    let source_url = cli.input.display().to_string();

    // Transform completes before any file is created, so a rejection can
    // never leave partial output behind.
    let module = match Transpiler::new().transpile_to_module(&source, &source_url) {
        Ok(module) => module,
        Err(err) => {
            eprint!("{}", render_diagnostic(&source, &source_url, &err));
            return Ok(ExitCode::FAILURE);
        }
    };

    if cli.print_ast {
        eprintln!("{:#?}", module);
    }

    let emitted = es2py_pyast::unparse(&module);
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| cli.input.with_extension("py"));
    std::fs::write(&output, &emitted)
        .with_context(|| format!("writing {}", output.display()))?;
    tracing::info!(output = %output.display(), "wrote module");

    if cli.emit_runtime || cli.run {
        let dir = output.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        let runtime_path = dir.join(es2py_runtime::FILE_NAME);
        std::fs::write(&runtime_path, es2py_runtime::SOURCE)
            .with_context(|| format!("writing {}", runtime_path.display()))?;
        tracing::info!(runtime = %runtime_path.display(), "wrote runtime companion");
    }

    if cli.run {
        let status = std::process::Command::new("python3")
            .arg(&output)
            .status()
            .context("running python3")?;
        let code = status.code().unwrap_or(1);
        return Ok(if code == 0 {
            ExitCode::SUCCESS
        } else {
            ExitCode::from(code.clamp(0, 255) as u8)
        });
    }

    Ok(ExitCode::SUCCESS)
}
