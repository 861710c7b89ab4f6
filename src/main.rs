use std::io::{BufRead, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing::{debug, error};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use minmod::config::{DEFAULT_LOGGABLE, Language};
use minmod::diagnostic::{Diagnostic, ansi::AnsiRenderer, json, registry};
use minmod::interpreter::Interpreter;
use minmod::lexer::Loader;
use minmod::parser;
use minmod::render::{Snapshot, Status, render_registry};

#[derive(Parser, Debug)]
#[command(name = "minmod", version)]
#[command(about = "Run a minmod program and print its final stacks")]
struct Cli {
    /// Program to run
    #[arg(required_unless_present = "explain")]
    file: Option<PathBuf>,

    /// Print the stacks before every step and wait for Enter
    #[arg(short, long)]
    debug: bool,

    /// Print diagnostics and the final state as JSON
    #[arg(long)]
    json: bool,

    /// Instructions whose names match this pattern are dumped with IS and DS
    #[arg(long, value_name = "REGEX", default_value = DEFAULT_LOGGABLE)]
    loggable: String,

    #[arg(long, value_enum, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,

    /// Explain an error code, e.g. MM-R006
    #[arg(long, value_name = "CODE")]
    explain: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

struct Reporter {
    json: bool,
    use_color: bool,
}

impl Reporter {
    fn report(&self, d: &Diagnostic) {
        if self.json {
            eprintln!("{}", json::render(d));
        } else {
            eprint!("{}", AnsiRenderer { use_color: self.use_color }.render(d));
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();

    let cli = Cli::parse();

    if let Some(code) = &cli.explain {
        return explain(code);
    }

    let reporter = Reporter {
        json: cli.json,
        use_color: match cli.color {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => std::io::stderr().is_terminal(),
        },
    };

    let lang = match Language::default().with_loggable(&cli.loggable) {
        Ok(lang) => lang,
        Err(e) => {
            reporter.report(&Diagnostic::error(format!("invalid --loggable pattern: {e}")));
            return ExitCode::FAILURE;
        }
    };

    match &cli.file {
        Some(file) => run(file, &lang, &cli, &reporter),
        None => ExitCode::FAILURE,
    }
}

fn explain(code: &str) -> ExitCode {
    match registry::lookup(code) {
        Some(entry) => {
            print!("{}", entry.long);
            ExitCode::SUCCESS
        }
        None => {
            eprintln!("unknown error code: {code}");
            ExitCode::FAILURE
        }
    }
}

/// Attaches the text of the file the diagnostic points into.
fn with_source(d: Diagnostic, loader: &Loader) -> Diagnostic {
    let source = d.primary().and_then(|label| loader.source(&label.location.file));
    match source {
        Some(source) => d.with_source(source),
        None => d,
    }
}

fn run(file: &Path, lang: &Language, cli: &Cli, reporter: &Reporter) -> ExitCode {
    let mut loader = Loader::new(lang);
    let lexemes = match loader.load(file) {
        Ok(lexemes) => lexemes,
        Err(e) => {
            reporter.report(&with_source(Diagnostic::from(&e), &loader));
            return ExitCode::FAILURE;
        }
    };
    debug!("{} tokens from {} file(s)", lexemes.len(), loader.files().count());

    let registry = match parser::parse(&lexemes, lang) {
        Ok(registry) => registry,
        Err(e) => {
            reporter.report(&with_source(Diagnostic::from(&e), &loader));
            return ExitCode::FAILURE;
        }
    };

    let mut interp = match Interpreter::new(registry, lang) {
        Ok(interp) => interp,
        Err(e) => {
            reporter.report(&Diagnostic::from(&e));
            return ExitCode::FAILURE;
        }
    };

    let result = if cli.debug {
        let stdin = std::io::stdin();
        interp.run_with(|interp| {
            eprintln!("-- step {}\n{}", interp.steps() + 1, render_registry(interp.registry(), lang));
            let mut line = String::new();
            if let Err(e) = stdin.lock().read_line(&mut line) {
                error!("Cannot read from stdin: {e}");
            }
        })
    } else {
        interp.run()
    };

    let failure = result.err();
    let status = if failure.is_some() { Status::Failure } else { Status::Success };

    if cli.json {
        let snapshot = Snapshot::capture(interp.registry(), lang, status, interp.steps());
        let mut out = serde_json::to_value(&snapshot).unwrap_or_default();
        if let Some(e) = &failure {
            out["error"] = json::to_value(&Diagnostic::from(e));
        }
        println!("{out}");
    } else {
        if let Some(e) = &failure {
            reporter.report(&Diagnostic::from(e));
        }
        println!("Final stacks:\n{}", render_registry(interp.registry(), lang));
    }

    match failure {
        Some(_) => ExitCode::FAILURE,
        None => ExitCode::SUCCESS,
    }
}
