use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tower_lsp::{LspService, Server};
use tracing_subscriber::EnvFilter;

use cppcomplete_lsp::{Backend, CompletionSettings, Snapshot, config, index_directory};

/// C and C++ code completion over the Language Server Protocol.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Log filter (`info`, `debug`, `cppcomplete_lsp=trace`, ...); overrides
    /// `RUST_LOG`.
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the completion candidates at a position and exit.
    Complete {
        file: PathBuf,
        /// One-based line.
        line: u32,
        /// One-based column, in characters.
        column: u32,
    },
}

fn run_complete(file: PathBuf, line: u32, column: u32) -> ExitCode {
    let text = match std::fs::read_to_string(&file) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", file.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let root = file.parent().map(|p| p.to_path_buf());
    let mut settings: CompletionSettings = config::load(root.as_deref(), None);
    settings.header_paths = settings.resolved_header_paths(root.as_deref());
    let snapshot = match &root {
        Some(root) => Snapshot::new().with_documents(index_directory(root, &settings)),
        None => Snapshot::new(),
    };

    let position = tower_lsp::lsp_types::Position {
        line: line.saturating_sub(1),
        character: column.saturating_sub(1),
    };
    let cursor = cppcomplete_lsp::util::position_to_byte_offset(&text, position);
    let Some(proposal) =
        cppcomplete_lsp::start_completion(&snapshot, &settings, &file, &text, cursor)
    else {
        return ExitCode::SUCCESS;
    };

    for hint in &proposal.hints {
        println!("{}", hint.label);
    }
    let typed = proposal.request.typed_prefix(&text);
    for candidate in cppcomplete_lsp::completion::ranking::filter(
        &proposal.candidates,
        typed,
        settings.case_sensitivity,
    ) {
        match &candidate.detail {
            Some(detail) => println!("{}\t{}", candidate.text, detail),
            None => println!("{}", candidate.text),
        }
    }
    ExitCode::SUCCESS
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // stdout carries the LSP stream, so logs go to stderr.
    let filter = match &cli.log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(Command::Complete { file, line, column }) = cli.command {
        return run_complete(file, line, column);
    }

    tracing::info!("Starting cppcomplete language server");

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(Backend::new);
    Server::new(stdin, stdout, socket).serve(service).await;

    ExitCode::SUCCESS
}
