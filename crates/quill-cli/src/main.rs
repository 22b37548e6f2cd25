#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use cmd::CmdContext;
use output::{CliError, OutputMode, render_error};
use quill_core::ErrorCode;
use quill_core::config::resolve_config;
use std::env;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "quill: cursor-paginated comment threads",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Output format (overrides --json, FORMAT and user config).
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Use this database file instead of `.quill/quill.db`.
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Per-query deadline in milliseconds; 0 disables it.
    #[arg(long, global = true, value_name = "MS")]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Lifecycle",
        about = "Initialize a quill project",
        long_about = "Create .quill/ with a default config and a migrated database.",
        after_help = "EXAMPLES:\n    # Initialize a project in the current directory\n    ql init\n\n    # Rewrite config.toml for an existing project\n    ql init --force"
    )]
    Init(cmd::init::InitArgs),

    #[command(next_help_heading = "Write", about = "Manage posts")]
    Post(cmd::post::PostArgs),

    #[command(next_help_heading = "Write", about = "Add or delete comments")]
    Comment(cmd::comment::CommentArgs),

    #[command(
        next_help_heading = "Read",
        about = "Page through the comments of one post",
        long_about = "Page through a post's comments, oldest first, using opaque cursors.",
        after_help = "EXAMPLES:\n    # First page\n    ql comments 1 --first 10\n\n    # Next page, using the end cursor of the previous one\n    ql comments 1 --first 10 --after <CURSOR>\n\n    # Last page\n    ql comments 1 --last 10"
    )]
    Comments(cmd::page::CommentsArgs),

    #[command(
        next_help_heading = "Read",
        about = "Page through comments of every published post",
        after_help = "EXAMPLES:\n    # Newest comments across all published posts\n    ql feed --last 20\n\n    # Emit machine-readable output\n    ql feed --first 20 --json"
    )]
    Feed(cmd::page::FeedArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show comments around an anchor comment",
        long_about = "Show up to N comments before and after an anchor comment of a post.",
        after_help = "EXAMPLES:\n    # Five comments on either side of comment 42\n    ql window 1 42\n\n    # Asymmetric window\n    ql window 1 42 --before 2 --after 10"
    )]
    Window(cmd::window::WindowArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("QUILL_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "quill=debug,info"
        } else {
            "quill=info,warn"
        })
    });

    let format = env::var("QUILL_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    // stdout carries command output; logs go to stderr.
    match format.as_str() {
        "json" => {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_ansi(false)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

/// The directory holding `.quill/`, or `cwd` when there is none yet.
fn project_root(cwd: &Path) -> PathBuf {
    cmd::find_quill_dir(cwd)
        .and_then(|dir| dir.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| cwd.to_path_buf())
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let cwd = env::current_dir()?;
    let root = project_root(&cwd);

    let effective = match resolve_config(&root, cli.json) {
        Ok(effective) => effective,
        Err(err) => {
            let code = ErrorCode::ConfigParseError;
            let mode = cli.format.unwrap_or(if cli.json {
                OutputMode::Json
            } else {
                OutputMode::Text
            });
            render_error(
                mode,
                &CliError::with_details(
                    format!("{err:#}"),
                    code.hint().unwrap_or_default(),
                    code.code(),
                ),
            )?;
            return Err(err);
        }
    };

    let output = cli
        .format
        .unwrap_or_else(|| OutputMode::from_resolved(&effective.resolved_output));

    let mut pagination = effective.project.pagination;
    if let Some(timeout_ms) = cli.timeout_ms {
        pagination.query_timeout_ms = timeout_ms;
    }

    let ctx = CmdContext {
        project_root: root,
        db_override: cli.db,
        pagination,
        output,
    };

    match cli.command {
        Commands::Init(args) => cmd::init::run_init(&args, &cwd, output),
        Commands::Post(args) => cmd::post::run_post(&args, &ctx),
        Commands::Comment(args) => cmd::comment::run_comment(&args, &ctx),
        Commands::Comments(args) => cmd::page::run_comments(&args, &ctx),
        Commands::Feed(args) => cmd::page::run_feed(&args, &ctx),
        Commands::Window(args) => cmd::window::run_window(&args, &ctx),
    }
}
