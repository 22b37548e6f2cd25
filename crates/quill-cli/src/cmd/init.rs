use super::{DB_FILE, QUILL_DIR};
use crate::output::{OutputMode, pretty_kv, render_mode};
use anyhow::{Context as _, Result};
use clap::Args;
use quill_core::db;
use quill_core::db::migrations::current_schema_version;
use serde::Serialize;
use std::path::Path;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Force re-initialization even if `.quill/` already exists.
    #[arg(long)]
    pub force: bool,
}

const CONFIG_TOML: &str = "[pagination]\n\
    default_page_size = 20\n\
    max_page_size = 100\n\
    query_timeout_ms = 5000\n\
    parallel_window = true\n\
    window_probe = \"lookahead\"\n";

const GITIGNORE: &str = "quill.db\nquill.db-wal\nquill.db-shm\n";

#[derive(Debug, Serialize)]
struct InitOutput {
    ok: bool,
    path: String,
    schema_version: u32,
}

/// Execute `ql init`. Creates the project skeleton:
///
/// ```text
/// .quill/
///   config.toml   (default pagination settings)
///   .gitignore    (quill.db and its WAL files)
///   quill.db      (migrated SQLite store)
/// ```
///
/// An existing database is kept and migrated in place on `--force`.
///
/// # Errors
///
/// Returns an error if `.quill/` already exists and `--force` is not set,
/// or if any filesystem or database operation fails.
pub fn run_init(args: &InitArgs, project_root: &Path, output: OutputMode) -> Result<()> {
    let quill_dir = project_root.join(QUILL_DIR);

    if quill_dir.exists() && !args.force {
        anyhow::bail!(".quill/ already exists. Use `ql init --force` to reinitialize.");
    }

    std::fs::create_dir_all(&quill_dir)
        .with_context(|| format!("Failed to create {}", quill_dir.display()))?;

    let config_path = quill_dir.join("config.toml");
    std::fs::write(&config_path, CONFIG_TOML)
        .with_context(|| format!("Failed to write config: {}", config_path.display()))?;

    let gitignore_path = quill_dir.join(".gitignore");
    std::fs::write(&gitignore_path, GITIGNORE)
        .with_context(|| format!("Failed to write .gitignore: {}", gitignore_path.display()))?;

    let db_path = quill_dir.join(DB_FILE);
    let conn = db::open_store(&db_path)?;
    let schema_version = current_schema_version(&conn).context("read schema version")?;
    tracing::info!(path = %db_path.display(), schema_version, "initialized quill project");

    let result = InitOutput {
        ok: true,
        path: quill_dir.display().to_string(),
        schema_version,
    };

    render_mode(
        output,
        &result,
        |r, w| writeln!(w, "initialized\t{}\tschema v{}", r.path, r.schema_version),
        |r, w| {
            writeln!(w, "✓ Initialized .quill/ project structure.")?;
            writeln!(w)?;
            pretty_kv(w, "Config", ".quill/config.toml")?;
            pretty_kv(w, "Database", format!(".quill/{DB_FILE}"))?;
            pretty_kv(w, "Schema", format!("v{}", r.schema_version))?;
            writeln!(w)?;
            writeln!(w, "Next steps:")?;
            writeln!(w, "  ql post add \"My first post\" --publish")
        },
    )
}
