pub mod comment;
pub mod init;
pub mod page;
pub mod post;
pub mod window;

use crate::output::{CliError, OutputMode, render_error};
use quill_core::ErrorCode;
use quill_core::SqliteStore;
use quill_core::config::PaginationConfig;
use std::path::{Path, PathBuf};

/// Name of the project directory created by `ql init`.
pub const QUILL_DIR: &str = ".quill";

/// Database file name inside [`QUILL_DIR`].
pub const DB_FILE: &str = "quill.db";

/// Settings every store-backed command needs.
#[derive(Debug, Clone)]
pub struct CmdContext {
    pub project_root: PathBuf,
    pub db_override: Option<PathBuf>,
    pub pagination: PaginationConfig,
    pub output: OutputMode,
}

impl CmdContext {
    /// Resolve the database path: `--db` wins, otherwise the nearest
    /// `.quill/quill.db` walking up from the project root.
    fn db_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.db_override {
            return Some(path.clone());
        }
        find_quill_dir(&self.project_root).map(|dir| dir.join(DB_FILE))
    }

    /// Open the store, rendering a structured error when there is none.
    pub fn open_store(&self) -> anyhow::Result<SqliteStore> {
        let Some(db_path) = self.db_path() else {
            let code = ErrorCode::NotInitialized;
            let msg = "Not a quill project: .quill directory not found";
            render_error(
                self.output,
                &CliError::with_details(msg, code.hint().unwrap_or_default(), code.code()),
            )?;
            anyhow::bail!(msg);
        };

        tracing::debug!(path = %db_path.display(), "opening store");
        match SqliteStore::open(&db_path) {
            Ok(store) => Ok(store),
            Err(err) => {
                let code = ErrorCode::StorageFailure;
                render_error(
                    self.output,
                    &CliError::with_details(
                        format!("{err:#}"),
                        code.hint().unwrap_or_default(),
                        code.code(),
                    ),
                )?;
                Err(err)
            }
        }
    }

    /// Render a plain not-found error and fail.
    pub fn not_found(&self, code: ErrorCode, msg: String) -> anyhow::Result<()> {
        let suggestion = match code {
            ErrorCode::PostNotFound => "List posts with `ql post list`",
            _ => "Check the id and retry",
        };
        render_error(
            self.output,
            &CliError::with_details(&msg, suggestion, code.code()),
        )?;
        anyhow::bail!(msg)
    }
}

/// Walk up from `start` looking for a `.quill/` directory.
pub fn find_quill_dir(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(QUILL_DIR);
        if candidate.is_dir() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_quill_dir_in_ancestors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".quill")).unwrap();
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_quill_dir(&nested), Some(dir.path().join(".quill")));
    }

    #[test]
    fn db_override_skips_discovery() {
        let ctx = CmdContext {
            project_root: PathBuf::from("/nonexistent"),
            db_override: Some(PathBuf::from("/tmp/custom.db")),
            pagination: PaginationConfig::default(),
            output: OutputMode::Text,
        };
        assert_eq!(ctx.db_path(), Some(PathBuf::from("/tmp/custom.db")));
    }
}
