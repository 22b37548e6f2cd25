//! Rendering for the three output modes.
//!
//! Handlers build a serializable value and pass it here together with
//! closures for the human forms. JSON output is always the value itself.
//!
//! Mode precedence, highest first: `--format`, `--json`, `FORMAT`, the user
//! config's `output`, then pretty on a TTY and text otherwise. Everything
//! after `--format` is resolved by [`quill_core::config::resolve_config`].

use clap::ValueEnum;
use quill_core::PageError;
use serde::Serialize;
use std::io::{self, Write};

pub const PRETTY_RULE_WIDTH: usize = 72;

pub fn pretty_rule(w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{:-<width$}", "", width = PRETTY_RULE_WIDTH)
}

/// Heading line plus a rule under it.
pub fn pretty_section(w: &mut dyn Write, heading: &str) -> io::Result<()> {
    writeln!(w, "{heading}")?;
    pretty_rule(w)
}

/// `key:` padded to 12 columns, then the value.
pub fn pretty_kv(w: &mut dyn Write, key: &str, value: impl AsRef<str>) -> io::Result<()> {
    writeln!(w, "{:<12} {}", format!("{key}:"), value.as_ref())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Sections and rules for reading in a terminal.
    Pretty,
    /// One tab-separated record per line.
    Text,
    Json,
}

impl OutputMode {
    /// Map a resolved mode name (`pretty`/`text`/`json`) to a mode.
    /// Unknown names fall back to text.
    pub fn from_resolved(name: &str) -> Self {
        match name {
            "pretty" => Self::Pretty,
            "json" => Self::Json,
            _ => Self::Text,
        }
    }

    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Error as shown to the user: `{"error": {...}}` in JSON mode.
#[derive(Debug, Serialize)]
pub struct CliError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Stable `E####` code from [`quill_core::ErrorCode`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            error_code: None,
        }
    }

    pub fn with_details(
        message: impl Into<String>,
        suggestion: impl Into<String>,
        error_code: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            suggestion: Some(suggestion.into()),
            error_code: Some(error_code.into()),
        }
    }
}

impl From<&PageError> for CliError {
    fn from(err: &PageError) -> Self {
        Self {
            message: err.to_string(),
            suggestion: err.hint().map(str::to_string),
            error_code: Some(err.code().code().to_string()),
        }
    }
}

fn write_json(out: &mut dyn Write, value: &impl Serialize) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

fn emit<T: Serialize>(
    mode: OutputMode,
    value: &T,
    human: impl FnOnce(&T, &mut dyn Write, OutputMode) -> io::Result<()>,
) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    if mode.is_json() {
        return write_json(&mut out, value);
    }
    human(value, &mut out, mode)?;
    Ok(())
}

/// Print `value` to stdout; pretty and text share `human_fn`.
pub fn render<T: Serialize>(
    mode: OutputMode,
    value: &T,
    human_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    emit(mode, value, |value, out, _| human_fn(value, out))
}

/// Print `value` to stdout with separate text and pretty renderers.
pub fn render_mode<T: Serialize>(
    mode: OutputMode,
    value: &T,
    text_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
    pretty_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    emit(mode, value, |value, out, mode| match mode {
        OutputMode::Text => text_fn(value, out),
        _ => pretty_fn(value, out),
    })
}

fn write_error(mode: OutputMode, error: &CliError, out: &mut dyn Write) -> anyhow::Result<()> {
    if mode.is_json() {
        return write_json(out, &serde_json::json!({ "error": error }));
    }
    match &error.error_code {
        Some(code) => writeln!(out, "error[{code}]: {}", error.message)?,
        None => writeln!(out, "error: {}", error.message)?,
    }
    if let Some(hint) = &error.suggestion {
        writeln!(out, "  suggestion: {hint}")?;
    }
    Ok(())
}

/// Print `error` to stderr.
pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    write_error(mode, error, &mut io::stderr().lock())
}

/// Render a [`PageError`] to stderr and turn it into the command's failure.
pub fn fail_page(mode: OutputMode, err: PageError) -> anyhow::Error {
    if let Err(render_err) = render_error(mode, &CliError::from(&err)) {
        return render_err;
    }
    anyhow::Error::new(err)
}
