//! `ql comment`: append and soft-delete comments.

use super::CmdContext;
use crate::output::{CliError, render, render_error};
use chrono::Utc;
use clap::{Args, Subcommand};
use quill_core::ErrorCode;
use quill_core::db::query;
use std::env;

const MAX_COMMENT_BODY_CHARS: usize = 8_192;

/// Environment fallback for `--author`.
const AUTHOR_ENV: &str = "QUILL_AUTHOR";

#[derive(Args, Debug)]
pub struct CommentArgs {
    #[command(subcommand)]
    pub command: CommentCommand,
}

#[derive(Subcommand, Debug)]
pub enum CommentCommand {
    #[command(
        about = "Add a comment to a post",
        after_help = "EXAMPLES:\n    # Comment as $QUILL_AUTHOR (or anonymous)\n    ql comment add 1 \"Great write-up\"\n\n    # Explicit author\n    ql comment add 1 \"Typo in the intro\" --author alice"
    )]
    Add(CommentAddArgs),

    #[command(about = "Soft-delete a comment")]
    Delete(CommentDeleteArgs),
}

#[derive(Args, Debug)]
pub struct CommentAddArgs {
    /// Post to comment on.
    pub post_id: i64,

    /// Comment body.
    pub body: String,

    /// Comment author (defaults to $QUILL_AUTHOR, then "anonymous").
    #[arg(long)]
    pub author: Option<String>,
}

#[derive(Args, Debug)]
pub struct CommentDeleteArgs {
    /// Comment id.
    pub id: i64,
}

fn resolve_author(flag: Option<&str>, env_author: Option<String>) -> String {
    flag.map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .or_else(|| env_author.map(|a| a.trim().to_string()).filter(|a| !a.is_empty()))
        .unwrap_or_else(|| "anonymous".to_string())
}

fn validate_comment_body(body: &str) -> anyhow::Result<()> {
    if body.trim().is_empty() {
        anyhow::bail!("comment body must not be empty");
    }

    if body.chars().count() > MAX_COMMENT_BODY_CHARS {
        anyhow::bail!(
            "comment body must be <= {MAX_COMMENT_BODY_CHARS} characters (got {})",
            body.chars().count()
        );
    }

    if body
        .chars()
        .any(|ch| ch.is_control() && ch != '\n' && ch != '\t')
    {
        anyhow::bail!("comment body must not contain control characters");
    }

    Ok(())
}

pub fn run_comment(args: &CommentArgs, ctx: &CmdContext) -> anyhow::Result<()> {
    match &args.command {
        CommentCommand::Add(add) => run_comment_add(add, ctx),
        CommentCommand::Delete(delete) => run_comment_delete(delete, ctx),
    }
}

fn run_comment_add(args: &CommentAddArgs, ctx: &CmdContext) -> anyhow::Result<()> {
    if let Err(e) = validate_comment_body(&args.body) {
        let msg = e.to_string();
        render_error(
            ctx.output,
            &CliError::with_details(
                &msg,
                "Use plain UTF-8 text and keep within size limit",
                ErrorCode::InvalidArgument.code(),
            ),
        )?;
        anyhow::bail!("{}", msg);
    }

    let author = resolve_author(args.author.as_deref(), env::var(AUTHOR_ENV).ok());

    let store = ctx.open_store()?;
    let conn = store.conn();
    if !query::post_exists(&conn, args.post_id)? {
        return ctx.not_found(
            ErrorCode::PostNotFound,
            format!("post {} not found", args.post_id),
        );
    }

    let comment = query::insert_comment(&conn, args.post_id, &author, &args.body, Utc::now())?;
    tracing::info!(
        comment_id = comment.comment_id,
        post_id = comment.post_id,
        "comment added"
    );

    render(ctx.output, &comment, |c, w| {
        writeln!(w, "✓ comment {} added to post {}", c.comment_id, c.post_id)
    })
}

fn run_comment_delete(args: &CommentDeleteArgs, ctx: &CmdContext) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let conn = store.conn();
    if !query::soft_delete_comment(&conn, args.id, Utc::now())? {
        return ctx.not_found(
            ErrorCode::CommentNotFound,
            format!("comment {} not found", args.id),
        );
    }
    let Some(comment) = query::get_comment(&conn, args.id)? else {
        return ctx.not_found(
            ErrorCode::CommentNotFound,
            format!("comment {} not found", args.id),
        );
    };

    render(ctx.output, &comment, |c, w| {
        writeln!(w, "✓ comment {} deleted", c.comment_id)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn author_precedence() {
        assert_eq!(resolve_author(Some("alice"), Some("bob".into())), "alice");
        assert_eq!(resolve_author(None, Some("bob".into())), "bob");
        assert_eq!(resolve_author(Some("  "), Some(" bob ".into())), "bob");
        assert_eq!(resolve_author(None, None), "anonymous");
        assert_eq!(resolve_author(None, Some(String::new())), "anonymous");
    }

    #[test]
    fn body_validation() {
        assert!(validate_comment_body("hello\nworld\tok").is_ok());
        assert!(validate_comment_body("   ").is_err());
        assert!(validate_comment_body("bell\u{7}").is_err());
        assert!(validate_comment_body(&"x".repeat(MAX_COMMENT_BODY_CHARS + 1)).is_err());
    }
}
