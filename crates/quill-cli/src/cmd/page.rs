//! `ql comments` and `ql feed`: cursor pagination over comments.

use super::CmdContext;
use crate::output::{OutputMode, fail_page, pretty_kv, pretty_rule, pretty_section, render_mode};
use clap::Args;
use quill_core::model::Comment;
use quill_core::{CancelToken, Connection, PageArgs, Paginator, Scope, Visibility};
use std::io::{self, Write};

/// Relay paging flags shared by every paged command.
#[derive(Args, Debug, Clone, Default)]
pub struct PageFlags {
    /// Return the first N comments (after --after, if given).
    #[arg(long, value_name = "N")]
    pub first: Option<u32>,

    /// Cursor to page forward from.
    #[arg(long, value_name = "CURSOR")]
    pub after: Option<String>,

    /// Return the last N comments (before --before, if given).
    #[arg(long, value_name = "N")]
    pub last: Option<u32>,

    /// Cursor to page backward from.
    #[arg(long, value_name = "CURSOR")]
    pub before: Option<String>,
}

impl PageFlags {
    /// Fill in a count when none was given: `--before` implies `--last`,
    /// anything else pages forward.
    pub fn to_page_args(&self, default_page_size: u32) -> PageArgs {
        let mut args = PageArgs {
            first: self.first,
            after: self.after.clone(),
            last: self.last,
            before: self.before.clone(),
        };
        if args.first.is_none() && args.last.is_none() {
            if args.before.is_some() && args.after.is_none() {
                args.last = Some(default_page_size);
            } else {
                args.first = Some(default_page_size);
            }
        }
        args
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct VisibilityFlags {
    /// Include soft-deleted comments.
    #[arg(long, conflicts_with = "deleted_only")]
    pub include_deleted: bool,

    /// Only soft-deleted comments.
    #[arg(long)]
    pub deleted_only: bool,
}

impl VisibilityFlags {
    pub const fn visibility(&self) -> Visibility {
        if self.deleted_only {
            Visibility::DELETED
        } else if self.include_deleted {
            Visibility::ALL
        } else {
            Visibility::LIVE
        }
    }
}

#[derive(Args, Debug)]
pub struct CommentsArgs {
    /// Post whose comments to page through.
    pub post_id: i64,

    #[command(flatten)]
    pub page: PageFlags,

    #[command(flatten)]
    pub visibility: VisibilityFlags,
}

#[derive(Args, Debug)]
pub struct FeedArgs {
    #[command(flatten)]
    pub page: PageFlags,

    #[command(flatten)]
    pub visibility: VisibilityFlags,
}

pub fn run_comments(args: &CommentsArgs, ctx: &CmdContext) -> anyhow::Result<()> {
    run_paged(Scope::Post(args.post_id), &args.page, &args.visibility, ctx)
}

pub fn run_feed(args: &FeedArgs, ctx: &CmdContext) -> anyhow::Result<()> {
    run_paged(Scope::Feed, &args.page, &args.visibility, ctx)
}

fn run_paged(
    scope: Scope,
    page: &PageFlags,
    visibility: &VisibilityFlags,
    ctx: &CmdContext,
) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let paginator = Paginator::new(store, ctx.pagination.clone());
    let args = page.to_page_args(ctx.pagination.default_page_size);

    let connection = paginator
        .page(scope, visibility.visibility(), &args, &CancelToken::new())
        .map_err(|err| fail_page(ctx.output, err))?;

    render_connection(ctx.output, &connection)
}

/// Single-line form of a comment body for tab-separated output.
fn escape_field(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('\t', "\\t")
}

fn write_text(conn: &Connection<Comment>, w: &mut dyn Write) -> io::Result<()> {
    for edge in &conn.edges {
        let c = &edge.node;
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}\t{}",
            c.comment_id,
            c.post_id,
            c.created_at.to_rfc3339(),
            escape_field(&c.author),
            if c.is_deleted { "deleted" } else { "live" },
            escape_field(&c.body)
        )?;
    }
    let info = &conn.page_info;
    if info.has_previous_page
        && let Some(cursor) = &info.start_cursor
    {
        writeln!(w, "prev\t{cursor}")?;
    }
    if info.has_next_page
        && let Some(cursor) = &info.end_cursor
    {
        writeln!(w, "next\t{cursor}")?;
    }
    Ok(())
}

fn write_pretty(conn: &Connection<Comment>, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, &format!("Comments ({})", conn.len()))?;
    if conn.is_empty() {
        writeln!(w, "(none)")?;
    }
    for c in conn.nodes() {
        let marker = if c.is_deleted { " [deleted]" } else { "" };
        writeln!(
            w,
            "#{} on post {} by {} at {}{marker}",
            c.comment_id,
            c.post_id,
            c.author,
            c.created_at.format("%Y-%m-%d %H:%M:%S")
        )?;
        for line in c.body.lines() {
            writeln!(w, "    {line}")?;
        }
    }
    pretty_rule(w)?;
    let info = &conn.page_info;
    pretty_kv(w, "previous", if info.has_previous_page { "yes" } else { "no" })?;
    pretty_kv(w, "next", if info.has_next_page { "yes" } else { "no" })?;
    if let Some(cursor) = &info.start_cursor {
        pretty_kv(w, "start", cursor.as_str())?;
    }
    if let Some(cursor) = &info.end_cursor {
        pretty_kv(w, "end", cursor.as_str())?;
    }
    Ok(())
}

/// Render a page of comments. JSON is the connection itself.
pub fn render_connection(output: OutputMode, conn: &Connection<Comment>) -> anyhow::Result<()> {
    render_mode(output, conn, write_text, write_pretty)
}
