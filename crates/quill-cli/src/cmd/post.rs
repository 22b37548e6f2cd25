//! `ql post`: create, publish and list posts.

use super::CmdContext;
use crate::output::{
    CliError, OutputMode, pretty_kv, pretty_rule, pretty_section, render_error, render_mode,
};
use chrono::Utc;
use clap::{Args, Subcommand};
use quill_core::ErrorCode;
use quill_core::db::query;
use quill_core::model::Post;
use std::io::{self, Write};

#[derive(Args, Debug)]
pub struct PostArgs {
    #[command(subcommand)]
    pub command: PostCommand,
}

#[derive(Subcommand, Debug)]
pub enum PostCommand {
    #[command(
        about = "Create a post",
        after_help = "EXAMPLES:\n    # Draft post\n    ql post add \"Release notes\"\n\n    # Published right away\n    ql post add \"Release notes\" --publish"
    )]
    Add(PostAddArgs),

    #[command(about = "Publish or unpublish a post")]
    Publish(PostPublishArgs),

    #[command(about = "List all posts")]
    List,
}

#[derive(Args, Debug)]
pub struct PostAddArgs {
    /// Post title.
    pub title: String,

    /// Publish the post immediately.
    #[arg(long)]
    pub publish: bool,
}

#[derive(Args, Debug)]
pub struct PostPublishArgs {
    /// Post id.
    pub id: i64,

    /// Take the post out of the feed instead.
    #[arg(long)]
    pub unpublish: bool,
}

pub fn run_post(args: &PostArgs, ctx: &CmdContext) -> anyhow::Result<()> {
    match &args.command {
        PostCommand::Add(add) => run_post_add(add, ctx),
        PostCommand::Publish(publish) => run_post_publish(publish, ctx),
        PostCommand::List => run_post_list(ctx),
    }
}

fn run_post_add(args: &PostAddArgs, ctx: &CmdContext) -> anyhow::Result<()> {
    let title = args.title.trim();
    if title.is_empty() {
        let msg = "post title must not be blank";
        render_error(
            ctx.output,
            &CliError::with_details(
                msg,
                "Pass a non-empty title",
                ErrorCode::InvalidArgument.code(),
            ),
        )?;
        anyhow::bail!(msg);
    }

    let store = ctx.open_store()?;
    let post = query::insert_post(&store.conn(), title, args.publish, Utc::now())?;
    tracing::info!(post_id = post.post_id, published = post.is_published, "post created");

    render_post(ctx.output, &post)
}

fn run_post_publish(args: &PostPublishArgs, ctx: &CmdContext) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let conn = store.conn();
    if !query::set_post_published(&conn, args.id, !args.unpublish)? {
        return ctx.not_found(ErrorCode::PostNotFound, format!("post {} not found", args.id));
    }
    let Some(post) = query::get_post(&conn, args.id)? else {
        return ctx.not_found(ErrorCode::PostNotFound, format!("post {} not found", args.id));
    };

    render_post(ctx.output, &post)
}

fn run_post_list(ctx: &CmdContext) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let posts = query::list_posts(&store.conn())?;

    render_mode(
        ctx.output,
        &posts,
        |posts, w| {
            for post in posts {
                write_post_row(w, post)?;
            }
            Ok(())
        },
        |posts, w| {
            pretty_section(w, &format!("Posts ({})", posts.len()))?;
            for post in posts {
                let state = if post.is_published { "published" } else { "draft" };
                writeln!(
                    w,
                    "#{:<5} {:<9} {}  {}",
                    post.post_id,
                    state,
                    post.created_at.format("%Y-%m-%d %H:%M"),
                    post.title
                )?;
            }
            Ok(())
        },
    )
}

fn write_post_row(w: &mut dyn Write, post: &Post) -> io::Result<()> {
    writeln!(
        w,
        "{}\t{}\t{}\t{}",
        post.post_id,
        if post.is_published { "published" } else { "draft" },
        post.created_at.to_rfc3339(),
        post.title
    )
}

fn render_post(output: OutputMode, post: &Post) -> anyhow::Result<()> {
    render_mode(
        output,
        post,
        |post, w| write_post_row(w, post),
        |post, w| {
            pretty_section(w, &post.title)?;
            pretty_kv(w, "id", post.post_id.to_string())?;
            pretty_kv(
                w,
                "state",
                if post.is_published { "published" } else { "draft" },
            )?;
            pretty_kv(w, "created", post.created_at.to_rfc3339())?;
            pretty_rule(w)
        },
    )
}
