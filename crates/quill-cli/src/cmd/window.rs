use super::CmdContext;
use super::page::{VisibilityFlags, render_connection};
use crate::output::fail_page;
use clap::Args;
use quill_core::{CancelToken, Paginator};

const DEFAULT_SIDE: u32 = 5;

#[derive(Args, Debug)]
pub struct WindowArgs {
    /// Post the anchor comment belongs to.
    pub post_id: i64,

    /// Anchor comment id.
    pub anchor_id: i64,

    /// Comments to show before the anchor.
    #[arg(long, default_value_t = DEFAULT_SIDE, value_name = "N")]
    pub before: u32,

    /// Comments to show after the anchor.
    #[arg(long, default_value_t = DEFAULT_SIDE, value_name = "N")]
    pub after: u32,

    #[command(flatten)]
    pub visibility: VisibilityFlags,
}

/// `ql window`: an anchor hidden by the visibility flags still positions
/// the window but is left out of it.
pub fn run_window(args: &WindowArgs, ctx: &CmdContext) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let paginator = Paginator::new(store, ctx.pagination.clone());

    let connection = paginator
        .window_around_anchor(
            args.post_id,
            args.visibility.visibility(),
            args.anchor_id,
            args.before,
            args.after,
            &CancelToken::new(),
        )
        .map_err(|err| fail_page(ctx.output, err))?;

    render_connection(ctx.output, &connection)
}
