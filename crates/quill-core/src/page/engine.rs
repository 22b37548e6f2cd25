//! Public pagination operations over a [`RowSource`].

use super::planner::PageQueryPlanner;
use super::window::{WindowArgs, WindowResolver};
use super::{Connection, PageArgs, PageDirection, Scope, Visibility, cursor};
use crate::cancel::CancelToken;
use crate::config::PaginationConfig;
use crate::error::{Entity, PageError};
use crate::source::{RowSource, SourceError};
use tracing::{debug, instrument, warn};

/// Paginates the rows of a [`RowSource`].
///
/// Every call derives its own child of the caller's token. When
/// [`PaginationConfig::query_timeout`] is set that child also carries the
/// deadline, so a slow store surfaces as [`PageError::Cancelled`].
#[derive(Debug)]
pub struct Paginator<S> {
    source: S,
    config: PaginationConfig,
}

impl<S: RowSource> Paginator<S> {
    #[must_use]
    pub const fn new(source: S, config: PaginationConfig) -> Self {
        Self { source, config }
    }

    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }

    fn planner(&self) -> PageQueryPlanner {
        PageQueryPlanner::new(self.config.max_page_size)
    }

    fn call_token(&self, cancel: &CancelToken) -> CancelToken {
        self.config
            .query_timeout()
            .map_or_else(|| cancel.child(), |timeout| cancel.child_with_timeout(timeout))
    }

    /// Page `scope` with raw Relay arguments.
    ///
    /// No paging argument at all yields an empty connection without touching
    /// the row source.
    ///
    /// # Errors
    ///
    /// See [`PageQueryPlanner::direction`] for argument errors; otherwise the
    /// errors of [`Paginator::page_scoped_forward`].
    pub fn page(
        &self,
        scope: Scope,
        visibility: Visibility,
        args: &PageArgs,
        cancel: &CancelToken,
    ) -> Result<Connection<S::Row>, PageError> {
        match self.planner().direction(args)? {
            Some(direction) => self.run_page(scope, visibility, direction, cancel),
            None => {
                debug!(%scope, "no paging arguments, returning empty connection");
                Ok(Connection::empty())
            }
        }
    }

    /// First `first` comments of `post_id` after the optional cursor.
    ///
    /// # Errors
    ///
    /// - [`PageError::InvalidCursor`] for a malformed `after`
    /// - [`PageError::InvalidArgument`] when `first` exceeds the maximum
    /// - [`PageError::NotFound`] when the post does not exist
    /// - [`PageError::Cancelled`] / [`PageError::Storage`] from the row source
    pub fn page_scoped_forward(
        &self,
        post_id: i64,
        visibility: Visibility,
        first: u32,
        after: Option<&str>,
        cancel: &CancelToken,
    ) -> Result<Connection<S::Row>, PageError> {
        let after = after.map(cursor::decode).transpose()?;
        self.run_page(
            Scope::Post(post_id),
            visibility,
            PageDirection::Forward { first, after },
            cancel,
        )
    }

    /// Last `last` comments of `post_id` before the optional cursor, ascending.
    ///
    /// # Errors
    ///
    /// Same as [`Paginator::page_scoped_forward`].
    pub fn page_scoped_backward(
        &self,
        post_id: i64,
        visibility: Visibility,
        last: u32,
        before: Option<&str>,
        cancel: &CancelToken,
    ) -> Result<Connection<S::Row>, PageError> {
        let before = before.map(cursor::decode).transpose()?;
        self.run_page(
            Scope::Post(post_id),
            visibility,
            PageDirection::Backward { last, before },
            cancel,
        )
    }

    /// First `first` comments across all published posts.
    ///
    /// # Errors
    ///
    /// Same as [`Paginator::page_scoped_forward`], minus `NotFound`.
    pub fn page_feed_forward(
        &self,
        visibility: Visibility,
        first: u32,
        after: Option<&str>,
        cancel: &CancelToken,
    ) -> Result<Connection<S::Row>, PageError> {
        let after = after.map(cursor::decode).transpose()?;
        self.run_page(
            Scope::Feed,
            visibility,
            PageDirection::Forward { first, after },
            cancel,
        )
    }

    /// Last `last` comments across all published posts, ascending.
    ///
    /// # Errors
    ///
    /// Same as [`Paginator::page_feed_forward`].
    pub fn page_feed_backward(
        &self,
        visibility: Visibility,
        last: u32,
        before: Option<&str>,
        cancel: &CancelToken,
    ) -> Result<Connection<S::Row>, PageError> {
        let before = before.map(cursor::decode).transpose()?;
        self.run_page(
            Scope::Feed,
            visibility,
            PageDirection::Backward { last, before },
            cancel,
        )
    }

    /// Up to `before` comments, the anchor, then up to `after` comments.
    ///
    /// # Errors
    ///
    /// - [`PageError::InvalidArgument`] when a side exceeds the maximum
    /// - [`PageError::NotFound`] when the anchor does not exist
    /// - [`PageError::ScopeMismatch`] when the anchor belongs to another post
    /// - [`PageError::Cancelled`] / [`PageError::Storage`] from the row source
    #[instrument(skip(self, cancel), level = "debug")]
    pub fn window_around_anchor(
        &self,
        post_id: i64,
        visibility: Visibility,
        anchor_id: i64,
        before: u32,
        after: u32,
        cancel: &CancelToken,
    ) -> Result<Connection<S::Row>, PageError> {
        let max = self.config.max_page_size;
        for (side, count) in [("before", before), ("after", after)] {
            if count > max {
                return Err(PageError::InvalidArgument(format!(
                    "window {side} count {count} exceeds the maximum of {max}"
                )));
            }
        }

        let resolver = WindowResolver::new(self.config.window_probe, self.config.parallel_window);
        let call = self.call_token(cancel);
        resolver.resolve(
            &self.source,
            post_id,
            visibility,
            WindowArgs {
                anchor_id,
                before,
                after,
            },
            &call,
        )
    }

    fn run_page(
        &self,
        scope: Scope,
        visibility: Visibility,
        direction: PageDirection,
        cancel: &CancelToken,
    ) -> Result<Connection<S::Row>, PageError> {
        let plan = self.planner().plan(scope, visibility, direction)?;
        let call = self.call_token(cancel);

        if let Scope::Post(post_id) = scope
            && !self.source.scope_exists(post_id, &call)?
        {
            return Err(PageError::NotFound {
                entity: Entity::Post,
                id: post_id,
            });
        }

        let rows = self.source.query(&plan.query, &call).inspect_err(|err| {
            if matches!(err, SourceError::Cancelled) {
                warn!(%scope, "page query cancelled");
            }
        })?;
        debug!(
            %scope,
            order = %plan.query.order,
            limit = plan.query.limit,
            fetched = rows.len(),
            "page query finished"
        );
        Ok(plan.finish(rows))
    }
}
