//! Window retrieval around an anchor comment.
//!
//! The anchor is the pivot for two strict range reads: the rows just before
//! it (read newest-first, then flipped) and the rows just after it. The page
//! is `before ++ [anchor] ++ after`. An anchor that fails the visibility
//! filter is left out of the page but still serves as the pivot.

use super::{Connection, Scope, Visibility, connection};
use crate::cancel::CancelToken;
use crate::error::{Entity, PageError};
use crate::source::{Boundary, OrderDirection, RangeQuery, Record, RowSource, SourceError};
use serde::{Deserialize, Serialize};
use std::thread;
use tracing::debug;

/// How the window decides whether more rows exist beyond each side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowProbe {
    /// Fetch one extra row per side; exact.
    #[default]
    Lookahead,
    /// Fetch exactly the requested count and report "more" whenever the side
    /// came back full. Over-reports when exactly `count` rows remain.
    ExactCount,
}

impl WindowProbe {
    const fn fetch_limit(self, count: u32) -> usize {
        match self {
            Self::Lookahead => count as usize + 1,
            Self::ExactCount => count as usize,
        }
    }

    /// Trim `rows` to `count` and report whether more rows exist.
    fn settle<R>(self, rows: &mut Vec<R>, count: u32) -> bool {
        let count = count as usize;
        match self {
            Self::Lookahead => {
                let more = rows.len() > count;
                rows.truncate(count);
                more
            }
            Self::ExactCount => count > 0 && rows.len() == count,
        }
    }
}

/// Window request: `before` rows, the anchor, `after` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowArgs {
    pub anchor_id: i64,
    pub before: u32,
    pub after: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowResolver {
    probe: WindowProbe,
    parallel: bool,
}

impl WindowResolver {
    /// `parallel` runs the two side reads on two scoped threads.
    #[must_use]
    pub const fn new(probe: WindowProbe, parallel: bool) -> Self {
        Self { probe, parallel }
    }

    /// Resolve the window for `args` within `post_id`.
    ///
    /// # Errors
    ///
    /// - [`PageError::NotFound`] when the anchor does not exist
    /// - [`PageError::ScopeMismatch`] when it belongs to another post
    /// - [`PageError::Cancelled`] / [`PageError::Storage`] from the row source
    pub fn resolve<S: RowSource>(
        &self,
        source: &S,
        post_id: i64,
        visibility: Visibility,
        args: WindowArgs,
        cancel: &CancelToken,
    ) -> Result<Connection<S::Row>, PageError> {
        let anchor = source
            .get_by_id(args.anchor_id, cancel)?
            .ok_or(PageError::NotFound {
                entity: Entity::Comment,
                id: args.anchor_id,
            })?;

        if anchor.scope_id() != post_id {
            return Err(PageError::ScopeMismatch {
                anchor_id: args.anchor_id,
                expected_post: post_id,
                actual_post: anchor.scope_id(),
            });
        }

        let pivot = anchor.sort_key();
        let side = |boundary: Boundary, order: OrderDirection, count: u32| {
            (count > 0).then(|| RangeQuery {
                scope: Scope::Post(post_id),
                visibility,
                order,
                boundary: Some(boundary),
                limit: self.probe.fetch_limit(count),
            })
        };
        let before_query = side(Boundary::Before(pivot), OrderDirection::Desc, args.before);
        let after_query = side(Boundary::After(pivot), OrderDirection::Asc, args.after);

        let (mut before_rows, mut after_rows) = if self.parallel {
            fetch_both(source, before_query.as_ref(), after_query.as_ref(), cancel)?
        } else {
            (
                fetch(source, before_query.as_ref(), cancel)?,
                fetch(source, after_query.as_ref(), cancel)?,
            )
        };

        let has_previous_page = self.probe.settle(&mut before_rows, args.before);
        let has_next_page = self.probe.settle(&mut after_rows, args.after);

        debug!(
            anchor_id = args.anchor_id,
            post_id,
            before = before_rows.len(),
            after = after_rows.len(),
            has_previous_page,
            has_next_page,
            "window resolved"
        );

        before_rows.reverse();
        let mut rows = before_rows;
        if visibility.admits(&anchor) {
            rows.push(anchor);
        } else {
            debug!(anchor_id = args.anchor_id, "anchor hidden by visibility filter");
        }
        rows.extend(after_rows);

        Ok(connection::assemble(rows, has_previous_page, has_next_page))
    }
}

fn fetch<S: RowSource>(
    source: &S,
    query: Option<&RangeQuery>,
    cancel: &CancelToken,
) -> Result<Vec<S::Row>, SourceError> {
    match query {
        Some(query) => source.query(query, cancel),
        None => Ok(Vec::new()),
    }
}

type SidePair<R> = (Vec<R>, Vec<R>);

/// Run both side reads concurrently and join them.
///
/// Whichever side fails first cancels its sibling. When both fail, a real
/// failure is preferred over the cancellation it caused.
fn fetch_both<S: RowSource>(
    source: &S,
    before: Option<&RangeQuery>,
    after: Option<&RangeQuery>,
    cancel: &CancelToken,
) -> Result<SidePair<S::Row>, SourceError> {
    let siblings = cancel.child();

    let (before, after) = thread::scope(|scope| {
        let handle = scope.spawn(|| {
            let result = fetch(source, before, &siblings);
            if result.is_err() {
                siblings.cancel();
            }
            result
        });

        let after = fetch(source, after, &siblings);
        if after.is_err() {
            siblings.cancel();
        }

        let before = handle
            .join()
            .unwrap_or_else(|payload| std::panic::resume_unwind(payload));
        (before, after)
    });

    match (before, after) {
        (Ok(before), Ok(after)) => Ok((before, after)),
        (Err(err), Ok(_)) | (Ok(_), Err(err)) => Err(err),
        (Err(SourceError::Cancelled), Err(err)) | (Err(err), Err(_)) => Err(err),
    }
}
