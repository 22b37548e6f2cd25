//! Forward/backward page planning.
//!
//! Both directions use the same trick: ask the row source for one row more
//! than the page needs. If that extra row comes back there is more to read in
//! the direction of travel; it is dropped before the page is built.
//!
//! The opposite-direction flag is never probed. A forward page always reports
//! `has_previous_page = false` and a backward page always reports
//! `has_next_page = false`.

use super::{Connection, PageArgs, PageDirection, Scope, Visibility, connection, cursor};
use crate::error::PageError;
use crate::source::{Boundary, OrderDirection, RangeQuery, Record};

/// Turns page arguments into a [`PagePlan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageQueryPlanner {
    max_page_size: u32,
}

impl PageQueryPlanner {
    #[must_use]
    pub const fn new(max_page_size: u32) -> Self {
        Self { max_page_size }
    }

    /// Decode raw Relay arguments into a direction.
    ///
    /// Returns `Ok(None)` when no paging argument at all was supplied; the
    /// caller answers that with an empty connection.
    ///
    /// # Errors
    ///
    /// - [`PageError::InvalidArgument`] when `first` and `last` are mixed, a
    ///   cursor is paired with the wrong count, or a cursor has no count.
    /// - [`PageError::InvalidCursor`] when a cursor does not decode.
    pub fn direction(&self, args: &PageArgs) -> Result<Option<PageDirection>, PageError> {
        match (args.first, args.last) {
            (Some(_), Some(_)) => Err(PageError::invalid_argument(
                "`first` and `last` cannot be combined",
            )),
            (Some(first), None) => {
                if args.before.is_some() {
                    return Err(PageError::invalid_argument(
                        "`before` cannot be combined with `first`",
                    ));
                }
                let after = args.after.as_deref().map(cursor::decode).transpose()?;
                Ok(Some(PageDirection::Forward { first, after }))
            }
            (None, Some(last)) => {
                if args.after.is_some() {
                    return Err(PageError::invalid_argument(
                        "`after` cannot be combined with `last`",
                    ));
                }
                let before = args.before.as_deref().map(cursor::decode).transpose()?;
                Ok(Some(PageDirection::Backward { last, before }))
            }
            (None, None) => {
                if args.after.is_some() {
                    return Err(PageError::invalid_argument("`after` requires `first`"));
                }
                if args.before.is_some() {
                    return Err(PageError::invalid_argument("`before` requires `last`"));
                }
                Ok(None)
            }
        }
    }

    /// Build the range query for one page.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::InvalidArgument`] when the requested count exceeds
    /// the configured maximum page size.
    pub fn plan(
        &self,
        scope: Scope,
        visibility: Visibility,
        direction: PageDirection,
    ) -> Result<PagePlan, PageError> {
        let count = direction.count();
        if count > self.max_page_size {
            return Err(PageError::InvalidArgument(format!(
                "page size {count} exceeds the maximum of {}",
                self.max_page_size
            )));
        }

        let (order, boundary) = match direction {
            PageDirection::Forward { after, .. } => {
                (OrderDirection::Asc, after.map(Boundary::After))
            }
            PageDirection::Backward { before, .. } => {
                (OrderDirection::Desc, before.map(Boundary::Before))
            }
        };

        Ok(PagePlan {
            query: RangeQuery {
                scope,
                visibility,
                order,
                boundary,
                limit: count as usize + 1,
            },
            direction,
        })
    }
}

/// A planned page: the range query to run and how to finish its rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagePlan {
    pub query: RangeQuery,
    pub direction: PageDirection,
}

impl PagePlan {
    /// Trim the lookahead row, restore ascending order and assemble.
    #[must_use]
    pub fn finish<R: Record>(&self, mut rows: Vec<R>) -> Connection<R> {
        let count = self.direction.count() as usize;
        let has_more = rows.len() > count;
        rows.truncate(count);

        match self.direction {
            PageDirection::Forward { .. } => connection::assemble(rows, false, has_more),
            PageDirection::Backward { .. } => {
                rows.reverse();
                connection::assemble(rows, has_more, false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Comment;
    use crate::page::{Filter, SortKey};
    use chrono::{TimeZone, Utc};

    fn planner() -> PageQueryPlanner {
        PageQueryPlanner::new(50)
    }

    fn comment(id: i64, secs: i64) -> Comment {
        Comment {
            comment_id: id,
            post_id: 1,
            author: "bob".to_string(),
            body: String::new(),
            is_deleted: false,
            deleted_at: None,
            created_at: Utc.timestamp_opt(secs, 0).unwrap(),
        }
    }

    fn key(secs: i64, id: i64) -> SortKey {
        SortKey::new(Utc.timestamp_opt(secs, 0).unwrap(), id)
    }

    #[test]
    fn no_arguments_means_no_direction() {
        assert_eq!(planner().direction(&PageArgs::default()).unwrap(), None);
    }

    #[test]
    fn first_and_last_together_is_invalid() {
        let args = PageArgs {
            first: Some(1),
            last: Some(1),
            ..PageArgs::default()
        };
        assert!(matches!(
            planner().direction(&args),
            Err(PageError::InvalidArgument(_))
        ));
    }

    #[test]
    fn mismatched_cursor_is_invalid() {
        let key = cursor::encode(&key(1, 1)).into_string();

        let forward_with_before = PageArgs {
            first: Some(2),
            before: Some(key.clone()),
            ..PageArgs::default()
        };
        let backward_with_after = PageArgs {
            last: Some(2),
            after: Some(key.clone()),
            ..PageArgs::default()
        };
        let dangling_after = PageArgs {
            after: Some(key),
            ..PageArgs::default()
        };

        for args in [forward_with_before, backward_with_after, dangling_after] {
            assert!(matches!(
                planner().direction(&args),
                Err(PageError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn bad_cursor_is_reported_as_invalid_cursor() {
        let args = PageArgs::forward(2, Some("not-base64!!!"));
        assert!(matches!(
            planner().direction(&args),
            Err(PageError::InvalidCursor(_))
        ));
    }

    #[test]
    fn forward_plan_fetches_one_extra_ascending() {
        let after = key(5, 9);
        let plan = planner()
            .plan(
                Scope::Post(3),
                Visibility::LIVE,
                PageDirection::Forward {
                    first: 10,
                    after: Some(after),
                },
            )
            .unwrap();

        assert_eq!(plan.query.order, OrderDirection::Asc);
        assert_eq!(plan.query.boundary, Some(Boundary::After(after)));
        assert_eq!(plan.query.limit, 11);
        assert_eq!(plan.query.scope, Scope::Post(3));
        assert_eq!(plan.query.visibility.deleted, Filter::Equals(false));
    }

    #[test]
    fn backward_plan_without_cursor_is_unbounded_descending() {
        let plan = planner()
            .plan(
                Scope::Feed,
                Visibility::ALL,
                PageDirection::Backward {
                    last: 4,
                    before: None,
                },
            )
            .unwrap();

        assert_eq!(plan.query.order, OrderDirection::Desc);
        assert_eq!(plan.query.boundary, None);
        assert_eq!(plan.query.limit, 5);
    }

    #[test]
    fn oversized_page_is_rejected() {
        let result = planner().plan(
            Scope::Feed,
            Visibility::ALL,
            PageDirection::Forward {
                first: 51,
                after: None,
            },
        );
        assert!(matches!(result, Err(PageError::InvalidArgument(_))));
    }

    #[test]
    fn forward_finish_trims_lookahead_row() {
        let plan = planner()
            .plan(
                Scope::Post(1),
                Visibility::ALL,
                PageDirection::Forward {
                    first: 2,
                    after: None,
                },
            )
            .unwrap();

        let conn = plan.finish(vec![comment(1, 1), comment(2, 1), comment(3, 2)]);
        let ids: Vec<i64> = conn.nodes().map(|c| c.comment_id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(conn.page_info.has_next_page);
        assert!(!conn.page_info.has_previous_page);
    }

    #[test]
    fn backward_finish_reverses_to_ascending() {
        let plan = planner()
            .plan(
                Scope::Post(1),
                Visibility::ALL,
                PageDirection::Backward {
                    last: 2,
                    before: None,
                },
            )
            .unwrap();

        // Rows arrive newest first.
        let conn = plan.finish(vec![comment(3, 2), comment(2, 1), comment(1, 1)]);
        let ids: Vec<i64> = conn.nodes().map(|c| c.comment_id).collect();
        assert_eq!(ids, vec![2, 3]);
        assert!(conn.page_info.has_previous_page);
        assert!(!conn.page_info.has_next_page);
    }

    #[test]
    fn short_page_reports_no_more() {
        let plan = planner()
            .plan(
                Scope::Post(1),
                Visibility::ALL,
                PageDirection::Forward {
                    first: 5,
                    after: None,
                },
            )
            .unwrap();

        let conn = plan.finish(vec![comment(1, 1)]);
        assert_eq!(conn.len(), 1);
        assert!(!conn.page_info.has_next_page);
    }
}
