//! Connection assembly.

use super::{Connection, Edge, PageInfo, cursor};
use crate::source::Record;

/// Tag each row with its cursor and attach page info.
///
/// Rows must already be ascending and trimmed; this never re-sorts.
pub fn assemble<R: Record>(
    rows: Vec<R>,
    has_previous_page: bool,
    has_next_page: bool,
) -> Connection<R> {
    let edges: Vec<Edge<R>> = rows
        .into_iter()
        .map(|node| Edge {
            cursor: cursor::encode(&node.sort_key()),
            node,
        })
        .collect();

    let page_info = PageInfo {
        has_next_page,
        has_previous_page,
        start_cursor: edges.first().map(|edge| edge.cursor.clone()),
        end_cursor: edges.last().map(|edge| edge.cursor.clone()),
    };

    Connection { edges, page_info }
}
