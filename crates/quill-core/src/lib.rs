//! quill-core library.
//!
//! Keyset (cursor) pagination over comment threads and the global comment
//! feed. The engine in [`page`] is stateless: every call plans one or two
//! range queries against a [`source::RowSource`] and assembles a Relay-style
//! [`page::Connection`] from the rows it gets back.
//!
//! # Conventions
//!
//! - **Errors**: `thiserror` enums at the engine boundary ([`error::PageError`],
//!   [`page::cursor::CursorError`], [`source::SourceError`]); `anyhow::Result`
//!   for storage and setup helpers.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod cancel;
pub mod config;
pub mod db;
pub mod error;
pub mod memory;
pub mod model;
pub mod page;
pub mod source;

pub use cancel::CancelToken;
pub use db::store::SqliteStore;
pub use error::{ErrorCode, PageError};
pub use memory::MemoryStore;
pub use page::engine::Paginator;
pub use page::{Connection, Cursor, Edge, Filter, PageArgs, PageInfo, Scope, SortKey, Visibility};
