//! # ReconSync Server
//!
//! Transport-agnostic request handling for the ReconSync engine.
//!
//! This crate provides:
//! - Upload and download handlers over typed messages or raw JSON bytes
//! - Request size limits
//! - Server-level counters
//!
//! # Architecture
//!
//! The server holds no data of its own. It wraps a
//! [`Reconciler`](reconsync_core::Reconciler) and whatever
//! [`SyncStore`](reconsync_core::SyncStore) backs it. Authentication is the
//! embedding application's job: it builds a
//! [`RequestContext`](reconsync_core::RequestContext) per request and hands
//! it to the server, which forwards it to hooks and visibility filters.
//!
//! ```rust,ignore
//! use reconsync_server::{ServerConfig, SyncServer};
//!
//! let server = SyncServer::new(ServerConfig::default(), reconciler);
//! let response_bytes = server.handle_upload_json(&body, &context)?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
// Production code MUST NOT use panic!/unwrap()/expect()
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod error;
mod handler;
mod server;
mod stats;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::{HandlerContext, RequestHandler};
pub use server::SyncServer;
pub use stats::{ServerStats, StatsSnapshot};
