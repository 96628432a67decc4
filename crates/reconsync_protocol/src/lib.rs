//! # ReconSync Protocol
//!
//! Wire messages exchanged between mobile clients and the ReconSync server.
//!
//! This crate provides:
//! - `ChangeItem`, `UploadRequest` and `UploadResponse` for the upload path
//! - `DownloadRequest`, `DownloadResponse` and `DownloadedObject` for the
//!   download path
//! - `ChangeTimestamp` and `DownloadCursor` for incremental downloads
//! - JSON encoding/decoding helpers
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod codec;
mod cursor;
mod error;
mod messages;

pub use codec::{from_json_slice, from_json_str, to_json_string, to_json_vec};
pub use cursor::{ChangeTimestamp, DownloadCursor};
pub use error::{ProtocolError, ProtocolResult};
pub use messages::{
    ChangeItem, DownloadRequest, DownloadResponse, DownloadedObject, Payload, UploadRequest,
    UploadResponse, UploadResult,
};

/// Current protocol version.
pub const PROTOCOL_VERSION: u16 = 1;
