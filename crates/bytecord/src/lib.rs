//! A persistent, copy-on-write byte rope.
//!
//! A [`Rope`] is a byte string built for code that assembles, slices and
//! passes around large buffers: cloning is a reference-count bump, appending
//! to a rope never copies the bytes already in it, and slicing shares the
//! underlying memory instead of copying it. Ropes are `Send + Sync` and can
//! be cloned freely across threads.
//!
//! ```rust
//! use bytecord::Rope;
//!
//! let mut body = Rope::new();
//! for _ in 0..1000 {
//!     body.append(b"data");
//! }
//! assert_eq!(body.len(), 4000);
//!
//! let header = Rope::from("HTTP/1.1 200 OK\r\n\r\n");
//! let mut response = header.clone();
//! response.append_rope(&body);
//! assert_eq!(response.len(), header.len() + 4000);
//! assert!(response.starts_with(b"HTTP/1.1"));
//!
//! let total: usize = response.chunks().map(<[u8]>::len).sum();
//! assert_eq!(total, response.len());
//! ```
//!
//! Memory owned elsewhere can be wrapped without copying through
//! [`Rope::from_static`] and [`Rope::from_external`], and writers that want
//! to fill memory in place can use a [`RopeBuffer`].
//!
//! # Features
//!
//! * `serde`: (de)serialization of ropes as byte strings.
//! * `tracing`: structural events (tree rebuilds, flattening, buffer
//!   extraction) are reported through the `tracing` crate.

#![no_std]
extern crate alloc;

#[cfg(test)]
extern crate std;

mod buffer;
mod chunks;
mod cursor;
mod debug;
mod error;
mod fragment;
mod inline;
mod log;
mod navigator;
mod node;
mod options;
mod reader;
mod rope;
mod tree;

#[cfg(test)]
mod tests;

pub use buffer::RopeBuffer;
pub use chunks::Chunks;
pub use cursor::Cursor;
pub use debug::{Accounting, Dump};
pub use error::ValidationError;
pub use options::{RopeOptions, Validation};
pub use rope::Rope;
