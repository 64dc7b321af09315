//! Page module
//!
//! A page is one response from the remote service. The pagination engine
//! only ever sees pages through the [`PageAdapter`] capability, whether the
//! page came from the initial query or from a continuation call.
//!
//! # Overview
//!
//! - `PageAdapter` - uniform view over a raw page
//! - `Page` - stock page representation implementing `PageAdapter`
//! - `PageMark` - progress-relevant summary of a page
//! - `CursorBuffer` / `StartPosition` - the caller's cursor output
//! - `PendingPage` - a cancellable, possibly in-flight page request

mod pending;
mod types;

pub use pending::PendingPage;
pub use types::{CursorBuffer, Page, PageAdapter, PageMark, StartPosition};
