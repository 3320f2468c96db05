//! WebDAV remote store.
//!
//! [`WebDAVClient`] speaks the protocol subset the uploader needs on top of an
//! injected [`HttpTransport`]; [`RemoteStore`] maps between remote paths and
//! the absolute URLs that end up in notes.

mod client;
mod store;
mod transport;

pub use client::{encode_path, WebDAVClient, WebDAVError};
pub use store::{FileInfo, RemoteStore};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
