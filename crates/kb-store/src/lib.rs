//! # kb-store
//!
//! Storage abstractions for keybridge.
//!
//! Two concerns live here, both deliberately small:
//!
//! - [`EphemeralStore`] - a TTL-bounded key/value store for the transient
//!   protocol artifacts (pending SSO sessions, pending consents, issued
//!   authorization codes, cached user info). Its `take` operation is an
//!   atomic read-then-delete; this is what makes every artifact single-use.
//! - [`KeyStore`] - durable storage for the server's signing key with
//!   first-writer-wins bootstrap semantics.
//!
//! Reads never distinguish "expired" from "never written": both are `None`.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod error;
pub mod file;
pub mod memory;
pub mod provider;

pub use error::{StoreError, StoreResult};
pub use file::FileKeyStore;
pub use memory::{MemoryKeyStore, MemoryStore};
pub use provider::{EphemeralStore, KeyStore};
