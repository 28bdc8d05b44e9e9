//! Authentication module for managing tokens and user sessions.
//!
//! This module provides:
//! - `CredentialStore`: the shared token pair, cached profile and auth flags
//! - `AuthStorage`: durable backends (JSON file or OS keychain) for the token pair
//! - `Session`: login, registration, profile loading and logout
//!
//! Only the token pair and the authenticated flag are persisted; the
//! profile is fetched again on every start.

pub mod credentials;
pub mod session;
pub mod storage;

pub(crate) use credentials::LoadingGuard;
pub use credentials::{AuthState, CredentialStore};
pub use session::{ProfileLoad, Session};
pub use storage::{open_storage, AuthStorage, FileStorage, KeyringStorage, PersistedAuth};
