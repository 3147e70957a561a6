//! Session credential storage and refresh-endpoint wire types
//!
//! Holds the access/refresh credential pair for an authenticated API client.
//! This crate has no HTTP dependency: the client crate drives the network and
//! uses the types here to persist and exchange credentials.
//!
//! Credential flow:
//! 1. Login/registration stores a pair via `CredentialStore::replace()`, which
//!    drops any previous refresh credential when none is given
//! 2. Every outbound call reads `CredentialStore::get(CredentialKind::Access)`
//! 3. On refresh, `RefreshRequest` is posted and the reply parsed with
//!    `parse_refresh_response()`
//! 4. The grant is written back with `set_pair()`, keeping the stored refresh
//!    credential unless the grant rotates it; or the pair is removed with
//!    `CredentialStore::clear()` when the session ends

pub mod canonical;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod token;

pub use canonical::{canonicalize, decode_entry, encode_entry};
pub use constants::*;
pub use credentials::{CredentialKind, CredentialPair, CredentialStore, StorageKeys};
pub use error::{Error, Result};
pub use token::{LogoutRequest, RefreshRequest, TokenGrant, parse_refresh_response};
