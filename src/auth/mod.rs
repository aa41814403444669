//! # Authentication Module
//!
//! Minimal username/password identity for the façade:
//! - **store**: SQLite-backed user records (salted password hashes)
//! - **token**: signed bearer tokens carrying the username as subject
//! - **extractor**: actix `FromRequest` guard for the protected endpoints
//!
//! Tokens are stateless — validity is recomputed from the signature on each
//! request, nothing is persisted server-side.

pub mod extractor;
pub mod store;
pub mod token;

pub use extractor::AuthUser;
pub use store::UserStore;
pub use token::TokenSigner;
