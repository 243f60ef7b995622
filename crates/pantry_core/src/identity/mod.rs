//! Federated identity login (handle/DID resolution and OAuth with PKCE).
//!
//! # Responsibility
//! - Resolve a handle or DID to its personal data server.
//! - Discover the authorization server and run PAR + code exchange.
//!
//! # Invariants
//! - All network access goes through [`http::HttpTransport`].
//! - Callback `state` and token `sub` are checked before a login succeeds.

pub mod client;
pub mod did;
pub mod error;
pub mod http;
pub mod oauth;
pub mod pkce;

pub use client::{
    redirect_state, AuthorizationSession, IdentityClient, IdentityConfig, LoginResult,
};
pub use error::{IdentityError, IdentityResult};
pub use http::{HttpResponse, HttpTransport, ReqwestTransport};
