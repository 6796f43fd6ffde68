//! Request authentication and role-based authorization.
//!
//! The guard layers on the session service: extract a bearer token from the
//! Authorization header (or the access-token cookie), verify it, re-validate
//! that the account still exists and is not soft-deleted, and attach a
//! minimal identity context for downstream role checks.

mod cookie;
mod extractors;
mod ip;
mod state;

pub use cookie::{
    ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME, clear_refresh_cookie, get_cookie, refresh_cookie,
};
pub use extractors::{AdminAuth, Auth, Identity, OptionalAuth, authorize};
pub use ip::{HasHeadersAndExtensions, client_ip, user_agent};
pub use state::HasAuthState;
