//! Resolves the account behind a request from its bearer token or session
//! cookie.

mod activity;
mod cookie;
mod extract;
mod resolver;

pub use activity::{ActivityThrottle, MemoryActivityThrottle, RedisActivityThrottle};
pub use cookie::{removal_cookie, session_cookie};
pub use extract::extract_token;
pub use resolver::{AuthSession, SessionResolver};
