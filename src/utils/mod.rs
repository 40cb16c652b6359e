mod auth;
pub use auth::*;

mod redis;
pub use self::redis::*;
