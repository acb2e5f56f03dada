//! Authentication: password hashing, signed session cookies and the
//! extractors that resolve the caller on each request.

pub mod login;
pub mod middleware;
pub mod models;
pub mod password;
pub mod session;
