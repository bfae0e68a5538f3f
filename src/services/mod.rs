//! Application services.
//!
//! Each operation takes the shared [`AppState`](crate::AppState), performs its
//! access checks before any mutation and returns domain values; the HTTP layer
//! only wraps the results.

pub mod accounts;
pub mod bootcamps;
pub mod courses;
