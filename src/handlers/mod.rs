//! HTTP handlers, grouped by concern.

pub mod auth;
pub mod crud;
pub mod meta;
