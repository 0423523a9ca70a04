//! Fan wiki server library.
//!
//! Session handling, admin verification, request guards (CSRF and rate
//! limiting), and wiki/news content storage with revision history.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod middleware;
pub mod migration;
pub mod models;
pub mod services;
