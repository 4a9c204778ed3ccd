//! Cineteca Server Library
//!
//! A self-hosted movie catalog server. The catalog (movies, categories,
//! news, comments, favorites) is conventional CRUD over SQLite; the heart
//! of the crate is the resumable chunked upload engine in [`upload`], which
//! turns out-of-order chunk requests into merged video files served back
//! with HTTP Range support.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod state;
pub mod upload;
