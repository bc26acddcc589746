//! A single-binary Markdown wiki: pages with file attachments, rendered on
//! the server and kept in one SQLite file.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
