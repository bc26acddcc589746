//! Application services: page repository, rendering and tagging seams.

pub mod error;
pub mod render;
pub mod repos;
pub mod tagging;
pub mod wiki;
