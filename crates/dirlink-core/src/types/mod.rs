//! Core types for Dirlink

mod entry;
mod user;
mod verdict;

pub use entry::*;
pub use user::*;
pub use verdict::*;
