//! Local user storage for Dirlink
//!
//! The directory-authentication core reaches the local user store only
//! through [`UserGateway`]. A SQLite-backed store is provided for the server
//! and an in-memory store for embedding and tests.

pub mod memory;
pub mod repository;
pub mod traits;

pub use memory::MemoryUserStore;
pub use repository::UserStore;
pub use traits::*;
