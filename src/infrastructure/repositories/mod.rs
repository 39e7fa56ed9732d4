//! Repository Implementations
//!
//! Implementations of the domain repository traits.
//!
//! ## Available Repositories
//!
//! - **PgUserRepository** - Profile lookup and presence persistence
//! - **PgChatRepository** - Chat lookup, group listing, last-message pointer
//! - **PgMessageRepository** - Message append, history and read receipts
//! - **MemoryStore** - All three traits in memory
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use sqlx::PgPool;
//! use crate::infrastructure::repositories::pg_repositories;
//!
//! fn setup_repositories(pool: PgPool) {
//!     let repos = pg_repositories(pool);
//! }
//! ```

use std::sync::Arc;

use sqlx::PgPool;

use crate::domain::Repositories;

pub mod chat_repository;
pub mod memory;
pub mod message_repository;
pub mod user_repository;

pub use chat_repository::PgChatRepository;
pub use memory::MemoryStore;
pub use message_repository::PgMessageRepository;
pub use user_repository::PgUserRepository;

/// PostgreSQL-backed repositories sharing one pool.
pub fn pg_repositories(pool: PgPool) -> Repositories {
    Repositories::new(
        Arc::new(PgUserRepository::new(pool.clone())),
        Arc::new(PgChatRepository::new(pool.clone())),
        Arc::new(PgMessageRepository::new(pool)),
    )
}
