// src/store/mod.rs
//! Persistence behind the poll service.
//!
//! The tables (`polls`, `options`, `votes`, `profiles`) are owned by the
//! hosting database; this crate only reads and appends rows. Nothing here
//! enforces one vote per voter and poll, see [`crate::services`].
mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Poll, PollFilter, PollOption, Profile, Vote};

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    /// Polls newest first, each with its options and their votes.
    async fn list_polls(&self, filter: PollFilter) -> StoreResult<Vec<Poll>>;

    async fn get_poll(&self, poll_id: Uuid) -> StoreResult<Option<Poll>>;

    /// The option row alone; `votes` is left empty.
    async fn find_option(&self, option_id: Uuid) -> StoreResult<Option<PollOption>>;

    /// Inserts the bare poll row. Options are written separately.
    async fn insert_poll(&self, question: &str, user_id: Uuid) -> StoreResult<Poll>;

    async fn insert_options(&self, poll_id: Uuid, texts: &[String]) -> StoreResult<Vec<PollOption>>;

    /// Removes the poll with its options and votes. `false` if it did not exist.
    async fn delete_poll(&self, poll_id: Uuid) -> StoreResult<bool>;

    async fn insert_vote(&self, option_id: Uuid, user_id: Uuid) -> StoreResult<Vote>;

    async fn get_profile(&self, user_id: Uuid) -> StoreResult<Option<Profile>>;

    async fn insert_profile(&self, profile: &Profile) -> StoreResult<()>;

    /// `false` when the user has no profile row to update.
    async fn update_profile(&self, user_id: Uuid, username: &str) -> StoreResult<bool>;
}
