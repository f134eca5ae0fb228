/// Persistence seams for interactions and lists
///
/// Services depend only on these traits. `postgres` is the production backend;
/// `memory` keeps everything in process for tests and local runs.
use chrono::{DateTime, Utc};

use crate::{
    error::AppResult,
    models::{
        FilmList, Interaction, InteractionChange, InteractionKey, ListMembership, ListPatch,
        MembershipInsert, MembershipKey, RatingStats,
    },
};

pub mod memory;
pub mod postgres;

pub use memory::{MemoryInteractionStore, MemoryListStore};
pub use postgres::{PgInteractionStore, PgListStore};

/// Table of (user, film) interactions
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait InteractionStore: Send + Sync {
    async fn find(&self, key: &InteractionKey) -> AppResult<Option<Interaction>>;

    /// Applies `change` to the stored row in one atomic step and returns the result
    ///
    /// Creates the row when the pair has never been touched. Concurrent changes on the
    /// same pair are serialized, so none is lost and no second row appears.
    async fn apply(
        &self,
        key: &InteractionKey,
        change: &InteractionChange,
        now: DateTime<Utc>,
    ) -> AppResult<Interaction>;

    /// Sum and count of non-null ratings for a film
    async fn rating_stats(&self, film_id: &str) -> AppResult<RatingStats>;

    /// Rows with `is_favorite`, most recently touched first
    async fn favorites(&self, user_id: &str) -> AppResult<Vec<Interaction>>;

    /// Rated rows, most recently touched first
    async fn latest_rated(&self, user_id: &str, limit: i64) -> AppResult<Vec<Interaction>>;

    /// Rows with a comment or a rating, newest created first
    async fn reviews(&self, film_id: &str) -> AppResult<Vec<Interaction>>;
}

/// Tables of lists and their memberships
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ListStore: Send + Sync {
    async fn insert_list(&self, list: &FilmList) -> AppResult<()>;

    async fn find_list(&self, list_id: &str) -> AppResult<Option<FilmList>>;

    /// Lookup by id AND owner in one predicate
    async fn find_owned(&self, list_id: &str, owner_id: &str) -> AppResult<Option<FilmList>>;

    /// Active lists of one owner, newest first
    async fn lists_by_owner(&self, owner_id: &str, public_only: bool) -> AppResult<Vec<FilmList>>;

    /// Active public lists across all owners, newest first
    async fn latest_public(&self, limit: i64) -> AppResult<Vec<FilmList>>;

    /// Writes the present fields of a validated patch to a list the owner holds
    ///
    /// Matches on id and owner together; `None` when no such list exists. Fields
    /// absent from the patch keep their stored values.
    async fn update_list(
        &self,
        list_id: &str,
        owner_id: &str,
        patch: &ListPatch,
        updated_at: DateTime<Utc>,
    ) -> AppResult<Option<FilmList>>;

    /// Removes the list and all its memberships; returns how many memberships went with it
    async fn delete_list(&self, list_id: &str) -> AppResult<u64>;

    /// Film ids in insertion order, optionally truncated
    async fn member_film_ids(&self, list_id: &str, limit: Option<i64>) -> AppResult<Vec<String>>;

    async fn count_members(&self, list_id: &str) -> AppResult<i64>;

    async fn has_member(&self, key: &MembershipKey) -> AppResult<bool>;

    /// A duplicate key is reported as `AlreadyMember`, never as an error
    async fn insert_member(&self, membership: &ListMembership) -> AppResult<MembershipInsert>;

    /// Returns `true` if a row was removed
    async fn remove_member(&self, key: &MembershipKey) -> AppResult<bool>;
}
