use std::cmp::Reverse;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::{
        FilmList, Interaction, InteractionChange, InteractionKey, ListMembership, ListPatch,
        ListStatus, MembershipInsert, MembershipKey, RatingStats, Visibility,
    },
};

use super::{InteractionStore, ListStore};

/// In-process interaction table keyed by (user, film)
#[derive(Default)]
pub struct MemoryInteractionStore {
    rows: RwLock<HashMap<InteractionKey, Interaction>>,
}

impl MemoryInteractionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows, across all users and films
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl InteractionStore for MemoryInteractionStore {
    async fn find(&self, key: &InteractionKey) -> AppResult<Option<Interaction>> {
        Ok(self.rows.read().await.get(key).cloned())
    }

    async fn apply(
        &self,
        key: &InteractionKey,
        change: &InteractionChange,
        now: DateTime<Utc>,
    ) -> AppResult<Interaction> {
        let mut rows = self.rows.write().await;
        let row = rows
            .entry(key.clone())
            .or_insert_with(|| Interaction::shell(key, now));
        row.apply(change, now);
        Ok(row.clone())
    }

    async fn rating_stats(&self, film_id: &str) -> AppResult<RatingStats> {
        let rows = self.rows.read().await;
        let stats = rows
            .values()
            .filter(|row| row.film_id == film_id)
            .filter_map(|row| row.rating)
            .fold(RatingStats::default(), |acc, rating| RatingStats {
                sum: acc.sum + rating as i64,
                count: acc.count + 1,
            });
        Ok(stats)
    }

    async fn favorites(&self, user_id: &str) -> AppResult<Vec<Interaction>> {
        let rows = self.rows.read().await;
        let mut favorites: Vec<Interaction> = rows
            .values()
            .filter(|row| row.user_id == user_id && row.is_favorite)
            .cloned()
            .collect();
        favorites.sort_by(|a, b| {
            b.last_activity()
                .cmp(&a.last_activity())
                .then_with(|| a.film_id.cmp(&b.film_id))
        });
        Ok(favorites)
    }

    async fn latest_rated(&self, user_id: &str, limit: i64) -> AppResult<Vec<Interaction>> {
        let rows = self.rows.read().await;
        let mut rated: Vec<Interaction> = rows
            .values()
            .filter(|row| row.user_id == user_id && row.rating.is_some())
            .cloned()
            .collect();
        rated.sort_by(|a, b| {
            b.last_activity()
                .cmp(&a.last_activity())
                .then_with(|| a.film_id.cmp(&b.film_id))
        });
        rated.truncate(limit.max(0) as usize);
        Ok(rated)
    }

    async fn reviews(&self, film_id: &str) -> AppResult<Vec<Interaction>> {
        let rows = self.rows.read().await;
        let mut reviews: Vec<Interaction> = rows
            .values()
            .filter(|row| row.film_id == film_id)
            .filter(|row| row.comment.is_some() || row.rating.is_some())
            .cloned()
            .collect();
        reviews.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        Ok(reviews)
    }
}

#[derive(Default)]
struct ListTables {
    lists: HashMap<String, FilmList>,
    members: HashMap<MembershipKey, ListMembership>,
}

/// In-process list and membership tables behind one lock, so cascades are atomic
#[derive(Default)]
pub struct MemoryListStore {
    tables: RwLock<ListTables>,
}

impl MemoryListStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(lists: &mut [FilmList]) {
    lists.sort_by_key(|list| (Reverse(list.created_at), Reverse(list.id.clone())));
}

#[async_trait::async_trait]
impl ListStore for MemoryListStore {
    async fn insert_list(&self, list: &FilmList) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if tables.lists.contains_key(&list.id) {
            return Err(AppError::Internal(format!("Duplicate list id {}", list.id)));
        }
        tables.lists.insert(list.id.clone(), list.clone());
        Ok(())
    }

    async fn find_list(&self, list_id: &str) -> AppResult<Option<FilmList>> {
        Ok(self.tables.read().await.lists.get(list_id).cloned())
    }

    async fn find_owned(&self, list_id: &str, owner_id: &str) -> AppResult<Option<FilmList>> {
        let tables = self.tables.read().await;
        Ok(tables
            .lists
            .get(list_id)
            .filter(|list| list.owner_id == owner_id)
            .cloned())
    }

    async fn lists_by_owner(&self, owner_id: &str, public_only: bool) -> AppResult<Vec<FilmList>> {
        let tables = self.tables.read().await;
        let mut lists: Vec<FilmList> = tables
            .lists
            .values()
            .filter(|list| list.owner_id == owner_id && list.status == ListStatus::Active)
            .filter(|list| !public_only || list.visibility == Visibility::Public)
            .cloned()
            .collect();
        newest_first(&mut lists);
        Ok(lists)
    }

    async fn latest_public(&self, limit: i64) -> AppResult<Vec<FilmList>> {
        let tables = self.tables.read().await;
        let mut lists: Vec<FilmList> = tables
            .lists
            .values()
            .filter(|list| {
                list.status == ListStatus::Active && list.visibility == Visibility::Public
            })
            .cloned()
            .collect();
        newest_first(&mut lists);
        lists.truncate(limit.max(0) as usize);
        Ok(lists)
    }

    async fn update_list(
        &self,
        list_id: &str,
        owner_id: &str,
        patch: &ListPatch,
        updated_at: DateTime<Utc>,
    ) -> AppResult<Option<FilmList>> {
        let mut tables = self.tables.write().await;
        let Some(list) = tables
            .lists
            .get_mut(list_id)
            .filter(|list| list.owner_id == owner_id)
        else {
            return Ok(None);
        };

        if !patch.apply(list)?.is_empty() {
            list.updated_at = updated_at;
        }
        Ok(Some(list.clone()))
    }

    async fn delete_list(&self, list_id: &str) -> AppResult<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.members.len();
        tables.members.retain(|key, _| key.list_id != list_id);
        let removed = (before - tables.members.len()) as u64;
        tables.lists.remove(list_id);
        Ok(removed)
    }

    async fn member_film_ids(&self, list_id: &str, limit: Option<i64>) -> AppResult<Vec<String>> {
        let tables = self.tables.read().await;
        let mut members: Vec<&ListMembership> = tables
            .members
            .values()
            .filter(|member| member.key.list_id == list_id)
            .collect();
        members.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.key.film_id.cmp(&b.key.film_id))
        });

        let take = limit.map(|l| l.max(0) as usize).unwrap_or(usize::MAX);
        Ok(members
            .into_iter()
            .take(take)
            .map(|member| member.key.film_id.clone())
            .collect())
    }

    async fn count_members(&self, list_id: &str) -> AppResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables
            .members
            .keys()
            .filter(|key| key.list_id == list_id)
            .count() as i64)
    }

    async fn has_member(&self, key: &MembershipKey) -> AppResult<bool> {
        Ok(self.tables.read().await.members.contains_key(key))
    }

    async fn insert_member(&self, membership: &ListMembership) -> AppResult<MembershipInsert> {
        let mut tables = self.tables.write().await;
        if !tables.lists.contains_key(&membership.key.list_id) {
            return Err(AppError::ListNotFound(membership.key.list_id.clone()));
        }
        if tables.members.contains_key(&membership.key) {
            return Ok(MembershipInsert::AlreadyMember);
        }
        tables
            .members
            .insert(membership.key.clone(), membership.clone());
        Ok(MembershipInsert::Inserted)
    }

    async fn remove_member(&self, key: &MembershipKey) -> AppResult<bool> {
        Ok(self.tables.write().await.members.remove(key).is_some())
    }
}
