use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;

use crate::{
    error::{AppError, AppResult},
    models::{
        film_list::LIST_ID_PREFIX, FilmList, ListDetailView, ListMembership, ListPatch,
        ListStatus, ListSummary, MembershipInsert, MembershipKey, NewList, UserSummary,
    },
    references::{FilmCatalog, IdGenerator, IdentityReference},
    store::ListStore,
};

/// Films shown on a list card
pub const PREVIEW_FILMS: i64 = 3;

/// Bounds for `latest_public_lists`
pub const MIN_PUBLIC_LIMIT: i64 = 1;
pub const MAX_PUBLIC_LIMIT: i64 = 50;

/// User-owned film lists and their memberships
///
/// Every mutation looks the list up by id and owner together. A list that
/// exists but belongs to someone else is reported as `ListNotFound`.
pub struct ListService {
    lists: Arc<dyn ListStore>,
    identity: Arc<dyn IdentityReference>,
    catalog: Arc<dyn FilmCatalog>,
    ids: Arc<dyn IdGenerator>,
}

impl ListService {
    pub fn new(
        lists: Arc<dyn ListStore>,
        identity: Arc<dyn IdentityReference>,
        catalog: Arc<dyn FilmCatalog>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            lists,
            identity,
            catalog,
            ids,
        }
    }

    pub async fn create_list(&self, user_id: &str, request: NewList) -> AppResult<ListDetailView> {
        let request = request.validated()?;
        let owner = self.require_user(user_id).await?;

        let id = self.ids.next(LIST_ID_PREFIX).await?;
        let now = Utc::now();
        let list = FilmList {
            id,
            owner_id: user_id.to_string(),
            name: request.name,
            tag: request.tag,
            visibility: request.visibility,
            status: ListStatus::Active,
            description: request.description,
            created_at: now,
            updated_at: now,
        };
        self.lists.insert_list(&list).await?;

        tracing::info!(
            list_id = %list.id,
            owner_id = %user_id,
            visibility = ?list.visibility,
            "List created"
        );

        Ok(ListDetailView::new(list, owner, Vec::new()))
    }

    /// Active lists of a user; private ones only when `include_private`
    pub async fn user_lists(
        &self,
        user_id: &str,
        include_private: bool,
    ) -> AppResult<Vec<ListSummary>> {
        let owner = self.require_user(user_id).await?;

        let lists = self.lists.lists_by_owner(user_id, !include_private).await?;

        let mut summaries = Vec::with_capacity(lists.len());
        for list in lists {
            summaries.push(self.summarize(list, owner.clone()).await?);
        }
        Ok(summaries)
    }

    /// Full list with every member film; private lists are readable by their owner only
    pub async fn list_details(
        &self,
        list_id: &str,
        viewer_id: Option<&str>,
    ) -> AppResult<ListDetailView> {
        let list = self
            .lists
            .find_list(list_id)
            .await?
            .ok_or_else(|| AppError::ListNotFound(list_id.to_string()))?;

        if !list.is_visible_to(viewer_id) {
            tracing::warn!(
                list_id = %list_id,
                viewer_id = ?viewer_id,
                "Private list requested by non-owner"
            );
            return Err(AppError::UnauthorizedAccess);
        }

        self.detail(list).await
    }

    pub async fn update_list(
        &self,
        user_id: &str,
        list_id: &str,
        patch: ListPatch,
    ) -> AppResult<ListDetailView> {
        let patch = patch.validated()?;
        if patch.is_empty() {
            let list = self.find_owned(user_id, list_id).await?;
            return self.detail(list).await;
        }

        let list = self
            .lists
            .update_list(list_id, user_id, &patch, Utc::now())
            .await?
            .ok_or_else(|| AppError::ListNotFound(list_id.to_string()))?;

        tracing::info!(
            list_id = %list_id,
            name = patch.name.is_some(),
            tag = patch.tag.is_some(),
            visibility = patch.visibility.is_some(),
            description = patch.description.is_some(),
            "List updated"
        );

        self.detail(list).await
    }

    /// Deletes the list together with all its memberships
    pub async fn delete_list(&self, user_id: &str, list_id: &str) -> AppResult<()> {
        let list = self.find_owned(user_id, list_id).await?;

        let members = self.lists.delete_list(&list.id).await?;

        tracing::info!(list_id = %list_id, members, "List deleted");
        Ok(())
    }

    /// Adding a film that is already on the list returns the list unchanged
    pub async fn add_film_to_list(
        &self,
        user_id: &str,
        list_id: &str,
        film_id: &str,
    ) -> AppResult<ListDetailView> {
        let list = self.find_owned(user_id, list_id).await?;
        if !self.catalog.exists(film_id).await? {
            return Err(AppError::FilmNotFound(film_id.to_string()));
        }

        let key = MembershipKey::new(&list.id, film_id);
        if self.lists.has_member(&key).await? {
            tracing::debug!(list_id = %list_id, film_id = %film_id, "Film already on list");
            return self.detail(list).await;
        }

        let now = Utc::now();
        let membership = ListMembership {
            key,
            owner_id: list.owner_id.clone(),
            created_at: now,
            updated_at: now,
        };
        match self.lists.insert_member(&membership).await? {
            MembershipInsert::Inserted => {
                tracing::info!(list_id = %list_id, film_id = %film_id, "Film added to list");
            }
            MembershipInsert::AlreadyMember => {
                tracing::debug!(
                    list_id = %list_id,
                    film_id = %film_id,
                    "Concurrent add won the race"
                );
            }
        }

        self.detail(list).await
    }

    /// Removing a film that is not on the list is a no-op
    pub async fn remove_film_from_list(
        &self,
        user_id: &str,
        list_id: &str,
        film_id: &str,
    ) -> AppResult<()> {
        let list = self.find_owned(user_id, list_id).await?;

        let removed = self
            .lists
            .remove_member(&MembershipKey::new(&list.id, film_id))
            .await?;

        tracing::info!(list_id = %list_id, film_id = %film_id, removed, "Film removed from list");
        Ok(())
    }

    /// Newest public lists across all users; `limit` is clamped to [1, 50]
    pub async fn latest_public_lists(&self, limit: i64) -> AppResult<Vec<ListSummary>> {
        let limit = limit.clamp(MIN_PUBLIC_LIMIT, MAX_PUBLIC_LIMIT);
        let lists = self.lists.latest_public(limit).await?;

        let mut owner_ids: Vec<String> = lists.iter().map(|l| l.owner_id.clone()).collect();
        owner_ids.sort();
        owner_ids.dedup();
        let owners: HashMap<String, UserSummary> = self
            .identity
            .summarize_many(&owner_ids)
            .await?
            .into_iter()
            .map(|owner| (owner.id.clone(), owner))
            .collect();

        let mut summaries = Vec::with_capacity(lists.len());
        for list in lists {
            let owner = owners
                .get(&list.owner_id)
                .cloned()
                .unwrap_or_else(|| UserSummary::unknown(&list.owner_id));
            summaries.push(self.summarize(list, owner).await?);
        }
        Ok(summaries)
    }

    async fn find_owned(&self, user_id: &str, list_id: &str) -> AppResult<FilmList> {
        self.lists
            .find_owned(list_id, user_id)
            .await?
            .ok_or_else(|| AppError::ListNotFound(list_id.to_string()))
    }

    async fn require_user(&self, user_id: &str) -> AppResult<UserSummary> {
        self.identity
            .get(user_id)
            .await?
            .map(UserSummary::from)
            .ok_or_else(|| AppError::UserNotFound(user_id.to_string()))
    }

    async fn owner_of(&self, list: &FilmList) -> AppResult<UserSummary> {
        Ok(self
            .identity
            .get(&list.owner_id)
            .await?
            .map(UserSummary::from)
            .unwrap_or_else(|| UserSummary::unknown(&list.owner_id)))
    }

    async fn detail(&self, list: FilmList) -> AppResult<ListDetailView> {
        let film_ids = self.lists.member_film_ids(&list.id, None).await?;
        let films = self.catalog.summarize_many(&film_ids).await?;
        let owner = self.owner_of(&list).await?;
        Ok(ListDetailView::new(list, owner, films))
    }

    async fn summarize(&self, list: FilmList, owner: UserSummary) -> AppResult<ListSummary> {
        let film_count = self.lists.count_members(&list.id).await?;
        let preview_ids = self
            .lists
            .member_film_ids(&list.id, Some(PREVIEW_FILMS))
            .await?;
        let films = self.catalog.summarize_many(&preview_ids).await?;

        Ok(ListSummary {
            list_id: list.id,
            name: list.name,
            tag: list.tag,
            visibility: list.visibility,
            film_count: film_count.max(0) as usize,
            owner,
            films,
            created_at: list.created_at,
        })
    }
}
