use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{
    error::{AppError, AppResult},
    models::{
        FilmList, Interaction, InteractionChange, InteractionKey, ListMembership, ListPatch,
        ListStatus, MembershipInsert, MembershipKey, RatingStats, Visibility,
    },
};

use super::{InteractionStore, ListStore};

/// Column list for the `film_interactions` table.
const INTERACTION_COLUMNS: &str =
    "user_id, film_id, rating, is_favorite, comment, created_at, updated_at";

/// Column list for the `film_lists` table.
const LIST_COLUMNS: &str =
    "id, owner_id, name, tag, visibility, status, description, created_at, updated_at";

/// Interaction table backed by Postgres
#[derive(Clone)]
pub struct PgInteractionStore {
    pool: PgPool,
}

impl PgInteractionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl InteractionStore for PgInteractionStore {
    async fn find(&self, key: &InteractionKey) -> AppResult<Option<Interaction>> {
        let query = format!(
            "SELECT {INTERACTION_COLUMNS} FROM film_interactions \
             WHERE user_id = $1 AND film_id = $2"
        );
        let row = sqlx::query_as::<_, Interaction>(&query)
            .bind(&key.user_id)
            .bind(&key.film_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn apply(
        &self,
        key: &InteractionKey,
        change: &InteractionChange,
        now: DateTime<Utc>,
    ) -> AppResult<Interaction> {
        // The insert branch writes the change applied to an empty row
        let mut fresh = Interaction::shell(key, now);
        fresh.apply(change, now);

        let query = format!(
            "INSERT INTO film_interactions \
                (user_id, film_id, rating, is_favorite, comment, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (user_id, film_id) DO UPDATE SET \
                {}, updated_at = EXCLUDED.updated_at \
             RETURNING {INTERACTION_COLUMNS}",
            conflict_assignments(change)
        );
        let row = sqlx::query_as::<_, Interaction>(&query)
            .bind(&fresh.user_id)
            .bind(&fresh.film_id)
            .bind(fresh.rating)
            .bind(fresh.is_favorite)
            .bind(&fresh.comment)
            .bind(fresh.created_at)
            .bind(fresh.updated_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn rating_stats(&self, film_id: &str) -> AppResult<RatingStats> {
        let stats = sqlx::query_as::<_, RatingStats>(
            "SELECT COALESCE(SUM(rating), 0)::BIGINT AS sum, COUNT(rating) AS count \
             FROM film_interactions WHERE film_id = $1",
        )
        .bind(film_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }

    async fn favorites(&self, user_id: &str) -> AppResult<Vec<Interaction>> {
        let query = format!(
            "SELECT {INTERACTION_COLUMNS} FROM film_interactions \
             WHERE user_id = $1 AND is_favorite \
             ORDER BY COALESCE(updated_at, created_at) DESC, film_id"
        );
        let rows = sqlx::query_as::<_, Interaction>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn latest_rated(&self, user_id: &str, limit: i64) -> AppResult<Vec<Interaction>> {
        let query = format!(
            "SELECT {INTERACTION_COLUMNS} FROM film_interactions \
             WHERE user_id = $1 AND rating IS NOT NULL \
             ORDER BY COALESCE(updated_at, created_at) DESC, film_id \
             LIMIT $2"
        );
        let rows = sqlx::query_as::<_, Interaction>(&query)
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn reviews(&self, film_id: &str) -> AppResult<Vec<Interaction>> {
        let query = format!(
            "SELECT {INTERACTION_COLUMNS} FROM film_interactions \
             WHERE film_id = $1 AND (comment IS NOT NULL OR rating IS NOT NULL) \
             ORDER BY created_at DESC, user_id"
        );
        let rows = sqlx::query_as::<_, Interaction>(&query)
            .bind(film_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

/// Columns an existing row takes from the attempted insert; the rest stay as stored
fn conflict_assignments(change: &InteractionChange) -> &'static str {
    match change {
        InteractionChange::Rate { .. } => "rating = EXCLUDED.rating, comment = EXCLUDED.comment",
        InteractionChange::ToggleFavorite => "is_favorite = NOT film_interactions.is_favorite",
        InteractionChange::Comment(_) => "comment = EXCLUDED.comment",
    }
}

/// Raw `film_lists` row; visibility and status are stored as small integer codes
#[derive(Debug, sqlx::FromRow)]
struct FilmListRow {
    id: String,
    owner_id: String,
    name: String,
    tag: String,
    visibility: i16,
    status: i16,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<FilmListRow> for FilmList {
    type Error = AppError;

    fn try_from(row: FilmListRow) -> Result<Self, Self::Error> {
        let visibility = Visibility::from_i16(row.visibility).ok_or_else(|| {
            AppError::Internal(format!(
                "List {} has unknown visibility code {}",
                row.id, row.visibility
            ))
        })?;
        let status = ListStatus::from_i16(row.status).ok_or_else(|| {
            AppError::Internal(format!(
                "List {} has unknown status code {}",
                row.id, row.status
            ))
        })?;

        Ok(FilmList {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            tag: row.tag,
            visibility,
            status,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_lists(rows: Vec<FilmListRow>) -> AppResult<Vec<FilmList>> {
    rows.into_iter().map(FilmList::try_from).collect()
}

/// List and membership tables backed by Postgres
#[derive(Clone)]
pub struct PgListStore {
    pool: PgPool,
}

impl PgListStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ListStore for PgListStore {
    async fn insert_list(&self, list: &FilmList) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO film_lists \
                (id, owner_id, name, tag, visibility, status, description, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(&list.id)
        .bind(&list.owner_id)
        .bind(&list.name)
        .bind(&list.tag)
        .bind(list.visibility.as_i16())
        .bind(list.status.as_i16())
        .bind(&list.description)
        .bind(list.created_at)
        .bind(list.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_list(&self, list_id: &str) -> AppResult<Option<FilmList>> {
        let query = format!("SELECT {LIST_COLUMNS} FROM film_lists WHERE id = $1");
        sqlx::query_as::<_, FilmListRow>(&query)
            .bind(list_id)
            .fetch_optional(&self.pool)
            .await?
            .map(FilmList::try_from)
            .transpose()
    }

    async fn find_owned(&self, list_id: &str, owner_id: &str) -> AppResult<Option<FilmList>> {
        let query =
            format!("SELECT {LIST_COLUMNS} FROM film_lists WHERE id = $1 AND owner_id = $2");
        sqlx::query_as::<_, FilmListRow>(&query)
            .bind(list_id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?
            .map(FilmList::try_from)
            .transpose()
    }

    async fn lists_by_owner(&self, owner_id: &str, public_only: bool) -> AppResult<Vec<FilmList>> {
        let query = format!(
            "SELECT {LIST_COLUMNS} FROM film_lists \
             WHERE owner_id = $1 AND status = $2 AND ($3 = FALSE OR visibility = $4) \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, FilmListRow>(&query)
            .bind(owner_id)
            .bind(ListStatus::Active.as_i16())
            .bind(public_only)
            .bind(Visibility::Public.as_i16())
            .fetch_all(&self.pool)
            .await?;
        into_lists(rows)
    }

    async fn latest_public(&self, limit: i64) -> AppResult<Vec<FilmList>> {
        let query = format!(
            "SELECT {LIST_COLUMNS} FROM film_lists \
             WHERE visibility = $1 AND status = $2 \
             ORDER BY created_at DESC, id DESC \
             LIMIT $3"
        );
        let rows = sqlx::query_as::<_, FilmListRow>(&query)
            .bind(Visibility::Public.as_i16())
            .bind(ListStatus::Active.as_i16())
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        into_lists(rows)
    }

    async fn update_list(
        &self,
        list_id: &str,
        owner_id: &str,
        patch: &ListPatch,
        updated_at: DateTime<Utc>,
    ) -> AppResult<Option<FilmList>> {
        let query = format!(
            "UPDATE film_lists SET \
                name = COALESCE($3, name), \
                tag = COALESCE($4, tag), \
                visibility = COALESCE($5, visibility), \
                description = COALESCE($6, description), \
                updated_at = $7 \
             WHERE id = $1 AND owner_id = $2 \
             RETURNING {LIST_COLUMNS}"
        );
        sqlx::query_as::<_, FilmListRow>(&query)
            .bind(list_id)
            .bind(owner_id)
            .bind(patch.name.as_deref())
            .bind(patch.tag.as_deref())
            .bind(patch.visibility.map(Visibility::as_i16))
            .bind(patch.description.as_deref())
            .bind(updated_at)
            .fetch_optional(&self.pool)
            .await?
            .map(FilmList::try_from)
            .transpose()
    }

    async fn delete_list(&self, list_id: &str) -> AppResult<u64> {
        let mut tx = self.pool.begin().await?;

        let members = sqlx::query("DELETE FROM film_list_members WHERE list_id = $1")
            .bind(list_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query("DELETE FROM film_lists WHERE id = $1")
            .bind(list_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(members)
    }

    async fn member_film_ids(&self, list_id: &str, limit: Option<i64>) -> AppResult<Vec<String>> {
        // LIMIT NULL means no limit in Postgres
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT film_id FROM film_list_members \
             WHERE list_id = $1 \
             ORDER BY created_at, film_id \
             LIMIT $2",
        )
        .bind(list_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn count_members(&self, list_id: &str) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM film_list_members WHERE list_id = $1",
        )
        .bind(list_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn has_member(&self, key: &MembershipKey) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (\
                SELECT 1 FROM film_list_members WHERE list_id = $1 AND film_id = $2\
             )",
        )
        .bind(&key.list_id)
        .bind(&key.film_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn insert_member(&self, membership: &ListMembership) -> AppResult<MembershipInsert> {
        let result = sqlx::query(
            "INSERT INTO film_list_members (list_id, film_id, owner_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&membership.key.list_id)
        .bind(&membership.key.film_id)
        .bind(&membership.owner_id)
        .bind(membership.created_at)
        .bind(membership.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(MembershipInsert::Inserted),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                tracing::debug!(
                    list_id = %membership.key.list_id,
                    film_id = %membership.key.film_id,
                    "Concurrent insert already created membership"
                );
                Ok(MembershipInsert::AlreadyMember)
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => {
                Err(AppError::ListNotFound(membership.key.list_id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn remove_member(&self, key: &MembershipKey) -> AppResult<bool> {
        let result =
            sqlx::query("DELETE FROM film_list_members WHERE list_id = $1 AND film_id = $2")
                .bind(&key.list_id)
                .bind(&key.film_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_flips_the_stored_flag() {
        let sql = conflict_assignments(&InteractionChange::ToggleFavorite);
        assert_eq!(sql, "is_favorite = NOT film_interactions.is_favorite");
    }

    #[test]
    fn test_rate_and_comment_leave_favorite_alone() {
        let rate = conflict_assignments(&InteractionChange::Rate {
            rating: 8,
            comment: None,
        });
        let comment = conflict_assignments(&InteractionChange::Comment(None));

        assert!(!rate.contains("is_favorite"));
        assert!(!comment.contains("is_favorite"));
        assert!(!comment.contains("rating"));
    }
}
