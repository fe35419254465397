// src/store/postgres.rs
use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{Store, StoreResult};
use crate::error::StoreError;
use crate::models::{OptionRow, Poll, PollFilter, PollOption, PollRow, Profile, Vote};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attaches options and votes to already-fetched poll rows, keeping their order.
    async fn assemble(&self, rows: Vec<PollRow>) -> StoreResult<Vec<Poll>> {
        let poll_ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();

        let options = sqlx::query_as::<_, OptionRow>(
            "SELECT id, poll_id, text FROM options WHERE poll_id = ANY($1)",
        )
        .bind(&poll_ids)
        .fetch_all(&self.pool)
        .await?;

        let option_ids: Vec<Uuid> = options.iter().map(|option| option.id).collect();
        let votes = sqlx::query_as::<_, Vote>(
            "SELECT id, option_id, user_id FROM votes WHERE option_id = ANY($1)",
        )
        .bind(&option_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(nest(rows, options, votes))
    }
}

/// Builds the poll → option → vote tree from flat rows, keeping the order of `rows`.
///
/// A poll whose options never got written still comes back, just empty.
fn nest(rows: Vec<PollRow>, options: Vec<OptionRow>, votes: Vec<Vote>) -> Vec<Poll> {
    let mut votes_by_option: HashMap<Uuid, Vec<Vote>> = HashMap::new();
    for vote in votes {
        votes_by_option.entry(vote.option_id).or_default().push(vote);
    }

    let mut options_by_poll: HashMap<Uuid, Vec<PollOption>> = HashMap::new();
    for option in options {
        let votes = votes_by_option.remove(&option.id).unwrap_or_default();
        options_by_poll
            .entry(option.poll_id)
            .or_default()
            .push(option.into_option(votes));
    }

    rows.into_iter()
        .map(|row| {
            let options = options_by_poll.remove(&row.id).unwrap_or_default();
            row.into_poll(options)
        })
        .collect()
}

#[async_trait]
impl Store for PgStore {
    async fn list_polls(&self, filter: PollFilter) -> StoreResult<Vec<Poll>> {
        let rows = match filter {
            PollFilter::All => {
                sqlx::query_as::<_, PollRow>(
                    "SELECT id, question, user_id, created_at FROM polls ORDER BY created_at DESC",
                )
                .fetch_all(&self.pool)
                .await?
            }
            PollFilter::CreatedBy(user_id) => {
                sqlx::query_as::<_, PollRow>(
                    "SELECT id, question, user_id, created_at FROM polls WHERE user_id = $1 ORDER BY created_at DESC",
                )
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?
            }
        };

        self.assemble(rows).await
    }

    async fn get_poll(&self, poll_id: Uuid) -> StoreResult<Option<Poll>> {
        let row = sqlx::query_as::<_, PollRow>(
            "SELECT id, question, user_id, created_at FROM polls WHERE id = $1",
        )
        .bind(poll_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.assemble(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_option(&self, option_id: Uuid) -> StoreResult<Option<PollOption>> {
        let row = sqlx::query_as::<_, OptionRow>("SELECT id, poll_id, text FROM options WHERE id = $1")
            .bind(option_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| row.into_option(Vec::new())))
    }

    async fn insert_poll(&self, question: &str, user_id: Uuid) -> StoreResult<Poll> {
        let row = sqlx::query_as::<_, PollRow>(
            "INSERT INTO polls (question, user_id) VALUES ($1, $2) RETURNING id, question, user_id, created_at",
        )
        .bind(question)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_poll(Vec::new()))
    }

    async fn insert_options(&self, poll_id: Uuid, texts: &[String]) -> StoreResult<Vec<PollOption>> {
        let rows = sqlx::query_as::<_, OptionRow>(
            "INSERT INTO options (poll_id, text) SELECT $1, unnest($2::text[]) RETURNING id, poll_id, text",
        )
        .bind(poll_id)
        .bind(texts)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| row.into_option(Vec::new())).collect())
    }

    async fn delete_poll(&self, poll_id: Uuid) -> StoreResult<bool> {
        // options and votes go with it through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM polls WHERE id = $1")
            .bind(poll_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_vote(&self, option_id: Uuid, user_id: Uuid) -> StoreResult<Vote> {
        let vote = sqlx::query_as::<_, Vote>(
            "INSERT INTO votes (option_id, user_id) VALUES ($1, $2) RETURNING id, option_id, user_id",
        )
        .bind(option_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(vote)
    }

    async fn get_profile(&self, user_id: Uuid) -> StoreResult<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>("SELECT id, username FROM profiles WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(profile)
    }

    async fn insert_profile(&self, profile: &Profile) -> StoreResult<()> {
        sqlx::query("INSERT INTO profiles (id, username) VALUES ($1, $2)")
            .bind(profile.id)
            .bind(&profile.username)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if e.as_database_error().is_some_and(|db| db.is_unique_violation()) {
                    StoreError::AlreadyExists("profile")
                } else {
                    StoreError::Database(e)
                }
            })?;

        Ok(())
    }

    async fn update_profile(&self, user_id: Uuid, username: &str) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE profiles SET username = $1 WHERE id = $2")
            .bind(username)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
