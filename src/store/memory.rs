// src/store/memory.rs
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, StoreResult};
use crate::error::StoreError;
use crate::models::{OptionRow, Poll, PollFilter, PollOption, PollRow, Profile, Vote};

#[derive(Default)]
struct Tables {
    polls: Vec<PollRow>,
    options: Vec<OptionRow>,
    votes: Vec<Vote>,
    profiles: HashMap<Uuid, Profile>,
}

impl Tables {
    fn assemble(&self, row: &PollRow) -> Poll {
        let options = self
            .options
            .iter()
            .filter(|option| option.poll_id == row.id)
            .map(|option| {
                let votes = self
                    .votes
                    .iter()
                    .filter(|vote| vote.option_id == option.id)
                    .cloned()
                    .collect();
                option.clone().into_option(votes)
            })
            .collect();
        row.clone().into_poll(options)
    }
}

/// Process-local tables for development runs and tests.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_polls(&self, filter: PollFilter) -> StoreResult<Vec<Poll>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<&PollRow> = tables
            .polls
            .iter()
            .filter(|row| match filter {
                PollFilter::All => true,
                PollFilter::CreatedBy(user_id) => row.user_id == user_id,
            })
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(rows.into_iter().map(|row| tables.assemble(row)).collect())
    }

    async fn get_poll(&self, poll_id: Uuid) -> StoreResult<Option<Poll>> {
        let tables = self.tables.read().await;
        Ok(tables
            .polls
            .iter()
            .find(|row| row.id == poll_id)
            .map(|row| tables.assemble(row)))
    }

    async fn find_option(&self, option_id: Uuid) -> StoreResult<Option<PollOption>> {
        let tables = self.tables.read().await;
        Ok(tables
            .options
            .iter()
            .find(|option| option.id == option_id)
            .map(|option| option.clone().into_option(Vec::new())))
    }

    async fn insert_poll(&self, question: &str, user_id: Uuid) -> StoreResult<Poll> {
        let row = PollRow {
            id: Uuid::new_v4(),
            question: question.to_string(),
            user_id,
            created_at: Utc::now(),
        };
        self.tables.write().await.polls.push(row.clone());
        Ok(row.into_poll(Vec::new()))
    }

    async fn insert_options(&self, poll_id: Uuid, texts: &[String]) -> StoreResult<Vec<PollOption>> {
        let mut tables = self.tables.write().await;
        if !tables.polls.iter().any(|row| row.id == poll_id) {
            return Err(StoreError::MissingParent("poll"));
        }

        let rows: Vec<OptionRow> = texts
            .iter()
            .map(|text| OptionRow {
                id: Uuid::new_v4(),
                poll_id,
                text: text.clone(),
            })
            .collect();
        tables.options.extend(rows.iter().cloned());

        Ok(rows.into_iter().map(|row| row.into_option(Vec::new())).collect())
    }

    async fn delete_poll(&self, poll_id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.polls.len();
        tables.polls.retain(|row| row.id != poll_id);
        if tables.polls.len() == before {
            return Ok(false);
        }

        let option_ids: Vec<Uuid> = tables
            .options
            .iter()
            .filter(|option| option.poll_id == poll_id)
            .map(|option| option.id)
            .collect();
        tables.options.retain(|option| option.poll_id != poll_id);
        tables.votes.retain(|vote| !option_ids.contains(&vote.option_id));
        Ok(true)
    }

    async fn insert_vote(&self, option_id: Uuid, user_id: Uuid) -> StoreResult<Vote> {
        let mut tables = self.tables.write().await;
        if !tables.options.iter().any(|option| option.id == option_id) {
            return Err(StoreError::MissingParent("option"));
        }

        let vote = Vote {
            id: Uuid::new_v4(),
            option_id,
            user_id,
        };
        tables.votes.push(vote.clone());
        Ok(vote)
    }

    async fn get_profile(&self, user_id: Uuid) -> StoreResult<Option<Profile>> {
        Ok(self.tables.read().await.profiles.get(&user_id).cloned())
    }

    async fn insert_profile(&self, profile: &Profile) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.profiles.contains_key(&profile.id) {
            return Err(StoreError::AlreadyExists("profile"));
        }
        tables.profiles.insert(profile.id, profile.clone());
        Ok(())
    }

    async fn update_profile(&self, user_id: Uuid, username: &str) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.profiles.get_mut(&user_id) {
            Some(profile) => {
                profile.username = username.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
