// src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A poll together with its options, each carrying the votes cast for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poll {
    pub id: Uuid,
    pub question: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub options: Vec<PollOption>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollOption {
    pub id: Uuid,
    pub poll_id: Uuid,
    pub text: String,
    pub votes: Vec<Vote>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Vote {
    pub id: Uuid,
    pub option_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub username: String,
}

/// Flat `polls` row, before options are attached.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PollRow {
    pub id: Uuid,
    pub question: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl PollRow {
    pub fn into_poll(self, options: Vec<PollOption>) -> Poll {
        Poll {
            id: self.id,
            question: self.question,
            user_id: self.user_id,
            created_at: self.created_at,
            options,
        }
    }
}

/// Flat `options` row, before votes are attached.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OptionRow {
    pub id: Uuid,
    pub poll_id: Uuid,
    pub text: String,
}

impl OptionRow {
    pub fn into_option(self, votes: Vec<Vote>) -> PollOption {
        PollOption {
            id: self.id,
            poll_id: self.poll_id,
            text: self.text,
            votes,
        }
    }
}

/// Which polls a listing should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollFilter {
    All,
    CreatedBy(Uuid),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterParam {
    #[default]
    All,
    Mine,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListPollsQuery {
    #[serde(default)]
    pub filter: FilterParam,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPoll {
    pub question: String,
    pub options: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub option_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    pub username: String,
}

/// A poll as one viewer sees it: eligibility and, once they have voted, the tally.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollView {
    pub id: Uuid,
    pub question: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub is_creator: bool,
    pub has_voted: bool,
    pub can_vote: bool,
    pub selected_option: Option<Uuid>,
    pub results_visible: bool,
    pub total_votes: Option<usize>,
    pub winner: Option<Uuid>,
    pub options: Vec<OptionView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionView {
    pub id: Uuid,
    pub text: String,
    pub selected: bool,
    pub winning: bool,
    pub votes: Option<usize>,
    pub percentage: Option<f64>,
    pub percentage_label: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Me {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub profile: Option<Profile>,
}
