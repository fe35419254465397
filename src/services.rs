// src/services.rs
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::feed::{Change, ChangeFeed};
use crate::models::{NewPoll, OptionView, Poll, PollFilter, PollView, Profile, Vote};
use crate::session::Session;
use crate::store::Store;
use crate::tally;
use crate::validation::{validate_new_poll, validate_username};

pub struct PollService {
    store: Arc<dyn Store>,
    feed: ChangeFeed,
    // Serializes the "has this voter voted?" read with the vote insert.
    vote_gate: Mutex<()>,
}

impl PollService {
    pub fn new(store: Arc<dyn Store>, feed: ChangeFeed) -> Self {
        Self {
            store,
            feed,
            vote_gate: Mutex::new(()),
        }
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    /// Reads a fresh snapshot and derives every view from it.
    pub async fn list_polls(&self, viewer: Uuid, filter: PollFilter) -> AppResult<Vec<PollView>> {
        let polls = self.store.list_polls(filter).await?;
        Ok(polls.iter().map(|poll| poll_view(poll, viewer)).collect())
    }

    pub async fn create_poll(&self, session: &Session, new_poll: NewPoll) -> AppResult<PollView> {
        let valid = validate_new_poll(&new_poll)?;

        let mut poll = self.store.insert_poll(&valid.question, session.user_id).await?;
        // Not atomic with the poll row: if this fails the poll stays, option-less,
        // and listeners still need to hear about it.
        poll.options = match self.store.insert_options(poll.id, &valid.options).await {
            Ok(options) => options,
            Err(e) => {
                warn!(poll_id = %poll.id, "options not written, poll left without options: {e}");
                self.feed.publish(Change::Polls);
                return Err(e.into());
            }
        };

        info!(poll_id = %poll.id, user_id = %session.user_id, options = poll.options.len(), "poll created");
        self.feed.publish(Change::Polls);
        Ok(poll_view(&poll, session.user_id))
    }

    pub async fn delete_poll(&self, session: &Session, poll_id: Uuid) -> AppResult<()> {
        let poll = self
            .store
            .get_poll(poll_id)
            .await?
            .ok_or(AppError::NotFound("poll"))?;

        if poll.user_id != session.user_id {
            warn!(%poll_id, user_id = %session.user_id, "delete refused, not the creator");
            return Err(AppError::Forbidden);
        }

        if !self.store.delete_poll(poll_id).await? {
            return Err(AppError::NotFound("poll"));
        }

        info!(%poll_id, "poll deleted");
        self.feed.publish(Change::Polls);
        Ok(())
    }

    /// Records a vote unless the voter already holds one on any option of the poll.
    pub async fn cast_vote(&self, session: &Session, option_id: Uuid) -> AppResult<Vote> {
        let option = self
            .store
            .find_option(option_id)
            .await?
            .ok_or(AppError::NotFound("option"))?;

        let _gate = self.vote_gate.lock().await;

        let poll = self
            .store
            .get_poll(option.poll_id)
            .await?
            .ok_or(AppError::NotFound("poll"))?;

        if let Some(previous) = tally::voter_choice(&poll, session.user_id) {
            warn!(poll_id = %poll.id, user_id = %session.user_id, %previous, "second vote rejected");
            return Err(AppError::AlreadyVoted);
        }

        let vote = self.store.insert_vote(option_id, session.user_id).await?;

        info!(poll_id = %poll.id, %option_id, user_id = %session.user_id, "vote recorded");
        self.feed.publish(Change::Votes);
        Ok(vote)
    }

    pub async fn profile(&self, user_id: Uuid) -> AppResult<Option<Profile>> {
        Ok(self.store.get_profile(user_id).await?)
    }

    pub async fn create_profile(&self, session: &Session, username: &str) -> AppResult<Profile> {
        let profile = Profile {
            id: session.user_id,
            username: validate_username(username)?.to_string(),
        };
        self.store.insert_profile(&profile).await?;

        info!(user_id = %profile.id, "profile created");
        Ok(profile)
    }

    pub async fn update_profile(&self, session: &Session, username: &str) -> AppResult<Profile> {
        let username = validate_username(username)?;
        if !self.store.update_profile(session.user_id, username).await? {
            return Err(AppError::NotFound("profile"));
        }

        info!(user_id = %session.user_id, "profile updated");
        Ok(Profile {
            id: session.user_id,
            username: username.to_string(),
        })
    }
}

/// What `viewer` gets to see of `poll`: results only once they have voted.
pub fn poll_view(poll: &Poll, viewer: Uuid) -> PollView {
    let selected = tally::voter_choice(poll, viewer);
    let has_voted = selected.is_some();
    let totals = tally::tally(poll);

    let options = poll
        .options
        .iter()
        .zip(&totals.options)
        .map(|(option, counted)| OptionView {
            id: option.id,
            text: option.text.clone(),
            selected: selected == Some(option.id),
            winning: has_voted && totals.winner == Some(option.id),
            votes: has_voted.then_some(counted.votes),
            percentage: has_voted.then_some(counted.percentage),
            percentage_label: has_voted.then(|| tally::format_percentage(counted.percentage)),
        })
        .collect();

    PollView {
        id: poll.id,
        question: poll.question.clone(),
        user_id: poll.user_id,
        created_at: poll.created_at,
        is_creator: poll.user_id == viewer,
        has_voted,
        can_vote: tally::can_vote(poll, viewer),
        selected_option: selected,
        results_visible: has_voted,
        total_votes: has_voted.then_some(totals.total_votes),
        winner: if has_voted { totals.winner } else { None },
        options,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::models::PollOption;
    use crate::store::{MemoryStore, StoreResult};
    use crate::tally::tests::{option_with_votes, poll_with_counts};
    use crate::validation::ValidationError;

    /// Writes polls fine but fails every options insert.
    struct BrokenOptions(MemoryStore);

    #[async_trait::async_trait]
    impl Store for BrokenOptions {
        async fn list_polls(&self, filter: PollFilter) -> StoreResult<Vec<Poll>> {
            self.0.list_polls(filter).await
        }
        async fn get_poll(&self, poll_id: Uuid) -> StoreResult<Option<Poll>> {
            self.0.get_poll(poll_id).await
        }
        async fn find_option(&self, option_id: Uuid) -> StoreResult<Option<PollOption>> {
            self.0.find_option(option_id).await
        }
        async fn insert_poll(&self, question: &str, user_id: Uuid) -> StoreResult<Poll> {
            self.0.insert_poll(question, user_id).await
        }
        async fn insert_options(&self, _poll_id: Uuid, _texts: &[String]) -> StoreResult<Vec<PollOption>> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }
        async fn delete_poll(&self, poll_id: Uuid) -> StoreResult<bool> {
            self.0.delete_poll(poll_id).await
        }
        async fn insert_vote(&self, option_id: Uuid, user_id: Uuid) -> StoreResult<Vote> {
            self.0.insert_vote(option_id, user_id).await
        }
        async fn get_profile(&self, user_id: Uuid) -> StoreResult<Option<Profile>> {
            self.0.get_profile(user_id).await
        }
        async fn insert_profile(&self, profile: &Profile) -> StoreResult<()> {
            self.0.insert_profile(profile).await
        }
        async fn update_profile(&self, user_id: Uuid, username: &str) -> StoreResult<bool> {
            self.0.update_profile(user_id, username).await
        }
    }

    fn service() -> PollService {
        PollService::new(Arc::new(MemoryStore::new()), ChangeFeed::new(16))
    }

    fn session() -> Session {
        Session {
            user_id: Uuid::new_v4(),
            email: None,
        }
    }

    fn coffee_or_tea() -> NewPoll {
        NewPoll {
            question: "Coffee or Tea?".into(),
            options: vec!["Coffee".into(), "Tea".into()],
        }
    }

    #[test]
    fn results_hidden_until_viewer_votes() {
        let poll = poll_with_counts("Hidden", &[("A", 5), ("B", 2)]);
        let view = poll_view(&poll, Uuid::new_v4());

        assert!(view.can_vote);
        assert!(!view.results_visible);
        assert_eq!(view.total_votes, None);
        assert_eq!(view.winner, None);
        assert!(view.options.iter().all(|o| o.votes.is_none() && !o.winning));
    }

    #[test]
    fn voter_sees_tally_and_their_choice() {
        let voter = Uuid::new_v4();
        let mut poll = poll_with_counts("Seen", &[("A", 5)]);
        poll.options.push(option_with_votes(poll.id, "B", &[Uuid::new_v4(), voter]));
        let view = poll_view(&poll, voter);

        assert!(view.has_voted);
        assert!(!view.can_vote);
        assert_eq!(view.selected_option, Some(poll.options[1].id));
        assert_eq!(view.total_votes, Some(7));
        assert_eq!(view.winner, Some(poll.options[0].id));
        assert!(view.options[0].winning);
        assert!(view.options[1].selected);
        assert_eq!(view.options[0].percentage_label.as_deref(), Some("71.4"));
        assert_eq!(view.options[1].percentage_label.as_deref(), Some("28.6"));
    }

    #[tokio::test]
    async fn new_poll_starts_empty_and_open() {
        let service = service();
        let creator = session();

        let view = service.create_poll(&creator, coffee_or_tea()).await.unwrap();

        assert!(view.is_creator);
        assert!(view.can_vote);
        assert_eq!(view.options.len(), 2);
        assert_eq!(view.winner, None);
    }

    #[tokio::test]
    async fn second_vote_on_same_poll_is_rejected_without_writing() {
        let service = service();
        let voter = session();
        let poll = service.create_poll(&session(), coffee_or_tea()).await.unwrap();
        let (coffee, tea) = (poll.options[0].id, poll.options[1].id);

        service.cast_vote(&voter, tea).await.unwrap();
        let err = service.cast_vote(&voter, coffee).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyVoted));

        let polls = service.list_polls(voter.user_id, PollFilter::All).await.unwrap();
        assert_eq!(polls[0].total_votes, Some(1));
        assert_eq!(polls[0].selected_option, Some(tea));
    }

    #[tokio::test]
    async fn concurrent_votes_from_one_voter_land_once() {
        let service = Arc::new(service());
        let voter = session();
        let poll = service.create_poll(&session(), coffee_or_tea()).await.unwrap();

        let tasks: Vec<_> = poll
            .options
            .iter()
            .map(|option| {
                let service = service.clone();
                let voter = voter.clone();
                let option_id = option.id;
                tokio::spawn(async move { service.cast_vote(&voter, option_id).await })
            })
            .collect();

        let mut accepted = 0;
        for task in tasks {
            if task.await.unwrap().is_ok() {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 1);
    }

    #[tokio::test]
    async fn invalid_poll_never_reaches_the_store() {
        let service = service();
        let creator = session();
        let err = service
            .create_poll(
                &creator,
                NewPoll {
                    question: "Lonely?".into(),
                    options: vec!["only".into(), "  ".into()],
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(ValidationError::NotEnoughOptions(1))));
        assert!(service.list_polls(creator.user_id, PollFilter::All).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn only_the_creator_deletes() {
        let service = service();
        let creator = session();
        let poll = service.create_poll(&creator, coffee_or_tea()).await.unwrap();

        let err = service.delete_poll(&session(), poll.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden));

        service.delete_poll(&creator, poll.id).await.unwrap();
        let err = service.delete_poll(&creator, poll.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound("poll")));
    }

    #[tokio::test]
    async fn writes_publish_changes() {
        let service = service();
        let mut changes = service.feed().subscribe();
        let creator = session();

        let poll = service.create_poll(&creator, coffee_or_tea()).await.unwrap();
        service.cast_vote(&creator, poll.options[0].id).await.unwrap();
        service.delete_poll(&creator, poll.id).await.unwrap();

        assert_eq!(changes.recv().await.unwrap(), Change::Polls);
        assert_eq!(changes.recv().await.unwrap(), Change::Votes);
        assert_eq!(changes.recv().await.unwrap(), Change::Polls);
    }

    #[tokio::test]
    async fn failed_options_still_announce_the_orphan_poll() {
        let service = PollService::new(Arc::new(BrokenOptions(MemoryStore::new())), ChangeFeed::new(4));
        let mut changes = service.feed().subscribe();
        let creator = session();

        let err = service.create_poll(&creator, coffee_or_tea()).await.unwrap_err();
        assert!(matches!(err, AppError::Store(StoreError::Database(_))));
        assert_eq!(changes.recv().await.unwrap(), Change::Polls);

        let polls = service.list_polls(creator.user_id, PollFilter::All).await.unwrap();
        assert_eq!(polls.len(), 1);
        assert!(polls[0].options.is_empty());
        assert!(polls[0].can_vote);
        assert_eq!(polls[0].winner, None);
    }

    #[tokio::test]
    async fn my_polls_filter() {
        let service = service();
        let creator = session();
        service.create_poll(&creator, coffee_or_tea()).await.unwrap();
        service.create_poll(&session(), coffee_or_tea()).await.unwrap();

        let mine = service
            .list_polls(creator.user_id, PollFilter::CreatedBy(creator.user_id))
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert!(mine[0].is_creator);
    }

    #[tokio::test]
    async fn profile_lifecycle() {
        let service = service();
        let user = session();

        assert!(service.profile(user.user_id).await.unwrap().is_none());
        assert!(matches!(
            service.update_profile(&user, "ana").await.unwrap_err(),
            AppError::NotFound("profile")
        ));
        assert!(matches!(
            service.create_profile(&user, " ").await.unwrap_err(),
            AppError::Validation(ValidationError::EmptyUsername)
        ));

        service.create_profile(&user, "ana").await.unwrap();
        let updated = service.update_profile(&user, "ana b").await.unwrap();
        assert_eq!(updated.username, "ana b");
        assert_eq!(service.profile(user.user_id).await.unwrap(), Some(updated));
    }
}
