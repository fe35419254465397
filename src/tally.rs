// src/tally.rs
//! Read-side vote aggregation.
//!
//! Everything here works on an already-loaded [`Poll`] and has no side
//! effects. Callers re-derive a tally from each fresh snapshot instead of
//! patching a previous one.
use serde::Serialize;
use uuid::Uuid;

use crate::models::{Poll, PollOption};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionTally {
    pub option_id: Uuid,
    pub votes: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollTally {
    pub total_votes: usize,
    pub options: Vec<OptionTally>,
    pub winner: Option<Uuid>,
}

pub fn total_votes(poll: &Poll) -> usize {
    poll.options.iter().map(|option| option.votes.len()).sum()
}

/// Share of the poll's votes cast for `option`, in `0.0..=100.0`. Not rounded.
pub fn percentage(option: &PollOption, poll: &Poll) -> f64 {
    share(option.votes.len(), total_votes(poll))
}

fn share(votes: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    100.0 * votes as f64 / total as f64
}

/// The option with the strictly greatest vote count.
///
/// A tie at the top yields `None`, and so does a poll nobody has voted on yet,
/// regardless of how many options it has.
pub fn winner(poll: &Poll) -> Option<&PollOption> {
    let mut leader: Option<&PollOption> = None;
    let mut max = 0;
    let mut count_at_max = 0;

    for option in &poll.options {
        let votes = option.votes.len();
        if leader.is_none() || votes > max {
            leader = Some(option);
            max = votes;
            count_at_max = 1;
        } else if votes == max {
            count_at_max += 1;
        }
    }

    if max == 0 || count_at_max != 1 {
        return None;
    }
    leader
}

/// The option `voter` picked on this poll, found by scanning every option's votes.
pub fn voter_choice(poll: &Poll, voter: Uuid) -> Option<Uuid> {
    poll.options
        .iter()
        .find(|option| option.votes.iter().any(|vote| vote.user_id == voter))
        .map(|option| option.id)
}

pub fn has_voted(poll: &Poll, voter: Uuid) -> bool {
    voter_choice(poll, voter).is_some()
}

/// One vote per poll: eligible only while no option holds a vote from `voter`.
pub fn can_vote(poll: &Poll, voter: Uuid) -> bool {
    !has_voted(poll, voter)
}

pub fn tally(poll: &Poll) -> PollTally {
    let total = total_votes(poll);
    let options = poll
        .options
        .iter()
        .map(|option| OptionTally {
            option_id: option.id,
            votes: option.votes.len(),
            percentage: share(option.votes.len(), total),
        })
        .collect();

    PollTally {
        total_votes: total,
        options,
        winner: winner(poll).map(|option| option.id),
    }
}

/// One decimal place, the way results are shown to voters.
pub fn format_percentage(value: f64) -> String {
    format!("{value:.1}")
}
