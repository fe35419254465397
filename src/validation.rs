// src/validation.rs
use thiserror::Error;

use crate::models::NewPoll;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("poll question must not be empty")]
    EmptyQuestion,

    #[error("a poll needs at least two non-empty options, got {0}")]
    NotEnoughOptions(usize),

    #[error("username must not be empty")]
    EmptyUsername,
}

/// A poll that passed local checks and may be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidPoll {
    pub question: String,
    pub options: Vec<String>,
}

pub fn validate_new_poll(poll: &NewPoll) -> Result<ValidPoll, ValidationError> {
    if poll.question.trim().is_empty() {
        return Err(ValidationError::EmptyQuestion);
    }

    // Blank rows are dropped, not rejected.
    let options: Vec<String> = poll
        .options
        .iter()
        .filter(|text| !text.trim().is_empty())
        .cloned()
        .collect();

    if options.len() < 2 {
        return Err(ValidationError::NotEnoughOptions(options.len()));
    }

    Ok(ValidPoll {
        question: poll.question.clone(),
        options,
    })
}

pub fn validate_username(username: &str) -> Result<&str, ValidationError> {
    if username.trim().is_empty() {
        return Err(ValidationError::EmptyUsername);
    }
    Ok(username)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_poll(question: &str, options: &[&str]) -> NewPoll {
        NewPoll {
            question: question.to_string(),
            options: options.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn rejects_blank_question() {
        let err = validate_new_poll(&new_poll("   ", &["a", "b"])).unwrap_err();
        assert_eq!(err, ValidationError::EmptyQuestion);
    }

    #[test]
    fn drops_blank_options_before_counting() {
        let err = validate_new_poll(&new_poll("Q?", &["a", " ", ""])).unwrap_err();
        assert_eq!(err, ValidationError::NotEnoughOptions(1));

        let valid = validate_new_poll(&new_poll("Q?", &["a", "", "b"])).unwrap();
        assert_eq!(valid.options, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(valid.question, "Q?");
    }

    #[test]
    fn rejects_poll_without_options() {
        let err = validate_new_poll(&new_poll("Q?", &[])).unwrap_err();
        assert_eq!(err, ValidationError::NotEnoughOptions(0));
    }

    #[test]
    fn username_must_have_content() {
        assert_eq!(validate_username("\t"), Err(ValidationError::EmptyUsername));
        assert_eq!(validate_username("ana"), Ok("ana"));
    }
}
