// src/flash.rs
//! One-shot status messages carried across a redirect in a `flash` cookie.
use http::{header, HeaderMap, HeaderValue};

use crate::error::PollError;
use crate::id::is_poll_id;

const COOKIE_NAME: &str = "flash";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flash {
    PollCreated(String),
    VoteSubmitted,
    PollClosed,
    PollNotFound,
    ClosedForVoting,
    InvalidVote,
    AlreadyVoted,
    NotCreator,
}

impl Flash {
    /// Errors that are reported back to the user. Storage failures are not.
    pub fn from_error(e: &PollError) -> Option<Self> {
        match e {
            PollError::PollNotFound => Some(Flash::PollNotFound),
            PollError::PollClosed => Some(Flash::ClosedForVoting),
            PollError::InvalidOption => Some(Flash::InvalidVote),
            PollError::DuplicateVote => Some(Flash::AlreadyVoted),
            PollError::NotAuthorized => Some(Flash::NotCreator),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(
            self,
            Flash::PollCreated(_) | Flash::VoteSubmitted | Flash::PollClosed
        )
    }

    pub fn message(&self) -> String {
        match self {
            Flash::PollCreated(id) => format!("Poll created! Share this link: /poll/{id}"),
            Flash::VoteSubmitted => "Vote submitted!".to_string(),
            Flash::PollClosed => "Poll closed!".to_string(),
            Flash::PollNotFound => PollError::PollNotFound.to_string(),
            Flash::ClosedForVoting => PollError::PollClosed.to_string(),
            Flash::InvalidVote => PollError::InvalidOption.to_string(),
            Flash::AlreadyVoted => PollError::DuplicateVote.to_string(),
            Flash::NotCreator => PollError::NotAuthorized.to_string(),
        }
    }

    fn code(&self) -> String {
        match self {
            Flash::PollCreated(id) => format!("poll_created.{id}"),
            Flash::VoteSubmitted => "vote_submitted".to_string(),
            Flash::PollClosed => "poll_closed".to_string(),
            Flash::PollNotFound => "poll_not_found".to_string(),
            Flash::ClosedForVoting => "closed_for_voting".to_string(),
            Flash::InvalidVote => "invalid_vote".to_string(),
            Flash::AlreadyVoted => "already_voted".to_string(),
            Flash::NotCreator => "not_creator".to_string(),
        }
    }

    fn parse(code: &str) -> Option<Self> {
        if let Some(id) = code.strip_prefix("poll_created.") {
            return is_poll_id(id).then(|| Flash::PollCreated(id.to_string()));
        }

        match code {
            "vote_submitted" => Some(Flash::VoteSubmitted),
            "poll_closed" => Some(Flash::PollClosed),
            "poll_not_found" => Some(Flash::PollNotFound),
            "closed_for_voting" => Some(Flash::ClosedForVoting),
            "invalid_vote" => Some(Flash::InvalidVote),
            "already_voted" => Some(Flash::AlreadyVoted),
            "not_creator" => Some(Flash::NotCreator),
            _ => None,
        }
    }

    pub fn set_cookie(&self) -> HeaderValue {
        let cookie = format!(
            "{COOKIE_NAME}={}; Path=/; Max-Age=60; HttpOnly; SameSite=Lax",
            self.code()
        );
        HeaderValue::from_str(&cookie).unwrap_or_else(|_| clear_cookie())
    }

    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == COOKIE_NAME)
            .and_then(|(_, code)| Self::parse(code))
    }
}

pub fn clear_cookie() -> HeaderValue {
    HeaderValue::from_static("flash=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax")
}
