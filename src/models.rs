// src/models.rs
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Option number (1, 2 or 3) mapped to the number of votes it received.
pub type VoteCounts = BTreeMap<u8, i64>;

pub const OPTION_CHOICES: [u8; 3] = [1, 2, 3];

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Poll {
    pub id: String,
    pub topic: String,
    pub option1: String,
    pub option2: String,
    pub option3: String,
    pub creator_ip: String,
    pub created_at: DateTime<Utc>,
    pub is_closed: bool,
}

impl Poll {
    pub fn option_label(&self, option: u8) -> Option<&str> {
        match option {
            1 => Some(&self.option1),
            2 => Some(&self.option2),
            3 => Some(&self.option3),
            _ => None,
        }
    }

    pub fn options(&self) -> [(u8, &str); 3] {
        [(1, &self.option1), (2, &self.option2), (3, &self.option3)]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Vote {
    pub id: i64,
    pub poll_id: String,
    pub option_choice: i64,
    pub voter_ip: String,
    pub created_at: DateTime<Utc>,
}

/// Row of the recent polls listing.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct PollSummary {
    pub id: String,
    pub topic: String,
    pub created_at: DateTime<Utc>,
    pub is_closed: bool,
    pub vote_count: i64,
}

#[derive(Debug, Clone)]
pub struct PollView {
    pub poll: Poll,
    pub has_voted: bool,
    /// Sparse: options without votes are absent.
    pub vote_counts: VoteCounts,
    pub total_votes: i64,
}

#[derive(Debug, Clone)]
pub struct PollResults {
    pub poll: Poll,
    /// Dense: every option is present.
    pub vote_counts: VoteCounts,
    pub ranked_results: Vec<(u8, i64)>,
    pub winner_option: Option<u8>,
    pub winner_text: String,
}

impl PollResults {
    pub fn total_votes(&self) -> i64 {
        self.vote_counts.values().sum()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreatePollForm {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub option1: String,
    #[serde(default)]
    pub option2: String,
    #[serde(default)]
    pub option3: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VoteForm {
    pub option: Option<String>,
}

impl VoteForm {
    /// Only the exact strings "1", "2" and "3" are accepted.
    pub fn choice(&self) -> Option<u8> {
        match self.option.as_deref()? {
            "1" => Some(1),
            "2" => Some(2),
            "3" => Some(3),
            _ => None,
        }
    }
}
