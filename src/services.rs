// src/services.rs
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::error::PollError;
use crate::id::{generate_id, is_poll_id};
use crate::ledger;
use crate::models::{CreatePollForm, Poll, PollResults, PollSummary, PollView, VoteCounts};

pub const DEFAULT_RECENT_LIMIT: u32 = 10;

pub const NO_VOTES_TEXT: &str = "No votes yet";
pub const SINGLE_OPTION_TEXT: &str = "Only one option received votes";

fn required(value: &str, field: &'static str) -> Result<String, PollError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(PollError::Validation { field });
    }
    Ok(value.to_string())
}

async fn load_poll(pool: &SqlitePool, poll_id: &str) -> Result<Poll, PollError> {
    if !is_poll_id(poll_id) {
        return Err(PollError::PollNotFound);
    }

    ledger::get_poll(pool, poll_id)
        .await?
        .ok_or(PollError::PollNotFound)
}

pub async fn create_poll(
    pool: &SqlitePool,
    form: &CreatePollForm,
    creator_ip: &str,
) -> Result<Poll, PollError> {
    create_poll_with(pool, form, creator_ip, generate_id).await
}

/// Draws ids from `next_id` until one is free in the ledger.
async fn create_poll_with<F>(
    pool: &SqlitePool,
    form: &CreatePollForm,
    creator_ip: &str,
    mut next_id: F,
) -> Result<Poll, PollError>
where
    F: FnMut() -> String,
{
    let topic = required(&form.topic, "topic")?;
    let option1 = required(&form.option1, "option1")?;
    let option2 = required(&form.option2, "option2")?;
    let option3 = required(&form.option3, "option3")?;

    let mut poll = Poll {
        id: String::new(),
        topic,
        option1,
        option2,
        option3,
        creator_ip: creator_ip.to_string(),
        created_at: Utc::now(),
        is_closed: false,
    };

    loop {
        poll.id = next_id();
        if ledger::poll_exists(pool, &poll.id).await? {
            debug!("Poll id {} already taken, drawing another", poll.id);
            continue;
        }

        match ledger::insert_poll(pool, &poll).await {
            Ok(()) => break,
            Err(PollError::DuplicateId(id)) => {
                debug!("Poll id {id} claimed concurrently, drawing another");
            }
            Err(e) => return Err(e),
        }
    }

    info!("Created poll {} from {}", poll.id, creator_ip);
    Ok(poll)
}

pub async fn get_poll_view(
    pool: &SqlitePool,
    poll_id: &str,
    viewer_ip: &str,
) -> Result<PollView, PollError> {
    let poll = load_poll(pool, poll_id).await?;
    let has_voted = ledger::has_voted(pool, poll_id, viewer_ip).await?;

    let vote_counts: VoteCounts = ledger::count_votes_by_option(pool, poll_id)
        .await?
        .into_iter()
        .filter(|&(_, count)| count > 0)
        .collect();
    let total_votes = vote_counts.values().sum();

    Ok(PollView {
        poll,
        has_voted,
        vote_counts,
        total_votes,
    })
}

pub async fn cast_vote(
    pool: &SqlitePool,
    poll_id: &str,
    option_choice: Option<u8>,
    voter_ip: &str,
) -> Result<(), PollError> {
    let option = match option_choice {
        Some(o @ 1..=3) => o,
        _ => return Err(PollError::InvalidOption),
    };

    let poll = load_poll(pool, poll_id).await?;
    if poll.is_closed {
        warn!("Rejected vote on closed poll {poll_id} from {voter_ip}");
        return Err(PollError::PollClosed);
    }

    match ledger::insert_vote(pool, poll_id, option, voter_ip).await {
        Ok(vote) => {
            info!("Vote {} recorded on poll {poll_id} for option {option}", vote.id);
            Ok(())
        }
        Err(PollError::DuplicateVote) => {
            warn!("Rejected repeat vote on poll {poll_id} from {voter_ip}");
            Err(PollError::DuplicateVote)
        }
        Err(PollError::PollClosed) => {
            warn!("Poll {poll_id} closed before vote from {voter_ip} landed");
            Err(PollError::PollClosed)
        }
        Err(e) => Err(e),
    }
}

/// Orders options by count, highest first, keeping option order among ties,
/// then applies the runner-up rule: the second-placed option wins whenever
/// at least two options received votes.
pub fn rank_results(poll: &Poll, vote_counts: &VoteCounts) -> (Vec<(u8, i64)>, Option<u8>, String) {
    let mut ranked: Vec<(u8, i64)> = vote_counts.iter().map(|(&o, &c)| (o, c)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    let top = ranked.first().map_or(0, |&(_, count)| count);
    let runner_up = ranked.get(1).copied();

    let (winner, text) = match runner_up {
        _ if top == 0 => (None, NO_VOTES_TEXT.to_string()),
        Some((option, count)) if count > 0 => {
            let label = poll.option_label(option).unwrap_or_default();
            (
                Some(option),
                format!("'{label}' (2nd place with {count} votes)"),
            )
        }
        _ => (None, SINGLE_OPTION_TEXT.to_string()),
    };

    (ranked, winner, text)
}

pub async fn compute_results(pool: &SqlitePool, poll_id: &str) -> Result<PollResults, PollError> {
    let poll = load_poll(pool, poll_id).await?;
    let vote_counts = ledger::count_votes_by_option(pool, poll_id).await?;
    let (ranked_results, winner_option, winner_text) = rank_results(&poll, &vote_counts);

    Ok(PollResults {
        poll,
        vote_counts,
        ranked_results,
        winner_option,
        winner_text,
    })
}

pub async fn close_poll(pool: &SqlitePool, poll_id: &str, requester_ip: &str) -> Result<(), PollError> {
    let poll = load_poll(pool, poll_id).await?;
    if poll.creator_ip != requester_ip {
        warn!("Rejected close of poll {poll_id} from {requester_ip}");
        return Err(PollError::NotAuthorized);
    }

    if !ledger::close_poll(pool, poll_id).await? {
        return Err(PollError::PollNotFound);
    }

    info!("Closed poll {poll_id}");
    Ok(())
}

pub async fn list_recent(pool: &SqlitePool, limit: u32) -> Result<Vec<PollSummary>, PollError> {
    Ok(ledger::list_recent_polls(pool, limit).await?)
}
