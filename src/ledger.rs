// src/ledger.rs
//! Storage for polls and votes.
//!
//! One vote per (poll, voter) is enforced by the `UNIQUE (poll_id, voter_ip)`
//! constraint of the `votes` table, so concurrent inserts for the same pair
//! are serialized by SQLite and exactly one of them succeeds.
use chrono::Utc;
use sqlx::error::ErrorKind;
use sqlx::SqlitePool;

use crate::error::PollError;
use crate::models::{Poll, PollSummary, Vote, VoteCounts, OPTION_CHOICES};

fn constraint_kind(e: &sqlx::Error) -> Option<ErrorKind> {
    match e {
        sqlx::Error::Database(db) => Some(db.kind()),
        _ => None,
    }
}

pub async fn insert_poll(pool: &SqlitePool, poll: &Poll) -> Result<(), PollError> {
    sqlx::query(
        r#"
        INSERT INTO polls (id, topic, option1, option2, option3, creator_ip, created_at, is_closed)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&poll.id)
    .bind(&poll.topic)
    .bind(&poll.option1)
    .bind(&poll.option2)
    .bind(&poll.option3)
    .bind(&poll.creator_ip)
    .bind(poll.created_at)
    .bind(poll.is_closed)
    .execute(pool)
    .await
    .map_err(|e| match constraint_kind(&e) {
        Some(ErrorKind::UniqueViolation) => PollError::DuplicateId(poll.id.clone()),
        _ => PollError::Database(e),
    })?;

    Ok(())
}

pub async fn poll_exists(pool: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let (known,): (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM polls WHERE id = ?)")
        .bind(id)
        .fetch_one(pool)
        .await?;

    Ok(known)
}

pub async fn get_poll(pool: &SqlitePool, id: &str) -> Result<Option<Poll>, sqlx::Error> {
    sqlx::query_as::<_, Poll>("SELECT * FROM polls WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Newest polls first; polls sharing a timestamp keep insertion order.
pub async fn list_recent_polls(
    pool: &SqlitePool,
    limit: u32,
) -> Result<Vec<PollSummary>, sqlx::Error> {
    sqlx::query_as::<_, PollSummary>(
        r#"
        SELECT id, topic, created_at, is_closed,
               (SELECT COUNT(*) FROM votes WHERE votes.poll_id = polls.id) AS vote_count
        FROM polls
        ORDER BY created_at DESC, rowid DESC
        LIMIT ?
        "#,
    )
    .bind(i64::from(limit))
    .fetch_all(pool)
    .await
}

/// Inserts only while the poll is open; the closed check and the insert are
/// one statement, so a concurrent close cannot let a late vote through.
pub async fn insert_vote(
    pool: &SqlitePool,
    poll_id: &str,
    option: u8,
    voter_ip: &str,
) -> Result<Vote, PollError> {
    let inserted = sqlx::query_as::<_, Vote>(
        r#"
        INSERT INTO votes (poll_id, option_choice, voter_ip, created_at)
        SELECT ?, ?, ?, ?
        WHERE EXISTS (SELECT 1 FROM polls WHERE id = ? AND is_closed = 0)
        RETURNING id, poll_id, option_choice, voter_ip, created_at
        "#,
    )
    .bind(poll_id)
    .bind(i64::from(option))
    .bind(voter_ip)
    .bind(Utc::now())
    .bind(poll_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| match constraint_kind(&e) {
        Some(ErrorKind::UniqueViolation) => PollError::DuplicateVote,
        Some(ErrorKind::ForeignKeyViolation) => PollError::PollNotFound,
        Some(ErrorKind::CheckViolation) => PollError::InvalidOption,
        _ => PollError::Database(e),
    })?;

    if let Some(vote) = inserted {
        return Ok(vote);
    }

    if poll_exists(pool, poll_id).await? {
        Err(PollError::PollClosed)
    } else {
        Err(PollError::PollNotFound)
    }
}

/// Dense counts: options nobody picked are reported as zero.
pub async fn count_votes_by_option(
    pool: &SqlitePool,
    poll_id: &str,
) -> Result<VoteCounts, sqlx::Error> {
    let rows: Vec<(i64, i64)> = sqlx::query_as(
        r#"
        SELECT option_choice, COUNT(*) AS count
        FROM votes
        WHERE poll_id = ?
        GROUP BY option_choice
        "#,
    )
    .bind(poll_id)
    .fetch_all(pool)
    .await?;

    let mut counts: VoteCounts = OPTION_CHOICES.iter().map(|&o| (o, 0)).collect();
    for (option, count) in rows {
        if let Ok(option) = u8::try_from(option) {
            counts.insert(option, count);
        }
    }

    Ok(counts)
}

pub async fn find_vote(
    pool: &SqlitePool,
    poll_id: &str,
    voter_ip: &str,
) -> Result<Option<Vote>, sqlx::Error> {
    sqlx::query_as::<_, Vote>("SELECT * FROM votes WHERE poll_id = ? AND voter_ip = ?")
        .bind(poll_id)
        .bind(voter_ip)
        .fetch_optional(pool)
        .await
}

pub async fn has_voted(pool: &SqlitePool, poll_id: &str, voter_ip: &str) -> Result<bool, sqlx::Error> {
    Ok(find_vote(pool, poll_id, voter_ip).await?.is_some())
}

/// Closing twice is a no-op. Returns whether the poll exists.
pub async fn close_poll(pool: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let r = sqlx::query("UPDATE polls SET is_closed = 1 WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(r.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::db::memory_pool;

    fn poll(id: &str, minute: u32) -> Poll {
        Poll {
            id: id.to_string(),
            topic: format!("topic {id}"),
            option1: "red".to_string(),
            option2: "green".to_string(),
            option3: "blue".to_string(),
            creator_ip: "10.0.0.1".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap(),
            is_closed: false,
        }
    }

    #[tokio::test]
    async fn inserted_poll_round_trips() {
        let pool = memory_pool().await.unwrap();
        let p = poll("abc123", 0);
        insert_poll(&pool, &p).await.unwrap();

        assert_eq!(get_poll(&pool, "abc123").await.unwrap(), Some(p));
        assert!(poll_exists(&pool, "abc123").await.unwrap());
        assert!(!poll_exists(&pool, "zzz999").await.unwrap());
        assert_eq!(get_poll(&pool, "zzz999").await.unwrap(), None);
    }

    #[tokio::test]
    async fn duplicate_poll_id_is_rejected() {
        let pool = memory_pool().await.unwrap();
        insert_poll(&pool, &poll("abc123", 0)).await.unwrap();

        let err = insert_poll(&pool, &poll("abc123", 1)).await.unwrap_err();
        assert!(matches!(err, PollError::DuplicateId(id) if id == "abc123"));
    }

    #[tokio::test]
    async fn second_vote_from_same_voter_is_rejected() {
        let pool = memory_pool().await.unwrap();
        insert_poll(&pool, &poll("abc123", 0)).await.unwrap();

        let vote = insert_vote(&pool, "abc123", 2, "1.2.3.4").await.unwrap();
        assert_eq!(vote.option_choice, 2);
        assert_eq!(vote.voter_ip, "1.2.3.4");

        let err = insert_vote(&pool, "abc123", 1, "1.2.3.4").await.unwrap_err();
        assert!(matches!(err, PollError::DuplicateVote));

        let counts = count_votes_by_option(&pool, "abc123").await.unwrap();
        assert_eq!(counts, VoteCounts::from([(1, 0), (2, 1), (3, 0)]));
    }

    #[tokio::test]
    async fn vote_on_missing_poll_is_not_found() {
        let pool = memory_pool().await.unwrap();

        let err = insert_vote(&pool, "nope00", 1, "1.2.3.4").await.unwrap_err();
        assert!(matches!(err, PollError::PollNotFound));
    }

    #[tokio::test]
    async fn out_of_range_option_is_refused_by_the_store() {
        let pool = memory_pool().await.unwrap();
        insert_poll(&pool, &poll("abc123", 0)).await.unwrap();

        let err = insert_vote(&pool, "abc123", 4, "1.2.3.4").await.unwrap_err();
        assert!(matches!(err, PollError::InvalidOption));
    }

    #[tokio::test]
    async fn closed_poll_accepts_no_insert() {
        let pool = memory_pool().await.unwrap();
        insert_poll(&pool, &poll("abc123", 0)).await.unwrap();
        insert_vote(&pool, "abc123", 1, "1.2.3.4").await.unwrap();
        close_poll(&pool, "abc123").await.unwrap();

        let err = insert_vote(&pool, "abc123", 2, "5.6.7.8").await.unwrap_err();
        assert!(matches!(err, PollError::PollClosed));
        assert!(!has_voted(&pool, "abc123", "5.6.7.8").await.unwrap());

        let counts = count_votes_by_option(&pool, "abc123").await.unwrap();
        assert_eq!(counts, VoteCounts::from([(1, 1), (2, 0), (3, 0)]));
    }

    #[tokio::test]
    async fn counts_are_zero_filled() {
        let pool = memory_pool().await.unwrap();
        insert_poll(&pool, &poll("abc123", 0)).await.unwrap();

        let counts = count_votes_by_option(&pool, "abc123").await.unwrap();
        assert_eq!(counts, VoteCounts::from([(1, 0), (2, 0), (3, 0)]));
    }

    #[tokio::test]
    async fn has_voted_tracks_voter_per_poll() {
        let pool = memory_pool().await.unwrap();
        insert_poll(&pool, &poll("aaa111", 0)).await.unwrap();
        insert_poll(&pool, &poll("bbb222", 1)).await.unwrap();
        insert_vote(&pool, "aaa111", 1, "1.2.3.4").await.unwrap();

        assert!(has_voted(&pool, "aaa111", "1.2.3.4").await.unwrap());
        assert!(!has_voted(&pool, "aaa111", "5.6.7.8").await.unwrap());
        assert!(!has_voted(&pool, "bbb222", "1.2.3.4").await.unwrap());
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let pool = memory_pool().await.unwrap();
        insert_poll(&pool, &poll("abc123", 0)).await.unwrap();

        assert!(close_poll(&pool, "abc123").await.unwrap());
        assert!(close_poll(&pool, "abc123").await.unwrap());
        assert!(get_poll(&pool, "abc123").await.unwrap().unwrap().is_closed);

        assert!(!close_poll(&pool, "zzz999").await.unwrap());
    }

    #[tokio::test]
    async fn recent_polls_are_newest_first_and_limited() {
        let pool = memory_pool().await.unwrap();
        for (i, id) in ["aaa000", "bbb111", "ccc222", "ddd333"].iter().enumerate() {
            insert_poll(&pool, &poll(id, i as u32)).await.unwrap();
        }
        insert_vote(&pool, "ccc222", 1, "1.1.1.1").await.unwrap();
        insert_vote(&pool, "ccc222", 3, "2.2.2.2").await.unwrap();

        let recent = list_recent_polls(&pool, 3).await.unwrap();
        let ids: Vec<&str> = recent.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["ddd333", "ccc222", "bbb111"]);
        assert_eq!(recent[1].vote_count, 2);
        assert_eq!(recent[0].vote_count, 0);
    }

    #[tokio::test]
    async fn same_timestamp_polls_keep_insertion_order() {
        let pool = memory_pool().await.unwrap();
        let created_at = Utc::now() - Duration::minutes(5);
        for id in ["aaa000", "bbb111"] {
            let mut p = poll(id, 0);
            p.created_at = created_at;
            insert_poll(&pool, &p).await.unwrap();
        }

        let recent = list_recent_polls(&pool, 10).await.unwrap();
        let ids: Vec<&str> = recent.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["bbb111", "aaa000"]);
    }

    #[tokio::test]
    async fn concurrent_duplicate_votes_have_one_winner() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("race.db").display());
        let pool = crate::db::create_pool(&url).await.unwrap();
        insert_poll(&pool, &poll("abc123", 0)).await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let pool = pool.clone();
                tokio::spawn(async move {
                    insert_vote(&pool, "abc123", (i % 3) as u8 + 1, "9.9.9.9").await
                })
            })
            .collect();

        let mut accepted = 0;
        let mut duplicates = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(PollError::DuplicateVote) => duplicates += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(accepted, 1);
        assert_eq!(duplicates, 7);

        let total: i64 = count_votes_by_option(&pool, "abc123")
            .await
            .unwrap()
            .values()
            .sum();
        assert_eq!(total, 1);
    }
}
