// src/id.rs
use rand::{seq::SliceRandom, Rng};

pub const POLL_ID_LEN: usize = 6;

const POLL_ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Short, non-secure poll identifier. Collisions are possible and are
/// resolved by the caller against the ledger.
pub fn generate_id() -> String {
    generate_id_with(&mut rand::thread_rng())
}

pub fn generate_id_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..POLL_ID_LEN)
        .filter_map(|_| POLL_ID_ALPHABET.choose(rng))
        .map(|&b| b as char)
        .collect()
}

pub fn is_poll_id(s: &str) -> bool {
    s.len() == POLL_ID_LEN
        && s
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
}
