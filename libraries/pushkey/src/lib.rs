//! Push keys for realtime document stores.
//!
//! A push key is 20 characters: 8 characters of millisecond timestamp followed by 12 random
//! characters, all drawn from an alphabet whose characters sort in ASCII order. Keys generated
//! later sort after keys generated earlier, so a collection keyed by push keys enumerates in
//! insertion order. Keys generated within the same millisecond by the same generator stay
//! ordered by incrementing the random part instead of re-rolling it.

use std::cell::RefCell;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(not(target_arch = "wasm32"))]
use uuid::Uuid;

const ALPHABET: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

pub const PUSH_KEY_LEN: usize = 20;
const TIMESTAMP_LEN: usize = 8;
const RANDOM_LEN: usize = PUSH_KEY_LEN - TIMESTAMP_LEN;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = ["self", "crypto"])]
    fn randomUUID() -> String;
}

fn random_bytes() -> [u8; 16] {
    #[cfg(target_arch = "wasm32")]
    {
        let uuid = randomUUID();
        let hex: Vec<u8> = uuid
            .chars()
            .filter_map(|c| c.to_digit(16))
            .map(|d| d as u8)
            .collect();
        let mut bytes = [0u8; 16];
        for (i, pair) in hex.chunks(2).take(16).enumerate() {
            bytes[i] = (pair[0] << 4) | pair.get(1).copied().unwrap_or(0);
        }
        bytes
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        *Uuid::new_v4().as_bytes()
    }
}

/// Produces 12 random alphabet indices. Bytes 6 and 8 of a v4 UUID carry version and variant
/// bits, so they are skipped.
fn random_digits() -> [u8; RANDOM_LEN] {
    let bytes = random_bytes();
    let mut digits = [0u8; RANDOM_LEN];
    let usable = bytes
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != 6 && *i != 8)
        .map(|(_, b)| b % 64);
    for (digit, value) in digits.iter_mut().zip(usable) {
        *digit = value;
    }
    digits
}

#[derive(Debug, Default)]
pub struct PushKeyGenerator {
    last_timestamp: i64,
    last_digits: [u8; RANDOM_LEN],
}

impl PushKeyGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_key(&mut self) -> String {
        self.next_key_at(chrono::Utc::now().timestamp_millis())
    }

    /// Generates a key for the given millisecond timestamp. A timestamp earlier than the last
    /// one seen is clamped so keys never go backwards when the wall clock does.
    pub fn next_key_at(&mut self, timestamp_millis: i64) -> String {
        let timestamp = timestamp_millis.max(self.last_timestamp);

        if timestamp == self.last_timestamp && self.last_timestamp != 0 {
            increment(&mut self.last_digits);
        } else {
            self.last_digits = random_digits();
        }
        self.last_timestamp = timestamp;

        let mut key = String::with_capacity(PUSH_KEY_LEN);
        let mut stamp = [0u8; TIMESTAMP_LEN];
        let mut remaining = timestamp.max(0) as u64;
        for slot in stamp.iter_mut().rev() {
            *slot = ALPHABET[(remaining % 64) as usize];
            remaining /= 64;
        }
        key.extend(stamp.iter().map(|&c| c as char));
        key.extend(self.last_digits.iter().map(|&d| ALPHABET[d as usize] as char));
        key
    }
}

/// Adds one to the base-64 number held in `digits`, wrapping on overflow.
fn increment(digits: &mut [u8; RANDOM_LEN]) {
    for digit in digits.iter_mut().rev() {
        if *digit == 63 {
            *digit = 0;
        } else {
            *digit += 1;
            return;
        }
    }
}

thread_local! {
    static GENERATOR: RefCell<PushKeyGenerator> = RefCell::new(PushKeyGenerator::new());
}

/// Generates a push key from a per-thread generator.
pub fn get_push_key() -> String {
    GENERATOR.with(|generator| generator.borrow_mut().next_key())
}
