//! Token-bucket admission control.
//!
//! Every public engine operation asks the bucket for a token first; an
//! empty bucket means the caller is rate-limited and may retry after the
//! next refill. The bucket state survives restarts through a small state
//! file (`ratelimit.bucket`).


use std::fs;
use std::io;
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::{debug, trace};

use crate::encoding::{Decode, Encode, EncodingError};

/// Tokens granted when no persisted state exists.
pub const DEFAULT_MAX_TOKENS: u64 = 100;

/// Refill interval (ms) when no persisted state exists.
pub const DEFAULT_REFILL_MS: u64 = 1000;

// ------------------------------------------------------------------------------------------------
// Error Types
// ------------------------------------------------------------------------------------------------

/// Errors returned when persisting or loading bucket state.
#[derive(Debug, Error)]
pub enum LimiterError {
    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Encoding / decoding error.
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),

    /// A state file describing an unusable bucket.
    #[error("malformed bucket state: {0}")]
    Malformed(String),
}

// ------------------------------------------------------------------------------------------------
// Token bucket
// ------------------------------------------------------------------------------------------------

#[derive(Debug)]
struct BucketState {
    max_tokens: u64,
    tokens: u64,
    refill_ms: u64,
    last_refill: SystemTime,
}

/// A capped token pool refilled at a fixed rate.
///
/// Interior mutex — callers share the bucket without further locking.
#[derive(Debug)]
pub struct TokenBucket {
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// Creates a full bucket of `max_tokens`, gaining one token per
    /// `refill_ms` milliseconds up to the cap.
    pub fn new(max_tokens: u64, refill_ms: u64) -> Self {
        Self {
            state: Mutex::new(BucketState {
                max_tokens,
                tokens: max_tokens,
                refill_ms: refill_ms.max(1),
                last_refill: SystemTime::now(),
            }),
        }
    }

    /// Takes one token if any is available after refilling.
    pub fn allow(&self) -> bool {
        let mut state = self.lock();

        let elapsed = SystemTime::now()
            .duration_since(state.last_refill)
            .unwrap_or(Duration::ZERO);
        let earned = elapsed.as_millis() as u64 / state.refill_ms;
        if earned > 0 {
            state.tokens = state.max_tokens.min(state.tokens.saturating_add(earned));
            state.last_refill = SystemTime::now();
        }

        if state.tokens > 0 {
            state.tokens -= 1;
            trace!(remaining = state.tokens, "token granted");
            true
        } else {
            debug!("request rate-limited");
            false
        }
    }

    /// Replaces the bucket's parameters, refilling it completely.
    pub fn reset(&self, max_tokens: u64, refill_ms: u64) {
        let mut state = self.lock();
        state.max_tokens = max_tokens;
        state.tokens = max_tokens;
        state.refill_ms = refill_ms.max(1);
        state.last_refill = SystemTime::now();
    }

    /// Current parameters and fill as `(max_tokens, tokens, refill_ms)`.
    pub fn snapshot(&self) -> (u64, u64, u64) {
        let state = self.lock();
        (state.max_tokens, state.tokens, state.refill_ms)
    }

    /// Persists `{max_tokens, tokens, refill_ms, last_refill}` to `path`.
    pub fn save(&self, path: &Path) -> Result<(), LimiterError> {
        let state = self.lock();
        let last_refill_ns = state
            .last_refill
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);

        let mut buf = Vec::with_capacity(32);
        state.max_tokens.encode_to(&mut buf)?;
        state.tokens.encode_to(&mut buf)?;
        state.refill_ms.encode_to(&mut buf)?;
        last_refill_ns.encode_to(&mut buf)?;
        fs::write(path, buf)?;
        Ok(())
    }

    /// Restores a bucket from `path`.
    pub fn load(path: &Path) -> Result<Self, LimiterError> {
        let data = fs::read(path)?;

        let mut offset = 0;
        let (max_tokens, used) = u64::decode_from(&data[offset..])?;
        offset += used;
        let (tokens, used) = u64::decode_from(&data[offset..])?;
        offset += used;
        let (refill_ms, used) = u64::decode_from(&data[offset..])?;
        offset += used;
        let (last_refill_ns, _) = u64::decode_from(&data[offset..])?;

        if refill_ms == 0 || tokens > max_tokens {
            return Err(LimiterError::Malformed(format!(
                "tokens {tokens}/{max_tokens}, refill {refill_ms}ms"
            )));
        }

        Ok(Self {
            state: Mutex::new(BucketState {
                max_tokens,
                tokens,
                refill_ms,
                last_refill: UNIX_EPOCH + Duration::from_nanos(last_refill_ns),
            }),
        })
    }

    // The bucket state is a handful of integers; a panic cannot leave it
    // half-updated in a way that matters, so a poisoned lock is usable.
    fn lock(&self) -> std::sync::MutexGuard<'_, BucketState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
