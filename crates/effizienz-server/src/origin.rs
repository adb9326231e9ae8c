use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use constant_time_eq::constant_time_eq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::OriginError;
use crate::token::{sign, OriginToken, VALIDITY_WINDOW_MS};

// ── Secret and mode ──────────────────────────────────────────────────────────

/// Server-held HMAC key. Wiped from memory on drop and never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct OriginSecret(Vec<u8>);

impl OriginSecret {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self(secret.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for OriginSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OriginSecret(<redacted>)")
    }
}

/// Whether origin tokens are checked at all.
///
/// `Disabled` is a deliberate operator choice: the validator accepts every
/// request and the generator emits an empty token.
#[derive(Debug, Clone)]
pub enum OriginMode {
    Enforced(OriginSecret),
    Disabled,
}

impl OriginMode {
    /// An absent or empty secret disables enforcement.
    pub fn from_secret(secret: Option<String>) -> Self {
        match secret {
            Some(s) if !s.is_empty() => Self::Enforced(OriginSecret::new(s)),
            _ => Self::Disabled,
        }
    }

    pub fn is_enforced(&self) -> bool {
        matches!(self, Self::Enforced(_))
    }
}

// ── Clocks ───────────────────────────────────────────────────────────────────

/// Source of "now" in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock(Arc<AtomicI64>);

impl ManualClock {
    pub fn new(now_millis: i64) -> Self {
        Self(Arc::new(AtomicI64::new(now_millis)))
    }

    pub fn set(&self, now_millis: i64) {
        self.0.store(now_millis, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.0.fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }

    pub fn rewind(&self, by: Duration) {
        self.0.fetch_sub(by.as_millis() as i64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

// ── Authenticator ────────────────────────────────────────────────────────────

/// Mints and checks `x-app-origin` tokens.
///
/// Holds the mode and clock it was built with; there is no process-global
/// state, so tests can run several authenticators with different secrets side
/// by side.
#[derive(Clone)]
pub struct OriginAuthenticator {
    mode: Arc<OriginMode>,
    clock: Arc<dyn Clock>,
}

impl OriginAuthenticator {
    pub fn new(mode: OriginMode) -> Self {
        Self::with_clock(mode, SystemClock)
    }

    pub fn with_clock(mode: OriginMode, clock: impl Clock + 'static) -> Self {
        Self {
            mode: Arc::new(mode),
            clock: Arc::new(clock),
        }
    }

    pub fn is_enforced(&self) -> bool {
        self.mode.is_enforced()
    }

    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Mint a token for the current time. Empty when enforcement is disabled.
    pub fn generate(&self) -> String {
        self.generate_at(self.clock.now_millis())
    }

    pub fn generate_at(&self, timestamp: i64) -> String {
        match self.mode.as_ref() {
            OriginMode::Enforced(secret) => {
                OriginToken::signed(secret.as_bytes(), timestamp).encode()
            }
            OriginMode::Disabled => String::new(),
        }
    }

    /// Accept or reject a raw header value.
    pub fn validate(&self, header: Option<&str>) -> bool {
        self.verify(header).is_ok()
    }

    /// Like [`validate`](Self::validate), but says why a token was rejected.
    pub fn verify(&self, header: Option<&str>) -> Result<(), OriginError> {
        let secret = match self.mode.as_ref() {
            OriginMode::Enforced(secret) => secret,
            OriginMode::Disabled => return Ok(()),
        };

        let raw = match header {
            Some(h) if !h.is_empty() => h,
            _ => return Err(OriginError::Missing),
        };

        let token = OriginToken::decode(raw)?;

        let age = self.clock.now_millis().saturating_sub(token.timestamp);
        if age < 0 {
            return Err(OriginError::FutureDated);
        }
        if age >= VALIDITY_WINDOW_MS {
            return Err(OriginError::Expired);
        }

        let expected = sign(secret.as_bytes(), token.timestamp);
        let presented = token.signature.as_bytes();
        if expected.len() != presented.len() {
            return Err(OriginError::SignatureMismatch);
        }
        if !constant_time_eq(expected.as_bytes(), presented) {
            return Err(OriginError::SignatureMismatch);
        }

        Ok(())
    }
}

impl fmt::Debug for OriginAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OriginAuthenticator")
            .field("enforced", &self.is_enforced())
            .finish()
    }
}
