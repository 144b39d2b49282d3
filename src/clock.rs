//! Injectable wall-clock time.
//!
//! Invite expiry is checked against `expires_at` at query time, so every
//! component that touches expiry takes a [`Clock`] rather than calling
//! `Utc::now()` directly. Production code uses [`SystemClock`]; tests pin
//! time with [`FixedClock`].

use chrono::{DateTime, Utc};

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to a settable instant, for deterministic expiry tests.
///
/// Cloning yields a handle onto the same instant, so a test can keep one
/// handle and advance time under components holding the others.
#[cfg(any(test, feature = "mocks"))]
#[derive(Clone)]
pub struct FixedClock {
    now: std::sync::Arc<std::sync::RwLock<DateTime<Utc>>>,
}

#[cfg(any(test, feature = "mocks"))]
impl FixedClock {
    /// Creates a clock pinned at the given instant.
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: std::sync::Arc::new(std::sync::RwLock::new(now)),
        }
    }

    /// Moves the clock to a new instant.
    pub fn set(&self, now: DateTime<Utc>) {
        match self.now.write() {
            Ok(mut guard) => *guard = now,
            Err(mut poisoned) => **poisoned.get_mut() = now,
        }
    }

    /// Advances the clock by a duration.
    pub fn advance(&self, by: chrono::Duration) {
        let current = self.now();
        self.set(current + by);
    }
}

#[cfg(any(test, feature = "mocks"))]
impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.read() {
            Ok(guard) => *guard,
            Err(poisoned) => **poisoned.get_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_system_clock_advances() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn test_fixed_clock_is_pinned() {
        let instant = Utc::now();
        let clock = FixedClock::at(instant);
        assert_eq!(clock.now(), instant);
        assert_eq!(clock.now(), instant);
    }

    #[test]
    fn test_fixed_clock_advance() {
        let instant = Utc::now();
        let clock = FixedClock::at(instant);
        clock.advance(Duration::days(8));
        assert_eq!(clock.now(), instant + Duration::days(8));
    }
}
