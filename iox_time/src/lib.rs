//! Time functionality shared across the upsert engine.
//!
//! Everything that needs "now" goes through a [`TimeProvider`] rather than calling
//! [`std::time::SystemTime::now`] or [`chrono::Utc::now`] directly, so that tests can
//! substitute a [`MockProvider`] and advance time deterministically instead of sleeping.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    clippy::explicit_iter_loop,
    clippy::clone_on_ref_ptr
)]

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::RwLock;
use std::{
    fmt::Debug,
    ops::{Add, Sub},
    time::Duration,
};

/// A point in time, represented as nanoseconds since the Unix epoch.
///
/// Deliberately narrower than [`chrono::DateTime`] / [`std::time::SystemTime`] so it is cheap
/// to copy around and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Time(i64);

impl Time {
    /// The Unix epoch.
    pub const MIN: Self = Self(i64::MIN);

    /// Create a [`Time`] from nanoseconds since the Unix epoch.
    pub fn from_timestamp_nanos(ts: i64) -> Self {
        Self(ts)
    }

    /// Create a [`Time`] from milliseconds since the Unix epoch.
    pub fn from_timestamp_millis(ts: i64) -> Self {
        Self(ts * 1_000_000)
    }

    /// Nanoseconds since the Unix epoch.
    pub fn timestamp_nanos(&self) -> i64 {
        self.0
    }

    /// Milliseconds since the Unix epoch, truncating any sub-millisecond component.
    pub fn timestamp_millis(&self) -> i64 {
        self.0 / 1_000_000
    }

    /// Returns `self - other` if `self >= other`, else `None`.
    pub fn checked_duration_since(&self, other: Self) -> Option<Duration> {
        let nanos = self.0.checked_sub(other.0)?;
        (nanos >= 0).then(|| Duration::from_nanos(nanos as u64))
    }

    /// Convert to a [`chrono::DateTime<Utc>`] for display / formatting purposes.
    pub fn date_time(&self) -> DateTime<Utc> {
        Utc.timestamp_nanos(self.0)
    }
}

impl Add<Duration> for Time {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0 + rhs.as_nanos() as i64)
    }
}

impl Sub<Duration> for Time {
    type Output = Self;

    fn sub(self, rhs: Duration) -> Self::Output {
        Self(self.0 - rhs.as_nanos() as i64)
    }
}

/// Provides the current time.
///
/// Implemented by [`SystemProvider`] for production use and [`MockProvider`] for tests.
pub trait TimeProvider: Debug + Send + Sync + 'static {
    /// Returns the current time.
    fn now(&self) -> Time;
}

/// A [`TimeProvider`] that returns the real wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProvider {}

impl SystemProvider {
    /// Create a new [`SystemProvider`].
    pub fn new() -> Self {
        Self {}
    }
}

impl TimeProvider for SystemProvider {
    fn now(&self) -> Time {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system clock is before the Unix epoch");
        Time::from_timestamp_nanos(now.as_nanos() as i64)
    }
}

/// A [`TimeProvider`] with a time that can be set and advanced by the test driving it.
#[derive(Debug)]
pub struct MockProvider {
    now: RwLock<Time>,
}

impl MockProvider {
    /// Create a new [`MockProvider`] fixed at `start`.
    pub fn new(start: Time) -> Self {
        Self {
            now: RwLock::new(start),
        }
    }

    /// Overwrite the current time.
    pub fn set(&self, time: Time) {
        *self.now.write() = time;
    }

    /// Advance the current time by `duration`, returning the new time.
    pub fn inc(&self, duration: Duration) -> Time {
        let mut now = self.now.write();
        *now = *now + duration;
        *now
    }
}

impl TimeProvider for MockProvider {
    fn now(&self) -> Time {
        *self.now.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_millis() {
        let t = Time::from_timestamp_millis(129);
        assert_eq!(t.timestamp_millis(), 129);
    }

    #[test]
    fn mock_provider_advances() {
        let t0 = Time::from_timestamp_millis(0);
        let mock = MockProvider::new(t0);
        assert_eq!(mock.now(), t0);

        let t1 = mock.inc(Duration::from_secs(10));
        assert_eq!(mock.now(), t1);
        assert_eq!(t1.checked_duration_since(t0), Some(Duration::from_secs(10)));
    }

    #[test]
    fn checked_duration_since_is_none_when_negative() {
        let earlier = Time::from_timestamp_millis(0);
        let later = Time::from_timestamp_millis(10);
        assert_eq!(earlier.checked_duration_since(later), None);
    }

    #[test]
    fn system_provider_moves_forward() {
        let provider = SystemProvider::new();
        let a = provider.now();
        let b = provider.now();
        assert!(b >= a);
    }
}
