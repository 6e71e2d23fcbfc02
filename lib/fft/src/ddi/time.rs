// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 The FFT Authors

//! Moments, timestamps, etc.

use core::fmt;
use core::ops::Add;
use core::time::Duration;
use std::time::Instant;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

/// The number of milliseconds in a second.
pub const MILLIS: u64 = 1_000;
/// The number of microseconds in a second.
pub const MICROS: u64 = 1_000_000;
/// The number of nanoseconds in a second.
pub const NANOS: u64 = 1_000_000_000;
/// The conversion from nanoseconds to milliseconds.
pub const NANOS_TO_MILLIS: u64 = NANOS / MILLIS;

/// A monotonic moment in time.
///
/// Used for local deadlines, such as an administrative recovery
/// window, which must not move with the wall clock.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct Moment {
    inner: Instant,
}

impl Add<Duration> for Moment {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Moment { inner: self.inner + rhs }
    }
}

impl Moment {
    /// Compute the delta between `self - earlier` and return as
    /// milliseconds. Saturates to zero if `earlier` is later.
    pub fn delta_as_millis(&self, earlier: Moment) -> u64 {
        let delta = self.inner.saturating_duration_since(earlier.inner);
        delta.as_secs() * MILLIS + u64::from(delta.subsec_millis())
    }

    pub fn now() -> Self {
        Self { inner: Instant::now() }
    }
}

impl Default for Moment {
    fn default() -> Self {
        Self::now()
    }
}

/// A packet timestamp: signed nanoseconds since the Unix epoch.
///
/// Timestamps come from packet annotations (capture records or the
/// wall clock at receive), so nothing guarantees they are monotonic.
/// Differences are signed and a "negative age" is meaningful to the
/// flow table.
#[derive(
    Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd,
)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const ZERO: Self = Self(0);

    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    pub const fn from_millis(millis: i64) -> Self {
        Self(millis.saturating_mul(NANOS_TO_MILLIS as i64))
    }

    /// Build a timestamp from a capture record's seconds and
    /// microseconds fields.
    pub const fn from_secs_micros(secs: u32, micros: u32) -> Self {
        Self(
            secs as i64 * NANOS as i64
                + micros as i64 * (NANOS / MICROS) as i64,
        )
    }

    /// Build a timestamp from a capture record's seconds and
    /// nanoseconds fields.
    pub const fn from_secs_nanos(secs: u32, nanos: u32) -> Self {
        Self(secs as i64 * NANOS as i64 + nanos as i64)
    }

    /// The current wall clock time. A clock set before the epoch
    /// reads as a negative timestamp.
    pub fn now() -> Self {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(d) => Self(i64::try_from(d.as_nanos()).unwrap_or(i64::MAX)),
            Err(e) => Self(
                i64::try_from(e.duration().as_nanos())
                    .map(|n| -n)
                    .unwrap_or(i64::MIN),
            ),
        }
    }

    pub const fn as_nanos(&self) -> i64 {
        self.0
    }

    /// Compute `self - earlier` in whole milliseconds, rounding toward
    /// negative infinity.
    pub fn delta_as_millis(&self, earlier: Timestamp) -> i64 {
        self.0
            .saturating_sub(earlier.0)
            .div_euclid(NANOS_TO_MILLIS as i64)
    }
}

impl Add<Duration> for Timestamp {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        let nanos = i64::try_from(rhs.as_nanos()).unwrap_or(i64::MAX);
        Self(self.0.saturating_add(nanos))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let secs = self.0.div_euclid(NANOS as i64);
        let nanos = self.0.rem_euclid(NANOS as i64);
        write!(f, "{secs}.{nanos:09}")
    }
}
