//! Week-aligned interval partitioning of the timeline.
//!
//! Edge timestamps are partitioned into epochs: half-open intervals
//! `[bᵢ, bᵢ₊₁)` between successive boundaries. The finite boundaries
//! are starts of UTC calendar weeks (Monday 00:00:00 UTC), and the
//! list is always bracketed by `-∞` and `+∞` sentinels so every
//! finite timestamp maps to exactly one epoch.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CredGraphError;

/// Milliseconds in one UTC week.
const WEEK_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// A boundary of the timeline partition: a week start, or one of the
/// two infinite sentinels.
///
/// Ordered `NegInfinity < WeekStart(_) < PosInfinity`, with week
/// starts ordered by time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IntervalBoundary {
    /// Before all representable time.
    NegInfinity,
    /// Start of a UTC calendar week, in milliseconds since the Unix
    /// epoch.
    WeekStart(i64),
    /// After all representable time.
    PosInfinity,
}

impl fmt::Display for IntervalBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegInfinity => write!(f, "-Infinity"),
            Self::WeekStart(ms) => write!(f, "{}", ms),
            Self::PosInfinity => write!(f, "Infinity"),
        }
    }
}

impl FromStr for IntervalBoundary {
    type Err = CredGraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "-Infinity" => Ok(Self::NegInfinity),
            "Infinity" => Ok(Self::PosInfinity),
            other => other.parse::<i64>().map(Self::WeekStart).map_err(|_| {
                CredGraphError::Configuration(format!(
                    "malformed interval boundary: {:?}",
                    other
                ))
            }),
        }
    }
}

/// Floor a timestamp to the start of its UTC calendar week.
fn week_floor_ms(timestamp_ms: i64) -> Result<i64, CredGraphError> {
    let instant = DateTime::<Utc>::from_timestamp_millis(timestamp_ms).ok_or_else(|| {
        CredGraphError::Input(format!(
            "timestamp out of representable range: {}",
            timestamp_ms
        ))
    })?;
    let date = instant.date_naive();
    let monday = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
    let start = monday
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| {
            CredGraphError::Invariant(format!("no midnight for week start {}", monday))
        })?
        .and_utc();
    Ok(start.timestamp_millis())
}

/// Compute the sorted boundary sequence spanning the given timestamps.
///
/// Returns `[-∞, w₁, …, w_k, +∞]` where `w₁ … w_k` are every week
/// start between `week_floor(min)` and `week_floor(max)` inclusive.
/// An empty input yields `[-∞, +∞]`.
pub fn week_boundaries<I>(timestamps: I) -> Result<Vec<IntervalBoundary>, CredGraphError>
where
    I: IntoIterator<Item = i64>,
{
    let mut min = i64::MAX;
    let mut max = i64::MIN;
    let mut seen = false;
    for t in timestamps {
        seen = true;
        min = min.min(t);
        max = max.max(t);
    }

    let mut boundaries = vec![IntervalBoundary::NegInfinity];
    if seen {
        let first = week_floor_ms(min)?;
        let last = week_floor_ms(max)?;
        let mut week = first;
        while week <= last {
            boundaries.push(IntervalBoundary::WeekStart(week));
            week += WEEK_MS;
        }
    }
    boundaries.push(IntervalBoundary::PosInfinity);
    Ok(boundaries)
}

/// The epoch partition: interval starts in ascending order.
///
/// An epoch is the half-open interval from one start to the next;
/// the final epoch extends to `+∞`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochPartition {
    starts: Vec<IntervalBoundary>,
}

impl EpochPartition {
    /// Build the partition from a boundary sequence, dropping the
    /// trailing `+∞` sentinel (it starts no epoch).
    pub fn from_boundaries(boundaries: Vec<IntervalBoundary>) -> Self {
        let starts = boundaries
            .into_iter()
            .filter(|b| *b != IntervalBoundary::PosInfinity)
            .collect();
        Self { starts }
    }

    /// The epoch starts, ascending. The first is always `-∞`.
    pub fn starts(&self) -> &[IntervalBoundary] {
        &self.starts
    }

    /// The epoch containing `timestamp_ms`: the largest start at or
    /// before it. Binary search against the sorted start vector; the
    /// `-∞` sentinel guarantees a match.
    pub fn epoch_start_for(&self, timestamp_ms: i64) -> IntervalBoundary {
        let probe = IntervalBoundary::WeekStart(timestamp_ms);
        let idx = self.starts.partition_point(|start| *start <= probe);
        self.starts[idx - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1999-01-04 was a Monday.
    const MONDAY_1999_01_04_MS: i64 = 915_408_000_000;

    #[test]
    fn test_empty_input_yields_sentinels_only() {
        let boundaries = week_boundaries(Vec::new()).unwrap();
        assert_eq!(
            boundaries,
            vec![IntervalBoundary::NegInfinity, IntervalBoundary::PosInfinity]
        );
    }

    #[test]
    fn test_single_timestamp_yields_one_finite_boundary() {
        let boundaries = week_boundaries([MONDAY_1999_01_04_MS + 1000]).unwrap();
        assert_eq!(
            boundaries,
            vec![
                IntervalBoundary::NegInfinity,
                IntervalBoundary::WeekStart(MONDAY_1999_01_04_MS),
                IntervalBoundary::PosInfinity,
            ]
        );
    }

    #[test]
    fn test_boundaries_are_monday_aligned_and_cover_the_span() {
        let a = MONDAY_1999_01_04_MS + 3 * 24 * 60 * 60 * 1000; // Thursday
        let b = MONDAY_1999_01_04_MS + 2 * WEEK_MS + 1; // two weeks on
        let boundaries = week_boundaries([b, a]).unwrap();

        assert_eq!(boundaries.len(), 5); // sentinels + three week starts
        assert_eq!(boundaries[1], IntervalBoundary::WeekStart(MONDAY_1999_01_04_MS));
        assert_eq!(
            boundaries[3],
            IntervalBoundary::WeekStart(MONDAY_1999_01_04_MS + 2 * WEEK_MS)
        );
    }

    #[test]
    fn test_week_floor_identity_on_week_start() {
        assert_eq!(week_floor_ms(MONDAY_1999_01_04_MS).unwrap(), MONDAY_1999_01_04_MS);
    }

    #[test]
    fn test_week_floor_before_epoch() {
        // 1969-12-29 was the Monday preceding the Unix epoch.
        assert_eq!(week_floor_ms(0).unwrap(), -259_200_000);
    }

    #[test]
    fn test_epoch_lookup_matches_half_open_intervals() {
        let boundaries = week_boundaries([
            MONDAY_1999_01_04_MS,
            MONDAY_1999_01_04_MS + WEEK_MS,
        ])
        .unwrap();
        let partition = EpochPartition::from_boundaries(boundaries);

        // Before the first finite boundary: the -∞ epoch.
        assert_eq!(
            partition.epoch_start_for(MONDAY_1999_01_04_MS - 1),
            IntervalBoundary::NegInfinity
        );
        // On a boundary: that boundary's epoch (half-open).
        assert_eq!(
            partition.epoch_start_for(MONDAY_1999_01_04_MS),
            IntervalBoundary::WeekStart(MONDAY_1999_01_04_MS)
        );
        // Mid-week.
        assert_eq!(
            partition.epoch_start_for(MONDAY_1999_01_04_MS + WEEK_MS - 1),
            IntervalBoundary::WeekStart(MONDAY_1999_01_04_MS)
        );
        // After the last finite boundary: the trailing epoch.
        assert_eq!(
            partition.epoch_start_for(MONDAY_1999_01_04_MS + 10 * WEEK_MS),
            IntervalBoundary::WeekStart(MONDAY_1999_01_04_MS + WEEK_MS)
        );
    }

    #[test]
    fn test_boundary_ordering() {
        assert!(IntervalBoundary::NegInfinity < IntervalBoundary::WeekStart(i64::MIN));
        assert!(IntervalBoundary::WeekStart(i64::MAX) < IntervalBoundary::PosInfinity);
        assert!(IntervalBoundary::WeekStart(0) < IntervalBoundary::WeekStart(1));
    }

    #[test]
    fn test_boundary_string_round_trip() {
        for boundary in [
            IntervalBoundary::NegInfinity,
            IntervalBoundary::WeekStart(MONDAY_1999_01_04_MS),
            IntervalBoundary::WeekStart(-259_200_000),
            IntervalBoundary::PosInfinity,
        ] {
            let parsed: IntervalBoundary = boundary.to_string().parse().unwrap();
            assert_eq!(parsed, boundary);
        }
        assert!("next-tuesday".parse::<IntervalBoundary>().is_err());
    }
}
