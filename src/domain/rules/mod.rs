// Domain rules - Segment planning and engine time formatting

use chrono::{DateTime, Utc};

use crate::domain::errors::*;
use crate::domain::model::*;

/// Format a non-negative offset in seconds as the engine's `hh:mm:ss` position.
///
/// The value is read as an offset from the Unix epoch and truncated to whole
/// seconds, so it wraps every 24 hours.
pub fn format_duration(seconds: f64) -> String {
    debug_assert!(
        seconds.is_finite() && seconds >= 0.0,
        "duration must be a non-negative number, got {}",
        seconds
    );
    let whole = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as i64
    } else {
        0
    };
    DateTime::<Utc>::from_timestamp(whole, 0)
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "00:00:00".to_string())
}

/// Convert the user-facing segment length to seconds
pub fn minutes_to_seconds(minutes: f64) -> f64 {
    minutes * 60.0
}

/// Shortest segment the engine's `hh:mm:ss` positions can express
pub const MIN_SEGMENT_SECONDS: f64 = 1.0;

/// Upper bound on the number of windows a single plan may hold
pub const MAX_SEGMENTS: usize = 100_000;

/// Splits a known media duration into fixed-length windows
pub struct SegmentPlanner;

impl SegmentPlanner {
    /// Compute the ordered segment windows.
    ///
    /// `total_duration` is whatever the probe reported; an absent or
    /// non-positive value means the duration is unknown and nothing is planned.
    /// The last window keeps the full requested length even if the media ends
    /// sooner, the engine stops at the end of the source.
    pub fn plan(
        total_duration: Option<f64>,
        segment_length_seconds: f64,
    ) -> Result<SegmentPlan, DomainError> {
        Self::validate_segment_length(segment_length_seconds)?;

        let total = match total_duration {
            Some(total) if total.is_finite() && total > 0.0 => total,
            _ => return Err(DomainError::DurationUnknown),
        };

        let count = (total / segment_length_seconds).ceil();
        if count > MAX_SEGMENTS as f64 {
            return Err(DomainError::BadArgs(format!(
                "Segment length of {}s would split {}s into {} segments, the limit is {}",
                segment_length_seconds, total, count, MAX_SEGMENTS
            )));
        }
        let count = count as usize;
        let windows = (0..count)
            .map(|index| SegmentWindow {
                index,
                start_seconds: index as f64 * segment_length_seconds,
                length_seconds: segment_length_seconds,
            })
            .collect();

        Ok(SegmentPlan::new(total, segment_length_seconds, windows))
    }

    /// Segment length must be a finite number of seconds, at least one
    pub fn validate_segment_length(segment_length_seconds: f64) -> Result<(), DomainError> {
        if !segment_length_seconds.is_finite() || segment_length_seconds <= 0.0 {
            return Err(DomainError::BadArgs(format!(
                "Segment length must be greater than zero, got {}",
                segment_length_seconds
            )));
        }
        if segment_length_seconds < MIN_SEGMENT_SECONDS {
            return Err(DomainError::BadArgs(format!(
                "Segment length must be at least {} second, got {}",
                MIN_SEGMENT_SECONDS, segment_length_seconds
            )));
        }
        Ok(())
    }
}
