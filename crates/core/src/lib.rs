//! Core units, constants, epochs, and shared primitives for the transfer_scout workspace.

/// Physical constants. Distances in km, times in seconds unless stated otherwise.
pub mod constants {
    /// Heliocentric gravitational parameter (km³/s²).
    pub const MU_SUN_KM3_S2: f64 = 1.327_124_400_18e11;
    /// Kilometres per astronomical unit.
    pub const AU_KM: f64 = 149_597_870.7;
    /// Seconds per Julian day.
    pub const SECONDS_PER_DAY: f64 = 86_400.0;
    /// Days per Julian century.
    pub const DAYS_PER_JULIAN_CENTURY: f64 = 36_525.0;
    /// Julian date of the J2000.0 epoch (2000-01-01T12:00:00 TT).
    pub const J2000_JD: f64 = 2_451_545.0;
    /// Julian date of the MJD2000 origin (2000-01-01T00:00:00).
    pub const MJD2000_JD: f64 = 2_451_544.5;
    /// Modified Julian date of the MJD2000 origin.
    pub const MJD2000_MJD: f64 = 51_544.0;
}

/// Basic unit conversion helpers.
pub mod units {
    use super::constants::AU_KM;

    /// Convert kilometres to astronomical units.
    #[inline]
    pub fn km_to_au(v: f64) -> f64 {
        v / AU_KM
    }

    /// Convert degrees to radians.
    #[inline]
    pub fn deg_to_rad(v: f64) -> f64 {
        v.to_radians()
    }
}

/// Epoch handling. Epochs are `f64` days since MJD2000 (2000-01-01T00:00:00 UTC).
pub mod time {
    use chrono::{DateTime, NaiveDate, NaiveDateTime};
    use thiserror::Error;

    use super::constants::{DAYS_PER_JULIAN_CENTURY, J2000_JD, MJD2000_JD, SECONDS_PER_DAY};

    /// Unix timestamp of 2000-01-01T00:00:00 UTC.
    const MJD2000_UNIX_SECONDS: i64 = 946_684_800;

    const ACCEPTED_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"];

    /// Errors from epoch parsing or formatting.
    #[derive(Debug, Error)]
    pub enum TimeError {
        #[error("invalid epoch string `{0}`")]
        InvalidEpoch(String),
        #[error("epoch {0} days from MJD2000 is not representable as a calendar date")]
        OutOfRange(f64),
    }

    /// Convert days to seconds.
    #[inline]
    pub fn days_to_seconds(days: f64) -> f64 {
        days * SECONDS_PER_DAY
    }

    /// Convert seconds to days.
    #[inline]
    pub fn seconds_to_days(seconds: f64) -> f64 {
        seconds / SECONDS_PER_DAY
    }

    /// Julian date of an MJD2000 epoch.
    #[inline]
    pub fn mjd2000_to_jd(mjd2000: f64) -> f64 {
        mjd2000 + MJD2000_JD
    }

    /// Julian centuries elapsed since J2000.0 for an MJD2000 epoch.
    #[inline]
    pub fn julian_centuries_since_j2000(mjd2000: f64) -> f64 {
        (mjd2000_to_jd(mjd2000) - J2000_JD) / DAYS_PER_JULIAN_CENTURY
    }

    /// Parse a UTC calendar string (`2024-09-01 00:00:00`, ISO `T` form, or a bare date)
    /// into MJD2000 days.
    pub fn parse_utc(epoch: &str) -> Result<f64, TimeError> {
        let trimmed = epoch.trim();
        let parsed = ACCEPTED_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
            .or_else(|| {
                NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                    .ok()
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
            })
            .ok_or_else(|| TimeError::InvalidEpoch(epoch.to_string()))?;

        let utc = parsed.and_utc();
        let seconds = (utc.timestamp() - MJD2000_UNIX_SECONDS) as f64
            + f64::from(utc.timestamp_subsec_nanos()) * 1e-9;
        Ok(seconds_to_days(seconds))
    }

    /// Format an MJD2000 epoch as `YYYY-MM-DD HH:MM:SS` (UTC).
    pub fn format_utc(mjd2000: f64) -> Result<String, TimeError> {
        if !mjd2000.is_finite() {
            return Err(TimeError::OutOfRange(mjd2000));
        }
        let seconds = days_to_seconds(mjd2000).round() as i64;
        DateTime::from_timestamp(MJD2000_UNIX_SECONDS + seconds, 0)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .ok_or(TimeError::OutOfRange(mjd2000))
    }

    /// Format an MJD2000 epoch as a bare calendar date, used for axis labels.
    pub fn format_date(mjd2000: f64) -> Result<String, TimeError> {
        format_utc(mjd2000).map(|s| s.split(' ').next().unwrap_or_default().to_string())
    }
}

/// Evenly spaced sample axes.
pub mod grid {
    /// `count` evenly spaced values from `start` to `end`, both inclusive.
    ///
    /// A single sample yields `[start]`; zero samples yield an empty axis.
    pub fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
        match count {
            0 => Vec::new(),
            1 => vec![start],
            _ => {
                let step = (end - start) / (count - 1) as f64;
                (0..count)
                    .map(|i| {
                        if i == count - 1 {
                            end
                        } else {
                            start + step * i as f64
                        }
                    })
                    .collect()
            }
        }
    }
}

/// Minimal vector helpers to avoid ad-hoc `[f64; 3]` math everywhere.
pub mod vector {
    /// Alias for a 3D vector in kilometres or km/s depending on context.
    pub type Vector3 = [f64; 3];

    /// Euclidean norm of a vector.
    #[inline]
    pub fn norm(v: &Vector3) -> f64 {
        dot(v, v).sqrt()
    }

    /// Dot product of two vectors.
    #[inline]
    pub fn dot(a: &Vector3, b: &Vector3) -> f64 {
        a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
    }

    /// Cross product `a × b`.
    #[inline]
    pub fn cross(a: &Vector3, b: &Vector3) -> Vector3 {
        [
            a[1] * b[2] - a[2] * b[1],
            a[2] * b[0] - a[0] * b[2],
            a[0] * b[1] - a[1] * b[0],
        ]
    }

    /// Vector addition.
    #[inline]
    pub fn add(a: &Vector3, b: &Vector3) -> Vector3 {
        [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
    }

    /// Vector subtraction.
    #[inline]
    pub fn sub(a: &Vector3, b: &Vector3) -> Vector3 {
        [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
    }

    /// Scale a vector by a scalar.
    #[inline]
    pub fn scale(v: &Vector3, s: f64) -> Vector3 {
        [v[0] * s, v[1] * s, v[2] * s]
    }

    /// Norm of the difference `a - b`.
    #[inline]
    pub fn distance(a: &Vector3, b: &Vector3) -> f64 {
        norm(&sub(a, b))
    }

    /// Unit vector along `v`, or `None` for a (near) zero vector.
    #[inline]
    pub fn unit(v: &Vector3) -> Option<Vector3> {
        let n = norm(v);
        if n > f64::EPSILON {
            Some(scale(v, 1.0 / n))
        } else {
            None
        }
    }

    /// True when every component is finite.
    #[inline]
    pub fn is_finite(v: &Vector3) -> bool {
        v.iter().all(|c| c.is_finite())
    }
}
