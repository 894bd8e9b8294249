//! Simulation rates and their validation.

use thiserror::Error;

/// Rates driving every timed part of the simulation. Units are board pixels
/// (one tile = 32) or abstract phase units, per second of `dt`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tuning {
    /// Hold applied to a piece when it is detached, before it starts dropping.
    pub hold_time: f32,
    /// How fast the hold counts down.
    pub hold_decay_rate: f32,
    /// Slide speed of a dropping piece.
    pub fall_speed: f32,
    /// Slide speed of a rotated row back into place.
    pub slide_rate: f32,
    /// Advance rate of the column colour morph (finishes past 120).
    pub morph_rate: f32,
    /// Rise speed of the incoming row (inserted past 32).
    pub intake_rate: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            hold_time: 0.0,
            hold_decay_rate: 10.0,
            fall_speed: 16.0 * 18.0,
            slide_rate: 32.0 * 5.0,
            morph_rate: 32.0 * 12.0,
            intake_rate: 5.0,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be a positive finite number (got {value})")]
    NonPositiveRate { name: &'static str, value: f32 },
    #[error("hold time must be finite and not negative (got {0})")]
    InvalidHoldTime(f32),
    #[error("frame rate must be between 1 and 240 (got {0})")]
    InvalidFrameRate(f64),
}

impl Tuning {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.hold_time.is_finite() || self.hold_time < 0.0 {
            return Err(ConfigError::InvalidHoldTime(self.hold_time));
        }
        let rates = [
            ("hold decay rate", self.hold_decay_rate),
            ("fall speed", self.fall_speed),
            ("slide rate", self.slide_rate),
            ("morph rate", self.morph_rate),
            ("intake rate", self.intake_rate),
        ];
        for (name, value) in rates {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::NonPositiveRate { name, value });
            }
        }
        Ok(())
    }
}

pub fn validate_frame_rate(rate: f64) -> Result<f64, ConfigError> {
    if rate.is_finite() && (1.0..=240.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(ConfigError::InvalidFrameRate(rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(Tuning::default().validate(), Ok(()));
    }

    #[test]
    fn test_rejects_zero_fall_speed() {
        let t = Tuning {
            fall_speed: 0.0,
            ..Tuning::default()
        };
        assert_eq!(
            t.validate(),
            Err(ConfigError::NonPositiveRate {
                name: "fall speed",
                value: 0.0
            })
        );
    }

    #[test]
    fn test_rejects_negative_hold() {
        let t = Tuning {
            hold_time: -1.0,
            ..Tuning::default()
        };
        assert!(matches!(t.validate(), Err(ConfigError::InvalidHoldTime(_))));
    }

    #[test]
    fn test_frame_rate_bounds() {
        assert_eq!(validate_frame_rate(60.0), Ok(60.0));
        assert!(validate_frame_rate(0.0).is_err());
        assert!(validate_frame_rate(f64::NAN).is_err());
    }
}
