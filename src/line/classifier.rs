//! Intensity to polarity to bit classification.
//!
//! The line signal is sampled as three levels: black, grey and white.
//! A bit is read straight from one sample: white is a one, black and grey
//! are zero. Duobinary decoding proper would also map black to one; this
//! decoder keeps the single-sided mapping.

use crate::config::SignalConfig;

/// Signal level of one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Polarity {
    /// Black, at or below the low threshold.
    Negative,
    /// Grey band.
    Zero,
    /// White, above the high threshold.
    Positive,
}

impl Polarity {
    /// Returns the level as -1, 0 or +1.
    #[inline]
    pub fn signum(self) -> i8 {
        match self {
            Polarity::Negative => -1,
            Polarity::Zero => 0,
            Polarity::Positive => 1,
        }
    }
}

/// Maps a polarity to a data bit.
#[inline]
pub fn bit_value(polarity: Polarity) -> u8 {
    match polarity {
        Polarity::Positive => 1,
        Polarity::Zero | Polarity::Negative => 0,
    }
}

/// Fixed two-threshold sample classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classifier {
    low: u8,
    high: u8,
}

impl Classifier {
    /// Creates a classifier; `low` and `high` are inclusive upper bounds of
    /// the negative and grey bands.
    pub fn new(low: u8, high: u8) -> Self {
        Self { low, high }
    }

    /// Creates a classifier from the configured grey band.
    pub fn from_config(config: &SignalConfig) -> Self {
        Self::new(config.grey_low, config.grey_high)
    }

    /// Classifies one intensity.
    #[inline]
    pub fn polarity(&self, intensity: u8) -> Polarity {
        if intensity <= self.low {
            Polarity::Negative
        } else if intensity <= self.high {
            Polarity::Zero
        } else {
            Polarity::Positive
        }
    }

    /// Classifies one intensity straight to a bit.
    #[inline]
    pub fn bit(&self, intensity: u8) -> u8 {
        bit_value(self.polarity(intensity))
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::from_config(&SignalConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_boundaries() {
        let classifier = Classifier::default();

        assert_eq!(classifier.polarity(0x00).signum(), -1);
        assert_eq!(classifier.polarity(0x55).signum(), -1);
        assert_eq!(classifier.polarity(0x56).signum(), 0);
        assert_eq!(classifier.polarity(0xAA).signum(), 0);
        assert_eq!(classifier.polarity(0xAB).signum(), 1);
        assert_eq!(classifier.polarity(0xFF).signum(), 1);
    }

    #[test]
    fn test_only_positive_is_one() {
        assert_eq!(bit_value(Polarity::Negative), 0);
        assert_eq!(bit_value(Polarity::Zero), 0);
        assert_eq!(bit_value(Polarity::Positive), 1);
    }

    #[test]
    fn test_grey_band_reads_zero() {
        let classifier = Classifier::default();
        assert!((0x56..=0xAA).all(|v| classifier.bit(v) == 0));
    }
}
