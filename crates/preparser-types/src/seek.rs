/// How precisely a thumbnail seek should land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekPrecision {
    /// Land exactly on the requested point, even if slower.
    Precise,
    /// Snap to the nearest convenient point (e.g. keyframe), favoring speed.
    Fast,
}

/// Where in the media a thumbnail should be taken from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeekDescriptor {
    /// No seek was requested; let the worker pick a default.
    None,
    /// Seek to an absolute tick count.
    ByTime {
        /// Target position, in ticks.
        ticks: u64,
        /// Precision hint.
        precision: SeekPrecision,
    },
    /// Seek to a fractional position of the media's total length.
    ByPosition {
        /// Target position as a fraction in `[0, 1]`.
        fraction: f32,
        /// Precision hint.
        precision: SeekPrecision,
    },
}

impl SeekDescriptor {
    /// Validates that a `ByPosition` fraction lies in `[0, 1]`; all other
    /// variants are always valid.
    pub fn is_valid(&self) -> bool {
        match self {
            SeekDescriptor::None | SeekDescriptor::ByTime { .. } => true,
            SeekDescriptor::ByPosition { fraction, .. } => {
                fraction.is_finite() && (0.0..=1.0).contains(fraction)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_and_by_time_are_always_valid() {
        assert!(SeekDescriptor::None.is_valid());
        assert!(SeekDescriptor::ByTime { ticks: u64::MAX, precision: SeekPrecision::Precise }.is_valid());
    }

    #[test]
    fn by_position_validates_the_unit_interval() {
        let valid = SeekDescriptor::ByPosition { fraction: 0.5, precision: SeekPrecision::Fast };
        assert!(valid.is_valid());

        let boundary_low = SeekDescriptor::ByPosition { fraction: 0.0, precision: SeekPrecision::Fast };
        let boundary_high = SeekDescriptor::ByPosition { fraction: 1.0, precision: SeekPrecision::Fast };
        assert!(boundary_low.is_valid());
        assert!(boundary_high.is_valid());

        let too_low = SeekDescriptor::ByPosition { fraction: -0.1, precision: SeekPrecision::Fast };
        let too_high = SeekDescriptor::ByPosition { fraction: 1.1, precision: SeekPrecision::Fast };
        let nan = SeekDescriptor::ByPosition { fraction: f32::NAN, precision: SeekPrecision::Fast };
        assert!(!too_low.is_valid());
        assert!(!too_high.is_valid());
        assert!(!nan.is_valid());
    }
}
