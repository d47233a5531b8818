use thiserror::Error;

/// Upper limit for `BuildSettings::sah_step`, sizes the per node binning scratch space.
pub const MAX_SAH_STEPS: usize = 32;

/// How a node picks its split plane.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum SplitStrategy {
    /// Midpoint of the longest box axis, nodes with at most `triangles_per_leaf`
    /// triangles become leaves.
    Dichotomy,
    /// SAH evaluated at every triangle centroid on every axis.
    ExhaustiveSah,
    /// SAH evaluated at `sah_step - 1` equally spaced planes per axis.
    SteppedSah,
    /// SAH over `sah_step` centroid bins per axis, evaluated with prefix sums.
    #[default]
    BinnedSah,
}

impl SplitStrategy {
    pub const ALL: [SplitStrategy; 4] = [
        SplitStrategy::Dichotomy,
        SplitStrategy::ExhaustiveSah,
        SplitStrategy::SteppedSah,
        SplitStrategy::BinnedSah,
    ];

    /// Maps the three independent switches `is_sah`, `is_step_sah`, `is_bins_sah`
    /// to a strategy. Inner switches are ignored when an outer one is off.
    pub fn from_flags(is_sah: bool, is_step_sah: bool, is_bins_sah: bool) -> Self {
        match (is_sah, is_step_sah, is_bins_sah) {
            (false, _, _) => SplitStrategy::Dichotomy,
            (true, false, _) => SplitStrategy::ExhaustiveSah,
            (true, true, false) => SplitStrategy::SteppedSah,
            (true, true, true) => SplitStrategy::BinnedSah,
        }
    }

    pub fn is_sah(self) -> bool {
        self != SplitStrategy::Dichotomy
    }
}

#[derive(Clone, Debug, PartialEq, bon::Builder)]
pub struct BuildSettings {
    /// Leaf size threshold of the dichotomy split.
    #[builder(default = 2)]
    pub triangles_per_leaf: usize,

    #[builder(default)]
    pub strategy: SplitStrategy,

    /// Number of steps (stepped SAH) or bins (binned SAH) per axis.
    #[builder(default = 3)]
    pub sah_step: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("SAH step count {steps} is out of range 1..={max}", max = MAX_SAH_STEPS)]
    SahStepOutOfRange { steps: usize },
}

impl BuildSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(1..=MAX_SAH_STEPS).contains(&self.sah_step) {
            return Err(SettingsError::SahStepOutOfRange {
                steps: self.sah_step,
            });
        }
        Ok(())
    }
}

impl Default for BuildSettings {
    fn default() -> Self {
        BuildSettings::builder().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{assert, let_assert};
    use test_case::test_case;

    #[test_case(false, false, false, SplitStrategy::Dichotomy)]
    #[test_case(false, true, true, SplitStrategy::Dichotomy)]
    #[test_case(true, false, false, SplitStrategy::ExhaustiveSah)]
    #[test_case(true, false, true, SplitStrategy::ExhaustiveSah)]
    #[test_case(true, true, false, SplitStrategy::SteppedSah)]
    #[test_case(true, true, true, SplitStrategy::BinnedSah)]
    fn from_flags(is_sah: bool, is_step_sah: bool, is_bins_sah: bool, expected: SplitStrategy) {
        let strategy = SplitStrategy::from_flags(is_sah, is_step_sah, is_bins_sah);
        assert!(strategy == expected);
        assert!(strategy.is_sah() == is_sah);
    }

    #[test]
    fn defaults() {
        let settings = BuildSettings::default();
        assert!(settings.triangles_per_leaf == 2);
        assert!(settings.strategy == SplitStrategy::BinnedSah);
        assert!(settings.sah_step == 3);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn builder_overrides() {
        let settings = BuildSettings::builder()
            .strategy(SplitStrategy::SteppedSah)
            .sah_step(MAX_SAH_STEPS)
            .build();
        assert!(settings.triangles_per_leaf == 2);
        assert!(settings.strategy == SplitStrategy::SteppedSah);
        assert!(settings.validate().is_ok());
    }

    #[test_case(0)]
    #[test_case(MAX_SAH_STEPS + 1)]
    fn invalid_sah_step(steps: usize) {
        let settings = BuildSettings::builder().sah_step(steps).build();
        let_assert!(Err(SettingsError::SahStepOutOfRange { steps: reported }) = settings.validate());
        assert!(reported == steps);
    }
}
