use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{builtins, filter::GeometryFilter, preprocess::VariantKind};

/// One detector parameter profile tried during the sweep.
///
/// Profiles trade precision for recall: the aggressive tiers widen the
/// adaptive-threshold window range, accept smaller quads, and tolerate more
/// damaged border bits.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DetectorProfile {
    pub name: String,
    /// Radii of the adaptive-threshold mean windows, in pixels. Each radius
    /// produces one binarization pass.
    pub adaptive_radii: Vec<u32>,
    /// Offset subtracted from the local mean before the dark comparison.
    pub adaptive_offset: i16,
    /// Minimum quad side as a fraction of the larger image dimension.
    pub min_side_frac: f32,
    /// Minimum fraction of border cells reading black for a decode to count.
    pub min_border_score: f32,
    /// Maximum Hamming distance accepted when matching codes.
    pub max_hamming: u8,
}

impl DetectorProfile {
    pub fn standard() -> Self {
        Self {
            name: "standard".to_string(),
            adaptive_radii: vec![15],
            adaptive_offset: 7,
            min_side_frac: 0.01,
            min_border_score: 0.85,
            max_hamming: 0,
        }
    }

    pub fn aggressive() -> Self {
        Self {
            name: "aggressive".to_string(),
            adaptive_radii: vec![10, 23],
            adaptive_offset: 5,
            min_side_frac: 0.005,
            min_border_score: 0.75,
            max_hamming: 1,
        }
    }

    pub fn very_aggressive() -> Self {
        Self {
            name: "very-aggressive".to_string(),
            adaptive_radii: vec![6, 15, 31],
            adaptive_offset: 3,
            min_side_frac: 0.003,
            min_border_score: 0.65,
            max_hamming: 2,
        }
    }
}

/// Full sweep configuration.
///
/// The thresholds here are empirically chosen defaults, kept configurable
/// rather than baked in.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Wall-clock budget for the entire search, fast path included.
    pub budget: Duration,
    /// Profiles tried directly on the raw grayscale before any
    /// preprocessing. The common case is detectable here and the full sweep
    /// is expensive.
    pub fast_profiles: Vec<DetectorProfile>,
    /// Profiles tried against every preprocessing variant.
    pub sweep_profiles: Vec<DetectorProfile>,
    /// Builtin dictionary names, in search order.
    pub dictionaries: Vec<String>,
    /// Preprocessing variants, in sweep order.
    pub variants: Vec<VariantKind>,
    /// Geometry acceptance thresholds applied to every raw detection.
    pub filter: GeometryFilter,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            budget: Duration::from_millis(2500),
            fast_profiles: vec![
                DetectorProfile::standard(),
                DetectorProfile::aggressive(),
                DetectorProfile::very_aggressive(),
            ],
            sweep_profiles: vec![
                DetectorProfile::standard(),
                DetectorProfile::aggressive(),
                DetectorProfile::very_aggressive(),
            ],
            dictionaries: builtins::default_search_order()
                .into_iter()
                .map(str::to_string)
                .collect(),
            variants: VariantKind::default_order(),
            filter: GeometryFilter::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_json() {
        let cfg = SweepConfig::default();
        let json = serde_json::to_string(&cfg).expect("serialize");
        let back: SweepConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.budget, cfg.budget);
        assert_eq!(back.dictionaries, cfg.dictionaries);
        assert_eq!(back.variants.len(), cfg.variants.len());
    }

    #[test]
    fn default_dictionaries_resolve() {
        for name in SweepConfig::default().dictionaries {
            assert!(builtins::builtin_dictionary(&name).is_some(), "{name}");
        }
    }

    #[test]
    fn profiles_relax_monotonically() {
        let std = DetectorProfile::standard();
        let agg = DetectorProfile::aggressive();
        let very = DetectorProfile::very_aggressive();
        assert!(std.min_side_frac > agg.min_side_frac);
        assert!(agg.min_side_frac > very.min_side_frac);
        assert!(std.max_hamming < very.max_hamming);
        assert!(std.min_border_score > very.min_border_score);
    }
}
