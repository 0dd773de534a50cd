//! The budgeted detection sweep.
//!
//! Ordering is fixed and explicit: a fast path over the raw grayscale
//! first, then every preprocessing variant crossed with every detector
//! profile and dictionary. The first combination producing a non-empty,
//! geometry-valid marker set wins outright; there is no scoring across
//! successes. The wall-clock budget is re-checked before every
//! profile/dictionary attempt, so an expired budget is honored mid-variant,
//! not just at variant boundaries.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use touch_calib_core::GrayView;

use crate::builtins;
use crate::decode::{decode_quad, DetectedMarker};
use crate::filter::{accept_markers, GeometryFilter};
use crate::params::{DetectorProfile, SweepConfig};
use crate::quad::find_quads;
use crate::CodeMatcher;

/// Immutable snapshot of one completed search.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DetectionReport {
    /// Accepted markers, unique ids, ascending.
    pub markers: Vec<DetectedMarker>,
    /// `variant:profile` label of the winning combination.
    pub strategy: Option<String>,
    /// Dictionary name of the winning combination.
    pub dictionary: Option<String>,
    pub elapsed: Duration,
    pub success: bool,
}

impl DetectionReport {
    fn failure(elapsed: Duration) -> Self {
        Self {
            markers: Vec::new(),
            strategy: None,
            dictionary: None,
            elapsed,
            success: false,
        }
    }

    /// The marker with the given id, if detected.
    pub fn marker(&self, id: u32) -> Option<&DetectedMarker> {
        self.markers.iter().find(|m| m.id == id)
    }
}

/// Search one grayscale image for fiducial markers.
///
/// Synchronous and CPU-bound; see [`crate::spawn_detection`] for the
/// off-thread variant interactive callers should prefer.
pub fn detect_markers(image: &GrayView<'_>, cfg: &SweepConfig) -> DetectionReport {
    let started = Instant::now();

    for profile in &cfg.fast_profiles {
        for dict_name in &cfg.dictionaries {
            if started.elapsed() > cfg.budget {
                return budget_exhausted(started, "fast path");
            }
            if let Some(markers) = attempt(image, 1.0, image.width, image.height, profile, dict_name, &cfg.filter)
            {
                return success(started, markers, format!("fast:{}", profile.name), dict_name);
            }
        }
    }

    for variant in &cfg.variants {
        log::debug!("marker sweep: variant {}", variant.label());
        let processed = variant.apply(image);
        let view = processed.view();
        let scale = variant.scale();

        for profile in &cfg.sweep_profiles {
            for dict_name in &cfg.dictionaries {
                if started.elapsed() > cfg.budget {
                    return budget_exhausted(started, &variant.label());
                }
                if let Some(markers) =
                    attempt(&view, scale, image.width, image.height, profile, dict_name, &cfg.filter)
                {
                    return success(
                        started,
                        markers,
                        format!("{}:{}", variant.label(), profile.name),
                        dict_name,
                    );
                }
            }
        }
    }

    let elapsed = started.elapsed();
    log::info!(
        "marker sweep exhausted every strategy without a detection ({:.2}s)",
        elapsed.as_secs_f64()
    );
    DetectionReport::failure(elapsed)
}

/// One profile/dictionary attempt against one (possibly rescaled) image.
/// Corners are mapped back to source pixels before filtering.
fn attempt(
    view: &GrayView<'_>,
    variant_scale: f32,
    source_w: usize,
    source_h: usize,
    profile: &DetectorProfile,
    dict_name: &str,
    filter: &GeometryFilter,
) -> Option<Vec<DetectedMarker>> {
    let Some(dict) = builtins::builtin_dictionary(dict_name) else {
        log::warn!("unknown dictionary {dict_name:?} in sweep config");
        return None;
    };
    let matcher = CodeMatcher::new(dict, profile.max_hamming);

    let quads = find_quads(view, profile);
    if quads.is_empty() {
        return None;
    }

    let mut raw: Vec<DetectedMarker> = quads
        .iter()
        .filter_map(|q| decode_quad(view, q, &matcher, profile.min_border_score))
        .collect();
    for det in raw.iter_mut() {
        det.rescale_corners(variant_scale);
    }

    let accepted = accept_markers(raw, filter, source_w, source_h);
    if accepted.is_empty() {
        None
    } else {
        Some(accepted)
    }
}

fn success(
    started: Instant,
    markers: Vec<DetectedMarker>,
    strategy: String,
    dictionary: &str,
) -> DetectionReport {
    let elapsed = started.elapsed();
    log::info!(
        "marker sweep succeeded: {} marker(s) via {} / {} in {:.2}s",
        markers.len(),
        strategy,
        dictionary,
        elapsed.as_secs_f64()
    );
    DetectionReport {
        markers,
        strategy: Some(strategy),
        dictionary: Some(dictionary.to_string()),
        elapsed,
        success: true,
    }
}

fn budget_exhausted(started: Instant, at: &str) -> DetectionReport {
    let elapsed = started.elapsed();
    log::info!(
        "marker sweep budget exhausted at {} after {:.2}s",
        at,
        elapsed.as_secs_f64()
    );
    DetectionReport::failure(elapsed)
}
