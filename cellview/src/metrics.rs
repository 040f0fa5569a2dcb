//! Emergent-signal metrics: sortedness, aggregation, and delayed gratification (DG).

use serde::Serialize;

/// Default hysteresis for [`detect_dg`] when called from the engine.
pub const DEFAULT_DG_EPSILON: f64 = 1e-3;

/// Peak-to-valley drops at or below this are ignored (the score divides by them).
const MIN_DROP: f64 = 1e-9;

/// Local monotonicity: `1 - adjacent_inversions / (len - 1)`.
///
/// 1.0 for non-decreasing input, 0.0 when strictly decreasing throughout.
/// Sequences shorter than two count as sorted.
pub fn sortedness<T: PartialOrd>(values: &[T]) -> f64 {
    if values.len() < 2 {
        return 1.0;
    }
    let inversions = values.windows(2).filter(|w| w[0] > w[1]).count();
    1.0 - inversions as f64 / (values.len() - 1) as f64
}

/// Fraction of adjacent pairs sharing a label.
///
/// For ~3 labels assigned at random the baseline is about 0.11; higher means
/// like labels are clustering. Sequences shorter than two score 1.0.
pub fn aggregation<T: PartialEq>(labels: &[T]) -> f64 {
    if labels.len() < 2 {
        return 1.0;
    }
    let same = labels.windows(2).filter(|w| w[0] == w[1]).count();
    same as f64 / (labels.len() - 1) as f64
}

/// One peak → valley → higher-peak pattern.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DgEpisode {
    /// Time index of the first peak.
    pub start: usize,
    /// Time index of the second, higher peak.
    pub end: usize,
    pub peak: f64,
    pub valley: f64,
    pub new_peak: f64,
}

impl DgEpisode {
    /// `(new_peak - valley) / (peak - valley)`.
    pub fn score(&self) -> f64 {
        (self.new_peak - self.valley) / (self.peak - self.valley)
    }
}

/// Episodes found in a series plus their summed scores (the DG index).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DgReport {
    pub episodes: Vec<DgEpisode>,
    pub index: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExtremumKind {
    Peak,
    Valley,
}

#[derive(Debug, Clone, Copy)]
struct Extremum {
    kind: ExtremumKind,
    value: f64,
    index: usize,
}

/// Alternating peaks and valleys, tracked with hysteresis `epsilon`.
///
/// While climbing the running maximum is tracked and a peak is recorded once
/// the series falls more than `epsilon` below it; descending is symmetric.
/// The first move of more than `epsilon` away from `series[0]` sets the
/// initial direction. A series that never moves that far has no extrema.
fn extrema(series: &[f64], epsilon: f64) -> Vec<Extremum> {
    let first = match series.first() {
        Some(&v) => v,
        None => return Vec::new(),
    };

    let mut climbing = match series.iter().find(|&&v| (v - first).abs() > epsilon) {
        Some(&v) => v > first,
        None => return Vec::new(),
    };

    let mut found = Vec::new();
    let mut extreme = first;
    let mut extreme_idx = 0usize;
    for (i, &value) in series.iter().enumerate() {
        if climbing {
            if value > extreme {
                extreme = value;
                extreme_idx = i;
            } else if value < extreme - epsilon {
                found.push(Extremum {
                    kind: ExtremumKind::Peak,
                    value: extreme,
                    index: extreme_idx,
                });
                climbing = false;
                extreme = value;
                extreme_idx = i;
            }
        } else if value < extreme {
            extreme = value;
            extreme_idx = i;
        } else if value > extreme + epsilon {
            found.push(Extremum {
                kind: ExtremumKind::Valley,
                value: extreme,
                index: extreme_idx,
            });
            climbing = true;
            extreme = value;
            extreme_idx = i;
        }
    }
    found
}

/// Extract delayed-gratification episodes from a time series S(t).
///
/// An episode is a peak, then a valley, then a strictly higher peak. The DG
/// index is Σ (new_peak − valley) / (peak − valley) over all episodes.
/// Series shorter than three points yield nothing.
pub fn detect_dg(series: &[f64], epsilon: f64) -> DgReport {
    if series.len() < 3 {
        return DgReport::default();
    }

    let points = extrema(series, epsilon);
    let mut report = DgReport::default();
    for triple in points.windows(3) {
        let (p1, v, p2) = (triple[0], triple[1], triple[2]);
        if p1.kind != ExtremumKind::Peak
            || v.kind != ExtremumKind::Valley
            || p2.kind != ExtremumKind::Peak
        {
            continue;
        }
        if p2.value <= p1.value || p1.value - v.value <= MIN_DROP {
            continue;
        }
        let episode = DgEpisode {
            start: p1.index,
            end: p2.index,
            peak: p1.value,
            valley: v.value,
            new_peak: p2.value,
        };
        report.index += episode.score();
        report.episodes.push(episode);
    }
    report
}
