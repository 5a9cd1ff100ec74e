//! Launch-window analysis over a finished search.
//!
//! Collapses the grid to the cheapest cell of every departure row, finds the
//! contiguous departure ranges whose cheapest cell is under a threshold, and
//! suggests a nearby window for a planned departure.

use std::cmp::Ordering;

use serde::Serialize;

use crate::search::SearchOutcome;

/// Cheapest feasible cell of one departure row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DepartureSample {
    pub departure_index: usize,
    pub departure_epoch: f64,
    pub arrival_epoch: f64,
    pub total_dv_km_s: f64,
}

/// Contiguous run of departures whose cheapest cell stays under a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LaunchWindow {
    pub opens: f64,
    pub closes: f64,
    pub best: DepartureSample,
}

impl LaunchWindow {
    pub fn duration_days(&self) -> f64 {
        self.closes - self.opens
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowSuggestion {
    pub baseline: DepartureSample,
    pub recommended: DepartureSample,
    pub planned_dv_km_s: f64,
    pub threshold_dv_km_s: f64,
}

/// Per-departure minimum over the arrival axis, skipping rows with no feasible cell.
pub fn departure_profile(outcome: &SearchOutcome) -> Vec<DepartureSample> {
    (0..outcome.grid.rows())
        .filter_map(|i| {
            let (j, dv) = outcome
                .grid
                .row(i)
                .iter()
                .copied()
                .enumerate()
                .filter(|(_, v)| !v.is_nan())
                .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))?;
            Some(DepartureSample {
                departure_index: i,
                departure_epoch: outcome.departure_epochs[i],
                arrival_epoch: outcome.arrival_epoch(i, j),
                total_dv_km_s: dv,
            })
        })
        .collect()
}

/// Group consecutive departure rows whose cheapest cell is at most `threshold_km_s`.
///
/// A row without feasible cells closes the current window.
pub fn launch_windows(profile: &[DepartureSample], threshold_km_s: f64) -> Vec<LaunchWindow> {
    let mut windows = Vec::new();
    let mut current: Option<LaunchWindow> = None;
    let mut last_index: Option<usize> = None;

    for sample in profile {
        let contiguous = last_index.is_some_and(|k| sample.departure_index == k + 1);
        last_index = Some(sample.departure_index);

        if sample.total_dv_km_s > threshold_km_s || !contiguous {
            if let Some(window) = current.take() {
                windows.push(window);
            }
        }
        if sample.total_dv_km_s > threshold_km_s {
            continue;
        }

        match current.as_mut() {
            Some(window) => {
                window.closes = sample.departure_epoch;
                if sample.total_dv_km_s < window.best.total_dv_km_s {
                    window.best = *sample;
                }
            }
            None => {
                current = Some(LaunchWindow {
                    opens: sample.departure_epoch,
                    closes: sample.departure_epoch,
                    best: *sample,
                })
            }
        }
    }

    if let Some(window) = current {
        windows.push(window);
    }
    windows
}

/// Mean spacing between the cheapest departures of successive windows, in days.
pub fn mean_window_spacing_days(windows: &[LaunchWindow]) -> Option<f64> {
    if windows.len() < 2 {
        return None;
    }
    let gaps: Vec<f64> = windows
        .windows(2)
        .map(|pair| pair[1].best.departure_epoch - pair[0].best.departure_epoch)
        .collect();
    Some(gaps.iter().sum::<f64>() / gaps.len() as f64)
}

/// Suggest a departure when the planned one costs more than `threshold_factor`
/// times the profile minimum.
///
/// Prefers the cheapest qualifying departure at or after the planned epoch and
/// falls back to the latest earlier one. Returns `None` when the planned
/// departure is already good enough or the profile is empty.
pub fn suggest_departure(
    profile: &[DepartureSample],
    planned_epoch: f64,
    threshold_factor: f64,
) -> Option<WindowSuggestion> {
    let baseline = *profile
        .iter()
        .min_by(|a, b| a.total_dv_km_s.partial_cmp(&b.total_dv_km_s).unwrap_or(Ordering::Equal))?;
    let threshold = baseline.total_dv_km_s * threshold_factor;

    let planned = profile.iter().min_by(|a, b| {
        (a.departure_epoch - planned_epoch)
            .abs()
            .partial_cmp(&(b.departure_epoch - planned_epoch).abs())
            .unwrap_or(Ordering::Equal)
    })?;
    if planned.total_dv_km_s <= threshold {
        return None;
    }

    let mut forward: Option<DepartureSample> = None;
    let mut backward: Option<DepartureSample> = None;
    for sample in profile.iter().filter(|s| s.total_dv_km_s <= threshold) {
        if sample.departure_epoch >= planned_epoch {
            match &forward {
                Some(best) if sample.total_dv_km_s >= best.total_dv_km_s => {}
                _ => forward = Some(*sample),
            }
        } else {
            backward = Some(*sample);
        }
    }

    Some(WindowSuggestion {
        baseline,
        recommended: forward.or(backward).unwrap_or(baseline),
        planned_dv_km_s: planned.total_dv_km_s,
        threshold_dv_km_s: threshold,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(i: usize, dv: f64) -> DepartureSample {
        DepartureSample {
            departure_index: i,
            departure_epoch: 10.0 * i as f64,
            arrival_epoch: 10.0 * i as f64 + 200.0,
            total_dv_km_s: dv,
        }
    }

    #[test]
    fn windows_split_on_threshold_and_gaps() {
        let profile = vec![
            sample(0, 9.0),
            sample(1, 5.0),
            sample(2, 4.0),
            sample(3, 12.0),
            sample(4, 6.0),
            // row 5 had no feasible cell
            sample(6, 5.5),
        ];
        let windows = launch_windows(&profile, 6.0);
        assert_eq!(windows.len(), 3);
        assert_eq!((windows[0].opens, windows[0].closes), (10.0, 20.0));
        assert_eq!(windows[0].best.departure_index, 2);
        assert_eq!(windows[1].best.departure_index, 4);
        assert_eq!(windows[2].best.departure_index, 6);
        assert_eq!(mean_window_spacing_days(&windows), Some(20.0));
    }

    #[test]
    fn suggestion_prefers_later_cheap_departure() {
        let profile = vec![sample(0, 4.0), sample(1, 9.0), sample(2, 10.0), sample(3, 4.5)];
        let suggestion = suggest_departure(&profile, 10.0, 1.2).expect("planned departure is expensive");
        assert_eq!(suggestion.baseline.departure_index, 0);
        assert_eq!(suggestion.recommended.departure_index, 3);
        assert_eq!(suggestion.planned_dv_km_s, 9.0);

        assert!(suggest_departure(&profile, 0.0, 1.2).is_none());
    }
}
