// src/analysis/signal.rs
//
// Shared numeric kernel for the event detectors: centered moving
// average, local-maximum peak finding with prominence, and the usual
// descriptive statistics. Every detector smooths its raw per-frame
// scalars with an odd window scaled to the frame rate before any
// thresholding, so single-frame landmark jitter cannot dominate the
// adaptive statistics.

/// Force a window length to be odd so the moving average stays centered.
pub fn odd_window(n: usize) -> usize {
    if n % 2 == 0 {
        n + 1
    } else {
        n
    }
}

/// Centered moving average. At the edges the sum is normalized by the
/// number of in-bounds samples, so a constant input stays exactly
/// constant everywhere.
pub fn moving_average(signal: &[f32], window: usize) -> Vec<f32> {
    if signal.is_empty() || window <= 1 {
        return signal.to_vec();
    }
    let half = window / 2;
    let mut out = Vec::with_capacity(signal.len());
    for i in 0..signal.len() {
        let lo = i.saturating_sub(half);
        let hi = (i + half + 1).min(signal.len());
        let sum: f32 = signal[lo..hi].iter().sum();
        out.push(sum / (hi - lo) as f32);
    }
    out
}

/// First difference scaled by the sample interval.
pub fn derivative(signal: &[f32], dt: f32) -> Vec<f32> {
    signal.windows(2).map(|w| (w[1] - w[0]) / dt).collect()
}

pub fn mean(signal: &[f32]) -> f32 {
    if signal.is_empty() {
        return 0.0;
    }
    signal.iter().sum::<f32>() / signal.len() as f32
}

pub fn std_dev(signal: &[f32]) -> f32 {
    if signal.len() < 2 {
        return 0.0;
    }
    let m = mean(signal);
    let var = signal.iter().map(|v| (v - m) * (v - m)).sum::<f32>() / signal.len() as f32;
    var.sqrt()
}

pub fn median(signal: &[f32]) -> f32 {
    percentile(signal, 50.0)
}

/// Percentile by linear interpolation between closest ranks. Returns 0.0
/// for an empty slice.
pub fn percentile(signal: &[f32], pct: f32) -> f32 {
    if signal.is_empty() {
        return 0.0;
    }
    let mut sorted = signal.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let rank = (pct / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f32;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = rank - lo as f32;
        sorted[lo] * (1.0 - frac) + sorted[hi] * frac
    }
}

/// Local maxima of `signal` subject to a minimum prominence, an optional
/// minimum height, and a minimum index distance between surviving peaks.
/// Prominence follows the usual definition: the peak's height above the
/// higher of the two valley minima reached before the signal next exceeds
/// the peak (or the sequence ends). When peaks violate the distance
/// constraint the taller one wins.
pub fn find_peaks(
    signal: &[f32],
    min_prominence: f32,
    min_height: Option<f32>,
    min_distance: usize,
) -> Vec<usize> {
    if signal.len() < 3 {
        return Vec::new();
    }

    // Candidate local maxima. Plateaus keep their left edge; the
    // smoothed signals we run this on do not produce long plateaus.
    let mut candidates = Vec::new();
    for i in 1..signal.len() - 1 {
        if signal[i] > signal[i - 1] && signal[i] >= signal[i + 1] {
            candidates.push(i);
        }
    }

    let mut peaks = Vec::new();
    for &i in &candidates {
        let height = signal[i];
        if let Some(h) = min_height {
            if height < h {
                continue;
            }
        }

        // Walk outward to the next point higher than the peak, tracking
        // the valley minimum on each side.
        let mut left_min = height;
        for j in (0..i).rev() {
            if signal[j] > height {
                break;
            }
            left_min = left_min.min(signal[j]);
        }
        let mut right_min = height;
        for &v in &signal[i + 1..] {
            if v > height {
                break;
            }
            right_min = right_min.min(v);
        }

        let prominence = height - left_min.max(right_min);
        if prominence >= min_prominence {
            peaks.push(i);
        }
    }

    if min_distance <= 1 || peaks.len() < 2 {
        return peaks;
    }

    // Distance constraint: keep taller peaks first, drop any later peak
    // within min_distance of a kept one.
    let mut by_height = peaks.clone();
    by_height.sort_by(|&a, &b| {
        signal[b]
            .partial_cmp(&signal[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let mut kept: Vec<usize> = Vec::new();
    for p in by_height {
        if kept.iter().all(|&k| p.abs_diff(k) >= min_distance) {
            kept.push(p);
        }
    }
    kept.sort_unstable();
    kept
}
