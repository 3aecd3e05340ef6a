use std::cmp::Ordering;

/// Local maxima of `data`.
///
/// Flat-topped peaks resolve to the middle sample of the plateau. Peaks
/// lower than `height` are dropped, and when `distance` is larger than one
/// sample, higher peaks suppress lower neighbours closer than `distance`.
/// The result is sorted by index.
pub fn find_peaks(data: &[f64], height: Option<f64>, distance: usize) -> Vec<usize> {
    let mut peaks = local_maxima(data);
    if let Some(min) = height {
        peaks.retain(|&i| data[i] >= min);
    }
    if distance > 1 && peaks.len() > 1 {
        peaks = enforce_distance(data, &peaks, distance);
    }
    peaks
}

fn local_maxima(data: &[f64]) -> Vec<usize> {
    let mut out = Vec::new();
    if data.len() < 3 {
        return out;
    }
    let last = data.len() - 1;
    let mut i = 1;
    while i < last {
        if data[i - 1] < data[i] {
            let mut ahead = i + 1;
            while ahead < last && data[ahead] == data[i] {
                ahead += 1;
            }
            if data[ahead] < data[i] {
                out.push((i + ahead - 1) / 2);
                i = ahead;
                continue;
            }
        }
        i += 1;
    }
    out
}

fn enforce_distance(data: &[f64], peaks: &[usize], distance: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..peaks.len()).collect();
    order.sort_by(|&a, &b| {
        data[peaks[b]]
            .partial_cmp(&data[peaks[a]])
            .unwrap_or(Ordering::Equal)
            .then(peaks[b].cmp(&peaks[a]))
    });
    let mut keep = vec![true; peaks.len()];
    for &pos in &order {
        if !keep[pos] {
            continue;
        }
        let centre = peaks[pos];
        let mut left = pos;
        while left > 0 && centre - peaks[left - 1] < distance {
            left -= 1;
            keep[left] = false;
        }
        let mut right = pos + 1;
        while right < peaks.len() && peaks[right] - centre < distance {
            keep[right] = false;
            right += 1;
        }
    }
    peaks
        .iter()
        .zip(keep)
        .filter_map(|(&p, k)| k.then_some(p))
        .collect()
}
