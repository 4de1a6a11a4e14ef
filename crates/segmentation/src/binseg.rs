//! Binary segmentation: greedy count-constrained search.

use analysis_core::{CancelFlag, DetectionError, Result};
use tracing::debug;

use crate::cost::CostModel;

/// Best admissible split of one segment
#[derive(Debug, Clone, Copy)]
struct Split {
    gain: f64,
    at: usize,
}

/// Place exactly `n_bkps` breakpoints by repeatedly taking the split with the
/// largest cost reduction across all current segments.
///
/// Candidates are multiples of `jump` leaving both sides at least `min_size`
/// long. Gains tie towards the smaller index. Returns boundaries ending
/// with `n`.
pub fn binary_segmentation(
    cost: &dyn CostModel,
    n: usize,
    n_bkps: usize,
    min_size: usize,
    jump: usize,
    cancel: &CancelFlag,
) -> Result<Vec<usize>> {
    let mut segments: Vec<((usize, usize), Option<Split>)> =
        vec![((0, n), best_split(cost, 0, n, min_size, jump))];
    let mut boundaries = vec![n];

    for placed in 0..n_bkps {
        cancel.check()?;

        let chosen = segments
            .iter()
            .enumerate()
            .filter_map(|(i, (_, split))| split.map(|s| (i, s)))
            .fold(None::<(usize, Split)>, |best, (i, s)| match best {
                Some((_, b)) if b.gain > s.gain || (b.gain == s.gain && b.at < s.at) => best,
                _ => Some((i, s)),
            });

        let Some((idx, split)) = chosen else {
            return Err(DetectionError::InvalidInput(format!(
                "only {} admissible breakpoints for {} requested (n={}, min_size={}, jump={})",
                placed, n_bkps, n, min_size, jump
            )));
        };

        let ((start, end), _) = segments.swap_remove(idx);
        debug!("binseg split {}..{} at {} (gain {:.4})", start, end, split.at, split.gain);

        segments.push(((start, split.at), best_split(cost, start, split.at, min_size, jump)));
        segments.push(((split.at, end), best_split(cost, split.at, end, min_size, jump)));
        boundaries.push(split.at);
    }

    boundaries.sort_unstable();
    Ok(boundaries)
}

fn best_split(
    cost: &dyn CostModel,
    start: usize,
    end: usize,
    min_size: usize,
    jump: usize,
) -> Option<Split> {
    let whole = cost.error(start, end);
    let first = (start + min_size).div_ceil(jump) * jump;

    let mut best: Option<Split> = None;
    let mut at = first;
    while at + min_size <= end {
        let gain = whole - cost.error(start, at) - cost.error(at, end);
        if best.map_or(true, |b| gain > b.gain) {
            best = Some(Split { gain, at });
        }
        at += jump;
    }
    best
}
