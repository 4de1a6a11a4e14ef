//! Pruned exact linear time search for penalised segmentation.

use analysis_core::{CancelFlag, DetectionError, Result};

use crate::cost::CostModel;

/// Optimal partition minimising `sum(cost) + penalty * breakpoints`.
///
/// A start `s` is dominated at `end` once `best[s] + cost(s, end)` exceeds
/// `best[end]`. Every later end that can split at `end` then prefers `end`
/// over `s`, but ends closer than `min_size` cannot, so `s` stays a
/// candidate until `end + min_size`. Returns boundaries ending with `n`.
pub fn pelt(
    cost: &dyn CostModel,
    n: usize,
    penalty: f64,
    min_size: usize,
    jump: usize,
    cancel: &CancelFlag,
) -> Result<Vec<usize>> {
    if n < min_size {
        return Err(DetectionError::InvalidInput(format!(
            "series of length {} is shorter than min_size {}",
            n, min_size
        )));
    }

    // best[t] = (optimal penalised cost of 0..t, last boundary before t)
    let mut best: Vec<Option<(f64, usize)>> = vec![None; n + 1];
    best[0] = Some((0.0, 0));
    let mut admissible: Vec<Candidate> = Vec::new();

    let ends = (0..n)
        .step_by(jump)
        .filter(|&end| end >= min_size)
        .chain(std::iter::once(n));

    for end in ends {
        cancel.check()?;

        let newest = (end - min_size) / jump * jump;
        if admissible.last().map(|c| c.start) != Some(newest) {
            admissible.push(Candidate {
                start: newest,
                dominated_at: None,
            });
        }
        admissible.retain(|c| match c.dominated_at {
            Some(at) => end < at + min_size,
            None => best[c.start].is_some(),
        });

        let scored: Vec<(usize, f64)> = admissible
            .iter()
            .enumerate()
            .filter_map(|(i, c)| {
                best[c.start].map(|(total, _)| (i, total + cost.error(c.start, end) + penalty))
            })
            .collect();

        let Some((arg, min)) = scored.iter().fold(None::<(usize, f64)>, |acc, &(i, v)| match acc {
            Some((_, m)) if m <= v => acc,
            _ => Some((i, v)),
        }) else {
            continue;
        };

        best[end] = Some((min, admissible[arg].start));
        for &(i, v) in &scored {
            let candidate = &mut admissible[i];
            if candidate.dominated_at.is_none() && v > min + penalty {
                candidate.dominated_at = Some(end);
            }
        }
    }

    let mut boundaries = Vec::new();
    let mut t = n;
    while t > 0 {
        boundaries.push(t);
        t = match best[t] {
            Some((_, prev)) => prev,
            None => {
                return Err(DetectionError::NumericInstability(format!(
                    "no admissible partition reaches position {}",
                    t
                )))
            }
        };
    }
    boundaries.reverse();
    Ok(boundaries)
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    start: usize,
    /// First end at which the start lost to `best[end]` by more than the penalty
    dominated_at: Option<usize>,
}
