//! Convergence diagnostics for multi-chain traces.

/// Linear-interpolated quantile of unsorted values, `q` in `[0, 1]`.
pub fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Split R-hat (Gelman-Rubin on half-chains).
///
/// Each chain is cut in two so that drift inside a single chain also shows
/// up as between-chain variance. Returns 1.0 when every draw is identical
/// and infinity when chains are individually constant but disagree.
pub fn split_r_hat(chains: &[Vec<f64>]) -> f64 {
    let halves: Vec<&[f64]> = chains
        .iter()
        .filter(|c| c.len() >= 4)
        .flat_map(|c| {
            let mid = c.len() / 2;
            [&c[..mid], &c[c.len() - mid..]]
        })
        .collect();

    if halves.len() < 2 {
        return f64::NAN;
    }

    let n = halves.iter().map(|h| h.len()).min().unwrap_or(0) as f64;
    let m = halves.len() as f64;

    let means: Vec<f64> = halves.iter().map(|h| h.iter().sum::<f64>() / h.len() as f64).collect();
    let grand = means.iter().sum::<f64>() / m;

    let between = n / (m - 1.0) * means.iter().map(|mu| (mu - grand).powi(2)).sum::<f64>();
    let within = halves
        .iter()
        .zip(&means)
        .map(|(h, mu)| h.iter().map(|x| (x - mu).powi(2)).sum::<f64>() / (h.len() - 1) as f64)
        .sum::<f64>()
        / m;

    if within <= 0.0 {
        return if between <= 0.0 { 1.0 } else { f64::INFINITY };
    }

    let pooled = (n - 1.0) / n * within + between / n;
    (pooled / within).sqrt()
}

/// Effective sample size of one chain, truncating the autocorrelation sum at
/// the first lag whose correlation drops below 0.05.
pub fn effective_sample_size(chain: &[f64]) -> f64 {
    let n = chain.len();
    if n < 2 {
        return n as f64;
    }

    let mean = chain.iter().sum::<f64>() / n as f64;
    let var = chain.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
    if var < 1e-12 {
        return n as f64;
    }

    let mut sum_rho = 0.0;
    for k in 1..=100.min(n / 2) {
        let rho = autocorrelation(chain, k, mean, var);
        if rho < 0.05 {
            break;
        }
        sum_rho += rho;
    }

    n as f64 / (1.0 + 2.0 * sum_rho)
}

fn autocorrelation(chain: &[f64], lag: usize, mean: f64, var: f64) -> f64 {
    let n = chain.len();
    if lag >= n {
        return 0.0;
    }
    let cov = (0..n - lag)
        .map(|i| (chain[i] - mean) * (chain[i + lag] - mean))
        .sum::<f64>()
        / (n - lag) as f64;
    cov / var
}

/// Most frequent value of an integer-valued draw set; ties go to the
/// smallest value.
pub(crate) fn mode(values: &[usize]) -> Option<usize> {
    let max = *values.iter().max()?;
    let mut counts = vec![0usize; max + 1];
    for &v in values {
        counts[v] += 1;
    }
    counts
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))
        .map(|(v, _)| v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_quantile() {
        let values = vec![4.0, 1.0, 3.0, 2.0, 5.0];
        assert_relative_eq!(quantile(&values, 0.0), 1.0);
        assert_relative_eq!(quantile(&values, 0.5), 3.0);
        assert_relative_eq!(quantile(&values, 1.0), 5.0);
        assert_relative_eq!(quantile(&values, 0.125), 1.5);
        assert!(quantile(&[], 0.5).is_nan());
    }

    #[test]
    fn test_r_hat_agreeing_chains() {
        let a: Vec<f64> = (0..200).map(|i| ((i * 37) % 11) as f64).collect();
        let b: Vec<f64> = (0..200).map(|i| ((i * 53) % 11) as f64).collect();
        let r = split_r_hat(&[a, b]);
        assert!(r < 1.1, "r_hat = {r}");
    }

    #[test]
    fn test_r_hat_disagreeing_chains() {
        let a: Vec<f64> = (0..200).map(|i| (i % 3) as f64).collect();
        let b: Vec<f64> = (0..200).map(|i| 100.0 + (i % 3) as f64).collect();
        assert!(split_r_hat(&[a, b]) > 2.0);
    }

    #[test]
    fn test_r_hat_constant_chains() {
        assert_relative_eq!(split_r_hat(&[vec![5.0; 10], vec![5.0; 10]]), 1.0);
        assert!(split_r_hat(&[vec![5.0; 10], vec![6.0; 10]]).is_infinite());
    }

    #[test]
    fn test_ess_bounds() {
        let independent: Vec<f64> = (0..500).map(|i| ((i * 7919) % 101) as f64).collect();
        let ess = effective_sample_size(&independent);
        assert!(ess > 250.0 && ess <= 500.0, "ess = {ess}");

        let sticky: Vec<f64> = (0..500).map(|i| (i / 50) as f64).collect();
        assert!(effective_sample_size(&sticky) < 100.0);
    }

    #[test]
    fn test_mode_prefers_smallest_on_tie() {
        assert_eq!(mode(&[3, 1, 3, 1, 2]), Some(1));
        assert_eq!(mode(&[7, 7, 2]), Some(7));
        assert_eq!(mode(&[]), None);
    }
}
