//! Two-sample statistical tests used for differential-expression ranking.
//!
//! Provides the Mann-Whitney U (rank-sum) test with a normal approximation
//! and Welch's t-test with an incomplete-beta p-value, plus the special
//! functions they need. Both return two-sided p-values.

use std::f64::consts::PI;

use crate::error::{Error, Result};

/// Outcome of a two-sample test.
#[derive(Debug, Clone, Copy)]
pub struct TestOutcome {
    /// The test statistic (U or t).
    pub statistic: f64,
    /// Two-sided p-value.
    pub p_value: f64,
}

// ── Ranking ────────────────────────────────────────────────────────────────

/// Assign average-tie ranks (1-based) to `data`.
///
/// Tied values receive the mean of the ranks they would occupy, the
/// convention the rank-sum test requires. Empty input produces empty output.
pub fn rank_average(data: &[f64]) -> Vec<f64> {
    let n = data.len();
    if n == 0 {
        return Vec::new();
    }

    let mut indexed: Vec<(f64, usize)> =
        data.iter().copied().enumerate().map(|(i, v)| (v, i)).collect();
    indexed.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i + 1;
        while j < n && indexed[j].0.total_cmp(&indexed[i].0).is_eq() {
            j += 1;
        }
        // Ranks in the tie group are (i+1)..=j; all members get the mean.
        let rank_val = (i + 1 + j) as f64 / 2.0;
        for k in i..j {
            ranks[indexed[k].1] = rank_val;
        }
        i = j;
    }

    ranks
}

// ── Mann-Whitney U ─────────────────────────────────────────────────────────

/// Mann-Whitney U test (Wilcoxon rank-sum) with a tie-corrected normal
/// approximation.
///
/// Both groups must be non-empty; otherwise [`Error::InvalidArgument`].
pub fn mann_whitney_u(x: &[f64], y: &[f64]) -> Result<TestOutcome> {
    if x.is_empty() || y.is_empty() {
        return Err(Error::InvalidArgument(
            "mann_whitney_u: each group must be non-empty".to_string(),
        ));
    }
    let nx = x.len();
    let ny = y.len();
    let n = nx + ny;

    let mut combined: Vec<f64> = Vec::with_capacity(n);
    combined.extend_from_slice(x);
    combined.extend_from_slice(y);
    let ranks = rank_average(&combined);

    let r1: f64 = ranks[..nx].iter().sum();
    let u1 = r1 - (nx * (nx + 1)) as f64 / 2.0;
    let u2 = (nx * ny) as f64 - u1;
    let u = u1.min(u2);

    let mu_u = (nx * ny) as f64 / 2.0;

    // Tie-corrected variance: sigma^2 = n1*n2/12 * (n+1 - T/(n(n-1)))
    // with T = sum over tie groups of t^3 - t. Expression columns are
    // mostly zeros, so ties dominate and the uncorrected variance would
    // systematically inflate p-values.
    let mut sorted = combined;
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mut tie_term = 0.0;
    let mut i = 0;
    while i < n {
        let mut j = i + 1;
        while j < n && sorted[j].total_cmp(&sorted[i]).is_eq() {
            j += 1;
        }
        let t = (j - i) as f64;
        tie_term += t * t * t - t;
        i = j;
    }
    let n_f = n as f64;
    let variance =
        (nx * ny) as f64 / 12.0 * (n_f + 1.0 - tie_term / (n_f * (n_f - 1.0)));
    let sigma_u = variance.max(0.0).sqrt();

    let p_value = if sigma_u > 0.0 {
        // u <= mu_u by construction, so z <= 0 and the two-sided p is
        // 2 * Phi(z).
        let z = (u - mu_u) / sigma_u;
        (2.0 * normal_cdf(z)).min(1.0)
    } else {
        1.0
    };

    Ok(TestOutcome {
        statistic: u,
        p_value,
    })
}

// ── Welch's t-test ─────────────────────────────────────────────────────────

/// Welch's two-sample t-test (unequal variances).
///
/// Each group needs at least 2 observations; otherwise
/// [`Error::InvalidArgument`]. When both groups have zero variance the
/// p-value is 1 for equal means and 0 for different ones (perfect
/// separation).
pub fn welch_t_test(x: &[f64], y: &[f64]) -> Result<TestOutcome> {
    if x.len() < 2 || y.len() < 2 {
        return Err(Error::InvalidArgument(
            "welch_t_test: each group needs at least 2 observations".to_string(),
        ));
    }

    let nx = x.len() as f64;
    let ny = y.len() as f64;
    let mean_x = x.iter().sum::<f64>() / nx;
    let mean_y = y.iter().sum::<f64>() / ny;
    let var_x = x.iter().map(|&v| (v - mean_x).powi(2)).sum::<f64>() / (nx - 1.0);
    let var_y = y.iter().map(|&v| (v - mean_y).powi(2)).sum::<f64>() / (ny - 1.0);

    let vn_x = var_x / nx;
    let vn_y = var_y / ny;
    let se = (vn_x + vn_y).sqrt();
    if se == 0.0 {
        // Both groups are constant. Equal means carry no signal; different
        // means are perfect separation, the limit of t -> +/-inf.
        return Ok(if mean_x == mean_y {
            TestOutcome {
                statistic: 0.0,
                p_value: 1.0,
            }
        } else {
            TestOutcome {
                statistic: (mean_x - mean_y).signum() * f64::INFINITY,
                p_value: 0.0,
            }
        });
    }

    let t = (mean_x - mean_y) / se;
    // Welch-Satterthwaite degrees of freedom.
    let df = (vn_x + vn_y).powi(2)
        / (vn_x.powi(2) / (nx - 1.0) + vn_y.powi(2) / (ny - 1.0));

    let p_value = t_two_tailed_p(t, df);

    Ok(TestOutcome {
        statistic: t,
        p_value,
    })
}

/// Two-tailed p-value for the t-distribution.
fn t_two_tailed_p(t: f64, df: f64) -> f64 {
    let x = df / (df + t * t);
    betai(df / 2.0, 0.5, x).unwrap_or(1.0)
}

// ── Special functions ──────────────────────────────────────────────────────

/// Error function via the Abramowitz-Stegun rational approximation
/// (max error ~1.5e-7).
pub fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + 0.3275911 * x);
    let poly = t
        * (0.254829592
            + t * (-0.284496736 + t * (1.421413741 + t * (-1.453152027 + t * 1.061405429))));
    sign * (1.0 - poly * (-x * x).exp())
}

/// Standard normal CDF.
pub fn normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))
}

/// Natural log of the gamma function via the Lanczos approximation (g=7).
pub fn ln_gamma(x: f64) -> f64 {
    const COEFFS: [f64; 8] = [
        676.5203681218851,
        -1259.1392167224028,
        771.32342877765313,
        -176.61502916214059,
        12.507343278686905,
        -0.13857109526572012,
        9.9843695780195716e-6,
        1.5056327351493116e-7,
    ];

    if x < 0.5 {
        // Reflection formula: Γ(x) = π / (sin(πx) · Γ(1-x))
        let log_pi_over_sin = (PI / (PI * x).sin()).ln();
        log_pi_over_sin - ln_gamma(1.0 - x)
    } else {
        let x = x - 1.0;
        let mut ag = 0.99999999999980993_f64;
        for (i, &c) in COEFFS.iter().enumerate() {
            ag += c / (x + i as f64 + 1.0);
        }
        let t = x + 7.5; // g + 0.5
        0.5 * (2.0 * PI).ln() + (x + 0.5) * t.ln() - t + ag.ln()
    }
}

/// Regularized incomplete beta function I_x(a, b) via continued fraction
/// (modified Lentz's method, max 200 iterations).
pub fn betai(a: f64, b: f64, x: f64) -> Result<f64> {
    if !(0.0..=1.0).contains(&x) {
        return Err(Error::InvalidArgument(
            "betai: x must be in [0, 1]".to_string(),
        ));
    }
    if x == 0.0 || x == 1.0 {
        return Ok(x);
    }

    // Symmetry relation for numerical stability.
    if x > (a + 1.0) / (a + b + 2.0) {
        return Ok(1.0 - betai(b, a, 1.0 - x)?);
    }

    let ln_prefactor =
        ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let prefactor = ln_prefactor.exp();

    let tiny = 1e-30_f64;
    let eps = 1e-10_f64;
    let max_iter = 200;

    let mut c = 1.0_f64;
    let mut d = (1.0 - (a + b) * x / (a + 1.0)).recip();
    if d.abs() < tiny {
        d = tiny;
    }
    let mut h = d;

    for m in 1..=max_iter {
        let m_f64 = m as f64;

        // Even step: d_{2m}
        let num_even = m_f64 * (b - m_f64) * x / ((a + 2.0 * m_f64 - 1.0) * (a + 2.0 * m_f64));
        d = 1.0 + num_even * d;
        if d.abs() < tiny {
            d = tiny;
        }
        d = d.recip();
        c = 1.0 + num_even / c;
        if c.abs() < tiny {
            c = tiny;
        }
        h *= d * c;

        // Odd step: d_{2m+1}
        let num_odd = -((a + m_f64) * (a + b + m_f64) * x)
            / ((a + 2.0 * m_f64) * (a + 2.0 * m_f64 + 1.0));
        d = 1.0 + num_odd * d;
        if d.abs() < tiny {
            d = tiny;
        }
        d = d.recip();
        c = 1.0 + num_odd / c;
        if c.abs() < tiny {
            c = tiny;
        }
        let delta = d * c;
        h *= delta;

        if (delta - 1.0).abs() < eps {
            return Ok(prefactor * h / a);
        }
    }

    Ok(prefactor * h / a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_average_no_ties() {
        assert_eq!(rank_average(&[3.0, 1.0, 2.0]), vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn rank_average_with_ties() {
        // sorted: 1(1), 2(2), 2(3), 3(4) -> ties at 2 get (2+3)/2 = 2.5
        assert_eq!(
            rank_average(&[3.0, 1.0, 2.0, 2.0]),
            vec![4.0, 1.0, 2.5, 2.5]
        );
    }

    #[test]
    fn rank_average_all_equal() {
        assert_eq!(rank_average(&[5.0, 5.0, 5.0]), vec![2.0, 2.0, 2.0]);
    }

    #[test]
    fn mwu_identical_groups_p_one() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let out = mann_whitney_u(&x, &x).unwrap();
        assert!((out.p_value - 1.0).abs() < 1e-9, "p={}", out.p_value);
    }

    #[test]
    fn mwu_separated_groups_small_p() {
        let x = [10.0, 11.0, 12.0, 13.0, 14.0];
        let y = [1.0, 2.0, 3.0, 4.0, 5.0];
        let out = mann_whitney_u(&x, &y).unwrap();
        assert_eq!(out.statistic, 0.0);
        assert!(out.p_value < 0.05, "p={}", out.p_value);
    }

    #[test]
    fn mwu_empty_group_rejected() {
        assert!(matches!(
            mann_whitney_u(&[], &[1.0]),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn welch_separated_groups_small_p() {
        let x = [10.0, 11.0, 12.0, 13.0];
        let y = [1.0, 2.0, 3.0, 4.0];
        let out = welch_t_test(&x, &y).unwrap();
        assert!(out.statistic > 0.0);
        assert!(out.p_value < 0.01, "p={}", out.p_value);
    }

    #[test]
    fn mwu_tie_correction_matches_reference() {
        // x=[1,2,3,4] vs y=[2,3,4,5]: three tie pairs, T = 18.
        // u = 4.5, mu = 8, sigma = sqrt(16/12 * (9 - 18/56)) = 3.4017,
        // two-sided p = 0.3035 (no continuity correction).
        let out = mann_whitney_u(&[1.0, 2.0, 3.0, 4.0], &[2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!(out.statistic, 4.5);
        assert!((out.p_value - 0.3035).abs() < 1e-3, "p={}", out.p_value);
    }

    #[test]
    fn welch_constant_groups_p_one() {
        let out = welch_t_test(&[2.0, 2.0, 2.0], &[2.0, 2.0]).unwrap();
        assert_eq!(out.p_value, 1.0);
    }

    #[test]
    fn welch_constant_separated_groups_p_zero() {
        // Zero variance in both groups but different means: perfect
        // separation, not an uninformative test.
        let out = welch_t_test(&[5.0, 5.0, 5.0], &[1.0, 1.0, 1.0]).unwrap();
        assert_eq!(out.statistic, f64::INFINITY);
        assert_eq!(out.p_value, 0.0);

        let out = welch_t_test(&[1.0, 1.0], &[5.0, 5.0]).unwrap();
        assert_eq!(out.statistic, f64::NEG_INFINITY);
        assert_eq!(out.p_value, 0.0);
    }

    #[test]
    fn welch_tiny_group_rejected() {
        assert!(matches!(
            welch_t_test(&[1.0], &[1.0, 2.0]),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn normal_cdf_reference_values() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 1e-7);
        assert!((normal_cdf(1.96) - 0.975).abs() < 1e-3);
        assert!((normal_cdf(-1.96) - 0.025).abs() < 1e-3);
    }

    #[test]
    fn ln_gamma_factorials() {
        // Γ(n) = (n-1)!
        assert!((ln_gamma(5.0) - 24.0f64.ln()).abs() < 1e-9);
        assert!((ln_gamma(1.0)).abs() < 1e-9);
    }

    #[test]
    fn betai_bounds() {
        assert_eq!(betai(2.0, 3.0, 0.0).unwrap(), 0.0);
        assert_eq!(betai(2.0, 3.0, 1.0).unwrap(), 1.0);
        // I_0.5(a, a) = 0.5 by symmetry.
        assert!((betai(4.0, 4.0, 0.5).unwrap() - 0.5).abs() < 1e-8);
    }

    #[test]
    fn t_p_value_matches_known_case() {
        // t=2.0 with df=10 gives a two-sided p around 0.0734.
        let p = t_two_tailed_p(2.0, 10.0);
        assert!((p - 0.0734).abs() < 5e-3, "p={p}");
    }
}
