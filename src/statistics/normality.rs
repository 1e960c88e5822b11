//! Shapiro-Wilk W test, Royston's approximation (AS R94).
//!
//! Coefficients are approximated from normal order statistics and the
//! p-value from Royston's normalising transform of `ln(1 - W)`.

use statrs::distribution::{ContinuousCDF, Normal};

use crate::error::{AnalysisError, AnalysisResult};
use crate::signal::sorted_copy;

const C1: [f64; 6] = [0.0, 0.221157, -0.147981, -2.07119, 4.434685, -2.706056];
const C2: [f64; 6] = [0.0, 0.042981, -0.293762, -1.752461, 5.682633, -3.582633];
const C3: [f64; 4] = [0.544, -0.39978, 0.025054, -6.714e-4];
const C4: [f64; 4] = [1.3822, -0.77857, 0.062767, -0.0020322];
const C5: [f64; 4] = [-1.5861, -0.31082, -0.083751, 0.0038915];
const C6: [f64; 3] = [-0.4803, -0.082676, 0.0030302];
const G: [f64; 2] = [-2.273, 0.459];

/// Below this range the sample is treated as constant.
const MIN_RANGE: f64 = 1e-19;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapiroWilk {
    pub w: f64,
    pub p_value: f64,
}

/// `c[0] + c[1]·x + c[2]·x² + …`
fn poly(c: &[f64], x: f64) -> f64 {
    c.iter().rev().fold(0.0, |acc, &ci| acc * x + ci)
}

/// Test `data` for normality.
///
/// `None` when the statistic is undefined: fewer than three values, or a
/// constant sample.
pub fn shapiro_wilk(data: &[f64]) -> AnalysisResult<Option<ShapiroWilk>> {
    let n = data.len();
    if n < 3 {
        return Ok(None);
    }
    if data.iter().any(|v| !v.is_finite()) {
        return Err(AnalysisError::computation("normality test on non-finite data"));
    }

    let x = sorted_copy(data);
    if x[n - 1] - x[0] < MIN_RANGE {
        return Ok(None);
    }

    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| AnalysisError::computation(format!("standard normal: {e}")))?;

    let a = coefficients(n, &normal);

    let mean = x.iter().sum::<f64>() / n as f64;
    let ssq: f64 = x.iter().map(|v| (v - mean).powi(2)).sum();
    let num: f64 = a.iter().zip(&x).map(|(ai, xi)| ai * xi).sum();
    let w = (num * num / ssq).min(1.0);

    Ok(Some(ShapiroWilk {
        w,
        p_value: p_value(w, n, &normal),
    }))
}

/// Antisymmetric weights `a`, ascending with the sorted sample.
fn coefficients(n: usize, normal: &Normal) -> Vec<f64> {
    let mut a = vec![0.0; n];
    if n == 3 {
        a[0] = -std::f64::consts::FRAC_1_SQRT_2;
        a[2] = std::f64::consts::FRAC_1_SQRT_2;
        return a;
    }

    let nf = n as f64;
    let m: Vec<f64> = (1..=n)
        .map(|i| normal.inverse_cdf((i as f64 - 0.375) / (nf + 0.25)))
        .collect();
    let summ2: f64 = m.iter().map(|v| v * v).sum();
    let ssumm2 = summ2.sqrt();
    let rsn = 1.0 / nf.sqrt();

    let a_n = m[n - 1] / ssumm2 + poly(&C1, rsn);
    a[n - 1] = a_n;
    a[0] = -a_n;

    let (fac, inner) = if n > 5 {
        let a_n1 = m[n - 2] / ssumm2 + poly(&C2, rsn);
        a[n - 2] = a_n1;
        a[1] = -a_n1;
        let fac = ((summ2 - 2.0 * m[n - 1].powi(2) - 2.0 * m[n - 2].powi(2))
            / (1.0 - 2.0 * a_n.powi(2) - 2.0 * a_n1.powi(2)))
        .sqrt();
        (fac, 2..n - 2)
    } else {
        let fac = ((summ2 - 2.0 * m[n - 1].powi(2)) / (1.0 - 2.0 * a_n.powi(2))).sqrt();
        (fac, 1..n - 1)
    };
    for i in inner {
        a[i] = m[i] / fac;
    }
    a
}

fn p_value(w: f64, n: usize, normal: &Normal) -> f64 {
    let nf = n as f64;
    let p = if n == 3 {
        let p = 6.0 / std::f64::consts::PI
            * (w.sqrt().asin() - std::f64::consts::FRAC_PI_3);
        p.max(0.0)
    } else if n <= 11 {
        let gamma = poly(&G, nf);
        let y = (1.0 - w).ln();
        if y >= gamma {
            return 1e-99;
        }
        let y = -(gamma - y).ln();
        let m = poly(&C3, nf);
        let s = poly(&C4, nf).exp();
        normal.sf((y - m) / s)
    } else {
        let xx = nf.ln();
        let m = poly(&C5, xx);
        let s = poly(&C6, xx).exp();
        normal.sf(((1.0 - w).ln() - m) / s)
    };
    p.clamp(0.0, 1.0)
}
