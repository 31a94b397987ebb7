use rustfft::num_complex::Complex64;

const MAX_ROOT_ITERATIONS: usize = 500;
const ROOT_TOLERANCE: f64 = 1e-12;

/// Burg linear-prediction coefficients `a` with `x[n] ~ sum_k a[k] * x[n - 1 - k]`.
///
/// Returns `None` for frames too short or without energy.
pub(crate) fn burg(frame: &[f64], order: usize) -> Option<Vec<f64>> {
    let n = frame.len();
    if order == 0 || n <= order {
        return None;
    }
    if frame.iter().map(|v| v * v).sum::<f64>() <= 0.0 {
        return None;
    }
    let mut coeffs = vec![0.0; order];
    let mut previous = vec![0.0; order];
    let mut forward: Vec<f64> = frame[1..].to_vec();
    let mut backward: Vec<f64> = frame[..n - 1].to_vec();
    for k in 0..order {
        let (mut num, mut denom) = (0.0, 0.0);
        for (f, b) in forward[..n - 1 - k].iter().zip(&backward[..n - 1 - k]) {
            num += f * b;
            denom += f * f + b * b;
        }
        if denom <= 0.0 {
            return None;
        }
        let reflection = 2.0 * num / denom;
        coeffs[k] = reflection;
        for i in 0..k {
            coeffs[i] = previous[i] - reflection * previous[k - 1 - i];
        }
        previous[..=k].copy_from_slice(&coeffs[..=k]);
        if k + 1 == order {
            break;
        }
        for i in 0..n - 2 - k {
            backward[i] -= reflection * forward[i];
            forward[i] = forward[i + 1] - reflection * backward[i + 1];
        }
    }
    Some(coeffs)
}

/// Roots of the prediction polynomial `z^p - a[0] z^(p-1) - ... - a[p-1]`, reflected
/// into the unit circle.
pub(crate) fn prediction_roots(coeffs: &[f64]) -> Vec<Complex64> {
    let mut poly: Vec<Complex64> = Vec::with_capacity(coeffs.len() + 1);
    poly.push(Complex64::new(1.0, 0.0));
    poly.extend(coeffs.iter().map(|&a| Complex64::new(-a, 0.0)));
    durand_kerner(&poly)
        .into_iter()
        .map(|root| {
            let norm = root.norm();
            if norm > 1.0 { 1.0 / root.conj() } else { root }
        })
        .collect()
}

/// All roots of a monic polynomial given highest degree first.
fn durand_kerner(poly: &[Complex64]) -> Vec<Complex64> {
    let degree = poly.len().saturating_sub(1);
    if degree == 0 {
        return Vec::new();
    }
    let seed = Complex64::new(0.4, 0.9);
    let mut roots: Vec<Complex64> = (0..degree).map(|k| seed.powu(k as u32)).collect();
    for _ in 0..MAX_ROOT_ITERATIONS {
        let mut change: f64 = 0.0;
        for i in 0..degree {
            let value = evaluate(poly, roots[i]);
            let mut denom = Complex64::new(1.0, 0.0);
            for (j, other) in roots.iter().enumerate() {
                if j != i {
                    denom *= roots[i] - other;
                }
            }
            if denom.norm() < 1e-300 {
                continue;
            }
            let delta = value / denom;
            roots[i] -= delta;
            change = change.max(delta.norm());
        }
        if change < ROOT_TOLERANCE {
            break;
        }
    }
    roots
}

fn evaluate(poly: &[Complex64], z: Complex64) -> Complex64 {
    poly.iter()
        .fold(Complex64::new(0.0, 0.0), |acc, &coeff| acc * z + coeff)
}
