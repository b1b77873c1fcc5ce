const RANGE_SLACK: f64 = 1e-9;
const DEGENERATE_RATIO: f64 = 1e-14;
const NUM_POLISH_ITERATIONS: usize = 3;
const NUM_BISECTION_ITERATIONS: usize = 200;

pub fn cubic_hermit_real_root(
    dt: f64,
    f0: f64,
    f1: f64,
    df0: f64,
    df1: f64,
    target: f64,
) -> Option<f64> {
    if !(dt > 0.0) {
        return None;
    }

    let coefs = hermite_coefficients(dt, f0 - target, f1 - target, df0, df1);

    let candidate = real_roots(&coefs)
        .into_iter()
        .map(|s| polish(&coefs, s))
        .filter(|s| (-RANGE_SLACK..=1.0 + RANGE_SLACK).contains(s))
        .map(|s| s.clamp(0.0, 1.0))
        .min_by(f64::total_cmp);

    candidate
        .or_else(|| bisect(&coefs))
        .map(|s| s * dt)
}

pub fn cubic_hermit_real_peak(dt: f64, f0: f64, f1: f64, df0: f64, df1: f64) -> Option<f64> {
    if !(dt > 0.0) {
        return None;
    }

    let [c3, c2, c1, _] = hermite_coefficients(dt, f0, f1, df0, df1);

    quadratic_roots(3.0 * c3, 2.0 * c2, c1)
        .into_iter()
        .filter(|s| (-RANGE_SLACK..=1.0 + RANGE_SLACK).contains(s))
        .map(|s| s.clamp(0.0, 1.0))
        .min_by(f64::total_cmp)
        .map(|s| s * dt)
}

fn hermite_coefficients(dt: f64, f0: f64, f1: f64, df0: f64, df1: f64) -> [f64; 4] {
    let d0 = dt * df0;
    let d1 = dt * df1;
    [
        2.0 * f0 - 2.0 * f1 + d0 + d1,
        -3.0 * f0 + 3.0 * f1 - 2.0 * d0 - d1,
        d0,
        f0,
    ]
}

fn eval(coefs: &[f64; 4], s: f64) -> f64 {
    ((coefs[0] * s + coefs[1]) * s + coefs[2]) * s + coefs[3]
}

fn eval_derivative(coefs: &[f64; 4], s: f64) -> f64 {
    (3.0 * coefs[0] * s + 2.0 * coefs[1]) * s + coefs[2]
}

fn polish(coefs: &[f64; 4], mut s: f64) -> f64 {
    for _ in 0..NUM_POLISH_ITERATIONS {
        let slope = eval_derivative(coefs, s);
        if slope == 0.0 {
            break;
        }
        let next = s - eval(coefs, s) / slope;
        if !next.is_finite() {
            break;
        }
        s = next;
    }
    s
}

fn bisect(coefs: &[f64; 4]) -> Option<f64> {
    let mut lo = 0.0;
    let mut hi = 1.0;
    let mut f_lo = eval(coefs, lo);
    let f_hi = eval(coefs, hi);

    if f_lo == 0.0 {
        return Some(lo);
    }

    if f_lo * f_hi > 0.0 || !f_lo.is_finite() || !f_hi.is_finite() {
        return None;
    }

    for _ in 0..NUM_BISECTION_ITERATIONS {
        let mid = 0.5 * (lo + hi);
        if mid <= lo || mid >= hi {
            break;
        }
        let f_mid = eval(coefs, mid);
        if f_mid == 0.0 {
            return Some(mid);
        }
        if f_lo * f_mid < 0.0 {
            hi = mid;
        } else {
            lo = mid;
            f_lo = f_mid;
        }
    }

    Some(0.5 * (lo + hi))
}

fn real_roots(coefs: &[f64; 4]) -> Vec<f64> {
    let [c3, c2, c1, c0] = *coefs;
    let scale = c2.abs().max(c1.abs()).max(c0.abs());

    if c3.abs() <= DEGENERATE_RATIO * scale || c3 == 0.0 {
        return quadratic_roots(c2, c1, c0);
    }

    let b = c2 / c3;
    let c = c1 / c3;
    let d = c0 / c3;
    let shift = b / 3.0;
    let p = c - b * b / 3.0;
    let q = 2.0 * b * b * b / 27.0 - b * c / 3.0 + d;
    let discriminant = q * q / 4.0 + p * p * p / 27.0;

    if discriminant > 0.0 {
        let sq = discriminant.sqrt();
        // pick the cube root argument without cancellation
        let u = if q > 0.0 {
            (-0.5 * q - sq).cbrt()
        } else {
            (-0.5 * q + sq).cbrt()
        };
        let v = if u != 0.0 { -p / (3.0 * u) } else { 0.0 };
        vec![u + v - shift]
    } else if p == 0.0 {
        vec![-shift]
    } else {
        let r = (-p / 3.0).sqrt();
        let cos_arg = ((3.0 * q / (2.0 * p)) * (-3.0 / p).sqrt()).clamp(-1.0, 1.0);
        let phi = cos_arg.acos() / 3.0;
        (0..3)
            .map(|k| {
                2.0 * r * (phi - 2.0 * std::f64::consts::PI * k as f64 / 3.0).cos() - shift
            })
            .collect()
    }
}

fn quadratic_roots(a: f64, b: f64, c: f64) -> Vec<f64> {
    let scale = b.abs().max(c.abs());

    if a.abs() <= DEGENERATE_RATIO * scale || a == 0.0 {
        return if b != 0.0 { vec![-c / b] } else { Vec::new() };
    }

    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return Vec::new();
    }

    let q = -0.5 * (b + b.signum() * discriminant.sqrt());
    if q == 0.0 {
        return vec![0.0];
    }

    vec![q / a, c / q]
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    fn hermite_data(f: impl Fn(f64) -> f64, df: impl Fn(f64) -> f64, dt: f64) -> [f64; 4] {
        [f(0.0), f(dt), df(0.0), df(dt)]
    }

    #[test]
    fn known_root_of_cubic() {
        let f = |t: f64| (t - 0.7) * (t + 1.5) * (t - 3.2) + 1.0;
        let df = |t: f64| {
            (t + 1.5) * (t - 3.2) + (t - 0.7) * (t - 3.2) + (t - 0.7) * (t + 1.5)
        };
        let dt = 2.0;
        let [f0, f1, df0, df1] = hermite_data(f, df, dt);

        let root = cubic_hermit_real_root(dt, f0, f1, df0, df1, 1.0).unwrap();
        assert!((root - 0.7).abs() < 1e-10);
    }

    #[test]
    fn lowest_of_several_roots() {
        let f = |t: f64| (t - 0.3) * (t - 0.6) * (t - 1.5);
        let df = |t: f64| (t - 0.6) * (t - 1.5) + (t - 0.3) * (t - 1.5) + (t - 0.3) * (t - 0.6);
        let dt = 2.0;
        let [f0, f1, df0, df1] = hermite_data(f, df, dt);

        let root = cubic_hermit_real_root(dt, f0, f1, df0, df1, 0.0).unwrap();
        assert!((root - 0.3).abs() < 1e-10);
    }

    #[test]
    fn linear_data() {
        let root = cubic_hermit_real_root(0.5, 0.0, 2.0, 4.0, 4.0, 1.0).unwrap();
        assert_approx_eq!(f64, root, 0.25, epsilon = 1e-14);
    }

    #[test]
    fn quadratic_data() {
        // f(t) = t^2 on [0, 2]
        let root = cubic_hermit_real_root(2.0, 0.0, 4.0, 0.0, 4.0, 2.0).unwrap();
        assert_approx_eq!(f64, root, 2.0f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn root_at_interval_end() {
        let root = cubic_hermit_real_root(1.0, 0.0, 1.0, 1.0, 1.0, 1.0).unwrap();
        assert_approx_eq!(f64, root, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn no_root_in_range() {
        assert_eq!(cubic_hermit_real_root(1.0, 0.0, 0.5, 0.5, 0.5, 1.0), None);
        assert_eq!(cubic_hermit_real_root(0.0, 0.0, 0.5, 0.5, 0.5, 1.0), None);
    }

    #[test]
    fn known_peak() {
        // f'(t) = -(t - 0.8)(t + 2)
        let f = |t: f64| -(t * t * t / 3.0 + 0.6 * t * t - 1.6 * t);
        let df = |t: f64| -(t - 0.8) * (t + 2.0);
        let dt = 1.5;
        let [f0, f1, df0, df1] = hermite_data(f, df, dt);

        let peak = cubic_hermit_real_peak(dt, f0, f1, df0, df1).unwrap();
        assert!((peak - 0.8).abs() < 1e-10);
    }

    #[test]
    fn monotone_data_has_no_peak() {
        assert_eq!(cubic_hermit_real_peak(1.0, 0.0, 1.0, 1.0, 1.0), None);
    }
}
