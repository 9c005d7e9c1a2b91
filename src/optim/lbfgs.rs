//! Box-constrained L-BFGS with projected steps.
//!
//! Gradients are estimated with central finite differences clipped to the
//! box, so the objective only needs to be evaluable pointwise. Non-finite
//! objective values are treated as `+inf`.

/// Settings for [`minimize_bounded`].
#[derive(Clone, Debug)]
pub struct LbfgsOptions {
    /// Number of correction pairs kept.
    pub memory: usize,
    /// Maximum number of iterations.
    pub max_iter: usize,
    /// Tolerance on the projected gradient and on relative function decrease.
    pub tol: f64,
    /// Relative finite-difference step.
    pub fd_step: f64,
}

impl Default for LbfgsOptions {
    fn default() -> Self {
        Self {
            memory: 10,
            max_iter: 100,
            tol: 1e-7,
            fd_step: 1e-6,
        }
    }
}

/// Result of a local minimization.
#[derive(Clone, Debug)]
pub struct LocalMinimum {
    pub x: Vec<f64>,
    pub fval: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Maximum number of step halvings in the line search.
const MAX_BACKTRACKS: usize = 30;
/// Armijo sufficient-decrease constant.
const ARMIJO_C1: f64 = 1e-4;
/// A correction pair is kept only if `s·y > CURVATURE_EPS * y·y`.
const CURVATURE_EPS: f64 = 1e-10;
/// Consecutive rejected pairs after which the history is dropped.
const MAX_REJECTED_PAIRS: usize = 2;
/// Consecutive small decreases needed to declare convergence.
const STALL_ITERATIONS: usize = 2;

/// Minimize `f` inside `bounds` starting from `x0`.
pub fn minimize_bounded<F>(f: F, x0: &[f64], bounds: &[(f64, f64)], options: &LbfgsOptions) -> LocalMinimum
where
    F: Fn(&[f64]) -> f64,
{
    let eval = |x: &[f64]| {
        let v = f(x);
        if v.is_finite() { v } else { f64::INFINITY }
    };

    let n = x0.len();
    let mut x = project(x0, bounds);
    let mut fx = eval(&x);
    if !fx.is_finite() {
        return LocalMinimum {
            x,
            fval: fx,
            iterations: 0,
            converged: false,
        };
    }
    let mut g = gradient(&eval, &x, fx, bounds, options.fd_step);

    let mut s_hist: Vec<Vec<f64>> = Vec::with_capacity(options.memory);
    let mut y_hist: Vec<Vec<f64>> = Vec::with_capacity(options.memory);
    let mut rho_hist: Vec<f64> = Vec::with_capacity(options.memory);

    let mut iterations = 0;
    let mut converged = false;
    let mut rejected_pairs = 0;
    let mut stalled = 0;

    while iterations < options.max_iter {
        if projected_gradient_norm(&x, &g, bounds) < options.tol {
            converged = true;
            break;
        }
        iterations += 1;

        let mut direction = two_loop(&g, &s_hist, &y_hist, &rho_hist);
        freeze_active(&mut direction, &x, bounds);
        if dot(&direction, &g) >= 0.0 {
            // Not a descent direction: restart from steepest descent.
            s_hist.clear();
            y_hist.clear();
            rho_hist.clear();
            direction = g.iter().map(|v| -v).collect();
            freeze_active(&mut direction, &x, bounds);
        }

        let mut step = 1.0;
        let mut accepted = None;
        for _ in 0..MAX_BACKTRACKS {
            let trial: Vec<f64> = (0..n).map(|i| x[i] + step * direction[i]).collect();
            let trial = project(&trial, bounds);
            let f_trial = eval(&trial);
            let decrease: f64 = (0..n).map(|i| g[i] * (trial[i] - x[i])).sum();
            if f_trial <= fx + ARMIJO_C1 * decrease && f_trial < f64::INFINITY {
                accepted = Some((trial, f_trial));
                break;
            }
            step *= 0.5;
        }
        let Some((x_next, f_next)) = accepted else {
            break;
        };

        let g_next = gradient(&eval, &x_next, f_next, bounds, options.fd_step);
        let s: Vec<f64> = (0..n).map(|i| x_next[i] - x[i]).collect();
        let y: Vec<f64> = (0..n).map(|i| g_next[i] - g[i]).collect();
        let sy = dot(&s, &y);
        if sy > CURVATURE_EPS * dot(&y, &y) && sy > 0.0 {
            if s_hist.len() >= options.memory {
                s_hist.remove(0);
                y_hist.remove(0);
                rho_hist.remove(0);
            }
            s_hist.push(s);
            y_hist.push(y);
            rho_hist.push(1.0 / sy);
            rejected_pairs = 0;
        } else {
            rejected_pairs += 1;
            if rejected_pairs >= MAX_REJECTED_PAIRS {
                s_hist.clear();
                y_hist.clear();
                rho_hist.clear();
                rejected_pairs = 0;
            }
        }

        let small_change = (fx - f_next).abs() <= options.tol * fx.abs().max(1.0);
        stalled = if small_change { stalled + 1 } else { 0 };
        x = x_next;
        fx = f_next;
        g = g_next;
        if stalled >= STALL_ITERATIONS {
            converged = true;
            break;
        }
    }

    LocalMinimum {
        x,
        fval: fx,
        iterations,
        converged,
    }
}

fn project(x: &[f64], bounds: &[(f64, f64)]) -> Vec<f64> {
    x.iter()
        .zip(bounds)
        .map(|(&v, &(lo, hi))| v.clamp(lo, hi))
        .collect()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Central differences, one-sided at the box faces.
fn gradient<F>(f: &F, x: &[f64], fx: f64, bounds: &[(f64, f64)], rel_step: f64) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64,
{
    let mut probe = x.to_vec();
    (0..x.len())
        .map(|i| {
            let (lo, hi) = bounds[i];
            let h = rel_step * x[i].abs().max(1.0);
            let at_upper = x[i] >= hi;
            let at_lower = x[i] <= lo;
            let up = if at_upper { x[i] } else { (x[i] + h).min(hi) };
            let down = if at_lower { x[i] } else { (x[i] - h).max(lo) };
            if up - down <= 0.0 {
                return 0.0;
            }
            probe[i] = up;
            let f_up = if at_upper { fx } else { f(&probe) };
            probe[i] = down;
            let f_down = if at_lower { fx } else { f(&probe) };
            probe[i] = x[i];
            let g = (f_up - f_down) / (up - down);
            if g.is_finite() { g } else { 0.0 }
        })
        .collect()
}

/// Infinity norm of the gradient with components pinned at active bounds removed.
fn projected_gradient_norm(x: &[f64], g: &[f64], bounds: &[(f64, f64)]) -> f64 {
    x.iter()
        .zip(g)
        .zip(bounds)
        .map(|((&xi, &gi), &(lo, hi))| {
            if (xi <= lo && gi > 0.0) || (xi >= hi && gi < 0.0) {
                0.0
            } else {
                gi.abs()
            }
        })
        .fold(0.0, f64::max)
}

/// Zero out direction components that would leave the box from an active face.
fn freeze_active(direction: &mut [f64], x: &[f64], bounds: &[(f64, f64)]) {
    for ((d, &xi), &(lo, hi)) in direction.iter_mut().zip(x).zip(bounds) {
        if (xi <= lo && *d < 0.0) || (xi >= hi && *d > 0.0) {
            *d = 0.0;
        }
    }
}

/// L-BFGS two-loop recursion; returns the descent direction `-H g`.
fn two_loop(g: &[f64], s_hist: &[Vec<f64>], y_hist: &[Vec<f64>], rho_hist: &[f64]) -> Vec<f64> {
    let m = s_hist.len();
    let mut q = g.to_vec();
    let mut alpha = vec![0.0; m];
    for i in (0..m).rev() {
        alpha[i] = rho_hist[i] * dot(&s_hist[i], &q);
        for (qj, yj) in q.iter_mut().zip(&y_hist[i]) {
            *qj -= alpha[i] * yj;
        }
    }
    let gamma = if m > 0 {
        let yy = dot(&y_hist[m - 1], &y_hist[m - 1]);
        if yy > 0.0 {
            dot(&s_hist[m - 1], &y_hist[m - 1]) / yy
        } else {
            1.0
        }
    } else {
        1.0
    };
    for qj in &mut q {
        *qj *= gamma;
    }
    for i in 0..m {
        let beta = rho_hist[i] * dot(&y_hist[i], &q);
        for (qj, sj) in q.iter_mut().zip(&s_hist[i]) {
            *qj += sj * (alpha[i] - beta);
        }
    }
    q.iter().map(|v| -v).collect()
}
