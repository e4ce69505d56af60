//! Symmetric eigendecomposition for covariance factorization.

/// Eigenvalues and eigenvectors of a symmetric matrix.
#[derive(Debug, Clone)]
pub(crate) struct SymmetricEigen {
    /// Unsorted eigenvalues.
    pub(crate) values: Vec<f64>,
    /// Row-major `n x n`; column `k` is the eigenvector of `values[k]`.
    pub(crate) vectors: Vec<f64>,
}

impl SymmetricEigen {
    /// Cyclic Jacobi eigendecomposition of a row-major symmetric `n x n` matrix.
    ///
    /// Uses a threshold strategy for the first four sweeps and
    /// Rutishauser-form rotation updates. Converges when the largest
    /// off-diagonal entry falls below `1e-14` relative to the diagonal scale.
    pub(crate) fn jacobi(matrix: &[f64], n: usize) -> Self {
        const MAX_SWEEPS: usize = 50;
        const TOL: f64 = 1e-14;

        let mut a = matrix.to_vec();
        let mut v = vec![0.0f64; n * n];
        for i in 0..n {
            v[i * n + i] = 1.0;
        }

        for sweep in 0..MAX_SWEEPS {
            let mut max_off = 0.0f64;
            let mut scale = 0.0f64;
            for p in 0..n {
                scale = scale.max(a[p * n + p].abs());
                for q in (p + 1)..n {
                    max_off = max_off.max(a[p * n + q].abs());
                }
            }
            if max_off <= TOL * scale || max_off == 0.0 {
                break;
            }

            let threshold = if sweep < 4 {
                0.2 * max_off / (n * n) as f64
            } else {
                0.0
            };

            for p in 0..n {
                for q in (p + 1)..n {
                    let apq = a[p * n + q];
                    if apq == 0.0 || apq.abs() < threshold {
                        continue;
                    }

                    let diff = a[q * n + q] - a[p * n + p];
                    let t = if diff.abs() < 1e-300 {
                        apq.signum()
                    } else {
                        // Smaller root of t^2 + 2 tau t - 1 = 0.
                        let tau = diff / (2.0 * apq);
                        tau.signum() / (tau.abs() + (1.0 + tau * tau).sqrt())
                    };
                    let c = 1.0 / (1.0 + t * t).sqrt();
                    let s = t * c;
                    let tau_rot = s / (1.0 + c);

                    a[p * n + p] -= t * apq;
                    a[q * n + q] += t * apq;
                    a[p * n + q] = 0.0;
                    a[q * n + p] = 0.0;

                    for r in 0..n {
                        if r == p || r == q {
                            continue;
                        }
                        let arp = a[r * n + p];
                        let arq = a[r * n + q];
                        a[r * n + p] = arp - s * (arq + tau_rot * arp);
                        a[p * n + r] = a[r * n + p];
                        a[r * n + q] = arq + s * (arp - tau_rot * arq);
                        a[q * n + r] = a[r * n + q];
                    }

                    for r in 0..n {
                        let vrp = v[r * n + p];
                        let vrq = v[r * n + q];
                        v[r * n + p] = vrp - s * (vrq + tau_rot * vrp);
                        v[r * n + q] = vrq + s * (vrp - tau_rot * vrq);
                    }
                }
            }
        }

        let values = (0..n).map(|i| a[i * n + i]).collect();
        Self { values, vectors: v }
    }

    /// Row-major factor `L = V sqrt(max(Λ, 0))` with `L Lᵀ` equal to the
    /// decomposed matrix, up to clamping of negative eigenvalues.
    pub(crate) fn sqrt_factor(&self) -> Vec<f64> {
        let n = self.values.len();
        let roots: Vec<f64> = self.values.iter().map(|&l| l.max(0.0).sqrt()).collect();
        let mut factor = self.vectors.clone();
        for row in 0..n {
            for (col, root) in roots.iter().enumerate() {
                factor[row * n + col] *= root;
            }
        }
        factor
    }
}
