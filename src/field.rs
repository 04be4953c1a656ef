//! Field arithmetic and the fixed evaluation domain
//!
//! Polynomials in this crate are always represented in **evaluation form**:
//! as the vector of their values on `DOMAIN = [0, 1, …, WIDTH-1]` (lifted to
//! the scalar field). Because the domain is the small-integer range rather
//! than a multiplicative subgroup, quotient construction reduces to plain
//! field arithmetic instead of an NTT, and it is cheap enough to precompute
//! once and share across every [`crate::PublicParams`] instance.

#![allow(clippy::needless_range_loop)]

use ark_ff::{fields::batch_inversion, Field, Zero};

use crate::{F, WIDTH};

/// `DOMAIN[i]`, the field image of `i`.
#[inline]
pub fn domain_element(i: usize) -> F {
    F::from(i as u64)
}

/// Batch-invert a slice in place, skipping (leaving untouched) any zero
/// entries. Thin wrapper around `ark_ff`'s Montgomery-trick batch inversion
/// so we never hand-roll field inversion.
pub fn batch_invert(values: &mut [F]) {
    batch_inversion(values);
}

/// Precomputed inverse-difference table for the domain `0..WIDTH`.
///
/// Since `DOMAIN[j] - DOMAIN[i] = F::from(j) - F::from(i)` depends only on
/// `j - i`, a full `WIDTH x WIDTH` table would be redundant; we keep the
/// `O(WIDTH)` table of `F::from(d)^{-1}` for `d = 1..WIDTH-1` and derive
/// `(DOMAIN[j] - DOMAIN[i])^{-1}` from it with one negation.
#[derive(Clone, Debug)]
pub struct Precomputed256 {
    inv_diff: Vec<F>,
    /// Barycentric weights `w_i = 1 / Πⱼ≠ᵢ (DOMAIN[i] - DOMAIN[j])`, used to
    /// evaluate the Lagrange basis at an out-of-domain point (see
    /// [`Precomputed256::lagrange_basis_at`]).
    barycentric_weights: Vec<F>,
}

impl Precomputed256 {
    /// Build the table. `O(WIDTH)` field inversions via the batch trick.
    pub fn new() -> Self {
        let mut diffs: Vec<F> = (1..WIDTH).map(|d| F::from(d as u64)).collect();
        batch_invert(&mut diffs);
        let mut inv_diff = vec![F::zero()];
        inv_diff.extend(diffs);

        let mut products: Vec<F> = (0..WIDTH)
            .map(|i| {
                let mut p = F::from(1u64);
                for j in 0..WIDTH {
                    if j != i {
                        p *= domain_element(i) - domain_element(j);
                    }
                }
                p
            })
            .collect();
        batch_invert(&mut products);

        Self { inv_diff, barycentric_weights: products }
    }

    /// `(DOMAIN[j] - DOMAIN[i])^{-1}` for `i != j`, both in `0..WIDTH`.
    #[inline]
    pub fn inv_diff(&self, i: usize, j: usize) -> F {
        debug_assert_ne!(i, j, "inv_diff undefined on the diagonal");
        if j > i {
            self.inv_diff[j - i]
        } else {
            -self.inv_diff[i - j]
        }
    }

    /// The Lagrange basis `(L_0(z), …, L_{WIDTH-1}(z))`, i.e. the vector `b`
    /// such that `<f, b> = f(z)` for any evaluation-form polynomial `f`.
    ///
    /// Uses the second barycentric form: `L_i(z) = [w_i/(z-x_i)] / Σⱼ
    /// [w_j/(z-x_j)]`. If `z` lands exactly on a domain point, returns the
    /// corresponding unit vector instead of dividing by zero.
    pub fn lagrange_basis_at(&self, z: F) -> Vec<F> {
        let mut diffs: Vec<F> = (0..WIDTH).map(|i| z - domain_element(i)).collect();
        if let Some(i) = diffs.iter().position(|d| d.is_zero()) {
            let mut b = vec![F::zero(); WIDTH];
            b[i] = F::from(1u64);
            return b;
        }
        batch_invert(&mut diffs);
        let mut c: Vec<F> = diffs
            .iter()
            .zip(self.barycentric_weights.iter())
            .map(|(d, w)| *d * w)
            .collect();
        let sum: F = c.iter().sum();
        let sum_inv = sum.inverse().expect("z was checked not to lie on the domain");
        for v in c.iter_mut() {
            *v *= sum_inv;
        }
        c
    }
}

impl Default for Precomputed256 {
    fn default() -> Self {
        Self::new()
    }
}

/// `(f(X) - f(zᵢ)) / (X - zᵢ)` in evaluation form, `zᵢ = DOMAIN[index]`.
///
/// Off-diagonal entries are `(f[j] - f[index]) * (DOMAIN[j] - DOMAIN[index])^{-1}`.
/// The diagonal entry uses the barycentric derivative identity
/// `f'(zᵢ) = Σⱼ≠ᵢ (f(zⱼ) − f(zᵢ)) · (zᵢ − zⱼ)^{-1} = -Σⱼ≠ᵢ quotient[j]`.
pub fn compute_inner_quotient_in_evaluation_form(
    table: &Precomputed256,
    f: &[F],
    index: usize,
) -> Vec<F> {
    debug_assert_eq!(f.len(), WIDTH);
    let mut quotient = vec![F::zero(); WIDTH];
    let f_i = f[index];
    let mut diagonal = F::zero();
    for j in 0..WIDTH {
        if j == index {
            continue;
        }
        let q = (f[j] - f_i) * table.inv_diff(index, j);
        quotient[j] = q;
        diagonal -= q;
    }
    quotient[index] = diagonal;
    quotient
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Naive O(WIDTH^2) evaluator used only to cross-check the closed form.
    fn naive_quotient(f: &[F], index: usize) -> Vec<F> {
        let zi = domain_element(index);
        let fi = f[index];
        let mut out = vec![F::zero(); WIDTH];
        let mut diagonal = F::zero();
        for j in 0..WIDTH {
            if j == index {
                continue;
            }
            let zj = domain_element(j);
            let q = (f[j] - fi) * (zj - zi).inverse().unwrap();
            out[j] = q;
            diagonal -= q;
        }
        out[index] = diagonal;
        out
    }

    #[test]
    fn matches_naive_closed_form() {
        let table = Precomputed256::new();
        let f: Vec<F> = (0..WIDTH).map(|i| F::from((i * 7 + 3) as u64)).collect();
        for index in [0usize, 1, 128, 255] {
            assert_eq!(
                compute_inner_quotient_in_evaluation_form(&table, &f, index),
                naive_quotient(&f, index)
            );
        }
    }

    #[test]
    fn lagrange_basis_reproduces_evaluation() {
        let table = Precomputed256::new();
        let f: Vec<F> = (0..WIDTH).map(|i| F::from((i * 3 + 11) as u64)).collect();
        let z = F::from(12345u64);
        let b = table.lagrange_basis_at(z);
        let lhs: F = f.iter().zip(b.iter()).map(|(fi, bi)| *fi * bi).sum();

        // Cross-check via direct Lagrange interpolation at z.
        let mut rhs = F::zero();
        for i in 0..WIDTH {
            let mut li = F::from(1u64);
            for j in 0..WIDTH {
                if j != i {
                    li *= (z - domain_element(j)) * (domain_element(i) - domain_element(j)).inverse().unwrap();
                }
            }
            rhs += f[i] * li;
        }
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn lagrange_basis_on_domain_point_is_unit_vector() {
        let table = Precomputed256::new();
        let b = table.lagrange_basis_at(domain_element(200));
        for (i, bi) in b.iter().enumerate() {
            if i == 200 {
                assert_eq!(*bi, F::from(1u64));
            } else {
                assert!(bi.is_zero());
            }
        }
    }

    #[test]
    fn quotient_evaluates_consistently() {
        // (f(X) - f(zi)) = (X - zi) * quotient(X) as evaluation-form vectors;
        // check at an out-of-domain point via a direct Lagrange evaluation.
        let table = Precomputed256::new();
        let f: Vec<F> = (0..WIDTH).map(|i| F::from((i * i + 1) as u64)).collect();
        let index = 17usize;
        let quotient = compute_inner_quotient_in_evaluation_form(&table, &f, index);
        // Sum over j of quotient[j] should reproduce f'(zi) at j = index by construction;
        // spot-check that the off-diagonal identity holds exactly.
        for j in 0..WIDTH {
            if j == index {
                continue;
            }
            let lhs = f[j] - f[index];
            let rhs = quotient[j] * (domain_element(j) - domain_element(index));
            assert_eq!(lhs, rhs);
        }
    }
}
