//! IPA multiproof: batch many polynomial openings into one
//!
//! Implements Dankrad Feist's PCS-multiproofs scheme
//! (<https://dankradfeist.de/ethereum/2021/06/18/pcs-multiproofs.html>):
//! given commitments `Cs[k] = commit(fs[k])` and claims `fs[k](zs[k]) =
//! ys[k]`, produces one aggregated quotient commitment `D` and a single
//! [`crate::ipa::IpaProof`] instead of `len(Cs)` independent openings.
//!
//! The two Fiat–Shamir challenges are absorbed in a fixed order: `r` is
//! derived from `(Cs, zs, ys)`, then `t` from `(r, D)`. Both sides must
//! replay this exact schedule or the final IPA check fails.

#![forbid(unsafe_code)]

use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::{Field, Zero};

use crate::field::compute_inner_quotient_in_evaluation_form;
use crate::ipa;
use crate::transcript::{FsLabel, Transcript};
use crate::{GAffine, PublicParams, F, G, WIDTH};

/// Build the multiproof for a batch of openings. `Cs[k]` must equal
/// `pp.pedersen_commit(&fs[k])`, and `ys[k]` must equal `fs[k][zs[k]]`; the
/// caller (the multiproof builder) is responsible for that invariant, since
/// this function has no way to check it against anything but the data it's
/// handed.
pub fn prove(
    pp: &PublicParams,
    transcript: &mut Transcript,
    cs: &[GAffine],
    fs: &[Vec<F>],
    zs: &[u8],
    ys: &[F],
) -> (GAffine, ipa::IpaProof) {
    debug_assert_eq!(cs.len(), fs.len());
    debug_assert_eq!(cs.len(), zs.len());
    debug_assert_eq!(cs.len(), ys.len());

    transcript.absorb_commitments(FsLabel::Commitment, cs);
    transcript.absorb_bytes(FsLabel::Index, zs);
    transcript.absorb_scalars(FsLabel::Scalar, ys);
    let r = transcript.challenge_f(FsLabel::R);

    // g(X) = sum_k r^k * quotient_k(X), quotient_k = (f_k(X) - f_k(z_k)) / (X - z_k).
    let mut g = vec![F::zero(); WIDTH];
    let mut power_of_r = F::from(1u64);
    for (f, &z) in fs.iter().zip(zs.iter()) {
        let quotient = compute_inner_quotient_in_evaluation_form(&pp.quotient_table, f, z as usize);
        for i in 0..WIDTH {
            g[i] += power_of_r * quotient[i];
        }
        power_of_r *= r;
    }

    let d = pp.pedersen_commit(&g);
    transcript.absorb_commitment(FsLabel::Commitment, &d);
    let t = transcript.challenge_f(FsLabel::T);

    // h(X) = sum_k r^k * f_k(X) / (t - z_k).
    let mut h = vec![F::zero(); WIDTH];
    let mut power_of_r = F::from(1u64);
    for (f, &z) in fs.iter().zip(zs.iter()) {
        let denom_inv = (t - crate::field::domain_element(z as usize))
            .inverse()
            .expect("t is a Fiat-Shamir challenge, overwhelmingly unlikely to land on a domain point");
        for i in 0..WIDTH {
            h[i] += power_of_r * f[i] * denom_inv;
        }
        power_of_r *= r;
    }

    let h_minus_g: Vec<F> = h.iter().zip(g.iter()).map(|(hi, gi)| *hi - gi).collect();
    let (_y, ipa_proof) = ipa::open(pp, transcript, &h_minus_g, t);

    (d, ipa_proof)
}

/// Verify a multiproof against the same `(Cs, zs, ys)` the prover claimed.
/// `transcript` must be freshly constructed (or otherwise in the same state
/// the prover's was before calling [`prove`]) so the challenge schedule
/// lines up.
pub fn verify(
    pp: &PublicParams,
    transcript: &mut Transcript,
    cs: &[GAffine],
    zs: &[u8],
    ys: &[F],
    d: GAffine,
    ipa_proof: &ipa::IpaProof,
) -> bool {
    if cs.len() != zs.len() || cs.len() != ys.len() {
        return false;
    }

    transcript.absorb_commitments(FsLabel::Commitment, cs);
    transcript.absorb_bytes(FsLabel::Index, zs);
    transcript.absorb_scalars(FsLabel::Scalar, ys);
    let r = transcript.challenge_f(FsLabel::R);

    transcript.absorb_commitment(FsLabel::Commitment, &d);
    let t = transcript.challenge_f(FsLabel::T);

    let mut e_coefficients = Vec::with_capacity(cs.len());
    let mut g2_of_t = F::zero();
    let mut power_of_r = F::from(1u64);
    for (&z, y) in zs.iter().zip(ys.iter()) {
        let denom = t - crate::field::domain_element(z as usize);
        let denom_inv = match denom.inverse() {
            Some(v) => v,
            None => return false,
        };
        let coeff = power_of_r * denom_inv;
        e_coefficients.push(coeff);
        g2_of_t += coeff * y;
        power_of_r *= r;
    }

    let e = msm_sum(cs, &e_coefficients);
    let y = g2_of_t;

    let e_minus_d = (e.into_group() - d.into_group()).into_affine();
    ipa::verify(pp, transcript, e_minus_d, t, y, ipa_proof)
}

fn msm_sum(points: &[GAffine], scalars: &[F]) -> GAffine {
    let mut acc = G::zero();
    for (p, s) in points.iter().zip(scalars.iter()) {
        acc += *p * s;
    }
    acc.into_affine()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basis::commitment_to_field;
    use ark_std::{test_rng, UniformRand};

    fn random_poly(rng: &mut impl rand::Rng) -> Vec<F> {
        (0..WIDTH).map(|_| F::rand(rng)).collect()
    }

    #[test]
    fn honest_multiproof_of_several_polynomials_verifies() {
        let pp = PublicParams::deterministic(b"multiproof-test");
        let mut rng = test_rng();

        let fs: Vec<Vec<F>> = (0..4).map(|_| random_poly(&mut rng)).collect();
        let cs: Vec<GAffine> = fs.iter().map(|f| pp.pedersen_commit(f)).collect();
        let zs: Vec<u8> = vec![3, 17, 17, 250];
        let ys: Vec<F> = fs.iter().zip(zs.iter()).map(|(f, &z)| f[z as usize]).collect();

        let mut pt = Transcript::new("multiproof-test");
        let (d, proof) = prove(&pp, &mut pt, &cs, &fs, &zs, &ys);

        let mut vt = Transcript::new("multiproof-test");
        assert!(verify(&pp, &mut vt, &cs, &zs, &ys, d, &proof));
    }

    #[test]
    fn tampered_claim_is_rejected() {
        let pp = PublicParams::deterministic(b"multiproof-test");
        let mut rng = test_rng();

        let fs: Vec<Vec<F>> = (0..3).map(|_| random_poly(&mut rng)).collect();
        let cs: Vec<GAffine> = fs.iter().map(|f| pp.pedersen_commit(f)).collect();
        let zs: Vec<u8> = vec![0, 5, 9];
        let mut ys: Vec<F> = fs.iter().zip(zs.iter()).map(|(f, &z)| f[z as usize]).collect();

        let mut pt = Transcript::new("multiproof-test");
        let (d, proof) = prove(&pp, &mut pt, &cs, &fs, &zs, &ys);

        ys[1] += F::from(1u64);
        let mut vt = Transcript::new("multiproof-test");
        assert!(!verify(&pp, &mut vt, &cs, &zs, &ys, d, &proof));
    }

    #[test]
    fn commitment_to_field_openings_chain_into_a_parent_proof() {
        // Exercises the same "commitment as a value" trick the trie uses:
        // one polynomial's value at a point is another polynomial's commitment.
        let pp = PublicParams::deterministic(b"multiproof-test");
        let child: Vec<F> = (0..WIDTH).map(|i| F::from(i as u64)).collect();
        let child_commitment = pp.pedersen_commit(&child);
        let child_field = commitment_to_field(&child_commitment);

        let mut parent = vec![F::zero(); WIDTH];
        parent[9] = child_field;
        let parent_commitment = pp.pedersen_commit(&parent);

        let cs = vec![parent_commitment];
        let zs = vec![9u8];
        let ys = vec![child_field];

        let mut pt = Transcript::new("multiproof-test");
        let (d, proof) = prove(&pp, &mut pt, &cs, &[parent], &zs, &ys);

        let mut vt = Transcript::new("multiproof-test");
        assert!(verify(&pp, &mut vt, &cs, &zs, &ys, d, &proof));
    }
}
