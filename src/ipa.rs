//! Single-polynomial inner product argument
//!
//! Opens an evaluation-form polynomial `f` (a length-[`crate::WIDTH`] vector
//! over the fixed domain `0..WIDTH`) at an arbitrary field element `z`,
//! proving `f(z) = y` against the Pedersen commitment `C = commit(f)` without
//! revealing `f`. This is the inner collaborator the multiproof protocol
//! (`crate::multiproof`) reduces its batched check down to: everything above
//! this module exists to turn "many openings of many polynomials" into "one
//! opening of one polynomial," which is exactly what `open`/`verify` handle.
//!
//! The argument folds the witness vector `a = f`, the public evaluation
//! vector `b` (the Lagrange basis at `z`, so `<a, b> = f(z)`), and the basis
//! `G` in half at each of `log2(WIDTH)` rounds, producing one `(L, R)` pair
//! per round and a single final scalar. It carries no hiding/blinding beyond
//! what the surrounding Fiat–Shamir transcript already provides — this is a
//! proof of knowledge of an opening, not a zero-knowledge argument.

#![forbid(unsafe_code)]

use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::{Field, Zero};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};

use crate::transcript::{FsLabel, Transcript};
use crate::{GAffine, PublicParams, F, G, WIDTH, WIDTH_BITS};

/// One round's pair of cross-term commitments.
#[derive(Clone, Debug, CanonicalSerialize, CanonicalDeserialize, PartialEq, Eq)]
pub struct IpaProof {
    /// `(L, R)` for each of the `WIDTH_BITS` folding rounds, outermost first.
    pub rounds: Vec<(GAffine, GAffine)>,
    /// The witness vector's final, length-1 value after folding.
    pub final_a: F,
}

fn msm(scalars: &[F], points: &[GAffine]) -> G {
    debug_assert_eq!(scalars.len(), points.len());
    let mut acc = G::zero();
    for (s, p) in scalars.iter().zip(points.iter()) {
        acc += *p * s;
    }
    acc
}

fn inner_product(a: &[F], b: &[F]) -> F {
    a.iter().zip(b.iter()).map(|(x, y)| *x * y).sum()
}

fn fold_scalars(lo: &[F], hi: &[F], x: F) -> Vec<F> {
    lo.iter().zip(hi.iter()).map(|(l, h)| *l + x * h).collect()
}

fn fold_points(lo: &[GAffine], hi: &[GAffine], x_inv: F) -> Vec<GAffine> {
    lo.iter()
        .zip(hi.iter())
        .map(|(l, h)| (l.into_group() + *h * x_inv).into_affine())
        .collect()
}

/// Open `f` at `z`, returning the claimed value `y = f(z)` and a proof that
/// `commit(pp, f) == C` opens to `y` there. `transcript` is threaded through
/// (not a fresh one constructed here) so the multiproof protocol can bind
/// this opening into its own Fiat–Shamir flow.
pub fn open(pp: &PublicParams, transcript: &mut Transcript, f: &[F], z: F) -> (F, IpaProof) {
    debug_assert_eq!(f.len(), WIDTH);
    let b = pp.quotient_table.lagrange_basis_at(z);
    let y = inner_product(f, &b);

    let mut a = f.to_vec();
    let mut b = b;
    let mut basis = pp.basis.clone();
    let mut rounds = Vec::with_capacity(WIDTH_BITS as usize);

    let mut n = WIDTH;
    while n > 1 {
        let half = n / 2;
        let (a_lo, a_hi) = a.split_at(half);
        let (b_lo, b_hi) = b.split_at(half);
        let (g_lo, g_hi) = basis.split_at(half);

        let l_point = (msm(a_hi, g_lo) + pp.q * inner_product(a_hi, b_lo)).into_affine();
        let r_point = (msm(a_lo, g_hi) + pp.q * inner_product(a_lo, b_hi)).into_affine();

        transcript.absorb_commitment(FsLabel::Commitment, &l_point);
        transcript.absorb_commitment(FsLabel::Commitment, &r_point);
        let x = transcript.challenge_f(FsLabel::R);
        let x_inv = x.inverse().expect("transcript challenges are nonzero with overwhelming probability");

        a = fold_scalars(a_lo, a_hi, x);
        b = fold_scalars(b_lo, b_hi, x_inv);
        basis = fold_points(g_lo, g_hi, x_inv);
        rounds.push((l_point, r_point));

        n = half;
    }

    (y, IpaProof { rounds, final_a: a[0] })
}

/// Verify that `commitment` opens to `y` at `z`, per `proof`.
pub fn verify(
    pp: &PublicParams,
    transcript: &mut Transcript,
    commitment: GAffine,
    z: F,
    y: F,
    proof: &IpaProof,
) -> bool {
    if proof.rounds.len() != WIDTH_BITS as usize {
        return false;
    }

    let mut b = pp.quotient_table.lagrange_basis_at(z);
    let mut basis = pp.basis.clone();
    let mut p: G = commitment.into_group() + pp.q * y;

    for (l, r) in &proof.rounds {
        transcript.absorb_commitment(FsLabel::Commitment, l);
        transcript.absorb_commitment(FsLabel::Commitment, r);
        let x = transcript.challenge_f(FsLabel::R);
        let x_inv = match x.inverse() {
            Some(v) => v,
            None => return false,
        };

        let half = b.len() / 2;
        let (b_lo, b_hi) = b.split_at(half);
        b = fold_scalars(b_lo, b_hi, x_inv);

        let (g_lo, g_hi) = basis.split_at(half);
        basis = fold_points(g_lo, g_hi, x_inv);

        p += l.into_group() * x + r.into_group() * x_inv;
    }

    debug_assert_eq!(basis.len(), 1);
    debug_assert_eq!(b.len(), 1);
    let expected = (basis[0] * proof.final_a + pp.q * (proof.final_a * b[0])).into_affine();
    p.into_affine() == expected
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_std::{test_rng, UniformRand};

    #[test]
    fn honest_proof_verifies() {
        let pp = PublicParams::deterministic(b"ipa-test");
        let mut rng = test_rng();
        let f: Vec<F> = (0..WIDTH).map(|_| F::rand(&mut rng)).collect();
        let c = pp.pedersen_commit(&f);
        let z = F::rand(&mut rng);

        let mut pt = Transcript::new("ipa-test");
        let (y, proof) = open(&pp, &mut pt, &f, z);

        let mut vt = Transcript::new("ipa-test");
        assert!(verify(&pp, &mut vt, c, z, y, &proof));
    }

    #[test]
    fn opening_at_a_domain_point_matches_the_raw_evaluation() {
        let pp = PublicParams::deterministic(b"ipa-test");
        let f: Vec<F> = (0..WIDTH).map(|i| F::from((i * i + 1) as u64)).collect();
        let c = pp.pedersen_commit(&f);
        let z = crate::field::domain_element(42);

        let mut pt = Transcript::new("ipa-test");
        let (y, proof) = open(&pp, &mut pt, &f, z);
        assert_eq!(y, f[42]);

        let mut vt = Transcript::new("ipa-test");
        assert!(verify(&pp, &mut vt, c, z, y, &proof));
    }

    #[test]
    fn tampered_value_is_rejected() {
        let pp = PublicParams::deterministic(b"ipa-test");
        let mut rng = test_rng();
        let f: Vec<F> = (0..WIDTH).map(|_| F::rand(&mut rng)).collect();
        let c = pp.pedersen_commit(&f);
        let z = F::rand(&mut rng);

        let mut pt = Transcript::new("ipa-test");
        let (y, proof) = open(&pp, &mut pt, &f, z);

        let mut vt = Transcript::new("ipa-test");
        assert!(!verify(&pp, &mut vt, c, z, y + F::from(1u64), &proof));
    }

    #[test]
    fn ipa_proof_round_trips_through_serialization() {
        let pp = PublicParams::deterministic(b"ipa-test");
        let mut rng = test_rng();
        let f: Vec<F> = (0..WIDTH).map(|_| F::rand(&mut rng)).collect();
        let z = F::rand(&mut rng);
        let mut pt = Transcript::new("ipa-test");
        let (_y, proof) = open(&pp, &mut pt, &f, z);

        let mut bytes = Vec::new();
        proof.serialize_compressed(&mut bytes).unwrap();
        let decoded = IpaProof::deserialize_compressed(&bytes[..]).unwrap();
        assert_eq!(proof, decoded);
    }

    #[test]
    fn curve_point_and_scalar_round_trip_through_serialization() {
        let pp = PublicParams::deterministic(b"ipa-test");
        let mut rng = test_rng();
        let f: Vec<F> = (0..WIDTH).map(|_| F::rand(&mut rng)).collect();
        let c = pp.pedersen_commit(&f);

        let mut point_bytes = Vec::new();
        c.serialize_compressed(&mut point_bytes).unwrap();
        let decoded_point = GAffine::deserialize_compressed(&point_bytes[..]).unwrap();
        assert_eq!(c, decoded_point);

        let scalar = F::rand(&mut rng);
        let mut scalar_bytes = Vec::new();
        scalar.serialize_compressed(&mut scalar_bytes).unwrap();
        let decoded_scalar = F::deserialize_compressed(&scalar_bytes[..]).unwrap();
        assert_eq!(scalar, decoded_scalar);
    }

    #[test]
    fn mismatched_transcript_label_is_rejected() {
        let pp = PublicParams::deterministic(b"ipa-test");
        let mut rng = test_rng();
        let f: Vec<F> = (0..WIDTH).map(|_| F::rand(&mut rng)).collect();
        let c = pp.pedersen_commit(&f);
        let z = F::rand(&mut rng);

        let mut pt = Transcript::new("ipa-test");
        let (y, proof) = open(&pp, &mut pt, &f, z);

        let mut vt = Transcript::new("different-domain");
        assert!(!verify(&pp, &mut vt, c, z, y, &proof));
    }
}
