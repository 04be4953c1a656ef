//! Pedersen basis, deterministic basis derivation, and public parameters
//!
//! `PublicParams` is the single context object threaded through every
//! operation in this crate — insertion, proving, and verifying all take a
//! `&PublicParams` rather than reaching for module-level globals, so two
//! tries can run side by side with independent (or deliberately identical)
//! bases without sharing mutable process state.

use ark_ec::{
    twisted_edwards::{Affine, TECurveConfig},
    AffineRepr, CurveGroup,
};
use ark_ed_on_bls12_381_bandersnatch::{EdwardsConfig, Fq};
use ark_ff::{PrimeField, Zero};
use ark_serialize::CanonicalSerialize;
use blake3::Hasher;

use crate::field::Precomputed256;
use crate::{GAffine, F, G, WIDTH};

/// Public parameters shared by every prover and verifier: the Pedersen
/// basis, the auxiliary point used by the IPA primitive, and the
/// precomputed domain table.
#[derive(Clone, Debug)]
pub struct PublicParams {
    /// `G[0..WIDTH-1]`, the per-slot Pedersen basis points.
    pub basis: Vec<GAffine>,
    /// The auxiliary point `Q` used by the IPA primitive's blinding-free
    /// inner-product reduction.
    pub q: GAffine,
    /// Precomputed domain inverse-difference table (see [`crate::field`]).
    pub quotient_table: Precomputed256,
}

impl PublicParams {
    /// Derive a reproducible set of public parameters from a domain
    /// separation tag. Two parties calling this with the same `tag` always
    /// agree on the basis: a deterministic hash-to-curve rather than a
    /// random sample, so basis agreement never depends on an out-of-band
    /// exchange.
    pub fn deterministic(tag: &[u8]) -> Self {
        let basis = (0..WIDTH)
            .map(|i| hash_to_curve(tag, b"G", i as u64))
            .collect();
        let q = hash_to_curve(tag, b"Q", 0);
        Self {
            basis,
            q,
            quotient_table: Precomputed256::new(),
        }
    }

    /// `Σᵢ vᵢ·Gᵢ` over the dense length-`WIDTH` vector `v`.
    pub fn pedersen_commit(&self, v: &[F]) -> GAffine {
        debug_assert_eq!(v.len(), WIDTH);
        self.pedersen_commit_sparse(v.iter().copied().enumerate())
    }

    /// `Σ_{(i,v)} v·Gᵢ` over a sparse set of (index, scalar) pairs. Absent
    /// indices contribute nothing, matching the "0 where absent" convention
    /// used throughout the node commitments.
    pub fn pedersen_commit_sparse(&self, entries: impl Iterator<Item = (usize, F)>) -> GAffine {
        let mut acc = G::zero();
        for (i, v) in entries {
            acc += self.basis[i] * v;
        }
        acc.into_affine()
    }

    /// The little-endian integer image of a commitment's serialized bytes,
    /// reduced mod the scalar field modulus — this is what makes a child
    /// commitment openable as a value inside its parent's polynomial.
    pub fn commitment_to_field(&self, commitment: &GAffine) -> F {
        commitment_to_field(commitment)
    }
}

/// The little-endian integer image of a commitment's compressed serialized
/// bytes, reduced mod the scalar field modulus.
pub fn commitment_to_field(commitment: &GAffine) -> F {
    let mut bytes = Vec::new();
    commitment
        .serialize_compressed(&mut bytes)
        .expect("affine point serialization is infallible");
    F::from_le_bytes_mod_order(&bytes)
}

/// Domain-separated try-and-increment hash-to-curve: hash `(tag, label,
/// index, counter)` to a base-field element, interpret it as a candidate
/// x-coordinate on the Bandersnatch twisted Edwards curve, and clear the
/// cofactor. Retries with an incrementing counter until a valid curve point
/// is found (this terminates almost always on the first or second try).
fn hash_to_curve(tag: &[u8], label: &[u8], index: u64) -> GAffine {
    for counter in 0u64.. {
        let mut hasher = Hasher::new();
        hasher.update(b"VerkleTrie.basis.v1");
        hasher.update(tag);
        hasher.update(label);
        hasher.update(&index.to_be_bytes());
        hasher.update(&counter.to_be_bytes());
        let digest = hasher.finalize();
        let x = Fq::from_le_bytes_mod_order(digest.as_bytes());

        if let Some(point) = Affine::<EdwardsConfig>::get_point_from_x_unchecked(x, false) {
            if point.is_on_curve() {
                let cleared = point.mul_by_cofactor();
                if !cleared.is_zero() {
                    return cleared;
                }
            }
        }
    }
    unreachable!("hash_to_curve terminates: the curve equation has a solution for almost every x")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_basis_is_reproducible() {
        let a = PublicParams::deterministic(b"verkle-trie-test");
        let b = PublicParams::deterministic(b"verkle-trie-test");
        assert_eq!(a.basis, b.basis);
        assert_eq!(a.q, b.q);
    }

    #[test]
    fn different_tags_diverge() {
        let a = PublicParams::deterministic(b"tag-a");
        let b = PublicParams::deterministic(b"tag-b");
        assert_ne!(a.basis, b.basis);
    }

    #[test]
    fn basis_points_are_distinct_and_nonzero() {
        let pp = PublicParams::deterministic(b"verkle-trie-test");
        for g in &pp.basis {
            assert!(!g.is_zero());
        }
        let mut sorted = pp.basis.clone();
        sorted.sort_by_key(|p| {
            let mut bytes = Vec::new();
            p.serialize_compressed(&mut bytes).unwrap();
            bytes
        });
        sorted.dedup();
        assert_eq!(sorted.len(), pp.basis.len());
    }

    #[test]
    fn empty_vector_commits_to_identity() {
        let pp = PublicParams::deterministic(b"verkle-trie-test");
        let zero = vec![F::from(0u64); WIDTH];
        let c = pp.pedersen_commit(&zero);
        assert!(c.is_zero());
    }
}
