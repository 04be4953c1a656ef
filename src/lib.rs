//! Crate root: public surface, core aliases, and protocol-wide invariants
//!
//! This module is the **single canonical entry-point** for downstream users
//! of the library. It centralizes the scalar field / group aliases and
//! re-exports the submodules that implement a Verkle trie: an authenticated
//! key→value map keyed by 32-byte keys, rooted in a single Pedersen
//! commitment, with compact multi-key membership/non-membership proofs via
//! an IPA multiproof.
//!
//! ## Invariants
//!
//! - **Field & curve.** The scalar field is `ark_ed_on_bls12_381_bandersnatch::Fr`
//!   (`F` in this crate). Commitments are Pedersen commitments over the
//!   Bandersnatch group (`G` / `GAffine`). We **forbid unsafe** throughout.
//! - **Width.** The trie fan-out and IPA evaluation domain both have size
//!   [`WIDTH`] = 256; a key's stem (first 31 bytes) selects the path, its
//!   suffix (last byte) selects the slot within a [`trie::SuffixNode`].
//! - **Fiat–Shamir.** We use BLAKE3 with explicit domain-separation tags and
//!   an XOF to derive challenges; see [`transcript`]. The prover and
//!   verifier must replay the exact same sequence of absorbs/challenges.
//! - **Single-owner trie.** `Trie` is not safe for concurrent mutation;
//!   callers must serialize inserts against proving/verifying on the same
//!   trie.
//!
//! These invariants are enforced by design across the submodules. If any
//! invariant is violated at runtime, the failure mode is a precise error
//! (never UB, never a silent divergence between prover and verifier).

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

/// Field arithmetic and the fixed `0..WIDTH` evaluation domain.
pub mod field;
/// Pedersen basis, deterministic basis derivation, and public parameters.
pub mod basis;
/// Fiat–Shamir transcript (domain-separated hashing, hash→field).
pub mod transcript;
/// Single-polynomial inner product argument, consumed as an oracle.
pub mod ipa;
/// Trie node types, insertion, commitment maintenance, lookup.
pub mod trie;
/// Multiproof builder: trie + query keys → ordered opening lists.
pub mod builder;
/// IPA multiproof: reduces many openings into one IPA argument.
pub mod multiproof;
/// Wire proof layout and (de)serialization.
pub mod proof;
/// Outer verifier: wire proof + queries → accept/reject.
pub mod verifier;
/// Error types shared across the crate.
pub mod error;

pub use ark_ed_on_bls12_381_bandersnatch::{
    EdwardsAffine as GAffine, EdwardsProjective as G, Fr as F,
};

/// Trie width: child fan-out of an inner node and size of the IPA evaluation
/// domain. Suffix indices also range `0..WIDTH`.
pub const WIDTH: usize = 256;
/// `log2(WIDTH)`, the number of IPA folding rounds.
pub const WIDTH_BITS: u32 = 8;
/// Key length in bytes.
pub const KEY_LENGTH: usize = 32;
/// Stem length in bytes (`KEY_LENGTH - 1`).
pub const STEM_LENGTH: usize = 31;

pub use basis::PublicParams;
pub use builder::build_proof;
pub use error::{ProveError, TrieError, VerifyRejectReason};
pub use proof::WireProof;
pub use trie::{Key, Stem, Trie, Value};
pub use verifier::{verify, ClaimedValue};
