//! Outer verifier: does this [`WireProof`] justify these claimed values?
//!
//! Rebuilds the exact same opening list the builder would have produced for
//! `keys` — without touching a trie, only the proof's own metadata — and
//! hands it to [`crate::multiproof::verify`]. The one place this departs
//! from a literal transcription of the reference algorithm is `OTHERSTEM`
//! resolution against `other_stems`: that list is attacker-controlled proof
//! content, so it's searched with binary search instead of a linear scan.

#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};

use ark_ff::Zero;

use crate::builder::{CommitmentKind, NodeId, OpeningKey};
use crate::error::VerifyRejectReason;
use crate::multiproof;
use crate::proof::{DepthByte, ExtensionPresent, WireProof};
use crate::transcript::Transcript;
use crate::trie::{Key, Stem, Value};
use crate::{GAffine, PublicParams, F, STEM_LENGTH};

/// A query's claimed outcome: `Some(value)` for membership, `None` for
/// non-membership (the key was never written).
pub type ClaimedValue = Option<Value>;

/// Verify that `proof` justifies `claimed[i]` as the value of `keys[i]`
/// under the trie rooted at `root`.
pub fn verify(
    pp: &PublicParams,
    root: GAffine,
    keys: &[Key],
    claimed: &[ClaimedValue],
    proof: &WireProof,
) -> Result<(), VerifyRejectReason> {
    if keys.len() != claimed.len() {
        return Err(VerifyRejectReason::MalformedProof);
    }
    if !is_strictly_sorted(&proof.other_stems) {
        return Err(VerifyRejectReason::MalformedProof);
    }

    let stems: Vec<Stem> = keys.iter().map(|k| k.stem()).collect::<BTreeSet<_>>().into_iter().collect();
    if proof.depths.len() != stems.len() {
        return Err(VerifyRejectReason::CommitmentCountMismatch);
    }

    let mut depth_by_stem: BTreeMap<Stem, usize> = BTreeMap::new();
    let mut extpres_by_stem: BTreeMap<Stem, ExtensionPresent> = BTreeMap::new();
    let mut stems_with_extension: BTreeSet<Stem> = BTreeSet::new();

    for (&stem, &packed) in stems.iter().zip(proof.depths.iter()) {
        let db = DepthByte::unpack(packed)?;
        let depth = db.depth as usize;
        if depth > STEM_LENGTH {
            return Err(VerifyRejectReason::MalformedProof);
        }
        depth_by_stem.insert(stem, depth);
        extpres_by_stem.insert(stem, db.extension_present);
        if db.extension_present == ExtensionPresent::Present {
            stems_with_extension.insert(stem);
        }
    }

    // The exact opening set a prover would have built for these keys,
    // rebuilt from the proof's own depth/extension-presence metadata.
    let mut all_indices: BTreeSet<OpeningKey> = BTreeSet::new();
    let mut all_subindices: BTreeSet<(OpeningKey, u8)> = BTreeSet::new();
    let mut leaf_values: BTreeMap<(OpeningKey, u8), F> = BTreeMap::new();

    for (key, claimed_value) in keys.iter().zip(claimed.iter()) {
        let stem = key.stem();
        let depth = depth_by_stem[&stem];
        let extpres = extpres_by_stem[&stem];

        for i in 0..depth {
            let inner_key = OpeningKey { kind: CommitmentKind::Inner, node_id: NodeId::Prefix(stem.0[..i].to_vec()) };
            all_indices.insert(inner_key.clone());
            all_subindices.insert((inner_key, stem.0[i]));
        }

        match extpres {
            ExtensionPresent::Present => {
                let suffix = key.suffix();
                let ext_key = OpeningKey { kind: CommitmentKind::Extension, node_id: NodeId::Stem(stem) };
                all_indices.insert(ext_key.clone());
                all_subindices.insert((ext_key.clone(), 0));
                all_subindices.insert((ext_key.clone(), 1));
                all_subindices.insert((ext_key.clone(), 2 + suffix / 128));
                leaf_values.insert((ext_key.clone(), 0), F::from(1u64));
                leaf_values.insert((ext_key, 1), stem.to_field());

                let suf_kind = if suffix < 128 { CommitmentKind::SuffixC1 } else { CommitmentKind::SuffixC2 };
                let suf_key = OpeningKey { kind: suf_kind, node_id: NodeId::Stem(stem) };
                all_indices.insert(suf_key.clone());
                let local = (suffix % 128) as u8;
                all_subindices.insert((suf_key.clone(), local * 2));
                all_subindices.insert((suf_key.clone(), local * 2 + 1));
                let (lower, upper) = match claimed_value {
                    Some(v) => crate::trie::value_slot_scalars(v),
                    None => (F::zero(), F::zero()),
                };
                leaf_values.insert((suf_key.clone(), local * 2), lower);
                leaf_values.insert((suf_key, local * 2 + 1), upper);
            }
            ExtensionPresent::OtherStem => {
                if claimed_value.is_some() {
                    return Err(VerifyRejectReason::ValuePresentWithoutExtension);
                }
                let prefix = &stem.0[..depth];

                // Queried stems sharing this prefix are cheap to scan linearly.
                let mut other_stem = stems_with_extension
                    .iter()
                    .find(|o| o.0[..depth] == *prefix)
                    .copied();

                if other_stem.is_none() {
                    other_stem = binary_search_by_prefix(&proof.other_stems, prefix);
                    if let Some(o) = other_stem {
                        let ext_key = OpeningKey { kind: CommitmentKind::Extension, node_id: NodeId::Stem(o) };
                        all_indices.insert(ext_key.clone());
                        all_subindices.insert((ext_key.clone(), 0));
                        all_subindices.insert((ext_key.clone(), 1));
                        leaf_values.insert((ext_key.clone(), 0), F::from(1u64));
                        leaf_values.insert((ext_key, 1), o.to_field());
                    }
                }

                if other_stem.is_none() {
                    return Err(VerifyRejectReason::OtherstemUnresolved);
                }
            }
            ExtensionPresent::NoExtension => {
                if claimed_value.is_some() {
                    return Err(VerifyRejectReason::ValuePresentWithoutExtension);
                }
            }
        }
    }

    if all_indices.len() != proof.commitments_sorted_by_index.len() + 1 {
        return Err(VerifyRejectReason::CommitmentCountMismatch);
    }

    // The root is always the first entry of `all_indices`: every stem's
    // path includes the empty-prefix inner opening (the root itself), and
    // `Prefix(vec![])` sorts before every other `OpeningKey`.
    let mut indices_iter = all_indices.iter();
    let root_key = indices_iter.next().ok_or(VerifyRejectReason::MalformedProof)?;
    if root_key.kind != CommitmentKind::Inner || root_key.node_id != NodeId::Prefix(Vec::new()) {
        return Err(VerifyRejectReason::MalformedProof);
    }
    let commitments_by_index: BTreeMap<&OpeningKey, GAffine> = std::iter::once((root_key, root))
        .chain(indices_iter.zip(proof.commitments_sorted_by_index.iter().copied()))
        .collect();

    // Step 0 mirrors the reference: every inner node's opening "y" at a
    // missing child is either the sibling's commitment (if we have it) or 0.
    let mut cs = Vec::with_capacity(all_subindices.len());
    let mut zs = Vec::with_capacity(all_subindices.len());
    let mut ys = Vec::with_capacity(all_subindices.len());

    for (opening_key, subindex) in &all_subindices {
        let commitment = *commitments_by_index
            .get(opening_key)
            .ok_or(VerifyRejectReason::MalformedProof)?;
        cs.push(commitment);
        zs.push(*subindex);

        let y = if let Some(&explicit) = leaf_values.get(&(opening_key.clone(), *subindex)) {
            explicit
        } else if opening_key.kind == CommitmentKind::Inner {
            inner_child_value(opening_key, *subindex, &commitments_by_index, &all_indices)
        } else {
            return Err(VerifyRejectReason::MalformedProof);
        };
        ys.push(y);
    }

    let mut transcript = Transcript::new("verkle-trie.multiproof.v1");
    if multiproof::verify(pp, &mut transcript, &cs, &zs, &ys, proof.d, &proof.ipa_proof) {
        Ok(())
    } else {
        Err(VerifyRejectReason::IpaCheckFailed)
    }
}

fn inner_child_value<'a>(
    opening_key: &OpeningKey,
    subindex: u8,
    commitments_by_index: &BTreeMap<&'a OpeningKey, GAffine>,
    all_indices: &'a BTreeSet<OpeningKey>,
) -> F {
    let prefix = match &opening_key.node_id {
        NodeId::Prefix(p) => p,
        NodeId::Stem(_) => unreachable!("inner_child_value only called for Inner openings"),
    };
    let mut child_prefix = prefix.clone();
    child_prefix.push(subindex);
    let child_key = OpeningKey { kind: CommitmentKind::Inner, node_id: NodeId::Prefix(child_prefix) };
    if let Some(found) = all_indices.get(&child_key) {
        return crate::basis::commitment_to_field(&commitments_by_index[found]);
    }
    F::zero()
}

fn is_strictly_sorted(stems: &[Stem]) -> bool {
    stems.windows(2).all(|w| w[0] < w[1])
}

/// Binary search `other_stems` (sorted, checked by the caller) for an entry
/// whose first `prefix.len()` bytes match `prefix`. The DOS-vector fix: a
/// linear scan here would let a proof with a huge `other_stems` list burn
/// linear time per queried key.
fn binary_search_by_prefix(other_stems: &[Stem], prefix: &[u8]) -> Option<Stem> {
    let found = other_stems.partition_point(|s| &s.0[..prefix.len()] < prefix);
    other_stems.get(found).filter(|s| &s.0[..prefix.len()] == prefix).copied()
}
