//! Multiproof builder: turn a batch of queried keys into a [`WireProof`]
//!
//! Walks each queried key's path through the trie exactly once, collecting
//! every commitment a verifier would need to open (inner nodes along the
//! path, the extension node at the end of it, and — when the key's value is
//! actually present — the suffix-tree half that holds it), then hands the
//! deduplicated, sorted opening list to [`crate::multiproof::prove`].

#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};

use crate::error::ProveError;
use crate::multiproof;
use crate::proof::{DepthByte, ExtensionPresent, WireProof};
use crate::transcript::Transcript;
use crate::trie::{InnerNode, Key, Stem, SuffixNode, Trie};
use crate::trie::StemTerminal;
use crate::{GAffine, F};

/// The four kinds of commitment a proof can open, ordered exactly as
/// `INNER(0) < EXTENSION(1) < SUFFIX_C1(2) < SUFFIX_C2(3)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum CommitmentKind {
    Inner,
    Extension,
    SuffixC1,
    SuffixC2,
}

/// Which node a commitment belongs to: a byte prefix for inner nodes, a
/// full stem for extension/suffix-tree nodes.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum NodeId {
    Prefix(Vec<u8>),
    Stem(Stem),
}

/// The dedup/sort key every opening (and every wire commitment) is keyed by.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct OpeningKey {
    pub kind: CommitmentKind,
    pub node_id: NodeId,
}

enum ResolvedNode<'a> {
    Inner(&'a InnerNode),
    Extension(&'a SuffixNode),
    SuffixC1(&'a SuffixNode),
    SuffixC2(&'a SuffixNode),
}

impl<'a> ResolvedNode<'a> {
    fn commitment(&self) -> GAffine {
        match self {
            ResolvedNode::Inner(n) => n.commitment,
            ResolvedNode::Extension(s) => s.commitment,
            ResolvedNode::SuffixC1(s) => s.c1,
            ResolvedNode::SuffixC2(s) => s.c2,
        }
    }

    fn f_vector(&self) -> Vec<F> {
        match self {
            ResolvedNode::Inner(n) => n.evaluation_vector(),
            ResolvedNode::Extension(s) => s.extension_vector(),
            ResolvedNode::SuffixC1(s) => s.c1_vector(),
            ResolvedNode::SuffixC2(s) => s.c2_vector(),
        }
    }
}

/// Build a [`WireProof`] showing what `trie` holds (or doesn't) at each of
/// `keys`. Rejects duplicate keys before doing any trie traversal; building
/// a proof for the same key twice would silently double-count its openings.
pub fn build_proof(trie: &Trie, keys: &[Key]) -> Result<WireProof, ProveError> {
    let mut seen = BTreeSet::new();
    for key in keys {
        if !seen.insert(*key) {
            return Err(ProveError::DuplicateQueryKey);
        }
    }

    let distinct_stems: BTreeSet<Stem> = keys.iter().map(|k| k.stem()).collect();

    let mut nodes: BTreeMap<OpeningKey, ResolvedNode> = BTreeMap::new();
    let mut openings: BTreeSet<(OpeningKey, u8)> = BTreeSet::new();
    let mut depth_by_stem: BTreeMap<Stem, (u8, ExtensionPresent)> = BTreeMap::new();
    let mut found_suffix: BTreeMap<Stem, &SuffixNode> = BTreeMap::new();
    let mut other_stems_seen: BTreeSet<Stem> = BTreeSet::new();

    // Pass 1: per distinct stem, the inner-node path and how it terminates.
    // Depth and extension-presence are facts about the stem alone, so this
    // need only run once per stem even if several keys share it.
    for &stem in &distinct_stems {
        let path = trie.find_stem(&stem);
        let depth = path.inner_commitments.len();

        for i in 0..depth {
            let inner = trie.inner_along(&stem, i);
            let key = OpeningKey { kind: CommitmentKind::Inner, node_id: NodeId::Prefix(stem.0[..i].to_vec()) };
            nodes.entry(key.clone()).or_insert(ResolvedNode::Inner(inner));
            openings.insert((key, stem.0[i]));
        }

        match path.terminal {
            StemTerminal::Found(suf) => {
                depth_by_stem.insert(stem, (depth as u8, ExtensionPresent::Present));
                found_suffix.insert(stem, suf);
            }
            StemTerminal::OtherStem(other_stem) => {
                depth_by_stem.insert(stem, (depth as u8, ExtensionPresent::OtherStem));
                other_stems_seen.insert(*other_stem);
                if let StemTerminal::Found(other_suf) = trie.find_stem(other_stem).terminal {
                    let ext_key = OpeningKey { kind: CommitmentKind::Extension, node_id: NodeId::Stem(*other_stem) };
                    nodes.entry(ext_key.clone()).or_insert(ResolvedNode::Extension(other_suf));
                    openings.insert((ext_key.clone(), 0));
                    openings.insert((ext_key, 1));
                }
            }
            StemTerminal::Empty => {
                depth_by_stem.insert(stem, (depth as u8, ExtensionPresent::NoExtension));
            }
        }
    }

    // Pass 2: per key. A present extension's C1/C2 opening depends on the
    // key's own suffix byte, so two keys sharing a stem can need different
    // subindices of the same suffix-tree half.
    for key in keys {
        let stem = key.stem();
        if let Some(&suf) = found_suffix.get(&stem) {
            insert_extension_and_suffix_openings(&mut nodes, &mut openings, stem, suf, key.suffix());
        }
    }

    let stems_with_extension: BTreeSet<Stem> = depth_by_stem
        .iter()
        .filter(|(_, (_, ep))| *ep != ExtensionPresent::NoExtension)
        .map(|(s, _)| *s)
        .collect();
    let other_stems: Vec<Stem> = other_stems_seen.difference(&stems_with_extension).copied().collect();

    let depths: Vec<u8> = depth_by_stem
        .values()
        .map(|&(depth, ep)| DepthByte { depth, extension_present: ep }.pack())
        .collect();

    // Multiproof input lists, in the exact (kind, node_id, z) sort order.
    let mut cs = Vec::with_capacity(openings.len());
    let mut fs = Vec::with_capacity(openings.len());
    let mut zs = Vec::with_capacity(openings.len());
    let mut ys = Vec::with_capacity(openings.len());
    for (opening_key, z) in &openings {
        let resolved = &nodes[opening_key];
        let f = resolved.f_vector();
        cs.push(resolved.commitment());
        ys.push(f[*z as usize]);
        fs.push(f);
        zs.push(*z);
    }

    let pp = trie.params();
    let mut transcript = Transcript::new("verkle-trie.multiproof.v1");
    let (d, ipa_proof) = multiproof::prove(pp, &mut transcript, &cs, &fs, &zs, &ys);

    // Wire commitment list: every distinct touched node except the root
    // (kind Inner, empty prefix always sorts first and is the root itself).
    let commitments_sorted_by_index: Vec<GAffine> =
        nodes.values().skip(1).map(|n| n.commitment()).collect();

    Ok(WireProof { depths, other_stems, commitments_sorted_by_index, d, ipa_proof })
}

fn insert_extension_and_suffix_openings<'a>(
    nodes: &mut BTreeMap<OpeningKey, ResolvedNode<'a>>,
    openings: &mut BTreeSet<(OpeningKey, u8)>,
    stem: Stem,
    suf: &'a SuffixNode,
    suffix: u8,
) {
    let ext_key = OpeningKey { kind: CommitmentKind::Extension, node_id: NodeId::Stem(stem) };
    nodes.entry(ext_key.clone()).or_insert(ResolvedNode::Extension(suf));
    openings.insert((ext_key.clone(), 0));
    openings.insert((ext_key.clone(), 1));
    openings.insert((ext_key, 2 + suffix / 128));

    let (kind, local) = if suffix < 128 {
        (CommitmentKind::SuffixC1, suffix)
    } else {
        (CommitmentKind::SuffixC2, suffix - 128)
    };
    let suf_key = OpeningKey { kind, node_id: NodeId::Stem(stem) };
    let resolved = match kind {
        CommitmentKind::SuffixC1 => ResolvedNode::SuffixC1(suf),
        CommitmentKind::SuffixC2 => ResolvedNode::SuffixC2(suf),
        _ => unreachable!(),
    };
    nodes.entry(suf_key.clone()).or_insert(resolved);
    openings.insert((suf_key.clone(), local * 2));
    openings.insert((suf_key, local * 2 + 1));
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::basis::PublicParams;
    use crate::trie::Value;
    use crate::KEY_LENGTH;

    fn test_trie() -> Trie {
        Trie::new(Arc::new(PublicParams::deterministic(b"builder-test")))
    }

    fn value(byte: u8) -> Value {
        Value([byte; KEY_LENGTH])
    }

    #[test]
    fn colliding_stems_produce_two_present_depth_31_openings() {
        let mut trie = test_trie();
        let key_a = Key([0u8; KEY_LENGTH]);
        let mut b = [0u8; KEY_LENGTH];
        b[30] = 1;
        let key_b = Key(b);
        trie.insert(key_a, value(0xAA)).unwrap();
        trie.insert(key_b, value(0xBB)).unwrap();

        let proof = build_proof(&trie, &[key_a, key_b]).unwrap();

        let expected_byte = DepthByte { depth: 31, extension_present: ExtensionPresent::Present }.pack();
        assert_eq!(proof.depths, vec![expected_byte, expected_byte]);
        assert!(proof.other_stems.is_empty());
    }

    #[test]
    fn otherstem_query_reports_the_colliding_stem_at_depth_31() {
        let mut trie = test_trie();
        let key_a = Key([0u8; KEY_LENGTH]);
        trie.insert(key_a, value(0xAA)).unwrap();

        let mut e = [0u8; KEY_LENGTH];
        e[30] = 1;
        let key_e = Key(e);

        let proof = build_proof(&trie, &[key_e]).unwrap();

        let expected_byte = DepthByte { depth: 31, extension_present: ExtensionPresent::OtherStem }.pack();
        assert_eq!(proof.depths, vec![expected_byte]);
        assert_eq!(proof.other_stems, vec![key_a.stem()]);
    }

    #[test]
    fn absent_key_reports_depth_1_noextension() {
        let mut trie = test_trie();
        let key_a = Key([0u8; KEY_LENGTH]);
        let mut b = [0u8; KEY_LENGTH];
        b[30] = 1;
        let key_b = Key(b);
        trie.insert(key_a, value(0xAA)).unwrap();
        trie.insert(key_b, value(0xBB)).unwrap();

        let key_c = Key([0xFFu8; KEY_LENGTH]);
        let proof = build_proof(&trie, &[key_c]).unwrap();

        let expected_byte = DepthByte { depth: 1, extension_present: ExtensionPresent::NoExtension }.pack();
        assert_eq!(proof.depths, vec![expected_byte]);
        assert!(proof.other_stems.is_empty());
    }

    #[test]
    fn build_proof_rejects_duplicate_query_keys() {
        let mut trie = test_trie();
        let key_a = Key([0u8; KEY_LENGTH]);
        trie.insert(key_a, value(1)).unwrap();

        let result = build_proof(&trie, &[key_a, key_a]);
        assert_eq!(result.unwrap_err(), ProveError::DuplicateQueryKey);
    }
}
