//! Trie node types, insertion, commitment maintenance, lookup
//!
//! A Verkle trie is a 256-ary radix trie over 32-byte keys: the key's first
//! 31 bytes (its *stem*) select a path of [`InnerNode`]s, and the last byte
//! (its *suffix*) selects a slot inside the [`SuffixNode`] at the end of that
//! path. Every node carries a single Pedersen commitment over its children
//! (or, for a suffix node, over its two 128-value halves); the trie's
//! authenticity rests entirely on `root.commitment`.
//!
//! Two insertion paths are offered, a "fast bulk load" / "incremental
//! update" split:
//! - [`Trie::insert`] performs a full commitment-maintaining insert: every
//!   ancestor's commitment is updated by exactly the delta the new value
//!   introduces, in one pass from the leaf back to the root.
//! - [`Trie::insert_no_commitment`] only changes trie shape; commitments are
//!   left stale until a single [`Trie::compute_missing_commitments`] pass at
//!   the end, which is far cheaper when loading many keys at once.

#![forbid(unsafe_code)]

use std::sync::Arc;

use ark_ec::CurveGroup;
use ark_ff::{Field, PrimeField, Zero};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize, Compress, Read, SerializationError, Valid, Validate, Write};

use crate::basis::commitment_to_field;
use crate::{GAffine, PublicParams, F, KEY_LENGTH, STEM_LENGTH, WIDTH};

/// A 32-byte trie key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(pub [u8; KEY_LENGTH]);

/// A 32-byte stored value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Value(pub [u8; KEY_LENGTH]);

/// A key's first 31 bytes: the path an [`InnerNode`] chain routes on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Stem(pub [u8; STEM_LENGTH]);

impl Key {
    /// Build a key from a byte slice, rejecting anything but exactly
    /// [`KEY_LENGTH`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, crate::error::TrieError> {
        if bytes.len() != KEY_LENGTH {
            return Err(crate::error::TrieError::InvalidKeyLength { got: bytes.len() });
        }
        let mut buf = [0u8; KEY_LENGTH];
        buf.copy_from_slice(bytes);
        Ok(Key(buf))
    }

    /// The stem: this key's first [`STEM_LENGTH`] bytes.
    pub fn stem(&self) -> Stem {
        let mut buf = [0u8; STEM_LENGTH];
        buf.copy_from_slice(&self.0[..STEM_LENGTH]);
        Stem(buf)
    }

    /// The suffix: this key's last byte, selecting a slot within a suffix node.
    pub fn suffix(&self) -> u8 {
        self.0[KEY_LENGTH - 1]
    }
}

// Manual canonical ser/de, same pattern as other small fixed-size types in
// this codebase: a stem is a raw 31-byte array, not an arkworks primitive.
impl CanonicalSerialize for Stem {
    fn serialize_with_mode<W: Write>(&self, mut w: W, _cm: Compress) -> Result<(), SerializationError> {
        w.write_all(&self.0)?;
        Ok(())
    }
    fn serialized_size(&self, _cm: Compress) -> usize {
        STEM_LENGTH
    }
}
impl CanonicalDeserialize for Stem {
    fn deserialize_with_mode<R: Read>(mut r: R, _cm: Compress, _validate: Validate) -> Result<Self, SerializationError> {
        let mut buf = [0u8; STEM_LENGTH];
        r.read_exact(&mut buf)?;
        Ok(Stem(buf))
    }
}
impl Valid for Stem {
    fn check(&self) -> Result<(), SerializationError> {
        Ok(())
    }
}

impl Stem {
    /// The little-endian integer image of this stem, used as slot 1 of a
    /// suffix node's top-level commitment.
    pub(crate) fn to_field(self) -> F {
        F::from_le_bytes_mod_order(&self.0)
    }

    /// Reconstruct a full key by appending `suffix` to this stem.
    pub fn with_suffix(self, suffix: u8) -> Key {
        let mut buf = [0u8; KEY_LENGTH];
        buf[..STEM_LENGTH].copy_from_slice(&self.0);
        buf[STEM_LENGTH] = suffix;
        Key(buf)
    }
}

/// `(lower, upper)`: a 32-byte value split into two 16-byte field elements
/// for Pedersen commitment, with `lower`'s top bit (`+2^128`) marking the
/// slot as occupied — this is what lets an all-zero value be told apart
/// from an absent one.
pub(crate) fn value_slot_scalars(value: &Value) -> (F, F) {
    let presence_bit = F::from(2u64).pow([128u64]);
    let lower = F::from_le_bytes_mod_order(&value.0[..16]) + presence_bit;
    let upper = F::from_le_bytes_mod_order(&value.0[16..]);
    (lower, upper)
}

fn add_delta(commitment: GAffine, basis_point: GAffine, delta: F) -> GAffine {
    if delta.is_zero() {
        return commitment;
    }
    (commitment.into_group() + basis_point * delta).into_affine()
}

/// An inner (branching) node: up to [`WIDTH`] children, indexed by the
/// corresponding byte of the stem at this node's depth.
#[derive(Clone, Debug)]
pub struct InnerNode {
    children: Box<[Option<Node>; WIDTH]>,
    /// `Σᵢ children[i].commitment_field · Gᵢ`, 0 where a child is absent.
    pub commitment: GAffine,
    /// `commitment_to_field(commitment)`.
    pub commitment_field: F,
}

/// A suffix (extension) node: the 256 value slots belonging to one stem,
/// split into two 128-value halves each committed separately (`C1`, `C2`)
/// and folded into one top-level commitment.
#[derive(Clone, Debug)]
pub struct SuffixNode {
    pub stem: Stem,
    values: Box<[Option<Value>; WIDTH]>,
    pub c1: GAffine,
    pub c1_field: F,
    pub c2: GAffine,
    pub c2_field: F,
    pub commitment: GAffine,
    pub commitment_field: F,
}

/// A trie node: either an inner branch or a terminal suffix (extension) node.
#[derive(Clone, Debug)]
pub enum Node {
    Inner(Box<InnerNode>),
    Suffix(Box<SuffixNode>),
}

impl InnerNode {
    fn empty() -> Self {
        let commitment = GAffine::zero();
        let commitment_field = commitment_to_field(&commitment);
        InnerNode { children: Box::new(std::array::from_fn(|_| None)), commitment, commitment_field }
    }

    /// Child at index `i`, if present.
    pub fn child(&self, i: u8) -> Option<&Node> {
        self.children[i as usize].as_ref()
    }

    /// This node's evaluation-form polynomial: `f[i] = children[i]`'s
    /// commitment field, `0` where a child is absent. What a multiproof
    /// opening of this node's commitment is an opening of.
    pub(crate) fn evaluation_vector(&self) -> Vec<F> {
        (0..WIDTH)
            .map(|i| self.children[i].as_ref().map(|c| c.commitment_field()).unwrap_or(F::zero()))
            .collect()
    }

    fn set_child_and_propagate(&mut self, pp: &PublicParams, index: u8, new_field: F, old_field: F) {
        self.commitment = add_delta(self.commitment, pp.basis[index as usize], new_field - old_field);
        self.commitment_field = commitment_to_field(&self.commitment);
    }

    /// Recompute this node's commitment from its children's commitment
    /// fields, recursing into any child that doesn't have one yet: the bulk
    /// "add missing commitments" pass.
    pub fn compute_missing_commitments(&mut self, pp: &PublicParams) {
        let mut entries = Vec::new();
        for i in 0..WIDTH {
            if let Some(child) = self.children[i].as_mut() {
                match child {
                    Node::Inner(inner) => inner.compute_missing_commitments(pp),
                    Node::Suffix(suffix) => suffix.compute_missing_commitments(pp),
                }
                entries.push((i, child.commitment_field()));
            }
        }
        self.commitment = pp.pedersen_commit_sparse(entries.into_iter());
        self.commitment_field = commitment_to_field(&self.commitment);
    }
}

impl Node {
    fn commitment_field(&self) -> F {
        match self {
            Node::Inner(n) => n.commitment_field,
            Node::Suffix(n) => n.commitment_field,
        }
    }
}

/// Sparse Pedersen-commit entries for one 128-value half of a suffix node's
/// storage (`C1` covers suffixes `0..128`, `C2` covers `128..256`).
fn half_entries(values: &[Option<Value>; WIDTH], lo: usize, hi: usize) -> Vec<(usize, F)> {
    let mut entries = Vec::new();
    for i in lo..hi {
        if let Some(v) = &values[i] {
            let (lower, upper) = value_slot_scalars(v);
            let local = (i - lo) * 2;
            entries.push((local, lower));
            entries.push((local + 1, upper));
        }
    }
    entries
}

/// The length-[`WIDTH`] evaluation vector for one 128-value half of a
/// suffix node's storage, packed two field elements per value slot.
fn half_vector(values: &[Option<Value>; WIDTH], lo: usize, hi: usize) -> Vec<F> {
    let mut f = vec![F::zero(); WIDTH];
    for i in lo..hi {
        if let Some(v) = &values[i] {
            let (lower, upper) = value_slot_scalars(v);
            let local = (i - lo) * 2;
            f[local] = lower;
            f[local + 1] = upper;
        }
    }
    f
}

fn suffix_commitments(
    pp: &PublicParams,
    stem: Stem,
    values: &[Option<Value>; WIDTH],
) -> (GAffine, F, GAffine, F, GAffine, F) {
    let c1 = pp.pedersen_commit_sparse(half_entries(values, 0, WIDTH / 2).into_iter());
    let c2 = pp.pedersen_commit_sparse(half_entries(values, WIDTH / 2, WIDTH).into_iter());
    let c1_field = commitment_to_field(&c1);
    let c2_field = commitment_to_field(&c2);
    let commitment = pp.pedersen_commit_sparse(
        [(0usize, F::from(1u64)), (1, stem.to_field()), (2, c1_field), (3, c2_field)].into_iter(),
    );
    let commitment_field = commitment_to_field(&commitment);
    (c1, c1_field, c2, c2_field, commitment, commitment_field)
}

impl SuffixNode {
    fn new_with_single_value(pp: &PublicParams, stem: Stem, suffix: u8, value: Value) -> Self {
        let mut values: Box<[Option<Value>; WIDTH]> = Box::new(std::array::from_fn(|_| None));
        values[suffix as usize] = Some(value);
        let (c1, c1_field, c2, c2_field, commitment, commitment_field) = suffix_commitments(pp, stem, &values);
        SuffixNode { stem, values, c1, c1_field, c2, c2_field, commitment, commitment_field }
    }

    /// The stored value at `suffix`, if any.
    pub fn value(&self, suffix: u8) -> Option<&Value> {
        self.values[suffix as usize].as_ref()
    }

    /// This node's extension-level evaluation vector: `[1, stem, C1, C2, 0, ...]`.
    pub(crate) fn extension_vector(&self) -> Vec<F> {
        let mut f = vec![F::zero(); WIDTH];
        f[0] = F::from(1u64);
        f[1] = self.stem.to_field();
        f[2] = self.c1_field;
        f[3] = self.c2_field;
        f
    }

    /// `C1`'s evaluation vector: slots `0..128` packed two-per-value as
    /// `(lower+marker, upper)`, zero where the slot is unwritten.
    pub(crate) fn c1_vector(&self) -> Vec<F> {
        half_vector(&self.values, 0, WIDTH / 2)
    }

    /// `C2`'s evaluation vector: slots `128..256`, same packing as [`SuffixNode::c1_vector`].
    pub(crate) fn c2_vector(&self) -> Vec<F> {
        half_vector(&self.values, WIDTH / 2, WIDTH)
    }

    fn compute_missing_commitments(&mut self, pp: &PublicParams) {
        let (c1, c1_field, c2, c2_field, commitment, commitment_field) = suffix_commitments(pp, self.stem, &self.values);
        self.c1 = c1;
        self.c1_field = c1_field;
        self.c2 = c2;
        self.c2_field = c2_field;
        self.commitment = commitment;
        self.commitment_field = commitment_field;
    }

    /// Set `suffix`'s value, updating `C1`/`C2`/`commitment` by exactly the
    /// delta the change introduces (no full recomputation).
    fn set_value(&mut self, pp: &PublicParams, suffix: u8, value: Value) {
        let (new_lower, new_upper) = value_slot_scalars(&value);
        let (old_lower, old_upper) = match &self.values[suffix as usize] {
            Some(old) => value_slot_scalars(old),
            None => (F::zero(), F::zero()),
        };
        self.values[suffix as usize] = Some(value);

        let local = (suffix as usize % (WIDTH / 2)) * 2;
        let (half_commitment, half_field, basis_slot): (&mut GAffine, &mut F, usize) = if suffix < (WIDTH / 2) as u8 {
            (&mut self.c1, &mut self.c1_field, 2)
        } else {
            (&mut self.c2, &mut self.c2_field, 3)
        };

        *half_commitment = add_delta(*half_commitment, pp.basis[local], new_lower - old_lower);
        *half_commitment = add_delta(*half_commitment, pp.basis[local + 1], new_upper - old_upper);
        let new_half_field = commitment_to_field(half_commitment);
        self.commitment = add_delta(self.commitment, pp.basis[basis_slot], new_half_field - *half_field);
        *half_field = new_half_field;
        self.commitment_field = commitment_to_field(&self.commitment);
    }
}

/// The outcome of locating a stem: either its suffix node, a different
/// stem occupying the slot it would live in, or empty space.
pub enum StemTerminal<'a> {
    Found(&'a SuffixNode),
    OtherStem(&'a Stem),
    Empty,
}

/// The result of walking a stem down from the root: the commitments of
/// every inner node on the path (outermost first) and how the walk ended.
pub struct StemPath<'a> {
    pub inner_commitments: Vec<GAffine>,
    pub terminal: StemTerminal<'a>,
}

/// An authenticated key→value map keyed by 32-byte keys, rooted in a single
/// Pedersen commitment. Not safe for concurrent mutation: callers must
/// serialize inserts against proving/verifying the same trie.
#[derive(Clone, Debug)]
pub struct Trie {
    root: InnerNode,
    params: Arc<PublicParams>,
}

impl Trie {
    /// An empty trie under the given public parameters.
    pub fn new(params: Arc<PublicParams>) -> Self {
        Trie { root: InnerNode::empty(), params }
    }

    /// The trie's single root commitment.
    pub fn root_commitment(&self) -> GAffine {
        self.root.commitment
    }

    /// The public parameters this trie was built under.
    pub fn params(&self) -> &Arc<PublicParams> {
        &self.params
    }

    /// Insert `value` at `key`, updating every ancestor commitment along the
    /// path by exactly the delta this change introduces.
    pub fn insert(&mut self, key: Key, value: Value) -> Result<(), crate::error::TrieError> {
        let stem = key.stem();
        let suffix = key.suffix();
        insert_recursive(&mut self.root, &self.params, stem, suffix, value, 0);
        Ok(())
    }

    /// Insert `value` at `key` without touching any commitment. Use together
    /// with [`Trie::compute_missing_commitments`] when loading many keys: one
    /// bulk commitment pass at the end is far cheaper than one delta update
    /// per key.
    pub fn insert_no_commitment(&mut self, key: Key, value: Value) -> Result<(), crate::error::TrieError> {
        let stem = key.stem();
        let suffix = key.suffix();
        insert_no_commitment_recursive(&mut self.root, stem, suffix, value, 0);
        Ok(())
    }

    /// Recompute every stale commitment left behind by
    /// [`Trie::insert_no_commitment`].
    pub fn compute_missing_commitments(&mut self) {
        self.root.compute_missing_commitments(&self.params);
    }

    /// Look up `key`'s value, if present.
    pub fn lookup(&self, key: &Key) -> Option<Value> {
        let stem = key.stem();
        let suffix = key.suffix();
        let mut node = &self.root;
        for depth in 0..STEM_LENGTH {
            match node.child(stem.0[depth])? {
                Node::Inner(inner) => node = inner,
                Node::Suffix(suf) => {
                    return if suf.stem == stem { suf.value(suffix).copied() } else { None };
                }
            }
        }
        None
    }

    /// Walk `stem` down from the root, collecting every inner-node
    /// commitment visited and how the walk ended. Used by the multiproof
    /// builder to reconstruct the exact opening set for a query.
    pub fn find_stem(&self, stem: &Stem) -> StemPath<'_> {
        let mut inner_commitments = Vec::new();
        let mut node = &self.root;
        for depth in 0..STEM_LENGTH {
            inner_commitments.push(node.commitment);
            match node.child(stem.0[depth]) {
                None => return StemPath { inner_commitments, terminal: StemTerminal::Empty },
                Some(Node::Inner(inner)) => node = inner,
                Some(Node::Suffix(suf)) => {
                    let terminal = if suf.stem == *stem {
                        StemTerminal::Found(suf)
                    } else {
                        StemTerminal::OtherStem(&suf.stem)
                    };
                    return StemPath { inner_commitments, terminal };
                }
            }
        }
        unreachable!("a stem chain longer than STEM_LENGTH inner nodes is impossible")
    }

    /// The [`InnerNode`] reached after following `stem` for `depth` steps
    /// from the root. `depth` must not exceed the number of inner nodes
    /// [`Trie::find_stem`] reports for some stem sharing this prefix.
    pub(crate) fn inner_along(&self, stem: &Stem, depth: usize) -> &InnerNode {
        let mut node = &self.root;
        for i in 0..depth {
            match node.child(stem.0[i]) {
                Some(Node::Inner(inner)) => node = inner,
                _ => unreachable!("inner_along called with a depth beyond the actual inner-node chain"),
            }
        }
        node
    }

    /// Debug-only recursive invariant check: recomputes every commitment
    /// from scratch and asserts it matches what's stored, returning every
    /// key/value pair found. Used only by tests.
    #[cfg(test)]
    pub fn check_valid(&self) -> std::collections::BTreeMap<Key, Value> {
        let mut out = std::collections::BTreeMap::new();
        check_valid_inner(&self.root, &self.params, &mut out);
        out
    }
}

fn insert_recursive(node: &mut InnerNode, pp: &PublicParams, stem: Stem, suffix: u8, value: Value, depth: usize) {
    let index = stem.0[depth];
    match node.children[index as usize].take() {
        None => {
            let suf = SuffixNode::new_with_single_value(pp, stem, suffix, value);
            let new_field = suf.commitment_field;
            node.children[index as usize] = Some(Node::Suffix(Box::new(suf)));
            node.set_child_and_propagate(pp, index, new_field, F::zero());
        }
        Some(Node::Suffix(mut suf)) => {
            if suf.stem == stem {
                let old_field = suf.commitment_field;
                suf.set_value(pp, suffix, value);
                let new_field = suf.commitment_field;
                node.children[index as usize] = Some(Node::Suffix(suf));
                node.set_child_and_propagate(pp, index, new_field, old_field);
            } else {
                let old_field = suf.commitment_field;
                let new_inner = split_chain(pp, stem, suffix, value, *suf, depth + 1);
                let new_field = new_inner.commitment_field;
                node.children[index as usize] = Some(Node::Inner(Box::new(new_inner)));
                node.set_child_and_propagate(pp, index, new_field, old_field);
            }
        }
        Some(Node::Inner(mut inner)) => {
            let old_field = inner.commitment_field;
            insert_recursive(&mut inner, pp, stem, suffix, value, depth + 1);
            let new_field = inner.commitment_field;
            node.children[index as usize] = Some(Node::Inner(inner));
            node.set_child_and_propagate(pp, index, new_field, old_field);
        }
    }
}

/// Build the chain of inner nodes needed to separate `stem` (carrying
/// `value` at `suffix`) from `old_suffix` below `depth`, continuing past
/// however many bytes the two stems happen to share.
fn split_chain(pp: &PublicParams, stem: Stem, suffix: u8, value: Value, old_suffix: SuffixNode, depth: usize) -> InnerNode {
    let old_stem = old_suffix.stem;
    let mut inner = InnerNode::empty();
    if old_stem.0[depth] == stem.0[depth] {
        let child = split_chain(pp, stem, suffix, value, old_suffix, depth + 1);
        inner.children[stem.0[depth] as usize] = Some(Node::Inner(Box::new(child)));
    } else {
        let new_suf = SuffixNode::new_with_single_value(pp, stem, suffix, value);
        inner.children[stem.0[depth] as usize] = Some(Node::Suffix(Box::new(new_suf)));
        inner.children[old_stem.0[depth] as usize] = Some(Node::Suffix(Box::new(old_suffix)));
    }
    inner.compute_missing_commitments(pp);
    inner
}

fn new_suffix_shell(stem: Stem, suffix: u8, value: Value) -> SuffixNode {
    let mut values: Box<[Option<Value>; WIDTH]> = Box::new(std::array::from_fn(|_| None));
    values[suffix as usize] = Some(value);
    SuffixNode {
        stem,
        values,
        c1: GAffine::zero(),
        c1_field: F::zero(),
        c2: GAffine::zero(),
        c2_field: F::zero(),
        commitment: GAffine::zero(),
        commitment_field: F::zero(),
    }
}

fn insert_no_commitment_recursive(node: &mut InnerNode, stem: Stem, suffix: u8, value: Value, depth: usize) {
    let index = stem.0[depth];
    match node.children[index as usize].take() {
        None => {
            node.children[index as usize] = Some(Node::Suffix(Box::new(new_suffix_shell(stem, suffix, value))));
        }
        Some(Node::Suffix(mut suf)) => {
            if suf.stem == stem {
                suf.values[suffix as usize] = Some(value);
                node.children[index as usize] = Some(Node::Suffix(suf));
            } else {
                let old_stem = suf.stem;
                let mut new_inner = InnerNode::empty();
                let mut cursor_depth = depth;
                let mut current = &mut new_inner;
                while old_stem.0[cursor_depth] == stem.0[cursor_depth] {
                    let cursor_index = stem.0[cursor_depth];
                    current.children[cursor_index as usize] = Some(Node::Inner(Box::new(InnerNode::empty())));
                    current = match current.children[cursor_index as usize].as_mut().unwrap() {
                        Node::Inner(n) => n,
                        _ => unreachable!(),
                    };
                    cursor_depth += 1;
                }
                current.children[stem.0[cursor_depth] as usize] =
                    Some(Node::Suffix(Box::new(new_suffix_shell(stem, suffix, value))));
                current.children[old_stem.0[cursor_depth] as usize] = Some(Node::Suffix(suf));
                node.children[index as usize] = Some(Node::Inner(Box::new(new_inner)));
            }
        }
        Some(Node::Inner(mut inner)) => {
            insert_no_commitment_recursive(&mut inner, stem, suffix, value, depth + 1);
            node.children[index as usize] = Some(Node::Inner(inner));
        }
    }
}

#[cfg(test)]
fn check_valid_inner(node: &InnerNode, pp: &PublicParams, out: &mut std::collections::BTreeMap<Key, Value>) {
    let mut entries = Vec::new();
    for i in 0..WIDTH {
        if let Some(child) = node.children[i].as_ref() {
            entries.push((i, child.commitment_field()));
        }
    }
    let commitment = pp.pedersen_commit_sparse(entries.into_iter());
    assert_eq!(node.commitment, commitment, "inner node commitment diverged from its children");
    assert_eq!(node.commitment_field, commitment_to_field(&commitment));

    for i in 0..WIDTH {
        match node.children[i].as_ref() {
            Some(Node::Inner(inner)) => check_valid_inner(inner, pp, out),
            Some(Node::Suffix(suf)) => check_valid_suffix(suf, pp, out),
            None => {}
        }
    }
}

#[cfg(test)]
fn check_valid_suffix(node: &SuffixNode, pp: &PublicParams, out: &mut std::collections::BTreeMap<Key, Value>) {
    let (c1, c1_field, c2, c2_field, commitment, commitment_field) = suffix_commitments(pp, node.stem, &node.values);
    assert_eq!(node.c1, c1);
    assert_eq!(node.c1_field, c1_field);
    assert_eq!(node.c2, c2);
    assert_eq!(node.c2_field, c2_field);
    assert_eq!(node.commitment, commitment);
    assert_eq!(node.commitment_field, commitment_field);

    for i in 0..WIDTH {
        if let Some(v) = &node.values[i] {
            out.insert(node.stem.with_suffix(i as u8), *v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_trie() -> Trie {
        Trie::new(Arc::new(PublicParams::deterministic(b"trie-test")))
    }

    fn key(byte: u8) -> Key {
        let mut bytes = [0u8; KEY_LENGTH];
        bytes[0] = byte;
        Key(bytes)
    }

    fn value(byte: u8) -> Value {
        let mut bytes = [0u8; KEY_LENGTH];
        bytes[0] = byte;
        Value(bytes)
    }

    #[test]
    fn empty_trie_has_no_values() {
        let t = test_trie();
        assert_eq!(t.lookup(&key(1)), None);
    }

    #[test]
    fn insert_then_lookup_roundtrips() {
        let mut t = test_trie();
        t.insert(key(5), value(42)).unwrap();
        assert_eq!(t.lookup(&key(5)), Some(value(42)));
        assert_eq!(t.lookup(&key(6)), None);
        t.check_valid();
    }

    #[test]
    fn overwrite_updates_value_and_commitment() {
        let mut t = test_trie();
        t.insert(key(5), value(1)).unwrap();
        let c1 = t.root_commitment();
        t.insert(key(5), value(2)).unwrap();
        let c2 = t.root_commitment();
        assert_ne!(c1, c2);
        assert_eq!(t.lookup(&key(5)), Some(value(2)));
        t.check_valid();
    }

    #[test]
    fn colliding_stems_split_correctly() {
        let mut t = test_trie();
        // Two keys sharing a stem, differing only in the suffix byte.
        let mut a = [0u8; KEY_LENGTH];
        a[0] = 9;
        a[31] = 1;
        let mut b = [0u8; KEY_LENGTH];
        b[0] = 9;
        b[31] = 2;
        t.insert(Key(a), value(11)).unwrap();
        t.insert(Key(b), value(22)).unwrap();
        assert_eq!(t.lookup(&Key(a)), Some(value(11)));
        assert_eq!(t.lookup(&Key(b)), Some(value(22)));
        t.check_valid();
    }

    #[test]
    fn diverging_stems_split_into_a_new_inner_node() {
        let mut t = test_trie();
        let mut a = [0u8; KEY_LENGTH];
        a[0] = 1;
        a[1] = 2;
        let mut b = [0u8; KEY_LENGTH];
        b[0] = 1;
        b[1] = 3;
        t.insert(Key(a), value(11)).unwrap();
        t.insert(Key(b), value(22)).unwrap();
        assert_eq!(t.lookup(&Key(a)), Some(value(11)));
        assert_eq!(t.lookup(&Key(b)), Some(value(22)));
        t.check_valid();
    }

    #[test]
    fn bulk_build_matches_incremental_build() {
        let pp = Arc::new(PublicParams::deterministic(b"trie-test"));
        let mut incremental = Trie::new(pp.clone());
        let mut bulk = Trie::new(pp);

        let pairs: Vec<(Key, Value)> = (0..64u8)
            .map(|i| {
                let mut k = [0u8; KEY_LENGTH];
                k[0] = i;
                k[1] = i.wrapping_mul(7);
                (Key(k), value(i))
            })
            .collect();

        for (k, v) in &pairs {
            incremental.insert(*k, *v).unwrap();
            bulk.insert_no_commitment(*k, *v).unwrap();
        }
        bulk.compute_missing_commitments();

        assert_eq!(incremental.root_commitment(), bulk.root_commitment());
        for (k, v) in &pairs {
            assert_eq!(bulk.lookup(k), Some(*v));
        }
        incremental.check_valid();
        bulk.check_valid();
    }

    #[test]
    fn reinserting_the_same_pair_is_a_no_op() {
        let mut t = test_trie();
        t.insert(key(3), value(7)).unwrap();
        let c1 = t.root_commitment();
        t.insert(key(3), value(7)).unwrap();
        let c2 = t.root_commitment();
        assert_eq!(c1, c2);
        t.check_valid();
    }

    proptest! {
        /// P1: a bulk build (insert_no_commitment + one recompute pass)
        /// reaches the same root as an incremental, per-key build, for any
        /// insertion sequence.
        #[test]
        fn bulk_and_incremental_builds_agree(
            pairs in proptest::collection::vec((0u8..32, 0u8..8, any::<u8>()), 1..40)
        ) {
            let pp = Arc::new(PublicParams::deterministic(b"trie-proptest"));
            let mut incremental = Trie::new(pp.clone());
            let mut bulk = Trie::new(pp);
            let mut model = std::collections::BTreeMap::new();

            for (stem_byte, suffix, value_byte) in pairs {
                let mut k = [0u8; KEY_LENGTH];
                k[0] = stem_byte;
                k[31] = suffix;
                let key = Key(k);
                let value = value(value_byte);
                incremental.insert(key, value).unwrap();
                bulk.insert_no_commitment(key, value).unwrap();
                model.insert(key, value);
            }
            bulk.compute_missing_commitments();

            prop_assert_eq!(incremental.root_commitment(), bulk.root_commitment());
            for (k, v) in &model {
                prop_assert_eq!(incremental.lookup(k), Some(*v));
            }
        }

        /// P2: inserting the same (key, value) pair twice is idempotent.
        #[test]
        fn reinsert_idempotence(stem_byte in 0u8..32, suffix in any::<u8>(), value_byte in any::<u8>()) {
            let mut k = [0u8; KEY_LENGTH];
            k[0] = stem_byte;
            k[31] = suffix;
            let key = Key(k);
            let value = value(value_byte);

            let mut once = test_trie();
            once.insert(key, value).unwrap();

            let mut twice = test_trie();
            twice.insert(key, value).unwrap();
            twice.insert(key, value).unwrap();

            prop_assert_eq!(once.root_commitment(), twice.root_commitment());
        }

        /// P3: overwriting (k, v1) with (k, v2) reaches the same root as
        /// inserting (k, v2) directly.
        #[test]
        fn overwrite_matches_direct_insert(
            stem_byte in 0u8..32, suffix in any::<u8>(), v1 in any::<u8>(), v2 in any::<u8>()
        ) {
            let key = {
                let mut k = [0u8; KEY_LENGTH];
                k[0] = stem_byte;
                k[31] = suffix;
                Key(k)
            };

            let mut overwritten = test_trie();
            overwritten.insert(key, value(v1)).unwrap();
            overwritten.insert(key, value(v2)).unwrap();

            let mut direct = test_trie();
            direct.insert(key, value(v2)).unwrap();

            prop_assert_eq!(overwritten.root_commitment(), direct.root_commitment());
        }

        /// P4: after any insertion sequence, every stored key is reachable
        /// through exactly the path its own stem encodes, and the recomputed
        /// commitments match what's stored everywhere in the tree.
        #[test]
        fn every_insert_sequence_is_internally_consistent(
            pairs in proptest::collection::vec((0u8..32, 0u8..4, any::<u8>()), 1..30)
        ) {
            let mut t = test_trie();
            let mut model = std::collections::BTreeMap::new();
            for (stem_byte, suffix, value_byte) in pairs {
                let mut k = [0u8; KEY_LENGTH];
                k[0] = stem_byte;
                k[31] = suffix;
                let key = Key(k);
                let value = value(value_byte);
                t.insert(key, value).unwrap();
                model.insert(key, value);
            }
            let found = t.check_valid();
            prop_assert_eq!(found, model);
        }
    }
}
