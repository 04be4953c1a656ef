//! Wire proof format
//!
//! A [`WireProof`] is everything a verifier needs besides the root
//! commitment, the queried keys, and their claimed values: per-stem depth
//! and extension metadata, the "other stem" collisions a verifier can't
//! derive on its own, the deduplicated commitment list, and the single IPA
//! multiproof tying it all together.

use ark_serialize::{CanonicalDeserialize, CanonicalSerialize, Compress, Read, SerializationError, Valid, Validate, Write};

use crate::ipa::IpaProof;
use crate::trie::Stem;
use crate::GAffine;

/// Whether a queried stem's extension node was found, found-but-foreign
/// (`OtherStem`), or never written at all.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtensionPresent {
    /// No extension node anywhere along this stem's path: the key was
    /// never written.
    NoExtension = 0,
    /// The extension node at the end of this stem's path is this stem's own.
    Present = 1,
    /// The path ends at an extension node belonging to a *different* stem.
    OtherStem = 2,
}

impl ExtensionPresent {
    fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(ExtensionPresent::NoExtension),
            1 => Some(ExtensionPresent::Present),
            2 => Some(ExtensionPresent::OtherStem),
            _ => None,
        }
    }
}

/// One stem's packed depth/extension-presence byte: bits 0-4 the depth
/// (`0..=31`), bits 5-6 the [`ExtensionPresent`] tag, bit 7 reserved and
/// required to be zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DepthByte {
    pub depth: u8,
    pub extension_present: ExtensionPresent,
}

impl DepthByte {
    pub fn pack(self) -> u8 {
        (self.depth & 0x1F) | ((self.extension_present as u8) << 5)
    }

    pub fn unpack(byte: u8) -> Result<Self, crate::error::VerifyRejectReason> {
        if byte & 0x80 != 0 {
            return Err(crate::error::VerifyRejectReason::MalformedProof);
        }
        let depth = byte & 0x1F;
        let extension_present = ExtensionPresent::from_bits((byte >> 5) & 0x3)
            .ok_or(crate::error::VerifyRejectReason::BadExtensionPresent)?;
        Ok(DepthByte { depth, extension_present })
    }
}

/// A complete, self-contained membership/non-membership proof for a batch
/// of keys against one root commitment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WireProof {
    /// One packed [`DepthByte`] per distinct queried stem, sorted by stem.
    pub depths: Vec<u8>,
    /// Stems encountered as "foreign" extension occupants, sorted and
    /// deduplicated, excluding any stem already covered by the query set.
    pub other_stems: Vec<Stem>,
    /// Every distinct non-root commitment touched by the proof, sorted by
    /// `(CommitmentKind, prefix-or-stem)`. The root itself is never included
    /// — the verifier already has it.
    pub commitments_sorted_by_index: Vec<GAffine>,
    /// The multiproof's aggregated quotient commitment.
    pub d: GAffine,
    /// The single-polynomial IPA proof closing out the multiproof.
    pub ipa_proof: IpaProof,
}

impl CanonicalSerialize for WireProof {
    fn serialize_with_mode<W: Write>(&self, mut w: W, cm: Compress) -> Result<(), SerializationError> {
        self.depths.serialize_with_mode(&mut w, cm)?;
        self.other_stems.serialize_with_mode(&mut w, cm)?;
        self.commitments_sorted_by_index.serialize_with_mode(&mut w, cm)?;
        self.d.serialize_with_mode(&mut w, cm)?;
        self.ipa_proof.serialize_with_mode(&mut w, cm)
    }

    fn serialized_size(&self, cm: Compress) -> usize {
        self.depths.serialized_size(cm)
            + self.other_stems.serialized_size(cm)
            + self.commitments_sorted_by_index.serialized_size(cm)
            + self.d.serialized_size(cm)
            + self.ipa_proof.serialized_size(cm)
    }
}

impl Valid for WireProof {
    fn check(&self) -> Result<(), SerializationError> {
        self.depths.check()?;
        self.other_stems.check()?;
        self.commitments_sorted_by_index.check()?;
        self.d.check()?;
        self.ipa_proof.check()
    }
}

impl CanonicalDeserialize for WireProof {
    fn deserialize_with_mode<R: Read>(mut r: R, cm: Compress, validate: Validate) -> Result<Self, SerializationError> {
        Ok(WireProof {
            depths: Vec::<u8>::deserialize_with_mode(&mut r, cm, validate)?,
            other_stems: Vec::<Stem>::deserialize_with_mode(&mut r, cm, validate)?,
            commitments_sorted_by_index: Vec::<GAffine>::deserialize_with_mode(&mut r, cm, validate)?,
            d: GAffine::deserialize_with_mode(&mut r, cm, validate)?,
            ipa_proof: IpaProof::deserialize_with_mode(&mut r, cm, validate)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::basis::PublicParams;
    use crate::trie::{Key, Trie, Value};
    use crate::KEY_LENGTH;

    #[test]
    fn wire_proof_round_trips_through_serialization() {
        let pp = Arc::new(PublicParams::deterministic(b"proof-test"));
        let mut trie = Trie::new(pp);
        let mut key_bytes = [0u8; KEY_LENGTH];
        key_bytes[0] = 7;
        let k = Key(key_bytes);
        trie.insert(k, Value([9u8; KEY_LENGTH])).unwrap();

        let proof = crate::builder::build_proof(&trie, &[k]).unwrap();

        let mut bytes = Vec::new();
        proof.serialize_compressed(&mut bytes).unwrap();
        let decoded = WireProof::deserialize_compressed(&bytes[..]).unwrap();
        assert_eq!(proof, decoded);
    }

    #[test]
    fn depth_byte_round_trips_every_valid_combination() {
        for depth in 0u8..32 {
            for ep in [ExtensionPresent::NoExtension, ExtensionPresent::Present, ExtensionPresent::OtherStem] {
                let db = DepthByte { depth, extension_present: ep };
                let unpacked = DepthByte::unpack(db.pack()).unwrap();
                assert_eq!(unpacked, db);
            }
        }
    }

    #[test]
    fn reserved_bit_is_rejected() {
        assert!(DepthByte::unpack(0x80).is_err());
    }

    #[test]
    fn invalid_extension_present_tag_is_rejected() {
        // bits 5-6 == 3 is not a valid ExtensionPresent tag.
        assert!(DepthByte::unpack(0b0110_0000).is_err());
    }
}
