//! Error types shared across the crate
//!
//! Two classes of failure, per the wire protocol's design:
//!
//! 1. **Proof rejection** ([`VerifyRejectReason`]) is a normal outcome, not
//!    an exceptional one: the verifier returns a terse reason code, never
//!    panics, and never leaves partial state.
//! 2. **Malformed inputs** ([`TrieError`], [`ProveError`]) are programmer
//!    errors (wrong key length, duplicated query keys) that fail fast.

/// Errors from trie mutation (`insert`) and lookup.
#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum TrieError {
    /// A key was not exactly [`crate::KEY_LENGTH`] bytes.
    #[error("key must be {expected} bytes, got {got}", expected = crate::KEY_LENGTH)]
    InvalidKeyLength {
        /// The length that was actually supplied.
        got: usize,
    },
}

/// Errors raised while building a proof, before any trie traversal happens.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ProveError {
    /// The same key appeared more than once in a query set.
    #[error("duplicate query key")]
    DuplicateQueryKey,
}

/// Why the outer verifier rejected a proof. Never constructed from a panic;
/// any arithmetic failure inside the IPA check (e.g. an inversion at a
/// degenerate point) also maps to [`VerifyRejectReason::IpaCheckFailed`]
/// rather than propagating a crash.
#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum VerifyRejectReason {
    /// An `extension_present` byte decoded to a value outside `{0,1,2}`.
    #[error("extension_present byte out of range")]
    BadExtensionPresent,
    /// A claimed value was not `absent` but the matching stem's
    /// `extension_present` was not `PRESENT`.
    #[error("claimed value present without a matching extension")]
    ValuePresentWithoutExtension,
    /// An `OTHERSTEM` entry could not be matched to any stem in
    /// `other_stems` or in the queried stems sharing its depth-byte prefix.
    #[error("otherstem could not be resolved")]
    OtherstemUnresolved,
    /// `commitments_sorted_by_index` did not have the length the verifier
    /// derived from the wire proof's metadata.
    #[error("commitment count mismatch")]
    CommitmentCountMismatch,
    /// The batched IPA multiproof check failed.
    #[error("ipa multiproof check failed")]
    IpaCheckFailed,
    /// The proof bytes could not be decoded into a well-formed [`crate::WireProof`].
    #[error("malformed proof")]
    MalformedProof,
}
