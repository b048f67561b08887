//! Fixed-width key, signature, and digest material.
//!
//! These are treated as opaque bytes of a protocol-fixed length. Nothing here validates that a
//! key is on a curve or that a signature verifies; that's left to the crypto layer.

fixed_blob!(
    /// A SHA-256 digest, used for chain, block, and transaction IDs.
    Checksum256,
    32
);

fixed_blob!(
    /// A public key: one curve-type byte followed by a 33-byte compressed point.
    PublicKey,
    34
);

fixed_blob!(
    /// A signature: one curve-type byte followed by a 65-byte compact recoverable signature.
    Signature,
    66
);
