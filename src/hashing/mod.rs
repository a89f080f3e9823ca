//! Content hashing for fairtrail
//!
//! Every digest in the system (decision content hashes, receipt leaves,
//! Merkle nodes) is produced here. Structured values are canonicalised
//! before hashing so that equal values always produce equal digests,
//! whatever order their keys were inserted in.

pub mod canonical;
mod digest;
mod errors;

pub use canonical::{format_number, to_canonical_string};
pub use digest::{
    digest, digest_serializable, digests_equal, is_digest, sha256_hex, DigestInput,
};
pub use errors::{HashingError, HashingResult};
