//! Verification Module
//!
//! Checks that the installed environment can actually import the
//! libraries the distribution promises.

pub mod verifier;

pub use verifier::{
    LibraryCheck, VerificationReport, VerificationResult, Verifier, EXPECTED_LIBRARIES,
    UNKNOWN_VERSION,
};
