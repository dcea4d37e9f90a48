pub mod operators;
pub mod spectrum;

pub use operators::OperatorVerifier;
pub use spectrum::SpectrumVerifier;

/// Outcome of a verifier: overall verdict plus one explanation line per check.
#[derive(Debug, Clone)]
pub struct VerificationReport {
    pub is_valid: bool,
    pub explanation: String,
}
