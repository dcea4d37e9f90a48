use std::fmt::Write;

use crate::eigen::EigenDecomposition;
use crate::verify::VerificationReport;

/// Non-panicking counterpart of the spectral-gap contract, plus ordering and null-space checks.
pub struct SpectrumVerifier;

impl SpectrumVerifier {
    pub fn verify(spectrum: &EigenDecomposition, tolerance: f64) -> VerificationReport {
        let values = spectrum.eigenvalues().as_slice();
        let mut explanation = String::new();
        let mut is_valid = true;

        let ascending = values.windows(2).all(|pair| pair[0] <= pair[1]);
        is_valid &= ascending;
        let _ = writeln!(explanation, "Eigenvalues ascending: {ascending}");

        let scale = values.last().map(|v| v.abs()).unwrap_or(0.0).max(1.0);
        if let Some(&first) = values.first() {
            let near_zero = first.abs() <= tolerance * scale;
            is_valid &= near_zero;
            let _ = writeln!(explanation, "First eigenvalue {first:.3e} ~ 0: {near_zero}");
        }

        if let Some(&second) = values.get(1) {
            let positive = second > tolerance * scale;
            is_valid &= positive;
            let _ = writeln!(explanation, "Second eigenvalue {second:.6e} > 0: {positive}");
            if let Some(&third) = values.get(2) {
                let separated = third > second;
                is_valid &= separated;
                let _ = writeln!(
                    explanation,
                    "Third eigenvalue {third:.6e} > second: {separated}"
                );
            }
        }

        VerificationReport {
            is_valid,
            explanation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{DMatrix, DVector};

    fn spectrum(values: Vec<f64>) -> EigenDecomposition {
        let k = values.len();
        EigenDecomposition::from_parts(DVector::from_vec(values), DMatrix::zeros(4, k), 4)
            .expect("spectrum")
    }

    #[test]
    fn separated_spectrum_passes() {
        let report = SpectrumVerifier::verify(&spectrum(vec![1e-14, 0.5, 0.8, 0.8]), 1e-8);
        assert!(report.is_valid, "{}", report.explanation);
    }

    #[test]
    fn repeated_and_disconnected_spectra_fail() {
        let repeated = SpectrumVerifier::verify(&spectrum(vec![0.0, 0.5, 0.5]), 1e-8);
        assert!(!repeated.is_valid);
        assert!(repeated.explanation.contains("Third eigenvalue"));

        let disconnected = SpectrumVerifier::verify(&spectrum(vec![0.0, 1e-13, 2.0]), 1e-8);
        assert!(!disconnected.is_valid);
    }
}
