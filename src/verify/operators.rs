use std::fmt::Write;

use crate::operators::LaplaceBeltrami;
use crate::verify::VerificationReport;

/// Structural checks on assembled operators: symmetry, zero row sums, diagonal nonnegative mass.
pub struct OperatorVerifier;

impl OperatorVerifier {
    /// `expected_area` is compared against the total mass when given; `tolerance` is relative.
    pub fn verify(
        operators: &LaplaceBeltrami,
        expected_area: Option<f64>,
        tolerance: f64,
    ) -> VerificationReport {
        let mut explanation = String::new();
        let mut is_valid = true;

        let stiffness_symmetric = operators.stiffness.is_symmetric();
        is_valid &= stiffness_symmetric;
        let _ = writeln!(explanation, "Stiffness bitwise symmetric: {stiffness_symmetric}");

        let scale = operators
            .stiffness
            .diagonal()
            .iter()
            .fold(0.0f64, |acc, d| acc.max(d.abs()))
            .max(f64::MIN_POSITIVE);
        let worst_row = operators
            .stiffness
            .row_sums()
            .iter()
            .fold(0.0f64, |acc, s| acc.max(s.abs()));
        let rows_ok = worst_row <= tolerance * scale;
        is_valid &= rows_ok;
        let _ = writeln!(
            explanation,
            "Max |row sum| {worst_row:.3e} <= {:.3e}: {rows_ok}",
            tolerance * scale
        );

        let mass_diagonal = operators.mass.is_diagonal();
        is_valid &= mass_diagonal;
        let _ = writeln!(explanation, "Mass diagonal: {mass_diagonal}");

        let masses = operators.mass.diagonal();
        let negative = masses.iter().filter(|m| **m < 0.0).count();
        is_valid &= negative == 0;
        let _ = writeln!(explanation, "Negative mass entries: {negative}");

        let symmetrized = operators.symmetrized.matrix.is_symmetric();
        is_valid &= symmetrized;
        let _ = writeln!(explanation, "Normalized operator bitwise symmetric: {symmetrized}");

        if let Some(area) = expected_area {
            let total: f64 = masses.iter().sum();
            let area_ok = (total - area).abs() <= tolerance * area.abs().max(f64::MIN_POSITIVE);
            is_valid &= area_ok;
            let _ = writeln!(
                explanation,
                "Total mass {total:.6} vs surface area {area:.6}: {area_ok}"
            );
        }

        VerificationReport {
            is_valid,
            explanation,
        }
    }
}
