use serde::{Deserialize, Serialize};

/// Counters for conditions that degrade the result without aborting the computation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub degenerate_contributions: usize,
    pub zero_area_vertices: usize,
    pub clamped_eigenpairs: usize,
    pub unconverged_eigenpairs: usize,
}

impl Diagnostics {
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }

    pub fn combine(mut self, other: Self) -> Self {
        self.degenerate_contributions += other.degenerate_contributions;
        self.zero_area_vertices += other.zero_area_vertices;
        self.clamped_eigenpairs += other.clamped_eigenpairs;
        self.unconverged_eigenpairs += other.unconverged_eigenpairs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combine_adds_every_counter() {
        let left = Diagnostics {
            degenerate_contributions: 1,
            zero_area_vertices: 2,
            clamped_eigenpairs: 0,
            unconverged_eigenpairs: 3,
        };
        let right = Diagnostics {
            degenerate_contributions: 4,
            clamped_eigenpairs: 5,
            ..Diagnostics::default()
        };
        let total = left.combine(right);
        assert_eq!(total.degenerate_contributions, 5);
        assert_eq!(total.zero_area_vertices, 2);
        assert_eq!(total.clamped_eigenpairs, 5);
        assert_eq!(total.unconverged_eigenpairs, 3);
        assert!(!total.is_clean());
        assert!(Diagnostics::default().is_clean());
    }
}
