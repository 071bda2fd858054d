//! Radius to ring-depth lookup table

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// One row of the ring table: radii up to `max_km` expand `rings` rings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RingStep {
    pub max_km: f64,
    pub rings: u32,
}

impl RingStep {
    pub const fn new(max_km: f64, rings: u32) -> Self {
        Self { max_km, rings }
    }
}

const DEFAULT_STEPS: [RingStep; 6] = [
    RingStep::new(1.0, 1),
    RingStep::new(2.0, 2),
    RingStep::new(5.0, 3),
    RingStep::new(10.0, 5),
    RingStep::new(25.0, 10),
    RingStep::new(50.0, 20),
];

/// Monotonic step table mapping a search radius to a ring expansion depth.
///
/// Tuned per grid resolution and kept as data so it can be adjusted
/// without touching the geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct RingTable {
    steps: Vec<RingStep>,
}

impl RingTable {
    /// Builds a table, rejecting empty or non-monotonic step lists
    pub fn new(steps: Vec<RingStep>) -> Result<Self, DomainError> {
        if steps.is_empty() {
            return Err(DomainError::configuration("Ring table must not be empty"));
        }

        for (idx, step) in steps.iter().enumerate() {
            if !step.max_km.is_finite() || step.max_km <= 0.0 {
                return Err(DomainError::configuration(format!(
                    "Ring table step {} has invalid threshold {} km",
                    idx, step.max_km
                )));
            }

            if step.rings == 0 {
                return Err(DomainError::configuration(format!(
                    "Ring table step {} must expand at least one ring",
                    idx
                )));
            }

            if idx > 0 {
                let prev = steps[idx - 1];

                if step.max_km <= prev.max_km {
                    return Err(DomainError::configuration(format!(
                        "Ring table thresholds must strictly increase ({} km after {} km)",
                        step.max_km, prev.max_km
                    )));
                }

                if step.rings < prev.rings {
                    return Err(DomainError::configuration(format!(
                        "Ring table ring counts must not decrease ({} after {})",
                        step.rings, prev.rings
                    )));
                }
            }
        }

        Ok(Self { steps })
    }

    /// Ring depth for a radius: the smallest threshold that is at least
    /// `radius_km`, or the largest step when the radius exceeds every one
    pub fn rings_for(&self, radius_km: f64) -> u32 {
        self.steps
            .iter()
            .find(|step| radius_km <= step.max_km)
            .map(|step| step.rings)
            .unwrap_or_else(|| self.largest().rings)
    }

    /// The step with the largest threshold
    pub fn largest(&self) -> RingStep {
        self.steps[self.steps.len() - 1]
    }

    pub fn steps(&self) -> &[RingStep] {
        &self.steps
    }
}

impl Default for RingTable {
    fn default() -> Self {
        Self {
            steps: DEFAULT_STEPS.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_lookup() {
        let table = RingTable::default();

        assert_eq!(table.rings_for(0.5), 1);
        assert_eq!(table.rings_for(1.0), 1);
        assert_eq!(table.rings_for(1.5), 2);
        assert_eq!(table.rings_for(3.0), 3);
        assert_eq!(table.rings_for(5.0), 3);
        assert_eq!(table.rings_for(7.0), 5);
        assert_eq!(table.rings_for(20.0), 10);
        assert_eq!(table.rings_for(26.0), 20);
    }

    #[test]
    fn test_clamps_beyond_largest_threshold() {
        let table = RingTable::default();

        assert_eq!(table.rings_for(50.0), 20);
        assert_eq!(table.rings_for(500.0), 20);
    }

    #[test]
    fn test_rejects_empty() {
        assert!(RingTable::new(vec![]).is_err());
    }

    #[test]
    fn test_rejects_non_increasing_thresholds() {
        let result = RingTable::new(vec![RingStep::new(5.0, 2), RingStep::new(5.0, 3)]);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_decreasing_rings() {
        let result = RingTable::new(vec![RingStep::new(1.0, 3), RingStep::new(2.0, 2)]);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_zero_rings_and_bad_threshold() {
        assert!(RingTable::new(vec![RingStep::new(1.0, 0)]).is_err());
        assert!(RingTable::new(vec![RingStep::new(f64::NAN, 1)]).is_err());
        assert!(RingTable::new(vec![RingStep::new(-1.0, 1)]).is_err());
    }

    #[test]
    fn test_custom_table() {
        let table = RingTable::new(vec![RingStep::new(3.0, 1), RingStep::new(9.0, 3)]).unwrap();

        assert_eq!(table.rings_for(2.0), 1);
        assert_eq!(table.rings_for(4.0), 3);
        assert_eq!(table.largest(), RingStep::new(9.0, 3));
    }
}
