//! Signal strength - the five-component evidence vector behind every claim
//!
//! The overall value is the arithmetic mean of the five components. It is a
//! pinned contract: it is recomputed on every mutation and always lies within
//! `[min(components), max(components)]`.

use serde::{Deserialize, Serialize};

/// One of the five independent evidence components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalComponent {
    /// How reliably the claim surfaces in retrieval
    Retrieval,
    /// Agreement with the code's structure (types, signatures, locations)
    Structural,
    /// Agreement with the code's meaning (docs, purpose, naming)
    Semantic,
    /// Backing from executed tests
    TestExecution,
    /// Freshness relative to the underlying code
    Recency,
}

impl SignalComponent {
    /// All components in storage order
    pub const ALL: [SignalComponent; 5] = [
        SignalComponent::Retrieval,
        SignalComponent::Structural,
        SignalComponent::Semantic,
        SignalComponent::TestExecution,
        SignalComponent::Recency,
    ];

    /// Get the component name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalComponent::Retrieval => "retrieval",
            SignalComponent::Structural => "structural",
            SignalComponent::Semantic => "semantic",
            SignalComponent::TestExecution => "test_execution",
            SignalComponent::Recency => "recency",
        }
    }
}

/// Bounded evidence vector for a claim
///
/// Construct with [`SignalStrength::new`] or [`SignalStrength::uniform`];
/// mutate through [`SignalStrength::set`] or [`SignalStrength::reduce`] so the
/// overall value never drifts from its components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalStrength {
    /// Retrieval component [0.0, 1.0]
    pub retrieval: f64,
    /// Structural component [0.0, 1.0]
    pub structural: f64,
    /// Semantic component [0.0, 1.0]
    pub semantic: f64,
    /// Test execution component [0.0, 1.0]
    pub test_execution: f64,
    /// Recency component [0.0, 1.0]
    pub recency: f64,
    /// Derived aggregate (arithmetic mean of the components)
    pub overall: f64,
}

impl SignalStrength {
    /// Create a signal strength vector, clamping each component to [0, 1]
    pub fn new(retrieval: f64, structural: f64, semantic: f64, test_execution: f64, recency: f64) -> Self {
        let mut strength = Self {
            retrieval: clamp_unit(retrieval),
            structural: clamp_unit(structural),
            semantic: clamp_unit(semantic),
            test_execution: clamp_unit(test_execution),
            recency: clamp_unit(recency),
            overall: 0.0,
        };
        strength.recompute();
        strength
    }

    /// Create a vector with every component at the same value
    pub fn uniform(value: f64) -> Self {
        Self::new(value, value, value, value, value)
    }

    /// Read a single component
    pub fn get(&self, component: SignalComponent) -> f64 {
        match component {
            SignalComponent::Retrieval => self.retrieval,
            SignalComponent::Structural => self.structural,
            SignalComponent::Semantic => self.semantic,
            SignalComponent::TestExecution => self.test_execution,
            SignalComponent::Recency => self.recency,
        }
    }

    /// Overwrite a single component and recompute the overall value
    pub fn set(&mut self, component: SignalComponent, value: f64) {
        let value = clamp_unit(value);
        match component {
            SignalComponent::Retrieval => self.retrieval = value,
            SignalComponent::Structural => self.structural = value,
            SignalComponent::Semantic => self.semantic = value,
            SignalComponent::TestExecution => self.test_execution = value,
            SignalComponent::Recency => self.recency = value,
        }
        self.recompute();
    }

    /// Lower a component by `amount`, flooring at zero
    pub fn reduce(&mut self, component: SignalComponent, amount: f64) {
        let current = self.get(component);
        self.set(component, current - amount.max(0.0));
    }

    /// The five components in [`SignalComponent::ALL`] order
    pub fn components(&self) -> [f64; 5] {
        [self.retrieval, self.structural, self.semantic, self.test_execution, self.recency]
    }

    /// Recompute `overall` from the components
    pub fn recompute(&mut self) {
        self.overall = aggregate(&self.components());
    }

    /// Check that every component is in [0, 1] and `overall` is consistent
    pub fn validate(&self) -> Result<(), String> {
        for (component, value) in SignalComponent::ALL.iter().zip(self.components()) {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{} signal {} is outside [0.0, 1.0]", component.as_str(), value));
            }
        }
        let expected = aggregate(&self.components());
        if (expected - self.overall).abs() > 1e-9 {
            return Err(format!(
                "overall signal {} does not match its components (expected {})",
                self.overall, expected
            ));
        }
        Ok(())
    }
}

impl Default for SignalStrength {
    fn default() -> Self {
        Self::uniform(0.5)
    }
}

/// Arithmetic mean of the components, kept within their range
fn aggregate(components: &[f64; 5]) -> f64 {
    let min = components.iter().copied().fold(f64::INFINITY, f64::min);
    let max = components.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = components.iter().sum::<f64>() / components.len() as f64;
    // rounding in the sum can land one ulp outside [min, max]
    mean.max(min).min(max)
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: overall lies within [min, max] of the components
        #[test]
        fn test_monotonic_aggregation(
            a in 0.0f64..=1.0, b in 0.0f64..=1.0, c in 0.0f64..=1.0,
            d in 0.0f64..=1.0, e in 0.0f64..=1.0,
        ) {
            let s = SignalStrength::new(a, b, c, d, e);
            let comps = s.components();
            let min = comps.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = comps.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

            prop_assert!(s.overall >= min && s.overall <= max,
                "overall {} outside [{}, {}]", s.overall, min, max);
        }

        /// Property: reducing a component never raises overall
        #[test]
        fn test_reduction_never_increases(
            value in 0.0f64..=1.0,
            amount in 0.0f64..=1.0,
            idx in 0usize..5,
        ) {
            let mut s = SignalStrength::uniform(value);
            let before = s.overall;
            s.reduce(SignalComponent::ALL[idx], amount);
            prop_assert!(s.overall <= before + 1e-12);
        }
    }
}
