//! Instance size and price catalog

use crate::error::{CostAnalyticsError, CostAnalyticsResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Hours billed in an average month
pub const HOURS_PER_MONTH: f64 = 730.0;

/// Capacity and price of one instance size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InstanceSize {
    /// Virtual CPUs
    pub vcpu: u32,
    /// Memory in GiB
    pub memory_gb: f64,
    /// On-demand monthly price in USD
    pub monthly_price: f64,
}

impl InstanceSize {
    fn hourly(vcpu: u32, memory_gb: f64, hourly_price: f64) -> Self {
        Self {
            vcpu,
            memory_gb,
            monthly_price: hourly_price * HOURS_PER_MONTH,
        }
    }
}

/// Size name to capacity/price table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceCatalog {
    sizes: BTreeMap<String, InstanceSize>,
}

impl Default for InstanceCatalog {
    /// us-east-1 Linux on-demand prices for the t3, m5, c5 and r5 families
    fn default() -> Self {
        let table: [(&str, u32, f64, f64); 21] = [
            ("t3.nano", 2, 0.5, 0.0052),
            ("t3.micro", 2, 1.0, 0.0104),
            ("t3.small", 2, 2.0, 0.0208),
            ("t3.medium", 2, 4.0, 0.0416),
            ("t3.large", 2, 8.0, 0.0832),
            ("t3.xlarge", 4, 16.0, 0.1664),
            ("t3.2xlarge", 8, 32.0, 0.3328),
            ("m5.large", 2, 8.0, 0.096),
            ("m5.xlarge", 4, 16.0, 0.192),
            ("m5.2xlarge", 8, 32.0, 0.384),
            ("m5.4xlarge", 16, 64.0, 0.768),
            ("m5.8xlarge", 32, 128.0, 1.536),
            ("c5.large", 2, 4.0, 0.085),
            ("c5.xlarge", 4, 8.0, 0.17),
            ("c5.2xlarge", 8, 16.0, 0.34),
            ("c5.4xlarge", 16, 32.0, 0.68),
            ("c5.9xlarge", 36, 72.0, 1.53),
            ("r5.large", 2, 16.0, 0.126),
            ("r5.xlarge", 4, 32.0, 0.252),
            ("r5.2xlarge", 8, 64.0, 0.504),
            ("r5.4xlarge", 16, 128.0, 1.008),
        ];

        Self {
            sizes: table
                .into_iter()
                .map(|(name, vcpu, memory, hourly)| {
                    (name.to_string(), InstanceSize::hourly(vcpu, memory, hourly))
                })
                .collect(),
        }
    }
}

impl InstanceCatalog {
    /// Empty catalog
    pub fn empty() -> Self {
        Self {
            sizes: BTreeMap::new(),
        }
    }

    /// Add or replace a size
    pub fn insert(&mut self, name: impl Into<String>, size: InstanceSize) {
        self.sizes.insert(name.into(), size);
    }

    /// Look up a size
    pub fn get(&self, name: &str) -> Option<&InstanceSize> {
        self.sizes.get(name)
    }

    /// Look up a size, failing with `UnknownSize`
    pub fn lookup(&self, name: &str) -> CostAnalyticsResult<&InstanceSize> {
        self.get(name).ok_or_else(|| CostAnalyticsError::UnknownSize {
            size: name.to_string(),
        })
    }

    /// All sizes sharing the family prefix, ordered by name
    pub fn family(&self, family: &str) -> Vec<(&str, &InstanceSize)> {
        self.sizes
            .iter()
            .filter(|(name, _)| family_of(name) == family)
            .map(|(name, size)| (name.as_str(), size))
            .collect()
    }

    /// Number of sizes
    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    /// Whether the catalog has no sizes
    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    /// Reject entries the right-sizer cannot compare
    pub fn validate(&self) -> CostAnalyticsResult<()> {
        for (name, size) in &self.sizes {
            let problem = if family_of(name).is_empty() {
                Some("empty family prefix")
            } else if size.vcpu == 0 {
                Some("zero vcpu")
            } else if !(size.memory_gb.is_finite() && size.memory_gb > 0.0) {
                Some("memory must be positive")
            } else if !(size.monthly_price.is_finite() && size.monthly_price >= 0.0) {
                Some("price must be non-negative")
            } else {
                None
            };

            if let Some(problem) = problem {
                return Err(CostAnalyticsError::ConfigurationError {
                    message: format!("catalog entry {}: {}", name, problem),
                });
            }
        }
        Ok(())
    }
}

/// Family prefix of a size name, the part before the first `.`
pub fn family_of(size: &str) -> &str {
    size.split('.').next().unwrap_or(size)
}
