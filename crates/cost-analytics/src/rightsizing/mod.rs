//! Instance right-sizing from utilization summaries

pub mod catalog;
pub mod sizer;

pub use catalog::{family_of, InstanceCatalog, InstanceSize, HOURS_PER_MONTH};
pub use sizer::{FleetResource, FleetSizingReport, RightSizer, RiskLevel, SizingRecommendation};
