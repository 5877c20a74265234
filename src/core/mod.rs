pub mod domain;
pub mod item;
pub mod primitives;
pub mod priority;
pub mod scale;
pub mod types;

pub use domain::{Axis, AxisDomains, AxisPatch, Domain, DomainPriority};
pub use item::{Accessor, Accessors, ItemId, ItemKind, accessor};
pub use priority::{Extent, calculate_domains, copy_domain, highest_priority_domain, with_padding};
pub use scale::{AxisScale, LinearScale, LinearScalerFactory, ScalerFactory};
pub use types::DataPoint;

#[cfg(feature = "parallel-domains")]
pub use priority::calculate_domains_parallel;
