// Domain configuration modules

pub mod plans;

pub use plans::{PlanCatalog, PlanConfig, PlanDefinition, UNLIMITED_LISTINGS};
