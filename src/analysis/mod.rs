//! Analyses layered on top of the dependency graph: change impact,
//! calculation paths, and type/state tracking.

pub mod calculation;
pub mod impact;
pub mod type_tracker;

pub use calculation::{calculation_path, CalculationPath, CalculationStep};
pub use impact::{analyze_impact, ExitKind, ExitPoint, ImpactReport, RiskLevel};
pub use type_tracker::{infer_type, track_types, TypeEvent, TypeEvolution, TypeWarning};
