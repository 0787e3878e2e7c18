//! Fusion and scoring for wildfire risk.
//!
//! [`fusion`] turns three raw observation windows into physical per-point
//! readings, [`risk`] scores them, and [`session`] ties both into a
//! caller-owned assessment that is replaced on every refresh.

pub mod fusion;
pub mod impute;
pub mod risk;
pub mod session;

pub use fusion::{fuse, FusedRecord, FusionPlan, PhysicalReading, WindowLabels};
pub use risk::{DroughtStatus, RiskLevel, RiskRecord, RiskSummary, ScoringPolicy};
pub use session::{RiskAssessment, RiskSession};
