pub mod alert;
pub mod bar;
pub mod contract;
pub mod indicator;
pub mod pattern;
pub mod recommendation;

pub use alert::{AlertEvent, AlertReason};
pub use bar::{Bar, BarInterval};
pub use contract::RawBar;
pub use indicator::{IndicatorKind, IndicatorLine, IndicatorResult, IndicatorSet, IndicatorSpec};
pub use pattern::{Direction, PatternEvent, PatternKind};
pub use recommendation::{Action, Factor, Recommendation};
