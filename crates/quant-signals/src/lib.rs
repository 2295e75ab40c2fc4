//! Signal generation.
//!
//! - [`regime`]: trend and volatility regime per timeframe, with
//!   multi-timeframe alignment
//! - [`rules`]: the five scoring categories
//! - [`scorer`]: composite scores, gates and thresholds
//! - [`scanner`]: the above wired over a bar series
//! - [`presets`]: named parameter sets

pub mod market;
pub mod params;
pub mod presets;
pub mod regime;
pub mod rules;
pub mod scanner;
pub mod scorer;

pub use market::MarketView;
pub use params::StrategyParams;
pub use presets::{PresetInfo, PresetRegistry};
pub use regime::{RegimeClassifier, RegimeConfig, RegimeInputs, RegimeReading};
pub use rules::{RuleHit, RuleThresholds, RuleWeights};
pub use scanner::{ScanReport, SignalScanner};
pub use scorer::{Decision, ScoreCard, ScorerConfig, SideScore, SignalScorer};
