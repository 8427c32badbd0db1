//! trustnet-core
//!
//! Cross-source news trust scoring and PESTEL-to-operational risk/opportunity
//! insight engine. Ingests cleaned news articles, extracts verifiable claims,
//! cross-validates them across sources against a time-decayed source
//! reputation model, computes per-article trust scores, projects national
//! PESTEL indicators onto a company's operational categories, and detects and
//! ranks risk/opportunity insights with template-driven recommendations,
//! correlation, trend and scenario analytics layered above them.

pub mod claims;
pub mod config;
pub mod correlation;
pub mod corroboration;
pub mod detectors;
pub mod error;
pub mod forecast;
pub mod indicators;
pub mod pipeline;
pub mod recommendations;
pub mod reputation;
pub mod scenario;
pub mod stores;
pub mod trust;
pub mod validator;

pub use claims::{ClaimExtractor, ClaimKind, Entity, EntityKind, ExtractedClaim};
pub use config::Config;
pub use correlation::{CorrelationAnalyzer, CorrelationMatrix, CorrelationType};
pub use corroboration::{CorroborationEngine, CorroborationLevel, CorroborationResult};
pub use detectors::{Insight, InsightKind, InsightStatus, RiskOpportunityDetector, Severity};
pub use error::{PipelineError, PipelineResult};
pub use forecast::{Forecast, Trend, TrendForecaster};
pub use indicators::{
    CompanyProfile, IndicatorCatalogue, IndicatorProjectionEngine, Industry, NationalIndicatorValue,
    OperationalCategory, OperationalIndicators, PestelCategory,
};
pub use pipeline::{PipelineEngine, WorkerPool, WorkerPoolOutcome};
pub use recommendations::{ActionPlan, NarrativeContent, Recommendation, RecommendationEngine};
pub use reputation::{Reputation, ReputationTracker, SourceTier};
pub use scenario::{Scenario, ScenarioSimulator, SimulationResult};
pub use trust::{TrustCalculator, TrustLevel, TrustScore};
pub use validator::{CrossSourceValidator, ValidationInput, ValidationOutput};
