//! GROOC recommendation engine
//!
//! Matches shopping-list requests against the market catalog, scores candidates on
//! five weighted criteria (cost-benefit, compatibility, stock, health, preference),
//! ranks them and optionally plans a multi-store shopping route.

mod engine;
mod recommender;
mod scoring;
mod types;

pub use engine::GroocRecommendationEngine;
pub use recommender::{candidates, compare_recommendations, sort_recommendations, GroocRecommender};
pub use scoring::{
    compatibility_score, cost_benefit_score, health_score, preference_score, stock_score,
    ScoreCalculator, ScoringWeights,
};
pub use types::*;

pub const ENGINE_NAME: &str = "GROOCEngine";
pub const ENGINE_VERSION: &str = "2.0.0-enhanced";

/// Candidates kept per requested product.
pub const MAX_CANDIDATES_PER_REQUEST: usize = 5;

/// Shopping time reported when no route is planned.
pub const DEFAULT_TIME_ESTIMATE_MINUTES: u32 = 30;
