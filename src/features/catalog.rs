//! Tracked stat categories and typed feature descriptors
//!
//! Feature names are only rendered to strings at the edges; everything inside
//! the engine works with [`FeatureKey`], [`Aggregate`] and [`OutcomeStat`].

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Method;

/// A tracked statistical dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    TotalStrikes,
    SignificantStrikes,
    Takedowns,
    HeadStrikes,
    BodyStrikes,
    LegStrikes,
    DistanceStrikes,
    ClinchStrikes,
    GroundStrikes,
    Reversals,
    SubmissionAttempts,
    ControlTime,
    Knockdowns,
    Age,
    Height,
    Weight,
    Reach,
}

impl Category {
    pub const ALL: [Category; 17] = [
        Category::TotalStrikes,
        Category::SignificantStrikes,
        Category::Takedowns,
        Category::HeadStrikes,
        Category::BodyStrikes,
        Category::LegStrikes,
        Category::DistanceStrikes,
        Category::ClinchStrikes,
        Category::GroundStrikes,
        Category::Reversals,
        Category::SubmissionAttempts,
        Category::ControlTime,
        Category::Knockdowns,
        Category::Age,
        Category::Height,
        Category::Weight,
        Category::Reach,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Category::TotalStrikes => "total_strikes",
            Category::SignificantStrikes => "significant_strikes",
            Category::Takedowns => "takedowns",
            Category::HeadStrikes => "head_strikes",
            Category::BodyStrikes => "body_strikes",
            Category::LegStrikes => "leg_strikes",
            Category::DistanceStrikes => "distance_strikes",
            Category::ClinchStrikes => "clinch_strikes",
            Category::GroundStrikes => "ground_strikes",
            Category::Reversals => "reversals",
            Category::SubmissionAttempts => "submission_attempts",
            Category::ControlTime => "control_time",
            Category::Knockdowns => "knockdowns",
            Category::Age => "age",
            Category::Height => "height",
            Category::Weight => "weight",
            Category::Reach => "reach",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.code() == code)
    }

    /// Whether the category is recorded as a landed/attempted pair
    pub fn has_landed_attempted(&self) -> bool {
        matches!(
            self,
            Category::TotalStrikes
                | Category::SignificantStrikes
                | Category::Takedowns
                | Category::HeadStrikes
                | Category::BodyStrikes
                | Category::LegStrikes
                | Category::DistanceStrikes
                | Category::ClinchStrikes
                | Category::GroundStrikes
        )
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Sub-dimension of a category
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Modifier {
    Landed,
    Attempted,
    Absorbed,
    Defended,
}

impl Modifier {
    /// Modifiers observed directly in bout data
    pub const OBSERVED: [Modifier; 2] = [Modifier::Landed, Modifier::Attempted];

    pub fn code(&self) -> &'static str {
        match self {
            Modifier::Landed => "landed",
            Modifier::Attempted => "attempted",
            Modifier::Absorbed => "absorbed",
            Modifier::Defended => "defended",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "landed" => Some(Modifier::Landed),
            "attempted" => Some(Modifier::Attempted),
            "absorbed" => Some(Modifier::Absorbed),
            "defended" => Some(Modifier::Defended),
            _ => None,
        }
    }
}

/// Per-bout statistic kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StatKind {
    /// Raw observed value
    Total,
    /// Normalized comparison against the opponent's value
    Differential,
}

impl StatKind {
    pub fn code(&self) -> &'static str {
        match self {
            StatKind::Total => "total",
            StatKind::Differential => "differential",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "total" => Some(StatKind::Total),
            "differential" => Some(StatKind::Differential),
            _ => None,
        }
    }
}

/// category x modifier x statistic-kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureKey {
    pub category: Category,
    pub modifier: Option<Modifier>,
    pub kind: StatKind,
}

impl FeatureKey {
    pub const fn new(category: Category, modifier: Option<Modifier>, kind: StatKind) -> Self {
        FeatureKey {
            category,
            modifier,
            kind,
        }
    }

    /// Stem used inside every aggregate name, e.g. `takedowns_landed_diff`
    pub fn stem(&self) -> String {
        let mut stem = self.category.code().to_string();
        if let Some(modifier) = self.modifier {
            stem.push('_');
            stem.push_str(modifier.code());
        }
        if self.kind == StatKind::Differential {
            stem.push_str("_diff");
        }
        stem
    }

    /// Full name of one aggregate of this key
    pub fn name(&self, aggregate: Aggregate) -> String {
        aggregate.render(&self.stem())
    }

    /// Whether matchup rows carry a `_vs_opp` difference for this key.
    /// Absorbed/defended differentials are excluded.
    pub fn compared_against_opponent(&self) -> bool {
        match self.modifier {
            None | Some(Modifier::Landed) | Some(Modifier::Attempted) => true,
            Some(Modifier::Absorbed) | Some(Modifier::Defended) => self.kind == StatKind::Total,
        }
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stem())
    }
}

/// Windowed summary of one feature key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Aggregate {
    Average,
    Peak,
    Valley,
    RecentAverage,
    AverageVsPeak,
    AverageVsValley,
    RecentAverageVsPeak,
    RecentAverageVsValley,
}

impl Aggregate {
    pub const ALL: [Aggregate; 8] = [
        Aggregate::Average,
        Aggregate::Peak,
        Aggregate::Valley,
        Aggregate::RecentAverage,
        Aggregate::AverageVsPeak,
        Aggregate::AverageVsValley,
        Aggregate::RecentAverageVsPeak,
        Aggregate::RecentAverageVsValley,
    ];

    /// Aggregates differenced against the opponent in matchup rows
    pub const COMPARED: [Aggregate; 4] = [
        Aggregate::Average,
        Aggregate::Peak,
        Aggregate::Valley,
        Aggregate::RecentAverage,
    ];

    pub fn render(&self, stem: &str) -> String {
        match self {
            Aggregate::Average => format!("avg_{}", stem),
            Aggregate::Peak => format!("{}_peak", stem),
            Aggregate::Valley => format!("{}_valley", stem),
            Aggregate::RecentAverage => format!("recent_avg_{}", stem),
            Aggregate::AverageVsPeak => format!("avg_{}_vs_peak", stem),
            Aggregate::AverageVsValley => format!("avg_{}_vs_valley", stem),
            Aggregate::RecentAverageVsPeak => format!("recent_avg_{}_vs_peak", stem),
            Aggregate::RecentAverageVsValley => format!("recent_avg_{}_vs_valley", stem),
        }
    }
}

/// Win/loss features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeStat {
    Wins,
    Losses,
    WinRatio,
    RecentWins,
    RecentLosses,
    MethodWins(Method),
    MethodLosses(Method),
    MethodWinRatio(Method),
    MethodLossRatio(Method),
    RecentMethodWins(Method),
    RecentMethodLosses(Method),
}

impl OutcomeStat {
    pub fn name(&self) -> String {
        match self {
            OutcomeStat::Wins => "wins".to_string(),
            OutcomeStat::Losses => "losses".to_string(),
            OutcomeStat::WinRatio => "win_ratio".to_string(),
            OutcomeStat::RecentWins => "recent_wins".to_string(),
            OutcomeStat::RecentLosses => "recent_losses".to_string(),
            OutcomeStat::MethodWins(m) => format!("{}_wins", m.feature_prefix()),
            OutcomeStat::MethodLosses(m) => format!("{}_losses", m.feature_prefix()),
            OutcomeStat::MethodWinRatio(m) => format!("{}_win_ratio", m.feature_prefix()),
            OutcomeStat::MethodLossRatio(m) => format!("{}_loss_ratio", m.feature_prefix()),
            OutcomeStat::RecentMethodWins(m) => format!("recent_{}_wins", m.feature_prefix()),
            OutcomeStat::RecentMethodLosses(m) => format!("recent_{}_losses", m.feature_prefix()),
        }
    }
}

/// Cumulative cage time before the cutoff
pub const TOTAL_FIGHT_TIME: &str = "total_fight_time";
pub const RECENT_TOTAL_FIGHT_TIME: &str = "recent_total_fight_time";

/// Every per-bout key the aggregator summarises, in catalog order
pub static TRACKED_KEYS: Lazy<Vec<FeatureKey>> = Lazy::new(|| {
    let mut keys = Vec::new();
    for category in Category::ALL {
        if category.has_landed_attempted() {
            for modifier in [
                Modifier::Landed,
                Modifier::Attempted,
                Modifier::Absorbed,
                Modifier::Defended,
            ] {
                for kind in [StatKind::Total, StatKind::Differential] {
                    keys.push(FeatureKey::new(category, Some(modifier), kind));
                }
            }
        } else {
            for kind in [StatKind::Total, StatKind::Differential] {
                keys.push(FeatureKey::new(category, None, kind));
            }
        }
    }
    keys
});

/// Every outcome feature, in catalog order
pub static OUTCOME_STATS: Lazy<Vec<OutcomeStat>> = Lazy::new(|| {
    let mut stats = vec![
        OutcomeStat::Wins,
        OutcomeStat::Losses,
        OutcomeStat::WinRatio,
        OutcomeStat::RecentWins,
        OutcomeStat::RecentLosses,
    ];
    for method in Method::ALL {
        stats.extend([
            OutcomeStat::MethodWins(method),
            OutcomeStat::MethodLosses(method),
            OutcomeStat::MethodWinRatio(method),
            OutcomeStat::MethodLossRatio(method),
            OutcomeStat::RecentMethodWins(method),
            OutcomeStat::RecentMethodLosses(method),
        ]);
    }
    stats
});
