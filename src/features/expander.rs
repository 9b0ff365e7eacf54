//! Per-bout feature expansion
//!
//! Turns one bout's raw totals into the long-form list of (key, value) rows
//! the aggregator consumes. A slot missing on either side produces no row.

use crate::features::catalog::{Category, FeatureKey, Modifier, StatKind};
use crate::features::differential::{absorbed, absorbed_diff, defended, defended_diff, differential};
use crate::features::history::BoutHistory;

/// One derived value for one bout
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpandedStat {
    pub key: FeatureKey,
    pub value: f64,
}

impl ExpandedStat {
    fn new(category: Category, modifier: Option<Modifier>, kind: StatKind, value: f64) -> Self {
        ExpandedStat {
            key: FeatureKey::new(category, modifier, kind),
            value,
        }
    }
}

/// Expand one bout from the perspective of `bout.own`
pub fn expand_bout(bout: &BoutHistory) -> Vec<ExpandedStat> {
    let mut rows = Vec::new();

    for category in Category::ALL {
        if !category.has_landed_attempted() {
            push_pair(&mut rows, bout, category, None);
            continue;
        }

        for modifier in Modifier::OBSERVED {
            push_pair(&mut rows, bout, category, Some(modifier));
        }

        // What the fighter received is derived from the opponent's output
        let opp_landed = bout.opponent.get(category, Some(Modifier::Landed));
        let opp_attempted = bout.opponent.get(category, Some(Modifier::Attempted));
        if let (Some(landed), Some(attempted)) = (opp_landed, opp_attempted) {
            let absorbed_value = absorbed(landed);
            let defended_value = defended(attempted, landed);
            rows.extend([
                ExpandedStat::new(category, Some(Modifier::Absorbed), StatKind::Total, absorbed_value),
                ExpandedStat::new(
                    category,
                    Some(Modifier::Absorbed),
                    StatKind::Differential,
                    absorbed_diff(defended_value, absorbed_value),
                ),
                ExpandedStat::new(category, Some(Modifier::Defended), StatKind::Total, defended_value),
                ExpandedStat::new(
                    category,
                    Some(Modifier::Defended),
                    StatKind::Differential,
                    defended_diff(defended_value, absorbed_value),
                ),
            ]);
        }
    }

    rows
}

fn push_pair(
    rows: &mut Vec<ExpandedStat>,
    bout: &BoutHistory,
    category: Category,
    modifier: Option<Modifier>,
) {
    let own = bout.own.get(category, modifier);
    let opp = bout.opponent.get(category, modifier);
    if let (Some(own), Some(opp)) = (own, opp) {
        rows.push(ExpandedStat::new(category, modifier, StatKind::Total, own));
        rows.push(ExpandedStat::new(
            category,
            modifier,
            StatKind::Differential,
            differential(own, opp),
        ));
    }
}
