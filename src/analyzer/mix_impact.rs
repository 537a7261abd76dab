// Mix/rate decomposition of ASP movements along one dimension
use crate::model::ProductRecord;
use crate::utils::Month;

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Category,
    NewVsExisting,
    Channel,
    Style,
}

impl Dimension {
    pub fn segment(&self, record: &ProductRecord) -> String {
        match self {
            Dimension::Category => record.category.clone(),
            Dimension::NewVsExisting => {
                let label = if record.is_new_product { "new" } else { "existing" };
                label.to_string()
            }
            Dimension::Channel => record.channel.to_string(),
            Dimension::Style => record.style.to_string(),
        }
    }
}

/// Share of the period's observations and mean price of one segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub weight: f64,
    pub price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Decomposition {
    pub asp_from: f64,
    pub asp_to: f64,
    pub total_delta: f64,
    /// Σ w_new · Δp
    pub price_effect: f64,
    /// Σ Δw · p_old
    pub mix_effect: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MixEffect {
    pub from: Month,
    #[serde(flatten)]
    pub decomposition: Decomposition,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MixImpact {
    pub asp_by_segment: BTreeMap<String, BTreeMap<Month, f64>>,
    pub mix_share: BTreeMap<String, BTreeMap<Month, f64>>,
    pub base_period: Option<Month>,
    pub vs_base: BTreeMap<Month, MixEffect>,
    pub vs_previous: BTreeMap<Month, MixEffect>,
}

/// Splits the blended ASP change between two periods into a price and a mix term.
///
/// A segment missing from one side borrows its price from the other side, so it only
/// moves the mix term. `price_effect + mix_effect` equals `total_delta` term by term.
pub fn decompose(old: &BTreeMap<String, Segment>, new: &BTreeMap<String, Segment>) -> Decomposition {
    let keys: BTreeSet<&String> = old.keys().chain(new.keys()).collect();

    let mut d = Decomposition {
        asp_from: 0.0,
        asp_to: 0.0,
        total_delta: 0.0,
        price_effect: 0.0,
        mix_effect: 0.0,
    };

    for key in keys {
        let (w_old, p_old, w_new, p_new) = match (old.get(key), new.get(key)) {
            (Some(o), Some(n)) => (o.weight, o.price, n.weight, n.price),
            (Some(o), None) => (o.weight, o.price, 0.0, o.price),
            (None, Some(n)) => (0.0, n.price, n.weight, n.price),
            (None, None) => continue,
        };
        d.asp_from += w_old * p_old;
        d.asp_to += w_new * p_new;
        d.price_effect += w_new * (p_new - p_old);
        d.mix_effect += (w_new - w_old) * p_old;
    }

    d.total_delta = d.asp_to - d.asp_from;
    d
}

/// Per-month segment weights and mean prices; months and segments without observations are absent.
pub fn segments_by_month(records: &[ProductRecord], dimension: Dimension) -> BTreeMap<Month, BTreeMap<String, Segment>> {
    let mut sums: BTreeMap<Month, BTreeMap<String, (usize, f64)>> = BTreeMap::new();
    for r in records {
        let entry = sums
            .entry(Month::of(r.date))
            .or_default()
            .entry(dimension.segment(r))
            .or_default();
        entry.0 += 1;
        entry.1 += r.current_price;
    }

    sums.into_iter()
        .map(|(month, segs)| {
            let total: usize = segs.values().map(|(n, _)| n).sum();
            let segments = segs
                .into_iter()
                .map(|(name, (n, sum))| {
                    let seg = Segment {
                        weight: n as f64 / total as f64,
                        price: sum / n as f64,
                    };
                    (name, seg)
                })
                .collect();
            (month, segments)
        })
        .collect()
}

pub fn mix_impact(records: &[ProductRecord], dimension: Dimension) -> MixImpact {
    let by_month = segments_by_month(records, dimension);
    let mut impact = MixImpact::default();

    for (month, segments) in &by_month {
        for (name, seg) in segments {
            impact
                .asp_by_segment
                .entry(name.clone())
                .or_default()
                .insert(*month, seg.price);
            impact
                .mix_share
                .entry(name.clone())
                .or_default()
                .insert(*month, seg.weight);
        }
    }

    let Some((&base, base_segments)) = by_month.iter().next() else {
        return impact;
    };
    impact.base_period = Some(base);

    let mut previous = (base, base_segments);
    for (&month, segments) in by_month.iter().skip(1) {
        impact.vs_base.insert(
            month,
            MixEffect {
                from: base,
                decomposition: decompose(base_segments, segments),
            },
        );
        impact.vs_previous.insert(
            month,
            MixEffect {
                from: previous.0,
                decomposition: decompose(previous.1, segments),
            },
        );
        previous = (month, segments);
    }

    impact
}
