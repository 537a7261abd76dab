use crate::analyzer::mix_impact::{Dimension, MixImpact, mix_impact};
use crate::analyzer::stats::{mean, median, pct_change, sample_std};
use crate::model::ProductRecord;
use crate::utils::{Month, round2};

use serde::Serialize;
use std::collections::BTreeMap;

/// Trait defining the interface for the ASP analyzer.
pub trait Analyzer {
    fn analyze(&self, records: &[ProductRecord]) -> AnalysisResult;
}

/// Implementation of the ASP analyzer.
pub struct AnalyzerImpl;

impl AnalyzerImpl {
    pub fn new() -> Self {
        Self
    }
}

impl Analyzer for AnalyzerImpl {
    /// Recomputes every analysis group from the full table.
    fn analyze(&self, records: &[ProductRecord]) -> AnalysisResult {
        AnalysisResult {
            overall_asp_trends: overall_asp_trends(records),
            product_mix_impact: ProductMixImpact {
                category_mix: mix_impact(records, Dimension::Category),
                new_vs_existing: mix_impact(records, Dimension::NewVsExisting),
            },
            channel_mix_impact: mix_impact(records, Dimension::Channel),
            style_mix_impact: mix_impact(records, Dimension::Style),
            pricing_actions: pricing_actions(records),
            promotional_impact: promotional_impact(records),
        }
    }
}

/// Structure representing the overall analysis result.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub overall_asp_trends: AspTrends,
    pub product_mix_impact: ProductMixImpact,
    pub channel_mix_impact: MixImpact,
    pub style_mix_impact: MixImpact,
    pub pricing_actions: PricingActions,
    pub promotional_impact: BTreeMap<Month, PromoStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AspTrends {
    pub monthly_asp: BTreeMap<Month, MonthlyAsp>,
    /// Only months with a same-month observation one year earlier.
    pub yoy_growth: BTreeMap<Month, YoyGrowth>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonthlyAsp {
    pub asp: f64,
    pub median_price: f64,
    pub count: usize,
    pub avg_original_price: f64,
}

/// Percent changes; `None` where the prior-year value is zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct YoyGrowth {
    pub asp_pct: Option<f64>,
    pub median_price_pct: Option<f64>,
    pub count_pct: Option<f64>,
    pub avg_original_price_pct: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProductMixImpact {
    pub category_mix: MixImpact,
    pub new_vs_existing: MixImpact,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PricingActions {
    pub avg_price_change: BTreeMap<Month, f64>,
    pub price_change_distribution: BTreeMap<Month, ChangeDistribution>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChangeDistribution {
    pub mean: f64,
    pub median: f64,
    pub std: Option<f64>,
    pub increases: usize,
    pub decreases: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PromoStats {
    pub mean_discount_pct: f64,
    pub median_discount_pct: f64,
    pub total_discount_amount: f64,
    /// Total discount as a percentage of total original price.
    pub discount_rate: Option<f64>,
    /// Fraction of the month's records carrying any discount.
    pub promo_share: f64,
}

fn by_month(records: &[ProductRecord]) -> BTreeMap<Month, Vec<&ProductRecord>> {
    let mut grouped: BTreeMap<Month, Vec<&ProductRecord>> = BTreeMap::new();
    for r in records {
        grouped.entry(Month::of(r.date)).or_default().push(r);
    }
    grouped
}

pub fn overall_asp_trends(records: &[ProductRecord]) -> AspTrends {
    let mut monthly_asp = BTreeMap::new();
    for (month, rows) in by_month(records) {
        let prices: Vec<f64> = rows.iter().map(|r| r.current_price).collect();
        let originals: Vec<f64> = rows.iter().map(|r| r.original_price).collect();
        // groups from by_month are never empty
        let (Some(asp), Some(med), Some(orig)) = (mean(&prices), median(&prices), mean(&originals)) else {
            continue;
        };
        monthly_asp.insert(
            month,
            MonthlyAsp {
                asp: round2(asp),
                median_price: round2(med),
                count: rows.len(),
                avg_original_price: round2(orig),
            },
        );
    }

    let yoy_growth = monthly_asp
        .iter()
        .filter_map(|(month, cur)| {
            let prev = monthly_asp.get(&month.year_before())?;
            let growth = YoyGrowth {
                asp_pct: pct_change(prev.asp, cur.asp).map(round2),
                median_price_pct: pct_change(prev.median_price, cur.median_price).map(round2),
                count_pct: pct_change(prev.count as f64, cur.count as f64).map(round2),
                avg_original_price_pct: pct_change(prev.avg_original_price, cur.avg_original_price).map(round2),
            };
            Some((*month, growth))
        })
        .collect();

    AspTrends { monthly_asp, yoy_growth }
}

/// Month-over-month price moves of the same SKU, attributed to the later month.
pub fn pricing_actions(records: &[ProductRecord]) -> PricingActions {
    let mut per_sku: BTreeMap<&str, BTreeMap<Month, (f64, usize)>> = BTreeMap::new();
    for r in records {
        let slot = per_sku
            .entry(r.sku.as_str())
            .or_default()
            .entry(Month::of(r.date))
            .or_default();
        slot.0 += r.current_price;
        slot.1 += 1;
    }

    let mut changes: BTreeMap<Month, Vec<f64>> = BTreeMap::new();
    for months in per_sku.values() {
        let series: Vec<(Month, f64)> = months
            .iter()
            .map(|(m, (sum, n))| (*m, sum / *n as f64))
            .collect();
        for pair in series.windows(2) {
            let ((_, prev), (month, cur)) = (pair[0], pair[1]);
            if let Some(change) = pct_change(prev, cur) {
                changes.entry(month).or_default().push(change);
            }
        }
    }

    let mut actions = PricingActions::default();
    for (month, values) in changes {
        let (Some(avg), Some(med)) = (mean(&values), median(&values)) else {
            continue;
        };
        actions.avg_price_change.insert(month, round2(avg));
        actions.price_change_distribution.insert(
            month,
            ChangeDistribution {
                mean: round2(avg),
                median: round2(med),
                std: sample_std(&values).map(round2),
                increases: values.iter().filter(|v| **v > 0.0).count(),
                decreases: values.iter().filter(|v| **v < 0.0).count(),
            },
        );
    }
    actions
}

pub fn promotional_impact(records: &[ProductRecord]) -> BTreeMap<Month, PromoStats> {
    let mut impact = BTreeMap::new();
    for (month, rows) in by_month(records) {
        let pcts: Vec<f64> = rows.iter().map(|r| r.discount_percentage).collect();
        let (Some(avg), Some(med)) = (mean(&pcts), median(&pcts)) else {
            continue;
        };
        let total_discount: f64 = rows.iter().map(|r| r.discount_amount).sum();
        let total_original: f64 = rows.iter().map(|r| r.original_price).sum();
        let discounted = rows.iter().filter(|r| r.discount_amount > 0.0).count();

        impact.insert(
            month,
            PromoStats {
                mean_discount_pct: round2(avg),
                median_discount_pct: round2(med),
                total_discount_amount: round2(total_discount),
                discount_rate: (total_original > 0.0).then(|| round2(total_discount / total_original * 100.0)),
                promo_share: round2(discounted as f64 / rows.len() as f64),
            },
        );
    }
    impact
}
