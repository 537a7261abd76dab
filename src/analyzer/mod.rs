// Analyzer module: pure reducers over the record table, one per analysis group.

pub mod mix_impact;
pub mod price_analysis;
pub mod stats;

pub use price_analysis::{AnalysisResult, Analyzer, AnalyzerImpl};
