// Flat-file output: the record table as CSV and the analysis tree as JSON
use crate::analyzer::AnalysisResult;
use crate::model::{OutputError, ProductRecord};

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{info, warn};

fn ensure_parent(path: &Path) -> Result<(), OutputError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Reads a table written by a previous run. A missing file is an empty table; bad rows are skipped.
/// Discount columns are derived again from the price pair rather than trusted.
pub fn read_table(path: &Path) -> Result<Vec<ProductRecord>, OutputError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for (line, row) in reader.deserialize::<ProductRecord>().enumerate() {
        match row {
            Ok(stored) => {
                let record = rederive(stored.clone());
                if record != stored {
                    warn!("Row {} of {}: discount columns recomputed", line + 2, path.display());
                }
                records.push(record);
            }
            Err(e) => warn!("Skipping row {} of {}: {}", line + 2, path.display(), e),
        }
    }
    Ok(records)
}

fn rederive(stored: ProductRecord) -> ProductRecord {
    ProductRecord::new(
        stored.name,
        stored.sku,
        stored.category,
        stored.style,
        stored.current_price,
        Some(stored.original_price),
        stored.date,
        stored.source,
    )
    .with_channel(stored.channel)
    .with_new_flag(stored.is_new_product)
}

pub fn write_table(path: &Path, records: &[ProductRecord]) -> Result<(), OutputError> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    info!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}

pub fn write_analysis(path: &Path, analysis: &AnalysisResult) -> Result<(), OutputError> {
    ensure_parent(path)?;
    let mut file = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut file, analysis)?;
    file.flush()?;
    info!("Wrote analysis to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{Analyzer, AnalyzerImpl};
    use crate::model::{Channel, Source, Style};
    use chrono::NaiveDate;

    fn sample() -> Vec<ProductRecord> {
        vec![
            ProductRecord::new(
                "Arizona, Soft Footbed".into(),
                "0051793".into(),
                "sandals".into(),
                Style::OpenToe,
                99.95,
                Some(135.0),
                NaiveDate::from_ymd_opt(2023, 1, 15).unwrap(),
                Source::Historical,
            )
            .with_channel(Channel::Dtc)
            .with_new_flag(true),
            ProductRecord::new(
                "Boston".into(),
                "1017723".into(),
                "clogs".into(),
                Style::ClosedToe,
                160.0,
                None,
                NaiveDate::from_ymd_opt(2025, 10, 1).unwrap(),
                Source::Current,
            ),
        ]
    }

    #[test]
    fn table_has_expected_header_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/table.csv");

        write_table(&path, &sample()).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(
            text.lines().next().unwrap(),
            "name,sku,category,style,current_price,original_price,discount_amount,discount_percentage,is_new_product,channel,date,source"
        );
        assert!(text.contains("open-toe"));
        assert!(text.contains("2023-01-15"));
        assert!(text.contains("historical"));

        assert_eq!(read_table(&path).unwrap(), sample());
    }

    #[test]
    fn missing_table_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_table(&dir.path().join("none.csv")).unwrap().is_empty());
    }

    #[test]
    fn bad_rows_are_skipped_on_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.csv");
        write_table(&path, &sample()).unwrap();

        let mut text = fs::read_to_string(&path).unwrap();
        text.push_str("Broken,X,sandals,open-toe,not-a-price,1,0,0,false,dtc,2023-01-01,historical\n");
        fs::write(&path, text).unwrap();

        assert_eq!(read_table(&path).unwrap().len(), 2);
    }

    #[test]
    fn inconsistent_discount_columns_are_recomputed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.csv");
        fs::write(
            &path,
            "name,sku,category,style,current_price,original_price,discount_amount,discount_percentage,is_new_product,channel,date,source\n\
             Arizona,A1,sandals,open-toe,80.0,100.0,55.0,3.0,true,dtc,2023-01-01,historical\n\
             Gizeh,G1,sandals,open-toe,90.0,70.0,0.0,0.0,false,unknown,2023-01-01,historical\n",
        )
        .unwrap();

        let records = read_table(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].discount_amount, 20.0);
        assert_eq!(records[0].discount_percentage, 20.0);
        assert!(records[0].is_new_product);
        assert_eq!(records[0].channel, Channel::Dtc);
        // an original below the current price collapses to the current price
        assert_eq!(records[1].original_price, 90.0);
        assert_eq!(records[1].discount_amount, 0.0);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn failed_final_flush_is_reported() {
        let full = Path::new("/dev/full");
        if !full.exists() {
            return;
        }
        // the whole document fits in the write buffer, so only the flush hits the device
        let err = write_analysis(full, &AnalysisResult::default());
        assert!(matches!(err, Err(OutputError::Io(_))));
    }

    #[test]
    fn analysis_is_written_as_json_tree() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analysis.json");
        let result = AnalyzerImpl::new().analyze(&sample());

        write_analysis(&path, &result).unwrap();
        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!(json["overall_asp_trends"]["monthly_asp"]["2023-01"].is_object());
        assert!(json["promotional_impact"]["2023-01"]["discount_rate"].is_number());
    }

    #[test]
    fn output_errors_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        // a directory cannot be opened as a file
        let err = write_analysis(dir.path(), &AnalysisResult::default());
        assert!(matches!(err, Err(OutputError::Io(_))));
    }
}
