//! Export of analysis results and import of labeled training pairs.
//!
//! Path-based functions wrap the writer/reader-based ones and attach the path
//! to any I/O error. The writer/reader-based ones report I/O failures on the
//! pseudo path [`STREAM_PATH`].

use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::analyzer::AnalysisResult;
use super::LabeledPair;
use crate::error::{Result, SimilarityError};

/// Path reported by I/O errors of the writer/reader-based functions.
pub const STREAM_PATH: &str = "<stream>";

/// Column order of CSV and TSV exports.
pub const EXPORT_HEADER: [&str; 10] = [
    "String1",
    "String2",
    "Similarity",
    "IsDuplicate",
    "Confidence",
    "JaroWinkler",
    "LCS",
    "Phonetic",
    "Ngram",
    "Jaccard",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
    Tsv,
}

impl ExportFormat {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Tsv => "tsv",
        }
    }

    fn delimiter(self) -> u8 {
        match self {
            ExportFormat::Tsv => b'\t',
            _ => b',',
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Write `result` to `path` in the given format.
pub fn export(result: &AnalysisResult, path: impl AsRef<Path>, format: ExportFormat) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| SimilarityError::io(path, e))?;
    let writer = BufWriter::new(file);
    match format {
        ExportFormat::Json => json_to(result, writer, path),
        ExportFormat::Csv | ExportFormat::Tsv => delimited_to(result, writer, format, path),
    }
}

/// Pretty-printed JSON.
pub fn write_json<W: Write>(result: &AnalysisResult, writer: W) -> Result<()> {
    json_to(result, writer, Path::new(STREAM_PATH))
}

pub fn write_csv<W: Write>(result: &AnalysisResult, writer: W) -> Result<()> {
    delimited_to(result, writer, ExportFormat::Csv, Path::new(STREAM_PATH))
}

pub fn write_tsv<W: Write>(result: &AnalysisResult, writer: W) -> Result<()> {
    delimited_to(result, writer, ExportFormat::Tsv, Path::new(STREAM_PATH))
}

fn json_to<W: Write>(result: &AnalysisResult, mut writer: W, path: &Path) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, result).map_err(|e| SimilarityError::from_json(e, path))?;
    writer.flush().map_err(|e| SimilarityError::io(path, e))
}

fn delimited_to<W: Write>(result: &AnalysisResult, writer: W, format: ExportFormat, path: &Path) -> Result<()> {
    let csv_err = |e| SimilarityError::from_csv(e, path, format);
    let mut out = csv::WriterBuilder::new()
        .delimiter(format.delimiter())
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(writer);
    out.write_record(EXPORT_HEADER).map_err(csv_err)?;
    for pair in &result.pairs {
        let b = &pair.breakdown;
        out.write_record([
            pair.s1.clone(),
            pair.s2.clone(),
            format!("{:.4}", pair.similarity),
            pair.is_duplicate.to_string(),
            format!("{:.4}", pair.confidence),
            format!("{:.4}", b.jaro_winkler),
            format!("{:.4}", b.lcs),
            format!("{:.4}", b.phonetic),
            format!("{:.4}", b.ngram),
            format!("{:.4}", b.jaccard),
        ])
        .map_err(csv_err)?;
    }
    out.flush().map_err(|e| SimilarityError::io(path, e))
}

/// Write the Markdown report of `result` to `path`.
pub fn export_report(result: &AnalysisResult, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    std::fs::write(path, render_report(result)).map_err(|e| SimilarityError::io(path, e))
}

/// Markdown report: statistics, numbered recommendations, pair table.
#[must_use]
pub fn render_report(result: &AnalysisResult) -> String {
    let stats = &result.statistics;
    let share = |n: usize| crate::algorithms::numeric::count_ratio(n, stats.total_pairs) * 100.0;

    let mut report = String::from("# Similarity analysis report\n\n## Statistics\n\n");
    report.push_str(&format!("- Total pairs: {}\n", stats.total_pairs));
    report.push_str(&format!(
        "- Duplicates: {} ({:.1}%)\n",
        stats.duplicate_pairs,
        share(stats.duplicate_pairs)
    ));
    report.push_str(&format!(
        "- Non-duplicates: {} ({:.1}%)\n",
        stats.non_duplicate_pairs,
        share(stats.non_duplicate_pairs)
    ));
    report.push_str(&format!("- Average similarity: {:.4}\n", stats.average_similarity));
    report.push_str(&format!("- Minimum similarity: {:.4}\n", stats.min_similarity));
    report.push_str(&format!("- Maximum similarity: {:.4}\n", stats.max_similarity));
    report.push_str(&format!("- Median similarity: {:.4}\n", stats.median_similarity));

    report.push_str("\n## Recommendations\n\n");
    for (i, rec) in result.recommendations.iter().enumerate() {
        report.push_str(&format!("{}. {}\n", i + 1, rec));
    }

    report.push_str("\n## Pairs\n\n");
    report.push_str("| String1 | String2 | Similarity | IsDuplicate | Confidence |\n");
    report.push_str("|---------|---------|------------|-------------|------------|\n");
    for pair in &result.pairs {
        report.push_str(&format!(
            "| {} | {} | {:.4} | {} | {:.4} |\n",
            escape_cell(&pair.s1),
            escape_cell(&pair.s2),
            pair.similarity,
            pair.is_duplicate,
            pair.confidence
        ));
    }
    report
}

fn escape_cell(s: &str) -> String {
    s.replace('|', "\\|")
}

/// Load labeled pairs from a JSON or CSV file.
pub fn import_training_pairs(path: impl AsRef<Path>, format: ExportFormat) -> Result<Vec<LabeledPair>> {
    if format == ExportFormat::Tsv {
        return Err(unsupported_import(format));
    }
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| SimilarityError::io(path, e))?;
    pairs_from(BufReader::new(file), format, path)
}

/// Reader-based variant of [`import_training_pairs`].
///
/// JSON is an array of `{s1, s2, is_duplicate}`. CSV needs a header and at
/// least one row; rows shorter than three columns are skipped and the flag is
/// read from the fourth column when present, else the third.
pub fn read_training_pairs<R: Read>(reader: R, format: ExportFormat) -> Result<Vec<LabeledPair>> {
    pairs_from(reader, format, Path::new(STREAM_PATH))
}

fn pairs_from<R: Read>(reader: R, format: ExportFormat, path: &Path) -> Result<Vec<LabeledPair>> {
    match format {
        ExportFormat::Json => serde_json::from_reader(reader).map_err(|e| SimilarityError::from_json(e, path)),
        ExportFormat::Csv => read_csv_pairs(reader, path),
        ExportFormat::Tsv => Err(unsupported_import(format)),
    }
}

fn read_csv_pairs<R: Read>(reader: R, path: &Path) -> Result<Vec<LabeledPair>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut rows = 0;
    let mut pairs = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(|e| SimilarityError::from_csv(e, path, ExportFormat::Csv))?;
        rows += 1;
        if record.len() < 3 {
            continue;
        }
        let flag = record.get(3).or_else(|| record.get(2)).unwrap_or_default().trim();
        pairs.push(LabeledPair::new(&record[0], &record[1], flag == "true" || flag == "1"));
    }

    if rows == 0 {
        return Err(SimilarityError::Format {
            format: ExportFormat::Csv,
            line: None,
            reason: "a header and at least one data row are required".to_string(),
        });
    }
    Ok(pairs)
}

fn unsupported_import(format: ExportFormat) -> SimilarityError {
    SimilarityError::Format {
        format,
        line: None,
        reason: "unsupported import format".to_string(),
    }
}
