pub mod models;

use crate::events::{EventSink, PipelineEvent};
use crate::schema::{dataset_header, FeatureVector, FEATURE_COLUMNS, FEATURE_COUNT};
use models::{Corpus, DatasetTable, RawRow};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Dataset file not found: {0}")]
    NotFound(PathBuf),
    #[error(
        "Dataset schema mismatch (missing: [{}], unexpected: [{}]); expected header: {}",
        .missing.join(", "), .unexpected.join(", "), dataset_header().join(",")
    )]
    SchemaMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },
}

pub type Result<T> = std::result::Result<T, DatasetError>;

/// Write a file by filling a temp file in the same directory and renaming it
/// over `path`. Readers never observe a partial file. Parent directories are
/// created.
pub fn write_atomic<E, F>(path: &Path, fill: F) -> std::result::Result<(), E>
where
    E: From<std::io::Error>,
    F: FnOnce(&mut File) -> std::result::Result<(), E>,
{
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
    fill(tmp.as_file_mut())?;
    tmp.as_file_mut().flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Write the corpus with the canonical header, one row per sample.
pub fn write_corpus(path: &Path, corpus: &Corpus) -> Result<()> {
    write_atomic::<DatasetError, _>(path, |file| {
        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(dataset_header())?;
        for sample in corpus.iter() {
            let mut record: Vec<String> = sample
                .features
                .values()
                .iter()
                .map(|v| v.to_string())
                .collect();
            record.push(sample.label.clone());
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    })?;
    log::info!("Saved {} samples to {}", corpus.len(), path.display());
    Ok(())
}

/// Read a dataset file without interpreting cell values.
///
/// A completely empty file reads as an empty table. Any header other than the
/// canonical one is a schema error; columns are never matched up by name.
pub fn read_table(path: &Path) -> Result<DatasetTable> {
    if !path.exists() {
        return Err(DatasetError::NotFound(path.to_path_buf()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let header: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
    if header.is_empty() || header.iter().all(|h| h.is_empty()) {
        return Ok(DatasetTable::default());
    }
    check_header(&header)?;

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let line = i + 2;
        match record {
            Ok(r) => rows.push(RawRow {
                line,
                cells: r.iter().map(|c| c.trim().to_string()).collect(),
            }),
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => rows.push(RawRow {
                line,
                cells: vec![format!("<unreadable: {}>", e)],
            }),
        }
    }
    Ok(DatasetTable { rows })
}

fn check_header(header: &[String]) -> Result<()> {
    let expected = dataset_header();
    if header.iter().map(String::as_str).eq(expected.iter().copied()) {
        return Ok(());
    }
    let missing = expected
        .iter()
        .filter(|c| !header.iter().any(|h| h == *c))
        .map(|c| c.to_string())
        .collect();
    let unexpected = header
        .iter()
        .filter(|h| !expected.contains(&h.as_str()))
        .cloned()
        .collect();
    Err(DatasetError::SchemaMismatch { missing, unexpected })
}

/// Result of numeric coercion: surviving rows plus the lines that were dropped.
#[derive(Debug, Default)]
pub struct Coerced {
    pub corpus: Corpus,
    pub dropped_lines: Vec<usize>,
}

/// Coerce every row to a labeled sample. A row is dropped, together with its
/// label, if it has the wrong number of cells, any non-numeric or non-finite
/// feature cell, or an empty label.
pub fn coerce(table: &DatasetTable, sink: &dyn EventSink) -> Coerced {
    let mut out = Coerced::default();

    for row in &table.rows {
        match coerce_row(row) {
            Ok((features, label)) => out.corpus.push(features, label),
            Err(detail) => {
                sink.emit(PipelineEvent::RowDropped { row: row.line, detail });
                out.dropped_lines.push(row.line);
            }
        }
    }
    out
}

/// Read and coerce a dataset file in one step.
pub fn read_corpus(path: &Path, sink: &dyn EventSink) -> Result<Coerced> {
    let table = read_table(path)?;
    Ok(coerce(&table, sink))
}

fn coerce_row(row: &RawRow) -> std::result::Result<(FeatureVector, String), String> {
    if row.cells.len() != FEATURE_COUNT + 1 {
        return Err(format!(
            "expected {} fields, found {}",
            FEATURE_COUNT + 1,
            row.cells.len()
        ));
    }

    let mut values = [0.0_f32; FEATURE_COUNT];
    for (i, cell) in row.cells[..FEATURE_COUNT].iter().enumerate() {
        values[i] = match cell.parse::<f32>() {
            Ok(v) if v.is_finite() => v,
            _ => return Err(format!("{} is not a finite number: {:?}", FEATURE_COLUMNS[i], cell)),
        };
    }

    let label = &row.cells[FEATURE_COUNT];
    if label.is_empty() {
        return Err("empty label".to_string());
    }

    let features = FeatureVector::from_slice(&values)
        .map_err(|_| "invalid feature vector".to_string())?;
    Ok((features, label.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MemorySink;
    use std::fs;

    fn vector(seed: f32) -> FeatureVector {
        let values: Vec<f32> = (0..FEATURE_COUNT).map(|i| seed + i as f32 * 0.25).collect();
        FeatureVector::from_slice(&values).unwrap()
    }

    fn numeric_row(seed: f32) -> String {
        (0..FEATURE_COUNT)
            .map(|i| (seed + i as f32).to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    #[test]
    fn test_write_then_read_header_and_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("features").join("features.csv");

        let mut corpus = Corpus::new();
        corpus.push(vector(1.5), "jazz");
        corpus.push(vector(-3.125), "pop");
        write_corpus(&path, &corpus).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let first_line = text.lines().next().unwrap();
        assert_eq!(first_line, dataset_header().join(","));

        let table = read_table(&path).unwrap();
        assert_eq!(table.len(), 2);
        let coerced = coerce(&table, &MemorySink::new());
        assert!(coerced.dropped_lines.is_empty());
        assert_eq!(coerced.corpus, corpus);
    }

    #[test]
    fn test_empty_file_is_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("features.csv");
        fs::write(&path, "").unwrap();
        assert!(read_table(&path).unwrap().is_empty());

        fs::write(&path, dataset_header().join(",") + "\n").unwrap();
        assert!(read_table(&path).unwrap().is_empty());
    }

    #[test]
    fn test_schema_mismatch_missing_and_reordered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("features.csv");

        let mut header = dataset_header();
        header.retain(|c| *c != "rolloff");
        fs::write(&path, header.join(",") + ",extra\n").unwrap();
        match read_table(&path).unwrap_err() {
            DatasetError::SchemaMismatch { missing, unexpected } => {
                assert_eq!(missing, vec!["rolloff".to_string()]);
                assert_eq!(unexpected, vec!["extra".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }

        let mut swapped = dataset_header();
        swapped.swap(0, 1);
        fs::write(&path, swapped.join(",") + "\n").unwrap();
        assert!(matches!(
            read_table(&path).unwrap_err(),
            DatasetError::SchemaMismatch { ref missing, ref unexpected }
                if missing.is_empty() && unexpected.is_empty()
        ));
    }

    #[test]
    fn test_coercion_drops_rows_with_labels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("features.csv");
        let bad_cell = numeric_row(0.0).replacen("0", "abc", 1);
        let contents = format!(
            "{}\n{},jazz\n{},phonk\n{},pop\n1,2,3\n{},nan_row\n{},\n",
            dataset_header().join(","),
            numeric_row(0.0),
            bad_cell,
            numeric_row(10.0),
            numeric_row(0.0).replacen("0", "NaN", 1),
            numeric_row(5.0),
        );
        fs::write(&path, contents).unwrap();

        let table = read_table(&path).unwrap();
        assert_eq!(table.len(), 6);

        let sink = MemorySink::new();
        let coerced = coerce(&table, &sink);
        assert_eq!(coerced.corpus.len(), 2);
        assert_eq!(coerced.corpus.samples()[0].label, "jazz");
        assert_eq!(coerced.corpus.samples()[1].label, "pop");
        assert_eq!(coerced.corpus.samples()[1].features.tempo(), 10.0);
        assert_eq!(coerced.dropped_lines, vec![3, 5, 6, 7]);
        assert_eq!(sink.events().len(), 4);
    }

    #[test]
    fn test_missing_dataset() {
        assert!(matches!(
            read_table(Path::new("/nonexistent/features.csv")),
            Err(DatasetError::NotFound(_))
        ));
    }
}
