//! Raw tabular dataset loading
//!
//! Reads a headered CSV into typed columns. A column is numeric when every
//! non-blank cell parses as `f64`; blank cells in a numeric column become
//! `NaN` (missing). Anything else is kept as categorical text.

use mlops_core::{PipelineError, Result};
use std::io::Read;
use std::path::Path;
use tracing::info;

/// Cell values of one column
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Numeric(Vec<f64>),
    Categorical(Vec<String>),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            Self::Numeric(v) => v.len(),
            Self::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Numeric(_))
    }

    /// Row of the first missing or non-finite numeric cell
    pub fn first_missing(&self) -> Option<usize> {
        match self {
            Self::Numeric(v) => v.iter().position(|x| !x.is_finite()),
            Self::Categorical(_) => None,
        }
    }
}

/// A named column
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: ColumnValues,
}

/// Ordered collection of equally long columns
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawDataset {
    pub columns: Vec<Column>,
}

impl RawDataset {
    /// Load a dataset from a CSV file with a header row
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| {
            PipelineError::DataLoad(format!("cannot open {}: {e}", path.display()))
        })?;
        let dataset = Self::from_reader(file)?;
        info!(
            "Loaded {} rows x {} columns from {}",
            dataset.n_rows(),
            dataset.columns.len(),
            path.display()
        );
        Ok(dataset)
    }

    /// Parse CSV from any reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()
            .map_err(|e| PipelineError::DataLoad(format!("unreadable header: {e}")))?
            .iter()
            .map(str::to_string)
            .collect();

        if headers.is_empty() || headers.iter().all(String::is_empty) {
            return Err(PipelineError::DataLoad("missing header row".to_string()));
        }

        let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
        for (line_idx, record) in rdr.records().enumerate() {
            // csv rejects ragged records by default, so each record matches the header
            let record = record.map_err(|e| {
                PipelineError::DataLoad(format!("row {}: {e}", line_idx + 1))
            })?;
            for (col, value) in record.iter().enumerate() {
                cells[col].push(value.to_string());
            }
        }

        let columns = headers
            .into_iter()
            .zip(cells)
            .map(|(name, raw)| Column {
                name,
                values: infer_values(raw),
            })
            .collect();

        Ok(Self { columns })
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, |c| c.values.len())
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

fn infer_values(raw: Vec<String>) -> ColumnValues {
    if raw.iter().all(String::is_empty) {
        return ColumnValues::Categorical(raw);
    }
    let parsed: Option<Vec<f64>> = raw
        .iter()
        .map(|v| if v.is_empty() { Some(f64::NAN) } else { v.parse::<f64>().ok() })
        .collect();
    match parsed {
        Some(numbers) => ColumnValues::Numeric(numbers),
        None => ColumnValues::Categorical(raw),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use mlops_core::ErrorKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = "\
Patient_ID,Age,Stage,Tumor_Size,Survival_Prediction
1,54,II,3.5,Yes
2,61,III,4.1,No
3,47,I,2.0,Yes
";

    #[test]
    fn test_load_csv() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(SAMPLE.as_bytes())?;
        file.flush()?;

        let dataset = RawDataset::from_csv(file.path())?;
        assert_eq!(dataset.n_rows(), 3);
        assert_eq!(
            dataset.column_names(),
            vec!["Patient_ID", "Age", "Stage", "Tumor_Size", "Survival_Prediction"]
        );
        Ok(())
    }

    #[test]
    fn test_type_inference() -> Result<()> {
        let dataset = RawDataset::from_reader(SAMPLE.as_bytes())?;

        let age = dataset.column("Age").map(|c| c.values.clone());
        assert_eq!(age, Some(ColumnValues::Numeric(vec![54.0, 61.0, 47.0])));

        let stage = dataset.column("Stage").map(|c| c.values.is_numeric());
        assert_eq!(stage, Some(false));

        let target = dataset.column("Survival_Prediction").map(|c| c.values.is_numeric());
        assert_eq!(target, Some(false));
        Ok(())
    }

    #[test]
    fn test_blank_numeric_cell_is_missing_not_text() -> Result<()> {
        let dataset = RawDataset::from_reader("id,size\n1,9\n2,10\n3,\n4,100\n5,2.5\n".as_bytes())?;
        let size = dataset.column("size").map(|c| c.values.clone());
        let Some(ColumnValues::Numeric(values)) = size else {
            panic!("size should stay numeric, got {size:?}");
        };
        assert_eq!(values[0], 9.0);
        assert!(values[2].is_nan());
        assert_eq!(values[4], 2.5);
        assert_eq!(dataset.column("size").and_then(|c| c.values.first_missing()), Some(2));
        Ok(())
    }

    #[test]
    fn test_blank_column_stays_categorical() -> Result<()> {
        let dataset = RawDataset::from_reader("id,note\n1,\n2,\n".as_bytes())?;
        assert_eq!(dataset.column("note").map(|c| c.values.is_numeric()), Some(false));
        Ok(())
    }

    #[test]
    fn test_header_only_has_zero_rows() -> Result<()> {
        let dataset = RawDataset::from_reader("Patient_ID,Age,Survival_Prediction\n".as_bytes())?;
        assert_eq!(dataset.n_rows(), 0);
        assert_eq!(dataset.columns.len(), 3);
        Ok(())
    }

    #[test]
    fn test_ragged_row_is_load_error() {
        let err = RawDataset::from_reader("a,b\n1,2\n3\n".as_bytes()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataLoad);
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let err = RawDataset::from_csv("/nonexistent/data.csv").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataLoad);
    }
}
