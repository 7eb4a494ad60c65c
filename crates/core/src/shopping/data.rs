use std::io::Read;
use std::path::Path;

use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{AiError, Result};
use crate::heredity::pedigree::malformed_row;

/// Number of evidence columns per session.
pub const N_FEATURES: usize = 17;

/// One browsing session's evidence, in [`COLUMNS`] order.
///
/// Integer, month and boolean columns are stored as `f64` so every column
/// takes part in distance computations alike.
pub type Evidence = [f64; N_FEATURES];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Integer,
    Float,
    Month,
    VisitorType,
    Boolean,
}

/// Evidence columns in order, with how each is parsed.
const COLUMNS: [(&str, Kind); N_FEATURES] = [
    ("Administrative", Kind::Integer),
    ("Administrative_Duration", Kind::Float),
    ("Informational", Kind::Integer),
    ("Informational_Duration", Kind::Float),
    ("ProductRelated", Kind::Integer),
    ("ProductRelated_Duration", Kind::Float),
    ("BounceRates", Kind::Float),
    ("ExitRates", Kind::Float),
    ("PageValues", Kind::Float),
    ("SpecialDay", Kind::Float),
    ("Month", Kind::Month),
    ("OperatingSystems", Kind::Integer),
    ("Browser", Kind::Integer),
    ("Region", Kind::Integer),
    ("TrafficType", Kind::Integer),
    ("VisitorType", Kind::VisitorType),
    ("Weekend", Kind::Boolean),
];

const LABEL_COLUMN: &str = "Revenue";

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Sessions and their purchase labels (`true` when `Revenue` is `TRUE`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub evidence: Vec<Evidence>,
    pub labels: Vec<bool>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Read a shopping-session CSV.
///
/// Columns are located by header name, so extra columns are ignored.
///
/// # Errors
/// Returns [`AiError::DataFormat`] naming the row and column of the first
/// value that does not parse, or a missing column.
pub fn load_data<P: AsRef<Path>>(path: P) -> Result<Dataset> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path.as_ref())?;
    read_dataset(reader)
}

/// Same as [`load_data`], from any reader.
pub fn load_data_from_reader<R: Read>(source: R) -> Result<Dataset> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(source);
    read_dataset(reader)
}

fn read_dataset<R: Read>(mut reader: csv::Reader<R>) -> Result<Dataset> {
    let headers = reader.headers()?.clone();
    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| AiError::DataFormat(format!("CSV missing '{}' column", name)))
    };

    let mut columns = [0usize; N_FEATURES];
    for (slot, (name, _)) in columns.iter_mut().zip(COLUMNS.iter()) {
        *slot = position(*name)?;
    }
    let label_col = position(LABEL_COLUMN)?;

    let mut data = Dataset::default();
    for (row, result) in reader.records().enumerate() {
        let record = result.map_err(|e| malformed_row(e, row + 1))?;
        let field = |col: usize, name: &str| {
            record.get(col).ok_or_else(|| {
                AiError::DataFormat(format!("row {}: missing '{}'", row + 1, name))
            })
        };

        let mut evidence = [0.0; N_FEATURES];
        for (i, (name, kind)) in COLUMNS.iter().enumerate() {
            let raw = field(columns[i], *name)?;
            evidence[i] = parse_value(raw, *kind).ok_or_else(|| {
                AiError::DataFormat(format!(
                    "row {}: cannot parse '{}' as {:?} for '{}'",
                    row + 1,
                    raw,
                    kind,
                    name
                ))
            })?;
        }

        let raw_label = field(label_col, LABEL_COLUMN)?;
        let label = parse_bool(raw_label).ok_or_else(|| {
            AiError::DataFormat(format!(
                "row {}: cannot parse '{}' as a boolean for '{}'",
                row + 1,
                raw_label,
                LABEL_COLUMN
            ))
        })?;

        data.evidence.push(evidence);
        data.labels.push(label);
    }

    log::info!(
        "loaded {} sessions ({} with revenue)",
        data.len(),
        data.labels.iter().filter(|&&l| l).count()
    );
    Ok(data)
}

fn parse_value(raw: &str, kind: Kind) -> Option<f64> {
    match kind {
        Kind::Integer => raw.parse::<i64>().ok().map(|v| v as f64),
        Kind::Float => raw.parse::<f64>().ok().filter(|v| v.is_finite()),
        Kind::Month => month_index(raw).map(|m| m as f64),
        Kind::VisitorType => Some(if raw == "Returning_Visitor" { 1.0 } else { 0.0 }),
        Kind::Boolean => parse_bool(raw).map(|b| if b { 1.0 } else { 0.0 }),
    }
}

/// 0 for January through 11 for December; matches on the first three letters.
fn month_index(raw: &str) -> Option<usize> {
    let prefix = raw.get(..3)?.to_ascii_lowercase();
    MONTHS.iter().position(|m| *m == prefix)
}

fn parse_bool(raw: &str) -> Option<bool> {
    if raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// A train/test partition of a [`Dataset`].
#[derive(Debug, Clone)]
pub struct Split {
    pub train: Dataset,
    pub test: Dataset,
}

/// Shuffle with a seeded RNG, then hold out `ceil(test_size * n)` sessions
/// for testing.
///
/// # Errors
/// [`AiError::InvalidParameter`] unless `0 < test_size < 1` and both
/// partitions end up non-empty.
pub fn train_test_split(data: &Dataset, test_size: f64, seed: u64) -> Result<Split> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(AiError::InvalidParameter(format!(
            "test size {} must lie strictly between 0 and 1",
            test_size
        )));
    }
    let n = data.len();
    let n_test = (test_size * n as f64).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(AiError::InvalidParameter(format!(
            "cannot split {} sessions with test size {}",
            n, test_size
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let subset = |idx: &[usize]| Dataset {
        evidence: idx.iter().map(|&i| data.evidence[i]).collect(),
        labels: idx.iter().map(|&i| data.labels[i]).collect(),
    };

    Ok(Split {
        test: subset(&indices[..n_test]),
        train: subset(&indices[n_test..]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Administrative,Administrative_Duration,Informational,Informational_Duration,ProductRelated,ProductRelated_Duration,BounceRates,ExitRates,PageValues,SpecialDay,Month,OperatingSystems,Browser,Region,TrafficType,VisitorType,Weekend,Revenue";

    fn csv(rows: &[&str]) -> String {
        let mut s = String::from(HEADER);
        for row in rows {
            s.push('\n');
            s.push_str(row);
        }
        s.push('\n');
        s
    }

    #[test]
    fn test_load_parses_every_kind() {
        let text = csv(&[
            "0,0,0,0,1,0,0.2,0.2,0,0,Feb,1,1,1,1,Returning_Visitor,FALSE,FALSE",
            "3,45.5,1,12.25,20,600.75,0.01,0.03,17.3,0.4,June,2,3,9,4,New_Visitor,TRUE,TRUE",
        ]);
        let data = load_data_from_reader(text.as_bytes()).unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data.labels, vec![false, true]);

        let first = &data.evidence[0];
        assert_eq!(first[10], 1.0); // Feb
        assert_eq!(first[15], 1.0); // returning visitor
        assert_eq!(first[16], 0.0);

        let second = &data.evidence[1];
        assert_eq!(second[0], 3.0);
        assert_eq!(second[1], 45.5);
        assert_eq!(second[5], 600.75);
        assert_eq!(second[10], 5.0); // June
        assert_eq!(second[15], 0.0);
        assert_eq!(second[16], 1.0);
    }

    #[test]
    fn test_bad_value_names_row_and_column() {
        let text = csv(&["x,0,0,0,1,0,0.2,0.2,0,0,Feb,1,1,1,1,Returning_Visitor,FALSE,FALSE"]);
        let err = load_data_from_reader(text.as_bytes()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("row 1"));
        assert!(msg.contains("'Administrative'"));
    }

    #[test]
    fn test_bad_month_rejected() {
        let text = csv(&["0,0,0,0,1,0,0.2,0.2,0,0,Smarch,1,1,1,1,Returning_Visitor,FALSE,FALSE"]);
        assert!(matches!(
            load_data_from_reader(text.as_bytes()),
            Err(AiError::DataFormat(_))
        ));
    }

    #[test]
    fn test_missing_label_column() {
        let text = "Administrative\n1\n";
        let err = load_data_from_reader(text.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_short_row_is_a_format_error() {
        let text = csv(&["0,0,0,Feb"]);
        assert!(matches!(
            load_data_from_reader(text.as_bytes()),
            Err(AiError::DataFormat(_))
        ));
    }

    #[test]
    fn test_month_index() {
        assert_eq!(month_index("Jan"), Some(0));
        assert_eq!(month_index("June"), Some(5));
        assert_eq!(month_index("dec"), Some(11));
        assert_eq!(month_index("Ju"), None);
    }

    #[test]
    fn test_split_sizes_and_determinism() {
        let data = Dataset {
            evidence: (0..10).map(|i| [i as f64; N_FEATURES]).collect(),
            labels: (0..10).map(|i| i % 2 == 0).collect(),
        };
        let a = train_test_split(&data, 0.4, 42).unwrap();
        let b = train_test_split(&data, 0.4, 42).unwrap();
        assert_eq!(a.test.len(), 4);
        assert_eq!(a.train.len(), 6);
        assert_eq!(a.test, b.test);

        // Every session lands in exactly one partition, with its own label.
        let mut seen: Vec<usize> = a
            .train
            .evidence
            .iter()
            .chain(a.test.evidence.iter())
            .map(|e| e[0] as usize)
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
        for (e, &l) in a.test.evidence.iter().zip(a.test.labels.iter()) {
            assert_eq!(l, (e[0] as usize) % 2 == 0);
        }
    }

    #[test]
    fn test_split_rejects_bad_size() {
        let data = Dataset {
            evidence: vec![[0.0; N_FEATURES]; 3],
            labels: vec![true; 3],
        };
        assert!(train_test_split(&data, 0.0, 1).is_err());
        assert!(train_test_split(&data, 1.0, 1).is_err());
        assert!(train_test_split(&Dataset::default(), 0.4, 1).is_err());
    }
}
