use std::collections::VecDeque;
use std::io::Read;
use std::path::Path;

use indexmap::IndexMap;

use crate::error::{AiError, Result};

/// A raw pedigree row, parents still referenced by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonRecord {
    pub name: String,
    pub mother: Option<String>,
    pub father: Option<String>,
    pub observed_trait: Option<bool>,
}

impl PersonRecord {
    /// A person with no recorded parents.
    pub fn founder(name: &str, observed_trait: Option<bool>) -> Self {
        Self {
            name: name.to_string(),
            mother: None,
            father: None,
            observed_trait,
        }
    }

    /// A person with both parents recorded.
    pub fn child(name: &str, mother: &str, father: &str, observed_trait: Option<bool>) -> Self {
        Self {
            name: name.to_string(),
            mother: Some(mother.to_string()),
            father: Some(father.to_string()),
            observed_trait,
        }
    }
}

/// A person in a loaded [`Pedigree`].
///
/// Parents are stored as indices into the owning pedigree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    name: String,
    mother: Option<usize>,
    father: Option<usize>,
    observed_trait: Option<bool>,
}

impl Person {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mother(&self) -> Option<usize> {
        self.mother
    }

    pub fn father(&self) -> Option<usize> {
        self.father
    }

    /// Trait evidence: `Some(true)` observed with the trait, `Some(false)`
    /// observed without it, `None` unknown.
    pub fn observed_trait(&self) -> Option<bool> {
        self.observed_trait
    }

    /// `(mother, father)` when both parents are known.
    ///
    /// A person with only one recorded parent has no usable parent pair and
    /// is scored as a founder.
    pub fn parents(&self) -> Option<(usize, usize)> {
        match (self.mother, self.father) {
            (Some(m), Some(f)) => Some((m, f)),
            _ => None,
        }
    }

    pub fn is_founder(&self) -> bool {
        self.parents().is_none()
    }
}

/// Registry of people keyed by name, in input order.
///
/// A pedigree is immutable once loaded. Every parent reference has been
/// resolved against the registry and the ancestry graph is acyclic.
#[derive(Debug, Clone, Default)]
pub struct Pedigree {
    people: IndexMap<String, Person>,
}

impl Pedigree {
    /// Number of people in the pedigree.
    pub fn n_people(&self) -> usize {
        self.people.len()
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }

    /// Look up the 0-based index of a person by name.
    pub fn person_index(&self, name: &str) -> Option<usize> {
        self.people.get_index_of(name)
    }

    /// Look up a person by name.
    pub fn get(&self, name: &str) -> Option<&Person> {
        self.people.get(name)
    }

    /// Person at `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    pub fn person(&self, index: usize) -> &Person {
        &self.people[index]
    }

    /// People in input order.
    pub fn people(&self) -> impl Iterator<Item = &Person> {
        self.people.values()
    }

    /// Names in input order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.people.keys().map(|k| k.as_str())
    }

    /// Build a pedigree from raw records.
    ///
    /// # Errors
    /// Returns [`AiError::DataFormat`] for a duplicate name, a parent name
    /// that is not itself in the records, a person listed as their own
    /// parent, or a cycle in the ancestry.
    pub fn from_records(records: &[PersonRecord]) -> Result<Self> {
        let mut people: IndexMap<String, Person> = IndexMap::with_capacity(records.len());

        // Register everyone first so parents may appear after their children.
        for rec in records {
            if people.contains_key(&rec.name) {
                return Err(AiError::DataFormat(format!(
                    "Duplicate person name: '{}'",
                    rec.name
                )));
            }
            people.insert(
                rec.name.clone(),
                Person {
                    name: rec.name.clone(),
                    mother: None,
                    father: None,
                    observed_trait: rec.observed_trait,
                },
            );
        }

        for (i, rec) in records.iter().enumerate() {
            let mother = resolve_parent(&people, i, &rec.name, rec.mother.as_deref(), "mother")?;
            let father = resolve_parent(&people, i, &rec.name, rec.father.as_deref(), "father")?;

            if mother.is_some() != father.is_some() {
                log::warn!(
                    "'{}' has only one recorded parent; treating as a founder",
                    rec.name
                );
            }

            let person = &mut people[i];
            person.mother = mother;
            person.father = father;
        }

        let pedigree = Self { people };
        pedigree.check_acyclic()?;
        Ok(pedigree)
    }

    /// Read a pedigree from a CSV file.
    ///
    /// Expected columns (header required): `name`, `mother`, `father`,
    /// `trait`. Blank parents mean unknown. `trait` is `1` or `0` when
    /// observed and blank otherwise.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, a column or field is
    /// missing, or the records fail [`Pedigree::from_records`].
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = csv_builder().from_path(path.as_ref())?;
        Self::from_csv_reader(reader)
    }

    /// Read a pedigree from any CSV source; same format as [`Pedigree::from_csv`].
    pub fn from_reader<R: Read>(source: R) -> Result<Self> {
        Self::from_csv_reader(csv_builder().from_reader(source))
    }

    fn from_csv_reader<R: Read>(mut reader: csv::Reader<R>) -> Result<Self> {
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.to_lowercase())
            .collect();

        let column = |name: &str| {
            headers.iter().position(|h| h == name).ok_or_else(|| {
                AiError::DataFormat(format!("CSV missing '{}' column", name))
            })
        };
        let name_col = column("name")?;
        let mother_col = column("mother")?;
        let father_col = column("father")?;
        let trait_col = column("trait")?;

        let mut records = Vec::new();

        for (row, result) in reader.records().enumerate() {
            let record = result.map_err(|e| malformed_row(e, row + 1))?;
            let field = |col: usize, what: &str| {
                record.get(col).ok_or_else(|| {
                    AiError::DataFormat(format!("Missing {} field in row {}", what, row + 1))
                })
            };

            let name = field(name_col, "name")?;
            if name.is_empty() {
                return Err(AiError::DataFormat(format!("Empty name in row {}", row + 1)));
            }

            records.push(PersonRecord {
                name: name.to_string(),
                mother: parse_parent(field(mother_col, "mother")?),
                father: parse_parent(field(father_col, "father")?),
                observed_trait: parse_trait(field(trait_col, "trait")?),
            });
        }

        log::debug!("read {} pedigree rows", records.len());
        Self::from_records(&records)
    }

    /// Reject ancestry cycles (Kahn's algorithm over parent -> child edges).
    fn check_acyclic(&self) -> Result<()> {
        let n = self.people.len();
        let mut children_of: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut in_degree = vec![0u32; n];

        for (i, person) in self.people.values().enumerate() {
            for parent in [person.mother, person.father].into_iter().flatten() {
                children_of[parent].push(i);
                in_degree[i] += 1;
            }
        }

        let mut queue: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut visited = 0usize;

        while let Some(node) = queue.pop_front() {
            visited += 1;
            for &child in &children_of[node] {
                in_degree[child] -= 1;
                if in_degree[child] == 0 {
                    queue.push_back(child);
                }
            }
        }

        if visited != n {
            return Err(AiError::DataFormat(
                "Pedigree contains a cycle".to_string(),
            ));
        }
        Ok(())
    }
}

fn csv_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .flexible(false)
        .trim(csv::Trim::All);
    builder
}

/// A row with the wrong number of fields is a data error, not an I/O one.
pub(crate) fn malformed_row(err: csv::Error, row: usize) -> AiError {
    if let csv::ErrorKind::UnequalLengths {
        expected_len, len, ..
    } = err.kind()
    {
        return AiError::DataFormat(format!(
            "row {} has {} fields, expected {}",
            row, len, expected_len
        ));
    }
    AiError::Csv(err)
}

fn resolve_parent(
    people: &IndexMap<String, Person>,
    child: usize,
    child_name: &str,
    parent: Option<&str>,
    role: &str,
) -> Result<Option<usize>> {
    let Some(parent) = parent else {
        return Ok(None);
    };
    let index = people.get_index_of(parent).ok_or_else(|| {
        AiError::DataFormat(format!(
            "'{}' references {} '{}' which is not in the pedigree",
            child_name, role, parent
        ))
    })?;
    if index == child {
        return Err(AiError::DataFormat(format!(
            "'{}' is listed as their own {}",
            child_name, role
        )));
    }
    Ok(Some(index))
}

/// Blank parent fields mean unknown.
fn parse_parent(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// `1`/`true` and `0`/`false` are observations; anything else is unknown.
fn parse_trait(s: &str) -> Option<bool> {
    match s.trim() {
        "1" => Some(true),
        "0" => Some(false),
        t if t.eq_ignore_ascii_case("true") => Some(true),
        t if t.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}
