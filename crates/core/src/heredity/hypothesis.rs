//! Exhaustive enumeration of gene/trait worlds over a pedigree.
//!
//! Every hypothesis assigns a [`GeneCount`] and a trait flag to each person.
//! Trait flags of people with observed evidence are fixed; everything else
//! ranges freely, giving `3^n * 2^k` hypotheses for `n` people of whom `k`
//! have an unknown trait. The space is addressed by a single mixed-radix
//! index, so it can be walked lazily or split into index ranges.
//!
//! This is brute force. It yields exact marginals and is only practical for
//! a handful of people.

use std::collections::BTreeSet;

use crate::error::{AiError, Result};

use super::pedigree::Pedigree;

/// Number of copies of the trait-linked gene a person carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GeneCount {
    Zero,
    One,
    Two,
}

impl GeneCount {
    pub const ALL: [GeneCount; 3] = [GeneCount::Zero, GeneCount::One, GeneCount::Two];

    /// Number of copies, also the index into per-gene-count tables.
    pub fn index(self) -> usize {
        match self {
            GeneCount::Zero => 0,
            GeneCount::One => 1,
            GeneCount::Two => 2,
        }
    }

    fn from_digit(digit: u64) -> Self {
        match digit {
            0 => GeneCount::Zero,
            1 => GeneCount::One,
            _ => GeneCount::Two,
        }
    }
}

/// One fully specified world: gene count and trait flag per person,
/// indexed by pedigree position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hypothesis {
    genes: Vec<GeneCount>,
    traits: Vec<bool>,
}

impl Hypothesis {
    /// Build a hypothesis from the three name sets: people carrying one
    /// copy, people carrying two copies, and people with the trait. Anyone
    /// in neither gene set carries zero copies.
    ///
    /// # Errors
    /// [`AiError::DataFormat`] for a name not in the pedigree,
    /// [`AiError::InvalidParameter`] if the gene sets overlap.
    pub fn from_sets(
        pedigree: &Pedigree,
        one_gene: &[&str],
        two_genes: &[&str],
        have_trait: &[&str],
    ) -> Result<Self> {
        let n = pedigree.n_people();
        let mut genes = vec![GeneCount::Zero; n];
        let mut traits = vec![false; n];

        let lookup = |name: &str| {
            pedigree.person_index(name).ok_or_else(|| {
                AiError::DataFormat(format!("'{}' is not in the pedigree", name))
            })
        };

        for name in one_gene {
            genes[lookup(*name)?] = GeneCount::One;
        }
        for name in two_genes {
            let i = lookup(*name)?;
            if genes[i] == GeneCount::One {
                return Err(AiError::InvalidParameter(format!(
                    "'{}' is in both the one-gene and two-gene sets",
                    name
                )));
            }
            genes[i] = GeneCount::Two;
        }
        for name in have_trait {
            traits[lookup(*name)?] = true;
        }

        Ok(Self { genes, traits })
    }

    /// Number of people covered.
    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    pub fn gene_count(&self, person: usize) -> GeneCount {
        self.genes[person]
    }

    pub fn has_trait(&self, person: usize) -> bool {
        self.traits[person]
    }

    /// Names of people assigned one copy.
    pub fn one_gene<'p>(&self, pedigree: &'p Pedigree) -> BTreeSet<&'p str> {
        self.names_where(pedigree, |i| self.genes[i] == GeneCount::One)
    }

    /// Names of people assigned two copies.
    pub fn two_genes<'p>(&self, pedigree: &'p Pedigree) -> BTreeSet<&'p str> {
        self.names_where(pedigree, |i| self.genes[i] == GeneCount::Two)
    }

    /// Names of people assigned the trait.
    pub fn have_trait<'p>(&self, pedigree: &'p Pedigree) -> BTreeSet<&'p str> {
        self.names_where(pedigree, |i| self.traits[i])
    }

    fn names_where<'p>(&self, pedigree: &'p Pedigree, keep: impl Fn(usize) -> bool) -> BTreeSet<&'p str> {
        pedigree
            .names()
            .enumerate()
            .filter(|(i, _)| keep(*i))
            .map(|(_, name)| name)
            .collect()
    }

    /// Whether the trait flags agree with every observation in `pedigree`.
    pub fn is_consistent_with(&self, pedigree: &Pedigree) -> bool {
        pedigree
            .people()
            .zip(&self.traits)
            .all(|(person, &has)| person.observed_trait().map_or(true, |obs| obs == has))
    }
}

/// The set of hypotheses consistent with a pedigree's trait evidence.
#[derive(Debug, Clone)]
pub struct HypothesisSpace {
    n_people: usize,
    /// Trait flags fixed by evidence; `false` where unobserved.
    base_traits: Vec<bool>,
    /// People whose trait is unobserved, one bit each in the trait index.
    free_traits: Vec<usize>,
    gene_assignments: u64,
    len: u64,
}

impl HypothesisSpace {
    /// # Errors
    /// Returns [`AiError::InvalidParameter`] if the space does not fit in
    /// a `u64` index.
    pub fn new(pedigree: &Pedigree) -> Result<Self> {
        let n_people = pedigree.n_people();
        let base_traits: Vec<bool> = pedigree
            .people()
            .map(|p| p.observed_trait().unwrap_or(false))
            .collect();
        let free_traits: Vec<usize> = pedigree
            .people()
            .enumerate()
            .filter(|(_, p)| p.observed_trait().is_none())
            .map(|(i, _)| i)
            .collect();

        let too_large = || {
            AiError::InvalidParameter(format!(
                "pedigree of {} people is too large for exhaustive enumeration",
                n_people
            ))
        };
        let gene_assignments = u32::try_from(n_people)
            .ok()
            .and_then(|n| 3u64.checked_pow(n))
            .ok_or_else(too_large)?;
        let trait_assignments = u32::try_from(free_traits.len())
            .ok()
            .and_then(|k| 2u64.checked_pow(k))
            .ok_or_else(too_large)?;
        let len = gene_assignments
            .checked_mul(trait_assignments)
            .ok_or_else(too_large)?;

        Ok(Self {
            n_people,
            base_traits,
            free_traits,
            gene_assignments,
            len,
        })
    }

    /// Number of hypotheses.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Decode the hypothesis at `index`.
    ///
    /// The low base-3 digits select gene counts (person 0 least
    /// significant); the quotient's bits select the free trait flags.
    ///
    /// # Panics
    /// Panics if `index >= self.len()`.
    pub fn hypothesis(&self, index: u64) -> Hypothesis {
        assert!(index < self.len, "hypothesis index {} out of range", index);

        let mut gene_index = index % self.gene_assignments;
        let trait_index = index / self.gene_assignments;

        let mut genes = Vec::with_capacity(self.n_people);
        for _ in 0..self.n_people {
            genes.push(GeneCount::from_digit(gene_index % 3));
            gene_index /= 3;
        }

        let mut traits = self.base_traits.clone();
        for (bit, &person) in self.free_traits.iter().enumerate() {
            traits[person] = (trait_index >> bit) & 1 == 1;
        }

        Hypothesis { genes, traits }
    }

    /// Lazily walk every hypothesis in index order.
    pub fn iter(&self) -> impl Iterator<Item = Hypothesis> + '_ {
        (0..self.len).map(move |i| self.hypothesis(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heredity::pedigree::PersonRecord;
    use std::collections::HashSet;

    fn trio(child_trait: Option<bool>) -> Pedigree {
        Pedigree::from_records(&[
            PersonRecord::founder("Alice", None),
            PersonRecord::founder("Bob", Some(false)),
            PersonRecord::child("Carol", "Alice", "Bob", child_trait),
        ])
        .unwrap()
    }

    #[test]
    fn test_space_size() {
        // 27 gene assignments, Alice and Carol free: 4 trait assignments.
        assert_eq!(HypothesisSpace::new(&trio(None)).unwrap().len(), 108);
        // Carol observed: only Alice free.
        assert_eq!(HypothesisSpace::new(&trio(Some(true))).unwrap().len(), 54);
    }

    #[test]
    fn test_every_hypothesis_respects_evidence() {
        let ped = trio(Some(true));
        let space = HypothesisSpace::new(&ped).unwrap();
        for h in space.iter() {
            assert!(h.is_consistent_with(&ped));
            assert!(!h.has_trait(1));
            assert!(h.has_trait(2));
        }
    }

    #[test]
    fn test_hypotheses_are_distinct_and_complete() {
        let ped = trio(None);
        let space = HypothesisSpace::new(&ped).unwrap();
        let all: HashSet<(Vec<GeneCount>, Vec<bool>)> = space
            .iter()
            .map(|h| ((0..3).map(|i| h.gene_count(i)).collect(), (0..3).map(|i| h.has_trait(i)).collect()))
            .collect();
        assert_eq!(all.len() as u64, space.len());
    }

    #[test]
    fn test_index_decoding() {
        let ped = trio(None);
        let space = HypothesisSpace::new(&ped).unwrap();

        let first = space.hypothesis(0);
        assert!((0..3).all(|i| first.gene_count(i) == GeneCount::Zero));
        assert!((0..3).all(|i| !first.has_trait(i)));

        // 1 + 2*3 = Alice one copy, Bob two copies; trait index 3 = both free flags set.
        let h = space.hypothesis(7 + 27 * 3);
        assert_eq!(h.gene_count(0), GeneCount::One);
        assert_eq!(h.gene_count(1), GeneCount::Two);
        assert_eq!(h.gene_count(2), GeneCount::Zero);
        assert!(h.has_trait(0));
        assert!(!h.has_trait(1));
        assert!(h.has_trait(2));
    }

    #[test]
    fn test_set_views_round_trip() {
        let ped = trio(None);
        let h = Hypothesis::from_sets(&ped, &["Alice"], &["Carol"], &["Carol"]).unwrap();
        assert_eq!(h.one_gene(&ped), BTreeSet::from(["Alice"]));
        assert_eq!(h.two_genes(&ped), BTreeSet::from(["Carol"]));
        assert_eq!(h.have_trait(&ped), BTreeSet::from(["Carol"]));
        assert_eq!(h.gene_count(1), GeneCount::Zero);
    }

    #[test]
    fn test_from_sets_rejects_overlap_and_unknown_names() {
        let ped = trio(None);
        assert!(matches!(
            Hypothesis::from_sets(&ped, &["Alice"], &["Alice"], &[]),
            Err(AiError::InvalidParameter(_))
        ));
        assert!(matches!(
            Hypothesis::from_sets(&ped, &["Dave"], &[], &[]),
            Err(AiError::DataFormat(_))
        ));
    }

    #[test]
    fn test_empty_pedigree_has_one_empty_world() {
        let ped = Pedigree::from_records(&[]).unwrap();
        let space = HypothesisSpace::new(&ped).unwrap();
        assert_eq!(space.len(), 1);
        assert!(space.hypothesis(0).is_empty());
    }

    #[test]
    fn test_oversized_pedigree_rejected() {
        let records: Vec<PersonRecord> = (0..45)
            .map(|i| PersonRecord::founder(&format!("p{}", i), None))
            .collect();
        let ped = Pedigree::from_records(&records).unwrap();
        assert!(matches!(
            HypothesisSpace::new(&ped),
            Err(AiError::InvalidParameter(_))
        ));
    }
}
