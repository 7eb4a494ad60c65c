use indexmap::IndexMap;

use crate::error::{AiError, Result};

use super::hypothesis::{GeneCount, Hypothesis};
use super::pedigree::Pedigree;

/// Per-person distributions over gene count and trait.
///
/// Holds running (unnormalized) sums while accumulating; after
/// [`MarginalDistribution::normalize`] each distribution sums to one.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MarginalDistribution {
    genes: [f64; 3],
    trait_true: f64,
    trait_false: f64,
}

impl MarginalDistribution {
    pub fn gene(&self, genes: GeneCount) -> f64 {
        self.genes[genes.index()]
    }

    pub fn trait_probability(&self, has_trait: bool) -> f64 {
        if has_trait {
            self.trait_true
        } else {
            self.trait_false
        }
    }

    pub fn gene_total(&self) -> f64 {
        self.genes.iter().sum()
    }

    pub fn trait_total(&self) -> f64 {
        self.trait_true + self.trait_false
    }

    fn add(&mut self, genes: GeneCount, has_trait: bool, p: f64) {
        self.genes[genes.index()] += p;
        if has_trait {
            self.trait_true += p;
        } else {
            self.trait_false += p;
        }
    }

    fn merge(&mut self, other: &Self) {
        for (a, b) in self.genes.iter_mut().zip(other.genes.iter()) {
            *a += b;
        }
        self.trait_true += other.trait_true;
        self.trait_false += other.trait_false;
    }

    /// Rescale both distributions to sum to one, in place.
    ///
    /// Returns `false` and leaves the values untouched when either total is
    /// zero or not finite.
    pub fn normalize(&mut self) -> bool {
        let gene_total = self.gene_total();
        let trait_total = self.trait_total();
        if !is_usable_mass(gene_total) || !is_usable_mass(trait_total) {
            return false;
        }
        for g in self.genes.iter_mut() {
            *g /= gene_total;
        }
        self.trait_true /= trait_total;
        self.trait_false /= trait_total;
        true
    }
}

fn is_usable_mass(total: f64) -> bool {
    total.is_finite() && total > 0.0
}

/// Running sums of joint probabilities, one [`MarginalDistribution`] per person.
#[derive(Debug, Clone)]
pub struct Marginals {
    names: Vec<String>,
    distributions: Vec<MarginalDistribution>,
    hypotheses: u64,
}

impl Marginals {
    /// Empty accumulator for every person in `pedigree`.
    pub fn new(pedigree: &Pedigree) -> Self {
        Self {
            names: pedigree.names().map(str::to_string).collect(),
            distributions: vec![MarginalDistribution::default(); pedigree.n_people()],
            hypotheses: 0,
        }
    }

    /// Add `probability` to each person's bucket for their gene count and
    /// trait flag under `hypothesis`.
    pub fn accumulate(&mut self, hypothesis: &Hypothesis, probability: f64) {
        debug_assert_eq!(hypothesis.len(), self.distributions.len());
        for (i, dist) in self.distributions.iter_mut().enumerate() {
            dist.add(hypothesis.gene_count(i), hypothesis.has_trait(i), probability);
        }
        self.hypotheses += 1;
    }

    /// Combine two partial accumulations over disjoint hypothesis sets.
    pub fn merge(mut self, other: Self) -> Self {
        debug_assert_eq!(self.names, other.names);
        for (a, b) in self.distributions.iter_mut().zip(other.distributions.iter()) {
            a.merge(b);
        }
        self.hypotheses += other.hypotheses;
        self
    }

    /// Number of hypotheses accumulated so far.
    pub fn hypotheses(&self) -> u64 {
        self.hypotheses
    }

    /// Unnormalized sums for `name`.
    pub fn get(&self, name: &str) -> Option<&MarginalDistribution> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.distributions[i])
    }

    /// Normalize every person's distributions.
    ///
    /// # Errors
    /// Returns [`AiError::EvidenceContradiction`] naming the first person
    /// whose accumulated mass is zero: no world consistent with the
    /// evidence has non-zero probability.
    pub fn normalize(self) -> Result<Posterior> {
        let mut people = IndexMap::with_capacity(self.names.len());
        for (name, mut dist) in self.names.into_iter().zip(self.distributions) {
            if !dist.normalize() {
                return Err(AiError::EvidenceContradiction(format!(
                    "no hypothesis consistent with the evidence has non-zero probability for '{}' \
                     (gene mass {}, trait mass {})",
                    name,
                    dist.gene_total(),
                    dist.trait_total()
                )));
            }
            people.insert(name, dist);
        }
        Ok(Posterior {
            people,
            hypotheses: self.hypotheses,
        })
    }
}

/// Normalized marginals for every person, in pedigree order.
#[derive(Debug, Clone, PartialEq)]
pub struct Posterior {
    people: IndexMap<String, MarginalDistribution>,
    hypotheses: u64,
}

impl Posterior {
    pub fn get(&self, name: &str) -> Option<&MarginalDistribution> {
        self.people.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MarginalDistribution)> {
        self.people.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.people.len()
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }

    /// Number of hypotheses that contributed.
    pub fn hypotheses(&self) -> u64 {
        self.hypotheses
    }

    /// Format the per-person report.
    pub fn summary(&self) -> String {
        let mut s = String::new();
        for (name, dist) in &self.people {
            s.push_str(&format!("{}:\n", name));
            s.push_str("  Gene:\n");
            for genes in GeneCount::ALL.iter().rev() {
                s.push_str(&format!("    {}: {:.4}\n", genes.index(), dist.gene(*genes)));
            }
            s.push_str("  Trait:\n");
            s.push_str(&format!("    True: {:.4}\n", dist.trait_probability(true)));
            s.push_str(&format!("    False: {:.4}\n", dist.trait_probability(false)));
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heredity::pedigree::PersonRecord;
    use approx::assert_relative_eq;

    fn pair() -> Pedigree {
        Pedigree::from_records(&[
            PersonRecord::founder("A", None),
            PersonRecord::founder("B", None),
        ])
        .unwrap()
    }

    #[test]
    fn test_accumulate_routes_buckets() {
        let ped = pair();
        let mut m = Marginals::new(&ped);
        m.accumulate(&Hypothesis::from_sets(&ped, &["A"], &["B"], &["B"]).unwrap(), 0.25);
        m.accumulate(&Hypothesis::from_sets(&ped, &[], &["A"], &["A"]).unwrap(), 0.5);

        let a = m.get("A").unwrap();
        assert_eq!(a.gene(GeneCount::One), 0.25);
        assert_eq!(a.gene(GeneCount::Two), 0.5);
        assert_eq!(a.gene(GeneCount::Zero), 0.0);
        assert_eq!(a.trait_probability(true), 0.5);
        assert_eq!(a.trait_probability(false), 0.25);

        let b = m.get("B").unwrap();
        assert_eq!(b.gene(GeneCount::Two), 0.25);
        assert_eq!(b.gene(GeneCount::Zero), 0.5);
        assert_eq!(m.hypotheses(), 2);
    }

    #[test]
    fn test_normalize_rescales_without_reordering() {
        let ped = pair();
        let mut m = Marginals::new(&ped);
        m.accumulate(&Hypothesis::from_sets(&ped, &["A"], &[], &["A", "B"]).unwrap(), 0.3);
        m.accumulate(&Hypothesis::from_sets(&ped, &[], &["A"], &[]).unwrap(), 0.1);

        let post = m.normalize().unwrap();
        let a = post.get("A").unwrap();
        assert_relative_eq!(a.gene(GeneCount::One), 0.75, epsilon = 1e-12);
        assert_relative_eq!(a.gene(GeneCount::Two), 0.25, epsilon = 1e-12);
        assert_relative_eq!(a.gene_total(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(a.trait_total(), 1.0, epsilon = 1e-12);
        assert_eq!(post.len(), 2);
    }

    #[test]
    fn test_zero_mass_is_contradiction() {
        let ped = pair();
        let m = Marginals::new(&ped);
        let err = m.normalize().unwrap_err();
        assert!(matches!(err, AiError::EvidenceContradiction(_)));
        assert!(err.to_string().contains("'A'"));
    }

    #[test]
    fn test_distribution_normalize_leaves_zero_untouched() {
        let mut d = MarginalDistribution::default();
        assert!(!d.normalize());
        assert_eq!(d, MarginalDistribution::default());
    }

    #[test]
    fn test_merge_matches_single_pass() {
        let ped = pair();
        let h1 = Hypothesis::from_sets(&ped, &["A"], &[], &[]).unwrap();
        let h2 = Hypothesis::from_sets(&ped, &[], &["B"], &["A"]).unwrap();

        let mut whole = Marginals::new(&ped);
        whole.accumulate(&h1, 0.2);
        whole.accumulate(&h2, 0.7);

        let mut left = Marginals::new(&ped);
        left.accumulate(&h1, 0.2);
        let mut right = Marginals::new(&ped);
        right.accumulate(&h2, 0.7);
        let merged = left.merge(right);

        assert_eq!(merged.get("A"), whole.get("A"));
        assert_eq!(merged.get("B"), whole.get("B"));
        assert_eq!(merged.hypotheses(), 2);
    }

    #[test]
    fn test_summary_layout() {
        let ped = Pedigree::from_records(&[PersonRecord::founder("Solo", Some(true))]).unwrap();
        let mut m = Marginals::new(&ped);
        m.accumulate(&Hypothesis::from_sets(&ped, &[], &["Solo"], &["Solo"]).unwrap(), 1.0);
        let text = m.normalize().unwrap().summary();
        assert_eq!(
            text,
            "Solo:\n  Gene:\n    2: 1.0000\n    1: 0.0000\n    0: 0.0000\n  Trait:\n    True: 1.0000\n    False: 0.0000\n"
        );
    }
}
