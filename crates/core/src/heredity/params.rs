use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AiError, Result};

use super::hypothesis::GeneCount;

/// Probability tables driving the heredity model.
///
/// Arrays are indexed by gene count (`[zero, one, two]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeredityParams {
    /// Unconditional probability of carrying 0, 1 or 2 copies, used for founders.
    pub gene_prior: [f64; 3],
    /// Probability of expressing the trait given 0, 1 or 2 copies.
    pub trait_given_genes: [f64; 3],
    /// Probability that a transmitted allele flips.
    pub mutation_rate: f64,
}

impl Default for HeredityParams {
    fn default() -> Self {
        Self {
            gene_prior: [0.96, 0.03, 0.01],
            trait_given_genes: [0.01, 0.56, 0.65],
            mutation_rate: 0.01,
        }
    }
}

impl HeredityParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the founder prior (`[zero, one, two]`).
    pub fn gene_prior(mut self, prior: [f64; 3]) -> Self {
        self.gene_prior = prior;
        self
    }

    /// Set P(trait | gene count) (`[zero, one, two]`).
    pub fn trait_given_genes(mut self, probs: [f64; 3]) -> Self {
        self.trait_given_genes = probs;
        self
    }

    pub fn mutation_rate(mut self, rate: f64) -> Self {
        self.mutation_rate = rate;
        self
    }

    /// Founder probability of carrying `genes` copies.
    pub fn prior(&self, genes: GeneCount) -> f64 {
        self.gene_prior[genes.index()]
    }

    /// P(trait = `has_trait` | `genes`).
    pub fn trait_likelihood(&self, genes: GeneCount, has_trait: bool) -> f64 {
        let p = self.trait_given_genes[genes.index()];
        if has_trait {
            p
        } else {
            1.0 - p
        }
    }

    /// Load parameters from a JSON document. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let params: Self = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Check every table entry is a probability and the prior sums to one.
    ///
    /// # Errors
    /// Returns [`AiError::InvalidParameter`] naming the offending entry.
    pub fn validate(&self) -> Result<()> {
        let entries = self
            .gene_prior
            .iter()
            .map(|&p| ("gene_prior", p))
            .chain(self.trait_given_genes.iter().map(|&p| ("trait_given_genes", p)))
            .chain(std::iter::once(("mutation_rate", self.mutation_rate)));

        for (name, p) in entries {
            if !(0.0..=1.0).contains(&p) {
                return Err(AiError::InvalidParameter(format!(
                    "{} entry {} is not a probability",
                    name, p
                )));
            }
        }

        let total: f64 = self.gene_prior.iter().sum();
        if (total - 1.0).abs() > 1e-9 {
            return Err(AiError::InvalidParameter(format!(
                "gene_prior sums to {} instead of 1",
                total
            )));
        }
        Ok(())
    }
}
