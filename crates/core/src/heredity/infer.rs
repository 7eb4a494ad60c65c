use rayon::prelude::*;

use crate::error::Result;

use super::hypothesis::HypothesisSpace;
use super::joint::joint_probability;
use super::marginal::{Marginals, Posterior};
use super::params::HeredityParams;
use super::pedigree::Pedigree;

/// Exact marginals for every person by exhaustive enumeration.
///
/// Hypotheses are visited in index order, so the result is reproducible
/// bit-for-bit for a given pedigree and parameter set.
///
/// # Errors
/// - [`AiError::InvalidParameter`](crate::error::AiError::InvalidParameter)
///   for invalid probability tables or an oversized pedigree.
/// - [`AiError::EvidenceContradiction`](crate::error::AiError::EvidenceContradiction)
///   if the evidence leaves no probability mass.
pub fn infer(pedigree: &Pedigree, params: &HeredityParams) -> Result<Posterior> {
    params.validate()?;
    let space = HypothesisSpace::new(pedigree)?;
    log::info!(
        "enumerating {} hypotheses over {} people",
        space.len(),
        pedigree.n_people()
    );

    let marginals = space.iter().fold(Marginals::new(pedigree), |mut acc, h| {
        let p = joint_probability(pedigree, &h, params);
        acc.accumulate(&h, p);
        acc
    });

    finish(marginals)
}

/// Same as [`infer`], with the hypothesis index range split across the
/// rayon thread pool and partial sums merged at the end.
///
/// Agrees with [`infer`] up to floating-point summation order.
pub fn infer_parallel(pedigree: &Pedigree, params: &HeredityParams) -> Result<Posterior> {
    params.validate()?;
    let space = HypothesisSpace::new(pedigree)?;
    log::info!(
        "enumerating {} hypotheses over {} people on {} threads",
        space.len(),
        pedigree.n_people(),
        rayon::current_num_threads()
    );

    let marginals = (0..space.len())
        .into_par_iter()
        .fold(
            || Marginals::new(pedigree),
            |mut acc, index| {
                let h = space.hypothesis(index);
                let p = joint_probability(pedigree, &h, params);
                acc.accumulate(&h, p);
                acc
            },
        )
        .reduce(|| Marginals::new(pedigree), Marginals::merge);

    finish(marginals)
}

fn finish(marginals: Marginals) -> Result<Posterior> {
    log::debug!("accumulated {} hypotheses", marginals.hypotheses());
    marginals.normalize()
}
