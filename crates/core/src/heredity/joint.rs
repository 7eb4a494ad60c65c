use crate::error::Result;

use super::hypothesis::{GeneCount, Hypothesis};
use super::params::HeredityParams;
use super::pedigree::Pedigree;

/// Probability that a parent with `parent` copies passes the gene to a child.
///
/// A parent with no copies passes it only by mutation, a parent with two
/// copies fails to pass it only by mutation, and a parent with one copy
/// passes it with probability one half either way.
pub fn inherit(parent: GeneCount, mutation_rate: f64) -> f64 {
    match parent {
        GeneCount::Zero => mutation_rate,
        GeneCount::One => 0.5,
        GeneCount::Two => 1.0 - mutation_rate,
    }
}

/// P(child carries `child` copies) given each parent's transmission probability.
pub fn child_gene_probability(from_mother: f64, from_father: f64, child: GeneCount) -> f64 {
    match child {
        GeneCount::Zero => (1.0 - from_mother) * (1.0 - from_father),
        GeneCount::One => from_mother * (1.0 - from_father) + from_father * (1.0 - from_mother),
        GeneCount::Two => from_mother * from_father,
    }
}

/// P(gene count of `person` | parents' gene counts), or the founder prior.
pub fn gene_probability(
    pedigree: &Pedigree,
    person: usize,
    hypothesis: &Hypothesis,
    params: &HeredityParams,
) -> f64 {
    let genes = hypothesis.gene_count(person);
    match pedigree.person(person).parents() {
        Some((mother, father)) => {
            let m = inherit(hypothesis.gene_count(mother), params.mutation_rate);
            let f = inherit(hypothesis.gene_count(father), params.mutation_rate);
            child_gene_probability(m, f, genes)
        }
        None => params.prior(genes),
    }
}

/// Probability of one fully specified world.
///
/// Product over every person of P(gene count | parents or prior) times
/// P(trait flag | gene count).
pub fn joint_probability(pedigree: &Pedigree, hypothesis: &Hypothesis, params: &HeredityParams) -> f64 {
    debug_assert_eq!(pedigree.n_people(), hypothesis.len());

    (0..pedigree.n_people())
        .map(|i| {
            let p_gene = gene_probability(pedigree, i, hypothesis, params);
            let p_trait =
                params.trait_likelihood(hypothesis.gene_count(i), hypothesis.has_trait(i));
            p_gene * p_trait
        })
        .product()
}

/// [`joint_probability`] for a world given as name sets.
///
/// See [`Hypothesis::from_sets`] for the set semantics and errors.
pub fn joint_probability_sets(
    pedigree: &Pedigree,
    one_gene: &[&str],
    two_genes: &[&str],
    have_trait: &[&str],
    params: &HeredityParams,
) -> Result<f64> {
    let hypothesis = Hypothesis::from_sets(pedigree, one_gene, two_genes, have_trait)?;
    Ok(joint_probability(pedigree, &hypothesis, params))
}
