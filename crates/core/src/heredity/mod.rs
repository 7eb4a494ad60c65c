// Heredity: exact gene/trait inference over a family pedigree.
// Loader -> hypothesis enumeration -> joint probability -> marginals.

pub mod hypothesis;
pub mod infer;
pub mod joint;
pub mod marginal;
pub mod params;
pub mod pedigree;

pub use hypothesis::{GeneCount, Hypothesis, HypothesisSpace};
pub use infer::{infer, infer_parallel};
pub use joint::{inherit, joint_probability, joint_probability_sets};
pub use marginal::{MarginalDistribution, Marginals, Posterior};
pub use params::HeredityParams;
pub use pedigree::{Pedigree, Person, PersonRecord};
