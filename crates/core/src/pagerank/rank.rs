//! PageRank by random-surfer sampling and by fixed-point iteration.
//!
//! A surfer on page `p` follows one of `p`'s links with probability
//! `damping`, otherwise jumps to any page uniformly. A page with no
//! outgoing links is treated as linking to every page, itself included.

use std::collections::BTreeMap;

use rand::distributions::WeightedIndex;
use rand::prelude::*;

use crate::error::{AiError, Result};

use super::corpus::Corpus;

/// Page name -> rank. Ranks sum to one.
pub type Ranks = BTreeMap<String, f64>;

/// Settings shared by both estimators.
#[derive(Debug, Clone)]
pub struct PageRankConfig {
    damping: f64,
    samples: usize,
    tolerance: f64,
    max_iterations: usize,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self {
            damping: 0.85,
            samples: 10_000,
            tolerance: 0.001,
            max_iterations: 10_000,
        }
    }
}

impl PageRankConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Probability of following a link rather than jumping (default: 0.85).
    pub fn damping(mut self, damping: f64) -> Self {
        self.damping = damping;
        self
    }

    /// Number of pages visited by the sampler (default: 10 000).
    pub fn samples(mut self, samples: usize) -> Self {
        self.samples = samples;
        self
    }

    /// Iteration stops once no rank moves by this much or more (default: 0.001).
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Upper bound on iteration rounds (default: 10 000).
    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn n_samples(&self) -> usize {
        self.samples
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.damping) {
            return Err(AiError::InvalidParameter(format!(
                "damping factor {} is outside [0, 1]",
                self.damping
            )));
        }
        if self.tolerance.is_nan() || self.tolerance <= 0.0 {
            return Err(AiError::InvalidParameter(format!(
                "tolerance {} must be positive",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// Distribution over the next page given the surfer is on `page`.
///
/// # Errors
/// [`AiError::InvalidParameter`] if `page` is not in the corpus or
/// `damping` is outside [0, 1]; [`AiError::EmptyCorpus`] for an empty corpus.
pub fn transition_model(corpus: &Corpus, page: &str, damping: f64) -> Result<Ranks> {
    ensure_non_empty(corpus)?;
    PageRankConfig::new().damping(damping).validate()?;
    let index = corpus.page_index(page).ok_or_else(|| {
        AiError::InvalidParameter(format!("page '{}' is not in the corpus", page))
    })?;

    Ok(transition_row(corpus, index, damping)
        .into_iter()
        .enumerate()
        .map(|(j, p)| (corpus.page_name(j).to_string(), p))
        .collect())
}

fn transition_row(corpus: &Corpus, index: usize, damping: f64) -> Vec<f64> {
    let n = corpus.len();
    let links = corpus.out_links(index);
    if links.is_empty() {
        return vec![1.0 / n as f64; n];
    }

    let mut row = vec![(1.0 - damping) / n as f64; n];
    let share = damping / links.len() as f64;
    for &j in links {
        row[j] += share;
    }
    row
}

/// Estimate PageRank by visiting `config.n_samples()` pages.
///
/// The first page is drawn uniformly; every later page is drawn from the
/// transition model of the page before it. Each visit counts once.
pub fn sample_pagerank<R: Rng + ?Sized>(
    corpus: &Corpus,
    config: &PageRankConfig,
    rng: &mut R,
) -> Result<Ranks> {
    ensure_non_empty(corpus)?;
    config.validate()?;
    if config.samples == 0 {
        return Err(AiError::InvalidParameter(
            "sample count must be at least 1".to_string(),
        ));
    }

    let n = corpus.len();
    let models = (0..n)
        .map(|i| {
            WeightedIndex::new(transition_row(corpus, i, config.damping))
                .map_err(|e| AiError::InvalidParameter(format!("transition model: {}", e)))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut counts = vec![0usize; n];
    let mut current = rng.gen_range(0..n);
    counts[current] += 1;
    for _ in 1..config.samples {
        current = models[current].sample(rng);
        counts[current] += 1;
    }

    log::debug!("sampled {} page visits over {} pages", config.samples, n);
    Ok(counts
        .into_iter()
        .enumerate()
        .map(|(i, c)| (corpus.page_name(i).to_string(), c as f64 / config.samples as f64))
        .collect())
}

/// Estimate PageRank by repeatedly applying
/// `PR(p) = (1 - d) / N + d * sum(PR(i) / links(i))` over pages `i` linking
/// to `p`, until every rank moves by less than the tolerance.
///
/// All ranks are updated from the previous round's values. If
/// `max_iterations` is reached first, the latest ranks are returned and a
/// warning is logged.
pub fn iterate_pagerank(corpus: &Corpus, config: &PageRankConfig) -> Result<Ranks> {
    ensure_non_empty(corpus)?;
    config.validate()?;

    let n = corpus.len();
    let d = config.damping;
    let base = (1.0 - d) / n as f64;

    // Incoming edges; dangling pages point at every page.
    let mut incoming: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut out_degree = vec![0usize; n];
    for i in 0..n {
        let links = corpus.out_links(i);
        if links.is_empty() {
            out_degree[i] = n;
            for target in incoming.iter_mut() {
                target.push(i);
            }
        } else {
            out_degree[i] = links.len();
            for &j in links {
                incoming[j].push(i);
            }
        }
    }

    let mut ranks = vec![1.0 / n as f64; n];
    let mut converged = false;
    let mut rounds = 0;

    while rounds < config.max_iterations {
        rounds += 1;
        let next: Vec<f64> = incoming
            .iter()
            .map(|sources| {
                base + d * sources
                    .iter()
                    .map(|&i| ranks[i] / out_degree[i] as f64)
                    .sum::<f64>()
            })
            .collect();

        let max_change = next
            .iter()
            .zip(ranks.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        ranks = next;

        if max_change < config.tolerance {
            converged = true;
            break;
        }
    }

    if converged {
        log::debug!("pagerank converged after {} rounds", rounds);
    } else {
        log::warn!(
            "pagerank did not converge within {} rounds; returning latest ranks",
            config.max_iterations
        );
    }

    Ok(ranks
        .into_iter()
        .enumerate()
        .map(|(i, r)| (corpus.page_name(i).to_string(), r))
        .collect())
}

fn ensure_non_empty(corpus: &Corpus) -> Result<()> {
    if corpus.is_empty() {
        return Err(AiError::EmptyCorpus(
            "PageRank needs at least one page".to_string(),
        ));
    }
    Ok(())
}
