// PageRank over a small corpus of linked pages.

mod corpus;
mod rank;

pub use corpus::Corpus;
pub use rank::{iterate_pagerank, sample_pagerank, transition_model, PageRankConfig, Ranks};
