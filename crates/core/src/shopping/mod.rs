// Purchase prediction for online shopping sessions with a nearest-neighbour
// classifier.

mod data;
mod knn;

pub use data::{
    load_data, load_data_from_reader, train_test_split, Dataset, Evidence, Split, N_FEATURES,
};
pub use knn::{evaluate, Evaluation, FittedKnn, KNearestNeighbors};
