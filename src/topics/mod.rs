// Topic extraction: preprocessing, corpus building, and LDA fitting.

pub mod corpus;
pub mod lda;
pub mod preprocess;
