// Pipeline orchestration: wires preprocessing, topic modeling, and
// summarization together behind one entry point.

pub mod analyze;
