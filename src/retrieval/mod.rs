//! Query-time retrieval and answer orchestration

mod pipeline;

pub use pipeline::QueryPipeline;
