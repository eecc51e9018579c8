//! Relationship graph construction
//!
//! - `builder`: deduplicating, counting edge multiset
//! - `resolver`: import specifier → inventory ids
//! - `proximity`: filesystem proximity edges
//! - `similarity`: embedding-based semantic similarity edges

pub mod builder;
pub mod proximity;
pub mod resolver;
pub mod similarity;

pub use builder::{EdgeKey, PendingEdge, RelationshipGraph};
pub use proximity::proximity_edges;
pub use resolver::ImportResolver;
pub use similarity::{
    cosine_similarity, similarity_edges, EmbeddingError, EmbeddingProvider, OpenAiEmbeddings,
};
