//! Case knowledge base: embeddings over task summaries and the retrieval
//! seam the planner consumes. Retrieval is advisory — failures and empty
//! results never block an iteration.

mod embedding;
mod retriever;

pub use embedding::simple_embedding;
pub use retriever::{CaseRetriever, LexicalCaseRetriever, RetrievedCase};
