//! Kernel: the dependency container shared by the HTTP surface, the
//! workflow server, and the fallback orchestrator.

mod deps;

pub use deps::ServerDeps;
