// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod aggregate;
pub mod api;
pub mod cache;
pub mod config;
pub mod curate;
pub mod deliver;
pub mod metrics;
pub mod pipeline;
pub mod validate;

// ---- Re-exports for stable public API ----
pub use crate::aggregate::types::{CandidateItem, SourceKind, SourceProvider};
pub use crate::api::{create_router, AppState};
pub use crate::cache::{fingerprint, SentStore};
pub use crate::curate::{Curator, DigestContent, DigestItem};
pub use crate::deliver::{Delivery, DigestEmail};
pub use crate::pipeline::{Pipeline, RunReport};
