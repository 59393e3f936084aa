//! Sentence ranking
//!
//! This module keeps every sentence of the corpus ordered by concept density
//! and re-ranks only the sentences touched by a weight change.

pub mod concept_index;
pub mod index;

pub use concept_index::ConceptIndex;
pub use index::RankedSentenceIndex;
