//! Oracle feedback: recording labels and turning them into weights
//!
//! The [`FlightRecorder`] logs labels, a [`FeedbackStore`] interprets them,
//! and the [`FeedbackWeightUpdater`] writes the result into the
//! authoritative weight table and re-ranks affected sentences.

pub mod graph;
pub mod recorder;
pub mod store;
pub mod updater;

pub use graph::NgramFeedbackGraph;
pub use recorder::{EffectiveLabels, FlightRecorder, Record};
pub use store::{BaselineFeedbackStore, FeedbackStore, TOP_N_CONCEPTS};
pub use updater::{FeedbackWeightUpdater, WeightUpdate};
