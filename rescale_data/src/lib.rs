//! In-memory dataset backend and reference core model.
//!
//! `InMemoryDataset` implements `rescale_traits::Dataset` over labeled
//! structures loaded from JSON; `ReferenceModelBuilder` builds a small
//! analytic `CoreModel` that honors the calibrated per-species keys.

pub mod dataset;
pub mod error;
pub mod linalg;
pub mod reference;
pub mod stats;

pub use dataset::InMemoryDataset;
pub use error::DataError;
pub use reference::{ReferenceModel, ReferenceModelBuilder};
