//! Business logic for Red Flag Detector.
//!
//! Defines the repository, storage, mail and LLM provider traits that
//! redflag-infra implements, plus the pure pieces of the pipeline:
//! content classification, prompt construction, tolerant parsing of model
//! output, retry with backoff, and day/month usage bookkeeping.

pub mod analysis;
pub mod email;
pub mod llm;
pub mod repository;
pub mod service;
pub mod storage;
pub mod usage;

#[cfg(test)]
pub(crate) mod test_support;
