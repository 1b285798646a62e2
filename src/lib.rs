//! Library surface for `ebnfc`: the grammar-to-table compiler pipeline.
//! `src/main.rs` is a thin driver over this crate so integration tests can
//! exercise the pipeline directly.

pub mod ebnfc;
