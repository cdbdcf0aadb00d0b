//! Integration test crate for the ScanMux engine.
//!
//! This crate exists solely to hold cross-crate integration tests. It runs
//! the full check/commit pipeline from scanmux-engine against the soft
//! register block and clock from scanmux-hw.

#[cfg(test)]
mod harness;

#[cfg(test)]
mod allocation;
