//! Integration test crate for the OpenLABEL crates.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It builds documents through openlabel-model and checks them against
//! the value types and wire rules of openlabel-core.

#[cfg(test)]
mod intervals;

#[cfg(test)]
mod scenarios;

#[cfg(test)]
mod wire;
