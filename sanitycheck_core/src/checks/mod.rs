//! Sanity checks run against a loaded model
pub mod atp_yield;
