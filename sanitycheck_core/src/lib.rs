//! Core rust implementation of sanitycheck, a crate for checking genome scale metabolic
//! models against known biochemistry.
//!
//! Models are read from COBRA JSON, YAML or MATLAB files ([`io`]), optimized with flux
//! balance analysis ([`flux_analysis`]) and checked by the routines in [`checks`].

pub mod checks;
pub mod configuration;
pub mod flux_analysis;
pub mod io;
pub mod metabolic_model;
pub mod optimize;
