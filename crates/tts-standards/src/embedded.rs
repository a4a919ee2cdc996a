//! Embedded lookup data.
//!
//! The insulation level table is embedded at compile time using
//! `include_str!()`, so no file has to be located at runtime.

/// Insulation levels per standard and voltage class (`tabela.json`).
pub const INSULATION_LEVELS_JSON: &str = include_str!("../data/tabela.json");
