//! Evaluation of the costs and emissions of power development plans.
//!
//! A model compares a baseline plan with an alternative under one set of technical and economic
//! parameters, or under each of a standard set of parameter variants.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod cli;
pub mod digest;
pub mod ensemble;
pub mod finance;
pub mod input;
pub mod log;
pub mod model;
pub mod output;
pub mod pair;
pub mod parameter;
pub mod plan;
pub mod report;
pub mod run;
pub mod salvage;
pub mod settings;
pub mod source;
pub mod table;
pub mod units;
pub mod year;

#[cfg(test)]
mod fixture;

/// Get the folder in which the program's settings are stored
pub fn get_config_dir() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_default();
    path.push("powerplan");
    path
}
