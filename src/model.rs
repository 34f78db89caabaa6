//! The model: two power development plans and the parameters they are compared with.
use crate::ensemble::Ensemble;
use crate::pair::RunPair;
use crate::parameter::Parameter;
use crate::plan::Plan;
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

pub mod parameters;
pub use parameters::ModelParameters;

/// Model definition
pub struct Model {
    /// Path to model folder
    pub model_path: PathBuf,
    /// Parameters from the model TOML file
    pub parameters: ModelParameters,
    /// The reference technical and economic parameters
    pub reference: Parameter,
    /// The baseline plan
    pub bau: Arc<Plan>,
    /// The alternative plan
    pub alt: Arc<Plan>,
}

impl Model {
    /// Compare the two plans with the reference parameters
    pub fn evaluate(&self) -> Result<RunPair> {
        RunPair::new(&self.bau, &self.alt, &self.reference)
    }

    /// Compare the two plans with each variant of the reference parameters
    pub fn evaluate_sensitivity(&self) -> Result<Vec<RunPair>> {
        Ensemble::sensitivity(&self.reference)?.evaluate(&self.bau, &self.alt)
    }

    /// The plan summaries and the parameters, for checking a model without evaluating it
    pub fn describe(&self) -> Result<String> {
        let milestones = self.parameters.milestones()?;
        Ok(format!(
            "{}\n\n{}\n\n{}",
            self.reference.summary()?,
            self.bau.summary(&milestones)?,
            self.alt.summary(&milestones)?
        ))
    }
}
