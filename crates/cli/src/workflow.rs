//! Container workflow description
//!
//! Two components sharing one image. `model-training` lists
//! `data-processing` as a dependency so a scheduler runs them in order.

use mlops_core::{PipelineError, Result, WorkflowConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

pub const DATA_PROCESSING: &str = "data-processing";
pub const MODEL_TRAINING: &str = "model-training";

/// One containerized step
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Component {
    pub name: String,
    pub image: String,
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

/// The full workflow document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Workflow {
    pub name: String,
    pub description: String,
    pub components: Vec<Component>,
}

impl Workflow {
    pub fn from_config(config: &WorkflowConfig) -> Self {
        let component = |name: &str, dependencies: Vec<String>| {
            let mut command = config.launcher.clone();
            command.push(name.to_string());
            Component {
                name: name.to_string(),
                image: config.image.clone(),
                command,
                dependencies,
            }
        };

        Self {
            name: config.name.clone(),
            description: config.description.clone(),
            components: vec![
                component(DATA_PROCESSING, Vec::new()),
                component(MODEL_TRAINING, vec![DATA_PROCESSING.to_string()]),
            ],
        }
    }

    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name == name)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| PipelineError::Persistence(format!("cannot render workflow: {e}")))
    }
}

/// Render the workflow for `config` and write it to `output`
pub fn compile_workflow(config: &WorkflowConfig, output: &Path) -> Result<Workflow> {
    let workflow = Workflow::from_config(config);
    let yaml = workflow.to_yaml()?;
    std::fs::write(output, yaml).map_err(|e| {
        PipelineError::Persistence(format!("cannot write {}: {e}", output.display()))
    })?;
    info!("Workflow {} compiled to {}", workflow.name, output.display());
    Ok(workflow)
}
