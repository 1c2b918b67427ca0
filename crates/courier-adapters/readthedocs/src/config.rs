//! Configuration types for the Read the Docs adapter.
//!
//! Projects can be declared up front instead of through
//! [`RtdPlugin::register_project`](crate::RtdPlugin::register_project):
//!
//! ```toml
//! [plugins.readthedocs.projects.courier]
//! build_url = "https://readthedocs.org/api/v2/webhook/courier/12345/"
//! token = "..."
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RtdConfig {
    /// Projects by slug.
    pub projects: HashMap<String, ProjectConfig>,
}

/// Build trigger of one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Generic webhook URL of the project.
    pub build_url: String,
    /// Token of that webhook.
    pub token: String,
}
