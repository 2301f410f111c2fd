use crate::models::{Project, ProjectId};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};

pub const AI_AUTOFIX_FEATURE: &str = "projects:ai-autofix";

pub trait FeatureFlags: Send + Sync {
    fn has(&self, feature: &str, project: &Project) -> bool;
}

/// Rollout of one feature: on everywhere, or on for an allowlist of projects.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct FeatureConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub projects: HashSet<ProjectId>,
}

/// Feature flags fixed at startup from configuration. Unknown features are off.
pub struct StaticFeatureFlags {
    features: HashMap<String, FeatureConfig>,
}

impl StaticFeatureFlags {
    pub fn new(features: HashMap<String, FeatureConfig>) -> Self {
        Self { features }
    }
}

impl FeatureFlags for StaticFeatureFlags {
    fn has(&self, feature: &str, project: &Project) -> bool {
        self.features
            .get(feature)
            .is_some_and(|f| f.enabled || f.projects.contains(&project.id))
    }
}
