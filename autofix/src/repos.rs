use crate::models::RepositoryProjectPathConfig;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// A repository as Seer addresses it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoDefinition {
    pub provider: String,
    pub owner: String,
    pub name: String,
}

impl RepoDefinition {
    /// Splits a stored `owner/name` on its first `/`.
    ///
    /// Names without an owner segment, and repositories without a provider, do
    /// not resolve.
    pub fn from_repository_name(provider: Option<&str>, repo_name: &str) -> Option<Self> {
        let provider = provider.filter(|p| !p.is_empty())?;
        let (owner, name) = repo_name.split_once('/')?;

        Some(RepoDefinition {
            provider: provider.to_string(),
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

/// Resolves the distinct repositories linked through a project's code mappings,
/// in the order they are first seen.
pub fn repos_from_code_mappings(configs: &[RepositoryProjectPathConfig]) -> Vec<RepoDefinition> {
    let repos: IndexSet<RepoDefinition> = configs
        .iter()
        .filter_map(|config| {
            let repo = &config.repository;
            let resolved = RepoDefinition::from_repository_name(repo.provider.as_deref(), &repo.name);
            if resolved.is_none() {
                tracing::debug!(
                    repository_id = repo.id,
                    repository_name = %repo.name,
                    "Skipping repository that is not in owner/name form"
                );
            }
            resolved
        })
        .collect();

    repos.into_iter().collect()
}
