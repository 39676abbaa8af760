use std::sync::Arc;
use std::time::Duration;

use praxis::completion::{CompletionClient, CompletionConfig};
use praxis::signature::SignatureVerifier;
use praxis::skills::SkillRegistry;

use crate::configuration::Settings;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<SignatureVerifier>,
    pub skills: Arc<SkillRegistry>,
    pub completion: Arc<CompletionClient>,
}

impl AppState {
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        let verifier = SignatureVerifier::with_ttl(
            settings.platform.key_endpoint.clone(),
            Duration::from_secs(settings.platform.key_ttl_secs),
        );
        let completion = CompletionClient::new(CompletionConfig {
            host: settings.completion.host.clone(),
            model: settings.completion.model.clone(),
        })?;

        Ok(Self {
            verifier: Arc::new(verifier),
            skills: Arc::new(SkillRegistry::new()),
            completion: Arc::new(completion),
        })
    }
}
