use async_trait::async_trait;

use crate::config::ClassifierSettings;
use crate::domain::change::ChangeSet;
use crate::error::AppResult;

#[async_trait]
pub trait IntentClassifier: Send + Sync {
    /// Returns the raw `intent` string; parsing it is the caller's job.
    async fn classify(&self, changes: &ChangeSet, settings: &ClassifierSettings)
    -> AppResult<String>;
}
