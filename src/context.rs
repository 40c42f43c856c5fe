use std::sync::Arc;

use crate::services::{IntentClassifier, IntentPresenter, StatusSink, VersionControlService};

#[derive(Clone)]
pub struct AppContext {
    pub version_control: Arc<dyn VersionControlService>,
    pub classifier: Arc<dyn IntentClassifier>,
    pub status: Arc<dyn StatusSink>,
    pub presenter: Arc<dyn IntentPresenter>,
}

impl AppContext {
    pub fn new(
        version_control: Arc<dyn VersionControlService>,
        classifier: Arc<dyn IntentClassifier>,
        status: Arc<dyn StatusSink>,
        presenter: Arc<dyn IntentPresenter>,
    ) -> Self {
        Self {
            version_control,
            classifier,
            status,
            presenter,
        }
    }
}
