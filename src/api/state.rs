//! Shared application state

use std::sync::Arc;

use crate::device::{DeviceClassifier, UserAgentClassifier};
use crate::store::VisitStore;

/// State handed to every request handler
pub struct AppState {
    /// The visit log, opened at startup and closed on shutdown
    pub store: Arc<dyn VisitStore>,

    /// Applied once per ingested visit
    pub classifier: Arc<dyn DeviceClassifier>,
}

impl AppState {
    /// State with the default user-agent classifier
    pub fn new(store: Arc<dyn VisitStore>) -> Self {
        Self::with_classifier(store, Arc::new(UserAgentClassifier))
    }

    pub fn with_classifier(
        store: Arc<dyn VisitStore>,
        classifier: Arc<dyn DeviceClassifier>,
    ) -> Self {
        Self { store, classifier }
    }
}
