use legal_funding::config::LendingConfig;
use legal_funding::workflows::funding::{
    AgreementRenderer, FundingState, InMemoryRecordStore, LifecycleManager, SessionDirectory,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type InMemoryFunding = FundingState<InMemoryRecordStore, AgreementRenderer>;

/// Wire the lifecycle manager and session directory over a shared store.
pub(crate) fn funding_state(
    store: Arc<InMemoryRecordStore>,
    lending: LendingConfig,
) -> InMemoryFunding {
    let renderer = Arc::new(AgreementRenderer::new(lending.clone()));
    let manager = Arc::new(LifecycleManager::new(Arc::clone(&store), renderer, lending));
    let sessions = Arc::new(SessionDirectory::new(store));
    FundingState { manager, sessions }
}
