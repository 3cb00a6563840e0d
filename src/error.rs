use std::time::Duration;

/// Failures surfaced by the strict (scheduled) paths of the stats computer.
/// The dashboard read path never returns these; it degrades to the zero snapshot instead.
#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    #[error("device registry query failed: {0}")]
    Registry(#[source] anyhow::Error),

    #[error("device registry did not answer within {0:?}")]
    RegistryTimeout(Duration),

    #[error("snapshot store {operation} failed: {source}")]
    Store {
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("snapshot for {date} is inconsistent after repair: {errors}")]
    InvalidSnapshot { date: chrono::NaiveDate, errors: String },
}

impl StatsError {
    pub(crate) fn store(operation: &'static str) -> impl FnOnce(anyhow::Error) -> Self {
        move |source| StatsError::Store { operation, source }
    }
}
