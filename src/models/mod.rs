// Domain models: fleet snapshots, their loose wire/storage form, validation findings.

mod performance;
mod record;
mod snapshot;
mod validation;

pub use performance::Performance;
pub use record::SnapshotRecord;
pub use snapshot::{
    ChangeRates, DeviceStatus, FleetSnapshot, FleetSummary, StatusCounts, StatusShares,
    TrendDirection, TrendDirections, Trends,
};
pub use validation::ValidationReport;
