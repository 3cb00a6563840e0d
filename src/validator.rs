// Consistency checks and repair for fleet snapshots.
// validate() only reports; repair() normalizes (zero-fill, recompute total, clamp) and never
// invents counts. Callers choose: reject on errors (API input) or repair before storing (jobs).

use chrono::NaiveDate;
use tracing::debug;

use crate::models::{
    DeviceStatus, FleetSnapshot, Performance, SnapshotRecord, StatusCounts, Trends,
    ValidationReport,
};

const ERROR_SHARE_WARN: Performance = Performance::from_whole(50);
const ONLINE_SHARE_WARN: Performance = Performance::from_whole(20);
const LOW_PERFORMANCE_WARN: Performance = Performance::from_whole(30);
const FLEET_SIZE_WARN: i64 = 10_000;
const ONLINE_TREND_WARN: i64 = 1_000;
const ERROR_TREND_WARN: i64 = 100;
const PERFORMANCE_TREND_WARN: i64 = 50;

fn status_fields(record: &SnapshotRecord) -> [(DeviceStatus, Option<i64>); 4] {
    [
        (DeviceStatus::Online, record.online),
        (DeviceStatus::Offline, record.offline),
        (DeviceStatus::Error, record.error),
        (DeviceStatus::Maintenance, record.maintenance),
    ]
}

/// Check completeness, ranges and total consistency (errors) and plausibility (warnings).
pub fn validate(record: &SnapshotRecord) -> ValidationReport {
    let mut report = ValidationReport::default();

    check_fields(record, &mut report);
    check_consistency(record, &mut report);
    check_plausibility(record, &mut report);
    check_trends(record, &mut report);

    debug!(
        errors = report.errors.len(),
        warnings = report.warnings.len(),
        "snapshot validated"
    );
    report
}

/// Same checks for an already-typed snapshot (counts there cannot be missing or negative).
pub fn validate_snapshot(snapshot: &FleetSnapshot) -> ValidationReport {
    validate(&SnapshotRecord::from(snapshot))
}

fn check_fields(record: &SnapshotRecord, report: &mut ValidationReport) {
    for (status, value) in status_fields(record) {
        match value {
            None => report.add_error(format!("{} count is missing", status.as_str())),
            Some(v) if v < 0 => report.add_error(format!(
                "{} count must not be negative (got {})",
                status.as_str(),
                v
            )),
            Some(_) => {}
        }
    }

    match record.total {
        None => report.add_error("total is missing"),
        Some(t) if t < 0 => report.add_error(format!("total must not be negative (got {})", t)),
        Some(_) => {}
    }

    match record.avg_performance {
        None => report.add_error("average performance is missing"),
        Some(p) if !p.is_within_percent_range() => report.add_error(format!(
            "average performance must be within 0-100 (got {})",
            p
        )),
        Some(_) => {}
    }
}

fn check_consistency(record: &SnapshotRecord, report: &mut ValidationReport) {
    let Some(total) = record.total else {
        return;
    };
    let mut sum: i64 = 0;
    for (_, value) in status_fields(record) {
        let Some(v) = value else {
            return;
        };
        sum = sum.saturating_add(v);
    }
    if sum != total {
        report.add_error(format!(
            "sum of status counts ({}) does not match total ({})",
            sum, total
        ));
    }
}

fn check_plausibility(record: &SnapshotRecord, report: &mut ValidationReport) {
    let total = record.total.filter(|t| *t > 0);

    if let Some(total) = total
        && let Some(error) = record.error.filter(|e| *e > 0)
    {
        let share = Performance::share(error as u64, total as u64);
        if share > ERROR_SHARE_WARN {
            report.add_warning(format!("error share is unusually high: {}%", share));
        }
    }

    if let Some(total) = total
        && let Some(online) = record.online.filter(|o| *o >= 0)
    {
        let share = Performance::share(online as u64, total as u64);
        if share < ONLINE_SHARE_WARN {
            report.add_warning(format!("online share is unusually low: {}%", share));
        }
    }

    if let Some(p) = record.avg_performance
        && p < LOW_PERFORMANCE_WARN
    {
        report.add_warning(format!("average performance is unusually low: {}%", p));
    }

    if let Some(t) = record.total
        && t > FLEET_SIZE_WARN
    {
        report.add_warning(format!("total device count is unusually high: {}", t));
    }
}

fn check_trends(record: &SnapshotRecord, report: &mut ValidationReport) {
    if let Some(t) = record.online_trend
        && t.unsigned_abs() > ONLINE_TREND_WARN as u64
    {
        report.add_warning(format!("online trend swing is unusually large: {}", t));
    }
    if let Some(t) = record.error_trend
        && t > ERROR_TREND_WARN
    {
        report.add_warning(format!("error trend growth is unusually large: {}", t));
    }
    if let Some(t) = record.performance_trend
        && t.unsigned_abs() > PERFORMANCE_TREND_WARN as u64
    {
        report.add_warning(format!("performance trend swing is unusually large: {}", t));
    }
}

/// Normalize a record into a snapshot: missing or negative counts become 0, `total` is the sum
/// of the four status counts, performance is clamped into [0, 100], missing trends become 0.
/// `fallback_date` is used when the record carries no date.
pub fn repair(record: SnapshotRecord, fallback_date: NaiveDate) -> FleetSnapshot {
    let count = |value: Option<i64>| value.map_or(0, |v| v.max(0) as u64);
    let status_counts = StatusCounts {
        online: count(record.online),
        offline: count(record.offline),
        error: count(record.error),
        maintenance: count(record.maintenance),
    };

    let total = status_counts.sum();
    if record.total != i64::try_from(total).ok() {
        debug!(stored = ?record.total, recomputed = total, "repaired inconsistent total");
    }

    let avg_performance = match record.avg_performance {
        Some(p) => {
            let clamped = p.clamp_to_percent_range();
            if clamped != p {
                debug!(stored = %p, clamped = %clamped, "clamped average performance");
            }
            clamped
        }
        None => Performance::ZERO,
    };

    FleetSnapshot {
        status_counts,
        total,
        avg_performance,
        trends: Trends {
            online: record.online_trend.unwrap_or(0),
            offline: record.offline_trend.unwrap_or(0),
            error: record.error_trend.unwrap_or(0),
            performance: record.performance_trend.unwrap_or(0),
        },
        stats_date: record.stats_date.unwrap_or(fallback_date),
        created_at: record.created_at,
        updated_at: record.updated_at,
    }
}

/// Re-establish invariants on a typed snapshot whose public fields may have been set by hand.
pub fn repair_snapshot(snapshot: FleetSnapshot) -> FleetSnapshot {
    let date = snapshot.stats_date;
    repair(SnapshotRecord::from(&snapshot), date)
}
