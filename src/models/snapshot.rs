// Fleet snapshot: per-status device counts, aggregate performance and day-over-day trends.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::Performance;

/// Device status as recorded by the registry; serializes lowercase (e.g. "online").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Online,
    Offline,
    Error,
    Maintenance,
}

impl DeviceStatus {
    pub const ALL: [DeviceStatus; 4] = [
        DeviceStatus::Online,
        DeviceStatus::Offline,
        DeviceStatus::Error,
        DeviceStatus::Maintenance,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DeviceStatus::Online => "online",
            DeviceStatus::Offline => "offline",
            DeviceStatus::Error => "error",
            DeviceStatus::Maintenance => "maintenance",
        }
    }

    /// Parse a registry status string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "online" => Some(DeviceStatus::Online),
            "offline" => Some(DeviceStatus::Offline),
            "error" => Some(DeviceStatus::Error),
            "maintenance" => Some(DeviceStatus::Maintenance),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub online: u64,
    pub offline: u64,
    pub error: u64,
    pub maintenance: u64,
}

impl StatusCounts {
    pub fn get(&self, status: DeviceStatus) -> u64 {
        match status {
            DeviceStatus::Online => self.online,
            DeviceStatus::Offline => self.offline,
            DeviceStatus::Error => self.error,
            DeviceStatus::Maintenance => self.maintenance,
        }
    }

    pub fn sum(&self) -> u64 {
        self.online
            .saturating_add(self.offline)
            .saturating_add(self.error)
            .saturating_add(self.maintenance)
    }
}

/// Signed deltas against a reference snapshot (usually yesterday's).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trends {
    pub online: i64,
    pub offline: i64,
    pub error: i64,
    pub performance: i64,
}

impl Trends {
    pub fn directions(&self) -> TrendDirections {
        TrendDirections {
            online: TrendDirection::of(self.online),
            offline: TrendDirection::of(self.offline),
            error: TrendDirection::of(self.error),
            performance: TrendDirection::of(self.performance),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

impl TrendDirection {
    pub fn of(delta: i64) -> Self {
        match delta {
            0 => TrendDirection::Stable,
            d if d > 0 => TrendDirection::Up,
            _ => TrendDirection::Down,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendDirections {
    pub online: TrendDirection,
    pub offline: TrendDirection,
    pub error: TrendDirection,
    pub performance: TrendDirection,
}

/// Per-status percentages of the fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusShares {
    pub online: Performance,
    pub offline: Performance,
    pub error: Performance,
    pub maintenance: Performance,
}

/// Percentage change of each status count against the reference day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRates {
    pub online: Performance,
    pub offline: Performance,
    pub error: Performance,
}

/// Dashboard figures derived from one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetSummary {
    pub stats_date: NaiveDate,
    pub total: u64,
    pub distribution: StatusShares,
    pub health_score: Performance,
    pub trend_directions: TrendDirections,
    pub change_rates: ChangeRates,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetSnapshot {
    pub status_counts: StatusCounts,
    pub total: u64,
    pub avg_performance: Performance,
    pub trends: Trends,
    pub stats_date: NaiveDate,
    /// Set by the snapshot store; `None` for snapshots that were never persisted.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl FleetSnapshot {
    /// All counts zero, performance zero, no trends. Served when the registry is unavailable.
    pub fn zero(stats_date: NaiveDate) -> Self {
        Self {
            status_counts: StatusCounts::default(),
            total: 0,
            avg_performance: Performance::ZERO,
            trends: Trends::default(),
            stats_date,
            created_at: None,
            updated_at: None,
        }
    }

    /// Deltas of `self` against `reference`; all zero when there is no reference.
    pub fn trends_against(&self, reference: Option<&FleetSnapshot>) -> Trends {
        let Some(reference) = reference else {
            return Trends::default();
        };
        let delta = |current: u64, previous: u64| current as i64 - previous as i64;
        Trends {
            online: delta(self.status_counts.online, reference.status_counts.online),
            offline: delta(self.status_counts.offline, reference.status_counts.offline),
            error: delta(self.status_counts.error, reference.status_counts.error),
            performance: self.avg_performance.whole_delta(reference.avg_performance),
        }
    }

    /// Share of `status` in the fleet, in percent.
    pub fn status_share(&self, status: DeviceStatus) -> Performance {
        Performance::share(self.status_counts.get(status), self.total)
    }

    pub fn status_distribution(&self) -> StatusShares {
        StatusShares {
            online: self.status_share(DeviceStatus::Online),
            offline: self.status_share(DeviceStatus::Offline),
            error: self.status_share(DeviceStatus::Error),
            maintenance: self.status_share(DeviceStatus::Maintenance),
        }
    }

    /// Change rate of each status count against the reference the trends were computed from.
    pub fn change_rates(&self) -> ChangeRates {
        let rate = |current: u64, trend: i64| {
            let previous = (current as i128 - trend as i128).max(0);
            Performance::change_rate(current, u64::try_from(previous).unwrap_or(u64::MAX))
        };
        ChangeRates {
            online: rate(self.status_counts.online, self.trends.online),
            offline: rate(self.status_counts.offline, self.trends.offline),
            error: rate(self.status_counts.error, self.trends.error),
        }
    }

    pub fn summary(&self) -> FleetSummary {
        FleetSummary {
            stats_date: self.stats_date,
            total: self.total,
            distribution: self.status_distribution(),
            health_score: self.health_score(),
            trend_directions: self.trends.directions(),
            change_rates: self.change_rates(),
        }
    }

    /// Mean of `snapshots`, dated `stats_date`. Counts use integer division, `total` is the sum
    /// of the averaged counts, performance is rounded half-up; trends are zero.
    /// The zero snapshot for an empty input.
    pub fn average(snapshots: &[FleetSnapshot], stats_date: NaiveDate) -> Self {
        let n = snapshots.len() as u64;
        if n == 0 {
            return Self::zero(stats_date);
        }
        let mean = |count: fn(&StatusCounts) -> u64| {
            let sum: u128 = snapshots
                .iter()
                .map(|s| count(&s.status_counts) as u128)
                .sum();
            (sum / n as u128) as u64
        };
        let status_counts = StatusCounts {
            online: mean(|c| c.online),
            offline: mean(|c| c.offline),
            error: mean(|c| c.error),
            maintenance: mean(|c| c.maintenance),
        };
        Self {
            status_counts,
            total: status_counts.sum(),
            avg_performance: Performance::mean(snapshots.iter().map(|s| s.avg_performance)),
            trends: Trends::default(),
            stats_date,
            created_at: None,
            updated_at: None,
        }
    }

    /// Weighted fleet health: online share 50%, non-error share 30%, performance 20%.
    pub fn health_score(&self) -> Performance {
        if self.total == 0 {
            return Performance::ZERO;
        }
        let online = self.status_share(DeviceStatus::Online).hundredths();
        let error = self.status_share(DeviceStatus::Error).hundredths();
        let weighted = online * 50
            + (Performance::MAX.hundredths() - error) * 30
            + self.avg_performance.hundredths() * 20;
        Performance::from_hundredths((weighted + 50) / 100)
    }
}
