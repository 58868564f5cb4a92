use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::AddAssign;

pub const TOTAL_KEY: &str = "total";

const MICROS_PER_HOUR: f64 = 1_000_000.0;

/// Non-negative hours as whole micro-hours.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hours(u64);

impl Hours {
    pub fn from_micros(micros: u64) -> Self {
        Self(micros)
    }

    pub fn micros(self) -> u64 {
        self.0
    }

    pub fn from_f64(hours: f64) -> Option<Self> {
        let micros = (hours * MICROS_PER_HOUR).round();
        if !micros.is_finite() || micros < 0.0 || micros >= u64::MAX as f64 {
            return None;
        }
        Some(Self(micros as u64))
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / MICROS_PER_HOUR
    }
}

impl AddAssign for Hours {
    fn add_assign(&mut self, other: Hours) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl fmt::Display for Hours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.as_f64(), f)
    }
}

impl Serialize for Hours {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Hours {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hours = f64::deserialize(deserializer)?;
        Hours::from_f64(hours)
            .ok_or_else(|| D::Error::custom(format!("hours must be a non-negative number, got {hours}")))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributorStats {
    pub hours: Hours,
    pub commits: u64,
}

impl ContributorStats {
    /// Negative or non-finite `hours` count as zero.
    pub fn new(hours: f64, commits: u64) -> Self {
        Self {
            hours: Hours::from_f64(hours).unwrap_or_default(),
            commits,
        }
    }
}

impl AddAssign<&ContributorStats> for ContributorStats {
    fn add_assign(&mut self, other: &ContributorStats) {
        self.hours += other.hours;
        self.commits = self.commits.saturating_add(other.commits);
    }
}

/// Serializes as one flat object, `total` first, the shape the estimator prints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsMapping {
    pub total: ContributorStats,
    #[serde(flatten)]
    pub contributors: BTreeMap<String, ContributorStats>,
}

impl StatsMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_contributors<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, ContributorStats)>,
        K: Into<String>,
    {
        let mut mapping = Self::new();
        for (key, stats) in entries {
            mapping.add(key.into(), &stats);
        }
        mapping
    }

    pub fn add(&mut self, contributor: String, stats: &ContributorStats) {
        *self.contributors.entry(contributor).or_default() += stats;
        self.total += stats;
    }

    pub fn get(&self, contributor: &str) -> Option<&ContributorStats> {
        if contributor == TOTAL_KEY {
            Some(&self.total)
        } else {
            self.contributors.get(contributor)
        }
    }

    pub fn contributor_count(&self) -> usize {
        self.contributors.len()
    }

    pub fn ranked(&self) -> Vec<(&str, &ContributorStats)> {
        let mut ranked: Vec<_> = self
            .contributors
            .iter()
            .map(|(name, stats)| (name.as_str(), stats))
            .collect();
        ranked.sort_by(|a, b| b.1.hours.cmp(&a.1.hours).then_with(|| a.0.cmp(b.0)));
        ranked
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepoResult {
    pub repo: String,
    pub stats: StatsMapping,
    /// Estimator output as printed, kept verbatim for the per-repo report.
    pub raw: Option<Value>,
}

impl RepoResult {
    pub fn new(repo: impl Into<String>, stats: StatsMapping) -> Self {
        Self {
            repo: repo.into(),
            stats,
            raw: None,
        }
    }

    pub fn from_output(repo: impl Into<String>, raw: Value) -> serde_json::Result<Self> {
        let stats = StatsMapping::deserialize(&raw)?;
        Ok(Self {
            repo: repo.into(),
            stats,
            raw: Some(raw),
        })
    }
}
