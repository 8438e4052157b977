//! In-memory market dataset and its derived views
//!
//! Ordering rules shared by every view:
//! - a record with no value on the active key sorts after every record that has one,
//!   in both directions; two missing values compare equal
//! - names compare case-insensitively
//! - sorting is stable, so records equal on the key keep their prior relative order

use crate::error::ValidationError;
use crate::market::types::{AssetRecord, Snapshot, TrendingRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::str::FromStr;

/// Column a view can be ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Rank,
    Name,
    Price,
    PctChange1h,
    PctChange24h,
    PctChange7d,
    MarketCap,
    TotalVolume,
}

impl SortKey {
    fn numeric_value(self, record: &AssetRecord) -> Option<f64> {
        let value = match self {
            SortKey::Rank => record.rank.map(f64::from),
            SortKey::Price => record.current_price,
            SortKey::PctChange1h => record.pct_change_1h,
            SortKey::PctChange24h => record.pct_change_24h,
            SortKey::PctChange7d => record.pct_change_7d,
            SortKey::MarketCap => record.market_cap,
            SortKey::TotalVolume => record.total_volume,
            SortKey::Name => None,
        };
        value.filter(|v| !v.is_nan())
    }
}

impl FromStr for SortKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = match s.trim().to_lowercase().as_str() {
            "" | "rank" | "market_cap_rank" => SortKey::Rank,
            "name" => SortKey::Name,
            "price" | "current_price" => SortKey::Price,
            "p1h" | "pct_change_1h" | "pctchange1h" => SortKey::PctChange1h,
            "p24" | "p24h" | "pct_change_24h" | "pctchange24h" => SortKey::PctChange24h,
            "p7d" | "pct_change_7d" | "pctchange7d" => SortKey::PctChange7d,
            "mcap" | "market_cap" | "marketcap" => SortKey::MarketCap,
            "vol" | "volume" | "total_volume" | "totalvolume" => SortKey::TotalVolume,
            _ => return Err(ValidationError::UnknownSortKey(s.to_string())),
        };
        Ok(key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

impl FromStr for SortDirection {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "asc" | "ascending" => Ok(SortDirection::Asc),
            "desc" | "descending" => Ok(SortDirection::Desc),
            _ => Err(ValidationError::UnknownSortDirection(s.to_string())),
        }
    }
}

/// Metrics allowed for top-N rankings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankMetric {
    PctChange24h,
    PctChange7d,
    TotalVolume,
    MarketCap,
}

impl RankMetric {
    pub fn sort_key(self) -> SortKey {
        match self {
            RankMetric::PctChange24h => SortKey::PctChange24h,
            RankMetric::PctChange7d => SortKey::PctChange7d,
            RankMetric::TotalVolume => SortKey::TotalVolume,
            RankMetric::MarketCap => SortKey::MarketCap,
        }
    }
}

impl FromStr for RankMetric {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "p24" | "p24h" | "pct_change_24h" | "pctchange24h" => Ok(RankMetric::PctChange24h),
            "p7d" | "pct_change_7d" | "pctchange7d" => Ok(RankMetric::PctChange7d),
            "vol" | "volume" | "total_volume" | "totalvolume" => Ok(RankMetric::TotalVolume),
            "mcap" | "market_cap" | "marketcap" => Ok(RankMetric::MarketCap),
            _ => Err(ValidationError::UnknownMetric(s.to_string())),
        }
    }
}

/// Active sort state of a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: SortKey,
    pub direction: SortDirection,
}

/// Compare two records on `key`, keeping missing values last in both directions
pub fn compare_records(
    a: &AssetRecord,
    b: &AssetRecord,
    key: SortKey,
    direction: SortDirection,
) -> Ordering {
    if key == SortKey::Name {
        return direction.apply(a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    }

    match (key.numeric_value(a), key.numeric_value(b)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => direction.apply(x.partial_cmp(&y).unwrap_or(Ordering::Equal)),
    }
}

fn matches_query(record: &AssetRecord, query: &str) -> bool {
    record.name.to_lowercase().contains(query) || record.symbol.to_lowercase().contains(query)
}

/// Whole market dataset. Replaced on every refresh, never patched.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    coins: Vec<AssetRecord>,
    trending: Vec<TrendingRecord>,
    currency: String,
    updated_at: Option<DateTime<Utc>>,
    stale: bool,
    sort: SortSpec,
    filter: String,
}

impl Dataset {
    /// Empty dataset quoted in `currency`
    pub fn empty(currency: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
            ..Default::default()
        }
    }

    /// Dataset built from a successful fetch
    pub fn fresh(
        currency: impl Into<String>,
        coins: Vec<AssetRecord>,
        trending: Vec<TrendingRecord>,
    ) -> Self {
        Self {
            coins: dedupe_by_id(coins),
            trending,
            currency: currency.into(),
            updated_at: Some(Utc::now()),
            stale: false,
            ..Default::default()
        }
    }

    /// Dataset adopted from a cached snapshot; marked stale
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            coins: dedupe_by_id(snapshot.coins),
            trending: snapshot.trending,
            currency: snapshot.currency,
            updated_at: snapshot.timestamp,
            stale: true,
            ..Default::default()
        }
    }

    /// Snapshot of the current contents
    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            timestamp: self.updated_at,
            currency: self.currency.clone(),
            coins: self.coins.clone(),
            trending: self.trending.clone(),
        }
    }

    /// Swap in new contents, keeping the sort and filter the consumer chose.
    ///
    /// A replacement without a currency keeps the current one.
    pub fn replace(&mut self, next: Dataset) {
        let sort = self.sort;
        let filter = std::mem::take(&mut self.filter);
        let currency = if next.currency.is_empty() {
            std::mem::take(&mut self.currency)
        } else {
            next.currency.clone()
        };

        *self = Dataset {
            currency,
            sort,
            filter,
            ..next
        };
        self.sort_by(sort.key, sort.direction);
    }

    /// Stable in-place sort over all records
    pub fn sort_by(&mut self, key: SortKey, direction: SortDirection) {
        self.coins
            .sort_by(|a, b| compare_records(a, b, key, direction));
        self.sort = SortSpec { key, direction };
    }

    /// Records whose name or symbol contains `query`, case-insensitively.
    ///
    /// An empty query returns everything. The dataset itself is untouched.
    pub fn filter(&self, query: &str) -> Vec<AssetRecord> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return self.coins.clone();
        }

        self.coins
            .iter()
            .filter(|c| matches_query(c, &query))
            .cloned()
            .collect()
    }

    /// Apply sort and filter state, then return the resulting rows
    pub fn view(&mut self, key: SortKey, direction: SortDirection, query: &str) -> Vec<AssetRecord> {
        self.sort_by(key, direction);
        self.filter = query.trim().to_string();
        self.filter(query)
    }

    /// Ordered copy of the full, unfiltered set ranked by `metric`
    pub fn rank_by(&self, metric: RankMetric, direction: SortDirection) -> Vec<AssetRecord> {
        let key = metric.sort_key();
        let mut ranked = self.coins.clone();
        ranked.sort_by(|a, b| compare_records(a, b, key, direction));
        ranked
    }

    /// First `n` records of [`Dataset::rank_by`]
    pub fn top_n(&self, metric: RankMetric, direction: SortDirection, n: usize) -> Vec<AssetRecord> {
        let mut ranked = self.rank_by(metric, direction);
        ranked.truncate(n);
        ranked
    }

    /// First record whose symbol matches, case-insensitively
    pub fn find_by_symbol(&self, symbol: &str) -> Option<&AssetRecord> {
        self.coins
            .iter()
            .find(|c| c.symbol.eq_ignore_ascii_case(symbol))
    }

    pub fn coins(&self) -> &[AssetRecord] {
        &self.coins
    }

    pub fn trending(&self) -> &[TrendingRecord] {
        &self.trending
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn sort(&self) -> SortSpec {
        self.sort
    }

    pub fn current_filter(&self) -> &str {
        &self.filter
    }

    pub fn len(&self) -> usize {
        self.coins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coins.is_empty()
    }
}

/// Keep the first record for each id
fn dedupe_by_id(coins: Vec<AssetRecord>) -> Vec<AssetRecord> {
    let total = coins.len();
    let mut seen = HashSet::with_capacity(total);
    let unique: Vec<AssetRecord> = coins
        .into_iter()
        .filter(|c| seen.insert(c.id.clone()))
        .collect();

    if unique.len() != total {
        tracing::warn!("Dropped {} duplicate asset ids", total - unique.len());
    }
    unique
}
