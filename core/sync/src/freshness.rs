//! Staleness decisions for cached reads.

use chrono::{DateTime, Duration, Utc};

use crate::config::SyncConfig;
use crate::metadata::{FetchScope, MetadataStore};
use offsync_common::{Record, TypeName};

/// Pure staleness policy over the fetch bookkeeping.
///
/// The policy answers exactly one question: should a refresh be
/// enqueued. Whether cached data is currently displayable is never its
/// concern, and staleness never blocks a read. The `_at` variants take
/// an explicit `now` so decisions stay deterministic under test.
#[derive(Debug, Clone)]
pub struct FreshnessPolicy {
    ttl_hours: f64,
    background_refresh: bool,
}

impl FreshnessPolicy {
    /// Derive a policy from validated configuration.
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            ttl_hours: config.record_ttl_hours,
            background_refresh: config.background_refresh,
        }
    }

    /// Whether reads may schedule background refresh work at all.
    ///
    /// Independent of the staleness computation: a deployment can keep
    /// serving cached data without ever generating background traffic.
    pub fn should_background_refresh(&self) -> bool {
        self.background_refresh
    }

    /// Staleness of a fetch timestamp at `now`.
    ///
    /// Absent means never fetched, which is always stale. A timestamp in
    /// the future (clock skew) counts as age zero, never as stale.
    fn is_stale_at(&self, fetched_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        let Some(fetched_at) = fetched_at else {
            return true;
        };
        let age = (now - fetched_at).max(Duration::zero());
        age_hours(age) > self.ttl_hours
    }

    /// Whether the whole-collection cache for a type must be refreshed.
    pub fn is_stale_all(&self, metadata: &MetadataStore, type_name: &TypeName) -> bool {
        self.is_stale_all_at(metadata, type_name, Utc::now())
    }

    /// [`Self::is_stale_all`] at an explicit instant.
    pub fn is_stale_all_at(
        &self,
        metadata: &MetadataStore,
        type_name: &TypeName,
        now: DateTime<Utc>,
    ) -> bool {
        self.is_stale_at(metadata.last_fetch(FetchScope::All, type_name, None), now)
    }

    /// Whether the cached copy of a single record must be refreshed.
    pub fn is_stale_one(&self, metadata: &MetadataStore, type_name: &TypeName, key: &str) -> bool {
        self.is_stale_one_at(metadata, type_name, key, Utc::now())
    }

    /// [`Self::is_stale_one`] at an explicit instant.
    pub fn is_stale_one_at(
        &self,
        metadata: &MetadataStore,
        type_name: &TypeName,
        key: &str,
        now: DateTime<Utc>,
    ) -> bool {
        self.is_stale_at(
            metadata.last_fetch(FetchScope::One, type_name, Some(key)),
            now,
        )
    }

    /// Batch staleness: stale if any result is missing or any per-key
    /// fetch record is stale.
    pub fn is_expired_many(
        &self,
        metadata: &MetadataStore,
        type_name: &TypeName,
        keys: &[String],
        results: &[Option<Record>],
    ) -> bool {
        self.is_expired_many_at(metadata, type_name, keys, results, Utc::now())
    }

    /// [`Self::is_expired_many`] at an explicit instant.
    pub fn is_expired_many_at(
        &self,
        metadata: &MetadataStore,
        type_name: &TypeName,
        keys: &[String],
        results: &[Option<Record>],
        now: DateTime<Utc>,
    ) -> bool {
        if results.iter().any(|result| result.is_none()) {
            return true;
        }
        keys.iter()
            .any(|key| self.is_stale_one_at(metadata, type_name, key, now))
    }
}

fn age_hours(age: Duration) -> f64 {
    age.num_milliseconds() as f64 / 3_600_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn widget() -> TypeName {
        TypeName::new("widget").unwrap()
    }

    fn policy(ttl_hours: f64) -> FreshnessPolicy {
        FreshnessPolicy::new(&SyncConfig::new(ttl_hours))
    }

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_absent_fetch_record_is_stale() {
        let metadata = MetadataStore::new();
        assert!(policy(24.0).is_stale_one_at(&metadata, &widget(), "w1", base()));
        assert!(policy(24.0).is_stale_all_at(&metadata, &widget(), base()));
    }

    #[test]
    fn test_recent_fetch_is_fresh() {
        let mut metadata = MetadataStore::new();
        metadata.record_fetch_at(FetchScope::One, &widget(), Some("w1"), base());

        let now = base() + Duration::hours(1);
        assert!(!policy(24.0).is_stale_one_at(&metadata, &widget(), "w1", now));
    }

    #[test]
    fn test_old_fetch_is_stale() {
        let mut metadata = MetadataStore::new();
        metadata.record_fetch_at(FetchScope::One, &widget(), Some("w1"), base());

        let now = base() + Duration::hours(25);
        assert!(policy(24.0).is_stale_one_at(&metadata, &widget(), "w1", now));
    }

    #[test]
    fn test_zero_ttl_stale_after_any_delay() {
        let mut metadata = MetadataStore::new();
        metadata.record_fetch_at(FetchScope::One, &widget(), Some("w1"), base());

        let p = policy(0.0);
        assert!(!p.is_stale_one_at(&metadata, &widget(), "w1", base()));
        assert!(p.is_stale_one_at(
            &metadata,
            &widget(),
            "w1",
            base() + Duration::milliseconds(1)
        ));
    }

    #[test]
    fn test_clock_skew_counts_as_fresh() {
        let mut metadata = MetadataStore::new();
        // Fetch timestamp an hour in the future of "now".
        metadata.record_fetch_at(
            FetchScope::One,
            &widget(),
            Some("w1"),
            base() + Duration::hours(1),
        );

        assert!(!policy(0.0).is_stale_one_at(&metadata, &widget(), "w1", base()));
    }

    #[test]
    fn test_expired_many_on_missing_result() {
        let mut metadata = MetadataStore::new();
        let keys = vec!["w1".to_string(), "w2".to_string()];
        metadata.record_fetch_at(FetchScope::One, &widget(), Some("w1"), base());
        metadata.record_fetch_at(FetchScope::One, &widget(), Some("w2"), base());

        let results = vec![Some(Record::new()), None];
        assert!(policy(24.0).is_expired_many_at(&metadata, &widget(), &keys, &results, base()));
    }

    #[test]
    fn test_expired_many_on_one_stale_key() {
        let mut metadata = MetadataStore::new();
        let keys = vec!["w1".to_string(), "w2".to_string()];
        metadata.record_fetch_at(FetchScope::One, &widget(), Some("w1"), base());
        metadata.record_fetch_at(
            FetchScope::One,
            &widget(),
            Some("w2"),
            base() - Duration::hours(48),
        );

        let results = vec![Some(Record::new()), Some(Record::new())];
        let p = policy(24.0);
        assert!(p.is_expired_many_at(&metadata, &widget(), &keys, &results, base()));

        // Refreshing the stale key makes the batch fresh again.
        metadata.record_fetch_at(FetchScope::One, &widget(), Some("w2"), base());
        assert!(!p.is_expired_many_at(&metadata, &widget(), &keys, &results, base()));
    }

    proptest! {
        // Staleness is monotone in `now`: once stale, staying untouched
        // can never make a record fresh again.
        #[test]
        fn test_staleness_monotonic(
            age_minutes in 0i64..200_000,
            delta_minutes in 0i64..200_000,
            ttl_hours in 0.0f64..1000.0,
        ) {
            let mut metadata = MetadataStore::new();
            metadata.record_fetch_at(FetchScope::One, &widget(), Some("w1"), base());

            let p = policy(ttl_hours);
            let now1 = base() + Duration::minutes(age_minutes);
            let now2 = now1 + Duration::minutes(delta_minutes);

            let stale1 = p.is_stale_one_at(&metadata, &widget(), "w1", now1);
            let stale2 = p.is_stale_one_at(&metadata, &widget(), "w1", now2);
            prop_assert!(!stale1 || stale2);
        }
    }
}
