//! Per-client daily quota.
//!
//! The table lives as long as the process that owns the [`QuotaService`]; it
//! is never persisted and a restart puts every client back to unseen.

use chrono::NaiveDate;
use chrono_tz::Tz;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::metrics::{QUOTA_ALLOWED, QUOTA_DENIED, QUOTA_TRACKED_CLIENTS, QUOTA_WINDOW_RESETS};

// Usage entry - tracks calls per client identity for one calendar day
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientUsageRecord {
    pub count: u32,
    pub window_date: NaiveDate,
}

// Outcome of one check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub count_after: u32,
}

pub struct QuotaService {
    table: DashMap<String, ClientUsageRecord>, // identity -> usage
    daily_limit: u32,
    timezone: Tz,
    clock: Arc<dyn Clock>,
}

impl QuotaService {
    pub fn new(daily_limit: u32, timezone: Tz) -> Self {
        Self::with_clock(daily_limit, timezone, Arc::new(SystemClock))
    }

    pub fn with_clock(daily_limit: u32, timezone: Tz, clock: Arc<dyn Clock>) -> Self {
        Self {
            table: DashMap::new(),
            daily_limit,
            timezone,
            clock,
        }
    }

    pub fn limit(&self) -> u32 {
        self.daily_limit
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Checks whether `identity` may make another call today and, if so,
    /// consumes one unit of its quota.
    pub fn check_and_consume(&self, identity: &str) -> Decision {
        let today = self.clock.today_in(self.timezone);
        self.check_and_consume_on(identity, today)
    }

    /// Same as [`check_and_consume`](Self::check_and_consume) with the
    /// reference date supplied by the caller.
    ///
    /// The entry guard holds the shard's write lock for the whole
    /// reset/compare/increment sequence, so two calls for one identity can
    /// never both take the last unit.
    pub fn check_and_consume_on(&self, identity: &str, today: NaiveDate) -> Decision {
        let mut created = false;
        let mut entry = self
            .table
            .entry(identity.to_string())
            .or_insert_with(|| {
                created = true;
                ClientUsageRecord {
                    count: 0,
                    window_date: today,
                }
            });

        // new day..? start a fresh window
        if entry.window_date != today {
            debug!(
                identity,
                previous = %entry.window_date,
                %today,
                "quota window reset"
            );
            entry.count = 0;
            entry.window_date = today;
            QUOTA_WINDOW_RESETS.inc();
        }

        let decision = if entry.count < self.daily_limit {
            entry.count += 1;
            QUOTA_ALLOWED.inc();
            Decision {
                allowed: true,
                count_after: entry.count,
            }
        } else {
            // denied calls never consume quota
            QUOTA_DENIED.inc();
            Decision {
                allowed: false,
                count_after: entry.count,
            }
        };
        drop(entry);

        if created {
            QUOTA_TRACKED_CLIENTS.set(self.table.len() as f64);
        }
        decision
    }

    // Snapshot of a client's record, if it has ever called
    pub fn usage(&self, identity: &str) -> Option<ClientUsageRecord> {
        self.table.get(identity).map(|r| r.value().clone())
    }

    pub fn tracked_clients(&self) -> usize {
        self.table.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::Barrier;
    use std::thread;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn service(limit: u32) -> QuotaService {
        QuotaService::new(limit, chrono_tz::Asia::Seoul)
    }

    #[test]
    fn first_ten_allowed_then_denied_and_other_client_unaffected() {
        let quota = service(10);

        for expected in 1..=10 {
            let decision = quota.check_and_consume_on("A", day(1));
            assert_eq!(
                decision,
                Decision {
                    allowed: true,
                    count_after: expected
                }
            );
        }

        let eleventh = quota.check_and_consume_on("A", day(1));
        assert!(!eleventh.allowed);
        assert_eq!(eleventh.count_after, 10);

        let b = quota.check_and_consume_on("B", day(1));
        assert_eq!(
            b,
            Decision {
                allowed: true,
                count_after: 1
            }
        );
        assert_eq!(quota.usage("A").unwrap().count, 10);
        assert_eq!(quota.tracked_clients(), 2);
    }

    #[test]
    fn denial_is_sticky_for_the_rest_of_the_day() {
        let quota = service(3);
        for _ in 0..3 {
            assert!(quota.check_and_consume_on("A", day(1)).allowed);
        }
        for _ in 0..20 {
            let decision = quota.check_and_consume_on("A", day(1));
            assert!(!decision.allowed);
            assert_eq!(decision.count_after, 3);
        }
        assert_eq!(
            quota.usage("A"),
            Some(ClientUsageRecord {
                count: 3,
                window_date: day(1)
            })
        );
    }

    #[test]
    fn next_day_starts_a_fresh_window() {
        let quota = service(10);
        for _ in 0..11 {
            quota.check_and_consume_on("A", day(1));
        }
        assert_eq!(quota.usage("A").unwrap().count, 10);

        let decision = quota.check_and_consume_on("A", day(2));
        assert_eq!(
            decision,
            Decision {
                allowed: true,
                count_after: 1
            }
        );
        assert_eq!(quota.usage("A").unwrap().window_date, day(2));
    }

    #[test]
    fn any_date_change_resets_not_only_forward() {
        let quota = service(2);
        quota.check_and_consume_on("A", day(5));
        quota.check_and_consume_on("A", day(5));

        let decision = quota.check_and_consume_on("A", day(4));
        assert_eq!(decision.count_after, 1);
        assert_eq!(quota.usage("A").unwrap().window_date, day(4));
    }

    #[test]
    fn zero_limit_denies_everything_without_consuming() {
        let quota = service(0);
        let decision = quota.check_and_consume_on("A", day(1));
        assert_eq!(
            decision,
            Decision {
                allowed: false,
                count_after: 0
            }
        );
        assert_eq!(quota.usage("A").unwrap().count, 0);
    }

    #[test]
    fn unseen_client_has_no_record() {
        let quota = service(10);
        assert!(quota.usage("nobody").is_none());
        assert_eq!(quota.tracked_clients(), 0);
    }

    #[test]
    fn midnight_in_reference_zone_resets_the_window() {
        // 23:59 in Seoul on May 1st
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 14, 59, 0).unwrap(),
        ));
        let quota = QuotaService::with_clock(1, chrono_tz::Asia::Seoul, clock.clone());

        assert!(quota.check_and_consume("A").allowed);
        assert!(!quota.check_and_consume("A").allowed);

        // 00:01 on May 2nd in Seoul, still May 1st in UTC
        clock.advance(Duration::minutes(2));
        let decision = quota.check_and_consume("A");
        assert_eq!(
            decision,
            Decision {
                allowed: true,
                count_after: 1
            }
        );
        assert_eq!(quota.usage("A").unwrap().window_date, day(2));
    }

    #[test]
    fn calls_spread_over_one_day_are_capped() {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 15, 0, 0).unwrap(), // 00:00 Seoul
        ));
        let quota = QuotaService::with_clock(5, chrono_tz::Asia::Seoul, clock.clone());

        let mut allowed = 0;
        for _ in 0..(24 * 6 - 1) {
            if quota.check_and_consume("A").allowed {
                allowed += 1;
            }
            clock.advance(Duration::minutes(10));
        }
        assert_eq!(allowed, 5);
    }

    #[test]
    fn last_unit_is_never_handed_out_twice() {
        for _ in 0..50 {
            let quota = Arc::new(service(1));
            let barrier = Arc::new(Barrier::new(2));

            let handles: Vec<_> = (0..2)
                .map(|_| {
                    let quota = Arc::clone(&quota);
                    let barrier = Arc::clone(&barrier);
                    thread::spawn(move || {
                        barrier.wait();
                        quota.check_and_consume_on("fresh", day(1))
                    })
                })
                .collect();

            let decisions: Vec<Decision> =
                handles.into_iter().map(|h| h.join().unwrap()).collect();
            let allowed = decisions.iter().filter(|d| d.allowed).count();

            assert_eq!(allowed, 1);
            assert_eq!(quota.usage("fresh").unwrap().count, 1);
        }
    }

    #[test]
    fn concurrent_callers_never_exceed_the_cap() {
        let quota = Arc::new(service(25));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let quota = Arc::clone(&quota);
                thread::spawn(move || {
                    let mut allowed = 0u32;
                    for i in 0..20 {
                        // every thread hits "shared" and its own key
                        if quota.check_and_consume_on("shared", day(1)).allowed {
                            allowed += 1;
                        }
                        quota.check_and_consume_on(&format!("own-{t}-{}", i % 2), day(1));
                    }
                    allowed
                })
            })
            .collect();

        let total: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 25);
        assert_eq!(quota.usage("shared").unwrap().count, 25);
        for t in 0..8 {
            assert_eq!(quota.usage(&format!("own-{t}-0")).unwrap().count, 10);
        }
    }
}
