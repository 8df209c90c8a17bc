//! # TicketChain Testing
//!
//! Testing utilities and helpers for the TicketChain workspace.
//!
//! This crate provides:
//! - Mock implementations of environment traits (clock, mirror sink)
//! - A fault-injecting ledger client
//! - Fixtures for the accounts and events most tests need
//! - Property-based testing strategies
//! - A Given-When-Then harness for reducers
//!
//! ## Example
//!
//! ```ignore
//! use ticketchain_testing::{FlakyLedger, fixtures};
//!
//! #[tokio::test]
//! async fn test_retry_after_timeout() {
//!     let ledger = Arc::new(
//!         FlakyLedger::new(InMemoryLedger::new(fixtures::genesis()))
//!             .fail_submit(LedgerError::Timeout("slow".into())),
//!     );
//!     let executor = TransactionExecutor::new(ledger.clone(), RetryPolicy::default());
//!     // ...
//! }
//! ```

use chrono::{DateTime, Utc};
use ticketchain_core::environment::Clock;

pub mod flaky_ledger;
pub mod reducer_test;

/// Mock implementations of environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex, PoisonError};
    use ticketchain_core::mirror::{MirrorError, MirrorSink, TransitionFact};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use ticketchain_testing::mocks::FixedClock;
    /// use ticketchain_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Mirror sink that records every fact it receives.
    ///
    /// Can be switched to refuse deliveries to exercise failure handling.
    #[derive(Clone, Debug, Default)]
    pub struct RecordingMirror {
        facts: Arc<Mutex<Vec<TransitionFact>>>,
        unavailable: Arc<AtomicBool>,
    }

    impl RecordingMirror {
        /// Create an empty recorder
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Refuse (true) or accept (false) subsequent deliveries
        pub fn set_unavailable(&self, unavailable: bool) {
            self.unavailable.store(unavailable, Ordering::SeqCst);
        }

        /// Facts delivered so far, in delivery order
        #[must_use]
        pub fn facts(&self) -> Vec<TransitionFact> {
            self.facts
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }
    }

    impl MirrorSink for RecordingMirror {
        fn publish(
            &self,
            fact: TransitionFact,
        ) -> Pin<Box<dyn Future<Output = Result<(), MirrorError>> + Send + '_>> {
            Box::pin(async move {
                if self.unavailable.load(Ordering::SeqCst) {
                    return Err(MirrorError::Unavailable("recording mirror offline".into()));
                }
                self.facts
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(fact);
                Ok(())
            })
        }
    }
}

/// Accounts and entities shared by tests
///
/// Account numbering is stable so failures are easy to read: owner 1, organizer 2,
/// artist 3, buyer 4, second buyer 5, platform 6, marketplace 7.
pub mod fixtures {
    use ticketchain_core::model::{EventDraft, PlatformConfig};
    use ticketchain_core::settlement::Genesis;
    use ticketchain_core::{Address, Bps, Fingerprint, Wei};

    /// Contract owner
    #[must_use]
    pub fn owner() -> Address {
        Address::from_low_u64(1)
    }

    /// Event organizer
    #[must_use]
    pub fn organizer() -> Address {
        Address::from_low_u64(2)
    }

    /// Royalty recipient
    #[must_use]
    pub fn artist() -> Address {
        Address::from_low_u64(3)
    }

    /// First buyer
    #[must_use]
    pub fn buyer() -> Address {
        Address::from_low_u64(4)
    }

    /// Second buyer
    #[must_use]
    pub fn buyer2() -> Address {
        Address::from_low_u64(5)
    }

    /// Platform fee recipient
    #[must_use]
    pub fn platform() -> Address {
        Address::from_low_u64(6)
    }

    /// Marketplace operator
    #[must_use]
    pub fn marketplace() -> Address {
        Address::from_low_u64(7)
    }

    /// Deployment with a 250 bps platform fee
    #[must_use]
    pub fn genesis() -> Genesis {
        Genesis {
            owner: owner(),
            marketplace: marketplace(),
            platform: PlatformConfig {
                fee_bps: Bps::new(250),
                address: platform(),
            },
        }
    }

    /// Event with royalty 500 bps, markup 1000 bps, issue price 100 wei, supply 100
    #[must_use]
    pub fn event_draft() -> EventDraft {
        EventDraft {
            fingerprint: Fingerprint::from_bytes([0xab; 32]),
            max_supply: 100,
            royalty_bps: Bps::new(500),
            max_resale_markup_bps: Bps::new(1000),
            artist: artist(),
            issue_price: Wei::new(100),
        }
    }
}

/// Property-based testing strategies
pub mod properties {
    use proptest::prelude::*;
    use ticketchain_core::{Bps, Wei};

    /// Any amount up to 10^30 wei
    pub fn amount() -> impl Strategy<Value = Wei> {
        (0u128..1_000_000_000_000_000_000_000_000_000_000).prop_map(Wei::new)
    }

    /// Royalty rate within the allowed range
    pub fn royalty_bps() -> impl Strategy<Value = Bps> {
        (0u16..=1000).prop_map(Bps::new)
    }

    /// Platform fee within the allowed range
    pub fn fee_bps() -> impl Strategy<Value = Bps> {
        (0u16..=500).prop_map(Bps::new)
    }

    /// Resale markup within the allowed range
    pub fn markup_bps() -> impl Strategy<Value = Bps> {
        (0u16..=10_000).prop_map(Bps::new)
    }
}

// Re-export commonly used items
pub use flaky_ledger::{CallCounts, FlakyLedger};
pub use mocks::{FixedClock, RecordingMirror, test_clock};
pub use reducer_test::ReducerTest;
