use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, Utc};
use tokio::time::Instant;

/// Represents an entity responsible for providing dates across application. This can allow it to
/// be used for testing
#[async_trait]
pub trait Clock: Sync + Send + 'static {
    fn time(&self) -> DateTime<Utc>;

    fn instant(&self) -> Instant;

    async fn sleep_until(&self, instant: Instant);

    fn local_time(&self) -> DateTime<Local> {
        self.time().with_timezone(&Local)
    }

    /// Date of the user. Activities are always logged against local dates.
    fn today(&self) -> NaiveDate {
        self.local_time().date_naive()
    }

    /// Converts a wall clock moment into an [Instant] that timers can wait for. Moments in the past
    /// map to now.
    fn instant_at(&self, moment: DateTime<Utc>) -> Instant {
        let now = self.instant();
        match (moment - self.time()).to_std() {
            Ok(delay) => now + delay,
            Err(_) => now,
        }
    }
}

pub struct DefaultClock;

#[async_trait]
impl Clock for DefaultClock {
    fn time(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn instant(&self) -> Instant {
        Instant::now()
    }

    async fn sleep_until(&self, instant: Instant) {
        tokio::time::sleep_until(instant).await;
    }
}

/// Clock that starts at a chosen moment and then follows tokio time. Works with paused time in
/// tests.
#[derive(Clone)]
pub struct OffsetClock {
    start_time: DateTime<Utc>,
    reference: Instant,
}

impl OffsetClock {
    pub fn starting_at(start_time: DateTime<Utc>) -> Self {
        Self {
            start_time,
            reference: Instant::now(),
        }
    }
}

#[async_trait]
impl Clock for OffsetClock {
    fn time(&self) -> DateTime<Utc> {
        self.start_time + self.reference.elapsed()
    }

    fn instant(&self) -> Instant {
        Instant::now()
    }

    async fn sleep_until(&self, instant: Instant) {
        tokio::time::sleep_until(instant).await;
    }
}

/// Used for waiting on a timer that might not be armed.
pub async fn sleep_until_opt(clock: &dyn Clock, instant: Option<Instant>) {
    match instant {
        Some(v) => clock.sleep_until(v).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{TimeZone, Utc};

    use super::{Clock, OffsetClock};

    #[tokio::test(start_paused = true)]
    async fn test_offset_clock_follows_tokio_time() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let clock = OffsetClock::starting_at(start);

        tokio::time::sleep(Duration::from_secs(90)).await;

        assert_eq!(clock.time(), start + chrono::Duration::seconds(90));
    }

    #[tokio::test(start_paused = true)]
    async fn test_instant_at() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let clock = OffsetClock::starting_at(start);
        let now = clock.instant();

        assert_eq!(
            clock.instant_at(start + chrono::Duration::minutes(5)),
            now + Duration::from_secs(300)
        );
        assert_eq!(clock.instant_at(start - chrono::Duration::minutes(5)), now);
    }
}
