// Control plane: admission control and administrative access
//
// Provides simple concurrency limiting and rate limiting for exchanges, the
// bearer credentials that authenticate API callers, and the set of actors
// allowed to mutate routing tables.
//
// Numan Thabit 2025 Nov

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Semaphore};
use tracing::debug;

use crate::errors::ExchangeError;

#[derive(Clone)]
pub struct AdmissionControl {
    inflight: Arc<Semaphore>,
    limiter: Arc<Mutex<RateLimiter>>,
}

/// Sliding one-second window of admitted exchanges.
struct RateLimiter {
    limit: u32,
    admitted: VecDeque<Instant>,
}

impl RateLimiter {
    const WINDOW: Duration = Duration::from_secs(1);

    fn try_admit(&mut self, now: Instant) -> bool {
        while self
            .admitted
            .front()
            .is_some_and(|at| now.duration_since(*at) > Self::WINDOW)
        {
            self.admitted.pop_front();
        }
        if self.admitted.len() < self.limit as usize {
            self.admitted.push_back(now);
            true
        } else {
            false
        }
    }
}

impl AdmissionControl {
    pub fn new(max_inflight: usize, rate_per_sec: Option<u32>) -> Self {
        let limit = rate_per_sec.unwrap_or(200).max(1);
        Self {
            inflight: Arc::new(Semaphore::new(max_inflight.max(1))),
            limiter: Arc::new(Mutex::new(RateLimiter {
                limit,
                admitted: VecDeque::with_capacity(limit.min(1024) as usize),
            })),
        }
    }

    /// Wait for a rate slot, then for an inflight permit. Fails once closed.
    pub async fn acquire(&self) -> Result<AdmissionPermit, ExchangeError> {
        while !self.limiter.lock().await.try_admit(Instant::now()) {
            debug!("exchange rate limited");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let permit = self
            .inflight
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ExchangeError::AdmissionClosed)?;
        Ok(AdmissionPermit { _permit: permit })
    }

    /// Stop admitting exchanges. Permits already held stay valid.
    pub fn close(&self) {
        self.inflight.close();
    }

    pub fn available(&self) -> usize {
        self.inflight.available_permits()
    }
}

pub struct AdmissionPermit {
    _permit: tokio::sync::OwnedSemaphorePermit,
}

/// Actors allowed to run administrative operations.
#[derive(Debug, Clone, Default)]
pub struct AccessList {
    admins: HashSet<String>,
}

impl AccessList {
    pub fn new<I, S>(admins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            admins: admins.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_admin(&self, actor: &str) -> bool {
        self.admins.contains(actor)
    }

    pub fn authorize(&self, actor: &str) -> Result<(), ExchangeError> {
        if self.is_admin(actor) {
            Ok(())
        } else {
            Err(ExchangeError::Unauthorized(actor.to_string()))
        }
    }
}

/// Bearer tokens and the actor each one authenticates.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    actors: HashMap<String, String>,
}

impl Credentials {
    pub fn new<I, T, A>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (T, A)>,
        T: Into<String>,
        A: Into<String>,
    {
        Self {
            actors: pairs
                .into_iter()
                .map(|(token, actor)| (token.into(), actor.into()))
                .collect(),
        }
    }

    /// Actor behind `token`, if the token is known.
    pub fn actor_for(&self, token: &str) -> Option<&str> {
        self.actors.get(token).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_listed_actors_are_admins() {
        let access = AccessList::new(["ops"]);
        assert!(access.authorize("ops").is_ok());
        assert_eq!(
            access.authorize("mallory"),
            Err(ExchangeError::Unauthorized("mallory".to_string()))
        );
    }

    #[tokio::test]
    async fn permits_are_bounded() {
        let admission = AdmissionControl::new(2, Some(100));
        let first = admission.acquire().await.unwrap();
        let _second = admission.acquire().await.unwrap();
        assert_eq!(admission.available(), 0);
        drop(first);
        assert_eq!(admission.available(), 1);
    }

    #[tokio::test]
    async fn closed_admission_rejects() {
        let admission = AdmissionControl::new(1, Some(100));
        let held = admission.acquire().await.unwrap();
        admission.close();
        assert!(matches!(
            admission.acquire().await,
            Err(ExchangeError::AdmissionClosed)
        ));
        drop(held);
    }

    #[test]
    fn tokens_map_to_actors() {
        let creds = Credentials::new([("s3cret", "ops")]);
        assert_eq!(creds.actor_for("s3cret"), Some("ops"));
        assert_eq!(creds.actor_for("ops"), None);
        assert_eq!(creds.len(), 1);
    }

    #[test]
    fn window_slides() {
        let mut limiter = RateLimiter {
            limit: 2,
            admitted: VecDeque::new(),
        };
        let start = Instant::now();
        assert!(limiter.try_admit(start));
        assert!(limiter.try_admit(start));
        assert!(!limiter.try_admit(start + Duration::from_millis(500)));
        assert!(limiter.try_admit(start + Duration::from_millis(1_001)));
    }
}
