//! In-memory stand-ins for LeetCode and the database.

use serenity::async_trait;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;

use crate::error::{StatsError, StatsResult};
use crate::lcapi::{ProblemCatalogSource, ProfileSource};
use crate::lcdb::StatsStore;
use crate::models::{CachedEntry, CatalogProblem, Profile, Scope, TrackedUser};

pub struct FakeCatalog {
    problems: Vec<CatalogProblem>,
    calls: AtomicUsize,
    failures: usize,
    delay: Duration,
}

impl FakeCatalog {
    pub fn new(problems: Vec<CatalogProblem>) -> Self {
        Self { problems, calls: AtomicUsize::new(0), failures: 0, delay: Duration::ZERO }
    }

    /// The first `n` fetches fail.
    pub fn failing_first(mut self, n: usize) -> Self {
        self.failures = n;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProblemCatalogSource for FakeCatalog {
    async fn fetch_all_problems(&self) -> StatsResult<Vec<CatalogProblem>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;

        if call <= self.failures {
            return Err(StatsError::SourceUnavailable(String::from("catalog is down")));
        }
        Ok(self.problems.clone())
    }
}

#[derive(Default)]
pub struct FakeProfiles {
    profiles: Mutex<HashMap<String, StatsResult<Profile>>>,
    calls: Mutex<HashMap<String, usize>>,
    delay: Mutex<Duration>,
}

impl FakeProfiles {
    pub fn set(&self, username: &str, profile: StatsResult<Profile>) {
        self.profiles.lock().unwrap().insert(username.to_string(), profile);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn calls(&self, username: &str) -> usize {
        self.calls.lock().unwrap().get(username).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ProfileSource for FakeProfiles {
    async fn fetch_profile(&self, username: &str) -> StatsResult<Profile> {
        *self.calls.lock().unwrap().entry(username.to_string()).or_default() += 1;
        let delay = *self.delay.lock().unwrap();
        tokio::time::sleep(delay).await;

        self.profiles
            .lock()
            .unwrap()
            .get(username)
            .cloned()
            .unwrap_or_else(|| Err(StatsError::UserNotFound(username.to_string())))
    }
}

#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<Vec<TrackedUser>>,
    memberships: Mutex<Vec<(String, String)>>,
    cache: Mutex<HashMap<String, CachedEntry>>,
    cache_broken: AtomicBool,
}

impl MemoryStore {
    pub fn track(&self, username: &str) {
        let mut users = self.users.lock().unwrap();
        let id = users.len() as i64 + 1;
        users.push(TrackedUser { id, username: username.to_string(), joined_date: Utc::now() });
    }

    pub fn join(&self, room: &str, username: &str) {
        self.memberships.lock().unwrap().push((room.to_string(), username.to_string()));
    }

    pub fn put_cached(&self, entry: CachedEntry) {
        self.cache.lock().unwrap().insert(entry.username.clone(), entry);
    }

    pub fn cached(&self, username: &str) -> Option<CachedEntry> {
        self.cache.lock().unwrap().get(username).cloned()
    }

    /// Makes every cache read and write fail.
    pub fn set_cache_broken(&self, broken: bool) {
        self.cache_broken.store(broken, Ordering::SeqCst);
    }

    fn check_cache(&self) -> StatsResult<()> {
        if self.cache_broken.load(Ordering::SeqCst) {
            return Err(StatsError::CacheUnavailable(String::from("disk on fire")));
        }
        Ok(())
    }
}

#[async_trait]
impl StatsStore for MemoryStore {
    async fn find_cached_entry(&self, username: &str) -> StatsResult<Option<CachedEntry>> {
        self.check_cache()?;
        Ok(self.cached(username))
    }

    async fn upsert_cached_entry(&self, entry: &CachedEntry) -> StatsResult<()> {
        self.check_cache()?;
        self.put_cached(entry.clone());
        Ok(())
    }

    async fn list_tracked_users(&self, scope: &Scope) -> StatsResult<Vec<TrackedUser>> {
        let users = self.users.lock().unwrap().clone();
        Ok(match scope {
            Scope::All => users,
            Scope::Room(room) => {
                let memberships = self.memberships.lock().unwrap();
                users
                    .into_iter()
                    .filter(|user| memberships.iter().any(|(r, u)| r == room && *u == user.username))
                    .collect()
            }
        })
    }

    async fn find_tracked_user(&self, username: &str) -> StatsResult<Option<TrackedUser>> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.username == username).cloned())
    }
}
