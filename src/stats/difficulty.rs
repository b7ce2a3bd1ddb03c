use tokio::sync::watch;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{StatsError, StatsResult};
use crate::lcapi::ProblemCatalogSource;
use crate::models::{CatalogProblem, Difficulty};

/// Difficulty assumed for problems missing from the catalog.
pub const DEFAULT_DIFFICULTY: Difficulty = Difficulty::Medium;

/// Problem slug to difficulty lookup.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DifficultyMap {
    difficulties: HashMap<String, Difficulty>,
}

impl DifficultyMap {
    pub fn from_catalog(problems: impl IntoIterator<Item = CatalogProblem>) -> Self {
        Self {
            difficulties: problems
                .into_iter()
                .map(|problem| (problem.slug, problem.difficulty))
                .collect(),
        }
    }

    /// Unknown slugs are approximated as `DEFAULT_DIFFICULTY`.
    pub fn difficulty_of(&self, slug: &str) -> Difficulty {
        self.difficulties.get(slug).copied().unwrap_or(DEFAULT_DIFFICULTY)
    }

    pub fn len(&self) -> usize {
        self.difficulties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.difficulties.is_empty()
    }
}

type BuildOutcome = Option<StatsResult<Arc<DifficultyMap>>>;

enum IndexState {
    Unbuilt,
    Building(watch::Receiver<BuildOutcome>),
    Ready(Arc<DifficultyMap>),
}

/// Lazily built, process-lifetime difficulty lookup.
///
/// The first `resolve` starts a single catalog fetch on a background task.
/// Every caller arriving while it runs waits on the same outcome. A failed
/// build puts the index back to `Unbuilt`, so the next call fetches again.
pub struct DifficultyIndex {
    catalog: Arc<dyn ProblemCatalogSource>,
    state: Arc<Mutex<IndexState>>,
}

impl DifficultyIndex {
    pub fn new(catalog: Arc<dyn ProblemCatalogSource>) -> Self {
        Self { catalog, state: Arc::new(Mutex::new(IndexState::Unbuilt)) }
    }

    pub async fn resolve(&self) -> StatsResult<Arc<DifficultyMap>> {
        let mut pending = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            let in_flight = match &*state {
                IndexState::Ready(map) => return Ok(Arc::clone(map)),
                // A closed channel means the build task died without reporting
                IndexState::Building(rx) if rx.has_changed().is_ok() => Some(rx.clone()),
                _ => None,
            };

            match in_flight {
                Some(rx) => rx,
                None => {
                    let (tx, rx) = watch::channel(None);
                    *state = IndexState::Building(rx.clone());
                    self.spawn_build(tx);
                    rx
                }
            }
        };

        let outcome = pending
            .wait_for(Option::is_some)
            .await
            .map_err(|_| StatsError::SourceUnavailable(String::from(
                "Problem catalog fetch was abandoned."
            )))?;

        match &*outcome {
            Some(result) => result.clone(),
            None => Err(StatsError::SourceUnavailable(String::from(
                "Problem catalog fetch finished without a result."
            ))),
        }
    }

    fn spawn_build(&self, tx: watch::Sender<BuildOutcome>) {
        let catalog = Arc::clone(&self.catalog);
        let state = Arc::clone(&self.state);

        tokio::spawn(async move {
            let outcome = catalog
                .fetch_all_problems()
                .await
                .map(|problems| Arc::new(DifficultyMap::from_catalog(problems)));

            // State goes first so that anyone woken by the send sees it.
            {
                let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
                match &outcome {
                    Ok(map) => {
                        log::info!("[difficulty_index] Indexed {} problems.", map.len());
                        *state = IndexState::Ready(Arc::clone(map));
                    }
                    Err(err) => {
                        log::warn!("[difficulty_index] Could not build problem index: {err}");
                        *state = IndexState::Unbuilt;
                    }
                }
            }

            tx.send_replace(Some(outcome));
        });
    }
}
