use std::sync::{Arc, Mutex};

use super::{LabelScore, LabelScorer, ScorerLoader};
use crate::checkers::CheckerError;
use crate::ingest::CanonicalImage;

/// Two-phase scorer: construction is cheap, the backend is loaded once on [`warm_up`]
/// or on the first call to `scores`.
///
/// Loading happens under a mutex so concurrent first calls never load twice. Inference
/// runs on a cloned `Arc` outside the lock. A failed load is not cached.
///
/// [`warm_up`]: LazyScorer::warm_up
pub struct LazyScorer {
    loader: Box<dyn ScorerLoader>,
    slot: Mutex<Option<Arc<dyn LabelScorer>>>,
}

impl LazyScorer {
    pub fn new(loader: impl ScorerLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            slot: Mutex::new(None),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.slot.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }

    pub fn warm_up(&self) -> Result<(), CheckerError> {
        self.acquire().map(|_| ())
    }

    pub fn describe(&self) -> String {
        self.loader.describe()
    }

    fn acquire(&self) -> Result<Arc<dyn LabelScorer>, CheckerError> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| CheckerError::ModelLoad("scorer lock poisoned".to_string()))?;

        if let Some(scorer) = slot.as_ref() {
            return Ok(scorer.clone());
        }

        log::info!("Loading {}", self.loader.describe());
        let scorer = self.loader.load().inspect_err(|e| {
            log::error!("Failed to load {}: {}", self.loader.describe(), e);
        })?;
        log::info!("{} loaded successfully", self.loader.describe());

        *slot = Some(scorer.clone());
        Ok(scorer)
    }
}

impl LabelScorer for LazyScorer {
    fn scores(&self, image: &CanonicalImage) -> Result<Vec<LabelScore>, CheckerError> {
        self.acquire()?.scores(image)
    }
}
