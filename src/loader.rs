use crate::error::ModelLoadError;
use crate::model::{LoadOptions, ModelSource};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// Lifecycle of the shared model handle.
#[derive(Debug)]
pub enum ModelState<M> {
    /// No load has been attempted yet.
    Uninitialized,
    /// A load is in flight.
    Loading,
    /// The model is loaded and ready for inference.
    Ready(Arc<M>),
    /// The last load attempt failed; the next request retries.
    Failed(String),
}

/// Lightweight view of a [`ModelState`] without the model handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelStatus {
    Uninitialized,
    Loading,
    Ready,
    Failed,
}

impl ModelStatus {
    /// Returns the status as a string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelStatus::Uninitialized => "uninitialized",
            ModelStatus::Loading => "loading",
            ModelStatus::Ready => "ready",
            ModelStatus::Failed => "failed",
        }
    }
}

impl<M> ModelState<M> {
    fn status(&self) -> ModelStatus {
        match self {
            ModelState::Uninitialized => ModelStatus::Uninitialized,
            ModelState::Loading => ModelStatus::Loading,
            ModelState::Ready(_) => ModelStatus::Ready,
            ModelState::Failed(_) => ModelStatus::Failed,
        }
    }
}

/// Lazily loads a model from a [`ModelSource`] and shares the handle.
///
/// The loader is a small state machine guarded by a mutex. The lock is only
/// held for state transitions, never while the model loads, so concurrent
/// callers observe [`ModelStatus::Loading`] and return instead of starting a
/// second load.
pub struct ModelLoader<S: ModelSource> {
    source: S,
    options: LoadOptions,
    state: Mutex<ModelState<S::Model>>,
}

impl<S: ModelSource> ModelLoader<S> {
    /// Creates a loader with the default [`LoadOptions`]. Nothing is loaded yet.
    pub fn new(source: S) -> Self {
        Self::with_options(source, LoadOptions::default())
    }

    pub fn with_options(source: S, options: LoadOptions) -> Self {
        Self {
            source,
            options,
            state: Mutex::new(ModelState::Uninitialized),
        }
    }

    /// Makes sure the model is loaded, loading it if nobody has yet.
    ///
    /// # Returns
    /// * `true` - the model is ready, either already or after this call loaded it
    /// * `false` - the load failed, or another caller is currently loading
    pub fn ensure_model_loaded(&self) -> bool {
        {
            let mut state = self.lock_state();
            match &*state {
                ModelState::Ready(_) => return true,
                ModelState::Loading => {
                    log::debug!("Model load already in progress");
                    return false;
                }
                ModelState::Uninitialized | ModelState::Failed(_) => {
                    *state = ModelState::Loading;
                }
            }
        }

        let mut guard = LoadingGuard {
            state: &self.state,
            armed: true,
        };

        log::info!("Loading model: {}", self.source.model_id());
        let start_time = Instant::now();

        let result = self
            .source
            .load(&self.options)
            .map_err(|e| ModelLoadError::new(self.source.model_id(), e));

        guard.armed = false;
        let mut state = self.lock_state();
        match result {
            Ok(model) => {
                log::info!(
                    "Model loaded in {:.2}s (image longest edge: {}px)",
                    start_time.elapsed().as_secs_f32(),
                    self.options.image_longest_edge
                );
                *state = ModelState::Ready(Arc::new(model));
                true
            }
            Err(e) => {
                log::error!("Error loading model: {e}");
                *state = ModelState::Failed(e.to_string());
                false
            }
        }
    }

    /// Returns the loaded model, if any.
    pub fn model(&self) -> Option<Arc<S::Model>> {
        match &*self.lock_state() {
            ModelState::Ready(model) => Some(model.clone()),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status() == ModelStatus::Ready
    }

    pub fn status(&self) -> ModelStatus {
        self.lock_state().status()
    }

    /// Message of the last failed load, cleared once a load succeeds.
    pub fn last_error(&self) -> Option<String> {
        match &*self.lock_state() {
            ModelState::Failed(reason) => Some(reason.clone()),
            _ => None,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn lock_state(&self) -> MutexGuard<'_, ModelState<S::Model>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Puts the loader back into a retryable state if the source panics mid-load.
struct LoadingGuard<'a, M> {
    state: &'a Mutex<ModelState<M>>,
    armed: bool,
}

impl<M> Drop for LoadingGuard<'_, M> {
    fn drop(&mut self) {
        if self.armed {
            *self.state.lock().unwrap_or_else(PoisonError::into_inner) =
                ModelState::Failed("model load panicked".to_string());
        }
    }
}
