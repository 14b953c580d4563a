use std::sync::Arc;

use crate::evaluation::FlagEvaluator;
use crate::rules::JsonLogic;
use crate::store::{CircuitBreakerStore, FlagSource};

pub type Evaluator = FlagEvaluator<CircuitBreakerStore<FlagSource>, JsonLogic>;

#[derive(Clone)]
pub struct AppState {
    pub evaluator: Arc<Evaluator>,
    /// Argon2 hash of the SDK key; `None` leaves the API open.
    pub sdk_key_hash: Option<Arc<str>>,
}

impl AppState {
    pub fn new(evaluator: Evaluator, sdk_key_hash: Option<String>) -> Self {
        Self {
            evaluator: Arc::new(evaluator),
            sdk_key_hash: sdk_key_hash.map(Arc::from),
        }
    }
}
