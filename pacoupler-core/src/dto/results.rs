//! PA API list envelope

use serde::{Deserialize, Serialize};

/// A page of results from a PA list endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsPage<T> {
    pub results: Vec<T>,
}

impl<T> ResultsPage<T> {
    pub fn into_results(self) -> Vec<T> {
        self.results
    }
}
