use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub const DEFAULT_WEIGHTS: ScoringWeights = ScoringWeights {
    recency: 0.25,
    rating: 0.20,
    completion_recency: 0.15,
    completion_quality: 0.20,
    earnings_balance: 0.10,
    inclusion: 0.10,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightKey {
    Recency,
    Rating,
    CompletionRecency,
    CompletionQuality,
    EarningsBalance,
    Inclusion,
}

impl WeightKey {
    /// Maps an override name onto its canonical weight. Accepts snake_case and
    /// camelCase spellings plus the legacy aliases.
    pub fn resolve(name: &str) -> Option<Self> {
        let folded: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match folded.as_str() {
            "recency" | "lastassignment" | "assignmentrecency" => Some(WeightKey::Recency),
            "rating" | "ratingscore" => Some(WeightKey::Rating),
            "completionrecency" | "lastcompletion" | "recentcompletion" => {
                Some(WeightKey::CompletionRecency)
            }
            "completionquality" | "completionrate" | "quality" => {
                Some(WeightKey::CompletionQuality)
            }
            "earningsbalance" | "earnings" | "valuebalance" | "projectvalue" => {
                Some(WeightKey::EarningsBalance)
            }
            "inclusion" | "newfreelancer" | "newcomer" | "fairness" => Some(WeightKey::Inclusion),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScoringWeights {
    pub recency: f64,
    pub rating: f64,
    pub completion_recency: f64,
    pub completion_quality: f64,
    pub earnings_balance: f64,
    pub inclusion: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        DEFAULT_WEIGHTS
    }
}

impl ScoringWeights {
    pub fn sum(&self) -> f64 {
        self.recency
            + self.rating
            + self.completion_recency
            + self.completion_quality
            + self.earnings_balance
            + self.inclusion
    }

    fn slot_mut(&mut self, key: WeightKey) -> &mut f64 {
        match key {
            WeightKey::Recency => &mut self.recency,
            WeightKey::Rating => &mut self.rating,
            WeightKey::CompletionRecency => &mut self.completion_recency,
            WeightKey::CompletionQuality => &mut self.completion_quality,
            WeightKey::EarningsBalance => &mut self.earnings_balance,
            WeightKey::Inclusion => &mut self.inclusion,
        }
    }

    /// Copies `self` and applies overrides by canonical key. Unknown names, negative
    /// and non-finite values are skipped.
    pub fn merged(&self, overrides: &HashMap<String, f64>) -> Self {
        let mut merged = *self;

        for (name, value) in overrides {
            if !value.is_finite() || *value < 0.0 {
                tracing::debug!(weight = %name, value, "ignoring invalid weight override");
                continue;
            }
            match WeightKey::resolve(name) {
                Some(key) => *merged.slot_mut(key) = *value,
                None => tracing::debug!(weight = %name, "ignoring unknown weight override"),
            }
        }

        merged
    }

    /// Rescales so the weights sum to 1. A zero or non-finite total falls back to the
    /// defaults.
    pub fn normalized(&self) -> Self {
        let total = self.sum();
        if !total.is_finite() || total <= 0.0 {
            return DEFAULT_WEIGHTS.normalized_unchecked();
        }
        self.scaled(1.0 / total)
    }

    fn normalized_unchecked(&self) -> Self {
        self.scaled(1.0 / self.sum())
    }

    fn scaled(&self, factor: f64) -> Self {
        Self {
            recency: self.recency * factor,
            rating: self.rating * factor,
            completion_recency: self.completion_recency * factor,
            completion_quality: self.completion_quality * factor,
            earnings_balance: self.earnings_balance * factor,
            inclusion: self.inclusion * factor,
        }
    }
}

/// Parses `key=value,key=value` pairs, as used by the `SCORING_WEIGHTS` setting.
pub fn parse_overrides(raw: &str) -> Result<HashMap<String, f64>, String> {
    let mut overrides = HashMap::new();

    for pair in raw.split(',').map(str::trim).filter(|pair| !pair.is_empty()) {
        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("expected key=value, got {pair}"))?;
        let name = name.trim();
        if WeightKey::resolve(name).is_none() {
            return Err(format!("unknown weight {name}"));
        }
        let value: f64 = value
            .trim()
            .parse()
            .map_err(|err| format!("invalid weight {name}: {err}"))?;
        overrides.insert(name.to_string(), value);
    }

    Ok(overrides)
}
