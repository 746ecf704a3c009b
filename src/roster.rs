//! Ordered model roster walked forward on rate limits.

pub(crate) const NO_ROSTER_REASON: &str = "no model roster configured";
const EXHAUSTED_REASON: &str = "all models exhausted";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advancement {
    Switched { model: String },
    NotSwitched { reason: String },
}

impl Advancement {
    pub fn switched(&self) -> bool {
        matches!(self, Self::Switched { .. })
    }
}

/// The cursor always indexes a valid entry unless the roster is empty. It only
/// moves forward, so a skipped model is never retried by the same roster.
#[derive(Debug, Clone, Default)]
pub struct ModelRoster {
    models: Vec<String>,
    cursor: usize,
}

impl ModelRoster {
    pub fn new<I, S>(models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            models: models.into_iter().map(Into::into).collect(),
            cursor: 0,
        }
    }

    pub fn active(&self) -> Option<&str> {
        self.models.get(self.cursor).map(String::as_str)
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn advance(&mut self) -> Advancement {
        if self.models.is_empty() {
            return Advancement::NotSwitched {
                reason: NO_ROSTER_REASON.to_string(),
            };
        }

        let next = self.cursor + 1;
        if next >= self.models.len() {
            return Advancement::NotSwitched {
                reason: EXHAUSTED_REASON.to_string(),
            };
        }

        self.cursor = next;
        Advancement::Switched {
            model: self.models[next].clone(),
        }
    }
}
