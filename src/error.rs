// Domain error taxonomy shared by the refresh pipeline and the HTTP layer

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// The two upstream data sources a refresh depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upstream {
    Countries,
    Rates,
}

impl Upstream {
    /// Public identifier reported to API callers when the source is down.
    pub fn label(self) -> &'static str {
        match self {
            Upstream::Countries => "restcountries.com",
            Upstream::Rates => "open.er-api.com",
        }
    }
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Failure to obtain a dataset from an upstream source. Never retried.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("could not fetch data from {upstream}: {reason}")]
    Unavailable { upstream: Upstream, reason: String },
}

impl UpstreamError {
    pub fn unavailable(upstream: Upstream, reason: impl fmt::Display) -> Self {
        UpstreamError::Unavailable {
            upstream,
            reason: reason.to_string(),
        }
    }

    pub fn upstream(&self) -> Upstream {
        match self {
            UpstreamError::Unavailable { upstream, .. } => *upstream,
        }
    }
}

/// Field-level validation failure for a record about to be written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("validation failed: {fields:?}")]
pub struct ValidationError {
    pub fields: BTreeMap<&'static str, String>,
}

impl ValidationError {
    pub fn field(name: &'static str, message: impl Into<String>) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(name, message.into());
        Self { fields }
    }

    pub fn push(&mut self, name: &'static str, message: impl Into<String>) {
        self.fields.insert(name, message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
