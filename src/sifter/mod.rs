//! # Sifter
//!
//! Chutes route inbound log and data documents into distilleries. Each
//! enabled chute whose sieve accepts a document saves it into the chute's
//! distillery; when none did, the configured default distillery catches it.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ChuteDefaults;
use crate::distilleries::{DistilleryError, DistilleryRegistry};
use crate::documents::DocumentObj;
use crate::sieves::Sieve;

fn enabled_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chute {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// No sieve accepts everything
    #[serde(default)]
    pub sieve: Option<Sieve>,
    pub distillery: String,
    /// Stamped onto documents saved by this chute
    #[serde(default)]
    pub platform: Option<String>,
}

impl Chute {
    pub fn new(distillery: impl Into<String>) -> Self {
        Self {
            name: None,
            enabled: true,
            sieve: None,
            distillery: distillery.into(),
            platform: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_sieve(mut self, sieve: Sieve) -> Self {
        self.sieve = Some(sieve);
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("-> {}", self.distillery),
        }
    }

    pub fn is_match(&self, data: &Value) -> bool {
        self.sieve.as_ref().map_or(true, |sieve| sieve.is_match(data))
    }
}

impl fmt::Display for Chute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Documents saved by one pass through a chute set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SiftOutcome {
    pub saved: Vec<DocumentObj>,
    pub used_default: bool,
}

impl SiftOutcome {
    pub fn is_empty(&self) -> bool {
        self.saved.is_empty()
    }
}

pub struct ChuteSet {
    kind: &'static str,
    chutes: Vec<Chute>,
    defaults: ChuteDefaults,
    distilleries: Arc<DistilleryRegistry>,
}

impl fmt::Debug for ChuteSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChuteSet")
            .field("kind", &self.kind)
            .field("chutes", &self.chutes.len())
            .field("defaults", &self.defaults)
            .finish()
    }
}

impl ChuteSet {
    pub fn new(
        kind: &'static str,
        chutes: Vec<Chute>,
        defaults: ChuteDefaults,
        distilleries: Arc<DistilleryRegistry>,
    ) -> Self {
        Self {
            kind,
            chutes,
            defaults,
            distilleries,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn chutes(&self) -> &[Chute] {
        &self.chutes
    }

    /// Send a document through every enabled chute
    ///
    /// All chutes are attempted; the first save failure is returned after
    /// the others have run.
    pub async fn process(
        &self,
        doc: &DocumentObj,
        now: DateTime<Utc>,
    ) -> Result<SiftOutcome, DistilleryError> {
        let data = doc.to_value();
        let mut outcome = SiftOutcome::default();
        let mut first_error = None;

        for chute in self.chutes.iter().filter(|c| c.enabled) {
            if !chute.is_match(&data) {
                continue;
            }
            let stamped = match &chute.platform {
                Some(platform) => doc.clone().with_platform(platform.clone()),
                None => doc.clone(),
            };
            match self.distilleries.save_data(&chute.distillery, &stamped, now).await {
                Ok(saved) => outcome.saved.push(saved),
                Err(e) => {
                    warn!(kind = self.kind, chute = %chute, document = %doc, error = %e, "Chute failed to save document");
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        if outcome.saved.is_empty() {
            if let Some(fallback) = self.defaults.fallback() {
                debug!(kind = self.kind, distillery = fallback, document = %doc, "No chute matched, using default");
                let saved = self.distilleries.save_data(fallback, doc, now).await?;
                outcome.saved.push(saved);
                outcome.used_default = true;
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distilleries::Distillery;
    use crate::documents::InMemoryDocumentStore;
    use crate::events::EventPublisher;
    use crate::sieves::{FieldRule, Operator, Sieve};
    use serde_json::{json, Map};

    const MAIL: &str = "elasticsearch.test_index.mail";
    const LOGS: &str = "elasticsearch.test_index.logs";
    const DEFAULT: &str = "elasticsearch.test_index.default";

    fn doc(message: &str) -> DocumentObj {
        let mut data = Map::new();
        data.insert("message".to_string(), json!(message));
        DocumentObj::new(data)
    }

    fn set(defaults: ChuteDefaults, store: Arc<InMemoryDocumentStore>) -> ChuteSet {
        let registry = DistilleryRegistry::new(
            [Distillery::new(MAIL), Distillery::new(LOGS), Distillery::new(DEFAULT)],
            store,
            EventPublisher::new(8),
        );
        ChuteSet::new(
            "log",
            vec![
                Chute::new(MAIL)
                    .with_sieve(Sieve::all(vec![FieldRule::new("message", Operator::Contains, json!("mail"))]))
                    .with_platform("postfix"),
                Chute::new(LOGS).with_sieve(Sieve::all(vec![FieldRule::new(
                    "message",
                    Operator::StartsWith,
                    json!("kernel"),
                )])),
                Chute::new(LOGS).with_enabled(false),
            ],
            defaults,
            Arc::new(registry),
        )
    }

    fn fallback() -> ChuteDefaults {
        ChuteDefaults {
            default_distillery: Some(DEFAULT.to_string()),
            default_enabled: true,
        }
    }

    #[tokio::test]
    async fn test_matching_chute_saves() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let outcome = set(fallback(), store.clone())
            .process(&doc("mail delivered"), Utc::now())
            .await
            .unwrap();
        assert_eq!(outcome.saved.len(), 1);
        assert!(!outcome.used_default);
        assert_eq!(store.documents_in(MAIL)[0]["_platform"], "postfix");
        assert!(store.documents_in(DEFAULT).is_empty());
    }

    #[tokio::test]
    async fn test_default_fallback() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let outcome = set(fallback(), store.clone())
            .process(&doc("nothing matches"), Utc::now())
            .await
            .unwrap();
        assert!(outcome.used_default);
        assert_eq!(store.documents_in(DEFAULT).len(), 1);

        let store = Arc::new(InMemoryDocumentStore::new());
        let outcome = set(ChuteDefaults::default(), store.clone())
            .process(&doc("nothing matches"), Utc::now())
            .await
            .unwrap();
        assert!(outcome.is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn test_label() {
        assert_eq!(Chute::new(MAIL).label(), format!("-> {MAIL}"));
        assert_eq!(Chute::new(MAIL).with_name("mail").to_string(), "mail");
    }
}
