use crate::error::ValidationError;
use crate::export::Exporter;
use crate::import::{record_to_quote, sanitize_record};
use crate::merge::{reconcile, MergePolicy, MergeReport};
use crate::models::{default_quotes, CategoryFilter, Quote};
use crate::storage::{Storage, FILTER_KEY, LAST_VIEWED_KEY, QUOTES_KEY};
use crate::{Error, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Owns the quote collection and mediates every read and write against it
///
/// Each public method is a whole read-modify-write of the collection, and
/// the `&mut self` receivers keep two of them from ever interleaving.
pub struct QuoteStore {
    quotes: Vec<Quote>,
    storage: Arc<dyn Storage>,
    session: Arc<dyn Storage>,
    policy: MergePolicy,
}

impl QuoteStore {
    /// Open the store and load whatever the persistent storage holds
    pub fn open(storage: Arc<dyn Storage>, session: Arc<dyn Storage>) -> Self {
        let quotes = load_quotes(storage.as_ref());
        Self {
            quotes,
            storage,
            session,
            policy: MergePolicy::default(),
        }
    }

    /// A store with an empty collection, ignoring whatever storage holds.
    /// The first mutation overwrites the persisted collection.
    pub fn empty(storage: Arc<dyn Storage>, session: Arc<dyn Storage>) -> Self {
        Self {
            quotes: Vec::new(),
            storage,
            session,
            policy: MergePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: MergePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> MergePolicy {
        self.policy
    }

    /// Re-read the collection from storage, discarding in-memory state
    pub fn load(&mut self) -> &[Quote] {
        self.quotes = load_quotes(self.storage.as_ref());
        &self.quotes
    }

    /// Persist the collection. Storage failures are logged, never raised.
    pub fn save(&self) {
        let serialized = match serde_json::to_string(&self.quotes) {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to serialize quotes: {}", e);
                return;
            }
        };

        if let Err(e) = self.storage.set(QUOTES_KEY, &serialized) {
            warn!("Failed to save quotes: {}", e);
        } else {
            debug!("Saved {} quotes", self.quotes.len());
        }
    }

    pub fn quotes(&self) -> &[Quote] {
        &self.quotes
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Add a single quote typed in by the user
    pub fn add(&mut self, text: &str, category: &str) -> Result<Quote> {
        let text = text.trim();
        let category = category.trim();

        if text.is_empty() {
            return Err(ValidationError::EmptyText.into());
        }
        if category.is_empty() {
            return Err(ValidationError::EmptyCategory.into());
        }

        let quote = Quote::new(text, category);
        if self.quotes.iter().any(|q| q.duplicates(&quote)) {
            return Err(ValidationError::Duplicate(category.to_string()).into());
        }

        self.quotes.push(quote.clone());
        self.save();
        info!("Added quote in '{}'", quote.category);
        Ok(quote)
    }

    /// Append the schema-valid records that aren't already present.
    /// Returns how many were appended.
    pub fn import(&mut self, raw_records: &[Value]) -> Result<usize> {
        let candidates: Vec<Quote> = raw_records.iter().filter_map(sanitize_record).collect();

        if candidates.is_empty() {
            return Err(Error::NoValidRecords);
        }

        let mut added = 0;
        for quote in candidates {
            if !self.quotes.iter().any(|q| q.duplicates(&quote)) {
                self.quotes.push(quote);
                added += 1;
            }
        }

        if added > 0 {
            self.save();
        }
        info!(
            "Imported {} of {} records",
            added,
            raw_records.len()
        );
        Ok(added)
    }

    /// Import from a JSON document holding an array of quote records
    pub fn import_json(&mut self, document: &str) -> Result<usize> {
        let parsed: Value = serde_json::from_str(document)
            .map_err(|e| Error::ImportUnreadable(format!("invalid JSON: {}", e)))?;

        match parsed {
            Value::Array(records) => self.import(&records),
            _ => Err(Error::ImportUnreadable("expected a JSON array of quotes".into())),
        }
    }

    pub fn import_file<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        self.import_json(&contents)
    }

    /// The collection as a JSON document `import_json` accepts
    pub fn export_json(&self) -> Result<String> {
        Exporter::to_json(&self.quotes)
    }

    /// Fold a freshly fetched remote batch into the collection and persist
    pub fn reconcile(&mut self, remote: &[Quote]) -> MergeReport {
        let (merged, report) = reconcile(self.policy, &self.quotes, remote);
        self.quotes = merged;
        self.save();
        debug!("Reconciled under {}: {:?}", self.policy, report);
        report
    }

    /// Unique categories, sorted
    pub fn categories(&self) -> Vec<String> {
        self.quotes
            .iter()
            .map(|q| q.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.quotes.iter().any(|q| q.category == category)
    }

    /// The display pool for a filter
    pub fn filtered(&self, filter: &CategoryFilter) -> Vec<&Quote> {
        self.quotes.iter().filter(|q| filter.matches(q)).collect()
    }

    /// The persisted filter. Anything stale or unreadable reads as `All`.
    pub fn selected_filter(&self) -> CategoryFilter {
        let stored = match self.storage.get(FILTER_KEY) {
            Ok(Some(value)) => value,
            Ok(None) => return CategoryFilter::All,
            Err(e) => {
                warn!("Failed to read category filter: {}", e);
                return CategoryFilter::All;
            }
        };

        match stored.parse::<CategoryFilter>() {
            Ok(CategoryFilter::Category(category)) if self.has_category(&category) => {
                CategoryFilter::Category(category)
            }
            _ => CategoryFilter::All,
        }
    }

    pub fn set_filter(&mut self, filter: CategoryFilter) -> Result<()> {
        if let CategoryFilter::Category(category) = &filter {
            if !self.has_category(category) {
                return Err(ValidationError::UnknownCategory(category.clone()).into());
            }
        }

        if let Err(e) = self.storage.set(FILTER_KEY, filter.as_str()) {
            warn!("Failed to save category filter: {}", e);
        }
        Ok(())
    }

    /// Pick a random quote from the filter's pool. `None` means no quotes
    /// match; the pick never falls back to the full collection.
    pub fn random_quote<R: Rng + ?Sized>(
        &self,
        filter: &CategoryFilter,
        rng: &mut R,
    ) -> Option<Quote> {
        let pool = self.filtered(filter);
        let quote = (*pool.choose(rng)?).clone();

        match serde_json::to_string(&quote) {
            Ok(json) => {
                if let Err(e) = self.session.set(LAST_VIEWED_KEY, &json) {
                    warn!("Failed to remember last viewed quote: {}", e);
                }
            }
            Err(e) => warn!("Failed to serialize last viewed quote: {}", e),
        }

        Some(quote)
    }

    /// The last quote shown in this session, if any
    pub fn last_viewed(&self) -> Option<Quote> {
        let json = self.session.get(LAST_VIEWED_KEY).ok().flatten()?;
        let value: Value = serde_json::from_str(&json).ok()?;
        record_to_quote(&value)
    }
}

/// Read the collection from storage, degrading to the seed set on any
/// problem: missing key, bad JSON, an element failing the schema check, or
/// an empty list.
pub fn load_quotes(storage: &dyn Storage) -> Vec<Quote> {
    let raw = match storage.get(QUOTES_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!("No stored quotes, starting from defaults");
            return default_quotes();
        }
        Err(e) => {
            warn!("Quote storage unavailable, using defaults: {}", e);
            return default_quotes();
        }
    };

    let records: Vec<Value> = match serde_json::from_str(&raw) {
        Ok(records) => records,
        Err(e) => {
            warn!("Stored quotes are corrupt, using defaults: {}", e);
            return default_quotes();
        }
    };

    let quotes: Option<Vec<Quote>> = records.iter().map(record_to_quote).collect();
    match quotes {
        Some(quotes) if !quotes.is_empty() => quotes,
        Some(_) => default_quotes(),
        None => {
            warn!("Stored quotes failed the schema check, using defaults");
            default_quotes()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    fn memory() -> Arc<dyn Storage> {
        Arc::new(MemoryStorage::new())
    }

    fn store_with(quotes: &[Quote]) -> (QuoteStore, Arc<dyn Storage>) {
        let storage = memory();
        storage
            .set(QUOTES_KEY, &serde_json::to_string(quotes).unwrap())
            .unwrap();
        (QuoteStore::open(storage.clone(), memory()), storage)
    }

    #[test]
    fn test_load_defaults_when_empty() {
        let store = QuoteStore::open(memory(), memory());
        assert_eq!(store.quotes(), default_quotes().as_slice());
    }

    #[test]
    fn test_load_defaults_on_corrupt_json() {
        let storage = memory();
        storage.set(QUOTES_KEY, "{not json").unwrap();
        let store = QuoteStore::open(storage, memory());
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_load_defaults_on_schema_failure() {
        let storage = memory();
        storage
            .set(QUOTES_KEY, r#"[{"text":"A","category":"x"},{"text":"B"}]"#)
            .unwrap();
        let store = QuoteStore::open(storage, memory());
        assert_eq!(store.quotes(), default_quotes().as_slice());
    }

    #[test]
    fn test_load_keeps_valid_data() {
        let (store, _) = store_with(&[Quote::new("A", "x"), Quote::remote(3, "B", "Server")]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.quotes()[1].id, Some(3));
    }

    #[test]
    fn test_load_discards_unsaved_state() {
        let (mut store, storage) = store_with(&[Quote::new("A", "x")]);
        storage
            .set(QUOTES_KEY, r#"[{"text":"B","category":"y"}]"#)
            .unwrap();

        assert_eq!(store.load(), &[Quote::new("B", "y")]);
    }

    #[test]
    fn test_export_json_reimports() {
        let (store, _) = store_with(&[Quote::new("A", "x"), Quote::remote(2, "B", "Server")]);
        let json = store.export_json().unwrap();

        let mut target = QuoteStore::empty(memory(), memory());
        assert_eq!(target.import_json(&json).unwrap(), 2);
        assert_eq!(target.quotes(), store.quotes());
    }

    #[test]
    fn test_add_persists() {
        let (mut store, storage) = store_with(&[Quote::new("A", "x")]);
        let added = store.add("  New one ", " Life ").unwrap();
        assert_eq!(added, Quote::new("New one", "Life"));

        let reloaded = load_quotes(storage.as_ref());
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.contains(&Quote::new("New one", "Life")));
    }

    #[test]
    fn test_add_rejects_blank_fields() {
        let (mut store, _) = store_with(&[Quote::new("A", "x")]);

        let err = store.add("   ", "Life").unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::EmptyText)));

        let err = store.add("Text", "").unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::EmptyCategory)));

        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_add_rejects_duplicate() {
        let (mut store, _) = store_with(&[Quote::new("A", "x")]);
        let err = store.add("A", "x").unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::Duplicate(_))));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_import_appends_new_records_in_order() {
        let (mut store, storage) = store_with(&[Quote::new("A", "x")]);
        let records = vec![
            json!({"text": "B", "category": "y"}),
            json!({"text": "bad"}),
            json!({"text": " C ", "category": "z"}),
            json!({"text": "B", "category": "y"}),
        ];

        assert_eq!(store.import(&records).unwrap(), 2);
        let texts: Vec<_> = store.quotes().iter().map(|q| q.text.as_str()).collect();
        assert_eq!(texts, vec!["A", "B", "C"]);
        assert_eq!(load_quotes(storage.as_ref()).len(), 3);
    }

    #[test]
    fn test_import_only_duplicates_reports_zero() {
        let (mut store, _) = store_with(&[Quote::new("A", "x")]);
        let count = store.import(&[json!({"text": "A", "category": "x"})]).unwrap();
        assert_eq!(count, 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_import_no_valid_records() {
        let (mut store, _) = store_with(&[Quote::new("A", "x")]);
        let err = store.import(&[json!({"title": "nope"})]).unwrap_err();
        assert!(matches!(err, Error::NoValidRecords));
    }

    #[test]
    fn test_import_json_unreadable() {
        let (mut store, _) = store_with(&[Quote::new("A", "x")]);
        assert!(matches!(
            store.import_json("not json"),
            Err(Error::ImportUnreadable(_))
        ));
        assert!(matches!(
            store.import_json(r#"{"text":"A","category":"x"}"#),
            Err(Error::ImportUnreadable(_))
        ));
    }

    #[test]
    fn test_import_skips_known_remote_id() {
        let (mut store, _) = store_with(&[Quote::remote(1, "A", "Server")]);
        let count = store
            .import(&[json!({"text": "A edited", "category": "Server", "id": 1})])
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_import_keeps_remote_records_sharing_text() {
        let (mut store, _) = store_with(&[Quote::new("A", "Server")]);
        let records = vec![
            json!({"text": "A", "category": "Server", "id": 1}),
            json!({"text": "A", "category": "Server", "id": 2}),
            json!({"text": "A", "category": "Server"}),
        ];

        assert_eq!(store.import(&records).unwrap(), 2);
        assert_eq!(
            store.quotes(),
            &[
                Quote::new("A", "Server"),
                Quote::remote(1, "A", "Server"),
                Quote::remote(2, "A", "Server"),
            ]
        );
    }

    #[test]
    fn test_reconcile_persists() {
        let (mut store, storage) = store_with(&[Quote::new("Mine", "Life")]);
        let report = store.reconcile(&[Quote::remote(1, "R", "Server")]);

        assert_eq!(report.total, 2);
        assert_eq!(store.quotes()[0].id, Some(1));
        assert_eq!(load_quotes(storage.as_ref()), store.quotes().to_vec());
    }

    #[test]
    fn test_categories_sorted_unique() {
        let (store, _) = store_with(&[
            Quote::new("A", "Wisdom"),
            Quote::new("B", "Life"),
            Quote::new("C", "Wisdom"),
        ]);
        assert_eq!(store.categories(), vec!["Life", "Wisdom"]);
    }

    #[test]
    fn test_random_quote_respects_filter() {
        let (store, _) = store_with(&[Quote::new("A", "Life"), Quote::new("B", "Wisdom")]);
        let mut rng = StdRng::seed_from_u64(7);
        let filter = CategoryFilter::Category("Wisdom".into());

        for _ in 0..20 {
            let quote = store.random_quote(&filter, &mut rng).unwrap();
            assert_eq!(quote.category, "Wisdom");
        }
    }

    #[test]
    fn test_random_quote_no_match() {
        let (store, _) = store_with(&[Quote::new("A", "Life")]);
        let mut rng = StdRng::seed_from_u64(7);
        let filter = CategoryFilter::Category("Nope".into());
        assert_eq!(store.random_quote(&filter, &mut rng), None);
        assert_eq!(store.last_viewed(), None);
    }

    #[test]
    fn test_last_viewed_round_trip() {
        let (store, _) = store_with(&[Quote::new("A", "Life")]);
        let mut rng = StdRng::seed_from_u64(1);
        let shown = store.random_quote(&CategoryFilter::All, &mut rng).unwrap();
        assert_eq!(store.last_viewed(), Some(shown));
    }

    #[test]
    fn test_filter_persisted_and_validated() {
        let (mut store, storage) = store_with(&[Quote::new("A", "Life")]);
        assert_eq!(store.selected_filter(), CategoryFilter::All);

        store.set_filter(CategoryFilter::Category("Life".into())).unwrap();
        assert_eq!(storage.get(FILTER_KEY).unwrap(), Some("Life".to_string()));
        assert_eq!(store.selected_filter(), CategoryFilter::Category("Life".into()));

        let err = store
            .set_filter(CategoryFilter::Category("Nope".into()))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::UnknownCategory(_))));
    }

    #[test]
    fn test_stale_filter_reads_as_all() {
        let (store, storage) = store_with(&[Quote::new("A", "Life")]);
        storage.set(FILTER_KEY, "Gone").unwrap();
        assert_eq!(store.selected_filter(), CategoryFilter::All);
    }
}
