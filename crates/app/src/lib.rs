//! Caller-owned bill session: one in-progress collection, the rules that tag
//! it and the progress file it is saved to.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use tally_core::{
    merge_suggested_rules, sorted_by_time_desc, Bill, BillStats, Bills, Categories,
    ImportSettings, Rule, SettingsError, TagAssignment,
};
use tally_import::{ImportError, ImportWarning, Provider, RuleEngine};
use tally_storage::{BillStore, CategoryStore, RuleStore, StoreError};

/// Matched-rule descriptor for tags supplied from outside the rule engine.
pub const ASSIGNED_TAG_SOURCE: &str = "AI 打标";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("Cannot read settings {path}: {source}")]
    SettingsIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Layout of the data directory.
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn bills(&self) -> BillStore {
        BillStore::new(self.root.join("bills.process"))
    }

    pub fn rules(&self) -> RuleStore {
        RuleStore::new(self.root.join("rules.json"))
    }

    pub fn categories(&self) -> CategoryStore {
        CategoryStore::new(self.root.join("categories.json"))
    }

    pub fn settings_path(&self) -> PathBuf {
        self.root.join("settings.toml")
    }

    /// `settings.toml` overlaid on the defaults; defaults alone when absent.
    pub fn load_settings(&self) -> Result<ImportSettings, SessionError> {
        let path = self.settings_path();
        match fs::read_to_string(&path) {
            Ok(text) => Ok(ImportSettings::from_toml(&text)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(ImportSettings::default()),
            Err(source) => Err(SessionError::SettingsIo { path, source }),
        }
    }

    pub fn load_categories(&self) -> Result<Categories, SessionError> {
        Ok(self.categories().load()?)
    }
}

pub struct Session {
    settings: ImportSettings,
    rules: Vec<Rule>,
    bills: Bills,
    store: BillStore,
}

impl Session {
    pub fn new(settings: ImportSettings, rules: Vec<Rule>, store: BillStore) -> Self {
        Self {
            settings,
            rules,
            bills: Bills::new(),
            store,
        }
    }

    /// Loads settings and rules from `dir` and restores saved progress.
    pub fn open(dir: &DataDir) -> Result<Self, SessionError> {
        let settings = dir.load_settings()?;
        let rules = dir.rules().load()?;
        let mut session = Session::new(settings, rules, dir.bills());
        session.restore()?;
        Ok(session)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn set_rules(&mut self, rules: Vec<Rule>) {
        self.rules = rules;
    }

    /// Folds suggested rules into the current list; see
    /// [`merge_suggested_rules`].
    pub fn merge_rules(&mut self, suggested: Vec<Rule>) {
        merge_suggested_rules(&mut self.rules, suggested);
    }

    pub fn bills(&self) -> &Bills {
        &self.bills
    }

    pub fn sorted_bills(&self) -> Vec<(&String, &Bill)> {
        sorted_by_time_desc(&self.bills)
    }

    pub fn replace_bills(&mut self, bills: Bills) {
        self.bills = bills;
    }

    /// Imports a statement file, replacing the current collection.
    pub fn import(
        &mut self,
        path: &Path,
        provider: Provider,
    ) -> Result<Vec<ImportWarning>, SessionError> {
        let outcome =
            tally_import::process_statement(path, provider, &self.rules, &self.settings)?;
        self.bills = outcome.bills;
        Ok(outcome.warnings)
    }

    pub fn import_bytes(
        &mut self,
        bytes: &[u8],
        provider: Provider,
    ) -> Result<Vec<ImportWarning>, SessionError> {
        let outcome = tally_import::process_bytes(bytes, provider, &self.rules, &self.settings)?;
        self.bills = outcome.bills;
        Ok(outcome.warnings)
    }

    /// Re-runs the rules over uncategorized bills. Returns the number tagged.
    pub fn auto_tag(&mut self) -> usize {
        let engine = RuleEngine::new(self.rules.clone(), self.settings.tagging.clone());
        for warning in engine.invalid_patterns() {
            tracing::warn!("{warning}");
        }
        engine.apply(&mut self.bills)
    }

    /// Applies externally decided tags by id; unknown ids are ignored.
    /// Returns how many bills were updated.
    pub fn apply_tags(&mut self, assignments: &[TagAssignment]) -> usize {
        let mut applied = 0;
        for assignment in assignments {
            match self.bills.get_mut(&assignment.id) {
                Some(bill) => {
                    bill.assign(assignment, ASSIGNED_TAG_SOURCE);
                    applied += 1;
                }
                None => tracing::debug!("no bill {} to tag", assignment.id),
            }
        }
        applied
    }

    pub fn stats(&self) -> BillStats {
        BillStats::from_bills(&self.bills, &self.settings.tagging.no_sub_tag)
    }

    pub fn persist(&self) -> Result<(), SessionError> {
        self.store.save(&self.bills)?;
        Ok(())
    }

    /// Replaces the collection with saved progress. Returns `false` when
    /// there is none.
    pub fn restore(&mut self) -> Result<bool, SessionError> {
        match self.store.load()? {
            Some(bills) => {
                self.bills = bills;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Drops the collection and the progress file.
    pub fn clear(&mut self) -> Result<(), SessionError> {
        self.bills.clear();
        self.store.clear()?;
        Ok(())
    }
}
