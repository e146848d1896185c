use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::account::Address;

/// Append-only history of reward reasons, per account.
///
/// Entries are never removed or rewritten. Growth is unbounded; readers that
/// need bounded responses use [`AchievementLog::page_of`].
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AchievementLog {
    entries: BTreeMap<Address, Vec<String>>,
}

impl AchievementLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, account: Address, reason: impl Into<String>) {
        self.entries.entry(account).or_default().push(reason.into());
    }

    /// Oldest first.
    pub fn list_of(&self, account: &Address) -> &[String] {
        self.entries.get(account).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn page_of(&self, account: &Address, offset: usize, limit: usize) -> &[String] {
        let all = self.list_of(account);
        let start = offset.min(all.len());
        let end = start.saturating_add(limit).min(all.len());
        &all[start..end]
    }

    pub fn count_of(&self, account: &Address) -> usize {
        self.list_of(account).len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Address, &[String])> {
        self.entries
            .iter()
            .map(|(account, reasons)| (account, reasons.as_slice()))
    }
}
