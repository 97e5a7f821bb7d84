//! Table-level change notification.

use log::debug;
use std::sync::Arc;
use tokio::sync::watch;

const TABLE_COUNT: usize = 3;

/// Tables observed by reactive queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Notes,
    Categories,
    NoteCategoryLinks,
}

impl Table {
    /// Tables read by queries that join notes through categories.
    pub const NOTE_CATEGORY_JOIN: &'static [Table] =
        &[Table::Notes, Table::Categories, Table::NoteCategoryLinks];

    fn index(self) -> usize {
        match self {
            Self::Notes => 0,
            Self::Categories => 1,
            Self::NoteCategoryLinks => 2,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Notes => "notes",
            Self::Categories => "categories",
            Self::NoteCategoryLinks => "note_category_cross_ref",
        }
    }
}

/// Monotonic write counters, one per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableVersions([u64; TABLE_COUNT]);

impl TableVersions {
    pub fn get(&self, table: Table) -> u64 {
        self.0[table.index()]
    }

    /// Returns whether any of `tables` moved between `self` and `newer`.
    pub fn changed_since(&self, newer: &TableVersions, tables: &[Table]) -> bool {
        tables
            .iter()
            .any(|table| self.get(*table) != newer.get(*table))
    }

    fn bump(&mut self, tables: &[Table]) {
        for table in tables {
            let slot = &mut self.0[table.index()];
            *slot = slot.wrapping_add(1);
        }
    }
}

/// Broadcasts table invalidations to every live query of one store.
///
/// Cloning shares the same channel.
#[derive(Debug, Clone)]
pub struct InvalidationTracker {
    sender: Arc<watch::Sender<TableVersions>>,
}

impl InvalidationTracker {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(TableVersions::default());
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Records a committed write to `tables`.
    pub fn notify(&self, tables: &[Table]) {
        if tables.is_empty() {
            return;
        }
        self.sender.send_modify(|versions| versions.bump(tables));
        debug!(
            "event=tables_invalidated module=live status=ok tables={} observers={}",
            tables
                .iter()
                .map(|table| table.as_str())
                .collect::<Vec<_>>()
                .join(","),
            self.sender.receiver_count()
        );
    }

    pub fn subscribe(&self) -> watch::Receiver<TableVersions> {
        self.sender.subscribe()
    }

    pub fn versions(&self) -> TableVersions {
        *self.sender.borrow()
    }

    /// Number of live receivers; used to spot leaked subscriptions.
    pub fn observer_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for InvalidationTracker {
    fn default() -> Self {
        Self::new()
    }
}
