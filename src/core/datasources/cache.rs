use std::collections::HashMap;
use tracing::debug;

use crate::models::TableSchema;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchemaCacheStats {
    pub writes: u64,
    pub stale_writes: u64,
    pub resets: u64,
}

/// Table name -> last fetched schema, valid for one connection generation.
///
/// Every reset bumps the generation. Writers pass the generation they read
/// before going to the network, and a write from an older generation is dropped.
#[derive(Debug, Default)]
pub struct SchemaCache {
    entries: HashMap<String, TableSchema>,
    generation: u64,
    stats: SchemaCacheStats,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Drops every entry and starts a new generation.
    pub fn reset(&mut self) -> u64 {
        self.entries.clear();
        self.generation += 1;
        self.stats.resets += 1;
        self.generation
    }

    /// Stores `schema` under the table name the caller asked for, whatever
    /// name the backend echoed. Last write wins within a generation.
    /// Returns false when `generation` is stale.
    pub fn insert(&mut self, generation: u64, table: &str, schema: TableSchema) -> bool {
        if generation != self.generation {
            debug!(
                "Discarding schema for {} from generation {} (current {})",
                table, generation, self.generation
            );
            self.stats.stale_writes += 1;
            return false;
        }
        self.stats.writes += 1;
        self.entries.insert(table.to_string(), schema);
        true
    }

    pub fn get(&self, table: &str) -> Option<&TableSchema> {
        self.entries.get(table)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_map(&self) -> HashMap<String, TableSchema> {
        self.entries.clone()
    }

    pub fn stats(&self) -> SchemaCacheStats {
        self.stats
    }
}
