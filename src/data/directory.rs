//! Unit directory: base id -> definition, with a single on-miss refresh from the remote
//! definition service.
//!
//! A directory lives for one top-level operation. The first lookup that misses re-pulls the
//! full definition set and retries once; after that, misses are final for the rest of the
//! directory's life so an unknown base id can never trigger a refresh loop.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::data::unit::{UnitDefinition, UnitDefinitions, UnitKind};
use crate::remote::{DataProvider, RemoteError};
use crate::tables::UnitTableStore;

pub struct UnitDirectory<'a> {
    definitions: HashMap<String, UnitDefinition>,
    source: Option<&'a dyn DataProvider>,
    refreshed: bool,
}

fn index_definitions<'d>(
    definitions: impl IntoIterator<Item = &'d UnitDefinition>,
) -> HashMap<String, UnitDefinition> {
    let mut index = HashMap::new();
    for definition in definitions {
        if index.contains_key(&definition.base_id) {
            warn!(base_id = %definition.base_id, "duplicate unit definition ignored");
            continue;
        }
        index.insert(definition.base_id.clone(), definition.clone());
    }
    index
}

impl<'a> UnitDirectory<'a> {
    pub fn new<'d>(definitions: impl IntoIterator<Item = &'d UnitDefinition>) -> Self {
        UnitDirectory {
            definitions: index_definitions(definitions),
            source: None,
            refreshed: false,
        }
    }

    /// Snapshot built from the definitions column of the local hero and ship tables.
    pub fn from_tables(heroes: &dyn UnitTableStore, ships: &dyn UnitTableStore) -> Self {
        let hero_defs = heroes.definitions();
        let ship_defs = ships.definitions();
        UnitDirectory::new(hero_defs.iter().chain(ship_defs.iter()))
    }

    /// Snapshot built from a full remote pull. The pull counts as this directory's refresh.
    pub fn from_remote(source: &'a dyn DataProvider) -> Result<Self, RemoteError> {
        let definitions = source.fetch_definitions()?;
        Ok(UnitDirectory {
            definitions: index_definitions(definitions.iter()),
            source: Some(source),
            refreshed: true,
        })
    }

    pub fn with_refresh_source(mut self, source: &'a dyn DataProvider) -> Self {
        self.source = Some(source);
        self
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn has_refreshed(&self) -> bool {
        self.refreshed
    }

    pub fn definitions(&self) -> impl Iterator<Item = &UnitDefinition> {
        self.definitions.values()
    }

    /// Split the current snapshot back into heroes and ships, sorted by name.
    pub fn to_definitions(&self) -> UnitDefinitions {
        let mut split = UnitDefinitions::default();
        for definition in self.definitions.values() {
            match definition.kind {
                UnitKind::Hero => split.heroes.push(definition.clone()),
                UnitKind::Ship => split.ships.push(definition.clone()),
            }
        }
        split.heroes.sort_by(|a, b| a.name.cmp(&b.name));
        split.ships.sort_by(|a, b| a.name.cmp(&b.name));
        split
    }

    /// Lookup without any refresh.
    pub fn get(&self, base_id: &str) -> Option<&UnitDefinition> {
        self.definitions.get(base_id)
    }

    /// Re-pull the whole definition set and replace the snapshot in place.
    /// Marks the directory refreshed even when the pull fails.
    pub fn refresh(&mut self) -> Result<usize, RemoteError> {
        self.refreshed = true;
        let source = self
            .source
            .ok_or(RemoteError::NotConfigured("unit definition source"))?;
        let definitions = source.fetch_definitions()?;
        self.definitions = index_definitions(definitions.iter());
        info!(
            provider = source.name(),
            definitions = self.definitions.len(),
            "unit directory refreshed"
        );
        Ok(self.definitions.len())
    }

    /// Resolve a base id, refreshing once on the first miss. `None` means unidentified.
    pub fn lookup(&mut self, base_id: &str) -> Option<&UnitDefinition> {
        if !self.definitions.contains_key(base_id) && !self.refreshed {
            debug!(base_id, "unit definition miss, refreshing directory");
            if let Err(err) = self.refresh() {
                warn!(base_id, error = %err, "unit directory refresh failed");
            }
        }
        let found = self.definitions.get(base_id);
        if found.is_none() {
            debug!(base_id, "unidentified unit");
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::data::player::PlayerData;

    struct CountingSource {
        definitions: UnitDefinitions,
        calls: Cell<usize>,
        fail: bool,
    }

    impl CountingSource {
        fn with_heroes(heroes: Vec<UnitDefinition>) -> Self {
            CountingSource {
                definitions: UnitDefinitions {
                    heroes,
                    ships: Vec::new(),
                },
                calls: Cell::new(0),
                fail: false,
            }
        }
    }

    impl DataProvider for CountingSource {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn fetch_player(&self, _ally_code: u64) -> Result<PlayerData, RemoteError> {
            Err(RemoteError::NotConfigured("players"))
        }

        fn fetch_definitions(&self) -> Result<UnitDefinitions, RemoteError> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(RemoteError::NotConfigured("offline"));
            }
            Ok(self.definitions.clone())
        }
    }

    fn def(base_id: &str, name: &str) -> UnitDefinition {
        UnitDefinition::new(base_id, name, "light side", UnitKind::Hero)
    }

    #[test]
    fn hit_does_not_refresh() {
        let source = CountingSource::with_heroes(vec![def("REY", "Rey")]);
        let local = vec![def("REY", "Rey")];
        let mut directory = UnitDirectory::new(&local).with_refresh_source(&source);

        let first = directory.lookup("REY").cloned();
        let second = directory.lookup("REY").cloned();
        assert_eq!(first, second);
        assert_eq!(first.map(|d| d.name), Some("Rey".to_string()));
        assert_eq!(source.calls.get(), 0);
    }

    #[test]
    fn miss_refreshes_once_then_resolves() {
        let source = CountingSource::with_heroes(vec![def("REY", "Rey"), def("FINN", "Finn")]);
        let local = vec![def("REY", "Rey")];
        let mut directory = UnitDirectory::new(&local).with_refresh_source(&source);

        assert_eq!(directory.lookup("FINN").map(|d| d.name.clone()), Some("Finn".into()));
        assert_eq!(directory.lookup("FINN").map(|d| d.name.clone()), Some("Finn".into()));
        assert_eq!(source.calls.get(), 1);
        assert_eq!(directory.len(), 2);
    }

    #[test]
    fn unknown_base_id_is_unidentified_after_single_refresh() {
        let source = CountingSource::with_heroes(vec![def("REY", "Rey")]);
        let empty: Vec<UnitDefinition> = Vec::new();
        let mut directory = UnitDirectory::new(&empty).with_refresh_source(&source);

        assert!(directory.lookup("NEW_UNIT").is_none());
        assert!(directory.lookup("NEW_UNIT").is_none());
        assert!(directory.lookup("OTHER_UNIT").is_none());
        assert_eq!(source.calls.get(), 1);
        assert!(directory.lookup("REY").is_some());
    }

    #[test]
    fn failed_refresh_keeps_snapshot_and_is_not_retried() {
        let mut source = CountingSource::with_heroes(Vec::new());
        source.fail = true;
        let local = vec![def("REY", "Rey")];
        let mut directory = UnitDirectory::new(&local).with_refresh_source(&source);

        assert!(directory.lookup("FINN").is_none());
        assert!(directory.lookup("FINN").is_none());
        assert_eq!(source.calls.get(), 1);
        assert!(directory.lookup("REY").is_some());
    }

    #[test]
    fn without_source_a_miss_is_simply_unidentified() {
        let local = vec![def("REY", "Rey")];
        let mut directory = UnitDirectory::new(&local);
        assert!(directory.lookup("FINN").is_none());
        assert!(directory.has_refreshed());
    }

    #[test]
    fn first_duplicate_definition_wins() {
        let local = vec![def("REY", "Rey"), def("REY", "Scavenger Rey")];
        let directory = UnitDirectory::new(&local);
        assert_eq!(directory.len(), 1);
        assert_eq!(directory.get("REY").map(|d| d.name.as_str()), Some("Rey"));
    }

    #[test]
    fn remote_snapshot_counts_as_refresh() {
        let source = CountingSource::with_heroes(vec![def("REY", "Rey")]);
        let mut directory = UnitDirectory::from_remote(&source).expect("pull");
        assert!(directory.lookup("MISSING").is_none());
        assert_eq!(source.calls.get(), 1);
        assert_eq!(directory.to_definitions().heroes.len(), 1);
    }
}
