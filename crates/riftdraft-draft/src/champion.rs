// Champion references and the read-only catalog they come from.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// A champion as seen by the draft: stable id plus display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChampionRef {
    /// Stable identifier (Data Dragon `id`, e.g. "MonkeyKing").
    pub id: String,
    /// Display name (e.g. "Wukong").
    pub name: String,
}

impl ChampionRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        ChampionRef {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// The universe of draftable champions, sorted by display name.
#[derive(Debug, Clone, Default)]
pub struct ChampionCatalog {
    champions: Vec<ChampionRef>,
}

/// `champion.json` shape: `{ "data": { "<key>": { "id": ..., "name": ... } } }`.
#[derive(Debug, Deserialize)]
struct DataDragonFile {
    data: HashMap<String, DataDragonChampion>,
}

#[derive(Debug, Deserialize)]
struct DataDragonChampion {
    id: String,
    name: String,
}

impl ChampionCatalog {
    /// The first entry wins when several share an id.
    pub fn new(mut champions: Vec<ChampionRef>) -> Self {
        let mut seen = HashSet::new();
        champions.retain(|c| seen.insert(c.id.clone()));
        champions.sort_by(|a, b| a.name.cmp(&b.name));
        ChampionCatalog { champions }
    }

    /// Build a catalog from champion names alone, using the name as id.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            names
                .into_iter()
                .map(|n| {
                    let name = n.into();
                    ChampionRef::new(name.clone(), name)
                })
                .collect(),
        )
    }

    /// Parse a Data Dragon `champion.json` document.
    pub fn from_data_dragon(json: &str) -> Result<Self, serde_json::Error> {
        let file: DataDragonFile = serde_json::from_str(json)?;
        Ok(Self::new(
            file.data
                .into_values()
                .map(|c| ChampionRef::new(c.id, c.name))
                .collect(),
        ))
    }

    pub fn all(&self) -> &[ChampionRef] {
        &self.champions
    }

    pub fn len(&self) -> usize {
        self.champions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.champions.is_empty()
    }

    pub fn find_by_id(&self, id: &str) -> Option<&ChampionRef> {
        self.champions.iter().find(|c| c.id == id)
    }

    /// Case-insensitive lookup by display name or id.
    pub fn find_by_name(&self, name: &str) -> Option<&ChampionRef> {
        find_by_name(&self.champions, name)
    }
}

/// Case-insensitive lookup in any slice of champions, matching the display
/// name first and the id second.
pub fn find_by_name<'a>(champions: &'a [ChampionRef], name: &str) -> Option<&'a ChampionRef> {
    let wanted = name.trim();
    if wanted.is_empty() {
        return None;
    }
    champions
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(wanted))
        .or_else(|| champions.iter().find(|c| c.id.eq_ignore_ascii_case(wanted)))
}
