//! Who a snapshot is about: member name first, then ally code against the roster, then the
//! remote provider.

use tracing::debug;

use crate::data::directory::UnitDirectory;
use crate::data::player::PlayerData;
use crate::data::unit::TagFilter;
use crate::roster::assembler::RosterAssembler;
use crate::tables::RosterStore;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotQuery {
    pub member_name: Option<String>,
    pub ally_code: Option<u64>,
}

impl SnapshotQuery {
    pub fn by_name(name: &str) -> Self {
        SnapshotQuery {
            member_name: Some(name.to_string()),
            ally_code: None,
        }
    }

    pub fn by_ally_code(ally_code: u64) -> Self {
        SnapshotQuery {
            member_name: None,
            ally_code: Some(ally_code),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotRoute {
    LocalByName(String),
    LocalByAllyCode { ally_code: u64, member: String },
    Remote(u64),
    NotFound,
}

/// First matching rule wins. A blank name counts as no name.
pub fn route_snapshot(roster: &dyn RosterStore, query: &SnapshotQuery) -> SnapshotRoute {
    let name = query
        .member_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty());

    let route = if let Some(row) = name.and_then(|name| roster.find_by_name(name)) {
        SnapshotRoute::LocalByName(row.name.clone())
    } else if let Some(ally_code) = query.ally_code {
        match roster.find_by_ally_code(ally_code) {
            Some(row) => SnapshotRoute::LocalByAllyCode {
                ally_code,
                member: row.name.clone(),
            },
            None => SnapshotRoute::Remote(ally_code),
        }
    } else {
        SnapshotRoute::NotFound
    };
    debug!(?query, ?route, "snapshot routed");
    route
}

pub fn resolve_snapshot(
    assembler: &RosterAssembler<'_>,
    query: &SnapshotQuery,
    tag_filter: &TagFilter,
    directory: &mut UnitDirectory<'_>,
) -> Option<PlayerData> {
    match route_snapshot(assembler.roster(), query) {
        SnapshotRoute::LocalByName(member) | SnapshotRoute::LocalByAllyCode { member, .. } => {
            assembler.assemble_from_local_tables(&member, tag_filter)
        }
        SnapshotRoute::Remote(ally_code) => {
            assembler.assemble_from_remote(ally_code, tag_filter, directory)
        }
        SnapshotRoute::NotFound => None,
    }
}
