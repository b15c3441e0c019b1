//! Shareable metadata for `babeltest_core::lang` registries.
//!
//! Each vocabulary (error kinds, expectation kinds, lifecycle modes, type hints) is a `const`
//! table of [`LangItemInfo`] entries. This module holds the small metadata shape they share and
//! the lookup helpers built on it.
//!
//! ## Notes
//! - Entries are `Copy` so registries can live in `const` tables.
//! - Matching is case-sensitive on canonical spellings and aliases.

/// Shared metadata shape for registry items.
///
/// - stable identity (`id`)
/// - accepted spellings (`canonical` + `aliases`)
/// - documentation (`description`)
#[derive(Debug, Clone, Copy)]
pub struct LangItemInfo<Id> {
    pub id: Id,
    pub canonical: &'static str,
    pub aliases: &'static [&'static str],
    pub description: &'static str,
}

impl<Id: Copy + PartialEq> LangItemInfo<Id> {
    /// Whether `name` is the canonical spelling or one of the aliases.
    pub fn accepts(&self, name: &str) -> bool {
        self.canonical == name || self.aliases.contains(&name)
    }
}

/// Resolve a spelling against a registry table (canonical spellings win over aliases).
pub fn lookup<Id: Copy + PartialEq>(table: &'static [LangItemInfo<Id>], name: &str) -> Option<Id> {
    if let Some(item) = table.iter().find(|item| item.canonical == name) {
        return Some(item.id);
    }
    table.iter().find(|item| item.aliases.contains(&name)).map(|item| item.id)
}

/// Return the metadata entry for `id`.
///
/// ## Panics
/// - If the registry is missing an entry for `id` (programming error).
pub fn entry<Id: Copy + PartialEq + std::fmt::Debug>(
    table: &'static [LangItemInfo<Id>],
    id: Id,
) -> &'static LangItemInfo<Id> {
    table
        .iter()
        .find(|item| item.id == id)
        .unwrap_or_else(|| panic!("INVARIANT: registry entry missing for {id:?}"))
}

/// Render every accepted spelling of a table as `a|b|c` (canonical spellings only).
pub fn spellings<Id>(table: &'static [LangItemInfo<Id>]) -> String {
    table.iter().map(|item| item.canonical).collect::<Vec<_>>().join("|")
}

pub(crate) const fn item<Id>(
    id: Id,
    canonical: &'static str,
    aliases: &'static [&'static str],
    description: &'static str,
) -> LangItemInfo<Id> {
    LangItemInfo {
        id,
        canonical,
        aliases,
        description,
    }
}
