//! Topical categories and their search expansions.
//!
//! A category is a named filter that maps to a broadened full-text query,
//! e.g. `physics` searches for `physics OR physicist OR physical`.  The
//! built-in table can be overridden or extended from the `[categories]`
//! table of the config file, so adding a category never needs a code
//! change.

use std::collections::BTreeMap;

/// The unfiltered feed: random sampling instead of a search.
pub const ALL: &str = "all";

/// `(id, display name, search expansion)` for every built-in category.
const BUILTIN: &[(&str, &str, &str)] = &[
    ("philosophy", "Philosophy", "philosophy OR philosopher OR philosophical"),
    ("physics", "Physics", "physics OR physicist OR physical"),
    ("mathematics", "Mathematics", "mathematics OR mathematician OR mathematical"),
    ("art", "Art", "art OR artist OR artistic"),
    ("history", "History", "history OR historical OR historian"),
    ("science", "Science", "science OR scientist OR scientific"),
    ("technology", "Technology", "technology OR technological OR tech"),
    ("literature", "Literature", "literature OR literary OR author"),
    ("music", "Music", "music OR musician OR musical"),
    ("geography", "Geography", "geography OR geographic OR country"),
    ("biology", "Biology", "biology OR biologist OR biological"),
    ("chemistry", "Chemistry", "chemistry OR chemist OR chemical"),
    ("psychology", "Psychology", "psychology OR psychologist OR psychological"),
    ("economics", "Economics", "economics OR economist OR economic"),
    ("politics", "Politics", "politics OR political OR government"),
    ("sports", "Sports", "sports OR athlete OR athletic"),
    ("medicine", "Medicine", "medicine OR medical OR doctor"),
];

/// One selectable category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: String,
    pub name: String,
    query: String,
}

/// Ordered category list with search expansions.
///
/// `all` is always first and never has an expansion.
#[derive(Debug, Clone)]
pub struct CategoryTable {
    entries: Vec<Category>,
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::with_overrides(&BTreeMap::new())
    }
}

impl CategoryTable {
    /// Built-in table with `overrides` applied.
    ///
    /// An override for a known id replaces its expansion; an unknown id is
    /// appended with a capitalised display name.
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Self {
        let mut entries = vec![Category {
            id: ALL.to_string(),
            name: "All".to_string(),
            query: String::new(),
        }];

        let overrides: BTreeMap<String, &String> = overrides
            .iter()
            .map(|(id, query)| (id.trim().to_lowercase(), query))
            .collect();

        for (id, name, query) in BUILTIN {
            let query = overrides.get(*id).map(|q| q.as_str()).unwrap_or(*query);
            entries.push(Category {
                id: (*id).to_string(),
                name: (*name).to_string(),
                query: query.to_string(),
            });
        }

        for (id, query) in overrides {
            if id.is_empty() || id == ALL || entries.iter().any(|c| c.id == id) {
                continue;
            }
            entries.push(Category {
                name: display_name(&id),
                id,
                query: query.clone(),
            });
        }

        Self { entries }
    }

    pub fn entries(&self) -> &[Category] {
        &self.entries
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|c| c.id == id)
    }

    /// Display name for `id`, or the id itself for unknown categories.
    pub fn name_of<'a>(&'a self, id: &'a str) -> &'a str {
        self.entries
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.as_str())
            .unwrap_or(id)
    }

    /// Search expression for `category`.
    ///
    /// Pure function of the name: unknown categories search for themselves.
    pub fn expand(&self, category: &str) -> String {
        self.entries
            .iter()
            .find(|c| c.id == category && !c.query.is_empty())
            .map(|c| c.query.clone())
            .unwrap_or_else(|| category.to_string())
    }
}

fn display_name(id: &str) -> String {
    let mut chars = id.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn physics_expands_deterministically() {
        let table = CategoryTable::default();
        let first = table.expand("physics");
        assert_eq!(first, "physics OR physicist OR physical");
        assert_eq!(table.expand("physics"), first);
        assert_eq!(CategoryTable::default().expand("physics"), first);
    }

    #[test]
    fn unknown_category_expands_to_itself() {
        let table = CategoryTable::default();
        assert_eq!(table.expand("volcanoes"), "volcanoes");
    }

    #[test]
    fn all_is_first_and_builtins_follow() {
        let table = CategoryTable::default();
        assert_eq!(table.entries()[0].id, ALL);
        assert_eq!(table.entries().len(), BUILTIN.len() + 1);
        assert_eq!(table.position("medicine"), Some(BUILTIN.len()));
    }

    #[test]
    fn overrides_replace_and_extend() {
        let mut overrides = BTreeMap::new();
        overrides.insert("physics".to_string(), "quantum OR relativity".to_string());
        overrides.insert("astronomy".to_string(), "astronomy OR astronomer".to_string());

        let table = CategoryTable::with_overrides(&overrides);
        assert_eq!(table.expand("physics"), "quantum OR relativity");
        assert_eq!(table.expand("astronomy"), "astronomy OR astronomer");
        assert_eq!(table.name_of("astronomy"), "Astronomy");
        assert_eq!(table.entries().last().map(|c| c.id.as_str()), Some("astronomy"));
    }

    #[test]
    fn override_keys_are_case_insensitive() {
        let mut overrides = BTreeMap::new();
        overrides.insert("Physics".to_string(), "quantum OR relativity".to_string());
        overrides.insert(" Astronomy ".to_string(), "astronomy".to_string());

        let table = CategoryTable::with_overrides(&overrides);
        assert_eq!(table.expand("physics"), "quantum OR relativity");
        assert_eq!(table.position("astronomy"), Some(BUILTIN.len() + 1));
        assert_eq!(table.entries().len(), BUILTIN.len() + 2);
    }

    #[test]
    fn override_cannot_redefine_all() {
        let mut overrides = BTreeMap::new();
        overrides.insert("all".to_string(), "everything".to_string());
        let table = CategoryTable::with_overrides(&overrides);
        assert_eq!(table.entries().len(), BUILTIN.len() + 1);
        assert_eq!(table.expand(ALL), ALL);
    }
}
