//! Item catalog: display name -> slug and vaulted flag

use std::collections::HashMap;

/// Catalog data for one item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Key used by the price API
    pub slug: String,
    /// No longer obtainable through normal drops
    pub vaulted: bool,
}

/// Read-only map from lower-cased display name to entry
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: HashMap<String, CatalogEntry>,
}

impl Catalog {
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, CatalogEntry)>,
        S: AsRef<str>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(name, entry)| (normalize_name(name.as_ref()), entry))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact lookup after case normalization
    pub fn lookup(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.get(&normalize_name(name))
    }

    /// Most similar catalog name, if at least `min_similarity` (0.0 - 1.0)
    pub fn closest(&self, name: &str, min_similarity: f64) -> Option<(&str, f64)> {
        let name = normalize_name(name);
        self.entries
            .keys()
            .map(|key| (key.as_str(), strsim::normalized_levenshtein(&name, key)))
            .filter(|(_, score)| *score >= min_similarity)
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::from_entries([
            (
                "Braton Prime Barrel",
                CatalogEntry {
                    slug: "braton_prime_barrel".to_string(),
                    vaulted: false,
                },
            ),
            (
                "Ash Prime Systems Blueprint",
                CatalogEntry {
                    slug: "ash_prime_systems_blueprint".to_string(),
                    vaulted: true,
                },
            ),
        ])
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let catalog = catalog();

        let entry = catalog.lookup("braton prime BARREL").unwrap();
        assert_eq!(entry.slug, "braton_prime_barrel");
        assert!(catalog.lookup("ash prime systems blueprint").unwrap().vaulted);
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_lookup_miss() {
        assert!(catalog().lookup("braton prime").is_none());
        assert!(Catalog::default().is_empty());
    }

    #[test]
    fn test_closest_suggests_near_miss() {
        let catalog = catalog();

        let (name, score) = catalog.closest("braton prime barre1", 0.8).unwrap();
        assert_eq!(name, "braton prime barrel");
        assert!(score > 0.9);

        assert!(catalog.closest("vulkar", 0.8).is_none());
    }
}
