//! Subject Catalog
//!
//! The themes a player can pick for a round. Entries are immutable; the
//! controller only ever looks them up by id.

use serde::{Deserialize, Serialize};

/// Broad grouping used by surfaces to organise the subject picker
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Natural scenery
    Landscape,
    /// Buildings and structures
    Architecture,
    /// Wildlife
    Animals,
    /// Flowers, trees and other plants
    Plants,
    /// Dishes and drinks
    Food,
}

impl Category {
    /// All categories in display order
    pub const ALL: [Category; 5] = [
        Self::Landscape,
        Self::Architecture,
        Self::Animals,
        Self::Plants,
        Self::Food,
    ];

    /// Human-readable label
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Landscape => "Landscape",
            Self::Architecture => "Architecture",
            Self::Animals => "Animals",
            Self::Plants => "Plants",
            Self::Food => "Food",
        }
    }
}

/// A selectable round theme. Identity is `id`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectEntry {
    /// Stable identifier, also the basis of the image search query
    pub id: String,
    /// Name shown to the player
    pub display_name: String,
    /// Grouping for the picker
    pub category: Category,
}

impl SubjectEntry {
    /// Create a new entry
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, category: Category) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            category,
        }
    }

    /// Search query derived from the id (`cherry_blossom` -> `cherry blossom`)
    #[must_use]
    pub fn search_query(&self) -> String {
        self.id.replace('_', " ")
    }
}

const PRESET: &[(&str, &str, Category)] = &[
    ("mountain", "Mountain", Category::Landscape),
    ("beach", "Beach", Category::Landscape),
    ("forest", "Forest", Category::Landscape),
    ("desert", "Desert", Category::Landscape),
    ("waterfall", "Waterfall", Category::Landscape),
    ("lake", "Lake", Category::Landscape),
    ("glacier", "Glacier", Category::Landscape),
    ("volcano", "Volcano", Category::Landscape),
    ("canyon", "Canyon", Category::Landscape),
    ("island", "Island", Category::Landscape),
    ("skyscraper", "Skyscraper", Category::Architecture),
    ("castle", "Castle", Category::Architecture),
    ("temple", "Temple", Category::Architecture),
    ("bridge", "Bridge", Category::Architecture),
    ("lighthouse", "Lighthouse", Category::Architecture),
    ("church", "Church", Category::Architecture),
    ("museum", "Museum", Category::Architecture),
    ("stadium", "Stadium", Category::Architecture),
    ("palace", "Palace", Category::Architecture),
    ("tower", "Tower", Category::Architecture),
    ("lion", "Lion", Category::Animals),
    ("elephant", "Elephant", Category::Animals),
    ("penguin", "Penguin", Category::Animals),
    ("dolphin", "Dolphin", Category::Animals),
    ("butterfly", "Butterfly", Category::Animals),
    ("owl", "Owl", Category::Animals),
    ("panda", "Panda", Category::Animals),
    ("tiger", "Tiger", Category::Animals),
    ("koala", "Koala", Category::Animals),
    ("peacock", "Peacock", Category::Animals),
    ("cherry_blossom", "Cherry Blossom", Category::Plants),
    ("sunflower", "Sunflower", Category::Plants),
    ("cactus", "Cactus", Category::Plants),
    ("bamboo", "Bamboo", Category::Plants),
    ("lotus", "Lotus", Category::Plants),
    ("lavender", "Lavender", Category::Plants),
    ("maple", "Maple", Category::Plants),
    ("rose", "Rose", Category::Plants),
    ("bonsai", "Bonsai", Category::Plants),
    ("orchid", "Orchid", Category::Plants),
    ("sushi", "Sushi", Category::Food),
    ("pizza", "Pizza", Category::Food),
    ("burger", "Burger", Category::Food),
    ("ice_cream", "Ice Cream", Category::Food),
    ("cake", "Cake", Category::Food),
    ("ramen", "Ramen", Category::Food),
    ("dim_sum", "Dim Sum", Category::Food),
    ("pasta", "Pasta", Category::Food),
    ("chocolate", "Chocolate", Category::Food),
    ("coffee", "Coffee", Category::Food),
];

/// Ordered, id-unique collection of subjects
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Catalog {
    entries: Vec<SubjectEntry>,
}

impl Catalog {
    /// The built-in fifty-subject catalog
    #[must_use]
    pub fn preset() -> Self {
        Self::from_entries(
            PRESET
                .iter()
                .map(|(id, name, category)| SubjectEntry::new(*id, *name, *category)),
        )
    }

    /// Build from arbitrary entries; later duplicates of an id are ignored
    pub fn from_entries(entries: impl IntoIterator<Item = SubjectEntry>) -> Self {
        let mut catalog = Self::default();
        for entry in entries {
            if catalog.get(&entry.id).is_none() {
                catalog.entries.push(entry);
            }
        }
        catalog
    }

    /// Look up a subject by id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&SubjectEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Subjects belonging to one category, in catalog order
    pub fn in_category(&self, category: Category) -> impl Iterator<Item = &SubjectEntry> {
        self.entries.iter().filter(move |e| e.category == category)
    }

    /// All entries
    #[must_use]
    pub fn entries(&self) -> &[SubjectEntry] {
        &self.entries
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog has no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
