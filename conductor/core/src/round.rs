//! Round State
//!
//! Everything the controller knows about the round in play: which subject was
//! picked, the real photo, the derived prompt, the synthesized image, how the
//! two images are laid out and what the player guessed.

use serde::{Deserialize, Serialize};

use crate::catalog::SubjectEntry;

/// Identity of a displayed image
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    /// The reference photograph
    Real,
    /// The AI-generated image
    Synthetic,
}

impl Label {
    /// Parse a player-facing label (`real`, `ai`, `synthetic`, ...)
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "real" | "photo" => Some(Self::Real),
            "synthetic" | "ai" | "generated" | "fake" => Some(Self::Synthetic),
            _ => None,
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Real => write!(f, "real"),
            Self::Synthetic => write!(f, "synthetic"),
        }
    }
}

/// One of the two on-screen image positions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    /// First displayed image
    Left,
    /// Second displayed image
    Right,
}

impl Slot {
    /// Index into a display order
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
        }
    }

    /// Parse `left`/`right` (or `1`/`2`)
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "left" | "l" | "1" => Some(Self::Left),
            "right" | "r" | "2" => Some(Self::Right),
            _ => None,
        }
    }
}

/// Credit owed to the author of a sourced photo
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribution {
    /// Photographer name
    pub author: String,
    /// Link back to the photographer/source page
    pub source_link: String,
}

/// Opaque image locator. Never mutated once assigned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageReference {
    /// Where the image can be loaded from
    pub url: String,
    /// Required credit, for sourced photos
    pub attribution: Option<Attribution>,
}

impl ImageReference {
    /// Reference without attribution (generated images)
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            attribution: None,
        }
    }

    /// Reference carrying an attribution
    pub fn with_attribution(
        url: impl Into<String>,
        author: impl Into<String>,
        source_link: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            attribution: Some(Attribution {
                author: author.into(),
                source_link: source_link.into(),
            }),
        }
    }
}

/// Default placement before the shuffler has run
pub const DEFAULT_DISPLAY_ORDER: [Label; 2] = [Label::Real, Label::Synthetic];

/// Data for a single selection -> prompt -> synthesis -> guess cycle
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundState {
    /// Theme of the round
    pub subject: SubjectEntry,
    /// Reference photo, once fetched
    pub real_image: Option<ImageReference>,
    /// Prompt derived from the reference photo (empty until derived)
    pub prompt: String,
    /// Synthesized image, once generated
    pub generated_image: Option<ImageReference>,
    /// Which label sits in which slot
    pub display_order: [Label; 2],
    /// The player's pick
    pub guess: Option<Label>,
    /// Whether the guess has been scored
    pub resolved: bool,
}

impl RoundState {
    /// Fresh round for a newly selected subject
    #[must_use]
    pub fn new(subject: SubjectEntry) -> Self {
        Self {
            subject,
            real_image: None,
            prompt: String::new(),
            generated_image: None,
            display_order: DEFAULT_DISPLAY_ORDER,
            guess: None,
            resolved: false,
        }
    }

    /// Label shown in the given slot
    #[must_use]
    pub fn label_at(&self, slot: Slot) -> Label {
        self.display_order[slot.index()]
    }

    /// Whether the guess picked the synthetic image
    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.guess == Some(Label::Synthetic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Category;

    fn round() -> RoundState {
        RoundState::new(SubjectEntry::new("owl", "Owl", Category::Animals))
    }

    #[test]
    fn test_new_round_is_blank() {
        let r = round();
        assert!(r.real_image.is_none());
        assert!(r.generated_image.is_none());
        assert!(r.prompt.is_empty());
        assert!(r.guess.is_none());
        assert!(!r.resolved);
        assert_eq!(r.display_order, DEFAULT_DISPLAY_ORDER);
    }

    #[test]
    fn test_label_at_follows_display_order() {
        let mut r = round();
        r.display_order = [Label::Synthetic, Label::Real];
        assert_eq!(r.label_at(Slot::Left), Label::Synthetic);
        assert_eq!(r.label_at(Slot::Right), Label::Real);
    }

    #[test]
    fn test_is_correct_only_for_synthetic() {
        let mut r = round();
        assert!(!r.is_correct());
        r.guess = Some(Label::Real);
        assert!(!r.is_correct());
        r.guess = Some(Label::Synthetic);
        assert!(r.is_correct());
    }

    #[test]
    fn test_parse_labels_and_slots() {
        assert_eq!(Label::parse("AI"), Some(Label::Synthetic));
        assert_eq!(Label::parse(" real "), Some(Label::Real));
        assert_eq!(Label::parse("maybe"), None);
        assert_eq!(Slot::parse("Left"), Some(Slot::Left));
        assert_eq!(Slot::parse("2"), Some(Slot::Right));
        assert_eq!(Slot::parse("middle"), None);
    }
}
