use serde::{Deserialize, Serialize};

use super::detail::CharacterDetail;

/// One character's dictionary record, keyed by `name`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    pub name: String,
    pub pinyin: String,
    pub strokes: String,
    pub radical: String,
    pub basic_definition: String,
    pub detailed_meaning: String,
    pub word_class_change: String,
    pub homophones: String,
    pub general_dictionary: String,
}

impl DictionaryEntry {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn from_detail(name: impl Into<String>, detail: CharacterDetail) -> Self {
        Self {
            name: name.into(),
            pinyin: detail.pinyin,
            strokes: detail.strokes,
            radical: detail.radical,
            basic_definition: detail.basic_definition,
            detailed_meaning: detail.detailed.detailed_meaning,
            word_class_change: detail.detailed.word_class_change,
            homophones: detail.homophones,
            general_dictionary: detail.general_dictionary,
        }
    }
}

/// Context carried from a character list to the character's detail page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterContext {
    pub name: String,
}
