use regex::Regex;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::LazyLock;

/// Marker embedding a label in a title: `{#label#}`.
pub const DEFAULT_LABEL_PATTERN: &str = r"\{#(\S+?)#\}";

static LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(DEFAULT_LABEL_PATTERN).expect("static pattern"));

/// Split a label marker off a title.
///
/// ```text
/// split_label("{#mylabel#} text") == ("text", "mylabel")
/// split_label("text") == ("text", "")
/// ```
pub fn split_label(text: &str) -> (String, String) {
    split_label_with(&LABEL, text)
}

/// [`split_label`] with a caller-supplied marker pattern whose first group
/// is the label.
pub fn split_label_with(pattern: &Regex, text: &str) -> (String, String) {
    let Some(caps) = pattern.captures(text) else {
        return (text.to_string(), String::new());
    };
    let marker = caps.get_match().as_str();
    let label = caps.get(1).map_or("", |m| m.as_str());
    (text.replace(marker, "").trim().to_string(), label.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Label {
    pub kind: String,
    pub number_list: Vec<u32>,
    pub id: String,
}

/// Labels defined in one document pass.
#[derive(Debug, Clone, Default)]
pub struct LabelMap {
    labels: BTreeMap<String, Label>,
    duplicates: Vec<String>,
}

/// Label map shared between the renderer that defines labels and the ones
/// that resolve references to them.
pub type SharedLabels = Rc<RefCell<LabelMap>>;

impl LabelMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `label`. A label that is already defined keeps its first
    /// definition; the duplicate is flagged and `false` returned.
    pub fn insert(&mut self, name: &str, label: Label) -> bool {
        if self.labels.contains_key(name) {
            log::warn!("Duplicated label '{name}'; keeping its first definition");
            self.duplicates.push(name.to_string());
            return false;
        }
        self.labels.insert(name.to_string(), label);
        true
    }

    pub fn get(&self, name: &str) -> Option<&Label> {
        self.labels.get(name)
    }

    /// Labels that were defined more than once, in order of detection.
    pub fn duplicates(&self) -> &[String] {
        &self.duplicates
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Label)> {
        self.labels.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn clear(&mut self) {
        self.labels.clear();
        self.duplicates.clear();
    }
}
