//! Per-element documentation store.
//!
//! One JSON file per element uid under `apps/<app>/auto_docs`, each holding
//! the fixed five action-kind entries. Writes are first-one-wins per
//! `(uid, action kind)`.
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::actions::SwipeDirection;
use crate::errors::DroidClawResult;
use crate::perception::InteractiveElement;

/// The action kinds documentation is keyed by. Swipe directions fold into
/// the vertical/horizontal kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Tap,
    Text,
    VSwipe,
    HSwipe,
    LongPress,
}

impl ActionKind {
    pub fn from_swipe(direction: SwipeDirection) -> Self {
        match direction {
            SwipeDirection::Up | SwipeDirection::Down => ActionKind::VSwipe,
            SwipeDirection::Left | SwipeDirection::Right => ActionKind::HSwipe,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            ActionKind::Tap => "tap",
            ActionKind::Text => "text",
            ActionKind::VSwipe => "v_swipe",
            ActionKind::HSwipe => "h_swipe",
            ActionKind::LongPress => "long_press",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocRecord {
    #[serde(default)]
    pub tap: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub v_swipe: String,
    #[serde(default)]
    pub h_swipe: String,
    #[serde(default)]
    pub long_press: String,
}

impl DocRecord {
    pub fn entry(&self, kind: ActionKind) -> &str {
        match kind {
            ActionKind::Tap => &self.tap,
            ActionKind::Text => &self.text,
            ActionKind::VSwipe => &self.v_swipe,
            ActionKind::HSwipe => &self.h_swipe,
            ActionKind::LongPress => &self.long_press,
        }
    }

    fn entry_mut(&mut self, kind: ActionKind) -> &mut String {
        match kind {
            ActionKind::Tap => &mut self.tap,
            ActionKind::Text => &mut self.text,
            ActionKind::VSwipe => &mut self.v_swipe,
            ActionKind::HSwipe => &mut self.h_swipe,
            ActionKind::LongPress => &mut self.long_press,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tap.is_empty()
            && self.text.is_empty()
            && self.v_swipe.is_empty()
            && self.h_swipe.is_empty()
            && self.long_press.is_empty()
    }
}

pub struct DocStore {
    root: PathBuf,
}

impl DocStore {
    pub fn new(root: &Path) -> DroidClawResult<Self> {
        std::fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    fn doc_path(&self, uid: &str) -> PathBuf {
        self.root.join(format!("{uid}.json"))
    }

    pub fn get(&self, uid: &str) -> DroidClawResult<Option<DocRecord>> {
        let path = self.doc_path(uid);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Writes documentation for `(uid, kind)` unless a non-empty entry
    /// already exists. Returns whether anything was written.
    pub fn set_once(&self, uid: &str, kind: ActionKind, text: &str) -> DroidClawResult<bool> {
        let mut record = self.get(uid)?.unwrap_or_default();
        if !record.entry(kind).is_empty() {
            tracing::debug!(uid, kind = kind.key(), "documentation already present");
            return Ok(false);
        }
        *record.entry_mut(kind) = text.to_string();
        std::fs::write(self.doc_path(uid), serde_json::to_string_pretty(&record)?)?;
        tracing::info!(uid, kind = kind.key(), "documentation recorded");
        Ok(true)
    }

    /// Assembles the documentation block for the element-mode prompt: one
    /// paragraph per documented element, referenced by its 1-based numeric
    /// tag on the annotated image.
    pub fn render_for_prompt(&self, elements: &[InteractiveElement]) -> DroidClawResult<String> {
        let mut out = String::new();
        for (i, elem) in elements.iter().enumerate() {
            let Some(record) = self.get(&elem.uid)? else {
                continue;
            };
            if record.is_empty() {
                continue;
            }
            out.push_str(&format!(
                "Documentation of UI element labeled with the numeric tag '{}':\n",
                i + 1
            ));
            if !record.tap.is_empty() {
                out.push_str(&format!("This UI element is clickable. {}\n", record.tap));
            }
            if !record.text.is_empty() {
                out.push_str(&format!(
                    "This UI element can receive text input. {}\n",
                    record.text
                ));
            }
            if !record.long_press.is_empty() {
                out.push_str(&format!(
                    "This UI element is long clickable. {}\n",
                    record.long_press
                ));
            }
            if !record.v_swipe.is_empty() {
                out.push_str(&format!(
                    "This element can be swiped up or down without tapping. {}\n",
                    record.v_swipe
                ));
            }
            if !record.h_swipe.is_empty() {
                out.push_str(&format!(
                    "This element can be swiped left or right without tapping. {}\n",
                    record.h_swipe
                ));
            }
            out.push('\n');
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::perception::geometry::Rect;
    use crate::perception::ElementCategory;

    fn store() -> (tempfile::TempDir, DocStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = DocStore::new(&dir.path().join("auto_docs")).unwrap();
        (dir, store)
    }

    #[test]
    fn set_once_writes_then_refuses_overwrite() {
        let (_dir, store) = store();
        assert!(store.set_once("btn_send", ActionKind::Tap, "Sends the message.").unwrap());
        assert!(!store.set_once("btn_send", ActionKind::Tap, "Something else.").unwrap());
        let record = store.get("btn_send").unwrap().unwrap();
        assert_eq!(record.tap, "Sends the message.");
    }

    #[test]
    fn distinct_kinds_are_independent() {
        let (_dir, store) = store();
        assert!(store.set_once("field", ActionKind::Tap, "Focuses the field.").unwrap());
        assert!(store.set_once("field", ActionKind::Text, "Enters the query.").unwrap());
        let record = store.get("field").unwrap().unwrap();
        assert_eq!(record.tap, "Focuses the field.");
        assert_eq!(record.text, "Enters the query.");
    }

    #[test]
    fn swipe_directions_fold_into_two_kinds() {
        assert_eq!(ActionKind::from_swipe(SwipeDirection::Up), ActionKind::VSwipe);
        assert_eq!(ActionKind::from_swipe(SwipeDirection::Down), ActionKind::VSwipe);
        assert_eq!(ActionKind::from_swipe(SwipeDirection::Left), ActionKind::HSwipe);
        assert_eq!(ActionKind::from_swipe(SwipeDirection::Right), ActionKind::HSwipe);
    }

    #[test]
    fn render_for_prompt_uses_numeric_tags() {
        let (_dir, store) = store();
        store.set_once("btn_ok", ActionKind::Tap, "Confirms the dialog.").unwrap();
        let elements = vec![
            InteractiveElement {
                uid: "undocumented".into(),
                bbox: Rect::new(0, 0, 10, 10),
                category: ElementCategory::Clickable,
            },
            InteractiveElement {
                uid: "btn_ok".into(),
                bbox: Rect::new(0, 0, 10, 10),
                category: ElementCategory::Clickable,
            },
        ];
        let rendered = store.render_for_prompt(&elements).unwrap();
        assert!(rendered.contains("numeric tag '2'"));
        assert!(rendered.contains("Confirms the dialog."));
        assert!(!rendered.contains("numeric tag '1'"));
    }

    #[test]
    fn missing_uid_reads_as_none() {
        let (_dir, store) = store();
        assert!(store.get("nope").unwrap().is_none());
    }
}
