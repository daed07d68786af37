//! Screen model builder.
//!
//! Walks a uiautomator UI-hierarchy dump and produces the ordered list of
//! addressable interactive elements shown to the model. Two extraction
//! strategies are supported: per-attribute collection with center-distance
//! de-duplication (task mode) and a single-pass heuristic with IoU
//! de-duplication (exploration mode). Order is always traversal order with
//! later near-duplicates dropped, never re-sorted.
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};

use crate::errors::{DroidClawError, DroidClawResult};
use crate::perception::geometry::Rect;

/// Presentation/documentation category of an element. Not part of identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ElementCategory {
    Clickable,
    Focusable,
    LongClickable,
    Scrollable,
}

impl ElementCategory {
    pub fn attribute_name(&self) -> &'static str {
        match self {
            ElementCategory::Clickable => "clickable",
            ElementCategory::Focusable => "focusable",
            ElementCategory::LongClickable => "long-clickable",
            ElementCategory::Scrollable => "scrollable",
        }
    }
}

/// One addressable interactive region. Rebuilt from scratch every round;
/// only `uid` (plus generated documentation) ever reaches disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractiveElement {
    /// Stable identifier: derived from the resource-id when present,
    /// otherwise `{class}_{width}_{height}`, with a short accessibility
    /// label appended and the parent's identifier prefixed. Stable across
    /// renders of the same screen, not globally unique.
    pub uid: String,
    pub bbox: Rect,
    pub category: ElementCategory,
}

/// Raw attributes of one dump node, extracted tolerantly: anything missing
/// reads as empty/false.
#[derive(Debug, Clone, Default)]
struct UiNode {
    class: String,
    resource_id: String,
    content_desc: String,
    index: String,
    bounds: String,
    clickable: bool,
    focusable: bool,
    long_clickable: bool,
    scrollable: bool,
}

impl UiNode {
    fn from_start(e: &BytesStart<'_>) -> Self {
        let mut node = UiNode::default();
        for attr in e.attributes().flatten() {
            let value = attr
                .unescape_value()
                .map(|v| v.into_owned())
                .unwrap_or_default();
            match attr.key.as_ref() {
                b"class" => node.class = value,
                b"resource-id" => node.resource_id = value,
                b"content-desc" => node.content_desc = value,
                b"index" => node.index = value,
                b"bounds" => node.bounds = value,
                b"clickable" => node.clickable = value == "true",
                b"focusable" => node.focusable = value == "true",
                b"long-clickable" => node.long_clickable = value == "true",
                b"scrollable" => node.scrollable = value == "true",
                _ => {}
            }
        }
        node
    }

    fn has_flag(&self, category: ElementCategory) -> bool {
        match category {
            ElementCategory::Clickable => self.clickable,
            ElementCategory::Focusable => self.focusable,
            ElementCategory::LongClickable => self.long_clickable,
            ElementCategory::Scrollable => self.scrollable,
        }
    }

    /// First true flag in priority order; nodes that qualified only via a
    /// resource-id or accessibility label fall back to Clickable.
    fn category(&self) -> ElementCategory {
        if self.clickable {
            ElementCategory::Clickable
        } else if self.focusable {
            ElementCategory::Focusable
        } else if self.scrollable {
            ElementCategory::Scrollable
        } else if self.long_clickable {
            ElementCategory::LongClickable
        } else {
            ElementCategory::Clickable
        }
    }

    fn rect(&self) -> DroidClawResult<Rect> {
        Rect::parse_bounds(&self.bounds)
    }

    /// Identifier without parent context. Fails only on malformed bounds
    /// (the class fallback needs the element dimensions).
    fn stable_id(&self) -> DroidClawResult<String> {
        let rect = self.rect()?;
        let mut id = if self.resource_id.is_empty() {
            format!("{}_{}_{}", self.class, rect.width(), rect.height())
        } else {
            self.resource_id.replace(':', ".").replace('/', "_")
        };
        if !self.content_desc.is_empty() && self.content_desc.len() < 20 {
            let desc = self
                .content_desc
                .replace('/', "_")
                .replace(' ', "")
                .replace(':', "_");
            id.push('_');
            id.push_str(&desc);
        }
        Ok(id)
    }
}

/// Walks every `<node>` element in document order, handing the visitor the
/// node and its nearest `<node>` ancestor.
fn walk_nodes(
    xml: &str,
    mut visit: impl FnMut(&UiNode, Option<&UiNode>),
) -> DroidClawResult<()> {
    let mut reader = Reader::from_str(xml);
    // Stack entry is None for non-node elements (e.g. the hierarchy root) so
    // that End events stay balanced.
    let mut stack: Vec<Option<UiNode>> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if e.name().as_ref() == b"node" {
                    let node = UiNode::from_start(&e);
                    let parent = stack.iter().rev().find_map(|n| n.as_ref());
                    visit(&node, parent);
                    stack.push(Some(node));
                } else {
                    stack.push(None);
                }
            }
            Ok(Event::Empty(e)) => {
                if e.name().as_ref() == b"node" {
                    let node = UiNode::from_start(&e);
                    let parent = stack.iter().rev().find_map(|n| n.as_ref());
                    visit(&node, parent);
                }
            }
            Ok(Event::End(_)) => {
                stack.pop();
            }
            Ok(Event::Eof) => return Ok(()),
            Ok(_) => {}
            Err(e) => {
                return Err(DroidClawError::Perception(format!("ui dump parse: {e}")));
            }
        }
    }
}

fn element_uid(node: &UiNode, parent: Option<&UiNode>, add_index: bool) -> DroidClawResult<String> {
    let mut uid = node.stable_id()?;
    // Parent prefix disambiguates generically-classed siblings (repeated
    // icon buttons inside the same list item).
    if let Some(parent) = parent {
        if let Ok(prefix) = parent.stable_id() {
            uid = format!("{prefix}_{uid}");
        }
    }
    if add_index {
        uid = format!("{}_{}", uid, node.index);
    }
    Ok(uid)
}

/// Attribute-flag strategy: one pass for a single boolean attribute, with
/// center-distance de-duplication against the accumulating list.
pub fn collect_by_attribute(
    xml: &str,
    category: ElementCategory,
    min_dist: f64,
    add_index: bool,
) -> DroidClawResult<Vec<InteractiveElement>> {
    let mut out: Vec<InteractiveElement> = Vec::new();
    walk_nodes(xml, |node, parent| {
        if !node.has_flag(category) {
            return;
        }
        let bbox = match node.rect() {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(error = %e, class = %node.class, "node skipped");
                return;
            }
        };
        let uid = match element_uid(node, parent, add_index) {
            Ok(uid) => uid,
            Err(e) => {
                tracing::debug!(error = %e, class = %node.class, "node skipped");
                return;
            }
        };
        let close = out.iter().any(|e| e.bbox.center_distance(&bbox) <= min_dist);
        if !close {
            out.push(InteractiveElement {
                uid,
                bbox,
                category,
            });
        }
    })?;
    Ok(out)
}

/// Task-mode element list: the clickable pass unioned with the focusable
/// pass, dropping focusable candidates whose center falls within `min_dist`
/// of an accepted clickable element.
pub fn build_task_elements(xml: &str, min_dist: f64) -> DroidClawResult<Vec<InteractiveElement>> {
    let clickable = collect_by_attribute(xml, ElementCategory::Clickable, min_dist, true)?;
    let focusable = collect_by_attribute(xml, ElementCategory::Focusable, min_dist, true)?;

    let mut elements = clickable.clone();
    for elem in focusable {
        let close = clickable
            .iter()
            .any(|c| c.bbox.center_distance(&elem.bbox) <= min_dist);
        if !close {
            elements.push(elem);
        }
    }
    Ok(elements)
}

/// Heuristic-interactive strategy: single traversal, minimum-area filter,
/// IoU de-duplication preserving traversal order.
pub fn collect_interactive(
    xml: &str,
    min_area: i64,
    iou_threshold: f64,
) -> DroidClawResult<Vec<InteractiveElement>> {
    let mut out: Vec<InteractiveElement> = Vec::new();
    walk_nodes(xml, |node, parent| {
        let interactive = node.clickable
            || node.focusable
            || node.long_clickable
            || node.scrollable
            || !node.resource_id.is_empty()
            || !node.content_desc.is_empty();
        if !interactive {
            return;
        }
        let bbox = match node.rect() {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(error = %e, class = %node.class, "node skipped");
                return;
            }
        };
        if bbox.area() < min_area {
            return;
        }
        let uid = match element_uid(node, parent, false) {
            Ok(uid) => uid,
            Err(e) => {
                tracing::debug!(error = %e, class = %node.class, "node skipped");
                return;
            }
        };
        let duplicate = out.iter().any(|e| e.bbox.iou(&bbox) > iou_threshold);
        if !duplicate {
            out.push(InteractiveElement {
                uid,
                bbox,
                category: node.category(),
            });
        }
    })?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = r#"<?xml version='1.0' encoding='UTF-8'?>
<hierarchy rotation="0">
  <node index="0" class="android.widget.FrameLayout" resource-id="" content-desc="" clickable="false" focusable="false" long-clickable="false" scrollable="false" bounds="[0,0][1080,1920]">
    <node index="0" class="android.widget.Button" resource-id="com.example:id/ok" content-desc="" clickable="true" focusable="true" long-clickable="false" scrollable="false" bounds="[100,100][300,200]"/>
    <node index="1" class="android.widget.Button" resource-id="" content-desc="Send" clickable="true" focusable="false" long-clickable="false" scrollable="false" bounds="[400,100][600,200]"/>
    <node index="2" class="android.widget.EditText" resource-id="com.example:id/input" content-desc="" clickable="false" focusable="true" long-clickable="false" scrollable="false" bounds="[100,400][900,520]"/>
    <node index="3" class="android.widget.ScrollView" resource-id="" content-desc="" clickable="false" focusable="false" long-clickable="false" scrollable="true" bounds="[0,600][1080,1800]"/>
  </node>
</hierarchy>"#;

    #[test]
    fn clickable_pass_finds_flagged_nodes_in_order() {
        let elems = collect_by_attribute(DUMP, ElementCategory::Clickable, 30.0, true).unwrap();
        assert_eq!(elems.len(), 2);
        assert_eq!(elems[0].bbox, Rect::new(100, 100, 300, 200));
        assert_eq!(elems[1].bbox, Rect::new(400, 100, 600, 200));
    }

    #[test]
    fn uid_uses_resource_id_with_parent_prefix_and_index() {
        let elems = collect_by_attribute(DUMP, ElementCategory::Clickable, 30.0, true).unwrap();
        // Parent FrameLayout has no resource-id: class_width_height prefix.
        assert_eq!(
            elems[0].uid,
            "android.widget.FrameLayout_1080_1920_com.example.id_ok_0"
        );
    }

    #[test]
    fn uid_appends_short_content_desc() {
        let elems = collect_by_attribute(DUMP, ElementCategory::Clickable, 30.0, true).unwrap();
        assert!(elems[1].uid.contains("android.widget.Button_200_100_Send"));
    }

    #[test]
    fn task_union_drops_focusable_near_clickable() {
        let elems = build_task_elements(DUMP, 30.0).unwrap();
        // The ok button is both clickable and focusable: its focusable twin
        // must be dropped. The EditText is focusable-only and survives.
        assert_eq!(elems.len(), 3);
        assert_eq!(elems[2].bbox, Rect::new(100, 400, 900, 520));
        assert_eq!(elems[2].category, ElementCategory::Focusable);
    }

    #[test]
    fn heuristic_collects_and_classifies_by_priority() {
        let elems = collect_interactive(DUMP, 2000, 0.6).unwrap();
        // Root FrameLayout has no flags, empty resource-id and desc: skipped.
        assert_eq!(elems.len(), 4);
        assert_eq!(elems[0].category, ElementCategory::Clickable);
        assert_eq!(elems[2].category, ElementCategory::Focusable);
        assert_eq!(elems[3].category, ElementCategory::Scrollable);
    }

    #[test]
    fn heuristic_is_idempotent() {
        let a = collect_interactive(DUMP, 2000, 0.6).unwrap();
        let b = collect_interactive(DUMP, 2000, 0.6).unwrap();
        let uids_a: Vec<_> = a.iter().map(|e| e.uid.clone()).collect();
        let uids_b: Vec<_> = b.iter().map(|e| e.uid.clone()).collect();
        assert_eq!(uids_a, uids_b);
    }

    #[test]
    fn heuristic_drops_high_iou_duplicates() {
        let dump = r#"<hierarchy>
  <node index="0" class="A" resource-id="x:id/a" clickable="true" bounds="[0,0][100,100]"/>
  <node index="1" class="B" resource-id="x:id/b" clickable="true" bounds="[2,2][100,100]"/>
  <node index="2" class="C" resource-id="x:id/c" clickable="true" bounds="[500,500][600,600]"/>
</hierarchy>"#;
        let elems = collect_interactive(dump, 2000, 0.6).unwrap();
        assert_eq!(elems.len(), 2);
        assert!(elems[0].uid.contains("id_a"));
        assert!(elems[1].uid.contains("id_c"));
    }

    #[test]
    fn heuristic_enforces_min_area() {
        let dump = r#"<hierarchy>
  <node index="0" class="A" resource-id="x:id/tiny" clickable="true" bounds="[0,0][10,10]"/>
</hierarchy>"#;
        assert!(collect_interactive(dump, 2000, 0.6).unwrap().is_empty());
    }

    #[test]
    fn malformed_bounds_skip_single_node() {
        let dump = r#"<hierarchy>
  <node index="0" class="A" resource-id="x:id/bad" clickable="true" bounds="oops"/>
  <node index="1" class="B" resource-id="x:id/good" clickable="true" bounds="[0,0][200,200]"/>
</hierarchy>"#;
        let elems = collect_interactive(dump, 2000, 0.6).unwrap();
        assert_eq!(elems.len(), 1);
        assert!(elems[0].uid.contains("id_good"));
    }

    #[test]
    fn empty_dump_yields_empty_list() {
        let elems = collect_interactive("<hierarchy></hierarchy>", 2000, 0.6).unwrap();
        assert!(elems.is_empty());
    }
}
