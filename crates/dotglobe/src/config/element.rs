//! The declarative side: elements with string attributes and style
//! custom-properties, and the document that holds a globe's children.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Anything properties can be read from.
pub trait Source {
    fn attribute(&self, name: &str) -> Option<&str>;
    fn style(&self, name: &str) -> Option<&str>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Element {
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Custom properties, keyed with their leading `--`.
    #[serde(default)]
    pub style: BTreeMap<String, String>,
    /// Text content (labels, overlay bodies).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
}

impl Element {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn with_style(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_style(name, value);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        self.attributes.insert(name.to_string(), value.into());
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        self.attributes.remove(name)
    }

    pub fn set_style(&mut self, name: &str, value: impl Into<String>) {
        self.style.insert(name.to_string(), value.into());
    }
}

impl Source for Element {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    fn style(&self, name: &str) -> Option<&str> {
        self.style.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Marker,
    Text,
    Line,
    Overlay,
}

/// Stable handle of a child element within one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub struct Child {
    pub id: ElementId,
    pub kind: ElementKind,
    pub element: Element,
}

/// A globe element and its children, in document order.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub root: Element,
    children: Vec<Child>,
    next_id: u64,
}

#[derive(Deserialize)]
struct SceneFile {
    #[serde(default)]
    globe: Element,
    #[serde(default)]
    children: Vec<ChildSpec>,
}

#[derive(Deserialize)]
struct ChildSpec {
    kind: ElementKind,
    #[serde(flatten)]
    element: Element,
}

impl Document {
    pub fn new(root: Element) -> Self {
        Self {
            root,
            ..Default::default()
        }
    }

    /// Parses `{ "globe": {..}, "children": [{ "kind": "marker", .. }] }`.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let file: SceneFile = serde_json::from_str(json)?;
        let mut doc = Document::new(file.globe);
        for child in file.children {
            doc.append(child.kind, child.element);
        }
        Ok(doc)
    }

    pub fn append(&mut self, kind: ElementKind, element: Element) -> ElementId {
        let id = ElementId(self.next_id);
        self.next_id += 1;
        self.children.push(Child { id, kind, element });
        id
    }

    pub fn remove(&mut self, id: ElementId) -> Option<Element> {
        let pos = self.children.iter().position(|c| c.id == id)?;
        Some(self.children.remove(pos).element)
    }

    pub fn get(&self, id: ElementId) -> Option<&Child> {
        self.children.iter().find(|c| c.id == id)
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut Child> {
        self.children.iter_mut().find(|c| c.id == id)
    }

    pub fn children(&self) -> &[Child] {
        &self.children
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.get(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scene_json() {
        let doc = Document::from_json(
            r##"{
                "globe": { "attributes": { "density": "0.7" }, "style": { "--point-color": "#f00" } },
                "children": [
                    { "kind": "marker", "attributes": { "location": "10 20" } },
                    { "kind": "text", "text": "Hello" }
                ]
            }"##,
        )
        .expect("scene parses");

        assert_eq!(doc.root.attribute("density"), Some("0.7"));
        assert_eq!(doc.root.style("--point-color"), Some("#f00"));
        assert_eq!(doc.children().len(), 2);
        assert_eq!(doc.children()[0].kind, ElementKind::Marker);
        assert_eq!(doc.children()[1].element.text, "Hello");
    }

    #[test]
    fn ids_stay_unique_after_removal() {
        let mut doc = Document::default();
        let a = doc.append(ElementKind::Marker, Element::new());
        let b = doc.append(ElementKind::Line, Element::new());
        assert!(doc.remove(a).is_some());
        assert!(doc.remove(a).is_none());
        let c = doc.append(ElementKind::Text, Element::new());
        assert_ne!(b, c);
        assert_eq!(doc.children().iter().map(|c| c.id).collect::<Vec<_>>(), vec![b, c]);
    }
}
