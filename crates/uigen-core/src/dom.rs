//! Framework-neutral serialized element tree.
//!
//! Executed components publish plain `{type, props, children}` data.
//! Serializing through JSON and rebuilding guarantees the tree the host
//! renders contains no live interpreter values: functions and other
//! non-data props have been dropped by the round trip.

use crate::script::FRAGMENT_TAG;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One rendered element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedNode {
    pub tag: String,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub attributes: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeChild>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeChild {
    Text(String),
    Node(SerializedNode),
}

/// A render failure surfaced to the user inline in the preview.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[error("{message}")]
pub struct RenderError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl RenderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: None,
        }
    }

    pub fn with_stack(message: impl Into<String>, stack: Option<String>) -> Self {
        Self {
            message: message.into(),
            stack,
        }
    }
}

pub type RenderResult = Result<SerializedNode, RenderError>;

impl SerializedNode {
    /// String attribute accessor, `None` for absent or non-string values.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(|v| v.as_str())
    }

    /// Concatenated text of this subtree.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            match child {
                NodeChild::Text(text) => out.push_str(text),
                NodeChild::Node(node) => out.push_str(&node.text_content()),
            }
        }
        out
    }
}

/// Rebuild an element tree from round-tripped JSON. A top-level array or
/// primitive is wrapped in a `div` so the result is always one node.
pub fn rebuild(json: &serde_json::Value) -> Result<SerializedNode, RenderError> {
    let mut children = collect_children(json)?;
    if children.len() == 1 {
        if let NodeChild::Node(_) = children[0] {
            match children.pop() {
                Some(NodeChild::Node(node)) => return Ok(node),
                _ => unreachable!("length checked above"),
            }
        }
    }
    Ok(SerializedNode {
        tag: "div".to_string(),
        attributes: serde_json::Map::new(),
        children,
    })
}

/// Flatten one JSON value into rendered children: arrays become sibling
/// groups, strings and numbers become text, null/booleans render
/// nothing, `{type, props, children}` objects become elements.
pub fn collect_children(json: &serde_json::Value) -> Result<Vec<NodeChild>, RenderError> {
    match json {
        serde_json::Value::Null | serde_json::Value::Bool(_) => Ok(Vec::new()),
        serde_json::Value::Number(n) => Ok(vec![NodeChild::Text(n.to_string())]),
        serde_json::Value::String(s) => Ok(vec![NodeChild::Text(s.clone())]),
        serde_json::Value::Array(items) => {
            let mut out = Vec::new();
            for item in items {
                out.extend(collect_children(item)?);
            }
            Ok(out)
        }
        serde_json::Value::Object(map) => {
            let Some(tag) = map.get("type").and_then(|t| t.as_str()) else {
                return Err(RenderError::new(
                    "objects without a type are not valid as element children",
                ));
            };
            let child_json = map.get("children").cloned().unwrap_or(serde_json::Value::Null);
            let children = collect_children(&child_json)?;
            if tag == FRAGMENT_TAG {
                return Ok(children);
            }
            let attributes = match map.get("props") {
                Some(serde_json::Value::Object(props)) => {
                    let mut attrs = serde_json::Map::new();
                    for (key, value) in props {
                        if key != "children" {
                            attrs.insert(key.clone(), value.clone());
                        }
                    }
                    attrs
                }
                _ => serde_json::Map::new(),
            };
            Ok(vec![NodeChild::Node(SerializedNode {
                tag: tag.to_string(),
                attributes,
                children,
            })])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn rebuilds_an_element_with_attributes_and_text() {
        let tree = rebuild(&json!({
            "type": "div",
            "props": { "className": "p-4" },
            "children": ["hello"]
        }))
        .unwrap();
        assert_eq!(tree.tag, "div");
        assert_eq!(tree.attr("className"), Some("p-4"));
        assert_eq!(tree.children, vec![NodeChild::Text("hello".to_string())]);
    }

    #[test]
    fn arrays_flatten_into_sibling_groups() {
        let tree = rebuild(&json!({
            "type": "ul",
            "props": null,
            "children": [[
                { "type": "li", "props": null, "children": ["a"] },
                { "type": "li", "props": null, "children": ["b"] }
            ]]
        }))
        .unwrap();
        assert_eq!(tree.children.len(), 2);
    }

    #[test]
    fn fragments_splice_their_children() {
        let tree = rebuild(&json!({
            "type": "section",
            "props": null,
            "children": [
                { "type": "#fragment", "props": null, "children": ["x", "y"] }
            ]
        }))
        .unwrap();
        assert_eq!(
            tree.children,
            vec![
                NodeChild::Text("x".to_string()),
                NodeChild::Text("y".to_string())
            ]
        );
    }

    #[test]
    fn null_and_booleans_render_nothing() {
        let tree = rebuild(&json!({
            "type": "div",
            "props": null,
            "children": [null, true, false, "kept"]
        }))
        .unwrap();
        assert_eq!(tree.children, vec![NodeChild::Text("kept".to_string())]);
    }

    #[test]
    fn top_level_primitives_are_wrapped() {
        let tree = rebuild(&json!("just text")).unwrap();
        assert_eq!(tree.tag, "div");
        assert_eq!(tree.children, vec![NodeChild::Text("just text".to_string())]);
    }

    #[test]
    fn typeless_object_child_is_an_error() {
        let err = rebuild(&json!({ "foo": 1 })).unwrap_err();
        assert!(err.message.contains("not valid"));
    }

    #[test]
    fn text_content_walks_the_subtree() {
        let tree = rebuild(&json!({
            "type": "p",
            "props": null,
            "children": ["a", { "type": "b", "props": null, "children": ["c"] }]
        }))
        .unwrap();
        assert_eq!(tree.text_content(), "ac");
    }
}
