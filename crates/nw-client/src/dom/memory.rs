//! In-memory DOM
//!
//! A small arena-backed document used to run the executor headless. It
//! records every dispatched event, so tests can assert on exact sequences.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use super::{ComputedStyle, Dom, DomEvent, ElementId, EvalError, NodeKind, Rect};

type Evaluator = dyn Fn(&str, Option<ElementId>) -> Result<Option<Value>, EvalError> + Send + Sync;

const BODY: ElementId = ElementId(0);
const DEFAULT_RECT: Rect = Rect { x: 0.0, y: 0.0, width: 100.0, height: 20.0 };
const BODY_RECT: Rect = Rect { x: 0.0, y: 0.0, width: 800.0, height: 600.0 };

#[derive(Debug)]
struct ElementData {
    tag: String,
    attributes: BTreeMap<String, String>,
    style: ComputedStyle,
    rect: Rect,
    value: Option<String>,
    checked: bool,
}

#[derive(Debug)]
enum NodeData {
    Element(ElementData),
    Text(String),
}

#[derive(Debug)]
struct Node {
    data: NodeData,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
}

#[derive(Debug)]
struct Tree {
    title: String,
    nodes: Vec<Node>,
    active: Option<ElementId>,
    events: Vec<(ElementId, DomEvent)>,
    location: Option<String>,
}

impl Tree {
    fn node(&self, id: ElementId) -> Option<&Node> {
        usize::try_from(id.0).ok().and_then(|i| self.nodes.get(i))
    }

    fn node_mut(&mut self, id: ElementId) -> Option<&mut Node> {
        usize::try_from(id.0).ok().and_then(move |i| self.nodes.get_mut(i))
    }

    fn element(&self, id: ElementId) -> Option<&ElementData> {
        match self.node(id).map(|n| &n.data) {
            Some(NodeData::Element(el)) => Some(el),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: ElementId) -> Option<&mut ElementData> {
        match self.node_mut(id).map(|n| &mut n.data) {
            Some(NodeData::Element(el)) => Some(el),
            _ => None,
        }
    }

    fn push(&mut self, parent: ElementId, data: NodeData) -> ElementId {
        let id = ElementId(self.nodes.len() as u64);
        self.nodes.push(Node {
            data,
            parent: Some(parent),
            children: Vec::new(),
        });
        if let Some(p) = self.node_mut(parent) {
            p.children.push(id);
        }
        id
    }

    /// Attached elements in document order.
    fn elements(&self) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack = vec![BODY];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.node(id) {
                if matches!(node.data, NodeData::Element(_)) {
                    out.push(id);
                    stack.extend(node.children.iter().rev().copied());
                }
            }
        }
        out
    }

    fn collect_text(&self, id: ElementId, rendered: bool, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };
        match &node.data {
            NodeData::Text(text) => out.push_str(text),
            NodeData::Element(el) => {
                if rendered && el.style.is_hidden() {
                    return;
                }
                for child in &node.children {
                    self.collect_text(*child, rendered, out);
                }
                if rendered && el.style.display != "inline" && !out.ends_with('\n') {
                    out.push('\n');
                }
            }
        }
    }
}

pub struct MemoryDom {
    tree: Mutex<Tree>,
    evaluator: Option<Box<Evaluator>>,
}

impl MemoryDom {
    /// A document containing only an empty `<body>`.
    pub fn new(title: impl Into<String>) -> Self {
        let body = Node {
            data: NodeData::Element(ElementData {
                tag: "body".to_string(),
                attributes: BTreeMap::new(),
                style: ComputedStyle::default(),
                rect: BODY_RECT,
                value: None,
                checked: false,
            }),
            parent: None,
            children: Vec::new(),
        };
        Self {
            tree: Mutex::new(Tree {
                title: title.into(),
                nodes: vec![body],
                active: None,
                events: Vec::new(),
                location: None,
            }),
            evaluator: None,
        }
    }

    /// Install the function used by [`Dom::evaluate`].
    pub fn with_evaluator<F>(mut self, evaluator: F) -> Self
    where
        F: Fn(&str, Option<ElementId>) -> Result<Option<Value>, EvalError> + Send + Sync + 'static,
    {
        self.evaluator = Some(Box::new(evaluator));
        self
    }

    fn lock(&self) -> MutexGuard<'_, Tree> {
        self.tree.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn body_id(&self) -> ElementId {
        BODY
    }

    pub fn set_title(&self, title: impl Into<String>) {
        self.lock().title = title.into();
    }

    pub fn append_element(&self, parent: ElementId, tag: &str) -> ElementId {
        let tag = tag.to_ascii_lowercase();
        let value = matches!(tag.as_str(), "input" | "textarea" | "select").then(String::new);
        self.lock().push(
            parent,
            NodeData::Element(ElementData {
                tag,
                attributes: BTreeMap::new(),
                style: ComputedStyle::default(),
                rect: DEFAULT_RECT,
                value,
                checked: false,
            }),
        )
    }

    pub fn append_text(&self, parent: ElementId, text: &str) -> ElementId {
        self.lock().push(parent, NodeData::Text(text.to_string()))
    }

    /// Set an attribute. `value` and `checked` also seed the live state.
    pub fn set_attribute(&self, el: ElementId, name: &str, value: &str) {
        let mut tree = self.lock();
        if let Some(data) = tree.element_mut(el) {
            match name {
                "value" if data.value.is_some() => data.value = Some(value.to_string()),
                "checked" => data.checked = true,
                _ => {}
            }
            data.attributes.insert(name.to_string(), value.to_string());
        }
    }

    pub fn remove_attribute(&self, el: ElementId, name: &str) {
        if let Some(data) = self.lock().element_mut(el) {
            data.attributes.remove(name);
        }
    }

    pub fn set_style(&self, el: ElementId, display: &str, visibility: &str) {
        if let Some(data) = self.lock().element_mut(el) {
            data.style = ComputedStyle {
                display: display.to_string(),
                visibility: visibility.to_string(),
            };
        }
    }

    pub fn set_rect(&self, el: ElementId, rect: Rect) {
        if let Some(data) = self.lock().element_mut(el) {
            data.rect = rect;
        }
    }

    /// Replace the contents of a text node.
    pub fn set_text(&self, node: ElementId, text: &str) {
        if let Some(node) = self.lock().node_mut(node) {
            if let NodeData::Text(existing) = &mut node.data {
                *existing = text.to_string();
            }
        }
    }

    /// Detach a node from its parent.
    pub fn remove(&self, node: ElementId) {
        let mut tree = self.lock();
        let parent = tree.node_mut(node).and_then(|n| n.parent.take());
        if let Some(parent) = parent.and_then(|p| tree.node_mut(p)) {
            parent.children.retain(|c| *c != node);
        }
    }

    pub fn events(&self) -> Vec<(ElementId, DomEvent)> {
        self.lock().events.clone()
    }

    /// Event type names dispatched on `el`, in order.
    pub fn event_types(&self, el: ElementId) -> Vec<String> {
        self.lock()
            .events
            .iter()
            .filter(|(target, _)| *target == el)
            .map(|(_, event)| event.event_type().to_string())
            .collect()
    }

    pub fn clear_events(&self) {
        self.lock().events.clear();
    }

    /// Last URL passed to [`Dom::navigate`].
    pub fn location(&self) -> Option<String> {
        self.lock().location.clone()
    }
}

impl Dom for MemoryDom {
    fn title(&self) -> String {
        self.lock().title.clone()
    }

    fn body(&self) -> Option<ElementId> {
        Some(BODY)
    }

    fn node_kind(&self, node: ElementId) -> NodeKind {
        match self.lock().node(node).map(|n| &n.data) {
            Some(NodeData::Element(_)) => NodeKind::Element,
            Some(NodeData::Text(_)) => NodeKind::Text,
            None => NodeKind::Other,
        }
    }

    fn child_nodes(&self, node: ElementId) -> Vec<ElementId> {
        self.lock()
            .node(node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn tag_name(&self, el: ElementId) -> String {
        self.lock()
            .element(el)
            .map(|e| e.tag.clone())
            .unwrap_or_default()
    }

    fn attribute(&self, el: ElementId, name: &str) -> Option<String> {
        self.lock().element(el).and_then(|e| e.attributes.get(name).cloned())
    }

    fn text_content(&self, node: ElementId) -> String {
        let mut out = String::new();
        self.lock().collect_text(node, false, &mut out);
        out
    }

    fn inner_text(&self, el: ElementId) -> String {
        let mut out = String::new();
        self.lock().collect_text(el, true, &mut out);
        out.trim().to_string()
    }

    fn computed_style(&self, el: ElementId) -> ComputedStyle {
        self.lock()
            .element(el)
            .map(|e| e.style.clone())
            .unwrap_or_default()
    }

    fn bounding_rect(&self, el: ElementId) -> Rect {
        self.lock().element(el).map(|e| e.rect).unwrap_or_default()
    }

    fn label_for(&self, id: &str) -> Option<ElementId> {
        let tree = self.lock();
        tree.elements().into_iter().find(|el| {
            tree.element(*el).is_some_and(|data| {
                data.tag == "label" && data.attributes.get("for").map(String::as_str) == Some(id)
            })
        })
    }

    fn is_disabled(&self, el: ElementId) -> bool {
        self.lock()
            .element(el)
            .is_some_and(|e| e.attributes.contains_key("disabled"))
    }

    fn is_checked(&self, el: ElementId) -> bool {
        self.lock().element(el).is_some_and(|e| e.checked)
    }

    fn set_checked(&self, el: ElementId, checked: bool) {
        if let Some(data) = self.lock().element_mut(el) {
            data.checked = checked;
        }
    }

    fn value(&self, el: ElementId) -> Option<String> {
        self.lock().element(el).and_then(|e| e.value.clone())
    }

    fn set_value(&self, el: ElementId, value: &str) {
        if let Some(data) = self.lock().element_mut(el) {
            if data.value.is_some() {
                data.value = Some(value.to_string());
            }
        }
    }

    fn is_content_editable(&self, el: ElementId) -> bool {
        self.lock()
            .element(el)
            .and_then(|e| e.attributes.get("contenteditable"))
            .is_some_and(|v| v.is_empty() || v == "true")
    }

    fn set_text_content(&self, el: ElementId, text: &str) {
        let mut tree = self.lock();
        let old = tree
            .node_mut(el)
            .map(|n| std::mem::take(&mut n.children))
            .unwrap_or_default();
        for child in old {
            if let Some(node) = tree.node_mut(child) {
                node.parent = None;
            }
        }
        if !text.is_empty() {
            tree.push(el, NodeData::Text(text.to_string()));
        }
    }

    fn focus(&self, el: ElementId) {
        self.lock().active = Some(el);
    }

    fn active_element(&self) -> Option<ElementId> {
        self.lock().active
    }

    fn form_owner(&self, el: ElementId) -> Option<ElementId> {
        let tree = self.lock();
        if let Some(form_id) = tree.element(el).and_then(|e| e.attributes.get("form")) {
            return tree.elements().into_iter().find(|candidate| {
                tree.element(*candidate).is_some_and(|data| {
                    data.tag == "form" && data.attributes.get("id") == Some(form_id)
                })
            });
        }

        let mut current = Some(el);
        while let Some(id) = current {
            if tree.element(id).is_some_and(|data| data.tag == "form") {
                return Some(id);
            }
            current = tree.node(id).and_then(|n| n.parent);
        }
        None
    }

    fn dispatch_event(&self, target: ElementId, event: DomEvent) {
        self.lock().events.push((target, event));
    }

    fn evaluate(&self, function: &str, arg: Option<ElementId>) -> Result<Option<Value>, EvalError> {
        match &self.evaluator {
            Some(evaluator) => evaluator(function, arg),
            None => Err(EvalError::Unsupported),
        }
    }

    fn navigate(&self, url: &str) {
        self.lock().location = Some(url.to_string());
    }
}
