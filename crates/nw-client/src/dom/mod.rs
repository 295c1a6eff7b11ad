//! DOM access
//!
//! The snapshot engine and event synthesis only see the page through the
//! [`Dom`] trait. A real embedding implements it against the live document;
//! [`MemoryDom`] is an in-process tree for headless use and tests.

mod memory;

pub use memory::MemoryDom;

use serde_json::Value;
use thiserror::Error;

/// Handle to a node owned by a [`Dom`] implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Text,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputedStyle {
    pub display: String,
    pub visibility: String,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: "block".to_string(),
            visibility: "visible".to_string(),
        }
    }
}

impl ComputedStyle {
    pub fn is_hidden(&self) -> bool {
        self.display == "none" || self.visibility == "hidden"
    }
}

/// Bounding client rect in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// A synthetic event. All of them bubble and are cancelable.
#[derive(Debug, Clone, PartialEq)]
pub enum DomEvent {
    Mouse {
        event_type: &'static str,
        client_x: f64,
        client_y: f64,
        button: u8,
    },
    Key {
        event_type: &'static str,
        key: String,
        code: String,
        key_code: u32,
    },
    Input,
    Change,
    Submit,
}

impl DomEvent {
    pub fn event_type(&self) -> &str {
        match self {
            DomEvent::Mouse { event_type, .. } | DomEvent::Key { event_type, .. } => event_type,
            DomEvent::Input => "input",
            DomEvent::Change => "change",
            DomEvent::Submit => "submit",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("Failed to parse function: {0}")]
    Parse(String),

    #[error("Function execution failed: {0}")]
    Execution(String),

    #[error("Evaluation is not supported by this page")]
    Unsupported,
}

/// Read and mutate the controlled page.
///
/// Element-only methods may be called with any id returned by the same
/// implementation; implementations return neutral values (empty strings,
/// `None`, `false`) for ids that no longer exist.
pub trait Dom: Send + Sync {
    fn title(&self) -> String;

    /// Root container of the page, if the document has one.
    fn body(&self) -> Option<ElementId>;

    fn node_kind(&self, node: ElementId) -> NodeKind;

    /// All child nodes in document order, text nodes included.
    fn child_nodes(&self, node: ElementId) -> Vec<ElementId>;

    /// Lowercase tag name.
    fn tag_name(&self, el: ElementId) -> String;

    fn attribute(&self, el: ElementId, name: &str) -> Option<String>;

    fn text_content(&self, node: ElementId) -> String;

    /// Rendered text, excluding hidden subtrees.
    fn inner_text(&self, el: ElementId) -> String;

    fn computed_style(&self, el: ElementId) -> ComputedStyle;

    fn bounding_rect(&self, el: ElementId) -> Rect;

    /// First `<label for="id">` in document order.
    fn label_for(&self, id: &str) -> Option<ElementId>;

    fn is_disabled(&self, el: ElementId) -> bool;

    fn is_checked(&self, el: ElementId) -> bool;

    fn set_checked(&self, el: ElementId, checked: bool);

    /// Current value for form controls, `None` for elements without one.
    fn value(&self, el: ElementId) -> Option<String>;

    /// Assign the value; ignored for elements without one.
    fn set_value(&self, el: ElementId, value: &str);

    fn is_content_editable(&self, el: ElementId) -> bool;

    fn set_text_content(&self, el: ElementId, text: &str);

    fn focus(&self, el: ElementId);

    fn active_element(&self) -> Option<ElementId>;

    /// The element's form: its `form` attribute target or closest ancestor.
    fn form_owner(&self, el: ElementId) -> Option<ElementId>;

    fn dispatch_event(&self, target: ElementId, event: DomEvent);

    /// Evaluate a function source, passing `arg` when given.
    ///
    /// `Ok(None)` stands for an `undefined` result.
    fn evaluate(&self, function: &str, arg: Option<ElementId>) -> Result<Option<Value>, EvalError>;

    fn navigate(&self, url: &str);

    /// Element children only.
    fn children(&self, node: ElementId) -> Vec<ElementId> {
        self.child_nodes(node)
            .into_iter()
            .filter(|child| self.node_kind(*child) == NodeKind::Element)
            .collect()
    }
}
