//! Accessibility Snapshot
//!
//! Walks the page depth-first and renders one line per visible element:
//!
//! ```text
//! - page "Title" [ref=page]
//!   - generic [ref=e1]
//!     - button "Save" [ref=e2]
//! ```
//!
//! Each build also produces a [`RefTable`] so later calls can address the
//! elements by ref without knowing anything about the DOM structure.

use std::collections::HashMap;

use crate::dom::{Dom, ElementId};

/// Ref of the page root, always resolvable to the body.
pub const PAGE_REF: &str = "page";

const NAME_LIMIT: usize = 50;
const HREF_LIMIT: usize = 50;

/// Tags that are never shown or interacted with.
const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "head", "meta", "link", "title", "base",
];

const TAG_ROLES: &[(&str, &str)] = &[
    ("button", "button"),
    ("a", "link"),
    ("textarea", "textbox"),
    ("select", "combobox"),
    ("option", "option"),
    ("h1", "heading"),
    ("h2", "heading"),
    ("h3", "heading"),
    ("h4", "heading"),
    ("h5", "heading"),
    ("h6", "heading"),
    ("ul", "list"),
    ("ol", "list"),
    ("li", "listitem"),
    ("table", "table"),
    ("tr", "row"),
    ("td", "cell"),
    ("th", "columnheader"),
    ("img", "image"),
    ("nav", "navigation"),
    ("main", "main"),
    ("header", "banner"),
    ("footer", "contentinfo"),
    ("aside", "complementary"),
    ("form", "form"),
    ("section", "region"),
    ("article", "article"),
];

const INPUT_ROLES: &[(&str, &str)] = &[
    ("text", "textbox"),
    ("password", "textbox"),
    ("email", "textbox"),
    ("number", "spinbutton"),
    ("checkbox", "checkbox"),
    ("radio", "radio"),
    ("button", "button"),
    ("submit", "button"),
    ("reset", "button"),
    ("range", "slider"),
    ("search", "searchbox"),
];

/// Ref to element mapping produced by one snapshot build.
#[derive(Debug, Default, Clone)]
pub struct RefTable {
    refs: HashMap<String, ElementId>,
}

impl RefTable {
    pub fn get(&self, reference: &str) -> Option<ElementId> {
        self.refs.get(reference).copied()
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }
}

/// Rendered tree text plus the refs it mentions.
#[derive(Debug)]
pub struct Snapshot {
    pub text: String,
    pub refs: RefTable,
}

pub struct SnapshotBuilder<'a> {
    dom: &'a dyn Dom,
    lines: Vec<String>,
    refs: HashMap<String, ElementId>,
    counter: usize,
}

impl<'a> SnapshotBuilder<'a> {
    pub fn new(dom: &'a dyn Dom) -> Self {
        Self {
            dom,
            lines: Vec::new(),
            refs: HashMap::new(),
            counter: 0,
        }
    }

    pub fn build(mut self) -> Snapshot {
        let title = self.dom.title();
        let title = if title.is_empty() { "Untitled".to_string() } else { escape(&title) };
        self.lines.push(format!("- page \"{}\" [ref={}]", title, PAGE_REF));

        if let Some(body) = self.dom.body() {
            self.visit(body, 1);
        }

        Snapshot {
            text: self.lines.join("\n"),
            refs: RefTable { refs: self.refs },
        }
    }

    fn visit(&mut self, el: ElementId, depth: usize) {
        let tag = self.dom.tag_name(el);
        if SKIPPED_TAGS.contains(&tag.as_str())
            || self.dom.computed_style(el).is_hidden()
            || !self.dom.bounding_rect(el).has_area()
        {
            return;
        }

        self.counter += 1;
        let reference = format!("e{}", self.counter);
        self.refs.insert(reference.clone(), el);

        let mut line = format!("{}- {}", "  ".repeat(depth), self.role(el, &tag));
        let name = self.name(el, &tag);
        if !name.is_empty() {
            line.push_str(&format!(" \"{}\"", name));
        }
        let attrs = self.attributes(el, &tag);
        if !attrs.is_empty() {
            line.push(' ');
            line.push_str(&attrs.join(" "));
        }
        line.push_str(&format!(" [ref={}]", reference));
        self.lines.push(line);

        for child in self.dom.children(el) {
            self.visit(child, depth + 1);
        }
    }

    fn role(&self, el: ElementId, tag: &str) -> String {
        if let Some(role) = self.dom.attribute(el, "role").filter(|r| !r.is_empty()) {
            return role;
        }
        let role = if tag == "input" {
            let kind = self
                .dom
                .attribute(el, "type")
                .unwrap_or_else(|| "text".to_string())
                .to_ascii_lowercase();
            lookup(INPUT_ROLES, &kind).unwrap_or("textbox")
        } else {
            lookup(TAG_ROLES, tag).unwrap_or("generic")
        };
        role.to_string()
    }

    fn name(&self, el: ElementId, tag: &str) -> String {
        let raw = self.raw_name(el, tag);
        escape(&collapse_whitespace(&raw))
    }

    fn raw_name(&self, el: ElementId, tag: &str) -> String {
        if let Some(label) = self.dom.attribute(el, "aria-label").filter(|l| !l.is_empty()) {
            return label;
        }

        match tag {
            "input" | "textarea" | "select" => {
                let labelled = self
                    .dom
                    .attribute(el, "id")
                    .filter(|id| !id.is_empty())
                    .and_then(|id| self.dom.label_for(&id));
                if let Some(label) = labelled {
                    return self.dom.text_content(label).trim().to_string();
                }
                self.dom
                    .attribute(el, "placeholder")
                    .unwrap_or_default()
            }
            "button" | "a" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                truncate(self.dom.text_content(el).trim(), NAME_LIMIT)
            }
            "img" => self.dom.attribute(el, "alt").unwrap_or_default(),
            "li" => {
                let text = self.dom.text_content(el);
                let text = text.trim();
                if text.chars().count() < NAME_LIMIT && self.dom.children(el).is_empty() {
                    text.to_string()
                } else {
                    String::new()
                }
            }
            _ => String::new(),
        }
    }

    fn attributes(&self, el: ElementId, tag: &str) -> Vec<String> {
        let mut attrs = Vec::new();
        match tag {
            "input" => {
                if let Some(placeholder) = self.dom.attribute(el, "placeholder").filter(|p| !p.is_empty()) {
                    attrs.push(format!("[placeholder=\"{}\"]", escape(&placeholder)));
                }
                if self.dom.is_disabled(el) {
                    attrs.push("[disabled]".to_string());
                }
                if self.dom.is_checked(el) {
                    attrs.push("[checked]".to_string());
                }
            }
            "a" => {
                if let Some(href) = self
                    .dom
                    .attribute(el, "href")
                    .filter(|h| !h.is_empty() && h.chars().count() < HREF_LIMIT)
                {
                    attrs.push(format!("[href=\"{}\"]", escape(&href)));
                }
            }
            _ => {}
        }
        attrs
    }
}

fn lookup(table: &[(&str, &'static str)], key: &str) -> Option<&'static str> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

fn truncate(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn escape(text: &str) -> String {
    text.replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{MemoryDom, Rect};

    fn build(dom: &MemoryDom) -> Snapshot {
        SnapshotBuilder::new(dom).build()
    }

    #[test]
    fn test_empty_page() {
        let dom = MemoryDom::new("");
        let snapshot = build(&dom);
        assert_eq!(snapshot.text, "- page \"Untitled\" [ref=page]\n  - generic [ref=e1]");
        assert_eq!(snapshot.refs.get("e1"), Some(dom.body_id()));
    }

    #[test]
    fn test_roles_names_and_attributes() {
        let dom = MemoryDom::new("Login");
        let body = dom.body_id();
        let h1 = dom.append_element(body, "h1");
        dom.append_text(h1, "  Welcome\n back ");
        let label = dom.append_element(body, "label");
        dom.set_attribute(label, "for", "user");
        dom.append_text(label, "Username");
        let user = dom.append_element(body, "input");
        dom.set_attribute(user, "id", "user");
        dom.set_attribute(user, "placeholder", "name");
        let agree = dom.append_element(body, "input");
        dom.set_attribute(agree, "type", "checkbox");
        dom.set_attribute(agree, "checked", "");
        dom.set_attribute(agree, "disabled", "");
        let link = dom.append_element(body, "a");
        dom.set_attribute(link, "href", "/help");
        dom.append_text(link, "Say \"hi\"");
        let custom = dom.append_element(body, "div");
        dom.set_attribute(custom, "role", "dialog");
        dom.set_attribute(custom, "aria-label", "Prompt");

        let text = build(&dom).text;
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[2], "    - heading \"Welcome back\" [ref=e2]");
        assert_eq!(lines[3], "    - generic [ref=e3]");
        assert_eq!(lines[4], "    - textbox \"Username\" [placeholder=\"name\"] [ref=e4]");
        assert_eq!(lines[5], "    - checkbox [disabled] [checked] [ref=e5]");
        assert_eq!(lines[6], "    - link \"Say \\\"hi\\\"\" [href=\"/help\"] [ref=e6]");
        assert_eq!(lines[7], "    - dialog \"Prompt\" [ref=e7]");
    }

    #[test]
    fn test_hidden_and_skipped_subtrees() {
        let dom = MemoryDom::new("Hidden");
        let body = dom.body_id();
        let hidden = dom.append_element(body, "div");
        dom.set_style(hidden, "none", "visible");
        dom.append_element(hidden, "button");
        let invisible = dom.append_element(body, "div");
        dom.set_style(invisible, "block", "hidden");
        let empty = dom.append_element(body, "span");
        dom.set_rect(empty, Rect::new(0.0, 0.0, 0.0, 10.0));
        dom.append_element(body, "script");
        let shown = dom.append_element(body, "button");

        let snapshot = build(&dom);
        assert_eq!(snapshot.refs.len(), 2);
        assert_eq!(snapshot.refs.get("e2"), Some(shown));
    }

    #[test]
    fn test_list_item_names() {
        let dom = MemoryDom::new("List");
        let ul = dom.append_element(dom.body_id(), "ul");
        let simple = dom.append_element(ul, "li");
        dom.append_text(simple, "First");
        let nested = dom.append_element(ul, "li");
        let span = dom.append_element(nested, "span");
        dom.append_text(span, "Second");
        let long = dom.append_element(ul, "li");
        dom.append_text(long, &"x".repeat(60));

        let text = build(&dom).text;
        assert!(text.contains("- listitem \"First\" [ref=e3]"));
        assert!(text.contains("- listitem [ref=e4]"));
        assert!(text.contains("- listitem [ref=e6]"));
    }

    #[test]
    fn test_button_text_truncated() {
        let dom = MemoryDom::new("T");
        let button = dom.append_element(dom.body_id(), "button");
        dom.append_text(button, &"b".repeat(80));
        let text = build(&dom).text;
        assert!(text.contains(&format!("- button \"{}\" [ref=e2]", "b".repeat(50))));
    }

    #[test]
    fn test_input_type_roles() {
        let dom = MemoryDom::new("T");
        for kind in ["number", "range", "search", "submit", "color"] {
            let input = dom.append_element(dom.body_id(), "input");
            dom.set_attribute(input, "type", kind);
        }
        let text = build(&dom).text;
        let roles: Vec<_> = text
            .lines()
            .skip(2)
            .map(|l| l.trim().split(' ').nth(1).unwrap().to_string())
            .collect();
        assert_eq!(roles, vec!["spinbutton", "slider", "searchbox", "button", "textbox"]);
    }
}
