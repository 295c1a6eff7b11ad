//! Event synthesis
//!
//! Turns high-level interactions (click, type, key press) into the DOM
//! event sequences a page would see from a real user.

use std::sync::Arc;

use serde::Deserialize;

use crate::dom::{Dom, DomEvent, ElementId};
use crate::keys;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    #[default]
    Left,
    Middle,
    Right,
}

impl MouseButton {
    /// `MouseEvent.button` value.
    pub fn code(self) -> u8 {
        match self {
            MouseButton::Left => 0,
            MouseButton::Middle => 1,
            MouseButton::Right => 2,
        }
    }
}

pub struct EventSynthesizer {
    dom: Arc<dyn Dom>,
}

impl EventSynthesizer {
    pub fn new(dom: Arc<dyn Dom>) -> Self {
        Self { dom }
    }

    /// Focus, then mousedown/mouseup/click at the element's center. A double
    /// click repeats the sequence and finishes with `dblclick`.
    pub fn click(&self, el: ElementId, button: MouseButton, double: bool) {
        self.dom.focus(el);
        let (x, y) = self.dom.bounding_rect(el).center();
        let button = button.code();

        let mut sequence = vec!["mousedown", "mouseup", "click"];
        if double {
            sequence.extend(["mousedown", "mouseup", "click", "dblclick"]);
        }
        for event_type in sequence {
            self.dom.dispatch_event(
                el,
                DomEvent::Mouse {
                    event_type,
                    client_x: x,
                    client_y: y,
                    button,
                },
            );
        }
    }

    pub fn type_text(&self, el: ElementId, text: &str, slowly: bool, submit: bool) {
        self.dom.focus(el);

        if slowly {
            for c in text.chars() {
                let key = c.to_string();
                self.dispatch_key(el, "keydown", &key);
                self.dispatch_key(el, "keypress", &key);
                self.append_char(el, c);
                self.dispatch_key(el, "keyup", &key);
                self.dom.dispatch_event(el, DomEvent::Input);
            }
            self.dom.dispatch_event(el, DomEvent::Change);
        } else {
            if self.dom.value(el).is_some() {
                self.dom.set_value(el, text);
            } else if self.dom.is_content_editable(el) {
                self.dom.set_text_content(el, text);
            }
            self.dispatch_input(el);
        }

        if submit {
            self.press_key("Enter", Some(el));
        }
    }

    /// Key down/press/up on `target`, the focused element, or the body.
    /// Enter also submits the target's form.
    pub fn press_key(&self, key: &str, target: Option<ElementId>) {
        let Some(target) = target
            .or_else(|| self.dom.active_element())
            .or_else(|| self.dom.body())
        else {
            return;
        };

        for event_type in ["keydown", "keypress", "keyup"] {
            self.dispatch_key(target, event_type, key);
        }

        if key == "Enter" {
            if let Some(form) = self.dom.form_owner(target) {
                self.dom.dispatch_event(form, DomEvent::Submit);
            }
        }
    }

    /// `input` followed by `change`.
    pub fn dispatch_input(&self, el: ElementId) {
        self.dom.dispatch_event(el, DomEvent::Input);
        self.dom.dispatch_event(el, DomEvent::Change);
    }

    fn append_char(&self, el: ElementId, c: char) {
        if let Some(mut value) = self.dom.value(el) {
            value.push(c);
            self.dom.set_value(el, &value);
        } else if self.dom.is_content_editable(el) {
            let mut text = self.dom.text_content(el);
            text.push(c);
            self.dom.set_text_content(el, &text);
        }
    }

    fn dispatch_key(&self, el: ElementId, event_type: &'static str, key: &str) {
        self.dom.dispatch_event(
            el,
            DomEvent::Key {
                event_type,
                key: key.to_string(),
                code: keys::key_code_name(key),
                key_code: keys::key_code(key),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{MemoryDom, Rect};

    fn setup() -> (Arc<MemoryDom>, EventSynthesizer) {
        let dom = Arc::new(MemoryDom::new("Events"));
        let synth = EventSynthesizer::new(dom.clone());
        (dom, synth)
    }

    #[test]
    fn test_click_uses_center_and_button() {
        let (dom, synth) = setup();
        let button = dom.append_element(dom.body_id(), "button");
        dom.set_rect(button, Rect::new(10.0, 20.0, 100.0, 40.0));

        synth.click(button, MouseButton::Right, false);

        let events = dom.events();
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[2].1,
            DomEvent::Mouse {
                event_type: "click",
                client_x: 60.0,
                client_y: 40.0,
                button: 2
            }
        );
        assert_eq!(dom.active_element(), Some(button));
    }

    #[test]
    fn test_double_click_sequence() {
        let (dom, synth) = setup();
        let div = dom.append_element(dom.body_id(), "div");
        synth.click(div, MouseButton::Left, true);
        assert_eq!(
            dom.event_types(div),
            vec!["mousedown", "mouseup", "click", "mousedown", "mouseup", "click", "dblclick"]
        );
    }

    #[test]
    fn test_type_instant_sets_value() {
        let (dom, synth) = setup();
        let input = dom.append_element(dom.body_id(), "input");
        synth.type_text(input, "hello", false, false);
        assert_eq!(dom.value(input).as_deref(), Some("hello"));
        assert_eq!(dom.event_types(input), vec!["input", "change"]);
    }

    #[test]
    fn test_type_slowly_per_character() {
        let (dom, synth) = setup();
        let input = dom.append_element(dom.body_id(), "input");
        dom.set_attribute(input, "value", "x");
        synth.type_text(input, "ab", true, false);

        assert_eq!(dom.value(input).as_deref(), Some("xab"));
        assert_eq!(
            dom.event_types(input),
            vec![
                "keydown", "keypress", "keyup", "input", "keydown", "keypress", "keyup", "input",
                "change"
            ]
        );
    }

    #[test]
    fn test_type_into_content_editable() {
        let (dom, synth) = setup();
        let div = dom.append_element(dom.body_id(), "div");
        dom.set_attribute(div, "contenteditable", "true");
        dom.append_text(div, "old");
        synth.type_text(div, "new", false, false);
        assert_eq!(dom.text_content(div), "new");
    }

    #[test]
    fn test_submit_fires_on_form() {
        let (dom, synth) = setup();
        let form = dom.append_element(dom.body_id(), "form");
        let input = dom.append_element(form, "input");

        synth.type_text(input, "query", false, true);

        assert_eq!(dom.event_types(form), vec!["submit"]);
        let keys: Vec<_> = dom
            .events()
            .into_iter()
            .filter_map(|(_, e)| match e {
                DomEvent::Key { key, key_code, .. } => Some((key, key_code)),
                _ => None,
            })
            .collect();
        assert_eq!(keys.len(), 3);
        assert_eq!(keys[0], ("Enter".to_string(), 13));
    }

    #[test]
    fn test_press_key_defaults_to_body() {
        let (dom, synth) = setup();
        synth.press_key("Escape", None);
        assert_eq!(dom.event_types(dom.body_id()), vec!["keydown", "keypress", "keyup"]);
    }
}
