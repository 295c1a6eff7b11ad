//! Snapshot ref round-trip tests

use std::collections::HashSet;
use std::sync::Arc;

use nw_client::{Dom, ElementId, MemoryDom, Session};
use regex::Regex;

fn sample_page() -> Arc<MemoryDom> {
    let dom = Arc::new(MemoryDom::new("Settings"));
    let body = dom.body_id();
    let nav = dom.append_element(body, "nav");
    for label in ["Home", "Profile", "Logout"] {
        let a = dom.append_element(nav, "a");
        dom.set_attribute(a, "href", &format!("/{}", label.to_lowercase()));
        dom.append_text(a, label);
    }
    let form = dom.append_element(body, "form");
    let email = dom.append_element(form, "input");
    dom.set_attribute(email, "type", "email");
    dom.set_attribute(email, "placeholder", "you@example.com");
    let save = dom.append_element(form, "button");
    dom.append_text(save, "Save");
    dom
}

fn refs_in(text: &str) -> Vec<String> {
    let re = Regex::new(r"\[ref=([^\]]+)\]").unwrap();
    re.captures_iter(text).map(|c| c[1].to_string()).collect()
}

#[test]
fn test_every_ref_in_text_resolves() {
    let dom = sample_page();
    let session = Session::new(dom.clone());
    let text = session.snapshot();

    let refs = refs_in(&text);
    assert_eq!(refs.first().map(String::as_str), Some("page"));
    let unique: HashSet<_> = refs.iter().collect();
    assert_eq!(unique.len(), refs.len());

    let resolved: Vec<ElementId> = refs.iter().map(|r| session.resolve(r).unwrap()).collect();
    assert_eq!(resolved[0], dom.body_id());
    assert_eq!(resolved[1], dom.body_id());
    assert_eq!(session.current().len(), refs.len() - 1);
}

#[test]
fn test_lines_follow_document_order() {
    let dom = sample_page();
    let session = Session::new(dom.clone());
    let text = session.snapshot();

    let expected = "\
- page \"Settings\" [ref=page]
  - generic [ref=e1]
    - navigation [ref=e2]
      - link \"Home\" [href=\"/home\"] [ref=e3]
      - link \"Profile\" [href=\"/profile\"] [ref=e4]
      - link \"Logout\" [href=\"/logout\"] [ref=e5]
    - form [ref=e6]
      - textbox \"you@example.com\" [placeholder=\"you@example.com\"] [ref=e7]
      - button \"Save\" [ref=e8]";
    assert_eq!(text, expected);

    let save = session.resolve("e8").unwrap();
    assert_eq!(dom.tag_name(save), "button");
}

#[test]
fn test_refs_from_previous_snapshot_go_stale() {
    let dom = Arc::new(MemoryDom::new("Stale"));
    let body = dom.body_id();
    let items: Vec<_> = (0..4).map(|_| dom.append_element(body, "button")).collect();
    let session = Session::new(dom.clone());

    let before = refs_in(&session.snapshot());
    assert!(before.contains(&"e5".to_string()));

    dom.remove(items[3]);
    dom.remove(items[2]);
    let after = refs_in(&session.snapshot());

    assert!(!after.contains(&"e5".to_string()));
    assert_eq!(session.resolve("e5"), None);
    assert_eq!(session.resolve("e4"), None);
    assert_eq!(session.resolve("e3"), Some(items[1]));
}
