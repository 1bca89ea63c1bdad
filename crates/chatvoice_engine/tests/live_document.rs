use std::cell::RefCell;
use std::rc::Rc;

use chatvoice_engine::{DocumentObserver, DomError, LiveDocument, MutationRecord, ObserveOptions};
use pretty_assertions::assert_eq;
use scraper::Html;

#[derive(Default)]
struct Log {
    batches: Vec<Vec<MutationRecord>>,
    disconnected: bool,
}

struct Recorder(Rc<RefCell<Log>>);

impl DocumentObserver for Recorder {
    fn on_mutations(&mut self, _html: &Html, records: &[MutationRecord]) {
        self.0.borrow_mut().batches.push(records.to_vec());
    }

    fn disconnect(&mut self) {
        self.0.borrow_mut().disconnected = true;
    }
}

fn recorder() -> (Rc<RefCell<Log>>, Box<Recorder>) {
    let log = Rc::new(RefCell::new(Log::default()));
    (log.clone(), Box::new(Recorder(log)))
}

const PAGE: &str = r#"<html><body><div id="outer"><ul id="list"></ul></div><p id="other"></p></body></html>"#;

#[test]
fn appended_fragments_are_queryable() {
    let mut doc = LiveDocument::parse(PAGE);
    let list = doc.query_selector("#list").unwrap().unwrap();
    let added = doc
        .append_html(list, r#"<li class="item">one</li><li class="item">two</li>"#)
        .unwrap();
    assert_eq!(added.len(), 2);
    assert_eq!(doc.query_selector_all(".item").unwrap(), added);
    assert_eq!(doc.child_count(list), 2);
    let text: String = doc.element(added[1]).unwrap().text().collect();
    assert_eq!(text, "two");
}

#[test]
fn removed_nodes_disappear_from_queries() {
    let mut doc = LiveDocument::parse(PAGE);
    let list = doc.query_selector("#list").unwrap().unwrap();
    let added = doc.append_html(list, "<li>gone</li>").unwrap();
    doc.remove(added[0]).unwrap();
    assert!(!doc.is_connected(added[0]));
    assert!(doc.query_selector_all("li").unwrap().is_empty());
    assert_eq!(doc.remove(added[0]), Err(DomError::Detached(added[0])));
}

#[test]
fn records_are_scoped_to_the_observed_subtree() {
    let mut doc = LiveDocument::parse(PAGE);
    let outer = doc.query_selector("#outer").unwrap().unwrap();
    let list = doc.query_selector("#list").unwrap().unwrap();
    let other = doc.query_selector("#other").unwrap().unwrap();

    let (direct, direct_observer) = recorder();
    let (deep, deep_observer) = recorder();
    doc.observe(outer, ObserveOptions::default(), direct_observer);
    doc.observe(outer, ObserveOptions { subtree: true }, deep_observer);

    doc.append_html(list, "<li>a</li>").unwrap();
    doc.append_html(other, "<span>b</span>").unwrap();
    doc.append_html(outer, "<div>c</div>").unwrap();
    assert_eq!(doc.flush(), 3);

    let direct = direct.borrow();
    assert_eq!(direct.batches.len(), 1);
    assert_eq!(direct.batches[0].len(), 1);
    assert_eq!(direct.batches[0][0].target, outer);

    let deep = deep.borrow();
    assert_eq!(deep.batches.len(), 1);
    let targets: Vec<_> = deep.batches[0].iter().map(|r| r.target).collect();
    assert_eq!(targets, vec![list, outer]);
}

#[test]
fn clear_children_reports_every_removed_node() {
    let mut doc = LiveDocument::parse(PAGE);
    let list = doc.query_selector("#list").unwrap().unwrap();
    let added = doc.append_html(list, "<li>1</li><li>2</li>").unwrap();
    doc.flush();

    let (log, observer) = recorder();
    doc.observe(list, ObserveOptions::default(), observer);
    assert_eq!(doc.clear_children(list).unwrap(), 2);
    doc.flush();

    let log = log.borrow();
    assert_eq!(log.batches[0][0].removed, added);
    assert!(log.batches[0][0].added.is_empty());
}

#[test]
fn disconnect_stops_delivery_and_runs_hook() {
    let mut doc = LiveDocument::parse(PAGE);
    let body = doc.body().unwrap();
    let (log, observer) = recorder();
    let id = doc.observe(body, ObserveOptions { subtree: true }, observer);

    assert!(doc.disconnect(id));
    assert!(!doc.disconnect(id));
    doc.append_html(body, "<p>late</p>").unwrap();
    doc.flush();

    let log = log.borrow();
    assert!(log.disconnected);
    assert!(log.batches.is_empty());
}

#[test]
fn invalid_selector_is_an_error() {
    let doc = LiveDocument::parse(PAGE);
    assert!(matches!(doc.query_selector("li["), Err(DomError::Selector(_))));
}

#[test]
fn scope_is_judged_where_the_change_happened() {
    let mut doc = LiveDocument::parse(PAGE);
    let body = doc.body().unwrap();
    let outer = doc.query_selector("#outer").unwrap().unwrap();
    let list = doc.query_selector("#list").unwrap().unwrap();
    let (log, observer) = recorder();
    doc.observe(body, ObserveOptions { subtree: true }, observer);

    doc.append_html(list, "<li>a</li>").unwrap();
    doc.remove(list).unwrap();
    doc.remove(outer).unwrap();
    doc.append_html(list, "<li>detached</li>").unwrap();
    assert_eq!(doc.flush(), 4);

    let log = log.borrow();
    let targets: Vec<_> = log.batches[0].iter().map(|r| r.target).collect();
    assert_eq!(targets, vec![list, outer, body]);
    assert!(log.batches[0][0].is_within(body));
}

#[test]
fn removed_nodes_stay_in_the_arena() {
    let mut doc = LiveDocument::parse(PAGE);
    let list = doc.query_selector("#list").unwrap().unwrap();
    let before = doc.arena_len();

    for _ in 0..3 {
        let added = doc.append_html(list, "<li>x</li>").unwrap();
        doc.remove(added[0]).unwrap();
    }
    assert_eq!(doc.child_count(list), 0);
    assert_eq!(doc.arena_len(), before + 6);
}
