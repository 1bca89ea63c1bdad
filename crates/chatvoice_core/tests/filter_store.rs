use chatvoice_core::{
    Command, CommandOptions, CommandRule, FilterCollection, FilterRule, FilterStoreError,
    FilterTarget, FilterUpdate, NewFilter, PatternRule,
};
use pretty_assertions::assert_eq;

fn replace(pattern: &str, replacement: &str) -> NewFilter {
    NewFilter {
        enabled: true,
        target: FilterTarget::Output,
        field_name: None,
        description: None,
        rule: FilterRule::Pattern(PatternRule {
            is_regex: false,
            pattern: pattern.into(),
            replacement: replacement.into(),
            flags: None,
        }),
    }
}

fn ids(collection: &FilterCollection) -> Vec<u64> {
    collection.filters.iter().map(|f| f.id).collect()
}

fn collection_of(n: usize) -> FilterCollection {
    let mut collection = FilterCollection::new();
    for i in 0..n {
        collection.add(replace(&format!("p{i}"), "")).unwrap();
    }
    collection
}

#[test]
fn add_assigns_increasing_ids() {
    let collection = collection_of(3);
    assert_eq!(ids(&collection), vec![1, 2, 3]);
    assert_eq!(collection.next_id, 4);
}

#[test]
fn removed_ids_are_never_reused() {
    let mut collection = collection_of(3);
    collection.remove(3).unwrap();
    let added = collection.add(replace("x", "y")).unwrap();
    assert_eq!(added.id, 4);
    assert_eq!(ids(&collection), vec![1, 2, 4]);
    assert_eq!(collection.remove(3), Err(FilterStoreError::NotFound(3)));
}

#[test]
fn field_target_requires_field_name() {
    let mut collection = FilterCollection::new();
    let mut draft = replace("a", "b");
    draft.target = FilterTarget::Field;
    assert_eq!(collection.add(draft.clone()), Err(FilterStoreError::MissingFieldName));
    assert_eq!(collection.next_id, 1);

    draft.field_name = Some("body".into());
    let added = collection.add(draft).unwrap();
    assert_eq!(added.field_name.as_deref(), Some("body"));
}

#[test]
fn update_replaces_selected_fields_only() {
    let mut collection = collection_of(2);
    collection
        .update(
            2,
            FilterUpdate {
                enabled: Some(false),
                description: Some(Some("quiet".into())),
                ..FilterUpdate::default()
            },
        )
        .unwrap();

    let updated = collection.get(2).unwrap();
    assert!(!updated.enabled);
    assert_eq!(updated.description.as_deref(), Some("quiet"));
    assert_eq!(updated.rule, replace("p1", "").rule);
    assert!(collection.get(1).unwrap().enabled);
}

#[test]
fn update_rejects_field_target_without_name() {
    let mut collection = collection_of(1);
    let result = collection.update(
        1,
        FilterUpdate {
            target: Some(FilterTarget::Field),
            ..FilterUpdate::default()
        },
    );
    assert_eq!(result, Err(FilterStoreError::MissingFieldName));
    assert_eq!(collection.get(1).unwrap().target, FilterTarget::Output);
    assert_eq!(
        collection.update(9, FilterUpdate::default()),
        Err(FilterStoreError::NotFound(9))
    );
}

#[test]
fn reorder_moves_by_id() {
    let mut collection = collection_of(4);
    collection.reorder(1, 3).unwrap();
    assert_eq!(ids(&collection), vec![2, 3, 1, 4]);
    collection.reorder(4, 2).unwrap();
    assert_eq!(ids(&collection), vec![4, 2, 3, 1]);
    assert_eq!(collection.reorder(4, 42), Err(FilterStoreError::NotFound(42)));
    assert_eq!(ids(&collection), vec![4, 2, 3, 1]);
}

#[test]
fn scoped_views_follow_stored_order() {
    let mut collection = FilterCollection::new();
    collection.add(replace("out", "")).unwrap();
    let mut field = replace("body", "");
    field.target = FilterTarget::Field;
    field.field_name = Some("body".into());
    collection.add(field).unwrap();
    let mut off = replace("off", "");
    off.enabled = false;
    collection.add(off).unwrap();
    collection.add(replace("out2", "")).unwrap();

    let output: Vec<_> = collection.output_filters().iter().map(|f| f.id).collect();
    assert_eq!(output, vec![1, 4]);
    let body: Vec<_> = collection.field_filters("body").iter().map(|f| f.id).collect();
    assert_eq!(body, vec![2]);
    assert!(collection.field_filters("name").is_empty());
}

#[test]
fn json_import_recomputes_next_id() {
    let mut collection = collection_of(2);
    collection.add(NewFilter {
        enabled: true,
        target: FilterTarget::Output,
        field_name: None,
        description: Some("drop links".into()),
        rule: FilterRule::Command(CommandRule {
            command: Command::Mute,
            is_regex: true,
            pattern: Some("https?://".into()),
            options: CommandOptions::default(),
        }),
    })
    .unwrap();
    collection.remove(1).unwrap();

    let imported = FilterCollection::from_json(&collection.to_json()).unwrap();
    assert_eq!(imported.filters, collection.filters);
    assert_eq!(imported.next_id, 4);

    let empty = FilterCollection::from_json("[]").unwrap();
    assert_eq!(empty.next_id, 1);
}

#[test]
fn json_import_validates() {
    let duplicate = r#"[
        {"id": 5, "enabled": true, "target": "output", "type": "pattern", "pattern": "a", "replacement": ""},
        {"id": 5, "enabled": true, "target": "output", "type": "pattern", "pattern": "b", "replacement": ""}
    ]"#;
    assert_eq!(
        FilterCollection::from_json(duplicate),
        Err(FilterStoreError::DuplicateId(5))
    );

    let unnamed = r#"[{"id": 1, "enabled": true, "target": "field", "type": "pattern", "pattern": "a", "replacement": ""}]"#;
    assert_eq!(
        FilterCollection::from_json(unnamed),
        Err(FilterStoreError::MissingFieldName)
    );

    assert!(matches!(
        FilterCollection::from_json("{not json"),
        Err(FilterStoreError::InvalidJson(_))
    ));
}

#[test]
fn stale_stored_counter_never_reuses_an_id() {
    let json = r#"{"filters":[{"id":1,"enabled":true,"target":"output","type":"pattern","pattern":"a","replacement":""},{"id":4,"enabled":true,"target":"output","type":"pattern","pattern":"b","replacement":""}],"nextId":1}"#;
    let mut collection: FilterCollection = serde_json::from_str(json).unwrap();

    let added = collection.add(replace("c", "")).unwrap();
    assert_eq!(added.id, 5);
    assert_eq!(ids(&collection), vec![1, 4, 5]);
    assert_eq!(collection.next_id, 6);
}
