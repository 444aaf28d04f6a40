//! Property tests for list ordering and key renames

use proptest::prelude::*;
use qb_document::{DocPath, Document, EditOp, Node, RenameCollisionPolicy, Shape};
use serde_json::{json, Value};

#[derive(Debug, Clone)]
enum ListStep {
    Add(String),
    Remove(usize),
    Update(usize, String),
}

fn list_step() -> impl Strategy<Value = ListStep> {
    prop_oneof![
        "[a-z]{1,4}".prop_map(ListStep::Add),
        (0usize..12).prop_map(ListStep::Remove),
        ((0usize..12), "[A-Z]{1,4}").prop_map(|(i, s)| ListStep::Update(i, s)),
    ]
}

fn steps_doc(items: &[String]) -> Document {
    let shape = Shape::record([("steps", Shape::list(Shape::Text))]);
    Document::decode(&shape, &json!({ "steps": items }))
}

proptest! {
    /// List edits behave exactly like the same edits on a plain vector
    #[test]
    fn list_ops_match_vector_model(
        initial in prop::collection::vec("[a-z]{1,4}", 0..8),
        ops in prop::collection::vec(list_step(), 0..24),
    ) {
        let path = DocPath::single("steps");
        let mut doc = steps_doc(&initial);
        let mut model = initial.clone();

        for step in ops {
            match step {
                ListStep::Add(s) => {
                    doc = doc.apply(&EditOp::AddListItem { path: path.clone(), value: Node::text(s.clone()) }).unwrap();
                    model.push(s);
                }
                ListStep::Remove(i) => {
                    doc = doc.apply(&EditOp::RemoveListItem { path: path.clone(), index: i }).unwrap();
                    if i < model.len() {
                        model.remove(i);
                    }
                }
                ListStep::Update(i, s) => {
                    let result = doc.apply(&EditOp::UpdateListItem { path: path.clone(), index: i, value: Node::text(s.clone()) });
                    if i < model.len() {
                        doc = result.unwrap();
                        model[i] = s;
                    } else {
                        prop_assert!(result.is_err());
                    }
                }
            }
        }

        let expected: Vec<Value> = model.into_iter().map(Value::String).collect();
        prop_assert_eq!(doc.get(&path).unwrap().to_json(), Value::Array(expected));
    }

    /// A non-colliding rename moves the value to the new key in place
    #[test]
    fn rename_keeps_value_and_position(
        keys in prop::collection::btree_set("[a-z]{1,6}", 1..8),
        pick in any::<prop::sample::Index>(),
        new_key in "[A-Z]{1,6}",
    ) {
        let keys: Vec<String> = keys.into_iter().collect();
        let entries: serde_json::Map<String, Value> = keys
            .iter()
            .enumerate()
            .map(|(i, k)| (k.clone(), json!(format!("{i} hours"))))
            .collect();
        let shape = Shape::record([("breakdown", Shape::map(Shape::Duration))]);
        let doc = Document::decode(&shape, &json!({ "breakdown": entries }));
        let path = DocPath::single("breakdown");

        let idx = pick.index(keys.len());
        let old = keys[idx].clone();
        let renamed = doc
            .apply(&EditOp::RenameMapKey {
                path: path.clone(),
                from: old.clone(),
                to: new_key.clone(),
                policy: RenameCollisionPolicy::Reject,
            })
            .unwrap();

        let map = renamed.get(&path).unwrap().as_entries().unwrap().clone();
        prop_assert!(!map.contains_key(&old));
        prop_assert_eq!(map.get_index_of(&new_key), Some(idx));
        prop_assert_eq!(map[&new_key].to_json(), json!(format!("{idx} hours")));
        prop_assert_eq!(map.len(), keys.len());
    }
}
