use piglet::{ComponentDefinition, Runtime, RuntimeOptions, TreeNode};
use serde_json::{json, Value};
use std::collections::BTreeSet;

fn shop(rt: &Runtime) {
    rt.define(
        ComponentDefinition::new("Shop")
            .root()
            .template("<section><product-list></product-list></section><cart-summary></cart-summary>")
            .setup(|c| {
                c.state("currency", "EUR");
            }),
    );
    rt.define(
        ComponentDefinition::new("ProductList")
            .template("<product-card></product-card><product-card></product-card>")
            .setup(|c| {
                c.state("page", 1);
            }),
    );
    rt.define(ComponentDefinition::new("ProductCard").template("<h2>item</h2>"));
    rt.define(ComponentDefinition::new("CartSummary").template("<p>0 items</p>"));
}

/// Ids depend on walk order; compare them separately.
fn strip_ids(value: &mut Value) {
    if let Some(obj) = value.as_object_mut() {
        obj.remove("componentId");
        if let Some(children) = obj.get_mut("children").and_then(Value::as_array_mut) {
            children.iter_mut().for_each(strip_ids);
        }
    }
}

fn ids(node: &TreeNode, out: &mut Vec<u64>) {
    out.push(node.component_id);
    for child in &node.children {
        ids(child, out);
    }
}

#[test]
fn test_root_snapshot_serializes_the_whole_tree() {
    let rt = Runtime::default();
    shop(&rt);
    rt.mount("piglet-root").unwrap();

    let mut tree = rt.tracker().to_json("Shop0").unwrap();
    assert_eq!(tree["componentId"], json!(0));
    strip_ids(&mut tree);
    assert_eq!(
        tree,
        json!({
            "tag": "piglet-root",
            "componentName": "Shop",
            "key": "Shop0",
            "state": {"currency": "EUR"},
            "children": [
                {
                    "tag": "product-list",
                    "componentName": "ProductList",
                    "key": "ProductList1",
                    "state": {"page": 1},
                    "children": [
                        {"tag": "product-card", "componentName": "ProductCard", "key": "ProductCard2", "state": {}, "children": []},
                        {"tag": "product-card", "componentName": "ProductCard", "key": "ProductCard3", "state": {}, "children": []}
                    ]
                },
                {"tag": "cart-summary", "componentName": "CartSummary", "key": "CartSummary4", "state": {}, "children": []}
            ]
        })
    );

    let mut all = Vec::new();
    ids(&rt.tracker().snapshot("Shop0").unwrap(), &mut all);
    let distinct: BTreeSet<u64> = all.iter().copied().collect();
    assert_eq!(distinct.len(), 5);
    assert_eq!(all.iter().filter(|&&id| id == 0).count(), 1);
}

#[test]
fn test_removals_rewalk_every_enclosing_snapshot() {
    let rt = Runtime::default();
    shop(&rt);
    let shop = rt.mount("piglet-root").unwrap();
    let list = shop.children()[0].clone();
    let card = list.children()[1].clone();

    rt.remove_child(list.shadow_root().unwrap(), card.element()).unwrap();

    assert_eq!(rt.tracker().snapshot("ProductList1").unwrap().children.len(), 1);
    assert_eq!(rt.tracker().snapshot("Shop0").unwrap().size(), 4);
    assert!(rt.tracker().snapshot("Shop0").unwrap().find("ProductCard3").is_none());
}

#[test]
fn test_state_is_read_at_walk_time() {
    let rt = Runtime::default();
    shop(&rt);
    let shop = rt.mount("piglet-root").unwrap();

    shop.state("currency", "EUR").set("USD");
    rt.tick();
    // state changes alone do not re-walk
    assert_eq!(rt.tracker().snapshot("Shop0").unwrap().state["currency"], json!("EUR"));

    let fresh = rt.tracker().refresh(&rt, &shop);
    assert_eq!(fresh.state["currency"], json!("USD"));
}

#[test]
fn test_tracking_can_be_switched_off() {
    let rt = Runtime::new(RuntimeOptions {
        track_tree: false,
        ..RuntimeOptions::default()
    });
    shop(&rt);
    rt.mount("piglet-root").unwrap();

    assert_eq!(rt.tracker().walk_count(), 0);
    assert!(rt.tracker().keyed().is_empty());
}
