use piglet::hot_reload::parse_message;
use piglet::{cloned, ComponentDefinition, HotReloadMessage, ReloadAction, Runtime, RuntimeError};
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

fn app(rt: &Runtime, badge_template: &str, log: &Rc<RefCell<Vec<String>>>) {
    rt.define(
        ComponentDefinition::new("App")
            .root()
            .template("<status-badge></status-badge><status-badge></status-badge>")
            .setup(cloned!(log => move |c| {
                c.state("online", true);
                c.on_mount(cloned!(log => move |c, reason| {
                    log.borrow_mut().push(format!("{} {}", c.key(), reason.name()));
                }));
            })),
    );
    rt.define(
        ComponentDefinition::new("StatusBadge")
            .template(badge_template)
            .setup(cloned!(log => move |c| {
                c.state("count", 0);
                c.on_mount(cloned!(log => move |c, reason| {
                    log.borrow_mut().push(format!("{} {}", c.key(), reason.name()));
                }));
            })),
    );
}

#[test]
fn test_tag_reload_touches_every_mounted_instance() {
    let rt = Runtime::default();
    let log = Rc::default();
    app(&rt, "<b>old</b>", &log);
    let root = rt.mount("piglet-root").unwrap();
    let badges = root.children();
    badges[1].state("count", 0).set(json!(7));
    log.borrow_mut().clear();

    app(&rt, "<b>new</b>", &log);
    let action = rt.handle_message(r#"{"type": "reload", "data": "status-badge"}"#).unwrap();

    assert_eq!(
        action,
        ReloadAction::Components {
            tag: "status-badge".into(),
            instances: 2
        }
    );
    for badge in &badges {
        assert_eq!(rt.document().inner_html(badge.shadow_root().unwrap()), "<b>new</b>");
    }
    assert_eq!(badges[1].state("count", 0).json(), json!(7));
    assert_eq!(*log.borrow(), vec!["StatusBadge1 reload", "StatusBadge2 reload"]);
}

#[test]
fn test_route_reload_targets_the_root() {
    let rt = Runtime::default();
    let log = Rc::default();
    app(&rt, "<b>x</b>", &log);
    let root = rt.mount("piglet-root").unwrap();
    log.borrow_mut().clear();

    let action = rt.apply_hot_reload(&HotReloadMessage::Reload { data: None });

    assert_eq!(action, ReloadAction::Route { instances: 1 });
    // the root re-mounts first, then propagates to the re-injected badges
    assert_eq!(
        *log.borrow(),
        vec!["App0 reload", "StatusBadge3 parentMount", "StatusBadge4 parentMount"]
    );
    assert_eq!(root.state("online", false).json(), json!(true));
}

#[test]
fn test_reload_of_an_unknown_tag_is_harmless() {
    let rt = Runtime::default();
    let action = rt.handle_message(r#"{"type":"reload","data":"ghost-view"}"#).unwrap();
    assert_eq!(
        action,
        ReloadAction::Components {
            tag: "ghost-view".into(),
            instances: 0
        }
    );
}

#[test]
fn test_host_actions_and_bad_messages() {
    let rt = Runtime::default();
    assert_eq!(rt.handle_message(r#"{"type":"fullReload"}"#).unwrap(), ReloadAction::FullPage);
    assert_eq!(rt.handle_message(r#"{"type":"serverRestart"}"#).unwrap(), ReloadAction::Reconnect);
    assert!(matches!(rt.handle_message("not json"), Err(RuntimeError::MalformedMessage(_))));

    let round = serde_json::to_string(&HotReloadMessage::Reload { data: None }).unwrap();
    assert_eq!(round, r#"{"type":"reload"}"#);
    assert_eq!(parse_message(&round).unwrap(), HotReloadMessage::Reload { data: None });
}
