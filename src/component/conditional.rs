// ============================================================================
// piglet - Conditional Component
// <render-if condition="path"> shows its content while a host state path is truthy
// ============================================================================
//
// The compiler stamps every conditional with `host__element="Name__unsettled"`.
// On connect the marker settles to the key of the nearest `Name` ancestor
// and the condition is read from that component's state, not from the
// conditional's DOM parent. A leading `!` negates the condition.
// ============================================================================

use std::rc::Rc;

use tracing::{debug, warn};

use crate::component::definition::ComponentDefinition;
use crate::component::lifecycle::Component;
use crate::core::constants::{
    CONDITION_ATTRIBUTE, CONDITIONAL_COMPONENT, CONDITIONAL_TAG, HIDDEN_ATTRIBUTE,
};

/// Definition registered in every runtime.
pub fn definition() -> ComponentDefinition {
    ComponentDefinition::new(CONDITIONAL_COMPONENT)
        .with_tag(CONDITIONAL_TAG)
        .ignore_attribute(HIDDEN_ATTRIBUTE)
        .setup(setup)
}

/// Split `!path` into (negated, path).
pub fn parse_condition(condition: &str) -> (bool, &str) {
    let condition = condition.trim();
    match condition.strip_prefix('!') {
        Some(rest) => (true, rest.trim()),
        None => (false, condition),
    }
}

fn setup(component: &Rc<Component>) {
    let Some(condition) = component.attr(CONDITION_ATTRIBUTE) else {
        warn!(component = %component.key(), "conditional without a condition, content stays visible");
        return;
    };
    let (negated, path) = parse_condition(&condition);

    let host = component
        .host_key()
        .or_else(|| component.owner_key().map(|k| k.to_string()));
    let Some(host) = host else {
        warn!(component = %component.key(), condition = %condition, "conditional has no host to read state from");
        return;
    };

    let key = format!("{host}.{path}");
    component.observe(&key);

    let on_mount = key.clone();
    component.on_mount(move |c, _| apply(c, &on_mount, negated));
    component.on_update(move |c, _| apply(c, &key, negated));
}

/// Toggle `hidden` when visibility differs from the current state.
fn apply(component: &Rc<Component>, key: &str, negated: bool) {
    let Some(rt) = component.runtime() else { return };
    let truthy = rt.herd().get(key).is_some_and(|v| v.is_truthy());
    let visible = truthy != negated;

    let element = component.element();
    let hidden = rt.document().attribute(element, HIDDEN_ATTRIBUTE).is_some();
    if hidden != visible {
        return;
    }

    let result = if visible {
        rt.remove_attribute(element, HIDDEN_ATTRIBUTE)
    } else {
        rt.set_attribute(element, HIDDEN_ATTRIBUTE, "")
    };
    match result {
        Ok(()) => debug!(component = %component.key(), key, visible, "condition toggled"),
        Err(err) => warn!(component = %component.key(), %err, "cannot toggle visibility"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::Runtime;
    use serde_json::json;

    #[test]
    fn condition_parsing() {
        assert_eq!(parse_condition("open"), (false, "open"));
        assert_eq!(parse_condition(" ! open "), (true, "open"));
    }

    fn page(rt: &Runtime, condition: &str) -> Rc<Component> {
        rt.define(
            ComponentDefinition::new("Page")
                .root()
                .template(format!(
                    r#"<render-if condition="{condition}" host__element="Page__unsettled"><p>secret</p></render-if>"#
                ))
                .setup(|c| {
                    c.state("open", false);
                }),
        );
        rt.mount("piglet-root").unwrap()
    }

    #[test]
    fn hides_and_shows_with_host_state() {
        let rt = Runtime::default();
        let page = page(&rt, "open");
        let gate = page.children()[0].clone();

        assert_eq!(gate.host_key().as_deref(), Some("Page0"));
        assert_eq!(
            rt.document().attribute(gate.element(), "host__element").as_deref(),
            Some("Page0")
        );
        assert!(rt.document().attribute(gate.element(), "hidden").is_some());

        page.state("open", false).set(json!(true));
        rt.tick();
        assert!(rt.document().attribute(gate.element(), "hidden").is_none());

        page.state("open", false).set(json!(0));
        rt.tick();
        assert!(rt.document().attribute(gate.element(), "hidden").is_some());
    }

    #[test]
    fn negated_conditions_invert_visibility() {
        let rt = Runtime::default();
        let page = page(&rt, "!open");
        let gate = page.children()[0].clone();
        assert!(rt.document().attribute(gate.element(), "hidden").is_none());

        page.state("open", false).set(json!(true));
        rt.tick();
        assert!(rt.document().attribute(gate.element(), "hidden").is_some());
    }

    #[test]
    fn hidden_toggles_do_not_queue_updates() {
        let rt = Runtime::default();
        let page = page(&rt, "open");
        let gate = page.children()[0].clone();
        page.state("open", false).set(json!(true));
        rt.tick();
        assert_eq!(gate.pending(), (0, 0));
        assert_eq!(rt.scheduler().pending(), 0);
    }
}
