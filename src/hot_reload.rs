// ============================================================================
// piglet - Hot Reload
// Message contract of the reload socket and how a runtime applies it
// ============================================================================

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::context::Runtime;
use crate::error::RuntimeResult;

/// Message pushed by the development server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HotReloadMessage {
    /// Reload one tag's mounted instances, or the whole route without a tag
    Reload {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<String>,
    },
    FullReload,
    ServerRestart,
}

pub fn parse_message(text: &str) -> RuntimeResult<HotReloadMessage> {
    Ok(serde_json::from_str(text)?)
}

/// What applying a message did, or what the host must still do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReloadAction {
    /// Instances of `tag` were reloaded in place
    Components { tag: String, instances: usize },
    /// The route's root component was reloaded
    Route { instances: usize },
    /// The host must reload the page
    FullPage,
    /// The host must reconnect to the restarted server
    Reconnect,
}

impl Runtime {
    pub fn apply_hot_reload(&self, message: &HotReloadMessage) -> ReloadAction {
        match message {
            HotReloadMessage::Reload { data: Some(tag) } => {
                let instances = self
                    .components_by_tag(tag)
                    .iter()
                    .filter(|c| c.reload())
                    .count();
                info!(tag = %tag, instances, "components reloaded");
                ReloadAction::Components {
                    tag: tag.clone(),
                    instances,
                }
            }
            HotReloadMessage::Reload { data: None } => {
                let roots: Vec<_> = self
                    .components_by_tag(crate::core::constants::ROOT_TAG)
                    .into_iter()
                    .filter(|c| c.key().is_root())
                    .collect();
                let instances = roots.iter().filter(|c| c.reload()).count();
                info!(instances, "route reloaded");
                ReloadAction::Route { instances }
            }
            HotReloadMessage::FullReload => {
                debug!("full reload requested");
                ReloadAction::FullPage
            }
            HotReloadMessage::ServerRestart => {
                debug!("server restarted");
                ReloadAction::Reconnect
            }
        }
    }

    /// Parse and apply one raw socket message.
    pub fn handle_message(&self, text: &str) -> RuntimeResult<ReloadAction> {
        let message = parse_message(text)?;
        Ok(self.apply_hot_reload(&message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentDefinition;
    use crate::error::RuntimeError;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn parses_every_message_type() {
        assert_eq!(
            parse_message(r#"{"type":"reload","data":"nav-bar"}"#).unwrap(),
            HotReloadMessage::Reload {
                data: Some("nav-bar".into())
            }
        );
        assert_eq!(
            parse_message(r#"{"type":"reload"}"#).unwrap(),
            HotReloadMessage::Reload { data: None }
        );
        assert_eq!(
            parse_message(r#"{"type":"fullReload"}"#).unwrap(),
            HotReloadMessage::FullReload
        );
        assert_eq!(
            parse_message(r#"{"type":"serverRestart"}"#).unwrap(),
            HotReloadMessage::ServerRestart
        );
        assert!(matches!(
            parse_message(r#"{"type":"explode"}"#),
            Err(RuntimeError::MalformedMessage(_))
        ));
    }

    #[test]
    fn reload_reinjects_content_and_keeps_state() {
        let rt = Runtime::default();
        let reasons = Rc::new(RefCell::new(Vec::new()));
        let r = reasons.clone();
        rt.define(
            ComponentDefinition::new("Card")
                .template("<p>v1</p>")
                .setup(move |c| {
                    c.state("clicks", 0);
                    let r = r.clone();
                    c.on_mount(move |_, reason| r.borrow_mut().push(reason.name().to_string()));
                }),
        );
        let card = rt.mount("card-component").unwrap();
        card.state("clicks", 0).set(json!(5));
        rt.tick();

        rt.define(
            (*rt.registry().get("card-component").unwrap())
                .clone()
                .template("<p>v2</p>"),
        );
        let action = rt.handle_message(r#"{"type":"reload","data":"card-component"}"#).unwrap();

        assert_eq!(
            action,
            ReloadAction::Components {
                tag: "card-component".into(),
                instances: 1
            }
        );
        let shadow = card.shadow_root().unwrap();
        assert_eq!(rt.document().inner_html(shadow), "<p>v2</p>");
        assert_eq!(card.state("clicks", 0).json(), json!(5));
        assert_eq!(*reasons.borrow(), vec!["connected", "reload"]);
    }

    #[test]
    fn routing_messages_become_host_actions() {
        let rt = Runtime::default();
        assert_eq!(rt.apply_hot_reload(&HotReloadMessage::FullReload), ReloadAction::FullPage);
        assert_eq!(rt.apply_hot_reload(&HotReloadMessage::ServerRestart), ReloadAction::Reconnect);
        assert_eq!(
            rt.apply_hot_reload(&HotReloadMessage::Reload { data: None }),
            ReloadAction::Route { instances: 0 }
        );
    }
}
