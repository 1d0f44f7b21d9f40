#![forbid(unsafe_code)]

//! Minimal element used to check that server markup hydrates.
//!
//! Renders a single button when configured and nothing otherwise. Its first
//! client update logs a success line and flips [`HydrationProbe::hydrated`].

use std::convert::Infallible;
use std::error::Error;
use std::fmt;

use serde::Deserialize;
use tracing::{debug, info, warn};
use webc_core::dom::ElementId;
use webc_core::html::{Element, Node};
use webc_runtime::changes::ChangedProperties;
use webc_runtime::element::{ReactiveElement, Update};

use crate::choice::Choice;

/// The rendered button's `type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonType {
    #[default]
    Submit,
    Reset,
    Button,
}

impl Choice for ButtonType {
    const PROPERTY: &'static str = "type";
    const VALUES: &'static [Self] = &[Self::Submit, Self::Reset, Self::Button];

    fn as_str(self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Reset => "reset",
            Self::Button => "button",
        }
    }
}

/// The probe's object property.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProbeConfig {
    pub button_type: ButtonType,
}

#[derive(Deserialize)]
struct RawConfig {
    #[serde(rename = "type")]
    button_type: Option<String>,
}

impl ProbeConfig {
    pub fn new(button_type: ButtonType) -> Self {
        Self { button_type }
    }

    /// Parse the `prop-object` attribute. Malformed JSON yields `None`.
    pub fn from_json(raw: &str) -> Option<Self> {
        match serde_json::from_str::<RawConfig>(raw) {
            Ok(parsed) => Some(Self {
                button_type: parsed
                    .button_type
                    .as_deref()
                    .map(ButtonType::from_attr)
                    .unwrap_or_default(),
            }),
            Err(err) => {
                warn!(property = "prop-object", error = %err, "malformed attribute ignored");
                None
            }
        }
    }
}

/// `set_attribute` was called with a name the probe does not observe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownProbeAttribute(pub String);

impl fmt::Display for UnknownProbeAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} attribute: {}", HydrationProbe::TAG, self.0)
    }
}

impl Error for UnknownProbeAttribute {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeProperty {
    PropObject,
}

/// The `test-component` element.
#[derive(Debug)]
pub struct HydrationProbe {
    id: ElementId,
    prop_object: Option<ProbeConfig>,
    changes: ChangedProperties<ProbeProperty>,
    hydrated: bool,
}

impl HydrationProbe {
    pub const TAG: &'static str = "test-component";

    pub fn new(prop_object: Option<ProbeConfig>) -> Self {
        let mut changes = ChangedProperties::new();
        changes.record::<Option<ProbeConfig>>(ProbeProperty::PropObject, None);
        Self {
            id: ElementId::next(),
            prop_object,
            changes,
            hydrated: false,
        }
    }

    pub fn set_prop_object(&mut self, prop_object: Option<ProbeConfig>) {
        if self.prop_object == prop_object {
            return;
        }
        self.changes
            .record(ProbeProperty::PropObject, Some(&self.prop_object));
        self.prop_object = prop_object;
    }

    /// Apply an attribute change. Removing `prop-object` or setting it to
    /// malformed JSON clears the object.
    pub fn set_attribute(
        &mut self,
        name: &str,
        value: Option<&str>,
    ) -> Result<(), UnknownProbeAttribute> {
        match name {
            "prop-object" => {
                self.set_prop_object(value.and_then(ProbeConfig::from_json));
                Ok(())
            }
            other => Err(UnknownProbeAttribute(other.to_owned())),
        }
    }

    pub fn prop_object(&self) -> Option<&ProbeConfig> {
        self.prop_object.as_ref()
    }

    /// Whether the first client update has run.
    pub fn hydrated(&self) -> bool {
        self.hydrated
    }
}

impl ReactiveElement for HydrationProbe {
    type Property = ProbeProperty;
    type Error = Infallible;

    fn id(&self) -> ElementId {
        self.id
    }

    fn render(&self) -> Node {
        debug!(id = %self.id, prop_object = ?self.prop_object, "probe render");
        let Some(config) = &self.prop_object else {
            return Node::nothing();
        };
        Element::new("button")
            .attr("type", config.button_type.as_str())
            .text("Hello World")
            .into()
    }

    fn has_pending_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    fn take_changes(&mut self) -> ChangedProperties<ProbeProperty> {
        self.changes.take()
    }

    fn first_updated(&mut self, _update: &Update<'_, ProbeProperty>) {
        self.hydrated = true;
        info!(id = %self.id, "Hydration succeeded!");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;
    use webc_runtime::element::ElementHost;

    #[test]
    fn renders_nothing_without_object() {
        let host = ElementHost::new(HydrationProbe::new(None));
        assert_eq!(host.render_to_string(), "");
    }

    #[test]
    fn default_type_is_submit() {
        let host = ElementHost::new(HydrationProbe::new(Some(ProbeConfig::default())));
        assert_eq!(
            host.render_to_string(),
            r#"<button type="submit">Hello World</button>"#
        );
    }

    #[test]
    fn config_parsing() {
        assert_eq!(
            ProbeConfig::from_json(r#"{"type":"reset"}"#),
            Some(ProbeConfig::new(ButtonType::Reset))
        );
        assert_eq!(ProbeConfig::from_json("{}"), Some(ProbeConfig::default()));
        assert_eq!(
            ProbeConfig::from_json(r#"{"type":"launch"}"#),
            Some(ProbeConfig::default())
        );
        assert_eq!(ProbeConfig::from_json("not json"), None);
    }

    #[test]
    fn prop_object_attribute_drives_render() {
        let mut host = ElementHost::new(HydrationProbe::new(None));
        host.connect().unwrap();
        host.interact(|p| p.set_attribute("prop-object", Some(r#"{"type":"button"}"#)))
            .unwrap()
            .unwrap();
        assert_eq!(
            host.tree().unwrap().to_html(),
            r#"<button type="button">Hello World</button>"#
        );

        host.interact(|p| p.set_attribute("prop-object", None))
            .unwrap()
            .unwrap();
        assert!(host.tree().unwrap().is_nothing());
    }

    #[traced_test]
    #[test]
    fn malformed_prop_object_attribute_clears_object() {
        let mut probe = HydrationProbe::new(Some(ProbeConfig::new(ButtonType::Reset)));
        probe.set_attribute("prop-object", Some("{type:")).unwrap();
        assert_eq!(probe.prop_object(), None);
        assert!(logs_contain("malformed attribute ignored"));
    }

    #[test]
    fn unknown_attribute_is_rejected() {
        let mut probe = HydrationProbe::new(None);
        assert_eq!(
            probe.set_attribute("label", Some("x")),
            Err(UnknownProbeAttribute("label".into()))
        );
    }

    #[traced_test]
    #[test]
    fn first_update_marks_hydrated() {
        let probe = HydrationProbe::new(Some(ProbeConfig::new(ButtonType::Button)));
        let mut host = ElementHost::new(probe);
        let server = host.render_to_string();
        assert!(!host.element().hydrated());
        let report = host.hydrate(&server).unwrap();
        assert!(report.matched);
        assert!(host.element().hydrated());
        assert!(logs_contain("Hydration succeeded!"));
    }

    #[test]
    fn property_change_rerenders() {
        let mut host = ElementHost::new(HydrationProbe::new(None));
        host.connect().unwrap();
        assert!(host.tree().unwrap().is_nothing());
        host.interact(|p| p.set_prop_object(Some(ProbeConfig::new(ButtonType::Reset))))
            .unwrap();
        assert_eq!(
            host.tree().unwrap().to_html(),
            r#"<button type="reset">Hello World</button>"#
        );
    }
}
