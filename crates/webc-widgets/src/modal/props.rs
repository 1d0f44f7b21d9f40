#![forbid(unsafe_code)]

//! Modal properties: validated enums, action and aria objects, and the
//! [`ModalProps`] configuration builder.

use bitflags::bitflags;
use serde::Deserialize;
use tracing::warn;

use crate::choice::Choice;
use webc_core::dom::Direction;

/// Semantic heading level of the modal title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeadingLevel {
    H1,
    #[default]
    H2,
    H3,
    H4,
    H5,
    H6,
}

impl HeadingLevel {
    /// The heading tag name.
    pub const fn tag(self) -> &'static str {
        match self {
            Self::H1 => "h1",
            Self::H2 => "h2",
            Self::H3 => "h3",
            Self::H4 => "h4",
            Self::H5 => "h5",
            Self::H6 => "h6",
        }
    }
}

impl Choice for HeadingLevel {
    const PROPERTY: &'static str = "heading-level";
    const VALUES: &'static [Self] = &[
        Self::H1,
        Self::H2,
        Self::H3,
        Self::H4,
        Self::H5,
        Self::H6,
    ];

    fn as_str(self) -> &'static str {
        self.tag()
    }
}

/// Where the modal appears on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModalPosition {
    Top,
    #[default]
    Center,
}

impl Choice for ModalPosition {
    const PROPERTY: &'static str = "position";
    const VALUES: &'static [Self] = &[Self::Top, Self::Center];

    fn as_str(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Center => "center",
        }
    }
}

/// How wide the modal is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModalSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl Choice for ModalSize {
    const PROPERTY: &'static str = "size";
    const VALUES: &'static [Self] = &[Self::Small, Self::Medium, Self::Large];

    fn as_str(self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
        }
    }
}

/// Visual variant of a footer action button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonVariant {
    #[default]
    Primary,
    Secondary,
    Outline,
    Ghost,
    Destructive,
    DestructiveGhost,
    Inverse,
    GhostInverse,
    OutlineInverse,
}

impl Choice for ButtonVariant {
    const PROPERTY: &'static str = "variant";
    const VALUES: &'static [Self] = &[
        Self::Primary,
        Self::Secondary,
        Self::Outline,
        Self::Ghost,
        Self::Destructive,
        Self::DestructiveGhost,
        Self::Inverse,
        Self::GhostInverse,
        Self::OutlineInverse,
    ];

    fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
            Self::Outline => "outline",
            Self::Ghost => "ghost",
            Self::Destructive => "destructive",
            Self::DestructiveGhost => "destructive-ghost",
            Self::Inverse => "inverse",
            Self::GhostInverse => "ghost-inverse",
            Self::OutlineInverse => "outline-inverse",
        }
    }
}

/// Which footer action fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionSlot {
    Leading,
    Supporting,
}

impl ActionSlot {
    /// Tag recorded as the surface's return value when the action closes it.
    pub const fn return_value(self) -> &'static str {
        match self {
            Self::Leading => "leading",
            Self::Supporting => "supporting",
        }
    }

    /// Variant used when the action does not name one.
    pub const fn default_variant(self) -> ButtonVariant {
        match self {
            Self::Leading => ButtonVariant::Primary,
            Self::Supporting => ButtonVariant::Ghost,
        }
    }

    pub fn from_return_value(value: &str) -> Option<Self> {
        match value {
            "leading" => Some(Self::Leading),
            "supporting" => Some(Self::Supporting),
            _ => None,
        }
    }
}

/// A footer action: `{ text, variant?, ariaLabel? }`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActionProps {
    pub text: String,
    /// `None` means "the slot's default variant".
    pub variant: Option<ButtonVariant>,
    pub aria_label: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAction {
    #[serde(default)]
    text: String,
    #[serde(default)]
    variant: Option<String>,
    #[serde(default)]
    aria_label: Option<String>,
}

impl ActionProps {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn variant(mut self, variant: ButtonVariant) -> Self {
        self.variant = Some(variant);
        self
    }

    #[must_use]
    pub fn aria_label(mut self, label: impl Into<String>) -> Self {
        self.aria_label = Some(label.into());
        self
    }

    /// Whether the action has text to show. Text-less actions are not rendered.
    pub fn is_renderable(&self) -> bool {
        !self.text.trim().is_empty()
    }

    /// The variant to render in `slot`.
    pub fn resolved_variant(&self, slot: ActionSlot) -> ButtonVariant {
        self.variant.unwrap_or(slot.default_variant())
    }

    /// Parse the JSON attribute form. Malformed JSON yields `None` with a
    /// warning; an unknown variant falls back to the slot default.
    pub fn from_json(property: &'static str, raw: &str) -> Option<Self> {
        let parsed: RawAction = match serde_json::from_str(raw) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(property, error = %err, "malformed action attribute ignored");
                return None;
            }
        };
        let variant = parsed.variant.as_deref().and_then(|v| {
            let found = ButtonVariant::parse(v);
            if found.is_none() {
                warn!(property, value = v, "unknown action variant, using slot default");
            }
            found
        });
        Some(Self {
            text: parsed.text,
            variant,
            aria_label: parsed.aria_label,
        })
    }
}

/// Accessible labels for the modal's icon buttons and loading state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct ModalAria {
    pub close: Option<String>,
    pub back: Option<String>,
    pub loading: Option<String>,
}

impl ModalAria {
    /// Parse the JSON attribute form; malformed input clears the labels.
    pub fn from_json(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_else(|err| {
            warn!(property = "aria", error = %err, "malformed aria attribute ignored");
            Self::default()
        })
    }
}

bitflags! {
    /// Boolean modal properties.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ModalFlags: u8 {
        const OPEN                 = 1 << 0;
        const DISMISSIBLE          = 1 << 1;
        const LOADING              = 1 << 2;
        const FOOTER_PINNED        = 1 << 3;
        const FULL_WIDTH_BELOW_MID = 1 << 4;
        const BACK_BUTTON          = 1 << 5;
        const STACKED_ACTIONS      = 1 << 6;
    }
}

impl Default for ModalFlags {
    fn default() -> Self {
        Self::FOOTER_PINNED
    }
}

/// Property keys used in change records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModalProperty {
    Heading,
    HeadingLevel,
    IsOpen,
    IsDismissible,
    IsLoading,
    IsFooterPinned,
    IsFullWidthBelowMid,
    HasBackButton,
    HasStackedActions,
    Position,
    Size,
    LeadingAction,
    SupportingAction,
    ReturnFocusAfterCloseSelector,
    Aria,
    Dir,
}

impl ModalProperty {
    pub const ALL: [Self; 16] = [
        Self::Heading,
        Self::HeadingLevel,
        Self::IsOpen,
        Self::IsDismissible,
        Self::IsLoading,
        Self::IsFooterPinned,
        Self::IsFullWidthBelowMid,
        Self::HasBackButton,
        Self::HasStackedActions,
        Self::Position,
        Self::Size,
        Self::LeadingAction,
        Self::SupportingAction,
        Self::ReturnFocusAfterCloseSelector,
        Self::Aria,
        Self::Dir,
    ];

    /// The property backed by a single boolean flag.
    pub fn for_flag(flag: ModalFlags) -> Option<Self> {
        const TABLE: [(ModalFlags, ModalProperty); 7] = [
            (ModalFlags::OPEN, ModalProperty::IsOpen),
            (ModalFlags::DISMISSIBLE, ModalProperty::IsDismissible),
            (ModalFlags::LOADING, ModalProperty::IsLoading),
            (ModalFlags::FOOTER_PINNED, ModalProperty::IsFooterPinned),
            (
                ModalFlags::FULL_WIDTH_BELOW_MID,
                ModalProperty::IsFullWidthBelowMid,
            ),
            (ModalFlags::BACK_BUTTON, ModalProperty::HasBackButton),
            (ModalFlags::STACKED_ACTIONS, ModalProperty::HasStackedActions),
        ];
        TABLE.iter().find(|(f, _)| *f == flag).map(|(_, p)| *p)
    }
}

/// Modal configuration.
///
/// Invariants:
/// - Enum properties always hold an allow-listed value.
/// - `heading` is checked when the element attaches, not here, so a
///   configuration may be assembled in any order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModalProps {
    pub heading: String,
    pub heading_level: HeadingLevel,
    pub flags: ModalFlags,
    pub position: ModalPosition,
    pub size: ModalSize,
    pub leading_action: Option<ActionProps>,
    pub supporting_action: Option<ActionProps>,
    pub return_focus_after_close_selector: Option<String>,
    pub aria: ModalAria,
    pub dir: Direction,
}

impl ModalProps {
    pub fn new(heading: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn heading_level(mut self, level: HeadingLevel) -> Self {
        self.heading_level = level;
        self
    }

    #[must_use]
    pub fn open(mut self, open: bool) -> Self {
        self.flags.set(ModalFlags::OPEN, open);
        self
    }

    #[must_use]
    pub fn dismissible(mut self, dismissible: bool) -> Self {
        self.flags.set(ModalFlags::DISMISSIBLE, dismissible);
        self
    }

    #[must_use]
    pub fn loading(mut self, loading: bool) -> Self {
        self.flags.set(ModalFlags::LOADING, loading);
        self
    }

    #[must_use]
    pub fn footer_pinned(mut self, pinned: bool) -> Self {
        self.flags.set(ModalFlags::FOOTER_PINNED, pinned);
        self
    }

    #[must_use]
    pub fn full_width_below_mid(mut self, full: bool) -> Self {
        self.flags.set(ModalFlags::FULL_WIDTH_BELOW_MID, full);
        self
    }

    #[must_use]
    pub fn back_button(mut self, back: bool) -> Self {
        self.flags.set(ModalFlags::BACK_BUTTON, back);
        self
    }

    #[must_use]
    pub fn stacked_actions(mut self, stacked: bool) -> Self {
        self.flags.set(ModalFlags::STACKED_ACTIONS, stacked);
        self
    }

    #[must_use]
    pub fn position(mut self, position: ModalPosition) -> Self {
        self.position = position;
        self
    }

    #[must_use]
    pub fn size(mut self, size: ModalSize) -> Self {
        self.size = size;
        self
    }

    #[must_use]
    pub fn leading_action(mut self, action: ActionProps) -> Self {
        self.leading_action = Some(action);
        self
    }

    #[must_use]
    pub fn supporting_action(mut self, action: ActionProps) -> Self {
        self.supporting_action = Some(action);
        self
    }

    #[must_use]
    pub fn return_focus_after_close(mut self, selector: impl Into<String>) -> Self {
        self.return_focus_after_close_selector = Some(selector.into());
        self
    }

    #[must_use]
    pub fn aria(mut self, aria: ModalAria) -> Self {
        self.aria = aria;
        self
    }

    #[must_use]
    pub fn dir(mut self, dir: Direction) -> Self {
        self.dir = dir;
        self
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.flags.contains(ModalFlags::OPEN)
    }

    #[inline]
    pub fn is_dismissible(&self) -> bool {
        self.flags.contains(ModalFlags::DISMISSIBLE)
    }

    #[inline]
    pub fn is_loading(&self) -> bool {
        self.flags.contains(ModalFlags::LOADING)
    }

    #[inline]
    pub fn is_footer_pinned(&self) -> bool {
        self.flags.contains(ModalFlags::FOOTER_PINNED)
    }

    /// The leading action, if it will be rendered.
    pub fn renderable_leading(&self) -> Option<&ActionProps> {
        self.leading_action.as_ref().filter(|a| a.is_renderable())
    }

    /// The supporting action, if it will be rendered. Requires a renderable
    /// leading action.
    pub fn renderable_supporting(&self) -> Option<&ActionProps> {
        self.renderable_leading()?;
        self.supporting_action.as_ref().filter(|a| a.is_renderable())
    }

    /// Whether a supporting action is configured but will be suppressed
    /// because there is no leading action.
    pub fn has_orphan_supporting_action(&self) -> bool {
        self.supporting_action.is_some() && self.renderable_leading().is_none()
    }
}
