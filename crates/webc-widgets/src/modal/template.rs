#![forbid(unsafe_code)]

//! Render tree projection for [`ModalProps`].
//!
//! ```text
//! dialog.c-modal
//! ├── header.c-modal-header        back? · hN heading · close?
//! ├── div.c-modal-scrollContainer
//! │   ├── div.c-modal-content      <slot>, inert while loading
//! │   └── footer (unpinned only)
//! ├── footer (pinned only)         form[method=dialog] with the actions
//! └── div.c-modal-loadingOverlay   while loading
//! ```

use webc_core::html::{Element, Node};

use super::props::{ActionProps, ActionSlot, ModalFlags, ModalProps};
use crate::choice::Choice;

/// Class of the node whose scrolling stays enabled while the page is locked.
pub const SCROLL_CONTAINER_CLASS: &str = "c-modal-scrollContainer";
pub const CONTENT_CLASS: &str = "c-modal-content";
pub const FOOTER_CLASS: &str = "c-modal-footer";
pub const LOADING_OVERLAY_CLASS: &str = "c-modal-loadingOverlay";
pub const CLOSE_BUTTON_CLASS: &str = "c-modal-closeBtn";
pub const BACK_BUTTON_CLASS: &str = "c-modal-backBtn";

/// Project the full modal tree.
pub fn render(props: &ModalProps) -> Node {
    let loading = props.is_loading();
    let aria_label = if loading {
        props.aria.loading.as_deref()
    } else {
        None
    };

    let content = Element::new("div")
        .attr("class", CONTENT_CLASS)
        .attr("data-test-id", "modal-content")
        .flag("inert", loading)
        .child(Element::new("slot"));

    let scroll = Element::new("div")
        .attr("class", SCROLL_CONTAINER_CLASS)
        .child(content);

    let (scroll, pinned_footer) = if props.is_footer_pinned() {
        (scroll, footer(props))
    } else {
        (scroll.child(footer(props)), Node::nothing())
    };

    Element::new("dialog")
        .attr("id", "dialog")
        .attr("class", "c-modal")
        .attr("size", props.size.as_str())
        .attr("position", props.position.as_str())
        .flag(
            "is-full-width-below-mid",
            props.flags.contains(ModalFlags::FULL_WIDTH_BELOW_MID),
        )
        .flag("is-loading", loading)
        .attr("aria-busy", if loading { "true" } else { "false" })
        .attr_opt("aria-label", aria_label)
        .attr("data-test-id", "modal")
        .child(header(props))
        .child(scroll)
        .child(pinned_footer)
        .child(loading.then(loading_overlay))
        .into()
}

fn header(props: &ModalProps) -> Element {
    let back = props.flags.contains(ModalFlags::BACK_BUTTON).then(|| {
        let chevron = if props.dir.is_rtl() {
            "chevron-right"
        } else {
            "chevron-left"
        };
        Element::new("button")
            .attr("type", "button")
            .attr("class", BACK_BUTTON_CLASS)
            .attr_opt("aria-label", props.aria.back.as_deref())
            .attr("data-test-id", "modal-back-button")
            .child(icon(chevron))
    });

    let close = props.is_dismissible().then(|| {
        Element::new("button")
            .attr("type", "button")
            .attr("class", CLOSE_BUTTON_CLASS)
            .attr_opt("aria-label", props.aria.close.as_deref())
            .attr("data-test-id", "modal-close-button")
            .child(icon("close"))
    });

    Element::new("header")
        .attr("class", "c-modal-header")
        .child(back)
        .child(
            Element::new(props.heading_level.tag())
                .attr("class", "c-modal-heading")
                .attr("id", "modal-heading")
                .text(props.heading.clone()),
        )
        .child(close)
}

fn footer(props: &ModalProps) -> Node {
    let Some(leading) = props.renderable_leading() else {
        return Node::nothing();
    };
    let form = Element::new("form")
        .attr("method", "dialog")
        .child(action_button(leading, ActionSlot::Leading))
        .child(
            props
                .renderable_supporting()
                .map(|a| action_button(a, ActionSlot::Supporting)),
        );
    Element::new("footer")
        .attr("class", FOOTER_CLASS)
        .flag(
            "has-stacked-actions",
            props.flags.contains(ModalFlags::STACKED_ACTIONS),
        )
        .child(form)
        .into()
}

fn action_button(action: &ActionProps, slot: ActionSlot) -> Element {
    Element::new("button")
        .attr("type", "submit")
        .attr("value", slot.return_value())
        .attr("variant", action.resolved_variant(slot).as_str())
        .attr_opt("aria-label", action.aria_label.as_deref())
        .attr("data-test-id", format!("modal-{}-action", slot.return_value()))
        .text(action.text.clone())
}

fn loading_overlay() -> Element {
    Element::new("div")
        .attr("class", LOADING_OVERLAY_CLASS)
        .attr("data-test-id", "modal-loading-overlay")
        .child(icon("spinner"))
}

/// Named icon placeholder.
fn icon(name: &str) -> Element {
    Element::new("span")
        .attr("class", "c-modal-icon")
        .attr("data-icon", name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modal::props::{ActionProps, ButtonVariant, HeadingLevel, ModalAria};
    use webc_core::dom::Direction;

    fn dialog(tree: &Node) -> &Element {
        tree.find(&|el: &Element| el.tag() == "dialog").unwrap()
    }

    #[test]
    fn heading_uses_level_tag() {
        let tree = render(&ModalProps::new("Hello").heading_level(HeadingLevel::H4));
        let heading = tree.find_by_class("c-modal-heading").unwrap();
        assert_eq!(heading.tag(), "h4");
        assert_eq!(heading.text_content(), "Hello");
    }

    #[test]
    fn pinned_footer_sits_outside_scroll_container() {
        let props = ModalProps::new("T").leading_action(ActionProps::new("OK"));
        let tree = render(&props);
        let scroll = tree.find_by_class(SCROLL_CONTAINER_CLASS).unwrap();
        let in_scroll = Node::from(scroll.clone()).find_by_class(FOOTER_CLASS).is_some();
        assert!(!in_scroll);
        assert!(tree.find_by_class(FOOTER_CLASS).is_some());
    }

    #[test]
    fn unpinned_footer_scrolls_with_content() {
        let props = ModalProps::new("T")
            .footer_pinned(false)
            .leading_action(ActionProps::new("OK"));
        let tree = render(&props);
        let scroll = tree.find_by_class(SCROLL_CONTAINER_CLASS).unwrap();
        assert!(Node::from(scroll.clone()).find_by_class(FOOTER_CLASS).is_some());
    }

    #[test]
    fn no_footer_without_leading_action() {
        let props = ModalProps::new("T").supporting_action(ActionProps::new("Cancel"));
        let tree = render(&props);
        assert!(tree.find_by_class(FOOTER_CLASS).is_none());
    }

    #[test]
    fn action_buttons_carry_slot_and_variant() {
        let props = ModalProps::new("T")
            .leading_action(ActionProps::new("Save"))
            .supporting_action(ActionProps::new("Cancel").variant(ButtonVariant::Secondary))
            .stacked_actions(true);
        let tree = render(&props);
        let buttons = tree.find_all(&|el: &Element| el.has_attr("value"));
        assert_eq!(buttons.len(), 2);
        assert_eq!(buttons[0].get_attr("value"), Some("leading"));
        assert_eq!(buttons[0].get_attr("variant"), Some("primary"));
        assert_eq!(buttons[1].get_attr("value"), Some("supporting"));
        assert_eq!(buttons[1].get_attr("variant"), Some("secondary"));
        let footer = tree.find_by_class(FOOTER_CLASS).unwrap();
        assert!(footer.has_attr("has-stacked-actions"));
    }

    #[test]
    fn loading_marks_busy_and_inert() {
        let aria = ModalAria {
            loading: Some("Please wait".into()),
            ..ModalAria::default()
        };
        let tree = render(&ModalProps::new("T").loading(true).aria(aria.clone()));
        let d = dialog(&tree);
        assert_eq!(d.get_attr("aria-busy"), Some("true"));
        assert_eq!(d.get_attr("aria-label"), Some("Please wait"));
        assert!(tree.find_by_class(CONTENT_CLASS).unwrap().has_attr("inert"));
        assert!(tree.find_by_class(LOADING_OVERLAY_CLASS).is_some());

        let tree = render(&ModalProps::new("T").aria(aria));
        let d = dialog(&tree);
        assert_eq!(d.get_attr("aria-busy"), Some("false"));
        assert_eq!(d.get_attr("aria-label"), None);
        assert!(!tree.find_by_class(CONTENT_CLASS).unwrap().has_attr("inert"));
        assert!(tree.find_by_class(LOADING_OVERLAY_CLASS).is_none());
    }

    #[test]
    fn back_chevron_follows_direction() {
        let chevron = |dir| {
            let tree = render(&ModalProps::new("T").back_button(true).dir(dir));
            let back = tree.find_by_class(BACK_BUTTON_CLASS).unwrap();
            let icon = Node::from(back.clone())
                .find_by_class("c-modal-icon")
                .and_then(|i| i.get_attr("data-icon").map(str::to_owned));
            icon.unwrap()
        };
        assert_eq!(chevron(Direction::Ltr), "chevron-left");
        assert_eq!(chevron(Direction::Rtl), "chevron-right");
    }

    #[test]
    fn close_button_only_when_dismissible() {
        let tree = render(&ModalProps::new("T"));
        assert!(tree.find_by_class(CLOSE_BUTTON_CLASS).is_none());
        let tree = render(&ModalProps::new("T").dismissible(true));
        assert!(tree.find_by_class(CLOSE_BUTTON_CLASS).is_some());
    }

    #[test]
    fn dialog_attributes() {
        let tree = render(&ModalProps::new("T").full_width_below_mid(true));
        let d = dialog(&tree);
        assert_eq!(d.get_attr("size"), Some("medium"));
        assert_eq!(d.get_attr("position"), Some("center"));
        assert_eq!(d.get_attr("data-test-id"), Some("modal"));
        assert!(d.has_attr("is-full-width-below-mid"));
    }
}
