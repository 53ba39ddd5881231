//! Clickable utilities: matching, filtering and the same-SSIM grouping.

use bannerscan::detectors::clickable::{
    clickables_with_same_ssim, get_by_kind, get_by_text, remove_invisible_clickables,
};
use bannerscan::results::{Clickable, ClickableKind, CookieNotice};

fn clickable(node_id: i64, text: &str, kind: ClickableKind) -> Clickable {
    Clickable {
        text: text.to_string(),
        kind,
        node_id,
        is_visible: true,
        background_color: "rgb(255,255,255)".to_string(),
        ..Clickable::default()
    }
}

#[test]
fn get_by_text_matches_across_node_id_drift() {
    let original = clickable(10, "Accept all", ClickableKind::Button);
    let reloaded = vec![
        clickable(77, "Settings", ClickableKind::Button),
        clickable(91, "Accept all", ClickableKind::Button),
    ];
    let matched = get_by_text(&original, &reloaded).unwrap();
    assert_eq!(matched.node_id, 91);

    let missing = clickable(10, "Reject", ClickableKind::Button);
    assert!(get_by_text(&missing, &reloaded).is_none());
}

#[test]
fn get_by_kind_filters_buttons_links_and_checkboxes() {
    let clickables = vec![
        clickable(1, "Accept", ClickableKind::Button),
        clickable(2, "Privacy policy", ClickableKind::Link),
        clickable(3, "Marketing", ClickableKind::Checkbox),
        clickable(4, "Reject", ClickableKind::Button),
    ];
    assert_eq!(get_by_kind(&clickables, ClickableKind::Button).len(), 2);
    assert_eq!(get_by_kind(&clickables, ClickableKind::Link).len(), 1);
    assert_eq!(get_by_kind(&clickables, ClickableKind::Checkbox).len(), 1);
}

#[test]
fn same_ssim_groups_pairs_without_duplicates() {
    let mut a = clickable(1, "Accept", ClickableKind::Button);
    let mut b = clickable(2, "Reject", ClickableKind::Button);
    let mut c = clickable(3, "Settings", ClickableKind::Button);
    let mut d = clickable(4, "More", ClickableKind::Button);
    a.ssim = Some(1.0);
    b.ssim = Some(1.0);
    c.ssim = Some(0.73);
    d.ssim = None;

    let same = clickables_with_same_ssim(&[a, b, c, d]);
    let ids: Vec<i64> = same.iter().map(|c| c.node_id).collect();
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn no_scores_means_no_same_ssim_group() {
    let clickables = vec![
        clickable(1, "Accept", ClickableKind::Button),
        clickable(2, "Reject", ClickableKind::Button),
    ];
    assert!(clickables_with_same_ssim(&clickables).is_empty());
}

#[test]
fn invisible_clickables_are_removed_from_the_notice() {
    let mut hidden = clickable(5, "ghost", ClickableKind::Button);
    hidden.is_visible = false;
    let mut notice = CookieNotice {
        clickables: vec![clickable(1, "Accept", ClickableKind::Button), hidden],
        ..CookieNotice::default()
    };
    remove_invisible_clickables(&mut notice);
    assert_eq!(notice.clickables.len(), 1);
    assert_eq!(notice.clickables[0].text, "Accept");
}

#[test]
fn clickable_serialization_uses_wire_field_names() {
    let mut subject = clickable(7, "Accept", ClickableKind::Button);
    subject.local_name = Some("a".to_string());
    subject.ssim = Some(0.5);
    let value = serde_json::to_value(&subject).unwrap();
    assert_eq!(value["localName"], "a");
    assert_eq!(value["type"], "button");
    assert_eq!(value["backgroundColor"], "rgb(255,255,255)");
    assert_eq!(value["SSIM"], 0.5);

    let back: Clickable = serde_json::from_value(value).unwrap();
    assert_eq!(back.kind, ClickableKind::Button);
    assert_eq!(back.node_id, 7);
}
