use super::mock::{frame_with, write_template, StaticScreen, PATCH_SIZE};
use crate::locator::TemplateLocator;
use crate::template::TemplateRegistry;
use crate::{AutomationError, Region};
use std::sync::Arc;

fn locator_with(screen: &StaticScreen, dir: &std::path::Path) -> TemplateLocator {
    let registry = Arc::new(TemplateRegistry::new(dir, vec![], 0.9));
    TemplateLocator::new(Arc::new(screen.clone()), registry)
}

#[tokio::test]
async fn finds_template_center_in_screen_coordinates() {
    super::init_tracing();
    let assets = tempfile::tempdir().unwrap();
    write_template(assets.path(), "submit");

    let screen = StaticScreen::new();
    screen.push_frame(frame_with(96, 96, &[("submit", 20, 30)]));

    let locator = locator_with(&screen, assets.path());
    let found = locator.find("submit", None, None).await.unwrap().unwrap();

    assert_eq!(found.x, (20 + PATCH_SIZE / 2) as i32);
    assert_eq!(found.y, (30 + PATCH_SIZE / 2) as i32);
    assert!(found.score > 0.99);
    assert_eq!(found.variant, 0);
}

#[tokio::test]
async fn reports_not_found_on_blank_screen() {
    let assets = tempfile::tempdir().unwrap();
    write_template(assets.path(), "submit");

    let screen = StaticScreen::new();
    screen.push_frame(frame_with(96, 96, &[]));

    let locator = locator_with(&screen, assets.path());
    assert!(locator.find("submit", None, None).await.unwrap().is_none());
}

#[tokio::test]
async fn does_not_confuse_distinct_templates() {
    let assets = tempfile::tempdir().unwrap();
    write_template(assets.path(), "submit");
    write_template(assets.path(), "error");

    let screen = StaticScreen::new();
    screen.push_frame(frame_with(96, 96, &[("error", 20, 30)]));

    let locator = locator_with(&screen, assets.path());
    assert!(locator.find("submit", None, None).await.unwrap().is_none());
    assert!(locator.find("error", None, None).await.unwrap().is_some());
}

#[tokio::test]
async fn region_restricts_the_search_but_not_the_coordinates() {
    let assets = tempfile::tempdir().unwrap();
    write_template(assets.path(), "copy");

    let screen = StaticScreen::new();
    screen.push_frame(frame_with(128, 128, &[("copy", 70, 80)]));
    let locator = locator_with(&screen, assets.path());

    // Region that excludes the patch: nothing to find.
    let miss = locator
        .find("copy", Some(Region::new(0, 0, 48, 48)), None)
        .await
        .unwrap();
    assert!(miss.is_none());

    // Region that contains it: coordinates stay full-screen.
    let hit = locator
        .find("copy", Some(Region::new(64, 64, 64, 64)), None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(hit.x, (70 + PATCH_SIZE / 2) as i32);
    assert_eq!(hit.y, (80 + PATCH_SIZE / 2) as i32);
}

#[tokio::test]
async fn degenerate_region_finds_nothing() {
    let assets = tempfile::tempdir().unwrap();
    write_template(assets.path(), "copy");

    let screen = StaticScreen::new();
    screen.push_frame(frame_with(64, 64, &[("copy", 10, 10)]));
    let locator = locator_with(&screen, assets.path());

    let out_of_bounds = locator
        .find("copy", Some(Region::new(200, 200, 32, 32)), None)
        .await
        .unwrap();
    assert!(out_of_bounds.is_none());
}

#[tokio::test]
async fn alt_resolution_variant_is_probed_when_base_misses() {
    let assets = tempfile::tempdir().unwrap();
    let alt = tempfile::tempdir().unwrap();
    // Base asset is a pattern that is not on screen; the alt variant is.
    write_template(assets.path(), "ready");
    super::mock::patch_for("ready-alt")
        .save(alt.path().join("ready.png"))
        .unwrap();

    let screen = StaticScreen::new();
    screen.push_frame(frame_with(96, 96, &[("ready-alt", 12, 12)]));

    let registry = Arc::new(TemplateRegistry::new(
        assets.path(),
        vec![alt.path().to_path_buf()],
        0.9,
    ));
    let locator = TemplateLocator::new(Arc::new(screen.clone()), registry);

    let found = locator.find("ready", None, None).await.unwrap().unwrap();
    assert_eq!(found.variant, 1);
}

#[tokio::test]
async fn missing_asset_surfaces_immediately() {
    let assets = tempfile::tempdir().unwrap();
    let screen = StaticScreen::new();
    screen.push_frame(frame_with(64, 64, &[]));

    let locator = locator_with(&screen, assets.path());
    match locator.find("ghost", None, None).await {
        Err(AutomationError::TemplateMissing(_)) => {}
        other => panic!("expected TemplateMissing, got {other:?}"),
    }
}

#[tokio::test]
async fn capture_failure_propagates_to_the_caller() {
    let assets = tempfile::tempdir().unwrap();
    write_template(assets.path(), "submit");

    let screen = StaticScreen::new();
    screen.fail_captures(1);

    let locator = locator_with(&screen, assets.path());
    match locator.find("submit", None, None).await {
        Err(AutomationError::PlatformError(_)) => {}
        other => panic!("expected PlatformError, got {other:?}"),
    }
}

#[tokio::test]
async fn template_larger_than_screen_is_not_found() {
    let assets = tempfile::tempdir().unwrap();
    write_template(assets.path(), "submit");

    let screen = StaticScreen::new();
    screen.push_frame(frame_with(8, 8, &[]));

    let locator = locator_with(&screen, assets.path());
    assert!(locator.find("submit", None, None).await.unwrap().is_none());
}
