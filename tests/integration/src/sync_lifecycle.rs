//! Tests for a project's life across several syncs
//!
//! Components are added, redesigned and deleted on the server while the
//! local tree follows along.

use plasmic_core::{AssumeDefaults, FixedAnswer, SyncEngine};
use plasmic_test_utils::{MockApi, MockComponent, MockVersion, TestProject};
use pretty_assertions::assert_eq;
use serde_json::json;

fn site(version: &str) -> MockVersion {
    MockVersion::new("projectId1", "Site", version)
        .component(MockComponent::new("buttonId", "Button"))
        .component(MockComponent::new("containerId", "Container"))
}

#[test]
fn test_first_sync_of_a_tracked_project() {
    let project = TestProject::with_config(json!({"projects": [{"projectId": "projectId1"}]}));
    let api = MockApi::new();
    api.publish(site("1.2.3"));
    let engine = SyncEngine::new(&api, &AssumeDefaults);

    let report = engine.sync(&project.options(&["projectId1"])).unwrap();

    let component_files = [
        "Button.tsx",
        "Container.tsx",
        "plasmic/site/PlasmicButton.tsx",
        "plasmic/site/PlasmicContainer.tsx",
        "plasmic/site/PlasmicButton.module.css",
        "plasmic/site/PlasmicContainer.module.css",
    ];
    for file in component_files {
        project.assert_src_exists(file);
    }
    let written: Vec<String> = report.changes.iter().map(|c| c.path.to_string()).collect();
    for file in component_files {
        assert!(written.iter().any(|w| w.ends_with(file)), "{file} not in {written:?}");
    }

    let config = project.config();
    assert_eq!(config.projects.len(), 1);
    let ids: Vec<&str> = config.projects[0].components.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["buttonId", "containerId"]);
    assert_eq!(config.projects[0].project_name, "Site");
    assert_eq!(project.lock().version_of("projectId1"), Some("1.2.3"));

    let report = engine.sync(&project.options(&["projectId1"])).unwrap();

    assert!(report.up_to_date);
    assert_eq!(report.files_written(), 0);
    assert_eq!(report.files_deleted(), 0);
}

#[test]
fn test_components_follow_the_design_over_time() {
    let project = TestProject::new();
    let api = MockApi::new();
    api.publish(site("1.0.0"));
    let engine = SyncEngine::new(&api, &AssumeDefaults);
    engine.sync(&project.options(&["projectId1"])).unwrap();

    // A new component appears and the button is redesigned
    api.publish(
        MockVersion::new("projectId1", "Site", "1.1.0")
            .component(MockComponent::new("buttonId", "Button").body("Click me"))
            .component(MockComponent::new("containerId", "Container"))
            .component(MockComponent::new("cardId", "Card")),
    );
    let report = engine.sync(&project.options(&[])).unwrap();

    project.assert_src_exists("Card.tsx");
    project.assert_src_exists("plasmic/site/PlasmicCard.tsx");
    project.assert_src_contains("plasmic/site/PlasmicButton.tsx", "Click me");
    assert!(report.files_written() > 0);
    assert_eq!(project.config().projects[0].components.len(), 3);

    // The container is deleted; the user agrees to drop its skeleton too
    api.publish(
        MockVersion::new("projectId1", "Site", "1.2.0")
            .component(MockComponent::new("buttonId", "Button").body("Click me"))
            .component(MockComponent::new("cardId", "Card")),
    );
    let yes = FixedAnswer::new(true);
    SyncEngine::new(&api, &yes)
        .sync(&project.options(&[]))
        .unwrap();

    project.assert_src_missing("Container.tsx");
    project.assert_src_missing("plasmic/site/PlasmicContainer.tsx");
    project.assert_src_missing("plasmic/site/PlasmicContainer.module.css");
    project.assert_src_exists("Card.tsx");
    assert!(project.config().component("containerId").is_none());
    assert_eq!(project.lock().version_of("projectId1"), Some("1.2.0"));
}

#[test]
fn test_second_project_joins_the_tree() {
    let project = TestProject::new();
    let api = MockApi::new();
    api.publish(site("1.0.0"));
    api.publish(MockVersion::new("blogId", "Blog", "3.0.0").component(MockComponent::new("postId", "Post")));
    let engine = SyncEngine::new(&api, &AssumeDefaults);
    engine.sync(&project.options(&["projectId1"])).unwrap();
    let site_render = project.read_src("plasmic/site/PlasmicButton.tsx");

    engine.sync(&project.options(&["blogId"])).unwrap();

    project.assert_src_exists("Post.tsx");
    project.assert_src_exists("plasmic/blog/PlasmicPost.tsx");
    project.assert_src_exists("plasmic/blog/plasmic_blog.module.css");
    assert_eq!(project.read_src("plasmic/site/PlasmicButton.tsx"), site_render);

    let config = project.config();
    let ids: Vec<&str> = config.projects.iter().map(|p| p.project_id.as_str()).collect();
    assert_eq!(ids, vec!["projectId1", "blogId"]);
    let lock = project.lock();
    assert_eq!(lock.version_of("projectId1"), Some("1.0.0"));
    assert_eq!(lock.version_of("blogId"), Some("3.0.0"));

    // Without arguments both tracked projects are checked
    let report = engine.sync(&project.options(&[])).unwrap();
    assert!(report.up_to_date);
    assert_eq!(api.calls("resolve_sync"), 3);
}

#[test]
fn test_unbuffered_sync_produces_the_same_tree() {
    let buffered = TestProject::new();
    let unbuffered = TestProject::new();
    let api = MockApi::new();
    api.publish(site("1.0.0").icon("starId", "Star"));
    let engine = SyncEngine::new(&api, &AssumeDefaults);

    engine.sync(&buffered.options(&["projectId1"])).unwrap();
    let mut options = unbuffered.options(&["projectId1"]);
    options.skip_buffering = true;
    let report = engine.sync(&options).unwrap();

    assert_eq!(unbuffered.snapshot(), buffered.snapshot());
    assert!(report.files_written() > 0);
}
