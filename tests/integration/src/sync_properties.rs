//! Tests for the guarantees a sync gives about the source tree
//!
//! Each test drives the whole pipeline (resolution, generation, merge,
//! fixup, flush) against an in-memory server and checks one property of
//! the result.

use std::collections::BTreeSet;

use plasmic_core::{AssumeDefaults, Error, SyncEngine};
use plasmic_test_utils::{MockApi, MockComponent, MockVersion, TestProject};
use pretty_assertions::assert_eq;

/// `app` uses a button from `ds`, which takes an icon from `tokens`.
fn publish_graph(api: &MockApi) {
    api.publish(MockVersion::new("tokens", "Tokens", "1.0.0").icon("arrowId", "Arrow"));
    api.publish(
        MockVersion::new("ds", "Design System", "2.0.0")
            .dependency("tokens", "1.0.0")
            .component(MockComponent::new("dsButtonId", "DsButton")),
    );
    api.publish(
        MockVersion::new("app", "App", "1.0.0")
            .dependency("ds", "2.0.0")
            .component(MockComponent::new("homeId", "Home").uses("dsButtonId", "DsButton"))
            .component(MockComponent::new("cardId", "Card").direct()),
    );
}

#[test]
fn test_resync_without_server_changes_writes_nothing() {
    let project = TestProject::new();
    let api = MockApi::new();
    publish_graph(&api);
    let engine = SyncEngine::new(&api, &AssumeDefaults);
    engine.sync(&project.options(&["app"])).unwrap();
    let before = project.snapshot();

    let report = engine.sync(&project.options(&[])).unwrap();
    assert!(report.up_to_date);
    assert_eq!(project.snapshot(), before);

    // Forcing regenerates everything, but identical content is not rewritten
    let mut forced = project.options(&["app"]);
    forced.force = true;
    let report = engine.sync(&forced).unwrap();
    assert!(report.changes.is_empty(), "{:?}", report.changes);
    assert_eq!(project.snapshot(), before);
}

#[test]
fn test_each_project_is_synced_at_one_version() {
    let project = TestProject::new();
    let api = MockApi::new();
    publish_graph(&api);

    let report = SyncEngine::new(&api, &AssumeDefaults)
        .sync(&project.options(&["app", "ds"]))
        .unwrap();

    let synced: Vec<&str> = report.synced.iter().map(|p| p.project_id.as_str()).collect();
    let unique: BTreeSet<&str> = synced.iter().copied().collect();
    assert_eq!(synced.len(), unique.len(), "{synced:?}");

    let lock = project.lock();
    let locked: Vec<&str> = lock.projects.iter().map(|p| p.project_id.as_str()).collect();
    assert_eq!(locked.len(), 3, "{locked:?}");
    assert_eq!(lock.version_of("ds"), Some("2.0.0"));
}

#[test]
fn test_two_versions_of_a_dependency_abort_the_sync() {
    let project = TestProject::new();
    let api = MockApi::new();
    api.publish(MockVersion::new("lib", "Lib", "1.0.0"));
    api.publish(MockVersion::new("lib", "Lib", "2.0.0"));
    api.publish(MockVersion::new("a", "A", "1.0.0").dependency("lib", "1.0.0"));
    api.publish(MockVersion::new("b", "B", "1.0.0").dependency("lib", "2.0.0"));

    let err = SyncEngine::new(&api, &AssumeDefaults)
        .sync(&project.options(&["a", "b"]))
        .unwrap_err();

    assert!(
        matches!(err, Error::VersionConflict { ref project_id, .. } if project_id == "lib"),
        "got {err:?}"
    );
    assert!(project.snapshot().is_empty());
}

#[test]
fn test_dependency_imports_resolve_to_synced_files() {
    let project = TestProject::new();
    let api = MockApi::new();
    publish_graph(&api);

    SyncEngine::new(&api, &AssumeDefaults)
        .sync(&project.options(&["app"]))
        .unwrap();

    project.assert_src_exists("DsButton.tsx");
    project.assert_src_exists("plasmic/tokens/PlasmicIcon__Arrow.tsx");
    project.assert_src_contains(
        "plasmic/app/PlasmicHome.tsx",
        "import DsButton from \"../../DsButton\"; // plasmic-import: dsButtonId/component",
    );

    let config = project.config();
    assert!(config.project("ds").unwrap().indirect);
    assert!(config.project("tokens").unwrap().indirect);
    assert!(!config.project("app").unwrap().indirect);
}

#[test]
fn test_missing_dependency_fails_without_writing() {
    let project = TestProject::new();
    let api = MockApi::new();
    publish_graph(&api);
    let mut options = project.options(&["app"]);
    options.recursive = false;

    let err = SyncEngine::new(&api, &AssumeDefaults).sync(&options).unwrap_err();

    match err {
        Error::MissingReference { id, hint, .. } => {
            assert_eq!(id, "dsButtonId");
            assert!(hint.contains("--recursive"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(project.snapshot().is_empty());
}

#[test]
fn test_dependency_is_never_downgraded() {
    let project = TestProject::new();
    let api = MockApi::new();
    publish_graph(&api);
    let engine = SyncEngine::new(&api, &AssumeDefaults);
    engine.sync(&project.options(&["app"])).unwrap();
    let ds_render = project.read_src("plasmic/design_system/PlasmicDsButton.tsx");

    // The app moves back to an older design system
    api.publish(
        MockVersion::new("ds", "Design System", "1.0.0")
            .dependency("tokens", "1.0.0")
            .component(MockComponent::new("dsButtonId", "DsButton").body("old")),
    );
    api.publish(
        MockVersion::new("app", "App", "1.1.0")
            .dependency("ds", "1.0.0")
            .component(MockComponent::new("homeId", "Home").uses("dsButtonId", "DsButton"))
            .component(MockComponent::new("cardId", "Card").direct()),
    );

    let report = engine.sync(&project.options(&[])).unwrap();

    assert!(
        report.warnings.iter().any(|w| w.contains("older than the synced 2.0.0")),
        "{:?}",
        report.warnings
    );
    let lock = project.lock();
    assert_eq!(lock.version_of("ds"), Some("2.0.0"));
    assert_eq!(lock.version_of("app"), Some("1.1.0"));
    assert_eq!(project.read_src("plasmic/design_system/PlasmicDsButton.tsx"), ds_render);
}

#[test]
fn test_renamed_component_keeps_local_edits() {
    let project = TestProject::new();
    let api = MockApi::new();
    api.publish(MockVersion::new("p1", "Site", "1.0.0").component(MockComponent::new("buttonId", "Button")));
    let engine = SyncEngine::new(&api, &AssumeDefaults);
    engine.sync(&project.options(&["p1"])).unwrap();
    let edited = project
        .read_src("Button.tsx")
        .replace("export default Button;", "// tuned by hand\nexport default Button;");
    project.write_src("Button.tsx", &edited);

    api.publish(MockVersion::new("p1", "Site", "1.1.0").component(MockComponent::new("buttonId", "PrimaryButton")));
    engine.sync(&project.options(&["p1"])).unwrap();

    project.assert_src_missing("Button.tsx");
    project.assert_src_contains("PrimaryButton.tsx", "// tuned by hand");
    project.assert_src_contains(
        "PrimaryButton.tsx",
        "from \"./plasmic/site/PlasmicPrimaryButton\"; // plasmic-import: buttonId/render",
    );
    let leftovers: Vec<String> = project
        .snapshot()
        .into_keys()
        .filter(|path| path.ends_with("/Button.tsx") || path.contains("PlasmicButton"))
        .collect();
    assert!(leftovers.is_empty(), "{leftovers:?}");

    let config = project.config();
    let component = config.component("buttonId").unwrap();
    assert_eq!(component.name, "PrimaryButton");
    assert_eq!(component.import_spec.module_path, "PrimaryButton.tsx");
    assert_eq!(component.css_file_path, "plasmic/site/PlasmicPrimaryButton.module.css");
}

#[test]
fn test_direct_components_merge_or_stay_untouched() {
    let project = TestProject::new();
    let api = MockApi::new();
    let card = MockComponent::new("cardId", "Card").direct().body("Welcome");
    let badge = MockComponent::new("badgeId", "Badge").direct().body("New");
    api.publish(
        MockVersion::new("p1", "Site", "1.0.0")
            .component(card.clone())
            .component(badge.clone()),
    );
    let engine = SyncEngine::new(&api, &AssumeDefaults);
    engine.sync(&project.options(&["p1"])).unwrap();
    let edited = project
        .read_src("Card.tsx")
        .replace("function Card() {\n", "function Card() {\n  const tracked = useTracking();\n");
    project.write_src("Card.tsx", &edited);

    let v2 = MockVersion::new("p1", "Site", "1.1.0")
        .revision(2)
        .component(card.body("Welcome back"))
        .component(badge.body("Hot"));
    api.publish(v2.clone());
    engine.sync(&project.options(&["p1"])).unwrap();

    let merged = project.read_src("Card.tsx");
    assert!(merged.contains("const tracked = useTracking();"), "got:\n{merged}");
    assert!(merged.contains("Welcome back"), "got:\n{merged}");
    // Without local edits the merge result is exactly the new version
    assert_eq!(
        project.read_src("Badge.tsx"),
        MockApi::skeleton_module(&v2, &v2.components[1], ".module.css")
    );

    // A third version cannot be merged once the base is gone
    let before = project.snapshot();
    api.publish(
        MockVersion::new("p1", "Site", "1.2.0")
            .component(MockComponent::new("cardId", "Card").direct().body("Farewell"))
            .component(MockComponent::new("badgeId", "Badge").direct()),
    );
    api.drop_sync_metadata();

    let err = engine.sync(&project.options(&["p1"])).unwrap_err();

    assert!(matches!(err, Error::MergeBaseUnavailable { .. }), "got {err:?}");
    assert_eq!(project.snapshot(), before);
}
