use std::{fs, path::Path};

use tempfile::tempdir;

use edgecreator::{
    component::ComponentKind,
    document::{DocumentStatus, parse_document},
    fetch::LogWarnings,
    step::component_kinds,
};
use edgecreator_cli::{Args, run};

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// A store with three issues: a legacy model, a current document and a
/// published document.
fn build_store(root: &Path) {
    write(
        root,
        "legacy/fr/DDD.json",
        r#"{
            "issues": ["1", "2", "3", "4"],
            "models": [{
                "id": 10,
                "issueNumber": "1",
                "photo": "ddd-1.jpg",
                "contributors": [{"contribution": "createur", "userId": 4}],
                "steps": [
                    {"stepNumber": -1, "functionName": "Dimensions", "options": {"Dimension_x": "15", "Dimension_y": "200"}},
                    {"stepNumber": 0, "functionName": "Remplir", "options": {"Pos_x": "0", "Pos_y": "0", "Couleur": "255,0,0"}},
                    {"stepNumber": 1, "functionName": "Inconnu", "options": {}}
                ]
            }]
        }"#,
    );
    write(
        root,
        "edges/fr/gen/_DDD.2.svg",
        r##"<svg width="22.5" height="300"><g class="Fill"><metadata>{"fill": "#00FF00"}</metadata></g></svg>"##,
    );
    write(
        root,
        "edges/fr/gen/DDD.3.svg",
        r##"<svg width="22.5" height="300"><g class="Fill"><metadata>{"fill": "#0000FF"}</metadata></g></svg>"##,
    );
}

fn args(store: &Path, output: &Path, issue: &str, to: Option<&str>) -> Args {
    Args {
        store: store.to_string_lossy().to_string(),
        publication: "fr/DDD".to_string(),
        issue: issue.to_string(),
        to: to.map(str::to_string),
        also: Vec::new(),
        surrounding: false,
        output: output.to_string_lossy().to_string(),
        config: None,
        log_level: "off".to_string(),
    }
}

#[test]
fn e2e_smoke_test_range() {
    let store = tempdir().expect("Failed to create temp directory");
    let output = tempdir().expect("Failed to create temp directory");
    build_store(store.path());

    let warnings = run(&args(store.path(), output.path(), "1", Some("3"))).expect("run failed");

    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].step_number(), Some(1));

    for issue in ["1", "2", "3"] {
        let path = output.path().join(format!("_DDD.{issue}.svg"));
        let content = fs::read_to_string(&path).expect("document should be written");
        let document = parse_document(&content, DocumentStatus::Current).unwrap();
        assert_eq!(
            component_kinds(&document.steps(&LogWarnings)),
            [ComponentKind::Fill],
            "unexpected steps for issue {issue}"
        );
    }

    let primary = fs::read_to_string(output.path().join("_DDD.1.svg")).unwrap();
    let primary = parse_document(&primary, DocumentStatus::Current).unwrap();
    assert_eq!(primary.metadata().photos(), ["ddd-1.jpg"]);
    assert_eq!(primary.metadata().contributors().designers(), ["4"]);
    assert!(!output.path().join("_DDD.4.svg").exists());
}

#[test]
fn e2e_smoke_test_surrounding() {
    let store = tempdir().unwrap();
    let output = tempdir().unwrap();
    build_store(store.path());

    let mut args = args(store.path(), output.path(), "2", None);
    args.surrounding = true;
    run(&args).expect("run failed");

    assert!(output.path().join("_DDD.1.svg").exists());
    assert!(output.path().join("_DDD.2.svg").exists());
    assert!(output.path().join("_DDD.3.svg").exists());
    assert!(!output.path().join("_DDD.4.svg").exists());
}

#[test]
fn e2e_smoke_test_unknown_issue() {
    let store = tempdir().unwrap();
    let output = tempdir().unwrap();
    build_store(store.path());

    let result = run(&args(store.path(), output.path(), "99", None));

    assert!(result.is_err());
    assert!(fs::read_dir(output.path()).unwrap().next().is_none());
}

#[test]
fn e2e_smoke_test_invalid_publication() {
    let store = tempdir().unwrap();
    let output = tempdir().unwrap();

    let mut args = args(store.path(), output.path(), "1", None);
    args.publication = "DDD".to_string();

    assert!(run(&args).is_err());
}
