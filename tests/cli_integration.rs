//! CLI integration tests for theia-builder.
//!
//! These tests drive the binary against a small on-disk catalog laid out
//! next to the application directories.

use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the theia-builder binary command, isolated from the user's config.
fn theia_builder(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("theia-builder").unwrap();
    cmd.env("HOME", home)
        .env_remove("THEIA_BUILDER_MODULE_DIR")
        .env_remove("DOCKER");
    cmd
}

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// A catalog with bases `theia` and `theia-alpine` and modules `python`
/// (theia only, with parameters) and `go` (both bases).
fn write_catalog(root: &Path) {
    write(
        &root.join("base/theia/Dockerfile.j2"),
        "FROM theiaide/theia:{{ app.base_tag }}\n\
         {% for script in scripts %}\n\
         {{ script }}\n\
         {% endfor %}\n\
         LABEL version=\"{{ app.version }}\"\n",
    );
    write(
        &root.join("base/theia/package.json"),
        r#"{ "dependencies": { "@theia/core": "latest" } }"#,
    );
    write(
        &root.join("base/theia-alpine/Dockerfile.j2"),
        "FROM alpine\n{% for script in scripts %}\n{{ script }}\n{% endfor %}\n",
    );

    write(
        &root.join("modules/python/module.yaml"),
        "description: Python support\n\
         parameters:\n  \
           pip:\n    \
             type: bool\n    \
             default: true\n",
    );
    write(
        &root.join("modules/python/package.json"),
        r#"{ "dependencies": { "@theia/python": "latest", "@theia/core": "next" } }"#,
    );
    write(
        &root.join("modules/python/theia/Dockerfile"),
        "RUN install-python pip={{ pip }}\n",
    );

    write(&root.join("modules/go/theia/Dockerfile"), "RUN install-go\n");
    write(&root.join("modules/go/theia-alpine/Dockerfile"), "RUN apk add go\n");
}

fn write_app(root: &Path, name: &str, base: &str, modules: &[&str], extra: &str) -> std::path::PathBuf {
    let dir = root.join(name);
    let mut yaml = format!(
        "app:\n  name: {name}\n  version: 2.1.0\n  org: acme\n  license: EPL-2.0\n  title: {name} IDE\n  base: {base}\n"
    );
    if !modules.is_empty() {
        yaml.push_str("modules:\n");
        for module in modules {
            yaml.push_str(&format!("  - {}\n", module));
        }
    }
    yaml.push_str(extra);
    write(&dir.join("application.yaml"), &yaml);
    dir
}

// ============================================================================
// theia-builder prepare
// ============================================================================

#[test]
fn test_prepare_writes_dockerfile_and_manifest() {
    let tmp = TempDir::new().unwrap();
    write_catalog(tmp.path());
    let app = write_app(tmp.path(), "ide", "theia", &["go", "python"], "");

    theia_builder(tmp.path())
        .arg("prepare")
        .arg(&app)
        .assert()
        .success()
        .stdout(predicate::str::contains("Prepared `ide`"))
        .stderr(predicate::str::contains("`@theia/core` in `dependencies` is overridden"));

    let dockerfile = fs::read_to_string(app.join("Dockerfile")).unwrap();
    assert_eq!(
        dockerfile,
        "FROM theiaide/theia:latest\nRUN install-go\nRUN install-python pip=true\nLABEL version=\"2.1.0\"\n"
    );

    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(app.join("package.json")).unwrap()).unwrap();
    assert_eq!(manifest["name"], "ide");
    assert_eq!(manifest["version"], "2.1.0");
    assert_eq!(manifest["dependencies"]["@theia/core"], "next");
    assert_eq!(manifest["dependencies"]["@theia/python"], "latest");
    assert_eq!(manifest["theia"]["frontend"]["config"]["applicationName"], "ide IDE");
}

#[test]
fn test_prepare_with_parameter_override() {
    let tmp = TempDir::new().unwrap();
    write_catalog(tmp.path());
    let app = write_app(
        tmp.path(),
        "ide",
        "theia",
        &["python"],
        "parameters:\n  python:\n    pip: false\n",
    );

    theia_builder(tmp.path())
        .arg("prepare")
        .arg(&app)
        .assert()
        .success();

    let dockerfile = fs::read_to_string(app.join("Dockerfile")).unwrap();
    assert!(dockerfile.contains("RUN install-python pip=false\n"));
}

#[test]
fn test_prepare_unsupported_module_fails() {
    let tmp = TempDir::new().unwrap();
    write_catalog(tmp.path());
    let app = write_app(tmp.path(), "ide", "theia-alpine", &["go", "python"], "");

    theia_builder(tmp.path())
        .arg("prepare")
        .arg(&app)
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "module `python` does not support base `theia-alpine`",
        ));

    assert!(!app.join("Dockerfile").exists());
    assert!(!app.join("package.json").exists());
}

#[test]
fn test_prepare_invalid_bool_fails() {
    let tmp = TempDir::new().unwrap();
    write_catalog(tmp.path());
    let app = write_app(
        tmp.path(),
        "ide",
        "theia",
        &["python"],
        "parameters:\n  python:\n    pip: 'yes'\n",
    );

    theia_builder(tmp.path())
        .arg("prepare")
        .arg(&app)
        .assert()
        .failure()
        .stderr(predicate::str::contains("parameter `pip` of module `python`"));
}

#[test]
fn test_prepare_missing_field_fails() {
    let tmp = TempDir::new().unwrap();
    write_catalog(tmp.path());
    let app = tmp.path().join("ide");
    write(
        &app.join("application.yaml"),
        "app:\n  name: ide\n  org: acme\n  license: MIT\n  title: IDE\n  base: theia\n",
    );

    theia_builder(tmp.path())
        .arg("prepare")
        .arg(&app)
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing required field `app.version`"));
}

#[test]
fn test_prepare_several_apps() {
    let tmp = TempDir::new().unwrap();
    write_catalog(tmp.path());
    let first = write_app(tmp.path(), "first", "theia", &["go"], "");
    let second = write_app(tmp.path(), "second", "theia-alpine", &["go"], "");

    theia_builder(tmp.path())
        .arg("prepare")
        .arg(&first)
        .arg(&second)
        .args(["--jobs", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Prepared `first`"))
        .stdout(predicate::str::contains("Prepared `second`"));

    assert!(fs::read_to_string(second.join("Dockerfile"))
        .unwrap()
        .contains("RUN apk add go"));
}

#[test]
fn test_prepare_continues_past_unloadable_app() {
    let tmp = TempDir::new().unwrap();
    write_catalog(tmp.path());
    let broken = tmp.path().join("broken");
    write(
        &broken.join("application.yaml"),
        "app:\n  name: broken\n  org: acme\n  license: MIT\n  title: Broken\n  base: theia\n",
    );
    let missing = tmp.path().join("missing");
    let good = write_app(tmp.path(), "good", "theia", &["go"], "");

    theia_builder(tmp.path())
        .arg("prepare")
        .arg(&broken)
        .arg(&missing)
        .arg(&good)
        .assert()
        .failure()
        .stdout(predicate::str::contains("Prepared `good`"))
        .stderr(predicate::str::contains("missing required field `app.version`"))
        .stderr(predicate::str::contains("failed to read workspace definition"))
        .stderr(predicate::str::contains("failed to prepare 2 of 3 application(s)"));

    assert!(good.join("Dockerfile").exists());
    assert!(good.join("package.json").exists());
    assert!(!broken.join("Dockerfile").exists());
}

#[test]
fn test_prepare_with_base_package_template() {
    let tmp = TempDir::new().unwrap();
    write_catalog(tmp.path());
    write(
        &tmp.path().join("base/package.json.j2"),
        "{\n  \"name\": \"{{ app.name }}\",\n  \"private\": true,\n  \"dependencies\": {\n\
         {% for d in package.dependencies %}\n    \"{{ d.name }}\": \"{{ d.value }}\"{{ d.sep }}\n{% endfor %}\n  }\n}\n",
    );
    let app = write_app(tmp.path(), "ide", "theia", &["python"], "");

    theia_builder(tmp.path())
        .arg("prepare")
        .arg(&app)
        .assert()
        .success();

    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(app.join("package.json")).unwrap()).unwrap();
    assert_eq!(manifest["name"], "ide");
    assert_eq!(manifest["private"], true);
    assert_eq!(manifest["dependencies"]["@theia/core"], "next");
    assert_eq!(manifest["dependencies"]["@theia/python"], "latest");
}

#[test]
fn test_prepare_explicit_module_dir() {
    let tmp = TempDir::new().unwrap();
    let catalog = tmp.path().join("catalog");
    write_catalog(&catalog);
    let app = write_app(&tmp.path().join("apps"), "ide", "theia", &["go"], "");

    theia_builder(tmp.path())
        .arg("prepare")
        .arg(&app)
        .arg("--module-dir")
        .arg(&catalog)
        .assert()
        .success();

    assert!(app.join("Dockerfile").exists());
}

// ============================================================================
// theia-builder build
// ============================================================================

#[test]
fn test_build_requires_prepare() {
    let tmp = TempDir::new().unwrap();
    write_catalog(tmp.path());
    let app = write_app(tmp.path(), "ide", "theia", &[], "");

    theia_builder(tmp.path())
        .arg("build")
        .arg(&app)
        .arg("--dry-run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("has not been prepared"));
}

#[test]
fn test_build_dry_run_prints_command() {
    let tmp = TempDir::new().unwrap();
    write_catalog(tmp.path());
    let app = write_app(
        tmp.path(),
        "ide",
        "theia",
        &["go"],
        "build:\n  registry: registry.example.com\n  arguments:\n    NODE_VERSION: 18\n",
    );

    theia_builder(tmp.path())
        .arg("prepare")
        .arg(&app)
        .assert()
        .success();

    theia_builder(tmp.path())
        .arg("build")
        .arg(&app)
        .args(["--dry-run", "--no-latest"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--tag acme/ide:2.1.0"))
        .stdout(predicate::str::contains(
            "--tag registry.example.com/acme/ide:2.1.0",
        ))
        .stdout(predicate::str::contains("--build-arg NODE_VERSION=18"))
        .stdout(predicate::str::contains(":latest").not());
}

// ============================================================================
// theia-builder modules / completions
// ============================================================================

#[test]
fn test_modules_lists_catalog() {
    let tmp = TempDir::new().unwrap();
    write_catalog(tmp.path());

    theia_builder(tmp.path())
        .arg("modules")
        .arg("--module-dir")
        .arg(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Bases: theia, theia-alpine"))
        .stdout(predicate::str::contains("python - Python support"))
        .stdout(predicate::str::contains("pip (bool, default `true`)"));
}

#[test]
fn test_modules_filtered_by_base() {
    let tmp = TempDir::new().unwrap();
    write_catalog(tmp.path());

    theia_builder(tmp.path())
        .args(["modules", "--base", "theia-alpine", "--module-dir"])
        .arg(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("go"))
        .stdout(predicate::str::contains("python").not());
}

#[test]
fn test_completions_bash() {
    let tmp = TempDir::new().unwrap();

    theia_builder(tmp.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("theia-builder"));
}
