//! Export through stand-in shell scripts for the converter and rasterizer.

#![cfg(unix)]

mod common;

use common::{Project, describe};

/// Copies the markdown input to the `--output=` path.
const FAKE_CONVERTER: &str =
    r#"for a; do case "$a" in --output=*) out="$${a#--output=}";; esac; done; cp "$1" "$out""#;

/// Touches `<outdir>/<stem>.pdf`.
const FAKE_RASTERIZER: &str = r#"name=$(basename "$4"); touch "$6/$${name%.*}.pdf""#;

fn volumes_with(converter: &str, rasterizer: &str) -> String {
    format!(
        "\
volumes:
  volume-001:
    title: Volume One
  volume-002:
    title: Volume Two
export:
  timeout: 10s
  resource_path: null
  converter:
    - ['sh', '-c', '{converter}', 'sh']
  rasterizer:
    - ['sh', '-c', '{rasterizer}', 'sh']
"
    )
}

fn project(converter: &str, rasterizer: &str) -> Project {
    let project = Project::standard();
    project.write("volumes.yaml", &volumes_with(converter, rasterizer));
    project.write("templates/Default.ott", "template");
    project
}

fn build(project: &Project) -> std::process::Output {
    project.run(&["build", "volumes.yaml", "styles.yaml", "entities.nam"])
}

#[test]
fn build_exports_document_and_pdf() {
    let project = project(FAKE_CONVERTER, FAKE_RASTERIZER);
    let output = build(&project);

    assert!(output.status.success(), "{}", describe(&output));
    assert_eq!(
        project.read("build/volume-001.odt"),
        project.read("obj/custom/volume-001.md")
    );
    assert!(project.path("build/volume-001.pdf").exists());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("1 of 2 volumes succeeded"), "{stdout}");
    assert!(stdout.contains("built"), "{stdout}");
}

#[test]
fn missing_rasterizer_keeps_document() {
    let project = project(FAKE_CONVERTER, "exit 0");
    let output = build(&project);

    assert!(output.status.success(), "{}", describe(&output));
    assert!(project.path("build/volume-001.odt").exists());
    assert!(!project.path("build/volume-001.pdf").exists());
}

#[test]
fn missing_converter_fails_the_build() {
    let project = Project::standard();
    project.write(
        "volumes.yaml",
        "volumes:\n  volume-001:\n    title: Volume One\nexport:\n  converter: [bookwright-no-such-converter]\n",
    );
    project.write("templates/Default.ott", "template");

    let output = build(&project);

    assert_eq!(output.status.code(), Some(5), "{}", describe(&output));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("bookwright-no-such-converter"), "{stderr}");
    assert!(!project.path("build/volume-001.odt").exists());
}

#[test]
fn missing_template_fails_the_volume() {
    let project = project(FAKE_CONVERTER, FAKE_RASTERIZER);
    std::fs::remove_file(project.path("templates/Default.ott")).unwrap();

    let output = build(&project);

    assert_eq!(output.status.code(), Some(5), "{}", describe(&output));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Default.ott not found"), "{stderr}");
}

#[test]
fn export_command_after_skipped_export() {
    let project = project(FAKE_CONVERTER, FAKE_RASTERIZER);
    let prepared = project.run(&[
        "build",
        "volumes.yaml",
        "styles.yaml",
        "entities.nam",
        "--skip-export",
    ]);
    assert!(prepared.status.success(), "{}", describe(&prepared));

    let output = project.run(&["export", "volumes.yaml", "--volume", "volume-001"]);

    assert!(output.status.success(), "{}", describe(&output));
    assert!(project.path("build/volume-001.odt").exists());
    assert!(project.path("build/volume-001.pdf").exists());
}
