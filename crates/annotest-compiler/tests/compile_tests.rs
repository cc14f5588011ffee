/// Integration tests for the full compilation pipeline

use std::fs;
use std::path::{Path, PathBuf};

use annotest_compiler::{CompileError, CompileOptions, Compiler, MemorySink};
use tempfile::TempDir;

const DEMO_FEATURE: &str = r#"@top=foo,bar
@url=/top
@before=all
Feature: Demo

@url=/page
@sub=["a", "b", "c"]
@str="foo, bar, baz, buzz"
@after=justOne
Scenario: Test
  When I test
"#;

const DEMO_STEPS: &str = r#"export default {
  before: {
    all: () => t => {},
  },
  after: {
    justOne: () => t => {},
  },
  'When I test': () => t => {},
};
"#;

/// A scratch project with `e2e/features` and `e2e/steps`
struct Project {
    dir: TempDir,
}

impl Project {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("failed to create temp dir"),
        }
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    fn file(self, relative: &str, contents: &str) -> Self {
        let path = self.path(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        self
    }

    fn options(&self) -> CompileOptions {
        CompileOptions::new(self.path("e2e/features"), self.path("tmp/tests/generated"))
            .step_file(self.path("e2e/steps/test.js"))
    }

    fn demo() -> Self {
        Project::new()
            .file("e2e/features/test.feature", DEMO_FEATURE)
            .file("e2e/steps/test.js", DEMO_STEPS)
    }
}

fn output_of(sink: &MemorySink, path: &Path) -> String {
    sink.get(path)
        .unwrap_or_else(|| panic!("no output written to {}", path.display()))
}

#[test]
fn test_demo_feature() {
    let project = Project::demo();
    let sink = MemorySink::new();
    Compiler::new(project.options().strict(true))
        .compile_to(&sink)
        .expect("compilation failed");

    assert_eq!(sink.len(), 1);
    let js = output_of(&sink, &project.path("tmp/tests/generated/test.js"));

    let data = r#"{"top":["foo","bar"],"sub":["a","b","c"],"str":"foo, bar, baz, buzz"}"#;
    assert!(js.contains(r#"await before.all({"top":["foo","bar"]})(t);"#));
    assert!(js.contains(&format!("await steps[`When I test`]({})(t);", data)));
    assert!(js.contains(&format!("await after.justOne({})(t);", data)));
    assert!(js.contains("import stepFile0 from \"../../../e2e/steps/test.js\";"));
    assert!(js.contains("fixture `Demo`\n  .page `/top`;"));
    assert!(js.contains("test.page `/page`(`Test`, async t => {"));
}

#[test]
fn test_invocation_order() {
    let project = Project::new()
        .file(
            "e2e/features/order.feature",
            "@before=all\nFeature: Order\n@after=justOne\nScenario: S\n  Given one\n  Then two\n",
        )
        .file(
            "e2e/steps/test.js",
            "export default { before: { all() {} }, after: { justOne() {} }, 'Given one': f, 'Then two': f };",
        );
    let sink = MemorySink::new();
    Compiler::new(project.options()).compile_to(&sink).unwrap();

    let js = output_of(&sink, &project.path("tmp/tests/generated/order.js"));
    let position = |needle: &str| js.find(needle).unwrap_or_else(|| panic!("missing {}", needle));
    let before = position("before.all(");
    let one = position("steps[`Given one`](");
    let two = position("steps[`Then two`](");
    let after = position("after.justOne(");
    assert!(before < one && one < two && two < after);
}

#[test]
fn test_writes_to_disk() {
    let project = Project::demo().file("e2e/features/shop/cart.feature", "Feature: Cart\n");
    let output = Compiler::new(project.options()).compile().unwrap();

    assert_eq!(output.files.len(), 2);
    let cart = fs::read_to_string(project.path("tmp/tests/generated/shop/cart.js")).unwrap();
    assert!(cart.contains("fixture `Cart`;"));
    assert!(cart.contains("import stepFile0 from \"../../../../e2e/steps/test.js\";"));
    assert!(project.path("tmp/tests/generated/test.js").exists());
}

#[test]
fn test_unknown_step_writes_nothing() {
    let project = Project::demo().file(
        "e2e/features/test.feature",
        "Feature: Demo\nScenario: Test\n  When I dance\n",
    );
    let sink = MemorySink::new();
    let err = Compiler::new(project.options().strict(true))
        .compile_to(&sink)
        .unwrap_err();

    match err {
        CompileError::UnknownStep { text, line, .. } => {
            assert_eq!(text, "When I dance");
            assert_eq!(line, 3);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(sink.is_empty());
}

#[test]
fn test_best_effort_continues_past_failures() {
    let project = Project::demo()
        .file("e2e/features/a_broken.feature", "  When I test\n")
        .file("e2e/features/b_hook.feature", "@before=missing\nFeature: B\nScenario: S\n");
    let sink = MemorySink::new();
    let err = Compiler::new(project.options()).compile_to(&sink).unwrap_err();

    match err {
        CompileError::Multiple(errors) => {
            assert_eq!(errors.len(), 2);
            assert!(matches!(errors[0], CompileError::Parse { .. }));
            assert!(matches!(errors[1], CompileError::UnknownHook { ref key, .. } if key == "missing"));
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(sink.len(), 1);
    assert!(sink.get(project.path("tmp/tests/generated/test.js")).is_some());
}

#[test]
fn test_strict_mode_halts_on_first_failure() {
    let project = Project::demo().file("e2e/features/a_broken.feature", "Scenario: x\n");
    let sink = MemorySink::new();
    let err = Compiler::new(project.options().strict(true))
        .compile_to(&sink)
        .unwrap_err();

    assert!(matches!(err, CompileError::Parse { .. }));
    assert!(sink.is_empty());
}

#[test]
fn test_later_step_file_extends_catalog() {
    let project = Project::demo()
        .file(
            "e2e/features/test.feature",
            "Feature: Demo\n@after=cleanup\nScenario: Test\n  When I test\n  Then I log out\n",
        )
        .file(
            "e2e/steps/extra.json",
            r#"{ "after": { "cleanup": null }, "Then I log out": null }"#,
        );
    let options = project.options().step_file(project.path("e2e/steps/extra.json"));
    let sink = MemorySink::new();
    Compiler::new(options).compile_to(&sink).unwrap();

    let js = output_of(&sink, &project.path("tmp/tests/generated/test.js"));
    assert!(js.contains("import stepFile1 from \"../../../e2e/steps/extra.js\";"));
    assert!(!js.contains("extra.json"));
    assert!(js.contains("const stepFiles = [stepFile0, stepFile1];"));
    assert!(js.contains("await after.cleanup({})(t);"));
}

#[test]
fn test_json_manifest_for_loaded_script_adds_no_import() {
    let project = Project::demo()
        .file(
            "e2e/features/test.feature",
            "Feature: Demo
Scenario: Test
  When I test
  Then I log out
",
        )
        .file(
            "e2e/steps/keys.json",
            r#"{ "module": "test.js", "Then I log out": null }"#,
        );
    let options = project.options().step_file(project.path("e2e/steps/keys.json"));
    let sink = MemorySink::new();
    Compiler::new(options).compile_to(&sink).unwrap();

    let js = output_of(&sink, &project.path("tmp/tests/generated/test.js"));
    assert!(js.contains("import stepFile0 from \"../../../e2e/steps/test.js\";"));
    assert!(!js.contains("stepFile1"));
    assert!(!js.contains(".json"));
    assert!(js.contains("const stepFiles = [stepFile0];"));
}

#[test]
fn test_missing_inputs() {
    let project = Project::new().file("e2e/steps/test.js", DEMO_STEPS);
    let err = Compiler::new(project.options()).compile_to(&MemorySink::new()).unwrap_err();
    assert!(matches!(err, CompileError::FileNotFound(_)));

    let project = Project::new().file("e2e/features/test.feature", DEMO_FEATURE);
    let err = Compiler::new(project.options()).compile_to(&MemorySink::new()).unwrap_err();
    assert!(matches!(err, CompileError::FileNotFound(_)));
}

#[test]
fn test_ignores_non_feature_files() {
    let project = Project::demo().file("e2e/features/README.md", "# not a feature");
    let sink = MemorySink::new();
    let output = Compiler::new(project.options()).compile_to(&sink).unwrap();
    assert_eq!(output.files.len(), 1);
    assert_eq!(sink.len(), 1);
}
