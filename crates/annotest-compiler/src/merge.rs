/// Annotation merging
///
/// Combines document-level and scenario-level annotations into the contexts
/// each invocation receives. Before-hooks only ever see the document level;
/// steps and after-hooks see the merged set, where scenario keys win.

use annotest_parser::{AnnotationSet, Document, Scenario};

use crate::catalog::HookKind;

/// Annotation key consumed as the page to open
pub const URL_KEY: &str = "url";

/// Keys with compiler meaning, never forwarded as invocation data
pub const RESERVED_KEYS: [&str; 3] = ["before", "after", URL_KEY];

/// Annotation contexts of one scenario
#[derive(Debug, Clone, PartialEq)]
pub struct MergedScenario<'doc> {
    pub scenario: &'doc Scenario,
    /// Document annotations only; the before-hook context
    pub document: &'doc AnnotationSet,
    /// Document annotations overridden by scenario annotations
    pub merged: AnnotationSet,
}

impl MergedScenario<'_> {
    /// Context a hook of the given kind is bound and called with
    pub fn hook_annotations(&self, kind: HookKind) -> &AnnotationSet {
        match kind {
            HookKind::Before => self.document,
            HookKind::After => &self.merged,
        }
    }

    /// Hook keys declared for this scenario.
    ///
    /// `after` follows the merge rule. `before` also does: a scenario that
    /// declares `@before` replaces the document's list for itself.
    pub fn hook_keys(&self, kind: HookKind) -> Vec<&str> {
        self.merged
            .get(kind.as_str())
            .map(|value| value.tokens().into_iter().filter(|t| !t.is_empty()).collect())
            .unwrap_or_default()
    }

    /// Page for this scenario, if any
    pub fn url(&self) -> Option<&str> {
        self.merged.get(URL_KEY).and_then(|v| v.as_str())
    }
}

/// Merge annotations for every scenario of a document, in order
pub fn merge_document(document: &Document) -> Vec<MergedScenario<'_>> {
    document
        .scenarios
        .iter()
        .map(|scenario| {
            if scenario.annotations.contains_key(HookKind::Before.as_str()) {
                tracing::debug!(
                    scenario = %scenario.name,
                    "scenario-level @before overrides the document's before hooks"
                );
            }
            MergedScenario {
                scenario,
                document: &document.annotations,
                merged: document.annotations.merged_with(&scenario.annotations),
            }
        })
        .collect()
}

/// The JSON payload handed to a hook or step: annotations minus reserved keys
pub fn invocation_data(annotations: &AnnotationSet) -> AnnotationSet {
    annotations.without(&RESERVED_KEYS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use annotest_parser::{AnnotationValue, parse};

    const DEMO: &str = "\
@top=foo,bar
@url=/top
@before=all
Feature: Demo

@url=/page
@top=override
@after=justOne
Scenario: Test
  When I test
";

    #[test]
    fn test_scenario_keys_win() {
        let doc = parse(DEMO).unwrap();
        let merged = merge_document(&doc);
        assert_eq!(merged.len(), 1);
        let m = &merged[0];
        assert_eq!(m.merged.get("top"), Some(&AnnotationValue::from("override")));
        assert_eq!(m.url(), Some("/page"));
        assert_eq!(
            m.merged.keys().collect::<Vec<_>>(),
            vec!["top", "url", "before", "after"]
        );
    }

    #[test]
    fn test_disjoint_keys_union() {
        let doc = parse("@a=1\nFeature: F\n@b=2\nScenario: S\n").unwrap();
        let merged = merge_document(&doc);
        assert_eq!(merged[0].merged.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_before_context_is_document_only() {
        let doc = parse(DEMO).unwrap();
        let merged = merge_document(&doc);
        let before = merged[0].hook_annotations(HookKind::Before);
        assert_eq!(before.get("top"), Some(&AnnotationValue::from(vec!["foo", "bar"])));
        assert!(!before.contains_key("after"));
        let after = merged[0].hook_annotations(HookKind::After);
        assert_eq!(after.get("top"), Some(&AnnotationValue::from("override")));
    }

    #[test]
    fn test_hook_keys() {
        let doc = parse("@before=a, b\nFeature: F\n@before=c\nScenario: One\nScenario: Two\n").unwrap();
        let merged = merge_document(&doc);
        assert_eq!(merged[0].hook_keys(HookKind::Before), vec!["c"]);
        assert_eq!(merged[1].hook_keys(HookKind::Before), vec!["a", "b"]);
        assert!(merged[1].hook_keys(HookKind::After).is_empty());
    }

    #[test]
    fn test_invocation_data_strips_reserved_keys() {
        let doc = parse(DEMO).unwrap();
        let merged = merge_document(&doc);
        let data = invocation_data(&merged[0].merged);
        assert_eq!(data.to_json().unwrap(), r#"{"top":"override"}"#);
    }
}
