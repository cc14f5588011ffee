/// Step resolution
///
/// Binds every hook key and step line of a document to a catalog entry and
/// the annotation payload it is called with. The result is plain data,
/// ordered the way it must execute: before-hooks, steps, after-hooks.

use std::path::Path;

use annotest_parser::{AnnotationSet, Document};
use thiserror::Error;

use crate::catalog::{Callee, HookKind, StepCatalog};
use crate::error::CompileError;
use crate::merge::{MergedScenario, URL_KEY, invocation_data, merge_document};

/// Resolution failure, before the feature file is attached
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("unknown {kind} hook '{key}'")]
    UnknownHook { kind: HookKind, key: String },

    #[error("unknown step '{text}' (line {line})")]
    UnknownStep { text: String, line: usize },
}

impl ResolveError {
    /// Attach the feature file the error came from
    pub fn in_file(self, file: &Path) -> CompileError {
        match self {
            ResolveError::UnknownHook { kind, key } => CompileError::UnknownHook {
                file: file.to_path_buf(),
                kind,
                key,
            },
            ResolveError::UnknownStep { text, line } => CompileError::UnknownStep {
                file: file.to_path_buf(),
                text,
                line,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationKind {
    Before,
    Step,
    After,
}

/// A hook or step call, bound to its implementation and argument
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedInvocation {
    pub kind: InvocationKind,
    pub callee: Callee,
    /// Serialized as the JSON argument of the call
    pub argument: AnnotationSet,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedScenario {
    pub name: String,
    /// Page to open when it differs from the feature's page
    pub page: Option<String>,
    pub invocations: Vec<ResolvedInvocation>,
}

/// Everything the code generator needs for one feature file
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFeature {
    pub name: String,
    pub page: Option<String>,
    pub scenarios: Vec<ResolvedScenario>,
}

/// Resolve a whole document against a step catalog
pub fn resolve_document(
    document: &Document,
    catalog: &dyn StepCatalog,
) -> Result<ResolvedFeature, ResolveError> {
    let page = document
        .annotations
        .get(URL_KEY)
        .and_then(|v| v.as_str())
        .map(str::to_string);

    let scenarios = merge_document(document)
        .iter()
        .map(|merged| resolve_scenario(merged, page.as_deref(), catalog))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ResolvedFeature {
        name: document.feature_name.clone(),
        page,
        scenarios,
    })
}

fn resolve_scenario(
    merged: &MergedScenario<'_>,
    feature_page: Option<&str>,
    catalog: &dyn StepCatalog,
) -> Result<ResolvedScenario, ResolveError> {
    let mut invocations = resolve_hooks(merged, HookKind::Before, catalog)?;

    let step_data = invocation_data(&merged.merged);
    for step in &merged.scenario.steps {
        let callee = catalog
            .resolve_step(&step.text)
            .ok_or_else(|| ResolveError::UnknownStep {
                text: step.text.clone(),
                line: step.line,
            })?;
        invocations.push(ResolvedInvocation {
            kind: InvocationKind::Step,
            callee,
            argument: step_data.clone(),
        });
    }

    invocations.extend(resolve_hooks(merged, HookKind::After, catalog)?);

    let page = merged
        .url()
        .filter(|url| Some(*url) != feature_page)
        .map(str::to_string);

    Ok(ResolvedScenario {
        name: merged.scenario.name.clone(),
        page,
        invocations,
    })
}

fn resolve_hooks(
    merged: &MergedScenario<'_>,
    kind: HookKind,
    catalog: &dyn StepCatalog,
) -> Result<Vec<ResolvedInvocation>, ResolveError> {
    let argument = invocation_data(merged.hook_annotations(kind));
    let invocation_kind = match kind {
        HookKind::Before => InvocationKind::Before,
        HookKind::After => InvocationKind::After,
    };

    merged
        .hook_keys(kind)
        .into_iter()
        .map(|key| -> Result<ResolvedInvocation, ResolveError> {
            let callee = catalog
                .resolve_hook(kind, key)
                .ok_or_else(|| ResolveError::UnknownHook {
                    kind,
                    key: key.to_string(),
                })?;
            Ok(ResolvedInvocation {
                kind: invocation_kind,
                callee,
                argument: argument.clone(),
            })
        })
        .collect()
}
