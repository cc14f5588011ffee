/// Document dumping utilities for testing and debugging
///
/// Provides a human-readable tree representation of a parsed feature file.

use crate::ast::*;
use std::fmt::Write as FmtWrite;

/// Dump a document as a pretty-printed tree
pub fn dump_document(document: &Document) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail
    let _ = write_document(&mut out, document, 0);
    out
}

fn write_document(out: &mut String, document: &Document, indent: usize) -> std::fmt::Result {
    writeln!(out, "{}Feature: {}", "  ".repeat(indent), document.feature_name)?;
    write_annotations(out, &document.annotations, indent + 1)?;
    for scenario in &document.scenarios {
        write_scenario(out, scenario, indent + 1)?;
    }
    Ok(())
}

fn write_scenario(out: &mut String, scenario: &Scenario, indent: usize) -> std::fmt::Result {
    let prefix = "  ".repeat(indent);
    writeln!(out, "{}Scenario: {}", prefix, scenario.name)?;
    write_annotations(out, &scenario.annotations, indent + 1)?;
    if scenario.steps.is_empty() {
        writeln!(out, "{}  Steps: (none)", prefix)?;
    } else {
        writeln!(out, "{}  Steps:", prefix)?;
        for step in &scenario.steps {
            writeln!(out, "{}    - {} (line {})", prefix, step.text, step.line)?;
        }
    }
    Ok(())
}

fn write_annotations(out: &mut String, set: &AnnotationSet, indent: usize) -> std::fmt::Result {
    let prefix = "  ".repeat(indent);
    if set.is_empty() {
        return writeln!(out, "{}Annotations: (none)", prefix);
    }
    writeln!(out, "{}Annotations:", prefix)?;
    for (key, value) in set.iter() {
        match value {
            AnnotationValue::String(s) => writeln!(out, "{}  @{} = {:?}", prefix, key, s)?,
            AnnotationValue::List(items) => writeln!(out, "{}  @{} = {:?}", prefix, key, items)?,
        }
    }
    Ok(())
}
