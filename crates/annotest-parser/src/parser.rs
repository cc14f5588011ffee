/// Line-oriented parser for annotated feature files
///
/// Each line is classified on its own, then fed through a three-state
/// machine. The state and the pending annotation buffer travel through the
/// fold explicitly; nothing is kept in ambient mutable fields.

use crate::ast::{AnnotationSet, Document, Scenario, StepLine};
use crate::coerce::coerce;
use crate::error::ParseError;

const FEATURE_HEADER: &str = "Feature:";
const SCENARIO_HEADER: &str = "Scenario:";

/// A classified source line
#[derive(Debug, Clone, PartialEq, Eq)]
enum Line<'a> {
    Blank,
    Comment,
    Annotation { key: &'a str, raw: &'a str },
    Feature(&'a str),
    Scenario(&'a str),
    Text(&'a str),
}

fn classify(raw: &str, line: usize) -> Result<Line<'_>, ParseError> {
    let text = raw.trim();
    if text.is_empty() {
        return Ok(Line::Blank);
    }
    if text.starts_with('#') {
        return Ok(Line::Comment);
    }
    if let Some(directive) = text.strip_prefix('@') {
        let (key, raw) = directive.split_once('=').ok_or_else(|| {
            ParseError::malformed(line, format!("annotation '{}' has no '=value'", text))
        })?;
        let key = key.trim();
        if key.is_empty() || key.contains(char::is_whitespace) {
            return Err(ParseError::malformed(
                line,
                format!("invalid annotation key in '{}'", text),
            ));
        }
        return Ok(Line::Annotation { key, raw });
    }
    if let Some(name) = text.strip_prefix(FEATURE_HEADER) {
        return Ok(Line::Feature(name.trim()));
    }
    if let Some(name) = text.strip_prefix(SCENARIO_HEADER) {
        return Ok(Line::Scenario(name.trim()));
    }
    // trailing whitespace is part of the step text
    Ok(Line::Text(raw.trim_start()))
}

/// Where the cursor is in the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    /// Before the `Feature:` header; annotations belong to the document
    ExpectFeature,
    /// After `Feature:`, before the first `Scenario:`
    InDocumentPreamble,
    /// Inside a scenario; text lines are steps
    InScenario,
}

/// Accumulated parse output plus the annotation buffer of the current level
#[derive(Debug, Default)]
struct Builder {
    feature_name: Option<String>,
    annotations: AnnotationSet,
    scenarios: Vec<Scenario>,
    pending: AnnotationSet,
}

impl Builder {
    fn finish(self, last_line: usize) -> Result<Document, ParseError> {
        let feature_name = self
            .feature_name
            .ok_or_else(|| ParseError::malformed(last_line, "missing 'Feature:' header"))?;
        if !self.pending.is_empty() {
            return Err(ParseError::malformed(
                last_line,
                "annotations at end of file are not followed by a 'Scenario:' header",
            ));
        }
        Ok(Document {
            feature_name,
            annotations: self.annotations,
            scenarios: self.scenarios,
        })
    }
}

fn transition(
    cursor: Cursor,
    mut builder: Builder,
    line: Line<'_>,
    number: usize,
) -> Result<(Cursor, Builder), ParseError> {
    match (cursor, line) {
        (_, Line::Blank | Line::Comment) => Ok((cursor, builder)),

        (_, Line::Annotation { key, raw }) => {
            let value = coerce(raw).map_err(|e| ParseError::MalformedAnnotationValue {
                line: number,
                key: key.to_string(),
                message: e.0,
            })?;
            builder.pending.insert(key, value);
            Ok((cursor, builder))
        }

        (Cursor::ExpectFeature, Line::Feature(name)) => {
            builder.feature_name = Some(name.to_string());
            builder.annotations = std::mem::take(&mut builder.pending);
            Ok((Cursor::InDocumentPreamble, builder))
        }
        (_, Line::Feature(_)) => Err(ParseError::malformed(number, "duplicate 'Feature:' header")),

        (Cursor::ExpectFeature, Line::Scenario(_)) => Err(ParseError::malformed(
            number,
            "'Scenario:' before the 'Feature:' header",
        )),
        (_, Line::Scenario(name)) => {
            builder.scenarios.push(Scenario {
                name: name.to_string(),
                annotations: std::mem::take(&mut builder.pending),
                steps: Vec::new(),
            });
            Ok((Cursor::InScenario, builder))
        }

        (Cursor::InScenario, Line::Text(text)) => {
            if !builder.pending.is_empty() {
                return Err(ParseError::malformed(
                    number,
                    "annotations inside a scenario must precede a 'Scenario:' header",
                ));
            }
            if let Some(scenario) = builder.scenarios.last_mut() {
                scenario.steps.push(StepLine::new(text, number));
            }
            Ok((cursor, builder))
        }
        (Cursor::ExpectFeature, Line::Text(text)) => Err(ParseError::malformed(
            number,
            format!("'{}' appears before the 'Feature:' header", text),
        )),
        (Cursor::InDocumentPreamble, Line::Text(text)) => Err(ParseError::malformed(
            number,
            format!("step '{}' appears before any 'Scenario:' header", text),
        )),
    }
}

/// Parse the full text of one feature file into a [`Document`]
pub fn parse(input: &str) -> Result<Document, ParseError> {
    let mut cursor = Cursor::ExpectFeature;
    let mut builder = Builder::default();
    let mut last_line = 1;

    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    for (index, text) in input.lines().enumerate() {
        let number = index + 1;
        let line = classify(text, number)?;
        (cursor, builder) = transition(cursor, builder, line, number)?;
        last_line = number;
    }

    builder.finish(last_line)
}
