/// Code generation module
///
/// Renders a resolved feature into a JavaScript test module. Each invocation
/// is a two-stage call, `callee(data)(t)`, awaited before the next one runs.
/// All quoting and escaping rules live in this file.

use std::fmt::Write as _;

use crate::catalog::Callee;
use crate::error::Result;
use crate::resolve::{ResolvedFeature, ResolvedInvocation, ResolvedScenario};

/// Name of the shared test-context parameter
const CONTEXT: &str = "t";

/// JavaScript test-module generator
pub struct CodeGenerator {
    /// Indentation level for pretty-printing
    indent: usize,
    /// Output buffer
    output: String,
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeGenerator {
    pub fn new() -> Self {
        Self {
            indent: 0,
            output: String::new(),
        }
    }

    /// Generate the module for one feature.
    ///
    /// `source_name` is only used in the header comment. `step_imports` are
    /// module specifiers of the step files, in load order.
    pub fn generate(
        &mut self,
        feature: &ResolvedFeature,
        source_name: &str,
        step_imports: &[String],
    ) -> Result<String> {
        writeln!(self.output, "// Generated from {}. Do not edit.", source_name)?;
        self.generate_imports(step_imports)?;
        self.output.push('\n');
        self.generate_fixture(feature)?;

        for scenario in &feature.scenarios {
            self.output.push('\n');
            self.generate_test(scenario)?;
        }

        Ok(std::mem::take(&mut self.output))
    }

    /// Import every step file and merge them into the lookup objects
    fn generate_imports(&mut self, step_imports: &[String]) -> Result<()> {
        for (i, specifier) in step_imports.iter().enumerate() {
            writeln!(self.output, "import stepFile{} from \"{}\";", i, escape_string(specifier))?;
        }
        self.output.push('\n');

        let names: Vec<String> = (0..step_imports.len()).map(|i| format!("stepFile{}", i)).collect();
        writeln!(self.output, "const stepFiles = [{}];", names.join(", "))?;
        self.output.push_str("const steps = Object.assign({}, ...stepFiles);\n");
        self.output
            .push_str("const before = Object.assign({}, ...stepFiles.map(s => s.before || {}));\n");
        self.output
            .push_str("const after = Object.assign({}, ...stepFiles.map(s => s.after || {}));\n");
        Ok(())
    }

    fn generate_fixture(&mut self, feature: &ResolvedFeature) -> Result<()> {
        write!(self.output, "fixture `{}`", escape_template_literal(&feature.name))?;
        if let Some(page) = &feature.page {
            write!(self.output, "\n  .page `{}`", escape_template_literal(page))?;
        }
        self.output.push_str(";\n");
        Ok(())
    }

    fn generate_test(&mut self, scenario: &ResolvedScenario) -> Result<()> {
        self.output.push_str("test");
        if let Some(page) = &scenario.page {
            write!(self.output, ".page `{}`", escape_template_literal(page))?;
        }
        writeln!(
            self.output,
            "(`{}`, async {} => {{",
            escape_template_literal(&scenario.name),
            CONTEXT
        )?;

        self.indent += 1;
        for invocation in &scenario.invocations {
            self.write_indent();
            self.generate_invocation(invocation)?;
            self.output.push('\n');
        }
        self.indent -= 1;

        self.output.push_str("});\n");
        Ok(())
    }

    /// `await <callee>(<json>)(t);`
    fn generate_invocation(&mut self, invocation: &ResolvedInvocation) -> Result<()> {
        let data = invocation.argument.to_json()?;
        write!(
            self.output,
            "await {}({})({});",
            call_expression(&invocation.callee),
            data,
            CONTEXT
        )?;
        Ok(())
    }

    /// Write current indentation
    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.output.push_str("  ");
        }
    }
}

/// Expression that evaluates to the factory of a callee
pub fn call_expression(callee: &Callee) -> String {
    match callee {
        Callee::Hook { kind, key } if is_identifier(key) => format!("{}.{}", kind, key),
        Callee::Hook { kind, key } => format!("{}[`{}`]", kind, escape_template_literal(key)),
        Callee::Step { text } => format!("steps[`{}`]", escape_template_literal(text)),
    }
}

/// Whether `s` can follow a `.` in a member expression
fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Escape a string for double-quoted JavaScript string literal
fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

/// Escape a string for JavaScript template literal
fn escape_template_literal(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('`', "\\`")
        .replace("${", "\\${")
}
