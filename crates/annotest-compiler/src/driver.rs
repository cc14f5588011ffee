/// Compiler driver that orchestrates the compilation pipeline
///
/// For every feature file under the source directory: parse, merge, resolve
/// against the step catalog, generate, then hand the module to the output
/// sink. A file is written only when its whole pipeline succeeded.

use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::catalog::{StepCatalog, StepManifest};
use crate::codegen::CodeGenerator;
use crate::error::{CompileError, Result};
use crate::resolve::resolve_document;
use crate::sink::{FsSink, OutputSink};
use crate::step_file::load_manifest;

/// Extension of input feature files
pub const FEATURE_EXTENSION: &str = "feature";

/// Extension of generated modules
pub const OUTPUT_EXTENSION: &str = "js";

/// Options for compilation
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Directory searched recursively for `.feature` files
    pub src_dir: PathBuf,
    /// Directory generated modules are written under
    pub dest_dir: PathBuf,
    /// Step-definition modules, in load order
    pub step_files: Vec<PathBuf>,
    /// Halt the batch on the first failing file
    pub strict: bool,
}

impl CompileOptions {
    pub fn new(src_dir: impl Into<PathBuf>, dest_dir: impl Into<PathBuf>) -> Self {
        Self {
            src_dir: src_dir.into(),
            dest_dir: dest_dir.into(),
            step_files: Vec::new(),
            strict: false,
        }
    }

    pub fn step_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.step_files.push(path.into());
        self
    }

    pub fn step_files<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.step_files.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// One generated module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// Feature file it was compiled from
    pub source: PathBuf,
    /// Path it was written to
    pub output: PathBuf,
    pub javascript: String,
}

/// Compilation output structure
#[derive(Debug, Default)]
pub struct CompileOutput {
    /// Written modules, in source path order
    pub files: Vec<GeneratedFile>,
}

/// The feature compiler
pub struct Compiler {
    options: CompileOptions,
}

impl Compiler {
    /// Create a new compiler with the given options
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }

    /// Compile every feature file and write the results to disk
    pub fn compile(&self) -> Result<CompileOutput> {
        self.compile_to(&FsSink)
    }

    /// Compile every feature file, writing through `sink`.
    ///
    /// In strict mode the first failure is returned and the batch stops.
    /// Otherwise failing files are skipped and reported together as
    /// [`CompileError::Multiple`] once the batch is done.
    pub fn compile_to(&self, sink: &dyn OutputSink) -> Result<CompileOutput> {
        let manifest = load_manifest(&self.options.step_files)?;
        debug!(modules = manifest.modules().len(), "loaded step catalog");
        let sources = self.discover()?;
        debug!(count = sources.len(), "discovered feature files");

        let mut output = CompileOutput::default();
        let mut errors = Vec::new();

        for source in sources {
            match self.compile_file(&source, &manifest).and_then(|file| {
                self.write(sink, &file)?;
                Ok(file)
            }) {
                Ok(file) => {
                    info!(source = %file.source.display(), output = %file.output.display(), "compiled");
                    output.files.push(file);
                }
                Err(e) if self.options.strict => return Err(e),
                Err(e) => {
                    warn!(source = %source.display(), error = %e, "skipping feature file");
                    errors.push(e);
                }
            }
        }

        if errors.is_empty() {
            Ok(output)
        } else {
            Err(CompileError::Multiple(errors))
        }
    }

    /// Read and compile one feature file without writing it
    pub fn compile_file(&self, source: &Path, manifest: &StepManifest) -> Result<GeneratedFile> {
        let _span = tracing::debug_span!("compile_file", file = %source.display()).entered();

        let text = std::fs::read_to_string(source)?;
        let output = self.output_path(source);
        let imports = step_imports(manifest, &output)?;
        let javascript = self.compile_source(source, &text, manifest, &imports)?;

        Ok(GeneratedFile {
            source: source.to_path_buf(),
            output,
            javascript,
        })
    }

    /// Run the pure pipeline over feature text
    pub fn compile_source(
        &self,
        source: &Path,
        text: &str,
        catalog: &dyn StepCatalog,
        step_imports: &[String],
    ) -> Result<String> {
        let document = annotest_parser::parse(text).map_err(|e| CompileError::parse(source, e))?;
        debug!(scenarios = document.scenarios.len(), "parse successful");

        let feature = resolve_document(&document, catalog).map_err(|e| e.in_file(source))?;
        debug!("resolution successful");

        let name = self.relative_source(source);
        let javascript = CodeGenerator::new().generate(&feature, &name, step_imports)?;
        debug!(bytes = javascript.len(), "code generation successful");
        Ok(javascript)
    }

    /// Where the module for `source` is written: the path relative to the
    /// source directory, re-rooted under the destination directory
    pub fn output_path(&self, source: &Path) -> PathBuf {
        let relative = source
            .strip_prefix(&self.options.src_dir)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| source.file_name().map(PathBuf::from).unwrap_or_default());
        self.options
            .dest_dir
            .join(relative)
            .with_extension(OUTPUT_EXTENSION)
    }

    fn relative_source(&self, source: &Path) -> String {
        let relative = source.strip_prefix(&self.options.src_dir).unwrap_or(source);
        to_slash(relative)
    }

    /// All feature files under the source directory, sorted by path
    fn discover(&self) -> Result<Vec<PathBuf>> {
        if !self.options.src_dir.exists() {
            return Err(CompileError::FileNotFound(self.options.src_dir.clone()));
        }

        let mut sources = Vec::new();
        for entry in WalkDir::new(&self.options.src_dir).sort_by_file_name() {
            let entry = entry.map_err(io::Error::from)?;
            let is_feature = entry.path().extension().is_some_and(|ext| ext == FEATURE_EXTENSION);
            if entry.file_type().is_file() && is_feature {
                sources.push(entry.into_path());
            }
        }
        Ok(sources)
    }

    fn write(&self, sink: &dyn OutputSink, file: &GeneratedFile) -> Result<()> {
        sink.write(&file.output, &file.javascript)
            .map_err(|source| CompileError::OutputWrite {
                path: file.output.clone(),
                source,
            })
    }
}

/// Import specifiers of the manifest's scripts, relative to the output module
fn step_imports(manifest: &StepManifest, output: &Path) -> Result<Vec<String>> {
    let parent = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let from = std::path::absolute(parent)?;
    manifest
        .imports()
        .into_iter()
        .map(|script| -> Result<String> {
            let to = std::path::absolute(script)?;
            Ok(module_specifier(&relative_path(&from, &to)))
        })
        .collect()
}

/// Lexically normalize `.` and `..` components
fn normalize(path: &Path) -> Vec<Component<'_>> {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir if matches!(out.last(), Some(Component::Normal(_))) => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

/// Path from directory `from` to `to`; both must be absolute
fn relative_path(from: &Path, to: &Path) -> PathBuf {
    let from = normalize(from);
    let to = normalize(to);
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

    let mut relative = PathBuf::new();
    for _ in common..from.len() {
        relative.push("..");
    }
    for component in &to[common..] {
        relative.push(component.as_os_str());
    }
    relative
}

fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// ES module specifier for a relative path
fn module_specifier(relative: &Path) -> String {
    let slashed = to_slash(relative);
    if slashed.starts_with("../") {
        slashed
    } else {
        format!("./{}", slashed)
    }
}
