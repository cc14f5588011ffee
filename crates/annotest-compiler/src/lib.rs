/// Feature compiler
///
/// Compiles annotated feature files into JavaScript end-to-end test modules
/// that call externally supplied step definitions.

pub mod catalog;
pub mod codegen;
pub mod driver;
pub mod error;
pub mod logging;
pub mod merge;
pub mod resolve;
pub mod sink;
pub mod step_file;

pub use catalog::{Callee, HookKind, StepCatalog, StepManifest, StepModule};
pub use codegen::CodeGenerator;
pub use driver::{CompileOptions, CompileOutput, Compiler, GeneratedFile};
pub use error::{CompileError, Result};
pub use merge::{MergedScenario, merge_document};
pub use resolve::{
    InvocationKind, ResolveError, ResolvedFeature, ResolvedInvocation, ResolvedScenario,
    resolve_document,
};
pub use sink::{FsSink, MemorySink, OutputSink};
pub use step_file::load_manifest;
