//! Function-pass host.
//!
//! A [`FunctionPassManager`] runs a list of [`FunctionPass`]es over every
//! defined function of a [`Module`], in source order. Passes are registered
//! in [`PASSES`] under the argument name used to select them.

use crate::ir::{Function, Module};
use crate::ExtractOptions;
use anyhow::Result;
use log::{debug, warn};
use std::io::Write;

// ── Passes ───────────────────────────────────────────────────────────────────
pub mod extractor;

pub use extractor::IrExtractor;

/// A pass that visits one function at a time.
pub trait FunctionPass {
    /// Registered argument name of the pass.
    fn name(&self) -> &'static str;

    /// Run on `func`; returns whether the function was modified.
    fn run_on_function(&mut self, func: &Function, module: &Module) -> Result<bool>;
}

/// Builds a pass writing to `sink`.
pub type PassConstructor =
    for<'a> fn(Box<dyn Write + 'a>, &ExtractOptions) -> Box<dyn FunctionPass + 'a>;

/// Registry entry of a pass.
pub struct PassInfo {
    pub arg: &'static str,
    pub description: &'static str,
    pub create: PassConstructor,
}

/// All registered passes.
pub const PASSES: &[PassInfo] = &[PassInfo {
    arg: "IRExtractor",
    description: "Convert IR to JSON",
    create: extractor::create,
}];

/// Find a registered pass by argument name.
pub fn lookup(arg: &str) -> Option<&'static PassInfo> {
    PASSES.iter().find(|info| info.arg == arg)
}

/// Runs function passes over the definitions of a module.
#[derive(Default)]
pub struct FunctionPassManager<'a> {
    passes: Vec<Box<dyn FunctionPass + 'a>>,
    only: Option<String>,
}

impl<'a> FunctionPassManager<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the run to the function called `name`.
    pub fn with_filter(mut self, name: Option<String>) -> Self {
        self.only = name;
        self
    }

    pub fn add(&mut self, pass: Box<dyn FunctionPass + 'a>) {
        self.passes.push(pass);
    }

    /// Run every pass on every selected definition. Declarations have no
    /// body and are never visited.
    pub fn run(&mut self, module: &Module) -> Result<bool> {
        let mut modified = false;
        let mut visited = 0usize;
        for func in module.definitions() {
            if self.only.as_deref().is_some_and(|name| name != func.name) {
                continue;
            }
            visited += 1;
            for pass in &mut self.passes {
                debug!("running {} on @{}", pass.name(), func.name);
                modified |= pass.run_on_function(func, module)?;
            }
        }
        if let Some(name) = &self.only {
            if visited == 0 {
                match module.function(name) {
                    Some(func) if func.is_declaration() => {
                        warn!("@{} is only declared, nothing to run on", name)
                    }
                    _ => warn!("no function definition named @{}", name),
                }
            }
        }
        debug!("visited {} function(s), modified: {}", visited, modified);
        Ok(modified)
    }
}
