//! irextract — compiler IR to JSON.
//!
//! Loads a module in the host compiler's textual IR and serializes each
//! defined function (arguments, basic blocks, instructions, operands and
//! types) into one self-contained JSON document per function.

pub mod encode;
pub mod ir;
pub mod logging;
pub mod parser;
pub mod pass;

// Re-export key types for convenience
pub use anyhow::{Context, Result};
pub use encode::{encode_function, FunctionRecord};
pub use parser::parse_module;
use pass::{FunctionPassManager, IrExtractor};
use std::io::Write;

/// Configuration options for extraction
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Only extract the function with this name
    pub function: Option<String>,
    /// Indent the JSON output
    pub pretty: bool,
}

/// Parse `source` and encode its function definitions in module order.
///
/// # Example
/// ```
/// use irextract::{extract, ExtractOptions};
///
/// let src = "define i32 @id(i32 %a) {\nentry:\n  ret i32 %a\n}\n";
/// let records = extract(src, &ExtractOptions::default()).unwrap();
/// assert_eq!(records[0].name, "id");
/// assert_eq!(records[0].ret_type, "I32");
/// ```
pub fn extract(source: &str, options: &ExtractOptions) -> Result<Vec<FunctionRecord>> {
    let module = parse_module(source).context("failed to parse IR module")?;
    Ok(module
        .definitions()
        .filter(|func| selected(options, &func.name))
        .map(encode_function)
        .collect())
}

/// Parse `source` and run the extractor pass over it, writing one JSON
/// line per function to `sink`.
///
/// Returns whether any function was modified, which is always `false`.
pub fn extract_to_writer<W: Write>(source: &str, sink: W, options: &ExtractOptions) -> Result<bool> {
    let module = parse_module(source).context("failed to parse IR module")?;
    let mut manager = FunctionPassManager::new().with_filter(options.function.clone());
    manager.add(Box::new(
        IrExtractor::new(sink).with_pretty(options.pretty),
    ));
    manager.run(&module)
}

fn selected(options: &ExtractOptions, name: &str) -> bool {
    options.function.as_deref().map_or(true, |only| only == name)
}
