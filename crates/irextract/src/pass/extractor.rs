//! The `IRExtractor` pass: one JSON document per function.

use super::FunctionPass;
use crate::encode::encode_function;
use crate::ir::{Function, Module};
use crate::ExtractOptions;
use anyhow::{Context, Result};
use log::debug;
use std::io::Write;

/// Serializes every function it visits to `sink`, one JSON value followed
/// by a newline, flushing after each. Never modifies the IR.
pub struct IrExtractor<W: Write> {
    sink: W,
    pretty: bool,
}

impl<W: Write> IrExtractor<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            pretty: false,
        }
    }

    /// Indent the output. Documents then span several lines.
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}

impl<W: Write> FunctionPass for IrExtractor<W> {
    fn name(&self) -> &'static str {
        "IRExtractor"
    }

    fn run_on_function(&mut self, func: &Function, _module: &Module) -> Result<bool> {
        let record = encode_function(func);
        let written = if self.pretty {
            serde_json::to_writer_pretty(&mut self.sink, &record)
        } else {
            serde_json::to_writer(&mut self.sink, &record)
        };
        written.with_context(|| format!("failed to write JSON for @{}", func.name))?;
        self.sink
            .write_all(b"\n")
            .and_then(|()| self.sink.flush())
            .with_context(|| format!("failed to write JSON for @{}", func.name))?;
        debug!(
            "extracted @{} ({} blocks)",
            func.name,
            record.basic_blocks.len()
        );
        Ok(false)
    }
}

/// Registry constructor.
pub(super) fn create<'a>(
    sink: Box<dyn Write + 'a>,
    options: &ExtractOptions,
) -> Box<dyn FunctionPass + 'a> {
    Box::new(IrExtractor::new(sink).with_pretty(options.pretty))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_module;
    use serde_json::{json, Value};
    use std::io;

    fn run(src: &str, pretty: bool) -> String {
        let module = parse_module(src).unwrap();
        let mut pass = IrExtractor::new(Vec::new()).with_pretty(pretty);
        for func in module.definitions() {
            assert!(!pass.run_on_function(func, &module).unwrap());
        }
        String::from_utf8(pass.into_inner()).unwrap()
    }

    #[test]
    fn test_identity_function_document() {
        let out = run(
            "define i32 @id(i32 %a) {\nentry:\n  ret i32 %a\n}\n",
            false,
        );
        assert!(out.ends_with('\n'));
        assert_eq!(out.lines().count(), 1);
        let doc: Value = serde_json::from_str(out.trim_end()).unwrap();
        assert_eq!(
            doc,
            json!({
                "name": "id",
                "ret_type": "I32",
                "args": [{"name": "a", "type": "I32", "value": "a"}],
                "basic_blocks": [{
                    "name": "entry",
                    "insts": [{
                        "name": "",
                        "opcode": "ret",
                        "type": "Void",
                        "operands": [{"name": "a", "type": "I32", "value": "a"}]
                    }]
                }]
            })
        );
    }

    #[test]
    fn test_keys_are_sorted() {
        let out = run(
            "define i32 @id(i32 %a) {\nentry:\n  ret i32 %a\n}\n",
            false,
        );
        assert!(out.starts_with(r#"{"args":[{"name":"a","type":"I32","value":"a"}],"basic_blocks":"#));
        assert!(out.trim_end().ends_with(r#""name":"id","ret_type":"I32"}"#));
    }

    #[test]
    fn test_pretty_output_parses_back() {
        let out = run("define void @f() {\n  ret void\n}\n", true);
        assert!(out.lines().count() > 1);
        let doc: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(doc["basic_blocks"][0]["name"], "");
    }

    struct FailingSink;

    impl Write for FailingSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_sink_errors_propagate() {
        let module = parse_module("define void @f() {\n  ret void\n}\n").unwrap();
        let mut pass = IrExtractor::new(FailingSink);
        let err = pass
            .run_on_function(&module.functions[0], &module)
            .unwrap_err();
        assert!(err.to_string().contains("@f"), "{err}");
    }
}
