//! Logger initialisation for the `log` facade.
//!
//! Log levels are used as follows:
//!
//! - `warn!` - the requested function does not exist, nothing was written
//! - `info!` - input and output files
//! - `debug!` - per-function progress (parsing, extraction)
//! - `trace!` - per-block encoding
//!
//! The binary reads `RUST_LOG` (default `warn`); `-v`/`-vv` override it:
//!
//! ```bash
//! RUST_LOG=debug irextract input.ll -o out.jsonl
//! RUST_LOG=irextract::parser=trace irextract input.ll
//! ```
//!
//! Log records go to stderr, which is also the default JSON sink. Pass
//! `-o` when both are wanted.

use env_logger::Builder;
use log::LevelFilter;
use std::io::Write;
use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize logging with a fixed level.
///
/// Only the first call has an effect.
pub fn init_with_level(level: LevelFilter) {
    INIT.call_once(|| {
        Builder::new()
            .filter_level(level)
            .format(|buf, record| {
                writeln!(
                    buf,
                    "[{:5}] {} - {}",
                    record.level(),
                    record.target(),
                    record.args()
                )
            })
            .init();
    });
}

/// Initialize logging from `RUST_LOG`, defaulting to `warn`.
///
/// Only the first call has an effect.
pub fn init_from_env() {
    INIT.call_once(|| {
        Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    });
}

/// Level selected by the number of `-v` flags.
pub fn level_for_verbosity(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Initialize logging for tests; output is captured by the test harness.
pub fn init_test() {
    // try_init: several tests in one binary may call this.
    let _ = env_logger::builder()
        .filter_level(LevelFilter::Warn)
        .is_test(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_test_is_idempotent() {
        init_test();
        init_test();
        log::debug!("not shown at warn level");
    }

    #[test]
    fn test_level_for_verbosity() {
        assert_eq!(level_for_verbosity(0), LevelFilter::Warn);
        assert_eq!(level_for_verbosity(1), LevelFilter::Debug);
        assert_eq!(level_for_verbosity(5), LevelFilter::Trace);
    }
}
