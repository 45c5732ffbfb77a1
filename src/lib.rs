//! A deobfuscator for scripts that hide their strings behind decoder calls.
//!
//! Obfuscators commonly replace every string constant with a call such as
//! `Ot(5)` into a decoder function, often reached through several aliases.
//! Given the decoders themselves, this crate **restores** the strings and
//! tidies the property accesses they unlock.
//!
//! ## Pipeline
//! 1. Parse the source ([`codegen::parse`]).
//! 2. Follow decoder aliases per function scope and replace resolvable
//!    `alias(<number>)` calls with string literals ([`decode_strings`]).
//! 3. Rewrite `obj["name"]` as `obj.name` ([`normalize_members`]).
//! 4. Regenerate the source ([`codegen::emit`]).
//!
//! Calls that cannot be decoded are left untouched and reported; only
//! unparsable input fails the whole run.
//!
//! # Examples
//!
//! ```rust
//! use deobfuscator_rs::{DecodeError, DecoderRegistry};
//!
//! let registry = DecoderRegistry::new().with("Ot", |index: i64| match index {
//!     5 => Ok("title".to_owned()),
//!     _ => Err(DecodeError::OutOfDomain(index)),
//! });
//!
//! let result = deobfuscator_rs::deobfuscate("var a = Ot; console.log(document[a(5)]);", &registry).unwrap();
//! assert!(result.code.contains("console.log(document.title);"));
//! assert_eq!(result.report.decoded, 1);
//! ```

use std::path::Path;

use tracing::info;

pub mod codegen;
mod config;
mod error;
mod normalizer;
mod output;
mod registry;
mod rewriter;
mod scope;

pub use crate::codegen::{ParsedSource, Position};
pub use crate::config::Options;
pub use crate::error::{DecodeError, Error, Result};
pub use crate::normalizer::{is_identifier_name, normalize_members};
pub use crate::output::write_atomic;
pub use crate::registry::{Decoder, DecoderKey, DecoderRegistry};
pub use crate::rewriter::{DecodeFailure, DecodeSummary, decode_strings};
pub use crate::scope::AliasEnvironment;

/// What a deobfuscation run changed and what it had to leave alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    /// Decoder calls replaced by string literals.
    pub decoded: usize,
    /// Decoder calls left as written, in source order.
    pub failures: Vec<DecodeFailure>,
    /// Computed member accesses rewritten to dot syntax.
    pub normalized_members: usize,
}

/// Regenerated source together with its [`Report`].
#[derive(Debug, Clone)]
pub struct Deobfuscated {
    pub code: String,
    pub report: Report,
}

/// Deobfuscates `source` with the default [`Options`].
///
/// # Errors
///
/// Returns [`Error::Parse`] if `source` is not valid JavaScript, in which
/// case nothing is rewritten. Individual decoder failures are not errors;
/// see [`Report::failures`].
#[inline]
pub fn deobfuscate(source: &str, registry: &DecoderRegistry) -> Result<Deobfuscated> {
    deobfuscate_with_options(source, registry, &Options::default())
}

/// Deobfuscates `source` with explicit [`Options`].
///
/// # Errors
///
/// Returns [`Error::Parse`] for malformed input and [`Error::Emit`] or
/// [`Error::Utf8`] if the rewritten tree cannot be printed.
///
/// # Examples
///
/// ```rust
/// use deobfuscator_rs::{DecodeError, DecoderRegistry, Options};
///
/// let registry = DecoderRegistry::new().with("Ot", |index: i64| match index {
///     0 => Ok("log".to_owned()),
///     _ => Err(DecodeError::OutOfDomain(index)),
/// });
///
/// let options = Options::default().with_normalize_members(false);
/// let result =
///     deobfuscator_rs::deobfuscate_with_options("console[Ot(0)](Ot(1));", &registry, &options)
///         .unwrap();
///
/// assert!(result.code.contains(r#"console["log"](Ot(1));"#));
/// assert_eq!(result.report.failures.len(), 1);
/// ```
pub fn deobfuscate_with_options(
    source: &str,
    registry: &DecoderRegistry,
    options: &Options,
) -> Result<Deobfuscated> {
    let mut parsed = codegen::parse(source, options)?;

    let (program, source_map) = parsed.parts_mut();
    let summary = decode_strings(program, registry, Some(source_map));
    let normalized_members = if options.normalize_members {
        normalize_members(&mut parsed.program)
    } else {
        0
    };

    let code = codegen::emit(&parsed, options)?;
    Ok(Deobfuscated {
        code,
        report: Report {
            decoded: summary.decoded,
            failures: summary.failures,
            normalized_members,
        },
    })
}

/// Reads `input`, deobfuscates it, and writes the result to `output`.
///
/// The output file is replaced atomically: on any error it is either absent
/// or still holds its previous contents.
///
/// # Errors
///
/// Returns [`Error::Read`] or [`Error::Write`] for I/O failures, plus
/// everything [`deobfuscate_with_options`] can return.
pub fn deobfuscate_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    registry: &DecoderRegistry,
    options: &Options,
) -> Result<Report> {
    let (input, output) = (input.as_ref(), output.as_ref());

    let source = crate::output::read_source(input)?;
    let result = deobfuscate_with_options(&source, registry, options)?;
    crate::output::write_atomic(output, &result.code)?;

    info!(
        input = %input.display(),
        output = %output.display(),
        decoded = result.report.decoded,
        failed = result.report.failures.len(),
        "deobfuscated file"
    );
    Ok(result.report)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn ot(index: i64) -> std::result::Result<String, DecodeError> {
        match index {
            5 => Ok("hello".to_owned()),
            6 => Ok("innerHTML".to_owned()),
            7 => Ok("data-id".to_owned()),
            _ => Err(DecodeError::OutOfDomain(index)),
        }
    }

    fn registry() -> DecoderRegistry {
        DecoderRegistry::new()
            .with("Ot", ot)
            .with("mt", |index: i64| -> std::result::Result<String, DecodeError> {
                Err(DecodeError::Failed(format!("mt cannot decode {index}")))
            })
    }

    fn canonical(source: &str) -> String {
        let options = Options::default();
        codegen::emit(&codegen::parse(source, &options).unwrap(), &options).unwrap()
    }

    #[test]
    fn test_deobfuscate() {
        fn check(input: &str, expected: &str) {
            let result = deobfuscate(input, &registry()).unwrap();
            assert_eq!(result.code, canonical(expected), "deobfuscation failed for: {input}");
        }

        check(
            "var a = Ot; el[a(6)] = a(5);",
            r#"var a = Ot; el.innerHTML = "hello";"#,
        );
        check(
            "var a = Ot; el[a(7)] = el[a(6)];",
            r#"var a = Ot; el["data-id"] = el.innerHTML;"#,
        );
        check(
            r#"var a = Ot; function f(){ var a = mt; console.log(a(5)); } console.log(a(5));"#,
            r#"var a = Ot; function f(){ var a = mt; console.log(a(5)); } console.log("hello");"#,
        );
    }

    #[test]
    fn test_report() {
        let source = "var a = Ot, b = mt;\nx[a(5)] = b(1);\nx[a(6)] = a(99);";
        let report = deobfuscate(source, &registry()).unwrap().report;

        assert_eq!(report.decoded, 2);
        assert_eq!(report.normalized_members, 2);

        let failures: Vec<_> = report
            .failures
            .iter()
            .map(|f| (f.callee.as_str(), f.key.as_str(), f.argument, f.position))
            .collect();
        assert_eq!(
            failures,
            [
                ("b", "mt", 1.0, Some(Position { line: 2, column: 11 })),
                ("a", "Ot", 99.0, Some(Position { line: 3, column: 11 })),
            ]
        );
        assert_eq!(
            report.failures[0].error,
            DecodeError::Failed("mt cannot decode 1".to_owned())
        );
    }

    #[test]
    fn test_normalization_disabled() {
        let options = Options::default().with_normalize_members(false);
        let result = deobfuscate_with_options("el[Ot(6)] = x['y'];", &registry(), &options).unwrap();

        assert_eq!(result.code, canonical(r#"el["innerHTML"] = x['y'];"#));
        assert_eq!(result.report.normalized_members, 0);
    }

    #[test]
    fn test_parse_error_aborts() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let registry = DecoderRegistry::new().with("Ot", move |index: i64| {
            counter.fetch_add(1, Ordering::SeqCst);
            ot(index)
        });

        let err = deobfuscate("Ot(5); var = ;", &registry).unwrap_err();
        assert!(matches!(err, Error::Parse { line: 1, .. }), "unexpected error: {err}");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_minified_output() {
        let options = Options::default().with_minify(true);
        let result = deobfuscate_with_options("var a = Ot;\nfoo( a(5) );", &registry(), &options).unwrap();

        assert!(result.code.contains("var a=Ot"), "unexpected output: {}", result.code);
        assert!(result.code.contains(r#"foo("hello")"#), "unexpected output: {}", result.code);
    }

    #[test]
    fn test_shared_registry() {
        let registry = &registry();
        let sources = [
            "var a = Ot; x = a(5);",
            "var a = mt; var b = Ot; x = b(5) + a(5);",
        ];

        let outputs: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = sources
                .into_iter()
                .map(|source| scope.spawn(move || deobfuscate(source, registry).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(outputs[0].code, canonical(r#"var a = Ot; x = "hello";"#));
        assert_eq!(
            outputs[1].code,
            canonical(r#"var a = mt; var b = Ot; x = "hello" + a(5);"#)
        );
    }

    #[test]
    fn test_deobfuscate_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.js");
        let output = dir.path().join("out.js");
        std::fs::write(&input, "var a = Ot; document[a(6)] = a(5);").unwrap();

        let report = deobfuscate_file(&input, &output, &registry(), &Options::default()).unwrap();

        assert_eq!(report.decoded, 2);
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            canonical(r#"var a = Ot; document.innerHTML = "hello";"#)
        );
    }

    #[test]
    fn test_deobfuscate_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.js");

        let err = deobfuscate_file(dir.path().join("missing.js"), &output, &registry(), &Options::default())
            .unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
        assert!(!output.exists());

        let input = dir.path().join("bad.js");
        std::fs::write(&input, "function (").unwrap();
        let err = deobfuscate_file(&input, &output, &registry(), &Options::default()).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
        assert!(!output.exists());
    }
}
