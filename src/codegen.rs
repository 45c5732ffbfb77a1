//! Boundary to the swc parser and code generator.
//!
//! [`parse`] turns source text into a [`ParsedSource`] that owns the tree
//! together with the source map needed to report locations, and [`emit`]
//! turns the (possibly rewritten) tree back into text.

use swc_core::common::comments::{Comments, SingleThreadedComments};
use swc_core::common::sync::Lrc;
use swc_core::common::{FileName, GLOBALS, Globals, SourceMap, Span, Spanned};
use swc_core::ecma::ast::Program;
use swc_core::ecma::codegen::text_writer::JsWriter;
use swc_core::ecma::codegen::{Config, Emitter};
use swc_core::ecma::parser::error::Error as ParserError;
use swc_core::ecma::parser::lexer::Lexer;
use swc_core::ecma::parser::{EsConfig, Parser, StringInput, Syntax};

use crate::config::Options;
use crate::error::{Error, Result};

/// A parsed script: the syntax tree plus everything needed to print it again.
pub struct ParsedSource {
    pub program: Program,
    source_map: Lrc<SourceMap>,
    comments: Option<SingleThreadedComments>,
}

impl ParsedSource {
    pub fn source_map(&self) -> &SourceMap {
        &self.source_map
    }

    /// Mutable tree alongside the source map, for passes that report locations.
    pub fn parts_mut(&mut self) -> (&mut Program, &SourceMap) {
        (&mut self.program, &*self.source_map)
    }
}

/// 1-based line and column of a node in the input text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Looks up where `span` starts. Synthesized nodes have no position.
pub fn position(source_map: &SourceMap, span: Span) -> Option<Position> {
    if span.is_dummy() {
        return None;
    }
    let loc = source_map.lookup_char_pos(span.lo);
    Some(Position {
        line: loc.line,
        column: loc.col.0 + 1,
    })
}

/// Parses `source` as a script or module, whichever it turns out to be.
///
/// # Errors
///
/// Returns [`Error::Parse`] for the first syntax error found, including
/// errors the parser could recover from. Malformed input is never rewritten.
pub fn parse(source: &str, options: &Options) -> Result<ParsedSource> {
    let source_map: Lrc<SourceMap> = Default::default();
    let file = source_map.new_source_file(FileName::Anon, source.to_owned());
    let comments = options
        .preserve_comments
        .then(SingleThreadedComments::default);

    let program = GLOBALS.set(&Globals::new(), || {
        let lexer = Lexer::new(
            Syntax::Es(EsConfig::default()),
            options.target,
            StringInput::from(&*file),
            comments.as_ref().map(|c| c as &dyn Comments),
        );
        let mut parser = Parser::new_from(lexer);

        let program = parser
            .parse_program()
            .map_err(|error| parse_error(&source_map, error))?;
        match parser.take_errors().into_iter().next() {
            Some(error) => Err(parse_error(&source_map, error)),
            None => Ok(program),
        }
    })?;

    Ok(ParsedSource {
        program,
        source_map,
        comments,
    })
}

fn parse_error(source_map: &SourceMap, error: ParserError) -> Error {
    let (line, column) = position(source_map, error.span())
        .map(|pos| (pos.line, pos.column))
        .unwrap_or_default();
    Error::Parse {
        message: error.kind().msg().into_owned(),
        line,
        column,
    }
}

/// Prints the tree of `parsed` back to source text.
///
/// # Errors
///
/// Returns [`Error::Emit`] if the writer fails and [`Error::Utf8`] if the
/// output is not valid UTF-8.
pub fn emit(parsed: &ParsedSource, options: &Options) -> Result<String> {
    let mut buf = Vec::new();
    {
        let mut emitter = Emitter {
            cfg: Config::default()
                .with_target(options.target)
                .with_minify(options.minify)
                .with_ascii_only(options.ascii_only),
            cm: parsed.source_map.clone(),
            comments: parsed.comments.as_ref().map(|c| c as &dyn Comments),
            wr: JsWriter::new(parsed.source_map.clone(), "\n", &mut buf, None),
        };

        match &parsed.program {
            Program::Module(module) => emitter.emit_module(module)?,
            Program::Script(script) => emitter.emit_script(script)?,
        }
    }

    Ok(String::from_utf8(buf)?)
}
