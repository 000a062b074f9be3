//! Asset minification for JS and CSS files.
//!
//! Uses oxc for JavaScript and lightningcss for CSS.

use std::sync::{Arc, RwLock};

use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;

/// Minifier output: code plus any recoverable diagnostics.
#[derive(Debug, Default)]
pub struct Minified<T = String> {
    pub code: T,
    pub warnings: Vec<String>,
}

impl<T> Minified<T> {
    /// Pass `code` through untouched.
    pub fn verbatim(code: T) -> Self {
        Self {
            code,
            warnings: Vec::new(),
        }
    }
}

impl Minified {
    pub fn into_bytes(self) -> Minified<Vec<u8>> {
        Minified {
            code: self.code.into_bytes(),
            warnings: self.warnings,
        }
    }
}

/// Minify JavaScript source code.
///
/// Parse errors are returned as messages; nothing is emitted for a source
/// that does not parse.
pub fn minify_js(source: &str) -> Result<Minified, Vec<String>> {
    let allocator = Allocator::default();
    let source_type = SourceType::mjs();
    let ret = Parser::new(&allocator, source, source_type).parse();
    if !ret.errors.is_empty() {
        return Err(ret.errors.iter().map(ToString::to_string).collect());
    }
    let mut program = ret.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::smallest()),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);
    let code = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program)
        .code;
    Ok(Minified::verbatim(code))
}

/// Minify CSS source code.
///
/// Invalid rules are dropped with a warning instead of failing the build.
pub fn minify_css(filename: &str, source: &str) -> Result<Minified, Vec<String>> {
    let warnings = Arc::new(RwLock::new(Vec::new()));
    let options = ParserOptions {
        filename: filename.to_string(),
        error_recovery: true,
        warnings: Some(Arc::clone(&warnings)),
        ..ParserOptions::default()
    };

    let stylesheet = StyleSheet::parse(source, options).map_err(|e| vec![e.to_string()])?;
    let result = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .map_err(|e| vec![e.to_string()])?;

    let warnings = warnings
        .read()
        .map(|w| w.iter().map(ToString::to_string).collect())
        .unwrap_or_default();
    Ok(Minified {
        code: result.code,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minify_js() {
        let out = minify_js("export function add(first, second) {\n  return first + second;\n}\n")
            .unwrap();
        assert!(out.code.contains("add"));
        assert!(!out.code.contains("second"));
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_minify_js_parse_error() {
        let errors = minify_js("function (").unwrap_err();
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_minify_css() {
        let out = minify_css("index.css", "body {\n  color: red;\n  margin: 0px;\n}\n").unwrap();
        assert_eq!(out.code, "body{color:red;margin:0}");
    }
}
