//! C2: the content-converter registry. Dispatches a fetched MIME type to
//! its binary-form compiler.
//!
//! Grounded on the original's static `converters[]` table and
//! `convert_content()`; the compile functions themselves are external
//! collaborators (black boxes), reached through [`crate::collaborators`].

use crate::collaborators::{WmlCompiler, WmlScriptCompiler};
use crate::event::Content;

/// Result of [`ConverterRegistry::convert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertOutcome {
    Unchanged,
    Converted,
    Failed,
}

/// Builds the well-known WML/WMLScript source-to-binary mapping and applies
/// it to a [`Content`] bundle.
pub struct ConverterRegistry<'a> {
    wml: &'a dyn WmlCompiler,
    wmlscript: &'a dyn WmlScriptCompiler,
}

pub const WML_SOURCE_TYPE: &str = "text/vnd.wap.wml";
pub const WML_RESULT_TYPE: &str = "application/vnd.wap.wmlc";
pub const WMLSCRIPT_SOURCE_TYPE: &str = "text/vnd.wap.wmlscript";
pub const WMLSCRIPT_RESULT_TYPE: &str = "application/vnd.wap.wmlscriptc";

impl<'a> ConverterRegistry<'a> {
    pub fn new(wml: &'a dyn WmlCompiler, wmlscript: &'a dyn WmlScriptCompiler) -> Self {
        Self { wml, wmlscript }
    }

    /// Result types this registry can produce, for `add_accept_headers` (C3).
    pub fn result_types(&self) -> [&'static str; 2] {
        [WML_RESULT_TYPE, WMLSCRIPT_RESULT_TYPE]
    }

    /// Charsets the WML compiler accepts, for `add_charset_headers` (C3).
    pub fn wml_charsets(&self) -> Vec<String> {
        self.wml.charsets()
    }

    /// Source type that compiles to `result_type`, if any.
    pub fn source_type_for_result(&self, result_type: &str) -> Option<&'static str> {
        match result_type {
            WML_RESULT_TYPE => Some(WML_SOURCE_TYPE),
            WMLSCRIPT_RESULT_TYPE => Some(WMLSCRIPT_SOURCE_TYPE),
            _ => None,
        }
    }

    /// Apply the matching converter in place, if any. At most one converter
    /// matches a given MIME type, so on failure no other converter is tried.
    pub fn convert(&self, content: &mut Content) -> ConvertOutcome {
        let Some(content_type) = content.content_type.as_deref() else {
            return ConvertOutcome::Unchanged;
        };

        match content_type {
            WML_SOURCE_TYPE => {
                match self.wml.compile(&content.body, content.charset.as_deref()) {
                    Some(compiled) => {
                        content.body = compiled;
                        content.content_type = Some(WML_RESULT_TYPE.to_string());
                        ConvertOutcome::Converted
                    }
                    None => ConvertOutcome::Failed,
                }
            }
            WMLSCRIPT_SOURCE_TYPE => {
                match self
                    .wmlscript
                    .compile_data(&content.url, &content.body)
                {
                    Some(compiled) => {
                        content.body = compiled;
                        content.content_type = Some(WMLSCRIPT_RESULT_TYPE.to_string());
                        ConvertOutcome::Converted
                    }
                    None => ConvertOutcome::Failed,
                }
            }
            _ => ConvertOutcome::Unchanged,
        }
    }
}
