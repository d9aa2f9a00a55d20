//! Rules for non-OpenAPI YAML/JSON files.
//!
//! Generic rules receive a reduced context: the file (URI, value view,
//! raw text, IR), a reporter, a fix collector, and offset translation.
//! No project index, no reference graph.

use crate::core::document::{IrNode, ParsedDocument};
use crate::diagnostics::{
    CodeDescription, Diagnostic, FilePatch, Range, RangePrecision, Severity,
};
use crate::runner::RuleMeta;

/// The file payload a generic rule sees.
pub struct GenericFile<'a> {
    pub uri: &'a str,
    pub value: &'a serde_json::Value,
    pub raw_text: &'a str,
    pub ir: Option<&'a IrNode>,
}

/// The reduced context for generic rules.
pub struct GenericContext<'a> {
    doc: &'a ParsedDocument,
    meta: &'a RuleMeta,
    diagnostics: &'a mut Vec<Diagnostic>,
    fixes: &'a mut Vec<FilePatch>,
}

impl<'a> GenericContext<'a> {
    pub fn report(&mut self, range: Range, message: impl Into<String>, severity: Option<Severity>) {
        let mut diagnostic = Diagnostic::new(
            self.meta.code(),
            message,
            &self.doc.uri,
            range,
            severity.unwrap_or_else(|| self.meta.severity()),
        )
        .with_precision(RangePrecision::Exact);
        diagnostic.code_description = self
            .meta
            .url
            .clone()
            .map(|href| CodeDescription { href });
        self.diagnostics.push(diagnostic);
    }

    pub fn fix(&mut self, patch: FilePatch) {
        self.fixes.push(patch);
    }

    pub fn offset_to_range(&self, start: usize, end: Option<usize>) -> Range {
        self.doc.offset_range(start, end.unwrap_or(start))
    }
}

/// A rule over arbitrary YAML/JSON files.
pub trait GenericRule {
    fn meta(&self) -> &RuleMeta;
    fn check_file(&self, cx: &mut GenericContext, file: &GenericFile);
}

/// Run generic rules over one parsed document.
pub fn lint_generic(
    doc: &ParsedDocument,
    rules: &[Box<dyn GenericRule>],
) -> (Vec<Diagnostic>, Vec<FilePatch>) {
    let mut diagnostics = Vec::new();
    let mut fixes = Vec::new();
    let file = GenericFile {
        uri: &doc.uri,
        value: &doc.value,
        raw_text: &doc.raw_text,
        ir: doc.ir.as_ref(),
    };
    for rule in rules {
        if !rule.meta().applies_to(doc.format) {
            continue;
        }
        let mut cx = GenericContext {
            doc,
            meta: rule.meta(),
            diagnostics: &mut diagnostics,
            fixes: &mut fixes,
        };
        rule.check_file(&mut cx, &file);
    }
    (diagnostics, fixes)
}

#[cfg(test)]
mod tests {
    use crate::core::document::DocumentFormat;
    use crate::core::loader::parse_document;
    use crate::runner::generic::*;
    use pretty_assertions::assert_eq;

    struct NoTabsRule {
        meta: RuleMeta,
    }

    impl GenericRule for NoTabsRule {
        fn meta(&self) -> &RuleMeta {
            &self.meta
        }

        fn check_file(&self, cx: &mut GenericContext, file: &GenericFile) {
            for (offset, _) in file.raw_text.match_indices('\t') {
                let range = cx.offset_to_range(offset, Some(offset + 1));
                cx.report(range, "Tabs are not allowed.", None);
            }
        }
    }

    #[test]
    fn test_generic_rule_runs() {
        let doc = parse_document(
            "config.yaml",
            "a: 1\nb:\tx\n".to_string(),
            DocumentFormat::Yaml,
            0,
        );
        let rules: Vec<Box<dyn GenericRule>> = vec![Box::new(NoTabsRule {
            meta: RuleMeta::new("no-tabs", 900, "layout", "No tabs"),
        })];
        let (diagnostics, fixes) = lint_generic(&doc, &rules);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, "rule-900-no-tabs");
        assert_eq!(diagnostics[0].range.start.line, 1);
        assert!(fixes.is_empty());
    }
}
