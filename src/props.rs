//! Properties documents and batch handling.
//!
//! The persistence layer stores a topology as a properties document: one
//! canonical expression per line. The change protocol ships batches of
//! expressions and coalesces them before application. Both live here, on
//! top of the parser and the duplicate detector.

use tracing::debug;

use crate::error::ExpressionError;
use crate::expression::Expression;

/// Parse a properties document into its expressions.
///
/// One expression per line; blank lines and `#` comment lines are skipped.
/// The first offending line aborts the parse with its canonical error.
pub fn parse_document(text: &str) -> Result<Vec<Expression>, ExpressionError> {
    let mut expressions = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        expressions.push(line.parse()?);
    }
    debug!(count = expressions.len(), "parsed properties document");
    Ok(expressions)
}

/// Render a batch one-per-line in canonical form, re-parseable by
/// [`parse_document`].
pub fn render_document(expressions: &[Expression]) -> String {
    let mut out = String::new();
    for expression in expressions {
        out.push_str(&expression.to_string());
        out.push('\n');
    }
    out
}

/// Coalesce a batch for the change protocol: a later expression targeting
/// the same (setting, scope, key) supersedes the earlier one, preserving
/// first-seen order. An incompatible pair (whole-map vs per-entry form)
/// aborts with [`ExpressionError::Conflict`].
pub fn coalesce(expressions: Vec<Expression>) -> Result<Vec<Expression>, ExpressionError> {
    let mut out: Vec<Expression> = Vec::new();
    for expression in expressions {
        let mut superseded = None;
        for (index, kept) in out.iter().enumerate() {
            if kept.duplicates(&expression)? {
                superseded = Some(index);
                break;
            }
        }
        match superseded {
            Some(index) => out[index] = expression,
            None => out.push(expression),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lines_and_skips_comments() {
        let doc = "\
# cluster tunables
offheap-resources=main:1GB

stripe.1.node.1.backup-dir=/var/backups
";
        let expressions = parse_document(doc).unwrap();
        assert_eq!(expressions.len(), 2);
        assert_eq!(expressions[0].to_string(), "offheap-resources=main:1GB");
        assert_eq!(expressions[1].to_string(), "stripe.1.node.1.backup-dir=/var/backups");
    }

    #[test]
    fn first_bad_line_aborts() {
        let err = parse_document("backup-dir=ok\nstripe.0.backup-dir=bad\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid input: 'stripe.0.backup-dir=bad'. Reason: Expected stripe ID to be greater than 0"
        );
    }

    #[test]
    fn render_roundtrips() {
        let expressions = parse_document("stripe.1:backup-dir=foo\ncluster-name=bar\n").unwrap();
        let rendered = render_document(&expressions);
        assert_eq!(rendered, "stripe.1.backup-dir=foo\ncluster-name=bar\n");
        assert_eq!(parse_document(&rendered).unwrap(), expressions);
    }

    #[test]
    fn coalesce_keeps_the_last_duplicate() {
        let batch = parse_document(
            "backup-dir=a\ncluster-name=one\nbackup-dir=b\nstripe.1.backup-dir=c\n",
        )
        .unwrap();
        let coalesced = coalesce(batch).unwrap();
        let rendered: Vec<String> = coalesced.iter().map(|e| e.to_string()).collect();
        assert_eq!(rendered, ["backup-dir=b", "cluster-name=one", "stripe.1.backup-dir=c"]);
    }

    #[test]
    fn coalesce_rejects_incompatible_forms() {
        let batch =
            parse_document("offheap-resources.main=1GB\noffheap-resources=main:1GB\n").unwrap();
        let err = coalesce(batch).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Incompatible or duplicate configurations: offheap-resources.main=1GB and offheap-resources=main:1GB"
        );
    }
}
