//! JSDoc comment lookup and parsing.
//!
//! Comments come from the parser's comment list. Every `/** */` block in the
//! run of comments right before a declaration (only whitespace, other
//! comments and an optional `export`/`declare` modifier in between) belongs
//! to it; stacked blocks are merged in source order.

use jsdoc_deco_core::codec::JsDocTagInfo;
use oxc_ast::ast::{Comment, CommentContent};

/// A parsed documentation comment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsDoc {
    /// Description text, without tags
    pub comment: String,
    pub tags: Vec<JsDocTagInfo>,
}

const MODIFIERS: &[&str] = &["export", "declare"];

fn is_jsdoc(comment: &Comment) -> bool {
    comment.is_block() && matches!(comment.content, CommentContent::Jsdoc | CommentContent::JsdocLegal)
}

/// Find the JSDoc attached to a declaration starting at `start`.
///
/// `comments` is the file's comment list, ordered by position.
pub fn leading_jsdoc(text: &str, comments: &[Comment], start: usize) -> Option<JsDoc> {
    let mut before = text.get(..start)?.trim_end();
    while let Some(stripped) = strip_trailing_modifier(before) {
        before = stripped.trim_end();
    }
    let mut cursor = before.len();

    let end = comments.partition_point(|comment| comment.span.end as usize <= cursor);
    let mut blocks: Vec<&Comment> = Vec::new();
    for comment in comments[..end].iter().rev() {
        let gap = text.get(comment.span.end as usize..cursor)?;
        if !gap.trim().is_empty() {
            break;
        }
        if is_jsdoc(comment) {
            blocks.push(comment);
        }
        cursor = comment.span.start as usize;
    }
    if blocks.is_empty() {
        return None;
    }

    let mut merged = JsDoc::default();
    for block in blocks.into_iter().rev() {
        let body_start = block.span.start as usize + 3;
        let body_end = (block.span.end as usize).checked_sub(2)?;
        let doc = parse_body(text.get(body_start..body_end.max(body_start))?);
        if !doc.comment.is_empty() {
            if !merged.comment.is_empty() {
                merged.comment.push('\n');
            }
            merged.comment.push_str(&doc.comment);
        }
        merged.tags.extend(doc.tags);
    }
    Some(merged)
}

fn strip_trailing_modifier(text: &str) -> Option<&str> {
    MODIFIERS.iter().find_map(|modifier| {
        let rest = text.strip_suffix(modifier)?;
        let boundary = rest
            .chars()
            .next_back()
            .map_or(true, |c| !(c.is_alphanumeric() || c == '_' || c == '$'));
        boundary.then_some(rest)
    })
}

/// Parse the text between `/**` and `*/`.
fn parse_body(body: &str) -> JsDoc {
    let mut description: Vec<&str> = Vec::new();
    let mut tags: Vec<(String, Vec<String>)> = Vec::new();

    for raw in body.lines() {
        let line = raw.trim_start();
        let line = line.strip_prefix('*').unwrap_or(line);
        let line = line.strip_prefix(' ').unwrap_or(line).trim_end();

        if let Some(tag) = line.trim_start().strip_prefix('@') {
            let (name, rest) = tag.split_once(char::is_whitespace).unwrap_or((tag, ""));
            tags.push((name.to_string(), vec![rest.trim().to_string()]));
        } else if let Some((_, text)) = tags.last_mut() {
            text.push(line.trim().to_string());
        } else {
            description.push(line);
        }
    }

    let comment = description.join("\n").trim().to_string();
    let tags = tags
        .into_iter()
        .map(|(name, lines)| {
            let text = lines.join("\n").trim().to_string();
            JsDocTagInfo {
                name,
                text: (!text.is_empty()).then_some(text),
            }
        })
        .collect();

    JsDoc { comment, tags }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxc_allocator::Allocator;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    fn doc_before(text: &str, marker: &str) -> Option<JsDoc> {
        let allocator = Allocator::default();
        let parsed = Parser::new(&allocator, text, SourceType::ts()).parse();
        let start = text.rfind(marker).unwrap();
        leading_jsdoc(text, &parsed.program.comments, start)
    }

    #[test]
    fn single_line_comment() {
        let doc = doc_before("const a = { /** hello */ x: 1 };", "x:").unwrap();
        assert_eq!(doc.comment, "hello");
        assert!(doc.tags.is_empty());
    }

    #[test]
    fn multi_line_comment_with_tags() {
        let text = "const c = {\n/**\n * Port to listen on.\n * Must be free.\n * @default 8080\n * @see docs\n *   ports page\n */\nport: 1 };";
        let doc = doc_before(text, "port:").unwrap();
        assert_eq!(doc.comment, "Port to listen on.\nMust be free.");
        assert_eq!(doc.tags.len(), 2);
        assert_eq!(doc.tags[0].name, "default");
        assert_eq!(doc.tags[0].text.as_deref(), Some("8080"));
        assert_eq!(doc.tags[1].text.as_deref(), Some("docs\nports page"));
    }

    #[test]
    fn ordinary_block_and_line_comments_are_ignored() {
        assert!(doc_before("const o = { /* plain */ x: 1 };", "x:").is_none());
        assert!(doc_before("const o = {\n// line\nx: 1 };", "x:").is_none());
        assert!(doc_before("const o = { /**/ x: 1 };", "x:").is_none());
    }

    #[test]
    fn comments_between_jsdoc_and_declaration_keep_it_attached() {
        let doc = doc_before("const a = {\n  /** doc */\n  // note\n  x: 1,\n};", "x:").unwrap();
        assert_eq!(doc.comment, "doc");

        let doc = doc_before(
            "const a = {\n  /** doc */ /* eslint-disable-line */\n  x: 1,\n};",
            "x:",
        )
        .unwrap();
        assert_eq!(doc.comment, "doc");
    }

    #[test]
    fn stacked_jsdoc_blocks_are_merged() {
        let doc = doc_before(
            "const a = {\n  /** First. */\n  /** Second.\n   * @since 2 */\n  x: 1,\n};",
            "x:",
        )
        .unwrap();
        assert_eq!(doc.comment, "First.\nSecond.");
        assert_eq!(doc.tags[0].name, "since");
    }

    #[test]
    fn code_between_comment_and_declaration_detaches_it() {
        assert!(doc_before("const o = { /** doc */ y: 2, x: 1 };", "x:").is_none());
        assert_eq!(
            doc_before("const o = { /** doc */ y: 2, x: 1 };", "y:").unwrap().comment,
            "doc"
        );
    }

    #[test]
    fn export_modifier_is_skipped() {
        let doc = doc_before("/** Settings. */\nexport const settings = {};", "const").unwrap();
        assert_eq!(doc.comment, "Settings.");
        assert!(doc_before("/** Settings. */\nlet reexport = 1; const s = {};", "const").is_none());
    }

    #[test]
    fn tag_only_comment_has_empty_description() {
        let doc = doc_before("const o = { /** @deprecated */ x: 1 };", "x:").unwrap();
        assert_eq!(doc.comment, "");
        assert_eq!(doc.tags[0].name, "deprecated");
        assert_eq!(doc.tags[0].text, None);
    }
}
