//! Syntax-only scan for property access expressions.
//!
//! Builds a single tree-sitter tree for the document (no project, no type
//! information) and lists every `<expr>.<name>` in source order. Tree-sitter
//! recovers from syntax errors, so a broken document still yields whatever
//! accesses survive in the recovered tree.

use jsdoc_deco_core::{LineIndex, PropertyAccess};
use tree_sitter::{Node, Parser};

use crate::Dialect;

const MEMBER_EXPRESSION: &str = "member_expression";

/// Scan `text` for property accesses.
///
/// Never fails: if the grammar cannot be loaded or parsing is abandoned the
/// result is simply empty.
pub fn scan_property_accesses(text: &str, dialect: Dialect) -> Vec<PropertyAccess> {
    let mut parser = Parser::new();
    if let Err(e) = parser.set_language(&dialect.tree_sitter_language()) {
        tracing::warn!("Failed to load {} grammar: {}", dialect, e);
        return Vec::new();
    }

    let Some(tree) = parser.parse(text, None) else {
        tracing::debug!("Parser returned no tree for {} document", dialect);
        return Vec::new();
    };

    let index = LineIndex::new(text);
    let mut results = Vec::new();
    let mut cursor = tree.walk();

    // Pre-order walk; an outer access is emitted before the accesses nested
    // in its base expression
    loop {
        let node = cursor.node();
        if node.kind() == MEMBER_EXPRESSION {
            if let Some(access) = property_access(node, text, &index) {
                results.push(access);
            }
        }

        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return results;
            }
        }
    }
}

fn property_access(node: Node<'_>, text: &str, index: &LineIndex) -> Option<PropertyAccess> {
    let object = node.child_by_field_name("object")?;
    let property = node.child_by_field_name("property")?;

    // Recovery may insert a zero-width placeholder for `a.` at end of input
    if property.is_missing() || property.start_byte() == property.end_byte() {
        return None;
    }
    if !matches!(
        property.kind(),
        "property_identifier" | "private_property_identifier"
    ) {
        return None;
    }

    let left = text.get(object.start_byte()..object.end_byte())?;
    let right = text.get(property.start_byte()..property.end_byte())?;

    Some(PropertyAccess {
        left: left.to_string(),
        right: right.to_string(),
        range: index.range_of(node.start_byte(), node.end_byte()),
        name_range: index.range_of(property.start_byte(), property.end_byte()),
        offset: property.start_byte(),
    })
}
