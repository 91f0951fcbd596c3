//! Parsed and indexed source files.
//!
//! A file is parsed once with oxc, resolved with oxc's semantic analysis and
//! then flattened into owned tables (bindings, object literal shapes, member
//! accesses, leaf tokens, interface members). The AST and its arena are
//! dropped afterwards, so a [`SourceFile`] is cheap to share across threads.

use std::collections::HashMap;

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    BindingIdentifier, Comment, Expression, IdentifierReference, ObjectExpression, ObjectPropertyKind,
    StaticMemberExpression, TSInterfaceDeclaration, TSSignature, VariableDeclaration,
    VariableDeclarationKind, VariableDeclarator,
};
use oxc_ast_visit::{walk, Visit};
use oxc_parser::Parser;
use oxc_semantic::{Scoping, SemanticBuilder, SymbolId};
use oxc_span::{GetSpan, SourceType, Span};

use crate::jsdoc::{leading_jsdoc, JsDoc};

/// Half-open byte range `[start, end)` into the file text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceSpan {
    pub start: usize,
    pub end: usize,
}

impl SourceSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    pub fn encloses(&self, other: SourceSpan) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl From<Span> for SourceSpan {
    fn from(span: Span) -> Self {
        Self::new(span.start as usize, span.end as usize)
    }
}

/// Types with a library interface of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinType {
    Object,
    String,
    Number,
    Boolean,
    Array,
}

impl BuiltinType {
    pub fn interface_name(&self) -> &'static str {
        match self {
            Self::Object => "Object",
            Self::String => "String",
            Self::Number => "Number",
            Self::Boolean => "Boolean",
            Self::Array => "Array",
        }
    }
}

/// What an expression evaluates to, as far as this file can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueRef {
    /// An object literal, keyed by its span
    Object(SourceSpan),
    /// A local binding
    Symbol(SymbolId),
    /// The result of a static member access, keyed by its span
    Member(SourceSpan),
    Builtin(BuiltinType),
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Const,
    Let,
    Var,
    /// Parameters, functions, classes, imports, destructured names
    Other,
}

impl BindingKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Const => "const",
            Self::Let => "let",
            Self::Var => "var",
            Self::Other => "alias",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Binding {
    pub name: String,
    pub kind: BindingKind,
    /// Span of the declarator, or of the identifier for non-variable bindings
    pub span: SourceSpan,
    pub name_span: SourceSpan,
    pub value: ValueRef,
    pub doc: Option<JsDoc>,
}

/// One variable declarator between an object literal property and the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclaratorFrame {
    pub is_const: bool,
    /// Whether the initializer is an object literal once parentheses,
    /// `as`, `satisfies` and `<T>` assertions are peeled off
    pub initializer_is_object: bool,
}

#[derive(Debug, Clone)]
pub struct PropertyDecl {
    pub name: String,
    pub span: SourceSpan,
    pub name_span: SourceSpan,
    pub value: ValueRef,
    pub is_method: bool,
    pub doc: Option<JsDoc>,
    /// Enclosing variable declarators, innermost first
    pub enclosing: Vec<DeclaratorFrame>,
}

#[derive(Debug, Clone, Default)]
pub struct ObjectShape {
    pub properties: Vec<PropertyDecl>,
    /// Spread arguments, in source order
    pub spreads: Vec<ValueRef>,
}

impl ObjectShape {
    /// Declarations of `name`; duplicate keys yield several.
    pub fn properties_named<'s>(&'s self, name: &'s str) -> impl Iterator<Item = &'s PropertyDecl> {
        self.properties.iter().filter(move |p| p.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct MemberAccess {
    pub span: SourceSpan,
    pub name: String,
    pub name_span: SourceSpan,
    pub receiver: ValueRef,
}

#[derive(Debug, Clone)]
pub struct InterfaceMember {
    pub name: String,
    pub span: SourceSpan,
    pub name_span: SourceSpan,
    pub is_method: bool,
    /// Member signature source, without the trailing `;`
    pub signature: String,
    pub doc: Option<JsDoc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Name of the member access at this index
    MemberName(usize),
    Reference(Option<SymbolId>),
    Binding(Option<SymbolId>),
    /// Key of the property at `index` in the object literal at `object`
    PropertyKey { object: SourceSpan, index: usize },
}

/// A leaf node that queries can land on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub span: SourceSpan,
    pub kind: TokenKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxDiagnostic {
    pub message: String,
    pub start: usize,
    pub length: usize,
}

#[derive(Debug)]
pub struct SourceFile {
    file_name: String,
    text: String,
    bindings: HashMap<SymbolId, Binding>,
    objects: HashMap<SourceSpan, ObjectShape>,
    accesses: Vec<MemberAccess>,
    /// Sorted by start offset
    tokens: Vec<Token>,
    interfaces: HashMap<String, Vec<InterfaceMember>>,
    diagnostics: Vec<SyntaxDiagnostic>,
}

impl SourceFile {
    /// Parse and index `text`. Never fails: syntax errors are recorded as
    /// diagnostics and whatever the parser produced is indexed.
    pub fn parse(file_name: impl Into<String>, text: impl Into<String>) -> Self {
        let file_name = file_name.into();
        let text = text.into();

        let index = index_text(&file_name, &text);

        Self {
            file_name,
            text,
            bindings: index.bindings,
            objects: index.objects,
            accesses: index.accesses,
            tokens: index.tokens,
            interfaces: index.interfaces,
            diagnostics: index.diagnostics,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn diagnostics(&self) -> &[SyntaxDiagnostic] {
        &self.diagnostics
    }

    pub fn binding(&self, symbol: SymbolId) -> Option<&Binding> {
        self.bindings.get(&symbol)
    }

    pub fn object(&self, span: SourceSpan) -> Option<&ObjectShape> {
        self.objects.get(&span)
    }

    pub fn access(&self, index: usize) -> Option<&MemberAccess> {
        self.accesses.get(index)
    }

    pub fn access_by_span(&self, span: SourceSpan) -> Option<&MemberAccess> {
        self.accesses.iter().find(|access| access.span == span)
    }

    pub fn interface(&self, name: &str) -> Option<&[InterfaceMember]> {
        self.interfaces.get(name).map(Vec::as_slice)
    }

    /// The innermost leaf token covering `position`.
    pub fn node_at_position(&self, position: usize) -> Option<&Token> {
        let candidates = &self.tokens[..self.tokens.partition_point(|t| t.span.start <= position)];
        candidates
            .iter()
            .filter(|token| token.span.contains(position))
            .min_by_key(|token| token.span.len())
    }

    /// The innermost member access whose span encloses `span`.
    pub fn enclosing_property_access(&self, span: SourceSpan) -> Option<&MemberAccess> {
        self.accesses
            .iter()
            .filter(|access| access.span.encloses(span))
            .min_by_key(|access| access.span.len())
    }
}

struct Index {
    bindings: HashMap<SymbolId, Binding>,
    objects: HashMap<SourceSpan, ObjectShape>,
    accesses: Vec<MemberAccess>,
    tokens: Vec<Token>,
    interfaces: HashMap<String, Vec<InterfaceMember>>,
    diagnostics: Vec<SyntaxDiagnostic>,
}

fn index_text(file_name: &str, text: &str) -> Index {
    let source_type = SourceType::from_path(file_name).unwrap_or_else(|_| SourceType::ts());
    let allocator = Allocator::default();
    let parsed = Parser::new(&allocator, text, source_type).parse();

    let diagnostics: Vec<SyntaxDiagnostic> = parsed
        .errors
        .iter()
        .map(|error| {
            let (start, length) = error
                .labels
                .as_ref()
                .and_then(|labels| labels.first())
                .map_or((0, 0), |label| (label.offset(), label.len()));
            SyntaxDiagnostic {
                message: error.message.to_string(),
                start,
                length,
            }
        })
        .collect();
    if parsed.panicked {
        tracing::debug!("Parser gave up on {}: {} errors", file_name, diagnostics.len());
    }

    let semantic = SemanticBuilder::new().build(&parsed.program).semantic;
    let mut indexer = Indexer::new(text, &parsed.program.comments, semantic.scoping());
    indexer.visit_program(&parsed.program);
    indexer.tokens.sort_by_key(|token| (token.span.start, token.span.end));

    Index {
        bindings: indexer.bindings,
        objects: indexer.objects,
        accesses: indexer.accesses,
        tokens: indexer.tokens,
        interfaces: indexer.interfaces,
        diagnostics,
    }
}

/// Peel wrappers that do not change the runtime value.
fn strip_wrappers<'b, 'a>(mut expr: &'b Expression<'a>, non_null: bool) -> &'b Expression<'a> {
    loop {
        expr = match expr {
            Expression::ParenthesizedExpression(e) => &e.expression,
            Expression::TSAsExpression(e) => &e.expression,
            Expression::TSSatisfiesExpression(e) => &e.expression,
            Expression::TSTypeAssertion(e) => &e.expression,
            Expression::TSNonNullExpression(e) if non_null => &e.expression,
            _ => return expr,
        };
    }
}

struct Indexer<'s> {
    text: &'s str,
    comments: &'s [Comment],
    scoping: &'s Scoping,
    bindings: HashMap<SymbolId, Binding>,
    objects: HashMap<SourceSpan, ObjectShape>,
    accesses: Vec<MemberAccess>,
    tokens: Vec<Token>,
    interfaces: HashMap<String, Vec<InterfaceMember>>,
    declaration_starts: Vec<usize>,
    frames: Vec<DeclaratorFrame>,
}

impl<'s> Indexer<'s> {
    fn new(text: &'s str, comments: &'s [Comment], scoping: &'s Scoping) -> Self {
        Self {
            text,
            comments,
            scoping,
            bindings: HashMap::new(),
            objects: HashMap::new(),
            accesses: Vec::new(),
            tokens: Vec::new(),
            interfaces: HashMap::new(),
            declaration_starts: Vec::new(),
            frames: Vec::new(),
        }
    }

    fn jsdoc_before(&self, start: usize) -> Option<JsDoc> {
        leading_jsdoc(self.text, self.comments, start)
    }

    fn resolve(&self, ident: &IdentifierReference<'_>) -> Option<SymbolId> {
        let reference = ident.reference_id.get()?;
        self.scoping.get_reference(reference).symbol_id()
    }

    fn value_of(&self, expr: &Expression<'_>) -> ValueRef {
        match strip_wrappers(expr, true) {
            Expression::ObjectExpression(obj) => ValueRef::Object(obj.span.into()),
            Expression::Identifier(ident) => {
                self.resolve(ident).map_or(ValueRef::Unknown, ValueRef::Symbol)
            }
            Expression::StaticMemberExpression(member) => ValueRef::Member(member.span.into()),
            Expression::StringLiteral(_) | Expression::TemplateLiteral(_) => {
                ValueRef::Builtin(BuiltinType::String)
            }
            Expression::NumericLiteral(_) => ValueRef::Builtin(BuiltinType::Number),
            Expression::BooleanLiteral(_) => ValueRef::Builtin(BuiltinType::Boolean),
            Expression::ArrayExpression(_) => ValueRef::Builtin(BuiltinType::Array),
            _ => ValueRef::Unknown,
        }
    }

    fn slice(&self, span: Span) -> &'s str {
        self.text
            .get(span.start as usize..span.end as usize)
            .unwrap_or_default()
    }
}

impl<'a> Visit<'a> for Indexer<'_> {
    fn visit_variable_declaration(&mut self, it: &VariableDeclaration<'a>) {
        self.declaration_starts.push(it.span.start as usize);
        walk::walk_variable_declaration(self, it);
        self.declaration_starts.pop();
    }

    fn visit_variable_declarator(&mut self, it: &VariableDeclarator<'a>) {
        let kind = match it.kind {
            VariableDeclarationKind::Const => BindingKind::Const,
            VariableDeclarationKind::Let => BindingKind::Let,
            VariableDeclarationKind::Var => BindingKind::Var,
            _ => BindingKind::Other,
        };
        let initializer_is_object = it.init.as_ref().is_some_and(|init| {
            matches!(strip_wrappers(init, false), Expression::ObjectExpression(_))
        });

        if let Some(ident) = it.id.get_binding_identifier() {
            if let Some(symbol) = ident.symbol_id.get() {
                let doc = self.jsdoc_before(it.span.start as usize).or_else(|| {
                    let start = self.declaration_starts.last()?;
                    self.jsdoc_before(*start)
                });
                let value = it
                    .init
                    .as_ref()
                    .map_or(ValueRef::Unknown, |init| self.value_of(init));
                self.bindings.insert(
                    symbol,
                    Binding {
                        name: ident.name.to_string(),
                        kind,
                        span: it.span.into(),
                        name_span: ident.span.into(),
                        value,
                        doc,
                    },
                );
            }
        }

        self.frames.push(DeclaratorFrame {
            is_const: kind == BindingKind::Const,
            initializer_is_object,
        });
        walk::walk_variable_declarator(self, it);
        self.frames.pop();
    }

    fn visit_binding_identifier(&mut self, it: &BindingIdentifier<'a>) {
        let symbol = it.symbol_id.get();
        self.tokens.push(Token {
            span: it.span.into(),
            kind: TokenKind::Binding(symbol),
        });
        if let Some(symbol) = symbol {
            self.bindings.entry(symbol).or_insert_with(|| Binding {
                name: it.name.to_string(),
                kind: BindingKind::Other,
                span: it.span.into(),
                name_span: it.span.into(),
                value: ValueRef::Unknown,
                doc: None,
            });
        }
    }

    fn visit_identifier_reference(&mut self, it: &IdentifierReference<'a>) {
        self.tokens.push(Token {
            span: it.span.into(),
            kind: TokenKind::Reference(self.resolve(it)),
        });
    }

    fn visit_object_expression(&mut self, it: &ObjectExpression<'a>) {
        let object: SourceSpan = it.span.into();
        let enclosing: Vec<DeclaratorFrame> = self.frames.iter().rev().copied().collect();
        let mut shape = ObjectShape::default();

        for property in &it.properties {
            match property {
                ObjectPropertyKind::ObjectProperty(prop) => {
                    let Some(name) = prop.key.static_name() else {
                        continue;
                    };
                    let name_span: SourceSpan = prop.key.span().into();
                    if !prop.shorthand {
                        self.tokens.push(Token {
                            span: name_span,
                            kind: TokenKind::PropertyKey {
                                object,
                                index: shape.properties.len(),
                            },
                        });
                    }
                    shape.properties.push(PropertyDecl {
                        name: name.to_string(),
                        span: prop.span.into(),
                        name_span,
                        value: self.value_of(&prop.value),
                        is_method: prop.method,
                        doc: self.jsdoc_before(prop.span.start as usize),
                        enclosing: enclosing.clone(),
                    });
                }
                ObjectPropertyKind::SpreadProperty(spread) => {
                    shape.spreads.push(self.value_of(&spread.argument));
                }
            }
        }

        self.objects.insert(object, shape);
        walk::walk_object_expression(self, it);
    }

    fn visit_static_member_expression(&mut self, it: &StaticMemberExpression<'a>) {
        let name_span: SourceSpan = it.property.span.into();
        self.tokens.push(Token {
            span: name_span,
            kind: TokenKind::MemberName(self.accesses.len()),
        });
        self.accesses.push(MemberAccess {
            span: it.span.into(),
            name: it.property.name.to_string(),
            name_span,
            receiver: self.value_of(&it.object),
        });
        walk::walk_static_member_expression(self, it);
    }

    fn visit_ts_interface_declaration(&mut self, it: &TSInterfaceDeclaration<'a>) {
        let mut members = Vec::new();
        for signature in &it.body.body {
            let (span, key, is_method) = match signature {
                TSSignature::TSPropertySignature(sig) => (sig.span, &sig.key, false),
                TSSignature::TSMethodSignature(sig) => (sig.span, &sig.key, true),
                _ => continue,
            };
            let Some(name) = key.static_name() else {
                continue;
            };
            members.push(InterfaceMember {
                name: name.to_string(),
                span: span.into(),
                name_span: key.span().into(),
                is_method,
                signature: self.slice(span).trim_end_matches(';').trim().to_string(),
                doc: self.jsdoc_before(span.start as usize),
            });
        }
        // declaration merging: members of every `interface X` block add up
        self.interfaces
            .entry(it.id.name.to_string())
            .or_default()
            .extend(members);
        walk::walk_ts_interface_declaration(self, it);
    }
}
