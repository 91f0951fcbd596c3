//! Symbol resolution over a [`Program`](crate::service::Program).
//!
//! Far from a full checker: it follows the values that the indexer recorded
//! (bindings, object literal shapes, member results) and falls back to the
//! library interfaces for primitives and for members every object inherits.

use jsdoc_deco_core::codec::{DisplayPart, JsDocTagInfo};

use crate::jsdoc::JsDoc;
use crate::lib_dts::is_library_path;
use crate::service::Program;
use crate::source_file::{
    BindingKind, DeclaratorFrame, SourceFile, SourceSpan, Token, TokenKind, ValueRef,
};

/// Resolution gives up beyond this many indirections (`const a = a.b`).
const MAX_DEPTH: usize = 32;

/// How deep object types are spelled out in display strings.
const DISPLAY_DEPTH: usize = 2;

/// Where a declaration sits syntactically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclarationShape {
    ObjectProperty {
        enclosing: Vec<DeclaratorFrame>,
        is_method: bool,
    },
    InterfaceMember {
        interface: String,
        is_method: bool,
    },
    Variable {
        kind: BindingKind,
    },
}

#[derive(Debug, Clone)]
pub struct Declaration {
    pub file_name: String,
    pub span: SourceSpan,
    pub name_span: SourceSpan,
    pub doc: Option<JsDoc>,
    pub shape: DeclarationShape,
    /// Quick-info display string, e.g. `(property) x: number`
    pub display: String,
}

impl Declaration {
    /// Property of an object literal that initializes a `const` binding.
    ///
    /// The nearest enclosing `const` declarator decides; `let` and `var`
    /// declarators in between are passed over.
    pub fn is_const_object_literal_property(&self) -> bool {
        match &self.shape {
            DeclarationShape::ObjectProperty { enclosing, .. } => enclosing
                .iter()
                .find(|frame| frame.is_const)
                .is_some_and(|frame| frame.initializer_is_object),
            _ => false,
        }
    }

    pub fn is_from_library(&self) -> bool {
        is_library_path(&self.file_name)
    }

    /// Script element kind as reported by quick-info
    pub fn kind(&self) -> &'static str {
        match &self.shape {
            DeclarationShape::ObjectProperty { is_method: true, .. }
            | DeclarationShape::InterfaceMember { is_method: true, .. } => "method",
            DeclarationShape::ObjectProperty { .. } | DeclarationShape::InterfaceMember { .. } => {
                "property"
            }
            DeclarationShape::Variable { kind } => match kind {
                BindingKind::Const => "const",
                BindingKind::Let => "let",
                BindingKind::Var => "var",
                BindingKind::Other => "alias",
            },
        }
    }
}

/// A resolved symbol and every declaration contributing to it.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub declarations: Vec<Declaration>,
}

impl Symbol {
    /// Documentation comment fragments across all declarations, separated
    /// by line breaks.
    pub fn documentation_comment(&self) -> Vec<DisplayPart> {
        let mut parts = Vec::new();
        for doc in self.declarations.iter().filter_map(|d| d.doc.as_ref()) {
            if doc.comment.is_empty() {
                continue;
            }
            if !parts.is_empty() {
                parts.push(DisplayPart {
                    text: "\n".to_string(),
                    kind: "lineBreak".to_string(),
                });
            }
            parts.push(DisplayPart::text(doc.comment.clone()));
        }
        parts
    }

    pub fn js_doc_tags(&self) -> Vec<JsDocTagInfo> {
        self.declarations
            .iter()
            .filter_map(|d| d.doc.as_ref())
            .flat_map(|doc| doc.tags.iter().cloned())
            .collect()
    }
}

/// The inferred type of a value.
#[derive(Debug, Clone, Copy)]
enum Type<'p> {
    Object { file: &'p SourceFile, span: SourceSpan },
    Interface(&'static str),
    Unknown,
}

pub struct TypeChecker<'p> {
    program: &'p Program,
}

impl<'p> TypeChecker<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self { program }
    }

    /// The symbol bound to `token` in `file`.
    pub fn symbol_at_location(&self, file: &'p SourceFile, token: &Token) -> Option<Symbol> {
        match token.kind {
            TokenKind::MemberName(index) => {
                let access = file.access(index)?;
                let receiver = self.type_of(file, access.receiver, 0);
                self.property_of(receiver, &access.name, 0)
            }
            TokenKind::Reference(Some(symbol)) | TokenKind::Binding(Some(symbol)) => {
                let binding = file.binding(symbol)?;
                let ty = self.type_of(file, binding.value, 0);
                Some(Symbol {
                    name: binding.name.clone(),
                    declarations: vec![Declaration {
                        file_name: file.file_name().to_string(),
                        span: binding.span,
                        name_span: binding.name_span,
                        doc: binding.doc.clone(),
                        shape: DeclarationShape::Variable { kind: binding.kind },
                        display: format!(
                            "{} {}: {}",
                            binding.kind.keyword(),
                            binding.name,
                            self.display_type(ty, DISPLAY_DEPTH)
                        ),
                    }],
                })
            }
            TokenKind::PropertyKey { object, index } => {
                let property = file.object(object)?.properties.get(index)?;
                Some(Symbol {
                    name: property.name.clone(),
                    declarations: self.object_declarations(file, object, &property.name),
                })
            }
            TokenKind::Reference(None) | TokenKind::Binding(None) => None,
        }
    }

    fn type_of(&self, file: &'p SourceFile, value: ValueRef, depth: usize) -> Type<'p> {
        if depth > MAX_DEPTH {
            return Type::Unknown;
        }
        match value {
            ValueRef::Object(span) => Type::Object { file, span },
            ValueRef::Symbol(symbol) => match file.binding(symbol) {
                Some(binding) => self.type_of(file, binding.value, depth + 1),
                None => Type::Unknown,
            },
            ValueRef::Member(span) => {
                let Some(access) = file.access_by_span(span) else {
                    return Type::Unknown;
                };
                let receiver = self.type_of(file, access.receiver, depth + 1);
                self.member_type(receiver, &access.name, depth + 1)
            }
            ValueRef::Builtin(builtin) => Type::Interface(builtin.interface_name()),
            ValueRef::Unknown => Type::Unknown,
        }
    }

    /// Type of `receiver.name`, following object literal property values.
    fn member_type(&self, receiver: Type<'p>, name: &str, depth: usize) -> Type<'p> {
        if depth > MAX_DEPTH {
            return Type::Unknown;
        }
        let Type::Object { file, span } = receiver else {
            return Type::Unknown;
        };
        let Some(shape) = file.object(span) else {
            return Type::Unknown;
        };
        if let Some(property) = shape.properties_named(name).last() {
            if property.is_method {
                return Type::Unknown;
            }
            return self.type_of(file, property.value, depth + 1);
        }
        shape
            .spreads
            .iter()
            .rev()
            .map(|spread| {
                let spread = self.type_of(file, *spread, depth + 1);
                self.member_type(spread, name, depth + 1)
            })
            .find(|ty| !matches!(ty, Type::Unknown))
            .unwrap_or(Type::Unknown)
    }

    fn property_of(&self, receiver: Type<'p>, name: &str, depth: usize) -> Option<Symbol> {
        if depth > MAX_DEPTH {
            return None;
        }
        match receiver {
            Type::Object { file, span } => {
                let shape = file.object(span)?;
                let declarations = self.object_declarations(file, span, name);
                if !declarations.is_empty() {
                    return Some(Symbol {
                        name: name.to_string(),
                        declarations,
                    });
                }
                shape
                    .spreads
                    .iter()
                    .rev()
                    .find_map(|spread| {
                        let spread = self.type_of(file, *spread, depth + 1);
                        match spread {
                            Type::Object { .. } => self.property_of(spread, name, depth + 1),
                            _ => None,
                        }
                    })
                    .or_else(|| self.library_member("Object", name))
            }
            Type::Interface(interface) => self
                .library_member(interface, name)
                .or_else(|| self.library_member("Object", name)),
            Type::Unknown => None,
        }
    }

    fn object_declarations(
        &self,
        file: &'p SourceFile,
        object: SourceSpan,
        name: &str,
    ) -> Vec<Declaration> {
        let Some(shape) = file.object(object) else {
            return Vec::new();
        };
        shape
            .properties_named(name)
            .map(|property| {
                let display = if property.is_method {
                    format!("(method) {}(): any", property.name)
                } else {
                    let ty = self.type_of(file, property.value, 0);
                    format!(
                        "(property) {}: {}",
                        property.name,
                        self.display_type(ty, DISPLAY_DEPTH)
                    )
                };
                Declaration {
                    file_name: file.file_name().to_string(),
                    span: property.span,
                    name_span: property.name_span,
                    doc: property.doc.clone(),
                    shape: DeclarationShape::ObjectProperty {
                        enclosing: property.enclosing.clone(),
                        is_method: property.is_method,
                    },
                    display,
                }
            })
            .collect()
    }

    fn library_member(&self, interface: &str, name: &str) -> Option<Symbol> {
        let lib = self.program.lib();
        let declarations: Vec<Declaration> = lib
            .interface(interface)?
            .iter()
            .filter(|member| member.name == name)
            .map(|member| Declaration {
                file_name: lib.file_name().to_string(),
                span: member.span,
                name_span: member.name_span,
                doc: member.doc.clone(),
                shape: DeclarationShape::InterfaceMember {
                    interface: interface.to_string(),
                    is_method: member.is_method,
                },
                display: format!(
                    "({}) {}.{}",
                    if member.is_method { "method" } else { "property" },
                    interface,
                    member.signature
                ),
            })
            .collect();
        (!declarations.is_empty()).then(|| Symbol {
            name: name.to_string(),
            declarations,
        })
    }

    fn display_type(&self, ty: Type<'p>, depth: usize) -> String {
        match ty {
            Type::Object { file, span } => {
                let Some(shape) = file.object(span) else {
                    return "{}".to_string();
                };
                if shape.properties.is_empty() {
                    return "{}".to_string();
                }
                if depth == 0 {
                    return "{ ...; }".to_string();
                }
                let members: Vec<String> = shape
                    .properties
                    .iter()
                    .map(|property| {
                        if property.is_method {
                            format!("{}(): any;", property.name)
                        } else {
                            let ty = self.type_of(file, property.value, 0);
                            format!("{}: {};", property.name, self.display_type(ty, depth - 1))
                        }
                    })
                    .collect();
                format!("{{ {} }}", members.join(" "))
            }
            Type::Interface(name) => match name {
                "String" => "string".to_string(),
                "Number" => "number".to_string(),
                "Boolean" => "boolean".to_string(),
                "Array" => "any[]".to_string(),
                other => other.to_string(),
            },
            Type::Unknown => "any".to_string(),
        }
    }
}
