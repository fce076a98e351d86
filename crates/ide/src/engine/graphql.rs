//! GraphQL engine, built on the apollo-parser CST.

use std::borrow::Cow;

use apollo_parser::cst::{self, CstNode};
use apollo_parser::SyntaxTree;
use querynav_config::GraphQLConfig;
use querynav_syntax::{parse_graphql, LineIndex, ParseError};
use querynav_types::{Language, OffsetRange};

use super::{word_pattern, DeclarationSite, LanguageEngine, ReferenceScope};
use crate::index::TokenClass;
use crate::types::{DocumentSymbol, SymbolKind};

#[derive(Debug, Clone)]
pub struct GraphQLEngine {
    scope: ReferenceScope,
}

impl GraphQLEngine {
    #[must_use]
    pub fn new(config: &GraphQLConfig) -> Self {
        Self {
            scope: ReferenceScope::Workspace {
                include: config.include_patterns(),
                exclude: config.exclude_patterns(),
            },
        }
    }
}

impl Default for GraphQLEngine {
    fn default() -> Self {
        Self::new(&GraphQLConfig::default())
    }
}

impl LanguageEngine for GraphQLEngine {
    type Tree = SyntaxTree;

    fn language(&self) -> Language {
        Language::GraphQL
    }

    fn parse(&self, text: &str) -> Result<SyntaxTree, ParseError> {
        parse_graphql(text)
    }

    fn extract_declarations(&self, tree: &SyntaxTree) -> Vec<DeclarationSite> {
        let mut sites = Vec::new();

        for definition in tree.document().definitions() {
            if let cst::Definition::FragmentDefinition(fragment) = &definition {
                if let Some((name, range)) =
                    fragment.fragment_name().and_then(|n| name_and_range(n.name()))
                {
                    sites.push(DeclarationSite::new(TokenClass::Fragment, name, range));
                }
                continue;
            }

            let Some(type_def) = TypeDef::from_definition(&definition) else {
                continue;
            };

            // Extensions contribute members but never shadow the type itself
            if !type_def.extension {
                sites.push(DeclarationSite::new(
                    TokenClass::Type,
                    type_def.name.clone(),
                    type_def.name_range,
                ));
            }
            for member in &type_def.members {
                sites.push(DeclarationSite::new(
                    TokenClass::Field,
                    format!("{}.{}", type_def.name, member.name),
                    member.name_range,
                ));
            }
        }

        sites
    }

    fn enclosing_type(&self, tree: &SyntaxTree, offset: usize) -> Option<String> {
        let document = tree.document();

        let definition = document
            .definitions()
            .find(|definition| node_range(definition).contains(offset))?;

        match &definition {
            cst::Definition::FragmentDefinition(fragment) => fragment
                .type_condition()
                .and_then(|condition| condition.named_type())
                .and_then(|named| named.name())
                .map(|name| name.text().to_string()),
            cst::Definition::OperationDefinition(operation) => {
                let roots = RootTypes::from_document(&document);
                Some(roots.for_operation(operation).to_string())
            }
            other => TypeDef::from_definition(other).map(|type_def| type_def.name),
        }
    }

    fn normalize_name<'a>(&self, name: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(name)
    }

    fn reference_scope(&self) -> &ReferenceScope {
        &self.scope
    }

    fn scan_references(&self, text: &str, token: &str) -> Vec<OffsetRange> {
        let Some(regex) = word_pattern(token, false) else {
            return Vec::new();
        };
        regex
            .find_iter(text)
            .map(|m| OffsetRange::new(m.start(), m.end()))
            .collect()
    }

    fn document_symbols(&self, tree: &SyntaxTree, line_index: &LineIndex) -> Vec<DocumentSymbol> {
        let document = tree.document();
        let roots = RootTypes::from_document(&document);
        let mut symbols = Vec::new();

        for definition in document.definitions() {
            let range = line_index.offset_range_to_range(node_range(&definition));

            match &definition {
                cst::Definition::OperationDefinition(operation) => {
                    let kind = match operation_kind(operation.operation_type()) {
                        OperationKind::Query => SymbolKind::Query,
                        OperationKind::Mutation => SymbolKind::Mutation,
                        OperationKind::Subscription => SymbolKind::Subscription,
                    };
                    let (name, selection) = match name_and_range(operation.name()) {
                        Some((name, name_range)) => {
                            (name, line_index.offset_range_to_range(name_range))
                        }
                        None => (
                            "<anonymous>".to_string(),
                            line_index.offset_range_to_range(OffsetRange::at(
                                node_range(&definition).start,
                            )),
                        ),
                    };
                    symbols.push(
                        DocumentSymbol::new(name, kind, range, selection)
                            .with_detail(roots.for_operation(operation)),
                    );
                }
                cst::Definition::FragmentDefinition(fragment) => {
                    let Some((name, name_range)) =
                        fragment.fragment_name().and_then(|n| name_and_range(n.name()))
                    else {
                        continue;
                    };
                    let mut symbol = DocumentSymbol::new(
                        name,
                        SymbolKind::Fragment,
                        range,
                        line_index.offset_range_to_range(name_range),
                    );
                    if let Some(condition) = fragment
                        .type_condition()
                        .and_then(|c| c.named_type())
                        .and_then(|n| n.name())
                    {
                        let condition = condition.text().to_string();
                        symbol = symbol.with_detail(format!("on {condition}"));
                    }
                    symbols.push(symbol);
                }
                cst::Definition::DirectiveDefinition(directive) => {
                    if let Some((name, name_range)) = name_and_range(directive.name()) {
                        symbols.push(DocumentSymbol::new(
                            format!("@{name}"),
                            SymbolKind::Directive,
                            range,
                            line_index.offset_range_to_range(name_range),
                        ));
                    }
                }
                other => {
                    let Some(type_def) = TypeDef::from_definition(other) else {
                        continue;
                    };
                    let children = type_def
                        .members
                        .iter()
                        .map(|member| {
                            let symbol = DocumentSymbol::new(
                                member.name.clone(),
                                member.kind,
                                line_index.offset_range_to_range(member.range),
                                line_index.offset_range_to_range(member.name_range),
                            );
                            match &member.detail {
                                Some(detail) => symbol.with_detail(detail.clone()),
                                None => symbol,
                            }
                        })
                        .collect();
                    let mut symbol = DocumentSymbol::new(
                        type_def.name,
                        type_def.kind,
                        range,
                        line_index.offset_range_to_range(type_def.name_range),
                    )
                    .with_children(children);
                    if type_def.extension {
                        symbol = symbol.with_detail("extension");
                    }
                    symbols.push(symbol);
                }
            }
        }

        symbols
    }
}

fn node_range<N: CstNode>(node: &N) -> OffsetRange {
    let range = node.syntax().text_range();
    OffsetRange::new(range.start().into(), range.end().into())
}

/// Name text and the span of the identifier itself (no trailing trivia).
fn name_and_range(name: Option<cst::Name>) -> Option<(String, OffsetRange)> {
    let name = name?;
    let text = name.text().to_string();
    let start: usize = name.syntax().text_range().start().into();
    let range = OffsetRange::new(start, start + text.len());
    Some((text, range))
}

/// A type-like definition or extension, flattened for indexing and outlines.
struct TypeDef {
    kind: SymbolKind,
    name: String,
    name_range: OffsetRange,
    extension: bool,
    members: Vec<Member>,
}

/// A field, input field or enum value.
struct Member {
    kind: SymbolKind,
    name: String,
    name_range: OffsetRange,
    range: OffsetRange,
    detail: Option<String>,
}

impl TypeDef {
    fn from_definition(definition: &cst::Definition) -> Option<Self> {
        use cst::Definition as D;

        match definition {
            D::ObjectTypeDefinition(def) => Self::build(
                SymbolKind::Type,
                def.name(),
                false,
                field_members(def.fields_definition()),
            ),
            D::ObjectTypeExtension(ext) => Self::build(
                SymbolKind::Type,
                ext.name(),
                true,
                field_members(ext.fields_definition()),
            ),
            D::InterfaceTypeDefinition(def) => Self::build(
                SymbolKind::Interface,
                def.name(),
                false,
                field_members(def.fields_definition()),
            ),
            D::InterfaceTypeExtension(ext) => Self::build(
                SymbolKind::Interface,
                ext.name(),
                true,
                field_members(ext.fields_definition()),
            ),
            D::InputObjectTypeDefinition(def) => Self::build(
                SymbolKind::Input,
                def.name(),
                false,
                input_members(def.input_fields_definition()),
            ),
            D::InputObjectTypeExtension(ext) => Self::build(
                SymbolKind::Input,
                ext.name(),
                true,
                input_members(ext.input_fields_definition()),
            ),
            D::EnumTypeDefinition(def) => Self::build(
                SymbolKind::Enum,
                def.name(),
                false,
                enum_members(def.enum_values_definition()),
            ),
            D::EnumTypeExtension(ext) => Self::build(
                SymbolKind::Enum,
                ext.name(),
                true,
                enum_members(ext.enum_values_definition()),
            ),
            D::UnionTypeDefinition(def) => {
                Self::build(SymbolKind::Union, def.name(), false, Vec::new())
            }
            D::UnionTypeExtension(ext) => {
                Self::build(SymbolKind::Union, ext.name(), true, Vec::new())
            }
            D::ScalarTypeDefinition(def) => {
                Self::build(SymbolKind::Scalar, def.name(), false, Vec::new())
            }
            D::ScalarTypeExtension(ext) => {
                Self::build(SymbolKind::Scalar, ext.name(), true, Vec::new())
            }
            _ => None,
        }
    }

    fn build(
        kind: SymbolKind,
        name: Option<cst::Name>,
        extension: bool,
        members: Vec<Member>,
    ) -> Option<Self> {
        let (name, name_range) = name_and_range(name)?;
        Some(Self {
            kind,
            name,
            name_range,
            extension,
            members,
        })
    }
}

fn type_text(ty: Option<cst::Type>) -> Option<String> {
    ty.map(|ty| ty.syntax().text().to_string().trim().to_string())
}

fn field_members(fields: Option<cst::FieldsDefinition>) -> Vec<Member> {
    let Some(fields) = fields else {
        return Vec::new();
    };
    fields
        .field_definitions()
        .filter_map(|field| {
            let (name, name_range) = name_and_range(field.name())?;
            Some(Member {
                kind: SymbolKind::Field,
                name,
                name_range,
                range: node_range(&field),
                detail: type_text(field.ty()),
            })
        })
        .collect()
}

fn input_members(fields: Option<cst::InputFieldsDefinition>) -> Vec<Member> {
    let Some(fields) = fields else {
        return Vec::new();
    };
    fields
        .input_value_definitions()
        .filter_map(|field| {
            let (name, name_range) = name_and_range(field.name())?;
            Some(Member {
                kind: SymbolKind::Field,
                name,
                name_range,
                range: node_range(&field),
                detail: type_text(field.ty()),
            })
        })
        .collect()
}

fn enum_members(values: Option<cst::EnumValuesDefinition>) -> Vec<Member> {
    let Some(values) = values else {
        return Vec::new();
    };
    values
        .enum_value_definitions()
        .filter_map(|value| {
            let (name, name_range) = name_and_range(value.enum_value()?.name())?;
            Some(Member {
                kind: SymbolKind::EnumValue,
                name,
                name_range,
                range: node_range(&value),
                detail: None,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

/// Root operation type names, renamed by a `schema { ... }` definition if present.
struct RootTypes {
    query: String,
    mutation: String,
    subscription: String,
}

impl RootTypes {
    fn from_document(document: &cst::Document) -> Self {
        let mut roots = Self {
            query: "Query".to_string(),
            mutation: "Mutation".to_string(),
            subscription: "Subscription".to_string(),
        };

        for definition in document.definitions() {
            let cst::Definition::SchemaDefinition(schema) = definition else {
                continue;
            };
            for root in schema.root_operation_type_definitions() {
                let (Some(op_type), Some(name)) = (
                    root.operation_type(),
                    root.named_type().and_then(|named| named.name()),
                ) else {
                    continue;
                };
                let name = name.text().to_string();
                match operation_kind(Some(op_type)) {
                    OperationKind::Query => roots.query = name,
                    OperationKind::Mutation => roots.mutation = name,
                    OperationKind::Subscription => roots.subscription = name,
                }
            }
        }

        roots
    }

    fn for_operation(&self, operation: &cst::OperationDefinition) -> &str {
        match operation_kind(operation.operation_type()) {
            OperationKind::Query => &self.query,
            OperationKind::Mutation => &self.mutation,
            OperationKind::Subscription => &self.subscription,
        }
    }
}

fn operation_kind(op_type: Option<cst::OperationType>) -> OperationKind {
    match op_type {
        Some(op_type) if op_type.mutation_token().is_some() => OperationKind::Mutation,
        Some(op_type) if op_type.subscription_token().is_some() => OperationKind::Subscription,
        // Explicit `query` or the `{ ... }` shorthand
        _ => OperationKind::Query,
    }
}
