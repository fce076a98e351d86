//! Declaration Resolver.
//!
//! A token is tried as each [`TokenClass`] in [`TokenClass::ORDER`]; the first
//! class with any match wins. Within a class, a declaration in the requesting
//! document shadows everything else; otherwise every other document's match is
//! returned, so ambiguous cross-file names surface as several locations.

use querynav_types::{FileUri, Location};

use crate::engine::LanguageEngine;
use crate::index::{DocumentIndex, TokenClass};

/// Resolve `token`, found at byte `offset` of `file`, to its declarations.
///
/// An empty result is the normal "no definition" outcome.
pub fn resolve<E: LanguageEngine>(
    engine: &E,
    index: &DocumentIndex<E::Tree>,
    file: &FileUri,
    offset: usize,
    token: &str,
) -> Vec<Location> {
    for class in TokenClass::ORDER {
        let Some(key) = lookup_key(engine, index, file, offset, token, class) else {
            continue;
        };
        let found = search(index, class, &key, file);
        if !found.is_empty() {
            tracing::debug!(
                file = %file,
                token,
                class = class.as_str(),
                matches = found.len(),
                "Resolved declaration"
            );
            return found;
        }
    }

    tracing::debug!(file = %file, token, "No declaration found");
    Vec::new()
}

fn lookup_key<E: LanguageEngine>(
    engine: &E,
    index: &DocumentIndex<E::Tree>,
    file: &FileUri,
    offset: usize,
    token: &str,
    class: TokenClass,
) -> Option<String> {
    match class {
        TokenClass::Type | TokenClass::Fragment => Some(engine.normalize_name(token).into_owned()),
        TokenClass::Field => {
            // Fields need a type context from this document's own tree
            let slot = index.slot(file)?;
            let enclosing = engine.enclosing_type(&slot.tree, offset)?;
            let qualified = format!("{enclosing}.{token}");
            Some(engine.normalize_name(&qualified).into_owned())
        }
    }
}

/// Same-file first, then the union over all other documents.
fn search<T>(index: &DocumentIndex<T>, class: TokenClass, key: &str, origin: &FileUri) -> Vec<Location> {
    if let Some(declaration) = index
        .slot(origin)
        .and_then(|slot| slot.tables.lookup(class, key))
    {
        return vec![declaration.location.clone()];
    }

    index
        .slots()
        .filter(|(file, _)| *file != origin)
        .filter_map(|(_, slot)| slot.tables.lookup(class, key))
        .map(|declaration| declaration.location.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::GraphQLEngine;
    use querynav_types::Range;

    fn index_of(engine: &GraphQLEngine, files: &[(&str, &str)]) -> DocumentIndex<apollo_parser::SyntaxTree> {
        let mut index = DocumentIndex::default();
        for (uri, text) in files {
            assert!(index.update(engine, &FileUri::new(*uri), text));
        }
        index
    }

    #[test]
    fn test_type_resolves_across_files() {
        let engine = GraphQLEngine::default();
        let index = index_of(
            &engine,
            &[
                ("file:///a.graphql", "type User { id: ID name: String }"),
                ("file:///b.graphql", "type Query { user: User }"),
            ],
        );

        let origin = FileUri::new("file:///b.graphql");
        let locations = resolve(&engine, &index, &origin, 20, "User");

        assert_eq!(
            locations,
            vec![Location::new(
                FileUri::new("file:///a.graphql"),
                Range::on_line(0, 5, 9)
            )]
        );
    }

    #[test]
    fn test_same_file_declaration_wins() {
        let engine = GraphQLEngine::default();
        let index = index_of(
            &engine,
            &[
                ("file:///a.graphql", "type User { id: ID }"),
                ("file:///b.graphql", "type User { id: ID }\ntype Query { user: User }"),
                ("file:///c.graphql", "type User { id: ID }"),
            ],
        );

        let origin = FileUri::new("file:///b.graphql");
        let locations = resolve(&engine, &index, &origin, 40, "User");

        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].file, origin);
    }

    #[test]
    fn test_cross_file_matches_are_all_reported() {
        let engine = GraphQLEngine::default();
        let index = index_of(
            &engine,
            &[
                ("file:///a.graphql", "type User { id: ID }"),
                ("file:///b.graphql", "type User { id: ID }"),
                ("file:///c.graphql", "type Query { user: User }"),
            ],
        );

        let origin = FileUri::new("file:///c.graphql");
        assert_eq!(resolve(&engine, &index, &origin, 20, "User").len(), 2);
    }

    #[test]
    fn test_type_beats_fragment() {
        let engine = GraphQLEngine::default();
        let text = "type User { id: ID }\nfragment User on User { id }";
        let index = index_of(&engine, &[("file:///a.graphql", text)]);

        let origin = FileUri::new("file:///a.graphql");
        let locations = resolve(&engine, &index, &origin, text.rfind("User").unwrap(), "User");

        assert_eq!(locations, vec![Location::new(origin, Range::on_line(0, 5, 9))]);
    }

    #[test]
    fn test_field_needs_matching_enclosing_type() {
        let engine = GraphQLEngine::default();
        let text = "type User { name: String }\ntype Pet { name: String }\nfragment F on Pet { name }";
        let index = index_of(&engine, &[("file:///a.graphql", text)]);
        let origin = FileUri::new("file:///a.graphql");

        let in_fragment = resolve(&engine, &index, &origin, text.rfind("name").unwrap(), "name");
        assert_eq!(in_fragment, vec![Location::new(origin.clone(), Range::on_line(1, 11, 15))]);

        let text = "type User { name: String }\ntype Pet { id: ID }";
        let other = index_of(&engine, &[("file:///a.graphql", text)]);
        assert!(resolve(&engine, &other, &origin, text.find("id").unwrap(), "name").is_empty());
    }

    #[test]
    fn test_field_outside_any_declaration_is_empty() {
        let engine = GraphQLEngine::default();
        let text = "type User { name: String }\n\n";
        let index = index_of(&engine, &[("file:///a.graphql", text)]);
        let origin = FileUri::new("file:///a.graphql");

        assert!(resolve(&engine, &index, &origin, text.len(), "name").is_empty());
    }
}
