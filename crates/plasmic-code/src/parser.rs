//! TypeScript/TSX parsing with tree-sitter

use tree_sitter::{Parser, Tree};

use crate::error::{Error, Result};

/// Grammar used to parse a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dialect {
    Tsx,
    TypeScript,
}

impl Dialect {
    fn name(self) -> &'static str {
        match self {
            Self::Tsx => "tsx",
            Self::TypeScript => "typescript",
        }
    }
}

/// Parser for generated and hand-edited component modules.
///
/// TSX is a superset of the JSX the tool writes for `lang: js` projects, so
/// one grammar covers `.tsx`, `.jsx` and `.js`. Plain `.ts` files use the
/// TypeScript grammar, where `<T>expr` casts are legal.
pub struct SourceParser {
    parser: Parser,
    dialect: Dialect,
}

impl SourceParser {
    /// Parser for TSX/JSX modules.
    pub fn tsx() -> Result<Self> {
        Self::with_dialect(Dialect::Tsx)
    }

    /// Pick a grammar from a file name.
    pub fn for_path(path: &str) -> Result<Self> {
        if path.ends_with(".ts") && !path.ends_with(".d.ts") {
            Self::with_dialect(Dialect::TypeScript)
        } else {
            Self::with_dialect(Dialect::Tsx)
        }
    }

    fn with_dialect(dialect: Dialect) -> Result<Self> {
        let mut parser = Parser::new();
        let language = match dialect {
            Dialect::Tsx => tree_sitter_typescript::LANGUAGE_TSX,
            Dialect::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT,
        };
        parser
            .set_language(&language.into())
            .map_err(|e| Error::Grammar {
                language: dialect.name().to_string(),
                message: e.to_string(),
            })?;
        Ok(Self { parser, dialect })
    }

    /// Parse `source` into a syntax tree.
    ///
    /// Syntax errors do not fail the parse; tree-sitter marks them with
    /// error nodes and callers decide how strict to be.
    pub fn parse(&mut self, source: &str) -> Result<Tree> {
        self.parser
            .parse(source, None)
            .ok_or_else(|| Error::parse(self.dialect.name(), "parser produced no tree"))
    }
}
