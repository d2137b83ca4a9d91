//! Macro storage (§3 "Macro table", §4.2).
//!
//! A name-keyed map of definitions with a parallel "system macro" bit, so
//! `clear_non_system` can wipe user definitions between files without
//! touching built-ins like `__LINE__`/`__FILE__`.

use std::collections::HashMap;
use std::rc::Rc;

use precomp_lexer::Token;
use thiserror::Error;

/// Context available to a dynamic macro's generator function (§4.2
/// "Dynamic macros").
#[derive(Debug, Clone)]
pub struct ExpansionContext {
    pub source_file: String,
    pub line: u32,
    pub column: u32,
}

/// A macro whose expansion is computed at expansion time rather than stored
/// verbatim, e.g. `__LINE__`/`__FILE__` (§4.2 "Dynamic macros").
pub type DynamicGenerator = Rc<dyn Fn(&ExpansionContext) -> String>;

#[derive(Clone)]
pub enum Body {
    /// A fixed token sequence, as written after `#define NAME ...`.
    Tokens(Vec<Token>),
    /// A generator invoked fresh at every expansion site, producing text
    /// that is then re-lexed into a single token carrying `kind`.
    Dynamic(DynamicGenerator),
}

impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Body::Tokens(tokens) => f.debug_tuple("Tokens").field(tokens).finish(),
            Body::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// A single macro definition (§3).
#[derive(Debug, Clone)]
pub struct Definition {
    pub name: String,
    /// `Some(params)` for function-like macros (possibly empty, `FOO()`),
    /// `None` for object-like macros.
    pub parameters: Option<Vec<String>>,
    pub body: Body,
    /// Built-in macros (`__LINE__`, `__FILE__`) survive `clear_non_system`.
    pub is_system: bool,
}

impl Definition {
    pub fn is_function_like(&self) -> bool {
        self.parameters.is_some()
    }
}

/// Error raised while recording a definition, before it ever reaches the
/// macro table (§4.2 "a function-like macro's parameter list must consist
/// of unique identifiers").
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("duplicate macro parameter `{0}`")]
pub struct DuplicateParameter(pub String);

/// The macro table plus the enabled/disabled switch (§4.2: "the macro
/// engine ... has an enabled flag; while disabled, expansion is skipped
/// entirely and identifiers pass through unchanged").
#[derive(Debug, Clone)]
pub struct Definitions {
    macros: HashMap<String, Definition>,
    enabled: bool,
}

impl Default for Definitions {
    fn default() -> Self {
        Self::new()
    }
}

impl Definitions {
    pub fn new() -> Self {
        let mut table = HashMap::new();
        register_builtins(&mut table);
        Self {
            macros: table,
            enabled: true,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Definition> {
        self.macros.get(name)
    }

    /// Defines an object-like macro. Redefinition replaces the previous
    /// definition silently (§4.2: "inserting a definition under a name that
    /// already exists replaces it; there is no redefinition diagnostic").
    pub fn define_object_like(&mut self, name: impl Into<String>, body: Vec<Token>) {
        let name = name.into();
        self.macros.insert(
            name.clone(),
            Definition {
                name,
                parameters: None,
                body: Body::Tokens(body),
                is_system: false,
            },
        );
    }

    /// Defines a function-like macro. Parameter names must be unique.
    pub fn define_function_like(
        &mut self,
        name: impl Into<String>,
        parameters: Vec<String>,
        body: Vec<Token>,
    ) -> Result<(), DuplicateParameter> {
        let mut seen = std::collections::HashSet::new();
        for parameter in &parameters {
            if !seen.insert(parameter.clone()) {
                return Err(DuplicateParameter(parameter.clone()));
            }
        }
        let name = name.into();
        self.macros.insert(
            name.clone(),
            Definition {
                name,
                parameters: Some(parameters),
                body: Body::Tokens(body),
                is_system: false,
            },
        );
        Ok(())
    }

    pub fn undef(&mut self, name: &str) {
        self.macros.remove(name);
    }

    /// Removes every non-system macro (§4.2).
    pub fn clear_non_system(&mut self) {
        self.macros.retain(|_, definition| definition.is_system);
    }
}

fn register_builtins(table: &mut HashMap<String, Definition>) {
    let line: DynamicGenerator = Rc::new(|ctx| ctx.line.to_string());
    let file: DynamicGenerator = Rc::new(|ctx| ctx.source_file.clone());
    table.insert(
        "__LINE__".to_string(),
        Definition {
            name: "__LINE__".to_string(),
            parameters: None,
            body: Body::Dynamic(line),
            is_system: true,
        },
    );
    table.insert(
        "__FILE__".to_string(),
        Definition {
            name: "__FILE__".to_string(),
            parameters: None,
            body: Body::Dynamic(file),
            is_system: true,
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use precomp_lexer::TokenKind;

    fn tok(text: &str) -> Token {
        Token::new(TokenKind::Identifier, text, 1, 1)
    }

    #[test]
    fn builtins_survive_clear_non_system() {
        let mut defs = Definitions::new();
        defs.define_object_like("FOO", vec![tok("1")]);
        assert!(defs.is_defined("FOO"));
        defs.clear_non_system();
        assert!(!defs.is_defined("FOO"));
        assert!(defs.is_defined("__LINE__"));
        assert!(defs.is_defined("__FILE__"));
    }

    #[test]
    fn duplicate_parameter_rejected() {
        let mut defs = Definitions::new();
        let result = defs.define_function_like(
            "CAT",
            vec!["a".to_string(), "a".to_string()],
            vec![tok("a")],
        );
        assert_eq!(result, Err(DuplicateParameter("a".to_string())));
    }

    #[test]
    fn redefinition_replaces_silently() {
        let mut defs = Definitions::new();
        defs.define_object_like("FOO", vec![tok("1")]);
        defs.define_object_like("FOO", vec![tok("2")]);
        match &defs.get("FOO").unwrap().body {
            Body::Tokens(tokens) => assert_eq!(tokens[0].text, "2"),
            Body::Dynamic(_) => panic!("expected tokens"),
        }
    }
}
