//! Intermediate representation of generated modules
//!
//! A [`ModuleIr`] is built per load and formatted to source text through its
//! `Display` implementation. Tests inspect the IR directly instead of parsing
//! generated text.

use std::fmt;

use serde_json::Value;

/// Expression in generated source
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// String literal
    Str(String),
    Bool(bool),
    /// Inline JSON literal
    Json(Value),
    /// Build-time environment lookup, `import.meta.env.NAME`
    ImportMetaEnv(String),
    /// Request-time environment lookup, `process.env.NAME`
    ProcessEnv(String),
    /// `left ?? right`
    Coalesce(Box<Expr>, Box<Expr>),
    Call { callee: String, args: Vec<Expr> },
    Await(Box<Expr>),
    /// Object literal; a `None` value renders as shorthand property
    Object(Vec<(String, Option<Expr>)>),
}

impl Expr {
    pub fn str(value: impl Into<String>) -> Self {
        Expr::Str(value.into())
    }

    pub fn call(callee: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call {
            callee: callee.into(),
            args,
        }
    }

    pub fn coalesce(left: Expr, right: Expr) -> Self {
        Expr::Coalesce(Box::new(left), Box::new(right))
    }

    /// Whether this expression, or any part of it, reads an environment variable
    pub fn reads_env(&self) -> bool {
        match self {
            Expr::ImportMetaEnv(_) | Expr::ProcessEnv(_) => true,
            Expr::Coalesce(l, r) => l.reads_env() || r.reads_env(),
            Expr::Call { args, .. } => args.iter().any(Expr::reads_env),
            Expr::Await(inner) => inner.reads_env(),
            Expr::Object(props) => props.iter().any(|(_, v)| v.as_ref().is_some_and(Expr::reads_env)),
            Expr::Str(_) | Expr::Bool(_) | Expr::Json(_) => false,
        }
    }

    /// Whether this expression contains the given string literal
    pub fn contains_literal(&self, literal: &str) -> bool {
        match self {
            Expr::Str(s) => s == literal,
            Expr::Coalesce(l, r) => l.contains_literal(literal) || r.contains_literal(literal),
            Expr::Call { args, .. } => args.iter().any(|a| a.contains_literal(literal)),
            Expr::Await(inner) => inner.contains_literal(literal),
            Expr::Object(props) => props
                .iter()
                .any(|(_, v)| v.as_ref().is_some_and(|v| v.contains_literal(literal))),
            _ => false,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Str(s) => write!(f, "{}", Value::String(s.clone())),
            Expr::Bool(b) => write!(f, "{}", b),
            Expr::Json(v) => write!(f, "{}", v),
            Expr::ImportMetaEnv(name) => write!(f, "import.meta.env.{}", name),
            Expr::ProcessEnv(name) => write!(f, "process.env.{}", name),
            Expr::Coalesce(l, r) => write!(f, "{} ?? {}", l, r),
            Expr::Call { callee, args } => {
                write!(f, "{}(", callee)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
            Expr::Await(inner) => write!(f, "await {}", inner),
            Expr::Object(props) => {
                if props.is_empty() {
                    return f.write_str("{}");
                }
                f.write_str("{ ")?;
                for (i, (key, value)) in props.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    match value {
                        Some(value) => write!(f, "{}: {}", key, value)?,
                        None => f.write_str(key)?,
                    }
                }
                f.write_str(" }")
            }
        }
    }
}

/// `import { a, b } from "specifier";`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub names: Vec<String>,
    pub from: String,
}

/// `const name = value;`, optionally exported
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub name: String,
    pub value: Expr,
    pub export: bool,
}

/// How the generated module constructs its `db` export
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConstruction {
    /// Bindings the client expression depends on
    pub setup: Vec<Binding>,
    pub client: Expr,
}

/// Export of one declared table
#[derive(Debug, Clone, PartialEq)]
pub struct TableBinding {
    pub name: String,
    /// Full declarative schema, inlined as JSON
    pub schema: Value,
    /// Whether the export is a raw client table handle (always `false` for generated tables)
    pub raw: bool,
}

impl TableBinding {
    /// `asTable("<name>", <schema>, <raw>)`
    pub fn factory_call(&self) -> Expr {
        Expr::call(
            super::TABLE_FACTORY,
            vec![
                Expr::str(self.name.as_str()),
                Expr::Json(self.schema.clone()),
                Expr::Bool(self.raw),
            ],
        )
    }
}

/// A generated module
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleIr {
    pub imports: Vec<Import>,
    pub client: ClientConstruction,
    pub reexports: Vec<String>,
    pub tables: Vec<TableBinding>,
}

impl ModuleIr {
    /// Names exported by the module, in order
    pub fn export_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .client
            .setup
            .iter()
            .filter(|b| b.export)
            .map(|b| b.name.as_str())
            .collect();
        names.push(super::DB_EXPORT);
        names.extend(self.tables.iter().map(|t| t.name.as_str()));
        names
    }
}

impl fmt::Display for ModuleIr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for import in &self.imports {
            writeln!(
                f,
                "import {{ {} }} from {};",
                import.names.join(", "),
                Expr::str(import.from.as_str())
            )?;
        }
        writeln!(f)?;

        for binding in &self.client.setup {
            write_binding(f, binding)?;
        }
        write_binding(
            f,
            &Binding {
                name: super::DB_EXPORT.to_string(),
                value: self.client.client.clone(),
                export: true,
            },
        )?;

        for specifier in &self.reexports {
            writeln!(f, "export * from {};", Expr::str(specifier.as_str()))?;
        }

        if !self.tables.is_empty() {
            writeln!(f)?;
        }
        for table in &self.tables {
            write_binding(
                f,
                &Binding {
                    name: table.name.clone(),
                    value: table.factory_call(),
                    export: true,
                },
            )?;
        }
        Ok(())
    }
}

fn write_binding(f: &mut fmt::Formatter<'_>, binding: &Binding) -> fmt::Result {
    writeln!(
        f,
        "{}const {} = {};",
        if binding.export { "export " } else { "" },
        binding.name,
        binding.value
    )
}
