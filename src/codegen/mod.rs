//! Code generation for the virtual database module
//!
//! [`build_module`] turns the declared tables and a [`GenerationTarget`] into a
//! [`ModuleIr`]; [`render`] formats it. Two variants exist:
//!
//! - **Local**: normalizes the database URL (environment override or the embedded
//!   default file) and constructs a local client.
//! - **Remote**: constructs a remote client from a token expression and a URL
//!   expression.
//!
//! # Token selection
//!
//! | build mode | output mode | token expression |
//! |------------|-------------|------------------|
//! | build      | server      | `process.env.VIRTDB_APP_TOKEN` |
//! | build      | static      | `process.env.VIRTDB_APP_TOKEN ?? "<token>"` |
//! | dev        | any         | `"<token>"` |
//!
//! Server output never inlines the secret: it is read from the trusted runtime
//! environment on each request. Static output has no request-time environment,
//! so the build-time token is the fallback.

pub mod ir;
pub mod types;

pub use ir::{Binding, ClientConstruction, Expr, Import, ModuleIr, TableBinding};
pub use types::render_type_declarations;

use std::fmt;

use crate::schema::TableSet;

/// Import specifier of the runtime client package
pub const RUNTIME_IMPORT: &str = "virtdb/runtime";
/// Import specifier of the exports shared by every generated module
pub const VIRTUAL_EXPORTS_IMPORT: &str = "virtdb/runtime/virtual";

/// Runtime override of the local database file
pub const DATABASE_FILE_ENV: &str = "VIRTDB_DATABASE_FILE";
/// Runtime override of the remote database URL
pub const REMOTE_DB_URL_ENV: &str = "VIRTDB_REMOTE_DB_URL";
/// Trusted server-side variable holding the remote app token
pub const APP_TOKEN_ENV: &str = "VIRTDB_APP_TOKEN";

pub(crate) const DB_EXPORT: &str = "db";
pub(crate) const TABLE_FACTORY: &str = "asTable";
const DB_URL_BINDING: &str = "dbUrl";
const LOCAL_CLIENT_FACTORY: &str = "createLocalDatabaseClient";
const REMOTE_CLIENT_FACTORY: &str = "createRemoteDatabaseClient";
const NORMALIZE_URL: &str = "normalizeDatabaseUrl";

/// Every top-level name a generated module declares or imports itself
pub const GENERATED_NAMES: &[&str] = &[
    DB_EXPORT,
    DB_URL_BINDING,
    TABLE_FACTORY,
    LOCAL_CLIENT_FACTORY,
    REMOTE_CLIENT_FACTORY,
    NORMALIZE_URL,
];

/// Authentication token for the remote backend
///
/// The value is never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretRef(String);

impl SecretRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretRef(***)")
    }
}

/// Which database the generated module binds to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// Embedded database file
    Local {
        /// Default `file://` URL of the database file
        database_url: String,
    },
    /// Hosted database
    Remote {
        /// URL used when no runtime override is set
        default_url: String,
        app_token: SecretRef,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    Build,
    Dev,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Rendered per request by a server with a runtime environment
    Server,
    /// Prerendered at build time
    #[default]
    Static,
}

/// Everything that decides the shape of a generated module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationTarget {
    pub backend: Backend,
    pub build_mode: BuildMode,
    pub output_mode: OutputMode,
}

/// Token expression for the remote client
pub fn token_expr(build_mode: BuildMode, output_mode: OutputMode, token: &SecretRef) -> Expr {
    let env = Expr::ProcessEnv(APP_TOKEN_ENV.to_string());
    match (build_mode, output_mode) {
        (BuildMode::Build, OutputMode::Server) => env,
        (BuildMode::Build, OutputMode::Static) => Expr::coalesce(env, Expr::str(token.expose())),
        (BuildMode::Dev, _) => Expr::str(token.expose()),
    }
}

/// Remote URL expression: runtime override, then the computed default
pub fn remote_url_expr(default_url: &str) -> Expr {
    Expr::coalesce(
        Expr::ImportMetaEnv(REMOTE_DB_URL_ENV.to_string()),
        Expr::str(default_url),
    )
}

/// Build the module IR for a target
pub fn build_module(tables: &TableSet, target: &GenerationTarget) -> ModuleIr {
    let (factory, client) = match &target.backend {
        Backend::Local { database_url } => (
            LOCAL_CLIENT_FACTORY,
            ClientConstruction {
                setup: vec![Binding {
                    name: DB_URL_BINDING.to_string(),
                    value: Expr::call(
                        NORMALIZE_URL,
                        vec![
                            Expr::ImportMetaEnv(DATABASE_FILE_ENV.to_string()),
                            Expr::str(database_url.as_str()),
                        ],
                    ),
                    export: false,
                }],
                client: Expr::call(
                    LOCAL_CLIENT_FACTORY,
                    vec![Expr::Object(vec![(DB_URL_BINDING.to_string(), None)])],
                ),
            },
        ),
        Backend::Remote {
            default_url,
            app_token,
        } => (
            REMOTE_CLIENT_FACTORY,
            ClientConstruction {
                setup: Vec::new(),
                client: Expr::Await(Box::new(Expr::call(
                    REMOTE_CLIENT_FACTORY,
                    vec![Expr::Object(vec![
                        (
                            "token".to_string(),
                            Some(token_expr(target.build_mode, target.output_mode, app_token)),
                        ),
                        ("url".to_string(), Some(remote_url_expr(default_url))),
                    ])],
                ))),
            },
        ),
    };

    let mut names = vec![TABLE_FACTORY.to_string(), factory.to_string()];
    if factory == LOCAL_CLIENT_FACTORY {
        names.push(NORMALIZE_URL.to_string());
    }

    ModuleIr {
        imports: vec![Import {
            names,
            from: RUNTIME_IMPORT.to_string(),
        }],
        client,
        reexports: vec![VIRTUAL_EXPORTS_IMPORT.to_string()],
        tables: tables
            .iter()
            .map(|table| TableBinding {
                name: table.name.clone(),
                schema: serde_json::to_value(table).unwrap_or(serde_json::Value::Null),
                raw: false,
            })
            .collect(),
    }
}

/// Render generated module source text
pub fn render(tables: &TableSet, target: &GenerationTarget) -> String {
    build_module(tables, target).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnDef, ColumnKind, TableSchema};

    const TOKEN: &str = "tok_live_12345";

    fn blog_tables() -> TableSet {
        TableSet::new(vec![
            TableSchema::new(
                "posts",
                vec![
                    ColumnDef::new("id", ColumnKind::Number).primary_key(),
                    ColumnDef::new("title", ColumnKind::Text),
                ],
            ),
            TableSchema::new(
                "tags",
                vec![
                    ColumnDef::new("id", ColumnKind::Number).primary_key(),
                    ColumnDef::new("name", ColumnKind::Text),
                ],
            ),
        ])
        .unwrap()
    }

    fn remote(build_mode: BuildMode, output_mode: OutputMode) -> GenerationTarget {
        GenerationTarget {
            backend: Backend::Remote {
                default_url: "https://db.example.test".to_string(),
                app_token: SecretRef::new(TOKEN),
            },
            build_mode,
            output_mode,
        }
    }

    fn local() -> GenerationTarget {
        GenerationTarget {
            backend: Backend::Local {
                database_url: "file:///site/.virtdb/content.db".to_string(),
            },
            build_mode: BuildMode::Dev,
            output_mode: OutputMode::Static,
        }
    }

    #[test]
    fn test_token_matrix_build_server() {
        let token = token_expr(BuildMode::Build, OutputMode::Server, &SecretRef::new(TOKEN));
        assert_eq!(token, Expr::ProcessEnv(APP_TOKEN_ENV.to_string()));

        let source = render(&blog_tables(), &remote(BuildMode::Build, OutputMode::Server));
        assert!(source.contains("process.env.VIRTDB_APP_TOKEN"));
        assert!(!source.contains(TOKEN));
    }

    #[test]
    fn test_token_matrix_build_static() {
        let token = token_expr(BuildMode::Build, OutputMode::Static, &SecretRef::new(TOKEN));
        assert_eq!(
            token,
            Expr::coalesce(Expr::ProcessEnv(APP_TOKEN_ENV.to_string()), Expr::str(TOKEN))
        );

        let source = render(&blog_tables(), &remote(BuildMode::Build, OutputMode::Static));
        assert!(source.contains("process.env.VIRTDB_APP_TOKEN ?? \"tok_live_12345\""));
    }

    #[test]
    fn test_token_matrix_dev() {
        for output in [OutputMode::Server, OutputMode::Static] {
            let token = token_expr(BuildMode::Dev, output, &SecretRef::new(TOKEN));
            assert!(!token.reads_env());
            assert!(token.contains_literal(TOKEN));

            let source = render(&blog_tables(), &remote(BuildMode::Dev, output));
            assert!(source.contains(TOKEN));
            assert!(!source.contains(APP_TOKEN_ENV));
        }
    }

    #[test]
    fn test_remote_url_expression() {
        let ir = build_module(&blog_tables(), &remote(BuildMode::Build, OutputMode::Server));
        assert!(ir.client.setup.is_empty());

        let source = ir.to_string();
        assert!(source.contains(
            "export const db = await createRemoteDatabaseClient({ token: process.env.VIRTDB_APP_TOKEN, \
             url: import.meta.env.VIRTDB_REMOTE_DB_URL ?? \"https://db.example.test\" });"
        ));
        assert!(source.starts_with(
            "import { asTable, createRemoteDatabaseClient } from \"virtdb/runtime\";"
        ));
    }

    #[test]
    fn test_local_module_exports_exactly_declared_tables() {
        let ir = build_module(&blog_tables(), &local());
        assert_eq!(ir.export_names(), vec!["db", "posts", "tags"]);
        assert!(ir.tables.iter().all(|t| !t.raw));

        let source = ir.to_string();
        assert!(source.contains(
            "const dbUrl = normalizeDatabaseUrl(import.meta.env.VIRTDB_DATABASE_FILE, \
             \"file:///site/.virtdb/content.db\");"
        ));
        assert!(source.contains("export const db = createLocalDatabaseClient({ dbUrl });"));
        assert!(source.contains("export * from \"virtdb/runtime/virtual\";"));
        assert!(source.contains("export const posts = asTable(\"posts\", {"));
        assert!(source.contains("export const tags = asTable(\"tags\", {"));
        assert!(!source.contains("tags2"));

        let exported: Vec<&str> = source
            .lines()
            .filter_map(|l| l.strip_prefix("export const "))
            .filter_map(|l| l.split(' ').next())
            .collect();
        assert_eq!(exported, vec!["db", "posts", "tags"]);
    }

    #[test]
    fn test_bindings_follow_declaration_order_and_inline_schema() {
        let ir = build_module(&blog_tables(), &local());
        assert_eq!(ir.tables[0].name, "posts");
        assert_eq!(ir.tables[1].name, "tags");
        assert_eq!(ir.tables[0].schema["columns"][1]["name"], "title");
        assert_eq!(ir.tables[0].schema["columns"][0]["primary_key"], true);
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = SecretRef::new(TOKEN);
        assert!(!format!("{:?}", secret).contains(TOKEN));
        assert!(!format!("{:?}", remote(BuildMode::Dev, OutputMode::Server)).contains(TOKEN));
    }
}
