//! Content collection definitions and their type declarations

use std::collections::HashMap;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codegen::types::ts_base_type;
use crate::error::{UserConfigError, UserErrorKind};
use crate::schema::ColumnKind;

/// Module id the content declarations are attached to
pub const CONTENT_MODULE_ID: &str = "virtdb:content";
/// File name of the generated declarations
pub const CONTENT_TYPES_FILE: &str = "content.d.ts";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    /// Markdown-like entries with a body
    Content,
    /// Structured entries only
    Data,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub kind: ColumnKind,
    #[serde(default)]
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionDef {
    pub name: String,
    #[serde(default = "default_kind")]
    pub kind: CollectionKind,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

fn default_kind() -> CollectionKind {
    CollectionKind::Content
}

/// Evaluated content configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentConfig {
    #[serde(default)]
    pub collections: Vec<CollectionDef>,
}

fn invalid(message: String, hint: &str) -> UserConfigError {
    UserConfigError {
        kind: UserErrorKind::InvalidConfig,
        message,
        hint: Some(hint.to_string()),
        location: None,
    }
}

impl ContentConfig {
    /// Interpret the value produced by an evaluator
    ///
    /// A `null` value (no configuration file) is an empty configuration.
    pub fn from_value(value: Value) -> Result<Self, UserConfigError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        let config: ContentConfig = serde_json::from_value(value).map_err(|e| {
            invalid(
                format!("invalid content configuration: {}", e),
                "collections must be a list of { name, kind, fields } entries",
            )
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), UserConfigError> {
        let mut names = HashSet::new();
        let mut type_names: HashMap<String, &str> = HashMap::new();
        for collection in &self.collections {
            if collection.name.is_empty() {
                return Err(invalid(
                    "collection name cannot be empty".to_string(),
                    "give every collection a name matching its folder in src/content",
                ));
            }
            if !names.insert(collection.name.as_str()) {
                return Err(invalid(
                    format!("collection '{}' is defined more than once", collection.name),
                    "collection names must be unique",
                ));
            }
            if pascal_case(&collection.name).is_empty() {
                return Err(invalid(
                    format!("collection name '{}' has no letters or digits", collection.name),
                    "collection names must contain at least one letter or digit",
                ));
            }
            let type_name = entry_type_name(collection);
            if let Some(other) = type_names.insert(type_name.clone(), &collection.name) {
                return Err(invalid(
                    format!(
                        "collections '{}' and '{}' both generate the type '{}'",
                        other, collection.name, type_name
                    ),
                    "collection names must map to distinct type names; rename one of them",
                ));
            }
            let mut fields = HashSet::new();
            for field in &collection.fields {
                if !fields.insert(field.name.as_str()) {
                    return Err(invalid(
                        format!(
                            "field '{}' is defined more than once in collection '{}'",
                            field.name, collection.name
                        ),
                        "field names must be unique within a collection",
                    ));
                }
            }
        }
        Ok(())
    }
}

/// `blog-posts` -> `BlogPosts`
fn pascal_case(name: &str) -> String {
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

fn entry_type_name(collection: &CollectionDef) -> String {
    let base = pascal_case(&collection.name);
    if base.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{}Entry", base)
    } else {
        format!("{}Entry", base)
    }
}

/// Render the `declare module` block for all collections
pub fn render_content_declarations(config: &ContentConfig) -> String {
    let mut lines = vec![
        "// Generated by virtdb. Do not edit.".to_string(),
        format!(
            "declare module {} {{",
            Value::String(CONTENT_MODULE_ID.to_string())
        ),
    ];

    for collection in &config.collections {
        let data = collection
            .fields
            .iter()
            .map(|f| {
                format!(
                    "{}{}: {}",
                    Value::String(f.name.clone()),
                    if f.optional { "?" } else { "" },
                    ts_base_type(f.kind)
                )
            })
            .collect::<Vec<_>>()
            .join("; ");
        let body = match collection.kind {
            CollectionKind::Content => " body: string;",
            CollectionKind::Data => "",
        };
        lines.push(format!(
            "\texport type {} = {{ id: string; collection: {};{} data: {{ {} }} }};",
            entry_type_name(collection),
            Value::String(collection.name.clone()),
            body,
            data
        ));
    }

    lines.push("\texport type CollectionEntries = {".to_string());
    lines.extend(config.collections.iter().map(|collection| {
        format!(
            "\t\t{}: {};",
            Value::String(collection.name.clone()),
            entry_type_name(collection)
        )
    }));
    lines.push("\t};".to_string());
    lines.push("}\n".to_string());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pascal_case() {
        assert_eq!(pascal_case("blog"), "Blog");
        assert_eq!(pascal_case("blog-posts"), "BlogPosts");
        assert_eq!(pascal_case("team_members"), "TeamMembers");
    }

    #[test]
    fn test_null_value_is_empty_config() {
        assert_eq!(ContentConfig::from_value(Value::Null).unwrap(), ContentConfig::default());
    }

    #[test]
    fn test_duplicate_collection_is_user_error() {
        let err = ContentConfig::from_value(json!({
            "collections": [{ "name": "blog" }, { "name": "blog" }]
        }))
        .unwrap_err();
        assert_eq!(err.kind, UserErrorKind::InvalidConfig);
        assert_eq!(err.hint.as_deref(), Some("collection names must be unique"));
    }

    #[test]
    fn test_colliding_type_names_are_user_errors() {
        let err = ContentConfig::from_value(json!({
            "collections": [{ "name": "blog-posts" }, { "name": "blog_posts" }]
        }))
        .unwrap_err();
        assert_eq!(err.kind, UserErrorKind::InvalidConfig);
        assert!(err.message.contains("BlogPostsEntry"));
        assert_eq!(
            err.hint.as_deref(),
            Some("collection names must map to distinct type names; rename one of them")
        );

        let err = ContentConfig::from_value(json!({ "collections": [{ "name": "--" }] }))
            .unwrap_err();
        assert_eq!(err.kind, UserErrorKind::InvalidConfig);
        assert!(err.message.contains("no letters or digits"));

        assert!(ContentConfig::from_value(json!({
            "collections": [{ "name": "blog-posts" }, { "name": "blog" }]
        }))
        .is_ok());
    }

    #[test]
    fn test_render_content_declarations() {
        let config = ContentConfig::from_value(json!({
            "collections": [
                {
                    "name": "blog",
                    "fields": [
                        { "name": "title", "kind": "text" },
                        { "name": "draft", "kind": "boolean", "optional": true }
                    ]
                },
                { "name": "authors", "kind": "data", "fields": [{ "name": "name", "kind": "text" }] }
            ]
        }))
        .unwrap();

        assert_eq!(
            render_content_declarations(&config),
            "// Generated by virtdb. Do not edit.\n\
             declare module \"virtdb:content\" {\n\
             \texport type BlogEntry = { id: string; collection: \"blog\"; body: string; \
             data: { \"title\": string; \"draft\"?: boolean } };\n\
             \texport type AuthorsEntry = { id: string; collection: \"authors\"; \
             data: { \"name\": string } };\n\
             \texport type CollectionEntries = {\n\
             \t\t\"blog\": BlogEntry;\n\
             \t\t\"authors\": AuthorsEntry;\n\
             \t};\n\
             }\n"
        );
    }
}
