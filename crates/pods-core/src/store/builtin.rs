//! Built-in host object kinds and their column sets.

use crate::catalog::{Field, FieldMap, FieldType, PickFormat, PickTarget};
use crate::pod::{PodDefinition, PodType};
use crate::value::Options;
use serde_json::Value;

/// Registered host object families that can back a Pod.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinKind {
    /// Host post types.
    PostType,
    /// Host taxonomies.
    Taxonomy,
}

/// Metadata about a registered host post type or taxonomy.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltinType {
    /// Registered name.
    pub name: String,
    /// Plural label.
    pub label: String,
    /// Singular label.
    pub label_singular: String,
    /// Every other host label (`add_new_item`, `menu_name`, ...).
    pub labels: Options,
}

impl BuiltinType {
    /// Create a type with plural and singular labels.
    pub fn new(
        name: impl Into<String>,
        label: impl Into<String>,
        label_singular: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let label = label.into();
        let label_singular = label_singular.into();

        let mut labels = Options::new();
        labels.insert("menu_name".into(), Value::from(label.clone()));
        labels.insert("all_items".into(), Value::from(format!("All {label}")));
        labels.insert(
            "add_new_item".into(),
            Value::from(format!("Add New {label_singular}")),
        );
        labels.insert(
            "edit_item".into(),
            Value::from(format!("Edit {label_singular}")),
        );

        Self {
            name,
            label,
            label_singular,
            labels,
        }
    }

    /// Host types present on a fresh install.
    pub(crate) fn defaults(kind: BuiltinKind) -> Vec<BuiltinType> {
        match kind {
            BuiltinKind::PostType => vec![
                BuiltinType::new("post", "Posts", "Post"),
                BuiltinType::new("page", "Pages", "Page"),
                BuiltinType::new("attachment", "Media", "Media"),
            ],
            BuiltinKind::Taxonomy => vec![
                BuiltinType::new("category", "Categories", "Category"),
                BuiltinType::new("post_tag", "Tags", "Tag"),
            ],
        }
    }
}

/// Relationship target of a built-in column. `SELF_OBJECT` points at the
/// Pod's own host object.
const SELF_OBJECT: &str = "@self";

struct Column {
    name: &'static str,
    label: &'static str,
    field_type: &'static str,
    pick: Option<(&'static str, &'static str)>,
}

const fn col(name: &'static str, label: &'static str, field_type: &'static str) -> Column {
    Column {
        name,
        label,
        field_type,
        pick: None,
    }
}

const fn rel(
    name: &'static str,
    label: &'static str,
    pick_object: &'static str,
    pick_val: &'static str,
) -> Column {
    Column {
        name,
        label,
        field_type: "pick",
        pick: Some((pick_object, pick_val)),
    }
}

const NO_COLUMNS: &[Column] = &[];

const POST_COLUMNS: &[Column] = &[
    col("ID", "ID", "number"),
    col("post_title", "Title", "text"),
    col("post_content", "Content", "wysiwyg"),
    col("post_excerpt", "Excerpt", "paragraph"),
    rel("post_author", "Author", "user", ""),
    col("post_date", "Publish Date", "datetime"),
    col("post_date_gmt", "Publish Date (GMT)", "datetime"),
    col("post_modified", "Last Modified Date", "datetime"),
    col("post_modified_gmt", "Last Modified Date (GMT)", "datetime"),
    col("post_status", "Status", "text"),
    col("comment_status", "Comment Status", "text"),
    col("ping_status", "Ping Status", "text"),
    col("post_password", "Password", "text"),
    col("post_name", "Permalink", "slug"),
    rel("post_parent", "Parent", "post_type", SELF_OBJECT),
    col("menu_order", "Menu Order", "number"),
    col("guid", "GUID", "text"),
    col("comment_count", "Comment Count", "number"),
];

const TERM_COLUMNS: &[Column] = &[
    col("term_id", "ID", "number"),
    col("name", "Title", "text"),
    col("slug", "Permalink", "slug"),
    col("description", "Description", "wysiwyg"),
    rel("parent", "Parent", "taxonomy", SELF_OBJECT),
    col("term_taxonomy_id", "Term Taxonomy ID", "number"),
    col("taxonomy", "Taxonomy", "text"),
    col("count", "Count", "number"),
];

const USER_COLUMNS: &[Column] = &[
    col("ID", "ID", "number"),
    col("user_login", "Username", "text"),
    col("user_nicename", "Permalink", "slug"),
    col("display_name", "Display Name", "text"),
    col("user_pass", "Password", "password"),
    col("user_email", "E-mail", "email"),
    col("user_url", "URL", "website"),
    col("user_registered", "Registration Date", "datetime"),
];

const COMMENT_COLUMNS: &[Column] = &[
    col("comment_ID", "ID", "number"),
    col("comment_content", "Content", "wysiwyg"),
    col("comment_approved", "Approved", "number"),
    rel("comment_post_ID", "Post", "post_type", ""),
    rel("user_id", "Author", "user", ""),
    col("comment_author", "Author Name", "text"),
    col("comment_author_email", "Author E-mail", "email"),
    col("comment_author_url", "Author URL", "website"),
    col("comment_author_IP", "Author IP", "text"),
    col("comment_date", "Date", "datetime"),
    col("comment_date_gmt", "Date (GMT)", "datetime"),
    rel("comment_parent", "Parent", "comment", SELF_OBJECT),
    col("comment_type", "Type", "text"),
];

/// Synthesize the built-in column fields for a host object kind.
///
/// Custom content types have no host columns and yield an empty map.
pub fn builtin_object_fields(pod_type: PodType, definition: &PodDefinition) -> FieldMap {
    let columns = match pod_type {
        PodType::PostType | PodType::Media => POST_COLUMNS,
        PodType::Taxonomy => TERM_COLUMNS,
        PodType::User => USER_COLUMNS,
        PodType::Comment => COMMENT_COLUMNS,
        PodType::Pod => NO_COLUMNS,
    };

    let self_object = if definition.object.is_empty() {
        definition.name.as_str()
    } else {
        definition.object.as_str()
    };

    columns
        .iter()
        .map(|column| {
            let mut field = match column.pick {
                Some((pick_object, pick_val)) => {
                    let pick_val = if pick_val == SELF_OBJECT {
                        self_object
                    } else {
                        pick_val
                    };
                    Field::pick(
                        column.name,
                        definition.name.clone(),
                        PickTarget::new(pick_object, pick_val, PickFormat::Single),
                    )
                }
                None => Field::new(
                    column.name,
                    definition.name.clone(),
                    FieldType::from(column.field_type),
                ),
            };
            field.label = column.label.to_string();
            field.pod_id = definition.id;
            (field.name.clone(), field)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(name: &str, pod_type: PodType) -> PodDefinition {
        let mut definition = PodDefinition::new(0);
        definition.name = name.to_string();
        definition.object = name.to_string();
        definition.pod_type = pod_type;
        definition
    }

    #[test]
    fn test_post_columns() {
        let fields = builtin_object_fields(PodType::PostType, &definition("page", PodType::PostType));

        assert!(fields.contains_key("post_title"));
        assert_eq!(fields["post_title"].pod, "page");

        let parent = &fields["post_parent"];
        assert!(parent.is_relationship());
        assert_eq!(parent.pick.as_ref().unwrap().target_pod(), "page");

        let author = &fields["post_author"];
        assert_eq!(author.pick.as_ref().unwrap().target_pod(), "user");
    }

    #[test]
    fn test_other_kinds() {
        let terms = builtin_object_fields(PodType::Taxonomy, &definition("genre", PodType::Taxonomy));
        assert!(terms.contains_key("slug"));

        let users = builtin_object_fields(PodType::User, &definition("user", PodType::User));
        assert_eq!(users["user_email"].field_type, FieldType::Other("email".into()));

        let custom = builtin_object_fields(PodType::Pod, &definition("event", PodType::Pod));
        assert!(custom.is_empty());
    }

    #[test]
    fn test_default_types() {
        let post_types = BuiltinType::defaults(BuiltinKind::PostType);
        assert!(post_types.iter().any(|t| t.name == "page"));

        let category = &BuiltinType::defaults(BuiltinKind::Taxonomy)[0];
        assert_eq!(category.label_singular, "Category");
        assert_eq!(category.labels["add_new_item"], "Add New Category");
    }
}
