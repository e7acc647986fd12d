//! Table and column metadata for Pods.

use super::{PodDefinition, PodType, Storage};
use serde::{Deserialize, Serialize};

/// Where a Pod's records and meta live in host tables.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableInfo {
    /// Pod name this info was derived for.
    pub pod: String,
    /// Host object kind.
    pub object_type: String,
    /// Host object name (post type, taxonomy, ...).
    pub object_name: String,
    /// Primary table.
    pub table: String,
    /// Meta table, if the kind has one.
    pub meta_table: Option<String>,
    /// Dedicated table for `table` storage.
    pub pod_table: Option<String>,
    /// Primary key column.
    pub field_id: String,
    /// Display column.
    pub field_index: String,
    /// Slug column.
    pub field_slug: Option<String>,
    /// Subtype discriminator column.
    pub field_type: Option<String>,
    /// Hierarchy column.
    pub field_parent: Option<String>,
    /// Meta foreign key column.
    pub meta_field_id: Option<String>,
    /// Meta key column.
    pub meta_field_index: Option<String>,
    /// Meta value column.
    pub meta_field_value: Option<String>,
    /// Conditions selecting this Pod's rows from the primary table.
    pub where_clauses: Vec<String>,
}

fn owned(s: &str) -> Option<String> {
    Some(s.to_string())
}

/// Derive table info from a Pod's kind, host object and name.
///
/// `object` falls back to `name` when empty.
pub fn derive_table_info(
    prefix: &str,
    pod_type: PodType,
    object: &str,
    name: &str,
    definition: &PodDefinition,
) -> TableInfo {
    let object_name = if object.is_empty() { name } else { object };
    let table = |t: &str| format!("{prefix}{t}");

    let mut info = TableInfo {
        pod: name.to_string(),
        object_type: pod_type.as_str().to_string(),
        object_name: object_name.to_string(),
        ..Default::default()
    };

    match pod_type {
        PodType::PostType | PodType::Media => {
            let post_type = if pod_type == PodType::Media {
                "attachment"
            } else {
                object_name
            };
            info.table = table("posts");
            info.meta_table = Some(table("postmeta"));
            info.field_id = "ID".into();
            info.field_index = "post_title".into();
            info.field_slug = owned("post_name");
            info.field_type = owned("post_type");
            info.field_parent = owned("post_parent");
            info.meta_field_id = owned("post_id");
            info.meta_field_index = owned("meta_key");
            info.meta_field_value = owned("meta_value");
            info.where_clauses = vec![
                format!("`t`.`post_type` = '{post_type}'"),
                "`t`.`post_status` IN ('publish', 'future', 'draft', 'pending', 'private')"
                    .to_string(),
            ];
        }
        PodType::Taxonomy => {
            info.table = table("terms");
            info.meta_table = Some(table("termmeta"));
            info.field_id = "term_id".into();
            info.field_index = "name".into();
            info.field_slug = owned("slug");
            info.field_type = owned("taxonomy");
            info.field_parent = owned("parent");
            info.meta_field_id = owned("term_id");
            info.meta_field_index = owned("meta_key");
            info.meta_field_value = owned("meta_value");
            info.where_clauses = vec![format!("`tt`.`taxonomy` = '{object_name}'")];
        }
        PodType::User => {
            info.table = table("users");
            info.meta_table = Some(table("usermeta"));
            info.field_id = "ID".into();
            info.field_index = "display_name".into();
            info.field_slug = owned("user_nicename");
            info.meta_field_id = owned("user_id");
            info.meta_field_index = owned("meta_key");
            info.meta_field_value = owned("meta_value");
        }
        PodType::Comment => {
            info.table = table("comments");
            info.meta_table = Some(table("commentmeta"));
            info.field_id = "comment_ID".into();
            info.field_index = "comment_date".into();
            info.field_type = owned("comment_type");
            info.field_parent = owned("comment_parent");
            info.meta_field_id = owned("comment_id");
            info.meta_field_index = owned("meta_key");
            info.meta_field_value = owned("meta_value");
            if object_name != "comment" {
                info.where_clauses = vec![format!("`t`.`comment_type` = '{object_name}'")];
            }
        }
        PodType::Pod => {
            info.table = table(&format!("pods_{name}"));
            info.field_id = "id".into();
            info.field_index = "name".into();
            info.field_slug = owned("permalink");
        }
    }

    if definition.storage == Storage::Table || pod_type == PodType::Pod {
        info.pod_table = Some(table(&format!("pods_{name}")));
    }

    info
}
