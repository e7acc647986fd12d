//! Pod definitions, resolution and the Pod handle.

mod definition;
mod input;
mod object;
mod table;

pub mod resolver;

pub use definition::{PodDefinition, PodType, Storage};
pub use input::{ParentRef, PodInput, PodOptions};
pub use object::Pod;
pub use resolver::{resolve, Candidate};
pub use table::{derive_table_info, TableInfo};
