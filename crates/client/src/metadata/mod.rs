//! Field and layout metadata reported by the server.

mod field;
mod layout_meta;

pub use {
    field::{Field, FieldKind, FieldType},
    layout_meta::{FieldControl, FieldStyle, LayoutMeta, LayoutMetaBuilder, ValueListItem},
};
