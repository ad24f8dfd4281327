//! Product entity. `value` is an integer amount in minor currency units;
//! `type_id` points at a product type row and is checked on store.

use crate::db::mapper::Schema;
use crate::validate::{FieldRules, Rule};

pub static SCHEMA: Schema = Schema {
    table: "products",
    visible: &["id", "name", "description", "value", "type_id"],
    fillable: &["name", "description", "value", "type_id"],
};

pub static RULES: &[FieldRules] = &[
    ("name", &[Rule::Required, Rule::Str]),
    ("description", &[Rule::Str]),
    ("value", &[Rule::Required, Rule::Int]),
    ("type_id", &[Rule::Required, Rule::Int]),
];
