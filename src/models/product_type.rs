//! Product type entity (tax categories). Names are unique across the table.

use crate::db::mapper::Schema;
use crate::validate::{FieldRules, Rule};

pub static SCHEMA: Schema = Schema {
    table: "types",
    visible: &["id", "name", "tax"],
    fillable: &["name", "tax"],
};

pub static RULES: &[FieldRules] = &[
    ("name", &[Rule::Required, Rule::Str]),
    ("tax", &[Rule::Required, Rule::Int]),
];
