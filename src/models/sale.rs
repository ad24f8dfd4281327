//! Sale entity. The cart is stored as a JSON column; monetary fields arrive
//! as decimal strings and are persisted verbatim. `date` is filled by the
//! database on insert and is visible but never fillable.

use crate::db::mapper::Schema;
use crate::validate::{FieldRules, Rule};

pub static SCHEMA: Schema = Schema {
    table: "sales",
    visible: &["id", "date", "cart", "value", "tax", "total", "user_id"],
    fillable: &["cart", "value", "tax", "total", "user_id"],
};

pub static RULES: &[FieldRules] = &[
    ("cart", &[Rule::Required]),
    ("value", &[Rule::Required, Rule::Str]),
    ("tax", &[Rule::Required, Rule::Str]),
    ("total", &[Rule::Required, Rule::Str]),
    ("user_id", &[Rule::Required, Rule::Int]),
];
