//! Column-name introspection shared by the command builder, repository and unit of work.

use std::collections::HashSet;
use crate::core::{OrmError, OrmResult};
use crate::entity::{Field, FieldMeta, ID_FIELD, Model, REFERENCE_SUFFIX, missing_field};

/// Quote an identifier for SQL.
pub fn quote(name: &str) -> String {
    format!("\"{}\"", name)
}

/// Deduplicate, quote and comma-join names, keeping first-seen order.
///
/// An empty input yields an empty string, which callers treat as "no persistable fields".
pub fn to_csv<I, S>(names: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    names
        .into_iter()
        .filter(|name| seen.insert(name.as_ref().to_string()))
        .map(|name| quote(name.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn column_names(fields: &[FieldMeta]) -> Vec<String> {
    fields
        .iter()
        .map(|field| field.column_name().into_owned())
        .collect()
}

/// Every column a model is stored under, in declaration order.
pub fn model_columns<M: Model>() -> Vec<String> {
    M::fields()
        .iter()
        .map(|field| field.meta.column_name().into_owned())
        .collect()
}

/// Map a read column back to the field it fills.
///
/// `Id` is the identifier; any other column ending in `Id` names a reference field
/// without its suffix; every other column names a scalar field directly.
pub fn resolve_column<M: Model>(column: &str) -> OrmResult<&'static Field<M>> {
    if column != ID_FIELD
        && let Some(field_name) = column.strip_suffix(REFERENCE_SUFFIX)
    {
        let field = M::field(field_name).ok_or_else(|| missing_field(M::TABLE, field_name))?;
        if !field.meta.is_reference() {
            return Err(OrmError::SchemaMismatch(format!(
                "Column '{}' of {} maps to '{}', which is not a reference field",
                column,
                M::TABLE,
                field_name
            )));
        }
        return Ok(field);
    }

    let field = M::field(column).ok_or_else(|| missing_field(M::TABLE, column))?;
    if field.meta.is_reference() {
        return Err(OrmError::SchemaMismatch(format!(
            "Reference field '{}' of {} must be read through column '{}{}'",
            column,
            M::TABLE,
            column,
            REFERENCE_SUFFIX
        )));
    }
    Ok(field)
}
