//! Parameterized command buffer and the INSERT/UPDATE/DELETE renderer that fills it.

use std::collections::BTreeSet;
use tracing::debug;
use crate::core::{OrmError, OrmResult, Value};
use crate::entity::{Entity, EntityId};
use crate::metadata::{column_names, quote, to_csv};
use crate::unit_of_work::TrackedEntity;

/// A named value bound to a command.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub value: Value,
}

/// SQL text plus its ordered parameter list. One command may hold many statements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Command {
    text: String,
    parameters: Vec<Parameter>,
}

impl Command {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.push(Parameter {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters
            .iter()
            .find(|parameter| parameter.name == name)
            .map(|parameter| &parameter.value)
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Appends statements to a single shared [`Command`].
///
/// Parameter names are `$1`, `$2`, ... drawn from a counter owned by the builder, so names
/// stay unique across every statement appended to the same command. A statement that
/// fails to render leaves both the command and the counter untouched.
#[derive(Debug, Default)]
pub struct CommandBuilder {
    command: Command,
    counter: usize,
}

impl CommandBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn command(&self) -> &Command {
        &self.command
    }

    pub fn finish(self) -> Command {
        self.command
    }

    /// Append `INSERT INTO "<Type>" (<cols>) VALUES (<params>);` for one entity.
    pub fn append_insert(&mut self, entity: &dyn Entity) -> OrmResult<()> {
        let type_name = entity.type_name();
        let fields = entity.field_metas();
        if fields.is_empty() {
            return Err(OrmError::EmptyOperation(format!(
                "{} does not expose any persistable fields",
                type_name
            )));
        }

        let columns = column_names(&fields);
        let column_list = to_csv(&columns);

        // One parameter per distinct column, in column order.
        let mut bound = BTreeSet::new();
        let mut pending = Vec::new();
        let mut placeholders = Vec::new();
        for (field, column) in fields.iter().zip(&columns) {
            if !bound.insert(column.as_str()) {
                continue;
            }
            let value = entity.value_of(field.name)?;
            placeholders.push(self.bind(&mut pending, value));
        }
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({});",
            quote(type_name),
            column_list,
            placeholders.join(",")
        );
        self.push(sql, pending);
        Ok(())
    }

    /// Append an UPDATE for the entity's dirty fields.
    ///
    /// An entity without dirty fields has nothing to persist and is skipped.
    pub fn append_update(&mut self, tracked: &TrackedEntity) -> OrmResult<()> {
        let entity = tracked.entity().read()?;
        self.append_update_fields(&*entity, tracked.dirty_fields())
    }

    /// Append `UPDATE "<Type>" SET <assignments> WHERE "Id"=<param>;` covering exactly
    /// `dirty_fields`, in field declaration order.
    pub fn append_update_fields(
        &mut self,
        entity: &dyn Entity,
        dirty_fields: &BTreeSet<String>,
    ) -> OrmResult<()> {
        let changed: Vec<_> = entity
            .field_metas()
            .into_iter()
            .filter(|field| dirty_fields.contains(field.name))
            .collect();
        if changed.is_empty() {
            debug!(
                entity_type = entity.type_name(),
                id = %entity.entity_id(),
                "update requested but entity has no changed fields"
            );
            return Ok(());
        }

        let mut pending = Vec::new();
        let mut assignments = Vec::new();
        for field in &changed {
            let value = entity.value_of(field.name)?;
            let parameter = self.bind(&mut pending, value);
            assignments.push(format!("{}={}", quote(&field.column_name()), parameter));
        }

        let id_parameter = self.bind(&mut pending, Value::Uuid(entity.entity_id().as_uuid()));
        let sql = format!(
            "UPDATE {} SET {} WHERE \"Id\"={};",
            quote(entity.type_name()),
            assignments.join(","),
            id_parameter
        );
        self.push(sql, pending);
        Ok(())
    }

    /// Append `DELETE FROM "<Type>" WHERE "Id" IN (<param>);`.
    pub fn append_delete(&mut self, id: EntityId, type_name: &str) -> OrmResult<()> {
        if type_name.is_empty() {
            return Err(OrmError::Configuration("table name cannot be empty".into()));
        }
        if id.is_nil() {
            return Err(OrmError::Configuration("id cannot be an empty uuid".into()));
        }

        let mut pending = Vec::new();
        let parameter = self.bind(&mut pending, Value::Uuid(id.as_uuid()));
        let sql = format!(
            "DELETE FROM {} WHERE \"Id\" IN ({});",
            quote(type_name),
            parameter
        );
        self.push(sql, pending);
        Ok(())
    }

    fn bind(&self, pending: &mut Vec<Parameter>, value: Value) -> String {
        let name = format!("${}", self.counter + pending.len() + 1);
        pending.push(Parameter {
            name: name.clone(),
            value,
        });
        name
    }

    fn push(&mut self, sql: String, pending: Vec<Parameter>) {
        self.counter += pending.len();
        self.command.text.push_str(&sql);
        self.command.parameters.extend(pending);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Model;

    crate::entity! {
        struct Note {
            title: String,
            pages: i64,
        }
    }

    #[test]
    fn test_counter_spans_statements() {
        let mut note = Note::new();
        note.title = "draft".into();
        let mut builder = CommandBuilder::new();
        builder.append_insert(&note).unwrap();
        builder.append_delete(EntityId::new(), Note::TABLE).unwrap();

        let command = builder.finish();
        let names: Vec<_> = command.parameters().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["$1", "$2", "$3", "$4"]);
        assert!(command.text().ends_with(r#"DELETE FROM "Note" WHERE "Id" IN ($4);"#));
    }

    #[test]
    fn test_failed_statement_leaves_builder_untouched() {
        let mut builder = CommandBuilder::new();
        assert!(builder.append_delete(EntityId::nil(), "Note").is_err());
        assert!(builder.append_delete(EntityId::new(), "").is_err());
        assert!(builder.command().is_empty());
        assert!(builder.command().parameters().is_empty());

        builder.append_delete(EntityId::new(), "Note").unwrap();
        assert_eq!(builder.command().parameters()[0].name, "$1");
    }

    #[test]
    fn test_update_without_dirty_fields_is_noop() {
        let note = Note::new();
        let mut builder = CommandBuilder::new();
        builder.append_update_fields(&note, &BTreeSet::new()).unwrap();
        assert!(builder.finish().is_empty());
    }
}
