//! Change tracking: registers entities, diffs them against snapshots and commits every
//! pending change as one parameterized batch.

pub mod config;
pub mod tracked;

use std::any::TypeId;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use crate::command::{Command, CommandBuilder};
use crate::connection::{Connection, OpenConnection};
use crate::core::{OrmError, OrmResult};
use crate::entity::{Entity, EntityKey, ID_FIELD, Model, Shared, changed_fields, shared};
use crate::repository::{Repository, SqlRepository};

pub use config::UnitOfWorkConfig;
pub use tracked::{EntityState, TrackedEntity};

/// Tracks entities and synchronizes their changes in a single batch on [`commit`].
///
/// `tracked` and `snapshots` are parallel: position `i` of each describes the same entity.
/// A unit of work is meant for one caller at a time; it is not shared across tasks.
///
/// [`commit`]: UnitOfWork::commit
pub struct UnitOfWork<R: Repository = SqlRepository> {
    connection: Arc<dyn Connection>,
    repository: R,
    config: UnitOfWorkConfig,
    tracked: Vec<TrackedEntity>,
    snapshots: Vec<Box<dyn Entity>>,
}

impl UnitOfWork<SqlRepository> {
    /// Unit of work reading through a [`SqlRepository`] on the same connection.
    pub fn from_connection(connection: Arc<dyn Connection>) -> Self {
        let repository = SqlRepository::new(Arc::clone(&connection));
        Self::new(connection, repository)
    }
}

impl<R: Repository> UnitOfWork<R> {
    pub fn new(connection: Arc<dyn Connection>, repository: R) -> Self {
        Self::with_config(connection, repository, UnitOfWorkConfig::default())
    }

    pub fn with_config(connection: Arc<dyn Connection>, repository: R, config: UnitOfWorkConfig) -> Self {
        Self {
            connection,
            repository,
            config,
            tracked: Vec::new(),
            snapshots: Vec::new(),
        }
    }

    pub fn config(&self) -> &UnitOfWorkConfig {
        &self.config
    }

    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.connection
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Start tracking `entity` as Clean. Tracking an already tracked identity is a no-op.
    pub fn register<M: Model>(&mut self, entity: &Shared<M>) -> OrmResult<()> {
        self.track(entity).map(|_| ())
    }

    pub fn register_all<'a, M, I>(&mut self, entities: I) -> OrmResult<()>
    where
        M: Model,
        I: IntoIterator<Item = &'a Shared<M>>,
    {
        for entity in entities {
            self.register(entity)?;
        }
        Ok(())
    }

    /// Schedule an INSERT, ordered after every explicit operation issued so far.
    pub fn add<M: Model>(&mut self, entity: &Shared<M>) -> OrmResult<()> {
        self.schedule(entity, EntityState::Add)
    }

    pub fn add_all<'a, M, I>(&mut self, entities: I) -> OrmResult<()>
    where
        M: Model,
        I: IntoIterator<Item = &'a Shared<M>>,
    {
        for entity in entities {
            self.add(entity)?;
        }
        Ok(())
    }

    /// Schedule a DELETE, ordered after every explicit operation issued so far.
    pub fn delete<M: Model>(&mut self, entity: &Shared<M>) -> OrmResult<()> {
        self.schedule(entity, EntityState::Delete)
    }

    /// Read every row of `M` and return the tracked instance for each.
    ///
    /// Rows whose identity is already tracked are copied into the tracked instance,
    /// which is then Clean again: the read wins over unsaved local edits to the fields it
    /// covers. Untracked rows are registered. `Id` is always read.
    ///
    /// The snapshot of a refreshed entity is retaken in full, so after a partial read,
    /// local edits to fields outside `columns` stay on the object but are no longer dirty
    /// and will not be committed.
    pub async fn get_entities<M: Model>(
        &mut self,
        columns: Option<&BTreeSet<String>>,
    ) -> OrmResult<Vec<Shared<M>>> {
        let columns = columns.filter(|columns| !columns.is_empty()).map(|columns| {
            let mut columns = columns.clone();
            columns.insert(ID_FIELD.to_string());
            columns
        });

        let fresh = self.repository.read::<M>(columns.as_ref()).await?;
        let mut entities = Vec::with_capacity(fresh.len());
        for entity in fresh {
            let key = EntityKey {
                id: entity.id(),
                type_id: TypeId::of::<M>(),
            };
            match self.position(&key) {
                Some(position) => {
                    entities.push(self.refresh(position, &entity, columns.as_ref())?);
                }
                None => {
                    let entity = shared(entity);
                    self.track(&entity)?;
                    entities.push(entity);
                }
            }
        }
        Ok(entities)
    }

    /// Persist every pending change and return the affected row count.
    ///
    /// Nothing pending means no statement and no connection. On failure all tracking
    /// state is left as it was, so a retry diffs from the same starting point.
    pub async fn commit(&mut self) -> OrmResult<u64> {
        self.detect_changes()?;
        let command = self.build_command()?;
        if command.is_empty() {
            debug!("nothing to commit");
            return Ok(0);
        }

        if self.config.echo_commands {
            info!(sql = command.text(), parameters = command.parameters().len(), "committing batch");
        } else {
            debug!(sql = command.text(), parameters = command.parameters().len(), "committing batch");
        }

        let affected = {
            let connection = OpenConnection::open(self.connection.as_ref())?;
            connection.execute_non_query(&command).await?
        };

        self.clear()?;
        debug!(affected, "commit applied");
        Ok(affected)
    }

    /// State of the tracked entity with `entity`'s identity, if tracked.
    pub fn state_of<M: Model>(&self, entity: &Shared<M>) -> OrmResult<Option<EntityState>> {
        let key = Self::key_of(entity)?;
        Ok(self.position(&key).map(|position| self.tracked[position].state()))
    }

    pub fn is_tracked<M: Model>(&self, entity: &Shared<M>) -> OrmResult<bool> {
        let key = Self::key_of(entity)?;
        Ok(self.position(&key).is_some())
    }

    pub fn tracked(&self) -> &[TrackedEntity] {
        &self.tracked
    }

    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }

    fn key_of<M: Model>(entity: &Shared<M>) -> OrmResult<EntityKey> {
        Ok(EntityKey {
            id: entity.read()?.id(),
            type_id: TypeId::of::<M>(),
        })
    }

    fn position(&self, key: &EntityKey) -> Option<usize> {
        self.tracked.iter().position(|record| record.key() == *key)
    }

    fn track<M: Model>(&mut self, entity: &Shared<M>) -> OrmResult<usize> {
        let key = Self::key_of(entity)?;
        if key.id.is_nil() {
            return Err(OrmError::Configuration(format!(
                "{} entity has an empty id",
                M::TABLE
            )));
        }
        if let Some(position) = self.position(&key) {
            return Ok(position);
        }

        let record = TrackedEntity::new(entity)?;
        let snapshot = entity.read()?.shallow_clone();
        self.tracked.push(record);
        self.snapshots.push(snapshot);
        Ok(self.tracked.len() - 1)
    }

    fn schedule<M: Model>(&mut self, entity: &Shared<M>, state: EntityState) -> OrmResult<()> {
        let position = self.track(entity)?;
        let index = self.next_index();
        self.tracked[position].mark(state, index);
        Ok(())
    }

    fn next_index(&self) -> u64 {
        self.tracked
            .iter()
            .map(TrackedEntity::index)
            .max()
            .map_or(1, |max| max + 1)
    }

    fn refresh<M: Model>(
        &mut self,
        position: usize,
        fresh: &M,
        columns: Option<&BTreeSet<String>>,
    ) -> OrmResult<Shared<M>> {
        let record = &self.tracked[position];
        let target = record.downcast::<M>().ok_or_else(|| {
            OrmError::InvariantViolation(format!(
                "tracked {} {} is not a {}",
                record.type_name(),
                record.id(),
                M::TABLE
            ))
        })?;

        {
            let mut current = target.write()?;
            let pending = changed_fields(&*current, self.snapshots[position].as_ref())?;
            if record.state() != EntityState::Clean || !pending.is_empty() {
                warn!(
                    entity_type = M::TABLE,
                    id = %record.id(),
                    state = %record.state(),
                    ?pending,
                    "read discards unsaved changes"
                );
            }

            for field in M::fields() {
                if field.meta.is_identifier() {
                    continue;
                }
                let read = columns.is_none_or(|columns| columns.contains(field.meta.column_name().as_ref()));
                if !read {
                    continue;
                }
                let value = (field.get)(fresh);
                if (field.get)(&*current) != value {
                    (field.set)(&mut *current, value).map_err(|err| {
                        OrmError::SchemaMismatch(format!("{}.{}: {}", M::TABLE, field.meta.name, err))
                    })?;
                }
            }
            self.snapshots[position] = current.shallow_clone();
        }

        self.tracked[position].reset();
        Ok(target)
    }

    fn detect_changes(&mut self) -> OrmResult<()> {
        if self.tracked.len() != self.snapshots.len() {
            return Err(OrmError::InvariantViolation(format!(
                "{} tracked entities but {} snapshots",
                self.tracked.len(),
                self.snapshots.len()
            )));
        }

        for (record, snapshot) in self.tracked.iter_mut().zip(&self.snapshots) {
            if record.state().is_explicit() {
                continue;
            }
            let changed = {
                let current = record.entity().read()?;
                changed_fields(&*current, snapshot.as_ref())?
            };
            record.mark_dirty(changed);
        }
        Ok(())
    }

    fn build_command(&self) -> OrmResult<Command> {
        let mut pending: Vec<&TrackedEntity> = self
            .tracked
            .iter()
            .filter(|record| record.state() != EntityState::Clean)
            .collect();
        pending.sort_by_key(|record| record.index());

        let mut builder = CommandBuilder::new();
        for record in pending {
            match record.state() {
                EntityState::Add => {
                    let entity = record.entity().read()?;
                    builder.append_insert(&*entity)?;
                }
                EntityState::Update => builder.append_update(record)?,
                EntityState::Delete => builder.append_delete(record.id(), record.type_name())?,
                EntityState::Clean => {
                    return Err(OrmError::InvariantViolation(format!(
                        "clean entity {} {} reached commit dispatch",
                        record.type_name(),
                        record.id()
                    )));
                }
            }
        }
        Ok(builder.finish())
    }

    fn clear(&mut self) -> OrmResult<()> {
        if self.config.remove_deleted_on_commit {
            let tracked = std::mem::take(&mut self.tracked);
            let snapshots = std::mem::take(&mut self.snapshots);
            (self.tracked, self.snapshots) = tracked
                .into_iter()
                .zip(snapshots)
                .filter(|(record, _)| record.state() != EntityState::Delete)
                .unzip();
        }

        for (record, snapshot) in self.tracked.iter_mut().zip(self.snapshots.iter_mut()) {
            *snapshot = record.entity().read()?.shallow_clone();
            record.reset();
        }
        Ok(())
    }
}
