//! Repository implementations for data persistence.
//!
//! This module provides the Repository pattern implementation for sessions
//! and components using SQLite as the backing store. The store traits are
//! the narrow interfaces the rest of the system consumes; an in-memory
//! session store is provided for tests and ephemeral runs.

use crate::storage::database::Database;
use crate::storage::error::{StorageError, StorageResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::models::component::{
    Component, ComponentStatus, ComponentType, Dependency, DependencyList,
};
use crate::models::requirement::{Requirement, RequirementKind};
use crate::models::session::{
    Command, CommandResult, Interaction, Session, SessionStatus, StateMap,
};

// ============================================================================
// Generic Repository Infrastructure
// ============================================================================

/// Trait for entities that can be stored in a repository.
pub trait Entity: Clone + Send + Sync {
    /// Error type for entity-specific validation errors.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the table name for this entity.
    fn table_name() -> &'static str;

    /// Returns the ID of this entity.
    fn id(&self) -> &str;

    /// Validates the entity.
    fn validate(&self) -> Result<(), Self::Error>;
}

impl Entity for Session {
    type Error = crate::models::session::SessionError;

    fn table_name() -> &'static str {
        "sessions"
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<(), Self::Error> {
        self.validate()
    }
}

impl Entity for Component {
    type Error = crate::models::component::ComponentError;

    fn table_name() -> &'static str {
        "components"
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<(), Self::Error> {
        self.validate()
    }
}

/// Generic helper for validating an entity before operations.
fn validate_entity<T: Entity>(entity: &T) -> StorageResult<()> {
    entity.validate().map_err(|e| StorageError::InvalidData(e.to_string()))
}

/// Generic helper for building NotFound errors.
fn not_found_error<T: Entity>(id: &str) -> StorageError {
    StorageError::not_found(T::table_name(), id)
}

// ============================================================================
// Row Parsing Helpers
// ============================================================================

/// Parses a JSON column into a deserializable type.
fn parse_json_field<T>(row: &Row, idx: usize, column_name: &str) -> rusqlite::Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let json_str: String = row.get(idx)?;
    serde_json::from_str(&json_str).map_err(|_| {
        rusqlite::Error::InvalidColumnType(
            idx,
            column_name.to_string(),
            rusqlite::types::Type::Text,
        )
    })
}

/// Parses an optional JSON column into a deserializable type.
fn parse_optional_json_field<T>(
    row: &Row,
    idx: usize,
    column_name: &str,
) -> rusqlite::Result<Option<T>>
where
    T: serde::de::DeserializeOwned,
{
    let json_str: Option<String> = row.get(idx)?;
    match json_str {
        Some(s) => serde_json::from_str(&s).map(Some).map_err(|_| {
            rusqlite::Error::InvalidColumnType(
                idx,
                column_name.to_string(),
                rusqlite::types::Type::Text,
            )
        }),
        None => Ok(None),
    }
}

/// Parses an RFC3339 timestamp column into a `DateTime<Utc>`.
fn parse_timestamp(row: &Row, idx: usize, column_name: &str) -> rusqlite::Result<DateTime<Utc>> {
    let timestamp_str: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&timestamp_str).map(|dt| dt.with_timezone(&Utc)).map_err(|_| {
        rusqlite::Error::InvalidColumnType(
            idx,
            column_name.to_string(),
            rusqlite::types::Type::Text,
        )
    })
}

/// Parses a plain-text column holding a serde snake_case enum tag.
fn parse_tag_field<T>(row: &Row, idx: usize, column_name: &str) -> rusqlite::Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let tag: String = row.get(idx)?;
    serde_json::from_value(Value::String(tag)).map_err(|_| {
        rusqlite::Error::InvalidColumnType(
            idx,
            column_name.to_string(),
            rusqlite::types::Type::Text,
        )
    })
}

/// Renders a serde snake_case enum as its plain tag string.
fn enum_tag<T: serde::Serialize>(value: &T) -> StorageResult<String> {
    match serde_json::to_value(value)? {
        Value::String(tag) => Ok(tag),
        other => Err(StorageError::InvalidData(format!("expected string tag, got {other}"))),
    }
}

// ============================================================================
// Store Traits
// ============================================================================

/// Store trait for session operations.
pub trait SessionStore {
    /// Creates a new session in storage.
    fn create(&mut self, session: &Session) -> StorageResult<()>;

    /// Retrieves a session by ID, including its interaction history and
    /// child-session links.
    fn get(&self, id: &str) -> StorageResult<Session>;

    /// Retrieves all sessions.
    fn get_all(&self) -> StorageResult<Vec<Session>>;

    /// Appends an interaction to a session's history.
    fn append_interaction(
        &mut self,
        session_id: &str,
        interaction: &Interaction,
    ) -> StorageResult<()>;

    /// Records the result of an in-flight interaction.
    fn record_result(
        &mut self,
        session_id: &str,
        interaction_id: &str,
        result: &CommandResult,
    ) -> StorageResult<()>;

    /// Merges a partial state update into a session's state.
    fn merge_state(&mut self, session_id: &str, update: &StateMap) -> StorageResult<()>;

    /// Updates a session's status.
    fn set_status(&mut self, session_id: &str, status: SessionStatus) -> StorageResult<()>;
}

/// Store trait for component operations.
pub trait ComponentStore {
    /// Creates a new component, including its dependency edges and any
    /// already-evaluated requirements.
    fn create(&mut self, component: &Component) -> StorageResult<()>;

    /// Retrieves a component by ID with loaded dependencies and
    /// requirements.
    fn get(&self, id: &str) -> StorageResult<Component>;

    /// Retrieves all components.
    fn get_all(&self) -> StorageResult<Vec<Component>>;

    /// Replaces a component's derived status.
    fn update_status(&mut self, id: &str, status: ComponentStatus) -> StorageResult<()>;

    /// Clears and regenerates a component's requirements.
    fn replace_requirements(
        &mut self,
        id: &str,
        requirements: &[Requirement],
    ) -> StorageResult<()>;

    /// Adds a dependency edge. Idempotent on the ordered pair.
    fn add_dependency(&mut self, edge: &Dependency) -> StorageResult<()>;

    /// Removes a dependency edge.
    fn remove_dependency(&mut self, edge: &Dependency) -> StorageResult<()>;

    /// Deletes a component, cascading to its dependency edges and
    /// requirements.
    fn remove(&mut self, id: &str) -> StorageResult<()>;
}

// ============================================================================
// SQLite Session Store
// ============================================================================

/// SQLite implementation of `SessionStore`.
pub struct SqliteSessionStore<'a> {
    db: &'a mut Database,
}

impl<'a> SqliteSessionStore<'a> {
    /// Creates a new SQLite session store.
    pub fn new(db: &'a mut Database) -> Self {
        Self { db }
    }

    fn load_interactions(&self, session_id: &str) -> StorageResult<Vec<Interaction>> {
        let mut stmt = self.db.conn().prepare(
            "SELECT id, step_id, command_json, result_json, started_at, completed_at FROM interactions WHERE session_id = ?1 ORDER BY seq",
        )?;
        let interactions = stmt
            .query_map(params![session_id], |row| {
                let command: Command = parse_json_field(row, 2, "command_json")?;
                let result: Option<CommandResult> =
                    parse_optional_json_field(row, 3, "result_json")?;
                let started_at = parse_timestamp(row, 4, "started_at")?;
                let completed_at: Option<String> = row.get(5)?;
                let completed_at = completed_at
                    .map(|s| {
                        DateTime::parse_from_rfc3339(&s).map(|dt| dt.with_timezone(&Utc)).map_err(
                            |_| {
                                rusqlite::Error::InvalidColumnType(
                                    5,
                                    "completed_at".to_string(),
                                    rusqlite::types::Type::Text,
                                )
                            },
                        )
                    })
                    .transpose()?;
                Ok(Interaction {
                    id: row.get(0)?,
                    step_id: row.get(1)?,
                    command,
                    result,
                    started_at,
                    completed_at,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(interactions)
    }

    fn load_children(&self, session_id: &str) -> StorageResult<Vec<String>> {
        let mut stmt = self
            .db
            .conn()
            .prepare("SELECT id FROM sessions WHERE parent_session = ?1 ORDER BY created_at")?;
        let children = stmt
            .query_map(params![session_id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(children)
    }

    fn touch(&mut self, session_id: &str) -> StorageResult<()> {
        self.db.conn_mut().execute(
            "UPDATE sessions SET updated_at = ?2 WHERE id = ?1",
            params![session_id, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

impl SessionStore for SqliteSessionStore<'_> {
    fn create(&mut self, session: &Session) -> StorageResult<()> {
        validate_entity(session)?;
        let state_json = serde_json::to_string(&session.state)?;
        let status = enum_tag(&session.status)?;
        self.db.conn_mut().execute(
            "INSERT INTO sessions (id, workflow, status, state_json, parent_session, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                session.id,
                session.workflow,
                status,
                state_json,
                session.parent_session,
                session.created_at.to_rfc3339(),
                session.updated_at.to_rfc3339()
            ],
        )?;
        for interaction in &session.interactions {
            self.append_interaction(&session.id, interaction)?;
        }
        info!(session_id = %session.id, workflow = %session.workflow, "Created session");
        Ok(())
    }

    fn get(&self, id: &str) -> StorageResult<Session> {
        let mut stmt = self.db.conn().prepare(
            "SELECT id, workflow, status, state_json, parent_session, created_at, updated_at FROM sessions WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id], |row| {
            let status: SessionStatus = parse_tag_field(row, 2, "status")?;
            let state: StateMap = parse_json_field(row, 3, "state_json")?;
            let created_at = parse_timestamp(row, 5, "created_at")?;
            let updated_at = parse_timestamp(row, 6, "updated_at")?;
            Ok(Session {
                id: row.get(0)?,
                workflow: row.get(1)?,
                status,
                interactions: Vec::new(),
                state,
                parent_session: row.get(4)?,
                child_sessions: Vec::new(),
                created_at,
                updated_at,
            })
        })?;

        let mut session = match rows.next() {
            Some(Ok(session)) => session,
            Some(Err(e)) => return Err(e.into()),
            None => return Err(not_found_error::<Session>(id)),
        };
        session.interactions = self.load_interactions(&session.id)?;
        session.child_sessions = self.load_children(&session.id)?;
        Ok(session)
    }

    fn get_all(&self) -> StorageResult<Vec<Session>> {
        let mut stmt =
            self.db.conn().prepare("SELECT id FROM sessions ORDER BY created_at DESC")?;
        let ids: Vec<String> =
            stmt.query_map([], |row| row.get(0))?.collect::<std::result::Result<Vec<_>, _>>()?;
        let mut sessions = Vec::new();
        for id in ids {
            sessions.push(self.get(&id)?);
        }
        Ok(sessions)
    }

    fn append_interaction(
        &mut self,
        session_id: &str,
        interaction: &Interaction,
    ) -> StorageResult<()> {
        let exists =
            self.db.conn().prepare("SELECT id FROM sessions WHERE id = ?1")?.exists(params![
                session_id
            ])?;
        if !exists {
            return Err(not_found_error::<Session>(session_id));
        }

        let seq: i64 = self.db.conn().query_row(
            "SELECT COUNT(*) FROM interactions WHERE session_id = ?1",
            params![session_id],
            |row| row.get(0),
        )?;
        let command_json = serde_json::to_string(&interaction.command)?;
        let result_json =
            interaction.result.as_ref().map(serde_json::to_string).transpose()?;
        self.db.conn_mut().execute(
            "INSERT INTO interactions (id, session_id, step_id, command_json, result_json, seq, started_at, completed_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                interaction.id,
                session_id,
                interaction.step_id,
                command_json,
                result_json,
                seq,
                interaction.started_at.to_rfc3339(),
                interaction.completed_at.map(|t| t.to_rfc3339())
            ],
        )?;
        self.touch(session_id)?;
        debug!(session_id = %session_id, step_id = %interaction.step_id, "Appended interaction");
        Ok(())
    }

    fn record_result(
        &mut self,
        session_id: &str,
        interaction_id: &str,
        result: &CommandResult,
    ) -> StorageResult<()> {
        let result_json = serde_json::to_string(result)?;
        let rows_affected = self.db.conn_mut().execute(
            "UPDATE interactions SET result_json = ?3, completed_at = ?4 WHERE id = ?1 AND session_id = ?2",
            params![interaction_id, session_id, result_json, Utc::now().to_rfc3339()],
        )?;
        if rows_affected == 0 {
            return Err(StorageError::not_found(
                "interaction",
                format!("{interaction_id} (session {session_id})"),
            ));
        }
        self.touch(session_id)?;
        debug!(session_id = %session_id, interaction_id = %interaction_id, "Recorded result");
        Ok(())
    }

    fn merge_state(&mut self, session_id: &str, update: &StateMap) -> StorageResult<()> {
        let state_json: String = self
            .db
            .conn()
            .query_row("SELECT state_json FROM sessions WHERE id = ?1", params![session_id], |row| {
                row.get(0)
            })
            .map_err(|_| not_found_error::<Session>(session_id))?;
        let mut state: StateMap = serde_json::from_str(&state_json)?;
        for (key, value) in update {
            state.insert(key.clone(), value.clone());
        }
        self.db.conn_mut().execute(
            "UPDATE sessions SET state_json = ?2, updated_at = ?3 WHERE id = ?1",
            params![session_id, serde_json::to_string(&state)?, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn set_status(&mut self, session_id: &str, status: SessionStatus) -> StorageResult<()> {
        let rows_affected = self.db.conn_mut().execute(
            "UPDATE sessions SET status = ?2, updated_at = ?3 WHERE id = ?1",
            params![session_id, enum_tag(&status)?, Utc::now().to_rfc3339()],
        )?;
        if rows_affected == 0 {
            return Err(not_found_error::<Session>(session_id));
        }
        debug!(session_id = %session_id, status = ?status, "Updated session status");
        Ok(())
    }
}

// ============================================================================
// In-Memory Session Store
// ============================================================================

/// In-memory implementation of `SessionStore` for tests and ephemeral runs.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: HashMap<String, Session>,
}

impl MemorySessionStore {
    /// Creates an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    fn get_mut(&mut self, id: &str) -> StorageResult<&mut Session> {
        self.sessions.get_mut(id).ok_or_else(|| not_found_error::<Session>(id))
    }
}

impl SessionStore for MemorySessionStore {
    fn create(&mut self, session: &Session) -> StorageResult<()> {
        validate_entity(session)?;
        self.sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    fn get(&self, id: &str) -> StorageResult<Session> {
        self.sessions.get(id).cloned().ok_or_else(|| not_found_error::<Session>(id))
    }

    fn get_all(&self) -> StorageResult<Vec<Session>> {
        Ok(self.sessions.values().cloned().collect())
    }

    fn append_interaction(
        &mut self,
        session_id: &str,
        interaction: &Interaction,
    ) -> StorageResult<()> {
        self.get_mut(session_id)?.append_interaction(interaction.clone());
        Ok(())
    }

    fn record_result(
        &mut self,
        session_id: &str,
        interaction_id: &str,
        result: &CommandResult,
    ) -> StorageResult<()> {
        let session = self.get_mut(session_id)?;
        let interaction = session
            .interactions
            .iter_mut()
            .find(|i| i.id == interaction_id)
            .ok_or_else(|| {
                StorageError::not_found(
                    "interaction",
                    format!("{interaction_id} (session {session_id})"),
                )
            })?;
        interaction.complete(result.clone());
        Ok(())
    }

    fn merge_state(&mut self, session_id: &str, update: &StateMap) -> StorageResult<()> {
        self.get_mut(session_id)?.merge_state(update.clone());
        Ok(())
    }

    fn set_status(&mut self, session_id: &str, status: SessionStatus) -> StorageResult<()> {
        self.get_mut(session_id)?.set_status(status);
        Ok(())
    }
}

// ============================================================================
// SQLite Component Store
// ============================================================================

/// SQLite implementation of `ComponentStore`.
pub struct SqliteComponentStore<'a> {
    db: &'a mut Database,
}

impl<'a> SqliteComponentStore<'a> {
    /// Creates a new SQLite component store.
    pub fn new(db: &'a mut Database) -> Self {
        Self { db }
    }

    fn load_dependencies(&self, component_id: &str) -> StorageResult<Vec<String>> {
        let mut stmt = self
            .db
            .conn()
            .prepare("SELECT target FROM dependencies WHERE source = ?1 ORDER BY target")?;
        let targets = stmt
            .query_map(params![component_id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(targets)
    }

    fn load_requirements(&self, component_id: &str) -> StorageResult<Vec<Requirement>> {
        let mut stmt = self.db.conn().prepare(
            "SELECT kind, name, satisfied, checked_at, details_json, satisfied_by FROM requirements WHERE component_id = ?1 ORDER BY id",
        )?;
        let requirements = stmt
            .query_map(params![component_id], |row| {
                let kind: RequirementKind = parse_tag_field(row, 0, "kind")?;
                let satisfied: i64 = row.get(2)?;
                let checked_at = parse_timestamp(row, 3, "checked_at")?;
                let details: Value = parse_json_field(row, 4, "details_json")?;
                Ok(Requirement {
                    kind,
                    name: row.get(1)?,
                    satisfied: satisfied != 0,
                    checked_at,
                    details,
                    satisfied_by: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(requirements)
    }

    fn insert_requirements(
        &mut self,
        component_id: &str,
        requirements: &[Requirement],
    ) -> StorageResult<()> {
        for requirement in requirements {
            self.db.conn_mut().execute(
                "INSERT INTO requirements (component_id, kind, name, satisfied, checked_at, details_json, satisfied_by) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    component_id,
                    requirement.kind.as_str(),
                    requirement.name,
                    i64::from(requirement.satisfied),
                    requirement.checked_at.to_rfc3339(),
                    serde_json::to_string(&requirement.details)?,
                    requirement.satisfied_by
                ],
            )?;
        }
        Ok(())
    }
}

impl ComponentStore for SqliteComponentStore<'_> {
    fn create(&mut self, component: &Component) -> StorageResult<()> {
        validate_entity(component)?;
        let status_json = serde_json::to_string(&component.status)?;
        self.db.conn_mut().execute(
            "INSERT INTO components (id, name, component_type, module_path, parent, priority, status_json, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                component.id,
                component.name,
                component.component_type.as_str(),
                component.module_path,
                component.parent,
                component.priority,
                status_json,
                component.created_at.to_rfc3339(),
                component.updated_at.to_rfc3339()
            ],
        )?;
        if let Some(ids) = component.dependencies.ids() {
            for target in ids {
                self.add_dependency(&Dependency::new(&component.id, target))?;
            }
        }
        self.insert_requirements(&component.id, &component.requirements)?;
        info!(component_id = %component.id, "Created component");
        Ok(())
    }

    fn get(&self, id: &str) -> StorageResult<Component> {
        let mut stmt = self.db.conn().prepare(
            "SELECT id, name, component_type, module_path, parent, priority, status_json, created_at, updated_at FROM components WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id], |row| {
            let component_type: ComponentType = parse_tag_field(row, 2, "component_type")?;
            let status: ComponentStatus = parse_json_field(row, 6, "status_json")?;
            let created_at = parse_timestamp(row, 7, "created_at")?;
            let updated_at = parse_timestamp(row, 8, "updated_at")?;
            Ok(Component {
                id: row.get(0)?,
                name: row.get(1)?,
                component_type,
                module_path: row.get(3)?,
                parent: row.get(4)?,
                dependencies: DependencyList::NotLoaded,
                status,
                requirements: Vec::new(),
                priority: row.get(5)?,
                created_at,
                updated_at,
            })
        })?;

        let mut component = match rows.next() {
            Some(Ok(component)) => component,
            Some(Err(e)) => return Err(e.into()),
            None => return Err(not_found_error::<Component>(id)),
        };
        component.dependencies = DependencyList::Loaded(self.load_dependencies(&component.id)?);
        component.requirements = self.load_requirements(&component.id)?;
        Ok(component)
    }

    fn get_all(&self) -> StorageResult<Vec<Component>> {
        let mut stmt =
            self.db.conn().prepare("SELECT id FROM components ORDER BY priority, name")?;
        let ids: Vec<String> =
            stmt.query_map([], |row| row.get(0))?.collect::<std::result::Result<Vec<_>, _>>()?;
        let mut components = Vec::new();
        for id in ids {
            components.push(self.get(&id)?);
        }
        Ok(components)
    }

    fn update_status(&mut self, id: &str, status: ComponentStatus) -> StorageResult<()> {
        let rows_affected = self.db.conn_mut().execute(
            "UPDATE components SET status_json = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, serde_json::to_string(&status)?, Utc::now().to_rfc3339()],
        )?;
        if rows_affected == 0 {
            return Err(not_found_error::<Component>(id));
        }
        debug!(component_id = %id, "Updated component status");
        Ok(())
    }

    fn replace_requirements(
        &mut self,
        id: &str,
        requirements: &[Requirement],
    ) -> StorageResult<()> {
        let exists =
            self.db.conn().prepare("SELECT id FROM components WHERE id = ?1")?.exists(params![
                id
            ])?;
        if !exists {
            return Err(not_found_error::<Component>(id));
        }
        self.db
            .conn_mut()
            .execute("DELETE FROM requirements WHERE component_id = ?1", params![id])?;
        self.insert_requirements(id, requirements)?;
        self.db.conn_mut().execute(
            "UPDATE components SET updated_at = ?2 WHERE id = ?1",
            params![id, Utc::now().to_rfc3339()],
        )?;
        debug!(component_id = %id, count = requirements.len(), "Replaced requirements");
        Ok(())
    }

    fn add_dependency(&mut self, edge: &Dependency) -> StorageResult<()> {
        self.db.conn_mut().execute(
            "INSERT OR IGNORE INTO dependencies (source, target) VALUES (?1, ?2)",
            params![edge.source, edge.target],
        )?;
        Ok(())
    }

    fn remove_dependency(&mut self, edge: &Dependency) -> StorageResult<()> {
        let rows_affected = self.db.conn_mut().execute(
            "DELETE FROM dependencies WHERE source = ?1 AND target = ?2",
            params![edge.source, edge.target],
        )?;
        if rows_affected == 0 {
            return Err(StorageError::not_found(
                "dependency",
                format!("{} -> {}", edge.source, edge.target),
            ));
        }
        Ok(())
    }

    fn remove(&mut self, id: &str) -> StorageResult<()> {
        // Incoming edges are not covered by the FK cascade; clear them first.
        self.db
            .conn_mut()
            .execute("DELETE FROM dependencies WHERE target = ?1", params![id])?;
        let rows_affected =
            self.db.conn_mut().execute("DELETE FROM components WHERE id = ?1", params![id])?;
        if rows_affected == 0 {
            return Err(not_found_error::<Component>(id));
        }
        info!(component_id = %id, "Deleted component");
        Ok(())
    }
}
