//! Maps CRUD operations of an entity definition onto endpoint builders.
//!
//! Simple entities (root or nested under one parent) are addressed by `id`.
//! Relationship entities are addressed by chaining `one(parent, key)` for
//! every declared parent in order.

use serde_json::Value;

use crate::error::{RestError, Result};
use crate::rest::collection::{LIMIT_KEY, OFFSET_KEY, count_of, order_of, strip_reserved};
use crate::rest::entity::{ID_FIELD, Record, present};
use crate::rest::entitydefinition::{EntityDefinition, EntityKind, ParentLink};
use crate::rest::querybuilder::{QueryBuilder, Requester};
use crate::rest::transport::PendingResponse;

/// Terminal operation of a planned call.
#[derive(Debug, Clone, PartialEq)]
pub enum Terminal {
    Get,
    Post(Record),
    Put(Record),
    Delete,
}

/// A fully built endpoint plus the terminal to invoke on it.
pub struct Call {
    pub builder: QueryBuilder,
    pub terminal: Terminal,
}

impl Call {
    fn new(builder: QueryBuilder, terminal: Terminal) -> Self {
        Self { builder, terminal }
    }

    pub fn url(&self) -> String {
        self.builder.url()
    }

    /// Hand the call to the transport.
    pub fn send(self) -> Result<PendingResponse> {
        match self.terminal {
            Terminal::Get => self.builder.get(),
            Terminal::Post(data) => self.builder.post(data),
            Terminal::Put(data) => self.builder.put(data),
            Terminal::Delete => self.builder.delete(),
        }
    }
}

pub fn save(requester: &Requester, definition: &EntityDefinition, instance: Record) -> Result<Call> {
    let entity = definition.entity();
    match definition.kind() {
        EntityKind::Relationship(parents) => {
            let builder = chain_parents(requester.request(), parents, &instance, "save")?;
            // PUT on the fully qualified path creates or replaces.
            Ok(Call::new(builder, Terminal::Put(instance)))
        }
        kind => {
            if let Some(id) = present(&instance, ID_FIELD).cloned() {
                let builder = requester.request().one(entity, id);
                return Ok(Call::new(builder, Terminal::Put(instance)));
            }

            let mut builder = requester.request();
            if let EntityKind::Nested(parent) = kind {
                let parent_id = required(&instance, &parent.key, "save")?;
                builder = builder.one(&parent.entity, parent_id);
            }
            Ok(Call::new(builder.all(entity), Terminal::Post(instance)))
        }
    }
}

pub fn fetch(requester: &Requester, definition: &EntityDefinition, args: &Record) -> Result<Call> {
    match definition.kind() {
        EntityKind::Relationship(parents) => {
            let builder = chain_parents(requester.request(), parents, args, "fetch")?;
            Ok(Call::new(builder, Terminal::Get))
        }
        _ => {
            let id = present(args, ID_FIELD)
                .cloned()
                .ok_or(RestError::MissingId { operation: "fetch" })?;
            let builder = requester.request().one(definition.entity(), id);
            Ok(Call::new(builder, Terminal::Get))
        }
    }
}

pub fn fetch_all(requester: &Requester, definition: &EntityDefinition, filters: &Record) -> Result<Call> {
    match definition.kind() {
        EntityKind::Relationship(parents) => relationship_fetch_all(requester, parents, filters),
        _ => {
            let builder = collection(requester, definition, filters, "fetchAll")?;
            Ok(Call::new(builder, Terminal::Get))
        }
    }
}

/// Like [`fetch_all`] with `limit` and `offset`. Relationship entities have
/// no paging and fall back to [`fetch_all`].
pub fn fetch_page(requester: &Requester, definition: &EntityDefinition, filters: &Record) -> Result<Call> {
    if let EntityKind::Relationship(parents) = definition.kind() {
        return relationship_fetch_all(requester, parents, filters);
    }

    let builder = collection(requester, definition, filters, "fetchPage")?
        .limit(count_of(filters, LIMIT_KEY).unwrap_or(0))?
        .offset(count_of(filters, OFFSET_KEY).unwrap_or(0))?;
    Ok(Call::new(builder, Terminal::Get))
}

pub fn delete(requester: &Requester, definition: &EntityDefinition, instance: &Record) -> Result<Call> {
    match definition.kind() {
        EntityKind::Relationship(parents) => {
            let builder = chain_parents(requester.request(), parents, instance, "delete")?;
            Ok(Call::new(builder, Terminal::Delete))
        }
        _ => {
            let id = present(instance, ID_FIELD)
                .cloned()
                .ok_or(RestError::MissingId { operation: "delete" })?;
            let builder = requester.request().one(definition.entity(), id);
            Ok(Call::new(builder, Terminal::Delete))
        }
    }
}

/// `[one(parent)].all(entity)` with the remaining filters and `$order`.
fn collection(
    requester: &Requester,
    definition: &EntityDefinition,
    filters: &Record,
    operation: &'static str,
) -> Result<QueryBuilder> {
    let mut remaining = strip_reserved(filters);
    let mut builder = requester.request();

    if let EntityKind::Nested(parent) = definition.kind() {
        let parent_id = required(filters, &parent.key, operation)?;
        builder = builder.one(&parent.entity, parent_id);
        // the parent is part of the path, not a query filter
        remaining.shift_remove(&parent.key);
    }

    builder
        .all(definition.entity())
        .filter_map(&remaining)?
        .order(order_of(filters))
}

/// Chain `one()` for every parent whose key is present, then `all()` on the
/// single parent whose key was omitted.
fn relationship_fetch_all(requester: &Requester, parents: &[ParentLink], filters: &Record) -> Result<Call> {
    let mut remaining = strip_reserved(filters);
    let mut builder = requester.request();
    let mut missing: Vec<&ParentLink> = vec![];

    for parent in parents {
        match present(filters, &parent.key) {
            Some(parent_id) => {
                builder = builder.one(&parent.entity, parent_id.clone());
                remaining.shift_remove(&parent.key);
            }
            None => missing.push(parent),
        }
    }

    let missing_parent = match missing.as_slice() {
        [] => return Err(RestError::AmbiguousParentKeys),
        [parent] => *parent,
        _ => {
            return Err(RestError::TooFewParentKeys {
                keys: missing.iter().map(|parent| parent.key.clone()).collect(),
            });
        }
    };

    let builder = builder
        .all(&missing_parent.entity)
        .filter_map(&remaining)?
        .order(order_of(filters))?;
    Ok(Call::new(builder, Terminal::Get))
}

fn chain_parents(
    mut builder: QueryBuilder,
    parents: &[ParentLink],
    source: &Record,
    operation: &'static str,
) -> Result<QueryBuilder> {
    for parent in parents {
        let parent_id = required(source, &parent.key, operation)?;
        builder = builder.one(&parent.entity, parent_id);
    }
    Ok(builder)
}

fn required(source: &Record, key: &str, operation: &'static str) -> Result<Value> {
    present(source, key)
        .cloned()
        .ok_or_else(|| RestError::MissingParentKey {
            operation,
            key: key.to_string(),
        })
}
