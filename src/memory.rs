//! In-process store, used by the test suite and by callers that don't need Postgres.
//!
//! It enforces the same foreign keys as the SQL schema: inserts and updates must point at
//! existing parents, and a parent with children cannot be deleted.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::error::{Error, Result};
use super::models::*;
use super::repository::{Child, ChildRepository, Record, Repository};

#[derive(Debug)]
pub struct Table<R> {
    rows: BTreeMap<i32, R>,
    next_id: i32,
}

impl<R> Default for Table<R> {
    fn default() -> Self {
        Table {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl<R> Table<R> {
    fn contains(&self, id: i32) -> bool {
        self.rows.contains_key(&id)
    }
}

#[derive(Debug, Default)]
pub struct Tables {
    drink_types: Table<DrinkType>,
    machines: Table<Machine>,
    drinks: Table<Drink>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        // A panic mid-operation never leaves a table half written, so the data is still usable.
        self.tables
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Row construction and foreign-key rules for a record kept in a `MemoryStore`.
pub trait MemoryRecord: Record + Clone {
    fn table(tables: &Tables) -> &Table<Self>;

    fn table_mut(tables: &mut Tables) -> &mut Table<Self>;

    fn build(id: i32, new: &Self::New, now: DateTime<Utc>) -> Self;

    fn apply_changes(&mut self, changes: &Self::Changes, now: DateTime<Utc>);

    /// Checks the row's foreign keys against the parent tables.
    fn check_references(&self, tables: &Tables) -> Result<()>;

    /// Checks that no child row still points at `id`.
    fn check_dependents(id: i32, tables: &Tables) -> Result<()>;
}

fn missing_parent(table: &str, column: &str, id: i32) -> Error {
    let message = format!(
        "insert or update on table \"{}\" violates foreign key constraint: {} {} does not exist",
        table, column, id
    );
    warn!("{}", message);
    Error::ConstraintViolation(message)
}

fn still_referenced(table: &str, id: i32, child_table: &str) -> Error {
    let message = format!(
        "delete on table \"{}\" violates foreign key constraint: row {} is still referenced from \"{}\"",
        table, id, child_table
    );
    warn!("{}", message);
    Error::ConstraintViolation(message)
}

impl MemoryRecord for DrinkType {
    fn table(tables: &Tables) -> &Table<Self> {
        &tables.drink_types
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.drink_types
    }

    fn build(id: i32, new: &NewDrinkType, now: DateTime<Utc>) -> Self {
        DrinkType {
            id,
            name: new.name.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_changes(&mut self, changes: &DrinkTypeChanges, now: DateTime<Utc>) {
        self.apply(changes);
        self.updated_at = now;
    }

    fn check_references(&self, _tables: &Tables) -> Result<()> {
        Ok(())
    }

    fn check_dependents(id: i32, tables: &Tables) -> Result<()> {
        if tables
            .machines
            .rows
            .values()
            .any(|m| m.drink_type_id == Some(id))
        {
            return Err(still_referenced(
                "hot_drinks_drink_types",
                id,
                "hot_drinks_machines",
            ));
        }
        Ok(())
    }
}

impl MemoryRecord for Machine {
    fn table(tables: &Tables) -> &Table<Self> {
        &tables.machines
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.machines
    }

    fn build(id: i32, new: &NewMachine, now: DateTime<Utc>) -> Self {
        Machine {
            id,
            name: new.name.clone(),
            drink_type_id: new.drink_type_id,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_changes(&mut self, changes: &MachineChanges, now: DateTime<Utc>) {
        self.apply(changes);
        self.updated_at = now;
    }

    fn check_references(&self, tables: &Tables) -> Result<()> {
        match self.drink_type_id {
            Some(id) if !tables.drink_types.contains(id) => Err(missing_parent(
                "hot_drinks_machines",
                "drink_type_id",
                id,
            )),
            _ => Ok(()),
        }
    }

    fn check_dependents(id: i32, tables: &Tables) -> Result<()> {
        if tables.drinks.rows.values().any(|d| d.machine_id == id) {
            return Err(still_referenced(
                "hot_drinks_machines",
                id,
                "hot_drinks_drinks",
            ));
        }
        Ok(())
    }
}

impl MemoryRecord for Drink {
    fn table(tables: &Tables) -> &Table<Self> {
        &tables.drinks
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.drinks
    }

    fn build(id: i32, new: &NewDrink, now: DateTime<Utc>) -> Self {
        Drink {
            id,
            machine_id: new.machine_id,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_changes(&mut self, changes: &DrinkChanges, now: DateTime<Utc>) {
        self.apply(changes);
        self.updated_at = now;
    }

    fn check_references(&self, tables: &Tables) -> Result<()> {
        if !tables.machines.contains(self.machine_id) {
            return Err(missing_parent(
                "hot_drinks_drinks",
                "machine_id",
                self.machine_id,
            ));
        }
        Ok(())
    }

    fn check_dependents(_id: i32, _tables: &Tables) -> Result<()> {
        Ok(())
    }
}

impl<R: MemoryRecord> Repository<R> for MemoryStore {
    fn create(&self, new: &R::New) -> Result<R> {
        let mut tables = self.lock();
        let id = R::table(&tables).next_id;
        let row = R::build(id, new, Utc::now());
        row.check_references(&tables)?;

        let table = R::table_mut(&mut tables);
        table.next_id += 1;
        table.rows.insert(id, row.clone());
        debug!("Inserted {} {}", R::NAME, row.id());
        Ok(row)
    }

    fn find(&self, id: i32) -> Result<R> {
        R::table(&self.lock())
            .rows
            .get(&id)
            .cloned()
            .ok_or(Error::NotFound(R::NAME, id))
    }

    fn all(&self) -> Result<Vec<R>> {
        Ok(R::table(&self.lock()).rows.values().cloned().collect())
    }

    fn count(&self) -> Result<i64> {
        Ok(R::table(&self.lock()).rows.len() as i64)
    }

    fn update(&self, id: i32, changes: &R::Changes) -> Result<R> {
        let mut tables = self.lock();
        let mut row = R::table(&tables)
            .rows
            .get(&id)
            .cloned()
            .ok_or(Error::NotFound(R::NAME, id))?;
        row.apply_changes(changes, Utc::now());
        row.check_references(&tables)?;

        R::table_mut(&mut tables).rows.insert(id, row.clone());
        debug!("Updated {} {}", R::NAME, id);
        Ok(row)
    }

    fn delete(&self, id: i32) -> Result<()> {
        let mut tables = self.lock();
        if !R::table(&tables).contains(id) {
            return Err(Error::NotFound(R::NAME, id));
        }
        R::check_dependents(id, &tables)?;

        R::table_mut(&mut tables).rows.remove(&id);
        info!("Deleted {} {}", R::NAME, id);
        Ok(())
    }
}

impl<R: MemoryRecord + Child> ChildRepository<R> for MemoryStore {
    fn belonging_to(&self, parent_id: i32) -> Result<Vec<R>> {
        Ok(R::table(&self.lock())
            .rows
            .values()
            .filter(|row| row.parent_id() == Some(parent_id))
            .cloned()
            .collect())
    }
}
