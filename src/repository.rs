//! Persistence interface the hot drinks records depend on.
//!
//! A backend implements [`Repository`] once per record type and [`ChildRepository`] for
//! every record that belongs to a parent. The [`Record`] and [`Child`] traits then expose
//! the same operations as associated functions, so callers write `Machine::find(&store, id)`
//! without naming the backend's trait impl.

use super::error::Result;
use super::models::{Drink, DrinkType, Machine};

/// A persisted row with an integer primary key.
pub trait Record: Sized {
    /// Entity name used in errors and log lines.
    const NAME: &'static str;

    /// Attributes supplied on insert.
    type New;

    /// Attribute changes applied on update; `None` fields are left alone.
    type Changes;

    fn id(&self) -> i32;

    fn create<S: Repository<Self> + ?Sized>(store: &S, new: &Self::New) -> Result<Self> {
        store.create(new)
    }

    fn find<S: Repository<Self> + ?Sized>(store: &S, id: i32) -> Result<Self> {
        store.find(id)
    }

    fn all<S: Repository<Self> + ?Sized>(store: &S) -> Result<Vec<Self>> {
        store.all()
    }

    fn count<S: Repository<Self> + ?Sized>(store: &S) -> Result<i64> {
        store.count()
    }

    fn update<S: Repository<Self> + ?Sized>(
        store: &S,
        id: i32,
        changes: &Self::Changes,
    ) -> Result<Self> {
        store.update(id, changes)
    }

    fn delete<S: Repository<Self> + ?Sized>(store: &S, id: i32) -> Result<()> {
        store.delete(id)
    }
}

/// A record owned through a foreign key by a `Parent` record.
pub trait Child: Record {
    type Parent: Record;

    /// The owning row's id, or `None` when the foreign key is unset.
    fn parent_id(&self) -> Option<i32>;

    fn belonging_to<S: ChildRepository<Self> + ?Sized>(
        store: &S,
        parent_id: i32,
    ) -> Result<Vec<Self>> {
        store.belonging_to(parent_id)
    }
}

/// Create, read, update and delete by primary key.
///
/// `find`, `update` and `delete` fail with `Error::NotFound` for an unknown id. Inserts and
/// updates whose foreign keys point at missing rows, and deletes of rows that still have
/// children, fail with `Error::ConstraintViolation`.
pub trait Repository<R: Record> {
    fn create(&self, new: &R::New) -> Result<R>;

    fn find(&self, id: i32) -> Result<R>;

    /// Every row, ordered by id.
    fn all(&self) -> Result<Vec<R>>;

    fn count(&self) -> Result<i64>;

    fn update(&self, id: i32, changes: &R::Changes) -> Result<R>;

    fn delete(&self, id: i32) -> Result<()>;
}

/// Foreign-key association lookup.
pub trait ChildRepository<R: Child>: Repository<R> {
    /// Rows whose foreign key equals `parent_id`, ordered by id.
    fn belonging_to(&self, parent_id: i32) -> Result<Vec<R>>;
}

/// A backend holding all three hot drinks tables.
pub trait Store: Repository<DrinkType> + ChildRepository<Machine> + ChildRepository<Drink> {}

impl<S> Store for S where
    S: Repository<DrinkType> + ChildRepository<Machine> + ChildRepository<Drink> + ?Sized
{
}
