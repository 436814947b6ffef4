use chrono::{DateTime, Utc};
use diesel;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2;

use super::config::Config;
use super::error::{Error, Result};
use super::models::*;
use super::repository::{ChildRepository, Record, Repository};
use super::schema::hot_drinks_drink_types as drink_types;
use super::schema::hot_drinks_drinks as drinks;
use super::schema::hot_drinks_machines as machines;

pub type Pool = r2d2::Pool<r2d2::ConnectionManager<PgConnection>>;
pub type PooledConn = r2d2::PooledConnection<r2d2::ConnectionManager<PgConnection>>;

/// Table definitions, in dependency order.
const SETUP_SQL: [&str; 3] = [
    include_str!("../migrations/2015-08-09-112300_create_hot_drinks_drink_types/up.sql"),
    include_str!("../migrations/2015-08-09-112400_create_hot_drinks_machines/up.sql"),
    include_str!("../migrations/2015-08-09-114923_create_hot_drinks_drinks/up.sql"),
];

/// A drink joined with the names of its machine and drink type.
#[derive(Debug, Serialize, Queryable)]
#[serde(rename = "drink")]
pub struct ExpandedDrink {
    pub id: i32,
    pub machine: String,
    pub name: Option<String>,
    pub brewed_at: DateTime<Utc>,
}

/// Postgres-backed store. Every mutation runs in its own transaction, which becomes a
/// savepoint when the connection is already inside one.
#[derive(Clone)]
pub struct PgStore {
    pool: Pool,
}

impl PgStore {
    pub fn new(pool: Pool) -> PgStore {
        PgStore { pool }
    }

    /// Create a connection pool to the configured database.
    pub fn connect(config: &Config) -> Result<PgStore> {
        let manager = r2d2::ConnectionManager::<PgConnection>::new(config.database_url.as_str());
        let pool = r2d2::Pool::builder()
            .max_size(config.pool_size)
            .build(manager)?;
        debug!("Built pool of up to {} connections", config.pool_size);

        Ok(PgStore::new(pool))
    }

    fn conn(&self) -> Result<PooledConn> {
        Ok(self.pool.get()?)
    }

    /// Create the hot drinks tables if they don't exist yet.
    pub fn setup(&self) -> Result<()> {
        let conn = self.conn()?;
        for sql in SETUP_SQL.iter() {
            conn.batch_execute(sql)?;
        }
        info!("Hot drinks tables are in place");
        Ok(())
    }

    /// A machine's drinks with their display names, in one query.
    ///
    /// `name` is `None` for drinks of a machine with no drink type.
    pub fn expanded_drinks(&self, machine_id: i32) -> Result<Vec<ExpandedDrink>> {
        let conn = self.conn()?;

        Ok(drinks::table
            .inner_join(machines::table.left_join(drink_types::table))
            .select((
                drinks::id,
                machines::name,
                drink_types::name.nullable(),
                drinks::created_at,
            ))
            .filter(drinks::machine_id.eq(machine_id))
            .order(drinks::id.asc())
            .load::<ExpandedDrink>(&conn)?)
    }
}

/*************************************/
/** Drink types                     **/
/*************************************/

impl Repository<DrinkType> for PgStore {
    fn create(&self, new: &NewDrinkType) -> Result<DrinkType> {
        let conn = self.conn()?;

        conn.transaction::<_, Error, _>(|| {
            Ok(diesel::insert_into(drink_types::table)
                .values(new)
                .get_result::<DrinkType>(&conn)?)
        })
    }

    fn find(&self, id: i32) -> Result<DrinkType> {
        let conn = self.conn()?;

        drink_types::table
            .find(id)
            .first::<DrinkType>(&conn)
            .optional()?
            .ok_or(Error::NotFound(DrinkType::NAME, id))
    }

    fn all(&self) -> Result<Vec<DrinkType>> {
        let conn = self.conn()?;

        Ok(drink_types::table
            .order(drink_types::id.asc())
            .load::<DrinkType>(&conn)?)
    }

    fn count(&self) -> Result<i64> {
        let conn = self.conn()?;

        Ok(drink_types::table.count().get_result::<i64>(&conn)?)
    }

    fn update(&self, id: i32, changes: &DrinkTypeChanges) -> Result<DrinkType> {
        let conn = self.conn()?;

        conn.transaction::<_, Error, _>(|| {
            let mut row: DrinkType = drink_types::table
                .find(id)
                .first::<DrinkType>(&conn)
                .optional()?
                .ok_or(Error::NotFound(DrinkType::NAME, id))?;
            row.apply(changes);

            Ok(diesel::update(drink_types::table.find(id))
                .set((
                    drink_types::name.eq(&row.name),
                    drink_types::updated_at.eq(Utc::now()),
                ))
                .get_result::<DrinkType>(&conn)?)
        })
    }

    fn delete(&self, id: i32) -> Result<()> {
        let conn = self.conn()?;

        let deleted = conn.transaction::<_, Error, _>(|| {
            Ok(diesel::delete(drink_types::table.find(id)).execute(&conn)?)
        })?;
        if deleted == 0 {
            return Err(Error::NotFound(DrinkType::NAME, id));
        }
        info!("Deleted drink type {}", id);
        Ok(())
    }
}

/*************************************/
/** Machines                        **/
/*************************************/

impl Repository<Machine> for PgStore {
    fn create(&self, new: &NewMachine) -> Result<Machine> {
        let conn = self.conn()?;

        conn.transaction::<_, Error, _>(|| {
            Ok(diesel::insert_into(machines::table)
                .values(new)
                .get_result::<Machine>(&conn)?)
        })
    }

    fn find(&self, id: i32) -> Result<Machine> {
        let conn = self.conn()?;

        machines::table
            .find(id)
            .first::<Machine>(&conn)
            .optional()?
            .ok_or(Error::NotFound(Machine::NAME, id))
    }

    fn all(&self) -> Result<Vec<Machine>> {
        let conn = self.conn()?;

        Ok(machines::table.order(machines::id.asc()).load::<Machine>(&conn)?)
    }

    fn count(&self) -> Result<i64> {
        let conn = self.conn()?;

        Ok(machines::table.count().get_result::<i64>(&conn)?)
    }

    fn update(&self, id: i32, changes: &MachineChanges) -> Result<Machine> {
        let conn = self.conn()?;

        conn.transaction::<_, Error, _>(|| {
            let mut row: Machine = machines::table
                .find(id)
                .first::<Machine>(&conn)
                .optional()?
                .ok_or(Error::NotFound(Machine::NAME, id))?;
            row.apply(changes);

            Ok(diesel::update(machines::table.find(id))
                .set((
                    machines::name.eq(&row.name),
                    machines::drink_type_id.eq(row.drink_type_id),
                    machines::updated_at.eq(Utc::now()),
                ))
                .get_result::<Machine>(&conn)?)
        })
    }

    fn delete(&self, id: i32) -> Result<()> {
        let conn = self.conn()?;

        let deleted = conn.transaction::<_, Error, _>(|| {
            Ok(diesel::delete(machines::table.find(id)).execute(&conn)?)
        })?;
        if deleted == 0 {
            return Err(Error::NotFound(Machine::NAME, id));
        }
        info!("Deleted machine {}", id);
        Ok(())
    }
}

impl ChildRepository<Machine> for PgStore {
    fn belonging_to(&self, parent_id: i32) -> Result<Vec<Machine>> {
        let conn = self.conn()?;

        Ok(machines::table
            .filter(machines::drink_type_id.eq(parent_id))
            .order(machines::id.asc())
            .load::<Machine>(&conn)?)
    }
}

/*************************************/
/** Drinks                          **/
/*************************************/

impl Repository<Drink> for PgStore {
    fn create(&self, new: &NewDrink) -> Result<Drink> {
        let conn = self.conn()?;

        conn.transaction::<_, Error, _>(|| {
            Ok(diesel::insert_into(drinks::table)
                .values(new)
                .get_result::<Drink>(&conn)?)
        })
    }

    fn find(&self, id: i32) -> Result<Drink> {
        let conn = self.conn()?;

        drinks::table
            .find(id)
            .first::<Drink>(&conn)
            .optional()?
            .ok_or(Error::NotFound(Drink::NAME, id))
    }

    fn all(&self) -> Result<Vec<Drink>> {
        let conn = self.conn()?;

        Ok(drinks::table.order(drinks::id.asc()).load::<Drink>(&conn)?)
    }

    fn count(&self) -> Result<i64> {
        let conn = self.conn()?;

        Ok(drinks::table.count().get_result::<i64>(&conn)?)
    }

    fn update(&self, id: i32, changes: &DrinkChanges) -> Result<Drink> {
        let conn = self.conn()?;

        conn.transaction::<_, Error, _>(|| {
            let mut row: Drink = drinks::table
                .find(id)
                .first::<Drink>(&conn)
                .optional()?
                .ok_or(Error::NotFound(Drink::NAME, id))?;
            row.apply(changes);

            Ok(diesel::update(drinks::table.find(id))
                .set((
                    drinks::machine_id.eq(row.machine_id),
                    drinks::updated_at.eq(Utc::now()),
                ))
                .get_result::<Drink>(&conn)?)
        })
    }

    fn delete(&self, id: i32) -> Result<()> {
        let conn = self.conn()?;

        let deleted = conn.transaction::<_, Error, _>(|| {
            Ok(diesel::delete(drinks::table.find(id)).execute(&conn)?)
        })?;
        if deleted == 0 {
            return Err(Error::NotFound(Drink::NAME, id));
        }
        info!("Deleted drink {}", id);
        Ok(())
    }
}

impl ChildRepository<Drink> for PgStore {
    fn belonging_to(&self, parent_id: i32) -> Result<Vec<Drink>> {
        let conn = self.conn()?;

        Ok(drinks::table
            .filter(drinks::machine_id.eq(parent_id))
            .order(drinks::id.asc())
            .load::<Drink>(&conn)?)
    }
}

/// These need a scratch Postgres database in `DATABASE_URL`; run with `cargo test -- --ignored`.
/// Everything happens inside a test transaction that is never committed.
#[cfg(test)]
mod test {
    use super::*;
    use crate::repository::Store;
    use diesel::Connection;
    use std::env;

    #[derive(Debug)]
    struct TestTransaction;

    impl r2d2::CustomizeConnection<PgConnection, r2d2::Error> for TestTransaction {
        fn on_acquire(&self, conn: &mut PgConnection) -> ::std::result::Result<(), r2d2::Error> {
            conn.begin_test_transaction()
                .map_err(r2d2::Error::QueryError)
        }
    }

    fn assert_store<S: Store + Clone + Send + Sync>() {}

    #[test]
    fn pg_store_implements_every_repository() {
        assert_store::<PgStore>();
    }

    fn store() -> PgStore {
        let url = env::var("DATABASE_URL").expect("DATABASE_URL must be set!");
        let manager = r2d2::ConnectionManager::<PgConnection>::new(url);
        let pool = r2d2::Pool::builder()
            .max_size(1)
            .connection_customizer(Box::new(TestTransaction))
            .build(manager)
            .expect("pool");

        let store = PgStore::new(pool);
        store.setup().expect("setup");
        store
    }

    fn machine_brewing(store: &PgStore, drink_name: &str) -> Machine {
        let drink_type = DrinkType::create(store, &NewDrinkType::named(drink_name)).expect("drink type");
        Machine::create(store, &NewMachine::brewing("urn", &drink_type)).expect("machine")
    }

    #[test]
    #[ignore]
    fn brews_a_cup_of_tea() {
        let store = store();
        let machine = machine_brewing(&store, "tea");
        assert!(machine.drinks(&store).unwrap().is_empty());

        let before = Drink::count(&store).unwrap();
        machine.brew(&store).expect("brew");

        let drinks = machine.drinks(&store).unwrap();
        assert_eq!(Drink::count(&store).unwrap(), before + 1);
        assert_eq!(drinks[0].name(&store).unwrap(), "tea");
    }

    #[test]
    #[ignore]
    fn drink_for_missing_machine_is_a_constraint_violation() {
        let store = store();
        let missing = Machine::all(&store)
            .unwrap()
            .iter()
            .map(|m| m.id)
            .max()
            .unwrap_or(0)
            + 1;

        let err = Drink::create(&store, &NewDrink { machine_id: missing }).expect_err("create");
        assert!(err.is_constraint_violation(), "{:?}", err);

        // The savepoint rolled back; the connection is still usable.
        assert!(Drink::find(&store, -1).expect_err("find").is_not_found());
    }

    #[test]
    #[ignore]
    fn machine_with_drinks_cannot_be_deleted() {
        let store = store();
        let machine = machine_brewing(&store, "coffee");
        let drink = machine.brew(&store).expect("brew");

        let err = Machine::delete(&store, machine.id).expect_err("delete");
        assert!(err.is_constraint_violation(), "{:?}", err);

        Drink::delete(&store, drink.id).expect("delete drink");
        Machine::delete(&store, machine.id).expect("delete machine");
        assert!(Machine::find(&store, machine.id).unwrap_err().is_not_found());
    }

    #[test]
    #[ignore]
    fn update_changes_the_drink_type() {
        let store = store();
        let machine = machine_brewing(&store, "coffee");
        let tea = DrinkType::create(&store, &NewDrinkType::named("tea")).unwrap();

        let updated = Machine::update(
            &store,
            machine.id,
            &MachineChanges {
                drink_type_id: Some(Some(tea.id)),
                ..Default::default()
            },
        )
        .expect("update");

        assert_eq!(updated.drink_type_id, Some(tea.id));
        assert_eq!(updated.name, machine.name);
        assert_eq!(updated.drink_type(&store).unwrap(), Some(tea));
    }

    #[test]
    #[ignore]
    fn expanded_drinks_carry_their_names() {
        let store = store();
        let machine = machine_brewing(&store, "cocoa");
        let plain = Machine::create(
            &store,
            &NewMachine {
                name: "plain".into(),
                drink_type_id: None,
            },
        )
        .unwrap();
        machine.brew(&store).unwrap();
        machine.brew(&store).unwrap();
        plain.brew(&store).unwrap();

        let expanded = store.expanded_drinks(machine.id).expect("expanded");
        assert_eq!(expanded.len(), 2);
        assert!(expanded.iter().all(|d| d.name.as_ref().map(|n| n.as_str()) == Some("cocoa")));
        assert!(expanded.iter().all(|d| d.machine == "urn"));

        let expanded = store.expanded_drinks(plain.id).expect("expanded");
        assert_eq!(expanded[0].name, None);
    }
}
