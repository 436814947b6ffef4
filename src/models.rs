#![allow(proc_macro_derive_resolution_fallback)] // See: https://github.com/diesel-rs/diesel/issues/1785

use super::error::{Error, Result};
use super::repository::{Child, ChildRepository, Record, Repository};
use super::schema::*;
use chrono::{DateTime, Utc};

/*************************************/
/** Drink type                      **/
/*************************************/

/// A category of beverage, such as "coffee" or "tea".
#[derive(Debug, Clone, PartialEq, Serialize, Queryable)]
#[serde(rename = "drink_type")]
pub struct DrinkType {
    pub id: i32,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[table_name = "hot_drinks_drink_types"]
pub struct NewDrinkType {
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct DrinkTypeChanges {
    pub name: Option<String>,
}

impl NewDrinkType {
    pub fn named(name: &str) -> NewDrinkType {
        NewDrinkType {
            name: name.to_string(),
        }
    }
}

impl DrinkType {
    /// Machines configured with this drink type.
    pub fn machines<S>(&self, store: &S) -> Result<Vec<Machine>>
    where
        S: ChildRepository<Machine> + ?Sized,
    {
        Machine::belonging_to(store, self.id)
    }

    /// Drinks brewed by any machine configured with this drink type, ordered by id.
    pub fn drinks<S>(&self, store: &S) -> Result<Vec<Drink>>
    where
        S: ChildRepository<Machine> + ChildRepository<Drink> + ?Sized,
    {
        let mut drinks = Vec::new();
        for machine in self.machines(store)? {
            drinks.extend(machine.drinks(store)?);
        }
        drinks.sort_by_key(|d| d.id);
        Ok(drinks)
    }

    pub fn apply(&mut self, changes: &DrinkTypeChanges) {
        if let Some(name) = &changes.name {
            self.name = name.clone();
        }
    }
}

impl Record for DrinkType {
    const NAME: &'static str = "drink type";
    type New = NewDrinkType;
    type Changes = DrinkTypeChanges;

    fn id(&self) -> i32 {
        self.id
    }
}

/*************************************/
/** Machine                         **/
/*************************************/

/// A dispensing device configured with (at most) one drink type.
#[derive(Debug, Clone, PartialEq, Serialize, Queryable)]
#[serde(rename = "machine")]
pub struct Machine {
    pub id: i32,
    pub name: String,
    pub drink_type_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[table_name = "hot_drinks_machines"]
pub struct NewMachine {
    pub name: String,
    pub drink_type_id: Option<i32>,
}

/// `drink_type_id: Some(None)` clears the configured drink type.
#[derive(Debug, Clone, Default)]
pub struct MachineChanges {
    pub name: Option<String>,
    pub drink_type_id: Option<Option<i32>>,
}

impl NewMachine {
    pub fn brewing(name: &str, drink_type: &DrinkType) -> NewMachine {
        NewMachine {
            name: name.to_string(),
            drink_type_id: Some(drink_type.id),
        }
    }
}

impl Machine {
    /// Dispense one drink: inserts a new `Drink` owned by this machine and returns it.
    ///
    /// Every call inserts another row. No check is made that the machine has a drink
    /// type; that only surfaces when the drink's name is looked up.
    pub fn brew<S>(&self, store: &S) -> Result<Drink>
    where
        S: Repository<Drink> + ?Sized,
    {
        let drink = Drink::create(
            store,
            &NewDrink {
                machine_id: self.id,
            },
        )?;
        info!("Machine {} brewed drink {}", self.id, drink.id);
        Ok(drink)
    }

    /// Drinks brewed by this machine, ordered by id.
    pub fn drinks<S>(&self, store: &S) -> Result<Vec<Drink>>
    where
        S: ChildRepository<Drink> + ?Sized,
    {
        Drink::belonging_to(store, self.id)
    }

    pub fn drink_type<S>(&self, store: &S) -> Result<Option<DrinkType>>
    where
        S: Repository<DrinkType> + ?Sized,
    {
        match self.drink_type_id {
            Some(id) => DrinkType::find(store, id).map(Some),
            None => Ok(None),
        }
    }

    pub fn apply(&mut self, changes: &MachineChanges) {
        if let Some(name) = &changes.name {
            self.name = name.clone();
        }
        if let Some(drink_type_id) = changes.drink_type_id {
            self.drink_type_id = drink_type_id;
        }
    }
}

impl Record for Machine {
    const NAME: &'static str = "machine";
    type New = NewMachine;
    type Changes = MachineChanges;

    fn id(&self) -> i32 {
        self.id
    }
}

impl Child for Machine {
    type Parent = DrinkType;

    fn parent_id(&self) -> Option<i32> {
        self.drink_type_id
    }
}

/*************************************/
/** Drink                           **/
/*************************************/

/// One brewing event.
#[derive(Debug, Clone, PartialEq, Serialize, Queryable)]
#[serde(rename = "drink")]
pub struct Drink {
    pub id: i32,
    pub machine_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[table_name = "hot_drinks_drinks"]
pub struct NewDrink {
    pub machine_id: i32,
}

#[derive(Debug, Clone, Default)]
pub struct DrinkChanges {
    pub machine_id: Option<i32>,
}

impl Drink {
    pub fn machine<S>(&self, store: &S) -> Result<Machine>
    where
        S: Repository<Machine> + ?Sized,
    {
        Machine::find(store, self.machine_id)
    }

    /// The drink type of the machine that brewed this drink.
    ///
    /// Fails with `Error::MissingDrinkType` when that machine has none configured.
    pub fn drink_type<S>(&self, store: &S) -> Result<DrinkType>
    where
        S: Repository<Machine> + Repository<DrinkType> + ?Sized,
    {
        let machine = self.machine(store)?;
        debug!("Drink {} came from machine {}", self.id, machine.id);
        machine
            .drink_type(store)?
            .ok_or_else(|| Error::MissingDrinkType(machine.id))
    }

    /// Display name of the drink: the name of its machine's drink type.
    pub fn name<S>(&self, store: &S) -> Result<String>
    where
        S: Repository<Machine> + Repository<DrinkType> + ?Sized,
    {
        Ok(self.drink_type(store)?.name)
    }

    pub fn apply(&mut self, changes: &DrinkChanges) {
        if let Some(machine_id) = changes.machine_id {
            self.machine_id = machine_id;
        }
    }
}

impl Record for Drink {
    const NAME: &'static str = "drink";
    type New = NewDrink;
    type Changes = DrinkChanges;

    fn id(&self) -> i32 {
        self.id
    }
}

impl Child for Drink {
    type Parent = Machine;

    fn parent_id(&self) -> Option<i32> {
        Some(self.machine_id)
    }
}
