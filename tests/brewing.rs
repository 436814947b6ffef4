extern crate env_logger;
extern crate hot_drinks;

use hot_drinks::memory::MemoryStore;
use hot_drinks::{
    Drink, DrinkType, Machine, NewDrink, NewDrinkType, NewMachine, Record, Result, Store,
};

fn machine_brewing(store: &MemoryStore, drink_name: &str) -> Result<Machine> {
    let drink_type = DrinkType::create(store, &NewDrinkType::named(drink_name))?;
    Machine::create(store, &NewMachine::brewing("office", &drink_type))
}

fn brewed_drink<S: Store>(store: &S, machine: &Machine) -> Result<Drink> {
    Ok(machine.drinks(store)?.remove(0))
}

#[test]
fn a_coffee_machine_brews_a_cup_of_coffee() -> Result<()> {
    env_logger::try_init().unwrap_or_default();
    let store = MemoryStore::new();
    let machine = machine_brewing(&store, "coffee")?;
    assert!(machine.drinks(&store)?.is_empty());

    machine.brew(&store)?;

    assert_eq!(brewed_drink(&store, &machine)?.name(&store)?, "coffee");
    Ok(())
}

#[test]
fn a_tea_machine_brews_a_cup_of_tea() -> Result<()> {
    env_logger::try_init().unwrap_or_default();
    let store = MemoryStore::new();
    let machine = machine_brewing(&store, "tea")?;
    assert!(machine.drinks(&store)?.is_empty());

    machine.brew(&store)?;

    assert_eq!(brewed_drink(&store, &machine)?.name(&store)?, "tea");
    Ok(())
}

#[test]
fn brewing_persists_one_drink_per_call() -> Result<()> {
    env_logger::try_init().unwrap_or_default();
    let store = MemoryStore::new();
    let machine = machine_brewing(&store, "coffee")?;

    for expected in 1..=3 {
        machine.brew(&store)?;
        assert_eq!(Drink::count(&store)?, expected);
    }
    assert_eq!(machine.drinks(&store)?.len(), 3);
    Ok(())
}

#[test]
fn most_recent_drink_is_named_after_the_drink_type() -> Result<()> {
    env_logger::try_init().unwrap_or_default();
    let store = MemoryStore::new();
    let cocoa = machine_brewing(&store, "cocoa")?;
    let chai = machine_brewing(&store, "chai")?;

    cocoa.brew(&store)?;
    let latest = chai.brew(&store)?;

    let newest = Drink::all(&store)?.pop().expect("a drink");
    assert_eq!(newest, latest);
    assert_eq!(newest.name(&store)?, "chai");
    Ok(())
}

#[test]
fn machines_only_see_their_own_drinks() -> Result<()> {
    env_logger::try_init().unwrap_or_default();
    let store = MemoryStore::new();
    let left = machine_brewing(&store, "coffee")?;
    let right = machine_brewing(&store, "tea")?;

    left.brew(&store)?;
    left.brew(&store)?;
    right.brew(&store)?;

    assert_eq!(left.drinks(&store)?.len(), 2);
    assert!(right
        .drinks(&store)?
        .iter()
        .all(|drink| drink.machine_id == right.id));
    Ok(())
}

#[test]
fn drink_for_a_missing_machine_is_a_constraint_violation() {
    let store = MemoryStore::new();
    let err = Drink::create(&store, &NewDrink { machine_id: 404 }).expect_err("create");

    assert!(err.is_constraint_violation(), "{:?}", err);
    assert_eq!(Drink::count(&store).unwrap(), 0);
}

#[test]
fn machine_with_drinks_cannot_be_deleted() -> Result<()> {
    let store = MemoryStore::new();
    let machine = machine_brewing(&store, "coffee")?;
    let drink = machine.brew(&store)?;

    let err = Machine::delete(&store, machine.id).expect_err("delete");
    assert!(err.is_constraint_violation(), "{:?}", err);
    assert_eq!(Machine::find(&store, machine.id)?, machine);

    Drink::delete(&store, drink.id)?;
    Machine::delete(&store, machine.id)?;
    assert!(Machine::find(&store, machine.id).unwrap_err().is_not_found());
    Ok(())
}

#[test]
fn name_of_a_drink_whose_machine_is_gone_is_not_found() -> Result<()> {
    let store = MemoryStore::new();
    let machine = machine_brewing(&store, "coffee")?;
    let drink = machine.brew(&store)?;
    Drink::delete(&store, drink.id)?;
    Machine::delete(&store, machine.id)?;

    let err = drink.name(&store).expect_err("name");
    assert_eq!(err.to_string(), format!("machine {} not found", machine.id));
    Ok(())
}
