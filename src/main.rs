extern crate dotenv;
extern crate env_logger;
extern crate hot_drinks;
#[macro_use]
extern crate log;
extern crate serde;
extern crate serde_json;
extern crate structopt;

use hot_drinks::db::PgStore;
use hot_drinks::config::Config;
use hot_drinks::{
    Drink, DrinkType, Machine, MachineChanges, NewDrinkType, NewMachine, Record, Result,
};
use serde::Serialize;
use structopt::StructOpt;

/// Administer hot drinks machines.
#[derive(Debug, StructOpt)]
#[structopt(name = "hot-drinks")]
enum Command {
    /// Create the hot drinks tables.
    Setup,

    /// Register a new drink type.
    AddType { name: String },

    /// Register a new machine.
    AddMachine {
        name: String,

        /// Id of the drink type the machine brews.
        #[structopt(long)]
        drink_type: Option<i32>,
    },

    /// Configure (or, without a drink type, clear) what a machine brews.
    SetDrinkType { machine: i32, drink_type: Option<i32> },

    /// List drink types.
    Types,

    /// List machines.
    Machines,

    /// Brew one drink on a machine.
    Brew { machine: i32 },

    /// Print a drink's name.
    Name { drink: i32 },

    /// List the drinks a machine has brewed.
    Drinks { machine: i32 },

    /// Remove a machine. Fails while it still has drinks.
    RemoveMachine { machine: i32 },

    /// Remove a drink record.
    RemoveDrink { drink: i32 },
}

fn print<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(command: Command, store: &PgStore) -> Result<()> {
    match command {
        Command::Setup => store.setup(),
        Command::AddType { name } => print(&DrinkType::create(store, &NewDrinkType { name })?),
        Command::AddMachine { name, drink_type } => print(&Machine::create(
            store,
            &NewMachine {
                name,
                drink_type_id: drink_type,
            },
        )?),
        Command::SetDrinkType {
            machine,
            drink_type,
        } => print(&Machine::update(
            store,
            machine,
            &MachineChanges {
                drink_type_id: Some(drink_type),
                ..Default::default()
            },
        )?),
        Command::Types => print(&DrinkType::all(store)?),
        Command::Machines => print(&Machine::all(store)?),
        Command::Brew { machine } => print(&Machine::find(store, machine)?.brew(store)?),
        Command::Name { drink } => {
            println!("{}", Drink::find(store, drink)?.name(store)?);
            Ok(())
        }
        Command::Drinks { machine } => {
            // Surface a missing machine as an error rather than an empty list.
            Machine::find(store, machine)?;
            print(&store.expanded_drinks(machine)?)
        }
        Command::RemoveMachine { machine } => Machine::delete(store, machine),
        Command::RemoveDrink { drink } => Drink::delete(store, drink),
    }
}

fn main() {
    dotenv::dotenv().ok();
    env_logger::init();

    let command = Command::from_args();

    let result = Config::from_env()
        .and_then(|config| PgStore::connect(&config))
        .and_then(|store| run(command, &store));

    if let Err(e) = result {
        error!("{}", e);
        eprintln!("hot-drinks: {}", e);
        std::process::exit(1);
    }
}
