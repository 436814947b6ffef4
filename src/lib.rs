#![allow(proc_macro_derive_resolution_fallback)] // See: https://github.com/diesel-rs/diesel/issues/1785

//! Hot drinks: drink types, the machines configured with them, and the drinks those
//! machines brew.
//!
//! Records are persisted through the [`Repository`](repository::Repository) interface, backed
//! either by Postgres ([`PgStore`](db::PgStore)) or in memory
//! ([`MemoryStore`](memory::MemoryStore)).

#[macro_use]
extern crate derive_more;
#[macro_use]
extern crate diesel;
#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;

pub mod config;
pub mod db;
pub mod error;
pub mod memory;
pub mod models;
pub mod repository;
pub mod schema;

pub use self::error::{Error, Result};
pub use self::models::{
    Drink, DrinkChanges, DrinkType, DrinkTypeChanges, Machine, MachineChanges, NewDrink,
    NewDrinkType, NewMachine,
};
pub use self::repository::{Child, ChildRepository, Record, Repository, Store};
