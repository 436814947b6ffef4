use diesel::r2d2;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use std::convert::From;

pub type Result<T> = ::std::result::Result<T, Error>;

#[derive(Debug, Display)]
pub enum Error {
    /// No row of the named entity has the given id.
    #[display(fmt = "{} {} not found", _0, _1)]
    NotFound(&'static str, i32),

    /// The machine with the given id has no drink type configured.
    #[display(fmt = "machine {} has no drink type", _0)]
    MissingDrinkType(i32),

    /// A foreign key points at a missing row, or a row still has dependents.
    #[display(fmt = "constraint violation: {}", _0)]
    ConstraintViolation(String),

    #[display(fmt = "configuration error: {}", _0)]
    Config(String),

    DieselError(DieselError),

    PoolError(r2d2::PoolError),

    JsonError(serde_json::Error),
}

impl Error {
    /// True for both a missing row and a missing drink type on the lookup chain.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(..) | Self::MissingDrinkType(_) => true,
            Self::DieselError(DieselError::NotFound) => true,
            _ => false,
        }
    }

    pub fn is_constraint_violation(&self) -> bool {
        match self {
            Self::ConstraintViolation(_) => true,
            _ => false,
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::DieselError(e) => Some(e),
            Self::PoolError(e) => Some(e),
            Self::JsonError(e) => Some(e),
            Self::NotFound(..)
            | Self::MissingDrinkType(_)
            | Self::ConstraintViolation(_)
            | Self::Config(_) => None,
        }
    }
}

impl From<DieselError> for Error {
    fn from(e: DieselError) -> Error {
        match e {
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
                warn!("Foreign key violation: {}", info.message());
                Error::ConstraintViolation(info.message().to_string())
            }
            e => Error::DieselError(e),
        }
    }
}

impl From<r2d2::PoolError> for Error {
    fn from(e: r2d2::PoolError) -> Error {
        Error::PoolError(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Error {
        Error::JsonError(e)
    }
}
