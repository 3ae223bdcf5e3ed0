pub mod adapter;
pub mod error;

pub mod memory {
    pub mod cursor;
    pub mod executor;
    pub mod table;
}

pub mod sql {
    pub mod postgres {
        pub mod coercion;
        pub mod cursor;
        pub mod executor;
        pub mod utils;
    }
}

pub use adapter::{DriverKind, connect};
pub use error::ConnectorError;
pub use memory::executor::MemoryExecutor;
pub use sql::postgres::executor::PgExecutor;
