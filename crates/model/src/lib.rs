pub mod core {
    pub mod value;
}

pub mod records {
    pub mod batch;
    pub mod row;
}

pub use crate::core::value::Value;
pub use records::{
    batch::RowBatch,
    row::{ColumnMetadata, Row},
};
