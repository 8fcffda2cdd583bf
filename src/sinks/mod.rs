pub mod csv_sink;
pub mod warehouse;

pub use csv_sink::CsvSink;
pub use warehouse::{BigQueryWarehouse, SinkOutcome, TableId, Warehouse};
