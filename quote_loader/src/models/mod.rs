pub mod batch_result;
pub mod date_range;
pub mod instrument;
pub mod quote_row;
