mod function;
mod indicator;
mod table;

pub use function::FnFactor;
pub use indicator::IndicatorFactor;
pub use table::TableFactor;
