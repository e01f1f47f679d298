/// A module containing general logic of factor graphs and sum-product message passing
pub mod core;
/// A module containing ready to use potential functions
pub mod factors;

#[cfg(test)]
mod tests;
