mod sum_product_tests;
mod utils;
