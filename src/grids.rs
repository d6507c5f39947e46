pub mod adaptive_grid;
