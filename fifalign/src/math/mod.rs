//! Numerical building blocks shared by the centroiders and the focus solver.

pub mod linear_solver;
pub mod polynomial;
pub mod statistics;

pub use linear_solver::{invert, solve, solve_dynamic};
pub use polynomial::{Line, Polynomial};
pub use statistics::{argmax, mean, median, median_mut, std_dev};
