mod convergence_tests;
mod recompute_tests;
