mod list_tests;
mod timeout_tests;
