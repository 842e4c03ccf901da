// Aggregates per-area integration suites
mod aggregate;
mod query;
mod service;
mod support;
