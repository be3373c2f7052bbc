//! End-to-end tests: population, persistence and the session facade together.

mod persistence_test;
mod scenario_test;
mod session_test;
