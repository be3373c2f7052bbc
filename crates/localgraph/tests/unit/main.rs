//! Unit tests exercising the public API one component at a time.

mod query_test;
mod record_test;
mod store_test;
