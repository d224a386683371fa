//! Model lifecycle integration tests.

mod create;
mod race;
mod workers;
