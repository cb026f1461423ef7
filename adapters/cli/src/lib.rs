#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that drives a headless Dungeon Warden session.
//!
//! The adapter owns the outer game loop: it pumps ticks through the world,
//! forwards broadcast events to the pure systems, applies their command
//! batches, and settles the player economy from the resulting events. It is
//! the only crate that holds mutable world access.

pub mod save_transfer;
pub mod session;
