//! Skirmish engine library.
//!
//! A turn-based combat game on a hex grid and a UCT searcher that plans one
//! mob's activation at a time. Exposes the board model, action generation,
//! the transition function, the search, and the outer surfaces (controllers,
//! match driver, scenarios, text protocol, playouts) for the binaries and
//! integration tests.

pub mod board;
pub mod controller;
pub mod engine;
pub mod game;
pub mod movegen;
pub mod playout;
pub mod protocol;
pub mod resolve;
pub mod scenario;
pub mod search;
