//! td-2048: a 2048 engine and an N-tuple slider trained with TD(λ) to avoid
//! a win condition.
//!
//! Under the rules played here the game is *won* once two 8192 tiles share
//! the board, and the learning slider is rewarded for never getting there.
//!
//! This crate provides:
//! - A packed `Board` with table-driven slides and the eight square symmetries (`engine`)
//! - Pluggable win conditions and the danger heuristic (`rules`)
//! - An N-tuple value function evaluated over every symmetric image (`ntuple`)
//! - Random and learning agents behind one `Agent` type (`agent`)
//! - Episode statistics, weight files and record files (`stats`, `serialization`)
//! - The episode loop (`arena`)
//!
//! Quick start:
//! ```
//! use td_2048::agent::Agent;
//! use td_2048::arena::play_episode;
//! use td_2048::engine;
//! use td_2048::stats::Statistics;
//!
//! // One-time table init
//! engine::warm();
//!
//! let mut slider = Agent::learner("init=65536,65536,65536,65536 alpha=0.0025").unwrap();
//! let mut placer = Agent::placer("seed=42").unwrap();
//! let mut stats = Statistics::new(2, 0, 0);
//! while !stats.is_finished() {
//!     play_episode(&mut slider, &mut placer, &mut stats);
//! }
//! assert_eq!(stats.records().len(), 2);
//! ```
pub mod action;
pub mod agent;
pub mod arena;
pub mod config;
pub mod engine;
pub mod ntuple;
pub mod rules;
pub mod serialization;
pub mod stats;
