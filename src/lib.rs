//! Chroma Keys Library
//!
//! A chromatic on-screen keyboard: equal-width note strips in octaves of
//! any size, playable with the mouse, touch, or the computer keyboard laid
//! out like a guitar, organ, harpejji or hexagonal grid.

pub mod app;
pub mod engine;
pub mod keyboard;
pub mod persistence;
pub mod widgets;
