// Core library: source decoding, metric pipeline, annotations, config.

pub mod aggregate;
pub mod annotations;
pub mod board;
pub mod compare;
pub mod config;
pub mod db;
pub mod league;
pub mod metrics;
pub mod ordering;
pub mod overrides;
pub mod roster;
pub mod source;
