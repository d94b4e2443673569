// AI intel lookups: prompt construction, streaming client, payload extraction.

pub mod client;
pub mod extract;
pub mod prompt;
