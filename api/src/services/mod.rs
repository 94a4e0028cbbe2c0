pub mod assembler;
pub mod course;
pub mod filter;
pub mod ingest;
pub mod playback;
pub mod resolver;
pub mod series;
pub mod stats;
