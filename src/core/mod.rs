// Handle lifecycle, native driver boundary, configuration, and error modeling.
pub mod cluster;
pub mod conf;
pub mod error;
pub mod native;
pub mod pool;
pub mod version;
