pub mod aggregate;
pub mod domains;
pub mod refresh;
pub mod scheduler;
