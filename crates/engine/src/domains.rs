pub mod compute_pool;
pub mod cortex_function;
pub mod pipe;
pub mod serverless_task;
pub mod warehouse;
