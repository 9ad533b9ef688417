pub mod fact;
pub mod feed;
