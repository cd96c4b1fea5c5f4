pub mod capabilities;
pub mod context;
pub mod errors;
pub mod history;
pub mod models;
pub mod pipeline;
pub mod providers;
pub mod stages;
