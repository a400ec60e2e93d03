mod task;

pub use task::{Task, normalize_name};
