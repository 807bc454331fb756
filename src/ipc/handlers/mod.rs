pub mod core;
pub mod extras;
pub mod grades;
pub mod objectives;
pub mod reports;
pub mod settings;
pub mod students;
pub mod syncctl;
pub mod users;
