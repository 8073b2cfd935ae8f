pub mod history;
pub mod layers;
pub mod properties;
pub mod templates;
