mod app_state;
mod settings;

pub use app_state::JarlinkState;
pub use settings::{default_data_dir, Settings};
