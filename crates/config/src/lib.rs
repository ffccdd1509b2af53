// Configuration loading

pub mod settings;

pub use settings::{
    ConfigError, LogSettings, NotifySettings, ReceptionSettings, Settings, StorageSettings,
};
