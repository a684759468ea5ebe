// Adapters - External system implementations

pub mod console_notify;
pub mod exec_ffmpeg;
pub mod fs_output;
pub mod toml_config;

// Re-export adapters
pub use console_notify::ConsoleNotifier;
pub use exec_ffmpeg::FFmpegEngineAdapter;
pub use fs_output::{DirectorySink, FixedDirectoryPicker, PromptDirectoryPicker};
pub use toml_config::{LoadedConfig, SplitterConfig, TomlConfigAdapter};
