pub mod environment;
pub mod paths;
pub mod security;
pub mod terminal;
pub mod timestamps;

pub use environment::{
    get_claude_dir, get_codex_dir, get_cursor_user_dir, get_default_state_dir, get_gemini_dir,
    get_home_dir,
};
pub use paths::{
    canonical_project_path, decode_file_uri, format_path_with_tilde, project_name_from_path,
    validate_file_size, validate_project_path,
};
pub use security::{safe_open_file, validate_path_not_symlink};
pub use terminal::{single_line, strip_ansi_codes};
pub use timestamps::{format_age, format_timestamp};
