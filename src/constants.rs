// Constants, loaded from environment variables where overridable.

use std::env;

// Use lazy_static to initialize static variables safely.
lazy_static::lazy_static! {
    pub static ref GEMINI_API_BASE: String = env::var("GEMINI_API_BASE")
        .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string());
    pub static ref GEMINI_MODEL: String = env::var("GEMINI_MODEL")
        .unwrap_or_else(|_| "gemini-2.0-flash-lite".to_string());
}

/// Instruction text prepended to the dataset statistics on the analysis path.
pub const ANALYSIS_PROMPT_PREFIX: &str =
    "Analyze the following dataset and provide insights:\n\n";

/// Fixed reply when the analysis toggle is off, regardless of uploaded data.
pub const ANALYSIS_DISABLED_REPLY: &str = "Data analysis is disabled. Please select \
     the 'Analyze CSV Data with AI' checkbox to enable analysis.";

/// Fixed reply when analysis is enabled but nothing has been uploaded yet.
pub const UPLOAD_FIRST_REPLY: &str =
    "Please upload a CSV file first, then ask me to analyze it.";

/// Banner shown instead of a reply when no API key was configured at startup.
pub const CONFIGURE_KEY_WARNING: &str =
    "Please configure the Gemini API key to enable chat responses.";

/// How many rows of an uploaded table are shown in its preview.
pub const PREVIEW_ROWS: usize = 5;
