// The response router: given a user message, the analysis toggle and the
// uploaded table, picks exactly one of four reply paths and drives the model
// call for the two that need one.

use tracing::info;

use crate::constants::{
    ANALYSIS_DISABLED_REPLY, ANALYSIS_PROMPT_PREFIX, CONFIGURE_KEY_WARNING, UPLOAD_FIRST_REPLY,
};
use crate::gemini::{GeminiClient, ModelError};
use crate::session::SessionState;
use crate::table::DataTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Summarize the table's statistics and ask the model to analyze them.
    Analyze,
    /// Forward the user message verbatim to the model.
    Forward,
    /// Canned reply: analysis is switched off.
    Disabled,
    /// Canned reply: analysis is on but nothing was uploaded.
    NeedUpload,
}

/// Case-insensitive substring check for the analysis keywords. Deliberately
/// nothing smarter: no stemming, no localization.
pub fn wants_analysis(message: &str) -> bool {
    let lowered = message.to_lowercase();
    lowered.contains("analyze") || lowered.contains("insight")
}

/// Branch order matters here: disabling analysis wins over a missing upload,
/// so the decline reply is reachable whether or not a table exists.
pub fn route(message: &str, analysis_enabled: bool, has_table: bool) -> Route {
    if has_table && analysis_enabled {
        if wants_analysis(message) {
            Route::Analyze
        } else {
            Route::Forward
        }
    } else if !analysis_enabled {
        Route::Disabled
    } else {
        Route::NeedUpload
    }
}

pub fn analysis_prompt(table: &DataTable) -> String {
    format!("{}{}", ANALYSIS_PROMPT_PREFIX, table.describe())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatOutcome {
    /// Assistant reply, already appended to the transcript.
    Reply(String),
    /// Configuration banner; shown to the user but never part of the transcript.
    Warning(&'static str),
}

/// Handle one chat interaction. The user message is appended to the transcript
/// unconditionally and stays there even when the model call fails; the reply
/// is appended only on success.
pub async fn respond(
    session: &mut SessionState,
    model: Option<&GeminiClient>,
    message: &str,
) -> Result<ChatOutcome, ModelError> {
    session.push_user(message);

    let Some(model) = model else {
        return Ok(ChatOutcome::Warning(CONFIGURE_KEY_WARNING));
    };

    let route = route(message, session.analysis_enabled, session.table.is_some());
    info!(?route, "routing chat message");
    let reply = match route {
        Route::Analyze => {
            let prompt = match session.table.as_ref() {
                Some(table) => analysis_prompt(table),
                // route() never yields Analyze without a table.
                None => message.to_string(),
            };
            model.complete(&prompt).await?
        }
        Route::Forward => model.complete(message).await?,
        Route::Disabled => ANALYSIS_DISABLED_REPLY.to_string(),
        Route::NeedUpload => UPLOAD_FIRST_REPLY.to_string(),
    };

    session.push_assistant(reply.clone());
    Ok(ChatOutcome::Reply(reply))
}
