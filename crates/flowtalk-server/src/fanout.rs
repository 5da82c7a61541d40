//! Fan-out resolution and the background translation job.

use flowtalk_shared::{Language, MessageId};
use tracing::{info, warn};

use crate::api::AppState;

/// The set of target languages for a message: every channel member's primary
/// language, minus the message's own. A romanized source keeps its native
/// language as a target so readers get the native-script rendering.
///
/// Pure function over the membership snapshot taken when the message is
/// translated; later preference changes only affect future messages.
pub fn resolve_targets(
    member_languages: &[Language],
    source: Language,
    source_romanized: bool,
) -> Vec<Language> {
    let mut targets = Vec::new();
    for &lang in member_languages {
        let same_as_source = lang == source && !source_romanized;
        if !same_as_source && !targets.contains(&lang) {
            targets.push(lang);
        }
    }
    targets
}

/// Kick off translation for a freshly stored message. The HTTP response never
/// waits on this; readers observe translations accreting via polling.
pub fn spawn_translation(state: AppState, message_id: MessageId) {
    tokio::spawn(async move {
        let (source, romanized, members) = {
            let db = state.db.lock().await;
            let message = match db.get_message(message_id) {
                Ok(message) => message,
                Err(e) => {
                    warn!(id = %message_id, error = %e, "translation job: message vanished");
                    return;
                }
            };
            let members = match db.member_languages(message.channel_id) {
                Ok(members) => members,
                Err(e) => {
                    warn!(id = %message_id, error = %e, "translation job: membership lookup failed");
                    return;
                }
            };
            (message.source_language, message.source_romanized, members)
        };

        let targets = resolve_targets(&members, source, romanized);

        match state
            .pipeline
            .translate_message(&state.db, message_id, &targets)
            .await
        {
            Ok(summary) => {
                let done = summary.outcomes.iter().filter(|o| o.is_done()).count();
                info!(
                    id = %message_id,
                    targets = summary.outcomes.len(),
                    done,
                    skipped = summary.skipped,
                    "translation fan-out finished"
                );
            }
            Err(e) => {
                warn!(id = %message_id, error = %e, "translation fan-out aborted");
            }
        }
    });
}
