//! Recording of ordinary community messages.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use agora_store::{GroupMessage, Member, NewPitch, Result, Store};

/// Hashtag that marks a message as a pitch.
pub const PITCH_TAG: &str = "#pitch";

/// A text message seen in the community chat.
#[derive(Debug, Clone)]
pub struct Incoming {
    pub member: Member,
    pub text: String,
    pub thread_id: Option<i32>,
    pub at: DateTime<Utc>,
}

/// What [`ingest`] wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ingested {
    pub log_id: i64,
    pub pitch_id: Option<i64>,
}

pub fn is_pitch(text: &str) -> bool {
    text.to_lowercase().contains(PITCH_TAG)
}

/// Upsert the sender, append the message to the group log and, when it is
/// tagged, record it as a pitch.
pub async fn ingest(store: &dyn Store, incoming: &Incoming) -> Result<Ingested> {
    let member = &incoming.member;
    store.upsert_user(member, incoming.at).await?;

    let log_id = store
        .log_message(&GroupMessage {
            user_id: member.user_id,
            username: member.username.clone(),
            text: incoming.text.clone(),
            thread_id: incoming.thread_id,
            at: incoming.at,
        })
        .await?;
    debug!(user_id = member.user_id, log_id, "group message logged");

    let pitch_id = if is_pitch(&incoming.text) {
        let id = store
            .insert_pitch(&NewPitch {
                user_id: member.user_id,
                username: member.username.clone(),
                text: incoming.text.clone(),
                at: incoming.at,
            })
            .await?;
        info!(user_id = member.user_id, pitch_id = id, "pitch recorded");
        Some(id)
    } else {
        None
    };

    Ok(Ingested { log_id, pitch_id })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use agora_core::TimeWindow;
    use agora_store::SqliteStore;

    use super::*;

    fn incoming(text: &str, thread_id: Option<i32>) -> Incoming {
        Incoming {
            member: Member {
                user_id: 42,
                username: Some("founder".into()),
                first_name: "Ada".into(),
            },
            text: text.into(),
            thread_id,
            at: Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn pitch_tag_is_case_insensitive() {
        assert!(is_pitch("my #pitch: invoices"));
        assert!(is_pitch("#PITCH"));
        assert!(!is_pitch("pitch without tag"));
    }

    #[tokio::test]
    async fn tagged_message_becomes_a_pitch() {
        let store = SqliteStore::open_in_memory().unwrap();
        let msg = incoming("#Pitch a CRM for bakeries", Some(5));
        let out = ingest(&store, &msg).await.unwrap();
        assert!(out.pitch_id.is_some());

        let window = TimeWindow::trailing(msg.at + Duration::seconds(1), Duration::days(1));
        let pitches = store.pitches_between(&window).await.unwrap();
        assert_eq!(pitches.len(), 1);
        assert_eq!(pitches[0].user_id, 42);
        assert_eq!(pitches[0].likes, 0);

        let logs = store.group_logs_between(&window, Some(5)).await.unwrap();
        assert_eq!(logs.len(), 1);
    }

    #[tokio::test]
    async fn plain_message_is_only_logged() {
        let store = SqliteStore::open_in_memory().unwrap();
        let msg = incoming("good morning", None);
        let out = ingest(&store, &msg).await.unwrap();
        assert_eq!(out.pitch_id, None);

        let window = TimeWindow::trailing(msg.at + Duration::seconds(1), Duration::days(1));
        assert!(store.pitches_between(&window).await.unwrap().is_empty());
        assert_eq!(store.group_logs_between(&window, None).await.unwrap().len(), 1);
    }
}
