//! Post-commit notices about members whose plan changed without them asking.
//!
//! Notifiers run after the transaction commits. A failed delivery is logged
//! and never rolls anything back.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use super::family::{AffectedMember, IndividualConversion, RemovalReport};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    ConvertedToIndividual,
    RemovedFromClub,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeNotice {
    pub kind: ChangeKind,
    /// The member the request was about
    pub subject_id: i32,
    pub group_id: Option<Uuid>,
    pub affected: Vec<AffectedMember>,
    pub new_head_id: Option<i32>,
}

impl ChangeNotice {
    /// Nothing to tell when no one else was touched and headship stayed put.
    pub fn is_noteworthy(&self) -> bool {
        !self.affected.is_empty() || self.new_head_id.is_some()
    }
}

impl From<&IndividualConversion> for ChangeNotice {
    fn from(report: &IndividualConversion) -> Self {
        Self {
            kind: ChangeKind::ConvertedToIndividual,
            subject_id: report.member_id,
            group_id: Some(report.group_id),
            affected: report.cascaded.clone(),
            new_head_id: report.new_head_id,
        }
    }
}

impl From<&RemovalReport> for ChangeNotice {
    fn from(report: &RemovalReport) -> Self {
        Self {
            kind: ChangeKind::RemovedFromClub,
            subject_id: report.removed.id,
            group_id: report.group_id,
            affected: report.cascaded.clone(),
            new_head_id: report.new_head_id,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notice: &ChangeNotice) -> Result<(), NotifyError>;
}

pub type SharedNotifier = Arc<dyn Notifier>;

/// Delivers a notice if it carries news, logging instead of failing.
pub async fn dispatch(notifier: &dyn Notifier, notice: ChangeNotice) {
    if !notice.is_noteworthy() {
        return;
    }
    if let Err(e) = notifier.notify(&notice).await {
        error!(subject_id = notice.subject_id, error = %e, "Failed to deliver change notice");
    }
}

/// Writes notices to the log.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notice: &ChangeNotice) -> Result<(), NotifyError> {
        let affected: Vec<i32> = notice.affected.iter().map(|m| m.id).collect();
        info!(
            kind = ?notice.kind,
            subject_id = notice.subject_id,
            group_id = ?notice.group_id,
            ?affected,
            new_head_id = ?notice.new_head_id,
            "Membership change"
        );
        Ok(())
    }
}

/// POSTs each notice as JSON to a fixed URL.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, notice: &ChangeNotice) -> Result<(), NotifyError> {
        self.client
            .post(&self.url)
            .json(notice)
            .send()
            .await?
            .error_for_status()?;
        info!(subject_id = notice.subject_id, "Delivered change notice");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<ChangeNotice>>);

    #[async_trait]
    impl Notifier for Recorder {
        async fn notify(&self, notice: &ChangeNotice) -> Result<(), NotifyError> {
            self.0.lock().unwrap().push(notice.clone());
            Ok(())
        }
    }

    fn affected(id: i32) -> AffectedMember {
        AffectedMember {
            id,
            dni: format!("3000000{id}"),
            name: format!("Member {id}"),
            dependent: false,
        }
    }

    #[tokio::test]
    async fn test_quiet_conversion_is_not_sent() {
        let recorder = Recorder::default();
        let report = IndividualConversion {
            member_id: 1,
            group_id: Uuid::new_v4(),
            cascaded: vec![],
            new_head_id: None,
        };
        dispatch(&recorder, ChangeNotice::from(&report)).await;
        assert!(recorder.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cascade_is_sent() {
        let recorder = Recorder::default();
        let report = RemovalReport {
            removed: affected(1),
            group_id: Some(Uuid::new_v4()),
            cascaded: vec![affected(2), affected(3)],
            new_head_id: None,
        };
        dispatch(&recorder, ChangeNotice::from(&report)).await;

        let sent = recorder.0.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, ChangeKind::RemovedFromClub);
        assert_eq!(sent[0].subject_id, 1);
        assert_eq!(sent[0].affected.len(), 2);
    }
}
