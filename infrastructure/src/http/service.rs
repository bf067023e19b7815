//! HTTP adapter for the [`SessionService`] port

use super::dto::{
    CompletionDto, ListDto, PenaltyDto, PhaseDto, TimeoutDto, parse_body, participants_from,
    questions_from,
};
use super::error::{HttpServiceError, Result};
use async_trait::async_trait;
use huddle_application::{PenaltyReceipt, ServiceError, SessionService};
use huddle_domain::{
    CompletionStatus, Participant, Question, RemotePhase, SessionId, StudentId, SubmissionBatch,
};
use reqwest::{Method, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, trace};

const USER_AGENT: &str = concat!("huddle/", env!("CARGO_PKG_VERSION"));

/// Session service reached over REST/JSON
///
/// Endpoints live under `{base_url}/sessions/{session_id}/…`.
#[derive(Debug, Clone)]
pub struct HttpSessionService {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpSessionService {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| HttpServiceError::InvalidBaseUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(HttpServiceError::InvalidBaseUrl(base_url.to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `{base}/sessions/{session}/{segments…}` with each segment escaped
    fn endpoint(&self, session: &SessionId, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| HttpServiceError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push("sessions")
            .push(session.as_str())
            .extend(segments);
        Ok(url)
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<String> {
        debug!("{} {}", method, url);
        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        trace!("Response {}: {}", status, text);

        if !status.is_success() {
            return Err(HttpServiceError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let text = self.send::<()>(Method::GET, url, None).await?;
        parse_body(&text)
    }

    async fn post<B: Serialize + ?Sized>(&self, url: Url, body: &B) -> Result<String> {
        self.send(Method::POST, url, Some(body)).await
    }

    async fn fetch_phase(&self, session: &SessionId) -> Result<RemotePhase> {
        let url = self.endpoint(session, &["phase"])?;
        self.get::<PhaseDto>(url).await?.into_remote()
    }

    async fn fetch_questions(&self, level: &str, session: &SessionId) -> Result<Vec<Question>> {
        let mut url = self.endpoint(session, &["questions"])?;
        url.query_pairs_mut().append_pair("level", level);
        Ok(questions_from(self.get::<ListDto>(url).await?))
    }

    async fn fetch_participants(&self, session: &SessionId) -> Result<Vec<Participant>> {
        let url = self.endpoint(session, &["participants"])?;
        Ok(participants_from(self.get::<ListDto>(url).await?))
    }

    async fn post_timer(&self, session: &SessionId, question_index: usize) -> Result<()> {
        let index = question_index.to_string();
        let url = self.endpoint(session, &["questions", &index, "timer"])?;
        self.post(url, &serde_json::json!({})).await?;
        Ok(())
    }

    async fn fetch_timeout(&self, session: &SessionId, question_index: usize) -> Result<bool> {
        let index = question_index.to_string();
        let url = self.endpoint(session, &["questions", &index, "timeout"])?;
        Ok(self.get::<TimeoutDto>(url).await?.is_timed_out())
    }

    async fn post_penalty(
        &self,
        session: &SessionId,
        question_index: usize,
        student: &StudentId,
    ) -> Result<PenaltyReceipt> {
        let index = question_index.to_string();
        let url = self.endpoint(session, &["questions", &index, "penalty"])?;
        let text = self
            .post(url, &serde_json::json!({ "studentId": student }))
            .await?;
        let dto = parse_body::<Option<PenaltyDto>>(&text)?.unwrap_or_default();
        Ok(PenaltyReceipt {
            newly_applied: dto.newly_applied(),
        })
    }

    async fn post_batch(&self, batch: &SubmissionBatch) -> Result<()> {
        let url = self.endpoint(&batch.session_id, &["survey"])?;
        self.post(url, batch).await?;
        Ok(())
    }

    async fn fetch_completion(&self, session: &SessionId) -> Result<CompletionStatus> {
        let url = self.endpoint(session, &["completion"])?;
        Ok(self.get::<CompletionDto>(url).await?.into())
    }
}

#[async_trait]
impl SessionService for HttpSessionService {
    async fn get_phase(&self, session: &SessionId) -> std::result::Result<RemotePhase, ServiceError> {
        Ok(self.fetch_phase(session).await?)
    }

    async fn get_questions(
        &self,
        level: &str,
        session: &SessionId,
    ) -> std::result::Result<Vec<Question>, ServiceError> {
        Ok(self.fetch_questions(level, session).await?)
    }

    async fn get_participants(
        &self,
        session: &SessionId,
    ) -> std::result::Result<Vec<Participant>, ServiceError> {
        Ok(self.fetch_participants(session).await?)
    }

    async fn start_question_timer(
        &self,
        session: &SessionId,
        question_index: usize,
    ) -> std::result::Result<(), ServiceError> {
        Ok(self.post_timer(session, question_index).await?)
    }

    async fn check_question_timeout(
        &self,
        session: &SessionId,
        question_index: usize,
    ) -> std::result::Result<bool, ServiceError> {
        Ok(self.fetch_timeout(session, question_index).await?)
    }

    async fn apply_question_penalty(
        &self,
        session: &SessionId,
        question_index: usize,
        student: &StudentId,
    ) -> std::result::Result<PenaltyReceipt, ServiceError> {
        Ok(self.post_penalty(session, question_index, student).await?)
    }

    async fn submit_survey_batch(
        &self,
        batch: &SubmissionBatch,
    ) -> std::result::Result<(), ServiceError> {
        Ok(self.post_batch(batch).await?)
    }

    async fn get_completion_status(
        &self,
        session: &SessionId,
    ) -> std::result::Result<CompletionStatus, ServiceError> {
        Ok(self.fetch_completion(session).await?)
    }
}
