//! High score leaderboard
//!
//! Record types and validation shared by both ends of `/api/highscores`, a
//! storage trait with an in-memory implementation, request handlers that
//! express the HTTP contract, and (wasm only) a `fetch` client.

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::consts::LEVEL_COUNT;
use crate::run::{Difficulty, Phase, RunState};

/// Leaderboard endpoint
pub const ENDPOINT: &str = "/api/highscores";
/// Entries returned when the query names no limit
pub const DEFAULT_LIMIT: usize = 10;
/// Longest accepted player name, after trimming
pub const MAX_NAME_LEN: usize = 20;

/// A stored high score
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighScoreEntry {
    pub id: u64,
    pub player_name: String,
    pub score: u64,
    pub difficulty: Difficulty,
    pub level_reached: u8,
    pub completed_game: bool,
    /// ISO-8601 timestamp
    pub created_at: String,
}

/// Submission body for `POST /api/highscores`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHighScore {
    pub player_name: String,
    pub score: u64,
    pub difficulty: Difficulty,
    pub level_reached: u8,
    pub completed_game: bool,
}

impl NewHighScore {
    pub fn validate(&self) -> Result<(), HighScoreError> {
        let name = self.player_name.trim();
        if name.is_empty() {
            return Err(HighScoreError::InvalidSubmission("player name is empty".into()));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(HighScoreError::InvalidSubmission(format!(
                "player name longer than {} characters",
                MAX_NAME_LEN
            )));
        }
        if !(1..=LEVEL_COUNT as u8).contains(&self.level_reached) {
            return Err(HighScoreError::InvalidSubmission(format!(
                "level {} out of range",
                self.level_reached
            )));
        }
        Ok(())
    }
}

/// Submission for a finished (or abandoned) run
pub fn submission_for(run: &RunState, player_name: &str) -> NewHighScore {
    NewHighScore {
        player_name: player_name.trim().to_string(),
        score: run.score(),
        difficulty: run.difficulty(),
        level_reached: run.current_level(),
        completed_game: run.phase() == Phase::Victory,
    }
}

#[derive(Debug, Error)]
pub enum HighScoreError {
    #[error("invalid high score: {0}")]
    InvalidSubmission(String),

    #[error("high score storage failed: {0}")]
    Storage(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl HighScoreError {
    /// HTTP status a handler answers with
    pub fn status_code(&self) -> u16 {
        match self {
            HighScoreError::InvalidSubmission(_) => 400,
            HighScoreError::Storage(_) => 500,
            HighScoreError::Network(_) => 503,
            HighScoreError::Decode(_) => 502,
        }
    }
}

/// Leaderboard filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighScoreQuery {
    /// `None` is the global list
    pub difficulty: Option<Difficulty>,
    pub limit: usize,
}

impl Default for HighScoreQuery {
    fn default() -> Self {
        Self {
            difficulty: None,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl HighScoreQuery {
    pub fn for_difficulty(difficulty: Difficulty) -> Self {
        Self {
            difficulty: Some(difficulty),
            ..Self::default()
        }
    }

    pub fn to_url(&self) -> String {
        match self.difficulty {
            Some(d) => format!("{}?difficulty={}&limit={}", ENDPOINT, d.as_str(), self.limit),
            None => format!("{}?limit={}", ENDPOINT, self.limit),
        }
    }
}

/// Where entries live
pub trait HighScoreStore {
    /// Highest scores first
    fn top_scores(&self, query: &HighScoreQuery) -> Result<Vec<HighScoreEntry>, HighScoreError>;

    fn create(
        &mut self,
        score: NewHighScore,
        created_at: String,
    ) -> Result<HighScoreEntry, HighScoreError>;
}

/// Process-local store, kept sorted by score descending
#[derive(Debug, Clone, Default)]
pub struct MemoryHighScores {
    entries: Vec<HighScoreEntry>,
    next_id: u64,
}

impl MemoryHighScores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl HighScoreStore for MemoryHighScores {
    fn top_scores(&self, query: &HighScoreQuery) -> Result<Vec<HighScoreEntry>, HighScoreError> {
        Ok(self
            .entries
            .iter()
            .filter(|e| query.difficulty.is_none_or(|d| e.difficulty == d))
            .take(query.limit)
            .cloned()
            .collect())
    }

    fn create(
        &mut self,
        score: NewHighScore,
        created_at: String,
    ) -> Result<HighScoreEntry, HighScoreError> {
        self.next_id += 1;
        let entry = HighScoreEntry {
            id: self.next_id,
            player_name: score.player_name.trim().to_string(),
            score: score.score,
            difficulty: score.difficulty,
            level_reached: score.level_reached,
            completed_game: score.completed_game,
            created_at,
        };

        // Ties keep submission order
        let pos = self
            .entries
            .iter()
            .position(|e| entry.score > e.score)
            .unwrap_or(self.entries.len());
        self.entries.insert(pos, entry.clone());
        Ok(entry)
    }
}

/// Status code plus JSON body
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

impl ApiResponse {
    fn error(err: &HighScoreError, message: &str) -> Self {
        Self {
            status: err.status_code(),
            body: json!({ "error": message, "details": err.to_string() }),
        }
    }
}

/// `GET /api/highscores?difficulty=&limit=`
///
/// An unparsable limit falls back to the default. A difficulty that names no
/// known level matches nothing.
pub fn handle_get(
    store: &dyn HighScoreStore,
    difficulty: Option<&str>,
    limit: Option<&str>,
) -> ApiResponse {
    let limit = limit
        .and_then(|l| l.trim().parse::<usize>().ok())
        .unwrap_or(DEFAULT_LIMIT);
    let difficulty = match difficulty.filter(|d| !d.is_empty()) {
        None => None,
        Some(raw) => match Difficulty::from_str(raw) {
            Some(d) => Some(d),
            None => {
                return ApiResponse {
                    status: 200,
                    body: json!([]),
                };
            }
        },
    };

    let query = HighScoreQuery { difficulty, limit };
    match store.top_scores(&query).and_then(|scores| Ok(serde_json::to_value(scores)?)) {
        Ok(body) => ApiResponse { status: 200, body },
        Err(err) => {
            log::warn!("Fetching high scores failed: {}", err);
            ApiResponse::error(&err, "Failed to fetch high scores")
        }
    }
}

/// `POST /api/highscores`
pub fn handle_post(store: &mut dyn HighScoreStore, body: &str, created_at: String) -> ApiResponse {
    let parsed = serde_json::from_str::<NewHighScore>(body)
        .map_err(|e| HighScoreError::InvalidSubmission(e.to_string()))
        .and_then(|score| score.validate().map(|()| score));
    let score = match parsed {
        Ok(score) => score,
        Err(err) => return ApiResponse::error(&err, "Invalid high score data"),
    };

    match store
        .create(score, created_at)
        .and_then(|entry| Ok(serde_json::to_value(entry)?))
    {
        Ok(body) => ApiResponse { status: 201, body },
        Err(err) => {
            log::warn!("Saving high score failed: {}", err);
            ApiResponse::error(&err, "Failed to save high score")
        }
    }
}

/// Browser client for the leaderboard API
#[cfg(target_arch = "wasm32")]
pub mod client {
    use wasm_bindgen::{JsCast, JsValue};
    use wasm_bindgen_futures::JsFuture;
    use web_sys::{Headers, Request, RequestInit, Response};

    use super::{ENDPOINT, HighScoreEntry, HighScoreError, HighScoreQuery, NewHighScore};

    fn js_error(err: JsValue) -> HighScoreError {
        HighScoreError::Network(format!("{:?}", err))
    }

    async fn send(request: Request) -> Result<String, HighScoreError> {
        let window = web_sys::window().ok_or_else(|| HighScoreError::Network("no window".into()))?;
        let response = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(js_error)?;
        let response: Response = response.dyn_into().map_err(js_error)?;
        let text = JsFuture::from(response.text().map_err(js_error)?)
            .await
            .map_err(js_error)?;
        let body = text.as_string().unwrap_or_default();

        match response.status() {
            200..=299 => Ok(body),
            400 => Err(HighScoreError::InvalidSubmission(body)),
            500 => Err(HighScoreError::Storage(body)),
            status => Err(HighScoreError::Network(format!("HTTP {}", status))),
        }
    }

    pub async fn fetch_top(query: &HighScoreQuery) -> Result<Vec<HighScoreEntry>, HighScoreError> {
        let request = Request::new_with_str(&query.to_url()).map_err(js_error)?;
        let body = send(request).await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn submit(score: &NewHighScore) -> Result<HighScoreEntry, HighScoreError> {
        score.validate()?;
        let payload = serde_json::to_string(score)?;

        let headers = Headers::new().map_err(js_error)?;
        headers
            .set("Content-Type", "application/json")
            .map_err(js_error)?;
        let init = RequestInit::new();
        init.set_method("POST");
        init.set_headers(&headers);
        init.set_body(&JsValue::from_str(&payload));

        let request = Request::new_with_str_and_init(ENDPOINT, &init).map_err(js_error)?;
        let body = send(request).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(name: &str, score: u64, difficulty: Difficulty) -> NewHighScore {
        NewHighScore {
            player_name: name.to_string(),
            score,
            difficulty,
            level_reached: 3,
            completed_game: false,
        }
    }

    fn seeded_store() -> MemoryHighScores {
        let mut store = MemoryHighScores::new();
        let rows = [
            ("Eleven", 900, Difficulty::Hard),
            ("Dustin", 400, Difficulty::Easy),
            ("Mike", 700, Difficulty::Medium),
            ("Lucas", 1200, Difficulty::Hard),
            ("Will", 50, Difficulty::Medium),
        ];
        for (name, score, difficulty) in rows {
            store
                .create(submission(name, score, difficulty), "2024-01-01T00:00:00Z".into())
                .unwrap();
        }
        store
    }

    struct BrokenStore;

    impl HighScoreStore for BrokenStore {
        fn top_scores(&self, _: &HighScoreQuery) -> Result<Vec<HighScoreEntry>, HighScoreError> {
            Err(HighScoreError::Storage("disk on fire".into()))
        }

        fn create(&mut self, _: NewHighScore, _: String) -> Result<HighScoreEntry, HighScoreError> {
            Err(HighScoreError::Storage("disk on fire".into()))
        }
    }

    #[test]
    fn test_validation() {
        assert!(submission("Max", 10, Difficulty::Easy).validate().is_ok());
        assert!(submission("   ", 10, Difficulty::Easy).validate().is_err());
        assert!(submission(&"x".repeat(21), 10, Difficulty::Easy).validate().is_err());
        assert!(submission(&"x".repeat(20), 10, Difficulty::Easy).validate().is_ok());

        let mut bad_level = submission("Max", 10, Difficulty::Easy);
        bad_level.level_reached = 6;
        let err = bad_level.validate().unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let value = serde_json::to_value(submission("Max", 10, Difficulty::Hard)).unwrap();
        assert_eq!(value["playerName"], "Max");
        assert_eq!(value["levelReached"], 3);
        assert_eq!(value["completedGame"], false);
        assert_eq!(value["difficulty"], "hard");
    }

    #[test]
    fn test_store_orders_descending() {
        let store = seeded_store();
        let scores: Vec<u64> = store
            .top_scores(&HighScoreQuery::default())
            .unwrap()
            .iter()
            .map(|e| e.score)
            .collect();
        assert_eq!(scores, vec![1200, 900, 700, 400, 50]);
    }

    #[test]
    fn test_store_filters_and_limits() {
        let store = seeded_store();
        let hard = store
            .top_scores(&HighScoreQuery::for_difficulty(Difficulty::Hard))
            .unwrap();
        assert_eq!(hard.len(), 2);
        assert!(hard.iter().all(|e| e.difficulty == Difficulty::Hard));

        let top2 = store
            .top_scores(&HighScoreQuery {
                difficulty: None,
                limit: 2,
            })
            .unwrap();
        assert_eq!(top2.len(), 2);
        assert_eq!(top2[0].player_name, "Lucas");
    }

    #[test]
    fn test_query_url() {
        assert_eq!(HighScoreQuery::default().to_url(), "/api/highscores?limit=10");
        assert_eq!(
            HighScoreQuery::for_difficulty(Difficulty::Easy).to_url(),
            "/api/highscores?difficulty=easy&limit=10"
        );
    }

    #[test]
    fn test_get_handler() {
        let store = seeded_store();
        let resp = handle_get(&store, Some("medium"), None);
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body.as_array().map(Vec::len), Some(2));

        let resp = handle_get(&store, None, Some("3"));
        assert_eq!(resp.body.as_array().map(Vec::len), Some(3));
        assert_eq!(resp.body[0]["playerName"], "Lucas");

        // Garbage limit uses the default
        let resp = handle_get(&store, None, Some("lots"));
        assert_eq!(resp.body.as_array().map(Vec::len), Some(5));

        let resp = handle_get(&store, Some("nightmare"), None);
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, json!([]));
    }

    #[test]
    fn test_post_handler() {
        let mut store = MemoryHighScores::new();
        let body = r#"{"playerName":"Steve","score":1500,"difficulty":"medium","levelReached":5,"completedGame":true}"#;
        let resp = handle_post(&mut store, body, "2024-06-01T12:00:00Z".into());
        assert_eq!(resp.status, 201);
        assert_eq!(resp.body["id"], 1);
        assert_eq!(resp.body["createdAt"], "2024-06-01T12:00:00Z");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_post_rejects_bad_payloads() {
        let mut store = MemoryHighScores::new();
        let bodies = [
            "not json",
            r#"{"playerName":"Steve"}"#,
            r#"{"playerName":"Steve","score":-5,"difficulty":"medium","levelReached":1,"completedGame":false}"#,
            r#"{"playerName":"Steve","score":5,"difficulty":"insane","levelReached":1,"completedGame":false}"#,
            r#"{"playerName":"","score":5,"difficulty":"easy","levelReached":1,"completedGame":false}"#,
        ];
        for body in bodies {
            let resp = handle_post(&mut store, body, String::new());
            assert_eq!(resp.status, 400, "{}", body);
            assert_eq!(resp.body["error"], "Invalid high score data");
        }
        assert!(store.is_empty());
    }

    #[test]
    fn test_storage_failure_is_500() {
        let mut store = BrokenStore;
        assert_eq!(handle_get(&store, None, None).status, 500);
        let body = r#"{"playerName":"Nancy","score":5,"difficulty":"easy","levelReached":1,"completedGame":false}"#;
        assert_eq!(handle_post(&mut store, body, String::new()).status, 500);
    }

    #[test]
    fn test_submission_for_run() {
        let mut run = RunState::new();
        run.start_game(Difficulty::Hard);
        run.add_score(321);
        let sub = submission_for(&run, "  Robin ");
        assert_eq!(sub.player_name, "Robin");
        assert_eq!(sub.score, 321);
        assert_eq!(sub.difficulty, Difficulty::Hard);
        assert_eq!(sub.level_reached, 1);
        assert!(!sub.completed_game);

        run.set_level(5);
        run.complete_level();
        assert!(submission_for(&run, "Robin").completed_game);
    }
}
