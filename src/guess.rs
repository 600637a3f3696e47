//! Guess scoring.
//!
//! [`score_guess`] calls the server and adapts the loose `/guess` response into
//! a [`ScoredGuess`]. It does not touch session state; the controller decides
//! what to do with the result.

use crate::api::{GameApi, GuessRequest, GuessResponse};
use crate::error::{GameError, Result};
use crate::history::{GuessResult, WINNING_SCORE};
use crate::info_log;
use crate::mode::GameMode;
use serde_json::{Number, Value};
use std::collections::BTreeMap;

/// Length of the "most similar players" list.
pub const MAX_SIMILAR: usize = 5;

#[derive(Clone, Debug, PartialEq)]
pub struct SimilarEntity {
    pub name: String,
    pub score: u8,
}

/// A validated `/guess` response.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoredGuess {
    pub result: GuessResult,
    /// Players most similar to the target, when the server included them.
    pub similar: Vec<SimilarEntity>,
}

/// A score in 0..=100 with no fractional part.
fn whole_score(score: &Number) -> Option<u8> {
    let value = score
        .as_u64()
        .or_else(|| score.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64))?;
    u8::try_from(value).ok().filter(|s| *s <= WINNING_SCORE)
}

fn parse_score(score: Option<&Number>) -> Result<u8> {
    let score = score.ok_or_else(|| GameError::InvalidResponse("missing score".to_string()))?;
    whole_score(score).ok_or_else(|| {
        GameError::InvalidResponse(format!("score {score} is not a whole number in 0..=100"))
    })
}

/// Parse a `top_5` list of `[name, score]` pairs.
///
/// Items are held to the same score rule as a guess; malformed ones are skipped.
pub fn parse_similar(items: Option<&[Value]>) -> Vec<SimilarEntity> {
    items
        .unwrap_or_default()
        .iter()
        .filter_map(|item| {
            let pair = item.as_array()?;
            let name = pair.first()?.as_str()?.trim();
            let Value::Number(score) = pair.get(1)? else {
                return None;
            };
            if name.is_empty() {
                return None;
            }
            Some(SimilarEntity {
                name: name.to_string(),
                score: whole_score(score)?,
            })
        })
        .take(MAX_SIMILAR)
        .collect()
}

/// Validate a raw response for the trimmed `guess`.
pub fn adapt_response(guess: &str, response: GuessResponse) -> Result<ScoredGuess> {
    let score = parse_score(response.score.as_ref())?;

    let matched_name = response
        .matched_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| guess.to_string());

    let breakdown: BTreeMap<String, f64> = response
        .breakdown
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(key, value)| value.as_f64().map(|v| (key, v)))
        .collect();

    Ok(ScoredGuess {
        result: GuessResult {
            matched_name,
            score,
            breakdown,
        },
        similar: parse_similar(response.top_5.as_deref()),
    })
}

/// Score `guess` against `target`.
///
/// `guess` is trimmed before sending; an empty guess is a caller bug and is
/// rejected without a request.
pub async fn score_guess(
    api: &dyn GameApi,
    guess: &str,
    target: &str,
    mode: GameMode,
) -> Result<ScoredGuess> {
    let guess = guess.trim();
    if guess.is_empty() {
        return Err(GameError::InvalidResponse("empty guess".to_string()));
    }

    let request = GuessRequest {
        guess: guess.to_string(),
        target: target.to_string(),
        mode: Some(mode),
    };
    let response = api.guess(&request).await?;
    let scored = adapt_response(guess, response)?;
    info_log!(
        "Guess '{}' matched '{}' with score {}",
        guess,
        scored.result.matched_name,
        scored.result.score
    );
    Ok(scored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeApi;
    use serde_json::json;

    fn response(value: Value) -> GuessResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_adapt_uses_matched_name() {
        let scored = adapt_response(
            "steph",
            response(json!({"score": 42, "matched_name": "Stephen Curry"})),
        )
        .unwrap();
        assert_eq!(scored.result.matched_name, "Stephen Curry");
        assert_eq!(scored.result.score, 42);
        assert!(scored.result.breakdown.is_empty());
        assert!(scored.similar.is_empty());
    }

    #[test]
    fn test_adapt_falls_back_to_guess_text() {
        let scored = adapt_response("Chris Paul", response(json!({"score": 30, "matched_name": ""}))).unwrap();
        assert_eq!(scored.result.matched_name, "Chris Paul");
    }

    #[test]
    fn test_adapt_keeps_numeric_breakdown_only() {
        let scored = adapt_response(
            "Chris Paul",
            response(json!({
                "score": 30,
                "breakdown": {"shared_teams": 12, "position_match": 4.5, "shared_seasons_detail": "2015-2017"}
            })),
        )
        .unwrap();
        assert_eq!(scored.result.breakdown.len(), 2);
        assert_eq!(scored.result.breakdown["position_match"], 4.5);
    }

    #[test]
    fn test_adapt_rejects_bad_scores() {
        assert!(adapt_response("x", response(json!({}))).is_err());
        assert!(adapt_response("x", response(json!({"score": 101}))).is_err());
        assert!(adapt_response("x", response(json!({"score": -3}))).is_err());
        assert!(adapt_response("x", response(json!({"score": 42.5}))).is_err());
        assert!(adapt_response("x", response(json!({"score": 87.5}))).is_err());
        assert_eq!(
            adapt_response("x", response(json!({"score": 42.0}))).unwrap().result.score,
            42
        );
    }

    #[test]
    fn test_parse_similar_caps_and_skips_malformed() {
        let items = vec![
            json!(["James Harden", 91]),
            json!({"name": "ignored"}),
            json!(["Russell Westbrook", 88.0]),
            json!(["Half Point", 88.5]),
            json!(["Too High", 140]),
            json!(["Chris Paul", 80]),
            json!(["", 70]),
            json!(["Kyrie Irving", 77]),
            json!(["Paul George", 75]),
            json!(["Jimmy Butler", 74]),
        ];
        let similar = parse_similar(Some(items.as_slice()));
        assert_eq!(similar.len(), MAX_SIMILAR);
        assert_eq!(similar[0].name, "James Harden");
        assert_eq!(similar[1].name, "Russell Westbrook");
        assert_eq!(similar[1].score, 88);
        assert_eq!(similar[4].name, "Paul George");
    }

    #[tokio::test]
    async fn test_score_guess_sends_trimmed_guess_and_mode() {
        let api = FakeApi::new().with_score(
            "Stephen Curry",
            json!({"score": 42, "matched_name": "Stephen Curry"}),
        );
        let scored = score_guess(&api, "  Stephen Curry ", "Kevin Durant", GameMode::AllTime)
            .await
            .unwrap();
        assert_eq!(scored.result.score, 42);

        let calls = api.guess_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].guess, "Stephen Curry");
        assert_eq!(calls[0].target, "Kevin Durant");
        assert_eq!(calls[0].mode, Some(GameMode::AllTime));
    }

    #[tokio::test]
    async fn test_score_guess_surfaces_remote_error() {
        let api = FakeApi::new();
        let err = score_guess(&api, "Nobody", "Kevin Durant", GameMode::Modern)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Player not found: Nobody");
    }
}
