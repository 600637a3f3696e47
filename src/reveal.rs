use crate::api::{GameApi, GuessRequest};
use crate::guess::{SimilarEntity, parse_similar};
use crate::mode::GameMode;

/// Fetch the players most similar to `target` by scoring it against itself.
///
/// Failures yield an empty list; giving up always succeeds for the player.
pub async fn fetch_similar(api: &dyn GameApi, target: &str, mode: GameMode) -> Vec<SimilarEntity> {
    let request = GuessRequest {
        guess: target.to_string(),
        target: target.to_string(),
        mode: Some(mode),
    };

    match api.guess(&request).await {
        Ok(response) => parse_similar(response.top_5.as_deref()),
        Err(e) => {
            log::error!("Error fetching similar players for reveal: {e}");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeApi;
    use serde_json::json;

    #[tokio::test]
    async fn test_reveal_uses_self_comparison() {
        let api = FakeApi::new().with_score(
            "Kevin Durant",
            json!({"score": 100, "top_5": [["James Harden", 91], ["Russell Westbrook", 88]]}),
        );
        let similar = fetch_similar(&api, "Kevin Durant", GameMode::Modern).await;
        assert_eq!(similar.len(), 2);
        assert_eq!(similar[0].name, "James Harden");

        let calls = api.guess_calls();
        assert_eq!(calls[0].guess, calls[0].target);
    }

    #[tokio::test]
    async fn test_reveal_failure_gives_empty_list() {
        let api = FakeApi::new().offline_guesses();
        assert!(fetch_similar(&api, "Kevin Durant", GameMode::Modern).await.is_empty());
    }

    #[tokio::test]
    async fn test_reveal_without_top_five() {
        let api = FakeApi::new().with_score("Kevin Durant", json!({"score": 100}));
        assert!(fetch_similar(&api, "Kevin Durant", GameMode::AllTime).await.is_empty());
    }
}
