//! Snapshot tests for the Gemini integration

#[cfg(test)]
mod snapshot_tests {
    use crate::{build_prompt, GeminiConfig, GeminiEmbedder};
    use insta::{assert_snapshot, assert_yaml_snapshot};
    use std::collections::HashMap;

    #[test]
    fn test_config_snapshot() {
        let vars = HashMap::from([
            ("GOOGLE_API_KEY", "test_api_key_redacted"),
            ("GEMINI_EMBEDDING_DIMENSIONS", "256"),
        ]);
        let config =
            GeminiConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string())).unwrap();

        assert_yaml_snapshot!(config, @r###"
        api_key: test_api_key_redacted
        model: gemini-2.0-flash
        embedding_model: gemini-embedding-001
        embedding_dimensions: 256
        api_url: "https://generativelanguage.googleapis.com/v1beta"
        "###);
    }

    #[test]
    fn test_prompt_snapshot() {
        let prompt = build_prompt(
            "Quelle est la franchise ?",
            "1. [auto.html] 4. Franchise de 150 euros par sinistre",
        );

        assert_snapshot!(prompt, @r###"
        En tant qu'assistant spécialisé dans les documents d'assurance, utilise le contexte suivant pour répondre à la question. Réponds en français, de manière concise et précise. Si le contexte ne permet pas de répondre, dis-le.

        Contexte:
        1. [auto.html] 4. Franchise de 150 euros par sinistre

        Question: Quelle est la franchise ?
        "###);
    }

    #[test]
    fn test_embed_request_snapshot() {
        let embedder = GeminiEmbedder::new(GeminiConfig::new("test_key")).unwrap();

        assert_yaml_snapshot!(embedder.request("Garantie vol"), @r###"
        model: models/gemini-embedding-001
        content:
          parts:
            - text: Garantie vol
        taskType: SEMANTIC_SIMILARITY
        outputDimensionality: 768
        "###);
    }
}

#[cfg(test)]
mod tests {
    use crate::client::{extract_answer, GenerateContentResponse};
    use crate::{
        build_prompt, AnswerGenerator, EmbeddingModel, Error, GeminiClient, GeminiConfig,
        GeminiEmbedder,
    };
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answer a single HTTP request with `status` and a JSON `body`, returning
    /// the base API URL to point a config at.
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if request_is_complete(&request) {
                    break;
                }
            }

            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        format!("http://{addr}/v1beta")
    }

    fn request_is_complete(request: &[u8]) -> bool {
        let Some(end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
            return false;
        };
        let headers = String::from_utf8_lossy(&request[..end]).to_lowercase();
        let length = headers
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        request.len() >= end + 4 + length
    }

    fn config_for(api_url: String) -> GeminiConfig {
        let mut config = GeminiConfig::new("key");
        config.api_url = api_url;
        config.embedding_dimensions = 3;
        config
    }

    #[test]
    fn test_missing_api_key() {
        let result = GeminiConfig::from_lookup(|_| None);
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_blank_api_key_is_missing() {
        let result = GeminiConfig::from_lookup(|name| {
            (name == "GEMINI_API_KEY").then(|| "  ".to_string())
        });
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_gemini_key_takes_precedence() {
        let config = GeminiConfig::from_lookup(|name| match name {
            "GEMINI_API_KEY" => Some("gemini".to_string()),
            "GOOGLE_API_KEY" => Some("google".to_string()),
            "GEMINI_API_URL" => Some("http://localhost:8080/v1/".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.api_key, "gemini");
        assert_eq!(config.api_url, "http://localhost:8080/v1");
        assert_eq!(
            config.model_url("gemini-2.0-flash", "generateContent"),
            "http://localhost:8080/v1/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn test_invalid_dimensions() {
        let result = GeminiConfig::from_lookup(|name| match name {
            "GEMINI_API_KEY" => Some("key".to_string()),
            "GEMINI_EMBEDDING_DIMENSIONS" => Some("zero".to_string()),
            _ => None,
        });
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_prompt_without_context() {
        let prompt = build_prompt("  Suis-je couvert ?  ", "");
        assert!(prompt.contains("Contexte:\n(aucun passage pertinent)"));
        assert!(prompt.ends_with("Question: Suis-je couvert ?\n"));
    }

    #[test]
    fn test_extract_answer_joins_parts() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{"text": "La franchise "}, {"text": "est de 150 euros.\n"}]
                },
                "finishReason": "STOP"
            }]
        }))
        .unwrap();

        assert_eq!(extract_answer(response).unwrap(), "La franchise est de 150 euros.");
    }

    #[test]
    fn test_extract_answer_without_candidates() {
        let response: GenerateContentResponse =
            serde_json::from_value(json!({"promptFeedback": {"blockReason": "SAFETY"}})).unwrap();
        assert!(matches!(extract_answer(response), Err(Error::Generation(_))));
    }

    #[test]
    fn test_client_model_id() {
        let client = GeminiClient::new(GeminiConfig::new("key"))
            .unwrap()
            .with_model("gemini-1.5-pro");
        assert_eq!(client.model_id(), "gemini-1.5-pro");
    }

    #[test]
    fn test_embedder_checks_dimensions() {
        let embedder = GeminiEmbedder::new(GeminiConfig::new("key")).unwrap();
        assert_eq!(embedder.dimensions(), 768);
        assert_eq!(embedder.model_id(), "gemini-embedding-001");
        assert!(embedder.check(vec![0.0; 768]).is_ok());
        assert!(matches!(
            embedder.check(vec![0.0; 3]),
            Err(Error::Embedding(_))
        ));
    }

    #[test]
    fn test_embedder_rejects_zero_dimensions() {
        let mut config = GeminiConfig::new("key");
        config.embedding_dimensions = 0;
        assert!(matches!(
            GeminiEmbedder::new(config),
            Err(Error::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_api_is_a_network_error() {
        let mut config = GeminiConfig::new("key");
        config.api_url = "http://127.0.0.1:9/v1beta".to_string();
        let client = GeminiClient::new(config).unwrap();

        let result = client.generate("question", "contexte").await;
        assert!(matches!(result, Err(Error::Network(_))));
    }

    #[tokio::test]
    async fn test_server_error_is_a_generation_error() {
        let url = serve_once("500 Internal Server Error", r#"{"error":{"code":500}}"#).await;
        let client = GeminiClient::new(config_for(url)).unwrap();

        match client.generate("question", "contexte").await {
            Err(Error::Generation(message)) => assert!(message.contains("500")),
            other => panic!("expected a generation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_server_error_is_an_embedding_error() {
        let url = serve_once("500 Internal Server Error", r#"{"error":{"code":500}}"#).await;
        let embedder = GeminiEmbedder::new(config_for(url)).unwrap();

        let result = embedder.embed("Garantie vol").await;
        assert!(matches!(result, Err(Error::Embedding(_))));
    }

    #[tokio::test]
    async fn test_embed_decodes_values() {
        let url = serve_once("200 OK", r#"{"embedding":{"values":[0.1,0.2,0.3]}}"#).await;
        let embedder = GeminiEmbedder::new(config_for(url)).unwrap();

        assert_eq!(embedder.embed("Garantie vol").await.unwrap(), vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn test_short_batch_response_is_an_embedding_error() {
        let url = serve_once("200 OK", r#"{"embeddings":[{"values":[0.1,0.2,0.3]}]}"#).await;
        let embedder = GeminiEmbedder::new(config_for(url)).unwrap();

        match embedder.embed_batch(&["Garantie vol", "Bris de glace"]).await {
            Err(Error::Embedding(message)) => {
                assert!(message.contains("1 embeddings for 2 texts"))
            }
            other => panic!("expected an embedding error, got {other:?}"),
        }
    }
}
