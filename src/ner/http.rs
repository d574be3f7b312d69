use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use serde::Serialize;

use super::{Entity, EntityPredictor};

/// Predictor backed by an inference server.
///
/// `POST {endpoint}/predict` with `{model, text, labels, threshold}`; the
/// server answers with a JSON array of `{text, label, score}` objects (any
/// extra fields such as offsets are ignored).
pub struct HttpPredictor {
    client: Client,
    url: String,
    model: String,
}

#[derive(Serialize)]
struct PredictRequest<'a> {
    model: &'a str,
    text: &'a str,
    labels: &'a [String],
    threshold: f32,
}

impl HttpPredictor {
    pub fn new(endpoint: &str, model: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            client,
            url: predict_url(endpoint),
            model: model.to_string(),
        })
    }
}

fn predict_url(endpoint: &str) -> String {
    format!("{}/predict", endpoint.trim_end_matches('/'))
}

impl EntityPredictor for HttpPredictor {
    fn predict_entities(&self, text: &str, labels: &[String], threshold: f32) -> Result<Vec<Entity>> {
        let body = PredictRequest {
            model: &self.model,
            text,
            labels,
            threshold,
        };
        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .with_context(|| format!("sending request to {}", self.url))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().unwrap_or_default();
            bail!("inference server returned {status}: {detail}");
        }
        response
            .json::<Vec<Entity>>()
            .context("decoding inference response")
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    use super::*;

    /// Answer exactly one request with `status` and `body`; hand back the
    /// raw request text.
    fn one_shot_server(status: &'static str, body: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = stream.read(&mut buf).unwrap();
                raw.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&raw).to_string();
                if let Some(end) = text.find("\r\n\r\n") {
                    let len = text[..end]
                        .lines()
                        .find_map(|l| {
                            let (k, v) = l.split_once(':')?;
                            k.eq_ignore_ascii_case("content-length")
                                .then(|| v.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if raw.len() >= end + 4 + len || n == 0 {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            let reply = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(reply.as_bytes()).unwrap();
            String::from_utf8_lossy(&raw).to_string()
        });
        (format!("http://{addr}/"), handle)
    }

    #[test]
    fn url_has_single_slash() {
        assert_eq!(predict_url("http://h:1/"), "http://h:1/predict");
        assert_eq!(predict_url("http://h:1"), "http://h:1/predict");
    }

    #[test]
    fn posts_labels_and_decodes_entities() {
        let (endpoint, server) = one_shot_server(
            "200 OK",
            r#"[{"text":"Paris","label":"location","score":0.91,"start":21,"end":26}]"#,
        );
        let predictor =
            HttpPredictor::new(&endpoint, "urchade/gliner_medium-v2.1", Duration::from_secs(5)).unwrap();
        let labels = vec!["person".to_string(), "location".to_string()];
        let entities = predictor
            .predict_entities("Barack Obama visited Paris", &labels, 0.3)
            .unwrap();

        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].label, "location");

        let request = server.join().unwrap();
        assert!(request.starts_with("POST /predict"));
        let (_, body) = request.split_once("\r\n\r\n").unwrap();
        let body: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(body["labels"], serde_json::json!(["person", "location"]));
        assert_eq!(body["model"], "urchade/gliner_medium-v2.1");
        assert_eq!(body["text"], "Barack Obama visited Paris");
    }

    #[test]
    fn server_error_is_reported() {
        let (endpoint, server) = one_shot_server("500 Internal Server Error", r#"{"detail":"boom"}"#);
        let predictor = HttpPredictor::new(&endpoint, "m", Duration::from_secs(5)).unwrap();
        let err = predictor
            .predict_entities("text", &["person".to_string()], 0.5)
            .unwrap_err();
        assert!(format!("{err:#}").contains("500"));
        server.join().unwrap();
    }
}
