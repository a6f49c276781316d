//! W3C WebDriver client over HTTP
//!
//! Speaks to chromedriver, geckodriver or a Selenium grid. Only the
//! endpoints needed by [`BrowserDriver`] are implemented.

use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, Method};
use serde_json::{json, Value as JsonValue};
use tracing::{debug, info};

use super::driver::{BrowserDriver, ElementHandle};
use super::element::SelectBy;
use crate::client::build_url;
use crate::config::UiConfig;
use crate::errors::{HarnessError, Result};

/// Key under which W3C drivers return element references
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

#[derive(Debug)]
pub struct WebDriverClient {
    http: Client,
    server_url: String,
    session_id: String,
}

impl WebDriverClient {
    /// Open a new browser session as described by `config`
    pub async fn connect(config: &UiConfig) -> Result<Self> {
        let http = Client::builder().build()?;
        let capabilities = capabilities(&config.browser, config.headless);

        let response = http
            .post(build_url(&config.webdriver_url, "/session"))
            .json(&json!({ "capabilities": { "alwaysMatch": capabilities } }))
            .send()
            .await?;
        let body: JsonValue = response.json().await?;
        let value = unwrap_value(body)?;

        let session_id = value
            .get("sessionId")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| HarnessError::Driver("new session response has no sessionId".to_string()))?
            .to_string();

        info!(browser = %config.browser, headless = config.headless, session = %session_id, "Browser session started");

        Ok(Self {
            http,
            server_url: config.webdriver_url.clone(),
            session_id,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn command(&self, method: Method, path: &str, body: Option<JsonValue>) -> Result<JsonValue> {
        let url = build_url(
            &self.server_url,
            &format!("/session/{}/{}", self.session_id, path.trim_start_matches('/')),
        );
        debug!(method = %method, path, "WebDriver command");

        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;
        let body: JsonValue = response.json().await?;
        unwrap_value(body)
    }

    async fn child_elements(&self, element: &ElementHandle, css: &str) -> Result<Vec<ElementHandle>> {
        let value = self
            .command(
                Method::POST,
                &format!("element/{}/elements", element.id()),
                Some(json!({ "using": "css selector", "value": css })),
            )
            .await?;
        parse_elements(&value)
    }
}

fn capabilities(browser: &str, headless: bool) -> JsonValue {
    match browser.to_ascii_lowercase().as_str() {
        "firefox" => {
            let args: Vec<&str> = if headless { vec!["-headless"] } else { vec![] };
            json!({ "browserName": "firefox", "moz:firefoxOptions": { "args": args } })
        }
        "edge" | "msedge" => {
            let args: Vec<&str> = if headless { vec!["--headless=new"] } else { vec![] };
            json!({ "browserName": "MicrosoftEdge", "ms:edgeOptions": { "args": args } })
        }
        _ => {
            let args: Vec<&str> = if headless { vec!["--headless=new"] } else { vec![] };
            json!({ "browserName": "chrome", "goog:chromeOptions": { "args": args } })
        }
    }
}

/// Every WebDriver response is `{"value": ...}`; errors put `error` and `message` in it
fn unwrap_value(body: JsonValue) -> Result<JsonValue> {
    let value = match body {
        JsonValue::Object(mut map) => map.remove("value").unwrap_or(JsonValue::Null),
        other => other,
    };
    if let Some(error) = value.get("error").and_then(JsonValue::as_str) {
        let message = value.get("message").and_then(JsonValue::as_str).unwrap_or_default();
        return Err(HarnessError::Driver(format!("{}: {}", error, message)));
    }
    Ok(value)
}

fn parse_elements(value: &JsonValue) -> Result<Vec<ElementHandle>> {
    let items = value
        .as_array()
        .ok_or_else(|| HarnessError::Driver("expected an element list".to_string()))?;
    items
        .iter()
        .map(|item| {
            item.get(ELEMENT_KEY)
                .and_then(JsonValue::as_str)
                .map(|id| ElementHandle(id.to_string()))
                .ok_or_else(|| HarnessError::Driver("element reference without id".to_string()))
        })
        .collect()
}

fn as_string(value: JsonValue) -> String {
    match value {
        JsonValue::String(s) => s,
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
impl BrowserDriver for WebDriverClient {
    async fn goto(&self, url: &str) -> Result<()> {
        self.command(Method::POST, "url", Some(json!({ "url": url }))).await?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(as_string(self.command(Method::GET, "url", None).await?))
    }

    async fn find_elements(&self, css: &str) -> Result<Vec<ElementHandle>> {
        let value = self
            .command(
                Method::POST,
                "elements",
                Some(json!({ "using": "css selector", "value": css })),
            )
            .await?;
        parse_elements(&value)
    }

    async fn is_displayed(&self, element: &ElementHandle) -> Result<bool> {
        let value = self
            .command(Method::GET, &format!("element/{}/displayed", element.id()), None)
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn clear_and_type(&self, element: &ElementHandle, text: &str) -> Result<()> {
        self.command(Method::POST, &format!("element/{}/clear", element.id()), Some(json!({})))
            .await?;
        self.command(
            Method::POST,
            &format!("element/{}/value", element.id()),
            Some(json!({ "text": text })),
        )
        .await?;
        Ok(())
    }

    async fn click(&self, element: &ElementHandle) -> Result<()> {
        self.command(Method::POST, &format!("element/{}/click", element.id()), Some(json!({})))
            .await?;
        Ok(())
    }

    async fn is_selected(&self, element: &ElementHandle) -> Result<bool> {
        let value = self
            .command(Method::GET, &format!("element/{}/selected", element.id()), None)
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn select_option(&self, element: &ElementHandle, by: &SelectBy) -> Result<()> {
        let option = match by {
            SelectBy::Value(value) => {
                let css = format!("option[value=\"{}\"]", value.replace('"', "\\\""));
                self.child_elements(element, &css).await?.into_iter().next()
            }
            SelectBy::Index(index) => self.child_elements(element, "option").await?.into_iter().nth(*index),
            SelectBy::Label(label) => {
                let mut found = None;
                for option in self.child_elements(element, "option").await? {
                    if self.text(&option).await?.trim() == label.as_str() {
                        found = Some(option);
                        break;
                    }
                }
                found
            }
        };

        let option = option.ok_or_else(|| HarnessError::Driver(format!("no option matching {}", by)))?;
        self.click(&option).await
    }

    async fn text(&self, element: &ElementHandle) -> Result<String> {
        let value = self
            .command(Method::GET, &format!("element/{}/text", element.id()), None)
            .await?;
        Ok(as_string(value))
    }

    async fn attribute(&self, element: &ElementHandle, name: &str) -> Result<Option<String>> {
        let value = self
            .command(
                Method::GET,
                &format!("element/{}/attribute/{}", element.id(), urlencoding::encode(name)),
                None,
            )
            .await?;
        Ok(match value {
            JsonValue::Null => None,
            other => Some(as_string(other)),
        })
    }

    async fn ready_state(&self) -> Result<String> {
        let value = self
            .command(
                Method::POST,
                "execute/sync",
                Some(json!({ "script": "return document.readyState", "args": [] })),
            )
            .await?;
        Ok(as_string(value))
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        let value = self.command(Method::GET, "screenshot", None).await?;
        let encoded = value
            .as_str()
            .ok_or_else(|| HarnessError::Driver("screenshot is not a base64 string".to_string()))?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| HarnessError::Driver(format!("invalid screenshot encoding: {}", e)))
    }

    async fn page_source(&self) -> Result<String> {
        Ok(as_string(self.command(Method::GET, "source", None).await?))
    }

    async fn quit(&self) -> Result<()> {
        let url = build_url(&self.server_url, &format!("/session/{}", self.session_id));
        let response = self.http.delete(url).send().await?;
        unwrap_value(response.json().await?)?;
        info!(session = %self.session_id, "Browser session closed");
        Ok(())
    }
}
