//! Weather lookup tool backed by the OpenWeatherMap current-weather API.
//!
//! Without an API key the tool still answers, with an `{"error": ...}`
//! payload the agent can read and route around.

use async_trait::async_trait;
use serde::Serialize;
use steward_core::error::ToolError;
use steward_core::tool::{Tool, ToolResult};
use tracing::{debug, warn};

const OPENWEATHERMAP_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

pub struct WeatherLookupTool {
    api_key: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl WeatherLookupTool {
    pub fn new(api_key: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .unwrap_or_default();
        Self {
            api_key: api_key.filter(|k| !k.is_empty()),
            base_url: OPENWEATHERMAP_URL.into(),
            client,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch(&self, api_key: &str, location: &str, units: &str) -> serde_json::Value {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("q", location), ("appid", api_key), ("units", units)])
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                warn!(location, error = %e, "Weather request failed");
                return error_payload(format!("Weather service unreachable: {e}"));
            }
        };

        let status = response.status();
        let body: serde_json::Value = match response.json().await {
            Ok(b) => b,
            Err(e) => return error_payload(format!("Invalid weather response: {e}")),
        };

        if !status.is_success() {
            let message = body["message"].as_str().unwrap_or("unknown error");
            return error_payload(format!(
                "Weather lookup failed ({}): {message}",
                status.as_u16()
            ));
        }

        match summarize(&body, units) {
            Some(weather) => serde_json::to_value(weather).unwrap_or_else(|e| error_payload(e.to_string())),
            None => error_payload("Weather response missing expected fields".into()),
        }
    }
}

#[async_trait]
impl Tool for WeatherLookupTool {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Get current weather conditions for a location. Returns temperature, conditions, humidity, and wind speed."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "The city name or location to look up weather for"
                },
                "units": {
                    "type": "string",
                    "enum": ["metric", "imperial"],
                    "description": "Temperature units (default: metric)",
                    "default": "metric"
                }
            },
            "required": ["location"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let location = arguments["location"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'location' argument".into()))?;

        let units = match arguments["units"].as_str() {
            Some("imperial") => "imperial",
            _ => "metric",
        };

        debug!(location, units, "Looking up weather");

        let payload = match &self.api_key {
            Some(key) => self.fetch(key, location, units).await,
            None => error_payload("OpenWeatherMap API key not configured".into()),
        };

        Ok(ToolResult::json(payload))
    }
}

#[derive(Debug, Serialize)]
struct WeatherData {
    location: String,
    country: Option<String>,
    temperature: f64,
    feels_like: f64,
    units: String,
    conditions: String,
    humidity: u64,
    wind_speed: f64,
}

fn error_payload(message: String) -> serde_json::Value {
    serde_json::json!({ "error": message })
}

/// Pick the useful fields out of an OpenWeatherMap response.
fn summarize(body: &serde_json::Value, units: &str) -> Option<WeatherData> {
    let main = body.get("main")?;
    Some(WeatherData {
        location: body["name"].as_str()?.to_string(),
        country: body["sys"]["country"].as_str().map(String::from),
        temperature: main["temp"].as_f64()?,
        feels_like: main["feels_like"].as_f64().unwrap_or_default(),
        units: if units == "imperial" { "°F" } else { "°C" }.to_string(),
        conditions: body["weather"][0]["description"]
            .as_str()
            .unwrap_or("unknown")
            .to_string(),
        humidity: main["humidity"].as_u64().unwrap_or_default(),
        wind_speed: body["wind"]["speed"].as_f64().unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_definition() {
        let tool = WeatherLookupTool::new(None);
        assert_eq!(tool.name(), "get_weather");
        assert_eq!(
            tool.parameters_schema()["required"],
            serde_json::json!(["location"])
        );
    }

    #[tokio::test]
    async fn missing_key_returns_error_payload() {
        let tool = WeatherLookupTool::new(Some(String::new()));
        let result = tool
            .execute(serde_json::json!({"location": "Tokyo"}))
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.output.contains("\"error\""));
        assert!(result.output.contains("not configured"));
    }

    #[tokio::test]
    async fn missing_location_is_invalid() {
        let tool = WeatherLookupTool::new(None);
        let result = tool.execute(serde_json::json!({})).await;
        assert!(matches!(result, Err(ToolError::InvalidArguments(_))));
    }

    #[tokio::test]
    async fn unreachable_service_returns_error_payload() {
        let tool = WeatherLookupTool::new(Some("key".into())).with_base_url("http://127.0.0.1:1/weather");
        let result = tool
            .execute(serde_json::json!({"location": "Paris"}))
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.output.contains("unreachable"));
    }

    #[test]
    fn summarize_openweathermap_payload() {
        let body = serde_json::json!({
            "name": "London",
            "sys": { "country": "GB" },
            "main": { "temp": 12.5, "feels_like": 11.0, "humidity": 81 },
            "weather": [{ "description": "light rain" }],
            "wind": { "speed": 4.1 }
        });
        let weather = summarize(&body, "metric").unwrap();
        assert_eq!(weather.location, "London");
        assert_eq!(weather.country.as_deref(), Some("GB"));
        assert!((weather.temperature - 12.5).abs() < f64::EPSILON);
        assert_eq!(weather.units, "°C");
        assert_eq!(weather.conditions, "light rain");
        assert_eq!(weather.humidity, 81);

        let imperial = summarize(&body, "imperial").unwrap();
        assert_eq!(imperial.units, "°F");
    }

    #[test]
    fn summarize_rejects_incomplete_payload() {
        assert!(summarize(&serde_json::json!({"name": "X"}), "metric").is_none());
    }
}
