//! Simulated 5-day weather forecast for a field location.
//!
//! The forecast is a model simulation based on typical patterns for the
//! location and season, never real-time data, and says so in its prompt.
//! [`AdvisoryEngine::current_weather`] derives a one-line current-conditions
//! summary from day one of the forecast; it feeds the watering flow and the
//! assistant's weather tool.

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::engine::AdvisoryEngine;
use crate::error::AdvisoryError;
use crate::prompt::PromptTemplate;
use crate::schema::{FieldKind, FieldSpec, Schema};

use super::today_stamp;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastQuery {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyForecast {
    pub day: String,
    pub date: String,
    pub high_temp: f64,
    pub low_temp: f64,
    pub condition: String,
    pub precipitation_chance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Forecast {
    pub forecast: Vec<DailyForecast>,
    pub location_name: String,
}

/// Current conditions derived from day one of the forecast. Wind speed is
/// simulated; the forecast does not carry it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentWeather {
    pub temperature: f64,
    pub wind_speed: f64,
    pub condition: String,
    pub location_name: String,
}

impl CurrentWeather {
    /// The one-line summary substituted into the watering prompt.
    pub fn summary(&self) -> String {
        format!(
            "Temperature: {}\u{b0}C, Wind: {} km/h, Condition: {}",
            self.temperature, self.wind_speed, self.condition
        )
    }
}

pub(crate) fn input_schema() -> Schema {
    Schema::new(
        "weather_forecast_input",
        vec![
            FieldSpec::required(
                "latitude",
                "The latitude of the location.",
                FieldKind::number_in(-90.0, 90.0),
            ),
            FieldSpec::required(
                "longitude",
                "The longitude of the location.",
                FieldKind::number_in(-180.0, 180.0),
            ),
        ],
    )
}

fn prompt_schema() -> Schema {
    let mut schema = input_schema();
    schema.fields.push(FieldSpec::required(
        "today",
        "Today's date.",
        FieldKind::Text,
    ));
    schema
}

pub(crate) fn output_schema() -> Schema {
    Schema::new(
        "weather_forecast",
        vec![
            FieldSpec::required(
                "forecast",
                "A list of 5 daily forecast objects, today first.",
                FieldKind::List(Box::new(FieldKind::Record(vec![
                    FieldSpec::required("day", "The day of the week (e.g. \"Monday\").", FieldKind::Text),
                    FieldSpec::required(
                        "date",
                        "The date in a readable format (e.g. \"August 26\").",
                        FieldKind::Text,
                    ),
                    FieldSpec::required("highTemp", "The high temperature in Celsius.", FieldKind::number()),
                    FieldSpec::required("lowTemp", "The low temperature in Celsius.", FieldKind::number()),
                    FieldSpec::required(
                        "condition",
                        "A brief weather condition description (e.g. \"Partly Cloudy\", \"Showers\", \"Sunny\").",
                        FieldKind::Text,
                    ),
                    FieldSpec::required(
                        "precipitationChance",
                        "The chance of precipitation as a percentage.",
                        FieldKind::number_in(0.0, 100.0),
                    ),
                ]))),
            ),
            FieldSpec::required(
                "locationName",
                "The name of the location for the forecast (e.g. \"Pusa, Bihar, India\").",
                FieldKind::Text,
            ),
        ],
    )
}

const TEMPLATE: &str = "\
You are a weather simulation AI. Provide a realistic, simulated 5-day weather \
forecast for the location at latitude {{latitude}} and longitude {{longitude}}.

IMPORTANT: This is a simulation based on typical weather patterns for the \
location and time of year. It is NOT real-time weather data.

First, perform a reverse geocoding lookup to identify the most accurate \
location name (city, region, country) from the coordinates.

Today's date is {{today}}.

Generate a forecast for today and the next four days. Include the day of the \
week, date, high and low temperatures in Celsius, a brief weather condition \
description, and the chance of precipitation.";

pub(crate) fn template() -> Result<PromptTemplate, AdvisoryError> {
    PromptTemplate::new("weather_forecast", TEMPLATE, &prompt_schema())
}

impl AdvisoryEngine {
    /// Simulated 5-day forecast for a latitude and longitude.
    pub async fn weather_forecast(&self, input: &ForecastQuery) -> Result<Forecast, AdvisoryError> {
        info!(flow = "weather_forecast", "requesting forecast");
        let value = serde_json::to_value(input)?;
        input_schema().validate_input(&value)?;

        let prompt_value = json!({
            "latitude": input.latitude,
            "longitude": input.longitude,
            "today": today_stamp(),
        });
        let rendered = self.templates().weather.render(&prompt_value);
        self.structured(rendered, &output_schema()).await
    }

    /// Current conditions at a location, derived from the forecast.
    pub async fn current_weather(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<CurrentWeather, AdvisoryError> {
        let forecast = self
            .weather_forecast(&ForecastQuery { latitude, longitude })
            .await?;
        let today = forecast
            .forecast
            .first()
            .ok_or_else(|| AdvisoryError::SchemaMismatch("forecast contained no days".into()))?;

        let wind_speed: f64 = ((5.0 + rand::thread_rng().gen_range(0.0f64..10.0)) * 10.0).round() / 10.0;
        Ok(CurrentWeather {
            temperature: today.high_temp,
            wind_speed,
            condition: today.condition.clone(),
            location_name: forecast.location_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_builds_against_schema() {
        template().unwrap();
    }

    #[test]
    fn latitude_out_of_range_is_rejected() {
        let schema = input_schema();
        let err = schema
            .validate_input(&json!({"latitude": 95.0, "longitude": 85.7}))
            .unwrap_err();
        assert!(err.to_string().contains("latitude"), "{err}");
    }

    #[test]
    fn current_weather_summary_line() {
        let weather = CurrentWeather {
            temperature: 34.0,
            wind_speed: 9.5,
            condition: "Sunny".into(),
            location_name: "Pusa, Bihar, India".into(),
        };
        assert_eq!(
            weather.summary(),
            "Temperature: 34\u{b0}C, Wind: 9.5 km/h, Condition: Sunny"
        );
    }
}
