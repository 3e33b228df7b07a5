use serde::{Deserialize, Serialize};

/// A normalized weather observation, independent of the provider it came from.
///
/// The serialized form (`temperature`, `humidity`, `description`) is what the
/// cache stores and what API consumers see.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    /// Degrees Celsius.
    pub temperature: f64,
    /// Relative humidity, percent.
    pub humidity: u8,
    pub description: String,
}

impl WeatherReading {
    pub fn new(temperature: f64, humidity: u8, description: impl Into<String>) -> Self {
        Self { temperature, humidity, description: description.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_public_field_names() {
        let reading = WeatherReading::new(18.5, 59, "Partly cloudy");
        let value = serde_json::to_value(&reading).expect("serialize");

        assert_eq!(value["temperature"], 18.5);
        assert_eq!(value["humidity"], 59);
        assert_eq!(value["description"], "Partly cloudy");
    }

    #[test]
    fn rejects_humidity_out_of_integer_range() {
        let raw = r#"{"temperature": 1.0, "humidity": -4, "description": "x"}"#;
        assert!(serde_json::from_str::<WeatherReading>(raw).is_err());
    }
}
