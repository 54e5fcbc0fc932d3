//! Alerts and green-travel recommendations for current conditions.

use raahi_environment_models::{
    Advisory, AdvisoryKind, AdvisorySeverity, EnvironmentConfig, WeatherReading,
};

fn advisory(
    kind: AdvisoryKind,
    severity: AdvisorySeverity,
    title: &str,
    message: impl Into<String>,
) -> Advisory {
    Advisory {
        kind,
        severity,
        title: title.to_string(),
        message: message.into(),
    }
}

/// Alerts first (air quality, heat, wind, visibility), then
/// recommendations.
#[must_use]
pub fn advisories(config: &EnvironmentConfig, weather: &WeatherReading) -> Vec<Advisory> {
    use AdvisoryKind::{Alert, Recommendation};
    use AdvisorySeverity::{High, Low, Medium};

    let mut out = Vec::new();

    if weather.aqi > config.poor_air_aqi {
        let label = if weather.aqi_label.is_empty() {
            "Unhealthy"
        } else {
            weather.aqi_label.as_str()
        };
        out.push(advisory(
            Alert,
            High,
            "Poor Air Quality",
            format!(
                "Air Quality Index is {label}. Consider staying indoors or using public transport."
            ),
        ));
    } else if weather.aqi > config.moderate_air_aqi {
        out.push(advisory(
            Alert,
            Medium,
            "Moderate Air Quality",
            "Air quality is moderate. Sensitive individuals should take precautions.",
        ));
    }

    if weather.temperature_c > config.heat_alert_c {
        out.push(advisory(
            Alert,
            Medium,
            "Hot Weather Alert",
            "High temperature detected. Consider using public transport or carpooling to reduce heat emissions.",
        ));
    }

    if weather.wind_speed_kmh > config.strong_wind_alert_kmh {
        out.push(advisory(
            Alert,
            Low,
            "Windy Conditions",
            "Strong winds detected. Good conditions for outdoor activities and reduced air pollution.",
        ));
    }

    if weather.visibility_km < config.low_visibility_km {
        out.push(advisory(
            Alert,
            High,
            "Low Visibility",
            "Reduced visibility. Drive carefully and consider alternative routes.",
        ));
    }

    if weather.aqi < config.good_air_aqi {
        out.push(advisory(
            Recommendation,
            Low,
            "Great for Green Routes",
            "Air quality is good. Consider walking or cycling through green spaces.",
        ));
    }

    if (config.cycling_min_c..=config.cycling_max_c).contains(&weather.temperature_c) {
        out.push(advisory(
            Recommendation,
            Low,
            "Perfect Cycling Weather",
            format!(
                "Temperature is {:.0}°C - ideal for cycling. Zero carbon emissions!",
                weather.temperature_c
            ),
        ));
    }

    if weather.is_rainy() {
        out.push(advisory(
            Recommendation,
            Low,
            "Use Public Transport",
            "Rainy conditions. Public transport is safer and more eco-friendly.",
        ));
    }

    out
}
