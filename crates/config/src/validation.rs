//! Configuration validation
//!
//! Validates config consistency:
//! - Flows reference declared ingress and ingestion endpoints
//! - Flows name a serialization format
//! - Endpoints declare a type
//! - Tracepoints only ask for IPv4 / IPv6

use crate::agent::Config;
use crate::error::{ConfigError, Result};
use crate::server::ServerConfig;

/// Validate a server configuration
pub fn validate_server(config: &ServerConfig) -> Result<()> {
    validate_endpoints(config)?;
    validate_flows(config)?;
    Ok(())
}

/// Validate an agent configuration
pub fn validate_agent(config: &Config) -> Result<()> {
    for tracepoint in &config.tracepoints {
        if let Some(version) = tracepoint.inet.iter().find(|v| **v != 4 && **v != 6) {
            return Err(ConfigError::invalid_value(
                "tracepoint",
                &tracepoint.name,
                "inet",
                format!("{version} is not an IP version (expected 4 or 6)"),
            ));
        }
    }

    for (name, egress) in &config.egress {
        if egress.kind.is_empty() {
            return Err(ConfigError::missing_field("egress", name, "type"));
        }
    }

    Ok(())
}

fn validate_endpoints(config: &ServerConfig) -> Result<()> {
    for (name, ingress) in &config.ingress {
        if ingress.kind.is_empty() {
            return Err(ConfigError::missing_field("ingress", name, "type"));
        }
    }

    for (name, ingestion) in &config.ingestion {
        if ingestion.kind.is_empty() {
            return Err(ConfigError::missing_field("ingestion", name, "type"));
        }
    }

    Ok(())
}

/// Check that every flow binding resolves
///
/// Runs before any consumer starts, so a dangling name never surfaces at
/// runtime.
pub fn validate_flows(config: &ServerConfig) -> Result<()> {
    for (index, binding) in config.flow.iter().enumerate() {
        if !config.ingress.contains_key(&binding.ingress) {
            return Err(ConfigError::unknown_ingress(index, &binding.ingress));
        }

        if !config.ingestion.contains_key(&binding.ingestion) {
            return Err(ConfigError::unknown_ingestion(index, &binding.ingestion));
        }

        if binding.serialization.is_empty() {
            return Err(ConfigError::missing_field(
                "flow",
                format!("#{index}"),
                "serialization",
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EndpointSpec, FlowBinding, Tracepoint};

    fn server() -> ServerConfig {
        let mut config = ServerConfig::default();
        config
            .ingress
            .insert("kafka".into(), EndpointSpec::new("kafka", "kafka"));
        config
            .ingestion
            .insert("es".into(), EndpointSpec::new("es", "elasticsearch"));
        config
    }

    #[test]
    fn test_valid_flow() {
        let mut config = server();
        config.flow.push(FlowBinding::new("kafka", "es", "json"));
        assert!(validate_server(&config).is_ok());
    }

    #[test]
    fn test_unknown_ingress() {
        let mut config = server();
        config.flow.push(FlowBinding::new("kafka", "es", "json"));
        config.flow.push(FlowBinding::new("grpc", "es", "json"));

        let err = validate_server(&config).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownIngress { index: 1, ref name } if name == "grpc"));
    }

    #[test]
    fn test_unknown_ingestion() {
        let mut config = server();
        config.flow.push(FlowBinding::new("kafka", "influx", "json"));
        assert!(matches!(
            validate_server(&config),
            Err(ConfigError::UnknownIngestion { .. })
        ));
    }

    #[test]
    fn test_empty_serialization() {
        let mut config = server();
        config.flow.push(FlowBinding::new("kafka", "es", ""));
        assert!(matches!(
            validate_server(&config),
            Err(ConfigError::MissingField { field: "serialization", .. })
        ));
    }

    #[test]
    fn test_endpoint_without_type() {
        let mut config = server();
        config
            .ingestion
            .insert("bare".into(), EndpointSpec::new("bare", ""));
        assert!(matches!(
            validate_server(&config),
            Err(ConfigError::MissingField { field: "type", .. })
        ));
    }

    #[test]
    fn test_agent_bad_inet() {
        let config = Config {
            tracepoints: vec![Tracepoint {
                name: "tp".into(),
                inet: vec![4, 5],
                ..Default::default()
            }],
            ..Default::default()
        };
        let err = validate_agent(&config).unwrap_err();
        assert!(err.to_string().contains("5 is not an IP version"));
    }
}
