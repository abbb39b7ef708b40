//! Schema and execution configuration.
//!
//! Read from the `[graphql]` section of `hookql.toml`.
//!
//! # Example Configuration
//!
//! ```toml
//! [graphql]
//! max_depth = 15
//! max_complexity = 500
//! introspection = true
//! query_type = "RootQuery"
//! mutation_type = "RootMutation"
//! defer_unknown_types = true
//! execution_timeout_ms = 30000
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::registry::is_valid_name;
use crate::schema::CompileConfig;

/// GraphQL schema and execution configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphQLConfig {
    /// Maximum query depth allowed.
    /// Default: 15
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Maximum query complexity allowed.
    /// Default: 500
    #[serde(default = "default_max_complexity")]
    pub max_complexity: usize,

    /// Enable `__schema` / `__type` introspection.
    /// Default: true
    #[serde(default = "default_introspection")]
    pub introspection: bool,

    /// Name of the query root type.
    /// Default: "RootQuery"
    #[serde(default = "default_query_type")]
    pub query_type: String,

    /// Name of the mutation root type. Only attached once it has fields.
    /// Default: "RootMutation"
    #[serde(default = "default_mutation_type")]
    pub mutation_type: String,

    /// Queue fields registered on unknown types instead of rejecting them.
    /// Default: true
    #[serde(default = "default_defer_unknown_types")]
    pub defer_unknown_types: bool,

    /// Per-request execution deadline in milliseconds.
    /// Default: none
    #[serde(default)]
    pub execution_timeout_ms: Option<u64>,
}

fn default_max_depth() -> usize {
    15
}

fn default_max_complexity() -> usize {
    500
}

fn default_introspection() -> bool {
    true
}

fn default_query_type() -> String {
    "RootQuery".to_string()
}

fn default_mutation_type() -> String {
    "RootMutation".to_string()
}

fn default_defer_unknown_types() -> bool {
    true
}

impl Default for GraphQLConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_complexity: default_max_complexity(),
            introspection: default_introspection(),
            query_type: default_query_type(),
            mutation_type: default_mutation_type(),
            defer_unknown_types: default_defer_unknown_types(),
            execution_timeout_ms: None,
        }
    }
}

impl GraphQLConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration values are invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_depth == 0 {
            return Err("graphql.max_depth must be > 0".into());
        }
        if self.max_complexity == 0 {
            return Err("graphql.max_complexity must be > 0".into());
        }
        if !is_valid_name(&self.query_type) {
            return Err(format!(
                "graphql.query_type `{}` is not a valid type name",
                self.query_type
            ));
        }
        if !is_valid_name(&self.mutation_type) {
            return Err(format!(
                "graphql.mutation_type `{}` is not a valid type name",
                self.mutation_type
            ));
        }
        if self.query_type == self.mutation_type {
            return Err("graphql.query_type and graphql.mutation_type must differ".into());
        }
        if self.execution_timeout_ms == Some(0) {
            return Err("graphql.execution_timeout_ms must be > 0 when set".into());
        }
        Ok(())
    }

    /// Execution deadline applied to requests that don't set their own.
    #[must_use]
    pub fn execution_timeout(&self) -> Option<Duration> {
        self.execution_timeout_ms.map(Duration::from_millis)
    }

    /// Converts this config to a `CompileConfig`.
    #[must_use]
    pub fn to_compile_config(&self) -> CompileConfig {
        CompileConfig {
            query_type: self.query_type.clone(),
            mutation_type: self.mutation_type.clone(),
            max_depth: self.max_depth,
            max_complexity: self.max_complexity,
            introspection_enabled: self.introspection,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GraphQLConfig::default();
        assert_eq!(config.max_depth, 15);
        assert_eq!(config.max_complexity, 500);
        assert!(config.introspection);
        assert_eq!(config.query_type, "RootQuery");
        assert_eq!(config.mutation_type, "RootMutation");
        assert!(config.defer_unknown_types);
        assert!(config.execution_timeout().is_none());
    }

    #[test]
    fn test_valid_config() {
        let config = GraphQLConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_max_depth() {
        let mut config = GraphQLConfig::default();
        config.max_depth = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_root_names() {
        let mut config = GraphQLConfig::default();
        config.query_type = "Root Query".into();
        assert!(config.validate().is_err());

        let mut config = GraphQLConfig::default();
        config.mutation_type = config.query_type.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = GraphQLConfig::default();
        config.execution_timeout_ms = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_from_toml() {
        let toml = r#"
            max_depth = 20
            max_complexity = 1000
            introspection = false
            query_type = "Query"
            defer_unknown_types = false
            execution_timeout_ms = 250
        "#;

        let config: GraphQLConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.max_depth, 20);
        assert_eq!(config.max_complexity, 1000);
        assert!(!config.introspection);
        assert_eq!(config.query_type, "Query");
        assert_eq!(config.mutation_type, "RootMutation");
        assert!(!config.defer_unknown_types);
        assert_eq!(config.execution_timeout(), Some(Duration::from_millis(250)));

        let compile = config.to_compile_config();
        assert_eq!(compile.query_type, "Query");
        assert!(!compile.introspection_enabled);
    }
}
