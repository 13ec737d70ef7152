//! Artifact name to target table routing

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use thiserror::Error;
use tracing::warn;

/// Routing rules: one pattern whose first capture group is the artifact prefix,
/// and the table each prefix loads into
///
/// The map is written as a list of `{ prefix, table }` routes so prefixes are
/// values, not keys, and keep their case through config loading:
///
/// ```toml
/// [[load.tables.routes]]
/// prefix = "Users_Data"
/// table = "users_table"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    pub file_pattern: String,
    #[serde(rename = "routes", with = "routes", default)]
    pub prefix_table_map: HashMap<String, String>,
}

#[derive(Serialize, Deserialize)]
struct Route {
    prefix: String,
    table: String,
}

mod routes {
    use super::*;
    use serde::de::Error as _;

    pub fn serialize<S: Serializer>(
        map: &HashMap<String, String>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut routes: Vec<Route> = map
            .iter()
            .map(|(prefix, table)| Route {
                prefix: prefix.clone(),
                table: table.clone(),
            })
            .collect();
        routes.sort_by(|a, b| a.prefix.cmp(&b.prefix));
        routes.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<HashMap<String, String>, D::Error> {
        let mut map = HashMap::new();
        for route in Vec::<Route>::deserialize(deserializer)? {
            if map.contains_key(&route.prefix) {
                return Err(D::Error::custom(format!(
                    "duplicate route for prefix {}",
                    route.prefix
                )));
            }
            map.insert(route.prefix, route.table);
        }
        Ok(map)
    }
}

#[derive(Error, Debug)]
pub enum TableMapError {
    #[error("could not create regex from pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("file does not match pattern: {0}")]
    NoMatchingFilePattern(String),

    #[error("no table mapping found for file prefix: {0}")]
    NoMatchingTable(String),
}

/// Resolves artifact names to target tables
///
/// The pattern is compiled once; [`get_table`](Self::get_table) is a pure
/// function of the compiled pattern, the map, and its input.
#[derive(Debug, Clone)]
pub struct TableMapper {
    file_regex: Regex,
    prefix_table_map: HashMap<String, String>,
}

impl TableMapper {
    pub fn new(config: TableConfig) -> Result<Self, TableMapError> {
        let file_regex = Regex::new(&config.file_pattern)?;

        // captures_len counts the implicit whole-match group
        let groups = file_regex.captures_len() - 1;
        if groups != 1 {
            warn!(
                pattern = %config.file_pattern,
                groups,
                "File pattern should have exactly one capturing group"
            );
        }

        Ok(Self {
            file_regex,
            prefix_table_map: config.prefix_table_map,
        })
    }

    /// First match anywhere in `file_name`; group 1 is the prefix
    pub fn get_table(&self, file_name: &str) -> Result<&str, TableMapError> {
        let prefix = self
            .file_regex
            .captures(file_name)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .ok_or_else(|| TableMapError::NoMatchingFilePattern(file_name.to_string()))?;

        self.prefix_table_map
            .get(prefix)
            .map(String::as_str)
            .ok_or_else(|| TableMapError::NoMatchingTable(prefix.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn mapper() -> TableMapper {
        TableMapper::new(TableConfig {
            file_pattern: r"([a-zA-Z_]+)_\d+\.ext".to_string(),
            prefix_table_map: HashMap::from([
                ("users_data".to_string(), "users_table".to_string()),
                ("company_data".to_string(), "company_table".to_string()),
            ]),
        })
        .unwrap()
    }

    #[test]
    fn test_matching_file_resolves_table() {
        assert_eq!(mapper().get_table("users_data_300250.ext").unwrap(), "users_table");
        assert_eq!(mapper().get_table("company_data_7.ext").unwrap(), "company_table");
    }

    #[test]
    fn test_file_not_following_pattern() {
        let err = mapper().get_table("users.ext").unwrap_err();
        assert!(matches!(err, TableMapError::NoMatchingFilePattern(ref name) if name == "users.ext"));
    }

    #[test]
    fn test_prefix_missing_from_map() {
        let err = mapper().get_table("orders_data_1.ext").unwrap_err();
        assert!(matches!(err, TableMapError::NoMatchingTable(ref prefix) if prefix == "orders_data"));
    }

    #[test]
    fn test_invalid_pattern_fails_construction() {
        let result = TableMapper::new(TableConfig {
            file_pattern: "([a-z".to_string(),
            prefix_table_map: HashMap::new(),
        });
        assert!(matches!(result, Err(TableMapError::Pattern(_))));
    }

    #[test]
    fn test_pattern_without_group_never_matches() {
        let mapper = TableMapper::new(TableConfig {
            file_pattern: r"[a-z_]+_\d+\.ext".to_string(),
            prefix_table_map: HashMap::from([("users_data".to_string(), "users".to_string())]),
        })
        .unwrap();

        assert!(matches!(
            mapper.get_table("users_data_1.ext"),
            Err(TableMapError::NoMatchingFilePattern(_))
        ));
    }

    #[test]
    fn test_routes_keep_prefix_case() {
        let config: TableConfig = serde_json::from_str(
            r#"{
                "file_pattern": "([a-zA-Z_]+)_\\d+\\.ext",
                "routes": [
                    {"prefix": "Users_Data", "table": "users_table"},
                    {"prefix": "users_data", "table": "legacy_users"}
                ]
            }"#,
        )
        .unwrap();
        let mapper = TableMapper::new(config).unwrap();

        assert_eq!(mapper.get_table("Users_Data_1.ext").unwrap(), "users_table");
        assert_eq!(mapper.get_table("users_data_1.ext").unwrap(), "legacy_users");
    }

    #[test]
    fn test_duplicate_route_prefix_is_rejected() {
        let result = serde_json::from_str::<TableConfig>(
            r#"{
                "file_pattern": "(x)",
                "routes": [
                    {"prefix": "a", "table": "t1"},
                    {"prefix": "a", "table": "t2"}
                ]
            }"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_routes_serialize_sorted_by_prefix() {
        let config = TableConfig {
            file_pattern: "(x)".to_string(),
            prefix_table_map: HashMap::from([
                ("b".to_string(), "t2".to_string()),
                ("A".to_string(), "t1".to_string()),
            ]),
        };
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(
            value["routes"],
            serde_json::json!([{"prefix": "A", "table": "t1"}, {"prefix": "b", "table": "t2"}])
        );
    }

    #[test]
    fn test_routing_is_deterministic() {
        let mapper = mapper();
        for _ in 0..3 {
            assert_eq!(mapper.get_table("users_data_1.ext").unwrap(), "users_table");
            assert!(matches!(
                mapper.get_table("orders_data_1.ext"),
                Err(TableMapError::NoMatchingTable(_))
            ));
        }
    }
}
