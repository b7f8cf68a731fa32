use std::fmt;

use crate::error::ProbeError;

/// One label or relationship type from `get_neo4j_schema`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaEntry {
    pub name: String,
    pub property_count: usize,
    /// Instance count as reported; `None` when the server omits it.
    pub count: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaSummary {
    pub nodes: Vec<SchemaEntry>,
    pub relationships: Vec<SchemaEntry>,
}

impl SchemaSummary {
    /// Split the top-level entries of a schema document by their `type`
    /// field. Entries of any other type are ignored.
    pub fn from_json(text: &str) -> Result<Self, ProbeError> {
        let doc: serde_json::Value = serde_json::from_str(text)?;
        let Some(entries) = doc.as_object() else {
            return Err(ProbeError::Protocol(
                "schema result is not a JSON object".to_string(),
            ));
        };

        let mut summary = Self::default();
        for (name, info) in entries {
            let bucket = match info.get("type").and_then(|t| t.as_str()) {
                Some("node") => &mut summary.nodes,
                Some("relationship") => &mut summary.relationships,
                _ => continue,
            };
            let property_count = match info.get("properties") {
                Some(serde_json::Value::Object(props)) => props.len(),
                Some(serde_json::Value::Array(props)) => props.len(),
                _ => 0,
            };
            let count = info.get("count").map(|c| match c {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            });
            bucket.push(SchemaEntry {
                name: name.clone(),
                property_count,
                count,
            });
        }
        Ok(summary)
    }
}

impl fmt::Display for SchemaSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Node types: {}", self.nodes.len())?;
        writeln!(f, "Relationship types: {}", self.relationships.len())?;
        writeln!(f)?;

        let groups = [
            ("Node Types", "nodes", &self.nodes),
            ("Relationship Types", "relationships", &self.relationships),
        ];
        for (title, unit, entries) in groups {
            if entries.is_empty() {
                continue;
            }
            writeln!(f, "{title}:")?;
            for e in entries {
                writeln!(
                    f,
                    "  - {}: {} properties, {} {unit}",
                    e.name,
                    e.property_count,
                    e.count.as_deref().unwrap_or("?")
                )?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"{"Person":{"type":"node","properties":{"name":{}},"count":5},"KNOWS":{"type":"relationship","properties":{},"count":2}}"#;

    #[test]
    fn partitions_nodes_and_relationships() {
        let summary = SchemaSummary::from_json(SCHEMA).unwrap();
        assert_eq!(
            summary.nodes,
            vec![SchemaEntry {
                name: "Person".into(),
                property_count: 1,
                count: Some("5".into()),
            }]
        );
        assert_eq!(
            summary.relationships,
            vec![SchemaEntry {
                name: "KNOWS".into(),
                property_count: 0,
                count: Some("2".into()),
            }]
        );
    }

    #[test]
    fn renders_counts_and_placeholder() {
        let summary = SchemaSummary::from_json(
            r#"{"Movie":{"type":"node","properties":{"title":{},"year":{}}},"misc":{"type":"index"}}"#,
        )
        .unwrap();
        let text = summary.to_string();
        assert!(text.contains("Node types: 1"));
        assert!(text.contains("Relationship types: 0"));
        assert!(text.contains("  - Movie: 2 properties, ? nodes"));
        assert!(!text.contains("Relationship Types:"));
    }

    #[test]
    fn preserves_server_order() {
        let summary = SchemaSummary::from_json(
            r#"{"Zebra":{"type":"node"},"Apple":{"type":"node"}}"#,
        )
        .unwrap();
        let names: Vec<_> = summary.nodes.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Zebra", "Apple"]);
    }

    #[test]
    fn rejects_non_object_and_bad_json() {
        assert!(matches!(
            SchemaSummary::from_json("[1,2]"),
            Err(ProbeError::Protocol(_))
        ));
        assert!(matches!(
            SchemaSummary::from_json("not json"),
            Err(ProbeError::Decode(_))
        ));
    }
}
