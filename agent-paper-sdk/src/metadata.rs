//! Self-description of a flow's command line, printed with `--flow-metadata`

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowMetadata {
    pub id: String,
    pub name: String,
    pub description: String,
}

/// Metadata plus every input field, as exported in JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullFlowMetadata {
    #[serde(flatten)]
    pub metadata: FlowMetadata,
    pub fields: Vec<FieldSchema>,
}

/// One command-line input of a flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    /// Struct field name
    pub name: String,
    pub field_type: FieldType,
    pub label: String,
    pub description: String,
    /// Flag as typed on the command line, e.g. `--non-interactive`
    pub cli_arg: String,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Phases that cannot run without this field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_for_phases: Option<Vec<usize>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Flag,
    Number {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<i64>,
    },
    FilePath {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pattern: Option<String>,
    },
    /// Comma-separated phase numbers out of `total_phases`
    PhaseSelector { total_phases: usize },
}

/// Implemented by `#[derive(FlowDefinition)]` on a clap `Args` struct
pub trait FlowDefinition {
    fn metadata() -> FlowMetadata;
    fn fields() -> Vec<FieldSchema>;

    fn full_metadata() -> FullFlowMetadata {
        FullFlowMetadata {
            metadata: Self::metadata(),
            fields: Self::fields(),
        }
    }

    /// Print [`FlowDefinition::full_metadata`] as pretty JSON on stdout
    fn print_metadata(&self) {
        match serde_json::to_string_pretty(&Self::full_metadata()) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("failed to serialize flow metadata: {}", e),
        }
    }
}
