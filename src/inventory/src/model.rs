use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const UNKNOWN: &str = "Unknown";

/// One application (process, container or service) flattened together with the
/// instance it was discovered on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationRow {
    pub instance_id: String,
    pub instance_name: String,
    pub script_version: String,
    pub app_name: String,
    pub app_type: String,
    pub app_status: String,
    pub app_image: String,
    pub ports: String,
    pub pids: String,
    pub process_name: String,
    pub container_id: String,
}

/// The canonical in-memory working set, in ingestion order.
pub type CombinedDataset = Vec<ApplicationRow>;

/// Addressable columns of an [`ApplicationRow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    InstanceId,
    InstanceName,
    ScriptVersion,
    AppName,
    AppType,
    AppStatus,
    AppImage,
    Ports,
    Pids,
    ProcessName,
    ContainerId,
}

impl Field {
    pub const ALL: [Field; 11] = [
        Field::InstanceId,
        Field::InstanceName,
        Field::ScriptVersion,
        Field::AppName,
        Field::AppType,
        Field::AppStatus,
        Field::AppImage,
        Field::Ports,
        Field::Pids,
        Field::ProcessName,
        Field::ContainerId,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::InstanceId => "instance_id",
            Field::InstanceName => "instance_name",
            Field::ScriptVersion => "script_version",
            Field::AppName => "app_name",
            Field::AppType => "app_type",
            Field::AppStatus => "app_status",
            Field::AppImage => "app_image",
            Field::Ports => "ports",
            Field::Pids => "pids",
            Field::ProcessName => "process_name",
            Field::ContainerId => "container_id",
        }
    }

    pub fn lookup(name: &str) -> Option<Field> {
        Field::ALL.iter().copied().find(|f| f.as_str() == name)
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::lookup(s.trim()).ok_or_else(|| {
            format!(
                "unknown field '{}', expected one of: {}",
                s,
                Field::ALL
                    .iter()
                    .map(Field::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        })
    }
}

impl ApplicationRow {
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::InstanceId => &self.instance_id,
            Field::InstanceName => &self.instance_name,
            Field::ScriptVersion => &self.script_version,
            Field::AppName => &self.app_name,
            Field::AppType => &self.app_type,
            Field::AppStatus => &self.app_status,
            Field::AppImage => &self.app_image,
            Field::Ports => &self.ports,
            Field::Pids => &self.pids,
            Field::ProcessName => &self.process_name,
            Field::ContainerId => &self.container_id,
        }
    }

    /// Looks a column up by name; `None` for names that are not row attributes.
    pub fn get_by_name(&self, name: &str) -> Option<&str> {
        Field::lookup(name).map(|field| self.get(field))
    }
}
