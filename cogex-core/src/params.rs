//! Declarative parameter tables, one per plugin. Hosts use them to list what a
//! plugin understands; nothing here validates values.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    Image,
    Key,
    Html,
    Int,
    Bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParameterInfo {
    pub name: &'static str,
    pub pretty_name: &'static str,
    pub kind: ParameterKind,
    /// `None` marks a required parameter
    pub default: Option<&'static str>,
    pub array: bool,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PluginInfo {
    pub name: &'static str,
    pub parameters: &'static [ParameterInfo],
}

impl PluginInfo {
    pub fn parameter(&self, name: &str) -> Option<&ParameterInfo> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn required(&self) -> impl Iterator<Item = &ParameterInfo> {
        self.parameters.iter().filter(|p| p.default.is_none())
    }
}
