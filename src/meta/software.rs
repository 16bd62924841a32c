use crate::params::{ControlledVocabulary, ParamCow};

const CUSTOM_SOFTWARE: ParamCow<'static> =
    ControlledVocabulary::MS.const_param_ident("custom unreleased software tool", 1000799);

/// The program writing the document
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Software {
    /// A unique identifier for the software within processing metadata
    pub id: String,
    pub name: String,
    /// A string denoting a particular software version, but no guarantee is given for its format
    pub version: String,
}

impl Default for Software {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
    }
}

impl Software {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            name,
            version: version.into(),
        }
    }

    /// The software term used in mzML's `softwareList`
    pub fn to_param(&self) -> ParamCow<'static> {
        CUSTOM_SOFTWARE
    }
}
