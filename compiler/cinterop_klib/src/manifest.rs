//! Library manifest: a flat string map with a few well-known keys.
//!
//! List-valued keys hold space-separated entries. The manifest is stored in
//! the container's library descriptor and can also be rendered as a
//! `key=value` properties file next to it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    properties: BTreeMap<String, String>,
}

impl Manifest {
    pub const UNIQUE_NAME: &'static str = "unique_name";
    pub const DEPENDS: &'static str = "depends";
    pub const EXPORT_FORWARD_DECLARATIONS: &'static str = "exportForwardDeclarations";
    pub const INTEROP: &'static str = "interop";
    /// `true` for metadata-only libraries that carry no IR bodies.
    pub const NOIR: &'static str = "noir";
    pub const PACKAGE: &'static str = "package";
    pub const COMPILER_VERSION: &'static str = "compiler_version";
    pub const ABI_VERSION: &'static str = "abi_version";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Store a list as space-separated entries.
    pub fn set_list<I, S>(&mut self, key: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = values
            .into_iter()
            .map(|v| v.as_ref().to_owned())
            .collect::<Vec<_>>()
            .join(" ");
        self.set(key, joined);
    }

    /// Entries of a list-valued key; empty if absent.
    pub fn list(&self, key: &str) -> Vec<&str> {
        self.get(key)
            .map(|v| v.split_whitespace().collect())
            .unwrap_or_default()
    }

    /// Copy every property of `other` into this manifest, overwriting.
    pub fn merge(&mut self, other: &Manifest) {
        for (k, v) in &other.properties {
            self.properties.insert(k.clone(), v.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn unique_name(&self) -> Option<&str> {
        self.get(Self::UNIQUE_NAME)
    }

    pub fn depends(&self) -> Vec<&str> {
        self.list(Self::DEPENDS)
    }

    pub fn export_forward_declarations(&self) -> Vec<&str> {
        self.list(Self::EXPORT_FORWARD_DECLARATIONS)
    }

    pub fn is_interop(&self) -> bool {
        self.get(Self::INTEROP) == Some("true")
    }

    pub fn is_noir(&self) -> bool {
        self.get(Self::NOIR) == Some("true")
    }

    pub fn package(&self) -> Option<&str> {
        self.get(Self::PACKAGE)
    }

    /// Render as sorted `key=value` lines.
    pub fn to_properties(&self) -> String {
        let mut out = String::new();
        for (k, v) in &self.properties {
            out.push_str(k);
            out.push('=');
            out.push_str(v);
            out.push('\n');
        }
        out
    }

    /// Parse `key=value` lines. Blank lines and `#` comments are skipped;
    /// lines without `=` are ignored.
    pub fn from_properties(text: &str) -> Self {
        let mut manifest = Manifest::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((k, v)) = line.split_once('=') {
                manifest.set(k.trim(), v.trim());
            }
        }
        manifest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn list_keys_split_on_whitespace() {
        let mut m = Manifest::new();
        m.set_list(
            Manifest::EXPORT_FORWARD_DECLARATIONS,
            ["cnames.structs.Opaque", "objcnames.classes.NSView"],
        );
        assert_eq!(
            m.export_forward_declarations(),
            vec!["cnames.structs.Opaque", "objcnames.classes.NSView"]
        );
        assert!(m.depends().is_empty());
    }

    #[test]
    fn properties_text_round_trip() {
        let mut m = Manifest::new();
        m.set(Manifest::UNIQUE_NAME, "sqlite");
        m.set(Manifest::INTEROP, "true");
        m.set_list(Manifest::DEPENDS, ["stdlib", "posix"]);

        let text = m.to_properties();
        assert_eq!(
            text,
            "depends=stdlib posix\ninterop=true\nunique_name=sqlite\n"
        );
        assert_eq!(Manifest::from_properties(&text), m);
        assert!(m.is_interop());
        assert!(!m.is_noir());
    }

    #[test]
    fn parse_skips_comments() {
        let m = Manifest::from_properties("# generated\n\nnoir = true\nbogus\n");
        assert!(m.is_noir());
        assert_eq!(m.iter().count(), 1);
    }
}
