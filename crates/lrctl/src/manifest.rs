// Version manifest: the indentation-nested `key: value` subset turned into a
// flat mapping, e.g. `services:/lrctl:/version: 1.2.3` becomes
// `services_lrctl_version = 1.2.3`.

use lrctl_sdk::StringUtil;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

/// Spaces per nesting level.
const INDENT_UNIT: usize = 2;

static LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^( *)([A-Za-z0-9_]+):(?:[ \t]+(.*?))?[ \t]*$").expect("Invalid manifest line regex")
});

/// A block heading whose key is not a valid manifest key.
static BAD_HEADING_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^( *)[^ \t#].*:[ \t]*$").expect("Invalid manifest heading regex"));

/// Flat `path_key -> value` view of a manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatManifest {
    entries: BTreeMap<String, String>,
}

/// One service's entry. Either field may be missing from a partial manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceEntry {
    pub image: Option<String>,
    pub version: Option<String>,
}

impl FlatManifest {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Look up `field` of `service`, preferring the `services:` section over
    /// a top-level service block. Empty values count as absent.
    pub fn service_field(&self, service: &str, field: &str) -> Option<&str> {
        [
            format!("services_{}_{}", service, field),
            format!("{}_{}", service, field),
        ]
        .iter()
        .filter_map(|key| self.get(key))
        .find(|value| !value.is_empty())
    }

    pub fn service(&self, service: &str) -> ServiceEntry {
        ServiceEntry {
            image: self.service_field(service, "image").map(str::to_string),
            version: self.service_field(service, "version").map(str::to_string),
        }
    }
}

/// Flatten manifest text. Pure: never fails, lines that are not `key:` or
/// `key: value` are skipped. Children of a skipped heading are skipped too.
pub fn flatten(text: &str) -> FlatManifest {
    let mut entries = BTreeMap::new();
    // `None` marks a block opened by an invalid heading
    let mut path: Vec<Option<String>> = Vec::new();

    for line in text.lines() {
        let Some(captures) = LINE_REGEX.captures(line) else {
            if let Some(heading) = BAD_HEADING_REGEX.captures(line) {
                path.truncate(heading[1].len() / INDENT_UNIT);
                path.push(None);
            }
            continue;
        };

        let depth = captures[1].len() / INDENT_UNIT;
        let key = &captures[2];
        let value = captures.get(3).map(|m| m.as_str()).unwrap_or_default();

        path.truncate(depth);

        if value.is_empty() {
            path.push(Some(key.to_string()));
            continue;
        }

        let Some(mut segments) = path.iter().cloned().collect::<Option<Vec<String>>>() else {
            continue;
        };
        segments.push(key.to_string());
        let name = segments.join("_");
        entries.insert(name, StringUtil::trim_matching_quotes(value).to_string());
    }

    FlatManifest { entries }
}
