//! Site and page configuration.
//!
//! A site carries defaults (root template, content target, title affixes);
//! each markdown document may override them in a YAML front-matter block
//! fenced by `---` lines. Unknown front-matter keys are ignored.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Title used when neither the site nor the page names one.
pub const DEFAULT_TITLE: &str = "Untitled Page";

/// Site-wide defaults, typically loaded from a JSON document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Root template url. `None` means pages render without composition.
    pub template: Option<String>,
    /// Selector for the element receiving page content inside the composed
    /// template. Falls back to `body` when it matches nothing.
    pub target: Option<String>,
    /// Prepended to every page title.
    pub prefix: String,
    /// Appended to every page title.
    pub suffix: String,
}

impl SiteConfig {
    /// Parse a site configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Front-matter keys a page may set.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FrontMatter {
    title: Option<String>,
    template: Option<String>,
    target: Option<String>,
    prefix: Option<String>,
    suffix: Option<String>,
    description: Option<String>,
}

/// Effective configuration for one page: site defaults with the page's
/// front-matter overrides applied.
#[derive(Debug, Clone, PartialEq)]
pub struct PageConfig {
    pub title: String,
    pub template: Option<String>,
    pub target: Option<String>,
    pub prefix: String,
    pub suffix: String,
    pub description: Option<String>,
}

impl PageConfig {
    /// Merge front matter over site defaults.
    pub fn resolve(site: &SiteConfig, front_matter: Option<&str>) -> Result<Self> {
        let fm: FrontMatter = match front_matter {
            Some(yaml) if !yaml.trim().is_empty() => serde_yaml::from_str(yaml)?,
            _ => FrontMatter::default(),
        };

        Ok(Self {
            title: fm.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            template: fm.template.or_else(|| site.template.clone()),
            target: fm.target.or_else(|| site.target.clone()),
            prefix: fm.prefix.unwrap_or_else(|| site.prefix.clone()),
            suffix: fm.suffix.unwrap_or_else(|| site.suffix.clone()),
            description: fm.description,
        })
    }

    /// The display title with prefix and suffix applied.
    pub fn full_title(&self) -> String {
        format!("{}{}{}", self.prefix, self.title, self.suffix)
    }
}

/// Split an optional leading front-matter block from a markdown document.
///
/// The block starts with a `---` line at the very beginning of the document
/// and ends at the next `---` line. Without a closing fence the whole input
/// is body.
pub fn split_front_matter(text: &str) -> (Option<&str>, &str) {
    let Some(after_open) = text
        .strip_prefix("---")
        .and_then(|rest| rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n')))
    else {
        return (None, text);
    };

    let mut offset = 0;
    for line in after_open.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == "---" {
            let yaml = &after_open[..offset];
            let body = &after_open[offset + line.len()..];
            return (Some(yaml), body);
        }
        offset += line.len();
    }

    (None, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_front_matter_basic() {
        let (fm, body) = split_front_matter("---\ntitle: Hi\n---\n# Body\n");
        assert_eq!(fm, Some("title: Hi\n"));
        assert_eq!(body, "# Body\n");
    }

    #[test]
    fn test_split_front_matter_absent() {
        let (fm, body) = split_front_matter("# Just a body\n");
        assert_eq!(fm, None);
        assert_eq!(body, "# Just a body\n");
    }

    #[test]
    fn test_split_front_matter_unclosed() {
        let text = "---\ntitle: Hi\nno closing fence";
        let (fm, body) = split_front_matter(text);
        assert_eq!(fm, None);
        assert_eq!(body, text);
    }

    #[test]
    fn test_split_front_matter_crlf() {
        let (fm, body) = split_front_matter("---\r\ntitle: Hi\r\n---\r\nbody");
        assert_eq!(fm, Some("title: Hi\r\n"));
        assert_eq!(body, "body");
    }

    #[test]
    fn test_split_front_matter_dashes_in_body() {
        let (fm, body) = split_front_matter("no front matter\n---\nrule above\n");
        assert_eq!(fm, None);
        assert_eq!(body, "no front matter\n---\nrule above\n");
    }

    #[test]
    fn test_resolve_defaults() {
        let site = SiteConfig::default();
        let page = PageConfig::resolve(&site, None).unwrap();
        assert_eq!(page.title, DEFAULT_TITLE);
        assert_eq!(page.template, None);
        assert_eq!(page.full_title(), DEFAULT_TITLE);
    }

    #[test]
    fn test_resolve_overrides() {
        let site = SiteConfig {
            template: Some("base.html".into()),
            target: Some("main".into()),
            prefix: "My Site - ".into(),
            suffix: String::new(),
        };
        let yaml = "title: About\ndescription: Who we are\ntemplate: plain.html\n";
        let page = PageConfig::resolve(&site, Some(yaml)).unwrap();

        assert_eq!(page.title, "About");
        assert_eq!(page.template.as_deref(), Some("plain.html"));
        assert_eq!(page.target.as_deref(), Some("main"));
        assert_eq!(page.description.as_deref(), Some("Who we are"));
        assert_eq!(page.full_title(), "My Site - About");
    }

    #[test]
    fn test_resolve_ignores_unknown_keys() {
        let site = SiteConfig::default();
        let page = PageConfig::resolve(&site, Some("title: X\nlayout: wide\n")).unwrap();
        assert_eq!(page.title, "X");
    }

    #[test]
    fn test_resolve_rejects_malformed_yaml() {
        let site = SiteConfig::default();
        assert!(PageConfig::resolve(&site, Some("title: [unterminated")).is_err());
    }

    #[test]
    fn test_site_config_from_json() {
        let site = SiteConfig::from_json(r#"{"template": "base.html", "prefix": "p: "}"#).unwrap();
        assert_eq!(site.template.as_deref(), Some("base.html"));
        assert_eq!(site.prefix, "p: ");
        assert_eq!(site.suffix, "");
    }
}
