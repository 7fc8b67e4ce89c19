//! Configuration discovery and effective settings resolution.
//!
//! protolint reads `.protolint.yaml|yml`, `protolint.yaml|yml` or
//! `protolint.toml` from the config directory (or the closest ancestor, up to
//! the first directory holding `.git`) and merges it with CLI flags to
//! produce an `Effective` config.
//! Defaults:
//! - `output`: `human`
//! - `fix`: false
//! - rules: the official set
//! - `indent.style`: tab, `indent.newline`: `\n`
//! - `max_line_length.max_chars`: 80, `max_line_length.tab_chars`: 4
//! - severity: `error` for every rule
//!
//! Overrides precedence: CLI > config file > defaults.

use crate::rules::{IndentOption, MaxLineLengthOption, RuleSelection, RulesOption};
use anyhow::{bail, Context, Result};
use glob::Pattern;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// File names probed in each directory, in priority order.
pub const CONFIG_FILE_NAMES: [&str; 5] = [
    ".protolint.yaml",
    ".protolint.yml",
    "protolint.yaml",
    "protolint.yml",
    "protolint.toml",
];

pub const OUTPUT_FORMATS: [&str; 3] = ["human", "plain", "json"];

#[derive(Debug, Default, Deserialize, Clone)]
/// Root configuration loaded from a protolint config file.
pub struct ProtolintConfig {
    pub lint: Option<LintCfg>,
    pub output: Option<String>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// Settings under `lint`.
pub struct LintCfg {
    pub rules: Option<RulesCfg>,
    pub rules_option: Option<RulesOptionCfg>,
    #[serde(default)]
    pub ignores: Vec<IgnoreCfg>,
    pub files: Option<ExcludeCfg>,
    pub directories: Option<ExcludeCfg>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct RulesCfg {
    pub no_default: Option<bool>,
    pub all_default: Option<bool>,
    #[serde(default)]
    pub add: Vec<String>,
    #[serde(default)]
    pub remove: Vec<String>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct RulesOptionCfg {
    pub indent: Option<IndentCfg>,
    pub max_line_length: Option<MaxLineLengthCfg>,
    /// Rule id -> `error|warning|info`.
    #[serde(default)]
    pub severity: HashMap<String, String>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct IndentCfg {
    pub style: Option<IndentStyleCfg>,
    pub newline: Option<String>,
}

/// `style: 4`, `style: tab` or a literal whitespace string.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum IndentStyleCfg {
    Width(usize),
    Text(String),
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct MaxLineLengthCfg {
    pub max_chars: Option<usize>,
    pub tab_chars: Option<usize>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// Skip rule `id` for the listed files (paths or glob patterns, relative to
/// the config directory).
pub struct IgnoreCfg {
    pub id: String,
    #[serde(default)]
    pub files: Vec<String>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct ExcludeCfg {
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// A rule disabled for a set of files.
#[derive(Debug, Clone)]
pub struct Ignore {
    pub id: String,
    pub patterns: Vec<Pattern>,
}

#[derive(Debug, Clone)]
/// Fully-resolved configuration used by commands after applying precedence.
pub struct Effective {
    pub config_dir: PathBuf,
    /// The config file that was loaded, if any.
    pub config_file: Option<PathBuf>,
    pub output: String,
    pub fix: bool,
    pub selection: RuleSelection,
    pub rules_option: RulesOption,
    pub severity: HashMap<String, String>,
    pub ignores: Vec<Ignore>,
    /// Absolute, normalized paths of excluded files and directories.
    pub excludes: Vec<PathBuf>,
}

impl Effective {
    /// Severity for `rule_id`, `error` unless configured.
    pub fn severity_of(&self, rule_id: &str) -> &str {
        self.severity
            .get(rule_id)
            .map(String::as_str)
            .unwrap_or("error")
    }

    /// Whether `rule_id` is ignored for `path`.
    pub fn is_ignored(&self, rule_id: &str, path: &Path) -> bool {
        let abs = absolute(path);
        self.ignores
            .iter()
            .filter(|ig| ig.id == rule_id)
            .flat_map(|ig| ig.patterns.iter())
            .any(|p| p.matches_path(&abs))
    }
}

/// Find the directory holding the config file nearest to `start`.
///
/// Stops at the first directory containing `.git`; returns `None` when no
/// config file is found before that or before the filesystem root.
pub fn find_config(start: &Path) -> Option<PathBuf> {
    let mut cur = start;
    loop {
        for name in CONFIG_FILE_NAMES {
            let candidate = cur.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        if cur.join(".git").exists() {
            return None;
        }
        match cur.parent() {
            Some(p) if !p.as_os_str().is_empty() => cur = p,
            _ => return None,
        }
    }
}

/// Parse the config file at `path`, choosing TOML or YAML by extension.
pub fn load_config(path: &Path) -> Result<ProtolintConfig> {
    let s = fs::read_to_string(path).with_context(|| format!("read config: {}", path.display()))?;
    let cfg = if path.extension().is_some_and(|e| e == "toml") {
        toml::from_str(&s).with_context(|| format!("parse config: {}", path.display()))?
    } else if s.trim().is_empty() {
        ProtolintConfig::default()
    } else {
        serde_yaml::from_str(&s).with_context(|| format!("parse config: {}", path.display()))?
    };
    Ok(cfg)
}

/// Resolve `Effective` by merging CLI flags, the discovered config, and
/// defaults.
pub fn resolve_effective(
    cli_config_dir: Option<&str>,
    cli_output: Option<&str>,
    cli_fix: Option<bool>,
) -> Result<Effective> {
    let start = absolute(Path::new(cli_config_dir.unwrap_or(".")));
    let config_file = find_config(&start);
    let cfg = match config_file.as_deref() {
        Some(p) => load_config(p)?,
        None => ProtolintConfig::default(),
    };
    let config_dir = config_file
        .as_deref()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or(start);

    let output = cli_output
        .map(|s| s.to_string())
        .or(cfg.output)
        .unwrap_or_else(|| "human".to_string());
    if !OUTPUT_FORMATS.contains(&output.as_str()) {
        bail!(
            "unknown output format '{}' (expected one of: {})",
            output,
            OUTPUT_FORMATS.join(", ")
        );
    }
    let fix = cli_fix.unwrap_or(false);

    let lint = cfg.lint.unwrap_or_default();
    let rules = lint.rules.unwrap_or_default();
    let selection = RuleSelection {
        no_default: rules.no_default.unwrap_or(false),
        all_default: rules.all_default.unwrap_or(false),
        add: rules.add,
        remove: rules.remove,
    };

    let opts = lint.rules_option.unwrap_or_default();
    let indent_cfg = opts.indent.unwrap_or_default();
    let indent = IndentOption {
        style: match indent_cfg.style {
            Some(style) => indent_style(&style),
            None => IndentOption::default().style,
        },
        newline: match indent_cfg.newline {
            Some(nl) => newline(&nl)?,
            None => IndentOption::default().newline,
        },
    };
    let mll = opts.max_line_length.unwrap_or_default();
    let defaults = MaxLineLengthOption::default();
    let max_line_length = MaxLineLengthOption {
        max_chars: mll.max_chars.unwrap_or(defaults.max_chars),
        tab_chars: mll.tab_chars.unwrap_or(defaults.tab_chars),
    };

    for (id, level) in &opts.severity {
        if !matches!(level.as_str(), "error" | "warning" | "info") {
            bail!("severity for '{}' must be error|warning|info, got '{}'", id, level);
        }
    }

    let mut ignores = Vec::with_capacity(lint.ignores.len());
    for ig in lint.ignores {
        let patterns = ig
            .files
            .iter()
            .map(|f| glob_under(&config_dir, f))
            .collect::<Result<Vec<_>>>()?;
        ignores.push(Ignore {
            id: ig.id,
            patterns,
        });
    }

    let excludes = lint
        .files
        .unwrap_or_default()
        .exclude
        .into_iter()
        .chain(lint.directories.unwrap_or_default().exclude)
        .map(|e| normalize(&config_dir.join(e)))
        .collect();

    Ok(Effective {
        config_dir,
        config_file,
        output,
        fix,
        selection,
        rules_option: RulesOption {
            indent,
            max_line_length,
        },
        severity: opts.severity,
        ignores,
        excludes,
    })
}

/// Map a configured style to the literal indentation unit.
///
/// `tab` is a tab and a number is that many spaces; anything else is taken
/// literally and validated when the rule is built.
pub fn indent_style(style: &IndentStyleCfg) -> String {
    match style {
        IndentStyleCfg::Width(n) => " ".repeat(*n),
        IndentStyleCfg::Text(s) if s == "tab" => "\t".to_string(),
        IndentStyleCfg::Text(s) => match s.parse::<usize>() {
            Ok(n) => " ".repeat(n),
            Err(_) => s.clone(),
        },
    }
}

/// Map a configured newline (literal or `lf|crlf|cr`) to its literal form.
pub fn newline(value: &str) -> Result<String> {
    let nl = match value {
        "\n" | "lf" | "\\n" => "\n",
        "\r\n" | "crlf" | "\\r\\n" => "\r\n",
        "\r" | "cr" | "\\r" => "\r",
        other => bail!("newline must be one of lf, crlf, cr, got {:?}", other),
    };
    Ok(nl.to_string())
}

fn glob_under(base: &Path, pattern: &str) -> Result<Pattern> {
    let joined = normalize(&base.join(pattern));
    Pattern::new(&joined.to_string_lossy())
        .with_context(|| format!("invalid ignore pattern: {}", pattern))
}

/// Absolute form of `path` without touching the filesystem.
pub fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize(path)
    } else {
        match std::env::current_dir() {
            Ok(wd) => normalize(&wd.join(path)),
            Err(_) => normalize(path),
        }
    }
}

/// Drop `.` components and fold `..` where possible.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(comp);
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn write(path: &Path, body: &str) {
        let mut f = fs::File::create(path).unwrap();
        writeln!(f, "{}", body).unwrap();
    }

    #[test]
    fn test_defaults_without_config() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();

        let eff = resolve_effective(dir.path().to_str(), None, None).unwrap();
        assert!(eff.config_file.is_none());
        assert_eq!(eff.output, "human");
        assert!(!eff.fix);
        assert_eq!(eff.selection, RuleSelection::default());
        assert_eq!(eff.rules_option, RulesOption::default());
        assert_eq!(eff.severity_of("INDENT"), "error");
    }

    #[test]
    fn test_load_yaml() {
        let dir = tempdir().unwrap();
        write(
            &dir.path().join(".protolint.yaml"),
            r#"
lint:
  rules:
    no_default: true
    add:
      - INDENT
      - MAX_LINE_LENGTH
  rules_option:
    indent:
      style: 4
      newline: crlf
    max_line_length:
      max_chars: 120
    severity:
      MAX_LINE_LENGTH: warning
output: plain
"#,
        );

        let eff = resolve_effective(dir.path().to_str(), None, None).unwrap();
        assert!(eff.selection.no_default);
        assert_eq!(eff.selection.add, vec!["INDENT", "MAX_LINE_LENGTH"]);
        assert_eq!(eff.rules_option.indent.style, "    ");
        assert_eq!(eff.rules_option.indent.newline, "\r\n");
        assert_eq!(eff.rules_option.max_line_length.max_chars, 120);
        assert_eq!(eff.rules_option.max_line_length.tab_chars, 4);
        assert_eq!(eff.severity_of("MAX_LINE_LENGTH"), "warning");
        assert_eq!(eff.output, "plain");
    }

    #[test]
    fn test_load_toml_and_cli_precedence() {
        let dir = tempdir().unwrap();
        write(
            &dir.path().join("protolint.toml"),
            r#"
output = "json"
[lint.rules_option.indent]
style = "tab"
"#,
        );

        let eff = resolve_effective(dir.path().to_str(), Some("human"), Some(true)).unwrap();
        assert_eq!(eff.output, "human");
        assert!(eff.fix);
        assert_eq!(eff.rules_option.indent.style, "\t");
    }

    #[test]
    fn test_discovery_walks_up_to_git_root() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir(root.join(".git")).unwrap();
        write(&root.join("protolint.yml"), "output: json");
        let nested = root.join("a/b");
        fs::create_dir_all(&nested).unwrap();

        let found = find_config(&nested).unwrap();
        assert_eq!(found, root.join("protolint.yml"));

        let eff = resolve_effective(nested.to_str(), None, None).unwrap();
        assert_eq!(eff.output, "json");
        assert_eq!(eff.config_dir, normalize(root));
    }

    #[test]
    fn test_discovery_stops_at_git() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(&root.join("protolint.yml"), "output: json");
        let repo = root.join("repo");
        fs::create_dir_all(repo.join(".git")).unwrap();

        assert!(find_config(&repo).is_none());
    }

    #[test]
    fn test_style_forms() {
        assert_eq!(indent_style(&IndentStyleCfg::Width(2)), "  ");
        assert_eq!(indent_style(&IndentStyleCfg::Text("tab".into())), "\t");
        assert_eq!(indent_style(&IndentStyleCfg::Text("3".into())), "   ");
        assert_eq!(indent_style(&IndentStyleCfg::Text(" \t".into())), " \t");
    }

    #[test]
    fn test_bad_newline_and_output_are_errors() {
        assert!(newline("lf").is_ok());
        assert!(newline("\\r\\n").is_ok());
        assert!(newline("nl").is_err());

        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        assert!(resolve_effective(dir.path().to_str(), Some("xml"), None).is_err());
    }

    #[test]
    fn test_bad_severity_is_an_error() {
        let dir = tempdir().unwrap();
        write(
            &dir.path().join("protolint.yaml"),
            "lint:\n  rules_option:\n    severity:\n      INDENT: fatal",
        );
        assert!(resolve_effective(dir.path().to_str(), None, None).is_err());
    }

    #[test]
    fn test_ignores_and_excludes_resolve_against_config_dir() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(
            &root.join("protolint.yaml"),
            r#"
lint:
  ignores:
    - id: INDENT
      files:
        - legacy/*.proto
  files:
    exclude:
      - gen/out.proto
  directories:
    exclude:
      - vendor
"#,
        );

        let eff = resolve_effective(root.to_str(), None, None).unwrap();
        assert!(eff.is_ignored("INDENT", &root.join("legacy/old.proto")));
        assert!(!eff.is_ignored("INDENT", &root.join("api/new.proto")));
        assert!(!eff.is_ignored("MAX_LINE_LENGTH", &root.join("legacy/old.proto")));
        assert_eq!(
            eff.excludes,
            vec![normalize(&root.join("gen/out.proto")), normalize(&root.join("vendor"))]
        );
    }

    #[test]
    fn test_normalize_folds_dots() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
    }
}
