//! Dependency upgrader: `npm outdated --json`, manifest rewrite, `npm install`.
//!
//! Outdated entries are found on an order-preserving `serde_json::Value`; the
//! file itself is edited by replacing only the changed version strings, so
//! every other byte (indentation, escapes, key order) stays as it was.

use serde_json::{Map, Value};
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::RunError;
use crate::process::ProcessRunner;
use crate::util::display_command;

pub const MANIFEST_FILE: &str = "package.json";

/// Manifest sections whose constraints may be rewritten
pub const DEPENDENCY_SECTIONS: [&str; 2] = ["dependencies", "devDependencies"];

/// One row of `npm outdated --json`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutdatedPackage {
    pub name: String,
    /// Absent when the package is declared but not installed
    pub current: Option<String>,
    pub wanted: Option<String>,
    pub latest: String,
}

/// A constraint that was rewritten in the manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upgrade {
    pub name: String,
    pub section: String,
    pub from: String,
    pub to: String,
}

pub struct Upgrader<'a> {
    runner: &'a dyn ProcessRunner,
    package_manager: String,
}

impl<'a> Upgrader<'a> {
    pub fn new(runner: &'a dyn ProcessRunner, package_manager: impl Into<String>) -> Self {
        Self {
            runner,
            package_manager: package_manager.into(),
        }
    }

    /// Upgrade every outdated dependency of the project to its latest version.
    ///
    /// Returns the rewrites performed. The manifest and lockfile are left as
    /// mutated if a later step fails.
    pub fn upgrade(&self, project_dir: &Path) -> Result<Vec<Upgrade>, RunError> {
        let manifest_path = project_dir.join(MANIFEST_FILE);
        let (original, mut manifest) = read_manifest(&manifest_path)?;

        let outdated = self.outdated(project_dir)?;
        info!("{} outdated package(s) reported", outdated.len());

        let upgrades = apply_upgrades(&mut manifest, &outdated);
        if upgrades.is_empty() {
            info!("Manifest already up to date");
            return Ok(upgrades);
        }

        write_manifest(&manifest_path, &original, &manifest, &upgrades)?;
        for upgrade in &upgrades {
            debug!(
                "{} {}: {} -> {}",
                upgrade.section, upgrade.name, upgrade.from, upgrade.to
            );
        }

        self.install(project_dir)?;
        Ok(upgrades)
    }

    /// Ask the package manager which packages are behind their latest release
    pub fn outdated(&self, project_dir: &Path) -> Result<Vec<OutdatedPackage>, RunError> {
        let args = ["outdated", "--json"];
        let output = self.runner.run(&self.package_manager, &args, project_dir)?;

        // npm exits 1 whenever something is outdated
        if !matches!(output.exit_code, Some(0) | Some(1)) {
            return Err(RunError::Upgrade {
                reason: format!(
                    "`{}` exited with {}",
                    display_command(&self.package_manager, &args),
                    output.status_label()
                ),
                stderr: output.stderr,
            });
        }

        parse_outdated(&output.stdout).map_err(|reason| RunError::Upgrade {
            reason,
            stderr: output.stderr,
        })
    }

    fn install(&self, project_dir: &Path) -> Result<(), RunError> {
        let args = ["install"];
        info!(
            "Installing updated packages with `{}`",
            display_command(&self.package_manager, &args)
        );
        let output = self.runner.run(&self.package_manager, &args, project_dir)?;
        if !output.success() {
            return Err(RunError::Upgrade {
                reason: format!(
                    "`{}` exited with {}",
                    display_command(&self.package_manager, &args),
                    output.status_label()
                ),
                stderr: output.stderr,
            });
        }
        Ok(())
    }
}

/// Parse the JSON printed by `npm outdated --json`.
///
/// Empty output means nothing is outdated. Workspace projects report an array
/// per package; the first entry is used.
pub fn parse_outdated(stdout: &str) -> Result<Vec<OutdatedPackage>, String> {
    if stdout.trim().is_empty() {
        return Ok(Vec::new());
    }

    let value: Value = serde_json::from_str(stdout)
        .map_err(|e| format!("could not parse outdated report: {}", e))?;
    let Value::Object(entries) = value else {
        return Err("outdated report is not a JSON object".to_string());
    };

    if let Some(error) = entries.get("error").filter(|e| e.is_object()) {
        let summary = error
            .get("summary")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(format!("package manager reported an error: {}", summary));
    }

    let mut packages = Vec::with_capacity(entries.len());
    for (name, entry) in &entries {
        let entry = match entry {
            Value::Array(items) => items.first(),
            other => Some(other),
        };
        let field = |key: &str| {
            entry
                .and_then(|e| e.get(key))
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        let Some(latest) = field("latest") else {
            return Err(format!("outdated entry for {} has no latest version", name));
        };
        packages.push(OutdatedPackage {
            name: name.clone(),
            current: field("current"),
            wanted: field("wanted"),
            latest,
        });
    }
    Ok(packages)
}

/// Rewrite outdated constraints in place; everything else is left untouched.
pub fn apply_upgrades(
    manifest: &mut Map<String, Value>,
    outdated: &[OutdatedPackage],
) -> Vec<Upgrade> {
    let mut upgrades = Vec::new();
    for section in DEPENDENCY_SECTIONS {
        let Some(Value::Object(deps)) = manifest.get_mut(section) else {
            continue;
        };
        for package in outdated {
            let Some(slot) = deps.get_mut(&package.name) else {
                continue;
            };
            let from = match slot.as_str() {
                Some(s) => s.to_string(),
                None => slot.to_string(),
            };
            if from == package.latest {
                continue;
            }
            *slot = Value::String(package.latest.clone());
            upgrades.push(Upgrade {
                name: package.name.clone(),
                section: section.to_string(),
                from,
                to: package.latest.clone(),
            });
        }
    }
    upgrades
}

/// Read `package.json`, returning the raw text and its top-level object
pub fn read_manifest(path: &Path) -> Result<(String, Map<String, Value>), RunError> {
    let manifest_error = |reason: String| RunError::Manifest {
        path: path.to_path_buf(),
        reason,
    };
    let raw = fs::read_to_string(path).map_err(|e| manifest_error(e.to_string()))?;
    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(map)) => Ok((raw, map)),
        Ok(_) => Err(manifest_error("top-level value is not an object".to_string())),
        Err(e) => Err(manifest_error(e.to_string())),
    }
}

/// Write the upgraded manifest. The changed values are spliced into the
/// original text; if one cannot be located there the whole object is
/// re-serialised with two-space indentation instead.
fn write_manifest(
    path: &Path,
    original: &str,
    manifest: &Map<String, Value>,
    upgrades: &[Upgrade],
) -> Result<(), RunError> {
    let manifest_error = |reason: String| RunError::Manifest {
        path: PathBuf::from(path),
        reason,
    };
    let text = match splice_versions(original, upgrades) {
        Some(text) => text,
        None => {
            debug!("Could not splice versions into {}, re-serialising", path.display());
            let mut text = serde_json::to_string_pretty(manifest)
                .map_err(|e| manifest_error(e.to_string()))?;
            if original.ends_with('\n') {
                text.push('\n');
            }
            text
        }
    };
    fs::write(path, text).map_err(|e| manifest_error(e.to_string()))
}

/// Replace the value of every upgraded entry in `original` with its new
/// version. `None` if any entry cannot be found.
fn splice_versions(original: &str, upgrades: &[Upgrade]) -> Option<String> {
    let bytes = original.as_bytes();
    let root_start = skip_ws(bytes, 0);
    if bytes.get(root_start) != Some(&b'{') {
        return None;
    }
    let root = root_start..value_end(bytes, root_start)?;

    let mut edits = Vec::with_capacity(upgrades.len());
    for upgrade in upgrades {
        let section = member_span(original, root.clone(), &upgrade.section)?;
        if bytes[section.start] != b'{' {
            return None;
        }
        let value = member_span(original, section, &upgrade.name)?;
        edits.push((value, Value::String(upgrade.to.clone()).to_string()));
    }

    // Back to front so earlier spans stay valid
    edits.sort_by_key(|(span, _)| std::cmp::Reverse(span.start));
    let mut text = original.to_string();
    for (span, replacement) in edits {
        text.replace_range(span, &replacement);
    }
    Some(text)
}

/// Span of the value of `key` among the direct members of the object that
/// occupies `object` in `text`
fn member_span(text: &str, object: Range<usize>, key: &str) -> Option<Range<usize>> {
    let bytes = text.as_bytes();
    let mut pos = object.start + 1;
    while pos < object.end {
        pos = skip_ws(bytes, pos);
        match bytes.get(pos)? {
            b',' => {
                pos += 1;
                continue;
            }
            b'"' => {}
            _ => return None,
        }
        let key_end = string_end(bytes, pos)?;
        let name: String = serde_json::from_str(&text[pos..key_end]).ok()?;
        pos = skip_ws(bytes, key_end);
        if bytes.get(pos) != Some(&b':') {
            return None;
        }
        let value_start = skip_ws(bytes, pos + 1);
        let value_end = value_end(bytes, value_start)?;
        if name == key {
            return Some(value_start..value_end);
        }
        pos = value_end;
    }
    None
}

fn skip_ws(bytes: &[u8], mut pos: usize) -> usize {
    while bytes.get(pos).is_some_and(|b| b.is_ascii_whitespace()) {
        pos += 1;
    }
    pos
}

/// End (exclusive) of the string literal opening at `start`
fn string_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut pos = start + 1;
    loop {
        match bytes.get(pos)? {
            b'\\' => pos += 2,
            b'"' => return Some(pos + 1),
            _ => pos += 1,
        }
    }
}

/// End (exclusive) of the JSON value starting at `start`
fn value_end(bytes: &[u8], start: usize) -> Option<usize> {
    match bytes.get(start)? {
        b'"' => string_end(bytes, start),
        b'{' | b'[' => {
            let mut depth = 0usize;
            let mut pos = start;
            loop {
                match bytes.get(pos)? {
                    b'"' => {
                        pos = string_end(bytes, pos)?;
                        continue;
                    }
                    b'{' | b'[' => depth += 1,
                    b'}' | b']' => {
                        depth -= 1;
                        if depth == 0 {
                            return Some(pos + 1);
                        }
                    }
                    _ => {}
                }
                pos += 1;
            }
        }
        _ => {
            let mut pos = start;
            while bytes
                .get(pos)
                .is_some_and(|b| !matches!(b, b',' | b'}' | b']') && !b.is_ascii_whitespace())
            {
                pos += 1;
            }
            Some(pos)
        }
    }
}
