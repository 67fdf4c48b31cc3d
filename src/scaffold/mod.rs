//! Scaffolding for new unit-test sources.
//!
//! A new test is created from a template, registered with version control
//! and wired into the CMake manifest below two anchor comments.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

use crate::error::{MemtriageError, Result};

static RE_CLASS_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^[A-Za-z_][A-Za-z0-9_]*$"#).expect("valid class name regex"));

/// Where and how a test file is generated.
#[derive(Debug, Clone)]
pub struct ScaffoldConfig {
    /// Directory holding the template, the manifest and the new test.
    pub dir: PathBuf,
    pub template: PathBuf,
    pub manifest: PathBuf,
    /// Appended to the class name to form the test file name.
    pub test_file_suffix: String,
    pub sources_anchor: String,
    pub tests_anchor: String,
}

impl Default for ScaffoldConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            template: PathBuf::from("TEMPLATE"),
            manifest: PathBuf::from("CMakeLists.txt"),
            test_file_suffix: "-test.cpp".to_string(),
            sources_anchor: "#### Sources".to_string(),
            tests_anchor: "#### Tests".to_string(),
        }
    }
}

/// Names derived from a class name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestScaffold {
    pub class_name: String,
    pub file_name: String,
}

impl TestScaffold {
    pub fn new(class_name: &str, suffix: &str) -> Result<Self> {
        if !RE_CLASS_NAME.is_match(class_name) {
            return Err(MemtriageError::Scaffold(format!(
                "'{class_name}' is not a valid class name"
            )));
        }
        Ok(Self {
            class_name: class_name.to_string(),
            file_name: format!("{class_name}{suffix}"),
        })
    }

    /// `SET(SRCS_<UPPER> <file>)`
    pub fn sources_line(&self) -> String {
        format!(
            "SET(SRCS_{} {})",
            self.class_name.to_uppercase(),
            self.file_name
        )
    }

    /// `ADD_MGFP_TEST("<Class>" test_<lower> ${SRCS_<UPPER>})`
    pub fn test_line(&self) -> String {
        format!(
            "ADD_MGFP_TEST(\"{}\" test_{} ${{SRCS_{}}})",
            self.class_name,
            self.class_name.to_lowercase(),
            self.class_name.to_uppercase()
        )
    }

    /// Substitute `CLASSNAME` and `FILENAME` in a template.
    pub fn render(&self, template: &str) -> String {
        template
            .replace("CLASSNAME", &self.class_name)
            .replace("FILENAME", &self.file_name)
    }
}

/// Insert `line` after every occurrence of `anchor`.
pub fn insert_after_anchor(text: &str, anchor: &str, line: &str) -> Result<String> {
    if anchor.is_empty() || !text.contains(anchor) {
        return Err(MemtriageError::Scaffold(format!(
            "anchor '{anchor}' not found in manifest"
        )));
    }
    Ok(text.replace(anchor, &format!("{anchor}\n{line}")))
}

/// Version-control registration of generated files.
pub trait Vcs {
    fn add(&self, dir: &Path, file: &str) -> Result<()>;
    fn set_keywords(&self, dir: &Path, file: &str) -> Result<()>;
}

/// Subversion through the `svn` command line client.
#[derive(Debug, Clone)]
pub struct Svn {
    pub program: String,
}

impl Default for Svn {
    fn default() -> Self {
        Self {
            program: "svn".to_string(),
        }
    }
}

impl Svn {
    fn run(&self, dir: &Path, args: &[&str]) -> Result<()> {
        debug!(program = %self.program, ?args, "Running VCS command");
        let status = Command::new(&self.program)
            .args(args)
            .current_dir(dir)
            .status()
            .map_err(|e| MemtriageError::Scaffold(format!("{}: {}", self.program, e)))?;
        if status.success() {
            Ok(())
        } else {
            Err(MemtriageError::Scaffold(format!(
                "{} {} failed with {}",
                self.program,
                args.join(" "),
                status
            )))
        }
    }
}

impl Vcs for Svn {
    fn add(&self, dir: &Path, file: &str) -> Result<()> {
        self.run(dir, &["add", file])
    }

    fn set_keywords(&self, dir: &Path, file: &str) -> Result<()> {
        self.run(dir, &["propset", "svn:keywords", "Id", file])
    }
}

fn register(vcs: &dyn Vcs, dir: &Path, file: &str) -> Result<()> {
    vcs.add(dir, file)?;
    vcs.set_keywords(dir, file)
}

/// Files touched by [`create_test`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedTest {
    pub scaffold: TestScaffold,
    pub test_file: PathBuf,
    pub manifest: PathBuf,
}

/// Generate a test for `class_name`, register it and update the manifest.
///
/// Anchors are checked before anything is written; an existing test file is
/// never overwritten. When registration fails the new test file is removed
/// and the manifest is left as it was.
pub fn create_test(
    config: &ScaffoldConfig,
    class_name: &str,
    vcs: Option<&dyn Vcs>,
) -> Result<CreatedTest> {
    let scaffold = TestScaffold::new(class_name, &config.test_file_suffix)?;
    let test_file = config.dir.join(&scaffold.file_name);
    let manifest = config.dir.join(&config.manifest);

    if test_file.exists() {
        return Err(MemtriageError::Scaffold(format!(
            "{} already exists",
            test_file.display()
        )));
    }

    let manifest_text = std::fs::read_to_string(&manifest)?;
    let updated = insert_after_anchor(
        &manifest_text,
        &config.sources_anchor,
        &scaffold.sources_line(),
    )?;
    let updated = insert_after_anchor(&updated, &config.tests_anchor, &scaffold.test_line())?;

    let template = std::fs::read_to_string(config.dir.join(&config.template))?;
    std::fs::write(&test_file, scaffold.render(&template))?;
    info!(file = %test_file.display(), "Created test source");

    if let Some(vcs) = vcs {
        if let Err(e) = register(vcs, &config.dir, &scaffold.file_name) {
            // Undo the write; the manifest has not been touched yet
            if let Err(rm) = std::fs::remove_file(&test_file) {
                warn!(file = %test_file.display(), error = %rm, "Could not remove test source");
            }
            return Err(e);
        }
    }

    std::fs::write(&manifest, updated)?;
    info!(manifest = %manifest.display(), "Registered test in manifest");

    Ok(CreatedTest {
        scaffold,
        test_file,
        manifest,
    })
}
