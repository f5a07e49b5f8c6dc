//! CLI: check | normalize | suite | rules
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use rayon::prelude::*;
use serde_json::Value;
use tracing::{debug, info};

use json_ruleset::path_de::{from_slice_with_path, from_str_with_path};
use json_ruleset::suite::{CaseOutcome, SuiteFile};
use json_ruleset::{Challenger, Normalizer, RecordMode, Ruleset, RuleProvider, StandardRules};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// validate JSON documents against declarative rulesets
#[derive(Parser, Debug)]
#[command(name = "json-ruleset", version, about)]
pub struct CommandLineInterface {
    /// more logging; repeat for more (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// validate documents against a ruleset
    Check(CheckOut),
    /// print the canonical form of a ruleset
    Normalize(NormalizeOut),
    /// run case files (ruleset + subjects + expected outcomes)
    Suite(SuiteOut),
    /// list the standard rules after checking their integrity
    Rules,
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items/0/payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// JQ pre-process filter for each document; every output is checked
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum RecordArg {
    Off,
    First,
    All,
}

impl From<RecordArg> for RecordMode {
    fn from(arg: RecordArg) -> Self {
        match arg {
            RecordArg::Off => RecordMode::Off,
            RecordArg::First => RecordMode::StopAtFirst,
            RecordArg::All => RecordMode::Continue,
        }
    }
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    /// ruleset file (raw JSON rule description)
    #[arg(long)]
    rules: PathBuf,

    #[command(flatten)]
    input_settings: InputSettings,

    /// failure recording
    #[arg(long, value_enum, default_value_t = RecordArg::First)]
    record: RecordArg,

    /// key path of each top-level subject in records
    #[arg(long, default_value = json_ruleset::ROOT)]
    root_name: String,
}

#[derive(clap::Parser, Debug)]
struct NormalizeOut {
    /// ruleset file (raw JSON rule description)
    #[arg(long)]
    rules: PathBuf,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct SuiteOut {
    /// case files; literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

/// Outcome of one subject of one input file.
struct SubjectReport {
    label: String,
    passed: bool,
    record: Vec<String>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    /// Reads one input file and applies NDJSON splitting, the JSON pointer
    /// and the jq filter, in that order.
    fn load_documents(&self, source_path: &Path) -> Result<Vec<Value>> {
        let source = std::fs::read(source_path)
            .with_context(|| format!("failed to read {}", source_path.display()))?;

        let documents: Vec<Value> = if self.ndjson {
            let text = std::str::from_utf8(&source)
                .with_context(|| format!("{} is not UTF-8", source_path.display()))?;
            text.lines()
                .enumerate()
                .filter(|(_, line)| !line.trim().is_empty())
                .map(|(n, line)| {
                    from_str_with_path(line)
                        .with_context(|| format!("{} line {}", source_path.display(), n + 1))
                })
                .collect::<Result<_>>()?
        } else {
            vec![from_slice_with_path(&source).with_context(|| format!("failed to parse {}", source_path.display()))?]
        };

        let documents = match self.json_pointer.as_deref() {
            None => documents,
            Some(pointer) => documents
                .into_iter()
                .map(|doc| {
                    doc.pointer(pointer)
                        .cloned()
                        .ok_or_else(|| anyhow!("JSON pointer {pointer} matched nothing in {}", source_path.display()))
                })
                .collect::<Result<_>>()?,
        };

        match self.jq_expr.as_deref() {
            None => Ok(documents),
            Some(jq_expr) => {
                let mut out = Vec::new();
                for doc in &documents {
                    let results = crate::jq_exec::run_jaq(jq_expr, doc).with_context(|| {
                        format!("failed to apply jq expression to {}", source_path.display())
                    })?;
                    out.extend(results);
                }
                Ok(out)
            }
        }
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn verbosity(&self) -> u8 {
        self.verbose
    }

    /// `Ok(false)` when some subject or case failed.
    pub fn run(&self) -> Result<bool> {
        match &self.cmd {
            Command::Check(target) => target.run(),
            Command::Normalize(target) => target.run(),
            Command::Suite(target) => target.run(),
            Command::Rules => list_rules(),
        }
    }
}

impl CheckOut {
    fn run(&self) -> Result<bool> {
        let provider = StandardRules::new();
        let ruleset = load_ruleset(&provider, &self.rules)?;
        let mode = RecordMode::from(self.record);
        let paths = resolve_file_path_patterns(&self.input_settings.input)?;
        info!(files = paths.len(), ?mode, "checking");

        // one challenger per file
        let reports: Vec<(PathBuf, Result<Vec<SubjectReport>>)> = paths
            .into_par_iter()
            .map(|path| {
                let report = self.check_file(&provider, &ruleset, mode, &path);
                (path, report)
            })
            .collect();

        let mut all_passed = true;
        for (path, report) in reports {
            match report {
                Ok(subjects) => {
                    for subject in subjects {
                        all_passed &= subject.passed;
                        print_subject(&subject);
                    }
                }
                Err(error) => {
                    all_passed = false;
                    println!("{} {}: {error:#}", "ERROR".red().bold(), path.display());
                }
            }
        }
        Ok(all_passed)
    }

    fn check_file(
        &self,
        provider: &StandardRules,
        ruleset: &Ruleset,
        mode: RecordMode,
        path: &Path,
    ) -> Result<Vec<SubjectReport>> {
        let documents = self.input_settings.load_documents(path)?;
        let mut challenger = Challenger::new(provider).with_record(mode);
        let many = documents.len() > 1;
        let mut out = Vec::with_capacity(documents.len());
        for (i, subject) in documents.iter().enumerate() {
            let passed = challenger
                .challenge(subject, ruleset, &self.root_name)
                .with_context(|| format!("{} document {i}", path.display()))?;
            let label = if many { format!("{}#{i}", path.display()) } else { path.display().to_string() };
            debug!(%label, passed, "challenged");
            out.push(SubjectReport { label, passed, record: challenger.record_lines() });
        }
        Ok(out)
    }
}

impl NormalizeOut {
    fn run(&self) -> Result<bool> {
        let provider = StandardRules::new();
        let ruleset = load_ruleset(&provider, &self.rules)?;
        let canonical = serde_json::to_string_pretty(&ruleset.to_raw())?;
        match self.out.as_ref() {
            Some(out) => {
                if let Some(parent) = out.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(out, &canonical).with_context(|| format!("failed to write {}", out.display()))?;
            }
            None => println!("{canonical}"),
        }
        Ok(true)
    }
}

impl SuiteOut {
    fn run(&self) -> Result<bool> {
        let provider = StandardRules::new();
        let paths = resolve_file_path_patterns(&self.input)?;

        let results: Vec<(PathBuf, Result<Vec<CaseOutcome>>)> = paths
            .into_par_iter()
            .map(|path| {
                let outcomes = run_suite_file(&provider, &path);
                (path, outcomes)
            })
            .collect();

        let (mut ok, mut failed) = (0usize, 0usize);
        for (path, result) in results {
            println!("{}", path.display().to_string().bold());
            match result {
                Ok(outcomes) => {
                    for outcome in outcomes {
                        if outcome.ok() {
                            ok += 1;
                            println!("  {} {}", "ok".green(), outcome.name);
                        } else {
                            failed += 1;
                            print_mismatch(&outcome);
                        }
                    }
                }
                Err(error) => {
                    failed += 1;
                    println!("  {} {error:#}", "ERROR".red().bold());
                }
            }
        }
        println!("{ok} passed, {failed} failed");
        Ok(failed == 0)
    }
}

fn run_suite_file(provider: &StandardRules, path: &Path) -> Result<Vec<CaseOutcome>> {
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let suite: SuiteFile = from_slice_with_path(&bytes).with_context(|| format!("invalid case file {}", path.display()))?;
    Ok(suite.run(provider)?)
}

fn list_rules() -> Result<bool> {
    let provider = StandardRules::new();
    provider.integrity().context("standard rules failed their integrity check")?;
    for d in provider.descriptors() {
        let kind = if d.type_checking { "type" } else { "pattern" };
        let arity = if d.params_required == d.params_allowed {
            d.params_required.to_string()
        } else {
            format!("{}..={}", d.params_required, d.params_allowed)
        };
        let legacy = d.renamed_from.map(|old| format!("(was {old})")).unwrap_or_default();
        let guard = if d.type_checking { "" } else { provider.type_guard(d.semantic_type).unwrap_or("?") };
        println!(
            "{} {:<8} {:<18} {:<5} {:<18} {}",
            format!("{:<22}", d.name).bold(),
            kind,
            d.semantic_type.to_string(),
            arity,
            guard,
            legacy.dimmed()
        );
    }
    Ok(true)
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn load_ruleset(provider: &StandardRules, path: &Path) -> Result<Ruleset> {
    let bytes = std::fs::read(path).with_context(|| format!("failed to read ruleset {}", path.display()))?;
    let raw: Value = from_slice_with_path(&bytes).with_context(|| format!("failed to parse ruleset {}", path.display()))?;
    Normalizer::new(provider)
        .normalize(&raw)
        .with_context(|| format!("invalid ruleset {}", path.display()))
}

fn print_subject(subject: &SubjectReport) {
    if subject.passed {
        println!("{} {}", "PASS".green().bold(), subject.label);
    } else {
        println!("{} {}", "FAIL".red().bold(), subject.label);
    }
    for line in &subject.record {
        println!("    {line}");
    }
}

fn print_mismatch(outcome: &CaseOutcome) {
    println!(
        "  {} {}: expected {}, got {}",
        "FAILED".red().bold(),
        outcome.name,
        verdict(outcome.expected),
        verdict(outcome.actual)
    );
    if !outcome.record_matches {
        println!("    record differs from the expected one:");
    }
    for line in &outcome.record {
        println!("    {line}");
    }
}

fn verdict(passed: bool) -> &'static str {
    if passed { "pass" } else { "fail" }
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern).with_context(|| format!("bad glob pattern {pattern}"))? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_check() {
        let cli = CommandLineInterface::try_parse_from([
            "json-ruleset", "-vv", "check", "--rules", "bike.json", "-i", "a.json", "b.json", "--record", "all",
        ])
        .unwrap();
        assert_eq!(cli.verbosity(), 2);
        let Command::Check(args) = cli.cmd else { panic!("expected check") };
        assert_eq!(args.rules, PathBuf::from("bike.json"));
        assert_eq!(args.input_settings.input, ["a.json", "b.json"]);
        assert_eq!(RecordMode::from(args.record), RecordMode::Continue);
        assert_eq!(args.root_name, "root");
    }

    #[test]
    fn parse_rules_and_suite() {
        let cli = CommandLineInterface::try_parse_from(["json-ruleset", "rules"]).unwrap();
        assert!(matches!(cli.cmd, Command::Rules));
        assert!(CommandLineInterface::try_parse_from(["json-ruleset", "suite"]).is_err());
    }

    #[test]
    fn literal_paths_pass_through() {
        let paths = resolve_file_path_patterns(["x.json", "dir/y.json"]).unwrap();
        assert_eq!(paths, [PathBuf::from("x.json"), PathBuf::from("dir/y.json")]);
    }

    #[test]
    fn input_pipeline_applies_pointer_and_jq() {
        let dir = std::env::temp_dir().join(format!("json-ruleset-cli-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("docs.ndjson");
        std::fs::write(&path, "{\"data\": {\"xs\": [1, 2]}}\n\n{\"data\": {\"xs\": [3]}}\n").unwrap();

        let settings = InputSettings {
            ndjson: true,
            json_pointer: Some("/data".into()),
            jq_expr: Some(".xs[]".into()),
            input: vec![],
        };
        let docs = settings.load_documents(&path).unwrap();
        assert_eq!(docs, [Value::from(1), Value::from(2), Value::from(3)]);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
