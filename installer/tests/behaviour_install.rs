//! BDD tests for the fetch, verify, place, and test install workflow.

use camino::{Utf8Path, Utf8PathBuf};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::time::Duration;
use vol_installer::artefact::verification::CompletionFailurePolicy;
use vol_installer::error::InstallerError;
use vol_installer::formula::{Formula, Shell};
use vol_installer::pipeline::{InstallOptions, InstallReport, install_release_with};
use vol_installer::prefix::{InstallPrefix, LOCK_FILENAME};
use vol_installer::test_utils::{
    StubAsset, StubDownloader, StubOutcome, StubRunner, formula_v2_0_0, formula_v2_0_23,
};

struct InstallWorld {
    _temp_dir: tempfile::TempDir,
    prefix: InstallPrefix,
    formula: Option<Formula>,
    downloader: Option<StubDownloader>,
    runner: StubRunner,
    policy: CompletionFailurePolicy,
    result: Option<Result<InstallReport, InstallerError>>,
}

#[fixture]
fn world() -> InstallWorld {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let root = Utf8PathBuf::try_from(temp_dir.path().join("prefix")).expect("UTF-8 path");
    InstallWorld {
        _temp_dir: temp_dir,
        prefix: InstallPrefix::new(root),
        formula: None,
        downloader: None,
        runner: StubRunner::new(StubOutcome::Exit(0)),
        policy: CompletionFailurePolicy::Warn,
        result: None,
    }
}

fn placed_files(root: &Utf8Path) -> Vec<Utf8PathBuf> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_owned()];
    while let Some(dir) = pending.pop() {
        let Ok(entries) = dir.read_dir_utf8() else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.into_path();
            if path.is_dir() {
                pending.push(path);
            } else if path.file_name() != Some(LOCK_FILENAME) {
                files.push(path);
            }
        }
    }
    files
}

fn report(world: &InstallWorld) -> &InstallReport {
    match world.result.as_ref().expect("result set") {
        Ok(report) => report,
        Err(err) => panic!("expected install to succeed, got {err}"),
    }
}

fn error(world: &InstallWorld) -> &InstallerError {
    match world.result.as_ref().expect("result set") {
        Ok(report) => panic!("expected install to fail, got {report:?}"),
        Err(err) => err,
    }
}

#[given("the formula for vol \"{version}\"")]
fn given_formula(world: &mut InstallWorld, version: String) {
    let formula = match version.as_str() {
        "2.0.0" => formula_v2_0_0(),
        "2.0.23" => formula_v2_0_23(),
        other => panic!("no fixture formula for {other}"),
    };
    world.formula = Some(formula);
}

#[given("an upstream serving every asset intact")]
fn given_intact_upstream(world: &mut InstallWorld) {
    world.downloader = Some(StubDownloader::serving_fixtures());
}

#[given("an upstream serving a corrupted \"{filename}\"")]
fn given_corrupted_asset(world: &mut InstallWorld, filename: String) {
    world.downloader = Some(StubDownloader::serving_fixtures().corrupting(&filename));
}

#[given("an upstream without \"{filename}\"")]
fn given_missing_asset(world: &mut InstallWorld, filename: String) {
    world.downloader =
        Some(StubDownloader::serving_fixtures().with_asset(&filename, StubAsset::NotFound));
}

#[given("strict completion handling")]
fn given_strict_completions(world: &mut InstallWorld) {
    world.policy = CompletionFailurePolicy::Fail;
}

#[given("an executable exiting with status {code}")]
fn given_failing_executable(world: &mut InstallWorld, code: i32) {
    world.runner = StubRunner::new(StubOutcome::Exit(code));
}

#[when("the release is installed")]
fn when_release_installed(world: &mut InstallWorld) {
    let formula = world.formula.as_ref().expect("formula set");
    let downloader = world.downloader.as_ref().expect("downloader set");
    let options = InstallOptions {
        prefix: world.prefix.clone(),
        completion_policy: world.policy,
        run_test: true,
        test_timeout: Duration::from_secs(30),
        quiet: true,
    };
    let mut stderr = Vec::new();
    let result = install_release_with(formula, &options, downloader, &world.runner, &mut stderr);
    world.result = Some(result);
}

#[then("the install succeeds")]
fn then_install_succeeds(world: &mut InstallWorld) {
    let _ = report(world);
}

#[then("{count} file is placed in the prefix")]
fn then_one_file_placed(world: &mut InstallWorld, count: usize) {
    assert_eq!(placed_files(world.prefix.root()).len(), count);
    assert_eq!(report(world).placed().len(), count);
}

#[then("{count} files are placed in the prefix")]
fn then_files_placed(world: &mut InstallWorld, count: usize) {
    assert_eq!(placed_files(world.prefix.root()).len(), count);
    assert_eq!(report(world).placed().len(), count);
}

#[then("nothing is placed in the prefix")]
fn then_nothing_placed(world: &mut InstallWorld) {
    let placed = placed_files(world.prefix.root());
    assert!(placed.is_empty(), "unexpected files: {placed:?}");
}

#[then("the acceptance test ran \"{command}\"")]
fn then_acceptance_ran(world: &mut InstallWorld, command: String) {
    let calls = world.runner.calls();
    let (program, args) = calls.first().expect("acceptance test ran");
    let line = format!(
        "{} {}",
        program
            .strip_prefix(world.prefix.root())
            .expect("program inside prefix"),
        args.join(" ")
    );
    assert_eq!(line, command);
}

#[then("the bash completion is installed as \"{name}\"")]
fn then_bash_completion_renamed(world: &mut InstallWorld, name: String) {
    let bash_dir = world.prefix.completion_dir(Shell::Bash);
    assert!(bash_dir.join(&name).is_file());
    assert!(!bash_dir.join("vol.bash").exists());
}

#[then("the report warns about \"{name}\"")]
fn then_report_warns(world: &mut InstallWorld, name: String) {
    let report = report(world);
    assert!(report.is_degraded());
    let warned = report
        .artefacts
        .iter()
        .find(|artefact| artefact.name == name)
        .and_then(|artefact| artefact.warning.as_deref());
    assert!(warned.is_some(), "expected a warning for {name}");
}

#[then("the install fails with an integrity error")]
fn then_integrity_error(world: &mut InstallWorld) {
    let err = error(world);
    assert!(err.is_integrity_failure(), "expected Integrity, got {err:?}");
}

#[then("the install fails with an unresolved version error")]
fn then_unresolved_error(world: &mut InstallWorld) {
    let err = error(world);
    assert!(
        matches!(err, InstallerError::UnresolvedVersion { .. }),
        "expected UnresolvedVersion, got {err:?}"
    );
}

#[then("the install fails with a smoke test error")]
fn then_smoke_test_error(world: &mut InstallWorld) {
    let err = error(world);
    assert!(
        matches!(err, InstallerError::SmokeTest { .. }),
        "expected SmokeTest, got {err:?}"
    );
}

#[scenario(
    path = "tests/features/install.feature",
    name = "Release 2.0.0 installs only the executable"
)]
fn scenario_install_2_0_0(world: InstallWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/install.feature",
    name = "Release 2.0.23 installs the executable and three completions"
)]
fn scenario_install_2_0_23(world: InstallWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/install.feature",
    name = "A corrupted executable is never installed"
)]
fn scenario_corrupted_executable(world: InstallWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/install.feature",
    name = "A corrupted completion degrades the install"
)]
fn scenario_corrupted_completion(world: InstallWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/install.feature",
    name = "Strict completions refuse a corrupted completion"
)]
fn scenario_strict_completions(world: InstallWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/install.feature",
    name = "A missing upstream release is unresolved"
)]
fn scenario_missing_release(world: InstallWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/install.feature",
    name = "An executable failing its acceptance test"
)]
fn scenario_smoke_test_failure(world: InstallWorld) {
    let _ = world;
}
