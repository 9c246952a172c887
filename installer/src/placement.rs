//! Placement of verified artefacts into the install prefix.
//!
//! Every artefact is copied to a temporary sibling of its destination and
//! then renamed over it, so an interrupted install never leaves a truncated
//! executable behind.

use crate::error::{InstallerError, Result};
use crate::formula::{Artefact, DestinationCategory, validate_filename};
use crate::prefix::InstallPrefix;
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use std::fs;
use std::io;

/// A downloaded, verified file waiting in the staging directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedArtefact {
    /// The declared artefact.
    pub artefact: Artefact,
    /// Location of the verified bytes.
    pub path: Utf8PathBuf,
}

/// Copy staged artefacts into `prefix`, applying install-time renames.
///
/// All destination names are validated before the first copy, so a bad
/// name places nothing.
///
/// # Errors
///
/// Returns [`InstallerError::Placement`] if a destination name is unsafe or
/// a copy fails.
pub fn install(prefix: &InstallPrefix, staged: &[StagedArtefact]) -> Result<Vec<Utf8PathBuf>> {
    for item in staged {
        validate_filename(item.artefact.install_as()).map_err(|e| InstallerError::Placement {
            artefact: item.artefact.name().to_owned(),
            destination: prefix.dir_for(item.artefact.destination()),
            reason: e.to_string(),
        })?;
    }

    staged
        .iter()
        .map(|item| place(prefix, item))
        .collect()
}

fn place(prefix: &InstallPrefix, item: &StagedArtefact) -> Result<Utf8PathBuf> {
    let destination = prefix.destination_of(&item.artefact);
    let placement_error = |e: io::Error| InstallerError::Placement {
        artefact: item.artefact.name().to_owned(),
        destination: destination.clone(),
        reason: e.to_string(),
    };

    let dir = prefix.dir_for(item.artefact.destination());
    fs::create_dir_all(&dir).map_err(placement_error)?;
    copy_atomically(
        &item.path,
        &dir,
        &destination,
        mode_for(item.artefact.destination()),
    )
    .map_err(placement_error)?;

    debug!("installed {} to {destination}", item.artefact.name());
    Ok(destination)
}

fn copy_atomically(
    source: &Utf8Path,
    dir: &Utf8Path,
    destination: &Utf8Path,
    mode: u32,
) -> io::Result<()> {
    let mut temp = tempfile::Builder::new()
        .prefix(".vol-installer-")
        .tempfile_in(dir)?;
    io::copy(&mut fs::File::open(source)?, temp.as_file_mut())?;
    temp.as_file().sync_all()?;
    set_mode(temp.path(), mode)?;
    temp.persist(destination).map_err(|e| e.error)?;
    Ok(())
}

fn mode_for(category: DestinationCategory) -> u32 {
    match category {
        DestinationCategory::Executable => 0o755,
        DestinationCategory::Completion(_) => 0o644,
    }
}

#[cfg(unix)]
fn set_mode(path: &std::path::Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &std::path::Path, _mode: u32) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::{Formula, Shell};
    use crate::test_utils::{BINARY_BYTES, completion_fixture, formula_v2_0_0, formula_v2_0_23};

    struct Fixture {
        _temp: tempfile::TempDir,
        staging: Utf8PathBuf,
        prefix: InstallPrefix,
    }

    fn fixture() -> Fixture {
        let temp = tempfile::tempdir().expect("temp dir");
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 path");
        let staging = root.join("staging");
        fs::create_dir_all(&staging).expect("staging dir");
        Fixture {
            _temp: temp,
            staging,
            prefix: InstallPrefix::new(root.join("prefix")),
        }
    }

    fn stage(fixture: &Fixture, formula: &Formula) -> Vec<StagedArtefact> {
        formula
            .artefacts()
            .map(|artefact| {
                let bytes = match artefact.destination() {
                    DestinationCategory::Executable => BINARY_BYTES,
                    DestinationCategory::Completion(shell) => completion_fixture(shell).1,
                };
                let path = fixture.staging.join(artefact.filename());
                fs::write(&path, bytes).expect("write staged file");
                StagedArtefact {
                    artefact: artefact.clone(),
                    path,
                }
            })
            .collect()
    }

    #[test]
    fn primary_only_places_one_file() {
        let fixture = fixture();
        let staged = stage(&fixture, &formula_v2_0_0());

        let placed = install(&fixture.prefix, &staged).expect("install");

        assert_eq!(placed, [fixture.prefix.bin_dir().join("vol")]);
        assert_eq!(fs::read(&placed[0]).expect("read"), BINARY_BYTES);
    }

    #[test]
    fn full_release_places_four_files_with_bash_renamed() {
        let fixture = fixture();
        let staged = stage(&fixture, &formula_v2_0_23());

        let placed = install(&fixture.prefix, &staged).expect("install");

        assert_eq!(placed.len(), 4);
        let bash = fixture.prefix.completion_dir(Shell::Bash).join("vol");
        assert!(placed.contains(&bash));
        assert!(!fixture.prefix.completion_dir(Shell::Bash).join("vol.bash").exists());
        assert!(fixture.prefix.completion_dir(Shell::Zsh).join("_vol").is_file());
        assert!(fixture.prefix.completion_dir(Shell::Fish).join("vol.fish").is_file());
    }

    #[cfg(unix)]
    #[test]
    fn executable_is_world_executable() {
        use std::os::unix::fs::PermissionsExt;

        let fixture = fixture();
        let placed = install(&fixture.prefix, &stage(&fixture, &formula_v2_0_0())).expect("install");
        let mode = fs::metadata(&placed[0]).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn existing_files_are_replaced() {
        let fixture = fixture();
        let bin = fixture.prefix.bin_dir();
        fs::create_dir_all(&bin).expect("bin dir");
        fs::write(bin.join("vol"), b"old").expect("seed old binary");

        install(&fixture.prefix, &stage(&fixture, &formula_v2_0_0())).expect("install");

        assert_eq!(fs::read(bin.join("vol")).expect("read"), BINARY_BYTES);
        let leftovers = fs::read_dir(&bin).expect("list bin").count();
        assert_eq!(leftovers, 1, "no temporary siblings remain");
    }

    #[test]
    fn missing_staged_file_is_a_placement_error() {
        let fixture = fixture();
        let staged = vec![StagedArtefact {
            artefact: formula_v2_0_0().binary().clone(),
            path: fixture.staging.join("absent"),
        }];

        let err = install(&fixture.prefix, &staged).expect_err("nothing to copy");
        assert!(matches!(err, InstallerError::Placement { .. }));
    }
}
