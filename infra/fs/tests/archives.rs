use std::path::Path;

use shed_fs::{ArchiveFormat, FsError};
use tempfile::tempdir;

fn seed(src: &Path) {
    shed_fs::write_string(src.join("readme.md"), "hello archive", false).unwrap();
    shed_fs::write_string(src.join("data/rows.csv"), "1,2,3\n4,5,6\n", false).unwrap();
    shed_fs::write_bytes(src.join("data/blob.bin"), [0u8, 1, 2, 250], false).unwrap();
}

fn assert_tree(out: &Path) {
    assert_eq!(shed_fs::read_string(out.join("readme.md")).unwrap(), "hello archive");
    assert_eq!(shed_fs::read_string(out.join("data/rows.csv")).unwrap(), "1,2,3\n4,5,6\n");
    assert_eq!(shed_fs::read_bytes(out.join("data/blob.bin")).unwrap(), [0u8, 1, 2, 250]);
}

fn round_trip(archive_name: &str) {
    let dir = tempdir().unwrap();
    let src = dir.path().join("src");
    seed(&src);

    let archive = shed_fs::pack(&src, dir.path().join(archive_name)).unwrap();
    assert!(archive.is_file());

    let out = dir.path().join("out");
    shed_fs::unpack(&archive, &out).unwrap();
    assert_tree(&out);
}

#[test]
fn zip_round_trip() {
    round_trip("backup.zip");
}

#[test]
fn tar_round_trip() {
    round_trip("backup.tar");
}

#[test]
fn tar_gz_round_trip() {
    round_trip("backup.tar.gz");
}

#[test]
fn tgz_alias_is_recognized() {
    round_trip("backup.tgz");
}

#[test]
fn explicit_format_overrides_the_file_name() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("src");
    seed(&src);

    let dest = dir.path().join("snapshot.bin");
    shed_fs::pack_as(&src, &dest, ArchiveFormat::Zip).unwrap();

    // The name alone gives no format away.
    assert_eq!(ArchiveFormat::from_path(&dest), None);

    let out = dir.path().join("out");
    shed_fs::unpack_as(&dest, &out, ArchiveFormat::Zip).unwrap();
    assert_tree(&out);
}

#[test]
fn zip_preserves_empty_directories() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("src");
    shed_fs::create_dir(src.join("logs")).unwrap();
    shed_fs::write_string(src.join("app.cfg"), "x=1", false).unwrap();

    let archive = shed_fs::pack(&src, dir.path().join("cfg.zip")).unwrap();
    let out = dir.path().join("out");
    shed_fs::unpack(&archive, &out).unwrap();

    assert!(shed_fs::is_dir(out.join("logs")));
    assert!(shed_fs::is_file(out.join("app.cfg")));
}

#[test]
fn unknown_extension_is_rejected() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("src");
    seed(&src);

    let err = shed_fs::pack(&src, dir.path().join("backup.rar")).unwrap_err();
    assert!(matches!(err, FsError::InvalidPath { .. }));
    assert!(err.to_string().contains("archive format"));
}

#[test]
fn packing_a_missing_directory_fails() {
    let dir = tempdir().unwrap();
    let err = shed_fs::pack(dir.path().join("absent"), dir.path().join("x.zip")).unwrap_err();
    assert!(matches!(err, FsError::InvalidPath { .. }));
}

#[test]
fn corrupt_zip_is_reported() {
    let dir = tempdir().unwrap();
    let fake = dir.path().join("fake.zip");
    shed_fs::write_string(&fake, "definitely not a zip file", false).unwrap();

    let err = shed_fs::unpack(&fake, dir.path().join("out")).unwrap_err();
    assert!(matches!(err, FsError::Zip { .. }));
}
